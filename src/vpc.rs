//! HuC6202 video priority controller. Only present on SuperGrafx units,
//! where it picks VDC1 or VDC2 for every dot.

use tracing::{debug, trace};

use crate::vdc::Vdc;

/// Window regions, indexed by `(inside window 1) | (inside window 2) << 1`,
/// mapped to the nibble of the priority word that controls them.
const REGION_NIBBLE: [u32; 4] = [3, 2, 1, 0];

const NIBBLE_VDC1_ENABLE: u8 = 0x01;
const NIBBLE_VDC2_ENABLE: u8 = 0x02;

/// How the two planes stack inside one window region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriorityMode {
    /// VDC1 over VDC2.
    Vdc1Front,
    /// VDC2 sprites in front of VDC1 background.
    Vdc2SpritesFront,
    /// VDC1 sprites behind VDC2 background.
    Vdc1SpritesBack,
}

impl PriorityMode {
    fn from_nibble(nibble: u8) -> Self {
        match (nibble >> 2) & 0x03 {
            1 => PriorityMode::Vdc2SpritesFront,
            2 => PriorityMode::Vdc1SpritesBack,
            _ => PriorityMode::Vdc1Front,
        }
    }
}

fn opaque(pixel: u16) -> bool {
    pixel & 0x0F != 0
}

fn sprite(pixel: u16) -> bool {
    opaque(pixel) && pixel & 0x100 != 0
}

#[derive(Clone, Debug, Default, bincode::Encode, bincode::Decode)]
pub struct Vpc {
    priority: u16,
    window1: u16,
    window2: u16,
    st_to_vdc2: bool,
    column: u16,
}

impl Vpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn windows(&self) -> (u16, u16) {
        (self.window1, self.window2)
    }

    /// True when ST0/ST1/ST2 target VDC2.
    pub fn st_targets_vdc2(&self) -> bool {
        self.st_to_vdc2
    }

    pub fn read_register(&self, offset: u16) -> u8 {
        match offset & 0x07 {
            0 => self.priority as u8,
            1 => (self.priority >> 8) as u8,
            2 => self.window1 as u8,
            3 => (self.window1 >> 8) as u8,
            4 => self.window2 as u8,
            5 => (self.window2 >> 8) as u8,
            other => {
                debug!(offset = other, "read from write-only VPC register");
                0xFF
            }
        }
    }

    pub fn write_register(&mut self, offset: u16, value: u8) {
        trace!(offset = offset & 0x07, value, "VPC write");
        let low = |word: u16| (word & 0xFF00) | value as u16;
        let high = |word: u16| (word & 0x00FF) | ((value as u16) << 8);
        match offset & 0x07 {
            0 => self.priority = low(self.priority),
            1 => self.priority = high(self.priority),
            2 => self.window1 = low(self.window1) & 0x03FF,
            3 => self.window1 = high(self.window1) & 0x03FF,
            4 => self.window2 = low(self.window2) & 0x03FF,
            5 => self.window2 = high(self.window2) & 0x03FF,
            6 => self.st_to_vdc2 = value & 0x01 != 0,
            _ => debug!(value, "write to undefined VPC register"),
        }
    }

    pub fn begin_line(&mut self) {
        self.column = 0;
    }

    fn region_nibble(&self) -> u8 {
        let column = self.column;
        let region = (column < self.window1) as usize | (((column < self.window2) as usize) << 1);
        ((self.priority >> (REGION_NIBBLE[region] * 4)) & 0x0F) as u8
    }

    /// Select the output index for one dot and advance the column counter.
    pub fn compose_pixel(&mut self, vdc1_pixel: u16, vdc2_pixel: u16) -> u16 {
        let nibble = self.region_nibble();
        self.column = self.column.saturating_add(1);

        let vdc1_on = nibble & NIBBLE_VDC1_ENABLE != 0;
        let vdc2_on = nibble & NIBBLE_VDC2_ENABLE != 0;
        let first = if vdc1_on { vdc1_pixel } else { 0 };
        let second = if vdc2_on { vdc2_pixel } else { 0 };

        let vdc2_wins = match PriorityMode::from_nibble(nibble) {
            PriorityMode::Vdc1Front => !opaque(first) && opaque(second),
            PriorityMode::Vdc2SpritesFront => {
                (!opaque(first) && opaque(second)) || (opaque(first) && !sprite(first) && sprite(second))
            }
            PriorityMode::Vdc1SpritesBack => {
                (!opaque(first) && opaque(second)) || (sprite(first) && opaque(second) && !sprite(second))
            }
        };
        if vdc2_wins {
            second
        } else {
            first
        }
    }
}

/// IRQ1 as seen by the CPU on a SuperGrafx: either VDC may assert it.
pub fn combined_irq(vdc1: &Vdc, vdc2: &Vdc) -> bool {
    vdc1.irq_asserted() || vdc2.irq_asserted()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc_with_priority(priority: u16) -> Vpc {
        let mut vpc = Vpc::new();
        vpc.write_register(0, priority as u8);
        vpc.write_register(1, (priority >> 8) as u8);
        vpc
    }

    #[test]
    fn registers_read_back_and_mask_windows() {
        let mut vpc = vpc_with_priority(0x3311);
        vpc.write_register(2, 0xFF);
        vpc.write_register(3, 0xFF);
        vpc.write_register(6, 0x01);
        assert_eq!(vpc.read_register(0), 0x11);
        assert_eq!(vpc.read_register(1), 0x33);
        assert_eq!(vpc.windows(), (0x03FF, 0));
        assert!(vpc.st_targets_vdc2());
        assert_eq!(vpc.read_register(7), 0xFF);
    }

    #[test]
    fn vdc1_front_falls_through_on_transparency() {
        // Neither window: upper nibble of the high byte.
        let mut vpc = vpc_with_priority(0x3000);
        assert_eq!(vpc.compose_pixel(0x021, 0x032), 0x021);
        assert_eq!(vpc.compose_pixel(0x020, 0x032), 0x032);
        assert_eq!(vpc.compose_pixel(0x000, 0x000), 0x000);
    }

    #[test]
    fn disabled_vdc_is_treated_as_transparent() {
        let mut vpc = vpc_with_priority(0x2000);
        assert_eq!(vpc.compose_pixel(0x021, 0x032), 0x032);
        let mut vpc = vpc_with_priority(0x0000);
        assert_eq!(vpc.compose_pixel(0x021, 0x032), 0x000);
    }

    #[test]
    fn vdc2_sprites_can_cover_vdc1_background() {
        let mut vpc = vpc_with_priority(0x7000);
        assert_eq!(vpc.compose_pixel(0x021, 0x132), 0x132);
        assert_eq!(vpc.compose_pixel(0x121, 0x132), 0x121);
        assert_eq!(vpc.compose_pixel(0x021, 0x032), 0x021);
    }

    #[test]
    fn vdc1_sprites_can_sit_behind_vdc2_background() {
        let mut vpc = vpc_with_priority(0xB000);
        assert_eq!(vpc.compose_pixel(0x121, 0x032), 0x032);
        assert_eq!(vpc.compose_pixel(0x021, 0x032), 0x021);
        assert_eq!(vpc.compose_pixel(0x121, 0x132), 0x121);
    }

    #[test]
    fn windows_select_nibbles_by_column() {
        // Both windows: VDC2 only. Window 2 only: VDC1 only.
        let mut vpc = vpc_with_priority(0x0012);
        vpc.write_register(2, 2);
        vpc.write_register(4, 4);
        vpc.begin_line();
        let outputs: Vec<u16> = (0..5).map(|_| vpc.compose_pixel(0x021, 0x032)).collect();
        assert_eq!(outputs, vec![0x032, 0x032, 0x021, 0x021, 0x000]);

        vpc.begin_line();
        assert_eq!(vpc.compose_pixel(0x021, 0x032), 0x032);
    }
}
