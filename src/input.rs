//! Joypad port: up to five pads behind a multitap, with optional
//! six-button pads.

use crate::config::{CoreConfig, Region};

pub const MAX_PADS: usize = 5;

const PORT_SEL: u8 = 0x01;
const PORT_CLR: u8 = 0x02;
const PORT_REGION_JAPAN: u8 = 0x40;
const PORT_NO_CDROM: u8 = 0x80;
const PORT_FIXED_BITS: u8 = 0x30;

/// Pad buttons as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    I,
    II,
    III,
    IV,
    V,
    VI,
    Select,
    Run,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    pub const ALL: [Key; 12] = [
        Key::I,
        Key::II,
        Key::III,
        Key::IV,
        Key::V,
        Key::VI,
        Key::Select,
        Key::Run,
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
    ];

    pub const fn mask(self) -> u16 {
        1 << self as u16
    }

    pub fn from_name(name: &str) -> Option<Key> {
        let key = match name.to_ascii_lowercase().as_str() {
            "i" | "1" => Key::I,
            "ii" | "2" => Key::II,
            "iii" | "3" => Key::III,
            "iv" | "4" => Key::IV,
            "v" | "5" => Key::V,
            "vi" | "6" => Key::VI,
            "select" => Key::Select,
            "run" => Key::Run,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            _ => return None,
        };
        Some(key)
    }
}

fn nibble(pressed: u16, keys: [Key; 4]) -> u8 {
    keys.iter()
        .enumerate()
        .filter(|(_, key)| pressed & key.mask() != 0)
        .fold(0x0F, |value, (bit, _)| value & !(1 << bit))
}

#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Input {
    pads: [u16; MAX_PADS],
    extended_page: [bool; MAX_PADS],
    output: u8,
    tap_index: usize,
    multitap: bool,
    six_button: bool,
    region: Region,
    cdrom_attached: bool,
}

impl Input {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            pads: [0; MAX_PADS],
            extended_page: [false; MAX_PADS],
            output: PORT_SEL | PORT_CLR,
            tap_index: 0,
            multitap: config.multitap,
            six_button: config.six_button_pads,
            region: config.region,
            cdrom_attached: config.cdrom_attached,
        }
    }

    /// Re-apply host settings, e.g. after a save state was restored.
    pub fn configure(&mut self, config: &CoreConfig) {
        self.multitap = config.multitap;
        self.six_button = config.six_button_pads;
        self.region = config.region;
        self.cdrom_attached = config.cdrom_attached;
    }

    pub fn reset(&mut self) {
        self.extended_page = [false; MAX_PADS];
        self.output = PORT_SEL | PORT_CLR;
        self.tap_index = 0;
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.tap_index > MAX_PADS {
            return Err("multitap position out of range");
        }
        Ok(())
    }

    pub fn key_event(&mut self, pad: usize, key: Key, pressed: bool) {
        let Some(state) = self.pads.get_mut(pad) else {
            return;
        };
        if pressed {
            *state |= key.mask();
        } else {
            *state &= !key.mask();
        }
    }

    pub fn pad(&self, pad: usize) -> u16 {
        self.pads.get(pad).copied().unwrap_or(0)
    }

    pub fn set_pad(&mut self, pad: usize, pressed: u16) {
        if let Some(state) = self.pads.get_mut(pad) {
            *state = pressed;
        }
    }

    pub fn tap_index(&self) -> usize {
        self.tap_index
    }

    pub fn write(&mut self, value: u8) {
        let previous = self.output;
        self.output = value;
        let rising = |bit: u8| previous & bit == 0 && value & bit != 0;

        if rising(PORT_CLR) && self.six_button {
            if let Some(page) = self.extended_page.get_mut(self.tap_index) {
                *page = !*page;
            }
        }
        if value & PORT_CLR != 0 {
            self.tap_index = 0;
        } else if rising(PORT_SEL) && self.multitap {
            self.tap_index = (self.tap_index + 1).min(MAX_PADS);
        }
    }

    pub fn read(&self) -> u8 {
        let mut value = PORT_FIXED_BITS;
        if !self.cdrom_attached {
            value |= PORT_NO_CDROM;
        }
        if self.region == Region::Japan {
            value |= PORT_REGION_JAPAN;
        }
        value | self.read_nibble()
    }

    fn read_nibble(&self) -> u8 {
        let index = if self.multitap { self.tap_index } else { 0 };
        if index >= MAX_PADS {
            return 0x00;
        }
        let pressed = self.pads[index];
        let directions = self.output & PORT_SEL != 0;
        match (self.six_button && self.extended_page[index], directions) {
            (true, true) => 0x00,
            (true, false) => nibble(pressed, [Key::III, Key::IV, Key::V, Key::VI]),
            (false, true) => nibble(pressed, [Key::Up, Key::Right, Key::Down, Key::Left]),
            (false, false) => nibble(pressed, [Key::I, Key::II, Key::Select, Key::Run]),
        }
    }
}
