// VDC (HuC6270): register file, VRAM port protocol, DMA engines and the
// per-dot horizontal/vertical state machine. Line rendering lives in render.rs.

mod render;


use tracing::{debug, trace, warn};

pub const VDC_REGISTER_COUNT: usize = 20;
pub const VRAM_WORDS: usize = 0x8000;
pub const SAT_WORDS: usize = 0x100;
pub const LINE_BUFFER_SIZE: usize = 1024;
/// Palette index emitted where nothing is drawn (sprite palette 0, color 0).
pub const TRANSPARENT_PIXEL: u16 = 0x100;

pub(crate) const REG_MAWR: usize = 0x00;
pub(crate) const REG_MARR: usize = 0x01;
pub(crate) const REG_VWR: usize = 0x02;
pub(crate) const REG_CR: usize = 0x05;
pub(crate) const REG_RCR: usize = 0x06;
pub(crate) const REG_BXR: usize = 0x07;
pub(crate) const REG_BYR: usize = 0x08;
pub(crate) const REG_MWR: usize = 0x09;
pub(crate) const REG_HSR: usize = 0x0A;
pub(crate) const REG_HDR: usize = 0x0B;
pub(crate) const REG_VPR: usize = 0x0C;
pub(crate) const REG_VDR: usize = 0x0D;
pub(crate) const REG_VCR: usize = 0x0E;
pub(crate) const REG_DCR: usize = 0x0F;
pub(crate) const REG_SOUR: usize = 0x10;
pub(crate) const REG_DESR: usize = 0x11;
pub(crate) const REG_LENR: usize = 0x12;
pub(crate) const REG_DVSSR: usize = 0x13;

const REGISTER_MASKS: [u16; VDC_REGISTER_COUNT] = [
    0xFFFF, 0xFFFF, 0xFFFF, 0x0000, 0x0000, 0x1FFF, 0x03FF, 0x03FF, 0x01FF, 0x00FF, 0x7F1F,
    0x7F7F, 0xFF1F, 0x01FF, 0x00FF, 0x001F, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF,
];

pub const VDC_STATUS_CR: u8 = 0x01;
pub const VDC_STATUS_OR: u8 = 0x02;
pub const VDC_STATUS_RCR: u8 = 0x04;
pub const VDC_STATUS_DS: u8 = 0x08;
pub const VDC_STATUS_DV: u8 = 0x10;
pub const VDC_STATUS_VBL: u8 = 0x20;
pub const VDC_STATUS_BUSY: u8 = 0x40;
const VDC_STATUS_IRQ_MASK: u8 = 0x3F;

pub(crate) const CR_IRQ_COLLISION: u16 = 0x0001;
pub(crate) const CR_IRQ_OVERFLOW: u16 = 0x0002;
pub(crate) const CR_IRQ_RCR: u16 = 0x0004;
pub(crate) const CR_IRQ_VBLANK: u16 = 0x0008;
pub(crate) const CR_SPRITES: u16 = 0x0040;
pub(crate) const CR_BACKGROUND: u16 = 0x0080;

pub(crate) const DMA_CTRL_IRQ_SATB: u16 = 0x0001;
pub(crate) const DMA_CTRL_IRQ_VRAM: u16 = 0x0002;
pub(crate) const DMA_CTRL_SRC_DEC: u16 = 0x0004;
pub(crate) const DMA_CTRL_DST_DEC: u16 = 0x0008;
pub(crate) const DMA_CTRL_SATB_AUTO: u16 = 0x0010;

const DMA_WORD_CLOCKS: u32 = 4;
/// Raster counter value on the first line of the display window.
pub(crate) const RASTER_COUNTER_START: u16 = 0x40;
const AUTO_INCREMENT: [u16; 4] = [1, 32, 64, 128];

#[derive(Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum VerticalState {
    Vsw,
    Vds,
    Vdw,
    Vcr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum HorizontalState {
    Hsw,
    Hds1,
    Hds2,
    Hds3,
    Hdw1,
    Hdw2,
    Hde,
}

/// One sprite's slice for the line being displayed.
#[derive(Clone, Copy, Debug, Default, bincode::Encode, bincode::Decode)]
pub(crate) struct FetchedSprite {
    pub(crate) index: u8,
    pub(crate) x: i16,
    pub(crate) width: u8,
    pub(crate) palette: u16,
    pub(crate) priority: bool,
    pub(crate) x_flip: bool,
    pub(crate) planes: [[u16; 4]; 2],
}

#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Vdc {
    vram: Vec<u16>,
    sat: Vec<u16>,
    registers: [u16; VDC_REGISTER_COUNT],
    address: u8,
    status: u8,
    read_buffer: u16,

    vram_dma_active: bool,
    sat_dma_pending: bool,
    sat_dma_remaining: u16,
    sat_dma_source: u16,
    dma_clocks: u32,

    v_state: VerticalState,
    lines_to_next_v_state: u32,
    h_state: HorizontalState,
    clocks_to_next_h_state: i64,
    divider: u32,
    raster_counter: u16,
    bg_counter_y: u16,
    latched_bxr: u16,
    line_rendered: bool,
    line_x: usize,
    line_width: usize,
    line_buffer: Vec<u16>,
    sprites: Vec<FetchedSprite>,
    no_sprite_limit: bool,
}

impl Default for Vdc {
    fn default() -> Self {
        Self::new()
    }
}

impl Vdc {
    pub fn new() -> Self {
        Self {
            vram: vec![0; VRAM_WORDS],
            sat: vec![0; SAT_WORDS],
            registers: [0; VDC_REGISTER_COUNT],
            address: 0,
            status: 0,
            read_buffer: 0,
            vram_dma_active: false,
            sat_dma_pending: false,
            sat_dma_remaining: 0,
            sat_dma_source: 0,
            dma_clocks: 0,
            v_state: VerticalState::Vsw,
            lines_to_next_v_state: 1,
            h_state: HorizontalState::Hsw,
            clocks_to_next_h_state: 8 * 4,
            divider: 4,
            raster_counter: 0,
            bg_counter_y: 0,
            latched_bxr: 0,
            line_rendered: false,
            line_x: 0,
            line_width: 0,
            line_buffer: vec![TRANSPARENT_PIXEL; LINE_BUFFER_SIZE],
            sprites: Vec::with_capacity(64),
            no_sprite_limit: false,
        }
    }

    pub fn reset(&mut self) {
        let no_sprite_limit = self.no_sprite_limit;
        *self = Self::new();
        self.no_sprite_limit = no_sprite_limit;
    }

    pub fn set_no_sprite_limit(&mut self, enabled: bool) {
        self.no_sprite_limit = enabled;
    }

    /// Check a decoded state before it replaces the live one.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.vram.len() != VRAM_WORDS {
            return Err("vdc vram size mismatch");
        }
        if self.sat.len() != SAT_WORDS || self.sat_dma_remaining as usize > SAT_WORDS {
            return Err("vdc sat size mismatch");
        }
        if self.line_buffer.len() != LINE_BUFFER_SIZE || self.line_width > LINE_BUFFER_SIZE {
            return Err("vdc line buffer size mismatch");
        }
        if !(2..=4).contains(&self.divider) {
            return Err("vdc dot clock out of range");
        }
        if self.sprites.len() > SAT_WORDS / 4 || self.sprites.iter().any(|sprite| sprite.width > 32) {
            return Err("vdc sprite line out of range");
        }
        Ok(())
    }

    pub fn register(&self, index: usize) -> u16 {
        self.registers.get(index).copied().unwrap_or(0)
    }

    pub fn status(&self) -> u8 {
        self.status
    }

    pub fn vram(&self) -> &[u16] {
        &self.vram
    }

    pub fn sat(&self) -> &[u16] {
        &self.sat
    }

    pub fn vertical_state(&self) -> VerticalState {
        self.v_state
    }

    pub fn horizontal_state(&self) -> HorizontalState {
        self.h_state
    }

    pub fn raster_counter(&self) -> u16 {
        self.raster_counter
    }

    /// IRQ1 contribution: any latched interrupt status bit.
    pub fn irq_asserted(&self) -> bool {
        self.status & VDC_STATUS_IRQ_MASK != 0
    }

    /// Pixels per line of the display window as programmed in HDR.
    pub fn display_width(&self) -> usize {
        (((self.registers[REG_HDR] & 0x7F) as usize + 1) * 8).min(LINE_BUFFER_SIZE)
    }

    /// Lines in the display window as programmed in VDR.
    pub fn display_height(&self) -> usize {
        (self.registers[REG_VDR] & 0x1FF) as usize + 1
    }

    fn auto_increment(&self) -> u16 {
        AUTO_INCREMENT[((self.registers[REG_CR] >> 11) & 0x03) as usize]
    }

    fn raise_status(&mut self, bit: u8) {
        self.status |= bit;
    }

    // Port protocol

    pub fn read_port(&mut self, port: u16) -> u8 {
        match port & 0x03 {
            0 => {
                let value = self.status;
                self.status &= !VDC_STATUS_IRQ_MASK;
                value
            }
            1 => 0x00,
            2 => {
                if self.address as usize != REG_VWR {
                    debug!(register = self.address, "VDC data read from non-VRR register");
                }
                self.read_buffer as u8
            }
            _ => {
                if self.address as usize != REG_VWR {
                    debug!(register = self.address, "VDC data read from non-VRR register");
                    return (self.read_buffer >> 8) as u8;
                }
                let value = (self.read_buffer >> 8) as u8;
                let marr = self.registers[REG_MARR].wrapping_add(self.auto_increment());
                self.registers[REG_MARR] = marr;
                self.read_buffer = self.read_vram(marr);
                value
            }
        }
    }

    pub fn write_port(&mut self, port: u16, value: u8) {
        match port & 0x03 {
            0 => self.address = value & 0x1F,
            1 => {}
            2 => self.write_data(false, value),
            _ => self.write_data(true, value),
        }
    }

    fn write_data(&mut self, high: bool, value: u8) {
        let index = self.address as usize;
        if index >= VDC_REGISTER_COUNT || REGISTER_MASKS[index] == 0 {
            debug!(register = index, value, "VDC write to undefined register");
            return;
        }
        let old = self.registers[index];
        let merged = if high {
            (old & 0x00FF) | ((value as u16) << 8)
        } else {
            (old & 0xFF00) | value as u16
        };
        self.registers[index] = merged & REGISTER_MASKS[index];
        trace!(register = index, value = self.registers[index], "VDC register write");

        match (index, high) {
            (REG_MAWR, true) => {
                if self.registers[REG_MAWR] as usize >= VRAM_WORDS {
                    warn!(address = self.registers[REG_MAWR], "MAWR beyond VRAM");
                }
            }
            (REG_MARR, true) => {
                let marr = self.registers[REG_MARR];
                if marr as usize >= VRAM_WORDS {
                    warn!(address = marr, "MARR beyond VRAM");
                }
                self.read_buffer = self.read_vram(marr);
            }
            (REG_VWR, true) => {
                let mawr = self.registers[REG_MAWR];
                self.write_vram(mawr, self.registers[REG_VWR]);
                self.registers[REG_MAWR] = mawr.wrapping_add(self.auto_increment());
            }
            (REG_BYR, _) => self.bg_counter_y = self.registers[REG_BYR],
            (REG_LENR, true) => self.start_vram_dma(),
            (REG_DVSSR, true) => {
                self.sat_dma_pending = true;
                debug!(source = self.registers[REG_DVSSR], "SAT DMA scheduled for vblank");
            }
            _ => {}
        }
    }

    fn read_vram(&self, addr: u16) -> u16 {
        self.vram.get(addr as usize).copied().unwrap_or(0xFFFF)
    }

    fn write_vram(&mut self, addr: u16, value: u16) {
        match self.vram.get_mut(addr as usize) {
            Some(slot) => *slot = value,
            None => debug!(address = addr, "VRAM write beyond 0x7FFF dropped"),
        }
    }

    // DMA

    fn start_vram_dma(&mut self) {
        self.vram_dma_active = true;
        self.status |= VDC_STATUS_BUSY;
        debug!(
            source = self.registers[REG_SOUR],
            dest = self.registers[REG_DESR],
            words = self.registers[REG_LENR] as u32 + 1,
            "VRAM DMA started"
        );
    }

    fn start_sat_dma(&mut self) {
        self.sat_dma_pending = false;
        self.sat_dma_remaining = SAT_WORDS as u16;
        self.sat_dma_source = self.registers[REG_DVSSR];
    }

    pub fn dma_active(&self) -> bool {
        self.vram_dma_active || self.sat_dma_remaining > 0
    }

    fn advance_dma(&mut self, clocks: u32) {
        if !self.dma_active() {
            return;
        }
        self.dma_clocks += clocks;
        while self.dma_clocks >= DMA_WORD_CLOCKS {
            self.dma_clocks -= DMA_WORD_CLOCKS;
            if self.vram_dma_active {
                self.vram_dma_word();
            } else if self.sat_dma_remaining > 0 {
                self.sat_dma_word();
            } else {
                self.dma_clocks = 0;
                break;
            }
        }
    }

    fn vram_dma_word(&mut self) {
        let dcr = self.registers[REG_DCR];
        let source = self.registers[REG_SOUR];
        let dest = self.registers[REG_DESR];
        let value = self.read_vram(source);
        self.write_vram(dest, value);

        let step = |addr: u16, decrement: bool| {
            if decrement {
                addr.wrapping_sub(1)
            } else {
                addr.wrapping_add(1)
            }
        };
        self.registers[REG_SOUR] = step(source, dcr & DMA_CTRL_SRC_DEC != 0);
        self.registers[REG_DESR] = step(dest, dcr & DMA_CTRL_DST_DEC != 0);

        let remaining = self.registers[REG_LENR];
        if remaining == 0 {
            self.vram_dma_active = false;
            self.status &= !VDC_STATUS_BUSY;
            if dcr & DMA_CTRL_IRQ_VRAM != 0 {
                self.raise_status(VDC_STATUS_DV);
            }
            debug!("VRAM DMA complete");
        } else {
            self.registers[REG_LENR] = remaining - 1;
        }
    }

    fn sat_dma_word(&mut self) {
        let index = SAT_WORDS - self.sat_dma_remaining as usize;
        self.sat[index] = self.read_vram(self.sat_dma_source.wrapping_add(index as u16));
        self.sat_dma_remaining -= 1;
        if self.sat_dma_remaining == 0 && self.registers[REG_DCR] & DMA_CTRL_IRQ_SATB != 0 {
            self.raise_status(VDC_STATUS_DS);
        }
    }

    // Timing

    /// Advance one dot of `divider` master clocks and return the palette
    /// index the VDC drives for it.
    pub fn clock(&mut self, divider: u32) -> u16 {
        self.divider = divider;
        self.advance_dma(divider);

        let pixel = match self.h_state {
            HorizontalState::Hdw1 | HorizontalState::Hdw2 if self.line_rendered => {
                let pixel = if self.line_x < self.line_width {
                    self.line_buffer[self.line_x]
                } else {
                    TRANSPARENT_PIXEL
                };
                self.line_x += 1;
                pixel
            }
            _ => TRANSPARENT_PIXEL,
        };

        self.clocks_to_next_h_state -= divider as i64;
        while self.clocks_to_next_h_state <= 0 {
            self.next_h_state();
        }
        pixel
    }

    /// Start of a raster line, driven by the VCE's HSYNC. `vsync` marks the
    /// first line of a frame.
    pub fn begin_line(&mut self, vsync: bool) {
        if vsync {
            self.enter_v_state(VerticalState::Vsw);
        } else {
            self.lines_to_next_v_state = self.lines_to_next_v_state.saturating_sub(1);
            if self.lines_to_next_v_state == 0 {
                let next = match self.v_state {
                    VerticalState::Vsw => VerticalState::Vds,
                    VerticalState::Vds => VerticalState::Vdw,
                    VerticalState::Vdw => VerticalState::Vcr,
                    VerticalState::Vcr => VerticalState::Vsw,
                };
                self.enter_v_state(next);
            } else {
                self.raster_counter = (self.raster_counter + 1) & 0x3FF;
                if self.v_state == VerticalState::Vdw {
                    self.bg_counter_y = self.bg_counter_y.wrapping_add(1);
                }
            }
        }
        self.line_rendered = false;
        self.enter_h_state(HorizontalState::Hsw);
    }

    fn enter_v_state(&mut self, state: VerticalState) {
        self.v_state = state;
        let vpr = self.registers[REG_VPR];
        self.lines_to_next_v_state = match state {
            VerticalState::Vsw => (vpr & 0x1F) as u32 + 1,
            VerticalState::Vds => (vpr >> 8) as u32 + 2,
            VerticalState::Vdw => (self.registers[REG_VDR] & 0x1FF) as u32 + 1,
            VerticalState::Vcr => (self.registers[REG_VCR] & 0xFF) as u32 + 3,
        };
        match state {
            VerticalState::Vdw => {
                self.raster_counter = RASTER_COUNTER_START;
                self.bg_counter_y = self.registers[REG_BYR];
            }
            VerticalState::Vcr => {
                self.raster_counter = (self.raster_counter + 1) & 0x3FF;
                self.vblank_start();
            }
            _ => self.raster_counter = (self.raster_counter + 1) & 0x3FF,
        }
    }

    fn vblank_start(&mut self) {
        if self.registers[REG_CR] & CR_IRQ_VBLANK != 0 {
            self.raise_status(VDC_STATUS_VBL);
        }
        if self.sat_dma_pending || self.registers[REG_DCR] & DMA_CTRL_SATB_AUTO != 0 {
            self.start_sat_dma();
        }
    }

    fn next_h_state(&mut self) {
        let next = match self.h_state {
            HorizontalState::Hsw => HorizontalState::Hds1,
            HorizontalState::Hds1 => HorizontalState::Hds2,
            HorizontalState::Hds2 => HorizontalState::Hds3,
            HorizontalState::Hds3 => HorizontalState::Hdw1,
            HorizontalState::Hdw1 => HorizontalState::Hdw2,
            HorizontalState::Hdw2 => HorizontalState::Hde,
            // Idle until the VCE's HSYNC restarts the line.
            HorizontalState::Hde => {
                self.clocks_to_next_h_state = i64::MAX;
                return;
            }
        };
        self.enter_h_state(next);
    }

    fn enter_h_state(&mut self, state: HorizontalState) {
        let hsr = self.registers[REG_HSR];
        let hdr = self.registers[REG_HDR];
        let dots: i64 = match state {
            HorizontalState::Hsw => ((hsr & 0x1F) as i64 + 1) * 8,
            HorizontalState::Hds1 => (((hsr >> 8) & 0x7F) as i64 + 1) * 8 - 2,
            HorizontalState::Hds2 | HorizontalState::Hds3 => 1,
            HorizontalState::Hdw1 => ((hdr & 0x7F) as i64 + 1) * 8 - 8,
            HorizontalState::Hdw2 => 8,
            HorizontalState::Hde => (((hdr >> 8) & 0x7F) as i64 + 1) * 8,
        };
        self.h_state = state;
        self.clocks_to_next_h_state += dots * self.divider as i64;
        if state == HorizontalState::Hsw {
            self.clocks_to_next_h_state = dots * self.divider as i64;
        }

        match state {
            HorizontalState::Hds2 => {
                self.latched_bxr = self.registers[REG_BXR];
                if self.registers[REG_CR] & CR_IRQ_RCR != 0
                    && self.raster_counter == self.registers[REG_RCR]
                {
                    self.raise_status(VDC_STATUS_RCR);
                }
            }
            HorizontalState::Hdw1 => {
                self.line_x = 0;
                if self.v_state == VerticalState::Vdw {
                    self.render_line();
                    self.line_rendered = true;
                }
            }
            HorizontalState::Hde => self.prepare_next_line_sprites(),
            _ => {}
        }
    }

    fn prepare_next_line_sprites(&mut self) {
        let next_line = match self.v_state {
            VerticalState::Vdw if self.lines_to_next_v_state > 1 => Some(self.raster_counter + 1),
            VerticalState::Vds if self.lines_to_next_v_state == 1 => Some(RASTER_COUNTER_START),
            _ => None,
        };
        match next_line {
            Some(line) => self.fetch_sprites(line),
            None => self.sprites.clear(),
        }
    }
}
