// VCE (HuC6260): color table ports and the raster clock that paces the
// VDC(s) dot by dot and writes converted pixels into the host frame.

mod palette;


pub use palette::{decode_grb, PackedColor, PaletteTables, COLOR_COUNT};

use tracing::{debug, trace};

use crate::bus::Transient;
use crate::config::{CoreConfig, PixelFormat};

pub const MASTER_CLOCKS_PER_LINE: u32 = 1365;
pub const LINES_PER_FRAME: u16 = 262;
pub const LINES_PER_FRAME_BLUR: u16 = 263;
/// Raster lines that can carry picture, starting at `FIRST_ACTIVE_LINE`.
pub const ACTIVE_LINES: usize = 242;
pub const FIRST_ACTIVE_LINE: usize = 14;
/// VSYNC is asserted for the last lines of every frame.
pub const VSYNC_LINES: u16 = 3;
/// HSYNC is asserted for the first master clocks of every line.
pub const HSYNC_CLOCKS: u32 = 128;
pub const MAX_FRAME_WIDTH: usize = 2048;
pub const MAX_FRAME_HEIGHT: usize = 512;

const CONTROL_DOT_CLOCK: u8 = 0x03;
const CONTROL_BLUR: u8 = 0x04;
const CONTROL_MONOCHROME: u8 = 0x80;

/// Producer of one palette index per dot: a single VDC, or the SuperGrafx
/// pair behind the VPC.
pub trait VideoSource {
    fn begin_line(&mut self, vsync: bool);
    fn dot(&mut self, divider: u32) -> u16;
}

impl VideoSource for crate::vdc::Vdc {
    fn begin_line(&mut self, vsync: bool) {
        crate::vdc::Vdc::begin_line(self, vsync);
    }

    fn dot(&mut self, divider: u32) -> u16 {
        self.clock(divider)
    }
}

/// Master clocks per dot for a control byte.
pub fn dot_clock_divider(control: u8) -> u32 {
    match control & CONTROL_DOT_CLOCK {
        0 => 4,
        1 => 3,
        _ => 2,
    }
}

/// First dot and width of the captured part of a line.
fn visible_window(divider: u32, overscan: bool) -> (usize, usize) {
    let (start, width) = match divider {
        4 => (48, 256),
        3 => (64, 344),
        _ => (96, 512),
    };
    if overscan {
        let margin = width / 32;
        (start - margin, width + 2 * margin)
    } else {
        (start, width)
    }
}

#[derive(Clone, Debug, Default)]
struct OutputSettings {
    tables: PaletteTables,
    overscan: bool,
    first_row_line: usize,
    rows: usize,
}

#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Vce {
    control: u8,
    address: u16,
    color_table: Vec<u16>,
    hpos: u32,
    vpos: u16,
    hsync: bool,
    vsync: bool,
    dot_phase: u32,
    line_divider: u32,
    dot_index: usize,
    frame_width: usize,
    frame_count: u64,
    output: Transient<OutputSettings>,
}

impl Vce {
    pub fn new(config: &CoreConfig) -> Self {
        let mut vce = Self {
            control: 0,
            address: 0,
            color_table: vec![0; COLOR_COUNT],
            hpos: 0,
            vpos: 0,
            hsync: true,
            vsync: false,
            dot_phase: 0,
            line_divider: 4,
            dot_index: 0,
            frame_width: 256,
            frame_count: 0,
            output: Transient::default(),
        };
        vce.configure(config);
        vce
    }

    /// Rebuild host-side output settings. Called at construction and after
    /// a save state is restored.
    pub fn configure(&mut self, config: &CoreConfig) {
        let start = (config.scanline_start as usize).min(ACTIVE_LINES - 1);
        self.output.0 = OutputSettings {
            tables: PaletteTables::build(config.pixel_format, config.composite_palette),
            overscan: config.overscan,
            first_row_line: FIRST_ACTIVE_LINE + start,
            rows: config.visible_lines(),
        };
        self.frame_width = visible_window(self.line_divider, config.overscan).1;
    }

    pub fn reset(&mut self) {
        self.control = 0;
        self.address = 0;
        self.color_table.fill(0);
        self.hpos = 0;
        self.vpos = 0;
        self.hsync = true;
        self.vsync = false;
        self.dot_phase = 0;
        self.line_divider = 4;
        self.dot_index = 0;
        self.frame_width = visible_window(4, self.output.overscan).1;
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.output.tables.format
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn color(&self, index: usize) -> u16 {
        self.color_table[index & (COLOR_COUNT - 1)]
    }

    pub fn lines_per_frame(&self) -> u16 {
        if self.control & CONTROL_BLUR != 0 {
            LINES_PER_FRAME_BLUR
        } else {
            LINES_PER_FRAME
        }
    }

    pub fn divider(&self) -> u32 {
        dot_clock_divider(self.control)
    }

    /// Output width of the frame being drawn.
    pub fn frame_width(&self) -> usize {
        self.frame_width
    }

    pub fn frame_height(&self) -> usize {
        self.output.rows
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn position(&self) -> (u32, u16) {
        (self.hpos, self.vpos)
    }

    pub fn hsync(&self) -> bool {
        self.hsync
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    /// Check a decoded state before it replaces the live one.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.color_table.len() != COLOR_COUNT {
            return Err("vce color table size mismatch");
        }
        if self.address as usize >= COLOR_COUNT {
            return Err("vce color address out of range");
        }
        if !(2..=4).contains(&self.line_divider) || self.dot_phase >= self.line_divider {
            return Err("vce dot clock out of range");
        }
        if self.hpos >= MASTER_CLOCKS_PER_LINE || self.vpos >= LINES_PER_FRAME_BLUR {
            return Err("vce raster position out of range");
        }
        if self.frame_width > MAX_FRAME_WIDTH {
            return Err("vce frame width out of range");
        }
        Ok(())
    }

    pub fn read_port(&mut self, offset: u16) -> u8 {
        match offset & 0x07 {
            4 => self.color_table[self.address as usize] as u8,
            5 => {
                let value = 0xFE | (self.color_table[self.address as usize] >> 8) as u8;
                self.address = (self.address + 1) & 0x1FF;
                value
            }
            other => {
                debug!(offset = other, "read from write-only VCE register");
                0xFF
            }
        }
    }

    pub fn write_port(&mut self, offset: u16, value: u8) {
        trace!(offset = offset & 0x07, value, "VCE write");
        match offset & 0x07 {
            0 => self.control = value,
            1 => {}
            2 => self.address = (self.address & 0x100) | value as u16,
            3 => self.address = (self.address & 0x0FF) | ((value as u16 & 0x01) << 8),
            4 => {
                let slot = &mut self.color_table[self.address as usize];
                *slot = (*slot & 0x100) | value as u16;
            }
            5 => {
                let slot = &mut self.color_table[self.address as usize];
                *slot = (*slot & 0x0FF) | ((value as u16 & 0x01) << 8);
                self.address = (self.address + 1) & 0x1FF;
            }
            other => debug!(offset = other, "write to undefined VCE register"),
        }
    }

    /// Advance the raster by `clocks` master clocks. Returns true when the
    /// vertical counter wrapped, i.e. a frame was completed.
    pub fn tick<V: VideoSource>(&mut self, mut clocks: u32, video: &mut V, frame: &mut [u8]) -> bool {
        let mut frame_done = false;
        while clocks > 0 {
            let to_dot = self.line_divider - self.dot_phase;
            let to_line_end = MASTER_CLOCKS_PER_LINE - self.hpos;
            let to_hsync_edge = if self.hpos < HSYNC_CLOCKS {
                HSYNC_CLOCKS - self.hpos
            } else {
                to_line_end
            };
            let step = clocks.min(to_dot).min(to_line_end).min(to_hsync_edge);
            clocks -= step;
            self.hpos += step;
            self.dot_phase += step;
            self.hsync = self.hpos < HSYNC_CLOCKS;

            if self.dot_phase == self.line_divider {
                self.dot_phase = 0;
                let pixel = video.dot(self.line_divider);
                self.emit(pixel, frame);
                self.dot_index += 1;
            }
            if self.hpos == MASTER_CLOCKS_PER_LINE {
                frame_done |= self.end_line(video);
            }
        }
        frame_done
    }

    fn end_line<V: VideoSource>(&mut self, video: &mut V) -> bool {
        self.hpos = 0;
        self.dot_phase = 0;
        self.dot_index = 0;
        self.line_divider = self.divider();

        let lines = self.lines_per_frame();
        self.vpos += 1;
        let wrapped = self.vpos >= lines;
        if wrapped {
            self.vpos = 0;
            self.frame_count += 1;
            self.frame_width = visible_window(self.line_divider, self.output.overscan).1;
        }
        self.hsync = true;
        let vsync = self.vpos >= lines - VSYNC_LINES;
        video.begin_line(vsync && !self.vsync);
        self.vsync = vsync;
        wrapped
    }

    fn emit(&self, pixel: u16, frame: &mut [u8]) {
        let line = self.vpos as usize;
        let first = self.output.first_row_line;
        if line < first || line >= first + self.output.rows {
            return;
        }
        let (start, width) = visible_window(self.line_divider, self.output.overscan);
        if self.dot_index < start {
            return;
        }
        let column = self.dot_index - start;
        if column >= width || column >= self.frame_width {
            return;
        }

        // Color 0 of every background palette shows the backdrop entry.
        let index = if pixel & 0x10F == 0 { 0 } else { pixel as usize & 0x1FF };
        let color = self.color_table[index] as usize;
        let tables = &self.output.tables;
        let packed = if self.control & CONTROL_MONOCHROME != 0 {
            tables.monochrome.get(color)
        } else {
            tables.color.get(color)
        };
        let Some(packed) = packed else {
            return;
        };

        let bytes = tables.format.bytes_per_pixel();
        let offset = ((line - first) * self.frame_width + column) * bytes;
        if let Some(target) = frame.get_mut(offset..offset + bytes) {
            target.copy_from_slice(&packed[..bytes]);
        }
    }
}
