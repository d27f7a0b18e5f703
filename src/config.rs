use serde::{Deserialize, Serialize};

/// Console variant the core emulates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum SystemKind {
    #[default]
    PcEngine,
    SuperGrafx,
}

/// Joypad port region bit. Japanese consoles report bit 6 set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum Region {
    #[default]
    Japan,
    Americas,
}

/// Byte layout of the frame buffer handed to `run_until_frame`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum PixelFormat {
    #[default]
    Rgb565,
    Bgr565,
    Rgb555,
    Bgr555,
    Rgba8888,
    Bgra8888,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb565 | PixelFormat::Bgr565 | PixelFormat::Rgb555 | PixelFormat::Bgr555 => 2,
            PixelFormat::Rgba8888 | PixelFormat::Bgra8888 => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub system: SystemKind,
    pub pixel_format: PixelFormat,
    pub region: Region,
    pub composite_palette: bool,
    pub overscan: bool,
    /// First visible line of the cropped output, counted from the top of the active area.
    pub scanline_start: u16,
    /// Last visible line (inclusive).
    pub scanline_end: u16,
    pub no_sprite_limit: bool,
    pub backup_ram: bool,
    pub multitap: bool,
    pub six_button_pads: bool,
    pub cdrom_attached: bool,
    /// Passed through to the host; the core never filters opposite directions.
    pub allow_opposite_directions: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            system: SystemKind::PcEngine,
            pixel_format: PixelFormat::Rgb565,
            region: Region::Japan,
            composite_palette: false,
            overscan: false,
            scanline_start: 3,
            scanline_end: 226,
            no_sprite_limit: false,
            backup_ram: true,
            multitap: true,
            six_button_pads: false,
            cdrom_attached: false,
            allow_opposite_directions: false,
        }
    }
}

impl CoreConfig {
    pub fn new(pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format,
            ..Self::default()
        }
    }

    /// Apply `PCE_*` environment toggles on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if env_flag("PCE_NO_SPRITE_LIMIT") {
            self.no_sprite_limit = true;
        }
        if env_flag("PCE_OVERSCAN") {
            self.overscan = true;
        }
        if env_flag("PCE_COMPOSITE") {
            self.composite_palette = true;
        }
        if env_flag("PCE_SGX") {
            self.system = SystemKind::SuperGrafx;
        }
        self
    }

    pub fn is_sgx(&self) -> bool {
        self.system == SystemKind::SuperGrafx
    }

    pub(crate) fn visible_lines(&self) -> usize {
        let start = self.scanline_start.min(crate::vce::ACTIVE_LINES as u16 - 1);
        let end = self.scanline_end.clamp(start, crate::vce::ACTIVE_LINES as u16 - 1);
        (end - start + 1) as usize
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value != "0" && !value.is_empty())
        .unwrap_or(false)
}
