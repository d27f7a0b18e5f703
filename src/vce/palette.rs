use crate::config::PixelFormat;

pub const COLOR_COUNT: usize = 512;

/// One converted color, stored in output byte order. Only the first
/// `PixelFormat::bytes_per_pixel()` bytes are meaningful.
pub type PackedColor = [u8; 4];

fn expand3(value: u16) -> u32 {
    (value as u32 * 255) / 7
}

/// Split a 9-bit GRB color into 8-bit RGB components.
pub fn decode_grb(color: u16) -> (u32, u32, u32) {
    let green = expand3((color >> 6) & 0x07);
    let red = expand3((color >> 3) & 0x07);
    let blue = expand3(color & 0x07);
    (red, green, blue)
}

fn luminance(red: u32, green: u32, blue: u32) -> u32 {
    (red * 299 + green * 587 + blue * 114) / 1000
}

/// Approximation of the console's composite output: chroma is pulled
/// toward luma and the result is darkened through a 2.2/2.0 gamma ratio.
fn composite(red: u32, green: u32, blue: u32) -> (u32, u32, u32) {
    let luma = luminance(red, green, blue) as f32;
    let adjust = |channel: u32| {
        let blended = luma + (channel as f32 - luma) * 0.85;
        let normalized = (blended / 255.0).clamp(0.0, 1.0);
        (normalized.powf(1.1) * 255.0).round() as u32
    };
    (adjust(red), adjust(green), adjust(blue))
}

pub fn pack(format: PixelFormat, red: u32, green: u32, blue: u32) -> PackedColor {
    let word = |value: u16| {
        let [low, high] = value.to_le_bytes();
        [low, high, 0, 0]
    };
    let (r5, g5, b5) = ((red >> 3) as u16, (green >> 3) as u16, (blue >> 3) as u16);
    let g6 = (green >> 2) as u16;
    match format {
        PixelFormat::Rgb565 => word((r5 << 11) | (g6 << 5) | b5),
        PixelFormat::Bgr565 => word((b5 << 11) | (g6 << 5) | r5),
        PixelFormat::Rgb555 => word((r5 << 10) | (g5 << 5) | b5),
        PixelFormat::Bgr555 => word((b5 << 10) | (g5 << 5) | r5),
        PixelFormat::Rgba8888 => [red as u8, green as u8, blue as u8, 0xFF],
        PixelFormat::Bgra8888 => [blue as u8, green as u8, red as u8, 0xFF],
    }
}

/// Color and grayscale tables for every 9-bit value in one output format.
#[derive(Clone, Debug, Default)]
pub struct PaletteTables {
    pub format: PixelFormat,
    pub color: Vec<PackedColor>,
    pub monochrome: Vec<PackedColor>,
}

impl PaletteTables {
    pub fn build(format: PixelFormat, composite_output: bool) -> Self {
        let mut color = Vec::with_capacity(COLOR_COUNT);
        let mut monochrome = Vec::with_capacity(COLOR_COUNT);
        for value in 0..COLOR_COUNT as u16 {
            let (mut red, mut green, mut blue) = decode_grb(value);
            if composite_output {
                (red, green, blue) = composite(red, green, blue);
            }
            color.push(pack(format, red, green, blue));
            let gray = luminance(red, green, blue);
            monochrome.push(pack(format, gray, gray, gray));
        }
        Self {
            format,
            color,
            monochrome,
        }
    }
}
