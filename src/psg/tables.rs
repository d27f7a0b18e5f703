pub const PSG_CHANNEL_COUNT: usize = 6;
pub const PSG_WAVE_SIZE: usize = 32;

pub const PSG_REG_CH_SELECT: u16 = 0x00;
pub const PSG_REG_MAIN_BALANCE: u16 = 0x01;
pub const PSG_REG_FREQ_LO: u16 = 0x02;
pub const PSG_REG_FREQ_HI: u16 = 0x03;
pub const PSG_REG_CH_CONTROL: u16 = 0x04;
pub const PSG_REG_CH_BALANCE: u16 = 0x05;
pub const PSG_REG_WAVE_DATA: u16 = 0x06;
pub const PSG_REG_NOISE_CTRL: u16 = 0x07;
pub const PSG_REG_LFO_FREQ: u16 = 0x08;
pub const PSG_REG_LFO_CTRL: u16 = 0x09;

pub const PSG_CH_CTRL_KEY_ON: u8 = 0x80;
pub const PSG_CH_CTRL_DDA: u8 = 0x40;
pub const PSG_CH_CTRL_VOLUME: u8 = 0x1F;
pub const PSG_NOISE_ENABLE: u8 = 0x80;
pub const PSG_NOISE_FREQ: u8 = 0x1F;
pub const PSG_LFO_HALT: u8 = 0x80;
pub const PSG_LFO_DEPTH: u8 = 0x03;

/// PSG input clock: the 21.477 MHz master clock divided by 6.
pub const PSG_CLOCK_HZ: u64 = 3_579_545;
pub const MASTER_CLOCKS_PER_PSG_CLOCK: u32 = 6;
pub const SAMPLE_RATE_HZ: u64 = 44_100;
/// Interleaved i16 values kept before the oldest are dropped.
pub const SAMPLE_BUFFER_CAPACITY: usize = 8192;

/// Output amplitude per attenuation step of 1.5 dB. Step 31 is silence.
pub const ATTENUATION: [i32; 32] = [
    340, 286, 241, 203, 170, 143, 121, 102, 85, 72, 60, 51, 43, 36, 30, 25, 21, 18, 15, 13, 11,
    9, 8, 6, 5, 5, 4, 3, 3, 2, 2, 0,
];

/// Attenuation step for one ear. Main balance, channel balance and
/// channel volume each contribute up to 15 steps; the 5-bit volume field
/// counts at half resolution.
pub fn attenuation_index(main: u8, balance: u8, volume: u8) -> usize {
    let steps = (0x0F - (main & 0x0F) as usize)
        + (0x0F - (balance & 0x0F) as usize)
        + (0x0F - ((volume & PSG_CH_CTRL_VOLUME) >> 1) as usize);
    steps.min(ATTENUATION.len() - 1)
}
