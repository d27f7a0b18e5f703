use super::tables::{
    PSG_CH_CTRL_DDA, PSG_CH_CTRL_KEY_ON, PSG_NOISE_ENABLE, PSG_NOISE_FREQ, PSG_WAVE_SIZE,
};

const NOISE_SEED: u32 = 0x0001;
/// Longest wave step: a 0x1000 divisor scaled by LFO frequency 0x100.
const MAX_WAVE_COUNTER: i32 = 0x1000 * 0x100 + 0x1000;
const MAX_NOISE_COUNTER: i32 = PSG_NOISE_FREQ as i32 * 64;

#[derive(Clone, Copy, Debug, bincode::Encode, bincode::Decode)]
pub struct PsgChannel {
    pub(crate) frequency: u16,
    pub(crate) control: u8,
    pub(crate) balance: u8,
    pub(crate) waveform: [u8; PSG_WAVE_SIZE],
    pub(crate) wave_pos: u8,
    pub(crate) wave_write_pos: u8,
    pub(crate) dda_sample: u8,
    pub(crate) noise_control: u8,
    pub(crate) noise_lfsr: u32,
    pub(crate) counter: i32,
    pub(crate) noise_counter: i32,
}

impl Default for PsgChannel {
    fn default() -> Self {
        Self {
            frequency: 0,
            control: 0,
            balance: 0,
            waveform: [0; PSG_WAVE_SIZE],
            wave_pos: 0,
            wave_write_pos: 0,
            dda_sample: 0,
            noise_control: 0,
            noise_lfsr: NOISE_SEED,
            counter: 0,
            noise_counter: 0,
        }
    }
}

impl PsgChannel {
    pub fn key_on(&self) -> bool {
        self.control & PSG_CH_CTRL_KEY_ON != 0
    }

    pub fn dda(&self) -> bool {
        self.control & PSG_CH_CTRL_DDA != 0
    }

    pub fn noise(&self) -> bool {
        self.noise_control & PSG_NOISE_ENABLE != 0
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.wave_pos as usize >= PSG_WAVE_SIZE || self.wave_write_pos as usize >= PSG_WAVE_SIZE {
            return Err("psg wave position out of range");
        }
        if !(0..=MAX_WAVE_COUNTER).contains(&self.counter)
            || !(0..=MAX_NOISE_COUNTER).contains(&self.noise_counter)
        {
            return Err("psg channel counter out of range");
        }
        if self.noise_lfsr >= 1 << 17 {
            return Err("psg noise register out of range");
        }
        Ok(())
    }

    /// Wave step period in PSG clocks. A divisor of 0 behaves as 0x1000.
    pub fn period(&self) -> i32 {
        match self.frequency & 0x0FFF {
            0 => 0x1000,
            divisor => divisor as i32,
        }
    }

    fn noise_period(&self) -> i32 {
        let divisor = (!self.noise_control & PSG_NOISE_FREQ) as i32 * 64;
        divisor.max(32)
    }

    pub(crate) fn write_control(&mut self, value: u8) {
        let previous = self.control;
        self.control = value;
        if previous & PSG_CH_CTRL_DDA != 0 && value & PSG_CH_CTRL_DDA == 0 {
            // Clearing DDA rewinds the waveform pointer.
            self.wave_write_pos = 0;
            self.wave_pos = 0;
        }
        if previous & PSG_CH_CTRL_KEY_ON == 0 && value & PSG_CH_CTRL_KEY_ON != 0 {
            self.counter = self.period();
            self.wave_pos = self.wave_write_pos;
            self.noise_counter = self.noise_period();
        }
    }

    pub(crate) fn write_wave(&mut self, value: u8) {
        let sample = value & 0x1F;
        if self.dda() {
            self.dda_sample = sample;
        } else {
            self.waveform[self.wave_write_pos as usize] = sample;
            self.wave_write_pos = (self.wave_write_pos + 1) & (PSG_WAVE_SIZE as u8 - 1);
        }
    }

    /// Run the wave counter for `clocks` PSG clocks with an explicit step
    /// period, returning how many wave steps were taken.
    pub(crate) fn advance_wave(&mut self, clocks: u32, period: impl Fn(&Self) -> i32) -> u32 {
        if !self.key_on() || self.dda() {
            return 0;
        }
        let mut steps = 0;
        self.counter -= clocks as i32;
        while self.counter <= 0 {
            let reload = period(self).max(1);
            self.counter += reload;
            self.wave_pos = (self.wave_pos + 1) & (PSG_WAVE_SIZE as u8 - 1);
            steps += 1;
        }
        steps
    }

    pub(crate) fn advance_noise(&mut self, clocks: u32) {
        if !self.noise() {
            return;
        }
        self.noise_counter -= clocks as i32;
        while self.noise_counter <= 0 {
            self.noise_counter += self.noise_period();
            let lfsr = self.noise_lfsr;
            let feedback = (lfsr ^ (lfsr >> 1) ^ (lfsr >> 11) ^ (lfsr >> 12) ^ (lfsr >> 16)) & 1;
            self.noise_lfsr = (lfsr >> 1) | (feedback << 16);
        }
    }

    /// Current 5-bit output level before volume.
    pub(crate) fn level(&self, noise_capable: bool) -> u8 {
        if noise_capable && self.noise() {
            if self.noise_lfsr & 1 != 0 {
                0x1F
            } else {
                0x00
            }
        } else if self.dda() {
            self.dda_sample
        } else {
            self.waveform[self.wave_pos as usize]
        }
    }
}
