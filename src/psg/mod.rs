mod channel;
mod tables;

#[cfg(test)]
mod tests;

pub use channel::PsgChannel;
pub use tables::*;

use tracing::trace;

#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Psg {
    current_channel: usize,
    main_balance: u8,
    lfo_frequency: u8,
    lfo_control: u8,
    channels: [PsgChannel; PSG_CHANNEL_COUNT],
    /// Fractional position toward the next output sample, in units of
    /// PSG clocks scaled by the sample rate.
    sample_phase: u64,
    samples: Vec<i16>,
}

impl Default for Psg {
    fn default() -> Self {
        Self::new()
    }
}

impl Psg {
    pub fn new() -> Self {
        Self {
            current_channel: 0,
            main_balance: 0,
            lfo_frequency: 0,
            lfo_control: 0,
            channels: [PsgChannel::default(); PSG_CHANNEL_COUNT],
            sample_phase: 0,
            samples: Vec::with_capacity(SAMPLE_BUFFER_CAPACITY),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn channel(&self, index: usize) -> &PsgChannel {
        &self.channels[index.min(PSG_CHANNEL_COUNT - 1)]
    }

    pub fn main_balance(&self) -> u8 {
        self.main_balance
    }

    /// Check a decoded state before it replaces the live one.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.current_channel >= PSG_CHANNEL_COUNT {
            return Err("psg channel select out of range");
        }
        if self.sample_phase >= PSG_CLOCK_HZ {
            return Err("psg sample phase out of range");
        }
        if self.samples.len() > SAMPLE_BUFFER_CAPACITY {
            return Err("psg sample buffer overflow");
        }
        self.channels.iter().try_for_each(PsgChannel::validate)
    }

    /// Interleaved samples waiting to be drained.
    pub fn buffered(&self) -> usize {
        self.samples.len()
    }

    pub fn write(&mut self, offset: u16, value: u8) {
        trace!(offset = offset & 0x0F, value, "PSG write");
        let channel = &mut self.channels[self.current_channel];
        match offset & 0x0F {
            PSG_REG_CH_SELECT => {
                // Selecting 6 or 7 leaves the register bank unreachable.
                if (value & 0x07) < PSG_CHANNEL_COUNT as u8 {
                    self.current_channel = (value & 0x07) as usize;
                }
            }
            PSG_REG_MAIN_BALANCE => self.main_balance = value,
            PSG_REG_FREQ_LO => channel.frequency = (channel.frequency & 0x0F00) | value as u16,
            PSG_REG_FREQ_HI => {
                channel.frequency = (channel.frequency & 0x00FF) | (((value & 0x0F) as u16) << 8)
            }
            PSG_REG_CH_CONTROL => channel.write_control(value),
            PSG_REG_CH_BALANCE => channel.balance = value,
            PSG_REG_WAVE_DATA => channel.write_wave(value),
            PSG_REG_NOISE_CTRL => {
                if self.current_channel >= 4 {
                    channel.noise_control = value;
                }
            }
            PSG_REG_LFO_FREQ => self.lfo_frequency = value,
            PSG_REG_LFO_CTRL => {
                self.lfo_control = value;
                if value & PSG_LFO_HALT != 0 {
                    self.channels[1].wave_pos = 0;
                }
            }
            _ => {}
        }
    }

    fn lfo_active(&self) -> bool {
        self.lfo_control & PSG_LFO_DEPTH != 0
    }

    /// Advance by `clocks` PSG clocks, emitting a stereo pair at every
    /// 44.1 kHz boundary crossed.
    pub fn tick(&mut self, mut clocks: u32) {
        while clocks > 0 {
            let remaining = PSG_CLOCK_HZ - self.sample_phase;
            let until_sample = remaining.div_ceil(SAMPLE_RATE_HZ).max(1);
            let step = (clocks as u64).min(until_sample) as u32;
            self.advance_channels(step);
            self.sample_phase += step as u64 * SAMPLE_RATE_HZ;
            clocks -= step;
            if self.sample_phase >= PSG_CLOCK_HZ {
                self.sample_phase -= PSG_CLOCK_HZ;
                self.push_sample();
            }
        }
    }

    fn advance_channels(&mut self, clocks: u32) {
        let lfo = self.lfo_active();
        let halted = self.lfo_control & PSG_LFO_HALT != 0;
        for index in 0..PSG_CHANNEL_COUNT {
            if index < 4 {
                if lfo && index == 0 {
                    let depth = ((self.lfo_control & PSG_LFO_DEPTH) - 1) * 2;
                    let modulator = &self.channels[1];
                    let offset = if halted {
                        0
                    } else {
                        (modulator.waveform[modulator.wave_pos as usize] as i32 - 16) << depth
                    };
                    self.channels[0].advance_wave(clocks, |channel| channel.period() + offset);
                } else if lfo && index == 1 {
                    if !halted {
                        let scale = match self.lfo_frequency {
                            0 => 0x100,
                            value => value as i32,
                        };
                        self.channels[1].advance_wave(clocks, |channel| channel.period() * scale);
                    }
                } else {
                    self.channels[index].advance_wave(clocks, PsgChannel::period);
                }
            } else {
                let channel = &mut self.channels[index];
                if channel.noise() {
                    channel.advance_noise(clocks);
                } else {
                    channel.advance_wave(clocks, PsgChannel::period);
                }
            }
        }
    }

    /// Instantaneous left/right mix of all channels.
    pub fn mix(&self) -> (i32, i32) {
        let lfo = self.lfo_active();
        let main_left = self.main_balance >> 4;
        let main_right = self.main_balance & 0x0F;
        let mut left = 0;
        let mut right = 0;
        for (index, channel) in self.channels.iter().enumerate() {
            if !channel.key_on() || (lfo && index == 1) {
                continue;
            }
            let data = channel.level(index >= 4) as i32 - 16;
            let volume = channel.control & PSG_CH_CTRL_VOLUME;
            left += data * ATTENUATION[attenuation_index(main_left, channel.balance >> 4, volume)];
            right += data * ATTENUATION[attenuation_index(main_right, channel.balance & 0x0F, volume)];
        }
        (left, right)
    }

    fn push_sample(&mut self) {
        let (left, right) = self.mix();
        if self.samples.len() + 2 > SAMPLE_BUFFER_CAPACITY {
            self.samples.drain(..2);
        }
        self.samples.push(left.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
        self.samples.push(right.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }

    /// Move buffered interleaved samples into `out`. Returns the number of
    /// i16 values written; anything that does not fit stays buffered.
    pub fn drain(&mut self, out: &mut [i16]) -> usize {
        let count = self.samples.len().min(out.len());
        out[..count].copy_from_slice(&self.samples[..count]);
        self.samples.drain(..count);
        count
    }
}
