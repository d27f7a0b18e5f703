use super::*;

/// PSG clocks in one 262-line frame.
const FRAME_PSG_CLOCKS: u32 = 1365 * 262 / MASTER_CLOCKS_PER_PSG_CLOCK;

fn select(psg: &mut Psg, channel: u8) {
    psg.write(PSG_REG_CH_SELECT, channel);
}

fn full_volume_channel(psg: &mut Psg, channel: u8, control: u8) {
    psg.write(PSG_REG_MAIN_BALANCE, 0xFF);
    select(psg, channel);
    psg.write(PSG_REG_CH_BALANCE, 0xFF);
    psg.write(PSG_REG_CH_CONTROL, control);
}

#[test]
fn reset_state_is_silent() {
    let mut psg = Psg::new();
    psg.tick(FRAME_PSG_CLOCKS);
    let mut out = vec![1i16; 2048];
    let count = psg.drain(&mut out);
    assert!((1460..=1480).contains(&count), "{count}");
    assert_eq!(count % 2, 0);
    assert!(out[..count].iter().all(|&sample| sample == 0));
}

#[test]
fn attenuation_combines_balance_and_volume() {
    assert_eq!(attenuation_index(0x0F, 0x0F, 0x1F), 0);
    assert_eq!(attenuation_index(0x0E, 0x0F, 0x1F), 1);
    assert_eq!(attenuation_index(0x0F, 0x0E, 0x1F), 1);
    assert_eq!(attenuation_index(0x0F, 0x0F, 0x1E), 0);
    assert_eq!(attenuation_index(0x0F, 0x0F, 0x1D), 1);
    assert_eq!(attenuation_index(0x00, 0x0F, 0x1F), 15);
    assert_eq!(attenuation_index(0x00, 0x0F, 0x00), 30);
    assert_eq!(attenuation_index(0x00, 0x00, 0x00), 31);
    assert_eq!(ATTENUATION[31], 0);
}

#[test]
fn dda_channel_outputs_a_constant_level() {
    for (channel, value) in [(0u8, 0x1Au8), (2, 0x03), (5, 0x1F)] {
        let mut psg = Psg::new();
        full_volume_channel(&mut psg, channel, PSG_CH_CTRL_KEY_ON | PSG_CH_CTRL_DDA | 0x1F);
        psg.write(PSG_REG_WAVE_DATA, value);
        psg.tick(10_000);
        let mut out = vec![0i16; 512];
        let count = psg.drain(&mut out);
        assert!(count > 200);
        let expected = (value as i16 - 16) * ATTENUATION[0] as i16;
        assert!(out[..count].iter().all(|&sample| sample == expected), "channel {channel}");
    }
}

#[test]
fn wave_steps_every_divisor_clocks() {
    let mut psg = Psg::new();
    select(&mut psg, 0);
    psg.write(PSG_REG_FREQ_LO, 0x00);
    psg.write(PSG_REG_FREQ_HI, 0x01);
    full_volume_channel(&mut psg, 0, PSG_CH_CTRL_KEY_ON | 0x1F);
    for sample in 0..32 {
        psg.write(PSG_REG_WAVE_DATA, sample);
    }
    assert_eq!(psg.channel(0).wave_pos, 0);
    psg.tick(255);
    assert_eq!(psg.channel(0).wave_pos, 0);
    psg.tick(1);
    assert_eq!(psg.channel(0).wave_pos, 1);
    psg.tick(256 * 31);
    assert_eq!(psg.channel(0).wave_pos, 0);
}

#[test]
fn enabled_channel_at_reset_balance_is_quiet_but_audible() {
    let mut psg = Psg::new();
    select(&mut psg, 0);
    psg.write(PSG_REG_FREQ_LO, 0x00);
    psg.write(PSG_REG_FREQ_HI, 0x01);
    psg.write(PSG_REG_CH_CONTROL, PSG_CH_CTRL_KEY_ON);
    psg.write(PSG_REG_CH_BALANCE, 0xFF);
    for sample in 0..32 {
        psg.write(PSG_REG_WAVE_DATA, sample);
    }
    // Main balance 0 and channel volume 0 give 15 steps each.
    assert_eq!(psg.mix(), (-16 * ATTENUATION[30], -16 * ATTENUATION[30]));

    psg.tick(PSG_CLOCK_HZ as u32);
    let mut out = vec![0i16; SAMPLE_BUFFER_CAPACITY];
    let count = psg.drain(&mut out);
    assert!(out[..count].iter().any(|&sample| sample != 0));
}

#[test]
fn key_off_channel_is_muted_and_frozen() {
    let mut psg = Psg::new();
    full_volume_channel(&mut psg, 1, 0x1F);
    psg.write(PSG_REG_WAVE_DATA, 0x1F);
    psg.tick(2_000);
    assert_eq!(psg.mix(), (0, 0));
    assert_eq!(psg.channel(1).wave_pos, 0);
}

#[test]
fn balance_nibbles_pan_per_ear() {
    let mut psg = Psg::new();
    full_volume_channel(&mut psg, 3, PSG_CH_CTRL_KEY_ON | PSG_CH_CTRL_DDA | 0x1F);
    psg.write(PSG_REG_CH_BALANCE, 0xF0);
    psg.write(PSG_REG_WAVE_DATA, 0x1F);
    assert_eq!(psg.mix(), (15 * ATTENUATION[0], 15 * ATTENUATION[15]));
}

#[test]
fn noise_only_on_channels_four_and_five() {
    let mut psg = Psg::new();
    full_volume_channel(&mut psg, 2, PSG_CH_CTRL_KEY_ON | 0x1F);
    psg.write(PSG_REG_NOISE_CTRL, PSG_NOISE_ENABLE | 0x1F);
    assert!(!psg.channel(2).noise());

    full_volume_channel(&mut psg, 4, PSG_CH_CTRL_KEY_ON | 0x1F);
    psg.write(PSG_REG_NOISE_CTRL, PSG_NOISE_ENABLE | 0x1F);
    assert!(psg.channel(4).noise());
    let seed = psg.channel(4).noise_lfsr;
    psg.tick(4_000);
    assert_ne!(psg.channel(4).noise_lfsr, seed);
    assert!(psg.channel(4).noise_lfsr < 1 << 17);
}

#[test]
fn lfo_mutes_the_modulator_and_bends_channel_zero() {
    let mut psg = Psg::new();
    full_volume_channel(&mut psg, 1, PSG_CH_CTRL_KEY_ON | 0x1F);
    for _ in 0..32 {
        psg.write(PSG_REG_WAVE_DATA, 0x1F);
    }
    select(&mut psg, 0);
    psg.write(PSG_REG_FREQ_LO, 0x40);
    full_volume_channel(&mut psg, 0, PSG_CH_CTRL_KEY_ON | 0x1F);
    psg.write(PSG_REG_LFO_FREQ, 0x01);
    psg.write(PSG_REG_LFO_CTRL, 0x01);

    psg.tick(0x40);
    assert_eq!(psg.channel(0).wave_pos, 1);
    // Later steps take 0x40 + (0x1F - 16) clocks.
    psg.tick(0x40 + 15 - 1);
    assert_eq!(psg.channel(0).wave_pos, 1);
    psg.tick(1);
    assert_eq!(psg.channel(0).wave_pos, 2);
    let (left, _) = psg.mix();
    assert_eq!(left, -16 * ATTENUATION[0]);
}

#[test]
fn drain_keeps_what_does_not_fit() {
    let mut psg = Psg::new();
    psg.tick(FRAME_PSG_CLOCKS);
    let total = psg.buffered();
    let mut small = [0i16; 100];
    assert_eq!(psg.drain(&mut small), 100);
    assert_eq!(psg.buffered(), total - 100);
}

#[test]
fn selecting_a_missing_channel_is_ignored() {
    let mut psg = Psg::new();
    select(&mut psg, 3);
    select(&mut psg, 6);
    psg.write(PSG_REG_FREQ_LO, 0x34);
    assert_eq!(psg.channel(3).frequency, 0x34);
}
