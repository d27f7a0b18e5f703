//! Whole-core behavior through the public API.

use ctor::ctor;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pce::cpu::CpuBus;
use pce::psg::{
    PSG_REG_CH_BALANCE, PSG_REG_CH_CONTROL, PSG_REG_CH_SELECT, PSG_REG_FREQ_HI, PSG_REG_FREQ_LO,
    PSG_REG_WAVE_DATA,
};
use pce::vce::MASTER_CLOCKS_PER_LINE;
use pce::{Core, CoreConfig, SystemKind, AUDIO_BUFFER_SIZE, MAX_FRAME_HEIGHT, MAX_FRAME_WIDTH};

const SAMPLE_RATE: usize = 44_100;

#[ctor]
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

struct Buffers {
    frame: Vec<u8>,
    audio: Vec<i16>,
}

impl Buffers {
    fn new() -> Self {
        Self {
            frame: vec![0; MAX_FRAME_WIDTH * MAX_FRAME_HEIGHT * 4],
            audio: vec![0; AUDIO_BUFFER_SIZE],
        }
    }
}

/// 8 KiB card whose reset vector points at `SEI; BRA *`.
fn idle_rom() -> Vec<u8> {
    let mut rom = vec![0xFF; 0x2000];
    rom[..3].copy_from_slice(&[0x78, 0x80, 0xFE]);
    rom[0x1FFE] = 0x00;
    rom[0x1FFF] = 0xE0;
    rom
}

fn psg_write(core: &mut Core, register: u16, value: u8) {
    core.bus.write(0x0800 + register, value);
}

#[test]
fn reset_runs_one_silent_frame() {
    let mut core = Core::new(CoreConfig::default());
    core.reset();
    let mut buffers = Buffers::new();
    let result = core.run_until_frame(&mut buffers.frame, &mut buffers.audio);

    assert!((1460..=1480).contains(&result.samples), "{}", result.samples);
    assert!(!result.hit_breakpoint());
    assert!(result.frame_completed);
    let info = core.runtime_info();
    assert_eq!((info.width, info.height), (256, 224));
    assert!(buffers.audio[..result.samples].iter().all(|&sample| sample == 0));
}

#[test]
fn tam_maps_an_unpopulated_bank() {
    let mut core = Core::new(CoreConfig::default());
    core.reset();
    // LDA #$55; TAM #$01, executed from work RAM.
    for (index, byte) in [0xA9, 0x55, 0x53, 0x01].into_iter().enumerate() {
        core.bus.write(0x2200 + index as u16, byte);
    }
    core.cpu.pc = 0x2200;
    core.cpu.step(&mut core.bus);
    core.cpu.step(&mut core.bus);

    assert_eq!(core.bus.mpr(0), 0x55);
    assert_eq!(core.translate(0x0100), 0xAA100);
    assert_eq!(core.bus.read(0x0100), 0xFF);
}

/// Magnitude of one DFT bin at `frequency` Hz.
fn magnitude(samples: &[f64], frequency: f64) -> f64 {
    let step = 2.0 * std::f64::consts::PI * frequency / SAMPLE_RATE as f64;
    let (re, im) = samples
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(re, im), (index, &sample)| {
            let angle = step * index as f64;
            (re + sample * angle.cos(), im - sample * angle.sin())
        });
    (re * re + im * im).sqrt()
}

#[test]
fn wave_channel_plays_its_tone() {
    let mut core = Core::new(CoreConfig::default());
    core.load_rom("idle.pce", &idle_rom()).expect("valid rom");

    psg_write(&mut core, PSG_REG_CH_SELECT, 0);
    psg_write(&mut core, PSG_REG_FREQ_LO, 0x00);
    psg_write(&mut core, PSG_REG_FREQ_HI, 0x01);
    psg_write(&mut core, PSG_REG_CH_CONTROL, 0x80);
    psg_write(&mut core, PSG_REG_CH_BALANCE, 0xFF);
    for sample in 0..32 {
        psg_write(&mut core, PSG_REG_WAVE_DATA, sample);
    }

    let mut buffers = Buffers::new();
    let mut left = Vec::with_capacity(SAMPLE_RATE);
    while left.len() < SAMPLE_RATE {
        let result = core.run_until_frame(&mut buffers.frame, &mut buffers.audio);
        left.extend(
            buffers.audio[..result.samples]
                .chunks_exact(2)
                .map(|pair| pair[0] as f64),
        );
    }
    left.truncate(SAMPLE_RATE);
    assert!(left.iter().any(|&sample| sample != 0.0));
    let mean = left.iter().sum::<f64>() / left.len() as f64;
    let centered: Vec<f64> = left.iter().map(|sample| sample - mean).collect();

    let peak = (300..=600)
        .map(|frequency| (frequency, magnitude(&centered, frequency as f64)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(frequency, _)| frequency)
        .expect("non-empty range");
    // 3,579,545 Hz / (32 steps * 0x100 clocks)
    assert!((430..=445).contains(&peak), "peak at {peak} Hz");
}

#[test]
fn frames_span_whole_raster_lines() {
    for system in [SystemKind::PcEngine, SystemKind::SuperGrafx] {
        let mut core = Core::new(CoreConfig {
            system,
            ..CoreConfig::default()
        });
        core.load_rom("idle.pce", &idle_rom()).expect("valid rom");
        let mut buffers = Buffers::new();
        let mut expected = 0u64;
        for frame in 0..4 {
            if frame == 2 {
                core.bus.write(0x0400, 0x04);
            }
            let lines = core.runtime_info().lines_per_frame as u64;
            core.run_until_frame(&mut buffers.frame, &mut buffers.audio);
            expected += lines * MASTER_CLOCKS_PER_LINE as u64;

            let (hpos, vpos) = core.bus.vce.position();
            let overshoot = vpos as u64 * MASTER_CLOCKS_PER_LINE as u64 + hpos as u64;
            assert_eq!(core.cpu.master_clocks(), expected + overshoot, "{system:?} frame {frame}");
        }
    }
}

#[test]
fn save_state_restores_an_identical_core() {
    let mut core = Core::new(CoreConfig {
        system: SystemKind::SuperGrafx,
        ..CoreConfig::default()
    });
    core.load_rom("idle.sgx", &idle_rom()).expect("valid rom");
    psg_write(&mut core, PSG_REG_CH_CONTROL, 0x9F);
    let mut buffers = Buffers::new();
    core.run_until_frame(&mut buffers.frame, &mut buffers.audio);

    let mut saved = Vec::new();
    core.save_state(&mut saved).expect("save");
    let snapshot = core.state_body().expect("encode");

    let mut restored = Core::new(CoreConfig {
        system: SystemKind::SuperGrafx,
        ..CoreConfig::default()
    });
    restored.load_rom("idle.sgx", &idle_rom()).expect("valid rom");
    restored.load_state(saved.as_slice()).expect("load");
    assert_eq!(restored.state_body().expect("encode"), snapshot);

    let mut restored_buffers = Buffers::new();
    let original = core.run_until_frame(&mut buffers.frame, &mut buffers.audio);
    let replay = restored.run_until_frame(&mut restored_buffers.frame, &mut restored_buffers.audio);
    assert_eq!(original, replay);
    assert_eq!(buffers.audio[..original.samples], restored_buffers.audio[..replay.samples]);
    assert_eq!(core.state_body().expect("encode"), restored.state_body().expect("encode"));
}
