use super::*;
use crate::bus::PAGE_SIZE;
use crate::cpu::{CpuBus, Interrupt};
use crate::error::StateError;
use crate::vce::{MASTER_CLOCKS_PER_LINE, MAX_FRAME_HEIGHT, MAX_FRAME_WIDTH};

const LOOP_ADDR: u16 = 0xE011;
const TIMER_HANDLER: u16 = 0xE020;

/// One 8 KiB bank mapped at 0xE000 by the reset MPR7 value.
fn rom_with(program: &[u8], handler: &[u8]) -> Vec<u8> {
    let mut rom = vec![0xEA; PAGE_SIZE];
    rom[..program.len()].copy_from_slice(program);
    let handler_offset = (TIMER_HANDLER - 0xE000) as usize;
    rom[handler_offset..handler_offset + handler.len()].copy_from_slice(handler);
    rom[0x1FFA] = TIMER_HANDLER as u8;
    rom[0x1FFB] = (TIMER_HANDLER >> 8) as u8;
    rom[0x1FFE] = 0x00;
    rom[0x1FFF] = 0xE0;
    rom
}

/// Start the timer with reload 2, mask IRQ1/IRQ2 and spin. Each timer
/// interrupt increments zero-page 0x10.
fn timer_rom() -> Vec<u8> {
    rom_with(
        &[
            0x78, // SEI
            0xA9, 0x02, // LDA #$02
            0x8D, 0x00, 0x0C, // STA $0C00
            0xA9, 0x01, // LDA #$01
            0x8D, 0x01, 0x0C, // STA $0C01
            0xA9, 0x03, // LDA #$03
            0x8D, 0x02, 0x14, // STA $1402
            0x58, // CLI
            0x80, 0xFE, // BRA $E011
        ],
        &[
            0x8D, 0x03, 0x14, // STA $1403
            0xE6, 0x10, // INC $10
            0x40, // RTI
        ],
    )
}

fn spin_rom() -> Vec<u8> {
    rom_with(&[0x78, 0x80, 0xFE], &[0x40])
}

fn core_with(rom: &[u8]) -> Core {
    let mut core = Core::new(CoreConfig::default());
    core.load_rom("test.pce", rom).expect("valid rom");
    core
}

fn buffers() -> (Vec<u8>, Vec<i16>) {
    (
        vec![0; MAX_FRAME_WIDTH * MAX_FRAME_HEIGHT * 4],
        vec![0; AUDIO_BUFFER_SIZE],
    )
}

fn run_frames(core: &mut Core, count: usize) {
    let (mut frame, mut audio) = buffers();
    for _ in 0..count {
        let result = core.run_until_frame(&mut frame, &mut audio);
        assert!(result.frame_completed);
    }
}

#[test]
fn reset_maps_hardware_ram_and_first_rom_bank() {
    let core = core_with(&spin_rom());
    assert_eq!(core.cpu.pc, 0xE000);
    assert_eq!(core.bus.mmu.mprs(), [0xFF, 0xF8, 0, 0, 0, 0, 0, 0]);
    assert_eq!(core.rom_info().map(|rom| rom.size), Some(PAGE_SIZE));
}

#[test]
fn frame_reports_default_geometry_and_audio() {
    let mut core = core_with(&spin_rom());
    let (mut frame, mut audio) = buffers();
    let result = core.run_until_frame(&mut frame, &mut audio);
    assert!(result.frame_completed);
    assert!(!result.hit_breakpoint());
    assert!((1460..=1480).contains(&result.samples), "{}", result.samples);

    let info = core.runtime_info();
    assert_eq!((info.width, info.height), (256, 224));
    assert_eq!(info.lines_per_frame, 262);
    assert_eq!(info.frame_count, 1);
    assert_eq!(info.pixel_format, PixelFormat::Rgb565);
}

#[test]
fn every_frame_spans_whole_raster_lines() {
    let mut core = core_with(&spin_rom());
    run_frames(&mut core, 3);
    let (hpos, vpos) = core.bus.vce.position();
    let overshoot = vpos as u64 * MASTER_CLOCKS_PER_LINE as u64 + hpos as u64;
    let frame_clocks = MASTER_CLOCKS_PER_LINE as u64 * 262;
    assert_eq!(core.cpu.master_clocks(), 3 * frame_clocks + overshoot);
}

#[test]
fn blur_bit_selects_263_line_frames() {
    let mut core = core_with(&spin_rom());
    core.bus.write(0x0400, 0x04);
    run_frames(&mut core, 2);
    assert_eq!(core.runtime_info().lines_per_frame, 263);
    let (hpos, vpos) = core.bus.vce.position();
    let overshoot = vpos as u64 * MASTER_CLOCKS_PER_LINE as u64 + hpos as u64;
    assert_eq!(core.cpu.master_clocks(), 2 * 263 * MASTER_CLOCKS_PER_LINE as u64 + overshoot);
}

#[test]
fn unconfigured_vdc_shows_the_border_color() {
    let mut core = core_with(&spin_rom());
    // White at 0x100, black backdrop at 0x000.
    core.bus.write(0x0402, 0x00);
    core.bus.write(0x0403, 0x01);
    core.bus.write(0x0404, 0xFF);
    core.bus.write(0x0405, 0x01);
    let (mut frame, mut audio) = buffers();
    core.run_until_frame(&mut frame, &mut audio);
    let bytes = 256 * 224 * 2;
    assert!(frame[..bytes].iter().all(|&byte| byte == 0xFF));
    assert!(frame[bytes..bytes + 16].iter().all(|&byte| byte == 0));
}

#[test]
fn timer_interrupts_run_the_handler() {
    let mut core = core_with(&timer_rom());
    run_frames(&mut core, 1);
    // One underflow every 3 * 3072 master clocks.
    let count = core.bus.mmu.ram()[0x10];
    assert!((35..=40).contains(&count), "{count}");
    assert_eq!(core.bus.irq.disable_mask(), 0x03);
}

#[test]
fn execute_breakpoint_stops_before_the_instruction_and_steps_over() {
    let mut core = core_with(&timer_rom());
    core.add_breakpoint(Breakpoint::Execute(LOOP_ADDR));
    core.enable_breakpoints(true);
    let (mut frame, mut audio) = buffers();

    let result = core.run_until_frame(&mut frame, &mut audio);
    assert_eq!(result.breakpoint, Some(BreakReason::Execute(LOOP_ADDR)));
    assert!(!result.frame_completed);
    assert_eq!(core.cpu.pc, LOOP_ADDR);

    let result = core.run_until_frame(&mut frame, &mut audio);
    assert_eq!(result.breakpoint, Some(BreakReason::Execute(LOOP_ADDR)));

    core.enable_breakpoints(false);
    assert!(core.run_until_frame(&mut frame, &mut audio).frame_completed);
}

#[test]
fn write_watchpoint_reports_the_address() {
    let mut core = core_with(&timer_rom());
    core.add_breakpoint(Breakpoint::Write(0x2010));
    core.enable_breakpoints(true);
    let (mut frame, mut audio) = buffers();
    let result = core.run_until_frame(&mut frame, &mut audio);
    assert_eq!(result.breakpoint, Some(BreakReason::Write(0x2010)));
    assert_eq!(core.bus.mmu.ram()[0x10], 1);
}

#[test]
fn irq_breakpoint_stops_at_the_handler() {
    let mut core = core_with(&timer_rom());
    core.add_breakpoint(Breakpoint::Irq);
    core.enable_breakpoints(true);
    let (mut frame, mut audio) = buffers();
    let result = core.run_until_frame(&mut frame, &mut audio);
    assert_eq!(result.breakpoint, Some(BreakReason::Irq(Interrupt::Timer)));
    assert_eq!(core.cpu.pc, TIMER_HANDLER);

    core.clear_breakpoints();
    assert!(core.breakpoints().is_empty());
}

#[test]
fn paused_core_does_not_advance() {
    let mut core = core_with(&spin_rom());
    core.pause(true);
    let (mut frame, mut audio) = buffers();
    let result = core.run_until_frame(&mut frame, &mut audio);
    assert_eq!(result.samples, 0);
    assert!(!result.frame_completed);
    assert_eq!(core.cpu.master_clocks(), 0);

    core.pause(false);
    assert!(core.run_until_frame(&mut frame, &mut audio).frame_completed);
}

#[test]
fn break_request_from_another_handle() {
    let mut core = core_with(&spin_rom());
    let control = core.control();
    std::thread::spawn(move || control.request_break())
        .join()
        .expect("thread");
    let (mut frame, mut audio) = buffers();
    let result = core.run_until_frame(&mut frame, &mut audio);
    assert_eq!(result.breakpoint, Some(BreakReason::Requested));
}

#[test]
fn key_events_reach_the_joypad_port() {
    let mut core = core_with(&spin_rom());
    core.key_event(0, Key::Run, true);
    core.bus.write(0x1000, 0x00);
    assert_eq!(core.bus.read(0x1000) & 0x0F, 0x07);
}

#[test]
fn rejected_rom_keeps_the_current_card() {
    let mut core = core_with(&spin_rom());
    let crc = core.rom_info().map(|rom| rom.crc32);
    assert!(matches!(core.load_rom("empty", &[]), Err(RomError::Empty)));
    assert_eq!(core.rom_info().map(|rom| rom.crc32), crc);
}

#[test]
fn save_state_round_trips_every_component() {
    let mut core = core_with(&timer_rom());
    run_frames(&mut core, 2);
    let mut saved = Vec::new();
    core.save_state(&mut saved).expect("save");
    let body = core.state_body().expect("body");

    run_frames(&mut core, 3);
    assert_ne!(core.state_body().expect("body"), body);

    let header = core.load_state(saved.as_slice()).expect("load");
    assert_eq!(header.rom_name, "test.pce");
    assert_eq!(core.state_body().expect("body"), body);

    run_frames(&mut core, 1);
    let first = core.state_body().expect("body");
    core.load_state(saved.as_slice()).expect("load");
    run_frames(&mut core, 1);
    assert_eq!(core.state_body().expect("body"), first);
}

#[test]
fn rejected_states_leave_the_core_untouched() {
    let mut core = core_with(&timer_rom());
    run_frames(&mut core, 1);
    let mut saved = Vec::new();
    core.save_state(&mut saved).expect("save");
    run_frames(&mut core, 1);
    let before = core.state_body().expect("body");

    let mut other = core_with(&spin_rom());
    let other_before = other.state_body().expect("body");
    assert!(matches!(
        other.load_state(saved.as_slice()),
        Err(StateError::RomMismatch { .. })
    ));
    assert_eq!(other.state_body().expect("body"), other_before);

    assert!(matches!(core.load_state(&saved[..10]), Err(StateError::TooShort)));

    let mut bad_magic = saved.clone();
    let magic_at = bad_magic.len() - STATE_HEADER_SIZE;
    bad_magic[magic_at] ^= 0xFF;
    assert!(matches!(core.load_state(bad_magic.as_slice()), Err(StateError::BadMagic)));

    let mut bad_version = saved.clone();
    bad_version[magic_at + 4] = 9;
    assert!(matches!(
        core.load_state(bad_version.as_slice()),
        Err(StateError::UnsupportedVersion { found: 9 })
    ));

    let mut short_body = saved.clone();
    short_body.remove(0);
    assert!(matches!(core.load_state(short_body.as_slice()), Err(StateError::SizeMismatch)));

    let mut sgx = Core::new(CoreConfig {
        system: SystemKind::SuperGrafx,
        ..CoreConfig::default()
    });
    sgx.load_rom("test.pce", &timer_rom()).expect("valid rom");
    assert!(matches!(sgx.load_state(saved.as_slice()), Err(StateError::SystemMismatch)));

    assert_eq!(core.state_body().expect("body"), before);
}

fn encoded_len<T: bincode::Encode>(part: &T) -> usize {
    let config = bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding();
    bincode::encode_to_vec(part, config).expect("encode").len()
}

#[test]
fn out_of_range_state_values_are_rejected() {
    let mut core = core_with(&timer_rom());
    run_frames(&mut core, 1);
    let mut saved = Vec::new();
    core.save_state(&mut saved).expect("save");
    let before = core.state_body().expect("body");
    let body_len = saved.len() - STATE_HEADER_SIZE;

    // Channel select is the first PSG field, a fixed-width usize.
    let psg_at = body_len - encoded_len(&core.bus.input) - encoded_len(&core.bus.psg);
    let mut bad_channel = saved.clone();
    bad_channel[psg_at] = 9;
    assert!(matches!(
        core.load_state(bad_channel.as_slice()),
        Err(StateError::Corrupt(_))
    ));

    // Color table address follows the VCE control byte.
    let vce_at = encoded_len(&core.driver) + 1 + encoded_len(&core.bus.mmu);
    let mut bad_address = saved.clone();
    bad_address[vce_at + 1] = 0xFF;
    bad_address[vce_at + 2] = 0xFF;
    assert!(matches!(
        core.load_state(bad_address.as_slice()),
        Err(StateError::Corrupt(_))
    ));

    assert_eq!(core.state_body().expect("body"), before);
    core.bus.write(0x0802, 0x34);
    core.bus.write(0x0404, 0x01);
    run_frames(&mut core, 1);
}

#[test]
fn screenshot_travels_with_the_state() {
    let mut core = core_with(&spin_rom());
    let pixels = [1u8, 2, 3, 4];
    let mut saved = Vec::new();
    core.save_state_with_screenshot(
        &mut saved,
        Some(Screenshot {
            width: 2,
            height: 1,
            data: &pixels,
        }),
    )
    .expect("save");

    let (header, data) = read_screenshot(&saved).expect("header").expect("screenshot");
    assert_eq!((header.screenshot_width, header.screenshot_height), (2, 1));
    assert_eq!(data, &pixels);
    core.load_state(saved.as_slice()).expect("load");
}

#[test]
fn backup_ram_survives_reset_and_is_host_loadable() {
    let mut core = core_with(&spin_rom());
    core.load_backup_ram(&[0x48, 0x55, 0x42, 0x4D]);
    core.reset();
    assert_eq!(&core.backup_ram()[..4], b"HUBM");
}
