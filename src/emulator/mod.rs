mod debug;
mod hucard;
mod state;

#[cfg(test)]
mod tests;

pub use debug::{BreakReason, Breakpoint, CoreControl};
pub use hucard::{RomInfo, ROM_NAME_LEN};
pub use state::{read_screenshot, Screenshot, StateHeader, STATE_HEADER_SIZE, STATE_MAGIC, STATE_VERSION};

use tracing::info;

use crate::bus::{Bus, CdRomPort};
use crate::config::{CoreConfig, PixelFormat, SystemKind};
use crate::cpu::Cpu;
use crate::error::RomError;
use crate::input::Key;
use crate::psg::{MASTER_CLOCKS_PER_PSG_CLOCK, SAMPLE_BUFFER_CAPACITY};
use debug::Debugger;
use hucard::ParsedHuCard;

/// Upper bound of interleaved samples `run_until_frame` writes.
pub const AUDIO_BUFFER_SIZE: usize = SAMPLE_BUFFER_CAPACITY;

/// Scheduler bookkeeping that belongs in a save state.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub(crate) struct DriverState {
    /// Master clocks not yet handed to the PSG.
    psg_clock_phase: u32,
    frames: u64,
}

/// What one call to [`Core::run_until_frame`] produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameResult {
    /// Interleaved i16 values written to the audio buffer.
    pub samples: usize,
    pub frame_completed: bool,
    pub breakpoint: Option<BreakReason>,
}

impl FrameResult {
    pub fn hit_breakpoint(&self) -> bool {
        self.breakpoint.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub width: usize,
    pub height: usize,
    pub lines_per_frame: u16,
    pub pixel_format: PixelFormat,
    pub system: SystemKind,
    pub frame_count: u64,
}

/// A complete console: CPU plus [`Bus`], driven one frame at a time.
pub struct Core {
    config: CoreConfig,
    pub cpu: Cpu,
    pub bus: Bus,
    driver: DriverState,
    rom: Option<RomInfo>,
    debugger: Debugger,
    control: CoreControl,
}

impl Core {
    pub fn new(config: CoreConfig) -> Self {
        let mut core = Self {
            cpu: Cpu::new(),
            bus: Bus::new(&config),
            config,
            driver: DriverState::default(),
            rom: None,
            debugger: Debugger::default(),
            control: CoreControl::default(),
        };
        core.reset();
        core
    }

    pub fn with_pixel_format(pixel_format: PixelFormat) -> Self {
        Self::new(CoreConfig::new(pixel_format))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn rom_info(&self) -> Option<&RomInfo> {
        self.rom.as_ref()
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        self.driver = DriverState::default();
        info!(system = ?self.config.system, pc = self.cpu.pc, "core reset");
    }

    /// Insert a HuCard image and reset. A rejected image leaves the core as
    /// it was.
    pub fn load_rom(&mut self, name: &str, image: &[u8]) -> Result<RomInfo, RomError> {
        let ParsedHuCard { card, info } = ParsedHuCard::from_bytes(name, image)?;
        self.bus.insert_rom(card);
        self.rom = Some(info.clone());
        self.reset();
        Ok(info)
    }

    pub fn attach_cdrom(&mut self, port: Option<Box<dyn CdRomPort>>) {
        self.bus.attach_cdrom(port);
    }

    /// Run until the VCE finishes a frame, a breakpoint hits, or the core
    /// is paused. Pixels go to `frame` in the configured format; buffered
    /// audio is drained into `audio`.
    pub fn run_until_frame(&mut self, frame: &mut [u8], audio: &mut [i16]) -> FrameResult {
        let mut breakpoint = None;
        let mut frame_completed = false;

        while !self.control.is_paused() {
            if self.control.take_break_request() {
                breakpoint = Some(BreakReason::Requested);
                break;
            }
            if let Some(reason) = self.debugger.check_pc(self.cpu.pc) {
                breakpoint = Some(reason);
                break;
            }

            let clocks = self.cpu.step(&mut self.bus);
            frame_completed = self.advance_devices(clocks, frame);

            if self.debugger.enabled {
                if let Some(hit) = self.bus.take_watch_hit() {
                    breakpoint = Some(hit.into());
                } else if let Some(interrupt) = self.cpu.last_interrupt() {
                    if self.debugger.breaks_on_irq() {
                        breakpoint = Some(BreakReason::Irq(interrupt));
                    }
                }
            }
            if frame_completed || breakpoint.is_some() {
                break;
            }
        }

        let samples = self.bus.psg.drain(audio);
        FrameResult {
            samples,
            frame_completed,
            breakpoint,
        }
    }

    /// Hand the master clocks of one instruction to every clocked device.
    /// Returns true when the VCE wrapped to a new frame.
    fn advance_devices(&mut self, clocks: u32, frame: &mut [u8]) -> bool {
        if self.bus.timer.tick(clocks) {
            self.bus.irq.raise_timer();
        }

        let bus = &mut self.bus;
        let frame_done = bus.vce.tick(clocks, &mut bus.video, frame);

        let phase = self.driver.psg_clock_phase + clocks;
        self.bus.psg.tick(phase / MASTER_CLOCKS_PER_PSG_CLOCK);
        self.driver.psg_clock_phase = phase % MASTER_CLOCKS_PER_PSG_CLOCK;

        self.bus.update_irq_lines();
        if frame_done {
            self.driver.frames += 1;
        }
        frame_done
    }

    pub fn key_event(&mut self, pad: usize, key: Key, pressed: bool) {
        self.bus.input.key_event(pad, key, pressed);
    }

    pub fn pause(&mut self, paused: bool) {
        self.control.pause(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Handle for pausing or breaking from another thread.
    pub fn control(&self) -> CoreControl {
        self.control.clone()
    }

    pub fn runtime_info(&self) -> RuntimeInfo {
        RuntimeInfo {
            width: self.bus.vce.frame_width(),
            height: self.bus.vce.frame_height(),
            lines_per_frame: self.bus.vce.lines_per_frame(),
            pixel_format: self.bus.vce.pixel_format(),
            system: self.config.system,
            frame_count: self.driver.frames,
        }
    }

    pub fn translate(&self, addr: u16) -> u32 {
        self.bus.translate(addr)
    }

    pub fn backup_ram(&self) -> &[u8] {
        self.bus.mmu.bram()
    }

    pub fn load_backup_ram(&mut self, data: &[u8]) {
        self.bus.mmu.load_bram(data);
    }

    pub fn enable_breakpoints(&mut self, enabled: bool) {
        self.debugger.enabled = enabled;
        self.sync_watchpoints();
    }

    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) -> bool {
        let added = self.debugger.add(breakpoint);
        self.sync_watchpoints();
        added
    }

    pub fn remove_breakpoint(&mut self, breakpoint: Breakpoint) -> bool {
        let removed = self.debugger.remove(breakpoint);
        self.sync_watchpoints();
        removed
    }

    pub fn clear_breakpoints(&mut self) {
        self.debugger.clear();
        self.sync_watchpoints();
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        self.debugger.breakpoints()
    }

    fn sync_watchpoints(&mut self) {
        let (reads, writes) = self.debugger.watched();
        self.bus.set_watchpoints(self.debugger.enabled, reads, writes);
    }
}
