mod io;
mod mmu;
mod rom;
mod types;
mod video;


pub use mmu::{BankKind, Mmu, BRAM_PAGE, BRAM_SIZE, HARDWARE_PAGE, MPR_COUNT, PAGE_SIZE, RAM_PAGE};
pub use rom::{HuCard, Mapper};
pub use types::Transient;
pub use video::{SuperGrafx, Video};

use crate::config::CoreConfig;
use crate::cpu::{CpuBus, InterruptController, Timer};
use crate::input::Input;
use crate::psg::Psg;
use crate::vce::Vce;

const HW_VDC_BASE: usize = 0x0000;
const HW_VCE_BASE: usize = 0x0400;
const HW_PSG_BASE: usize = 0x0800;
const HW_TIMER_BASE: usize = 0x0C00;
const HW_JOYPAD_BASE: usize = 0x1000;
const HW_IRQ_BASE: usize = 0x1400;
const HW_CDROM_BASE: usize = 0x1800;
const BRAM_LOCK_PORT: usize = 0x1803;
const BRAM_UNLOCK_PORT: usize = 0x1807;

/// CD-ROM unit plugged into the hardware page at 0x1800-0x1BFF. Offsets
/// passed in are relative to that window.
pub trait CdRomPort: Send {
    fn read(&mut self, offset: u16) -> u8;
    fn write(&mut self, offset: u16, value: u8);
    /// Level of the drive's combined interrupt output, wired to IRQ2.
    fn irq_asserted(&self) -> bool;
}

/// Logical address touched by an instruction that matched a watchpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchHit {
    pub addr: u16,
    pub write: bool,
}

#[derive(Debug, Default)]
struct Watchpoints {
    enabled: bool,
    reads: Vec<u16>,
    writes: Vec<u16>,
    hit: Option<WatchHit>,
}

/// The machine around the CPU: memory map, video, sound, timer,
/// interrupt controller and peripherals. Components talk to each other
/// only through the methods called here.
pub struct Bus {
    pub mmu: Mmu,
    pub vce: Vce,
    pub video: Video,
    pub timer: Timer,
    pub irq: InterruptController,
    pub psg: Psg,
    pub input: Input,
    pub(crate) io_buffer: u8,
    rom: HuCard,
    cdrom: Option<Box<dyn CdRomPort>>,
    stall_cycles: u32,
    watch: Watchpoints,
}

impl Bus {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            mmu: Mmu::new(config.is_sgx(), config.backup_ram),
            vce: Vce::new(config),
            video: Video::new(config.is_sgx(), config.no_sprite_limit),
            timer: Timer::new(),
            irq: InterruptController::new(),
            psg: Psg::new(),
            input: Input::new(config),
            io_buffer: 0xFF,
            rom: HuCard::default(),
            cdrom: None,
            stall_cycles: 0,
            watch: Watchpoints::default(),
        }
    }

    pub fn reset(&mut self) {
        self.mmu.reset();
        self.vce.reset();
        self.video.reset();
        self.timer.reset();
        self.irq.reset();
        self.psg.reset();
        self.input.reset();
        self.io_buffer = 0xFF;
        self.stall_cycles = 0;
        self.watch.hit = None;
    }

    pub fn rom(&self) -> &HuCard {
        &self.rom
    }

    pub fn insert_rom(&mut self, rom: HuCard) {
        self.rom = rom;
        self.mmu.set_rom_window(0);
    }

    pub fn attach_cdrom(&mut self, port: Option<Box<dyn CdRomPort>>) {
        self.cdrom = port;
    }

    pub fn translate(&self, addr: u16) -> u32 {
        self.mmu.translate(addr)
    }

    /// Refresh the level-triggered IRQ inputs from their sources.
    pub fn update_irq_lines(&mut self) {
        self.irq.set_irq1(self.video.irq_asserted());
        let cd = self.cdrom.as_ref().is_some_and(|port| port.irq_asserted());
        self.irq.set_irq2(cd);
    }

    pub fn set_watchpoints(&mut self, enabled: bool, reads: Vec<u16>, writes: Vec<u16>) {
        self.watch.enabled = enabled && (!reads.is_empty() || !writes.is_empty());
        self.watch.reads = reads;
        self.watch.writes = writes;
        self.watch.hit = None;
    }

    pub fn take_watch_hit(&mut self) -> Option<WatchHit> {
        self.watch.hit.take()
    }

    fn check_watch(&mut self, addr: u16, write: bool) {
        if !self.watch.enabled || self.watch.hit.is_some() {
            return;
        }
        let list = if write { &self.watch.writes } else { &self.watch.reads };
        if list.contains(&addr) {
            self.watch.hit = Some(WatchHit { addr, write });
        }
    }

    /// Read a physical address without side effects on hardware registers.
    pub fn peek_physical(&self, physical: u32) -> u8 {
        let bank = (physical >> 13) as u8;
        let offset = physical as usize & (PAGE_SIZE - 1);
        match self.mmu.bank_kind(bank) {
            BankKind::Rom => self.rom.read(bank, offset, self.mmu.rom_window()).unwrap_or(0xFF),
            BankKind::BackupRam => self.mmu.read_bram(offset),
            BankKind::WorkRam(page) => self.mmu.read_ram(page, offset),
            BankKind::Hardware | BankKind::Unmapped => 0xFF,
        }
    }

    fn read_mapped(&mut self, addr: u16, block: bool) -> u8 {
        self.check_watch(addr, false);
        let bank = self.mmu.mpr((addr >> 13) as usize);
        let offset = addr as usize & (PAGE_SIZE - 1);
        match self.mmu.bank_kind(bank) {
            BankKind::Rom => match self.rom.read(bank, offset, self.mmu.rom_window()) {
                Some(value) => value,
                None => {
                    self.mmu.report_unmapped(bank, addr, false);
                    0xFF
                }
            },
            BankKind::BackupRam => self.mmu.read_bram(offset),
            BankKind::WorkRam(page) => self.mmu.read_ram(page, offset),
            BankKind::Hardware => self.read_hardware(offset, block),
            BankKind::Unmapped => {
                self.mmu.report_unmapped(bank, addr, false);
                0xFF
            }
        }
    }

    fn write_mapped(&mut self, addr: u16, value: u8) {
        self.check_watch(addr, true);
        let bank = self.mmu.mpr((addr >> 13) as usize);
        let offset = addr as usize & (PAGE_SIZE - 1);
        match self.mmu.bank_kind(bank) {
            BankKind::Rom => {
                if let Some(window) = self.rom.window_select(offset) {
                    self.mmu.set_rom_window(window);
                }
            }
            BankKind::BackupRam => self.mmu.write_bram(offset, value),
            BankKind::WorkRam(page) => self.mmu.write_ram(page, offset, value),
            BankKind::Hardware => self.write_hardware(offset, value),
            BankKind::Unmapped => self.mmu.report_unmapped(bank, addr, true),
        }
    }
}

impl CpuBus for Bus {
    fn read(&mut self, addr: u16) -> u8 {
        self.read_mapped(addr, false)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.write_mapped(addr, value);
    }

    fn read_block(&mut self, addr: u16) -> u8 {
        self.read_mapped(addr, true)
    }

    fn mpr(&self, index: usize) -> u8 {
        self.mmu.mpr(index)
    }

    fn set_mpr(&mut self, index: usize, value: u8) {
        self.mmu.set_mpr(index, value);
    }

    fn write_st_port(&mut self, port: usize, value: u8) {
        self.stall_cycles += 1;
        self.video.st_target().write_port(port as u16, value);
    }

    fn pending_interrupts(&self) -> u8 {
        self.irq.pending()
    }

    fn take_stall_cycles(&mut self) -> u32 {
        std::mem::take(&mut self.stall_cycles)
    }
}
