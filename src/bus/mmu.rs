use tracing::warn;

use super::types::Transient;

pub const PAGE_SIZE: usize = 0x2000;
pub const MPR_COUNT: usize = 8;

pub const BRAM_PAGE: u8 = 0xF7;
pub const BRAM_SIZE: usize = 0x0800;
pub const RAM_PAGE: u8 = 0xF8;
pub const HARDWARE_PAGE: u8 = 0xFF;
/// Work RAM pages: one on the PC Engine, four on the SuperGrafx.
const RAM_PAGES_PCE: usize = 1;
const RAM_PAGES_SGX: usize = 4;

/// What a physical bank number selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BankKind {
    Rom,
    BackupRam,
    WorkRam(usize),
    Hardware,
    Unmapped,
}

/// The eight page registers plus the RAM they can map.
#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Mmu {
    mpr: [u8; MPR_COUNT],
    ram: Vec<u8>,
    bram: Vec<u8>,
    bram_enabled: bool,
    bram_unlocked: bool,
    /// Current 512 KiB window of the Street Fighter II mapper.
    rom_window: u8,
    /// Banks already reported as unmapped, one bit per bank.
    warned: Transient<[u64; 4]>,
}

impl Mmu {
    pub fn new(sgx: bool, bram_enabled: bool) -> Self {
        let pages = if sgx { RAM_PAGES_SGX } else { RAM_PAGES_PCE };
        Self {
            mpr: [HARDWARE_PAGE, RAM_PAGE, 0, 0, 0, 0, 0, 0],
            ram: vec![0; pages * PAGE_SIZE],
            bram: vec![0; BRAM_SIZE],
            bram_enabled,
            bram_unlocked: false,
            rom_window: 0,
            warned: Transient::default(),
        }
    }

    /// Clear RAM and the page registers. Backup RAM survives.
    pub fn reset(&mut self) {
        self.mpr = [HARDWARE_PAGE, RAM_PAGE, 0, 0, 0, 0, 0, 0];
        self.ram.fill(0);
        self.bram_unlocked = false;
        self.rom_window = 0;
        self.warned.0 = [0; 4];
    }

    /// Check a decoded state against the console model it is restored into.
    pub(crate) fn validate(&self, sgx: bool) -> Result<(), &'static str> {
        let pages = if sgx { RAM_PAGES_SGX } else { RAM_PAGES_PCE };
        if self.ram.len() != pages * PAGE_SIZE {
            return Err("work ram size mismatch");
        }
        if self.bram.len() != BRAM_SIZE {
            return Err("backup ram size mismatch");
        }
        Ok(())
    }

    pub fn mpr(&self, index: usize) -> u8 {
        self.mpr[index & (MPR_COUNT - 1)]
    }

    pub fn set_mpr(&mut self, index: usize, value: u8) {
        self.mpr[index & (MPR_COUNT - 1)] = value;
    }

    pub fn mprs(&self) -> [u8; MPR_COUNT] {
        self.mpr
    }

    /// 21-bit physical address for a logical CPU address.
    pub fn translate(&self, addr: u16) -> u32 {
        let bank = self.mpr[(addr >> 13) as usize] as u32;
        (bank << 13) | (addr as u32 & 0x1FFF)
    }

    pub fn bank_kind(&self, bank: u8) -> BankKind {
        match bank {
            0x00..=0x7F => BankKind::Rom,
            BRAM_PAGE if self.bram_enabled => BankKind::BackupRam,
            0xF8..=0xFB => {
                let page = (bank - RAM_PAGE) as usize;
                if page * PAGE_SIZE < self.ram.len() {
                    BankKind::WorkRam(page)
                } else if self.ram.len() == PAGE_SIZE {
                    // The PC Engine mirrors its single page over F8-FB.
                    BankKind::WorkRam(0)
                } else {
                    BankKind::Unmapped
                }
            }
            HARDWARE_PAGE => BankKind::Hardware,
            _ => BankKind::Unmapped,
        }
    }

    pub fn read_ram(&self, page: usize, offset: usize) -> u8 {
        self.ram[page * PAGE_SIZE + (offset & (PAGE_SIZE - 1))]
    }

    pub fn write_ram(&mut self, page: usize, offset: usize, value: u8) {
        self.ram[page * PAGE_SIZE + (offset & (PAGE_SIZE - 1))] = value;
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn read_bram(&self, offset: usize) -> u8 {
        if self.bram_unlocked {
            self.bram[offset & (BRAM_SIZE - 1)]
        } else {
            0xFF
        }
    }

    pub fn write_bram(&mut self, offset: usize, value: u8) {
        if self.bram_unlocked {
            self.bram[offset & (BRAM_SIZE - 1)] = value;
        }
    }

    pub fn bram(&self) -> &[u8] {
        &self.bram
    }

    pub fn load_bram(&mut self, data: &[u8]) {
        let count = data.len().min(BRAM_SIZE);
        self.bram[..count].copy_from_slice(&data[..count]);
    }

    pub fn bram_unlocked(&self) -> bool {
        self.bram_unlocked
    }

    pub fn set_bram_unlocked(&mut self, unlocked: bool) {
        self.bram_unlocked = unlocked;
    }

    pub fn rom_window(&self) -> u8 {
        self.rom_window
    }

    pub fn set_rom_window(&mut self, window: u8) {
        self.rom_window = window;
    }

    /// Log an access to an unmapped bank the first time it is seen.
    pub fn report_unmapped(&mut self, bank: u8, addr: u16, write: bool) {
        let (word, bit) = ((bank >> 6) as usize, bank & 0x3F);
        if self.warned.0[word] & (1 << bit) == 0 {
            self.warned.0[word] |= 1 << bit;
            warn!(bank, addr, write, "access to unmapped bank");
        }
    }
}
