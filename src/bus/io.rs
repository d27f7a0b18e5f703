use tracing::{debug, trace};

use super::{
    Bus, BRAM_LOCK_PORT, BRAM_UNLOCK_PORT, HW_CDROM_BASE, HW_IRQ_BASE, HW_JOYPAD_BASE, HW_PSG_BASE,
    HW_TIMER_BASE, HW_VCE_BASE, HW_VDC_BASE,
};

/// IRQ controller register offsets inside its window.
const IRQ_DISABLE_PORT: usize = 0x02;
const IRQ_REQUEST_PORT: usize = 0x03;
/// Bits of the I/O buffer that survive a partial register read.
const TIMER_BUFFER_MASK: u8 = 0x80;
const IRQ_BUFFER_MASK: u8 = 0xF8;
const CDROM_WINDOW: usize = 0x03FF;

/// Hardware-page devices, decoded from bits 10-12 of the offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum HardwarePort {
    Vdc,
    Vce,
    Psg,
    Timer,
    Joypad,
    Irq,
    CdRom,
    Unused,
}

impl HardwarePort {
    pub(super) fn decode(offset: usize) -> Self {
        match offset & 0x1C00 {
            HW_VDC_BASE => HardwarePort::Vdc,
            HW_VCE_BASE => HardwarePort::Vce,
            HW_PSG_BASE => HardwarePort::Psg,
            HW_TIMER_BASE => HardwarePort::Timer,
            HW_JOYPAD_BASE => HardwarePort::Joypad,
            HW_IRQ_BASE => HardwarePort::Irq,
            HW_CDROM_BASE => HardwarePort::CdRom,
            _ => HardwarePort::Unused,
        }
    }
}

impl Bus {
    /// Read from bank 0xFF. `block` suppresses I/O buffer updates.
    pub(super) fn read_hardware(&mut self, offset: usize, block: bool) -> u8 {
        let offset = offset & 0x1FFF;
        match HardwarePort::decode(offset) {
            HardwarePort::Vdc => {
                self.stall_cycles += 1;
                self.video.read_port(offset as u16)
            }
            HardwarePort::Vce => {
                self.stall_cycles += 1;
                self.vce.read_port(offset as u16)
            }
            // The PSG is write-only; reads see the bus latch.
            HardwarePort::Psg => self.io_buffer,
            HardwarePort::Timer => {
                let value = self.timer.counter() | (self.io_buffer & TIMER_BUFFER_MASK);
                self.latch(value, block)
            }
            HardwarePort::Joypad => {
                let value = self.input.read();
                self.latch(value, block)
            }
            HardwarePort::Irq => {
                let value = match offset & 0x03 {
                    IRQ_DISABLE_PORT => self.irq.disable_mask() | (self.io_buffer & IRQ_BUFFER_MASK),
                    IRQ_REQUEST_PORT => self.irq.request() | (self.io_buffer & IRQ_BUFFER_MASK),
                    _ => self.io_buffer,
                };
                self.latch(value, block)
            }
            HardwarePort::CdRom => {
                if offset == BRAM_LOCK_PORT {
                    self.mmu.set_bram_unlocked(false);
                }
                match self.cdrom.as_mut() {
                    Some(port) => port.read((offset & CDROM_WINDOW) as u16),
                    None => 0xFF,
                }
            }
            HardwarePort::Unused => {
                debug!(offset, "read from unused hardware offset");
                0xFF
            }
        }
    }

    pub(super) fn write_hardware(&mut self, offset: usize, value: u8) {
        let offset = offset & 0x1FFF;
        trace!(offset, value, "hardware write");
        match HardwarePort::decode(offset) {
            HardwarePort::Vdc => {
                self.stall_cycles += 1;
                self.video.write_port(offset as u16, value);
            }
            HardwarePort::Vce => {
                self.stall_cycles += 1;
                self.vce.write_port(offset as u16, value);
            }
            HardwarePort::Psg => {
                self.io_buffer = value;
                self.psg.write(offset as u16, value);
            }
            HardwarePort::Timer => {
                self.io_buffer = value;
                if offset & 0x01 == 0 {
                    self.timer.write_reload(value);
                } else {
                    self.timer.write_control(value);
                }
            }
            HardwarePort::Joypad => {
                self.io_buffer = value;
                self.input.write(value);
            }
            HardwarePort::Irq => {
                self.io_buffer = value;
                match offset & 0x03 {
                    IRQ_DISABLE_PORT => self.irq.write_disable(value),
                    IRQ_REQUEST_PORT => self.irq.acknowledge_timer(),
                    _ => debug!(offset, value, "write to undefined interrupt register"),
                }
            }
            HardwarePort::CdRom => {
                if offset == BRAM_UNLOCK_PORT && value & 0x80 != 0 {
                    self.mmu.set_bram_unlocked(true);
                }
                match self.cdrom.as_mut() {
                    Some(port) => port.write((offset & CDROM_WINDOW) as u16, value),
                    None => debug!(offset, value, "CD-ROM write without a drive"),
                }
            }
            HardwarePort::Unused => debug!(offset, value, "write to unused hardware offset"),
        }
    }

    fn latch(&mut self, value: u8, block: bool) -> u8 {
        if !block {
            self.io_buffer = value;
        }
        value
    }
}
