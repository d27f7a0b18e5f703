mod instructions;
mod irq;
mod tables;
mod timer;


pub use irq::{InterruptController, IRQ_IRQ1, IRQ_IRQ2, IRQ_TIMER};
pub use tables::{HIGH_SPEED_DIVIDER, LOW_SPEED_DIVIDER};
pub use timer::{Timer, TIMER_CLOCK_DIVIDER};

use tables::{base_cycles, is_undefined, BRANCH_TAKEN_PENALTY, INTERRUPT_CYCLES};
use tracing::debug;

pub const FLAG_CARRY: u8 = 0b0000_0001;
pub const FLAG_ZERO: u8 = 0b0000_0010;
pub const FLAG_INTERRUPT_DISABLE: u8 = 0b0000_0100;
pub const FLAG_DECIMAL: u8 = 0b0000_1000;
pub const FLAG_BREAK: u8 = 0b0001_0000;
pub const FLAG_T: u8 = 0b0010_0000;
pub const FLAG_OVERFLOW: u8 = 0b0100_0000;
pub const FLAG_NEGATIVE: u8 = 0b1000_0000;

const VECTOR_IRQ2_BRK: u16 = 0xFFF6;
const VECTOR_IRQ1: u16 = 0xFFF8;
const VECTOR_TIMER: u16 = 0xFFFA;
const VECTOR_NMI: u16 = 0xFFFC;
const VECTOR_RESET: u16 = 0xFFFE;

/// Logical base of the zero page and the stack page (both reached through MPR1).
pub(crate) const ZERO_PAGE_BASE: u16 = 0x2000;
pub(crate) const STACK_BASE: u16 = 0x2100;

/// Everything the HuC6280 core needs from the machine around it.
///
/// Addresses are logical (pre-MMU); the implementor owns the page registers
/// and decides what lives behind each bank.
pub trait CpuBus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);

    /// Read issued by a block-transfer opcode. I/O buffer side effects are
    /// suppressed.
    fn read_block(&mut self, addr: u16) -> u8 {
        self.read(addr)
    }

    fn write_block(&mut self, addr: u16, value: u8) {
        self.write(addr, value)
    }

    fn mpr(&self, index: usize) -> u8;
    fn set_mpr(&mut self, index: usize, value: u8);

    /// ST0/ST1/ST2: direct store to VDC port 0, 2 or 3.
    fn write_st_port(&mut self, port: usize, value: u8);

    /// Interrupt request bits ([`IRQ_IRQ2`], [`IRQ_IRQ1`], [`IRQ_TIMER`]) not
    /// masked by the disable register.
    fn pending_interrupts(&self) -> u8;

    /// CPU cycles of stall injected by slow device accesses since the last call.
    fn take_stall_cycles(&mut self) -> u32 {
        0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum Interrupt {
    Nmi,
    Timer,
    Irq1,
    Irq2,
}

impl Interrupt {
    pub fn vector(self) -> u16 {
        match self {
            Interrupt::Nmi => VECTOR_NMI,
            Interrupt::Timer => VECTOR_TIMER,
            Interrupt::Irq1 => VECTOR_IRQ1,
            Interrupt::Irq2 => VECTOR_IRQ2_BRK,
        }
    }
}

/// Registers reachable through [`Cpu::read_register`] / [`Cpu::write_register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuRegister {
    A,
    X,
    Y,
    S,
    P,
    PcLow,
    PcHigh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndexedIndirect,
    IndirectIndexed,
    ZeroPageIndirect,
}

impl Mode {
    /// Operand layout of the ORA/AND/EOR/ADC/STA/LDA/CMP/SBC column group.
    fn group_one(opcode: u8) -> Mode {
        match opcode & 0x1F {
            0x01 => Mode::IndexedIndirect,
            0x05 => Mode::ZeroPage,
            0x0D => Mode::Absolute,
            0x11 => Mode::IndirectIndexed,
            0x12 => Mode::ZeroPageIndirect,
            0x15 => Mode::ZeroPageX,
            0x19 => Mode::AbsoluteY,
            0x1D => Mode::AbsoluteX,
            _ => Mode::Immediate,
        }
    }

    /// Operand layout of the shift/rotate/INC/DEC memory forms.
    fn read_modify_write(opcode: u8) -> Mode {
        match opcode & 0x1F {
            0x06 => Mode::ZeroPage,
            0x16 => Mode::ZeroPageX,
            0x0E => Mode::Absolute,
            _ => Mode::AbsoluteX,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockMode {
    Tii,
    Tdd,
    Tin,
    Tia,
    Tai,
}

/// HuC6280 CPU core: a 65C02 derivative with an MMU, block transfers,
/// the memory-operation (T) flag and a selectable 1.79/7.16 MHz clock.
#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Cpu {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub clock_high_speed: bool,
    nmi_pending: bool,
    mpr_buffer: u8,
    last_opcode: u8,
    last_interrupt: Option<Interrupt>,
    master_clocks: u64,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFF,
            pc: 0,
            status: FLAG_INTERRUPT_DISABLE,
            clock_high_speed: false,
            nmi_pending: false,
            mpr_buffer: 0,
            last_opcode: 0,
            last_interrupt: None,
            master_clocks: 0,
        }
    }

    /// Power-on/reset sequence. Registers take fixed values; MPR7 maps bank
    /// 0 so the reset vector is fetched from the first ROM bank.
    pub fn reset<B: CpuBus>(&mut self, bus: &mut B) {
        *self = Self::new();
        bus.set_mpr(0, 0xFF);
        bus.set_mpr(1, 0xF8);
        for index in 2..8 {
            bus.set_mpr(index, 0x00);
        }
        self.pc = self.read_vector(bus, VECTOR_RESET);
    }

    pub fn read_register(&self, register: CpuRegister) -> u8 {
        match register {
            CpuRegister::A => self.a,
            CpuRegister::X => self.x,
            CpuRegister::Y => self.y,
            CpuRegister::S => self.sp,
            CpuRegister::P => self.status,
            CpuRegister::PcLow => self.pc as u8,
            CpuRegister::PcHigh => (self.pc >> 8) as u8,
        }
    }

    pub fn write_register(&mut self, register: CpuRegister, value: u8) {
        match register {
            CpuRegister::A => self.a = value,
            CpuRegister::X => self.x = value,
            CpuRegister::Y => self.y = value,
            CpuRegister::S => self.sp = value,
            CpuRegister::P => self.status = value,
            CpuRegister::PcLow => self.pc = (self.pc & 0xFF00) | value as u16,
            CpuRegister::PcHigh => self.pc = (self.pc & 0x00FF) | ((value as u16) << 8),
        }
    }

    pub fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }

    pub fn flag(&self, flag: u8) -> bool {
        self.status & flag != 0
    }

    pub fn last_opcode(&self) -> u8 {
        self.last_opcode
    }

    /// Interrupt accepted by the most recent `step`, if any.
    pub fn last_interrupt(&self) -> Option<Interrupt> {
        self.last_interrupt
    }

    /// Master clocks consumed since reset.
    pub fn master_clocks(&self) -> u64 {
        self.master_clocks
    }

    pub fn clock_divider(&self) -> u32 {
        if self.clock_high_speed {
            HIGH_SPEED_DIVIDER
        } else {
            LOW_SPEED_DIVIDER
        }
    }

    /// Execute one instruction (or interrupt entry) and return its cost in
    /// master clocks, device stalls included.
    pub fn step<B: CpuBus>(&mut self, bus: &mut B) -> u32 {
        let divider = self.clock_divider();
        let cycles = self.execute(bus) + bus.take_stall_cycles();
        let clocks = cycles * divider;
        self.master_clocks += clocks as u64;
        clocks
    }

    /// Execute one instruction and return its cost in CPU cycles.
    pub fn execute<B: CpuBus>(&mut self, bus: &mut B) -> u32 {
        self.last_interrupt = None;
        if let Some(interrupt) = self.accepted_interrupt(bus) {
            return self.enter_interrupt(bus, interrupt);
        }

        let opcode = self.fetch_byte(bus);
        self.last_opcode = opcode;
        // T applies to the instruction right after SET and nothing else.
        let t_mode = self.flag(FLAG_T);
        self.set_flag(FLAG_T, false);

        base_cycles(opcode) + self.dispatch(bus, opcode, t_mode)
    }

    fn accepted_interrupt<B: CpuBus>(&mut self, bus: &mut B) -> Option<Interrupt> {
        if self.nmi_pending {
            self.nmi_pending = false;
            return Some(Interrupt::Nmi);
        }
        if self.flag(FLAG_INTERRUPT_DISABLE) {
            return None;
        }
        let pending = bus.pending_interrupts();
        if pending & IRQ_TIMER != 0 {
            Some(Interrupt::Timer)
        } else if pending & IRQ_IRQ1 != 0 {
            Some(Interrupt::Irq1)
        } else if pending & IRQ_IRQ2 != 0 {
            Some(Interrupt::Irq2)
        } else {
            None
        }
    }

    fn enter_interrupt<B: CpuBus>(&mut self, bus: &mut B, interrupt: Interrupt) -> u32 {
        self.push_word(bus, self.pc);
        self.push_byte(bus, self.status & !FLAG_BREAK);
        self.set_flag(FLAG_INTERRUPT_DISABLE, true);
        self.set_flag(FLAG_DECIMAL, false);
        self.set_flag(FLAG_T, false);
        self.pc = self.read_vector(bus, interrupt.vector());
        self.last_interrupt = Some(interrupt);
        INTERRUPT_CYCLES
    }

    /// Run the opcode body. Returns cycles on top of the table base.
    fn dispatch<B: CpuBus>(&mut self, bus: &mut B, opcode: u8, t_mode: bool) -> u32 {
        match opcode {
            // Loads
            0xA1 | 0xA5 | 0xA9 | 0xAD | 0xB1 | 0xB2 | 0xB5 | 0xB9 | 0xBD => {
                let value = self.read_operand(bus, Mode::group_one(opcode));
                self.a = value;
                self.update_zero_and_negative(value);
                0
            }
            0xA2 | 0xA6 | 0xB6 | 0xAE | 0xBE => {
                let mode = match opcode {
                    0xA2 => Mode::Immediate,
                    0xA6 => Mode::ZeroPage,
                    0xB6 => Mode::ZeroPageY,
                    0xAE => Mode::Absolute,
                    _ => Mode::AbsoluteY,
                };
                self.x = self.read_operand(bus, mode);
                self.update_zero_and_negative(self.x);
                0
            }
            0xA0 | 0xA4 | 0xB4 | 0xAC | 0xBC => {
                let mode = match opcode {
                    0xA0 => Mode::Immediate,
                    0xA4 => Mode::ZeroPage,
                    0xB4 => Mode::ZeroPageX,
                    0xAC => Mode::Absolute,
                    _ => Mode::AbsoluteX,
                };
                self.y = self.read_operand(bus, mode);
                self.update_zero_and_negative(self.y);
                0
            }

            // Stores
            0x81 | 0x85 | 0x8D | 0x91 | 0x92 | 0x95 | 0x99 | 0x9D => {
                let addr = self.effective_address(bus, Mode::group_one(opcode));
                bus.write(addr, self.a);
                0
            }
            0x86 | 0x96 | 0x8E => {
                let mode = match opcode {
                    0x86 => Mode::ZeroPage,
                    0x96 => Mode::ZeroPageY,
                    _ => Mode::Absolute,
                };
                let addr = self.effective_address(bus, mode);
                bus.write(addr, self.x);
                0
            }
            0x84 | 0x94 | 0x8C => {
                let mode = match opcode {
                    0x84 => Mode::ZeroPage,
                    0x94 => Mode::ZeroPageX,
                    _ => Mode::Absolute,
                };
                let addr = self.effective_address(bus, mode);
                bus.write(addr, self.y);
                0
            }
            0x64 | 0x74 | 0x9C | 0x9E => {
                let mode = match opcode {
                    0x64 => Mode::ZeroPage,
                    0x74 => Mode::ZeroPageX,
                    0x9C => Mode::Absolute,
                    _ => Mode::AbsoluteX,
                };
                let addr = self.effective_address(bus, mode);
                bus.write(addr, 0);
                0
            }

            // Accumulator ALU, T-mode capable
            0x01 | 0x05 | 0x09 | 0x0D | 0x11 | 0x12 | 0x15 | 0x19 | 0x1D => {
                let value = self.read_operand(bus, Mode::group_one(opcode));
                self.alu(bus, value, t_mode, Cpu::ora)
            }
            0x21 | 0x25 | 0x29 | 0x2D | 0x31 | 0x32 | 0x35 | 0x39 | 0x3D => {
                let value = self.read_operand(bus, Mode::group_one(opcode));
                self.alu(bus, value, t_mode, Cpu::and)
            }
            0x41 | 0x45 | 0x49 | 0x4D | 0x51 | 0x52 | 0x55 | 0x59 | 0x5D => {
                let value = self.read_operand(bus, Mode::group_one(opcode));
                self.alu(bus, value, t_mode, Cpu::eor)
            }
            0x61 | 0x65 | 0x69 | 0x6D | 0x71 | 0x72 | 0x75 | 0x79 | 0x7D => {
                let value = self.read_operand(bus, Mode::group_one(opcode));
                let decimal = self.flag(FLAG_DECIMAL) as u32;
                self.alu(bus, value, t_mode, Cpu::adc) + decimal
            }
            0xE1 | 0xE5 | 0xE9 | 0xED | 0xF1 | 0xF2 | 0xF5 | 0xF9 | 0xFD => {
                let value = self.read_operand(bus, Mode::group_one(opcode));
                let decimal = self.flag(FLAG_DECIMAL) as u32;
                self.a = self.sbc(self.a, value);
                decimal
            }

            // Compares
            0xC1 | 0xC5 | 0xC9 | 0xCD | 0xD1 | 0xD2 | 0xD5 | 0xD9 | 0xDD => {
                let value = self.read_operand(bus, Mode::group_one(opcode));
                self.compare(self.a, value);
                0
            }
            0xE0 | 0xE4 | 0xEC => {
                let mode = match opcode {
                    0xE0 => Mode::Immediate,
                    0xE4 => Mode::ZeroPage,
                    _ => Mode::Absolute,
                };
                let value = self.read_operand(bus, mode);
                self.compare(self.x, value);
                0
            }
            0xC0 | 0xC4 | 0xCC => {
                let mode = match opcode {
                    0xC0 => Mode::Immediate,
                    0xC4 => Mode::ZeroPage,
                    _ => Mode::Absolute,
                };
                let value = self.read_operand(bus, mode);
                self.compare(self.y, value);
                0
            }

            // Bit tests
            0x89 | 0x24 | 0x34 | 0x2C | 0x3C => {
                let mode = match opcode {
                    0x89 => Mode::Immediate,
                    0x24 => Mode::ZeroPage,
                    0x34 => Mode::ZeroPageX,
                    0x2C => Mode::Absolute,
                    _ => Mode::AbsoluteX,
                };
                let value = self.read_operand(bus, mode);
                self.bit(value);
                0
            }
            0x04 | 0x0C | 0x14 | 0x1C => {
                let mode = if opcode & 0x08 != 0 {
                    Mode::Absolute
                } else {
                    Mode::ZeroPage
                };
                let addr = self.effective_address(bus, mode);
                if opcode & 0x10 == 0 {
                    self.tsb(bus, addr);
                } else {
                    self.trb(bus, addr);
                }
                0
            }
            0x83 | 0xA3 | 0x93 | 0xB3 => {
                let mask = self.fetch_byte(bus);
                let mode = match opcode {
                    0x83 => Mode::ZeroPage,
                    0xA3 => Mode::ZeroPageX,
                    0x93 => Mode::Absolute,
                    _ => Mode::AbsoluteX,
                };
                let addr = self.effective_address(bus, mode);
                let value = bus.read(addr);
                self.tst(mask, value);
                0
            }

            // Shifts, rotates, increments on memory
            0x06 | 0x16 | 0x0E | 0x1E => {
                let addr = self.effective_address(bus, Mode::read_modify_write(opcode));
                self.modify(bus, addr, Cpu::asl);
                0
            }
            0x26 | 0x36 | 0x2E | 0x3E => {
                let addr = self.effective_address(bus, Mode::read_modify_write(opcode));
                self.modify(bus, addr, Cpu::rol);
                0
            }
            0x46 | 0x56 | 0x4E | 0x5E => {
                let addr = self.effective_address(bus, Mode::read_modify_write(opcode));
                self.modify(bus, addr, Cpu::lsr);
                0
            }
            0x66 | 0x76 | 0x6E | 0x7E => {
                let addr = self.effective_address(bus, Mode::read_modify_write(opcode));
                self.modify(bus, addr, Cpu::ror);
                0
            }
            0xE6 | 0xF6 | 0xEE | 0xFE => {
                let addr = self.effective_address(bus, Mode::read_modify_write(opcode));
                self.modify(bus, addr, Cpu::increment);
                0
            }
            0xC6 | 0xD6 | 0xCE | 0xDE => {
                let addr = self.effective_address(bus, Mode::read_modify_write(opcode));
                self.modify(bus, addr, Cpu::decrement);
                0
            }

            // Accumulator and index register arithmetic
            0x0A => {
                self.a = self.asl(self.a);
                0
            }
            0x2A => {
                self.a = self.rol(self.a);
                0
            }
            0x4A => {
                self.a = self.lsr(self.a);
                0
            }
            0x6A => {
                self.a = self.ror(self.a);
                0
            }
            0x1A => {
                self.a = self.increment(self.a);
                0
            }
            0x3A => {
                self.a = self.decrement(self.a);
                0
            }
            0xE8 => {
                self.x = self.increment(self.x);
                0
            }
            0xC8 => {
                self.y = self.increment(self.y);
                0
            }
            0xCA => {
                self.x = self.decrement(self.x);
                0
            }
            0x88 => {
                self.y = self.decrement(self.y);
                0
            }

            // Register transfers, swaps and clears
            0xAA => {
                self.x = self.a;
                self.update_zero_and_negative(self.x);
                0
            }
            0xA8 => {
                self.y = self.a;
                self.update_zero_and_negative(self.y);
                0
            }
            0x8A => {
                self.a = self.x;
                self.update_zero_and_negative(self.a);
                0
            }
            0x98 => {
                self.a = self.y;
                self.update_zero_and_negative(self.a);
                0
            }
            0xBA => {
                self.x = self.sp;
                self.update_zero_and_negative(self.x);
                0
            }
            0x9A => {
                self.sp = self.x;
                0
            }
            0x02 => {
                std::mem::swap(&mut self.x, &mut self.y);
                0
            }
            0x22 => {
                std::mem::swap(&mut self.a, &mut self.x);
                0
            }
            0x42 => {
                std::mem::swap(&mut self.a, &mut self.y);
                0
            }
            0x62 => {
                self.a = 0;
                0
            }
            0x82 => {
                self.x = 0;
                0
            }
            0xC2 => {
                self.y = 0;
                0
            }

            // Stack
            0x48 => {
                self.push_byte(bus, self.a);
                0
            }
            0xDA => {
                self.push_byte(bus, self.x);
                0
            }
            0x5A => {
                self.push_byte(bus, self.y);
                0
            }
            0x08 => {
                self.push_byte(bus, self.status | FLAG_BREAK);
                0
            }
            0x68 => {
                self.a = self.pop_byte(bus);
                self.update_zero_and_negative(self.a);
                0
            }
            0xFA => {
                self.x = self.pop_byte(bus);
                self.update_zero_and_negative(self.x);
                0
            }
            0x7A => {
                self.y = self.pop_byte(bus);
                self.update_zero_and_negative(self.y);
                0
            }
            0x28 => {
                self.status = self.pop_byte(bus) & !FLAG_BREAK;
                0
            }

            // Flags
            0x18 => self.flag_op(FLAG_CARRY, false),
            0x38 => self.flag_op(FLAG_CARRY, true),
            0x58 => self.flag_op(FLAG_INTERRUPT_DISABLE, false),
            0x78 => self.flag_op(FLAG_INTERRUPT_DISABLE, true),
            0xB8 => self.flag_op(FLAG_OVERFLOW, false),
            0xD8 => self.flag_op(FLAG_DECIMAL, false),
            0xF8 => self.flag_op(FLAG_DECIMAL, true),
            0xF4 => self.flag_op(FLAG_T, true),

            // Branches
            0x10 => self.branch(bus, !self.flag(FLAG_NEGATIVE)),
            0x30 => self.branch(bus, self.flag(FLAG_NEGATIVE)),
            0x50 => self.branch(bus, !self.flag(FLAG_OVERFLOW)),
            0x70 => self.branch(bus, self.flag(FLAG_OVERFLOW)),
            0x90 => self.branch(bus, !self.flag(FLAG_CARRY)),
            0xB0 => self.branch(bus, self.flag(FLAG_CARRY)),
            0xD0 => self.branch(bus, !self.flag(FLAG_ZERO)),
            0xF0 => self.branch(bus, self.flag(FLAG_ZERO)),
            0x80 => {
                // BRA's flat cost is already in the table.
                self.branch(bus, true);
                0
            }
            0x0F | 0x1F | 0x2F | 0x3F | 0x4F | 0x5F | 0x6F | 0x7F => {
                self.branch_on_bit(bus, (opcode >> 4) & 0x07, false)
            }
            0x8F | 0x9F | 0xAF | 0xBF | 0xCF | 0xDF | 0xEF | 0xFF => {
                self.branch_on_bit(bus, (opcode >> 4) & 0x07, true)
            }

            // Memory bit set/reset
            0x07 | 0x17 | 0x27 | 0x37 | 0x47 | 0x57 | 0x67 | 0x77 => {
                let addr = self.effective_address(bus, Mode::ZeroPage);
                let value = bus.read(addr) & !(1 << ((opcode >> 4) & 0x07));
                bus.write(addr, value);
                0
            }
            0x87 | 0x97 | 0xA7 | 0xB7 | 0xC7 | 0xD7 | 0xE7 | 0xF7 => {
                let addr = self.effective_address(bus, Mode::ZeroPage);
                let value = bus.read(addr) | (1 << ((opcode >> 4) & 0x07));
                bus.write(addr, value);
                0
            }

            // Jumps and subroutines
            0x4C => {
                self.pc = self.fetch_word(bus);
                0
            }
            0x6C => {
                let pointer = self.fetch_word(bus);
                self.pc = self.read_word(bus, pointer);
                0
            }
            0x7C => {
                let pointer = self.fetch_word(bus).wrapping_add(self.x as u16);
                self.pc = self.read_word(bus, pointer);
                0
            }
            0x20 => {
                let target = self.fetch_word(bus);
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = target;
                0
            }
            0x44 => {
                let offset = self.fetch_byte(bus) as i8;
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = self.pc.wrapping_add(offset as u16);
                0
            }
            0x60 => {
                self.pc = self.pop_word(bus).wrapping_add(1);
                0
            }
            0x40 => {
                self.status = self.pop_byte(bus) & !FLAG_BREAK;
                self.pc = self.pop_word(bus);
                0
            }
            0x00 => {
                self.pc = self.pc.wrapping_add(1);
                self.push_word(bus, self.pc);
                self.push_byte(bus, self.status | FLAG_BREAK);
                self.set_flag(FLAG_INTERRUPT_DISABLE, true);
                self.set_flag(FLAG_DECIMAL, false);
                self.pc = self.read_vector(bus, VECTOR_IRQ2_BRK);
                0
            }

            // HuC6280 extensions
            0x03 | 0x13 | 0x23 => {
                let value = self.fetch_byte(bus);
                let port = match opcode {
                    0x03 => 0,
                    0x13 => 2,
                    _ => 3,
                };
                bus.write_st_port(port, value);
                0
            }
            0x53 => {
                let mask = self.fetch_byte(bus);
                self.tam(bus, mask);
                0
            }
            0x43 => {
                let mask = self.fetch_byte(bus);
                self.tma(bus, mask);
                0
            }
            0x54 => {
                self.clock_high_speed = false;
                0
            }
            0xD4 => {
                self.clock_high_speed = true;
                0
            }
            0x73 => self.block_transfer(bus, BlockMode::Tii),
            0xC3 => self.block_transfer(bus, BlockMode::Tdd),
            0xD3 => self.block_transfer(bus, BlockMode::Tin),
            0xE3 => self.block_transfer(bus, BlockMode::Tia),
            0xF3 => self.block_transfer(bus, BlockMode::Tai),

            0xEA => 0,
            _ => {
                debug_assert!(is_undefined(opcode));
                debug!(
                    opcode = format_args!("{opcode:02X}"),
                    pc = format_args!("{:04X}", self.pc.wrapping_sub(1)),
                    "undefined opcode executed as NOP"
                );
                0
            }
        }
    }

    fn flag_op(&mut self, flag: u8, value: bool) -> u32 {
        self.set_flag(flag, value);
        0
    }

    fn branch<B: CpuBus>(&mut self, bus: &mut B, condition: bool) -> u32 {
        let offset = self.fetch_byte(bus) as i8;
        if condition {
            self.pc = self.pc.wrapping_add(offset as u16);
            BRANCH_TAKEN_PENALTY
        } else {
            0
        }
    }

    fn branch_on_bit<B: CpuBus>(&mut self, bus: &mut B, bit: u8, branch_if_set: bool) -> u32 {
        let addr = self.effective_address(bus, Mode::ZeroPage);
        let value = bus.read(addr);
        let bit_set = value & (1 << bit) != 0;
        self.branch(bus, bit_set == branch_if_set)
    }

    fn read_vector<B: CpuBus>(&self, bus: &mut B, vector: u16) -> u16 {
        self.read_word(bus, vector)
    }

    fn read_word<B: CpuBus>(&self, bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn set_flag(&mut self, flag: u8, value: bool) {
        if value {
            self.status |= flag;
        } else {
            self.status &= !flag;
        }
    }

    pub(crate) fn update_zero_and_negative(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }
}
