use super::tables::{BLOCK_TRANSFER_BYTE_CYCLES, T_MODE_PENALTY};
use super::{
    BlockMode, Cpu, CpuBus, Mode, FLAG_CARRY, FLAG_DECIMAL, FLAG_NEGATIVE, FLAG_OVERFLOW, FLAG_ZERO,
    STACK_BASE, ZERO_PAGE_BASE,
};

impl Cpu {
    pub(crate) fn fetch_byte<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    pub(crate) fn fetch_word<B: CpuBus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch_byte(bus) as u16;
        let hi = self.fetch_byte(bus) as u16;
        (hi << 8) | lo
    }

    fn zero_page_word<B: CpuBus>(bus: &mut B, zp: u8) -> u16 {
        let lo = bus.read(ZERO_PAGE_BASE | zp as u16) as u16;
        let hi = bus.read(ZERO_PAGE_BASE | zp.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    /// Resolve the logical address of a memory operand, consuming its bytes.
    pub(crate) fn effective_address<B: CpuBus>(&mut self, bus: &mut B, mode: Mode) -> u16 {
        match mode {
            Mode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                addr
            }
            Mode::ZeroPage => ZERO_PAGE_BASE | self.fetch_byte(bus) as u16,
            Mode::ZeroPageX => ZERO_PAGE_BASE | self.fetch_byte(bus).wrapping_add(self.x) as u16,
            Mode::ZeroPageY => ZERO_PAGE_BASE | self.fetch_byte(bus).wrapping_add(self.y) as u16,
            Mode::Absolute => self.fetch_word(bus),
            Mode::AbsoluteX => self.fetch_word(bus).wrapping_add(self.x as u16),
            Mode::AbsoluteY => self.fetch_word(bus).wrapping_add(self.y as u16),
            Mode::IndexedIndirect => {
                let zp = self.fetch_byte(bus).wrapping_add(self.x);
                Self::zero_page_word(bus, zp)
            }
            Mode::IndirectIndexed => {
                let zp = self.fetch_byte(bus);
                Self::zero_page_word(bus, zp).wrapping_add(self.y as u16)
            }
            Mode::ZeroPageIndirect => {
                let zp = self.fetch_byte(bus);
                Self::zero_page_word(bus, zp)
            }
        }
    }

    pub(crate) fn read_operand<B: CpuBus>(&mut self, bus: &mut B, mode: Mode) -> u8 {
        if mode == Mode::Immediate {
            return self.fetch_byte(bus);
        }
        let addr = self.effective_address(bus, mode);
        bus.read(addr)
    }

    /// Apply an accumulator operation, or with T set, apply it to the byte
    /// at zero page offset X and leave A untouched.
    pub(crate) fn alu<B: CpuBus>(
        &mut self,
        bus: &mut B,
        value: u8,
        t_mode: bool,
        op: fn(&mut Cpu, u8, u8) -> u8,
    ) -> u32 {
        if t_mode {
            let addr = ZERO_PAGE_BASE | self.x as u16;
            let target = bus.read(addr);
            let result = op(self, target, value);
            bus.write(addr, result);
            T_MODE_PENALTY
        } else {
            self.a = op(self, self.a, value);
            0
        }
    }

    pub(crate) fn ora(&mut self, lhs: u8, rhs: u8) -> u8 {
        let result = lhs | rhs;
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn and(&mut self, lhs: u8, rhs: u8) -> u8 {
        let result = lhs & rhs;
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn eor(&mut self, lhs: u8, rhs: u8) -> u8 {
        let result = lhs ^ rhs;
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn adc(&mut self, lhs: u8, rhs: u8) -> u8 {
        let carry = self.flag(FLAG_CARRY) as u16;
        let binary_sum = lhs as u16 + rhs as u16 + carry;
        let binary_result = binary_sum as u8;
        self.set_flag(
            FLAG_OVERFLOW,
            (!(lhs ^ rhs) & (lhs ^ binary_result) & 0x80) != 0,
        );

        let result = if self.flag(FLAG_DECIMAL) {
            let mut low = (lhs & 0x0F) as u16 + (rhs & 0x0F) as u16 + carry;
            if low > 0x09 {
                low += 0x06;
            }
            let mut sum = (lhs & 0xF0) as u16 + (rhs & 0xF0) as u16 + (low & 0x0F);
            if low > 0x0F {
                sum += 0x10;
            }
            if sum > 0x9F {
                sum += 0x60;
            }
            self.set_flag(FLAG_CARRY, sum > 0xFF);
            sum as u8
        } else {
            self.set_flag(FLAG_CARRY, binary_sum > 0xFF);
            binary_result
        };
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn sbc(&mut self, lhs: u8, rhs: u8) -> u8 {
        let borrow = (!self.flag(FLAG_CARRY)) as i16;
        let difference = lhs as i16 - rhs as i16 - borrow;
        let binary_result = difference as u8;
        self.set_flag(
            FLAG_OVERFLOW,
            ((lhs ^ binary_result) & (lhs ^ rhs) & 0x80) != 0,
        );
        self.set_flag(FLAG_CARRY, difference >= 0);

        let result = if self.flag(FLAG_DECIMAL) {
            let mut low = (lhs & 0x0F) as i16 - (rhs & 0x0F) as i16 - borrow;
            let mut high = (lhs >> 4) as i16 - (rhs >> 4) as i16;
            if low < 0 {
                low -= 6;
                high -= 1;
            }
            if high < 0 {
                high -= 6;
            }
            (((high << 4) & 0xF0) | (low & 0x0F)) as u8
        } else {
            binary_result
        };
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        self.set_flag(FLAG_CARRY, register >= value);
        self.update_zero_and_negative(result);
    }

    pub(crate) fn bit(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, self.a & value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
        self.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
    }

    pub(crate) fn tst(&mut self, mask: u8, value: u8) {
        self.set_flag(FLAG_ZERO, mask & value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
        self.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
    }

    pub(crate) fn tsb<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        let value = bus.read(addr);
        let result = value | self.a;
        self.set_flag(FLAG_ZERO, value & self.a == 0);
        self.set_flag(FLAG_NEGATIVE, result & 0x80 != 0);
        self.set_flag(FLAG_OVERFLOW, result & 0x40 != 0);
        bus.write(addr, result);
    }

    pub(crate) fn trb<B: CpuBus>(&mut self, bus: &mut B, addr: u16) {
        let value = bus.read(addr);
        let result = value & !self.a;
        self.set_flag(FLAG_ZERO, value & self.a == 0);
        self.set_flag(FLAG_NEGATIVE, result & 0x80 != 0);
        self.set_flag(FLAG_OVERFLOW, result & 0x40 != 0);
        bus.write(addr, result);
    }

    pub(crate) fn modify<B: CpuBus>(&mut self, bus: &mut B, addr: u16, op: fn(&mut Cpu, u8) -> u8) {
        let value = bus.read(addr);
        let result = op(self, value);
        bus.write(addr, result);
    }

    pub(crate) fn asl(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn lsr(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn rol(&mut self, value: u8) -> u8 {
        let result = (value << 1) | self.flag(FLAG_CARRY) as u8;
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn ror(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | ((self.flag(FLAG_CARRY) as u8) << 7);
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn increment(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn decrement(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.update_zero_and_negative(result);
        result
    }

    pub(crate) fn push_byte<B: CpuBus>(&mut self, bus: &mut B, value: u8) {
        bus.write(STACK_BASE | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pop_byte<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(STACK_BASE | self.sp as u16)
    }

    pub(crate) fn push_word<B: CpuBus>(&mut self, bus: &mut B, value: u16) {
        self.push_byte(bus, (value >> 8) as u8);
        self.push_byte(bus, value as u8);
    }

    pub(crate) fn pop_word<B: CpuBus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pop_byte(bus) as u16;
        let hi = self.pop_byte(bus) as u16;
        (hi << 8) | lo
    }

    /// TAM: copy A into every MPR whose bit is set in `mask`.
    pub(crate) fn tam<B: CpuBus>(&mut self, bus: &mut B, mask: u8) {
        for index in 0..8 {
            if mask & (1 << index) != 0 {
                bus.set_mpr(index, self.a);
            }
        }
        self.mpr_buffer = self.a;
    }

    /// TMA: OR together the MPRs selected by `mask`. A zero mask yields the
    /// value last moved through TAM/TMA.
    pub(crate) fn tma<B: CpuBus>(&mut self, bus: &mut B, mask: u8) {
        if mask == 0 {
            self.a = self.mpr_buffer;
            return;
        }
        let mut value = 0;
        for index in 0..8 {
            if mask & (1 << index) != 0 {
                value |= bus.mpr(index);
            }
        }
        self.a = value;
        self.mpr_buffer = value;
    }

    /// TII/TDD/TIN/TIA/TAI. Runs to completion; returns the per-byte cycles.
    pub(crate) fn block_transfer<B: CpuBus>(&mut self, bus: &mut B, mode: BlockMode) -> u32 {
        let source = self.fetch_word(bus);
        let dest = self.fetch_word(bus);
        let length = match self.fetch_word(bus) {
            0 => 0x1_0000u32,
            length => length as u32,
        };

        self.push_byte(bus, self.y);
        self.push_byte(bus, self.a);
        self.push_byte(bus, self.x);

        let mut src = source;
        let mut dst = dest;
        let mut alternate = 0u16;
        for _ in 0..length {
            match mode {
                BlockMode::Tii => {
                    let value = bus.read_block(src);
                    bus.write_block(dst, value);
                    src = src.wrapping_add(1);
                    dst = dst.wrapping_add(1);
                }
                BlockMode::Tdd => {
                    let value = bus.read_block(src);
                    bus.write_block(dst, value);
                    src = src.wrapping_sub(1);
                    dst = dst.wrapping_sub(1);
                }
                BlockMode::Tin => {
                    let value = bus.read_block(src);
                    bus.write_block(dest, value);
                    src = src.wrapping_add(1);
                }
                BlockMode::Tia => {
                    let value = bus.read_block(src);
                    bus.write_block(dest.wrapping_add(alternate), value);
                    src = src.wrapping_add(1);
                    alternate ^= 1;
                }
                BlockMode::Tai => {
                    let value = bus.read_block(source.wrapping_add(alternate));
                    bus.write_block(dst, value);
                    dst = dst.wrapping_add(1);
                    alternate ^= 1;
                }
            }
        }

        self.x = self.pop_byte(bus);
        self.a = self.pop_byte(bus);
        self.y = self.pop_byte(bus);
        length * BLOCK_TRANSFER_BYTE_CYCLES
    }
}
