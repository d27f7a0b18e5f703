/// HuC6280 base cycle counts, indexed by opcode.
///
/// Differences from the 65C02 that games notice:
///   - zero page read/write: 4, absolute: 5
///   - (zp), (zp),Y and (zp,X): 7
///   - JSR/RTS/RTI: 7, BRK: 8, BSR: 8
///   - no page-crossing penalties
///   - taken branches add 2
///   - block transfers: 17 plus 6 per byte
#[rustfmt::skip]
pub(crate) const BASE_CYCLES: [u8; 256] = [
//  0  1  2   3  4  5  6  7  8  9  A  B  C  D  E  F
    8, 7, 3,  5, 6, 4, 6, 7, 3, 2, 2, 2, 7, 5, 7, 6, // 0x00
    2, 7, 7,  5, 6, 4, 6, 7, 2, 5, 2, 2, 7, 5, 7, 6, // 0x10
    7, 7, 3,  5, 4, 4, 6, 7, 4, 2, 2, 2, 5, 5, 7, 6, // 0x20
    2, 7, 7,  2, 4, 4, 6, 7, 2, 5, 2, 2, 5, 5, 7, 6, // 0x30
    7, 7, 3,  4, 8, 4, 6, 7, 3, 2, 2, 2, 4, 5, 7, 6, // 0x40
    2, 7, 7,  5, 3, 4, 6, 7, 2, 5, 3, 2, 2, 5, 7, 6, // 0x50
    7, 7, 2,  2, 4, 4, 6, 7, 4, 2, 2, 2, 7, 5, 7, 6, // 0x60
    2, 7, 7, 17, 4, 4, 6, 7, 2, 5, 4, 2, 7, 5, 7, 6, // 0x70
    4, 7, 2,  7, 4, 4, 4, 7, 2, 2, 2, 2, 5, 5, 5, 6, // 0x80
    2, 7, 7,  8, 4, 4, 4, 7, 2, 5, 2, 2, 5, 5, 5, 6, // 0x90
    2, 7, 2,  7, 4, 4, 4, 7, 2, 2, 2, 2, 5, 5, 5, 6, // 0xA0
    2, 7, 7,  8, 4, 4, 4, 7, 2, 5, 2, 2, 5, 5, 5, 6, // 0xB0
    2, 7, 2, 17, 4, 4, 6, 7, 2, 2, 2, 2, 5, 5, 7, 6, // 0xC0
    2, 7, 7, 17, 3, 4, 6, 7, 2, 5, 3, 2, 2, 5, 7, 6, // 0xD0
    2, 7, 2, 17, 4, 4, 6, 7, 2, 2, 2, 2, 5, 5, 7, 6, // 0xE0
    2, 7, 7, 17, 2, 4, 6, 7, 2, 5, 4, 2, 2, 5, 7, 6, // 0xF0
];

/// Encodings with no documented behavior. They execute as one-byte NOPs.
pub(crate) const UNDEFINED_OPCODES: [u8; 22] = [
    0x0B, 0x1B, 0x2B, 0x33, 0x3B, 0x4B, 0x5B, 0x5C, 0x63, 0x6B, 0x7B, 0x8B, 0x9B, 0xAB, 0xBB,
    0xCB, 0xDB, 0xDC, 0xE2, 0xEB, 0xFB, 0xFC,
];

pub(crate) const BRANCH_TAKEN_PENALTY: u32 = 2;
pub(crate) const T_MODE_PENALTY: u32 = 3;
pub(crate) const BLOCK_TRANSFER_BYTE_CYCLES: u32 = 6;
pub(crate) const INTERRUPT_CYCLES: u32 = 7;

/// Master clocks per CPU cycle at 7.16 MHz and 1.79 MHz.
pub const HIGH_SPEED_DIVIDER: u32 = 3;
pub const LOW_SPEED_DIVIDER: u32 = 12;

#[inline]
pub(crate) fn base_cycles(opcode: u8) -> u32 {
    BASE_CYCLES[opcode as usize] as u32
}

pub(crate) fn is_undefined(opcode: u8) -> bool {
    UNDEFINED_OPCODES.contains(&opcode)
}
