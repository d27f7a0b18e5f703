use super::mmu::PAGE_SIZE;

/// 512 KiB: the fixed half of the Street Fighter II mapper and the size
/// of each of its switchable windows.
const SF2_WINDOW_SIZE: usize = 0x8_0000;
/// Logical offsets inside a ROM bank that select the SF2 window.
pub const SF2_SELECT_FIRST: usize = 0x1FF0;
pub const SF2_SELECT_LAST: usize = 0x1FF3;
const SPLIT_384K: usize = 0x6_0000;
const SPLIT_384K_LOW: usize = 0x4_0000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mapper {
    /// Image mirrored over banks 0x00-0x7F.
    #[default]
    Standard,
    /// 384 KiB image: 256 KiB at bank 0 and its last 128 KiB at bank 0x40.
    Split384K,
    /// Street Fighter II: 512 KiB fixed, 512 KiB windows above bank 0x40.
    StreetFighter2,
}

impl Mapper {
    pub fn for_size(size: usize) -> Self {
        if size > 0x10_0000 {
            Mapper::StreetFighter2
        } else if size == SPLIT_384K {
            Mapper::Split384K
        } else {
            Mapper::Standard
        }
    }
}

/// A loaded HuCard image. Host data: never part of a save state.
#[derive(Clone, Debug, Default)]
pub struct HuCard {
    data: Vec<u8>,
    mapper: Mapper,
}

impl HuCard {
    pub fn new(data: Vec<u8>) -> Self {
        let mapper = Mapper::for_size(data.len());
        Self { data, mapper }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn mapper(&self) -> Mapper {
        self.mapper
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Byte at `offset` of ROM bank `bank` (0x00-0x7F). `None` without an image.
    pub fn read(&self, bank: u8, offset: usize, window: u8) -> Option<u8> {
        if self.data.is_empty() {
            return None;
        }
        let linear = (bank as usize & 0x7F) * PAGE_SIZE + (offset & (PAGE_SIZE - 1));
        let index = match self.mapper {
            Mapper::Standard => linear % self.data.len(),
            Mapper::Split384K => {
                if linear < SPLIT_384K_LOW {
                    linear
                } else if linear >= SF2_WINDOW_SIZE {
                    SPLIT_384K_LOW + (linear - SF2_WINDOW_SIZE) % (SPLIT_384K - SPLIT_384K_LOW)
                } else {
                    linear % SPLIT_384K_LOW
                }
            }
            Mapper::StreetFighter2 => {
                if linear < SF2_WINDOW_SIZE {
                    linear
                } else {
                    let windowed = SF2_WINDOW_SIZE * (window as usize + 1) + (linear - SF2_WINDOW_SIZE);
                    windowed % self.data.len()
                }
            }
        };
        self.data.get(index).copied()
    }

    /// Window selected by a write into a ROM bank, if this mapper decodes it.
    pub fn window_select(&self, offset: usize) -> Option<u8> {
        let offset = offset & (PAGE_SIZE - 1);
        if self.mapper == Mapper::StreetFighter2 && (SF2_SELECT_FIRST..=SF2_SELECT_LAST).contains(&offset) {
            Some((offset - SF2_SELECT_FIRST) as u8)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(banks: usize) -> Vec<u8> {
        (0..banks * PAGE_SIZE).map(|index| (index / PAGE_SIZE) as u8).collect()
    }

    #[test]
    fn small_images_mirror_over_the_rom_banks() {
        let card = HuCard::new(image(32));
        assert_eq!(card.mapper(), Mapper::Standard);
        assert_eq!(card.read(0x05, 0, 0), Some(5));
        assert_eq!(card.read(0x25, 0x100, 0), Some(5));
        assert_eq!(card.read(0x7F, 0x1FFF, 0), Some(31));
    }

    #[test]
    fn split_384k_places_the_tail_at_bank_0x40() {
        let card = HuCard::new(image(48));
        assert_eq!(card.mapper(), Mapper::Split384K);
        assert_eq!(card.read(0x1F, 0, 0), Some(31));
        assert_eq!(card.read(0x20, 0, 0), Some(0));
        assert_eq!(card.read(0x40, 0, 0), Some(32));
        assert_eq!(card.read(0x4F, 0, 0), Some(47));
        assert_eq!(card.read(0x50, 0, 0), Some(32));
    }

    #[test]
    fn sf2_windows_switch_the_upper_half() {
        let card = HuCard::new(image(320));
        assert_eq!(card.mapper(), Mapper::StreetFighter2);
        assert_eq!(card.read(0x3F, 0, 3), Some(63));
        assert_eq!(card.read(0x40, 0, 0), Some(64));
        assert_eq!(card.read(0x40, 0, 1), Some(128));
        // Window 3 starts at bank 256.
        assert_eq!(card.read(0x41, 0, 3), Some(257u16 as u8));
        assert_eq!(card.window_select(0x1FF2), Some(2));
        assert_eq!(card.window_select(0x1FEF), None);
    }

    #[test]
    fn empty_card_reads_nothing() {
        let card = HuCard::default();
        assert_eq!(card.read(0, 0, 0), None);
        assert_eq!(card.window_select(0x1FF0), None);
    }
}
