use tracing::{debug, info};

use crate::bus::{HuCard, Mapper, PAGE_SIZE};
use crate::error::RomError;

/// Header prepended by some copier dumps.
pub(super) const COPIER_HEADER_SIZE: usize = 512;
/// Largest image any mapper decodes: the 2.5 MiB Street Fighter II card.
pub(super) const MAX_HUCARD_SIZE: usize = 0x28_0000;
/// Byte length of the ROM name field in a save-state header.
pub const ROM_NAME_LEN: usize = 128;

/// Identity of the loaded HuCard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RomInfo {
    pub name: String,
    pub size: usize,
    pub crc32: u32,
    pub mapper: Mapper,
}

pub(crate) struct ParsedHuCard {
    pub(super) card: HuCard,
    pub(super) info: RomInfo,
}

impl ParsedHuCard {
    pub(super) fn from_bytes(name: &str, image: &[u8]) -> Result<Self, RomError> {
        if image.is_empty() {
            return Err(RomError::Empty);
        }
        let payload = if image.len() % PAGE_SIZE == COPIER_HEADER_SIZE {
            debug!(name, "stripping copier header");
            &image[COPIER_HEADER_SIZE..]
        } else {
            image
        };
        if payload.len() < PAGE_SIZE {
            return Err(RomError::Truncated { size: payload.len() });
        }
        if payload.len() > MAX_HUCARD_SIZE {
            return Err(RomError::TooLarge { size: payload.len() });
        }

        let crc32 = crc32fast::hash(payload);
        let mut rom = payload.to_vec();
        let remainder = rom.len() % PAGE_SIZE;
        if remainder != 0 {
            rom.resize(rom.len() + (PAGE_SIZE - remainder), 0xFF);
        }
        let card = HuCard::new(rom);
        let info = RomInfo {
            name: rom_name(name),
            size: payload.len(),
            crc32,
            mapper: card.mapper(),
        };
        info!(
            name = %info.name,
            size = info.size,
            crc = %format!("{:08X}", info.crc32),
            mapper = ?info.mapper,
            "HuCard loaded"
        );
        Ok(Self { card, info })
    }
}

/// Name as stored in save states: at most `ROM_NAME_LEN - 1` bytes, cut
/// on a character boundary.
fn rom_name(name: &str) -> String {
    let mut end = name.len().min(ROM_NAME_LEN - 1);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}
