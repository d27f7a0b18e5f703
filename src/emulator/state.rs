//! Save-state envelope.
//!
//! A state is the component body, an optional screenshot, then a fixed
//! trailing header:
//!
//! | field             | bytes |
//! |-------------------|-------|
//! | magic `PCES`      | 4     |
//! | version           | 4     |
//! | body size         | 4     |
//! | timestamp (s)     | 8     |
//! | ROM name, NUL pad | 128   |
//! | ROM CRC-32        | 4     |
//! | screenshot w/h    | 4 + 4 |
//! | screenshot bytes  | 4     |
//!
//! All integers are little-endian. The body encodes, in order: driver,
//! I/O buffer, MMU, VCE, video (VDCs and VPC), CPU, timer, interrupt
//! controller, PSG and input. Decoded components are range-checked
//! before any of them replaces live state.

use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use bincode::config::Config;
use tracing::{debug, info};

use super::{Core, DriverState, ROM_NAME_LEN};
use crate::bus::{Mmu, Video};
use crate::cpu::{Cpu, InterruptController, Timer};
use crate::error::StateError;
use crate::input::Input;
use crate::psg::{Psg, MASTER_CLOCKS_PER_PSG_CLOCK};
use crate::vce::Vce;

pub const STATE_MAGIC: [u8; 4] = *b"PCES";
pub const STATE_VERSION: u32 = 1;
pub const STATE_HEADER_SIZE: usize = 4 + 4 + 4 + 8 + ROM_NAME_LEN + 4 + 4 + 4 + 4;

fn state_config() -> impl Config {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

/// Frame image stored next to a state for frontends to preview.
#[derive(Clone, Copy, Debug)]
pub struct Screenshot<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateHeader {
    pub version: u32,
    pub size: u32,
    pub timestamp: u64,
    pub rom_name: String,
    pub rom_crc32: u32,
    pub screenshot_width: u32,
    pub screenshot_height: u32,
    pub screenshot_size: u32,
}

impl StateHeader {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&STATE_MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        let mut name = [0u8; ROM_NAME_LEN];
        let bytes = self.rom_name.as_bytes();
        let count = bytes.len().min(ROM_NAME_LEN - 1);
        name[..count].copy_from_slice(&bytes[..count]);
        out.extend_from_slice(&name);
        out.extend_from_slice(&self.rom_crc32.to_le_bytes());
        out.extend_from_slice(&self.screenshot_width.to_le_bytes());
        out.extend_from_slice(&self.screenshot_height.to_le_bytes());
        out.extend_from_slice(&self.screenshot_size.to_le_bytes());
    }

    /// Parse the header at the end of a complete state file.
    pub fn parse(state: &[u8]) -> Result<Self, StateError> {
        if state.len() < STATE_HEADER_SIZE {
            return Err(StateError::TooShort);
        }
        let mut fields = Fields(&state[state.len() - STATE_HEADER_SIZE..]);
        if fields.take::<4>() != STATE_MAGIC {
            return Err(StateError::BadMagic);
        }
        let version = u32::from_le_bytes(fields.take());
        if version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion { found: version });
        }
        let size = u32::from_le_bytes(fields.take());
        let timestamp = u64::from_le_bytes(fields.take());
        let name = fields.take::<ROM_NAME_LEN>();
        let name_len = name.iter().position(|&byte| byte == 0).unwrap_or(ROM_NAME_LEN);
        Ok(Self {
            version,
            size,
            timestamp,
            rom_name: String::from_utf8_lossy(&name[..name_len]).into_owned(),
            rom_crc32: u32::from_le_bytes(fields.take()),
            screenshot_width: u32::from_le_bytes(fields.take()),
            screenshot_height: u32::from_le_bytes(fields.take()),
            screenshot_size: u32::from_le_bytes(fields.take()),
        })
    }
}

/// Cursor over the fixed-size header fields.
struct Fields<'a>(&'a [u8]);

impl Fields<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut field = [0u8; N];
        let count = N.min(self.0.len());
        field[..count].copy_from_slice(&self.0[..count]);
        self.0 = &self.0[count..];
        field
    }
}

/// Components decoded from a body, held until the whole body is known good.
struct DecodedState {
    driver: DriverState,
    io_buffer: u8,
    mmu: Mmu,
    vce: Vce,
    video: Video,
    cpu: Cpu,
    timer: Timer,
    irq: InterruptController,
    psg: Psg,
    input: Input,
}

struct BodyReader<'a> {
    body: &'a [u8],
    offset: usize,
}

impl BodyReader<'_> {
    fn next<T: bincode::Decode<()>>(&mut self) -> Result<T, StateError> {
        let (value, read) = bincode::decode_from_slice(&self.body[self.offset..], state_config())?;
        self.offset += read;
        Ok(value)
    }
}

impl DecodedState {
    fn decode(body: &[u8]) -> Result<Self, StateError> {
        let mut reader = BodyReader { body, offset: 0 };
        let state = Self {
            driver: reader.next()?,
            io_buffer: reader.next()?,
            mmu: reader.next()?,
            vce: reader.next()?,
            video: reader.next()?,
            cpu: reader.next()?,
            timer: reader.next()?,
            irq: reader.next()?,
            psg: reader.next()?,
            input: reader.next()?,
        };
        if reader.offset != body.len() {
            return Err(StateError::SizeMismatch);
        }
        Ok(state)
    }

    /// Reject values that decode cleanly but would index out of range
    /// once committed.
    fn validate(&self, sgx: bool) -> Result<(), StateError> {
        if self.driver.psg_clock_phase >= MASTER_CLOCKS_PER_PSG_CLOCK {
            return Err(StateError::Corrupt("psg clock phase out of range"));
        }
        self.mmu.validate(sgx).map_err(StateError::Corrupt)?;
        self.vce.validate().map_err(StateError::Corrupt)?;
        self.video.validate().map_err(StateError::Corrupt)?;
        self.timer.validate().map_err(StateError::Corrupt)?;
        self.psg.validate().map_err(StateError::Corrupt)?;
        self.input.validate().map_err(StateError::Corrupt)
    }
}

fn encode_part<T: bincode::Encode>(part: &T, body: &mut Vec<u8>) -> Result<(), StateError> {
    bincode::encode_into_std_write(part, body, state_config())?;
    Ok(())
}

impl Core {
    /// Encoded component state without the envelope.
    pub fn state_body(&self) -> Result<Vec<u8>, StateError> {
        let mut body = Vec::new();
        encode_part(&self.driver, &mut body)?;
        encode_part(&self.bus.io_buffer, &mut body)?;
        encode_part(&self.bus.mmu, &mut body)?;
        encode_part(&self.bus.vce, &mut body)?;
        encode_part(&self.bus.video, &mut body)?;
        encode_part(&self.cpu, &mut body)?;
        encode_part(&self.bus.timer, &mut body)?;
        encode_part(&self.bus.irq, &mut body)?;
        encode_part(&self.bus.psg, &mut body)?;
        encode_part(&self.bus.input, &mut body)?;
        Ok(body)
    }

    pub fn save_state<W: Write>(&self, writer: W) -> Result<(), StateError> {
        self.save_state_with_screenshot(writer, None)
    }

    pub fn save_state_with_screenshot<W: Write>(
        &self,
        mut writer: W,
        screenshot: Option<Screenshot<'_>>,
    ) -> Result<(), StateError> {
        let mut bytes = self.state_body()?;
        let size = u32::try_from(bytes.len()).map_err(|_| StateError::SizeMismatch)?;
        let (width, height, shot) = match screenshot {
            Some(shot) => (shot.width, shot.height, shot.data),
            None => (0, 0, &[][..]),
        };
        bytes.extend_from_slice(shot);

        let (rom_name, rom_crc32) = match self.rom.as_ref() {
            Some(rom) => (rom.name.clone(), rom.crc32),
            None => (String::new(), 0),
        };
        let header = StateHeader {
            version: STATE_VERSION,
            size,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0),
            rom_name,
            rom_crc32,
            screenshot_width: width,
            screenshot_height: height,
            screenshot_size: u32::try_from(shot.len()).map_err(|_| StateError::SizeMismatch)?,
        };
        header.write_to(&mut bytes);
        writer.write_all(&bytes)?;
        debug!(size, "save state written");
        Ok(())
    }

    pub fn load_state<R: Read>(&mut self, mut reader: R) -> Result<StateHeader, StateError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.load_state_bytes(&bytes)
    }

    /// Validate and restore a state. Nothing changes unless every check
    /// and every component decode succeeds.
    pub fn load_state_bytes(&mut self, state: &[u8]) -> Result<StateHeader, StateError> {
        let result = self.restore(state);
        if let Err(err) = &result {
            debug!(%err, "save state rejected");
        }
        result
    }

    fn restore(&mut self, state: &[u8]) -> Result<StateHeader, StateError> {
        let header = StateHeader::parse(state)?;
        let expected = self.rom.as_ref().map_or(0, |rom| rom.crc32);
        if header.rom_crc32 != expected {
            return Err(StateError::RomMismatch {
                expected,
                found: header.rom_crc32,
            });
        }
        let body_len = header.size as usize;
        if body_len + header.screenshot_size as usize + STATE_HEADER_SIZE != state.len() {
            return Err(StateError::SizeMismatch);
        }

        let decoded = DecodedState::decode(&state[..body_len])?;
        if decoded.video.is_sgx() != self.config.is_sgx() {
            return Err(StateError::SystemMismatch);
        }
        decoded.validate(self.config.is_sgx())?;

        let DecodedState {
            driver,
            io_buffer,
            mmu,
            vce,
            video,
            cpu,
            timer,
            irq,
            psg,
            input,
        } = decoded;
        self.driver = driver;
        self.bus.io_buffer = io_buffer;
        self.bus.mmu = mmu;
        self.bus.vce = vce;
        self.bus.video = video;
        self.cpu = cpu;
        self.bus.timer = timer;
        self.bus.irq = irq;
        self.bus.psg = psg;
        self.bus.input = input;

        self.bus.vce.configure(&self.config);
        self.bus.video.set_no_sprite_limit(self.config.no_sprite_limit);
        self.bus.input.configure(&self.config);
        self.bus.update_irq_lines();
        info!(rom = %header.rom_name, timestamp = header.timestamp, "save state loaded");
        Ok(header)
    }
}

/// Screenshot bytes of a complete state file, if it carries one.
pub fn read_screenshot(state: &[u8]) -> Result<Option<(StateHeader, &[u8])>, StateError> {
    let header = StateHeader::parse(state)?;
    if header.screenshot_size == 0 {
        return Ok(None);
    }
    let start = header.size as usize;
    let end = start + header.screenshot_size as usize;
    match state.get(start..end) {
        Some(data) => Ok(Some((header, data))),
        None => Err(StateError::SizeMismatch),
    }
}
