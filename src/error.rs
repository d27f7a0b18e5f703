use thiserror::Error;

/// Problems with a HuCard image handed to [`crate::Core::load_rom`].
#[derive(Debug, Error)]
pub enum RomError {
    #[error("HuCard image is empty")]
    Empty,
    #[error("HuCard image of {size} bytes exceeds the 2.5 MiB mapper limit")]
    TooLarge { size: usize },
    #[error("HuCard image of {size} bytes holds less than one 8 KiB bank")]
    Truncated { size: usize },
}

/// Reasons a save state is rejected. A rejected state never touches the core.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("save state I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("save state is shorter than its header")]
    TooShort,
    #[error("save state magic does not match")]
    BadMagic,
    #[error("unsupported save state version {found}")]
    UnsupportedVersion { found: u32 },
    #[error("save state belongs to ROM {found:08X}, loaded ROM is {expected:08X}")]
    RomMismatch { expected: u32, found: u32 },
    #[error("save state body size does not match its header")]
    SizeMismatch,
    #[error("save state was made on a different console model")]
    SystemMismatch,
    #[error("save state is corrupt: {0}")]
    Corrupt(&'static str),
    #[error("failed to encode save state: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode save state: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Rom(#[from] RomError),
    #[error(transparent)]
    State(#[from] StateError),
}
