//! PC Engine / SuperGrafx emulation core.
//!
//! [`Core`] owns the HuC6280 and the [`bus::Bus`] with everything behind
//! it. Hosts load a HuCard, feed key events and call
//! [`Core::run_until_frame`] once per displayed frame.

pub mod bus;
pub mod config;
pub mod cpu;
pub mod emulator;
pub mod error;
pub mod input;
pub mod psg;
pub mod vce;
pub mod vdc;
pub mod vpc;

pub use bus::CdRomPort;
pub use config::{CoreConfig, PixelFormat, Region, SystemKind};
pub use emulator::{
    BreakReason, Breakpoint, Core, CoreControl, FrameResult, RomInfo, RuntimeInfo, Screenshot,
    StateHeader, AUDIO_BUFFER_SIZE,
};
pub use error::{CoreError, RomError, StateError};
pub use input::Key;
pub use vce::{MAX_FRAME_HEIGHT, MAX_FRAME_WIDTH};

#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    #[ctor]
    fn init_tracing() {
        let subscriber = FmtSubscriber::builder()
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::INFO)
            .finish();
        tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
    }
}
