use std::{env, error::Error, fs, path::Path, path::PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pce::{
    Core, CoreConfig, PixelFormat, SystemKind, AUDIO_BUFFER_SIZE, MAX_FRAME_HEIGHT,
    MAX_FRAME_WIDTH,
};

const DEFAULT_FRAMES: usize = 60;

struct Options {
    rom_path: PathBuf,
    frames: usize,
    sgx: bool,
    config: Option<PathBuf>,
    save_state: Option<PathBuf>,
    load_state: Option<PathBuf>,
    dump_frame: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let Some(options) = parse_args()? else {
        return Ok(());
    };

    let mut config = match &options.config {
        Some(path) => serde_json::from_str::<CoreConfig>(&fs::read_to_string(path)?)?,
        None => CoreConfig::default(),
    }
    .with_env_overrides();
    if options.sgx || has_extension(&options.rom_path, "sgx") {
        config.system = SystemKind::SuperGrafx;
    }

    let name = options
        .rom_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let image = fs::read(&options.rom_path)?;
    let mut core = Core::new(config);
    core.load_rom(&name, &image)?;

    if let Some(path) = &options.load_state {
        let header = core.load_state(fs::File::open(path)?)?;
        info!(path = %path.display(), rom = %header.rom_name, "state restored");
    }

    let mut frame = vec![0u8; MAX_FRAME_WIDTH * MAX_FRAME_HEIGHT * 4];
    let mut audio = vec![0i16; AUDIO_BUFFER_SIZE];
    let mut frames = 0usize;
    let mut samples = 0usize;
    while frames < options.frames {
        let result = core.run_until_frame(&mut frame, &mut audio);
        samples += result.samples;
        if !result.frame_completed {
            warn!(breakpoint = ?result.breakpoint, frames, "frame interrupted");
            break;
        }
        frames += 1;
    }

    let cpu = &core.cpu;
    info!(
        frames,
        samples,
        pc = %format!("{:#06X}", cpu.pc),
        a = %format!("{:#04X}", cpu.a),
        x = %format!("{:#04X}", cpu.x),
        y = %format!("{:#04X}", cpu.y),
        clocks = cpu.master_clocks(),
        "run finished"
    );

    if let Some(path) = &options.save_state {
        core.save_state(fs::File::create(path)?)?;
        info!(path = %path.display(), "state saved");
    }
    if let Some(path) = &options.dump_frame {
        let runtime = core.runtime_info();
        let ppm = encode_ppm(&frame, runtime.width, runtime.height, runtime.pixel_format);
        fs::write(path, ppm)?;
        info!(path = %path.display(), width = runtime.width, height = runtime.height, "frame written");
    }
    Ok(())
}

fn parse_args() -> Result<Option<Options>, Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let mut rom_path: Option<PathBuf> = None;
    let mut frames = DEFAULT_FRAMES;
    let mut sgx = false;
    let mut config = None;
    let mut save_state = None;
    let mut load_state = None;
    let mut dump_frame = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" => {
                let value = args.next().ok_or("--frames requires a value")?;
                frames = value
                    .parse()
                    .map_err(|_| format!("invalid --frames value: {value}"))?;
            }
            "--sgx" => sgx = true,
            "--config" => config = Some(path_arg(&mut args, "--config")?),
            "--save-state" => save_state = Some(path_arg(&mut args, "--save-state")?),
            "--load-state" => load_state = Some(path_arg(&mut args, "--load-state")?),
            "--dump-frame" => dump_frame = Some(path_arg(&mut args, "--dump-frame")?),
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            _ if rom_path.is_none() => rom_path = Some(PathBuf::from(arg)),
            other => {
                print_usage();
                return Err(format!("unknown argument: {other}").into());
            }
        }
    }

    let Some(rom_path) = rom_path else {
        print_usage();
        return Ok(None);
    };
    Ok(Some(Options {
        rom_path,
        frames,
        sgx,
        config,
        save_state,
        load_state,
        dump_frame,
    }))
}

fn path_arg(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<PathBuf, String> {
    args.next()
        .map(PathBuf::from)
        .ok_or_else(|| format!("{flag} requires a file path"))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Binary PPM (P6) of the top-left `width` x `height` pixels.
fn encode_ppm(frame: &[u8], width: usize, height: usize, format: PixelFormat) -> Vec<u8> {
    let bytes = format.bytes_per_pixel();
    let mut out = format!("P6\n{width} {height}\n255\n").into_bytes();
    for pixel in frame.chunks_exact(bytes).take(width * height) {
        out.extend_from_slice(&to_rgb(format, pixel));
    }
    out
}

fn to_rgb(format: PixelFormat, pixel: &[u8]) -> [u8; 3] {
    let expand5 = |value: u16| ((value & 0x1F) * 255 / 31) as u8;
    let expand6 = |value: u16| ((value & 0x3F) * 255 / 63) as u8;
    match format {
        PixelFormat::Rgba8888 => [pixel[0], pixel[1], pixel[2]],
        PixelFormat::Bgra8888 => [pixel[2], pixel[1], pixel[0]],
        PixelFormat::Rgb565 | PixelFormat::Bgr565 | PixelFormat::Rgb555 | PixelFormat::Bgr555 => {
            let word = u16::from_le_bytes([pixel[0], pixel[1]]);
            match format {
                PixelFormat::Rgb565 => [expand5(word >> 11), expand6(word >> 5), expand5(word)],
                PixelFormat::Bgr565 => [expand5(word), expand6(word >> 5), expand5(word >> 11)],
                PixelFormat::Rgb555 => [expand5(word >> 10), expand5(word >> 5), expand5(word)],
                _ => [expand5(word), expand5(word >> 5), expand5(word >> 10)],
            }
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: pce-run <rom.[pce|sgx]> [--frames N] [--sgx] [--config <file>] \
         [--save-state <file>] [--load-state <file>] [--dump-frame <file.ppm>]"
    );
    eprintln!("Options:");
    eprintln!("  --frames <n>         Run N frames (default {DEFAULT_FRAMES})");
    eprintln!("  --sgx                Emulate a SuperGrafx (implied for .sgx images)");
    eprintln!("  --config <file>      Read a JSON core configuration");
    eprintln!("  --load-state <file>  Restore a save state after loading the ROM");
    eprintln!("  --save-state <file>  Write a save state after the run");
    eprintln!("  --dump-frame <file>  Write the last frame as a binary PPM");
    eprintln!("  --help               Show this message");
    eprintln!();
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}
