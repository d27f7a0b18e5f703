//! Single-instruction vectors for the HuC6280 core, run against a flat
//! 64 KiB memory. The bundled corpus has at least one vector per opcode.
//! `HUC6280_VECTOR_DIR` points at additional `*.json` files of the same
//! schema.

use std::{env, fs, path::Path};

use ctor::ctor;
use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pce::cpu::{Cpu, CpuBus};

const BUILTIN_VECTORS: &str = include_str!("data/huc6280_vectors.json");

#[ctor]
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

#[derive(Debug, Deserialize)]
struct Vector {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    expected: CpuState,
    cycles: u32,
}

#[derive(Debug, Deserialize)]
struct CpuState {
    pc: u16,
    s: u8,
    a: u8,
    x: u8,
    y: u8,
    p: u8,
    ram: Vec<(u16, u8)>,
    #[serde(default)]
    mpr: Option<[u8; 8]>,
}

struct FlatBus {
    memory: Vec<u8>,
    mpr: [u8; 8],
}

impl FlatBus {
    fn new() -> Self {
        Self {
            memory: vec![0; 0x1_0000],
            mpr: [0xFF, 0xF8, 0, 0, 0, 0, 0, 0],
        }
    }
}

impl CpuBus for FlatBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize] = value;
    }

    fn mpr(&self, index: usize) -> u8 {
        self.mpr[index & 0x07]
    }

    fn set_mpr(&mut self, index: usize, value: u8) {
        self.mpr[index & 0x07] = value;
    }

    fn write_st_port(&mut self, _port: usize, _value: u8) {}

    fn pending_interrupts(&self) -> u8 {
        0
    }
}

fn run_vector(vector: &Vector) -> Result<(), String> {
    let mut bus = FlatBus::new();
    let mut cpu = Cpu::new();
    let initial = &vector.initial;
    cpu.pc = initial.pc;
    cpu.sp = initial.s;
    cpu.a = initial.a;
    cpu.x = initial.x;
    cpu.y = initial.y;
    cpu.status = initial.p;
    for &(addr, value) in &initial.ram {
        bus.memory[addr as usize] = value;
    }
    if let Some(mpr) = initial.mpr {
        bus.mpr = mpr;
    }

    let cycles = cpu.execute(&mut bus);

    let expected = &vector.expected;
    let actual = (cpu.pc, cpu.sp, cpu.a, cpu.x, cpu.y, cpu.status);
    let wanted = (expected.pc, expected.s, expected.a, expected.x, expected.y, expected.p);
    if actual != wanted {
        return Err(format!(
            "{}: registers (pc, s, a, x, y, p) {actual:02X?}, expected {wanted:02X?}",
            vector.name
        ));
    }
    for &(addr, value) in &expected.ram {
        let found = bus.memory[addr as usize];
        if found != value {
            return Err(format!(
                "{}: memory {addr:#06X} = {found:#04X}, expected {value:#04X}",
                vector.name
            ));
        }
    }
    if let Some(mpr) = expected.mpr {
        if bus.mpr != mpr {
            return Err(format!("{}: mpr {:02X?}, expected {mpr:02X?}", vector.name, bus.mpr));
        }
    }
    if cycles != vector.cycles {
        return Err(format!(
            "{}: {cycles} cycles, expected {}",
            vector.name, vector.cycles
        ));
    }
    Ok(())
}

fn run_all(vectors: &[Vector]) -> Vec<String> {
    vectors
        .iter()
        .filter_map(|vector| run_vector(vector).err())
        .collect()
}

#[test]
fn builtin_vectors() {
    let vectors: Vec<Vector> = serde_json::from_str(BUILTIN_VECTORS).expect("vector corpus parses");
    assert!(!vectors.is_empty());
    let failures = run_all(&vectors);
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn builtin_vectors_cover_every_opcode() {
    let vectors: Vec<Vector> = serde_json::from_str(BUILTIN_VECTORS).expect("vector corpus parses");
    let mut covered = [false; 256];
    for vector in &vectors {
        let initial = &vector.initial;
        let opcode = initial
            .ram
            .iter()
            .find(|&&(addr, _)| addr == initial.pc)
            .map(|&(_, value)| value)
            .unwrap_or_else(|| panic!("{}: no opcode at pc", vector.name));
        covered[opcode as usize] = true;
    }
    let missing = (0..=0xFFu8)
        .filter(|&opcode| !covered[opcode as usize])
        .map(|opcode| format!("{opcode:02X}"))
        .collect::<Vec<_>>();
    assert!(missing.is_empty(), "opcodes without a vector: {}", missing.join(" "));
}

#[test]
fn external_vectors() {
    let Ok(dir) = env::var("HUC6280_VECTOR_DIR") else {
        return;
    };
    let mut failures = Vec::new();
    let mut files = fs::read_dir(Path::new(&dir))
        .expect("HUC6280_VECTOR_DIR is readable")
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<_>>();
    files.sort();
    for path in files {
        let text = fs::read_to_string(&path).expect("vector file is readable");
        let vectors: Vec<Vector> = serde_json::from_str(&text)
            .unwrap_or_else(|err| panic!("{}: {err}", path.display()));
        failures.extend(run_all(&vectors));
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}
