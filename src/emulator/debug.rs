use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bus::WatchHit;
use crate::cpu::Interrupt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Breakpoint {
    /// Stop before the instruction at this logical address runs.
    Execute(u16),
    /// Stop after an instruction that read this logical address.
    Read(u16),
    /// Stop after an instruction that wrote this logical address.
    Write(u16),
    /// Stop after any interrupt entry.
    Irq,
}

/// Why `run_until_frame` returned before the end of the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakReason {
    Execute(u16),
    Read(u16),
    Write(u16),
    Irq(Interrupt),
    /// A [`CoreControl::request_break`] was observed.
    Requested,
}

impl From<WatchHit> for BreakReason {
    fn from(hit: WatchHit) -> Self {
        if hit.write {
            BreakReason::Write(hit.addr)
        } else {
            BreakReason::Read(hit.addr)
        }
    }
}

/// Cross-thread handle for pausing the core or asking it to break. The
/// core polls it at instruction boundaries.
#[derive(Clone, Debug, Default)]
pub struct CoreControl {
    paused: Arc<AtomicBool>,
    break_requested: Arc<AtomicBool>,
}

impl CoreControl {
    pub fn pause(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn request_break(&self) {
        self.break_requested.store(true, Ordering::Release);
    }

    pub(super) fn take_break_request(&self) -> bool {
        self.break_requested.swap(false, Ordering::AcqRel)
    }
}

#[derive(Debug, Default)]
pub(super) struct Debugger {
    pub(super) enabled: bool,
    breakpoints: Vec<Breakpoint>,
    /// PC breakpoint to step over once after resuming from it.
    resume_pc: Option<u16>,
}

impl Debugger {
    pub(super) fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Returns false when the breakpoint was already set.
    pub(super) fn add(&mut self, breakpoint: Breakpoint) -> bool {
        if self.breakpoints.contains(&breakpoint) {
            return false;
        }
        self.breakpoints.push(breakpoint);
        true
    }

    pub(super) fn remove(&mut self, breakpoint: Breakpoint) -> bool {
        let before = self.breakpoints.len();
        self.breakpoints.retain(|existing| *existing != breakpoint);
        before != self.breakpoints.len()
    }

    pub(super) fn clear(&mut self) {
        self.breakpoints.clear();
        self.resume_pc = None;
    }

    pub(super) fn watched(&self) -> (Vec<u16>, Vec<u16>) {
        let mut reads = Vec::new();
        let mut writes = Vec::new();
        for breakpoint in &self.breakpoints {
            match *breakpoint {
                Breakpoint::Read(addr) => reads.push(addr),
                Breakpoint::Write(addr) => writes.push(addr),
                _ => {}
            }
        }
        (reads, writes)
    }

    pub(super) fn breaks_on_irq(&self) -> bool {
        self.enabled && self.breakpoints.contains(&Breakpoint::Irq)
    }

    /// Check the PC before an instruction runs. A hit is reported once; the
    /// next call at the same PC lets the instruction through.
    pub(super) fn check_pc(&mut self, pc: u16) -> Option<BreakReason> {
        if !self.enabled {
            return None;
        }
        if self.resume_pc.take() == Some(pc) {
            return None;
        }
        if self.breakpoints.contains(&Breakpoint::Execute(pc)) {
            self.resume_pc = Some(pc);
            return Some(BreakReason::Execute(pc));
        }
        None
    }
}
