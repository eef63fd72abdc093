//! A register bus that records instead of touching hardware.
//!
//! `MockBus` keeps a register file and a log of every write, and plays the
//! engine's run state: writing the run bit makes `STATUS` report busy for a
//! configurable number of reads, after which the run is over.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::vec::Vec;

use crate::engine::Generation;
use crate::regs::{glb, glb_reg, Bus};

#[derive(Debug)]
pub struct MockBus {
    generation: Generation,
    regs: BTreeMap<u32, u32>,
    log: Vec<(u32, u32)>,
    /// `STATUS` reads left before a started run reports idle.
    busy_reads: Cell<u32>,
    latency: u32,
}

impl MockBus {
    /// A bus with all registers zero and runs that finish after one busy
    /// status read.
    pub fn new(generation: Generation) -> Self {
        MockBus {
            generation,
            regs: BTreeMap::new(),
            log: Vec::new(),
            busy_reads: Cell::new(0),
            latency: 1,
        }
    }

    /// Makes each run report busy for `reads` status reads.
    pub fn with_latency(mut self, reads: u32) -> Self {
        self.latency = reads;
        self
    }

    /// Current register value, without side effects.
    pub fn peek(&self, addr: u32) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    /// Total number of writes.
    pub fn writes(&self) -> usize {
        self.log.len()
    }

    /// Number of writes to `addr`.
    pub fn writes_to(&self, addr: u32) -> usize {
        self.log.iter().filter(|&&(a, _)| a == addr).count()
    }

    /// Every write in order, as `(address, value)`.
    pub fn log(&self) -> &[(u32, u32)] {
        &self.log
    }

    /// Number of times the engine was started.
    pub fn runs(&self) -> usize {
        let ctrl = glb_reg(self.generation, glb::CTRL);
        self.log
            .iter()
            .filter(|&&(a, v)| a == ctrl && v & glb::CTRL_RUN != 0)
            .count()
    }

    /// Forgets the write log, keeping register contents.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl Bus for MockBus {
    fn read(&self, addr: u32) -> u32 {
        if addr == glb_reg(self.generation, glb::STATUS) {
            let left = self.busy_reads.get();
            if left > 0 {
                self.busy_reads.set(left - 1);
                return glb::STATUS_RUN_STATE;
            }
            return 0;
        }
        self.peek(addr)
    }

    fn write(&mut self, addr: u32, value: u32) {
        self.log.push((addr, value));
        let ctrl = glb_reg(self.generation, glb::CTRL);
        if addr == ctrl && value & glb::CTRL_RUN != 0 {
            self.busy_reads.set(self.latency);
            // Run bit self-clears.
            self.regs.insert(addr, value & !glb::CTRL_RUN);
            return;
        }
        self.regs.insert(addr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_reports_busy_then_idle() {
        let g = Generation::Ppe;
        let mut bus = MockBus::new(g).with_latency(2);
        let status = glb_reg(g, glb::STATUS);
        assert_eq!(bus.read(status), 0);
        bus.write(glb_reg(g, glb::CTRL), glb::CTRL_RUN);
        assert_eq!(bus.read(status), glb::STATUS_RUN_STATE);
        assert_eq!(bus.read(status), glb::STATUS_RUN_STATE);
        assert_eq!(bus.read(status), 0);
        assert_eq!(bus.runs(), 1);
    }

    #[test]
    fn modify_goes_through_log() {
        let mut bus = MockBus::new(Generation::PpeV2);
        bus.write(0x10, 0b1010);
        bus.modify(0x10, |v| v | 1);
        assert_eq!(bus.peek(0x10), 0b1011);
        assert_eq!(bus.writes_to(0x10), 2);
        bus.clear_log();
        assert_eq!(bus.writes(), 0);
        assert_eq!(bus.peek(0x10), 0b1011);
    }
}
