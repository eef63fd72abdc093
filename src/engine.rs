//! Engine handle, start/finish, and completion.
//!
//! The engine is a two-state machine: idle until the run bit is written,
//! running until the last result pixel lands, then idle again on its own.
//! Starting it hands out a [`Transfer`], which holds the [`Ppe`] mutably
//! until the engine is idle again. That gives two ways to wait:
//!
//! - `transfer.wait()` spins on the run state.
//! - `transfer.await` sleeps until [`on_interrupt`] reports completion.
//!
//! Dropping a `Transfer` that is still running spins until it finishes, so a
//! second operation can never be programmed over a running one.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use crate::error::Error;
use crate::layer::LayerSet;
use crate::regs::{self, glb, glb_reg, Bus};
use crate::util::spin_lock::SpinLock;

/// Which generation of the engine is being driven.
///
/// The generations share a programming model; they differ in register
/// placement, clock gate bit and whether layers can take a DMA handshake.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Generation {
    Ppe,
    PpeV2,
}

impl Generation {
    /// Base address of the register block.
    pub const fn base(self) -> u32 {
        match self {
            Generation::Ppe => 0x4004_0000,
            Generation::PpeV2 => 0x4004_8000,
        }
    }

    /// Offset of the result layer block from [`Generation::base`].
    pub const fn result_base(self) -> u32 {
        0x40
    }

    /// Offset of input layer 1 from [`Generation::base`].
    pub const fn input_base(self) -> u32 {
        match self {
            Generation::Ppe => 0x80,
            Generation::PpeV2 => 0x100,
        }
    }

    /// Distance between consecutive input layer blocks.
    pub const fn layer_stride(self) -> u32 {
        match self {
            Generation::Ppe => 0x50,
            Generation::PpeV2 => 0x80,
        }
    }

    /// Bit in both clock gate registers.
    pub const fn clock_bit(self) -> u32 {
        match self {
            Generation::Ppe => 1 << 24,
            Generation::PpeV2 => 1 << 25,
        }
    }

    /// Position in per-generation tables.
    const fn index(self) -> usize {
        match self {
            Generation::Ppe => 0,
            Generation::PpeV2 => 1,
        }
    }

    /// Whether layers can be paced by a peripheral handshake.
    pub const fn has_handshake(self) -> bool {
        match self {
            Generation::Ppe => false,
            Generation::PpeV2 => true,
        }
    }
}

/// Waker of the `Transfer` being awaited on each engine, indexed by
/// [`Generation::index`].
static WAKERS: [SpinLock<Option<Waker>>; 2] =
    [SpinLock::new(None), SpinLock::new(None)];

/// Driver handle.
///
/// The handle owns the [`Bus`] the registers are reached through. Entry
/// points live in [`crate::blit`]; this module has the machinery they share.
pub struct Ppe<B: Bus> {
    bus: B,
    generation: Generation,
}

impl<B: Bus> Ppe<B> {
    /// Wraps `bus`. Nothing is written until [`Ppe::enable`].
    pub fn new(bus: B, generation: Generation) -> Self {
        Ppe { bus, generation }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Gives the bus back.
    pub fn free(self) -> B {
        self.bus
    }

    /// Ungates the engine clock and puts the interrupt in a known state
    /// (masked, nothing pending).
    pub fn enable(&mut self) {
        regs::set_clock(&mut self.bus, self.generation, true);
        self.quiesce_interrupt();
    }

    /// Gates the engine clock. Waits for any running operation first.
    pub fn disable(&mut self) {
        self.finish();
        regs::set_clock(&mut self.bus, self.generation, false);
    }

    /// Reads the run state.
    pub fn is_busy(&self) -> bool {
        let status = self.bus.read(glb_reg(self.generation, glb::STATUS));
        status & glb::STATUS_RUN_STATE != 0
    }

    /// Programs an arbitrary layer set and starts the engine. This is the
    /// escape hatch for compositions the stock entry points don't cover.
    pub fn run(&mut self, set: &LayerSet) -> Result<Transfer<'_, B>, Error> {
        set.validate(self.generation)?;
        Ok(self.start(set))
    }

    /// Waits for the engine to go idle, then clears and masks its
    /// interrupt.
    pub fn finish(&mut self) {
        while self.is_busy() {
            core::hint::spin_loop();
        }
        self.quiesce_interrupt();
    }

    /// Programs an already validated set and writes the run bit.
    pub(crate) fn start(&mut self, set: &LayerSet) -> Transfer<'_, B> {
        let g = self.generation;
        regs::program(&mut self.bus, g, set);
        self.bus.write(glb_reg(g, glb::INT_CLEAR), glb::INT_ALL);

        // Layer registers must land before the run bit does.
        barrier();
        self.bus.write(glb_reg(g, glb::CTRL), glb::CTRL_RUN);

        log::debug!(
            "ppe: start {:?} layers={:#07b} out @{:#010x} {}x{}",
            g,
            set.enable_mask(),
            set.result.address,
            set.result.width,
            set.result.height,
        );
        Transfer {
            ppe: Some(self),
            started: true,
        }
    }

    fn quiesce_interrupt(&mut self) {
        let g = self.generation;
        self.bus.write(glb_reg(g, glb::INT_MASK), glb::INT_ALL);
        self.bus.write(glb_reg(g, glb::INT_CLEAR), glb::INT_ALL);
    }

    fn listen(&mut self) {
        let g = self.generation;
        self.bus
            .modify(glb_reg(g, glb::INT_MASK), |m| m & !glb::INT_ALL_OVER);
    }
}

fn barrier() {
    cfg_if::cfg_if! {
        if #[cfg(all(target_arch = "arm", target_os = "none"))] {
            cortex_m::asm::dsb();
        } else {
            core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
        }
    }
}

/// Interrupt hook. Call this from the engine's interrupt handler with a bus
/// that reaches the same registers, e.g.
///
/// ```ignore
/// ppe::on_interrupt(&mut unsafe { Mmio::steal() }, Generation::PpeV2);
/// ```
///
/// It masks the interrupt (the awaiting [`Transfer`] clears it once it sees
/// the engine idle) and wakes the task.
pub fn on_interrupt<B: Bus>(bus: &mut B, generation: Generation) {
    bus.write(glb_reg(generation, glb::INT_MASK), glb::INT_ALL);
    // If the waker slot is being updated right now, the poller re-checks the
    // run state after unmasking, so the wakeup isn't lost.
    let waker = WAKERS[generation.index()].try_with(Option::take);
    if let Ok(Some(w)) = waker {
        w.wake();
    }
}

/// An operation started on the engine, or a request that turned out to need
/// no work at all.
#[must_use = "dropping a running Transfer spins until the engine is idle"]
pub struct Transfer<'a, B: Bus> {
    ppe: Option<&'a mut Ppe<B>>,
    started: bool,
}

impl<'a, B: Bus> Transfer<'a, B> {
    /// A transfer for a request that was accepted but needs no hardware
    /// work (zero opacity, nothing visible).
    pub(crate) fn noop() -> Self {
        Transfer {
            ppe: None,
            started: false,
        }
    }

    /// True if the request was accepted without starting the engine.
    pub fn is_noop(&self) -> bool {
        !self.started
    }

    /// Polls the run state without blocking.
    pub fn is_done(&self) -> bool {
        self.ppe.as_ref().map_or(true, |ppe| !ppe.is_busy())
    }

    /// Spins until the engine is idle.
    pub fn wait(mut self) {
        if let Some(ppe) = self.ppe.take() {
            ppe.finish();
        }
    }
}

impl<'a, B: Bus> Future for Transfer<'a, B> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let done = match this.ppe.as_mut() {
            None => true,
            Some(ppe) if !ppe.is_busy() => true,
            Some(ppe) => {
                let slot = &WAKERS[ppe.generation.index()];
                *slot.lock() = Some(cx.waker().clone());
                ppe.listen();
                // Completion may have raced the registration.
                !ppe.is_busy()
            }
        };
        if done {
            if let Some(ppe) = this.ppe.take() {
                ppe.finish();
            }
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl<'a, B: Bus> Drop for Transfer<'a, B> {
    fn drop(&mut self) {
        if let Some(ppe) = self.ppe.take() {
            ppe.finish();
        }
    }
}
