//! Driver for the PPE pixel-processing engine (both the first-generation PPE
//! and PPEV2).
//!
//! The engine composes up to four input layers into one result layer, reading
//! and writing memory by DMA. Each input layer carries a 3x3 fixed-point
//! matrix that maps result pixels back to source pixels, which is how the
//! engine scales, rotates and perspective-warps images.
//!
//! Using the driver looks like this:
//!
//! 1. Build [`Buffer`]s describing the surfaces involved.
//! 2. Build a forward transform with [`math::Mat3f`] helpers, if any.
//! 3. Call one of the [`Ppe`] entry points ([`Ppe::blit`], [`Ppe::mask`], ...).
//!    They validate everything before touching hardware and hand back a
//!    [`Transfer`].
//! 4. Either [`Transfer::wait`] for it, or `.await` it and route the PPE
//!    interrupt to [`on_interrupt`].
//!
//! Only one operation may be in flight per engine. The `Transfer` borrows the
//! `Ppe` mutably, so this holds within one handle; sharing the handle between
//! interrupt priorities is the caller's business (see
//! [`util::spin_lock::SpinLock`]).

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod area;
pub mod blit;
pub mod buffer;
pub mod engine;
pub mod fixed;
pub mod imdc;
pub mod layer;
pub mod pixel;
pub mod regs;
pub mod util;

#[cfg(any(test, feature = "std"))]
pub mod mock;

mod error;

pub use math;

pub use crate::area::{get_area, Rect};
pub use crate::blit::{
    Background, BlendLayer, BlitMode, InputList, Layer, StreamSource,
};
pub use crate::buffer::{Buffer, ColorKey, KeyMode};
pub use crate::engine::{on_interrupt, Generation, Ppe, Transfer};
pub use crate::error::Error;
pub use crate::fixed::FixedMatrix;
pub use crate::imdc::{DecodeRange, Decompressor, DmaConfig};
pub use crate::pixel::PixelFormat;
pub use crate::regs::{Bus, Mmio};
