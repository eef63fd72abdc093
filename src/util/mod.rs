//! Utility code; candidates for factoring out.

pub mod spin_lock;
