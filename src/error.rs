use core::fmt;

/// Reasons an operation was refused.
///
/// Every one of these is reported before any register is written, so a
/// failed call leaves the engine exactly as it was.
///
/// Note that some requests are accepted but do nothing: a source with zero
/// opacity, or one that lands entirely outside the target. Those return `Ok`
/// with a [`Transfer`] whose [`is_noop`] is true.
///
/// [`Transfer`]: crate::Transfer
/// [`is_noop`]: crate::Transfer::is_noop
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The target (or result layer) address is null.
    NullTarget,
    /// A memory-sourced input layer address is null.
    NullSource,
    /// A layer window is empty (`max <= min` on some axis), a layer has zero
    /// size, or a handshake parameter is out of range.
    InvalidRange,
    /// The transform cannot be inverted, or does not fit the Q16.16 matrix
    /// registers.
    InvalidMatrix,
    /// More source layers than the engine has inputs for.
    TooManyLayers,
    /// The requested feature does not exist on this engine generation.
    Unsupported,
    /// The decompressor refused to start.
    Decode,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Error::NullTarget => "null target address",
            Error::NullSource => "null source address",
            Error::InvalidRange => "invalid layer range",
            Error::InvalidMatrix => "invalid transform matrix",
            Error::TooManyLayers => "too many source layers",
            Error::Unsupported => "unsupported on this engine generation",
            Error::Decode => "decompressor failed to start",
        };
        f.write_str(s)
    }
}

impl From<math::Singular> for Error {
    fn from(_: math::Singular) -> Self {
        Error::InvalidMatrix
    }
}

impl From<crate::imdc::DecodeError> for Error {
    fn from(_: crate::imdc::DecodeError) -> Self {
        Error::Decode
    }
}

impl From<crate::fixed::Overflow> for Error {
    fn from(_: crate::fixed::Overflow) -> Self {
        Error::InvalidMatrix
    }
}
