use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul};

/// Numeric element type a `Matrix` can hold.
///
/// Kernels only rely on the native `+` and `*` of the type; there is no
/// pivoting, compensation or other special numeric handling.
pub trait Element:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Mul<Output = Self>
    + AddAssign
    + 'static
{
    /// Additive identity.
    const ZERO: Self;
    /// Multiplicative identity.
    const ONE: Self;
    /// Short name used in log output (e.g. "f64").
    const NAME: &'static str;

    /// Widen to `f64` for error reporting and relative comparisons.
    fn to_f64(self) -> f64;
}

impl Element for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const NAME: &'static str = "f32";

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const NAME: &'static str = "f64";

    fn to_f64(self) -> f64 {
        self
    }
}
