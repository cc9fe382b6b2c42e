//! `cannon-matrix` - Dense matrix data model and GEMM kernels for cannon-gemm.
//!
//! This crate provides:
//! - A row-major `Matrix` type with block extraction and placement
//! - A `ComputeBackend` trait for the block multiply-accumulate kernel
//! - A reference `CpuBackend` implementation
//! - `sequential_matmul`, the single-worker path and correctness oracle
//! - The `Element` trait for the supported floating-point types

pub mod backend;
pub mod cpu;
pub mod element;
pub mod error;
pub mod matrix;
pub mod reference;
pub mod shape;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
pub use element::Element;
pub use error::{MatrixError, Result};
pub use matrix::Matrix;
pub use reference::sequential_matmul;
pub use shape::Shape;
