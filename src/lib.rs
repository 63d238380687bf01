// src/lib.rs

pub mod cache;
pub mod config;
pub mod error;
pub mod kernel;
pub mod mesh;
pub mod ovf;
pub mod scalar_field;
pub mod vec3;
pub mod visualisation;

pub use error::{KernelError, Result};
pub use kernel::{brute_kernel, DemagKernel, DEFAULT_ACCURACY};
pub use mesh::Mesh;
pub use scalar_field::ScalarField3D;
