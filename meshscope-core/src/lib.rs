//! Core data structures and traits for meshscope
//!
//! This crate provides the vertex record layouts, the geometry utilities
//! (normal estimation, uv topology remapping), the shared transform model and
//! the error type used across the workspace.

pub mod error;
pub mod geometry;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod vertex;

pub use error::*;
pub use geometry::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use vertex::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix2, Matrix3, Matrix4, Point3, Vector2, Vector3, Vector4};
