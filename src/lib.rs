//! # meshscope
//!
//! An interactive viewer for triangle meshes and point clouds.
//!
//! This is the umbrella crate that provides convenient access to all meshscope
//! functionality. Use the individual crates for more granular control over
//! dependencies.
//!
//! ## Features
//!
//! - **Core**: vertex records, transforms, normals and uv remapping
//! - **I/O**: the basic OBJ text format
//! - **GPU**: renderable meshes, point clouds and textures, with a wgpu backend
//!   and a recording backend for headless use
//! - **Viewer**: orbit camera, input handling and a native window
//!
//! ## Quick Start
//!
//! ```rust
//! use meshscope::prelude::*;
//!
//! let mut viewer = Viewer::new();
//! viewer.add_cube([0.0, 0.0, 0.0], 1.0, [1.0, 0.5, 0.0]).unwrap();
//! viewer.add_line([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0.0, 0.0, 1.0]);
//!
//! // Drive one frame without a window
//! let mut ctx = HeadlessContext::new();
//! viewer.open(&mut ctx).unwrap();
//! viewer.frame(&mut ctx).unwrap();
//! assert_eq!(ctx.draw_call_count(), 3);
//! // viewer.show() opens a window instead
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: io, gpu and viewer
//! - `io`: basic OBJ reading and writing
//! - `gpu`: renderable objects and rendering backends
//! - `viewer`: interactive viewer (implies `gpu`)
//! - `all`: everything

// Re-export core functionality
pub use meshscope_core::*;

// Re-export sub-crates
#[cfg(feature = "io")]
pub use meshscope_io as io;

#[cfg(feature = "gpu")]
pub use meshscope_gpu as gpu;

#[cfg(feature = "viewer")]
pub use meshscope_viewer as viewer;

/// Convenient imports for common use cases
pub mod prelude {
    pub use meshscope_core::*;

    #[cfg(feature = "io")]
    pub use meshscope_io::*;

    #[cfg(feature = "gpu")]
    pub use meshscope_gpu::*;

    #[cfg(feature = "viewer")]
    pub use meshscope_viewer::*;
}
