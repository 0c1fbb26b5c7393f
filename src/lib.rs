//! # paint-rig
//!
//! Procedural painting and rigging engine for a drawing application.
//!
//! The crate turns raw pointer input into brush strokes on a raster surface,
//! resolves perspective-guided geometry, computes intersections and
//! subdivisions of cubic Bézier paths, and poses bone hierarchies with
//! inverse kinematics. It features:
//!
//! - Stabilised, spacing-interpolated strokes with pressure and velocity dynamics
//! - Standard, Hairy, Smudge and Binary brush tips
//! - Premultiplied RGBA compositing with SVG-style blend modes and an eraser
//! - Fisheye projection, fisheye grid clamping and ruler snapping
//! - Recursive Bézier intersection search and an intersection eraser
//! - Bone validation, spring-damper physics, smart bones and FABRIK IK
//!
//! ## Architecture
//!
//! Four engines sit on a small raster core:
//!
//! 1. **Raster core**: pixel buffers, blending, affine stamp placement,
//!    blur and a bitmap font (`rendering_buffer` .. `glyph_raster_bin`)
//! 2. **VectorEngine**: [`vector_engine`] over [`curves`]
//! 3. **PerspectiveEngine**: [`perspective`]
//! 4. **BrushEngine**: [`brush_engine`] over [`stamp`] and [`texture`]
//! 5. **SkeletalEngine**: [`skeleton`]
//!
//! Only the brush engine holds state. It draws through the
//! [`surface::RasterSurface`] trait, which [`RenderingBuffer`] implements.

// Foundation types & math
pub mod basics;
pub mod color;
pub mod error;
pub mod math;

// Raster core
pub mod blur;
pub mod comp_op;
pub mod glyph_raster_bin;
pub mod pixfmt_rgba;
pub mod rendering_buffer;
pub mod surface;
pub mod trans_affine;

// Geometry
pub mod curves;
pub mod perspective;
pub mod vector_engine;

// Brushes
pub mod brush_engine;
pub mod stamp;
pub mod texture;

// Rigging
pub mod skeleton;

pub use basics::{PointD, RectD};
pub use brush_engine::{
    BrushConfig, BrushEngine, ColorHistory, ColorMood, EngineSettings, PointerSample, SampleQueue,
    StrokeStart, StrokeState, StrokeSummary,
};
pub use color::Rgba8;
pub use comp_op::BlendMode;
pub use curves::CubicBezier;
pub use error::{ColorParseError, SkeletonError, TextureError};
pub use perspective::{project_fisheye, snap_to_grid, snap_to_ruler, GridKind, PerspectiveGrid};
pub use rendering_buffer::RenderingBuffer;
pub use skeleton::{
    apply_physics, solve_fabrik, solve_smart_bones, validate_skeleton, Bone, BoneDrag,
    DragHandle, SkeletalLayer, Skeleton,
};
pub use stamp::StampEngine;
pub use surface::RasterSurface;
pub use texture::{Texture, TextureCache};
pub use vector_engine::{
    erase_to_intersection, find_intersections, BezierControlPoint, BezierPath, EraseMode,
};
