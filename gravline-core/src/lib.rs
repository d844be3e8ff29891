//! Board-agnostic core logic for the wireframe display pipeline
//!
//! This crate contains everything that turns world geometry into
//! screen-space line segments without touching hardware:
//!
//! - Q16.16 fixed-point scalar used for every spatial quantity
//! - 3D vectors and integer square root
//! - Camera basis construction and perspective projection
//! - Per-frame line list (`DrawList`)
//! - Discrete planar modifiers and world primitives (scene assembly)
//! - Level column format consumed by the scene assembler
//! - Configuration type definitions
//! - The display capability trait implemented by the display backends

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod camera;
pub mod config;
pub mod draw_list;
pub mod fixed;
pub mod level;
pub mod math;
pub mod scene;
pub mod traits;

pub use camera::{Camera, CameraBasis, NEAR_PLANE};
pub use draw_list::{DrawList, Line2D, MAX_LINES};
pub use fixed::Fixed;
pub use math::{ScreenPoint, Vec3};
pub use scene::{Modifier, PlacedPrimitive, Primitive, SceneBuilder};
pub use traits::{Display, DisplayError};
