//! Local preview of the emulated screen.

pub mod renderer;

pub use renderer::{DebugRenderer, Renderer};
