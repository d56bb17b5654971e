//! Rotor cross-section geometry for permanent-magnet synchronous machines.

pub mod document;
pub mod draw;
pub mod error;
pub mod point;
pub mod primitives;
pub mod rotors;
pub mod session;

pub use document::{Document, DrawingPrimitive};
pub use error::{GeometryError, Result};
pub use point::Point;
pub use session::DrawingSession;
