pub mod tolerance;
pub mod geometry;
pub mod topology;
pub mod validation;
pub mod traits;
pub mod boolean;

// Re-export the entry points at crate root for convenience.
pub use boolean::config::{BooleanConfig, FilterStrategy};
pub use boolean::error::BooleanError;
pub use boolean::{intersect, invert, subtract, union, BooleanEngine, DefaultBooleanEngine};
pub use tolerance::{default_tolerance, Tolerance};
pub use traits::{FaceSynthesizer, GeometryKernel};
