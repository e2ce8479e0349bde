pub mod brep;
pub mod primitives;
pub mod synthesis;
