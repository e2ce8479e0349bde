pub mod point;
pub mod vector;
pub mod bounds;
pub mod curves;
pub mod surfaces;
pub mod polygon;
pub mod intersection;
pub mod surface_intersection;
pub mod kernel;
