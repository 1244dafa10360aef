//! Types shared by the core and the process-level modules

pub mod geometry;

pub use geometry::Geometry;
