pub mod arc_length_curve;
pub mod curve_geometry;
pub mod nurbs_curve;
pub mod tangent_frame;
pub use arc_length_curve::*;
pub use curve_geometry::*;
pub use nurbs_curve::*;
pub use tangent_frame::*;

#[cfg(test)]
mod tests;
