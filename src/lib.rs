#![allow(clippy::needless_range_loop)]

mod bounding_box;
mod closest_parameter;
mod curve;
mod errors;
mod intersection;
mod knot;
mod misc;

pub mod prelude {
    pub use crate::bounding_box::*;
    pub use crate::curve::*;
    pub use crate::errors::*;
    pub use crate::intersection::*;
    pub use crate::knot::*;
    pub use crate::misc::*;
}
