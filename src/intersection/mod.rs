pub mod curve_intersection;
pub mod curve_intersection_bfgs;
pub mod curve_intersection_problem;
pub mod curve_intersection_solver_options;
pub mod intersection_curve_curve;

pub use curve_intersection::*;
pub use curve_intersection_bfgs::*;
pub use curve_intersection_problem::*;
pub use curve_intersection_solver_options::*;

/// Intersection between two objects trait
pub trait Intersects<'a, T> {
    type Output;
    type Option;

    fn find_intersections(&'a self, other: T, option: Self::Option) -> Self::Output;
}
