use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, U1};

use crate::curve::nurbs_curve::NurbsCurve;
use crate::misc::FloatingPoint;

/// Construction strategies accepted by [`ArcLengthCurve`](crate::curve::ArcLengthCurve).
/// Each variant yields the same wrapped spline type, so concrete shapes
/// stay free of subtype hierarchies.
pub enum CurveGeometry<T: FloatingPoint, D: DimName>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    /// Raw NURBS control data with homogeneous control points,
    /// the last coordinate of each point being its weight.
    ControlPoints {
        degree: usize,
        control_points: Vec<OPoint<T, D>>,
        knots: Vec<T>,
    },
    /// A straight segment between two points,
    /// parameterized by chord length so that the native domain
    /// already matches the arc length domain.
    Line {
        start: OPoint<T, DimNameDiff<D, U1>>,
        end: OPoint<T, DimNameDiff<D, U1>>,
    },
    /// A spline that has already been built elsewhere.
    Spline(NurbsCurve<T, D>),
}
