use argmin::core::{CostFunction, Gradient};
use nalgebra::{
    allocator::Allocator, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OVector, U1, U2,
};

use crate::{curve::nurbs_curve::NurbsCurve, misc::FloatingPoint};

/// Cost & gradient provider for finding the intersection between two curves
/// by minimizing the squared distance between points on each curve.
pub struct CurveIntersectionProblem<'a, T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    a: &'a NurbsCurve<T, D>,
    b: &'a NurbsCurve<T, D>,
}

impl<'a, T: FloatingPoint, D: DimName> CurveIntersectionProblem<'a, T, D>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    pub fn new(a: &'a NurbsCurve<T, D>, b: &'a NurbsCurve<T, D>) -> Self {
        CurveIntersectionProblem { a, b }
    }
}

impl<'a, T: FloatingPoint, D: DimName> CostFunction for CurveIntersectionProblem<'a, T, D>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Param = OVector<T, U2>;
    type Output = T;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, anyhow::Error> {
        let da = self.a.knots_domain();
        let db = self.b.knots_domain();
        let pa = param[0].max(da.0).min(da.1);
        let pb = param[1].max(db.0).min(db.1);
        let p0 = self.a.point_at(pa);
        let p1 = self.b.point_at(pb);
        Ok((p0 - p1).norm_squared())
    }
}

impl<'a, T: FloatingPoint, D: DimName> Gradient for CurveIntersectionProblem<'a, T, D>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Param = OVector<T, U2>;
    type Gradient = OVector<T, U2>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, anyhow::Error> {
        let aderiv = self.a.rational_derivatives(param[0], 1);
        let bderiv = self.b.rational_derivatives(param[1], 1);
        let r = &aderiv[0] - &bderiv[0];
        Ok(
            OVector::<T, U2>::new(aderiv[1].dot(&r), -bderiv[1].dot(&r))
                * T::from_f64(2.0).unwrap(),
        )
    }
}
