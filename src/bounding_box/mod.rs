pub mod bounding_box_traversal;
pub mod curve_bounding_box_tree;

pub use bounding_box_traversal::*;
pub use curve_bounding_box_tree::*;

use nalgebra::{
    allocator::Allocator, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, OVector, U1,
};

use crate::{curve::nurbs_curve::NurbsCurve, misc::FloatingPoint};

/// A struct representing a bounding box in D space.
#[derive(Clone, Debug)]
pub struct BoundingBox<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    min: OVector<T, D>,
    max: OVector<T, D>,
}

impl<T: FloatingPoint, D: DimName> BoundingBox<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a new bounding box from a minimum and maximum point.
    pub fn new(min: OVector<T, D>, max: OVector<T, D>) -> Self {
        let mut tmin = OVector::<T, D>::from_element(T::max_value().unwrap());
        let mut tmax = -tmin.clone();

        for i in 0..D::dim() {
            tmin[i] = tmin[i].min(min[i]).min(max[i]);
            tmax[i] = tmax[i].max(max[i]).max(min[i]);
        }

        BoundingBox {
            min: tmin,
            max: tmax,
        }
    }

    /// Create a new bounding box from point iterator.
    pub fn new_with_points<I: IntoIterator<Item = OPoint<T, D>>>(iter: I) -> Self {
        let mut min = OVector::<T, D>::from_element(T::max_value().unwrap());
        let mut max = -min.clone();

        for point in iter {
            for i in 0..D::dim() {
                min[i] = min[i].min(point[i]);
                max[i] = max[i].max(point[i]);
            }
        }

        Self { min, max }
    }

    pub fn min(&self) -> &OVector<T, D> {
        &self.min
    }

    pub fn max(&self) -> &OVector<T, D> {
        &self.max
    }

    /// Check if the bounding box intersects with another bounding box.
    ///
    /// # Examples
    /// ```
    /// use nalgebra::Vector3;
    /// use arcurve::prelude::BoundingBox;
    ///
    /// let b0 = BoundingBox::new(Vector3::from_element(0.), Vector3::from_element(1.));
    /// assert!(b0.intersects(&b0, None));
    ///
    /// let eps = 1e-6;
    /// let b1 = BoundingBox::new(Vector3::from_element(0.5), Vector3::from_element(1.5));
    /// assert!(b0.intersects(&b1, None));
    ///
    /// let b2 = BoundingBox::new(Vector3::from_element(1. + eps), Vector3::from_element(2. + eps));
    /// assert!(!b0.intersects(&b2, None));
    /// ```
    pub fn intersects(&self, other: &Self, tolerance: Option<T>) -> bool {
        let tolerance = tolerance.unwrap_or(T::default_epsilon());
        // Check if the bounding boxes intersect along each dimension.
        for i in 0..D::dim() {
            let min0 = self.min[i];
            let max0 = self.max[i];
            let min1 = other.min[i];
            let max1 = other.max[i];

            let a0 = min0 - tolerance;
            let a1 = max0 + tolerance;
            let b0 = min1 - tolerance;
            let b1 = max1 + tolerance;

            let d0 = b0 - a1;
            let d1 = b1 - a0;

            // If the intervals are disjoint,
            // there is no intersection.
            if d0 * d1 > T::zero() {
                return false;
            }
        }

        true
    }

    /// Check if the bounding box contains a point.
    /// # Examples
    /// ```
    /// use nalgebra::{Point3, Vector3};
    /// use arcurve::prelude::BoundingBox;
    /// let bb = BoundingBox::new(Vector3::from_element(0.), Vector3::from_element(1.));
    /// assert!(bb.contains(&Point3::new(0.5, 0.5, 0.5)));
    /// assert!(bb.contains(&Point3::new(0., 0.5, 1.0)));
    /// assert!(!bb.contains(&Point3::new(-1e-8, 0.5, 0.5)));
    /// ```
    pub fn contains(&self, point: &OPoint<T, D>) -> bool {
        (0..D::dim()).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }
}

impl<T: FloatingPoint, D: DimName> FromIterator<OPoint<T, D>> for BoundingBox<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    fn from_iter<I: IntoIterator<Item = OPoint<T, D>>>(iter: I) -> Self {
        Self::new_with_points(iter)
    }
}

impl<'a, T: FloatingPoint, D: DimName> From<&'a NurbsCurve<T, D>>
    for BoundingBox<T, DimNameDiff<D, U1>>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    fn from(value: &'a NurbsCurve<T, D>) -> Self {
        let pts = value.dehomogenized_control_points();
        Self::new_with_points(pts)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{Point2, Vector2};

    use crate::curve::nurbs_curve::NurbsCurve2D;

    use super::BoundingBox;

    #[test]
    fn curve_bounding_box_covers_control_points() {
        let polyline = NurbsCurve2D::<f64>::polyline(
            &[
                Point2::new(-2., 1.),
                Point2::new(3., -1.),
                Point2::new(1., 4.),
            ],
            false,
        );
        let bb: BoundingBox<f64, _> = (&polyline).into();
        assert_eq!(bb.min(), &Vector2::new(-2., -1.));
        assert_eq!(bb.max(), &Vector2::new(3., 4.));
        assert!(bb.contains(&Point2::new(0., 0.)));
        assert!(!bb.contains(&Point2::new(0., 5.)));
    }
}
