use argmin::core::{ArgminFloat, Executor, State};

use gauss_quad::GaussLegendre;
use nalgebra::allocator::Allocator;
use nalgebra::{
    Const, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, OVector, RealField, U1,
};
use simba::scalar::SupersetOf;

use crate::closest_parameter::{ClosestParameterNewton, ClosestParameterProblem};
use crate::knot::KnotVector;
use crate::misc::binomial::Binomial;
use crate::misc::trigonometry::segment_closest_point;
use crate::misc::{FloatingPoint, Invertible};

/// NURBS curve representation
/// By generics, it can be used for 2D or 3D curves with f32 or f64 scalar types
#[derive(Clone, Debug)]
pub struct NurbsCurve<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// control points with homogeneous coordinates
    /// the last element of the vector is the `weight`
    control_points: Vec<OPoint<T, D>>,
    degree: usize,
    /// knot vector for the NURBS curve
    /// the length of the knot vector is equal to the `# of control points + degree + 1`
    knots: KnotVector<T>,
}

/// 2D NURBS curve alias
pub type NurbsCurve2D<T> = NurbsCurve<T, Const<3>>;

/// 3D NURBS curve alias
pub type NurbsCurve3D<T> = NurbsCurve<T, Const<4>>;

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a new NURBS curve
    /// # Failures
    /// - if the number of control points is less than the degree
    /// - the number of knots is not equal to the number of control points + the degree + 1
    ///
    /// # Example
    /// ```
    /// use arcurve::prelude::*;
    /// use nalgebra::Point3;
    ///
    /// let w = 1.; // weight for each control point
    /// let control_points: Vec<Point3<f64>> = vec![
    ///     Point3::new(0., 0., w),
    ///     Point3::new(2., 4., w),
    ///     Point3::new(5., 4., w),
    ///     Point3::new(8., 1., w),
    ///     Point3::new(10., 2., w),
    /// ];
    /// let degree = 2;
    /// let m = control_points.len() + degree + 1;
    /// // create an uniform knot vector
    /// let knots = (0..m).map(|i| i as f64).collect();
    /// let nurbs = NurbsCurve::try_new(degree, control_points, knots);
    /// assert!(nurbs.is_ok());
    /// ```
    pub fn try_new(
        degree: usize,
        control_points: Vec<OPoint<T, D>>,
        knots: Vec<T>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            control_points.len() > degree,
            "Too few control points for curve"
        );
        anyhow::ensure!(
            knots.len() == control_points.len() + degree + 1,
            "Invalid number of knots, got {}, expected {}",
            knots.len(),
            control_points.len() + degree + 1
        );

        let mut knots = knots;
        knots.sort_by(|a, b| a.partial_cmp(b).unwrap());

        Ok(Self {
            degree,
            control_points,
            knots: KnotVector::new(knots),
        })
    }

    /// Create a curve without any validation, used internally
    /// when the control data is known to be consistent
    pub(crate) fn new_unchecked(
        degree: usize,
        control_points: Vec<OPoint<T, D>>,
        knots: KnotVector<T>,
    ) -> Self {
        Self {
            degree,
            control_points,
            knots,
        }
    }

    /// Create a degree 1 polyline curve through the given points
    /// The knot vector is chord length parameterized,
    /// optionally normalized into the [0, 1] interval
    /// # Example
    /// ```
    /// use arcurve::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    ///
    /// let line = NurbsCurve2D::polyline(&[
    ///     Point2::new(0., 0.),
    ///     Point2::new(3., 4.),
    /// ], false);
    /// // chord length parameterization
    /// assert_relative_eq!(line.knots_domain().1, 5.);
    /// assert_relative_eq!(line.point_at(2.5), Point2::new(1.5, 2.));
    /// ```
    pub fn polyline(points: &[OPoint<T, DimNameDiff<D, U1>>], normalize_knots: bool) -> Self
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let mut knots = vec![T::zero(), T::zero()];

        let mut acc = T::zero();
        for i in 0..points.len() - 1 {
            acc += (&points[i + 1] - &points[i]).norm();
            knots.push(acc);
        }
        knots.push(acc);

        if normalize_knots && acc > T::zero() {
            knots.iter_mut().for_each(|k| *k /= acc);
        }

        let control_points = points
            .iter()
            .map(|p| {
                let mut cp = OPoint::<T, D>::origin();
                for i in 0..(D::dim() - 1) {
                    cp[i] = p[i];
                }
                cp[D::dim() - 1] = T::one();
                cp
            })
            .collect();

        Self {
            degree: 1,
            control_points,
            knots: KnotVector::new(knots),
        }
    }

    /// Return the dehomogenized control points
    pub fn dehomogenized_control_points(&self) -> Vec<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        self.control_points
            .iter()
            .map(|p| dehomogenize(p).unwrap())
            .collect()
    }

    /// Evaluate the curve at a given parameter to get a dehomonogenized point
    pub fn point_at(&self, t: T) -> OPoint<T, DimNameDiff<D, U1>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let p = self.point(t);
        dehomogenize(&p).unwrap()
    }

    #[allow(clippy::type_complexity)]
    /// Sample the curve at a given number of points between the start and end
    /// Return the vector of tuples of parameter and point
    pub fn sample_regular_range_with_parameter(
        &self,
        start: T,
        end: T,
        samples: usize,
    ) -> Vec<(T, OPoint<T, DimNameDiff<D, U1>>)>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let mut points = vec![];
        let us = T::from_usize(samples).unwrap();
        let step = (end - start) / (us - T::one());
        for i in 0..samples {
            let t = start + T::from_usize(i).unwrap() * step;
            points.push((t, self.point_at(t)));
        }
        points
    }

    /// Evaluate the curve at a given parameter to get a point
    pub(crate) fn point(&self, t: T) -> OPoint<T, D> {
        let n = self.knots.len() - self.degree - 2;
        let knot_span_index = self.knots.find_knot_span_index(n, self.degree, t);
        let basis = self.knots.basis_functions(knot_span_index, t, self.degree);
        let mut position = OPoint::<T, D>::origin();
        for i in 0..=self.degree {
            position.coords +=
                &self.control_points[knot_span_index - self.degree + i].coords * basis[i];
        }
        position
    }

    /// Evaluate the rational derivatives at a given parameter
    /// Returns the point and the derivative vectors up to the requested order
    pub fn rational_derivatives(
        &self,
        u: T,
        derivs: usize,
    ) -> Vec<OVector<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let ders = self.derivatives(u, derivs);
        let a_ders: Vec<_> = ders
            .iter()
            .map(|d| {
                let mut a_ders = vec![];
                for i in 0..D::dim() - 1 {
                    a_ders.push(d[i]);
                }
                OVector::<T, DimNameDiff<D, U1>>::from_vec(a_ders)
            })
            .collect();
        let w_ders: Vec<_> = ders.iter().map(|d| d[D::dim() - 1]).collect();

        let mut ck = vec![];
        let mut binom = Binomial::<T>::new();
        for k in 0..=derivs {
            let mut v = a_ders[k].clone();

            for i in 1..=k {
                let coef = binom.get(k, i) * w_ders[i];
                v -= &ck[k - i] * coef;
            }

            let dehom = v / w_ders[0];
            ck.push(dehom);
        }
        ck
    }

    /// Evaluate the derivatives at a given parameter
    fn derivatives(&self, u: T, derivs: usize) -> Vec<OVector<T, D>> {
        let n = self.knots.len() - self.degree - 2;

        let du = if derivs < self.degree {
            derivs
        } else {
            self.degree
        };
        let mut derivatives = vec![OVector::<T, D>::zeros(); derivs + 1];

        let knot_span_index = self.knots.find_knot_span_index(n, self.degree, u);
        let nders = self
            .knots
            .derivative_basis_functions(knot_span_index, u, self.degree, du);
        for k in 0..=du {
            for j in 0..=self.degree {
                let w = &self.control_points[knot_span_index - self.degree + j] * nders[k][j];
                let column = derivatives.get_mut(k).unwrap();
                w.coords.iter().enumerate().for_each(|(i, v)| {
                    column[i] += *v;
                });
            }
        }

        derivatives
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &KnotVector<T> {
        &self.knots
    }

    pub fn control_points(&self) -> &Vec<OPoint<T, D>> {
        &self.control_points
    }

    pub fn knots_domain(&self) -> (T, T) {
        self.knots.domain(self.degree)
    }

    pub fn knots_domain_interval(&self) -> T {
        let (d0, d1) = self.knots_domain();
        d1 - d0
    }

    /// Compute the length of the curve by gauss-legendre quadrature
    /// # Example
    /// ```
    /// use arcurve::prelude::*;
    /// use nalgebra::Point3;
    /// use approx::assert_relative_eq;
    /// let corner_weight = 1. / 2.;
    /// let unit_circle = NurbsCurve2D::try_new(
    ///     2,
    ///     vec![
    ///         Point3::new(1.0, 0.0, 1.),
    ///         Point3::new(1.0, 1.0, 1.0) * corner_weight,
    ///         Point3::new(-1.0, 1.0, 1.0) * corner_weight,
    ///         Point3::new(-1.0, 0.0, 1.),
    ///         Point3::new(-1.0, -1.0, 1.0) * corner_weight,
    ///         Point3::new(1.0, -1.0, 1.0) * corner_weight,
    ///         Point3::new(1.0, 0.0, 1.),
    ///     ],
    ///     vec![0., 0., 0., 1. / 4., 1. / 2., 1. / 2., 3. / 4., 1., 1., 1.],
    /// ).unwrap();
    /// let approx = unit_circle.try_length().unwrap();
    /// let goal = 2.0 * std::f64::consts::PI; // circumference of the unit circle
    /// assert_relative_eq!(approx, goal);
    /// ```
    pub fn try_length(&self) -> anyhow::Result<T>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let segments = self.try_domain_bezier_segments()?;
        let (_, u) = self.knots_domain();
        let gauss = GaussLegendre::init(16 + self.degree);
        let length = segments
            .iter()
            .map(|s| compute_bezier_segment_length(s, u, &gauss))
            .fold(T::zero(), |a, b| a + b);
        Ok(length)
    }

    /// Decompose the curve into Bezier segments that exactly tile the knot domain.
    /// For an unclamped curve the decomposition of the clamped clone produces
    /// segments outside the domain, which are dropped here.
    pub fn try_domain_bezier_segments(&self) -> anyhow::Result<Vec<Self>> {
        let mult = self.knots.multiplicity();
        let start = mult.first().unwrap().multiplicity();
        let end = mult.last().unwrap().multiplicity();

        let segments = self.try_decompose_bezier_segments()?;

        // If the start/end parts of the knot vector are not duplicated,
        // the Bezier segments will not be generated correctly,
        // so reduce the number of segments by the amount that falls below the required duplication degree.
        let required_multiplicity = self.degree + 1;
        let i = if start < required_multiplicity {
            required_multiplicity - start
        } else {
            0
        };
        let j = if end < required_multiplicity {
            segments.len() - (required_multiplicity - end)
        } else {
            segments.len()
        };
        Ok(segments[i..j].to_vec())
    }

    /// Try to add a knot to the curve
    pub fn try_add_knot(&mut self, knot: T) -> anyhow::Result<()> {
        anyhow::ensure!(
            knot >= self.knots[0],
            "Knot is smaller than the first knot: {} < {}",
            knot,
            self.knots[0]
        );
        anyhow::ensure!(
            knot <= self.knots[self.knots.len() - 1],
            "Knot is larger than the last knot: {} > {}",
            knot,
            self.knots[self.knots.len() - 1]
        );

        let k = self.degree;
        let n = self.control_points.len();
        let idx = self.knots.add(knot);
        let start = if idx > k { idx - k } else { 0 };
        let end = if idx > n {
            self.control_points
                .push(self.control_points.last().unwrap().clone());
            n + 1
        } else {
            self.control_points
                .insert(idx - 1, self.control_points[idx - 1].clone());
            idx
        };

        for i in start..end {
            let i0 = end + start - i - 1;
            let delta = self.knots[i0 + k + 1] - self.knots[i0];
            let inv = if delta != T::zero() {
                T::one() / delta
            } else {
                T::zero()
            };
            let a = (self.knots[idx] - self.knots[i0]) * inv;
            let delta_control_point = if i0 == 0 {
                self.control_points[i0].coords.clone()
            } else if i0 == self.control_points.len() {
                -self.control_points[i0 - 1].coords.clone()
            } else {
                &self.control_points[i0] - &self.control_points[i0 - 1]
            };
            let mut p = delta_control_point * (T::one() - a);
            p[D::dim() - 1] = T::zero();
            self.control_points[i0].coords -= p;
        }

        Ok(())
    }

    /// Check if the curve is clamped
    pub fn is_clamped(&self) -> bool {
        self.knots.is_clamped(self.degree)
    }

    /// Try to clamp knots of the curve
    /// Multiplex the start/end part of the knot vector so that the knot has `degree + 1` overlap
    pub fn try_clamp(&mut self) -> anyhow::Result<()> {
        let degree = self.degree();

        let start = self.knots.first();
        let end = self.knots.last();
        let multiplicity = self.knots.multiplicity();
        let start_knot_count = multiplicity
            .iter()
            .find(|m| *m.knot() == start)
            .ok_or(anyhow::anyhow!("Start knot not found"))?
            .multiplicity();
        let end_knot_count = multiplicity
            .iter()
            .find(|m| *m.knot() == end)
            .ok_or(anyhow::anyhow!("End knot not found"))?
            .multiplicity();

        for _ in start_knot_count..=degree {
            self.try_add_knot(start)?;
        }
        for _ in end_knot_count..=degree {
            self.try_add_knot(end)?;
        }

        Ok(())
    }

    /// Try to refine the curve by inserting knots
    pub fn try_refine_knot(&mut self, knots_to_insert: Vec<T>) -> anyhow::Result<()> {
        anyhow::ensure!(self.is_clamped(), "Curve must be clamped to refine knots");

        if knots_to_insert.is_empty() {
            return Ok(());
        }

        let degree = self.degree;
        let control_points = &self.control_points;

        let n = control_points.len() - 1;
        let m = n + degree + 1;
        let r = knots_to_insert.len() - 1;
        let a = self
            .knots
            .find_knot_span_index(n, degree, knots_to_insert[0]);
        let b = self
            .knots
            .find_knot_span_index(n, degree, knots_to_insert[r])
            + 1;

        let mut control_points_post = vec![OPoint::<T, D>::origin(); n + r + 2];
        let mut knots_post = vec![T::zero(); m + 1 + r + 1];

        control_points_post[..((a - degree) + 1)]
            .clone_from_slice(&control_points[..((a - degree) + 1)]);
        for i in (b - 1)..=n {
            control_points_post[i + r + 1] = control_points[i].clone();
        }

        for i in 0..=a {
            knots_post[i] = self.knots[i];
        }
        for i in (b + degree)..=m {
            knots_post[i + r + 1] = self.knots[i];
        }

        let mut i = b + degree - 1;
        let mut k = b + degree + r;

        for j in (0..=r).rev() {
            while knots_to_insert[j] <= self.knots[i] && i > a {
                control_points_post[k - degree - 1] = control_points[i - degree - 1].clone();
                knots_post[k] = self.knots[i];
                k -= 1;
                i -= 1;
            }
            control_points_post[k - degree - 1] = control_points_post[k - degree].clone();
            for l in 1..=degree {
                let ind = k - degree + l;
                let alpha = knots_post[k + l] - knots_to_insert[j];
                if alpha.abs() < T::default_epsilon() {
                    control_points_post[ind - 1] = control_points_post[ind].clone();
                } else {
                    let denom = knots_post[k + l] - self.knots[i - degree + l];
                    let weight = if denom != T::zero() {
                        alpha / denom
                    } else {
                        T::zero()
                    };
                    let lerped = control_points_post[ind - 1]
                        .coords
                        .lerp(&control_points_post[ind].coords, T::one() - weight);
                    control_points_post[ind - 1] = OPoint::from(lerped);
                }
            }
            knots_post[k] = knots_to_insert[j];
            k -= 1;
        }

        self.knots = KnotVector::new(knots_post);
        self.control_points = control_points_post;

        Ok(())
    }

    /// Split the curve into two curves before and after the parameter
    /// # Example
    /// ```
    /// use arcurve::prelude::*;
    /// use nalgebra::Point2;
    /// let line = NurbsCurve2D::polyline(&[
    ///     Point2::new(0., 0.),
    ///     Point2::new(10., 0.),
    /// ], false);
    /// let (min, max) = line.knots_domain();
    /// let u = (min + max) / 2.;
    /// let (left, right) = line.try_split(u).unwrap();
    /// assert_eq!(left.knots_domain().1, u);
    /// assert_eq!(right.knots_domain().0, u);
    /// ```
    pub fn try_split(&self, u: T) -> anyhow::Result<(Self, Self)>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let u = self.knots.clamp(self.degree, u);
        let knots_to_insert: Vec<_> = (0..=self.degree).map(|_| u).collect();
        let mut cloned = self.clone();
        cloned.try_refine_knot(knots_to_insert)?;

        let n = self.knots.len() - self.degree - 2;
        let s = self.knots.find_knot_span_index(n, self.degree, u);
        let knots0 = cloned.knots.as_slice()[0..=(s + self.degree + 1)].to_vec();
        let knots1 = cloned.knots.as_slice()[s + 1..].to_vec();
        let cpts0 = cloned.control_points[0..=s].to_vec();
        let cpts1 = cloned.control_points[s + 1..].to_vec();
        Ok((
            Self::try_new(self.degree, cpts0, knots0)?,
            Self::try_new(self.degree, cpts1, knots1)?,
        ))
    }

    /// Decompose the curve into a set of Bezier segments of the same degree
    pub fn try_decompose_bezier_segments(&self) -> anyhow::Result<Vec<Self>> {
        let mut cloned = self.clone();
        if !cloned.is_clamped() {
            cloned.try_clamp()?;
        }

        let knot_mults = cloned.knots.multiplicity();
        let req_mult = cloned.degree + 1;

        for knot_mult in knot_mults.iter() {
            if knot_mult.multiplicity() < req_mult {
                let knots_insert = vec![*knot_mult.knot(); req_mult - knot_mult.multiplicity()];
                cloned.try_refine_knot(knots_insert)?;
            }
        }

        let div = cloned.knots.len() / req_mult - 1;
        if div <= 1 {
            return Ok(vec![cloned]);
        }

        let knot_length = req_mult * 2;
        let mut segments = vec![];

        for i in 0..div {
            let start = i * req_mult;
            let end = start + knot_length;
            let knots = cloned.knots.as_slice()[start..end].to_vec();
            let control_points = cloned.control_points[start..(start + req_mult)].to_vec();
            segments.push(Self::new_unchecked(
                self.degree,
                control_points,
                KnotVector::new(knots),
            ));
        }

        Ok(segments)
    }

    /// Find the closest point on the curve to a given point
    pub fn find_closest_point(
        &self,
        point: &OPoint<T, DimNameDiff<D, U1>>,
    ) -> anyhow::Result<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
        T: ArgminFloat,
    {
        self.find_closest_parameter(point).map(|u| self.point_at(u))
    }

    /// Find the closest parameter on the curve to a given point with Newton's method
    /// The search is seeded by sampling the curve regularly
    /// and projecting the point onto each sampled segment,
    /// so only a local optimum near the best seed is found
    pub fn find_closest_parameter(&self, point: &OPoint<T, DimNameDiff<D, U1>>) -> anyhow::Result<T>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
        T: ArgminFloat,
    {
        let (min_u, max_u) = self.knots_domain();
        let samples = self.control_points.len() * self.degree;
        let pts = self.sample_regular_range_with_parameter(min_u, max_u, samples);

        let mut min = <T as RealField>::max_value().unwrap();
        let mut u = min_u;

        let closed =
            (&self.control_points[0] - &self.control_points[self.control_points.len() - 1]).norm()
                < T::default_epsilon();

        for i in 0..pts.len() - 1 {
            let u0 = pts[i].0;
            let u1 = pts[i + 1].0;

            let p0 = &pts[i].1;
            let p1 = &pts[i + 1].1;

            let (proj_u, proj_pt) = segment_closest_point(point, p0, p1, u0, u1);
            let d = (point - proj_pt).norm();

            if d < min {
                min = d;
                u = proj_u;
            }
        }

        let solver = ClosestParameterNewton::new((min_u, max_u), closed);
        let res = Executor::new(ClosestParameterProblem::new(point, self), solver)
            .configure(|state| state.param(u).max_iters(5))
            .run()?;
        res.state()
            .get_best_param()
            .cloned()
            .ok_or(anyhow::anyhow!("No best parameter found"))
    }

    /// Cast the curve to a curve with another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> NurbsCurve<F, D>
    where
        DefaultAllocator: Allocator<D>,
    {
        NurbsCurve {
            control_points: self
                .control_points
                .iter()
                .map(|p| p.clone().cast())
                .collect(),
            degree: self.degree,
            knots: self.knots.cast(),
        }
    }
}

impl<T: FloatingPoint, D: DimName> Invertible for NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Reverse the direction of the curve
    /// # Example
    /// ```
    /// use arcurve::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    /// let points = vec![
    ///     Point2::new(0.0, 0.0),
    ///     Point2::new(1.0, 0.0),
    ///     Point2::new(1.0, 1.0),
    /// ];
    /// let mut curve = NurbsCurve2D::polyline(&points, true);
    /// curve.invert();
    /// let (start, end) = curve.knots_domain();
    /// assert_relative_eq!(curve.point_at(start), points[points.len() - 1]);
    /// assert_relative_eq!(curve.point_at(end), points[0]);
    /// ```
    fn invert(&mut self) {
        self.control_points.reverse();
        self.knots.invert();
    }
}

/// Find the curve parameter at arc length on a Bezier segment of a NURBS curve
/// by binary search
pub(crate) fn compute_bezier_segment_parameter_at_length<T: FloatingPoint, D: DimName>(
    s: &NurbsCurve<T, D>,
    length: T,
    tolerance: T,
    total_length: T,
    gauss: &GaussLegendre,
) -> T
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let (k0, k1) = s.knots_domain();
    if length < T::zero() {
        return k0;
    } else if length > total_length {
        return k1;
    }

    let mut start = (k0, T::zero());
    let mut end = (k1, total_length);

    let inv = T::one() / T::from_usize(2).unwrap();

    // binary search
    while (end.1 - start.1) > tolerance {
        let middle_parameter = (start.0 + end.0) * inv;
        let mid = (
            middle_parameter,
            compute_bezier_segment_length(s, middle_parameter, gauss),
        );
        if mid.1 > length {
            end = mid;
        } else {
            start = mid;
        }
    }

    (start.0 + end.0) * inv
}

/// Compute the length of a Bezier segment of a NURBS curve
/// by gauss-legendre quadrature
pub(crate) fn compute_bezier_segment_length<T: FloatingPoint, D: DimName>(
    s: &NurbsCurve<T, D>,
    u: T,
    gauss: &GaussLegendre,
) -> T
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let (start, end) = s.knots_domain();
    if start + T::default_epsilon() < u {
        let t = end.min(u);
        let left = start.to_f64().unwrap();
        let right = t.to_f64().unwrap();
        let sum = gauss.integrate(left, right, |x| {
            let x = T::from_f64(x).unwrap();
            let deriv = s.rational_derivatives(x, 1);
            let tan = deriv[1].norm();
            tan.to_f64().unwrap()
        });
        T::from_f64(sum).unwrap()
    } else {
        T::zero()
    }
}

/// Dehomogenize a point
pub fn dehomogenize<T: FloatingPoint, D: DimName>(
    point: &OPoint<T, D>,
) -> Option<OPoint<T, DimNameDiff<D, U1>>>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let v = &point.coords;
    let idx = D::dim() - 1;
    let w = v[idx];
    if w != T::zero() {
        let coords =
            v.generic_view((0, 0), (<D as DimNameSub<U1>>::Output::name(), Const::<1>)) / w;
        Some(OPoint { coords })
    } else {
        None
    }
}

#[cfg(feature = "serde")]
impl<T, D: DimName> serde::Serialize for NurbsCurve<T, D>
where
    T: FloatingPoint + serde::Serialize,
    DefaultAllocator: Allocator<D>,
    OPoint<T, D>: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("NurbsCurve", 3)?;
        state.serialize_field("control_points", &self.control_points)?;
        state.serialize_field("degree", &self.degree)?;
        state.serialize_field("knots", &self.knots)?;
        state.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, T, D: DimName> serde::Deserialize<'de> for NurbsCurve<T, D>
where
    T: FloatingPoint + serde::Deserialize<'de>,
    DefaultAllocator: Allocator<D>,
    OPoint<T, D>: serde::Deserialize<'de>,
{
    fn deserialize<S>(deserializer: S) -> Result<Self, S::Error>
    where
        S: serde::Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, Visitor};

        #[derive(Debug)]
        enum Field {
            ControlPoints,
            Degree,
            Knots,
        }

        impl<'de> serde::Deserialize<'de> for Field {
            fn deserialize<S>(deserializer: S) -> Result<Self, S::Error>
            where
                S: serde::Deserializer<'de>,
            {
                struct FieldVisitor;

                impl Visitor<'_> for FieldVisitor {
                    type Value = Field;

                    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                        formatter.write_str("`control_points` or `degree` or `knots`")
                    }

                    fn visit_str<E>(self, value: &str) -> Result<Field, E>
                    where
                        E: de::Error,
                    {
                        match value {
                            "control_points" => Ok(Field::ControlPoints),
                            "degree" => Ok(Field::Degree),
                            "knots" => Ok(Field::Knots),
                            _ => Err(de::Error::unknown_field(value, FIELDS)),
                        }
                    }
                }

                deserializer.deserialize_identifier(FieldVisitor)
            }
        }

        struct NurbsCurveVisitor<T, D>(std::marker::PhantomData<(T, D)>);

        impl<T, D> NurbsCurveVisitor<T, D> {
            pub fn new() -> Self {
                NurbsCurveVisitor(std::marker::PhantomData)
            }
        }

        impl<'de, T, D: DimName> Visitor<'de> for NurbsCurveVisitor<T, D>
        where
            T: FloatingPoint + serde::Deserialize<'de>,
            DefaultAllocator: Allocator<D>,
            OPoint<T, D>: serde::Deserialize<'de>,
        {
            type Value = NurbsCurve<T, D>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("struct NurbsCurve")
            }

            fn visit_map<V>(self, mut map: V) -> Result<Self::Value, V::Error>
            where
                V: MapAccess<'de>,
            {
                let mut control_points = None;
                let mut degree = None;
                let mut knots = None;
                while let Some(key) = map.next_key()? {
                    match key {
                        Field::ControlPoints => {
                            if control_points.is_some() {
                                return Err(de::Error::duplicate_field("control_points"));
                            }
                            control_points = Some(map.next_value()?);
                        }
                        Field::Degree => {
                            if degree.is_some() {
                                return Err(de::Error::duplicate_field("degree"));
                            }
                            degree = Some(map.next_value()?);
                        }
                        Field::Knots => {
                            if knots.is_some() {
                                return Err(de::Error::duplicate_field("knots"));
                            }
                            knots = Some(map.next_value()?);
                        }
                    }
                }

                Ok(Self::Value {
                    control_points: control_points
                        .ok_or_else(|| de::Error::missing_field("control_points"))?,
                    degree: degree.ok_or_else(|| de::Error::missing_field("degree"))?,
                    knots: knots.ok_or_else(|| de::Error::missing_field("knots"))?,
                })
            }
        }

        const FIELDS: &[&str] = &["control_points", "degree", "knots"];
        deserializer.deserialize_struct("NurbsCurve", FIELDS, NurbsCurveVisitor::<T, D>::new())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3};

    use crate::misc::Invertible;

    use super::{NurbsCurve2D, NurbsCurve3D};

    fn unit_circle() -> NurbsCurve2D<f64> {
        let w = 1. / 2.;
        NurbsCurve2D::try_new(
            2,
            vec![
                Point3::new(1.0, 0.0, 1.),
                Point3::new(1.0, 1.0, 1.0) * w,
                Point3::new(-1.0, 1.0, 1.0) * w,
                Point3::new(-1.0, 0.0, 1.),
                Point3::new(-1.0, -1.0, 1.0) * w,
                Point3::new(1.0, -1.0, 1.0) * w,
                Point3::new(1.0, 0.0, 1.),
            ],
            vec![0., 0., 0., 1. / 4., 1. / 2., 1. / 2., 3. / 4., 1., 1., 1.],
        )
        .unwrap()
    }

    #[test]
    fn try_new_validates_knot_count() {
        let pts = vec![
            Point3::new(0., 0., 1.),
            Point3::new(1., 0., 1.),
            Point3::new(2., 1., 1.),
        ];
        assert!(NurbsCurve2D::try_new(2, pts.clone(), vec![0., 0., 0., 1., 1.]).is_err());
        assert!(NurbsCurve2D::try_new(2, pts, vec![0., 0., 0., 1., 1., 1.]).is_ok());
    }

    #[test]
    fn polyline_length_equals_chord_sum() {
        let polyline = NurbsCurve2D::polyline(
            &[
                Point2::new(0., 0.),
                Point2::new(3., 0.),
                Point2::new(3., 4.),
            ],
            false,
        );
        let length = polyline.try_length().unwrap();
        assert_relative_eq!(length, 8., epsilon = 1e-8);
    }

    #[test]
    fn decompose_unit_circle_into_bezier_segments() {
        let circle = unit_circle();
        let segments = circle.try_decompose_bezier_segments().unwrap();
        assert_eq!(segments.len(), 4);
        let total: f64 = segments.iter().map(|s| s.try_length().unwrap()).sum();
        assert_relative_eq!(total, 2. * std::f64::consts::PI, epsilon = 1e-6);
    }

    #[test]
    fn split_domains_meet_at_parameter() {
        let circle = unit_circle();
        let (min, max) = circle.knots_domain();
        let u = (min + max) * 0.3;
        let (left, right) = circle.try_split(u).unwrap();
        assert_relative_eq!(left.knots_domain().1, u);
        assert_relative_eq!(right.knots_domain().0, u);
        let lp = left.point_at(u);
        let rp = right.point_at(u);
        assert_relative_eq!(lp, rp, epsilon = 1e-10);
    }

    #[test]
    fn closest_parameter_on_polyline() {
        let line = NurbsCurve2D::polyline(&[Point2::new(0., 0.), Point2::new(10., 0.)], false);
        let u = line.find_closest_parameter(&Point2::new(5., 3.)).unwrap();
        assert_relative_eq!(u, 5., epsilon = 1e-6);
        let closest = line.find_closest_point(&Point2::new(5., 3.)).unwrap();
        assert_relative_eq!(closest, Point2::new(5., 0.), epsilon = 1e-6);
    }

    #[test]
    fn invert_swaps_endpoints() {
        let mut curve = NurbsCurve3D::<f64>::polyline(
            &[
                Point3::new(0., 0., 0.),
                Point3::new(2., 1., 0.),
                Point3::new(4., 0., 1.),
            ],
            false,
        );
        let (s0, e0) = curve.knots_domain();
        let head = curve.point_at(s0);
        let tail = curve.point_at(e0);
        curve.invert();
        let (s1, e1) = curve.knots_domain();
        assert_relative_eq!(curve.point_at(s1), tail);
        assert_relative_eq!(curve.point_at(e1), head);
    }

    #[test]
    fn cast_preserves_geometry() {
        let circle = unit_circle();
        let single = circle.cast::<f32>();
        let p = single.point_at(0.5);
        assert_relative_eq!(p.x, -1.0_f32, epsilon = 1e-5);
        assert_relative_eq!(p.y, 0.0_f32, epsilon = 1e-5);
    }
}
