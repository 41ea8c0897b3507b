use std::cell::Cell;
use std::fmt;

use argmin::core::ArgminFloat;
use gauss_quad::GaussLegendre;
use nalgebra::allocator::Allocator;
use nalgebra::{
    Const, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, OVector, Point3, Vector3,
    U1,
};

use crate::curve::curve_geometry::CurveGeometry;
use crate::curve::nurbs_curve::{
    compute_bezier_segment_length, compute_bezier_segment_parameter_at_length, NurbsCurve,
};
use crate::curve::tangent_frame::TangentFrame;
use crate::errors::{CurveError, CurveStatus, ParameterDomain};
use crate::intersection::{CurveIntersectionSolverOptions, Intersects};
use crate::misc::{Curvature, FloatingPoint, Invertible};

/// Default geometric tolerance in meters.
const DEFAULT_EPSGE: f64 = 1e-6;

/// Arc length parametrized curve.
///
/// Wraps a NURBS curve and exposes every geometric query in meters traveled
/// along the curve, converting between the arc length domain and the native
/// knot domain internally. The conversion state (bezier segments of the
/// spline and their cumulative arc lengths) is computed once at construction
/// and refreshed whenever the spline is structurally replaced.
///
/// # Example
/// ```
/// use arcurve::prelude::*;
/// use nalgebra::Point3;
/// use approx::assert_relative_eq;
///
/// let curve = ArcLengthCurve3D::try_line(
///     &Point3::new(0., 0., 0.),
///     &Point3::new(10., 0., 0.),
/// ).unwrap();
/// assert_relative_eq!(curve.length(), 10., epsilon = 1e-10);
/// let mid = curve.point_at(5.).unwrap();
/// assert_relative_eq!(mid, Point3::new(5., 0., 0.), epsilon = 1e-6);
/// ```
#[derive(Clone, Debug)]
pub struct ArcLengthCurve<T: FloatingPoint, D: DimName>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    spline: NurbsCurve<T, D>,
    /// Bezier segments of the spline tiling the native domain
    segments: Vec<NurbsCurve<T, D>>,
    /// Arc length at the start of each segment, with the total length last
    cumulative_lengths: Vec<T>,
    length: T,
    native_range: (T, T),
    meters_range: (T, T),
    start_point: OPoint<T, DimNameDiff<D, U1>>,
    end_point: OPoint<T, DimNameDiff<D, U1>>,
    /// Geometric tolerance in meters
    epsge: T,
    name: String,
    /// Status code of the most recent operation, kept for diagnostics
    last_status: Cell<CurveStatus>,
}

/// 2D arc length parametrized curve alias
pub type ArcLengthCurve2D<T> = ArcLengthCurve<T, Const<3>>;

/// 3D arc length parametrized curve alias
pub type ArcLengthCurve3D<T> = ArcLengthCurve<T, Const<4>>;

impl<T: FloatingPoint, D: DimName> ArcLengthCurve<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    /// Create a curve from a construction strategy with the default
    /// geometric tolerance.
    pub fn try_from_geometry(geometry: CurveGeometry<T, D>) -> Result<Self, CurveError> {
        Self::try_from_geometry_with(geometry, T::from_f64(DEFAULT_EPSGE).unwrap())
    }

    /// Create a curve from a construction strategy with an explicit
    /// geometric tolerance in meters.
    pub fn try_from_geometry_with(
        geometry: CurveGeometry<T, D>,
        epsge: T,
    ) -> Result<Self, CurveError> {
        if epsge <= T::zero() {
            return Err(CurveError::invalid_argument(
                "geometric tolerance must be positive",
            ));
        }

        let spline = match geometry {
            CurveGeometry::ControlPoints {
                degree,
                control_points,
                knots,
            } => NurbsCurve::try_new(degree, control_points, knots)
                .map_err(CurveError::construction)?,
            CurveGeometry::Line { start, end } => {
                if (&end - &start).norm() <= T::default_epsilon() {
                    return Err(CurveError::invalid_argument(
                        "line endpoints are coincident",
                    ));
                }
                NurbsCurve::polyline(&[start, end], false)
            }
            CurveGeometry::Spline(spline) => spline,
        };

        Self::try_build(spline, epsge)
    }

    /// Create a straight segment between two points.
    ///
    /// The native parametrization of the segment is chord length, so the
    /// meters domain and the native domain coincide for this shape.
    /// # Example
    /// ```
    /// use arcurve::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    /// let line = ArcLengthCurve2D::try_line(&Point2::new(0., 0.), &Point2::new(3., 4.)).unwrap();
    /// assert_relative_eq!(line.length(), 5., epsilon = 1e-10);
    /// assert_relative_eq!(line.meters_to_native(2.5).unwrap(), 2.5, epsilon = 1e-6);
    /// ```
    pub fn try_line(
        start: &OPoint<T, DimNameDiff<D, U1>>,
        end: &OPoint<T, DimNameDiff<D, U1>>,
    ) -> Result<Self, CurveError> {
        Self::try_from_geometry(CurveGeometry::Line {
            start: start.clone(),
            end: end.clone(),
        })
    }

    /// Wrap a spline that has already been built elsewhere.
    pub fn try_from_spline(spline: NurbsCurve<T, D>) -> Result<Self, CurveError> {
        Self::try_from_geometry(CurveGeometry::Spline(spline))
    }

    /// Create a curve from raw NURBS control data.
    pub fn try_from_control_points(
        degree: usize,
        control_points: Vec<OPoint<T, D>>,
        knots: Vec<T>,
    ) -> Result<Self, CurveError> {
        Self::try_from_geometry(CurveGeometry::ControlPoints {
            degree,
            control_points,
            knots,
        })
    }

    /// Build the cached parametrization state from a spline.
    fn try_build(spline: NurbsCurve<T, D>, epsge: T) -> Result<Self, CurveError> {
        // weights must stay positive for the rational evaluation to be defined
        let weight_index = D::dim() - 1;
        if spline
            .control_points()
            .iter()
            .any(|p| p[weight_index] <= T::zero())
        {
            return Err(CurveError::construction(anyhow::anyhow!(
                "control point weights must be positive"
            )));
        }

        let (native_start, native_end) = spline.knots_domain();
        if native_end - native_start <= T::default_epsilon() {
            return Err(CurveError::construction(anyhow::anyhow!(
                "the knot vector spans an empty domain"
            )));
        }

        let segments = spline
            .try_domain_bezier_segments()
            .map_err(CurveError::construction)?;

        let gauss = GaussLegendre::init(16 + spline.degree());
        let mut cumulative_lengths = Vec::with_capacity(segments.len() + 1);
        let mut acc = T::zero();
        cumulative_lengths.push(acc);
        for segment in segments.iter() {
            let (_, end) = segment.knots_domain();
            acc += compute_bezier_segment_length(segment, end, &gauss);
            cumulative_lengths.push(acc);
        }
        let length = acc;

        if length <= epsge {
            return Err(CurveError::construction(anyhow::anyhow!(
                "the curve has no measurable arc length"
            )));
        }

        #[cfg(feature = "log")]
        log::debug!(
            "parametrized curve into {} bezier segments, arc length {}",
            segments.len(),
            length
        );

        let start_point = spline.point_at(native_start);
        let end_point = spline.point_at(native_end);

        Ok(Self {
            spline,
            segments,
            cumulative_lengths,
            length,
            native_range: (native_start, native_end),
            meters_range: (T::zero(), length),
            start_point,
            end_point,
            epsge,
            name: String::new(),
            last_status: Cell::new(CurveStatus::Ok),
        })
    }

    /// Record a successful operation and pass its value through.
    fn ok<V>(&self, value: V) -> Result<V, CurveError> {
        self.last_status.set(CurveStatus::Ok);
        Ok(value)
    }

    /// Record a failed operation and pass its error through.
    fn fail<V>(&self, error: CurveError) -> Result<V, CurveError> {
        self.last_status.set(error.status());
        Err(error)
    }

    /// Convert an arc length abscissa to the native abscissa of the
    /// underlying spline.
    ///
    /// The mapping walks the cached bezier segments and inverts the arc
    /// length integral on the containing segment by binary search, so it is
    /// exact up to the geometric tolerance even where the native
    /// parametrization is far from uniform.
    pub fn meters_to_native(&self, abscissa_m: T) -> Result<T, CurveError> {
        let (start, end) = self.meters_range;
        if abscissa_m < start - self.epsge || abscissa_m > end + self.epsge {
            return self.fail(CurveError::out_of_range(
                ParameterDomain::Meters,
                abscissa_m,
                start,
                end,
            ));
        }
        let target = (abscissa_m - start).max(T::zero()).min(self.length);

        // locate the bezier segment containing the target arc length
        let mut index = 0;
        while index + 1 < self.segments.len() && self.cumulative_lengths[index + 1] < target {
            index += 1;
        }
        let segment = &self.segments[index];
        let local_length = target - self.cumulative_lengths[index];
        let segment_length = self.cumulative_lengths[index + 1] - self.cumulative_lengths[index];

        let gauss = GaussLegendre::init(16 + self.spline.degree());
        let u = compute_bezier_segment_parameter_at_length(
            segment,
            local_length,
            self.epsge,
            segment_length,
            &gauss,
        );
        self.ok(u)
    }

    /// Convert a native abscissa of the underlying spline to the arc length
    /// abscissa, the inverse of [`Self::meters_to_native`].
    pub fn native_to_meters(&self, abscissa_s: T) -> Result<T, CurveError> {
        let (start, end) = self.native_range;
        if abscissa_s < start || abscissa_s > end {
            return self.fail(CurveError::out_of_range(
                ParameterDomain::Native,
                abscissa_s,
                start,
                end,
            ));
        }

        let gauss = GaussLegendre::init(16 + self.spline.degree());
        let mut meters = self.meters_range.0 + self.length;
        for (i, segment) in self.segments.iter().enumerate() {
            let (_, k1) = segment.knots_domain();
            if abscissa_s < k1 {
                let partial = compute_bezier_segment_length(segment, abscissa_s, &gauss);
                meters = self.meters_range.0 + self.cumulative_lengths[i] + partial;
                break;
            }
        }
        self.ok(meters)
    }

    /// Evaluate the position at an arc length abscissa.
    pub fn point_at(&self, abscissa_m: T) -> Result<OPoint<T, DimNameDiff<D, U1>>, CurveError> {
        let u = self.meters_to_native(abscissa_m)?;
        self.ok(self.spline.point_at(u))
    }

    /// Evaluate the position at a native abscissa of the underlying spline.
    pub fn point_at_native(
        &self,
        abscissa_s: T,
    ) -> Result<OPoint<T, DimNameDiff<D, U1>>, CurveError> {
        let (start, end) = self.native_range;
        if abscissa_s < start || abscissa_s > end {
            return self.fail(CurveError::out_of_range(
                ParameterDomain::Native,
                abscissa_s,
                start,
                end,
            ));
        }
        self.ok(self.spline.point_at(abscissa_s))
    }

    /// Evaluate the derivative vectors of order `1..=order` at an arc length
    /// abscissa, with respect to the native parameter of the spline.
    /// The result holds exactly `order` vectors.
    pub fn derivatives_at(
        &self,
        order: usize,
        abscissa_m: T,
    ) -> Result<Vec<OVector<T, DimNameDiff<D, U1>>>, CurveError> {
        if order < 1 {
            return self.fail(CurveError::invalid_argument(
                "derivative order must be at least 1",
            ));
        }
        let u = self.meters_to_native(abscissa_m)?;
        let ders = self.spline.rational_derivatives(u, order);
        self.ok(ders.into_iter().skip(1).collect())
    }

    /// Evaluate the curvature at an arc length abscissa.
    ///
    /// Computed as `|r' x r''| / |r'|^3`, which is invariant under the
    /// parametrization of the spline.
    pub fn curvature_at(&self, abscissa_m: T) -> Result<T, CurveError> {
        let u = self.meters_to_native(abscissa_m)?;
        let ders = self.spline.rational_derivatives(u, 2);
        if ders[1].norm() <= self.epsge {
            return self.fail(CurveError::degenerate(
                "curvature is undefined where the tangent vanishes",
            ));
        }
        match Curvature::derivatives(ders[1].clone(), ders[2].clone()) {
            Ok(c) => self.ok(c.kappa()),
            Err(_) => self.fail(CurveError::degenerate(
                "curvature is undefined where the tangent vanishes",
            )),
        }
    }

    /// Sample `count` positions evenly spaced in arc length across the whole
    /// curve, including both endpoints for `count >= 2`.
    /// A single sample yields the start point.
    pub fn sample(&self, count: usize) -> Result<Vec<OPoint<T, DimNameDiff<D, U1>>>, CurveError> {
        if count == 0 {
            return self.fail(CurveError::invalid_argument(
                "sample count must be positive",
            ));
        }
        if count == 1 {
            return self.ok(vec![self.start_point.clone()]);
        }

        let (start, end) = self.meters_range;
        let step = (end - start) / T::from_usize(count - 1).unwrap();
        let mut points = Vec::with_capacity(count);
        for i in 0..count {
            let m = start + T::from_usize(i).unwrap() * step;
            points.push(self.point_at(m)?);
        }
        self.ok(points)
    }

    /// Extract an independently owned sub-curve spanning the given arc
    /// length interval of this curve.
    ///
    /// The section is re-anchored: its meters domain starts at zero and ends
    /// at the section length, regardless of where the interval sat on the
    /// source curve. The source curve is left untouched.
    /// # Example
    /// ```
    /// use arcurve::prelude::*;
    /// use nalgebra::Point3;
    /// use approx::assert_relative_eq;
    /// let curve = ArcLengthCurve3D::try_line(
    ///     &Point3::new(0., 0., 0.),
    ///     &Point3::new(10., 0., 0.),
    /// ).unwrap();
    /// let section = curve.extract_section(1., 9.).unwrap();
    /// assert_relative_eq!(section.length(), 8., epsilon = 1e-5);
    /// assert_relative_eq!(section.point_at(0.).unwrap(), Point3::new(1., 0., 0.), epsilon = 1e-5);
    /// ```
    pub fn extract_section(&self, start_m: T, end_m: T) -> Result<Self, CurveError> {
        if start_m >= end_m {
            return self.fail(CurveError::invalid_argument(
                "section start must be smaller than section end",
            ));
        }
        let (min, max) = self.meters_range;
        if start_m < min - self.epsge || start_m > max + self.epsge {
            return self.fail(CurveError::out_of_range(
                ParameterDomain::Meters,
                start_m,
                min,
                max,
            ));
        }
        if end_m < min - self.epsge || end_m > max + self.epsge {
            return self.fail(CurveError::out_of_range(
                ParameterDomain::Meters,
                end_m,
                min,
                max,
            ));
        }

        // bounds within tolerance of the curve ends snap to the ends,
        // so the spline is never split at a fully saturated boundary knot
        let tail = if start_m <= min + self.epsge {
            self.spline.clone()
        } else {
            let u0 = self.meters_to_native(start_m)?;
            match self.spline.try_split(u0) {
                Ok((_, tail)) => tail,
                Err(e) => return self.fail(CurveError::evaluation(e)),
            }
        };
        let section = if end_m >= max - self.epsge {
            tail
        } else {
            let u1 = self.meters_to_native(end_m)?;
            match tail.try_split(u1) {
                Ok((section, _)) => section,
                Err(e) => return self.fail(CurveError::evaluation(e)),
            }
        };

        match Self::try_build(section, self.epsge) {
            Ok(curve) => self.ok(curve),
            Err(e) => self.fail(e),
        }
    }

    /// Reverse the direction of the curve in place.
    ///
    /// The spline is replaced by its reversed counterpart and the whole
    /// parametrization state is recomputed, so arc length keeps increasing
    /// from the new start point. The total length is unchanged.
    pub fn reverse(&mut self) -> Result<(), CurveError> {
        let mut reversed = self.spline.clone();
        reversed.invert();
        match Self::try_build(reversed, self.epsge) {
            Ok(mut rebuilt) => {
                rebuilt.name = std::mem::take(&mut self.name);
                *self = rebuilt;
                self.ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Find the point on the curve closest to the given position.
    ///
    /// Returns the arc length abscissa of the closest point and its
    /// euclidean distance to the query. The search seeds a damped Newton
    /// iteration from regular samples of the curve, so it finds a locally
    /// optimal answer and is not guaranteed to resolve globally ambiguous
    /// queries near self-intersections.
    pub fn find_closest_point(
        &self,
        point: &OPoint<T, DimNameDiff<D, U1>>,
    ) -> Result<(T, T), CurveError>
    where
        T: ArgminFloat,
    {
        #[cfg(feature = "log")]
        log::trace!("searching the closest point on curve '{}'", self.name);

        match self.spline.find_closest_parameter(point) {
            Ok(u) => {
                // pin the parameter into the native domain before converting
                let (k0, k1) = self.native_range;
                let u = if u < k0 {
                    k0
                } else if u > k1 {
                    k1
                } else {
                    u
                };
                let m = self.native_to_meters(u)?;
                let distance = (self.spline.point_at(u) - point).norm();
                self.ok((m, distance))
            }
            Err(e) => self.fail(CurveError::no_solution(format!(
                "closest point search failed to converge: {}",
                e
            ))),
        }
    }

    /// Find the world positions where this curve intersects another one,
    /// sorted by ascending arc length abscissa on this curve.
    /// Curves that do not meet produce an empty set, not an error.
    pub fn find_intersections(
        &self,
        other: &Self,
        options: Option<CurveIntersectionSolverOptions<T>>,
    ) -> Result<Vec<OPoint<T, DimNameDiff<D, U1>>>, CurveError>
    where
        T: ArgminFloat,
    {
        match self.spline.find_intersections(&other.spline, options) {
            Ok(intersections) => {
                self.ok(intersections.into_iter().map(|it| it.a().0.clone()).collect())
            }
            Err(e) => self.fail(CurveError::evaluation(e)),
        }
    }

    /// Number of spatial components of the curve points.
    pub fn dimension(&self) -> usize {
        D::dim() - 1
    }

    /// Polynomial order of the underlying spline, `degree + 1`.
    pub fn order(&self) -> usize {
        self.spline.degree() + 1
    }

    /// Polynomial degree of the underlying spline.
    pub fn degree(&self) -> usize {
        self.spline.degree()
    }

    /// Geometric tolerance in meters.
    pub fn epsge(&self) -> T {
        self.epsge
    }

    /// The wrapped spline.
    pub fn spline(&self) -> &NurbsCurve<T, D> {
        &self.spline
    }

    /// Status code left behind by the most recent operation.
    pub fn last_status(&self) -> CurveStatus {
        self.last_status.get()
    }

    /// Native parameter domain of the underlying spline.
    pub fn native_range(&self) -> (T, T) {
        self.native_range
    }

    /// Arc length parameter domain in meters.
    pub fn meters_range(&self) -> (T, T) {
        self.meters_range
    }

    /// Total arc length in meters.
    pub fn length(&self) -> T {
        self.length
    }

    /// Position at the start of the curve.
    pub fn start_point(&self) -> &OPoint<T, DimNameDiff<D, U1>> {
        &self.start_point
    }

    /// Position at the end of the curve.
    pub fn end_point(&self) -> &OPoint<T, DimNameDiff<D, U1>> {
        &self.end_point
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl<T: FloatingPoint> ArcLengthCurve<T, Const<4>> {
    /// Evaluate the tangent frame at an arc length abscissa of a 3D curve.
    ///
    /// The tangent is the normalized first derivative, the normal is the
    /// normalized cross product of the tangent and the world z axis, and the
    /// binormal completes the right-handed frame. The frame is undefined
    /// where the tangent vanishes or runs parallel to the world z axis.
    pub fn tangent_frame_at(&self, abscissa_m: T) -> Result<TangentFrame<T>, CurveError> {
        let u = self.meters_to_native(abscissa_m)?;
        let ders = self.spline.rational_derivatives(u, 1);
        let position = Point3::from(ders[0].clone());

        let deriv = &ders[1];
        if deriv.norm() <= self.epsge {
            return self.fail(CurveError::degenerate(
                "tangent frame is undefined where the tangent vanishes",
            ));
        }
        let tangent = deriv.normalize();

        let reference = tangent.cross(&Vector3::z());
        if reference.norm() <= self.epsge {
            return self.fail(CurveError::degenerate(
                "tangent frame is undefined where the tangent is parallel to the world z axis",
            ));
        }
        let normal = reference.normalize();
        let binormal = tangent.cross(&normal);

        self.ok(TangentFrame::new(position, tangent, normal, binormal))
    }
}

impl<T: FloatingPoint, D: DimName> fmt::Display for ArcLengthCurve<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Curve name: {} | Length: {} | Meters parametrization interval: [{}, {}] | Native parametrization interval: [{}, {}]",
            self.name,
            self.length,
            self.meters_range.0,
            self.meters_range.1,
            self.native_range.0,
            self.native_range.1,
        )
    }
}
