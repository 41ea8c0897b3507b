use approx::assert_relative_eq;
use nalgebra::{Point2, Point3, Vector3};

use crate::errors::{CurveError, CurveStatus, ParameterDomain};
use crate::prelude::CurveIntersectionSolverOptions;

use super::{ArcLengthCurve2D, ArcLengthCurve3D, CurveGeometry, NurbsCurve2D};

const OPTIONS: CurveIntersectionSolverOptions<f64> = CurveIntersectionSolverOptions {
    minimum_distance: 1e-4,
    knot_domain_division: 128,
    step_size_tolerance: 1e-8,
    cost_tolerance: 1e-10,
    solver_max_iters: 1000,
    line_search_max_iters: 32,
};

fn x_axis_line(length: f64) -> ArcLengthCurve3D<f64> {
    ArcLengthCurve3D::try_line(&Point3::new(0., 0., 0.), &Point3::new(length, 0., 0.)).unwrap()
}

/// Exact rational quadratic unit circle, nonuniform in its native parameter
fn unit_circle() -> ArcLengthCurve2D<f64> {
    let w = 1. / 2.;
    ArcLengthCurve2D::try_from_control_points(
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
fn circle_meters_native_round_trip_is_identity() {
    let circle = unit_circle();
    let length = circle.length();
    assert_relative_eq!(length, 2. * std::f64::consts::PI, epsilon = 1e-4);

    let mut last_u = f64::NEG_INFINITY;
    for i in 0..=10 {
        let m = length * (i as f64) / 10.;
        let u = circle.meters_to_native(m).unwrap();
        assert!(u > last_u, "native abscissa must increase with arc length");
        last_u = u;
        let back = circle.native_to_meters(u).unwrap();
        assert_relative_eq!(back, m, epsilon = 1e-4);
    }

    // the circle is symmetric, so half the native domain is half the arc
    let half = circle.native_to_meters(0.5).unwrap();
    assert_relative_eq!(half, std::f64::consts::PI, epsilon = 1e-4);
}

#[test]
fn line_meters_coincide_with_chord_length_parametrization() {
    let line = x_axis_line(10.);
    assert_relative_eq!(line.length(), 10., epsilon = 1e-9);
    assert_relative_eq!(line.meters_to_native(7.).unwrap(), 7., epsilon = 1e-6);
    assert_relative_eq!(line.native_to_meters(2.).unwrap(), 2., epsilon = 1e-6);
}

#[test]
fn endpoints_match_parametrization_bounds() {
    let circle = unit_circle();
    let (m0, m1) = circle.meters_range();
    assert_relative_eq!(m0, 0.);
    let start = circle.point_at(m0).unwrap();
    let end = circle.point_at(m1).unwrap();
    assert_relative_eq!(start, *circle.start_point(), epsilon = 1e-6);
    assert_relative_eq!(end, *circle.end_point(), epsilon = 1e-6);
    assert_relative_eq!(start, Point2::new(1., 0.), epsilon = 1e-6);
    assert_relative_eq!(end, Point2::new(1., 0.), epsilon = 1e-6);
}

#[test]
fn point_at_native_matches_point_at() {
    let circle = unit_circle();
    let m = circle.native_to_meters(0.3).unwrap();
    let a = circle.point_at_native(0.3).unwrap();
    let b = circle.point_at(m).unwrap();
    assert_relative_eq!(a, b, epsilon = 1e-5);
}

#[test]
fn sample_is_even_in_arc_length() {
    let circle = unit_circle();
    let points = circle.sample(9).unwrap();
    assert_eq!(points.len(), 9);
    let chord = 2. * (std::f64::consts::PI / 8.).sin();
    for pair in points.windows(2) {
        assert_relative_eq!((pair[1] - pair[0]).norm(), chord, epsilon = 1e-4);
    }
    for p in points.iter() {
        assert_relative_eq!(p.coords.norm(), 1., epsilon = 1e-6);
    }
}

#[test]
fn sample_handles_count_edge_cases() {
    let line = x_axis_line(10.);
    let points = line.sample(5).unwrap();
    assert_eq!(points.len(), 5);
    for (i, p) in points.iter().enumerate() {
        assert_relative_eq!(p.x, 2.5 * i as f64, epsilon = 1e-5);
        assert_relative_eq!(p.y, 0., epsilon = 1e-10);
    }

    let single = line.sample(1).unwrap();
    assert_eq!(single.len(), 1);
    assert_relative_eq!(single[0], Point3::new(0., 0., 0.), epsilon = 1e-10);

    assert!(matches!(
        line.sample(0),
        Err(CurveError::InvalidArgument { .. })
    ));
    assert_eq!(line.last_status(), CurveStatus::InvalidArgument);
}

#[test]
fn queries_outside_the_domain_are_rejected() {
    let line = x_axis_line(10.);
    assert_eq!(line.last_status(), CurveStatus::Ok);

    let result = line.point_at(-1.);
    match result {
        Err(CurveError::OutOfRange {
            domain,
            value,
            min,
            max,
        }) => {
            assert_eq!(domain, ParameterDomain::Meters);
            assert_relative_eq!(value, -1.);
            assert_relative_eq!(min, 0.);
            assert_relative_eq!(max, 10., epsilon = 1e-9);
        }
        other => panic!("expected an out of range error, got {:?}", other),
    }
    assert_eq!(line.last_status(), CurveStatus::OutOfRange);

    assert!(line.point_at(11.5).is_err());
    assert!(line.native_to_meters(10.5).is_err());
    assert!(line.point_at_native(-0.1).is_err());

    // a successful query resets the status
    let p = line.point_at(10.).unwrap();
    assert_relative_eq!(p, Point3::new(10., 0., 0.), epsilon = 1e-6);
    assert_eq!(line.last_status(), CurveStatus::Ok);
}

#[test]
fn extract_section_reanchors_the_meters_domain() {
    let line = x_axis_line(10.);
    let section = line.extract_section(1., 9.).unwrap();
    assert_relative_eq!(section.length(), 8., epsilon = 1e-5);
    let (m0, m1) = section.meters_range();
    assert_relative_eq!(m0, 0.);
    assert_relative_eq!(m1, 8., epsilon = 1e-5);
    assert_relative_eq!(*section.start_point(), Point3::new(1., 0., 0.), epsilon = 1e-5);
    assert_relative_eq!(*section.end_point(), Point3::new(9., 0., 0.), epsilon = 1e-5);

    // the source curve is left untouched
    assert_relative_eq!(line.length(), 10., epsilon = 1e-9);

    assert!(matches!(
        line.extract_section(5., 5.),
        Err(CurveError::InvalidArgument { .. })
    ));
    assert!(matches!(
        line.extract_section(-1., 5.),
        Err(CurveError::OutOfRange { .. })
    ));
    assert!(matches!(
        line.extract_section(5., 11.),
        Err(CurveError::OutOfRange { .. })
    ));
}

#[test]
fn extract_section_of_a_circle_spans_the_arc() {
    let circle = unit_circle();
    let half = circle
        .extract_section(0., std::f64::consts::PI)
        .unwrap();
    assert_relative_eq!(half.length(), std::f64::consts::PI, epsilon = 1e-4);
    assert_relative_eq!(*half.start_point(), Point2::new(1., 0.), epsilon = 1e-5);
    assert_relative_eq!(*half.end_point(), Point2::new(-1., 0.), epsilon = 1e-4);
}

#[test]
fn reverse_flips_the_direction_in_place() {
    let mut curve = ArcLengthCurve2D::try_from_spline(NurbsCurve2D::polyline(
        &[
            Point2::new(0., 0.),
            Point2::new(3., 0.),
            Point2::new(3., 4.),
        ],
        false,
    ))
    .unwrap();
    curve.set_name("elbow");
    assert_relative_eq!(curve.length(), 7., epsilon = 1e-9);

    curve.reverse().unwrap();
    assert_eq!(curve.name(), "elbow");
    assert_relative_eq!(curve.length(), 7., epsilon = 1e-9);
    assert_relative_eq!(*curve.start_point(), Point2::new(3., 4.), epsilon = 1e-9);
    assert_relative_eq!(*curve.end_point(), Point2::new(0., 0.), epsilon = 1e-9);
    assert_relative_eq!(curve.point_at(2.5).unwrap(), Point2::new(3., 1.5), epsilon = 1e-5);

    // reversing twice restores the original parametrization
    curve.reverse().unwrap();
    assert_relative_eq!(curve.point_at(1.).unwrap(), Point2::new(1., 0.), epsilon = 1e-5);
}

#[test]
fn curvature_of_a_line_vanishes() {
    let line = x_axis_line(10.);
    let k = line.curvature_at(5.).unwrap();
    assert_relative_eq!(k, 0., epsilon = 1e-9);
}

#[test]
fn curvature_of_the_unit_circle_is_one() {
    let circle = unit_circle();
    let length = circle.length();
    for i in 1..8 {
        let k = circle.curvature_at(length * (i as f64) / 8.).unwrap();
        assert_relative_eq!(k, 1., epsilon = 1e-4);
    }
}

#[test]
fn derivatives_are_taken_in_the_native_parameter() {
    let line = x_axis_line(10.);
    let ders = line.derivatives_at(2, 5.).unwrap();
    assert_eq!(ders.len(), 2);
    assert_relative_eq!(ders[0], Vector3::new(1., 0., 0.), epsilon = 1e-6);
    assert_relative_eq!(ders[1].norm(), 0., epsilon = 1e-9);

    assert!(matches!(
        line.derivatives_at(0, 5.),
        Err(CurveError::InvalidArgument { .. })
    ));
}

#[test]
fn tangent_frame_is_right_handed_and_orthonormal() {
    let curve =
        ArcLengthCurve3D::try_line(&Point3::new(0., 0., 0.), &Point3::new(6., 0., 8.)).unwrap();
    let frame = curve.tangent_frame_at(5.).unwrap();
    let t = frame.tangent();
    let n = frame.normal();
    let b = frame.binormal();
    assert_relative_eq!(t.norm(), 1., epsilon = 1e-9);
    assert_relative_eq!(n.norm(), 1., epsilon = 1e-9);
    assert_relative_eq!(b.norm(), 1., epsilon = 1e-9);
    assert_relative_eq!(t.dot(n), 0., epsilon = 1e-9);
    assert_relative_eq!(t.dot(b), 0., epsilon = 1e-9);
    assert_relative_eq!(n.dot(b), 0., epsilon = 1e-9);
    assert_relative_eq!(t.cross(n), *b, epsilon = 1e-9);
    assert_relative_eq!(*frame.position(), Point3::new(3., 0., 4.), epsilon = 1e-5);

    // the normal stays horizontal since it is anchored to the world z axis
    assert_relative_eq!(n.z, 0., epsilon = 1e-9);
}

#[test]
fn tangent_frame_degenerates_on_a_vertical_line() {
    let curve =
        ArcLengthCurve3D::try_line(&Point3::new(0., 0., 0.), &Point3::new(0., 0., 10.)).unwrap();
    let result = curve.tangent_frame_at(5.);
    assert!(matches!(result, Err(CurveError::DegenerateCurve { .. })));
    assert_eq!(curve.last_status(), CurveStatus::DegenerateCurve);
}

#[test]
fn closest_point_reports_abscissa_and_distance() {
    let line = x_axis_line(10.);
    let (m, distance) = line.find_closest_point(&Point3::new(5., 3., 0.)).unwrap();
    assert_relative_eq!(m, 5., epsilon = 1e-4);
    assert_relative_eq!(distance, 3., epsilon = 1e-4);

    // beyond the end the abscissa clamps to the endpoint
    let (m, distance) = line.find_closest_point(&Point3::new(12., 0., 0.)).unwrap();
    assert_relative_eq!(m, 10., epsilon = 1e-4);
    assert_relative_eq!(distance, 2., epsilon = 1e-4);

    let circle = unit_circle();
    let (m, distance) = circle.find_closest_point(&Point2::new(0.5, 0.5)).unwrap();
    assert_relative_eq!(m, std::f64::consts::FRAC_PI_4, epsilon = 1e-3);
    assert_relative_eq!(distance, 1. - std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-4);
}

#[test]
fn closest_point_on_a_closed_curve_stays_within_the_domain() {
    let circle = unit_circle();
    let (m0, m1) = circle.meters_range();
    let steps = 24;
    // radii near the center give nearly flat objectives, angles near zero
    // land next to the seam where the newton step wraps around
    for r in [0.001, 0.101, 0.5, 0.999, 1.5] {
        for i in 0..steps {
            let theta = 2. * std::f64::consts::PI * (i as f64) / (steps as f64);
            let query = Point2::new(r * theta.cos(), r * theta.sin());
            match circle.find_closest_point(&query) {
                Ok((m, distance)) => {
                    assert!(
                        m >= m0 - circle.epsge() && m <= m1 + circle.epsge(),
                        "abscissa {} escaped [{}, {}] for query {}",
                        m,
                        m0,
                        m1,
                        query
                    );
                    let p = circle.point_at(m).unwrap();
                    assert_relative_eq!((query - p).norm(), distance, epsilon = 1e-5);
                }
                Err(CurveError::NoSolution { .. }) => {}
                Err(other) => panic!("unexpected error for query {}: {:?}", query, other),
            }
        }
    }

    // just off the seam point on either side
    for query in [Point2::new(1., 1e-4), Point2::new(1., -1e-4)] {
        let (m, distance) = circle.find_closest_point(&query).unwrap();
        assert!(m >= m0 && m <= m1);
        assert_relative_eq!(distance, 0., epsilon = 1e-3);
    }
}

#[test]
fn crossing_lines_intersect_once() {
    let a = ArcLengthCurve2D::try_line(&Point2::new(-2., 0.), &Point2::new(2., 0.)).unwrap();
    let b = ArcLengthCurve2D::try_line(&Point2::new(0., -2.), &Point2::new(0., 2.)).unwrap();
    let hits = a.find_intersections(&b, Some(OPTIONS)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_relative_eq!(hits[0], Point2::new(0., 0.), epsilon = 1e-4);

    // parallel offset lines never meet
    let c = ArcLengthCurve2D::try_line(&Point2::new(-2., 1.), &Point2::new(2., 1.)).unwrap();
    let none = a.find_intersections(&c, Some(OPTIONS)).unwrap();
    assert!(none.is_empty());
}

#[test]
fn intersections_sort_by_arc_length_on_the_subject() {
    let subject = ArcLengthCurve2D::try_line(&Point2::new(-2., 0.), &Point2::new(2., 0.)).unwrap();
    let zigzag = ArcLengthCurve2D::try_from_spline(NurbsCurve2D::polyline(
        &[
            Point2::new(-1., -1.),
            Point2::new(0., 1.),
            Point2::new(1., -1.),
        ],
        false,
    ))
    .unwrap();
    let hits = subject.find_intersections(&zigzag, Some(OPTIONS)).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].x < hits[1].x);
    assert_relative_eq!(hits[0], Point2::new(-0.5, 0.), epsilon = 1e-3);
    assert_relative_eq!(hits[1], Point2::new(0.5, 0.), epsilon = 1e-3);
}

#[test]
fn construction_rejects_degenerate_input() {
    let p = Point2::new(1., 1.);
    assert!(matches!(
        ArcLengthCurve2D::try_line(&p, &p),
        Err(CurveError::InvalidArgument { .. })
    ));

    // nonpositive weights break the rational evaluation
    let weighted = ArcLengthCurve2D::try_from_control_points(
        1,
        vec![Point3::new(0., 0., 1.), Point3::new(1., 0., -1.)],
        vec![0., 0., 1., 1.],
    );
    assert!(matches!(weighted, Err(CurveError::Construction { .. })));

    assert!(matches!(
        ArcLengthCurve2D::try_from_geometry_with(
            CurveGeometry::Line {
                start: Point2::new(0., 0.),
                end: Point2::new(1., 0.),
            },
            0.,
        ),
        Err(CurveError::InvalidArgument { .. })
    ));
}

#[test]
fn display_reports_the_parametrization() {
    let mut line = x_axis_line(10.);
    line.set_name("route");
    let text = line.to_string();
    assert!(text.starts_with("Curve name: route | Length: "), "{}", text);
    assert!(
        text.contains("| Native parametrization interval: [0, 10]"),
        "{}",
        text
    );
}
