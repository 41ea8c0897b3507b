#![cfg(feature = "serde")]

use approx::assert_relative_eq;
use arcurve::prelude::NurbsCurve2D;
use nalgebra::Point2;

#[test]
fn test_serialization() {
    let curve = NurbsCurve2D::polyline(
        &[
            Point2::new(0., 0.),
            Point2::new(3., 0.),
            Point2::new(3., 4.),
        ],
        false,
    );
    let json = serde_json::to_string_pretty(&curve).unwrap();
    println!("{}", json);

    let restored: NurbsCurve2D<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.degree(), curve.degree());
    let (start, end) = curve.knots_domain();
    let mid = (start + end) * 0.5;
    assert_relative_eq!(restored.point_at(mid), curve.point_at(mid), epsilon = 1e-10);
}
