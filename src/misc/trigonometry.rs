use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint, RealField};

/// Find the closest point on a segment
/// * `pt` - point to project
/// * `start` - start point of segment
/// * `end` - end point of segment
/// * `u0` - first param of segment
/// * `u1` - second param of segment
pub fn segment_closest_point<T: RealField + Copy, D: DimName>(
    pt: &OPoint<T, D>,
    start: &OPoint<T, D>,
    end: &OPoint<T, D>,
    u0: T,
    u1: T,
) -> (T, OPoint<T, D>)
where
    DefaultAllocator: Allocator<D>,
{
    let dif = end - start;
    let l = dif.norm();

    if l < T::default_epsilon() {
        return (u0, start.clone());
    }

    let o = start.clone();
    let r = dif / l;
    let o2pt = pt - &o;
    let do2ptr = o2pt.dot(&r);

    if do2ptr < T::zero() {
        (u0, start.clone())
    } else if do2ptr > l {
        (u1, end.clone())
    } else {
        (u0 + (u1 - u0) * do2ptr / l, (r * do2ptr + o.coords).into())
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Point2;

    use super::segment_closest_point;

    #[test]
    fn projection_inside_segment() {
        let (u, pt) = segment_closest_point(
            &Point2::new(5., 3.),
            &Point2::new(0., 0.),
            &Point2::new(10., 0.),
            0.,
            1.,
        );
        assert_eq!(u, 0.5);
        assert_eq!(pt, Point2::new(5., 0.));
    }

    #[test]
    fn projection_clamped_to_ends() {
        let a = Point2::new(0., 0.);
        let b = Point2::new(10., 0.);
        let (u0, p0) = segment_closest_point(&Point2::new(-2., 1.), &a, &b, 0., 1.);
        assert_eq!((u0, p0), (0., a));
        let (u1, p1) = segment_closest_point(&Point2::new(12., -1.), &a, &b, 0., 1.);
        assert_eq!((u1, p1), (1., b));
    }
}
