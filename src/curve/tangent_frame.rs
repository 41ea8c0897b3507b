use nalgebra::{Point3, Vector3};

use crate::misc::FloatingPoint;

/// An orthonormal frame at a point on a 3D curve.
/// Unlike a Frenet frame, the normal is anchored to the world z axis
/// instead of the curve's own curvature, so it stays stable along
/// straight runs where the curvature vector is undefined.
#[derive(Debug, Clone)]
pub struct TangentFrame<T: FloatingPoint> {
    position: Point3<T>,
    tangent: Vector3<T>,
    normal: Vector3<T>,
    binormal: Vector3<T>,
}

impl<T: FloatingPoint> TangentFrame<T> {
    pub fn new(
        position: Point3<T>,
        tangent: Vector3<T>,
        normal: Vector3<T>,
        binormal: Vector3<T>,
    ) -> Self {
        Self {
            position,
            tangent,
            normal,
            binormal,
        }
    }

    pub fn position(&self) -> &Point3<T> {
        &self.position
    }

    pub fn tangent(&self) -> &Vector3<T> {
        &self.tangent
    }

    pub fn normal(&self) -> &Vector3<T> {
        &self.normal
    }

    pub fn binormal(&self) -> &Vector3<T> {
        &self.binormal
    }
}
