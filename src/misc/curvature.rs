use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OVector};

use crate::misc::FloatingPoint;

/// Unit tangent & curvature vector pair evaluated at a point on a curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Curvature<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// Unit tangent vector
    t: OVector<T, D>,
    /// Curvature vector
    k: OVector<T, D>,
}

impl<T: FloatingPoint, D: DimName> Curvature<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    pub fn new(t: OVector<T, D>, k: OVector<T, D>) -> Self {
        Self { t, k }
    }

    /// Compute curvature from first and second derivatives:
    /// T = D1 / |D1|
    /// K = ( D2 - (D2 o T)*T ) / ( D1 o D1 )
    /// The formula is invariant under reparametrization of the curve.
    /// Returns `Err` if the first derivative vanishes; by L'Hopital the
    /// unit tangent then equals the unitized second derivative when the
    /// latter is nonzero, and that fallback is carried in the `Err` value.
    pub fn derivatives(deriv1: OVector<T, D>, deriv2: OVector<T, D>) -> Result<Self, Self> {
        let n1 = deriv1.norm();
        if n1.is_zero() {
            let n2 = deriv2.norm();
            if n2.is_zero() {
                Err(Self::new(OVector::zeros(), OVector::zeros()))
            } else {
                let u = deriv2 / n2;
                Err(Self::new(u, OVector::zeros()))
            }
        } else {
            let tangent = deriv1.clone() / n1;
            let dot = deriv2.dot(&tangent);
            let d1 = T::one() / (deriv1.dot(&deriv1));
            let k = (deriv2 - tangent.clone() * dot) * d1;
            Ok(Self::new(tangent, k))
        }
    }

    /// Returns the unit tangent vector
    pub fn tangent_vector(&self) -> OVector<T, D> {
        self.t.clone()
    }

    /// Returns the curvature vector
    pub fn curvature_vector(&self) -> OVector<T, D> {
        self.k.clone()
    }

    /// Returns the curvature magnitude
    pub fn kappa(&self) -> T {
        self.k.norm()
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector2;

    use super::Curvature;

    #[test]
    fn circle_curvature() {
        // derivatives of a radius 2 circle at angle 0
        let r = 2.0_f64;
        let c = Curvature::derivatives(Vector2::new(0., r), Vector2::new(-r, 0.)).unwrap();
        assert_eq!(c.tangent_vector(), Vector2::new(0., 1.));
        assert!((c.kappa() - 1. / r).abs() < 1e-10);
    }

    #[test]
    fn vanishing_first_derivative() {
        let res = Curvature::derivatives(Vector2::zeros(), Vector2::new(0., 3.));
        let fallback = res.unwrap_err();
        assert_eq!(fallback.tangent_vector(), Vector2::new(0., 1.));
        assert_eq!(fallback.kappa(), 0.);
    }
}
