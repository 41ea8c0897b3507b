use nalgebra::RealField;
use num_traits::ToPrimitive;

/// Trait alias for the scalar types the curve machinery works with (f32, f64)
pub trait FloatingPoint: RealField + ToPrimitive + Copy {}

impl FloatingPoint for f32 {}
impl FloatingPoint for f64 {}
