use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, DimNameDiff, DimNameSub, U1};

use crate::{bounding_box::CurveBoundingBoxTree, misc::FloatingPoint};

pub struct BoundingBoxTraversal<'a, T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    pairs: Vec<(CurveBoundingBoxTree<'a, T, D>, CurveBoundingBoxTree<'a, T, D>)>,
}

impl<'a, T: FloatingPoint, D: DimName> BoundingBoxTraversal<'a, T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    /// Try to traverse bounding box tree pairs to find pairs of intersecting curve segments.
    pub fn try_traverse(
        ta: CurveBoundingBoxTree<'a, T, D>,
        tb: CurveBoundingBoxTree<'a, T, D>,
    ) -> anyhow::Result<Self> {
        let mut trees = vec![(ta, tb)];
        let mut pairs = vec![];

        let tol = Some(T::zero());

        while let Some((a, b)) = trees.pop() {
            if !a.bounding_box().intersects(&b.bounding_box(), tol) {
                continue;
            }

            let ai = a.is_dividable();
            let bi = b.is_dividable();
            match (ai, bi) {
                (false, false) => {
                    pairs.push((a, b));
                }
                (true, false) => {
                    let (a0, a1) = a.try_divide()?;
                    trees.push((a0, b.clone()));
                    trees.push((a1, b));
                }
                (false, true) => {
                    let (b0, b1) = b.try_divide()?;
                    trees.push((a.clone(), b0));
                    trees.push((a, b1));
                }
                (true, true) => {
                    let (a0, a1) = a.try_divide()?;
                    let (b0, b1) = b.try_divide()?;
                    trees.push((a0.clone(), b0.clone()));
                    trees.push((a1.clone(), b0));
                    trees.push((a0, b1.clone()));
                    trees.push((a1, b1));
                }
            };
        }

        Ok(Self { pairs })
    }

    pub fn pairs(
        &self,
    ) -> &[(CurveBoundingBoxTree<'a, T, D>, CurveBoundingBoxTree<'a, T, D>)] {
        &self.pairs
    }

    pub fn into_pairs_iter(
        self,
    ) -> impl Iterator<Item = (CurveBoundingBoxTree<'a, T, D>, CurveBoundingBoxTree<'a, T, D>)>
    {
        self.pairs.into_iter()
    }
}
