//! 附着在体数据上的仿射变换.

use super::{multiply_point, Point3};
use crate::{NeedleError, NeedleResult};
use nalgebra::Matrix4;

/// 4x4 齐次仿射变换.
///
/// 内部保存 "to parent" 矩阵, 即用户在宿主场景中对体数据施加的变换方向;
/// 其逆矩阵即 "from parent".
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineTransform {
    to_parent: Matrix4<f64>,
}

impl AffineTransform {
    /// 以 "to parent" 矩阵构建.
    #[inline]
    pub fn from_to_parent(to_parent: Matrix4<f64>) -> Self {
        Self { to_parent }
    }

    /// 以按行排列的 16 个元素构建.
    pub fn from_row_slice(rows: &[f64]) -> NeedleResult<Self> {
        if rows.len() != 16 {
            return Err(NeedleError::invalid(format!(
                "affine transform needs 16 elements, got {}",
                rows.len()
            )));
        }
        Ok(Self::from_to_parent(Matrix4::from_row_slice(rows)))
    }

    /// 恒等变换.
    #[inline]
    pub fn identity() -> Self {
        Self::from_to_parent(Matrix4::identity())
    }

    /// "to parent" 矩阵.
    #[inline]
    pub fn to_parent(&self) -> &Matrix4<f64> {
        &self.to_parent
    }

    /// "from parent" 矩阵, 即 "to parent" 的逆. 矩阵奇异时返回 `InvalidInput`.
    pub fn from_parent(&self) -> NeedleResult<Matrix4<f64>> {
        self.to_parent
            .try_inverse()
            .ok_or_else(|| NeedleError::invalid("volume transform is not invertible"))
    }

    /// 对点施加 "to parent" 变换.
    #[inline]
    pub fn apply(&self, p: &Point3) -> Point3 {
        multiply_point(&self.to_parent, p)
    }
}
