//! 体数据的 IJK -> 病人坐标系方向余弦矩阵.

use super::{multiply_point, Point3};
use crate::{NeedleError, NeedleResult};
use nalgebra::{Matrix3, Matrix4};

/// 方向余弦矩阵, 以 4x4 齐次形式保存 (平移部分恒为零).
///
/// 描述图像索引轴的排列顺序和手性与病人坐标系之间的关系,
/// 例如 LPS 存储的图像在 RAS 宿主中前两列为负.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DirectionCosines {
    m: Matrix4<f64>,
}

impl Default for DirectionCosines {
    fn default() -> Self {
        Self::identity()
    }
}

impl DirectionCosines {
    /// 恒等方向.
    #[inline]
    pub fn identity() -> Self {
        Self {
            m: Matrix4::identity(),
        }
    }

    /// 由 3x3 方向矩阵构建. 第 `j` 列为第 `j` 个索引轴在病人坐标系中的方向.
    #[inline]
    pub fn from_matrix3(m: Matrix3<f64>) -> Self {
        Self {
            m: m.to_homogeneous(),
        }
    }

    /// 由 4x4 齐次矩阵构建. 平移部分被丢弃.
    pub fn from_matrix4(m: Matrix4<f64>) -> Self {
        Self::from_matrix3(m.fixed_view::<3, 3>(0, 0).into_owned())
    }

    /// 4x4 齐次形式.
    #[inline]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.m
    }

    /// 逆矩阵. 矩阵奇异时返回 `InvalidInput`.
    pub fn inverse(&self) -> NeedleResult<Matrix4<f64>> {
        self.m
            .try_inverse()
            .ok_or_else(|| NeedleError::invalid("direction cosine matrix is not invertible"))
    }

    /// 对点施加方向矩阵.
    #[inline]
    pub fn apply(&self, p: &Point3) -> Point3 {
        multiply_point(&self.m, p)
    }

    /// 是否在容差 `tol` 内为恒等矩阵.
    pub fn is_identity(&self, tol: f64) -> bool {
        (self.m - Matrix4::identity()).amax() <= tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lps_direction() {
        let d = DirectionCosines::from_matrix3(Matrix3::from_diagonal(&nalgebra::Vector3::new(
            -1.0, -1.0, 1.0,
        )));
        assert!(!d.is_identity(1e-12));
        assert_eq!(d.apply(&Point3::new(1.0, 2.0, 3.0)), Point3::new(-1.0, -2.0, 3.0));
        // 对称的方向矩阵与其逆相等.
        assert_eq!(d.inverse().unwrap(), *d.matrix());
    }

    #[test]
    fn test_from_matrix4_drops_translation() {
        let mut m = Matrix4::identity();
        m[(0, 3)] = 100.0;
        let d = DirectionCosines::from_matrix4(m);
        assert!(d.is_identity(0.0));
        assert_eq!(DirectionCosines::default(), d);
    }

    #[test]
    fn test_singular_direction() {
        let d = DirectionCosines::from_matrix3(Matrix3::zeros());
        assert!(d.inverse().is_err());
    }
}
