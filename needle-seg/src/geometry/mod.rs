//! 三维坐标、仿射变换和方向余弦矩阵.
//!
//! 点的坐标系不由类型本身记录, 统一依靠变量命名区分:
//!
//! - `*_ras` / `*_lps`: 病人坐标系 (RAS 或 LPS 约定);
//! - `*_solver`: 外部分割程序期望的坐标系;
//! - 未加后缀时默认为宿主 (host) 的原生病人坐标系.

mod direction;
mod transform;

pub use direction::DirectionCosines;
pub use transform::AffineTransform;

use nalgebra::{Matrix4, Vector4};

/// 三维点. 坐标单位为毫米.
pub type Point3 = nalgebra::Point3<f64>;

/// 三维向量.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 将点补齐为齐次坐标 `(x, y, z, 1)`, 左乘 `m` 后截断回三维.
///
/// 与宿主平台的 `MultiplyPoint` 一致, 不对 `w` 分量做除法.
#[inline]
pub(crate) fn multiply_point(m: &Matrix4<f64>, p: &Point3) -> Point3 {
    let h = m * Vector4::new(p.x, p.y, p.z, 1.0);
    Point3::new(h.x, h.y, h.z)
}

/// 病人坐标系约定. 两者互为镜像, 相差前两个轴的符号.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PatientConvention {
    /// Right-Anterior-Superior.
    Ras,

    /// Left-Posterior-Superior.
    Lps,
}

impl PatientConvention {
    /// 将 `self` 约定下的点转换到 `target` 约定下.
    #[inline]
    pub fn convert_to(self, p: &Point3, target: PatientConvention) -> Point3 {
        if self == target {
            *p
        } else {
            Point3::new(-p.x, -p.y, p.z)
        }
    }
}
