//! 坐标转换流水线.
//!
//! 宿主病人坐标系中的种子点要先转换到外部分割程序所期望的坐标系
//! (`forward_convert`), 程序返回的针尖/针尾再原路转换回来 (`backward_convert`).
//! 两个方向必须使用同一种 [`ConversionVariant`], 否则输出点会静默错位.

mod format;

pub use format::{format_seed, format_significant};

use crate::geometry::{AffineTransform, DirectionCosines, PatientConvention, Point3};
use crate::volume::{PointSetSource, VolumeSource};
use crate::{NeedleError, NeedleResult};
use nalgebra::Matrix4;

/// 方向矩阵为恒等矩阵的判定容差.
const IDENTITY_TOL: f64 = 1e-9;

/// 坐标转换方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConversionVariant {
    /// 撤销场景变换后乘以方向余弦矩阵; 返回时先乘方向矩阵的逆, 再重新施加场景变换.
    #[default]
    General,

    /// 仅做 RAS <-> LPS 的轴取反, 忽略方向矩阵与场景变换.
    ///
    /// 只在方向矩阵为恒等、且没有场景变换时可用, 否则构建失败.
    AxisFlip,
}

/// 标记点集合中有多于一个点时的处理方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SeedPolicy {
    /// 使用第一个点, 并记录警告.
    #[default]
    FirstPoint,

    /// 拒绝, 返回 `InvalidInput`.
    RequireSingle,
}

/// 读取标记点集合的第一个点. `what` 用于错误信息和日志.
///
/// 集合为空时返回 `InvalidInput`; 多于一个点时按 `policy` 处理.
pub fn first_point<S: PointSetSource + ?Sized>(
    source: &S,
    policy: SeedPolicy,
    what: &str,
) -> NeedleResult<Point3> {
    let n = source.count();
    match (n, policy) {
        (0, _) => return Err(NeedleError::invalid(format!("{what} point list is empty"))),
        (1, _) => {}
        (n, SeedPolicy::FirstPoint) => {
            log::warn!("{what} point list has {n} points, only the first one is used");
        }
        (n, SeedPolicy::RequireSingle) => {
            return Err(NeedleError::invalid(format!(
                "{what} point list must contain exactly one point, got {n}"
            )));
        }
    }
    source
        .point(0)
        .ok_or_else(|| NeedleError::invalid(format!("{what} point list is empty")))
}

/// 读取种子点.
#[inline]
pub fn seed_from_point_set<S: PointSetSource + ?Sized>(
    source: &S,
    policy: SeedPolicy,
) -> NeedleResult<Point3> {
    first_point(source, policy, "seed")
}

/// 一次调用所需的坐标转换. 不保存调用之间的状态.
#[derive(Copy, Clone, Debug)]
pub struct CoordinatePipeline {
    direction: DirectionCosines,
    transform: Option<AffineTransform>,
    variant: ConversionVariant,
}

impl CoordinatePipeline {
    /// 构建. `AxisFlip` 的前提不满足时返回 `InvalidInput`.
    pub fn new(
        direction: DirectionCosines,
        transform: Option<AffineTransform>,
        variant: ConversionVariant,
    ) -> NeedleResult<Self> {
        if variant == ConversionVariant::AxisFlip {
            if !direction.is_identity(IDENTITY_TOL) {
                return Err(NeedleError::invalid(
                    "axis-flip conversion requires identity direction cosines",
                ));
            }
            if transform.is_some() {
                return Err(NeedleError::invalid(
                    "axis-flip conversion cannot be used with a volume transform",
                ));
            }
        }
        Ok(Self {
            direction,
            transform,
            variant,
        })
    }

    /// 从体数据取出方向矩阵和场景变换后构建.
    pub fn for_volume<V: VolumeSource + ?Sized>(
        volume: &V,
        variant: ConversionVariant,
    ) -> NeedleResult<Self> {
        Self::new(
            volume.direction_cosines(),
            volume.attached_transform().copied(),
            variant,
        )
    }

    /// 使用的转换方式.
    #[inline]
    pub fn variant(&self) -> ConversionVariant {
        self.variant
    }

    /// 宿主坐标 -> 外部程序坐标.
    pub fn forward(&self, seed: &Point3) -> NeedleResult<Point3> {
        match self.variant {
            ConversionVariant::General => {
                forward_convert(seed, &self.direction, self.transform.as_ref())
            }
            ConversionVariant::AxisFlip => {
                Ok(PatientConvention::Ras.convert_to(seed, PatientConvention::Lps))
            }
        }
    }

    /// 外部程序坐标 -> 宿主坐标, 返回 `(tip, tail)`.
    pub fn backward(&self, tip: &Point3, tail: &Point3) -> NeedleResult<(Point3, Point3)> {
        match self.variant {
            ConversionVariant::General => {
                backward_convert(tip, tail, &self.direction, self.transform.as_ref())
            }
            ConversionVariant::AxisFlip => {
                let to_host =
                    |p: &Point3| PatientConvention::Lps.convert_to(p, PatientConvention::Ras);
                Ok((to_host(tip), to_host(tail)))
            }
        }
    }
}

/// 宿主坐标 -> 外部程序坐标.
///
/// 若存在场景变换, 先乘以其 "from parent" 矩阵撤销它; 再乘以方向余弦矩阵.
pub fn forward_convert(
    seed: &Point3,
    direction: &DirectionCosines,
    transform: Option<&AffineTransform>,
) -> NeedleResult<Point3> {
    let m = match transform {
        Some(t) => direction.matrix() * t.from_parent()?,
        None => *direction.matrix(),
    };
    Ok(crate::geometry::multiply_point(&m, seed))
}

/// 外部程序坐标 -> 宿主坐标.
///
/// 先乘以方向余弦矩阵的逆; 若存在场景变换, 再乘以其 "to parent" 矩阵.
pub fn backward_convert(
    tip: &Point3,
    tail: &Point3,
    direction: &DirectionCosines,
    transform: Option<&AffineTransform>,
) -> NeedleResult<(Point3, Point3)> {
    let inv: Matrix4<f64> = direction.inverse()?;
    let m = match transform {
        Some(t) => t.to_parent() * inv,
        None => inv,
    };
    Ok((
        crate::geometry::multiply_point(&m, tip),
        crate::geometry::multiply_point(&m, tail),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::PointList;
    use crate::ErrorKind;
    use nalgebra::{Matrix3, Rotation3, Vector3};

    fn point_eq(a: &Point3, b: &Point3, eps: f64) -> bool {
        (a - b).amax() < eps
    }

    fn directions() -> Vec<DirectionCosines> {
        vec![
            DirectionCosines::identity(),
            DirectionCosines::from_matrix3(Matrix3::from_diagonal(&Vector3::new(-1.0, -1.0, 1.0))),
            DirectionCosines::from_matrix3(
                Rotation3::from_euler_angles(0.3, -1.1, 2.0).into_inner(),
            ),
            // 非正交但可逆.
            DirectionCosines::from_matrix3(Matrix3::new(
                1.0, 0.2, 0.0, //
                0.0, 0.9, 0.1, //
                0.3, 0.0, 1.2,
            )),
        ]
    }

    fn transforms() -> Vec<Option<AffineTransform>> {
        #[rustfmt::skip]
        let affine = AffineTransform::from_row_slice(&[
            1.1, 0.1, 0.0, 12.0,
            0.0, 0.95, -0.2, -7.5,
            0.05, 0.0, 1.0, 30.0,
            0.0, 0.0, 0.0, 1.0,
        ])
        .unwrap();
        let mut rigid = Rotation3::from_euler_angles(-0.4, 0.2, 0.9)
            .into_inner()
            .to_homogeneous();
        rigid[(0, 3)] = -3.0;
        rigid[(1, 3)] = 44.0;
        rigid[(2, 3)] = 0.5;
        vec![None, Some(affine), Some(AffineTransform::from_to_parent(rigid))]
    }

    #[test]
    fn test_round_trip() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(91.6299, 27.8934, 66.8955),
            Point3::new(-120.25, 4.5, -310.0),
        ];
        for d in directions() {
            for t in transforms() {
                for p in points.iter() {
                    let solver = forward_convert(p, &d, t.as_ref()).unwrap();
                    // 直通的外部程序: 针尖与针尾都等于种子.
                    let (tip, tail) = backward_convert(&solver, &solver, &d, t.as_ref()).unwrap();
                    assert!(point_eq(&tip, p, 1e-9), "{tip} != {p}");
                    assert!(point_eq(&tail, p, 1e-9));
                }
            }
        }
    }

    #[test]
    fn test_forward_applies_inverse_transform_then_direction() {
        let d = DirectionCosines::from_matrix3(Matrix3::from_diagonal(&Vector3::new(
            -1.0, -1.0, 1.0,
        )));
        let mut m = Matrix4::identity();
        m[(0, 3)] = 10.0;
        let t = AffineTransform::from_to_parent(m);

        // 撤销 +10 的平移后, 再翻转 x, y.
        let p = forward_convert(&Point3::new(15.0, 2.0, 3.0), &d, Some(&t)).unwrap();
        assert!(point_eq(&p, &Point3::new(-5.0, -2.0, 3.0), 1e-12));

        let (tip, _) = backward_convert(&p, &p, &d, Some(&t)).unwrap();
        assert!(point_eq(&tip, &Point3::new(15.0, 2.0, 3.0), 1e-12));
    }

    #[test]
    fn test_singular_matrices() {
        let d = DirectionCosines::from_matrix3(Matrix3::zeros());
        let p = Point3::origin();
        assert_eq!(
            backward_convert(&p, &p, &d, None).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );

        let t = AffineTransform::from_to_parent(Matrix4::zeros());
        assert!(forward_convert(&p, &DirectionCosines::identity(), Some(&t)).is_err());
    }

    #[test]
    fn test_axis_flip_variant() {
        let pipe =
            CoordinatePipeline::new(DirectionCosines::identity(), None, ConversionVariant::AxisFlip)
                .unwrap();
        let seed = Point3::new(1.0, 2.0, 3.0);
        let solver = pipe.forward(&seed).unwrap();
        assert_eq!(solver, Point3::new(-1.0, -2.0, 3.0));
        let (tip, tail) = pipe.backward(&solver, &Point3::new(0.0, 1.0, 0.0)).unwrap();
        assert_eq!(tip, seed);
        assert_eq!(tail, Point3::new(0.0, -1.0, 0.0));
        // 轴翻转即 RAS 与 LPS 之间的换算.
        assert_eq!(
            solver,
            PatientConvention::Ras.convert_to(&seed, PatientConvention::Lps)
        );

        let lps = directions()[1];
        assert!(CoordinatePipeline::new(lps, None, ConversionVariant::AxisFlip).is_err());
        assert!(CoordinatePipeline::new(
            DirectionCosines::identity(),
            Some(AffineTransform::identity()),
            ConversionVariant::AxisFlip
        )
        .is_err());
    }

    #[test]
    fn test_general_pipeline_matches_free_functions() {
        let d = directions()[2];
        let t = transforms()[1];
        let pipe = CoordinatePipeline::new(d, t, ConversionVariant::default()).unwrap();
        let seed = Point3::new(3.0, -4.0, 5.0);
        assert_eq!(
            pipe.forward(&seed).unwrap(),
            forward_convert(&seed, &d, t.as_ref()).unwrap()
        );
    }

    #[test]
    fn test_seed_policy() {
        let empty = PointList::new("seed");
        let e = seed_from_point_set(&empty, SeedPolicy::FirstPoint).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);

        let two = PointList::from_points(
            "seed",
            [Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)],
        );
        assert_eq!(
            seed_from_point_set(&two, SeedPolicy::FirstPoint).unwrap(),
            Point3::new(1.0, 2.0, 3.0)
        );
        assert_eq!(
            seed_from_point_set(&two, SeedPolicy::RequireSingle)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidInput
        );
    }
}
