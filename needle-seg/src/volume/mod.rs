//! 宿主平台协作者的显式接口, 以及它们的内存实现.
//!
//! 宿主平台中的体数据节点、标记点节点在这里被抽象为三个 trait:
//! [`VolumeSource`], [`PointSetSource`] 和 [`PointSetSink`].

mod metaimage;
mod nii;

pub use metaimage::write_metaimage;

use crate::geometry::{AffineTransform, DirectionCosines, Point3};
use crate::{Idx3d, NeedleError, NeedleResult};
use ndarray::{Array3, ArrayView3};
use std::path::Path;

/// 可被分割的三维体数据.
pub trait VolumeSource {
    /// 体素数据, 按 `(k, j, i)` 排列 (即 `i` 变化最快).
    fn voxel_grid(&self) -> ArrayView3<'_, f32>;

    /// 体素间距 `(i, j, k)`, 以毫米为单位.
    fn spacing(&self) -> [f64; 3];

    /// 第一个体素在病人坐标系中的位置.
    fn origin(&self) -> [f64; 3];

    /// IJK -> 病人坐标系方向余弦矩阵.
    fn direction_cosines(&self) -> DirectionCosines;

    /// 用户在场景中施加于该体数据的变换. `None` 等价于恒等变换.
    fn attached_transform(&self) -> Option<&AffineTransform>;
}

/// 只读标记点集合.
pub trait PointSetSource {
    /// 点的个数.
    fn count(&self) -> usize;

    /// 第 `index` 个点. 越界时返回 `None`.
    fn point(&self, index: usize) -> Option<Point3>;
}

/// 可写标记点集合.
pub trait PointSetSink {
    /// 清空所有点.
    fn clear(&mut self);

    /// 追加一个点.
    fn append(&mut self, p: Point3);
}

/// 体数据是否包含体素. 对应宿主中 "has image data" 的检查.
pub fn has_image_data<V: VolumeSource + ?Sized>(volume: &V) -> bool {
    !volume.voxel_grid().is_empty()
}

/// 内存中的体数据.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
    spacing: [f64; 3],
    origin: [f64; 3],
    direction: DirectionCosines,
    transform: Option<AffineTransform>,
}

impl Volume {
    /// 直接由体素和几何信息构建. 间距必须为正的有限值.
    pub fn new(
        data: Array3<f32>,
        spacing: [f64; 3],
        origin: [f64; 3],
        direction: DirectionCosines,
    ) -> NeedleResult<Self> {
        if !spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(NeedleError::invalid(format!(
                "voxel spacing must be positive, got {spacing:?}"
            )));
        }
        Ok(Self {
            data,
            spacing,
            origin,
            direction,
            transform: None,
        })
    }

    /// 打开 nii 文件格式的体数据. 方向和原点取自 sform (优先) 或 qform.
    pub fn open<P: AsRef<Path>>(path: P) -> NeedleResult<Self> {
        nii::open(path.as_ref())
    }

    /// 附加场景变换.
    #[inline]
    pub fn with_transform(mut self, transform: AffineTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// 替换或移除场景变换.
    #[inline]
    pub fn set_transform(&mut self, transform: Option<AffineTransform>) {
        self.transform = transform;
    }

    /// 数据形状 `(k, j, i)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

impl VolumeSource for Volume {
    #[inline]
    fn voxel_grid(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    #[inline]
    fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    #[inline]
    fn origin(&self) -> [f64; 3] {
        self.origin
    }

    #[inline]
    fn direction_cosines(&self) -> DirectionCosines {
        self.direction
    }

    #[inline]
    fn attached_transform(&self) -> Option<&AffineTransform> {
        self.transform.as_ref()
    }
}

/// 有名字的标记点列表 (fiducial list).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointList {
    name: String,
    points: Vec<Point3>,
}

impl PointList {
    /// 创建空列表.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: vec![],
        }
    }

    /// 由给定点创建列表.
    pub fn from_points<I: IntoIterator<Item = Point3>>(name: impl Into<String>, it: I) -> Self {
        Self {
            name: name.into(),
            points: it.into_iter().collect(),
        }
    }

    /// 列表名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 所有点.
    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }
}

impl PointSetSource for PointList {
    #[inline]
    fn count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    fn point(&self, index: usize) -> Option<Point3> {
        self.points.get(index).copied()
    }
}

impl PointSetSink for PointList {
    #[inline]
    fn clear(&mut self) {
        self.points.clear();
    }

    #[inline]
    fn append(&mut self, p: Point3) {
        self.points.push(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_init() {
        let v = Volume::new(
            Array3::zeros((2, 3, 4)),
            [0.5, 0.5, 1.0],
            [0.0; 3],
            DirectionCosines::identity(),
        )
        .unwrap();
        assert_eq!(v.shape(), (2, 3, 4));
        assert!(has_image_data(&v));
        assert!(v.attached_transform().is_none());

        let v = v.with_transform(AffineTransform::identity());
        assert!(v.attached_transform().is_some());

        let bad = Volume::new(
            Array3::zeros((1, 1, 1)),
            [0.0, 1.0, 1.0],
            [0.0; 3],
            DirectionCosines::identity(),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_empty_volume() {
        let v = Volume::new(
            Array3::zeros((0, 3, 4)),
            [1.0; 3],
            [0.0; 3],
            DirectionCosines::identity(),
        )
        .unwrap();
        assert!(!has_image_data(&v));
    }

    #[test]
    fn test_point_list() {
        let mut l = PointList::from_points("seed", [Point3::new(1.0, 2.0, 3.0)]);
        assert_eq!(l.name(), "seed");
        assert_eq!(l.count(), 1);
        assert_eq!(l.point(0), Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(l.point(1), None);

        l.clear();
        assert_eq!(l.count(), 0);
        l.append(Point3::origin());
        assert_eq!(l.points(), &[Point3::origin()]);
    }
}
