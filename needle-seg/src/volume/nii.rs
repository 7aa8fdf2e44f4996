//! nii 文件读取, 以及从 header 推导体数据几何信息.

use super::Volume;
use crate::geometry::DirectionCosines;
use crate::{NeedleError, NeedleResult};
use nalgebra::{Matrix3, Quaternion, UnitQuaternion};
use ndarray::Ix3;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// 打开 nii 文件并转换为 `(k, j, i)` 排列的 `f32` 体素.
pub(super) fn open(path: &Path) -> NeedleResult<Volume> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = obj.header().clone();

    // [i, j, k] -> [k, j, i].
    let data = obj
        .into_volume()
        .into_ndarray::<f32>()?
        .permuted_axes([2, 1, 0].as_slice())
        .into_dimensionality::<Ix3>()
        .map_err(|e| NeedleError::invalid(format!("volume must be 3D: {e}")))?;
    let data = data.as_standard_layout().into_owned();

    log::debug!("loaded volume {} with shape {:?}", path.display(), data.dim());

    let (direction, origin) = orientation_from_header(&header);
    Volume::new(data, spacing_from_header(&header), origin, direction)
}

/// 体素间距 `(i, j, k)`.
pub(super) fn spacing_from_header(h: &NiftiHeader) -> [f64; 3] {
    let [_, i, j, k, ..] = h.pixdim;
    [i as f64, j as f64, k as f64].map(f64::abs)
}

/// 从 header 获得方向余弦矩阵和原点 (RAS).
///
/// 依次尝试 sform, qform. 两者都不可用时返回恒等方向和零原点.
pub(super) fn orientation_from_header(h: &NiftiHeader) -> (DirectionCosines, [f64; 3]) {
    if h.sform_code > 0 {
        let spacing = spacing_from_header(h);
        let rows = [h.srow_x, h.srow_y, h.srow_z];
        // sform 的 3x3 部分 = 方向 * diag(spacing).
        let m = Matrix3::from_fn(|r, c| {
            let s = spacing[c];
            let v = rows[r][c] as f64;
            if s > 0.0 {
                v / s
            } else {
                v
            }
        });
        let origin = rows.map(|row| row[3] as f64);
        return (DirectionCosines::from_matrix3(m), origin);
    }

    if h.qform_code > 0 {
        let (b, c, d) = (h.quatern_b as f64, h.quatern_c as f64, h.quatern_d as f64);
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let mut m = UnitQuaternion::from_quaternion(Quaternion::new(a, b, c, d))
            .to_rotation_matrix()
            .into_inner();

        // pixdim[0] 为 qfac, 取值 1 或 -1; 0 按 1 处理.
        if h.pixdim[0] < 0.0 {
            m.column_mut(2).neg_mut();
        }
        let origin = [h.quatern_x, h.quatern_y, h.quatern_z].map(|v| v as f64);
        return (DirectionCosines::from_matrix3(m), origin);
    }

    (DirectionCosines::identity(), [0.0; 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn header() -> NiftiHeader {
        NiftiHeader {
            pixdim: [1.0, 0.5, 0.5, 2.0, 1.0, 1.0, 1.0, 1.0],
            sform_code: 0,
            qform_code: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_spacing() {
        assert_eq!(spacing_from_header(&header()), [0.5, 0.5, 2.0]);
    }

    #[test]
    fn test_no_orientation() {
        let (d, o) = orientation_from_header(&header());
        assert!(d.is_identity(0.0));
        assert_eq!(o, [0.0; 3]);
    }

    #[test]
    fn test_sform_lps_storage() {
        // 以 LPS 顺序存储的图像: 前两个索引轴在 RAS 中为负方向.
        let h = NiftiHeader {
            sform_code: 1,
            srow_x: [-0.5, 0.0, 0.0, 90.0],
            srow_y: [0.0, -0.5, 0.0, 120.0],
            srow_z: [0.0, 0.0, 2.0, -30.0],
            ..header()
        };
        let (d, o) = orientation_from_header(&h);
        assert_eq!(o, [90.0, 120.0, -30.0]);
        let p = d.apply(&Point3::new(1.0, 1.0, 1.0));
        assert!(f64_eq(p.x, -1.0) && f64_eq(p.y, -1.0) && f64_eq(p.z, 1.0));
    }

    #[test]
    fn test_qform_rotation() {
        // 绕 z 轴旋转 180 度: (b, c, d) = (0, 0, 1).
        let h = NiftiHeader {
            qform_code: 1,
            quatern_b: 0.0,
            quatern_c: 0.0,
            quatern_d: 1.0,
            quatern_x: 1.0,
            quatern_y: 2.0,
            quatern_z: 3.0,
            ..header()
        };
        let (d, o) = orientation_from_header(&h);
        assert_eq!(o, [1.0, 2.0, 3.0]);
        let p = d.apply(&Point3::new(1.0, 2.0, 3.0));
        assert!(f64_eq(p.x, -1.0) && f64_eq(p.y, -2.0) && f64_eq(p.z, 3.0));

        // qfac = -1 翻转第三个轴.
        let mut h = h;
        h.pixdim[0] = -1.0;
        let (d, _) = orientation_from_header(&h);
        let p = d.apply(&Point3::new(0.0, 0.0, 1.0));
        assert!(f64_eq(p.z, -1.0));
    }
}
