//! 自动分割结果与手工标注针尖之间的误差评估.
//!
//! 计算流程 (顺序会影响浮点结果, 不要调整):
//!
//! 1. 针尖距离 `|tip - manual_tip|`.
//! 2. 从共同的针尾出发的两个方向向量 `tip - tail` 和 `manual_tip - tail`, 并单位化.
//! 3. 轨迹夹角 = `acos(dot)`, 点积先截断到 `[-1, 1]`.
//! 4. 两个有效针尖都从 **算法针尖** 出发, 分别沿各自方向回退 10 mm, 求二者距离.
//! 5. 分割插入角 = 针方向与 A 轴负方向的夹角 `acos(-u.y)`; 插入角误差为其与期望值之差的绝对值.

mod store;
mod table;

pub use store::MetricsStore;
pub use table::{ColumnSummary, MetricsTable};

use crate::consts::metrics::{ACTIVE_TIP_OFFSET_MM, ZERO_LENGTH_EPS};
use crate::geometry::{Point3, Vector3};
use crate::{DegenerateVector, NeedleError, NeedleResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一次评估得到的五个误差值. 创建后不再修改.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsRow {
    /// 针尖距离 (mm).
    pub tip_distance: f64,

    /// 有效针尖距离 (mm).
    pub active_tip_distance: f64,

    /// 轨迹夹角误差 (度).
    pub trajectory_angle_error: f64,

    /// 分割出的插入角 (度).
    pub segmented_insertion_angle: f64,

    /// 插入角误差 (度).
    pub insertion_angle_error: f64,
}

impl MetricsRow {
    /// 按列顺序排列的五个值.
    #[inline]
    pub fn values(&self) -> [f64; 5] {
        [
            self.tip_distance,
            self.active_tip_distance,
            self.trajectory_angle_error,
            self.segmented_insertion_angle,
            self.insertion_angle_error,
        ]
    }
}

/// 两点间的欧几里得距离.
#[inline]
pub fn euclidean_distance(a: &Point3, b: &Point3) -> f64 {
    (a - b).norm()
}

/// 截断到 `[-1, 1]` 后求反余弦, 以度为单位.
#[inline]
fn acos_degrees(cos: f64) -> f64 {
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// 单位化. 长度为零时返回 `DegenerateGeometry`.
fn unit(v: Vector3, which: DegenerateVector) -> NeedleResult<Vector3> {
    let n = v.norm();
    if n <= ZERO_LENGTH_EPS || !n.is_finite() {
        return Err(NeedleError::DegenerateGeometry(which));
    }
    Ok(v / n)
}

/// 计算误差.
///
/// `tip`, `tail` 是自动分割结果, `manual_tip` 是手工标注的针尖,
/// `expected_insertion_angle` 为期望插入角 (度). 三个点应位于同一坐标系.
pub fn compute_metrics(
    tip: &Point3,
    tail: &Point3,
    manual_tip: &Point3,
    expected_insertion_angle: f64,
) -> NeedleResult<MetricsRow> {
    let tip_distance = euclidean_distance(tip, manual_tip);

    let algo_unit = unit(tip - tail, DegenerateVector::Algorithm)?;
    let manual_unit = unit(manual_tip - tail, DegenerateVector::Manual)?;

    let trajectory_angle_error = acos_degrees(algo_unit.dot(&manual_unit));

    // 两个有效针尖都以算法针尖为起点.
    let algo_active_tip = tip - algo_unit * ACTIVE_TIP_OFFSET_MM;
    let manual_active_tip = tip - manual_unit * ACTIVE_TIP_OFFSET_MM;
    let active_tip_distance = euclidean_distance(&algo_active_tip, &manual_active_tip);

    let segmented_insertion_angle = acos_degrees(-algo_unit.y);
    let insertion_angle_error = (expected_insertion_angle - segmented_insertion_angle).abs();

    Ok(MetricsRow {
        tip_distance,
        active_tip_distance,
        trajectory_angle_error,
        segmented_insertion_angle,
        insertion_angle_error,
    })
}
