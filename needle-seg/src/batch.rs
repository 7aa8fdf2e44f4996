//! 批量分割.
//!
//! 每个任务使用独立的落盘路径 `{work_dir}/case-{index}/{image_file_name}`,
//! 误差行统一追加到同一个 [`MetricsStore`].

use crate::geometry::{AffineTransform, Point3};
use crate::logic::{NeedleSegmentationLogic, RunOutcome};
use crate::metrics::MetricsStore;
use crate::solver::SegmentationBackend;
use crate::volume::{PointList, Volume};
use crate::NeedleResult;
use std::path::PathBuf;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
    }
}

/// 任务的体数据来源.
#[derive(Debug, Clone)]
pub enum CaseVolume {
    /// nii 文件, 运行时才加载.
    File(PathBuf),

    /// 已加载的体数据.
    Loaded(Volume),
}

/// 一个分割任务.
#[derive(Debug, Clone)]
pub struct BatchCase {
    /// 任务名, 仅用于日志和输出.
    pub label: String,

    /// 体数据.
    pub volume: CaseVolume,

    /// 覆盖体数据自带的场景变换. `None` 时保持体数据原样.
    pub transform: Option<AffineTransform>,

    /// 种子点.
    pub seed: Point3,

    /// 手工标注的针尖. 为 `None` 时不评估误差.
    pub manual_tip: Option<Point3>,

    /// 期望插入角 (度).
    pub expected_insertion_angle: f64,
}

/// 一个任务的结果.
#[derive(Debug)]
pub struct CaseReport {
    /// 任务序号.
    pub index: usize,

    /// 任务名.
    pub label: String,

    /// 结果.
    pub outcome: NeedleResult<RunOutcome>,
}

impl<B: SegmentationBackend> NeedleSegmentationLogic<B> {
    /// 运行第 `index` 个任务.
    pub fn run_case(&self, index: usize, case: &BatchCase, store: &MetricsStore) -> CaseReport {
        log::info!("case #{index} `{}`", case.label);
        CaseReport {
            index,
            label: case.label.clone(),
            outcome: self.run_case_inner(index, case, store),
        }
    }

    fn run_case_inner(
        &self,
        index: usize,
        case: &BatchCase,
        store: &MetricsStore,
    ) -> NeedleResult<RunOutcome> {
        let mut volume = match &case.volume {
            CaseVolume::File(p) => Volume::open(p)?,
            CaseVolume::Loaded(v) => v.clone(),
        };
        if case.transform.is_some() {
            volume.set_transform(case.transform);
        }

        let mut output = PointList::new(format!("{}-needle", case.label));
        self.run_points(
            &volume,
            case.seed,
            case.manual_tip.map(|m| (m, case.expected_insertion_angle)),
            &self.config().case_image_path(index),
            &mut output,
            store,
        )
    }

    /// 依次运行所有任务. 单个任务失败不影响其它任务.
    pub fn run_batch(&self, cases: &[BatchCase], store: &MetricsStore) -> Vec<CaseReport> {
        cases
            .iter()
            .enumerate()
            .map(|(i, c)| self.run_case(i, c, store))
            .collect()
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl<B: SegmentationBackend + Sync> NeedleSegmentationLogic<B> {
    /// 并发运行所有任务. 返回顺序与 `cases` 一致, 误差表中行的顺序不确定.
    pub fn par_run_batch(&self, cases: &[BatchCase], store: &MetricsStore) -> Vec<CaseReport> {
        cases
            .par_iter()
            .enumerate()
            .map(|(i, c)| self.run_case(i, c, store))
            .collect()
    }
}
