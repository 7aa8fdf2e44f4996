//! 一次完整的分割调用.
//!
//! 图像落盘 -> 种子点正向转换 -> 外部程序 -> 解析输出 -> 反向转换 -> (可选) 误差评估.
//! 任一步失败都不会修改输出点集合, 也不会向误差表追加行.

use crate::config::SegmentationConfig;
use crate::geometry::Point3;
use crate::metrics::{compute_metrics, MetricsRow, MetricsStore};
use crate::pipeline::{first_point, format_seed, CoordinatePipeline};
use crate::solver::{parse_solver_output, ExternalSolver, SegmentationBackend};
use crate::volume::{has_image_data, write_metaimage, PointSetSink, PointSetSource, VolumeSource};
use crate::{NeedleError, NeedleResult};
use std::path::{Path, PathBuf};

/// 反向转换后的自动分割结果, 位于宿主坐标系.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NeedleSegmentationResult {
    /// 针尖.
    pub tip: Point3,

    /// 针尾.
    pub tail: Point3,
}

/// 手工标注的参考信息.
#[derive(Copy, Clone)]
pub struct ManualReference<'a> {
    /// 手工标注的针尖 (只读取第一个点).
    pub points: &'a dyn PointSetSource,

    /// 期望插入角 (度).
    pub expected_insertion_angle: f64,
}

/// 一次调用的全部产出.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    /// 分割结果.
    pub result: NeedleSegmentationResult,

    /// 误差. 没有手工参考点时为 `None`.
    pub metrics: Option<MetricsRow>,

    /// 传给外部程序的种子点文本.
    pub seed_text: String,

    /// 落盘图像路径.
    pub image_path: PathBuf,
}

/// 分割调用的入口.
#[derive(Debug)]
pub struct NeedleSegmentationLogic<B = ExternalSolver> {
    config: SegmentationConfig,
    backend: B,
}

impl NeedleSegmentationLogic<ExternalSolver> {
    /// 以配置中的外部程序作为后端.
    pub fn new(config: SegmentationConfig) -> Self {
        let backend = ExternalSolver::new(config.solver.clone());
        Self { config, backend }
    }
}

impl<B: SegmentationBackend> NeedleSegmentationLogic<B> {
    /// 使用自定义后端.
    pub fn with_backend(config: SegmentationConfig, backend: B) -> Self {
        Self { config, backend }
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// 后端.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 运行一次分割.
    ///
    /// 成功时先清空 `output` 再依次写入针尖和针尾; 若给出 `manual`,
    /// 计算误差并追加到 `store`.
    pub fn run<V, S, O>(
        &self,
        volume: &V,
        seeds: &S,
        output: &mut O,
        manual: Option<ManualReference<'_>>,
        store: &MetricsStore,
    ) -> NeedleResult<RunOutcome>
    where
        V: VolumeSource + ?Sized,
        S: PointSetSource + ?Sized,
        O: PointSetSink + ?Sized,
    {
        let seed = first_point(seeds, self.config.seed_policy, "seed")?;
        let manual = match manual {
            Some(m) => Some((
                first_point(m.points, self.config.seed_policy, "manual tip")?,
                m.expected_insertion_angle,
            )),
            None => None,
        };
        self.run_points(volume, seed, manual, &self.config.image_path(), output, store)
    }

    /// 以已取出的点运行. `image_path` 为本次调用的图像落盘路径.
    pub(crate) fn run_points<V, O>(
        &self,
        volume: &V,
        seed: Point3,
        manual: Option<(Point3, f64)>,
        image_path: &Path,
        output: &mut O,
        store: &MetricsStore,
    ) -> NeedleResult<RunOutcome>
    where
        V: VolumeSource + ?Sized,
        O: PointSetSink + ?Sized,
    {
        log::info!("processing started");

        let (result, seed_text) = self.segment(volume, &seed, image_path)?;

        let metrics = match manual {
            Some((manual_tip, angle)) => {
                Some(compute_metrics(&result.tip, &result.tail, &manual_tip, angle)?)
            }
            None => None,
        };

        output.clear();
        output.append(result.tip);
        output.append(result.tail);
        if let Some(row) = metrics {
            store.record(row);
        }

        log::info!("processing completed");
        Ok(RunOutcome {
            result,
            metrics,
            seed_text,
            image_path: image_path.to_owned(),
        })
    }

    /// 只做分割, 不写输出也不评估误差. 返回结果和种子点文本.
    pub fn segment<V: VolumeSource + ?Sized>(
        &self,
        volume: &V,
        seed: &Point3,
        image_path: &Path,
    ) -> NeedleResult<(NeedleSegmentationResult, String)> {
        if !has_image_data(volume) {
            return Err(NeedleError::invalid("volume has no image data"));
        }
        let pipeline = CoordinatePipeline::for_volume(volume, self.config.conversion)?;

        write_metaimage(image_path, volume, self.config.compress_image)?;
        log::info!("image written to {}", image_path.display());

        let seed_solver = pipeline.forward(seed)?;
        let seed_text = format_seed(&seed_solver);
        log::info!("seed point: {seed_text}");

        let raw = self.backend.run(image_path, &seed_text)?;
        let out = parse_solver_output(&raw)?;
        let (tip, tail) = pipeline.backward(&out.tip_solver, &out.tail_solver)?;

        Ok((NeedleSegmentationResult { tip, tail }, seed_text))
    }
}
