//! 运行配置.

use crate::consts::handoff::{DEFAULT_IMAGE_FILE_NAME, WORK_DIR_NAME};
use crate::pipeline::{ConversionVariant, SeedPolicy};
use crate::solver::SolverConfig;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 获取默认工作目录 `{缓存目录}/static-needle`. 没有缓存目录时使用系统临时目录.
pub fn default_work_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(WORK_DIR_NAME)
}

/// 一次 (或一批) 分割调用的配置.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SegmentationConfig {
    /// 外部程序配置.
    pub solver: SolverConfig,

    /// 图像落盘目录.
    pub work_dir: PathBuf,

    /// 落盘图像文件名.
    pub image_file_name: String,

    /// 是否压缩落盘图像.
    pub compress_image: bool,

    /// 种子/参考点集合有多个点时的处理方式.
    pub seed_policy: SeedPolicy,

    /// 坐标转换方式.
    pub conversion: ConversionVariant,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            work_dir: default_work_dir(),
            image_file_name: DEFAULT_IMAGE_FILE_NAME.to_string(),
            compress_image: false,
            seed_policy: SeedPolicy::default(),
            conversion: ConversionVariant::default(),
        }
    }
}

impl SegmentationConfig {
    /// 单次调用时落盘图像的完整路径.
    #[inline]
    pub fn image_path(&self) -> PathBuf {
        self.work_dir.join(&self.image_file_name)
    }

    /// 批量调用中第 `index` 个任务独立的落盘路径, 避免并发任务互相覆盖.
    pub fn case_image_path(&self, index: usize) -> PathBuf {
        let mut p = self.work_dir.clone();
        p.push(format!("case-{index}"));
        p.push(&self.image_file_name);
        p
    }

    /// 替换工作目录.
    pub fn with_work_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.work_dir = dir.as_ref().to_owned();
        self
    }
}
