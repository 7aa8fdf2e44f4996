#![warn(missing_docs)]

//! 静态针分割前端. 把宿主平台中的体数据与种子点交给外部针分割程序,
//! 再把程序返回的针尖/针尾放回宿主坐标系, 并可与手工标注比较误差.
//!
//! 该 crate 本身不做任何图像分割, 分割算法完全由外部可执行程序提供.
//!
//! # 注意
//!
//! 1. 宿主坐标系为 RAS, 外部程序使用 LPS (或体数据方向矩阵所定义的坐标系).
//!   正向与反向转换必须成对使用同一种 [`ConversionVariant`], 否则结果会静默错位.
//! 2. 外部程序通过参数向量启动, 不经过 shell. 程序输出必须恰好是六个浮点数.
//! 3. 任何一步失败都不会修改输出点集合, 也不会追加误差行.
//!
//! # 开发计划
//!
//! ### 体数据与标记点接口 ✅
//!
//! 宿主平台的协作者被抽象为 [`VolumeSource`], [`PointSetSource`], [`PointSetSink`].
//! 同时提供 nii 文件加载和内存中的点列表.
//!
//! 实现位于 `needle-seg/src/volume`.
//!
//! ### MetaImage 落盘 ✅
//!
//! 单文件 `.mha` 格式, 可选 zlib 压缩.
//!
//! 实现位于 `needle-seg/src/volume/metaimage.rs`.
//!
//! ### 坐标转换流水线 ✅
//!
//! 1. 正向: `D * T^-1 * p`. ✅
//! 2. 反向: `T * D^-1 * q`. ✅
//! 3. 仅轴取反的特殊情形. ✅
//! 4. 种子点文本格式 (10 位有效数字). ✅
//!
//! 实现位于 `needle-seg/src/pipeline`.
//!
//! ### 外部程序调用 ✅
//!
//! 超时、取消、非零退出、输出个数校验.
//!
//! 实现位于 `needle-seg/src/solver`.
//!
//! ### 误差评估与误差表 ✅
//!
//! 针尖距离, 有效针尖距离, 轨迹夹角, 插入角.
//! 误差表在第一次写入时创建, 可并发追加.
//!
//! 实现位于 `needle-seg/src/metrics`.
//!
//! ### 批量分割 ✅
//!
//! 每个任务使用独立落盘目录, 支持 rayon 并发.
//!
//! 实现位于 `needle-seg/src/batch.rs`.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

pub mod consts;

mod error;

pub use error::{DegenerateVector, ErrorKind, NeedleError, SolverFailure};

/// 本 crate 的通用返回类型.
pub type NeedleResult<T> = Result<T, NeedleError>;

pub mod config;
pub mod geometry;
pub mod metrics;
pub mod pipeline;
pub mod solver;
pub mod volume;

mod batch;
mod logic;

pub use batch::{BatchCase, CaseReport, CaseVolume};
pub use config::SegmentationConfig;
pub use logic::{ManualReference, NeedleSegmentationLogic, NeedleSegmentationResult, RunOutcome};
pub use metrics::{MetricsRow, MetricsStore, MetricsTable};
pub use pipeline::{ConversionVariant, SeedPolicy};
pub use volume::{PointList, PointSetSink, PointSetSource, Volume, VolumeSource};

pub mod prelude;
