//! 🪡 常用类型一次导入.

pub use crate::{Idx3d, NeedleError, NeedleResult};

pub use crate::config::SegmentationConfig;
pub use crate::geometry::{AffineTransform, DirectionCosines, PatientConvention, Point3, Vector3};
pub use crate::pipeline::{ConversionVariant, CoordinatePipeline, SeedPolicy};
pub use crate::solver::{CancelToken, ExternalSolver, SegmentationBackend, SolverConfig};
pub use crate::volume::{PointList, PointSetSink, PointSetSource, Volume, VolumeSource};

pub use crate::metrics::{compute_metrics, MetricsRow, MetricsStore, MetricsTable};

pub use crate::{BatchCase, CaseVolume, ManualReference, NeedleSegmentationLogic, RunOutcome};
