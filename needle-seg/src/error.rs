//! 运行时错误.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 错误大类. 调用方据此决定如何向用户展示错误.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// 输入缺失或不合法 (种子点, 参考点, 矩阵, 体数据等).
    InvalidInput,

    /// 外部分割程序调用失败.
    ExternalProcessFailure,

    /// 误差计算时出现零长度方向向量.
    DegenerateGeometry,

    /// 图像落盘等底层 I/O 错误.
    Io,
}

/// 外部分割程序的失败原因.
#[derive(Debug, Error)]
pub enum SolverFailure {
    /// 找不到可执行文件.
    #[error("executable `{0}` not found")]
    NotFound(PathBuf),

    /// 无法启动子进程.
    #[error("failed to spawn `{path}`: {source}")]
    Spawn {
        /// 可执行文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// 子进程以非零状态退出. `code` 为 `None` 表示被信号终止.
    #[error("solver exited with status {code:?}: {stderr}")]
    NonZeroExit {
        /// 退出码.
        code: Option<i32>,
        /// 捕获的标准错误输出.
        stderr: String,
    },

    /// 超过时间限制, 子进程已被终止.
    #[error("solver timed out after {0:?}")]
    Timeout(Duration),

    /// 调用被取消, 子进程已被终止.
    #[error("solver invocation cancelled")]
    Cancelled,

    /// 输出的数值个数不对.
    #[error("expected {expected} values in solver output, got {got}: {raw:?}")]
    WrongValueCount {
        /// 期望个数.
        expected: usize,
        /// 实际个数.
        got: usize,
        /// 原始输出.
        raw: String,
    },

    /// 输出中存在无法解析为浮点数的片段.
    #[error("unparsable token `{0}` in solver output")]
    BadFloat(String),

    /// 与子进程通信的其它 I/O 错误.
    #[error("solver i/o error: {0}")]
    Io(std::io::Error),
}

/// 是哪一个方向向量退化了.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DegenerateVector {
    /// `tip - tail`.
    Algorithm,

    /// `manual_tip - tail`.
    Manual,
}

/// 针分割前端的统一错误类型.
#[derive(Debug, Error)]
pub enum NeedleError {
    /// 输入缺失或不合法.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 外部分割程序调用失败.
    #[error("external process failure: {0}")]
    ExternalProcessFailure(#[from] SolverFailure),

    /// 零长度方向向量.
    #[error("degenerate geometry: {0:?} direction vector has zero length")]
    DegenerateGeometry(DegenerateVector),

    /// 图像落盘失败.
    #[error("i/o error on `{path}`: {source}")]
    Io {
        /// 出错的文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// 读取 nifti 体数据失败.
    #[error("failed to load volume: {0}")]
    Volume(#[from] nifti::NiftiError),
}

impl NeedleError {
    /// 便捷构造 `InvalidInput`.
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// 错误大类.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Volume(_) => ErrorKind::InvalidInput,
            Self::ExternalProcessFailure(_) => ErrorKind::ExternalProcessFailure,
            Self::DegenerateGeometry(_) => ErrorKind::DegenerateGeometry,
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}
