//! 外部程序、工作目录和误差表文件的路径解析.
//!
//! 统一规则: 环境变量非空时使用其值, 否则退回默认值.

use needle_seg::consts::handoff::DEFAULT_SOLVER_EXE;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// 外部程序路径的环境变量.
pub const SOLVER_ENV: &str = "NEEDLE_SOLVER";

/// 工作目录的环境变量.
pub const WORK_DIR_ENV: &str = "NEEDLE_WORK_DIR";

/// 误差表文件的环境变量.
pub const METRICS_FILE_ENV: &str = "NEEDLE_METRICS_FILE";

fn non_empty(v: Option<OsString>) -> Option<PathBuf> {
    v.filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// 获取外部程序路径.
///
/// 1. 若环境变量 `$NEEDLE_SOLVER` 非空, 则返回其值;
/// 2. 否则, 若 `$HOME/.local/bin/StaticNeedleTestBed` 存在, 返回该路径;
/// 3. 否则, 返回 `StaticNeedleTestBed` (在 `PATH` 中查找).
pub fn solver_from_env_or_home() -> PathBuf {
    solver_from(env::var_os(SOLVER_ENV), dirs::home_dir())
}

fn solver_from(var: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    if let Some(p) = non_empty(var) {
        return p;
    }
    home.map(|h| h.join(".local").join("bin").join(DEFAULT_SOLVER_EXE))
        .filter(|p| p.is_file())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOLVER_EXE))
}

/// 获取工作目录.
///
/// 1. 若环境变量 `$NEEDLE_WORK_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `needle_seg::config::default_work_dir()`.
pub fn work_dir_from_env_or_default() -> PathBuf {
    non_empty(env::var_os(WORK_DIR_ENV)).unwrap_or_else(needle_seg::config::default_work_dir)
}

/// 获取误差表文件路径. 环境变量 `$NEEDLE_METRICS_FILE` 为空时返回 `None`.
pub fn metrics_file_from_env() -> Option<PathBuf> {
    non_empty(env::var_os(METRICS_FILE_ENV))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_resolution() {
        assert_eq!(
            solver_from(Some("/opt/solver".into()), None),
            PathBuf::from("/opt/solver")
        );
        // 空值视为未设置.
        assert_eq!(
            solver_from(Some("".into()), None),
            PathBuf::from(DEFAULT_SOLVER_EXE)
        );
        assert_eq!(
            solver_from(None, Some(PathBuf::from("/definitely/not/a/home"))),
            PathBuf::from(DEFAULT_SOLVER_EXE)
        );
    }
}
