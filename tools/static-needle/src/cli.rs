//! 命令行参数.

use clap::{ArgAction, Args, Parser, Subcommand};
use needle_seg::geometry::Point3;
use std::path::PathBuf;

/// 静态穿刺针分割前端.
#[derive(Debug, Parser)]
#[command(author, version, about = "Static needle segmentation front-end")]
pub struct Cli {
    /// JSON 配置文件 (`SegmentationConfig`). 其中的字段覆盖默认值和环境变量.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 误差表 JSON 文件. 存在时先读入, 运行结束后写回. 默认取 `$NEEDLE_METRICS_FILE`.
    #[arg(long, global = true)]
    pub table: Option<PathBuf>,

    /// 日志详细程度, 可重复 (`-v` info, `-vv` debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// 子命令.
    #[command(subcommand)]
    pub command: Command,
}

/// 子命令.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// 分割一个 nii 体数据.
    Segment(SegmentArgs),

    /// 只计算误差, 不调用外部程序.
    Metrics(MetricsArgs),

    /// 按 JSON 任务列表批量分割.
    Batch(BatchArgs),

    /// 打印误差表及其统计信息.
    Table,
}

/// 覆盖配置文件的外部程序参数.
#[derive(Debug, Args)]
pub struct SolverArgs {
    /// 外部程序路径.
    #[arg(long)]
    pub solver: Option<PathBuf>,

    /// 工作目录.
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// 超时时间 (秒), 0 表示不限时.
    #[arg(long)]
    pub timeout: Option<f64>,

    /// 压缩落盘图像.
    #[arg(long)]
    pub compress: bool,

    /// 仅做 RAS <-> LPS 轴取反.
    #[arg(long)]
    pub axis_flip: bool,
}

/// `segment` 的参数.
#[derive(Debug, Args)]
pub struct SegmentArgs {
    /// nii 体数据.
    pub volume: PathBuf,

    /// 种子点 `x,y,z`.
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub seed: Point3,

    /// 手工标注的针尖 `x,y,z`.
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub manual: Option<Point3>,

    /// 期望插入角 (度).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub angle: f64,

    /// 场景变换 JSON 文件, 内容为按行排列的 16 个数.
    #[arg(long)]
    pub transform: Option<PathBuf>,

    #[command(flatten)]
    pub solver: SolverArgs,
}

/// `metrics` 的参数.
#[derive(Debug, Args)]
pub struct MetricsArgs {
    /// 针尖 `x,y,z`.
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub tip: Point3,

    /// 针尾 `x,y,z`.
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub tail: Point3,

    /// 手工标注的针尖 `x,y,z`.
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub manual: Point3,

    /// 期望插入角 (度).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub angle: f64,
}

/// `batch` 的参数.
#[derive(Debug, Args)]
pub struct BatchArgs {
    /// 任务列表 JSON 文件.
    pub cases: PathBuf,

    /// 依次运行而不是并发运行.
    #[arg(long)]
    pub sequential: bool,

    #[command(flatten)]
    pub solver: SolverArgs,
}

/// 解析 `x,y,z`.
pub fn parse_point(s: &str) -> Result<Point3, String> {
    let v = s
        .split(',')
        .map(|t| t.trim().parse::<f64>().map_err(|e| format!("`{t}`: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match v.as_slice() {
        &[x, y, z] => Ok(Point3::new(x, y, z)),
        _ => Err(format!("expected `x,y,z`, got {} values", v.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(
            parse_point("1, -2.5,3e1").unwrap(),
            Point3::new(1.0, -2.5, 30.0)
        );
        assert!(parse_point("1,2").is_err());
        assert!(parse_point("1,2,x").is_err());
    }

    #[test]
    fn test_parse_segment() {
        let cli = Cli::try_parse_from([
            "static-needle",
            "-vv",
            "segment",
            "ct.nii.gz",
            "--seed",
            "-10,20,30",
            "--manual",
            "-11,20,30",
            "--angle",
            "45",
            "--timeout",
            "0",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Segment(a) => {
                assert_eq!(a.seed, Point3::new(-10.0, 20.0, 30.0));
                assert_eq!(a.manual, Some(Point3::new(-11.0, 20.0, 30.0)));
                assert_eq!(a.angle, 45.0);
                assert_eq!(a.solver.timeout, Some(0.0));
                assert!(!a.solver.axis_flip);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
