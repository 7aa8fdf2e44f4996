//! 程序运行函数.

use crate::cli::{BatchArgs, Cli, Command, MetricsArgs, SegmentArgs, SolverArgs};
use crate::result::{self, BatchReport, SegmentReport};
use needle_seg::geometry::{AffineTransform, Point3};
use needle_seg::{
    BatchCase, CaseVolume, ConversionVariant, ManualReference, MetricsStore,
    NeedleSegmentationLogic, PointList, SegmentationConfig, Volume,
};
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use utils::loader;

/// 按 "默认值 < 环境变量 < 配置文件 < 命令行" 的顺序得到配置.
pub fn resolve_config(
    config_file: Option<&Path>,
    overrides: &SolverArgs,
) -> Result<SegmentationConfig, Box<dyn Error>> {
    let mut base = SegmentationConfig::default();
    base.solver.executable = loader::solver_from_env_or_home();
    base.work_dir = loader::work_dir_from_env_or_default();

    let mut config = match config_file {
        Some(p) => {
            let mut v = serde_json::to_value(&base)?;
            merge_json(&mut v, serde_json::from_str(&fs::read_to_string(p)?)?);
            serde_json::from_value(v)?
        }
        None => base,
    };

    if let Some(s) = &overrides.solver {
        config.solver.executable = s.clone();
    }
    if let Some(d) = &overrides.work_dir {
        config.work_dir = d.clone();
    }
    if let Some(t) = overrides.timeout {
        config.solver.timeout_secs = Some(t);
    }
    if overrides.compress {
        config.compress_image = true;
    }
    if overrides.axis_flip {
        config.conversion = ConversionVariant::AxisFlip;
    }
    Ok(config)
}

/// 把 `patch` 中的字段递归地合并进 `base`.
fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(b), Value::Object(p)) => {
            for (k, v) in p {
                merge_json(b.entry(k).or_insert(Value::Null), v);
            }
        }
        (b, p) => *b = p,
    }
}

/// 读取场景变换文件: 按行排列的 16 个数.
fn load_transform(path: &Path) -> Result<AffineTransform, Box<dyn Error>> {
    let m: Vec<f64> = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(AffineTransform::from_row_slice(&m)?)
}

/// 批量任务文件中的一项. 相对路径相对于任务文件所在目录.
#[derive(Debug, Deserialize)]
struct CaseFileEntry {
    label: Option<String>,
    volume: PathBuf,
    seed: [f64; 3],
    manual_tip: Option<[f64; 3]>,
    #[serde(default)]
    expected_insertion_angle: f64,
    transform: Option<Vec<f64>>,
}

#[inline]
fn point(v: [f64; 3]) -> Point3 {
    Point3::new(v[0], v[1], v[2])
}

fn load_cases(path: &Path) -> Result<Vec<BatchCase>, Box<dyn Error>> {
    let entries: Vec<CaseFileEntry> = serde_json::from_str(&fs::read_to_string(path)?)?;
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    entries
        .into_iter()
        .enumerate()
        .map(|(i, s)| -> Result<BatchCase, Box<dyn Error>> {
            let transform = match s.transform {
                Some(m) => Some(AffineTransform::from_row_slice(&m)?),
                None => None,
            };
            Ok(BatchCase {
                label: s.label.unwrap_or_else(|| format!("case-{i}")),
                volume: CaseVolume::File(root.join(s.volume)),
                transform,
                seed: point(s.seed),
                manual_tip: s.manual_tip.map(point),
                expected_insertion_angle: s.expected_insertion_angle,
            })
        })
        .collect()
}

fn segment(cli: &Cli, args: &SegmentArgs, store: &MetricsStore) -> Result<String, Box<dyn Error>> {
    let config = resolve_config(cli.config.as_deref(), &args.solver)?;
    let mut volume = Volume::open(&args.volume)?;
    if let Some(p) = &args.transform {
        volume = volume.with_transform(load_transform(p)?);
    }

    let seeds = PointList::from_points("F", [args.seed]);
    let manual = args.manual.map(|m| PointList::from_points("Manual", [m]));
    let mut output = PointList::new("Needle");

    let logic = NeedleSegmentationLogic::new(config);
    let outcome = logic.run(
        &volume,
        &seeds,
        &mut output,
        manual.as_ref().map(|m| ManualReference {
            points: m,
            expected_insertion_angle: args.angle,
        }),
        store,
    )?;
    result::to_json(&SegmentReport::from(&outcome))
}

fn metrics(args: &MetricsArgs, store: &MetricsStore) -> Result<String, Box<dyn Error>> {
    let row = store.compute_and_record(&args.tip, &args.tail, &args.manual, args.angle)?;
    result::to_json(&row)
}

fn batch(cli: &Cli, args: &BatchArgs, store: &MetricsStore) -> Result<String, Box<dyn Error>> {
    let config = resolve_config(cli.config.as_deref(), &args.solver)?;
    let cases = load_cases(&args.cases)?;
    let logic = NeedleSegmentationLogic::new(config);

    let reports = if args.sequential {
        logic.run_batch(&cases, store)
    } else {
        log::info!("running {} cases on {} cpus", cases.len(), utils::cpus());
        logic.par_run_batch(&cases, store)
    };
    result::to_json(&BatchReport::new(&reports, store))
}

fn table(store: &MetricsStore) -> Result<String, Box<dyn Error>> {
    let t = store.snapshot().unwrap_or_default();
    let mut buf = Vec::with_capacity(512);
    result::describe_table_into(&t, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// 实际运行, 返回要输出的文本.
pub fn run(cli: &Cli) -> Result<String, Box<dyn Error>> {
    let table_path = cli.table.clone().or_else(loader::metrics_file_from_env);
    let store = result::load_store(table_path.as_deref())?;

    let out = match &cli.command {
        Command::Segment(a) => segment(cli, a, &store),
        Command::Metrics(a) => metrics(a, &store),
        Command::Batch(a) => batch(cli, a, &store),
        Command::Table => table(&store),
    };

    // 批量任务中部分失败时, 成功的行也要保存.
    result::save_store(table_path.as_deref(), &store)?;
    out
}
