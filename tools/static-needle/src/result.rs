//! 运行结果的输出, 以及误差表文件的读写.

use needle_seg::geometry::Point3;
use needle_seg::metrics::ColumnSummary;
use needle_seg::{CaseReport, MetricsRow, MetricsStore, MetricsTable, RunOutcome};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[inline]
fn xyz(p: &Point3) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// 一次分割的结果.
#[derive(Debug, Serialize)]
pub struct SegmentReport {
    /// 传给外部程序的种子点文本.
    pub seed_text: String,

    /// 落盘图像路径.
    pub image_path: PathBuf,

    /// 宿主坐标系下的针尖.
    pub tip: [f64; 3],

    /// 宿主坐标系下的针尾.
    pub tail: [f64; 3],

    /// 有人工标注时的误差行.
    pub metrics: Option<MetricsRow>,
}

impl From<&RunOutcome> for SegmentReport {
    fn from(o: &RunOutcome) -> Self {
        Self {
            seed_text: o.seed_text.clone(),
            image_path: o.image_path.clone(),
            tip: xyz(&o.result.tip),
            tail: xyz(&o.result.tail),
            metrics: o.metrics,
        }
    }
}

/// 批量任务中的一项.
#[derive(Debug, Serialize)]
pub struct CaseEntry {
    /// 在任务文件中的序号.
    pub index: usize,

    /// 任务名.
    pub label: String,

    /// 成功时的结果.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SegmentReport>,

    /// 失败时的错误类别与信息.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&CaseReport> for CaseEntry {
    fn from(r: &CaseReport) -> Self {
        let (result, error) = match &r.outcome {
            Ok(o) => (Some(o.into()), None),
            Err(e) => (None, Some(format!("{:?}: {e}", e.kind()))),
        };
        Self {
            index: r.index,
            label: r.label.clone(),
            result,
            error,
        }
    }
}

/// 批量任务的结果.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    /// 成功的任务数.
    pub succeeded: usize,

    /// 失败的任务数.
    pub failed: usize,

    /// 各任务, 按任务文件中的顺序.
    pub cases: Vec<CaseEntry>,

    /// 误差表各列的统计. 表尚未创建时为 `None`.
    pub summary: Option<Vec<ColumnSummary>>,
}

impl BatchReport {
    /// 汇总批量任务的结果与误差表统计.
    pub fn new(reports: &[CaseReport], store: &MetricsStore) -> Self {
        let cases: Vec<CaseEntry> = reports.iter().map(CaseEntry::from).collect();
        let failed = cases.iter().filter(|c| c.error.is_some()).count();
        Self {
            succeeded: cases.len() - failed,
            failed,
            cases,
            summary: store.snapshot().and_then(|t| t.summary()),
        }
    }
}

/// 以缩进 JSON 形式输出.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, Box<dyn Error>> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// 读取误差表文件. 文件不存在时返回尚未创建表的 store.
pub fn load_store(path: Option<&Path>) -> Result<MetricsStore, Box<dyn Error>> {
    match path {
        Some(p) if p.is_file() => {
            let table: MetricsTable = serde_json::from_str(&fs::read_to_string(p)?)?;
            log::info!("loaded {} metrics rows from {}", table.len(), p.display());
            Ok(MetricsStore::from_table(table))
        }
        _ => Ok(MetricsStore::default()),
    }
}

/// 把误差表写回文件. 表尚未创建时不写.
pub fn save_store(path: Option<&Path>, store: &MetricsStore) -> Result<(), Box<dyn Error>> {
    if let (Some(p), Some(table)) = (path, store.snapshot()) {
        if let Some(dir) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(p, serde_json::to_string_pretty(&table)?)?;
        log::info!("saved {} metrics rows to {}", table.len(), p.display());
    }
    Ok(())
}

/// 将误差表及统计信息写进 `w` 中.
pub fn describe_table_into<W: Write>(table: &MetricsTable, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    write!(w, "{table}")?;
    utils::sep_to(&mut *w)?;
    writeln!(w, "Summary:")?;
    for s in table.summary().unwrap_or_default() {
        writeln!(
            w,
            "{S4}{}: mean {}, max {}",
            s.column,
            f64_to_display(Some(s.mean)),
            f64_to_display(s.max)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(v: f64) -> MetricsRow {
        MetricsRow {
            tip_distance: v,
            active_tip_distance: v,
            trajectory_angle_error: v,
            segmented_insertion_angle: v,
            insertion_angle_error: v,
        }
    }

    #[test]
    fn test_store_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metrics.json");

        let store = load_store(Some(&path)).unwrap();
        assert!(!store.is_created());
        // 表未创建时不产生文件.
        save_store(Some(&path), &store).unwrap();
        assert!(!path.exists());

        store.record(row(1.0));
        save_store(Some(&path), &store).unwrap();

        let store = load_store(Some(&path)).unwrap();
        assert_eq!(store.len(), 1);
        store.record(row(3.0));
        save_store(Some(&path), &store).unwrap();

        let store = load_store(Some(&path)).unwrap();
        assert_eq!(store.snapshot().unwrap().rows(), &[row(1.0), row(3.0)]);
    }

    #[test]
    fn test_describe_table() {
        let mut t = MetricsTable::default();
        t.append(row(1.0));
        t.append(row(2.0));
        let mut buf = vec![];
        describe_table_into(&t, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Table `Metrics` (2 rows)"));
        assert!(text.contains("Tip Difference (mm): mean 1.500000, max 2.000000"));
    }
}
