//! 仅可追加的误差表.

use super::MetricsRow;
use crate::consts::metrics::{METRICS_COLUMNS, METRICS_TABLE_NAME};
use ordered_float::NotNan;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 带列名的误差表. 行一旦追加就不再修改或删除.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<MetricsRow>,
}

impl Default for MetricsTable {
    fn default() -> Self {
        Self::new(METRICS_TABLE_NAME)
    }
}

impl MetricsTable {
    /// 创建带五个标准列的空表.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: METRICS_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: vec![],
        }
    }

    /// 表名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 列名.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 所有行.
    #[inline]
    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 追加一行.
    #[inline]
    pub fn append(&mut self, row: MetricsRow) {
        self.rows.push(row);
    }

    /// 每一列的统计信息, 顺序与列名一致. 空表返回 `None`.
    ///
    /// 含有 NaN 的列不参与最大值统计, 此时 `max` 为 `None`.
    pub fn summary(&self) -> Option<Vec<ColumnSummary>> {
        if self.rows.is_empty() {
            return None;
        }
        let n = self.rows.len() as f64;
        let ans = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let values = self.rows.iter().map(|r| r.values()[c]);
                let mean = values.clone().sum::<f64>() / n;
                let max = values
                    .map(NotNan::new)
                    .collect::<Result<Vec<_>, _>>()
                    .ok()
                    .and_then(|v| v.into_iter().max())
                    .map(NotNan::into_inner);
                ColumnSummary {
                    column: name.clone(),
                    mean,
                    max,
                }
            })
            .collect();
        Some(ans)
    }
}

/// 单列统计信息.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColumnSummary {
    /// 列名.
    pub column: String,

    /// 平均值.
    pub mean: f64,

    /// 最大值.
    pub max: Option<f64>,
}

impl fmt::Display for MetricsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const S4: &str = "    ";
        writeln!(f, "Table `{}` ({} rows):", self.name, self.rows.len())?;
        for (i, row) in self.rows.iter().enumerate() {
            writeln!(f, "{S4}#{i}")?;
            for (name, v) in self.columns.iter().zip(row.values()) {
                writeln!(f, "{S4}{S4}{name}: {v:.6}")?;
            }
        }
        Ok(())
    }
}
