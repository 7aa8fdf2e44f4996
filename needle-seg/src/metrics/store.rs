//! 会话内共享的误差表句柄.

use super::{compute_metrics, MetricsRow, MetricsTable};
use crate::consts::metrics::METRICS_TABLE_NAME;
use crate::geometry::Point3;
use crate::NeedleResult;
use once_cell::sync::OnceCell;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 误差表的持有者.
///
/// 表在第一次写入时才被创建; 所有访问经过同一把锁,
/// 因此多个并发调用可以安全地追加行. 追加是唯一的修改操作.
#[derive(Debug)]
pub struct MetricsStore {
    name: String,
    table: OnceCell<Mutex<MetricsTable>>,
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new(METRICS_TABLE_NAME)
    }
}

impl MetricsStore {
    /// 以表名 `name` 创建. 此时表尚不存在.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: OnceCell::new(),
        }
    }

    /// 以已有的表 (例如从上一次会话恢复的表) 创建.
    pub fn from_table(table: MetricsTable) -> Self {
        Self {
            name: table.name().to_string(),
            table: OnceCell::with_value(Mutex::new(table)),
        }
    }

    /// 表名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 表是否已被创建.
    #[inline]
    pub fn is_created(&self) -> bool {
        self.table.get().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsTable> {
        self.table
            .get_or_init(|| {
                log::debug!("creating metrics table `{}`", self.name);
                Mutex::new(MetricsTable::new(self.name.as_str()))
            })
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 追加一行, 返回追加后的行数.
    pub fn record(&self, row: MetricsRow) -> usize {
        let mut t = self.lock();
        t.append(row);
        log::info!("metrics row #{} recorded in `{}`: {row:?}", t.len(), self.name);
        t.len()
    }

    /// 计算误差并追加到表中. 计算失败时表保持不变.
    pub fn compute_and_record(
        &self,
        tip: &Point3,
        tail: &Point3,
        manual_tip: &Point3,
        expected_insertion_angle: f64,
    ) -> NeedleResult<MetricsRow> {
        let row = compute_metrics(tip, tail, manual_tip, expected_insertion_angle)?;
        self.record(row);
        Ok(row)
    }

    /// 当前表的副本. 表尚未创建时返回 `None`.
    pub fn snapshot(&self) -> Option<MetricsTable> {
        self.table
            .get()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// 行数. 表尚未创建时为 0.
    pub fn len(&self) -> usize {
        self.table
            .get()
            .map_or(0, |m| m.lock().unwrap_or_else(PoisonError::into_inner).len())
    }

    /// 是否没有任何行.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
