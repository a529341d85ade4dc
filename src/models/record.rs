use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::{OutcomeKind, Worker};

/// 单个申请人单次运行的最终结果
///
/// 只追加、不修改；导出列顺序即字段顺序。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub group_key: String,
    pub worker_name: String,
    pub days_assigned: u32,
    pub outcome: OutcomeKind,
    pub detail: String,
    pub timestamp: DateTime<Local>,
    /// 原始卡号，用于"重试失败项"时找回申请人
    #[serde(skip)]
    pub identifier: String,
}

impl ResultRecord {
    pub fn new(
        worker: &Worker,
        group_key: impl Into<String>,
        days_assigned: u32,
        outcome: OutcomeKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            group_key: group_key.into(),
            worker_name: worker.name.clone(),
            days_assigned,
            outcome,
            detail: detail.into(),
            timestamp: Local::now(),
            identifier: worker.identifier.clone(),
        }
    }

    /// 找回记录对应的申请人（选中状态）
    pub fn worker(&self) -> Worker {
        Worker::new(self.worker_name.clone(), self.identifier.clone())
    }
}
