//! 运行结果上报
//!
//! 运行任务独占台账；展示层只能通过单向事件流拿到记录副本和状态文本。
//! 发送端使用无界通道，运行任务永远不会等待展示层。

use std::collections::BTreeMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

use crate::models::{OutcomeKind, ResultRecord};
use crate::services::ResultLedger;
use crate::utils::truncate_text;

/// 运行任务发给展示层的事件
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// 状态行
    Status(String),
    /// 新的终态记录
    Record(ResultRecord),
    /// 运行级致命错误
    Critical(String),
    /// 运行结束
    Finished(RunSummary),
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub counts: BTreeMap<OutcomeKind, usize>,
    pub total_records: usize,
    pub accepted_days: u64,
    pub cancelled: bool,
    pub halted: bool,
}

impl RunSummary {
    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn accepted(&self) -> usize {
        self.count(OutcomeKind::Accepted)
    }

    pub fn failed(&self) -> usize {
        self.total_records - self.accepted()
    }
}

/// 运行结果上报器
pub struct RunReporter {
    ledger: ResultLedger,
    events: Option<UnboundedSender<RunEvent>>,
}

impl RunReporter {
    pub fn new(events: Option<UnboundedSender<RunEvent>>) -> Self {
        Self {
            ledger: ResultLedger::new(),
            events,
        }
    }

    /// 写入一条终态记录
    pub fn record(&mut self, record: ResultRecord) {
        if record.outcome.is_accepted() {
            info!(
                "  ✓ {} | {} 天 | {}",
                record.worker_name, record.days_assigned, record.detail
            );
        } else {
            warn!(
                "  ✗ {} | {} | {}",
                record.worker_name,
                record.outcome,
                truncate_text(&record.detail, 80)
            );
        }

        self.ledger.append(record.clone());
        self.emit(RunEvent::Record(record));
    }

    /// 更新状态行
    pub fn status(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.emit(RunEvent::Status(message));
    }

    /// 上报运行级致命错误
    pub fn critical(&self, message: impl Into<String>) {
        let message = message.into();
        error!("❌ {}", message);
        self.emit(RunEvent::Critical(message));
    }

    /// 上报运行结束
    pub fn finish(&self, cancelled: bool, halted: bool) -> RunSummary {
        let summary = RunSummary {
            counts: self.ledger.counts(),
            total_records: self.ledger.len(),
            accepted_days: self.ledger.accepted_days(),
            cancelled,
            halted,
        };
        self.emit(RunEvent::Finished(summary.clone()));
        summary
    }

    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> ResultLedger {
        self.ledger
    }

    // 接收端已关闭时静默丢弃
    fn emit(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
