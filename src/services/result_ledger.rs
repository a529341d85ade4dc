//! 结果台账 - 业务能力层
//!
//! 只追加：每个申请人每次运行只会有一条终态记录。

use std::collections::BTreeMap;

use crate::models::{OutcomeKind, ResultRecord, Worker};

/// 结果台账
#[derive(Debug, Clone, Default)]
pub struct ResultLedger {
    records: Vec<ResultRecord>,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    /// 不可变副本，交给展示层
    pub fn snapshot(&self) -> Vec<ResultRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 最新记录不是 Accepted 的申请人，按首次出现顺序
    pub fn failed_workers(&self) -> Vec<Worker> {
        let mut failed: Vec<Worker> = Vec::new();
        for record in &self.records {
            let latest = self
                .records
                .iter()
                .rev()
                .find(|r| r.identifier == record.identifier && r.worker_name == record.worker_name);

            let is_failed = latest.map_or(false, |r| !r.outcome.is_accepted());
            let already_listed = failed
                .iter()
                .any(|w| w.same_person(&record.identifier, &record.worker_name));

            if is_failed && !already_listed {
                failed.push(record.worker());
            }
        }
        failed
    }

    /// 按结果类别计数
    pub fn counts(&self) -> BTreeMap<OutcomeKind, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.outcome).or_insert(0) += 1;
        }
        counts
    }

    /// 成功申报的天数合计
    pub fn accepted_days(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| r.outcome.is_accepted())
            .map(|r| u64::from(r.days_assigned))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(worker: &Worker, outcome: OutcomeKind) -> ResultRecord {
        ResultRecord::new(worker, worker.identifier.clone(), 2, outcome, "")
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let worker = Worker::new("A", "JH-01-004/1");
        let mut ledger = ResultLedger::new();
        ledger.append(record(&worker, OutcomeKind::Accepted));

        let snapshot = ledger.snapshot();
        ledger.append(record(&worker, OutcomeKind::Unknown));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_failed_workers_uses_latest_record() {
        let a = Worker::new("A", "JH-01-004/1");
        let b = Worker::new("B", "JH-01-004/1");
        let c = Worker::new("C", "JH-01-005/3");

        let mut ledger = ResultLedger::new();
        ledger.append(record(&a, OutcomeKind::QuotaExceeded));
        ledger.append(record(&b, OutcomeKind::Accepted));
        ledger.append(record(&c, OutcomeKind::Skipped));
        ledger.append(record(&a, OutcomeKind::Accepted));

        let failed = ledger.failed_workers();

        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "C");
        assert!(failed[0].selected);
    }

    #[test]
    fn test_counts_and_days() {
        let a = Worker::new("A", "JH-01-004/1");
        let b = Worker::new("B", "JH-01-004/1");

        let mut ledger = ResultLedger::new();
        ledger.append(record(&a, OutcomeKind::Accepted));
        ledger.append(record(&b, OutcomeKind::DuplicateRequest));

        assert_eq!(ledger.counts()[&OutcomeKind::Accepted], 1);
        assert_eq!(ledger.counts()[&OutcomeKind::DuplicateRequest], 1);
        assert_eq!(ledger.accepted_days(), 2);
    }
}
