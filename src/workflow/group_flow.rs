//! 分组申报流程 - 流程层
//!
//! 核心职责：定义"一个分组"的完整申报流程
//!
//! 状态顺序：
//! 1. ReadBudget → Allocate → Fill → Submit → Classify
//! 2. Classify 之后：成功 / 超额重算（仅一次）/ 失败
//! 3. 驱动层临时故障：恢复上下文后从 Allocate 重来（仅一次）
//!
//! 每个进入流程的申请人离开时恰好有一条终态记录。

use chrono::NaiveDate;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DemandSettings;
use crate::infrastructure::{DriverError, DriverResult, FormDriver};
use crate::models::{DateRange, Outcome, OutcomeKind, ResultRecord, Worker};
use crate::services::{allocate, names_match, Group, OutcomeClassifier};
use crate::workflow::cancel::CancelFlag;
use crate::workflow::group_ctx::GroupCtx;
use crate::workflow::run_reporter::RunReporter;

/// 给单次驱动调用加上超时
pub async fn bounded_call<T, F>(timeout: Duration, operation: &str, call: F) -> DriverResult<T>
where
    F: Future<Output = DriverResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::timeout(operation)),
    }
}

/// 单个申请人本次尝试分到的天数
#[derive(Debug, Clone)]
struct Assignment {
    worker: Worker,
    days: u32,
}

/// 流程状态
#[derive(Debug)]
enum Stage {
    ReadBudget,
    Allocate { available: i64 },
    Fill { available: i64, plan: Vec<Assignment> },
    Submit { available: i64, plan: Vec<Assignment> },
    Classify { available: i64, plan: Vec<Assignment>, response: Option<String> },
    Recover { available: Option<i64>, cause: String },
    Next,
}

/// 单个分组的可变状态
struct GroupState<'a> {
    ctx: &'a GroupCtx,
    /// 尚未得到终态记录的申请人
    active: Vec<Worker>,
    quota_retry_used: bool,
    recovery_used: bool,
}

impl GroupState<'_> {
    fn finish(
        &mut self,
        reporter: &mut RunReporter,
        worker: &Worker,
        days: u32,
        kind: OutcomeKind,
        detail: impl Into<String>,
    ) {
        if let Some(pos) = self
            .active
            .iter()
            .position(|w| w.same_person(&worker.identifier, &worker.name))
        {
            self.active.remove(pos);
            reporter.record(ResultRecord::new(
                worker,
                self.ctx.group_key.clone(),
                days,
                kind,
                detail,
            ));
        }
    }

    /// 剩余所有申请人记同一结果
    fn finish_all(
        &mut self,
        reporter: &mut RunReporter,
        days_of: impl Fn(&Worker) -> u32,
        kind: OutcomeKind,
        detail: &str,
    ) {
        for worker in std::mem::take(&mut self.active) {
            reporter.record(ResultRecord::new(
                &worker,
                self.ctx.group_key.clone(),
                days_of(&worker),
                kind,
                detail,
            ));
        }
    }
}

/// 分组申报流程
///
/// - 决定何时读额度、何时分配、何时重试
/// - 不持有任何资源（page），驱动由调用方传入
/// - 所有重试都有上限：超额重算一次，上下文恢复一次
pub struct GroupFlow {
    day_cap: u32,
    requested_days: u32,
    demand_date: NaiveDate,
    call_timeout: Duration,
    classifier: OutcomeClassifier,
}

impl GroupFlow {
    /// 创建新的分组流程
    pub fn new(settings: &DemandSettings, call_timeout: Duration) -> Result<Self, regex::Error> {
        Ok(Self {
            day_cap: settings.day_cap_per_group,
            requested_days: settings.requested_days_per_worker,
            demand_date: settings.demand_date(),
            call_timeout,
            classifier: OutcomeClassifier::new()?,
        })
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// 处理一个分组
    ///
    /// 调用前驱动已经切换到该分组所在的子单元和分组。
    /// 切换分组时已经恢复过上下文的，`recovery_used` 传 `true`，本组不再恢复。
    pub async fn run(
        &self,
        driver: &mut dyn FormDriver,
        group: &Group,
        ctx: &GroupCtx,
        reporter: &mut RunReporter,
        cancel: &CancelFlag,
        recovery_used: bool,
    ) {
        let mut state = GroupState {
            ctx,
            active: group.workers.clone(),
            quota_retry_used: false,
            recovery_used,
        };

        let mut stage = Stage::ReadBudget;
        loop {
            debug!("{} 状态: {:?}", ctx, stage);
            stage = match stage {
                Stage::ReadBudget => self.read_budget(driver, &mut state, reporter, cancel).await,
                Stage::Allocate { available } => self.allocate(available, &mut state, reporter),
                Stage::Fill { available, plan } => {
                    self.fill(driver, available, plan, &mut state, reporter).await
                }
                Stage::Submit { available, plan } => {
                    self.submit(driver, available, plan, &mut state, reporter).await
                }
                Stage::Classify {
                    available,
                    plan,
                    response,
                } => self.classify(available, plan, response, &mut state, reporter),
                Stage::Recover { available, cause } => {
                    self.recover(driver, available, &cause, &mut state, reporter).await
                }
                Stage::Next => break,
            };
        }

        debug_assert!(state.active.is_empty());
    }

    // ========== 各状态处理 ==========

    async fn read_budget(
        &self,
        driver: &mut dyn FormDriver,
        state: &mut GroupState<'_>,
        reporter: &mut RunReporter,
        cancel: &CancelFlag,
    ) -> Stage {
        if cancel.is_cancelled() {
            state.finish_all(reporter, |_| 0, OutcomeKind::Skipped, "运行已取消");
            return Stage::Next;
        }

        reporter.status(format!("{} 📊 读取已用天数...", state.ctx));
        let group_key = state.ctx.group_key.clone();
        let read = bounded_call(
            self.call_timeout,
            "读取已用天数",
            driver.read_consumed_days(&group_key),
        )
        .await;

        match read {
            Ok(consumed) => {
                let available = i64::from(self.day_cap) - i64::from(consumed.days());
                debug!(
                    "{} 已用 {} 天，剩余额度 {} 天",
                    state.ctx,
                    consumed.days(),
                    available
                );
                Stage::Allocate { available }
            }
            Err(DriverError::NotFound { what }) => {
                state.finish_all(
                    reporter,
                    |_| 0,
                    OutcomeKind::NotFound,
                    &format!("远程系统中没有该分组的数据: {}", what),
                );
                Stage::Next
            }
            Err(e) if e.is_transient() => self.transient(None, e.to_string(), state, reporter),
            Err(e) => {
                warn!(
                    "{} ⚠️ 已用天数读取失败 ({})，按额度未知处理，依赖超额重算兜底",
                    state.ctx, e
                );
                Stage::Allocate {
                    available: i64::from(self.day_cap),
                }
            }
        }
    }

    fn allocate(
        &self,
        available: i64,
        state: &mut GroupState<'_>,
        reporter: &mut RunReporter,
    ) -> Stage {
        if available <= 0 {
            state.finish_all(reporter, |_| 0, OutcomeKind::Skipped, "ceiling reached");
            return Stage::Next;
        }

        let allocation = allocate(self.requested_days, state.active.len(), available);
        if allocation.adjusted {
            warn!(
                "{} ⚠️ 剩余额度 {} 天不足，每人申请天数已调整为 {:?} (合计 {} 天)",
                state.ctx,
                available,
                allocation.days,
                allocation.total()
            );
        }

        let mut plan = Vec::new();
        for (worker, days) in state.active.clone().into_iter().zip(allocation.days) {
            if days == 0 {
                state.finish(reporter, &worker, 0, OutcomeKind::Accepted, "无需提交 (额度已分完)");
            } else {
                plan.push(Assignment { worker, days });
            }
        }

        if plan.is_empty() {
            Stage::Next
        } else {
            Stage::Fill { available, plan }
        }
    }

    async fn fill(
        &self,
        driver: &mut dyn FormDriver,
        available: i64,
        plan: Vec<Assignment>,
        state: &mut GroupState<'_>,
        reporter: &mut RunReporter,
    ) -> Stage {
        let mut filled = Vec::new();
        let mut failed: Vec<(Assignment, DriverError)> = Vec::new();

        for assignment in plan {
            reporter.status(format!(
                "{} ✏️ 填写 {} ({} 天)",
                state.ctx, assignment.worker.name, assignment.days
            ));
            let range = DateRange::for_days(self.demand_date, assignment.days);
            let result = bounded_call(
                self.call_timeout,
                "填写申请人",
                driver.fill_worker_fields(&assignment.worker.name, assignment.days, &range),
            )
            .await;

            match result {
                Ok(()) => filled.push(assignment),
                Err(DriverError::NotFound { .. }) => {
                    state.finish(
                        reporter,
                        &assignment.worker,
                        0,
                        OutcomeKind::NotFound,
                        "页面中未找到该申请人",
                    );
                }
                Err(e) => {
                    warn!("{} ⚠️ 填写 {} 失败: {}", state.ctx, assignment.worker.name, e);
                    failed.push((assignment, e));
                }
            }
        }

        if !failed.is_empty() {
            if !state.recovery_used {
                return Stage::Recover {
                    available: Some(available),
                    cause: failed[0].1.to_string(),
                };
            }
            for (assignment, e) in failed {
                state.finish(
                    reporter,
                    &assignment.worker,
                    assignment.days,
                    OutcomeKind::Transient,
                    format!("填写失败: {}", e),
                );
            }
        }

        if filled.is_empty() {
            Stage::Next
        } else {
            Stage::Submit {
                available,
                plan: filled,
            }
        }
    }

    async fn submit(
        &self,
        driver: &mut dyn FormDriver,
        available: i64,
        plan: Vec<Assignment>,
        state: &mut GroupState<'_>,
        reporter: &mut RunReporter,
    ) -> Stage {
        reporter.status(format!("{} 📤 提交 {} 名申请人...", state.ctx, plan.len()));

        match bounded_call(self.call_timeout, "提交", driver.submit()).await {
            Ok(response) => Stage::Classify {
                available,
                plan,
                response,
            },
            Err(e) => self.transient_with_plan(Some(available), e.to_string(), &plan, state, reporter),
        }
    }

    fn classify(
        &self,
        available: i64,
        plan: Vec<Assignment>,
        response: Option<String>,
        state: &mut GroupState<'_>,
        reporter: &mut RunReporter,
    ) -> Stage {
        let outcome = self.classifier.classify(response.as_deref());
        let raw = response.unwrap_or_default();
        let raw = raw.trim();
        let days_of = |worker: &Worker| days_in(&plan, worker);

        match outcome {
            Outcome::Accepted => {
                state.finish_all(reporter, days_of, OutcomeKind::Accepted, raw);
                Stage::Next
            }
            Outcome::QuotaExceeded { actual_consumed }
                if actual_consumed >= 0 && !state.quota_retry_used =>
            {
                state.quota_retry_used = true;
                let reconciled = i64::from(self.day_cap) - actual_consumed;
                warn!(
                    "{} ⚠️ 服务端报告已用 {} 天 (此前按剩余 {} 天分配)，重新计算剩余额度 {} 天",
                    state.ctx, actual_consumed, available, reconciled
                );
                if reconciled <= 0 {
                    state.finish_all(reporter, |_| 0, OutcomeKind::Skipped, "ceiling reached");
                    Stage::Next
                } else {
                    Stage::Allocate {
                        available: reconciled,
                    }
                }
            }
            Outcome::QuotaExceeded { actual_consumed } => {
                let detail = if actual_consumed < 0 {
                    format!("已用天数无法解析: {}", raw)
                } else {
                    format!("重算后再次超额: {}", raw)
                };
                state.finish_all(reporter, days_of, OutcomeKind::QuotaExceeded, &detail);
                Stage::Next
            }
            Outcome::DuplicateRequest { worker_name } => {
                let named: Vec<Worker> = state
                    .active
                    .iter()
                    .filter(|w| names_match(&worker_name, &w.name))
                    .cloned()
                    .collect();

                if named.is_empty() {
                    state.finish_all(reporter, days_of, OutcomeKind::DuplicateRequest, raw);
                } else {
                    for worker in &named {
                        state.finish(
                            reporter,
                            worker,
                            days_of(worker),
                            OutcomeKind::DuplicateRequest,
                            raw,
                        );
                    }
                    state.finish_all(reporter, days_of, OutcomeKind::Accepted, "批量提交成功");
                }
                Stage::Next
            }
            Outcome::Transient { cause } => {
                self.transient_with_plan(Some(available), cause, &plan, state, reporter)
            }
            other => {
                let kind = other.kind();
                state.finish_all(reporter, days_of, kind, &other.to_string());
                Stage::Next
            }
        }
    }

    /// 上下文恢复：重新打开入口页面，依次切回子单元和分组
    async fn recover(
        &self,
        driver: &mut dyn FormDriver,
        available: Option<i64>,
        cause: &str,
        state: &mut GroupState<'_>,
        reporter: &mut RunReporter,
    ) -> Stage {
        state.recovery_used = true;
        reporter.status(format!("{} 🔄 页面异常 ({})，恢复上下文后重试...", state.ctx, cause));

        let sub_unit_key = state.ctx.sub_unit_key.clone();
        let group_label = state.ctx.group_label.clone();

        let restored = async {
            bounded_call(self.call_timeout, "打开入口页面", driver.open_entry()).await?;
            bounded_call(
                self.call_timeout,
                "选择子单元",
                driver.select_sub_unit(&sub_unit_key),
            )
            .await?;
            bounded_call(self.call_timeout, "选择分组", driver.select_group(&group_label)).await
        }
        .await;

        match (restored, available) {
            (Ok(()), Some(available)) => Stage::Allocate { available },
            (Ok(()), None) => Stage::ReadBudget,
            (Err(e), _) => {
                state.finish_all(
                    reporter,
                    |_| 0,
                    OutcomeKind::Transient,
                    &format!("上下文恢复失败: {} (原因: {})", e, cause),
                );
                Stage::Next
            }
        }
    }

    // ========== 辅助方法 ==========

    /// 临时故障：还有恢复机会就去恢复，否则整组记为 Transient
    fn transient(
        &self,
        available: Option<i64>,
        cause: String,
        state: &mut GroupState<'_>,
        reporter: &mut RunReporter,
    ) -> Stage {
        if state.recovery_used {
            state.finish_all(
                reporter,
                |_| 0,
                OutcomeKind::Transient,
                &format!("恢复后再次出现临时故障: {}", cause),
            );
            Stage::Next
        } else {
            Stage::Recover { available, cause }
        }
    }

    fn transient_with_plan(
        &self,
        available: Option<i64>,
        cause: String,
        plan: &[Assignment],
        state: &mut GroupState<'_>,
        reporter: &mut RunReporter,
    ) -> Stage {
        if state.recovery_used {
            state.finish_all(
                reporter,
                |worker| days_in(plan, worker),
                OutcomeKind::Transient,
                &format!("恢复后再次出现临时故障: {}", cause),
            );
            Stage::Next
        } else {
            Stage::Recover { available, cause }
        }
    }
}

fn days_in(plan: &[Assignment], worker: &Worker) -> u32 {
    plan.iter()
        .find(|a| a.worker.same_person(&worker.identifier, &worker.name))
        .map_or(0, |a| a.days)
}
