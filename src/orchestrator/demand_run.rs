//! 单次申报运行 - 编排层
//!
//! ## 职责
//!
//! 1. **分组**：把选中的申请人按 子单元 → 分组 归类
//! 2. **遍历**：逐个子单元、逐个分组切换页面上下文，委托 `GroupFlow` 处理分组
//! 3. **取消**：在每个子单元和分组边界检查取消信号
//! 4. **致命错误**：入口页面或子单元无法进入时中止整个运行
//!
//! 不存在任何并行：远程系统是单一有状态会话，同一分组的天数上限经不起并发修改。

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::DemandSettings;
use crate::error::RunError;
use crate::infrastructure::{DriverError, FormDriver};
use crate::models::{OutcomeKind, ResultRecord, SubUnitKeyRule, Worker};
use crate::services::{group_workers, Group, Grouping, ResultLedger, SubUnit};
use crate::utils::logging;
use crate::workflow::{bounded_call, CancelFlag, GroupCtx, GroupFlow, RunEvent, RunReporter, RunSummary};

/// 单次申报运行
pub struct DemandRun {
    flow: GroupFlow,
    rule: SubUnitKeyRule,
    cancel: CancelFlag,
}

/// 运行在何处停止
enum Stop {
    Cancelled { sub_unit: usize, group: usize },
    Halted { sub_unit: usize, error: RunError },
}

impl DemandRun {
    pub fn new(
        settings: &DemandSettings,
        call_timeout: Duration,
        cancel: CancelFlag,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            flow: GroupFlow::new(settings, call_timeout)?,
            rule: settings.sub_unit_key_rule.clone(),
            cancel,
        })
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// 执行一次完整运行
    ///
    /// 返回 `Err` 只代表运行被致命错误中止；此时所有未处理的申请人也已记入台账。
    pub async fn execute(
        &self,
        driver: &mut dyn FormDriver,
        workers: &[Worker],
        reporter: &mut RunReporter,
    ) -> Result<RunSummary, RunError> {
        let grouping = group_workers(workers, &self.rule);
        logging::log_grouping(
            grouping.worker_count(),
            grouping.sub_units.len(),
            grouping.group_count(),
            grouping.unresolved.len(),
        );

        for worker in &grouping.unresolved {
            reporter.record(ResultRecord::new(
                worker,
                worker.identifier.trim(),
                0,
                OutcomeKind::NotFound,
                "卡号格式错误，无法推导分组",
            ));
        }

        if grouping.sub_units.is_empty() {
            return Ok(reporter.finish(false, false));
        }

        reporter.status("🌐 打开申报入口页面...");
        if let Err(e) = self.call(driver.open_entry(), "打开入口页面").await {
            let error = RunError::EntryUnreachable { source: e };
            self.halt_from(&grouping, 0, reporter, &error);
            reporter.critical(error.to_string());
            reporter.finish(false, true);
            return Err(error);
        }

        match self.traverse(driver, &grouping, reporter).await {
            None => Ok(reporter.finish(false, false)),
            Some(Stop::Cancelled { sub_unit, group }) => {
                warn!("⏹️ 运行已取消，剩余申请人记为跳过");
                self.skip_from(&grouping, sub_unit, group, reporter);
                Ok(reporter.finish(true, false))
            }
            Some(Stop::Halted { sub_unit, error }) => {
                self.halt_from(&grouping, sub_unit, reporter, &error);
                reporter.critical(error.to_string());
                reporter.finish(false, true);
                Err(error)
            }
        }
    }

    /// 把运行放到后台任务执行，事件单向发往展示层
    pub fn spawn<D>(
        self,
        mut driver: D,
        workers: Vec<Worker>,
        events: UnboundedSender<RunEvent>,
    ) -> JoinHandle<(ResultLedger, Result<RunSummary, RunError>)>
    where
        D: FormDriver + 'static,
    {
        tokio::spawn(async move {
            let mut reporter = RunReporter::new(Some(events));
            let result = self.execute(&mut driver, &workers, &mut reporter).await;
            (reporter.into_ledger(), result)
        })
    }

    // ========== 遍历 ==========

    async fn traverse(
        &self,
        driver: &mut dyn FormDriver,
        grouping: &Grouping,
        reporter: &mut RunReporter,
    ) -> Option<Stop> {
        let total_groups = grouping.group_count();
        let mut group_index = 0;

        for (sub_idx, sub_unit) in grouping.sub_units.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Some(Stop::Cancelled {
                    sub_unit: sub_idx,
                    group: 0,
                });
            }

            logging::log_sub_unit_start(
                sub_idx + 1,
                grouping.sub_units.len(),
                &sub_unit.sub_unit_key,
                sub_unit.worker_count(),
            );
            reporter.status(format!("[子单元 {}] 切换中...", sub_unit.sub_unit_key));

            match self.enter_sub_unit(driver, &sub_unit.sub_unit_key).await {
                Ok(()) => {}
                Err(DriverError::NotFound { what }) => {
                    warn!("[子单元 {}] ⚠️ 下拉框中没有该子单元，整体跳过", sub_unit.sub_unit_key);
                    let detail = format!("未找到子单元: {}", what);
                    for group in &sub_unit.groups {
                        record_group(reporter, group, OutcomeKind::NotFound, &detail);
                    }
                    group_index += sub_unit.groups.len();
                    continue;
                }
                Err(source) => {
                    return Some(Stop::Halted {
                        sub_unit: sub_idx,
                        error: RunError::SubUnitUnreachable {
                            sub_unit: sub_unit.sub_unit_key.clone(),
                            source,
                        },
                    });
                }
            }

            for (grp_idx, group) in sub_unit.groups.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    return Some(Stop::Cancelled {
                        sub_unit: sub_idx,
                        group: grp_idx,
                    });
                }

                group_index += 1;
                let ctx = GroupCtx::new(
                    sub_unit.sub_unit_key.clone(),
                    group.group_key.clone(),
                    group.group_label.clone(),
                    group_index,
                    total_groups,
                );
                reporter.status(format!("{} 开始处理 {} 名申请人", ctx, group.workers.len()));

                match self.enter_group(driver, &sub_unit.sub_unit_key, &group.group_label).await {
                    Ok(recovered) => {
                        self.flow
                            .run(driver, group, &ctx, reporter, &self.cancel, recovered)
                            .await;
                    }
                    Err(DriverError::NotFound { what }) => {
                        record_group(
                            reporter,
                            group,
                            OutcomeKind::NotFound,
                            &format!("未找到分组: {}", what),
                        );
                    }
                    Err(e) => {
                        record_group(
                            reporter,
                            group,
                            OutcomeKind::Transient,
                            &format!("无法切换到分组: {}", e),
                        );
                    }
                }
            }

            logging::log_sub_unit_complete(&sub_unit.sub_unit_key, reporter.ledger());
        }

        None
    }

    /// 切换子单元；临时故障时重新打开入口页面再试一次
    async fn enter_sub_unit(
        &self,
        driver: &mut dyn FormDriver,
        sub_unit_key: &str,
    ) -> Result<(), DriverError> {
        match self.call(driver.select_sub_unit(sub_unit_key), "选择子单元").await {
            Err(e) if e.is_transient() => {
                warn!("[子单元 {}] 🔄 切换失败 ({})，重新打开入口页面后重试", sub_unit_key, e);
                self.call(driver.open_entry(), "打开入口页面").await?;
                self.call(driver.select_sub_unit(sub_unit_key), "选择子单元").await
            }
            other => other,
        }
    }

    /// 切换分组；失败时恢复一次上下文（入口 → 子单元 → 分组）
    ///
    /// 返回 `Ok(true)` 表示本组的恢复机会已经在这里用掉了。
    async fn enter_group(
        &self,
        driver: &mut dyn FormDriver,
        sub_unit_key: &str,
        group_label: &str,
    ) -> Result<bool, DriverError> {
        match self.call(driver.select_group(group_label), "选择分组").await {
            Ok(()) => Ok(false),
            Err(e) if e.is_transient() => {
                warn!("[分组 {}] 🔄 切换失败 ({})，恢复上下文后重试", group_label, e);
                self.call(driver.open_entry(), "打开入口页面").await?;
                self.call(driver.select_sub_unit(sub_unit_key), "选择子单元").await?;
                self.call(driver.select_group(group_label), "选择分组").await?;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    async fn call<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, DriverError>>,
        operation: &str,
    ) -> Result<T, DriverError> {
        bounded_call(self.flow.call_timeout(), operation, call).await
    }

    // ========== 收尾 ==========

    /// 取消后：从指定位置起的所有申请人记为跳过
    fn skip_from(&self, grouping: &Grouping, sub_unit: usize, group: usize, reporter: &mut RunReporter) {
        for (idx, unit) in grouping.sub_units.iter().enumerate().skip(sub_unit) {
            let first_group = if idx == sub_unit { group } else { 0 };
            for group in unit.groups.iter().skip(first_group) {
                record_group(reporter, group, OutcomeKind::Skipped, "运行已取消");
            }
        }
    }

    /// 致命错误后：从指定子单元起的所有申请人记为临时故障
    fn halt_from(&self, grouping: &Grouping, sub_unit: usize, reporter: &mut RunReporter, error: &RunError) {
        let detail = format!("运行中止: {}", error);
        for unit in grouping.sub_units.iter().skip(sub_unit) {
            record_sub_unit(reporter, unit, OutcomeKind::Transient, &detail);
        }
    }
}

fn record_group(reporter: &mut RunReporter, group: &Group, kind: OutcomeKind, detail: &str) {
    for worker in &group.workers {
        reporter.record(ResultRecord::new(
            worker,
            group.group_key.clone(),
            0,
            kind,
            detail,
        ));
    }
}

fn record_sub_unit(reporter: &mut RunReporter, sub_unit: &SubUnit, kind: OutcomeKind, detail: &str) {
    for group in &sub_unit.groups {
        record_group(reporter, group, kind, detail);
    }
    info!(
        "[子单元 {}] 已记录 {} 名未处理的申请人",
        sub_unit.sub_unit_key,
        sub_unit.worker_count()
    );
}
