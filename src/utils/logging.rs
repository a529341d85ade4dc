use anyhow::Result;
/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::fs;
use tracing::info;

use crate::config::Config;
use crate::models::OutcomeKind;
use crate::services::ResultLedger;
use crate::workflow::RunSummary;

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n工作需求申报日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    let demand = &config.demand;
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 工作需求批量申报");
    info!(
        "📅 申报日期: {} | 每人 {} 天 | 每户上限 {} 天",
        demand.demand_date().format("%d/%m/%Y"),
        demand.requested_days_per_worker,
        demand.day_cap_per_group
    );
    match &demand.panchayat {
        Some(panchayat) => info!("🏘️ 乡镇: {}", panchayat),
        None => info!("🏘️ 乡镇级登录，不切换乡镇"),
    }
    info!("{}", "=".repeat(60));
}

/// 记录名册加载信息
pub fn log_roster_loaded(total: usize, selected: usize) {
    info!("✓ 名册共 {} 人，本次选中 {} 人", total, selected);
}

/// 记录分组结果
///
/// # 参数
/// - `workers`: 参与分组的人数
/// - `sub_units`: 子单元（村）数
/// - `groups`: 分组（户）数
/// - `unresolved`: 卡号无法解析的人数
pub fn log_grouping(workers: usize, sub_units: usize, groups: usize, unresolved: usize) {
    info!(
        "📋 {} 名申请人分为 {} 个村、{} 户",
        workers, sub_units, groups
    );
    if unresolved > 0 {
        info!("⚠️ {} 名申请人的卡号无法解析，将直接记为未找到", unresolved);
    }
}

/// 记录子单元开始信息
pub fn log_sub_unit_start(index: usize, total: usize, sub_unit_key: &str, workers: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 个村: {}", index, total, sub_unit_key);
    info!("👥 本村申请人: {} 名", workers);
    info!("{}", "=".repeat(60));
}

/// 记录子单元完成信息
pub fn log_sub_unit_complete(sub_unit_key: &str, ledger: &ResultLedger) {
    let counts = ledger.counts();
    let accepted = counts.get(&OutcomeKind::Accepted).copied().unwrap_or(0);
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 村 {} 完成: 累计成功 {}/{}",
        sub_unit_key,
        accepted,
        ledger.len()
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, log_file_path: &str, report_path: Option<&str>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.accepted(), summary.total_records);
    info!("📅 成功申报天数: {}", summary.accepted_days);
    for kind in OutcomeKind::ALL {
        let count = summary.count(kind);
        if count > 0 && !kind.is_accepted() {
            info!("❌ {}: {}", kind, count);
        }
    }
    if summary.cancelled {
        info!("⏹️ 运行被取消");
    }
    if summary.halted {
        info!("🛑 运行因致命错误中止");
    }
    info!("{}", "=".repeat(60));
    if let Some(path) = report_path {
        info!("\n结果已导出至: {}", path);
    }
    info!("日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("申请已提交成功", 4), "申请已提...");
        assert_eq!(truncate_text("ok", 4), "ok");
    }

    #[test]
    fn test_init_log_file_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demand_log.txt");

        init_log_file(path.to_str().unwrap()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("工作需求申报日志"));
    }
}
