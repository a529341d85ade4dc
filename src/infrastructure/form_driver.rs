//! 表单驱动契约 - 基础设施层
//!
//! 远程申报页面的所有交互（定位元素、等待、点击、读取弹窗）都封装在实现方内部，
//! 对流程层来说每个调用都是同步完成的一步。

use async_trait::async_trait;
use thiserror::Error;

use crate::models::DateRange;

/// 表单驱动错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// 调用超时
    #[error("{operation} 超时")]
    Timeout { operation: String },
    /// 页面引用失效（页面已刷新或回发）
    #[error("{operation} 时页面引用已失效")]
    StaleContext { operation: String },
    /// 目标不存在（下拉选项、表格行等）
    #[error("未找到: {what}")]
    NotFound { what: String },
    /// 其他驱动错误
    #[error("{message}")]
    Other { message: String },
}

impl DriverError {
    pub fn timeout(operation: impl Into<String>) -> Self {
        DriverError::Timeout {
            operation: operation.into(),
        }
    }

    pub fn stale(operation: impl Into<String>) -> Self {
        DriverError::StaleContext {
            operation: operation.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        DriverError::NotFound { what: what.into() }
    }

    pub fn other(message: impl Into<String>) -> Self {
        DriverError::Other {
            message: message.into(),
        }
    }

    /// 超时和引用失效可以通过一次上下文恢复来补救
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriverError::Timeout { .. } | DriverError::StaleContext { .. }
        )
    }
}

/// 表单驱动结果类型
pub type DriverResult<T> = Result<T, DriverError>;

/// 分组已用天数的读取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumedDays {
    /// 已发放，读到了具体天数
    Issued(u32),
    /// 空白，本财年尚未申报过
    NotIssued,
}

impl ConsumedDays {
    pub fn days(self) -> u32 {
        match self {
            ConsumedDays::Issued(days) => days,
            ConsumedDays::NotIssued => 0,
        }
    }
}

/// 表单驱动
///
/// 一次运行只有一个驱动实例，由运行任务独占，所以方法都取 `&mut self`。
#[async_trait]
pub trait FormDriver: Send {
    /// 打开申报入口页面（并在需要时选中乡镇）
    async fn open_entry(&mut self) -> DriverResult<()>;

    /// 切换到子单元（村）
    async fn select_sub_unit(&mut self, sub_unit_key: &str) -> DriverResult<()>;

    /// 切换到分组（户），`group_label` 是卡号最后一个 `/` 之后的部分
    async fn select_group(&mut self, group_label: &str) -> DriverResult<()>;

    /// 读取分组本财年已用天数
    async fn read_consumed_days(&mut self, group_key: &str) -> DriverResult<ConsumedDays>;

    /// 填写单个申请人的日期范围和天数
    async fn fill_worker_fields(
        &mut self,
        worker_name: &str,
        days: u32,
        range: &DateRange,
    ) -> DriverResult<()>;

    /// 提交整个分组，返回捕获到的响应文本；等待期内没有任何响应时返回 `None`
    async fn submit(&mut self) -> DriverResult<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(DriverError::timeout("提交").is_transient());
        assert!(DriverError::stale("填写").is_transient());
        assert!(!DriverError::not_found("选项").is_transient());
        assert!(!DriverError::other("脚本错误").is_transient());
    }

    #[test]
    fn test_consumed_days_blank_is_zero() {
        assert_eq!(ConsumedDays::NotIssued.days(), 0);
        assert_eq!(ConsumedDays::Issued(37).days(), 37);
    }
}
