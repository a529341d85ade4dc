//! # Demand Submit
//!
//! 通过浏览器自动化批量提交工作需求申报的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `FormDriver` - 申报页面的操作契约，`browser::PageFormDriver` 是它的页面实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不碰页面
//! - `group_workers` - 按 子单元 → 分组 归类申请人
//! - `allocate` - 在剩余额度内分配天数
//! - `OutcomeClassifier` - 把页面响应归类为结果
//! - `ResultLedger` / `ResultWriter` - 台账与 CSV 导出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个分组"的完整申报流程
//! - `GroupCtx` - 上下文封装（子单元 + 分组 + 序号）
//! - `GroupFlow` - 状态机（读额度 → 分配 → 填写 → 提交 → 分类）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/demand_run` - 单次运行，遍历子单元和分组
//! - `orchestrator/app` - 应用入口，管理浏览器、事件和导出
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{connect_to_browser_and_page, PageFormDriver};
pub use config::{Config, DemandSettings};
pub use error::{AppError, AppResult, RunError};
pub use infrastructure::{ConsumedDays, DriverError, FormDriver, JsExecutor};
pub use models::{OutcomeKind, ResultRecord, Roster, Worker};
pub use orchestrator::{App, DemandRun};
pub use utils::logger;
pub use workflow::{CancelFlag, GroupCtx, GroupFlow, RunEvent, RunSummary};
