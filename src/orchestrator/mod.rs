//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次申报运行的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行、导出）
//! - 管理浏览器资源（Browser、页面驱动）
//! - 监听 Ctrl-C，消费运行事件
//! - 输出全局统计信息
//!
//! ### `demand_run` - 单次申报运行
//! - 把申请人分组（子单元 → 分组）
//! - 逐个切换子单元和分组，委托 GroupFlow 处理
//! - 在边界检查取消信号
//! - 处理中止整个运行的致命错误
//!
//! ## 层次关系
//!
//! ```text
//! app (名册 + 浏览器 + 导出)
//!     ↓
//! demand_run (遍历 子单元 / 分组)
//!     ↓
//! workflow::GroupFlow (处理单个分组)
//!     ↓
//! services (能力层：分组 / 额度分配 / 响应分类 / 台账)
//!     ↓
//! infrastructure (基础设施：FormDriver、JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：app 管资源，demand_run 管遍历
//! 2. **资源隔离**：只有编排层持有 Browser 和驱动
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **严格串行**：同一时间只有一个分组在远程系统中处理

pub mod app;
pub mod demand_run;

// 重新导出主要类型
pub use app::App;
pub use demand_run::DemandRun;
