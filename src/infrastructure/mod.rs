//! 基础设施层（Infrastructure）
//!
//! - `JsExecutor`：唯一持有 Page 的资源，只暴露执行 JS 的能力
//! - `FormDriver`：远程申报页面的操作契约，由浏览器层实现，流程层只依赖这个 trait

pub mod form_driver;
pub mod js_executor;

pub use form_driver::{ConsumedDays, DriverError, DriverResult, FormDriver};
pub use js_executor::JsExecutor;
