pub mod cancel;
pub mod group_ctx;
pub mod group_flow;
pub mod run_reporter;

pub use cancel::CancelFlag;
pub use group_ctx::GroupCtx;
pub use group_flow::{bounded_call, GroupFlow};
pub use run_reporter::{RunEvent, RunReporter, RunSummary};
