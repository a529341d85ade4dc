pub mod grouping;
pub mod outcome_classifier;
pub mod quota_allocator;
pub mod result_ledger;
pub mod result_writer;

pub use grouping::{group_workers, Group, Grouping, SubUnit};
pub use outcome_classifier::{names_match, OutcomeClassifier};
pub use quota_allocator::{allocate, Allocation};
pub use result_ledger::ResultLedger;
pub use result_writer::ResultWriter;
