pub mod date_range;
pub mod loaders;
pub mod outcome;
pub mod record;
pub mod worker;

pub use date_range::{parse_demand_date, DateRange};
pub use loaders::load_roster_csv;
pub use outcome::{Outcome, OutcomeKind};
pub use record::ResultRecord;
pub use worker::{Roster, SubUnitKeyRule, Worker, WorkerKeys};
