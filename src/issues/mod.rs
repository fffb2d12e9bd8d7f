mod analysis;
mod store;

pub use analysis::{Analysis, analyze};
pub use store::{DEFAULT_MAX_ISSUES, Issue, IssuesStore, Severity};
