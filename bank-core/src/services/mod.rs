//! Service layer - read-side orchestration over the records

mod status;

pub use status::{StatusService, StatusSummary};
