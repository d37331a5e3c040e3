//! Date-folder organization.
//!
//! - Date resolution and the date policy ([`date`])
//! - The per-file placement loop ([`driver`])

pub mod date;
pub mod driver;

pub use date::{DatePolicy, DateResolver, DateSource, NoEmbeddedDates, ResolvedDate};
pub use driver::{OrganizeError, OrganizeOptions, Organizer, RunSummary};
