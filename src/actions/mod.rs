//! File actions module.
//!
//! This module provides functionality for:
//! - Copying and moving files without ever replacing an existing one ([`transfer`])
//! - Applying duplicate decisions, demotions included ([`executor`])
//!
//! ```no_run
//! use orgphoto::actions::{Executor, TransferMode};
//!
//! let executor = Executor::new(TransferMode::Copy, true);
//! assert!(executor.is_dry_run());
//! ```

pub mod executor;
pub mod transfer;

pub use executor::{Executor, Outcome};
pub use transfer::{copy_file, ensure_dir, move_file, transfer, TransferError, TransferMode};
