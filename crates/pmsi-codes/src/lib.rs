//! PMSI code values
//!
//! Strongly-typed values shared by every MCO exchange format:
//!
//! - [`PmsiDate`]: raw day/month/year triple as written in the files
//! - [`DiagnosisCode`]: ICD-10 diagnosis
//! - [`ProcedureCode`]: CCAM procedure
//! - [`GhmCode`] / [`GhsCode`]: grouping results
//! - [`SupplementType`] / [`SupplementCounters`]: per-supplement day counts
//!
//! All parsers work on raw byte fragments taken from fixed-width records
//! and never allocate.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod date;
mod diagnosis;
mod error;
mod ghm;
mod procedure;
mod supplement;

pub use date::PmsiDate;
pub use diagnosis::DiagnosisCode;
pub use error::CodeError;
pub use ghm::{GhmCode, GhmRootCode, GhsCode};
pub use procedure::ProcedureCode;
pub use supplement::{SupplementCounters, SupplementType};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
