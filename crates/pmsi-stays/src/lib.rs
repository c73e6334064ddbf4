//! MCO stay decoding
//!
//! Reads the ATIH MCO exchange formats into a [`StaySet`]:
//!
//! - RSS / GRP: one fixed-width line per unit stay ([`rss`])
//! - RSA: one anonymised line per hospital stay ([`rsa`])
//! - FICHCOMP: complementary drug and dialysis records ([`fichcomp`])
//! - stay packs ([`pack`]) and JSON documents ([`json`])
//!
//! Malformed fields never abort decoding. They are recorded as
//! [`StayError`] flags on the stay; only lines too short for their layout
//! are rejected.
//!
//! ```no_run
//! use pmsi_stays::{StaySetBuilder, StayTests};
//!
//! let mut builder = StaySetBuilder::new();
//! let mut tests = StayTests::new();
//! let summary = builder.load_files(&["2021.grp", "fichcomp.txt"], Some(&mut tests));
//! let set = builder.finish();
//! println!("{} stays, {} failed files", set.len(), summary.failed.len());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod builder;
pub mod error;
pub mod fichcomp;
pub mod fields;
pub mod format;
pub mod json;
pub mod pack;
pub mod rsa;
pub mod rss;
pub mod set;
pub mod stay;

pub use builder::{FileStats, LoadSummary, StaySetBuilder};
pub use error::{LineError, LoadError, PackError, RecordKind};
pub use fichcomp::{FichComp, FichCompKind};
pub use format::{Compression, FormatRegistry, SourceFormat};
pub use json::{write_json, StayDocument};
pub use set::{split_clusters, StaySet};
pub use stay::{
    AuthSupplement, ProcedureRealisation, Stay, StayEntry, StayError, StayErrors, StayExit,
    StayFlag, StayFlags, StayTest, StayTests,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
