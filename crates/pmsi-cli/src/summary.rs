//! Stay set statistics for the `summary` command

use pmsi_stays::{StaySet, StayTests};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts over a decoded stay set
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StaySummary {
    /// Unit stays
    pub stays: usize,
    /// Hospital stays
    pub clusters: usize,
    /// Unit stays with at least one error flag
    pub stays_with_errors: usize,
    /// Stays per error flag
    pub errors: BTreeMap<&'static str, usize>,
    /// Stays per property flag
    pub flags: BTreeMap<&'static str, usize>,
    /// Reference results collected, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<usize>,
}

impl StaySummary {
    /// Compute counts for `set`
    #[must_use]
    pub fn compute(set: &StaySet, tests: Option<&StayTests>) -> Self {
        let mut summary = Self {
            stays: set.len(),
            clusters: set.clusters().count(),
            tests: tests.map(StayTests::len),
            ..Self::default()
        };

        for stay in &set.stays {
            if !stay.errors.is_empty() {
                summary.stays_with_errors += 1;
            }
            for error in stay.errors.iter() {
                *summary.errors.entry(error.name()).or_default() += 1;
            }
            for flag in stay.flags.iter() {
                *summary.flags.entry(flag.name()).or_default() += 1;
            }
        }

        summary
    }

    /// Plain text report
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Stays:             {}\nHospital stays:    {}\nStays with errors: {}\n",
            self.stays, self.clusters, self.stays_with_errors
        );
        if let Some(tests) = self.tests {
            out.push_str(&format!("Reference results: {tests}\n"));
        }

        for (title, counts) in [("Errors", &self.errors), ("Flags", &self.flags)] {
            if counts.is_empty() {
                continue;
            }
            out.push_str(&format!("{title}:\n"));
            for (name, count) in counts {
                out.push_str(&format!("  {name:<32} {count}\n"));
            }
        }

        out
    }
}
