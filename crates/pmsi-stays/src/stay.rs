//! Decoded stay model
//!
//! A [`Stay`] is one unit stay (RUM). Consecutive stays sharing a bill id
//! make up one hospital stay; see [`crate::set::split_clusters`].

use pmsi_codes::{
    DiagnosisCode, GhmCode, GhsCode, PmsiDate, ProcedureCode, SupplementCounters, SupplementType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Maximum number of authorization supplements kept per RSA
pub const MAX_AUTH_SUPPLEMENTS: usize = 16;

/// Generates a named enum plus a `u32` bit set over it, serialized as a
/// list of names.
macro_rules! bit_set {
    (
        $(#[$item_meta:meta])*
        $item:ident,
        $(#[$set_meta:meta])*
        $set:ident {
            $($(#[$variant_meta:meta])* $variant:ident => $name:literal,)+
        }
    ) => {
        $(#[$item_meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $item {
            $($(#[$variant_meta])* $variant,)+
        }

        impl $item {
            /// Every variant, in bit order
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Stable name used in JSON output
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            #[inline]
            const fn bit(self) -> u32 {
                1 << (self as u32)
            }
        }

        impl Display for $item {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $item {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|item| item.name() == s)
                    .ok_or_else(|| format!("unknown {} '{}'", stringify!($item), s))
            }
        }

        $(#[$set_meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $set(u32);

        impl $set {
            /// Empty set
            #[inline]
            #[must_use]
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Add a member
            #[inline]
            pub fn insert(&mut self, item: $item) {
                self.0 |= item.bit();
            }

            /// Remove a member
            #[inline]
            pub fn remove(&mut self, item: $item) {
                self.0 &= !item.bit();
            }

            /// Check membership
            #[inline]
            #[must_use]
            pub const fn contains(&self, item: $item) -> bool {
                self.0 & item.bit() != 0
            }

            /// True when no member is set
            #[inline]
            #[must_use]
            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// Raw bits
            #[inline]
            #[must_use]
            pub const fn bits(&self) -> u32 {
                self.0
            }

            /// Iterate over members in bit order
            pub fn iter(&self) -> impl Iterator<Item = $item> + '_ {
                $item::ALL.iter().copied().filter(|item| self.contains(*item))
            }
        }

        impl FromIterator<$item> for $set {
            fn from_iter<I: IntoIterator<Item = $item>>(iter: I) -> Self {
                let mut set = Self::empty();
                for item in iter {
                    set.insert(item);
                }
                set
            }
        }

        impl Serialize for $set {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_seq(self.iter().map($item::name))
            }
        }

        impl<'de> Deserialize<'de> for $set {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let names = Vec::<String>::deserialize(deserializer)?;
                names
                    .iter()
                    .map(|name| name.parse::<$item>().map_err(serde::de::Error::custom))
                    .collect()
            }
        }
    };
}

bit_set! {
    /// Boolean properties of a stay
    StayFlag,
    /// Set of [`StayFlag`]
    StayFlags {
        /// Coding confirmed despite unusual content
        Confirmed => "confirmed",
        /// Stay eligible for conversion to outpatient care
        Conversion => "conversion",
        /// Stay explicitly not eligible for conversion
        NoConversion => "no_conversion",
        /// Enhanced recovery after surgery
        Raac => "raac",
        /// Patient context flag
        Context => "context",
        /// Hospital use of the unit
        HospitalUse => "hospital_use",
        /// Rescripted stay
        Rescript => "rescript",
        /// Expensive drug (UCD) attached through FICHCOMP
        Ucd => "ucd",
    }
}

bit_set! {
    /// Field-level decoding problems recorded on a stay
    StayError,
    /// Set of [`StayError`]
    StayErrors {
        /// Record version not supported
        UnknownRumVersion => "unknown_rum_version",
        /// Bill id is not numeric
        MalformedBillId => "malformed_bill_id",
        /// Birthdate or age is malformed
        MalformedBirthdate => "malformed_birthdate",
        /// Sex is not numeric
        MalformedSex => "malformed_sex",
        /// Entry date is malformed
        MalformedEntryDate => "malformed_entry_date",
        /// Entry mode character is not printable ASCII
        MalformedEntryMode => "malformed_entry_mode",
        /// Entry origin character is not printable ASCII
        MalformedEntryOrigin => "malformed_entry_origin",
        /// Exit date is malformed
        MalformedExitDate => "malformed_exit_date",
        /// Exit mode character is not printable ASCII
        MalformedExitMode => "malformed_exit_mode",
        /// Exit destination character is not printable ASCII
        MalformedExitDestination => "malformed_exit_destination",
        /// Session count is not numeric
        MalformedSessionCount => "malformed_session_count",
        /// Newborn weight is not numeric
        MalformedNewbornWeight => "malformed_newborn_weight",
        /// Gestational age is not numeric
        MalformedGestationalAge => "malformed_gestational_age",
        /// Last menstrual period is malformed
        MalformedLastMenstrualPeriod => "malformed_last_menstrual_period",
        /// IGS2 score is not numeric
        MalformedIgs2 => "malformed_igs2",
        /// Confirmation flag is not 1, 2 or blank
        MalformedConfirmation => "malformed_confirmation",
        /// Conversion flag is not 1, 2 or blank
        MalformedConversion => "malformed_conversion",
        /// RAAC flag is invalid
        MalformedRaac => "malformed_raac",
        /// Context flag is invalid
        MalformedContext => "malformed_context",
        /// Hospital use flag is invalid
        MalformedHospitalUse => "malformed_hospital_use",
        /// Rescript flag is invalid
        MalformedRescript => "malformed_rescript",
        /// Other diagnoses count is blank
        MissingOtherDiagnosesCount => "missing_other_diagnoses_count",
        /// Other diagnoses count is not numeric
        MalformedOtherDiagnosesCount => "malformed_other_diagnoses_count",
        /// An other diagnosis code is malformed
        MalformedOtherDiagnosis => "malformed_other_diagnosis",
        /// Procedures count is blank
        MissingProceduresCount => "missing_procedures_count",
        /// Procedures count is not numeric
        MalformedProceduresCount => "malformed_procedures_count",
        /// Main diagnosis code is malformed
        MalformedMainDiagnosis => "malformed_main_diagnosis",
        /// Linked diagnosis code is malformed
        MalformedLinkedDiagnosis => "malformed_linked_diagnosis",
        /// A procedure code is malformed
        MalformedProcedureCode => "malformed_procedure_code",
        /// A procedure extension is malformed
        MalformedProcedureExtension => "malformed_procedure_extension",
    }
}

impl StayErrors {
    /// Record `error` when `ok` is false
    #[inline]
    pub fn flag_unless(&mut self, ok: bool, error: StayError) {
        if !ok {
            self.insert(error);
        }
    }
}

/// How and when the patient entered the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StayEntry {
    /// Entry date
    pub date: Option<PmsiDate>,
    /// Entry mode (6 = transfer, 7 = from another facility, 8 = home...)
    pub mode: Option<char>,
    /// Provenance
    pub origin: Option<char>,
}

/// How and when the patient left the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StayExit {
    /// Exit date
    pub date: Option<PmsiDate>,
    /// Exit mode (6 = transfer, 8 = home, 9 = death...)
    pub mode: Option<char>,
    /// Destination
    pub destination: Option<char>,
}

/// One performed procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureRealisation {
    /// CCAM code
    pub code: ProcedureCode,
    /// Date the procedure was performed
    #[serde(default)]
    pub date: Option<PmsiDate>,
    /// ATIH extension number
    #[serde(default)]
    pub extension: i8,
    /// Phase
    #[serde(default)]
    pub phase: i8,
    /// Activity
    #[serde(default)]
    pub activity: i8,
    /// Documentation extension letter
    #[serde(default)]
    pub doc: Option<char>,
    /// Number of realisations
    #[serde(default)]
    pub count: i16,
}

impl ProcedureRealisation {
    /// Procedure with default attributes
    #[inline]
    #[must_use]
    pub fn new(code: ProcedureCode) -> Self {
        Self {
            code,
            date: None,
            extension: 0,
            phase: 0,
            activity: 0,
            doc: None,
            count: 0,
        }
    }
}

/// One unit stay (RUM)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stay {
    /// Administrative (patient stay) id
    pub admin_id: i32,
    /// Bill id, shared by all unit stays of one hospital stay
    pub bill_id: i32,
    /// Sex (1 = male, 2 = female)
    pub sex: i8,
    /// Birthdate
    pub birthdate: Option<PmsiDate>,
    /// Entry into the unit
    pub entry: StayEntry,
    /// Exit from the unit
    pub exit: StayExit,
    /// Medical unit number
    pub unit: i16,
    /// Bed authorization type
    pub bed_authorization: i8,
    /// Number of sessions
    pub session_count: i16,
    /// IGS2 severity score
    pub igs2: i16,
    /// Last menstrual period
    pub last_menstrual_period: Option<PmsiDate>,
    /// Gestational age in weeks
    pub gestational_age: i16,
    /// Newborn weight in grams
    pub newborn_weight: i16,
    /// Dialysis sessions attached through FICHCOMP
    pub dip_count: i16,
    /// Main diagnosis
    pub main_diagnosis: Option<DiagnosisCode>,
    /// Linked diagnosis
    pub linked_diagnosis: Option<DiagnosisCode>,
    /// Associated diagnoses
    pub other_diagnoses: Vec<DiagnosisCode>,
    /// Performed procedures
    pub procedures: Vec<ProcedureRealisation>,
    /// Intervention category (RUM version 20)
    pub interv_category: Option<char>,
    /// Boolean properties
    pub flags: StayFlags,
    /// Decoding problems
    pub errors: StayErrors,
}

/// Authorization supplement declared on an RSA unit stay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSupplement {
    /// Supplement kind
    pub kind: SupplementType,
    /// Number of days
    pub days: i16,
}

/// Grouping results shipped with GRP and RSA files
///
/// Kept alongside the stays so that a classifier can be checked against
/// the reference results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StayTest {
    /// Bill id of the hospital stay
    pub bill_id: i32,
    /// Number of unit stays in the hospital stay
    pub cluster_len: i16,
    /// Reference GHM
    pub ghm: Option<GhmCode>,
    /// Reference grouping error code
    pub error: i16,
    /// Reference GHS
    pub ghs: GhsCode,
    /// EXH days minus EXB days
    pub exb_exh: i32,
    /// Reference supplement day counts
    pub supplement_days: SupplementCounters<i16>,
    /// Authorization supplements, one slot per unit stay
    pub auth_supplements: Vec<Option<AuthSupplement>>,
}

/// Reference results keyed by bill id
pub type StayTests = BTreeMap<i32, StayTest>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_insert_remove() {
        let mut flags = StayFlags::empty();
        flags.insert(StayFlag::Conversion);
        flags.insert(StayFlag::Ucd);
        assert!(flags.contains(StayFlag::Conversion));

        flags.remove(StayFlag::Conversion);
        assert!(!flags.contains(StayFlag::Conversion));
        assert!(flags.contains(StayFlag::Ucd));
        assert!(!flags.is_empty());
    }

    #[test]
    fn errors_serialize_as_names() {
        let errors: StayErrors = [StayError::MalformedSex, StayError::MissingProceduresCount]
            .into_iter()
            .collect();

        let json = serde_json::to_value(errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["malformed_sex", "missing_procedures_count"])
        );

        let back: StayErrors = serde_json::from_value(json).unwrap();
        assert_eq!(back, errors);
    }

    #[test]
    fn errors_reject_unknown_names() {
        let result = serde_json::from_value::<StayErrors>(serde_json::json!(["nope"]));
        assert!(result.is_err());
    }

    #[test]
    fn every_error_fits_in_bits() {
        assert!(StayError::ALL.len() <= 32);
        assert!(StayFlag::ALL.len() <= 32);
    }

    #[test]
    fn flag_unless_only_flags_failures() {
        let mut errors = StayErrors::empty();
        errors.flag_unless(true, StayError::MalformedIgs2);
        assert!(errors.is_empty());
        errors.flag_unless(false, StayError::MalformedIgs2);
        assert!(errors.contains(StayError::MalformedIgs2));
    }

    #[test]
    fn stay_json_defaults_missing_fields() {
        let stay: Stay = serde_json::from_str(r#"{"bill_id": 12}"#).unwrap();
        assert_eq!(stay.bill_id, 12);
        assert!(stay.procedures.is_empty());
        assert!(stay.errors.is_empty());
    }
}
