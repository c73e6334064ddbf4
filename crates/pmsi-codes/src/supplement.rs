//! Supplement types and per-type counters

use crate::error::CodeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::ops::{AddAssign, Index, IndexMut};
use std::str::FromStr;

/// Daily supplement kinds billed on top of a GHS
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum SupplementType {
    Rea,
    Reasi,
    Si,
    Src,
    Nn1,
    Nn2,
    Nn3,
    Rep,

    Ohb,
    Aph,
    Ant,
    Rap,
    Dia,
    Dip,
    Ent1,
    Ent2,
    Ent3,
    Sdc,
}

impl SupplementType {
    /// Number of supplement kinds
    pub const COUNT: usize = 18;

    /// Every kind, in counter order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Rea,
        Self::Reasi,
        Self::Si,
        Self::Src,
        Self::Nn1,
        Self::Nn2,
        Self::Nn3,
        Self::Rep,
        Self::Ohb,
        Self::Aph,
        Self::Ant,
        Self::Rap,
        Self::Dia,
        Self::Dip,
        Self::Ent1,
        Self::Ent2,
        Self::Ent3,
        Self::Sdc,
    ];

    /// Official short name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rea => "REA",
            Self::Reasi => "REASI",
            Self::Si => "SI",
            Self::Src => "SRC",
            Self::Nn1 => "NN1",
            Self::Nn2 => "NN2",
            Self::Nn3 => "NN3",
            Self::Rep => "REP",
            Self::Ohb => "OHB",
            Self::Aph => "APH",
            Self::Ant => "ANT",
            Self::Rap => "RAP",
            Self::Dia => "DIA",
            Self::Dip => "DIP",
            Self::Ent1 => "ENT1",
            Self::Ent2 => "ENT2",
            Self::Ent3 => "ENT3",
            Self::Sdc => "SDC",
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

impl Display for SupplementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SupplementType {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CodeError::UnknownSupplement(s.to_string()))
    }
}

/// One counter per [`SupplementType`]
///
/// Serialized as a map keyed by supplement name, zero counters omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupplementCounters<T> {
    values: [T; SupplementType::COUNT],
}

impl<T: Copy + Default + PartialEq> SupplementCounters<T> {
    /// All counters at zero
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: [T::default(); SupplementType::COUNT],
        }
    }

    /// Iterate over non-zero counters
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (SupplementType, T)> + '_ {
        SupplementType::ALL
            .into_iter()
            .map(|kind| (kind, self.values[kind.index()]))
            .filter(|(_, value)| *value != T::default())
    }
}

impl<T> Index<SupplementType> for SupplementCounters<T> {
    type Output = T;

    fn index(&self, kind: SupplementType) -> &T {
        &self.values[kind.index()]
    }
}

impl<T> IndexMut<SupplementType> for SupplementCounters<T> {
    fn index_mut(&mut self, kind: SupplementType) -> &mut T {
        &mut self.values[kind.index()]
    }
}

impl<T: Copy + AddAssign> AddAssign for SupplementCounters<T> {
    fn add_assign(&mut self, other: Self) {
        for (dst, src) in self.values.iter_mut().zip(other.values) {
            *dst += src;
        }
    }
}

impl<T> Serialize for SupplementCounters<T>
where
    T: Copy + Default + PartialEq + Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.iter_nonzero().map(|(kind, value)| (kind.name(), value)))
    }
}

impl<'de, T> Deserialize<'de> for SupplementCounters<T>
where
    T: Copy + Default + PartialEq + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map = BTreeMap::<SupplementType, T>::deserialize(deserializer)?;

        let mut counters = Self::new();
        for (kind, value) in map {
            counters[kind] = value;
        }
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip_through_from_str() {
        for kind in SupplementType::ALL {
            assert_eq!(kind.name().parse::<SupplementType>().unwrap(), kind);
        }
        assert_eq!("reasi".parse::<SupplementType>().unwrap(), SupplementType::Reasi);
        assert!("XYZ".parse::<SupplementType>().is_err());
    }

    #[test]
    fn counters_add_assign() {
        let mut a = SupplementCounters::<i16>::new();
        a[SupplementType::Rea] = 2;
        let mut b = SupplementCounters::<i16>::new();
        b[SupplementType::Rea] = 3;
        b[SupplementType::Sdc] = 1;

        a += b;
        assert_eq!(a[SupplementType::Rea], 5);
        assert_eq!(a[SupplementType::Sdc], 1);
        assert_eq!(a[SupplementType::Si], 0);
    }

    #[test]
    fn counters_serialize_nonzero_only() {
        let mut counters = SupplementCounters::<i16>::new();
        counters[SupplementType::Nn2] = 4;
        counters[SupplementType::Ent1] = 1;

        let json = serde_json::to_value(counters).unwrap();
        assert_eq!(json, serde_json::json!({"NN2": 4, "ENT1": 1}));

        let back: SupplementCounters<i16> = serde_json::from_value(json).unwrap();
        assert_eq!(back, counters);
    }
}
