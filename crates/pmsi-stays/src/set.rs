//! Decoded stay set and hospital stay clusters

use crate::stay::Stay;
use serde::{Deserialize, Serialize};

/// Stays decoded from one or more files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaySet {
    /// Unit stays, sorted by `(admin_id, bill_id)` within each source file
    pub stays: Vec<Stay>,
}

impl StaySet {
    /// Number of unit stays
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stays.len()
    }

    /// True when the set holds no stay
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stays.is_empty()
    }

    /// Iterate over hospital stays
    pub fn clusters(&self) -> Clusters<'_> {
        split_clusters(&self.stays)
    }
}

/// Iterate over hospital stays in `stays`
///
/// Consecutive stays sharing a non-zero bill id belong to the same cluster.
/// A stay with bill id 0 always stands alone.
#[must_use]
pub fn split_clusters(stays: &[Stay]) -> Clusters<'_> {
    Clusters { rest: stays }
}

/// Iterator returned by [`split_clusters`]
#[derive(Debug, Clone)]
pub struct Clusters<'a> {
    rest: &'a [Stay],
}

impl<'a> Iterator for Clusters<'a> {
    type Item = &'a [Stay];

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.first()?;
        let len = if first.bill_id == 0 {
            1
        } else {
            1 + self.rest[1..]
                .iter()
                .take_while(|stay| stay.bill_id == first.bill_id)
                .count()
        };

        let (cluster, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(cluster)
    }
}

/// Mutable counterpart of [`split_clusters`], used to attach data to the
/// first stay of each cluster
pub(crate) fn cluster_ranges(stays: &[Stay]) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for cluster in split_clusters(stays) {
        ranges.push(start..start + cluster.len());
        start += cluster.len();
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stay(bill_id: i32) -> Stay {
        Stay {
            bill_id,
            ..Stay::default()
        }
    }

    #[test]
    fn groups_by_bill_id() {
        let stays = vec![stay(1), stay(1), stay(2), stay(0), stay(0), stay(3), stay(1)];
        let lens: Vec<usize> = split_clusters(&stays).map(<[Stay]>::len).collect();
        assert_eq!(lens, vec![2, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(split_clusters(&[]).count(), 0);
    }

    #[test]
    fn ranges_cover_everything() {
        let stays = vec![stay(5), stay(5), stay(5), stay(6)];
        assert_eq!(cluster_ranges(&stays), vec![0..3, 3..4]);

        let set = StaySet { stays };
        assert_eq!(set.clusters().count(), 2);
        assert_eq!(set.len(), 4);
    }
}
