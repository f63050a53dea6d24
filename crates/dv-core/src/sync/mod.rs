//! Selection state shared across views

use std::collections::BTreeSet;

use crate::events::Channel;
use crate::join::EnrichedRecordSet;
use crate::model::CountyId;

/// A set of highlighted county ids. Empty means "clear all highlights".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selection {
    ids: BTreeSet<CountyId>,
}

impl Selection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, county_id: CountyId) -> bool {
        self.ids.contains(&county_id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CountyId> + '_ {
        self.ids.iter().copied()
    }

    /// Drop ids that have no record in `records`
    pub fn retain_known(&self, records: &EnrichedRecordSet) -> Selection {
        self.ids.iter().copied().filter(|id| records.contains(*id)).collect()
    }
}

impl FromIterator<CountyId> for Selection {
    fn from_iter<I: IntoIterator<Item = CountyId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[CountyId; N]> for Selection {
    fn from(ids: [CountyId; N]) -> Self {
        ids.into_iter().collect()
    }
}

/// The most recently published selection, system-wide
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSelection {
    pub channel: Channel,
    pub selection: Selection,
    /// Publish round that produced it
    pub sequence: u64,
}

/// Per-view highlight bookkeeping.
///
/// `requested` is the selection last received; `effective` is the part of it
/// that exists in the record set the view currently shows.
#[derive(Debug, Clone, Default)]
pub struct HighlightState {
    requested: Selection,
    effective: Selection,
}

impl HighlightState {
    /// Replace the requested selection and recompute the effective highlight
    pub fn apply(&mut self, selection: &Selection, records: Option<&EnrichedRecordSet>) {
        self.requested = selection.clone();
        self.revalidate(records);
    }

    /// Re-check the requested ids against a (possibly new) record set
    pub fn revalidate(&mut self, records: Option<&EnrichedRecordSet>) {
        self.effective = match records {
            Some(records) => self.requested.retain_known(records),
            None => Selection::empty(),
        };
    }

    pub fn is_highlighted(&self, county_id: CountyId) -> bool {
        self.effective.contains(county_id)
    }

    pub fn effective(&self) -> &Selection {
        &self.effective
    }

    pub fn requested(&self) -> &Selection {
        &self.requested
    }

    pub fn is_active(&self) -> bool {
        !self.effective.is_empty()
    }
}
