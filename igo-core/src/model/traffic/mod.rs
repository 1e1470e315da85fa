//! Traffic feed model: highway segments and their congestion

pub mod types;

use hashbrown::HashMap;

pub use types::{CongestionRecord, CongestionState, TrafficSegment};

use crate::SegmentId;

/// Latest congestion record per segment.
///
/// The feed is consumed as a snapshot: older observations of the same
/// segment are discarded.
#[derive(Debug, Clone, Default)]
pub struct CongestionSnapshot {
    records: HashMap<SegmentId, CongestionRecord>,
}

impl CongestionSnapshot {
    /// Keeps the record with the latest observation date for every segment.
    /// On equal dates the record appearing later in the feed wins.
    pub fn from_records(records: impl IntoIterator<Item = CongestionRecord>) -> Self {
        let mut latest: HashMap<SegmentId, CongestionRecord> = HashMap::new();
        for record in records {
            match latest.get(&record.segment) {
                Some(existing) if existing.observed_at > record.observed_at => {}
                _ => {
                    latest.insert(record.segment, record);
                }
            }
        }
        Self { records: latest }
    }

    pub fn get(&self, segment: SegmentId) -> Option<&CongestionRecord> {
        self.records.get(&segment)
    }

    /// State of a segment, [`CongestionState::NoData`] if it has no record
    pub fn state_of(&self, segment: SegmentId) -> CongestionState {
        self.records
            .get(&segment)
            .map_or(CongestionState::NoData, |record| record.state)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
