//! Lazy refresh of the congestion-weighted graph
//!
//! Queries ask the scheduler for the current snapshot. When the snapshot is
//! older than the staleness interval the first query to notice rebuilds it
//! from fresh feed data; queries arriving meanwhile keep using the old one.
//! A new snapshot replaces the old one with a single pointer swap, so a
//! query only ever sees a fully built graph.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use log::{info, warn};

use crate::Error;
use crate::loading::{TrafficFeed, WeightingConfig};
use crate::model::{CongestionSnapshot, CongestionWeightedGraph, StreetGraph};

pub struct RefreshScheduler {
    base: Arc<StreetGraph>,
    feed: Box<dyn TrafficFeed>,
    weighting: WeightingConfig,
    staleness: TimeDelta,
    current: RwLock<Arc<CongestionWeightedGraph>>,
    rebuilding: AtomicBool,
}

/// Clears the rebuild flag when the rebuild ends, even by panic
struct RebuildGuard<'a>(&'a AtomicBool);

impl Drop for RebuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefreshScheduler {
    /// Builds the first snapshot.
    ///
    /// If the feeds are unreachable at startup the scheduler starts with an
    /// uncongested snapshot that is already stale, so the next query retries.
    ///
    /// # Errors
    ///
    /// Returns an error only if the graph cannot be annotated at all.
    pub fn new(
        base: Arc<StreetGraph>,
        feed: impl TrafficFeed + 'static,
        weighting: WeightingConfig,
        staleness: Duration,
    ) -> Result<Self, Error> {
        Self::new_at(base, feed, weighting, staleness, Utc::now())
    }

    /// [`RefreshScheduler::new`] with an explicit clock reading
    ///
    /// # Errors
    ///
    /// Same as [`RefreshScheduler::new`].
    pub fn new_at(
        base: Arc<StreetGraph>,
        feed: impl TrafficFeed + 'static,
        weighting: WeightingConfig,
        staleness: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        weighting.validate()?;
        let staleness = TimeDelta::from_std(staleness)
            .map_err(|e| Error::InvalidData(format!("Invalid staleness interval: {e}")))?;
        let feed: Box<dyn TrafficFeed> = Box::new(feed);

        let initial = match build_snapshot(&base, feed.as_ref(), &weighting, now) {
            Ok(snapshot) => snapshot,
            Err(Error::InvariantViolation(reason)) => {
                return Err(Error::InvariantViolation(reason));
            }
            Err(e) => {
                warn!("Starting without traffic data, will retry on the next query: {e}");
                CongestionWeightedGraph::uncongested(
                    base.clone(),
                    &weighting,
                    DateTime::<Utc>::UNIX_EPOCH,
                )?
            }
        };

        Ok(Self {
            base,
            feed,
            weighting,
            staleness,
            current: RwLock::new(Arc::new(initial)),
            rebuilding: AtomicBool::new(false),
        })
    }

    /// Snapshot currently being served, without triggering a refresh
    pub fn current(&self) -> Arc<CongestionWeightedGraph> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot to answer a query with, refreshing it first if stale
    pub fn snapshot(&self) -> Arc<CongestionWeightedGraph> {
        self.snapshot_at(Utc::now())
    }

    /// [`RefreshScheduler::snapshot`] with an explicit clock reading
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Arc<CongestionWeightedGraph> {
        let current = self.current();
        if !self.is_stale(&current, now) {
            return current;
        }

        match self.try_rebuild(now) {
            Some(Ok(snapshot)) => snapshot,
            Some(Err(e)) => {
                warn!("Snapshot refresh failed, serving the previous one: {e}");
                self.current()
            }
            // Another query is already rebuilding
            None => current,
        }
    }

    /// Rebuilds immediately regardless of age.
    ///
    /// Returns the snapshot being served if a rebuild is already running.
    ///
    /// # Errors
    ///
    /// Returns the fetch or build error; the previous snapshot stays in place.
    pub fn refresh_now(&self) -> Result<Arc<CongestionWeightedGraph>, Error> {
        let now = Utc::now();
        match self.rebuild_exclusive(now, |_| true) {
            Some(result) => result,
            None => Ok(self.current()),
        }
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(Ordering::Acquire)
    }

    pub fn base_graph(&self) -> &Arc<StreetGraph> {
        &self.base
    }

    fn is_stale(&self, snapshot: &CongestionWeightedGraph, now: DateTime<Utc>) -> bool {
        now - snapshot.built_at() > self.staleness
    }

    fn try_rebuild(
        &self,
        now: DateTime<Utc>,
    ) -> Option<Result<Arc<CongestionWeightedGraph>, Error>> {
        // Someone may have swapped in a fresh snapshot since we looked
        self.rebuild_exclusive(now, |current| self.is_stale(current, now))
    }

    /// Runs a rebuild if no other one is in flight and `needed` still holds
    fn rebuild_exclusive(
        &self,
        now: DateTime<Utc>,
        needed: impl Fn(&CongestionWeightedGraph) -> bool,
    ) -> Option<Result<Arc<CongestionWeightedGraph>, Error>> {
        if self
            .rebuilding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let _guard = RebuildGuard(&self.rebuilding);

        let current = self.current();
        if !needed(&current) {
            return Some(Ok(current));
        }

        info!("Rebuilding congestion-weighted graph");
        let result = build_snapshot(&self.base, self.feed.as_ref(), &self.weighting, now)
            .map(|snapshot| {
                let snapshot = Arc::new(snapshot);
                *self
                    .current
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
                snapshot
            });
        Some(result)
    }
}

fn build_snapshot(
    base: &Arc<StreetGraph>,
    feed: &dyn TrafficFeed,
    weighting: &WeightingConfig,
    now: DateTime<Utc>,
) -> Result<CongestionWeightedGraph, Error> {
    let segments = feed.fetch_segments()?;
    let congestion = CongestionSnapshot::from_records(feed.fetch_congestion()?);
    CongestionWeightedGraph::build(base.clone(), segments, congestion, weighting, now)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::sync::{Barrier, Mutex};
    use std::thread;

    use super::*;
    use crate::model::{CongestionRecord, CongestionState, Itime, TrafficSegment};
    use crate::test_support::{at, corridor_graph, segment_between};

    const STALENESS: Duration = Duration::from_secs(300);

    /// Feed serving one segment over B -> C with a configurable state
    struct StubFeed {
        segments: Vec<TrafficSegment>,
        state: Mutex<CongestionState>,
        fail: AtomicBool,
        fetches: AtomicUsize,
        /// When set, fetches block until the test lets them go
        gate: Mutex<Option<(Arc<Barrier>, Arc<Barrier>)>>,
    }

    impl StubFeed {
        fn new(base: &StreetGraph, state: CongestionState) -> Arc<Self> {
            Arc::new(Self {
                segments: vec![segment_between(base, 7, 2, 3)],
                state: Mutex::new(state),
                fail: AtomicBool::new(false),
                fetches: AtomicUsize::new(0),
                gate: Mutex::new(None),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl TrafficFeed for StubFeed {
        fn fetch_segments(&self) -> Result<Vec<TrafficSegment>, Error> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.lock().unwrap().clone();
            if let Some((entered, release)) = gate {
                entered.wait();
                release.wait();
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::fetch("traffic segments", "connection refused"));
            }
            Ok(self.segments.clone())
        }

        fn fetch_congestion(&self) -> Result<Vec<CongestionRecord>, Error> {
            Ok(vec![CongestionRecord {
                segment: 7,
                observed_at: at(0).naive_utc(),
                state: *self.state.lock().unwrap(),
            }])
        }
    }

    fn bc_itime(snapshot: &CongestionWeightedGraph) -> Itime {
        let graph = snapshot.street_graph();
        let edge = graph
            .find_edge(
                petgraph::graph::NodeIndex::new(1),
                petgraph::graph::NodeIndex::new(2),
            )
            .unwrap();
        snapshot.itime(edge).unwrap()
    }

    fn scheduler(feed: &Arc<StubFeed>, base: Arc<StreetGraph>) -> RefreshScheduler {
        RefreshScheduler::new_at(
            base,
            feed.clone(),
            WeightingConfig::default(),
            STALENESS,
            at(0),
        )
        .unwrap()
    }

    #[test]
    fn fresh_snapshot_is_reused() {
        let base = Arc::new(corridor_graph());
        let feed = StubFeed::new(&base, CongestionState::Fluid);
        let scheduler = scheduler(&feed, base);

        let first = scheduler.snapshot_at(at(10));
        let second = scheduler.snapshot_at(at(300));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(feed.fetches(), 1);
    }

    #[test]
    fn stale_snapshot_is_rebuilt_once() {
        let base = Arc::new(corridor_graph());
        let feed = StubFeed::new(&base, CongestionState::Fluid);
        let scheduler = scheduler(&feed, base);
        let old = scheduler.current();

        *feed.state.lock().unwrap() = CongestionState::Cut;
        let new = scheduler.snapshot_at(at(301));

        assert_eq!(feed.fetches(), 2);
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(new.built_at(), at(301));
        assert_eq!(bc_itime(&new), Itime::Impassable);
        // The old snapshot is untouched
        assert!(!bc_itime(&old).is_impassable());

        // Fresh again: no further fetch
        scheduler.snapshot_at(at(302));
        assert_eq!(feed.fetches(), 2);
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let base = Arc::new(corridor_graph());
        let feed = StubFeed::new(&base, CongestionState::Dense);
        let scheduler = scheduler(&feed, base);
        let old = scheduler.current();

        feed.fail.store(true, Ordering::SeqCst);
        let served = scheduler.snapshot_at(at(400));
        assert!(Arc::ptr_eq(&old, &served));
        assert!(!scheduler.is_rebuilding());

        // Still stale, so the next query retries
        feed.fail.store(false, Ordering::SeqCst);
        let retried = scheduler.snapshot_at(at(401));
        assert_eq!(feed.fetches(), 3);
        assert_eq!(retried.built_at(), at(401));
    }

    #[test]
    fn unreachable_feed_at_startup_serves_uncongested_graph() {
        let base = Arc::new(corridor_graph());
        let feed = StubFeed::new(&base, CongestionState::Cut);
        feed.fail.store(true, Ordering::SeqCst);
        let scheduler = scheduler(&feed, base);

        let snapshot = scheduler.current();
        assert!(!bc_itime(&snapshot).is_impassable());
        assert_eq!(snapshot.stats().segments, 0);

        feed.fail.store(false, Ordering::SeqCst);
        let refreshed = scheduler.snapshot_at(at(1));
        assert!(bc_itime(&refreshed).is_impassable());
    }

    #[test]
    fn concurrent_query_during_rebuild_is_coalesced() {
        let base = Arc::new(corridor_graph());
        let feed = StubFeed::new(&base, CongestionState::Fluid);
        let scheduler = Arc::new(scheduler(&feed, base));
        let old = scheduler.current();

        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        *feed.gate.lock().unwrap() = Some((entered.clone(), release.clone()));
        *feed.state.lock().unwrap() = CongestionState::Cut;

        let (sender, receiver) = mpsc::channel();
        let rebuilding = {
            let scheduler = scheduler.clone();
            thread::spawn(move || {
                sender.send(scheduler.snapshot_at(at(301))).unwrap();
            })
        };

        // The rebuild is now blocked inside the feed
        entered.wait();
        assert!(scheduler.is_rebuilding());
        let during = scheduler.snapshot_at(at(302));
        assert!(Arc::ptr_eq(&old, &during));
        assert!(!bc_itime(&during).is_impassable());

        release.wait();
        rebuilding.join().unwrap();
        let rebuilt = receiver.recv().unwrap();

        assert_eq!(feed.fetches(), 2);
        assert!(bc_itime(&rebuilt).is_impassable());
        assert!(Arc::ptr_eq(&rebuilt, &scheduler.current()));
    }

    #[test]
    fn invalid_weighting_is_rejected_before_fetching() {
        let base = Arc::new(corridor_graph());
        let feed = StubFeed::new(&base, CongestionState::Fluid);
        let weighting = WeightingConfig {
            fallback_factor: 0.0,
            ..WeightingConfig::default()
        };
        let result = RefreshScheduler::new_at(base, feed.clone(), weighting, STALENESS, at(0));
        assert!(matches!(result, Err(Error::InvalidData(_))));
        assert_eq!(feed.fetches(), 0);
    }

    #[test]
    fn refresh_now_ignores_age() {
        let base = Arc::new(corridor_graph());
        let feed = StubFeed::new(&base, CongestionState::Fluid);
        let scheduler = scheduler(&feed, base);

        *feed.state.lock().unwrap() = CongestionState::Congested;
        let refreshed = scheduler.refresh_now().unwrap();
        assert_eq!(feed.fetches(), 2);
        assert!(Arc::ptr_eq(&refreshed, &scheduler.current()));

        feed.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            scheduler.refresh_now(),
            Err(Error::DataFetch { .. })
        ));
        assert!(Arc::ptr_eq(&refreshed, &scheduler.current()));
    }
}
