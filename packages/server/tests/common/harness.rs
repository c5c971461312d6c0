//! Test harness backed by in-memory stores.
//!
//! Each test gets fresh stores; nothing is shared between tests.

use chrono::{DateTime, Duration, Utc};
use pairing_core::common::ParticipantId;
use pairing_core::domains::matching::actions::run_round_with;
use pairing_core::domains::matching::{MatchingSettings, RoundError, RoundOutcome, Shuffler};
use pairing_core::domains::participant::Participant;
use pairing_core::kernel::test_dependencies::{FixedOrder, TestDependencies};
use pairing_core::kernel::ServerDeps;
use test_context::AsyncTestContext;

pub struct TestHarness {
    pub stores: TestDependencies,
    pub deps: ServerDeps,
    pub settings: MatchingSettings,
    pub now: DateTime<Utc>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let stores = TestDependencies::new();
        let deps = stores.deps();
        Self {
            stores,
            deps,
            settings: MatchingSettings::default(),
            now: Utc::now(),
        }
    }
}

impl TestHarness {
    /// Register `n` eligible participants named P1..Pn
    pub fn add_participants(&self, n: usize) -> Vec<Participant> {
        (1..=n)
            .map(|i| self.stores.participants.add_named(&format!("P{}", i)))
            .collect()
    }

    /// Record a prior match between `a` and `b`, `days_ago` days before `now`
    pub fn matched_days_ago(&self, a: ParticipantId, b: ParticipantId, days_ago: i64) {
        self.stores
            .match_history
            .seed(a, b, self.now - Duration::days(days_ago));
    }

    /// Run a round keeping the store's candidate order
    pub async fn run_round(&self) -> Result<RoundOutcome, RoundError> {
        self.run_round_shuffled(FixedOrder).await
    }

    pub async fn run_round_shuffled<S: Shuffler>(
        &self,
        shuffler: S,
    ) -> Result<RoundOutcome, RoundError> {
        run_round_with(&self.deps, &self.settings, shuffler, self.now).await
    }

    pub fn participant(&self, id: ParticipantId) -> Participant {
        self.stores
            .participants
            .get(id)
            .expect("participant should exist")
    }

    /// Store calls that write: availability updates plus insert attempts
    pub fn write_count(&self) -> usize {
        self.stores.participants.availability_updates().len()
            + self.stores.match_history.insert_batches().len()
    }
}
