// TestDependencies - in-memory implementations for testing
//
// Provides store doubles that record every call and can be told to fail, so
// rounds can be driven end-to-end without a database.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{
    BaseMatchHistoryStore, BaseParticipantStore, BaseRoundLock, RoundLease, ServerDeps,
    StoreError, StoreResult,
};
use crate::common::{MatchId, ParticipantId};
use crate::domains::matching::models::{MatchRecord, NewMatchRecord};
use crate::domains::matching::pairing::Shuffler;
use crate::domains::matching::recency::RecencyCheck;
use crate::domains::participant::models::{NewParticipant, Participant, ProfileUpdate};

// =============================================================================
// Fixtures
// =============================================================================

/// An available, unbanned participant whose display name and external id
/// derive from `name`
pub fn participant_named(name: &str) -> Participant {
    Participant {
        id: ParticipantId::new(),
        external_id: format!("ext-{}", name.to_lowercase()),
        username: Some(name.to_lowercase()),
        display_name: name.to_string(),
        role_title: "Engineer".to_string(),
        organization: "Community".to_string(),
        available: true,
        banned: false,
        created_at: Utc::now(),
    }
}

/// Shuffler that keeps the candidates in the order the store returned them
pub struct FixedOrder;

impl Shuffler for FixedOrder {
    fn shuffle<T>(&mut self, _items: &mut [T]) {}
}

/// Recency check answering from a fixed set of unordered pairs
pub struct RecentPairs {
    pairs: HashSet<(ParticipantId, ParticipantId)>,
    checks: AtomicUsize,
}

impl RecentPairs {
    pub fn none() -> Self {
        Self::of(&[])
    }

    pub fn of(pairs: &[(ParticipantId, ParticipantId)]) -> Self {
        Self {
            pairs: pairs.iter().map(|&(a, b)| ordered(a, b)).collect(),
            checks: AtomicUsize::new(0),
        }
    }

    /// Number of recency checks made so far
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

fn ordered(a: ParticipantId, b: ParticipantId) -> (ParticipantId, ParticipantId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[async_trait]
impl RecencyCheck for RecentPairs {
    async fn is_recent(&self, a: ParticipantId, b: ParticipantId) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.pairs.contains(&ordered(a, b))
    }
}

// =============================================================================
// In-memory participant store
// =============================================================================

pub struct InMemoryParticipantStore {
    participants: Mutex<Vec<Participant>>,
    availability_updates: Mutex<Vec<(ParticipantId, bool)>>,
    failing_updates: Mutex<HashSet<ParticipantId>>,
    vanishing: Mutex<HashSet<ParticipantId>>,
    fail_listing: AtomicBool,
    calls: AtomicUsize,
}

impl Default for InMemoryParticipantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryParticipantStore {
    pub fn new() -> Self {
        Self {
            participants: Mutex::new(Vec::new()),
            availability_updates: Mutex::new(Vec::new()),
            failing_updates: Mutex::new(HashSet::new()),
            vanishing: Mutex::new(HashSet::new()),
            fail_listing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn add(&self, participant: Participant) -> Participant {
        self.participants.lock().unwrap().push(participant.clone());
        participant
    }

    pub fn add_named(&self, name: &str) -> Participant {
        self.add(participant_named(name))
    }

    pub fn all(&self) -> Vec<Participant> {
        self.participants.lock().unwrap().clone()
    }

    pub fn get(&self, id: ParticipantId) -> Option<Participant> {
        self.participants
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// Set availability directly, without recording a store call
    pub fn force_availability(&self, id: ParticipantId, available: bool) {
        self.modify(id, |p| p.available = available);
    }

    /// Set the ban flag directly, without recording a store call
    pub fn force_banned(&self, id: ParticipantId, banned: bool) {
        self.modify(id, |p| p.banned = banned);
    }

    /// Make `list_eligible_participants` fail
    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    /// Make `set_availability` fail for this participant
    pub fn fail_availability_updates_for(&self, id: ParticipantId) {
        self.failing_updates.lock().unwrap().insert(id);
    }

    /// Delete this participant right after it is next listed as eligible, so
    /// later updates for it fail with `NotFound`
    pub fn remove_after_listing(&self, id: ParticipantId) {
        self.vanishing.lock().unwrap().insert(id);
    }

    /// Successful `set_availability` calls, in order
    pub fn availability_updates(&self) -> Vec<(ParticipantId, bool)> {
        self.availability_updates.lock().unwrap().clone()
    }

    /// Every store call, successful or not
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn modify(&self, id: ParticipantId, f: impl FnOnce(&mut Participant)) -> Option<Participant> {
        let mut participants = self.participants.lock().unwrap();
        let participant = participants.iter_mut().find(|p| p.id == id)?;
        f(participant);
        Some(participant.clone())
    }
}

#[async_trait]
impl BaseParticipantStore for InMemoryParticipantStore {
    async fn list_eligible_participants(&self) -> StoreResult<Vec<Participant>> {
        self.record_call();
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(anyhow!("participant store offline")));
        }
        let mut participants = self.participants.lock().unwrap();
        let eligible: Vec<Participant> =
            participants.iter().filter(|p| p.is_eligible()).cloned().collect();

        let vanishing = self.vanishing.lock().unwrap();
        participants.retain(|p| !vanishing.contains(&p.id));
        Ok(eligible)
    }

    async fn set_availability(
        &self,
        participant_id: ParticipantId,
        available: bool,
    ) -> StoreResult<Participant> {
        self.record_call();
        if self.failing_updates.lock().unwrap().contains(&participant_id) {
            return Err(StoreError::Unavailable(anyhow!(
                "timed out updating {}",
                participant_id
            )));
        }
        let updated = self
            .modify(participant_id, |p| p.available = available)
            .ok_or(StoreError::NotFound(participant_id))?;
        self.availability_updates
            .lock()
            .unwrap()
            .push((participant_id, available));
        Ok(updated)
    }

    async fn list_participants(&self) -> StoreResult<Vec<Participant>> {
        self.record_call();
        Ok(self.all())
    }

    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<Participant>> {
        self.record_call();
        Ok(self
            .participants
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.external_id == external_id)
            .cloned())
    }

    async fn insert_participant(&self, participant: NewParticipant) -> StoreResult<Participant> {
        self.record_call();
        Ok(self.add(Participant {
            id: ParticipantId::new(),
            external_id: participant.external_id,
            username: participant.username,
            display_name: participant.display_name,
            role_title: participant.role_title,
            organization: participant.organization,
            available: true,
            banned: false,
            created_at: Utc::now(),
        }))
    }

    async fn set_banned(
        &self,
        participant_id: ParticipantId,
        banned: bool,
    ) -> StoreResult<Participant> {
        self.record_call();
        self.modify(participant_id, |p| p.banned = banned)
            .ok_or(StoreError::NotFound(participant_id))
    }

    async fn update_profile(
        &self,
        participant_id: ParticipantId,
        update: ProfileUpdate,
    ) -> StoreResult<Participant> {
        self.record_call();
        self.modify(participant_id, |p| update.apply_to(p))
            .ok_or(StoreError::NotFound(participant_id))
    }
}

// =============================================================================
// In-memory match history store
// =============================================================================

pub struct InMemoryMatchHistoryStore {
    records: Mutex<Vec<MatchRecord>>,
    lookups: Mutex<Vec<ParticipantId>>,
    insert_batches: Mutex<Vec<Vec<NewMatchRecord>>>,
    failing_lookups: Mutex<HashSet<ParticipantId>>,
    fail_inserts: AtomicBool,
    lookup_delay: Mutex<Option<Duration>>,
}

impl Default for InMemoryMatchHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMatchHistoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            lookups: Mutex::new(Vec::new()),
            insert_batches: Mutex::new(Vec::new()),
            failing_lookups: Mutex::new(HashSet::new()),
            fail_inserts: AtomicBool::new(false),
            lookup_delay: Mutex::new(None),
        }
    }

    /// Add a prior match directly, without recording a store call
    pub fn seed(&self, a: ParticipantId, b: ParticipantId, created_at: DateTime<Utc>) -> MatchRecord {
        let record = MatchRecord {
            id: MatchId::new(),
            participant_a_id: a,
            participant_b_id: b,
            created_at,
        };
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn records(&self) -> Vec<MatchRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Make history lookups for this participant fail
    pub fn fail_lookups_for(&self, id: ParticipantId) {
        self.failing_lookups.lock().unwrap().insert(id);
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    /// Sleep before answering every lookup
    pub fn delay_lookups(&self, delay: Duration) {
        *self.lookup_delay.lock().unwrap() = Some(delay);
    }

    /// Participants looked up, in order
    pub fn lookups(&self) -> Vec<ParticipantId> {
        self.lookups.lock().unwrap().clone()
    }

    /// Every attempted batch insert, including failed ones
    pub fn insert_batches(&self) -> Vec<Vec<NewMatchRecord>> {
        self.insert_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseMatchHistoryStore for InMemoryMatchHistoryStore {
    async fn list_recent_matches_for(
        &self,
        participant_id: ParticipantId,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<MatchRecord>> {
        self.lookups.lock().unwrap().push(participant_id);

        let delay = *self.lookup_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_lookups.lock().unwrap().contains(&participant_id) {
            return Err(StoreError::Unavailable(anyhow!(
                "history lookup for {} failed",
                participant_id
            )));
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.involves(participant_id) && r.created_at >= since)
            .cloned()
            .collect())
    }

    async fn list_matches_for(&self, participant_id: ParticipantId) -> StoreResult<Vec<MatchRecord>> {
        let mut records: Vec<MatchRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.involves(participant_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn insert_match_records(
        &self,
        batch: Vec<NewMatchRecord>,
    ) -> StoreResult<Vec<MatchRecord>> {
        self.insert_batches.lock().unwrap().push(batch.clone());
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(anyhow!("match history insert rejected")));
        }

        let mut records = self.records.lock().unwrap();
        let floor = records.iter().map(|r| r.created_at).max();
        let created_at = floor.map_or_else(Utc::now, |last| last.max(Utc::now()));

        let inserted: Vec<MatchRecord> = batch
            .into_iter()
            .map(|new| MatchRecord {
                id: MatchId::new(),
                participant_a_id: new.participant_a_id,
                participant_b_id: new.participant_b_id,
                created_at,
            })
            .collect();
        records.extend(inserted.iter().cloned());
        Ok(inserted)
    }
}

// =============================================================================
// In-memory round lock
// =============================================================================

/// Round lock local to the test; `hold_elsewhere` plays another process
#[derive(Default)]
pub struct InMemoryRoundLock {
    held: Arc<AtomicBool>,
    fail_acquire: AtomicBool,
    acquisitions: AtomicUsize,
}

impl InMemoryRoundLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the lock as taken by a holder that never releases it
    pub fn hold_elsewhere(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn fail_acquire(&self) {
        self.fail_acquire.store(true, Ordering::SeqCst);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Successful acquisitions so far
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseRoundLock for InMemoryRoundLock {
    async fn try_acquire(&self) -> StoreResult<Option<Box<dyn RoundLease>>> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(anyhow!("lock backend offline")));
        }
        if self
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(None);
        }
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(InMemoryRoundLease {
            held: self.held.clone(),
        })))
    }
}

struct InMemoryRoundLease {
    held: Arc<AtomicBool>,
}

#[async_trait]
impl RoundLease for InMemoryRoundLease {
    async fn release(self: Box<Self>) -> StoreResult<()> {
        self.held.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// In-memory stores plus the `ServerDeps` wired to them
pub struct TestDependencies {
    pub participants: Arc<InMemoryParticipantStore>,
    pub match_history: Arc<InMemoryMatchHistoryStore>,
    pub round_lock: Arc<InMemoryRoundLock>,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            participants: Arc::new(InMemoryParticipantStore::new()),
            match_history: Arc::new(InMemoryMatchHistoryStore::new()),
            round_lock: Arc::new(InMemoryRoundLock::new()),
        }
    }

    pub fn deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.participants.clone(),
            self.match_history.clone(),
            self.round_lock.clone(),
        )
    }
}
