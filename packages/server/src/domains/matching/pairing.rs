//! Pairing engine - greedy, randomized, single pass.
//!
//! Candidates are shuffled once, then scanned in order. Each unmatched candidate
//! takes the first later unmatched candidate it was not recently paired with.
//! There is no backtracking, so a candidate can stay unmatched even when a
//! perfect matching exists under the recency constraint.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use tracing::debug;

use crate::common::ParticipantId;
use crate::domains::matching::recency::RecencyCheck;
use crate::domains::participant::models::Participant;

/// Source of the candidate permutation
pub trait Shuffler: Send {
    fn shuffle<T>(&mut self, items: &mut [T]);
}

/// Fisher–Yates shuffle over an unbiased RNG
pub struct FisherYates<R = ChaCha8Rng> {
    rng: R,
}

impl FisherYates<ChaCha8Rng> {
    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Seeded when a seed is configured, entropy otherwise
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> FisherYates<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> Shuffler for FisherYates<R> {
    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            items.swap(i, j);
        }
    }
}

/// Pairs found by one scan, plus the candidates left over
#[derive(Debug, Default)]
pub struct Pairing {
    pub pairs: Vec<(Participant, Participant)>,
    pub unmatched: Vec<Participant>,
}

pub struct PairingEngine<S> {
    shuffler: S,
}

impl<S: Shuffler> PairingEngine<S> {
    pub fn new(shuffler: S) -> Self {
        Self { shuffler }
    }

    /// Shuffle the candidates and greedily pair them.
    ///
    /// Recency checks are issued one at a time in scan order. Fewer than two
    /// candidates returns immediately without any check.
    pub async fn pair(
        &mut self,
        mut candidates: Vec<Participant>,
        recency: &dyn RecencyCheck,
    ) -> Pairing {
        if candidates.len() < 2 {
            return Pairing {
                pairs: Vec::new(),
                unmatched: candidates,
            };
        }

        self.shuffler.shuffle(&mut candidates);

        let mut matched: HashSet<ParticipantId> = HashSet::new();
        let mut index_pairs: Vec<(usize, usize)> = Vec::new();

        for i in 0..candidates.len() {
            let id_i = candidates[i].id;
            if matched.contains(&id_i) {
                continue;
            }

            for j in (i + 1)..candidates.len() {
                let id_j = candidates[j].id;
                if id_j == id_i || matched.contains(&id_j) {
                    continue;
                }

                if !recency.is_recent(id_i, id_j).await {
                    debug!("Paired {} with {}", id_i, id_j);
                    matched.insert(id_i);
                    matched.insert(id_j);
                    index_pairs.push((i, j));
                    break;
                }
            }
        }

        let mut slots: Vec<Option<Participant>> = candidates.into_iter().map(Some).collect();
        let pairs = index_pairs
            .into_iter()
            .filter_map(|(i, j)| Some((slots[i].take()?, slots[j].take()?)))
            .collect();
        let unmatched = slots.into_iter().flatten().collect();

        Pairing { pairs, unmatched }
    }
}
