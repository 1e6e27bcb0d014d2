//! Random identifier and delete-token generation.

use std::sync::Arc;

use dashmap::DashSet;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use upd_records::RecordStore;

use crate::error::EngineError;

/// Length of a public identifier.
pub const ID_LENGTH: usize = 8;

/// Length of a delete token.
pub const TOKEN_LENGTH: usize = 16;

/// Default number of candidates drawn before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 32;

/// Configuration for the [`IdAllocator`].
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    pub id_length: usize,
    pub token_length: usize,
    /// Collision retry budget for a single allocation.
    pub max_attempts: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            id_length: ID_LENGTH,
            token_length: TOKEN_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Draws identifiers and delete tokens uniformly from the 62-symbol
/// alphanumeric alphabet.
///
/// The generator is seeded once, when the allocator is created. Identifiers
/// whose ingest is still in flight are held in a reservation set so two
/// concurrent ingests can never be handed the same identifier, even before
/// either record reaches the store.
#[derive(Debug)]
pub struct IdAllocator {
    config: AllocatorConfig,
    rng: Mutex<StdRng>,
    pending: Arc<DashSet<String>>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(AllocatorConfig::default())
    }
}

impl IdAllocator {
    /// Create an allocator seeded from the operating system's entropy source.
    pub fn new(config: AllocatorConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an allocator with a fixed seed. Sequences are reproducible.
    pub fn with_seed(config: AllocatorConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: AllocatorConfig, rng: StdRng) -> Self {
        Self {
            config,
            rng: Mutex::new(rng),
            pending: Arc::default(),
        }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    fn draw(&self, len: usize) -> String {
        let mut rng = self.rng.lock();
        (&mut *rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    /// Draw a fresh delete token. Tokens are never checked for uniqueness.
    pub fn new_delete_token(&self) -> String {
        self.draw(self.config.token_length)
    }

    /// Reserve an identifier that is neither present in `records` nor held
    /// by another in-flight reservation.
    ///
    /// The reservation is released when the returned guard is dropped, which
    /// callers should do only after the record has been stored (or the ingest
    /// abandoned).
    pub async fn reserve(&self, records: &dyn RecordStore) -> Result<Reservation, EngineError> {
        for attempt in 1..=self.config.max_attempts {
            let candidate = self.draw(self.config.id_length);
            if !self.pending.insert(candidate.clone()) {
                debug!(attempt, "identifier already reserved, redrawing");
                continue;
            }
            let reservation = Reservation {
                id: candidate,
                pending: Arc::clone(&self.pending),
            };
            if records.contains(&reservation.id).await? {
                debug!(attempt, "identifier already stored, redrawing");
                continue;
            }
            return Ok(reservation);
        }
        Err(EngineError::NamespaceExhausted {
            attempts: self.config.max_attempts,
        })
    }

    /// Number of identifiers currently reserved.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// An identifier held exclusively until dropped.
#[derive(Debug)]
pub struct Reservation {
    id: String,
    pending: Arc<DashSet<String>>,
}

impl Reservation {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use upd_records::testing::test_record;
    use upd_records_memory::MemoryRecordStore;

    use super::*;

    fn is_alphanumeric(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_alphanumeric())
    }

    #[tokio::test]
    async fn identifiers_have_expected_shape() {
        let allocator = IdAllocator::default();
        let store = MemoryRecordStore::new();

        let reservation = allocator.reserve(&store).await.unwrap();
        assert_eq!(reservation.id().len(), ID_LENGTH);
        assert!(is_alphanumeric(reservation.id()));

        let token = allocator.new_delete_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(is_alphanumeric(&token));
    }

    #[tokio::test]
    async fn reservation_is_released_on_drop() {
        let allocator = IdAllocator::default();
        let store = MemoryRecordStore::new();

        let reservation = allocator.reserve(&store).await.unwrap();
        assert_eq!(allocator.pending(), 1);
        drop(reservation);
        assert_eq!(allocator.pending(), 0);
    }

    #[tokio::test]
    async fn live_reservations_are_distinct() {
        let allocator = IdAllocator::new(AllocatorConfig {
            id_length: 2,
            ..AllocatorConfig::default()
        });
        let store = MemoryRecordStore::new();

        let mut held = Vec::new();
        for _ in 0..200 {
            held.push(allocator.reserve(&store).await.unwrap());
        }
        let ids: HashSet<&str> = held.iter().map(Reservation::id).collect();
        assert_eq!(ids.len(), held.len());
    }

    #[tokio::test]
    async fn skips_identifiers_already_stored() {
        let config = AllocatorConfig::default();
        let store = MemoryRecordStore::new();

        // Same seed, so the first candidate of `allocator` is `taken`.
        let taken = IdAllocator::with_seed(config.clone(), 7)
            .reserve(&store)
            .await
            .unwrap()
            .id()
            .to_owned();
        store.put(&test_record(&taken)).await.unwrap();

        let allocator = IdAllocator::with_seed(config, 7);
        let reservation = allocator.reserve(&store).await.unwrap();
        assert_ne!(reservation.id(), taken);
    }

    #[tokio::test]
    async fn exhausted_namespace_fails_instead_of_spinning() {
        let allocator = IdAllocator::new(AllocatorConfig {
            id_length: 1,
            max_attempts: 16,
            ..AllocatorConfig::default()
        });
        let store = MemoryRecordStore::new();
        for c in ('a'..='z').chain('A'..='Z').chain('0'..='9') {
            store.put(&test_record(&c.to_string())).await.unwrap();
        }

        let err = allocator.reserve(&store).await.unwrap_err();
        assert!(matches!(err, EngineError::NamespaceExhausted { attempts: 16 }));
        assert_eq!(allocator.pending(), 0);
    }

    #[test]
    fn seeded_allocators_are_reproducible() {
        let a = IdAllocator::with_seed(AllocatorConfig::default(), 42);
        let b = IdAllocator::with_seed(AllocatorConfig::default(), 42);
        assert_eq!(a.new_delete_token(), b.new_delete_token());
    }
}
