//! # Bill Code Minter
//!
//! Draws `HD-NNNNNN` codes until one is free.
//!
//! ## Mint Loop
//! ```text
//!   attempt 1..=max_attempts
//!     serial ← CodeSource (uniform over 0..1_000_000)
//!     code   ← HD-{serial:06}
//!     taken? ──yes──► warn!, next attempt
//!       │no
//!       ▼
//!     return code
//!   ceiling reached ──► CodeSpaceExhausted
//! ```
//!
//! The check is advisory. `UNIQUE(code)` on `bills` is what actually keeps
//! codes distinct. When the insert still hits it, for instance because a
//! writer bypassed this minter, the engine mints again under the same
//! ceiling.

use std::fmt::Debug;
use std::sync::Arc;

use rand::Rng;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::repository::bill::BillRepository;
use crate::settlement::error::{SettlementError, SettlementResult};
use atelier_core::code::BILL_CODE_SPACE;
use atelier_core::BillCode;

/// Source of candidate serials.
pub trait CodeSource: Send + Sync + Debug {
    /// Next candidate serial. Values past the code space are wrapped.
    fn next_serial(&self) -> u32;
}

/// Uniform serials from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl CodeSource for ThreadRngSource {
    fn next_serial(&self) -> u32 {
        rand::thread_rng().gen_range(0..BILL_CODE_SPACE)
    }
}

/// Mints unused bill codes with a bounded number of draws.
#[derive(Debug, Clone)]
pub struct BillCodeMinter {
    source: Arc<dyn CodeSource>,
    max_attempts: u32,
}

impl BillCodeMinter {
    /// Creates a minter backed by [`ThreadRngSource`].
    pub fn new(max_attempts: u32) -> Self {
        Self::with_source(Arc::new(ThreadRngSource), max_attempts)
    }

    pub fn with_source(source: Arc<dyn CodeSource>, max_attempts: u32) -> Self {
        BillCodeMinter {
            source,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draws one candidate without checking it.
    pub fn candidate(&self) -> BillCode {
        BillCode::from_serial_wrapping(self.source.next_serial())
    }

    /// Mints a code not used by any bill visible on `conn`.
    ///
    /// ## Returns
    /// * `Err(SettlementError::CodeSpaceExhausted)` - every draw collided
    pub async fn mint_in(&self, conn: &mut SqliteConnection) -> SettlementResult<BillCode> {
        for attempt in 1..=self.max_attempts {
            let code = self.candidate();
            if !BillRepository::code_exists_in(conn, code.as_str()).await? {
                debug!(code = %code, attempt, "Minted bill code");
                return Ok(code);
            }
            warn!(code = %code, attempt, "Bill code collision");
        }

        warn!(attempts = self.max_attempts, "Bill code space exhausted");
        Err(SettlementError::CodeSpaceExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Mints a code on a pooled connection.
    pub async fn mint(&self, pool: &SqlitePool) -> SettlementResult<BillCode> {
        let mut conn = pool.acquire().await?;
        self.mint_in(&mut conn).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Replays a fixed list of serials, repeating the last one.
    #[derive(Debug)]
    pub(crate) struct SequenceSource {
        serials: Vec<u32>,
        next: AtomicUsize,
    }

    impl SequenceSource {
        pub(crate) fn new(serials: Vec<u32>) -> Self {
            SequenceSource {
                serials,
                next: AtomicUsize::new(0),
            }
        }
    }

    impl CodeSource for SequenceSource {
        fn next_serial(&self) -> u32 {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            let last = self.serials.len().saturating_sub(1);
            self.serials.get(i.min(last)).copied().unwrap_or(0)
        }
    }

    #[test]
    fn test_thread_rng_stays_in_code_space() {
        let source = ThreadRngSource;
        for _ in 0..1_000 {
            assert!(source.next_serial() < BILL_CODE_SPACE);
        }
        let code = BillCodeMinter::new(4).candidate();
        assert!(BillCode::parse(code.as_str()).is_ok());
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(BillCodeMinter::new(0).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_mint_on_empty_table() {
        let db = crate::repository::fixtures::db().await;
        let minter = BillCodeMinter::with_source(Arc::new(SequenceSource::new(vec![42])), 3);
        let code = minter.mint(db.pool()).await.unwrap();
        assert_eq!(code.as_str(), "HD-000042");
    }

    #[tokio::test]
    async fn test_wrapping_candidate() {
        let minter = BillCodeMinter::with_source(Arc::new(SequenceSource::new(vec![1_000_007])), 1);
        assert_eq!(minter.candidate().as_str(), "HD-000007");
    }
}
