//! Layered duplicate detection.
//!
//! Every trade carries one or two identity keys (see [`identity_keys`]).
//! In-file dedup pools all keys into one seen-set; storage dedup asks the
//! repository for a batched lookup and fails open when it can't answer.

pub mod keys;

pub use keys::{identity_keys, IdentityKey};

use journal_core::{CanonicalTrade, DuplicateMatch, MatchType, TradeRepository};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct BatchDedup {
    pub unique: Vec<CanonicalTrade>,
    pub duplicates: Vec<CanonicalTrade>,
}

/// Split a batch into first occurrences and later duplicates, input order
/// preserved. A trade is a duplicate if any of its keys was already seen.
pub fn dedupe_within_batch(trades: Vec<CanonicalTrade>) -> BatchDedup {
    let mut seen: HashSet<IdentityKey> = HashSet::new();
    let mut result = BatchDedup::default();

    for trade in trades {
        let keys = identity_keys(&trade);
        if keys.iter().any(|k| seen.contains(k)) {
            debug!("In-file duplicate: {} {} at {}", trade.symbol, trade.side, trade.datetime);
            result.duplicates.push(trade);
            continue;
        }
        seen.extend(keys);
        result.unique.push(trade);
    }

    result
}

/// Key index over already-persisted trades, used by repositories to answer
/// batched duplicate lookups.
#[derive(Debug, Default)]
pub struct StoredKeyIndex {
    keys: HashMap<IdentityKey, MatchType>,
}

impl StoredKeyIndex {
    pub fn build<'a>(stored: impl IntoIterator<Item = &'a CanonicalTrade>) -> Self {
        let mut keys = HashMap::new();
        for trade in stored {
            for key in identity_keys(trade) {
                let match_type = key.match_type();
                keys.entry(key).or_insert(match_type);
            }
        }
        Self { keys }
    }

    /// Strongest matching key type for a candidate, if any.
    pub fn lookup(&self, trade: &CanonicalTrade) -> Option<MatchType> {
        identity_keys(trade)
            .iter()
            .find_map(|k| self.keys.get(k).copied())
    }

    pub fn matches(&self, candidates: &[CanonicalTrade]) -> Vec<DuplicateMatch> {
        candidates
            .iter()
            .enumerate()
            .map(|(trade_index, trade)| {
                let match_type = self.lookup(trade);
                DuplicateMatch {
                    trade_index,
                    is_duplicate: match_type.is_some(),
                    match_type,
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StorageDedup {
    pub unique: Vec<CanonicalTrade>,
    pub duplicate_count: usize,
    /// Set when the lookup failed and every trade was assumed unique.
    pub lookup_error: Option<String>,
}

/// Drop trades that already exist in the journal.
///
/// A failed lookup fails open: all trades are kept and `lookup_error` is
/// set so the caller can report it.
pub async fn dedupe_against_storage(
    repo: &dyn TradeRepository,
    journal_id: i64,
    trades: Vec<CanonicalTrade>,
) -> StorageDedup {
    if trades.is_empty() {
        return StorageDedup::default();
    }

    let matches = match repo.find_duplicates(journal_id, &trades).await {
        Ok(m) => m,
        Err(e) => {
            warn!("Duplicate lookup failed for journal {}, assuming unique: {}", journal_id, e);
            return StorageDedup {
                unique: trades,
                duplicate_count: 0,
                lookup_error: Some(e.to_string()),
            };
        }
    };

    let duplicate_indexes: HashSet<usize> = matches
        .iter()
        .filter(|m| m.is_duplicate && m.trade_index < trades.len())
        .map(|m| m.trade_index)
        .collect();

    let mut unique = Vec::with_capacity(trades.len() - duplicate_indexes.len());
    for (i, trade) in trades.into_iter().enumerate() {
        if !duplicate_indexes.contains(&i) {
            unique.push(trade);
        }
    }

    StorageDedup {
        unique,
        duplicate_count: duplicate_indexes.len(),
        lookup_error: None,
    }
}
