// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential → profile cache with an optional time-to-live.
//!
//! Lets a token plugin skip an expensive verification (e.g. a remote token
//! introspection call) when the same token was validated recently.
//!
//! ## Semantics
//!
//! - Without a TTL, entries live until evicted (capacity or [`TokenCache::evict`]).
//! - With a TTL, an entry older than the TTL is a miss. It is *not* removed
//!   on lookup; a later successful validation simply replaces it.
//! - Failures are never cached.
//!
//! ## Concurrency
//!
//! The map is split into shards, each behind its own mutex. Entries are
//! immutable and replaced as a whole, so readers never observe a partially
//! written entry; concurrent stores for the same key resolve last-writer-wins.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::outcome::{AuthOutcome, ResponseHints};
use super::UserProfile;

/// Default maximum number of cached tokens per cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

const SHARD_COUNT: usize = 16;

/// Cached entry: profile + creation timestamp.
struct CacheEntry {
    profile: UserProfile,
    created_at: Instant,
}

/// Why a token could not be turned into a profile.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenFailure {
    /// The token was understood but is not valid.
    Rejected(ResponseHints),
    /// The token could not be processed at all (malformed, or meant for
    /// another plugin).
    Unprocessable(String),
}

impl TokenFailure {
    /// Map an arbitrary error (e.g. a timed-out provider call) to a rejection.
    pub fn from_error(error: impl std::fmt::Display) -> Self {
        debug!(error = %error, "token verification failed");
        TokenFailure::Rejected(ResponseHints::default())
    }
}

impl AuthOutcome {
    /// Outcome for a token verification result; unprocessable tokens fail.
    pub fn from_token_result(result: Result<UserProfile, TokenFailure>) -> Self {
        match result {
            Ok(profile) => AuthOutcome::Success(profile),
            Err(TokenFailure::Rejected(hints)) => AuthOutcome::Failure(hints),
            Err(TokenFailure::Unprocessable(_)) => AuthOutcome::failure(),
        }
    }

    /// Like [`AuthOutcome::from_token_result`], but unprocessable tokens pass
    /// so that another plugin can try them.
    pub fn from_token_result_lenient(result: Result<UserProfile, TokenFailure>) -> Self {
        match result {
            Err(TokenFailure::Unprocessable(details)) => {
                trace!(details = %details, "token unprocessable, passing");
                AuthOutcome::pass()
            }
            other => AuthOutcome::from_token_result(other),
        }
    }
}

/// Sharded in-process cache of validated tokens.
pub struct TokenCache {
    shards: Box<[Mutex<LruCache<String, Arc<CacheEntry>>>]>,
    ttl: Option<Duration>,
}

impl TokenCache {
    /// Create a cache with the default capacity.
    ///
    /// `ttl`: how long a validated token is trusted; `None` keeps entries
    /// until they are evicted.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY, ttl)
    }

    /// Create a cache holding roughly `capacity` tokens.
    pub fn with_capacity(capacity: usize, ttl: Option<Duration>) -> Self {
        let per_shard = capacity.div_ceil(SHARD_COUNT).max(1);
        let per_shard = NonZeroUsize::new(per_shard).unwrap_or(NonZeroUsize::MIN);
        let shards = (0..SHARD_COUNT)
            .map(|_| Mutex::new(LruCache::new(per_shard)))
            .collect();
        Self { shards, ttl }
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn shard(&self, key: &str) -> &Mutex<LruCache<String, Arc<CacheEntry>>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            // A deadline past the clock's range never expires
            Some(ttl) => entry
                .created_at
                .checked_add(ttl)
                .map_or(true, |deadline| Instant::now() < deadline),
            None => true,
        }
    }

    /// Get the cached profile for a token.
    ///
    /// Returns `None` if not cached or expired.
    pub fn lookup(&self, key: &str) -> Option<UserProfile> {
        let entry = {
            let mut shard = self.shard(key).lock().ok()?;
            shard.get(key).cloned()
        }?;

        if self.is_fresh(&entry) {
            trace!("token cache hit");
            Some(entry.profile.clone())
        } else {
            trace!("token cache entry expired");
            None
        }
    }

    /// Store the profile for a token, replacing any previous entry.
    pub fn store(&self, key: &str, profile: UserProfile) {
        let entry = Arc::new(CacheEntry {
            profile,
            created_at: Instant::now(),
        });
        if let Ok(mut shard) = self.shard(key).lock() {
            shard.put(key.to_string(), entry);
        }
    }

    /// Return the cached profile, or run `generate` and cache its success.
    ///
    /// A failure from `generate` is returned as-is and not cached; it is
    /// not retried either.
    pub async fn get_or_generate<F, Fut>(
        &self,
        key: &str,
        generate: F,
    ) -> Result<UserProfile, TokenFailure>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<UserProfile, TokenFailure>>,
    {
        if let Some(profile) = self.lookup(key) {
            return Ok(profile);
        }

        let profile = generate(key.to_string()).await?;
        self.store(key, profile.clone());
        Ok(profile)
    }

    /// Drop the entry for a token. Returns whether one existed.
    pub fn evict(&self, key: &str) -> bool {
        self.shard(key)
            .lock()
            .ok()
            .and_then(|mut shard| shard.pop(key))
            .is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            if let Ok(mut shard) = shard.lock() {
                shard.clear();
            }
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .filter_map(|shard| shard.lock().ok().map(|s| s.len()))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(None)
    }
}
