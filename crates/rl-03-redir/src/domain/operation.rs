//! # ReDiR Operations
//!
//! Registration and lookup are pure state machines. Each call owns its own
//! operation object; the service drives it by fetching the bucket it asks
//! for and feeding back the registrants found there.
//!
//! ## Registration
//!
//! ```text
//! Upwalk (from L_start toward 0)          Downwalk (from L_start + 1)
//!   store at every level                     alone in bucket ─► store, Joined
//!   sandwiched or level 0 ─► Downwalk        extremal ───────► store, deeper
//!   otherwise ─► level - 1                   otherwise ──────► deeper
//! ```
//!
//! Every registrant stores at `L_start`, and the smallest and largest
//! registrant of each coarser bucket are stored there.
//!
//! ## Lookup
//!
//! Starts at `L_start`. Sandwiched keys descend, keys above every registrant
//! ascend. A level is never fetched twice; the answer is the closest
//! successor among every registrant seen, wrapping to the smallest.

use crate::domain::config::RedirConfig;
use crate::domain::partition::partition_index;
use shared_types::NodeId;
use std::collections::BTreeSet;
use std::fmt;

/// Phase of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirStatus {
    Idle,
    Upwalk,
    Downwalk,
    Joined,
    Lookup,
    Resolved,
    Failed,
}

impl fmt::Display for RedirStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Whether `key` has a registrant strictly below and strictly above it.
#[must_use]
pub fn is_sandwiched(key: &NodeId, registrants: &[NodeId]) -> bool {
    registrants.iter().any(|r| r < key) && registrants.iter().any(|r| r > key)
}

/// A bucket to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRef {
    pub level: u32,
    pub index: u64,
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// What the driver must do after feeding back a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterStep {
    /// Store a provider record in this bucket.
    pub store: Option<BucketRef>,
    /// Whether the registration is complete.
    pub done: bool,
}

/// One registration of `key` under a namespace.
#[derive(Debug, Clone)]
pub struct RegisterOperation {
    namespace: String,
    key: NodeId,
    level: u32,
    status: RedirStatus,
    starting_level: u32,
    max_level: u32,
    stored_levels: Vec<u32>,
}

impl RegisterOperation {
    /// Start an upward walk at `L_start`.
    #[must_use]
    pub fn new(namespace: impl Into<String>, key: NodeId, config: &RedirConfig) -> Self {
        Self {
            namespace: namespace.into(),
            key,
            level: config.starting_level,
            status: RedirStatus::Upwalk,
            starting_level: config.starting_level,
            max_level: config.max_level,
            stored_levels: Vec::new(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn key(&self) -> NodeId {
        self.key
    }

    #[must_use]
    pub fn status(&self) -> RedirStatus {
        self.status
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Levels a record was stored at, in order.
    #[must_use]
    pub fn stored_levels(&self) -> &[u32] {
        &self.stored_levels
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == RedirStatus::Joined
    }

    /// The bucket to fetch next.
    #[must_use]
    pub fn current_bucket(&self) -> BucketRef {
        BucketRef {
            level: self.level,
            index: partition_index(self.level, &self.key.0),
        }
    }

    /// Feed back the registrants of `current_bucket()`.
    pub fn on_fetched(&mut self, registrants: &[NodeId]) -> RegisterStep {
        let bucket = self.current_bucket();
        match self.status {
            RedirStatus::Upwalk => {
                self.stored_levels.push(bucket.level);
                let mut with_self = registrants.to_vec();
                with_self.push(self.key);
                if is_sandwiched(&self.key, &with_self) || bucket.level == 0 {
                    self.begin_downwalk();
                } else {
                    self.level -= 1;
                }
                RegisterStep {
                    store: Some(bucket),
                    done: self.is_done(),
                }
            }
            RedirStatus::Downwalk => {
                let alone = registrants.iter().all(|r| *r == self.key);
                let mut with_self = registrants.to_vec();
                with_self.push(self.key);
                let store = if alone || !is_sandwiched(&self.key, &with_self) {
                    self.stored_levels.push(bucket.level);
                    Some(bucket)
                } else {
                    None
                };
                if alone || bucket.level >= self.max_level {
                    self.status = RedirStatus::Joined;
                } else {
                    self.level += 1;
                }
                RegisterStep {
                    store,
                    done: self.is_done(),
                }
            }
            _ => RegisterStep {
                store: None,
                done: true,
            },
        }
    }

    fn begin_downwalk(&mut self) {
        if self.starting_level >= self.max_level {
            self.status = RedirStatus::Joined;
        } else {
            self.status = RedirStatus::Downwalk;
            self.level = self.starting_level + 1;
        }
    }
}

// =============================================================================
// LOOKUP
// =============================================================================

/// What the driver must do after feeding back a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStep {
    /// Fetch another bucket.
    Fetch(BucketRef),
    /// The closest registrant was found.
    Resolved(NodeId),
    /// No registrant was seen at all.
    Failed,
}

/// One lookup of `key` under a namespace.
#[derive(Debug, Clone)]
pub struct LookupOperation {
    namespace: String,
    key: NodeId,
    level: u32,
    status: RedirStatus,
    max_level: u32,
    visited: BTreeSet<u32>,
    seen: BTreeSet<NodeId>,
}

impl LookupOperation {
    /// Start at `L_start`.
    #[must_use]
    pub fn new(namespace: impl Into<String>, key: NodeId, config: &RedirConfig) -> Self {
        Self {
            namespace: namespace.into(),
            key,
            level: config.starting_level,
            status: RedirStatus::Lookup,
            max_level: config.max_level,
            visited: BTreeSet::new(),
            seen: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn key(&self) -> NodeId {
        self.key
    }

    #[must_use]
    pub fn status(&self) -> RedirStatus {
        self.status
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Levels fetched so far.
    #[must_use]
    pub fn visited_levels(&self) -> Vec<u32> {
        self.visited.iter().copied().collect()
    }

    /// The bucket to fetch next.
    #[must_use]
    pub fn current_bucket(&self) -> BucketRef {
        BucketRef {
            level: self.level,
            index: partition_index(self.level, &self.key.0),
        }
    }

    /// Feed back the registrants of `current_bucket()`.
    pub fn on_fetched(&mut self, registrants: &[NodeId]) -> LookupStep {
        self.visited.insert(self.level);
        self.seen.extend(registrants.iter().copied());

        let beyond_all = registrants.iter().all(|r| *r < self.key);
        let next = if is_sandwiched(&self.key, registrants)
            && self.level > 0
            && self.level < self.max_level
        {
            Some(self.level + 1)
        } else if beyond_all && self.level > 0 {
            Some(self.level - 1)
        } else {
            None
        };

        match next {
            Some(level) if !self.visited.contains(&level) => {
                self.level = level;
                LookupStep::Fetch(self.current_bucket())
            }
            _ => self.finish(),
        }
    }

    fn finish(&mut self) -> LookupStep {
        let answer = self
            .seen
            .range(self.key..)
            .next()
            .or_else(|| self.seen.iter().next())
            .copied();
        match answer {
            Some(node_id) => {
                self.status = RedirStatus::Resolved;
                LookupStep::Resolved(node_id)
            }
            None => {
                self.status = RedirStatus::Failed;
                LookupStep::Failed
            }
        }
    }
}
