//! Request identifiers
//!
//! Ids are `<unix-millis>-<seq>` with a zero-padded per-millisecond
//! counter. Issuance is serialized behind one mutex, and ids from one
//! allocator are strictly increasing even when the wall clock steps back.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Serialize, Serializer};

/// Identifier of one accepted intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId {
    millis: u64,
    seq: u32,
}

impl RequestId {
    pub fn new(millis: u64, seq: u32) -> Self {
        Self { millis, seq }
    }

    pub fn millis(&self) -> u64 {
        self.millis
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Issue time encoded in the id
    pub fn created_at(&self) -> DateTime<Utc> {
        i64::try_from(self.millis)
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or_default()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}", self.millis, self.seq)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid request id: {0}")]
pub struct ParseRequestIdError(String);

impl FromStr for RequestId {
    type Err = ParseRequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseRequestIdError(s.to_string());
        let (millis, seq) = s.split_once('-').ok_or_else(invalid)?;

        Ok(Self {
            millis: millis.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

fn system_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Issues unique, ordered request ids
pub struct RequestIdAllocator {
    last: Mutex<RequestId>,
    clock: Clock,
}

impl fmt::Debug for RequestIdAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdAllocator").field("last", &self.last).finish()
    }
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdAllocator {
    /// Allocator driven by the system clock
    pub fn new() -> Self {
        Self::with_clock(system_millis)
    }

    /// Allocator driven by a custom millisecond clock
    pub fn with_clock(clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self {
            last: Mutex::new(RequestId::new(0, 0)),
            clock: Box::new(clock),
        }
    }

    /// Issue the next id
    pub fn allocate(&self) -> RequestId {
        let now = (self.clock)();
        // The guarded value is a plain Copy pair, still valid after a panic elsewhere
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let next = if now > last.millis {
            RequestId::new(now, 1)
        } else if last.seq == u32::MAX {
            RequestId::new(last.millis + 1, 1)
        } else {
            RequestId::new(last.millis, last.seq + 1)
        };

        *last = next;
        next
    }
}
