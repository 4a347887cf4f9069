use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::common::{FrameId, HeapDbError, Timestamp};

/// Rule used to pick a victim among the unpinned frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReplacementPolicy {
    /// Evict the frame whose last access is the oldest
    #[default]
    Lru,
    /// Evict the frame whose last access is the most recent
    Mru,
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementPolicy::Lru => write!(f, "LRU"),
            ReplacementPolicy::Mru => write!(f, "MRU"),
        }
    }
}

impl FromStr for ReplacementPolicy {
    type Err = HeapDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LRU" => Ok(ReplacementPolicy::Lru),
            "MRU" => Ok(ReplacementPolicy::Mru),
            other => Err(HeapDbError::ConfigInvalid(format!(
                "unknown replacement policy `{}`",
                other
            ))),
        }
    }
}

/// Tracks the last access of a single frame
#[derive(Debug, Clone, Copy)]
struct FrameAccessInfo {
    /// Sequence number of the most recent pin or unpin
    last_access: Timestamp,
    /// Whether this frame is currently evictable
    is_evictable: bool,
}

/// Victim selector over the frames of a buffer pool.
///
/// Every frame the pool has handed out carries the sequence number of its last
/// access. Only frames marked evictable (pin count 0) are candidates. With
/// [`ReplacementPolicy::Lru`] the smallest sequence number wins, with
/// [`ReplacementPolicy::Mru`] the largest; ties go to the lowest frame index.
pub struct Replacer {
    /// Active eviction rule
    policy: Mutex<ReplacementPolicy>,
    /// Monotonic access counter
    current_timestamp: AtomicU64,
    /// Access information, indexed by frame ID
    frame_info: Mutex<Vec<Option<FrameAccessInfo>>>,
}

impl Replacer {
    /// Creates a replacer able to track `num_frames` frames.
    pub fn new(policy: ReplacementPolicy, num_frames: usize) -> Self {
        Self {
            policy: Mutex::new(policy),
            current_timestamp: AtomicU64::new(0),
            frame_info: Mutex::new(vec![None; num_frames]),
        }
    }

    /// Picks and forgets a victim according to the active policy.
    /// Returns None if no frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let policy = *self.policy.lock();
        let mut frame_info = self.frame_info.lock();

        let mut victim: Option<(usize, Timestamp)> = None;
        for (idx, info) in frame_info.iter().enumerate() {
            let Some(info) = info.filter(|i| i.is_evictable) else {
                continue;
            };
            let better = match victim {
                None => true,
                Some((_, best)) => match policy {
                    ReplacementPolicy::Lru => info.last_access < best,
                    ReplacementPolicy::Mru => info.last_access > best,
                },
            };
            if better {
                victim = Some((idx, info.last_access));
            }
        }

        victim.map(|(idx, _)| {
            frame_info[idx] = None;
            FrameId::new(idx as u32)
        })
    }

    /// Stamps the frame with the next access sequence number.
    pub fn record_access(&self, frame_id: FrameId) {
        let timestamp = self.current_timestamp.fetch_add(1, Ordering::Relaxed);
        let mut frame_info = self.frame_info.lock();

        if let Some(entry) = frame_info.get_mut(frame_id.as_usize()) {
            match entry {
                Some(info) => info.last_access = timestamp,
                None => {
                    *entry = Some(FrameAccessInfo {
                        last_access: timestamp,
                        is_evictable: false,
                    })
                }
            }
        }
    }

    /// Sets whether a frame may be chosen as a victim.
    /// A frame that was never accessed is ignored.
    pub fn set_evictable(&self, frame_id: FrameId, is_evictable: bool) {
        let mut frame_info = self.frame_info.lock();
        if let Some(Some(info)) = frame_info.get_mut(frame_id.as_usize()) {
            info.is_evictable = is_evictable;
        }
    }

    /// Forgets a frame entirely, e.g. after its page was deleted.
    pub fn remove(&self, frame_id: FrameId) {
        if let Some(entry) = self.frame_info.lock().get_mut(frame_id.as_usize()) {
            *entry = None;
        }
    }

    /// Forgets every frame.
    pub fn clear(&self) {
        self.frame_info.lock().iter_mut().for_each(|e| *e = None);
    }

    /// Sequence number of the frame's last access, if it is tracked.
    pub fn last_access(&self, frame_id: FrameId) -> Option<Timestamp> {
        self.frame_info
            .lock()
            .get(frame_id.as_usize())
            .copied()
            .flatten()
            .map(|info| info.last_access)
    }

    /// Returns the number of evictable frames.
    pub fn size(&self) -> usize {
        self.frame_info
            .lock()
            .iter()
            .flatten()
            .filter(|i| i.is_evictable)
            .count()
    }

    pub fn policy(&self) -> ReplacementPolicy {
        *self.policy.lock()
    }

    /// Switches the eviction rule. Recorded accesses are kept.
    pub fn set_policy(&self, policy: ReplacementPolicy) {
        *self.policy.lock() = policy;
    }
}
