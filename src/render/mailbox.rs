// Render mailbox - single-slot, last-write-wins request queue per instance

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::RenderError;

use super::snapshot::{InstanceId, RenderSnapshot};

/// A posted snapshot stamped with its post order
///
/// Sequences grow across the whole mailbox, so a larger sequence is always
/// the more recent request for the same instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRequest {
    pub sequence: u64,
    pub snapshot: RenderSnapshot,
}

/// Pending render requests, at most one per instance
#[derive(Debug, Default)]
pub struct RenderMailbox {
    slots: Mutex<HashMap<InstanceId, PendingRequest>>,
    next_sequence: AtomicU64,
}

impl RenderMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_slots(&self) -> Result<MutexGuard<'_, HashMap<InstanceId, PendingRequest>>, RenderError> {
        self.slots.lock().map_err(|_| RenderError::LockPoisoned {
            component: "render_mailbox".to_string(),
        })
    }

    /// Store `snapshot` as the pending request for `id`
    ///
    /// Returns `true` when an unprocessed request was overwritten.
    pub fn post(&self, id: InstanceId, snapshot: RenderSnapshot) -> Result<bool, RenderError> {
        let mut slots = self.lock_slots()?;
        // stamped under the lock so post order and sequence order agree
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(slots.insert(id, PendingRequest { sequence, snapshot }).is_some())
    }

    /// Take every pending request, leaving the mailbox empty
    pub fn take_all(&self) -> Result<Vec<(InstanceId, PendingRequest)>, RenderError> {
        let mut pending: Vec<_> = self.lock_slots()?.drain().collect();
        pending.sort_by_key(|(id, _)| *id);
        Ok(pending)
    }

    /// Drop the pending request for `id`, if any
    pub fn cancel(&self, id: InstanceId) -> Result<bool, RenderError> {
        Ok(self.lock_slots()?.remove(&id).is_some())
    }

    pub fn pending(&self) -> Result<usize, RenderError> {
        Ok(self.lock_slots()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::snapshot::Geometry;

    fn snap(pan: f64) -> RenderSnapshot {
        RenderSnapshot {
            pan,
            zoom: 4.0,
            ..RenderSnapshot::full_view(Geometry::new(0, 0, 10, 10, 10, 10))
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mailbox = RenderMailbox::new();
        assert!(!mailbox.post(InstanceId(1), snap(0.1)).unwrap());
        assert!(mailbox.post(InstanceId(1), snap(0.2)).unwrap());
        assert!(mailbox.post(InstanceId(1), snap(0.3)).unwrap());

        let taken = mailbox.take_all().unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].1.snapshot.pan, 0.3);
        assert_eq!(mailbox.pending().unwrap(), 0);
    }

    #[test]
    fn test_sequence_increases_across_takes() {
        let mailbox = RenderMailbox::new();
        mailbox.post(InstanceId(1), snap(0.1)).unwrap();
        let first = mailbox.take_all().unwrap()[0].1.sequence;
        mailbox.post(InstanceId(1), snap(0.2)).unwrap();
        let second = mailbox.take_all().unwrap()[0].1.sequence;
        assert!(second > first);
    }

    #[test]
    fn test_instances_are_independent() {
        let mailbox = RenderMailbox::new();
        mailbox.post(InstanceId(2), snap(0.5)).unwrap();
        mailbox.post(InstanceId(1), snap(0.25)).unwrap();

        let taken = mailbox.take_all().unwrap();
        assert_eq!(
            taken.iter().map(|(id, _)| id.0).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_cancel_removes_pending() {
        let mailbox = RenderMailbox::new();
        mailbox.post(InstanceId(3), snap(0.0)).unwrap();
        assert!(mailbox.cancel(InstanceId(3)).unwrap());
        assert!(!mailbox.cancel(InstanceId(3)).unwrap());
        assert!(mailbox.take_all().unwrap().is_empty());
    }
}
