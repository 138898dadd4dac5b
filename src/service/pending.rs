use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::protocol::{Decoded, DecodedWithConfig, RequestId};
use super::Err;

/// The caller side of one outstanding request. The variant decides how a successful
/// response is presented.
#[derive(Debug)]
pub(crate) enum Completion {
    Buffer(oneshot::Sender<Result<Vec<u8>, Err>>),
    WithConfig(oneshot::Sender<Result<DecodedWithConfig, Err>>),
}

impl Completion {
    // A closed receiver means the caller dropped its handle; nothing is waiting.
    pub(crate) fn resolve(self, decoded: Decoded) {
        match self {
            Completion::Buffer(tx) => {
                let _ = tx.send(Ok(decoded.buffer));
            }
            Completion::WithConfig(tx) => {
                let _ = tx.send(Ok(DecodedWithConfig {
                    decoded: decoded.buffer,
                    config: decoded.config,
                }));
            }
        }
    }

    pub(crate) fn reject(self, err: Err) {
        match self {
            Completion::Buffer(tx) => {
                let _ = tx.send(Err(err));
            }
            Completion::WithConfig(tx) => {
                let _ = tx.send(Err(err));
            }
        }
    }
}

#[derive(Debug)]
struct Pending {
    completion: Completion,
    deadline: Option<Instant>,
}

/// Outstanding requests by id. Every entry is removed exactly once; completions are
/// handed back to the caller so they are never fired while the lock is held.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<RequestId, Pending>>,
}

impl PendingTable {
    pub(crate) fn insert(&self, id: RequestId, completion: Completion, deadline: Option<Instant>) {
        self.entries.lock().insert(id, Pending { completion, deadline });
    }

    pub(crate) fn take(&self, id: RequestId) -> Option<Completion> {
        self.entries.lock().remove(&id).map(|p| p.completion)
    }

    /// removes every entry whose deadline is at or before `now`.
    pub(crate) fn take_expired(&self, now: Instant) -> Vec<(RequestId, Completion)> {
        let mut entries = self.entries.lock();
        let expired = entries
            .iter()
            .filter(|(_, p)| p.deadline.is_some_and(|d| d <= now))
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        expired
            .into_iter()
            .filter_map(|id| entries.remove(&id).map(|p| (id, p.completion)))
            .collect()
    }

    pub(crate) fn drain(&self) -> Vec<(RequestId, Completion)> {
        self.entries
            .lock()
            .drain()
            .map(|(id, p)| (id, p.completion))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn take_removes_once() {
        let table = PendingTable::default();
        let (tx, _rx) = oneshot::channel();
        table.insert(3, Completion::Buffer(tx), None);
        assert_eq!(table.len(), 1);
        assert!(table.take(3).is_some());
        assert!(table.take(3).is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn only_expired_entries_are_taken() {
        let table = PendingTable::default();
        let now = Instant::now();
        let (tx0, _rx0) = oneshot::channel();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        table.insert(0, Completion::Buffer(tx0), Some(now));
        table.insert(1, Completion::Buffer(tx1), Some(now + Duration::from_secs(60)));
        table.insert(2, Completion::Buffer(tx2), None);

        let expired = table.take_expired(now);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.drain().len(), 2);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn presentation_follows_completion_kind() {
        let decoded = Decoded { buffer: vec![1, 2], config: None };

        let (tx, mut rx) = oneshot::channel();
        Completion::Buffer(tx).resolve(decoded.clone());
        assert_eq!(rx.try_recv().unwrap(), Ok(vec![1, 2]));

        let (tx, mut rx) = oneshot::channel();
        Completion::WithConfig(tx).resolve(decoded);
        assert_eq!(
            rx.try_recv().unwrap(),
            Ok(DecodedWithConfig { decoded: vec![1, 2], config: None })
        );

        let (tx, mut rx) = oneshot::channel::<Result<Vec<u8>, Err>>();
        Completion::Buffer(tx).reject(Err::Cancelled);
        assert_eq!(rx.try_recv().unwrap(), Err(Err::Cancelled));
    }
}
