//! # Transaction Table
//!
//! Maps transaction ids to requests waiting for their answer.
//!
//! Flow:
//! 1. The router takes a fresh id from `next_id()`
//! 2. `register()` returns the receiver the caller awaits
//! 3. The request is sent
//! 4. The answer arrives and `complete()` hands it to the waiting caller
//! 5. On timeout the caller `cancel()`s its entry

use dashmap::DashMap;
use shared_types::Message;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A request waiting for its answer.
struct PendingTransaction {
    sender: oneshot::Sender<Message>,
    created_at: Instant,
    /// Request code, for logging.
    code: u16,
}

/// Counters for the transaction table.
#[derive(Debug, Default)]
pub struct TransactionStats {
    pub registered: AtomicU64,
    pub completed: AtomicU64,
    pub cancelled: AtomicU64,
    pub unmatched: AtomicU64,
}

/// Outstanding requests of one peer, keyed by transaction id.
pub struct TransactionTable {
    pending: DashMap<u64, PendingTransaction>,
    next_id: AtomicU64,
    stats: TransactionStats,
}

impl Default for TransactionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionTable {
    /// Empty table; ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
            stats: TransactionStats::default(),
        }
    }

    /// A fresh id, strictly greater than every id handed out before.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Start waiting for the answer to `transaction_id`.
    pub fn register(&self, transaction_id: u64, code: u16) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            transaction_id,
            PendingTransaction {
                sender: tx,
                created_at: Instant::now(),
                code,
            },
        );
        self.stats.registered.fetch_add(1, Ordering::Relaxed);
        debug!(transaction_id, code, "Registered transaction");
        rx
    }

    /// Hand an answer to whoever waits for it.
    ///
    /// Returns false if nobody waits for this transaction id.
    pub fn complete(&self, answer: Message) -> bool {
        let transaction_id = answer.transaction_id();
        let Some((_, pending)) = self.pending.remove(&transaction_id) else {
            self.stats.unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(transaction_id, "Answer for unknown or expired transaction");
            return false;
        };

        let elapsed_ms = pending.created_at.elapsed().as_millis() as u64;
        match pending.sender.send(answer) {
            Ok(()) => {
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    transaction_id,
                    code = pending.code,
                    elapsed_ms,
                    "Completed transaction"
                );
                true
            }
            Err(_) => {
                // The waiting request gave up.
                self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(transaction_id, "Transaction receiver dropped");
                false
            }
        }
    }

    /// Stop waiting for `transaction_id`.
    pub fn cancel(&self, transaction_id: u64) -> bool {
        let removed = self.pending.remove(&transaction_id).is_some();
        if removed {
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Drop every waiting request. Their receivers observe a closed channel.
    pub fn cancel_all(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        self.stats
            .cancelled
            .fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Whether `transaction_id` is still awaited.
    #[must_use]
    pub fn is_pending(&self, transaction_id: u64) -> bool {
        self.pending.contains_key(&transaction_id)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn stats(&self) -> &TransactionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Destination, MessageBody, NodeId, PingAnswer, ID_LEN};

    fn answer(transaction_id: u64) -> Message {
        let me = NodeId::new([1; ID_LEN]);
        let request = Message::request(me, transaction_id, vec![Destination::Node(me)], MessageBody::PingReq);
        Message::answer_to(
            &request,
            me,
            MessageBody::PingAns(PingAnswer {
                response_id: 1,
                time: 0,
            }),
        )
    }

    #[test]
    fn test_ids_strictly_increase() {
        let table = TransactionTable::new();
        let a = table.next_id();
        let b = table.next_id();
        assert_eq!(a, 1);
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_complete_delivers_to_waiter() {
        let table = TransactionTable::new();
        let rx = table.register(5, 23);
        assert!(table.is_pending(5));
        assert!(table.complete(answer(5)));
        assert_eq!(rx.await.unwrap().transaction_id(), 5);
        assert_eq!(table.pending_count(), 0);
    }

    #[test]
    fn test_unmatched_answer_is_counted() {
        let table = TransactionTable::new();
        assert!(!table.complete(answer(42)));
        assert_eq!(table.stats().unmatched.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_cancel_all_closes_receivers() {
        let table = TransactionTable::new();
        let rx1 = table.register(1, 9);
        let rx2 = table.register(2, 7);
        assert_eq!(table.cancel_all(), 2);
        assert!(rx1.await.is_err());
        assert!(rx2.await.is_err());
    }
}
