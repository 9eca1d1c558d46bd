//! Per-channel priority queue of dequeue tokens.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{self, AtomicU64};

use tokio::sync::Mutex;

use courier_core::notification::{Channel, Priority};
use courier_core::queue::QueueItem;

/// A scored queue entry.
///
/// `score = priority_weight + enqueue_time_ns / 1e18`, so every `high`
/// item sorts before any `normal` item regardless of arrival time, while
/// the fractional timestamp preserves FIFO within a class. `seq` breaks
/// ties between entries enqueued within the same nanosecond.
#[derive(Debug)]
struct ScoredItem {
    score: f64,
    seq: u64,
    item: QueueItem,
}

impl PartialEq for ScoredItem {
    fn eq(&self, other: &Self) -> bool {
        self.score.total_cmp(&other.score) == Ordering::Equal && self.seq == other.seq
    }
}

impl Eq for ScoredItem {}

impl PartialOrd for ScoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Compute the queue score for a priority at a given enqueue instant.
fn score(priority: Priority, now_ns: i64) -> f64 {
    priority.weight() as f64 + now_ns as f64 / 1e18
}

fn now_ns() -> i64 {
    // Saturates in 2262; the fallback keeps ordering sane rather than
    // panicking.
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

// ---------------------------------------------------------------------------
// PriorityQueue
// ---------------------------------------------------------------------------

/// Ordered per-channel queue with atomic pop-min.
///
/// The queue holds only transient [`QueueItem`] tokens; the state store
/// remains the source of truth. A notification id may appear more than
/// once after a retry re-enqueue, so consumers must re-read the record
/// before sending.
pub struct PriorityQueue {
    channels: Mutex<HashMap<Channel, BinaryHeap<Reverse<ScoredItem>>>>,
    seq: AtomicU64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Insert a token into its channel's queue.
    pub async fn enqueue(&self, item: QueueItem) {
        let entry = self.scored(item);
        let mut channels = self.channels.lock().await;
        channels
            .entry(entry.item.channel)
            .or_default()
            .push(Reverse(entry));
    }

    /// Insert many tokens under a single lock acquisition, grouped by
    /// channel.
    pub async fn enqueue_batch(&self, items: Vec<QueueItem>) {
        if items.is_empty() {
            return;
        }
        let entries: Vec<ScoredItem> = items.into_iter().map(|item| self.scored(item)).collect();
        let mut channels = self.channels.lock().await;
        for entry in entries {
            channels
                .entry(entry.item.channel)
                .or_default()
                .push(Reverse(entry));
        }
    }

    /// Atomically remove and return the lowest-scored token for a channel,
    /// or `None` when the channel's queue is empty. Never blocks on an
    /// empty queue.
    pub async fn dequeue(&self, channel: Channel) -> Option<QueueItem> {
        let mut channels = self.channels.lock().await;
        channels
            .get_mut(&channel)
            .and_then(|heap| heap.pop())
            .map(|Reverse(entry)| entry.item)
    }

    /// Number of tokens currently queued for a channel.
    pub async fn depth(&self, channel: Channel) -> usize {
        let channels = self.channels.lock().await;
        channels.get(&channel).map_or(0, BinaryHeap::len)
    }

    /// Queue depths for every channel.
    pub async fn depths_all(&self) -> HashMap<Channel, usize> {
        let channels = self.channels.lock().await;
        Channel::ALL
            .iter()
            .map(|&c| (c, channels.get(&c).map_or(0, BinaryHeap::len)))
            .collect()
    }

    fn scored(&self, item: QueueItem) -> ScoredItem {
        ScoredItem {
            score: score(item.priority, now_ns()),
            seq: self.seq.fetch_add(1, atomic::Ordering::Relaxed),
            item,
        }
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(channel: Channel, priority: Priority) -> QueueItem {
        QueueItem {
            notification_id: Uuid::new_v4(),
            channel,
            priority,
            retry_count: 0,
        }
    }

    #[tokio::test]
    async fn dequeue_empty_returns_none() {
        let queue = PriorityQueue::new();
        assert!(queue.dequeue(Channel::Sms).await.is_none());
    }

    #[tokio::test]
    async fn high_priority_dequeues_before_earlier_normal() {
        let queue = PriorityQueue::new();
        let normal = item(Channel::Sms, Priority::Normal);
        let high = item(Channel::Sms, Priority::High);

        queue.enqueue(normal.clone()).await;
        queue.enqueue(high.clone()).await;

        assert_eq!(queue.dequeue(Channel::Sms).await, Some(high));
        assert_eq!(queue.dequeue(Channel::Sms).await, Some(normal));
    }

    #[tokio::test]
    async fn fifo_within_a_priority_class() {
        let queue = PriorityQueue::new();
        let first = item(Channel::Email, Priority::Normal);
        let second = item(Channel::Email, Priority::Normal);
        let third = item(Channel::Email, Priority::Normal);

        queue.enqueue(first.clone()).await;
        queue.enqueue(second.clone()).await;
        queue.enqueue(third.clone()).await;

        assert_eq!(queue.dequeue(Channel::Email).await, Some(first));
        assert_eq!(queue.dequeue(Channel::Email).await, Some(second));
        assert_eq!(queue.dequeue(Channel::Email).await, Some(third));
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let queue = PriorityQueue::new();
        queue.enqueue(item(Channel::Sms, Priority::Normal)).await;

        assert!(queue.dequeue(Channel::Email).await.is_none());
        assert_eq!(queue.depth(Channel::Sms).await, 1);
        assert_eq!(queue.depth(Channel::Email).await, 0);
    }

    #[tokio::test]
    async fn batch_enqueue_groups_by_channel() {
        let queue = PriorityQueue::new();
        queue
            .enqueue_batch(vec![
                item(Channel::Sms, Priority::Normal),
                item(Channel::Email, Priority::Normal),
                item(Channel::Sms, Priority::Low),
            ])
            .await;

        let depths = queue.depths_all().await;
        assert_eq!(depths[&Channel::Sms], 2);
        assert_eq!(depths[&Channel::Email], 1);
        assert_eq!(depths[&Channel::Push], 0);
    }

    #[tokio::test]
    async fn concurrent_dequeues_never_hand_out_the_same_token() {
        let queue = std::sync::Arc::new(PriorityQueue::new());
        for _ in 0..100 {
            queue.enqueue(item(Channel::Push, Priority::Normal)).await;
        }

        let mut handles = Vec::new();
        for _ in 0..10 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(popped) = queue.dequeue(Channel::Push).await {
                    seen.push(popped.notification_id);
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort();
        let before = all.len();
        all.dedup();
        assert_eq!(before, 100);
        assert_eq!(all.len(), 100);
    }

    #[test]
    fn priority_classes_dominate_timestamps() {
        // A low-priority item enqueued arbitrarily early still sorts after
        // a high-priority item enqueued much later.
        let early_low = score(Priority::Low, 0);
        let late_high = score(Priority::High, i64::MAX);
        assert!(late_high < early_low);
    }
}
