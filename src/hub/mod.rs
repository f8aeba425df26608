//! Versioned latest-frame broadcast slot
//!
//! The hub is the single publication point between the ingest loop and all
//! client sessions. It holds exactly one frame (the most recent), tagged
//! with a monotonically incrementing sequence number:
//!
//! ```text
//!   IngestLoop ──publish(frame)──► watch slot { seq, frame: Bytes }
//!                                      │ notify
//!              ┌───────────────────────┼───────────────────────┐
//!              ▼                       ▼                       ▼
//!        FrameReceiver           FrameReceiver           FrameReceiver
//!        next_frame()            next_frame()            next_frame()
//! ```
//!
//! Frames are never queued: a consumer that falls behind observes only the
//! latest published frame, never a stale one. Every consumer copy is a
//! complete frame, because the published `Bytes` value is immutable and
//! reference-counted; the producer is never blocked by a slow consumer.
//!
//! A receiver created between two publications has the current slot value
//! already marked seen, so a newly connected client always gets the *next*
//! frame, not the previous one.

use bytes::Bytes;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// A published frame and its sequence number
///
/// `seq` starts at 1 for the first published frame; 0 is the empty slot
/// value before anything has been ingested.
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    /// Monotonic frame sequence number
    pub seq: u64,
    /// Frame payload (cheap to clone, reference-counted)
    pub frame: Bytes,
}

/// Publisher side of the frame slot
#[derive(Debug)]
pub struct FrameHub {
    tx: watch::Sender<FrameUpdate>,
    shutdown: CancellationToken,
}

impl FrameHub {
    /// Create a hub with an empty slot
    pub fn new() -> Self {
        let (tx, _) = watch::channel(FrameUpdate {
            seq: 0,
            frame: Bytes::new(),
        });
        Self {
            tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Publish a completed frame, waking every waiting receiver
    ///
    /// Returns the sequence number assigned to the frame. Never blocks.
    pub fn publish(&self, frame: Bytes) -> u64 {
        let mut seq = 0;
        self.tx.send_modify(|slot| {
            slot.seq += 1;
            slot.frame = frame;
            seq = slot.seq;
        });
        seq
    }

    /// Create a receiver for frames published from now on
    pub fn subscribe(&self) -> FrameReceiver {
        FrameReceiver {
            rx: self.tx.subscribe(),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Number of live receivers
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wake every receiver with the terminate signal
    ///
    /// After this, every in-flight and future `next_frame` call resolves to
    /// `None`. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// True once `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side of the frame slot
///
/// One per client session. Tracks which slot version this consumer has seen;
/// waiting suspends the task without spinning and without holding any lock
/// the producer needs.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: watch::Receiver<FrameUpdate>,
    shutdown: CancellationToken,
}

impl FrameReceiver {
    /// Sequence number of the frame currently in the slot
    pub fn current_seq(&self) -> u64 {
        self.rx.borrow().seq
    }

    /// Wait for the next published frame
    ///
    /// Returns `None` when the hub shuts down or the producer side is gone;
    /// the session treats that as the terminate signal.
    pub async fn next_frame(&mut self) -> Option<FrameUpdate> {
        let changed = tokio::select! {
            changed = self.rx.changed() => changed.is_ok(),
            _ = self.shutdown.cancelled() => false,
        };
        if !changed {
            return None;
        }
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_receivers_see_identical_bytes() {
        let hub = FrameHub::new();
        let mut receivers: Vec<_> = (0..3).map(|_| hub.subscribe()).collect();

        hub.publish(Bytes::from_static(b"frame-one"));

        for rx in &mut receivers {
            let update = rx.next_frame().await.expect("frame expected");
            assert_eq!(update.seq, 1);
            assert_eq!(&update.frame[..], b"frame-one");
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_waits_for_next_frame() {
        let hub = FrameHub::new();
        hub.publish(Bytes::from_static(b"before"));

        // subscribing after a publication marks the current frame as seen
        let mut rx = hub.subscribe();
        assert_eq!(rx.current_seq(), 1);

        let mut pending = tokio_test::task::spawn(rx.next_frame());
        assert!(pending.poll().is_pending());

        hub.publish(Bytes::from_static(b"after"));
        let update = pending.await.expect("frame expected");
        assert_eq!(update.seq, 2);
        assert_eq!(&update.frame[..], b"after");
    }

    #[tokio::test]
    async fn test_slow_receiver_only_sees_latest() {
        let hub = FrameHub::new();
        let mut rx = hub.subscribe();

        hub.publish(Bytes::from_static(b"frame-1"));
        hub.publish(Bytes::from_static(b"frame-2"));

        // both publications happened while the receiver was away; it must
        // observe only the latest, never the overwritten one
        let update = rx.next_frame().await.expect("frame expected");
        assert_eq!(update.seq, 2);
        assert_eq!(&update.frame[..], b"frame-2");

        let mut pending = tokio_test::task::spawn(rx.next_frame());
        assert!(pending.poll().is_pending());
    }

    #[tokio::test]
    async fn test_shutdown_wakes_waiting_receivers() {
        let hub = FrameHub::new();
        let mut rx = hub.subscribe();

        let mut pending = tokio_test::task::spawn(rx.next_frame());
        assert!(pending.poll().is_pending());

        hub.shutdown();
        assert!(pending.await.is_none());
        assert!(hub.is_shut_down());
    }

    #[tokio::test]
    async fn test_dropped_hub_terminates_receivers() {
        let hub = FrameHub::new();
        let mut rx = hub.subscribe();
        drop(hub);

        assert!(rx.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_receiver_count() {
        let hub = FrameHub::new();
        assert_eq!(hub.receiver_count(), 0);

        let rx1 = hub.subscribe();
        let rx2 = hub.subscribe();
        assert_eq!(hub.receiver_count(), 2);

        drop(rx1);
        drop(rx2);
        assert_eq!(hub.receiver_count(), 0);
    }
}
