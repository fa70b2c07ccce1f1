//! In-process transport for framed messages.
//!
//! A [`Link`] is one end of a bidirectional, unbounded byte channel built on
//! `crossbeam-channel`. Either end can live on its own thread; the session
//! only looks at what has arrived when a tick begins.
//!
//! Links can be told to lose messages deterministically, which is how the
//! loss-tolerance of replication is exercised without a real network.
//!
//! ```
//! use minifootball_core::replication::transport::{link_pair, Delivery};
//!
//! let (mut server, client) = link_pair();
//! server.drop_next(1);
//! assert_eq!(server.send(vec![1]), Delivery::Dropped);
//! assert_eq!(server.send(vec![2]), Delivery::Sent);
//! assert_eq!(client.drain(), vec![vec![2]]);
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

/// What happened to a sent message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the peer
    Sent,
    /// Discarded by the loss model
    Dropped,
    /// The peer end is gone
    Disconnected,
}

/// Deterministic loss model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Loss {
    /// Deliver everything
    #[default]
    None,
    /// Drop every n-th message (1-based: the n-th, 2n-th, ...)
    EveryNth(u32),
}

/// Counters for one direction of a link.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Messages handed to the channel
    pub sent: u64,
    /// Messages discarded by the loss model
    pub dropped: u64,
}

/// One end of a bidirectional channel.
#[derive(Debug)]
pub struct Link {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    loss: Loss,
    scripted: VecDeque<bool>,
    attempts: u64,
    stats: LinkStats,
}

/// Creates two connected ends.
#[must_use]
pub fn link_pair() -> (Link, Link) {
    let (a_tx, b_rx) = unbounded();
    let (b_tx, a_rx) = unbounded();
    (Link::new(a_tx, a_rx), Link::new(b_tx, b_rx))
}

impl Link {
    fn new(tx: Sender<Vec<u8>>, rx: Receiver<Vec<u8>>) -> Self {
        Self {
            tx,
            rx,
            loss: Loss::None,
            scripted: VecDeque::new(),
            attempts: 0,
            stats: LinkStats::default(),
        }
    }

    /// Sets the loss model for messages sent from this end.
    #[must_use]
    pub fn with_loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    /// Drops the next `count` messages sent from this end.
    pub fn drop_next(&mut self, count: usize) {
        self.scripted.extend(std::iter::repeat(true).take(count));
    }

    fn should_drop(&mut self) -> bool {
        self.attempts += 1;
        if self.scripted.pop_front().unwrap_or(false) {
            return true;
        }
        match self.loss {
            Loss::None => false,
            Loss::EveryNth(n) => n > 0 && self.attempts % u64::from(n) == 0,
        }
    }

    /// Sends `bytes` to the peer, subject to the loss model.
    pub fn send(&mut self, bytes: Vec<u8>) -> Delivery {
        if self.should_drop() {
            self.stats.dropped += 1;
            return Delivery::Dropped;
        }
        match self.tx.send(bytes) {
            Ok(()) => {
                self.stats.sent += 1;
                Delivery::Sent
            }
            Err(_) => Delivery::Disconnected,
        }
    }

    /// Takes everything that has arrived, oldest first, without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<Vec<u8>> {
        self.rx.try_iter().collect()
    }

    /// Waits up to `timeout` for one message.
    ///
    /// Returns `Ok(None)` on timeout and `Err(())` once the peer is gone and
    /// nothing is left to read.
    #[allow(clippy::result_unit_err)]
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>, ()> {
        match self.rx.recv_timeout(timeout) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(()),
        }
    }

    /// Traffic counters for this end's outgoing direction.
    #[must_use]
    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}
