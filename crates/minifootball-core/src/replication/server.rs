//! Server-side replication: per-client deltas against acknowledged ticks.

use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use super::{EntityRecord, SnapshotDelta};
use crate::entity::ClientId;
use crate::tags::TagChange;

/// One published tick as the server remembers it.
#[derive(Debug, Clone)]
struct Committed {
    tick: u64,
    records: Vec<EntityRecord>,
    tag_changes: Vec<TagChange>,
}

/// Keeps recent published records and builds each client's next delta.
///
/// A client that has acknowledged tick `A` gets a delta against `A` while
/// every tick from `A` on is still in the replay buffer. Everyone else gets
/// a keyframe, so a client that lost any number of deltas recovers from the
/// next one it receives.
#[derive(Debug, Clone)]
pub struct ReplicationServer {
    capacity: usize,
    history: VecDeque<Committed>,
    acks: BTreeMap<ClientId, u64>,
}

impl ReplicationServer {
    /// Creates a server keeping `capacity` past ticks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            history: VecDeque::new(),
            acks: BTreeMap::new(),
        }
    }

    /// Remembers the tick in `published` with its full `records`.
    pub fn record(&mut self, published: &SnapshotDelta, records: Vec<EntityRecord>) {
        self.history.push_back(Committed {
            tick: published.tick,
            records,
            tag_changes: published.tag_changes.clone(),
        });
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Registers an acknowledgement. Acks never move backwards.
    pub fn ack(&mut self, client: ClientId, tick: u64) {
        let entry = self.acks.entry(client).or_insert(tick);
        if tick > *entry {
            *entry = tick;
        }
        trace!(%client, tick, "ack");
    }

    /// Forgets a client.
    pub fn forget(&mut self, client: ClientId) {
        self.acks.remove(&client);
    }

    /// The last tick `client` acknowledged.
    #[must_use]
    pub fn acked(&self, client: ClientId) -> Option<u64> {
        self.acks.get(&client).copied()
    }

    /// Remembered ticks in `[from, to)`, or `None` if any of them is gone.
    fn span(&self, from: u64, to: u64) -> Option<Vec<&Committed>> {
        let span: Vec<_> = self
            .history
            .iter()
            .filter(|c| c.tick >= from && c.tick < to)
            .collect();
        let expected = usize::try_from(to - from).ok()?;
        (span.len() == expected && span.first().is_some_and(|c| c.tick == from)).then_some(span)
    }

    /// Builds the delta `client` should receive for the tick in `published`.
    ///
    /// `published` is the simulation's own delta against the previous tick.
    /// For a client acked further back the entity list is widened to every
    /// entity whose record at any tick since the ack differs from `records`,
    /// so the delta fits a mirror left at any of those ticks. Its tag changes
    /// are the journals of every tick after the ack. Keyframes carry only
    /// the changes made during the published tick.
    #[must_use]
    pub fn delta_for(
        &self,
        client: ClientId,
        published: &SnapshotDelta,
        records: &[EntityRecord],
    ) -> SnapshotDelta {
        let span = self
            .acked(client)
            .filter(|acked| *acked < published.tick)
            .and_then(|acked| self.span(acked, published.tick).map(|s| (acked, s)));

        match span {
            Some((acked, _)) if Some(acked) == published.baseline => published.clone(),
            Some((acked, span)) => {
                let earlier: Vec<&[EntityRecord]> =
                    span.iter().map(|c| c.records.as_slice()).collect();
                let tag_changes = span
                    .iter()
                    .skip(1)
                    .flat_map(|c| c.tag_changes.iter().copied())
                    .chain(published.tag_changes.iter().copied())
                    .collect();
                SnapshotDelta::covering(
                    published.tick,
                    acked,
                    published.state,
                    &earlier,
                    records,
                    tag_changes,
                )
            }
            None => SnapshotDelta::keyframe(
                published.tick,
                published.state,
                records,
                published.tag_changes.clone(),
            ),
        }
    }

    /// Number of ticks held.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
