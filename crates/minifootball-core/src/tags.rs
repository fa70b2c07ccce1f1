//! Tag state store.
//!
//! Every entity carries a [`TagSet`]: a small set of status flags that the
//! rest of the core reads instead of keeping its own booleans. The store
//! enforces one cross-entity rule: at most one entity holds
//! [`Tag::Possession`] at any time. Granting possession to a new holder
//! revokes it from the previous one within the same call, so no reader can
//! ever observe two holders or a half-finished handover.
//!
//! Every change is journaled as a [`TagChange`]. The simulation drains the
//! journal once per tick and ships it in the snapshot delta.
//!
//! # Example
//!
//! ```
//! use minifootball_core::entity::EntityId;
//! use minifootball_core::tags::{Tag, TagStore};
//!
//! let mut tags = TagStore::with_entities(3);
//! let (a, b) = (EntityId::new(0), EntityId::new(1));
//!
//! tags.add_tag(a, Tag::Possession);
//! tags.add_tag(b, Tag::Possession);
//!
//! assert!(!tags.has_tag(a, Tag::Possession));
//! assert!(tags.has_tag(b, Tag::Possession));
//! assert_eq!(tags.possession_holder(), Some(b));
//! ```

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entity::EntityId;

bitflags! {
    /// Set of status flags on one entity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TagSet: u16 {
        /// Holds the ball
        const POSSESSION = 1 << 0;
        /// Cannot move, tackle or pick up the ball
        const STUNNED = 1 << 1;
        /// Reserved for an offside rule
        const OFFSIDE = 1 << 2;
        /// The match is paused
        const PAUSED = 1 << 3;
        /// The controlling client disconnected and AI took over
        const UNMANNED = 1 << 4;
        /// Moving at sprint speed
        const SPRINTING = 1 << 5;
        /// Team scored and is celebrating
        const CELEBRATING = 1 << 6;
    }
}

impl Default for TagSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single tag, for APIs that deal with one flag at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// See [`TagSet::POSSESSION`]
    Possession,
    /// See [`TagSet::STUNNED`]
    Stunned,
    /// See [`TagSet::OFFSIDE`]
    Offside,
    /// See [`TagSet::PAUSED`]
    Paused,
    /// See [`TagSet::UNMANNED`]
    Unmanned,
    /// See [`TagSet::SPRINTING`]
    Sprinting,
    /// See [`TagSet::CELEBRATING`]
    Celebrating,
}

impl Tag {
    /// All tags in flag order.
    pub const ALL: [Tag; 7] = [
        Tag::Possession,
        Tag::Stunned,
        Tag::Offside,
        Tag::Paused,
        Tag::Unmanned,
        Tag::Sprinting,
        Tag::Celebrating,
    ];

    /// The flag for this tag.
    #[must_use]
    pub const fn flag(self) -> TagSet {
        match self {
            Tag::Possession => TagSet::POSSESSION,
            Tag::Stunned => TagSet::STUNNED,
            Tag::Offside => TagSet::OFFSIDE,
            Tag::Paused => TagSet::PAUSED,
            Tag::Unmanned => TagSet::UNMANNED,
            Tag::Sprinting => TagSet::SPRINTING,
            Tag::Celebrating => TagSet::CELEBRATING,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::Possession => "Possession",
            Tag::Stunned => "Stunned",
            Tag::Offside => "Offside",
            Tag::Paused => "Paused",
            Tag::Unmanned => "Unmanned",
            Tag::Sprinting => "Sprinting",
            Tag::Celebrating => "Celebrating",
        };
        f.write_str(name)
    }
}

/// One journaled tag mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagChange {
    /// Entity whose set changed
    pub entity: EntityId,
    /// The tag
    pub tag: Tag,
    /// `true` if added, `false` if removed
    pub added: bool,
}

/// Per-entity tag sets plus the possession holder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagStore {
    sets: Vec<TagSet>,
    holder: Option<EntityId>,
    journal: Vec<TagChange>,
}

impl TagStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with empty sets for entities `0..count`.
    #[must_use]
    pub fn with_entities(count: usize) -> Self {
        Self {
            sets: vec![TagSet::empty(); count],
            holder: None,
            journal: Vec::new(),
        }
    }

    /// Makes sure `entity` has a (possibly empty) set.
    pub fn register(&mut self, entity: EntityId) {
        if self.sets.len() <= entity.index() {
            self.sets.resize(entity.index() + 1, TagSet::empty());
        }
    }

    /// Number of entities tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns `true` if no entity is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Adds `tag` to `entity`.
    ///
    /// Adding [`Tag::Possession`] first removes it from the current holder.
    /// Adding a tag the entity already has is a no-op. Returns `true` if the
    /// entity's set changed. Unknown entities are ignored.
    pub fn add_tag(&mut self, entity: EntityId, tag: Tag) -> bool {
        let Some(set) = self.sets.get(entity.index()).copied() else {
            warn!(%entity, %tag, "add_tag on unknown entity");
            return false;
        };
        if set.contains(tag.flag()) {
            return false;
        }

        if tag == Tag::Possession {
            if let Some(previous) = self.holder.take() {
                self.clear_flag(previous, Tag::Possession);
            }
            self.holder = Some(entity);
        }

        self.sets[entity.index()].insert(tag.flag());
        self.journal.push(TagChange {
            entity,
            tag,
            added: true,
        });
        true
    }

    /// Removes `tag` from `entity`. Returns `true` if the set changed.
    pub fn remove_tag(&mut self, entity: EntityId, tag: Tag) -> bool {
        if tag == Tag::Possession && self.holder == Some(entity) {
            self.holder = None;
        }
        self.clear_flag(entity, tag)
    }

    fn clear_flag(&mut self, entity: EntityId, tag: Tag) -> bool {
        match self.sets.get_mut(entity.index()) {
            Some(set) if set.contains(tag.flag()) => {
                set.remove(tag.flag());
                self.journal.push(TagChange {
                    entity,
                    tag,
                    added: false,
                });
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if `entity` has `tag`.
    #[must_use]
    pub fn has_tag(&self, entity: EntityId, tag: Tag) -> bool {
        self.get(entity).contains(tag.flag())
    }

    /// The full set for `entity`, empty if unknown.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> TagSet {
        self.sets.get(entity.index()).copied().unwrap_or_default()
    }

    /// The entity holding the ball, if any.
    #[must_use]
    pub fn possession_holder(&self) -> Option<EntityId> {
        self.holder
    }

    /// Drops possession wherever it is.
    pub fn release_possession(&mut self) -> Option<EntityId> {
        let previous = self.holder?;
        self.remove_tag(previous, Tag::Possession);
        Some(previous)
    }

    /// Adds `tag` to every tracked entity.
    pub fn add_to_all(&mut self, tag: Tag) {
        debug_assert!(tag != Tag::Possession, "possession has a single holder");
        for index in 0..self.sets.len() {
            let id = EntityId::new(u32::try_from(index).unwrap_or(u32::MAX));
            self.add_tag(id, tag);
        }
    }

    /// Removes `tag` from every tracked entity.
    pub fn remove_from_all(&mut self, tag: Tag) {
        for index in 0..self.sets.len() {
            let id = EntityId::new(u32::try_from(index).unwrap_or(u32::MAX));
            self.remove_tag(id, tag);
        }
    }

    /// Number of entities carrying `tag`.
    #[must_use]
    pub fn count_with(&self, tag: Tag) -> usize {
        self.sets.iter().filter(|s| s.contains(tag.flag())).count()
    }

    /// Entities carrying `tag`, in id order.
    pub fn entities_with(&self, tag: Tag) -> impl Iterator<Item = EntityId> + '_ {
        self.sets
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.contains(tag.flag()))
            .filter_map(|(i, _)| u32::try_from(i).ok().map(EntityId::new))
    }

    /// Takes every change journaled since the last drain.
    pub fn drain_journal(&mut self) -> Vec<TagChange> {
        std::mem::take(&mut self.journal)
    }

    /// Changes journaled since the last drain.
    #[must_use]
    pub fn journal(&self) -> &[TagChange] {
        &self.journal
    }

    /// Overwrites the set of `entity` without journaling.
    ///
    /// Used by client mirrors that receive whole sets from the server.
    pub fn overwrite(&mut self, entity: EntityId, set: TagSet) {
        self.register(entity);
        if set.contains(TagSet::POSSESSION) {
            if let Some(previous) = self.holder.filter(|h| *h != entity) {
                self.sets[previous.index()].remove(TagSet::POSSESSION);
            }
            self.holder = Some(entity);
        } else if self.holder == Some(entity) {
            self.holder = None;
        }
        self.sets[entity.index()] = set;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: u32) -> EntityId {
        EntityId::new(n)
    }

    mod basic_tests {
        use super::*;

        #[test]
        fn add_and_remove() {
            let mut tags = TagStore::with_entities(2);
            assert!(tags.add_tag(id(0), Tag::Stunned));
            assert!(!tags.add_tag(id(0), Tag::Stunned));
            assert!(tags.has_tag(id(0), Tag::Stunned));
            assert!(tags.remove_tag(id(0), Tag::Stunned));
            assert!(!tags.remove_tag(id(0), Tag::Stunned));
            assert!(tags.get(id(0)).is_empty());
        }

        #[test]
        fn unknown_entity_is_ignored() {
            let mut tags = TagStore::with_entities(1);
            assert!(!tags.add_tag(id(9), Tag::Stunned));
            assert!(!tags.has_tag(id(9), Tag::Stunned));
            assert!(tags.journal().is_empty());
        }

        #[test]
        fn register_grows_storage() {
            let mut tags = TagStore::new();
            tags.register(id(4));
            assert_eq!(tags.len(), 5);
            assert!(tags.add_tag(id(4), Tag::Sprinting));
        }

        #[test]
        fn bulk_operations() {
            let mut tags = TagStore::with_entities(4);
            tags.add_to_all(Tag::Paused);
            assert_eq!(tags.count_with(Tag::Paused), 4);
            tags.remove_from_all(Tag::Paused);
            assert_eq!(tags.count_with(Tag::Paused), 0);
        }
    }

    mod possession_tests {
        use super::*;

        #[test]
        fn transfer_revokes_previous_holder() {
            let mut tags = TagStore::with_entities(3);
            tags.add_tag(id(0), Tag::Possession);
            tags.drain_journal();

            tags.add_tag(id(2), Tag::Possession);
            assert_eq!(tags.possession_holder(), Some(id(2)));
            assert_eq!(tags.count_with(Tag::Possession), 1);

            // Revoke is journaled before the grant
            let journal = tags.drain_journal();
            assert_eq!(
                journal,
                vec![
                    TagChange { entity: id(0), tag: Tag::Possession, added: false },
                    TagChange { entity: id(2), tag: Tag::Possession, added: true },
                ]
            );
        }

        #[test]
        fn re_adding_to_holder_is_noop() {
            let mut tags = TagStore::with_entities(2);
            tags.add_tag(id(1), Tag::Possession);
            tags.drain_journal();
            assert!(!tags.add_tag(id(1), Tag::Possession));
            assert!(tags.journal().is_empty());
        }

        #[test]
        fn release_clears_holder() {
            let mut tags = TagStore::with_entities(2);
            tags.add_tag(id(1), Tag::Possession);
            assert_eq!(tags.release_possession(), Some(id(1)));
            assert_eq!(tags.possession_holder(), None);
            assert_eq!(tags.release_possession(), None);
        }

        #[test]
        fn overwrite_keeps_single_holder() {
            let mut tags = TagStore::with_entities(3);
            tags.overwrite(id(0), TagSet::POSSESSION);
            tags.overwrite(id(1), TagSet::POSSESSION | TagSet::SPRINTING);
            assert_eq!(tags.possession_holder(), Some(id(1)));
            assert_eq!(tags.count_with(Tag::Possession), 1);
            assert!(tags.journal().is_empty());
        }

        #[test]
        fn entities_with_is_ordered() {
            let mut tags = TagStore::with_entities(5);
            tags.add_tag(id(3), Tag::Stunned);
            tags.add_tag(id(1), Tag::Stunned);
            let stunned: Vec<_> = tags.entities_with(Tag::Stunned).collect();
            assert_eq!(stunned, vec![id(1), id(3)]);
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u32, usize),
        Remove(u32, usize),
        Release,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..8, 0usize..Tag::ALL.len()).prop_map(|(e, t)| Op::Add(e, t)),
            (0u32..8, 0usize..Tag::ALL.len()).prop_map(|(e, t)| Op::Remove(e, t)),
            Just(Op::Release),
        ]
    }

    proptest! {
        #[test]
        fn possession_never_has_two_holders(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut tags = TagStore::with_entities(6);
            for op in ops {
                match op {
                    Op::Add(e, t) => { tags.add_tag(id(e), Tag::ALL[t]); }
                    Op::Remove(e, t) => { tags.remove_tag(id(e), Tag::ALL[t]); }
                    Op::Release => { tags.release_possession(); }
                }
                prop_assert!(tags.count_with(Tag::Possession) <= 1);
                match tags.possession_holder() {
                    Some(h) => prop_assert!(tags.has_tag(h, Tag::Possession)),
                    None => prop_assert_eq!(tags.count_with(Tag::Possession), 0),
                }
            }
        }
    }
}
