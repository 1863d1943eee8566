use std::collections::{BTreeMap, BTreeSet};

use crate::ids::CardId;

/// Unordered card collection with deterministic iteration (by id).
pub type CardSet = BTreeSet<CardId>;

/// Handle to a [`Group`] stored in the duel's group arena.
///
/// Processes hold handles rather than sets so that a parent and the children
/// it spawned can all edit the same working set across suspensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupId(pub u32);

/// A card set that can be frozen once it is handed to a process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub cards: CardSet,
    pub readonly: bool,
}

impl Group {
    pub fn new(cards: CardSet) -> Self {
        Self {
            cards,
            readonly: false,
        }
    }

    pub fn contains(&self, card: CardId) -> bool {
        self.cards.contains(&card)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Group storage keyed by [`GroupId`].
#[derive(Debug, Clone, Default)]
pub struct GroupArena {
    groups: BTreeMap<GroupId, Group>,
    next: u32,
}

impl GroupArena {
    pub fn create(&mut self, cards: CardSet) -> GroupId {
        let id = GroupId(self.next);
        self.next += 1;
        self.groups.insert(id, Group::new(cards));
        id
    }

    /// Create a group that later edits through [`GroupArena::insert`] ignore.
    pub fn create_readonly(&mut self, cards: CardSet) -> GroupId {
        let id = self.create(cards);
        if let Some(group) = self.groups.get_mut(&id) {
            group.readonly = true;
        }
        id
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// Members of a group; a dropped group reads as empty.
    pub fn cards(&self, id: GroupId) -> CardSet {
        self.groups
            .get(&id)
            .map(|g| g.cards.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: GroupId, card: CardId) -> bool {
        self.groups.get(&id).is_some_and(|g| g.contains(card))
    }

    pub fn len(&self, id: GroupId) -> usize {
        self.groups.get(&id).map_or(0, Group::len)
    }

    pub fn insert(&mut self, id: GroupId, card: CardId) {
        if let Some(group) = self.groups.get_mut(&id)
            && !group.readonly
        {
            group.cards.insert(card);
        }
    }

    /// Engine-side insert that also reaches read-only groups, used when a
    /// process widens its own working set (destroy substitutes).
    pub fn add_member(&mut self, id: GroupId, card: CardId) {
        if let Some(group) = self.groups.get_mut(&id) {
            group.cards.insert(card);
        }
    }

    /// Remove a card from the working set. Read-only groups still shrink:
    /// the flag only guards against callers adding members.
    pub fn remove(&mut self, id: GroupId, card: CardId) -> bool {
        self.groups
            .get_mut(&id)
            .is_some_and(|g| g.cards.remove(&card))
    }

    pub fn set_cards(&mut self, id: GroupId, cards: CardSet) {
        if let Some(group) = self.groups.get_mut(&id) {
            group.cards = cards;
        }
    }

    /// Drop every group. Only valid when no process frame is alive.
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn live(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_edits() {
        let mut arena = GroupArena::default();
        let id = arena.create([CardId(1), CardId(2)].into_iter().collect());
        assert!(arena.remove(id, CardId(1)));
        assert!(!arena.contains(id, CardId(1)));
        assert_eq!(arena.len(id), 1);
    }

    #[test]
    fn test_readonly_allows_shrinking() {
        let mut arena = GroupArena::default();
        let id = arena.create_readonly([CardId(3)].into_iter().collect());
        assert!(arena.get(id).is_some_and(|g| g.readonly));
        assert!(arena.remove(id, CardId(3)));
        assert!(arena.cards(id).is_empty());
    }

    #[test]
    fn test_dropped_group_reads_empty() {
        let mut arena = GroupArena::default();
        let id = arena.create(CardSet::new());
        arena.clear();
        assert_eq!(arena.len(id), 0);
        assert_eq!(arena.live(), 0);
    }
}
