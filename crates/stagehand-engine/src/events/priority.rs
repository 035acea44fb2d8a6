use core::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::iter::Peekable;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

// ── ListenerId ────────────────────────────────────────────────────────────

/// Identity of an entry in a [`PriorityList`].
///
/// Allocated once per registration via [`ListenerId::new()`]; globally unique for the
/// lifetime of the process, so an id found in one list never aliases an entry in another.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a new, globally unique `ListenerId`.
    pub fn new() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

// ── Priority ──────────────────────────────────────────────────────────────

/// Dispatch priority. Lower values run first.
///
/// The five named bands are spaced [`Priority::BAND_GAP`] apart so callers can slot
/// fine-grained per-widget priorities between them with [`Priority::offset`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Priority(pub i32);

impl Priority {
    pub const BAND_GAP: i32 = 1024;

    pub const HIGHEST: Priority = Priority(-2 * Self::BAND_GAP);
    pub const HIGH: Priority = Priority(-Self::BAND_GAP);
    pub const MEDIUM: Priority = Priority(0);
    pub const LOW: Priority = Priority(Self::BAND_GAP);
    pub const LOWEST: Priority = Priority(2 * Self::BAND_GAP);

    #[inline]
    pub const fn new(v: i32) -> Self {
        Self(v)
    }

    /// Returns a priority `by` steps after `self` (negative values move earlier).
    #[inline]
    pub const fn offset(self, by: i32) -> Self {
        Self(self.0.saturating_add(by))
    }
}

impl Ord for Priority {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Priority {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────

/// Misuse of a [`PriorityList`]. The list is left unchanged whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriorityError {
    #[error("{id} is already registered at priority {priority}")]
    Duplicate { id: ListenerId, priority: Priority },

    #[error("{0} is not registered")]
    Missing(ListenerId),

    #[error("{id} is already at priority {priority}")]
    SamePriority { id: ListenerId, priority: Priority },
}

// ── PriorityList ──────────────────────────────────────────────────────────

/// Stable, priority-bucketed collection keyed by [`ListenerId`].
///
/// Ordering rules:
/// 1) bucket priority: ascending
/// 2) insertion order within a bucket
///
/// Iteration borrows the list, so entries cannot be added or removed while a dispatch
/// loop is walking it. Listeners that need to change the set go through
/// [`crate::events::EventCommands`], which is applied once the pass is over.
pub struct PriorityList<T> {
    buckets: BTreeMap<Priority, Vec<(ListenerId, T)>>,
    index: HashMap<ListenerId, Priority>,
}

impl<T> PriorityList<T> {
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: ListenerId) -> bool {
        self.index.contains_key(&id)
    }

    /// Returns the bucket `id` currently lives in.
    #[inline]
    pub fn priority_of(&self, id: ListenerId) -> Option<Priority> {
        self.index.get(&id).copied()
    }

    /// Registers `item` under a freshly allocated id.
    pub fn push(&mut self, priority: Priority, item: T) -> ListenerId {
        let id = ListenerId::new();
        self.insert_unchecked(priority, id, item);
        id
    }

    /// Registers `item` under `id`.
    ///
    /// Fails if `id` is already present anywhere in the list; the existing entry keeps
    /// its priority and position.
    pub fn add(&mut self, priority: Priority, id: ListenerId, item: T) -> Result<(), PriorityError> {
        if let Some(&existing) = self.index.get(&id) {
            log::warn!("priority list: {id} added twice (already at {existing})");
            return Err(PriorityError::Duplicate { id, priority: existing });
        }
        self.insert_unchecked(priority, id, item);
        Ok(())
    }

    /// Moves `id` to the end of the `priority` bucket.
    pub fn change_priority(&mut self, priority: Priority, id: ListenerId) -> Result<(), PriorityError> {
        let Some(&current) = self.index.get(&id) else {
            log::warn!("priority list: cannot re-prioritize {id}, it is not registered");
            return Err(PriorityError::Missing(id));
        };
        if current == priority {
            log::warn!("priority list: {id} is already at priority {priority}");
            return Err(PriorityError::SamePriority { id, priority });
        }
        let item = self.remove(id)?;
        self.insert_unchecked(priority, id, item);
        Ok(())
    }

    /// Removes `id` and returns its item. Empty buckets are dropped.
    pub fn remove(&mut self, id: ListenerId) -> Result<T, PriorityError> {
        let Some(priority) = self.index.remove(&id) else {
            log::warn!("priority list: cannot remove {id}, it is not registered");
            return Err(PriorityError::Missing(id));
        };

        let bucket = self
            .buckets
            .get_mut(&priority)
            .ok_or(PriorityError::Missing(id))?;
        let pos = bucket
            .iter()
            .position(|(entry, _)| *entry == id)
            .ok_or(PriorityError::Missing(id))?;
        let (_, item) = bucket.remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&priority);
        }
        Ok(item)
    }

    pub fn get(&self, id: ListenerId) -> Option<&T> {
        let priority = self.index.get(&id)?;
        self.buckets
            .get(priority)?
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|(_, item)| item)
    }

    pub fn get_mut(&mut self, id: ListenerId) -> Option<&mut T> {
        let priority = self.index.get(&id)?;
        self.buckets
            .get_mut(priority)?
            .iter_mut()
            .find(|(entry, _)| *entry == id)
            .map(|(_, item)| item)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.index.clear();
    }

    /// Iterates `(priority, item)` in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = (Priority, &T)> {
        self.buckets
            .iter()
            .flat_map(|(&p, bucket)| bucket.iter().map(move |(_, item)| (p, item)))
    }

    /// Iterates `(priority, item)` in dispatch order with mutable access to items.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Priority, &mut T)> {
        self.buckets
            .iter_mut()
            .flat_map(|(&p, bucket)| bucket.iter_mut().map(move |(_, item)| (p, item)))
    }

    /// Iterates ids in dispatch order.
    pub fn ids(&self) -> impl Iterator<Item = ListenerId> + '_ {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.iter().map(|(id, _)| *id))
    }

    /// Merges this list with `other` into one dispatch-ordered sequence.
    ///
    /// At equal priority, this list's bucket is drained before `other`'s.
    pub fn union<'a, U>(
        &'a self,
        other: &'a PriorityList<U>,
    ) -> Union<impl Iterator<Item = (Priority, &'a T)>, impl Iterator<Item = (Priority, &'a U)>> {
        union(self.iter(), other.iter())
    }

    /// Mutable counterpart of [`PriorityList::union`].
    pub fn union_mut<'a, U>(
        &'a mut self,
        other: &'a mut PriorityList<U>,
    ) -> Union<impl Iterator<Item = (Priority, &'a mut T)>, impl Iterator<Item = (Priority, &'a mut U)>>
    {
        union(self.iter_mut(), other.iter_mut())
    }

    fn insert_unchecked(&mut self, priority: Priority, id: ListenerId, item: T) {
        self.buckets.entry(priority).or_default().push((id, item));
        self.index.insert(id, priority);
    }
}

impl<T> Default for PriorityList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PriorityList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityList")
            .field("len", &self.len())
            .field("buckets", &self.buckets.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ── Union ─────────────────────────────────────────────────────────────────

/// One element of a merged sequence: from the left or the right list.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

/// Lazy merge of two priority-ordered sequences.
pub struct Union<A: Iterator, B: Iterator> {
    left: Peekable<A>,
    right: Peekable<B>,
}

/// Merges two ascending `(priority, item)` sequences, left first on ties.
pub fn union<A, B, L, R>(left: A, right: B) -> Union<A::IntoIter, B::IntoIter>
where
    A: IntoIterator<Item = (Priority, L)>,
    B: IntoIterator<Item = (Priority, R)>,
{
    Union {
        left: left.into_iter().peekable(),
        right: right.into_iter().peekable(),
    }
}

impl<A, B, L, R> Iterator for Union<A, B>
where
    A: Iterator<Item = (Priority, L)>,
    B: Iterator<Item = (Priority, R)>,
{
    type Item = (Priority, Either<L, R>);

    fn next(&mut self) -> Option<Self::Item> {
        let take_left = match (self.left.peek(), self.right.peek()) {
            (Some((lp, _)), Some((rp, _))) => lp <= rp,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };

        if take_left {
            self.left.next().map(|(p, l)| (p, Either::Left(l)))
        } else {
            self.right.next().map(|(p, r)| (p, Either::Right(r)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items<T: Clone>(list: &PriorityList<T>) -> Vec<T> {
        list.iter().map(|(_, item)| item.clone()).collect()
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn iterates_ascending_priority_then_insertion_order() {
        let mut list = PriorityList::new();
        list.push(Priority(5), "c");
        list.push(Priority(-3), "a");
        list.push(Priority(5), "d");
        list.push(Priority(0), "b");
        list.push(Priority(-3), "a2");

        assert_eq!(items(&list), vec!["a", "a2", "b", "c", "d"]);
    }

    #[test]
    fn bands_are_ordered_and_leave_room_between() {
        assert!(Priority::HIGHEST < Priority::HIGH);
        assert!(Priority::HIGH < Priority::MEDIUM);
        assert!(Priority::MEDIUM < Priority::LOW);
        assert!(Priority::LOW < Priority::LOWEST);
        assert!(Priority::HIGH.offset(Priority::BAND_GAP - 1) < Priority::MEDIUM);
    }

    #[test]
    fn iteration_is_restartable() {
        let mut list = PriorityList::new();
        list.push(Priority::LOW, 2);
        list.push(Priority::HIGH, 1);
        assert_eq!(items(&list), vec![1, 2]);
        assert_eq!(items(&list), vec![1, 2]);
    }

    // ── identity ──────────────────────────────────────────────────────────

    #[test]
    fn add_duplicate_id_fails_and_leaves_state_unchanged() {
        let mut list = PriorityList::new();
        let id = ListenerId::new();
        list.add(Priority(3), id, "first").unwrap();
        list.push(Priority(7), "other");

        let err = list.add(Priority(9), id, "second").unwrap_err();
        assert_eq!(err, PriorityError::Duplicate { id, priority: Priority(3) });
        assert_eq!(list.priority_of(id), Some(Priority(3)));
        assert_eq!(list.get(id), Some(&"first"));
        assert_eq!(list.len(), 2);
        assert_eq!(items(&list), vec!["first", "other"]);
    }

    #[test]
    fn remove_drops_empty_bucket() {
        let mut list = PriorityList::new();
        let id = list.push(Priority(4), "only");
        assert_eq!(list.remove(id), Ok("only"));
        assert!(list.is_empty());
        assert!(list.buckets.is_empty());
    }

    #[test]
    fn remove_missing_is_an_error() {
        let mut list: PriorityList<u8> = PriorityList::new();
        let id = ListenerId::new();
        assert_eq!(list.remove(id), Err(PriorityError::Missing(id)));
    }

    // ── change_priority ───────────────────────────────────────────────────

    #[test]
    fn change_priority_moves_entry_to_end_of_new_bucket() {
        let mut list = PriorityList::new();
        let a = list.push(Priority(0), "a");
        list.push(Priority(10), "b");
        list.push(Priority(10), "c");

        list.change_priority(Priority(10), a).unwrap();
        assert_eq!(items(&list), vec!["b", "c", "a"]);
        assert_eq!(list.priority_of(a), Some(Priority(10)));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn change_priority_to_same_value_is_rejected_without_moving() {
        let mut list = PriorityList::new();
        let a = list.push(Priority(1), "a");
        list.push(Priority(1), "b");

        assert_eq!(
            list.change_priority(Priority(1), a),
            Err(PriorityError::SamePriority { id: a, priority: Priority(1) })
        );
        assert_eq!(items(&list), vec!["a", "b"]);
    }

    #[test]
    fn change_priority_of_missing_entry_fails() {
        let mut list: PriorityList<u8> = PriorityList::new();
        let id = ListenerId::new();
        assert_eq!(list.change_priority(Priority(2), id), Err(PriorityError::Missing(id)));
    }

    // ── union ─────────────────────────────────────────────────────────────

    #[test]
    fn union_drains_left_bucket_first_on_ties() {
        let mut a = PriorityList::new();
        a.push(Priority(0), "a1");
        a.push(Priority(5), "a2");

        let mut b = PriorityList::new();
        b.push(Priority(0), "b1");
        b.push(Priority(3), "b2");

        let merged: Vec<&str> = a
            .union(&b)
            .map(|(_, e)| match e {
                Either::Left(s) | Either::Right(s) => *s,
            })
            .collect();

        assert_eq!(merged, vec!["a1", "b1", "b2", "a2"]);
    }

    #[test]
    fn union_mixes_element_types() {
        let mut keys = PriorityList::new();
        keys.push(Priority::LOW, 'k');
        let mut actions = PriorityList::new();
        actions.push(Priority::HIGH, 7u32);

        let merged: Vec<Either<char, u32>> = keys
            .union(&actions)
            .map(|(_, e)| match e {
                Either::Left(c) => Either::Left(*c),
                Either::Right(n) => Either::Right(*n),
            })
            .collect();

        assert_eq!(merged, vec![Either::Right(7), Either::Left('k')]);
    }

    #[test]
    fn union_mut_allows_calling_both_sides() {
        let mut left: PriorityList<Vec<u8>> = PriorityList::new();
        left.push(Priority(1), Vec::new());
        let mut right: PriorityList<Vec<u8>> = PriorityList::new();
        right.push(Priority(0), Vec::new());

        let mut seq = 0u8;
        for (_, e) in left.union_mut(&mut right) {
            match e {
                Either::Left(v) | Either::Right(v) => v.push(seq),
            }
            seq += 1;
        }

        assert_eq!(items(&right), vec![vec![0]]);
        assert_eq!(items(&left), vec![vec![1]]);
    }
}
