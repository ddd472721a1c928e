//! # seqmap
//!
//! An insertion-ordered map that keeps a fast key lookup and a mutable
//! insertion order consistent under inserts, removals, and positional
//! splicing, with set-like combinators and explicit compaction.
//!
//! Lookup goes through a key index (key -> slot position); order lives in an
//! append-only slot store. Removing a key leaves a tombstone slot behind so
//! that every other key keeps its position; tombstones are only reclaimed by
//! [`compact`](SeqMap::compact) or by operations that rebuild the container
//! anyway ([`map`](SeqMap::map), [`filter`](SeqMap::filter),
//! [`union`](SeqMap::union), ...).
//!
//! ## Example
//!
//! ```rust
//! use seqmap::SeqMap;
//!
//! let mut map = SeqMap::new();
//! map.insert("a", 1);
//! map.insert("b", 2);
//! map.insert("c", 3);
//!
//! // Removing and reinserting a key appends it at the end.
//! map.remove(&"b");
//! map.insert("b", 4);
//! let order: Vec<_> = map.keys().copied().collect();
//! assert_eq!(order, ["a", "c", "b"]);
//!
//! // Positional splicing redefines the order.
//! map.insert_before(&"c", "b", 4);
//! let order: Vec<_> = map.keys().copied().collect();
//! assert_eq!(order, ["a", "b", "c"]);
//!
//! // Compaction reclaims tombstones without changing what is observable.
//! map.compact();
//! assert_eq!(map.tombstone_count(), 0);
//! ```

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::mem;

use hashbrown::{DefaultHashBuilder, HashMap};

// =============================================================================
// Slot store
// =============================================================================

/// Append-only sequence of entry slots.
///
/// A removed entry leaves a `None` tombstone behind so that the positions of
/// all other slots are unaffected. The store never shrinks except on a full
/// rebuild.
#[derive(Clone)]
struct SlotStore<K, V> {
    slots: Vec<Option<(K, V)>>,
    live: usize,
}

impl<K, V> SlotStore<K, V> {
    const fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    fn with_capacity(n: usize) -> Self {
        Self {
            slots: Vec::with_capacity(n),
            live: 0,
        }
    }

    /// Pushes a new live slot and returns its position (the old length).
    fn append(&mut self, key: K, value: V) -> usize {
        let pos = self.slots.len();
        self.slots.push(Some((key, value)));
        self.live += 1;
        pos
    }

    fn get(&self, pos: usize) -> Option<&(K, V)> {
        self.slots.get(pos)?.as_ref()
    }

    fn get_mut(&mut self, pos: usize) -> Option<&mut (K, V)> {
        self.slots.get_mut(pos)?.as_mut()
    }

    /// Empties the slot without shrinking the sequence.
    fn tombstone(&mut self, pos: usize) -> Option<(K, V)> {
        let entry = self.slots.get_mut(pos)?.take()?;
        self.live -= 1;
        Some(entry)
    }

    /// Overwrites a live slot's value in place, returning the old value.
    fn set_value(&mut self, pos: usize, value: V) -> Option<V> {
        let entry = self.slots.get_mut(pos)?.as_mut()?;
        Some(mem::replace(&mut entry.1, value))
    }

    fn live_count(&self) -> usize {
        self.live
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
    }

    /// Number of live slots strictly before `pos`, i.e. the live-order index
    /// of the entry at `pos`.
    fn live_before(&self, pos: usize) -> usize {
        self.slots[..pos].iter().filter(|slot| slot.is_some()).count()
    }

    fn prev_live(&self, pos: usize) -> Option<&(K, V)> {
        self.slots[..pos].iter().rev().find_map(|slot| slot.as_ref())
    }

    fn next_live(&self, pos: usize) -> Option<&(K, V)> {
        self.slots[pos + 1..].iter().find_map(|slot| slot.as_ref())
    }

    /// Consumes the store, yielding the live entries in ascending position.
    fn into_live(self) -> Vec<(K, V)> {
        self.slots.into_iter().flatten().collect()
    }
}

impl<K, V> Default for SlotStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SeqMap
// =============================================================================

/// An insertion-ordered map with positional splicing and explicit compaction.
///
/// Keys map to slot positions through a hash index; the slots themselves hold
/// the entries in order. The live order of keys is the ascending order of
/// their slot positions. Inserting an existing key replaces its value in
/// place without moving it; removing a key tombstones its slot, and a later
/// reinsertion of the same key appends a fresh trailing slot (the tombstone
/// is never reused).
pub struct SeqMap<K, V, S = DefaultHashBuilder> {
    index: HashMap<K, usize, S>,
    slots: SlotStore<K, V>,
}

impl<K, V> SeqMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map. Does not allocate until first insertion.
    #[inline]
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            slots: SlotStore::new(),
        }
    }

    /// Creates an empty map with room for at least `n` entries.
    #[inline]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            index: HashMap::with_capacity(n),
            slots: SlotStore::with_capacity(n),
        }
    }
}

impl<K, V, S> SeqMap<K, V, S> {
    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.live_count()
    }

    /// Returns `true` if the map holds no live entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tombstoned slots currently retained.
    ///
    /// The map never compacts on its own; callers can use this to decide when
    /// a [`compact`](SeqMap::compact) is worth it.
    #[inline]
    pub fn tombstone_count(&self) -> usize {
        self.slots.len() - self.slots.live_count()
    }

    /// Iterates over the live entries in live order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots.slots.iter(),
            remaining: self.slots.live_count(),
        }
    }

    /// Iterates over the live keys in live order.
    #[inline]
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Iterates over the live values in live order.
    #[inline]
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Returns the `index`-th entry in live order, or `None` if out of range.
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        if index >= self.len() {
            return None;
        }
        self.iter().nth(index)
    }
}

impl<K, V, S> SeqMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Default,
{
    /// Creates an empty map using the provided hasher.
    #[inline]
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Creates an empty map with the given capacity and hasher.
    #[inline]
    pub fn with_capacity_and_hasher(n: usize, hasher: S) -> Self {
        Self {
            index: HashMap::with_capacity_and_hasher(n, hasher),
            slots: SlotStore::with_capacity(n),
        }
    }

    /// Creates a map holding a single entry.
    pub fn singleton(key: K, value: V) -> Self {
        let mut map = Self::with_capacity_and_hasher(1, S::default());
        map.insert(key, value);
        map
    }

    /// Reserves capacity for at least `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        self.index.reserve(additional);
        self.slots.reserve(additional);
    }

    /// Inserts a key-value pair.
    ///
    /// If the key is absent it is appended and becomes last in live order. If
    /// the key is present its value is replaced in place and its position is
    /// unchanged; the old value is returned. Use
    /// [`insert_end`](SeqMap::insert_end) to move an existing key instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use seqmap::SeqMap;
    ///
    /// let mut map = SeqMap::new();
    /// assert_eq!(map.insert("a", 1), None);
    /// assert_eq!(map.insert("a", 2), Some(1));
    /// assert_eq!(map.get(&"a"), Some(&2));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&pos) = self.index.get(&key) {
            let old = self.slots.set_value(pos, value);
            debug_assert!(old.is_some(), "indexed slot must be live");
            return old;
        }
        let pos = self.slots.append(key.clone(), value);
        self.index.insert(key, pos);
        None
    }

    /// Removes a key, returning its value if it was present.
    ///
    /// The slot becomes a tombstone; all other positions are unaffected and
    /// no compaction happens. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let pos = self.index.remove(key)?;
        let entry = self.slots.tombstone(pos);
        debug_assert!(entry.is_some(), "indexed slot must be live");
        entry.map(|(_, value)| value)
    }

    /// Applies `f` to the current value of `key` (or `None` if absent).
    ///
    /// If `f` yields a value it is stored per the [`insert`](SeqMap::insert)
    /// contract (replace in place, or append if absent); if it yields `None`
    /// the key is removed. Returns the displaced value, if any.
    pub fn update<F>(&mut self, key: K, f: F) -> Option<V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        match f(self.get(&key)) {
            Some(value) => self.insert(key, value),
            None => self.remove(&key),
        }
    }

    /// Returns a reference to the value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<&V> {
        let &pos = self.index.get(key)?;
        self.slots.get(pos).map(|(_, value)| value)
    }

    /// Returns a mutable reference to the value for `key`, if present.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let &pos = self.index.get(key)?;
        self.slots.get_mut(pos).map(|(_, value)| value)
    }

    /// Returns `true` if `key` is live in the map.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the live-order index of `key`, or `None` if absent.
    ///
    /// Consistent with [`get_index`](SeqMap::get_index):
    /// `map.get_index(map.get_index_of(&k)?)` yields `k`'s entry.
    pub fn get_index_of(&self, key: &K) -> Option<usize> {
        let &pos = self.index.get(key)?;
        Some(self.slots.live_before(pos))
    }

    /// Value of the live entry immediately before `key`, or `None` if `key`
    /// is absent or first.
    pub fn get_before(&self, key: &K) -> Option<&V> {
        let &pos = self.index.get(key)?;
        self.slots.prev_live(pos).map(|(_, value)| value)
    }

    /// Value of the live entry immediately after `key`, or `None` if `key`
    /// is absent or last.
    pub fn get_after(&self, key: &K) -> Option<&V> {
        let &pos = self.index.get(key)?;
        self.slots.next_live(pos).map(|(_, value)| value)
    }

    /// Inserts `key` at the front of live order, removing it first if
    /// present (insert-or-move-to-start, always updating the value).
    ///
    /// Returns the previous value, if any. O(n): the surviving entries are
    /// renumbered so that ascending slot position matches the new order.
    pub fn insert_start(&mut self, key: K, value: V) -> Option<V> {
        let old = self.remove(&key);
        self.splice_at(0, key, value);
        old
    }

    /// Inserts `key` at the back of live order, removing it first if present
    /// (insert-or-move-to-end, always updating the value).
    ///
    /// # Examples
    ///
    /// ```
    /// use seqmap::SeqMap;
    ///
    /// let mut map: SeqMap<_, _> = [("a", 1), ("b", 2)].into_iter().collect();
    /// map.insert_end("a", 10);
    /// let entries: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
    /// assert_eq!(entries, [("b", 2), ("a", 10)]);
    /// ```
    pub fn insert_end(&mut self, key: K, value: V) -> Option<V> {
        let old = self.remove(&key);
        self.insert(key, value);
        old
    }

    /// Inserts `key` immediately before `marker` in live order, removing
    /// `key` first if present.
    ///
    /// If `marker` is absent (including when `marker == key`, whose removal
    /// happens first), the entry is appended at the end instead.
    pub fn insert_before(&mut self, marker: &K, key: K, value: V) -> Option<V> {
        let old = self.remove(&key);
        match self.get_index_of(marker) {
            Some(at) => self.splice_at(at, key, value),
            None => {
                self.insert(key, value);
            }
        }
        old
    }

    /// Inserts `key` immediately after `marker` in live order, removing
    /// `key` first if present.
    ///
    /// If `marker` is absent the entry is appended at the end instead.
    pub fn insert_after(&mut self, marker: &K, key: K, value: V) -> Option<V> {
        let old = self.remove(&key);
        match self.get_index_of(marker) {
            Some(at) => self.splice_at(at + 1, key, value),
            None => {
                self.insert(key, value);
            }
        }
        old
    }

    /// Returns a new map holding the live entries whose live-order index is
    /// in `[start, end)`, in the same relative order.
    ///
    /// The window is clipped to the available range; an empty or reversed
    /// window yields an empty map. The result has no tombstones.
    pub fn slice(&self, start: usize, end: usize) -> Self
    where
        V: Clone,
    {
        let end = end.min(self.len());
        let start = start.min(end);
        let mut out = Self::with_capacity_and_hasher(end - start, S::default());
        for (key, value) in self.iter().skip(start).take(end - start) {
            out.insert(key.clone(), value.clone());
        }
        out
    }

    /// Rebuilds the map with zero tombstones, renumbering slot positions
    /// contiguously from 0. Live order and values are unchanged; idempotent.
    ///
    /// This is the only operation whose sole purpose is reclaiming the space
    /// removals leave behind; nothing compacts automatically.
    pub fn compact(&mut self) {
        if self.tombstone_count() == 0 {
            return;
        }
        let entries = mem::take(&mut self.slots).into_live();
        self.rebuild(entries);
    }

    /// Splices a key known to be absent at live-order index `at`.
    ///
    /// Renumbering step for the positional inserts: materialize the live
    /// sequence, insert at the target index, rebuild both structures.
    fn splice_at(&mut self, at: usize, key: K, value: V) {
        debug_assert!(
            !self.index.contains_key(&key),
            "splice requires an absent key"
        );
        let mut entries = mem::take(&mut self.slots).into_live();
        let at = at.min(entries.len());
        entries.insert(at, (key, value));
        self.rebuild(entries);
    }

    fn rebuild(&mut self, entries: Vec<(K, V)>) {
        self.index.clear();
        let mut slots = SlotStore::with_capacity(entries.len());
        for (key, value) in entries {
            let pos = slots.append(key.clone(), value);
            self.index.insert(key, pos);
        }
        self.slots = slots;
    }
}

// =============================================================================
// Derived views
// =============================================================================

impl<K, V, S> SeqMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Default,
{
    /// Applies a key-aware function to every value, preserving keys and
    /// order. The result is rebuilt with no tombstones.
    pub fn map<W, F>(&self, mut f: F) -> SeqMap<K, W, S>
    where
        F: FnMut(&K, &V) -> W,
    {
        let mut out = SeqMap::with_capacity_and_hasher(self.len(), S::default());
        for (key, value) in self.iter() {
            out.insert(key.clone(), f(key, value));
        }
        out
    }

    /// Keeps the entries satisfying `pred`, preserving relative order. The
    /// result is rebuilt with no tombstones.
    pub fn filter<F>(&self, mut pred: F) -> Self
    where
        V: Clone,
        F: FnMut(&K, &V) -> bool,
    {
        let mut out = Self::with_hasher(S::default());
        for (key, value) in self.iter() {
            if pred(key, value) {
                out.insert(key.clone(), value.clone());
            }
        }
        out
    }

    /// Splits the entries by `pred` into (matching, non-matching), both
    /// preserving relative order and holding no tombstones.
    pub fn partition<F>(&self, mut pred: F) -> (Self, Self)
    where
        V: Clone,
        F: FnMut(&K, &V) -> bool,
    {
        let mut yes = Self::with_hasher(S::default());
        let mut no = Self::with_hasher(S::default());
        for (key, value) in self.iter() {
            let target = if pred(key, value) { &mut yes } else { &mut no };
            target.insert(key.clone(), value.clone());
        }
        (yes, no)
    }
}

// =============================================================================
// Combinators
// =============================================================================

impl<K, V, S> SeqMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Default,
{
    /// Folds `self`'s entries into `right` via [`insert`](SeqMap::insert).
    ///
    /// Keys present in `right` keep `right`'s position and take `self`'s
    /// value (insert never reorders an existing key); keys only in `self`
    /// are appended at the end in `self`'s order.
    pub fn union(&self, right: &Self) -> Self
    where
        V: Clone,
    {
        let mut out = Self::with_capacity_and_hasher(self.len() + right.len(), S::default());
        for (key, value) in right.iter() {
            out.insert(key.clone(), value.clone());
        }
        for (key, value) in self.iter() {
            out.insert(key.clone(), value.clone());
        }
        out
    }

    /// Keeps `self`'s entries whose key is also in `right`; `self`'s order
    /// and values.
    pub fn intersect<B>(&self, right: &SeqMap<K, B, S>) -> Self
    where
        V: Clone,
    {
        self.filter(|key, _| right.contains_key(key))
    }

    /// Keeps `self`'s entries whose key is not in `right`; `self`'s order.
    pub fn difference<B>(&self, right: &SeqMap<K, B, S>) -> Self
    where
        V: Clone,
    {
        self.filter(|key, _| !right.contains_key(key))
    }

    /// General three-way fold over the key-set union of `self` and `right`.
    ///
    /// Keys are visited exactly once: `self`'s keys in `self`'s order, then
    /// the keys exclusive to `right` in `right`'s order. Exactly one of the
    /// three callbacks fires per key, by membership.
    pub fn merge<B, A, FL, FB, FR>(
        &self,
        right: &SeqMap<K, B, S>,
        init: A,
        mut on_left_only: FL,
        mut on_both: FB,
        mut on_right_only: FR,
    ) -> A
    where
        FL: FnMut(A, &K, &V) -> A,
        FB: FnMut(A, &K, &V, &B) -> A,
        FR: FnMut(A, &K, &B) -> A,
    {
        let mut acc = init;
        for (key, value) in self.iter() {
            acc = match right.get(key) {
                Some(other) => on_both(acc, key, value, other),
                None => on_left_only(acc, key, value),
            };
        }
        for (key, other) in right.iter() {
            if !self.contains_key(key) {
                acc = on_right_only(acc, key, other);
            }
        }
        acc
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Borrowing iterator over live entries in live order.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    slots: std::slice::Iter<'a, Option<(K, V)>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.slots.next()? {
                self.remaining -= 1;
                return Some((key, value));
            }
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.slots.next_back()? {
                self.remaining -= 1;
                return Some((key, value));
            }
        }
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    #[inline]
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Owning iterator over live entries in live order.
#[derive(Debug)]
pub struct IntoIter<K, V> {
    slots: std::vec::IntoIter<Option<(K, V)>>,
    remaining: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.slots.next()? {
                self.remaining -= 1;
                return Some(entry);
            }
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.slots.next_back()? {
                self.remaining -= 1;
                return Some(entry);
            }
        }
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    #[inline]
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K, V, S> IntoIterator for SeqMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.slots.live_count(),
            slots: self.slots.slots.into_iter(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a SeqMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Standard traits
// =============================================================================

impl<K, V, S> Default for SeqMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_capacity_and_hasher(0, S::default())
    }
}

impl<K, V, S> Clone for SeqMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
            slots: self.slots.clone(),
        }
    }
}

/// Collects pairs with the remove-then-insert idiom: a later duplicate key
/// wins the value and moves to the end of the order.
impl<K, V, S> FromIterator<(K, V)> for SeqMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity_and_hasher(iter.size_hint().0, S::default());
        map.extend(iter);
        map
    }
}

/// Extends with the same duplicate policy as `FromIterator`: a duplicate key
/// moves to the end with the new value.
impl<K, V, S> Extend<(K, V)> for SeqMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Default,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.insert_end(key, value);
        }
    }
}

/// Equality over the live entries in live order; the internal tombstone
/// layout is not observable.
impl<K, V, S> PartialEq for SeqMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K, V, S> Eq for SeqMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
{
}

impl<K, V, S> fmt::Debug for SeqMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
