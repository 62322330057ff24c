//! Reached sets: explored (state, precision) pairs plus a waitlist.

use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Debug};
use std::hash::Hash;

/// Collection of explored abstract states, each paired with its precision,
/// plus a waitlist of states not yet processed.
///
/// Popping a state from the waitlist marks it as "being processed"; the state
/// stays in the set.
pub trait ReachedSet {
    type State;
    type Precision;

    /// Add a state with its precision and put it on the waitlist.
    fn add(&mut self, state: Self::State, precision: Self::Precision);

    /// Check if the state is in the set (waiting or not).
    fn contains(&self, state: &Self::State) -> bool;

    /// Precision the state was added with.
    fn precision(&self, state: &Self::State) -> Option<&Self::Precision>;

    /// The first state ever added.
    fn first_state(&self) -> Option<&Self::State>;

    fn pop_from_waitlist(&mut self) -> Option<Self::State>;

    /// Put an already contained state back on the waitlist.
    fn re_add_to_waitlist(&mut self, state: Self::State);

    fn has_waiting_state(&self) -> bool;

    /// Number of states in the set.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insertion-ordered reached set with a FIFO waitlist.
#[derive(Clone)]
pub struct DefaultReachedSet<S, P> {
    entries: Vec<(S, P)>,
    index: HashMap<S, usize>,
    waitlist: VecDeque<S>,
}

impl<S, P> DefaultReachedSet<S, P>
where
    S: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            waitlist: VecDeque::new(),
        }
    }

    /// Iterate over all (state, precision) entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&S, &P)> {
        self.entries.iter().map(|(s, p)| (s, p))
    }

    /// Iterate over all states in insertion order.
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.entries.iter().map(|(s, _)| s)
    }

    /// States currently on the waitlist, front first.
    pub fn waitlist(&self) -> impl Iterator<Item = &S> {
        self.waitlist.iter()
    }

    pub fn waitlist_size(&self) -> usize {
        self.waitlist.len()
    }
}

impl<S, P> Default for DefaultReachedSet<S, P>
where
    S: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, P> Debug for DefaultReachedSet<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultReachedSet")
            .field("size", &self.entries.len())
            .field("waiting", &self.waitlist.len())
            .finish()
    }
}

impl<S, P> ReachedSet for DefaultReachedSet<S, P>
where
    S: Clone + Eq + Hash,
{
    type State = S;
    type Precision = P;

    /// Adding a state that is already contained keeps its first precision
    /// and does not touch the waitlist.
    fn add(&mut self, state: S, precision: P) {
        if self.index.contains_key(&state) {
            return;
        }
        self.index.insert(state.clone(), self.entries.len());
        self.entries.push((state.clone(), precision));
        self.waitlist.push_back(state);
    }

    fn contains(&self, state: &S) -> bool {
        self.index.contains_key(state)
    }

    fn precision(&self, state: &S) -> Option<&P> {
        self.index.get(state).map(|&i| &self.entries[i].1)
    }

    fn first_state(&self) -> Option<&S> {
        self.entries.first().map(|(s, _)| s)
    }

    fn pop_from_waitlist(&mut self) -> Option<S> {
        self.waitlist.pop_front()
    }

    fn re_add_to_waitlist(&mut self, state: S) {
        if self.contains(&state) {
            self.waitlist.push_back(state);
        }
    }

    fn has_waiting_state(&self) -> bool {
        !self.waitlist.is_empty()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
