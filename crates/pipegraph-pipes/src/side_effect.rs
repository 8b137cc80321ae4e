//! Pipes that accumulate state while passing their input through
//!
//! The accumulated value reflects only what has been pulled so far; it is
//! complete once the pipe is exhausted. Reset and a new source clear it.

use crate::cursor::{Cursor, Item, Source, Upstream};
use crate::path::Path;
use crate::pipe::Pipe;
use std::collections::BTreeMap;

/// A pipe exposing auxiliary state gathered during iteration
pub trait SideEffectPipe<S, E>: Pipe<S, E> {
    type SideEffect;

    fn side_effect(&self) -> &Self::SideEffect;
}

/// Generates the pass-through `Cursor` and `Pipe` impls for a pipe with an
/// `upstream` slot, an `observe(&mut self)` hook and a `clear(&mut self)`.
macro_rules! pass_through {
    ($pipe:ident < S $(, $extra:ident)* > where $($bound:tt)*) => {
        impl<S, $($extra),*> Cursor<S> for $pipe<S $(, $extra)*>
        where
            $($bound)*
        {
            fn move_next(&mut self) -> bool {
                if !self.upstream.move_next() {
                    return false;
                }
                self.observe();
                true
            }

            fn current(&self) -> Option<&S> {
                self.upstream.current()
            }

            fn reset(&mut self) {
                self.upstream.reset();
                self.clear();
            }

            fn dispose(&mut self) {
                self.upstream.dispose();
            }

            fn path(&self) -> Path {
                self.upstream.path()
            }
        }

        impl<S, $($extra),*> Pipe<S, S> for $pipe<S $(, $extra)*>
        where
            $($bound)*
        {
            fn set_source(&mut self, source: Source<S>) {
                self.upstream.set(source);
                self.clear();
            }
        }
    };
}

/// Counts the values that have passed
pub struct CountPipe<S> {
    upstream: Upstream<S>,
    count: u64,
}

impl<S: Item> CountPipe<S> {
    pub fn new() -> Self {
        Self {
            upstream: Upstream::new(),
            count: 0,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    fn observe(&mut self) {
        self.count += 1;
    }

    fn clear(&mut self) {
        self.count = 0;
    }
}

impl<S: Item> Default for CountPipe<S> {
    fn default() -> Self {
        Self::new()
    }
}

pass_through!(CountPipe<S> where S: Item);

impl<S: Item> SideEffectPipe<S, S> for CountPipe<S> {
    type SideEffect = u64;

    fn side_effect(&self) -> &u64 {
        &self.count
    }
}

/// Collects every value that has passed
pub struct AggregatePipe<S> {
    upstream: Upstream<S>,
    collected: Vec<S>,
}

impl<S: Item> AggregatePipe<S> {
    pub fn new() -> Self {
        Self {
            upstream: Upstream::new(),
            collected: Vec::new(),
        }
    }

    fn observe(&mut self) {
        if let Some(value) = self.upstream.current() {
            self.collected.push(value.clone());
        }
    }

    fn clear(&mut self) {
        self.collected.clear();
    }
}

impl<S: Item> Default for AggregatePipe<S> {
    fn default() -> Self {
        Self::new()
    }
}

pass_through!(AggregatePipe<S> where S: Item);

impl<S: Item> SideEffectPipe<S, S> for AggregatePipe<S> {
    type SideEffect = Vec<S>;

    fn side_effect(&self) -> &Vec<S> {
        &self.collected
    }
}

/// Counts passing values per key
pub struct GroupCountPipe<S, K> {
    upstream: Upstream<S>,
    key: Box<dyn Fn(&S) -> K>,
    groups: BTreeMap<K, u64>,
}

impl<S: Item, K: Ord> GroupCountPipe<S, K> {
    pub fn new(key: impl Fn(&S) -> K + 'static) -> Self {
        Self {
            upstream: Upstream::new(),
            key: Box::new(key),
            groups: BTreeMap::new(),
        }
    }

    fn observe(&mut self) {
        if let Some(value) = self.upstream.current() {
            *self.groups.entry((self.key)(value)).or_insert(0) += 1;
        }
    }

    fn clear(&mut self) {
        self.groups.clear();
    }
}

pass_through!(GroupCountPipe<S, K> where S: Item, K: Ord);

impl<S: Item, K: Ord> SideEffectPipe<S, S> for GroupCountPipe<S, K> {
    type SideEffect = BTreeMap<K, u64>;

    fn side_effect(&self) -> &BTreeMap<K, u64> {
        &self.groups
    }
}

/// Count, minimum and maximum of the values seen
#[derive(Debug, Clone, PartialEq)]
pub struct Extrema<S> {
    pub count: u64,
    pub min: Option<S>,
    pub max: Option<S>,
}

impl<S> Default for Extrema<S> {
    fn default() -> Self {
        Self {
            count: 0,
            min: None,
            max: None,
        }
    }
}

/// Tracks [`Extrema`] over its input. Values that do not order against the
/// current bounds (such as NaN) are counted but never become a bound.
pub struct ExtremaPipe<S> {
    upstream: Upstream<S>,
    extrema: Extrema<S>,
}

impl<S: Item + PartialOrd> ExtremaPipe<S> {
    pub fn new() -> Self {
        Self {
            upstream: Upstream::new(),
            extrema: Extrema::default(),
        }
    }

    fn observe(&mut self) {
        let Some(value) = self.upstream.current() else {
            return;
        };
        let extrema = &mut self.extrema;
        extrema.count += 1;
        let comparable = value.partial_cmp(value).is_some();
        if comparable && extrema.min.as_ref().map_or(true, |min| value < min) {
            extrema.min = Some(value.clone());
        }
        if comparable && extrema.max.as_ref().map_or(true, |max| value > max) {
            extrema.max = Some(value.clone());
        }
    }

    fn clear(&mut self) {
        self.extrema = Extrema::default();
    }
}

impl<S: Item + PartialOrd> Default for ExtremaPipe<S> {
    fn default() -> Self {
        Self::new()
    }
}

pass_through!(ExtremaPipe<S> where S: Item + PartialOrd);

impl<S: Item + PartialOrd> SideEffectPipe<S, S> for ExtremaPipe<S> {
    type SideEffect = Extrema<S>;

    fn side_effect(&self) -> &Extrema<S> {
        &self.extrema
    }
}

/// Terminal sink: drains its whole input on the first advance and yields
/// nothing. The side effect is the number of values drained.
pub struct ConsumePipe<S> {
    upstream: Upstream<S>,
    consumed: u64,
}

impl<S: Item> ConsumePipe<S> {
    pub fn new() -> Self {
        Self {
            upstream: Upstream::new(),
            consumed: 0,
        }
    }
}

impl<S: Item> Default for ConsumePipe<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Item> Cursor<S> for ConsumePipe<S> {
    fn move_next(&mut self) -> bool {
        while self.upstream.move_next() {
            self.consumed += 1;
        }
        false
    }

    fn current(&self) -> Option<&S> {
        None
    }

    fn reset(&mut self) {
        self.upstream.reset();
        self.consumed = 0;
    }

    fn dispose(&mut self) {
        self.upstream.dispose();
    }

    fn path(&self) -> Path {
        Path::new()
    }
}

impl<S: Item> Pipe<S, S> for ConsumePipe<S> {
    fn set_source(&mut self, source: Source<S>) {
        self.upstream.set(source);
        self.consumed = 0;
    }

    fn produces_output(&self) -> bool {
        false
    }
}

impl<S: Item> SideEffectPipe<S, S> for ConsumePipe<S> {
    type SideEffect = u64;

    fn side_effect(&self) -> &u64 {
        &self.consumed
    }
}
