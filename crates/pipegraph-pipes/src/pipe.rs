//! The pipe abstraction and the basic transforming pipes

use crate::cursor::{Cursor, Item, Source, Upstream};
use crate::path::Path;
use std::marker::PhantomData;

/// A lazy stage turning a sequence of `S` into a sequence of `E`.
///
/// A pipe is a [`Cursor`] over its output that reads from exactly one
/// [`Source`]. Setting a new source discards all iteration state.
pub trait Pipe<S, E>: Cursor<E> {
    fn set_source(&mut self, source: Source<S>);

    /// Whether this pipe reads from a source at all. Root pipes that
    /// generate their own sequence return `false`.
    fn accepts_source(&self) -> bool {
        true
    }

    /// Whether this pipe yields values. Terminal sinks return `false`.
    fn produces_output(&self) -> bool {
        true
    }
}

impl<S, E, P: Pipe<S, E> + ?Sized> Pipe<S, E> for Box<P> {
    fn set_source(&mut self, source: Source<S>) {
        (**self).set_source(source)
    }

    fn accepts_source(&self) -> bool {
        (**self).accepts_source()
    }

    fn produces_output(&self) -> bool {
        (**self).produces_output()
    }
}

/// Feed `upstream` into `next` and return `next`
pub fn connect<M, N, U, P>(upstream: U, mut next: P) -> P
where
    M: Item,
    U: Cursor<M> + 'static,
    P: Pipe<M, N>,
{
    next.set_source(Source::cursor(upstream));
    next
}

/// Passes every value through unchanged
pub struct IdentityPipe<S> {
    upstream: Upstream<S>,
}

impl<S: Item> IdentityPipe<S> {
    pub fn new() -> Self {
        Self {
            upstream: Upstream::new(),
        }
    }
}

impl<S: Item> Default for IdentityPipe<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Item> Cursor<S> for IdentityPipe<S> {
    fn move_next(&mut self) -> bool {
        self.upstream.move_next()
    }

    fn current(&self) -> Option<&S> {
        self.upstream.current()
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn dispose(&mut self) {
        self.upstream.dispose();
    }

    fn path(&self) -> Path {
        self.upstream.path()
    }
}

impl<S: Item> Pipe<S, S> for IdentityPipe<S> {
    fn set_source(&mut self, source: Source<S>) {
        self.upstream.set(source);
    }
}

/// Maps each value through a function
pub struct MapPipe<S, E> {
    upstream: Upstream<S>,
    map: Box<dyn FnMut(&S) -> E>,
    current: Option<E>,
}

impl<S: Item, E: Item> MapPipe<S, E> {
    pub fn new(map: impl FnMut(&S) -> E + 'static) -> Self {
        Self {
            upstream: Upstream::new(),
            map: Box::new(map),
            current: None,
        }
    }
}

impl<S: Item, E: Item> Cursor<E> for MapPipe<S, E> {
    fn move_next(&mut self) -> bool {
        self.current = None;
        if !self.upstream.move_next() {
            return false;
        }
        let map = &mut self.map;
        self.current = self.upstream.current().map(|value| map(value));
        self.current.is_some()
    }

    fn current(&self) -> Option<&E> {
        self.current.as_ref()
    }

    fn reset(&mut self) {
        self.upstream.reset();
        self.current = None;
    }

    fn dispose(&mut self) {
        self.upstream.dispose();
        self.current = None;
    }

    fn path(&self) -> Path {
        let mut path = self.upstream.path();
        if let Some(current) = &self.current {
            path.push(current.clone());
        }
        path
    }
}

impl<S: Item, E: Item> Pipe<S, E> for MapPipe<S, E> {
    fn set_source(&mut self, source: Source<S>) {
        self.upstream.set(source);
        self.current = None;
    }
}

type Expand<S, E> = Box<dyn FnMut(&S) -> Box<dyn Iterator<Item = E>>>;

/// Expands each value into zero or more values.
///
/// The expansion of one input is itself consumed lazily.
pub struct FlatMapPipe<S, E> {
    upstream: Upstream<S>,
    expand: Expand<S, E>,
    pending: Option<Box<dyn Iterator<Item = E>>>,
    current: Option<E>,
}

impl<S: Item, E: Item> FlatMapPipe<S, E> {
    pub fn new<I, F>(mut expand: F) -> Self
    where
        I: IntoIterator<Item = E>,
        I::IntoIter: 'static,
        F: FnMut(&S) -> I + 'static,
    {
        Self {
            upstream: Upstream::new(),
            expand: Box::new(move |value| Box::new(expand(value).into_iter())),
            pending: None,
            current: None,
        }
    }
}

impl<S: Item, E: Item> Cursor<E> for FlatMapPipe<S, E> {
    fn move_next(&mut self) -> bool {
        loop {
            if let Some(next) = self.pending.as_mut().and_then(|pending| pending.next()) {
                self.current = Some(next);
                return true;
            }
            self.pending = None;
            if !self.upstream.move_next() {
                self.current = None;
                return false;
            }
            let expand = &mut self.expand;
            self.pending = self.upstream.current().map(|value| expand(value));
        }
    }

    fn current(&self) -> Option<&E> {
        self.current.as_ref()
    }

    fn reset(&mut self) {
        self.upstream.reset();
        self.pending = None;
        self.current = None;
    }

    fn dispose(&mut self) {
        self.upstream.dispose();
        self.pending = None;
        self.current = None;
    }

    fn path(&self) -> Path {
        let mut path = self.upstream.path();
        if let Some(current) = &self.current {
            path.push(current.clone());
        }
        path
    }
}

impl<S: Item, E: Item> Pipe<S, E> for FlatMapPipe<S, E> {
    fn set_source(&mut self, source: Source<S>) {
        self.upstream.set(source);
        self.pending = None;
        self.current = None;
    }
}

/// Drives a cursor as a native [`Iterator`] of cloned values
pub struct Pipeline<C, E> {
    cursor: C,
    output: PhantomData<fn() -> E>,
}

impl<E, C: Cursor<E>> Pipeline<C, E> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            output: PhantomData,
        }
    }

    pub fn get_ref(&self) -> &C {
        &self.cursor
    }

    pub fn into_inner(self) -> C {
        self.cursor
    }

    /// Advance and return the path of each value instead of the value
    pub fn paths(mut self) -> impl Iterator<Item = Path> {
        std::iter::from_fn(move || self.cursor.move_next().then(|| self.cursor.path()))
    }
}

impl<E: Clone, C: Cursor<E>> Iterator for Pipeline<C, E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        if self.cursor.move_next() {
            self.cursor.current().cloned()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers() -> Source<i64> {
        Source::collection(vec![1, 2, 3, 4])
    }

    #[test]
    fn test_identity_passes_through() {
        let mut pipe = IdentityPipe::<i64>::new();
        pipe.set_source(numbers());
        assert_eq!(Pipeline::new(pipe).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_map_records_path() {
        let mut pipe = MapPipe::new(|n: &i64| format!("#{n}"));
        pipe.set_source(numbers());

        assert!(pipe.move_next());
        assert_eq!(pipe.current().map(String::as_str), Some("#1"));
        let path = pipe.path();
        assert_eq!(path.len(), 2);
        assert_eq!(path.get(0).unwrap().downcast_ref::<i64>(), Some(&1));
    }

    #[test]
    fn test_flat_map_expands_lazily() {
        let mut pipe = FlatMapPipe::new(|n: &i64| (0..*n).map(|i| i * 10));
        pipe.set_source(Source::collection(vec![0, 2, 1]));

        assert_eq!(Pipeline::new(pipe).collect::<Vec<_>>(), vec![0, 10, 0]);
    }

    #[test]
    fn test_set_source_discards_state() {
        let mut pipe = MapPipe::new(|n: &i64| n * 2);
        pipe.set_source(numbers());
        pipe.move_next();
        pipe.move_next();

        pipe.set_source(Source::single(10));
        assert!(pipe.current().is_none());
        assert!(pipe.move_next());
        assert_eq!(pipe.current(), Some(&20));
        assert!(!pipe.move_next());
    }

    #[test]
    fn test_connect_and_reset() {
        let mut first = IdentityPipe::<i64>::new();
        first.set_source(Source::iter(vec![5i64, 6, 7].into_iter()));
        let mut chain = connect(first, MapPipe::new(|n: &i64| n + 1));

        assert!(chain.move_next());
        assert!(chain.move_next());
        chain.reset();
        assert!(chain.move_next());
        assert_eq!(chain.current(), Some(&6));
    }

    #[test]
    fn test_pipeline_paths() {
        let mut pipe = MapPipe::new(|n: &i64| n * n);
        pipe.set_source(Source::collection(vec![2, 3]));

        let paths: Vec<Path> = Pipeline::new(pipe).paths().collect();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1].values::<i64>(), vec![&3, &9]);
    }
}
