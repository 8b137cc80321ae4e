//! External iterators and the sources a pipe can draw from

use crate::path::Path;
use std::fmt::Debug;

/// Values that can flow through pipes
pub trait Item: Clone + Debug + Send + Sync + 'static {}

impl<T: Clone + Debug + Send + Sync + 'static> Item for T {}

/// A pull-based, restartable external iterator.
///
/// `move_next` advances and reports whether a value is available;
/// `current` then exposes it until the next advance. Nothing is computed
/// before the first `move_next`.
pub trait Cursor<E> {
    fn move_next(&mut self) -> bool;

    /// The most recently produced value; `None` before the first advance
    /// and after exhaustion
    fn current(&self) -> Option<&E>;

    /// Rewind to the initial position, transitively through every upstream
    fn reset(&mut self);

    /// Release upstream resources, transitively. A disposed cursor is
    /// exhausted.
    fn dispose(&mut self);

    /// The values visited to reach `current`, ending with `current`
    fn path(&self) -> Path;
}

impl<E, C: Cursor<E> + ?Sized> Cursor<E> for Box<C> {
    fn move_next(&mut self) -> bool {
        (**self).move_next()
    }

    fn current(&self) -> Option<&E> {
        (**self).current()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn dispose(&mut self) {
        (**self).dispose()
    }

    fn path(&self) -> Path {
        (**self).path()
    }
}

/// Where a pipe reads its input from
pub enum Source<S> {
    /// Exactly one value
    Single(S),
    /// Another cursor, typically an upstream pipe
    Cursor(Box<dyn Cursor<S>>),
    /// A materialized collection
    Collection(Vec<S>),
}

impl<S: Item> Source<S> {
    pub fn single(value: S) -> Self {
        Self::Single(value)
    }

    pub fn collection(values: impl IntoIterator<Item = S>) -> Self {
        Self::Collection(values.into_iter().collect())
    }

    pub fn cursor(cursor: impl Cursor<S> + 'static) -> Self {
        Self::Cursor(Box::new(cursor))
    }

    /// Wrap a native iterator; it is drained lazily and replayed on reset
    pub fn iter(iter: impl Iterator<Item = S> + 'static) -> Self {
        Self::Cursor(Box::new(IterCursor::new(iter)))
    }

    pub(crate) fn into_cursor(self) -> Box<dyn Cursor<S>> {
        match self {
            Self::Single(value) => Box::new(VecCursor::new(vec![value])),
            Self::Collection(values) => Box::new(VecCursor::new(values)),
            Self::Cursor(cursor) => cursor,
        }
    }
}

impl<S: Debug> Debug for Source<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(value) => f.debug_tuple("Single").field(value).finish(),
            Self::Cursor(_) => f.write_str("Cursor(..)"),
            Self::Collection(values) => f.debug_tuple("Collection").field(values).finish(),
        }
    }
}

/// Cursor over an owned vector
#[derive(Debug, Clone)]
pub struct VecCursor<S> {
    items: Vec<S>,
    position: Option<usize>,
}

impl<S> VecCursor<S> {
    pub fn new(items: Vec<S>) -> Self {
        Self {
            items,
            position: None,
        }
    }
}

impl<S: Item> Cursor<S> for VecCursor<S> {
    fn move_next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1).min(self.items.len());
        self.position = Some(next);
        next < self.items.len()
    }

    fn current(&self) -> Option<&S> {
        self.position.and_then(|p| self.items.get(p))
    }

    fn reset(&mut self) {
        self.position = None;
    }

    fn dispose(&mut self) {
        self.items.clear();
        self.position = None;
    }

    fn path(&self) -> Path {
        self.current().cloned().map(Path::of).unwrap_or_default()
    }
}

/// Cursor over a native iterator.
///
/// Values are pulled one at a time and remembered, so `reset` replays what
/// has been seen before pulling anything new.
pub struct IterCursor<S> {
    iter: Option<Box<dyn Iterator<Item = S>>>,
    seen: Vec<S>,
    position: Option<usize>,
}

impl<S> IterCursor<S> {
    pub fn new(iter: impl Iterator<Item = S> + 'static) -> Self {
        Self {
            iter: Some(Box::new(iter)),
            seen: Vec::new(),
            position: None,
        }
    }
}

impl<S: Item> Cursor<S> for IterCursor<S> {
    fn move_next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1).min(self.seen.len());
        self.position = Some(next);
        if next < self.seen.len() {
            return true;
        }
        match self.iter.as_mut().and_then(|iter| iter.next()) {
            Some(value) => {
                self.seen.push(value);
                true
            }
            None => {
                self.iter = None;
                false
            }
        }
    }

    fn current(&self) -> Option<&S> {
        self.position.and_then(|p| self.seen.get(p))
    }

    fn reset(&mut self) {
        self.position = None;
    }

    fn dispose(&mut self) {
        self.iter = None;
        self.seen.clear();
        self.position = None;
    }

    fn path(&self) -> Path {
        self.current().cloned().map(Path::of).unwrap_or_default()
    }
}

/// The input slot of a single-input pipe
pub(crate) struct Upstream<S> {
    cursor: Option<Box<dyn Cursor<S>>>,
}

impl<S: Item> Upstream<S> {
    pub(crate) fn new() -> Self {
        Self { cursor: None }
    }

    pub(crate) fn set(&mut self, source: Source<S>) {
        self.cursor = Some(source.into_cursor());
    }

    pub(crate) fn move_next(&mut self) -> bool {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.move_next(),
            None => false,
        }
    }

    pub(crate) fn current(&self) -> Option<&S> {
        self.cursor.as_ref().and_then(|cursor| cursor.current())
    }

    pub(crate) fn reset(&mut self) {
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.reset();
        }
    }

    pub(crate) fn dispose(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.dispose();
        }
    }

    pub(crate) fn path(&self) -> Path {
        self.cursor
            .as_ref()
            .map(|cursor| cursor.path())
            .unwrap_or_default()
    }
}
