//! Traversal history carried alongside each produced value

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Anything that can be recorded in a [`Path`]
pub trait PathItem: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Debug + Send + Sync> PathItem for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One type-erased step of a path
#[derive(Clone)]
pub struct PathEntry(Arc<dyn PathItem>);

impl PathEntry {
    pub fn new<T: PathItem>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// The recorded value, if it has type `T`
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        // Deref first so the call dispatches on the stored value, not the Arc
        (*self.0).as_any().downcast_ref::<T>()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

impl Debug for PathEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

/// The ordered values visited to reach a pipe's current value.
///
/// Transforming pipes append their output; filtering pipes pass their
/// upstream path through untouched, so a value that survives a filter is
/// recorded once.
#[derive(Clone, Debug, Default)]
pub struct Path {
    entries: Vec<PathEntry>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// A one-step path
    pub fn of<T: PathItem>(value: T) -> Self {
        let mut path = Self::new();
        path.push(value);
        path
    }

    pub fn push<T: PathItem>(&mut self, value: T) {
        self.entries.push(PathEntry::new(value));
    }

    pub fn extend(&mut self, other: Path) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PathEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&PathEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter()
    }

    /// The entries of type `T`, in order; other entries are skipped
    pub fn values<T: 'static>(&self) -> Vec<&T> {
        self.entries.iter().filter_map(PathEntry::downcast_ref::<T>).collect()
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{:?}", entry)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_downcast_to_their_own_type() {
        let mut path = Path::of(7u32);
        path.push("seven".to_string());

        assert_eq!(path.len(), 2);
        assert_eq!(path.get(0).unwrap().downcast_ref::<u32>(), Some(&7));
        assert!(path.get(0).unwrap().downcast_ref::<String>().is_none());
        assert!(path.last().unwrap().is::<String>());
        assert_eq!(path.values::<String>(), vec![&"seven".to_string()]);
    }

    #[test]
    fn test_display() {
        let mut path = Path::of(1i64);
        path.push(2i64);
        assert_eq!(path.to_string(), "[1 -> 2]");
        assert_eq!(Path::new().to_string(), "[]");
    }
}
