//! Key/value property bags with vetoable change notifications

use crate::error::{Error, Result, Veto};
use crate::types::PropertyKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// What a pending or completed mutation does to one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// A single-key mutation, seen by observers before and after it applies.
///
/// Before the mutation `old` is the current value; after it `new` is the
/// stored value.
#[derive(Debug)]
pub struct PropertyChange<'a, K, V> {
    pub key: &'a K,
    pub old: Option<&'a V>,
    pub new: Option<&'a V>,
}

impl<K, V> PropertyChange<'_, K, V> {
    pub fn kind(&self) -> ChangeKind {
        match (self.old, self.new) {
            (None, _) => ChangeKind::Added,
            (Some(_), Some(_)) => ChangeKind::Changed,
            (Some(_), None) => ChangeKind::Removed,
        }
    }
}

/// Receives property mutations.
///
/// `before` may refuse the mutation; a refusal leaves the bag untouched and
/// `after` is not called.
pub trait PropertyObserver<K, V> {
    fn before(&self, change: &PropertyChange<'_, K, V>) -> Result<()>;

    fn after(&self, change: &PropertyChange<'_, K, V>);
}

/// Observer that accepts everything and records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Unobserved;

impl<K, V> PropertyObserver<K, V> for Unobserved {
    fn before(&self, _change: &PropertyChange<'_, K, V>) -> Result<()> {
        Ok(())
    }

    fn after(&self, _change: &PropertyChange<'_, K, V>) {}
}

type BeforeHook<K, V> =
    Box<dyn Fn(&PropertyChange<'_, K, V>) -> std::result::Result<(), Veto> + Send + Sync>;
type AfterHook<K, V> = Box<dyn Fn(&PropertyChange<'_, K, V>) + Send + Sync>;

/// Ordered lists of named "changing" and "changed" hooks.
///
/// Hooks run in registration order; the first veto stops the remaining
/// "changing" hooks.
pub struct PropertyHooks<K, V> {
    changing: Vec<(String, BeforeHook<K, V>)>,
    changed: Vec<(String, AfterHook<K, V>)>,
}

impl<K, V> PropertyHooks<K, V> {
    pub fn new() -> Self {
        Self {
            changing: Vec::new(),
            changed: Vec::new(),
        }
    }

    pub fn on_changing(
        &mut self,
        name: impl Into<String>,
        hook: impl Fn(&PropertyChange<'_, K, V>) -> std::result::Result<(), Veto> + Send + Sync + 'static,
    ) -> &mut Self {
        self.changing.push((name.into(), Box::new(hook)));
        self
    }

    pub fn on_changed(
        &mut self,
        name: impl Into<String>,
        hook: impl Fn(&PropertyChange<'_, K, V>) + Send + Sync + 'static,
    ) -> &mut Self {
        self.changed.push((name.into(), Box::new(hook)));
        self
    }
}

impl<K, V> Default for PropertyHooks<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug, V> PropertyObserver<K, V> for PropertyHooks<K, V> {
    fn before(&self, change: &PropertyChange<'_, K, V>) -> Result<()> {
        for (name, hook) in &self.changing {
            if let Err(veto) = hook(change) {
                tracing::warn!("Property change on {:?} vetoed by '{}': {}", change.key, name, veto);
                return Err(veto.into_error(name.as_str()));
            }
        }
        Ok(())
    }

    fn after(&self, change: &PropertyChange<'_, K, V>) {
        for (_, hook) in &self.changed {
            hook(change);
        }
    }
}

/// A map from property keys to values.
///
/// Every mutator validates the key first, then asks the observer, then
/// mutates, then notifies. Nothing is mutated or notified when a key is
/// invalid or a hook refuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag<K: Eq + Hash, V> {
    entries: HashMap<K, V>,
}

impl<K, V> PropertyBag<K, V>
where
    K: PropertyKey,
    V: PartialEq,
{
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Non-mutating lookup
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Lazily enumerate the entries accepted by `filter`
    pub fn filtered<'a, F>(&'a self, mut filter: F) -> impl Iterator<Item = (&'a K, &'a V)> + 'a
    where
        F: FnMut(&K, &V) -> bool + 'a,
    {
        self.entries.iter().filter(move |(k, v)| filter(*k, *v))
    }

    /// Create or replace a property, returning the previous value
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.set_observed(key, value, &Unobserved)
    }

    pub fn set_observed(
        &mut self,
        key: K,
        value: V,
        observer: &impl PropertyObserver<K, V>,
    ) -> Result<Option<V>> {
        validate_key(&key)?;

        observer.before(&PropertyChange {
            key: &key,
            old: self.entries.get(&key),
            new: Some(&value),
        })?;

        let previous = self.entries.insert(key.clone(), value);
        observer.after(&PropertyChange {
            key: &key,
            old: previous.as_ref(),
            new: self.entries.get(&key),
        });
        Ok(previous)
    }

    /// Remove a property, returning the removed value if there was one
    pub fn remove(&mut self, key: &K) -> Result<Option<V>> {
        self.remove_observed(key, &Unobserved)
    }

    pub fn remove_observed(
        &mut self,
        key: &K,
        observer: &impl PropertyObserver<K, V>,
    ) -> Result<Option<V>> {
        validate_key(key)?;
        if !self.entries.contains_key(key) {
            return Ok(None);
        }
        self.remove_present(key, observer).map(Some)
    }

    /// Remove a property only while it still holds `value`
    pub fn remove_matching(&mut self, key: &K, value: &V) -> Result<Option<V>> {
        self.remove_matching_observed(key, value, &Unobserved)
    }

    pub fn remove_matching_observed(
        &mut self,
        key: &K,
        value: &V,
        observer: &impl PropertyObserver<K, V>,
    ) -> Result<Option<V>> {
        validate_key(key)?;
        if self.entries.get(key) == Some(value) {
            self.remove_present(key, observer).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Remove every entry accepted by `filter`.
    ///
    /// All-or-nothing: every candidate is offered to the observer first, and
    /// a single refusal leaves the bag unchanged.
    pub fn remove_where<F>(&mut self, filter: F) -> Result<Vec<(K, V)>>
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.remove_where_observed(filter, &Unobserved)
    }

    pub fn remove_where_observed<F>(
        &mut self,
        mut filter: F,
        observer: &impl PropertyObserver<K, V>,
    ) -> Result<Vec<(K, V)>>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(k, v)| filter(*k, *v))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &doomed {
            observer.before(&PropertyChange {
                key,
                old: self.entries.get(key),
                new: None,
            })?;
        }

        let mut removed = Vec::with_capacity(doomed.len());
        for key in doomed {
            if let Some(value) = self.entries.remove(&key) {
                observer.after(&PropertyChange {
                    key: &key,
                    old: Some(&value),
                    new: None,
                });
                removed.push((key, value));
            }
        }
        Ok(removed)
    }

    fn remove_present(&mut self, key: &K, observer: &impl PropertyObserver<K, V>) -> Result<V> {
        observer.before(&PropertyChange {
            key,
            old: self.entries.get(key),
            new: None,
        })?;
        let removed = self
            .entries
            .remove(key)
            .ok_or_else(|| Error::Internal(format!("property {:?} vanished during removal", key)))?;
        observer.after(&PropertyChange {
            key,
            old: Some(&removed),
            new: None,
        });
        Ok(removed)
    }
}

impl<K, V> Default for PropertyBag<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyBag<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn validate_key<K: PropertyKey>(key: &K) -> Result<()> {
    if key.is_valid_key() {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid property key {:?}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::{Arc, Mutex};

    type Bag = PropertyBag<String, Value>;

    fn recording_hooks(log: Arc<Mutex<Vec<String>>>) -> PropertyHooks<String, Value> {
        let mut hooks = PropertyHooks::new();
        let before_log = log.clone();
        hooks.on_changing("recorder", move |change| {
            before_log
                .lock()
                .unwrap()
                .push(format!("before {:?} {}", change.kind(), change.key));
            Ok(())
        });
        hooks.on_changed("recorder", move |change| {
            log.lock()
                .unwrap()
                .push(format!("after {:?} {}", change.kind(), change.key));
        });
        hooks
    }

    #[test]
    fn test_set_then_replace() {
        let mut bag = Bag::new();
        assert_eq!(bag.set("name".into(), "Alice".into()).unwrap(), None);
        let previous = bag.set("name".into(), "Alicia".into()).unwrap();

        assert_eq!(previous, Some(Value::from("Alice")));
        assert_eq!(bag.get(&"name".to_string()), Some(&Value::from("Alicia")));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_events_fire_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = recording_hooks(log.clone());
        let mut bag = Bag::new();

        bag.set_observed("age".into(), Value::Int(30), &hooks).unwrap();
        bag.set_observed("age".into(), Value::Int(31), &hooks).unwrap();
        bag.remove_observed(&"age".to_string(), &hooks).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "before Added age",
                "after Added age",
                "before Changed age",
                "after Changed age",
                "before Removed age",
                "after Removed age",
            ]
        );
    }

    #[test]
    fn test_veto_leaves_bag_unchanged() {
        let fired = Arc::new(Mutex::new(0usize));
        let mut hooks = PropertyHooks::<String, Value>::new();
        hooks.on_changing("readonly", |change| {
            if change.key == "locked" {
                Err(Veto::new("locked is read-only"))
            } else {
                Ok(())
            }
        });
        let counter = fired.clone();
        hooks.on_changed("counter", move |_| *counter.lock().unwrap() += 1);

        let mut bag = Bag::new();
        bag.set("locked".into(), Value::Int(1)).unwrap();
        let before = bag.clone();

        let err = bag
            .set_observed("locked".into(), Value::Int(2), &hooks)
            .unwrap_err();
        assert!(err.is_veto());
        let err = bag
            .remove_observed(&"locked".to_string(), &hooks)
            .unwrap_err();
        assert!(err.is_veto());

        assert_eq!(bag, before);
        assert_eq!(*fired.lock().unwrap(), 0);
    }

    #[test]
    fn test_first_veto_short_circuits() {
        let reached = Arc::new(Mutex::new(false));
        let mut hooks = PropertyHooks::<String, Value>::new();
        hooks.on_changing("deny", |_| Err(Veto::new("no")));
        let flag = reached.clone();
        hooks.on_changing("second", move |_| {
            *flag.lock().unwrap() = true;
            Ok(())
        });

        let mut bag = Bag::new();
        let err = bag.set_observed("k".into(), Value::Null, &hooks).unwrap_err();

        match err {
            Error::Vetoed { hook, .. } => assert_eq!(hook, "deny"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!*reached.lock().unwrap());
        assert!(bag.is_empty());
    }

    #[test]
    fn test_invalid_key_is_rejected_before_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = recording_hooks(log.clone());
        let mut bag = Bag::new();

        let err = bag.set_observed(String::new(), Value::Int(1), &hooks).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_remove_missing_and_mismatched() {
        let mut bag = Bag::new();
        bag.set("color".into(), "red".into()).unwrap();

        assert_eq!(bag.remove(&"shape".to_string()).unwrap(), None);
        assert_eq!(
            bag.remove_matching(&"color".to_string(), &"blue".into()).unwrap(),
            None
        );
        assert_eq!(
            bag.remove_matching(&"color".to_string(), &"red".into()).unwrap(),
            Some(Value::from("red"))
        );
        assert!(bag.is_empty());
    }

    #[test]
    fn test_remove_where_is_all_or_nothing() {
        let mut bag: Bag = [
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(2)),
            ("c".to_string(), Value::Int(3)),
        ]
        .into_iter()
        .collect();

        let mut hooks = PropertyHooks::<String, Value>::new();
        hooks.on_changing("keep-c", |change| {
            if change.key == "c" {
                Err(Veto::new("c stays"))
            } else {
                Ok(())
            }
        });

        assert!(bag
            .remove_where_observed(|_, v| v.as_int().unwrap_or(0) >= 2, &hooks)
            .is_err());
        assert_eq!(bag.len(), 3);

        let mut removed = bag.remove_where(|_, v| v.as_int().unwrap_or(0) >= 2).unwrap();
        removed.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].0, "b");
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_remove_where_without_match_is_silent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = recording_hooks(log.clone());
        let mut bag = Bag::new();
        bag.set("a".into(), Value::Int(1)).unwrap();
        let before = bag.clone();

        let removed = bag
            .remove_where_observed(|_, v| v.as_int() == Some(99), &hooks)
            .unwrap();
        assert!(removed.is_empty());
        assert_eq!(bag, before);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_filtered_is_lazy_view() {
        let bag: Bag = [
            ("x".to_string(), Value::Int(1)),
            ("y".to_string(), Value::from("text")),
        ]
        .into_iter()
        .collect();

        let ints: Vec<_> = bag.filtered(|_, v| v.as_int().is_some()).collect();
        assert_eq!(ints.len(), 1);
        assert_eq!(ints[0].0, "x");
    }
}
