//! Lifecycle hooks for graph mutations
//!
//! Each event has an ordered list of named hooks. "Before" hooks
//! (`Adding`, `PropertyChanging`) may veto; the first veto stops the
//! remaining hooks and aborts the mutation with no partial effect. "After"
//! hooks are pure notifications. All hooks run synchronously on the
//! mutating caller's thread, in registration order, and never while the
//! graph's internal lock is held, so a hook may read the graph.

use crate::element::{Element, ElementRef};
use crate::error::{Error, Result, Veto};
use crate::properties::{PropertyChange, PropertyObserver};
use crate::types::{ElementKind, GraphTypes};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Vetoable notification fired before an element is inserted
pub type AddingHook<T> = Arc<dyn Fn(&Element<T>) -> std::result::Result<(), Veto> + Send + Sync>;

/// Notification fired after an element is inserted
pub type AddedHook<T> = Arc<dyn Fn(&Element<T>) + Send + Sync>;

/// Vetoable notification fired before a property mutation
pub type PropertyChangingHook<T> = Arc<
    dyn Fn(
            &ElementRef<<T as GraphTypes>::Id>,
            &PropertyChange<'_, <T as GraphTypes>::Key, <T as GraphTypes>::Value>,
        ) -> std::result::Result<(), Veto>
        + Send
        + Sync,
>;

/// Notification fired after a property mutation
pub type PropertyChangedHook<T> = Arc<
    dyn Fn(
            &ElementRef<<T as GraphTypes>::Id>,
            &PropertyChange<'_, <T as GraphTypes>::Key, <T as GraphTypes>::Value>,
        ) + Send
        + Sync,
>;

/// Receives the shutdown reason
pub type ShutdownHook = Arc<dyn Fn(&str) + Send + Sync>;

/// The events hooks can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GraphEvent {
    Adding(ElementKind),
    Added(ElementKind),
    PropertyChanging,
    PropertyChanged,
    ShuttingDown,
    ShutDown,
}

impl std::fmt::Display for GraphEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adding(kind) => write!(f, "{} adding", kind),
            Self::Added(kind) => write!(f, "{} added", kind),
            Self::PropertyChanging => write!(f, "property changing"),
            Self::PropertyChanged => write!(f, "property changed"),
            Self::ShuttingDown => write!(f, "shutting down"),
            Self::ShutDown => write!(f, "shut down"),
        }
    }
}

pub(crate) type Named<H> = (String, H);

pub(crate) struct HookRegistry<T: GraphTypes> {
    adding: BTreeMap<ElementKind, Vec<Named<AddingHook<T>>>>,
    added: BTreeMap<ElementKind, Vec<Named<AddedHook<T>>>>,
    property_changing: Vec<Named<PropertyChangingHook<T>>>,
    property_changed: Vec<Named<PropertyChangedHook<T>>>,
    shutting_down: Vec<Named<ShutdownHook>>,
    shut_down: Vec<Named<ShutdownHook>>,
}

impl<T: GraphTypes> HookRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            adding: BTreeMap::new(),
            added: BTreeMap::new(),
            property_changing: Vec::new(),
            property_changed: Vec::new(),
            shutting_down: Vec::new(),
            shut_down: Vec::new(),
        }
    }

    pub(crate) fn register_adding(&mut self, kind: ElementKind, name: String, hook: AddingHook<T>) -> Result<()> {
        let hooks = self.adding.entry(kind).or_default();
        push_unique(hooks, GraphEvent::Adding(kind), name, hook)
    }

    pub(crate) fn register_added(&mut self, kind: ElementKind, name: String, hook: AddedHook<T>) -> Result<()> {
        let hooks = self.added.entry(kind).or_default();
        push_unique(hooks, GraphEvent::Added(kind), name, hook)
    }

    pub(crate) fn register_property_changing(&mut self, name: String, hook: PropertyChangingHook<T>) -> Result<()> {
        push_unique(&mut self.property_changing, GraphEvent::PropertyChanging, name, hook)
    }

    pub(crate) fn register_property_changed(&mut self, name: String, hook: PropertyChangedHook<T>) -> Result<()> {
        push_unique(&mut self.property_changed, GraphEvent::PropertyChanged, name, hook)
    }

    pub(crate) fn register_shutting_down(&mut self, name: String, hook: ShutdownHook) -> Result<()> {
        push_unique(&mut self.shutting_down, GraphEvent::ShuttingDown, name, hook)
    }

    pub(crate) fn register_shut_down(&mut self, name: String, hook: ShutdownHook) -> Result<()> {
        push_unique(&mut self.shut_down, GraphEvent::ShutDown, name, hook)
    }

    /// Names registered for an event, in invocation order
    pub(crate) fn names(&self, event: GraphEvent) -> Vec<String> {
        fn names_of<H>(hooks: Option<&Vec<Named<H>>>) -> Vec<String> {
            hooks
                .map(|hooks| hooks.iter().map(|(name, _)| name.clone()).collect())
                .unwrap_or_default()
        }
        match event {
            GraphEvent::Adding(kind) => names_of(self.adding.get(&kind)),
            GraphEvent::Added(kind) => names_of(self.added.get(&kind)),
            GraphEvent::PropertyChanging => names_of(Some(&self.property_changing)),
            GraphEvent::PropertyChanged => names_of(Some(&self.property_changed)),
            GraphEvent::ShuttingDown => names_of(Some(&self.shutting_down)),
            GraphEvent::ShutDown => names_of(Some(&self.shut_down)),
        }
    }

    pub(crate) fn adding(&self, kind: ElementKind) -> Vec<Named<AddingHook<T>>> {
        self.adding.get(&kind).cloned().unwrap_or_default()
    }

    pub(crate) fn added(&self, kind: ElementKind) -> Vec<Named<AddedHook<T>>> {
        self.added.get(&kind).cloned().unwrap_or_default()
    }

    pub(crate) fn property_changing(&self) -> Vec<Named<PropertyChangingHook<T>>> {
        self.property_changing.clone()
    }

    pub(crate) fn property_changed(&self) -> Vec<Named<PropertyChangedHook<T>>> {
        self.property_changed.clone()
    }

    pub(crate) fn shutting_down(&self) -> Vec<Named<ShutdownHook>> {
        self.shutting_down.clone()
    }

    pub(crate) fn shut_down(&self) -> Vec<Named<ShutdownHook>> {
        self.shut_down.clone()
    }
}

fn push_unique<H>(hooks: &mut Vec<Named<H>>, event: GraphEvent, name: String, hook: H) -> Result<()> {
    if hooks.iter().any(|(existing, _)| *existing == name) {
        return Err(Error::InvalidArgument(format!(
            "hook '{}' already registered for {}",
            name, event
        )));
    }
    hooks.push((name, hook));
    Ok(())
}

pub(crate) fn run_adding<T: GraphTypes>(hooks: &[Named<AddingHook<T>>], element: &Element<T>) -> Result<()> {
    for (name, hook) in hooks {
        if let Err(veto) = hook(element) {
            tracing::warn!(
                "Adding {} {:?} vetoed by '{}': {}",
                element.kind(),
                element.id(),
                name,
                veto
            );
            return Err(veto.into_error(name.as_str()));
        }
    }
    Ok(())
}

pub(crate) fn run_added<T: GraphTypes>(hooks: &[Named<AddedHook<T>>], element: &Element<T>) {
    for (_, hook) in hooks {
        hook(element);
    }
}

pub(crate) fn run_shutdown(hooks: &[Named<ShutdownHook>], reason: &str) {
    for (_, hook) in hooks {
        hook(reason);
    }
}

pub(crate) fn run_property_changed<T: GraphTypes>(
    hooks: &[Named<PropertyChangedHook<T>>],
    target: &ElementRef<T::Id>,
    change: &PropertyChange<'_, T::Key, T::Value>,
) {
    for (_, hook) in hooks {
        hook(target, change);
    }
}

/// A property mutation that has been applied to a detached bag
pub(crate) type AppliedChange<T> = (
    <T as GraphTypes>::Key,
    Option<<T as GraphTypes>::Value>,
    Option<<T as GraphTypes>::Value>,
);

/// Runs the "changing" hooks for one element while its property bag is
/// mutated off to the side, and records what was applied so the graph can
/// fire "changed" hooks once the mutation is committed.
pub(crate) struct ChangeGate<'a, T: GraphTypes> {
    target: &'a ElementRef<T::Id>,
    hooks: &'a [Named<PropertyChangingHook<T>>],
    applied: RefCell<Vec<AppliedChange<T>>>,
}

impl<'a, T: GraphTypes> ChangeGate<'a, T> {
    pub(crate) fn new(target: &'a ElementRef<T::Id>, hooks: &'a [Named<PropertyChangingHook<T>>]) -> Self {
        Self {
            target,
            hooks,
            applied: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn into_applied(self) -> Vec<AppliedChange<T>> {
        self.applied.into_inner()
    }
}

impl<T: GraphTypes> PropertyObserver<T::Key, T::Value> for ChangeGate<'_, T> {
    fn before(&self, change: &PropertyChange<'_, T::Key, T::Value>) -> Result<()> {
        for (name, hook) in self.hooks {
            if let Err(veto) = hook(self.target, change) {
                tracing::warn!(
                    "Property {:?} on {} vetoed by '{}': {}",
                    change.key,
                    self.target,
                    name,
                    veto
                );
                return Err(veto.into_error(name.as_str()));
            }
        }
        Ok(())
    }

    fn after(&self, change: &PropertyChange<'_, T::Key, T::Value>) {
        self.applied
            .borrow_mut()
            .push((change.key.clone(), change.old.cloned(), change.new.cloned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DefaultTypes;

    #[test]
    fn test_duplicate_hook_name_rejected() {
        let mut registry = HookRegistry::<DefaultTypes>::new();
        registry
            .register_shut_down("audit".to_string(), Arc::new(|_: &str| {}))
            .unwrap();
        let err = registry
            .register_shut_down("audit".to_string(), Arc::new(|_: &str| {}))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(registry.names(GraphEvent::ShutDown), vec!["audit"]);
    }

    #[test]
    fn test_same_name_allowed_on_different_events() {
        let mut registry = HookRegistry::<DefaultTypes>::new();
        registry
            .register_added(ElementKind::Vertex, "log".to_string(), Arc::new(|_: &Element<DefaultTypes>| {}))
            .unwrap();
        registry
            .register_added(ElementKind::Edge, "log".to_string(), Arc::new(|_: &Element<DefaultTypes>| {}))
            .unwrap();

        assert_eq!(registry.added(ElementKind::Vertex).len(), 1);
        assert_eq!(registry.added(ElementKind::Edge).len(), 1);
        assert!(registry.added(ElementKind::HyperEdge).is_empty());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(GraphEvent::Adding(ElementKind::Edge).to_string(), "edge adding");
        assert_eq!(GraphEvent::ShuttingDown.to_string(), "shutting down");
    }
}
