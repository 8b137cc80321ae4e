//! Filtering pipes
//!
//! A filter never transforms its input, so it reports its upstream path
//! unchanged.

use crate::cursor::{Cursor, Item, Source, Upstream};
use crate::path::Path;
use crate::pipe::Pipe;
use pipegraph_core::{Element, GraphTypes};
use std::collections::HashSet;
use std::hash::Hash;

/// Upstream slot plus match state shared by the single-input filters
struct Gate<S> {
    upstream: Upstream<S>,
    matched: bool,
}

impl<S: Item> Gate<S> {
    fn new() -> Self {
        Self {
            upstream: Upstream::new(),
            matched: false,
        }
    }

    /// Advance until `keep` accepts a value or `stop` says nothing later can
    fn advance(&mut self, mut keep: impl FnMut(&S) -> bool, stop: impl Fn() -> bool) -> bool {
        self.matched = false;
        while self.upstream.move_next() {
            let Some(value) = self.upstream.current() else {
                break;
            };
            if keep(value) {
                self.matched = true;
                return true;
            }
            if stop() {
                break;
            }
        }
        false
    }

    fn current(&self) -> Option<&S> {
        if self.matched {
            self.upstream.current()
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.upstream.reset();
        self.matched = false;
    }

    fn dispose(&mut self) {
        self.upstream.dispose();
        self.matched = false;
    }

    fn path(&self) -> Path {
        if self.matched {
            self.upstream.path()
        } else {
            Path::new()
        }
    }

    fn set(&mut self, source: Source<S>) {
        self.upstream.set(source);
        self.matched = false;
    }
}

/// Keeps values satisfying a predicate
pub struct FilterPipe<S> {
    gate: Gate<S>,
    predicate: Box<dyn FnMut(&S) -> bool>,
}

impl<S: Item> FilterPipe<S> {
    pub fn new(predicate: impl FnMut(&S) -> bool + 'static) -> Self {
        Self {
            gate: Gate::new(),
            predicate: Box::new(predicate),
        }
    }
}

impl<S: Item> Cursor<S> for FilterPipe<S> {
    fn move_next(&mut self) -> bool {
        let predicate = &mut self.predicate;
        self.gate.advance(|value| predicate(value), || false)
    }

    fn current(&self) -> Option<&S> {
        self.gate.current()
    }

    fn reset(&mut self) {
        self.gate.reset();
    }

    fn dispose(&mut self) {
        self.gate.dispose();
    }

    fn path(&self) -> Path {
        self.gate.path()
    }
}

impl<S: Item> Pipe<S, S> for FilterPipe<S> {
    fn set_source(&mut self, source: Source<S>) {
        self.gate.set(source);
    }
}

/// Keeps the values at positions `low..high` of its input.
///
/// Once `high` values have been pulled nothing more is read upstream.
pub struct RangeFilterPipe<S> {
    gate: Gate<S>,
    low: usize,
    high: Option<usize>,
    seen: usize,
}

impl<S: Item> RangeFilterPipe<S> {
    /// `high` of `None` keeps everything from `low` on
    pub fn new(low: usize, high: Option<usize>) -> Self {
        Self {
            gate: Gate::new(),
            low,
            high,
            seen: 0,
        }
    }
}

impl<S: Item> Cursor<S> for RangeFilterPipe<S> {
    fn move_next(&mut self) -> bool {
        let (low, high) = (self.low, self.high);
        if high.is_some_and(|high| self.seen >= high) {
            self.gate.matched = false;
            return false;
        }
        let seen = std::cell::Cell::new(self.seen);
        let found = self.gate.advance(
            |_| {
                let position = seen.get();
                seen.set(position + 1);
                position >= low && high.map_or(true, |high| position < high)
            },
            || high.is_some_and(|high| seen.get() >= high),
        );
        self.seen = seen.get();
        found
    }

    fn current(&self) -> Option<&S> {
        self.gate.current()
    }

    fn reset(&mut self) {
        self.gate.reset();
        self.seen = 0;
    }

    fn dispose(&mut self) {
        self.gate.dispose();
        self.seen = 0;
    }

    fn path(&self) -> Path {
        self.gate.path()
    }
}

impl<S: Item> Pipe<S, S> for RangeFilterPipe<S> {
    fn set_source(&mut self, source: Source<S>) {
        self.gate.set(source);
        self.seen = 0;
    }
}

/// Drops values already produced since the last reset
pub struct DuplicateFilterPipe<S> {
    gate: Gate<S>,
    seen: HashSet<S>,
}

impl<S: Item + Eq + Hash> DuplicateFilterPipe<S> {
    pub fn new() -> Self {
        Self {
            gate: Gate::new(),
            seen: HashSet::new(),
        }
    }
}

impl<S: Item + Eq + Hash> Default for DuplicateFilterPipe<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Item + Eq + Hash> Cursor<S> for DuplicateFilterPipe<S> {
    fn move_next(&mut self) -> bool {
        let seen = &mut self.seen;
        self.gate.advance(|value| seen.insert(value.clone()), || false)
    }

    fn current(&self) -> Option<&S> {
        self.gate.current()
    }

    fn reset(&mut self) {
        self.gate.reset();
        self.seen.clear();
    }

    fn dispose(&mut self) {
        self.gate.dispose();
        self.seen.clear();
    }

    fn path(&self) -> Path {
        self.gate.path()
    }
}

impl<S: Item + Eq + Hash> Pipe<S, S> for DuplicateFilterPipe<S> {
    fn set_source(&mut self, source: Source<S>) {
        self.gate.set(source);
        self.seen.clear();
    }
}

/// How a [`ComparisonFilterPipe`] relates an extracted value to its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl Comparison {
    /// Parse an operator token such as `>=` or `!=`
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" | "==" | "eq" => Self::Equal,
            "!=" | "<>" | "ne" => Self::NotEqual,
            ">" | "gt" => Self::GreaterThan,
            "<" | "lt" => Self::LessThan,
            ">=" | "ge" => Self::GreaterThanOrEqual,
            "<=" | "le" => Self::LessThanOrEqual,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThanOrEqual => "<=",
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Whether `left <comparison> right` holds.
///
/// Two absent operands are equal. An ordering comparison with an absent
/// operand, or between values that have no ordering, is false.
pub fn compare_objects<V: PartialOrd>(comparison: Comparison, left: Option<&V>, right: Option<&V>) -> bool {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (None, None) => Some(Ordering::Equal),
        (Some(left), Some(right)) => left.partial_cmp(right),
        _ => None,
    };
    match comparison {
        Comparison::Equal => ordering == Some(Ordering::Equal),
        Comparison::NotEqual => ordering != Some(Ordering::Equal),
        _ if left.is_none() || right.is_none() => false,
        Comparison::GreaterThan => ordering == Some(Ordering::Greater),
        Comparison::LessThan => ordering == Some(Ordering::Less),
        Comparison::GreaterThanOrEqual => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        Comparison::LessThanOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
    }
}

/// Keeps values whose extracted field compares true against an operand
pub struct ComparisonFilterPipe<S, V> {
    gate: Gate<S>,
    extract: Box<dyn Fn(&S) -> Option<V>>,
    comparison: Comparison,
    operand: Option<V>,
}

impl<S: Item, V: PartialOrd + 'static> ComparisonFilterPipe<S, V> {
    pub fn new(
        extract: impl Fn(&S) -> Option<V> + 'static,
        comparison: Comparison,
        operand: Option<V>,
    ) -> Self {
        Self {
            gate: Gate::new(),
            extract: Box::new(extract),
            comparison,
            operand,
        }
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }
}

impl<S: Item, V: PartialOrd + 'static> Cursor<S> for ComparisonFilterPipe<S, V> {
    fn move_next(&mut self) -> bool {
        let (extract, comparison, operand) = (&self.extract, self.comparison, self.operand.as_ref());
        self.gate.advance(
            |value| compare_objects(comparison, extract(value).as_ref(), operand),
            || false,
        )
    }

    fn current(&self) -> Option<&S> {
        self.gate.current()
    }

    fn reset(&mut self) {
        self.gate.reset();
    }

    fn dispose(&mut self) {
        self.gate.dispose();
    }

    fn path(&self) -> Path {
        self.gate.path()
    }
}

impl<S: Item, V: PartialOrd + 'static> Pipe<S, S> for ComparisonFilterPipe<S, V> {
    fn set_source(&mut self, source: Source<S>) {
        self.gate.set(source);
    }
}

/// Compares each value itself
pub type ObjectFilterPipe<S> = ComparisonFilterPipe<S, S>;

/// Compares one property of each element
pub type PropertyFilterPipe<T> = ComparisonFilterPipe<Element<T>, <T as GraphTypes>::Value>;

/// Compares each element's label
pub type LabelFilterPipe<T> = ComparisonFilterPipe<Element<T>, <T as GraphTypes>::Label>;

pub fn object_filter<S: Item + PartialOrd>(comparison: Comparison, operand: Option<S>) -> ObjectFilterPipe<S> {
    ComparisonFilterPipe::new(|value: &S| Some(value.clone()), comparison, operand)
}

/// Elements lacking `key` compare as absent
pub fn property_filter<T>(key: T::Key, comparison: Comparison, operand: T::Value) -> PropertyFilterPipe<T>
where
    T: GraphTypes,
    T::Value: PartialOrd,
{
    ComparisonFilterPipe::new(
        move |element: &Element<T>| element.property(&key).cloned(),
        comparison,
        Some(operand),
    )
}

pub fn label_filter<T>(comparison: Comparison, label: T::Label) -> LabelFilterPipe<T>
where
    T: GraphTypes,
    T::Label: PartialOrd,
{
    ComparisonFilterPipe::new(
        |element: &Element<T>| Some(element.label().clone()),
        comparison,
        Some(label),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::{connect, MapPipe, Pipeline};

    #[test]
    fn test_compare_objects() {
        assert!(compare_objects(Comparison::GreaterThan, Some(&5), Some(&3)));
        assert!(!compare_objects(Comparison::LessThan, Some(&5), Some(&3)));
        assert!(compare_objects::<i32>(Comparison::Equal, None, None));
        assert!(!compare_objects::<i32>(Comparison::NotEqual, None, None));
        assert!(compare_objects(Comparison::NotEqual, Some(&1), None));
        assert!(compare_objects(Comparison::LessThanOrEqual, Some(&3), Some(&3)));
    }

    #[test]
    fn test_ordering_with_absent_operand_is_false() {
        for comparison in [
            Comparison::GreaterThan,
            Comparison::LessThan,
            Comparison::GreaterThanOrEqual,
            Comparison::LessThanOrEqual,
        ] {
            assert!(!compare_objects(comparison, Some(&1), None));
            assert!(!compare_objects(comparison, None, Some(&1)));
            assert!(!compare_objects::<i32>(comparison, None, None));
        }
    }

    #[test]
    fn test_unordered_values_never_compare() {
        assert!(!compare_objects(Comparison::Equal, Some(&f64::NAN), Some(&f64::NAN)));
        assert!(compare_objects(Comparison::NotEqual, Some(&f64::NAN), Some(&1.0)));
        assert!(!compare_objects(Comparison::GreaterThanOrEqual, Some(&f64::NAN), Some(&1.0)));
    }

    #[test]
    fn test_symbols_round_trip() {
        for symbol in ["==", "!=", ">", "<", ">=", "<="] {
            assert_eq!(Comparison::from_symbol(symbol).unwrap().symbol(), symbol);
        }
        assert!(Comparison::from_symbol("~").is_none());
    }

    #[test]
    fn test_filter_pipe() {
        let mut pipe = FilterPipe::new(|n: &i32| n % 2 == 0);
        pipe.set_source(Source::collection(1..=6));
        assert_eq!(Pipeline::new(pipe).collect::<Vec<_>>(), vec![2, 4, 6]);
    }

    #[test]
    fn test_object_filter_keeps_matches() {
        let mut pipe = object_filter(Comparison::GreaterThanOrEqual, Some(3));
        pipe.set_source(Source::collection(vec![1, 5, 3, 2]));
        assert_eq!(Pipeline::new(pipe).collect::<Vec<_>>(), vec![5, 3]);
    }

    #[test]
    fn test_range_stops_pulling_past_high() {
        let mut pipe = RangeFilterPipe::new(1, Some(3));
        pipe.set_source(Source::iter((0..).map(|n: u32| n * 10)));
        assert_eq!(Pipeline::new(pipe).collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn test_range_reset_restarts_counting() {
        let mut pipe = RangeFilterPipe::new(0, Some(1));
        pipe.set_source(Source::collection(vec!['a', 'b']));
        assert!(pipe.move_next());
        assert!(!pipe.move_next());

        pipe.reset();
        assert!(pipe.move_next());
        assert_eq!(pipe.current(), Some(&'a'));
    }

    #[test]
    fn test_duplicates_dropped_until_reset() {
        let mut pipe = DuplicateFilterPipe::<i64>::new();
        pipe.set_source(Source::collection(vec![1, 2, 1, 3, 2]));
        let mut drained = Vec::new();
        while pipe.move_next() {
            drained.extend(pipe.current().copied());
        }
        assert_eq!(drained, vec![1, 2, 3]);

        pipe.reset();
        assert!(pipe.move_next());
        assert_eq!(pipe.current(), Some(&1));
    }

    #[test]
    fn test_filter_path_is_not_extended() {
        let doubled = {
            let mut map = MapPipe::new(|n: &i32| n * 2);
            map.set_source(Source::collection(vec![1, 2]));
            map
        };
        let mut pipe = connect(doubled, FilterPipe::new(|n: &i32| *n > 2));

        assert!(pipe.move_next());
        assert_eq!(pipe.path().values::<i32>(), vec![&2, &4]);
    }
}
