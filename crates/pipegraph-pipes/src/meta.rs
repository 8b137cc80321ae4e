//! Composing a chain of pipes into a single reusable pipe

use crate::cursor::{Cursor, Item, Source, Upstream};
use crate::error::{PipeError, PipeResult};
use crate::path::Path;
use crate::pipe::Pipe;
use std::cell::RefCell;
use std::rc::Rc;

/// Role information recorded for each stage of a [`MetaPipe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: &'static str,
    pub accepts_source: bool,
    pub produces_output: bool,
}

impl Stage {
    fn of<S, E, P: Pipe<S, E>>(pipe: &P) -> Self {
        Self {
            name: std::any::type_name::<P>(),
            accepts_source: pipe.accepts_source(),
            produces_output: pipe.produces_output(),
        }
    }
}

/// Feeds the first stage from the meta pipe's own, replaceable source
struct Relay<S> {
    slot: Rc<RefCell<Upstream<S>>>,
    current: Option<S>,
}

impl<S: Item> Cursor<S> for Relay<S> {
    fn move_next(&mut self) -> bool {
        let mut slot = self.slot.borrow_mut();
        self.current = if slot.move_next() { slot.current().cloned() } else { None };
        self.current.is_some()
    }

    fn current(&self) -> Option<&S> {
        self.current.as_ref()
    }

    fn reset(&mut self) {
        self.slot.borrow_mut().reset();
        self.current = None;
    }

    fn dispose(&mut self) {
        self.slot.borrow_mut().dispose();
        self.current = None;
    }

    fn path(&self) -> Path {
        self.slot.borrow().path()
    }
}

/// An ordered chain of at least two pipes acting as one.
///
/// Advancing delegates to the last stage, which pulls through every
/// earlier one. Reset and dispose reach every stage.
pub struct MetaPipe<S, E> {
    slot: Rc<RefCell<Upstream<S>>>,
    chain: Box<dyn Cursor<E>>,
    stages: Vec<Stage>,
}

impl<S: Item, E: Item> MetaPipe<S, E> {
    /// Start a chain with `first`, which will read this meta pipe's source
    pub fn builder<P>(first: P) -> MetaPipeBuilder<S, E>
    where
        P: Pipe<S, E> + 'static,
    {
        let slot = Rc::new(RefCell::new(Upstream::new()));
        let stage = Stage::of(&first);
        let mut first = first;
        if stage.accepts_source {
            first.set_source(Source::cursor(Relay {
                slot: slot.clone(),
                current: None,
            }));
        }
        MetaPipeBuilder {
            slot,
            chain: Box::new(first),
            stages: vec![stage],
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

impl<S: Item> MetaPipe<S, S> {
    /// Chain same-typed pipes in order
    pub fn from_pipes(pipes: Vec<Box<dyn Pipe<S, S>>>) -> PipeResult<Self> {
        let count = pipes.len();
        let mut pipes = pipes.into_iter();
        let Some(first) = pipes.next() else {
            return Err(PipeError::TooFewPipes(count));
        };
        pipes
            .fold(MetaPipe::builder(first), |builder, pipe| builder.then(pipe))
            .build()
    }
}

/// Accumulates stages for a [`MetaPipe`]
pub struct MetaPipeBuilder<S, M> {
    slot: Rc<RefCell<Upstream<S>>>,
    chain: Box<dyn Cursor<M>>,
    stages: Vec<Stage>,
}

impl<S: Item, M: Item> MetaPipeBuilder<S, M> {
    /// Append a stage reading from the current end of the chain
    pub fn then<N, P>(self, next: P) -> MetaPipeBuilder<S, N>
    where
        P: Pipe<M, N> + 'static,
    {
        let mut stages = self.stages;
        stages.push(Stage::of(&next));
        let mut next = next;
        next.set_source(Source::Cursor(self.chain));
        MetaPipeBuilder {
            slot: self.slot,
            chain: Box::new(next),
            stages,
        }
    }

    /// Validate the chain's roles
    pub fn build(self) -> PipeResult<MetaPipe<S, M>> {
        if self.stages.len() < 2 {
            return Err(PipeError::TooFewPipes(self.stages.len()));
        }
        if let Some(first) = self.stages.first().filter(|stage| !stage.accepts_source) {
            return Err(PipeError::RejectsSource(first.name.to_string()));
        }
        if let Some(last) = self.stages.last().filter(|stage| !stage.produces_output) {
            return Err(PipeError::NoOutput(last.name.to_string()));
        }
        tracing::trace!("Built meta pipe with {} stages", self.stages.len());
        Ok(MetaPipe {
            slot: self.slot,
            chain: self.chain,
            stages: self.stages,
        })
    }
}

impl<S: Item, E: Item> Cursor<E> for MetaPipe<S, E> {
    fn move_next(&mut self) -> bool {
        self.chain.move_next()
    }

    fn current(&self) -> Option<&E> {
        self.chain.current()
    }

    fn reset(&mut self) {
        self.chain.reset();
    }

    fn dispose(&mut self) {
        self.chain.dispose();
    }

    fn path(&self) -> Path {
        self.chain.path()
    }
}

impl<S: Item, E: Item> Pipe<S, E> for MetaPipe<S, E> {
    fn set_source(&mut self, source: Source<S>) {
        self.slot.borrow_mut().set(source);
        // Clears per-stage state such as duplicate sets
        self.chain.reset();
    }
}
