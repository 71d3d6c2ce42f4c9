//! Function registry
//!
//! Maps function names to a declared arity and a node factory. New node kinds
//! register here; the parser never switches on names itself.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::error::{QueryError, QueryResult};
use super::expression::BoxedExpression;
use super::nodes::{Alias, Arithmetic, EveryNth, GetDeep, RandomSample};
use crate::window::{RollingWindow, TimedWindow, WindowAve, WindowSum};

/// Builds a node from its function name and already-parsed children
pub type NodeFactory = fn(&str, Vec<BoxedExpression>) -> QueryResult<BoxedExpression>;

/// A registered function
#[derive(Clone, Copy)]
pub struct FunctionSpec {
    pub arity: usize,
    pub factory: NodeFactory,
}

/// Name → constructor table used by the parser
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in node kind
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("GetDeep", 1, GetDeep::build);
        registry.register("As", 2, Alias::build);
        for op in ["Add", "Subtract", "Multiply", "Divide"] {
            registry.register(op, 2, Arithmetic::build);
        }
        registry.register("RollingWindow", 2, RollingWindow::build);
        registry.register("TimedWindow", 2, TimedWindow::build);
        registry.register("WindowAve", 1, WindowAve::build);
        registry.register("WindowSum", 1, WindowSum::build);
        registry.register("EveryNth", 2, EveryNth::build);
        registry.register("RandomSample", 2, RandomSample::build);
        registry
    }

    /// Shared built-in registry
    pub fn global() -> &'static FunctionRegistry {
        static GLOBAL: OnceLock<FunctionRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::builtin)
    }

    /// Register (or replace) a function
    pub fn register(&mut self, name: impl Into<String>, arity: usize, factory: NodeFactory) {
        self.functions
            .insert(name.into(), FunctionSpec { arity, factory });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    /// (name, arity) pairs sorted by name
    pub fn signatures(&self) -> Vec<(&str, usize)> {
        let mut sigs: Vec<_> = self
            .functions
            .iter()
            .map(|(name, spec)| (name.as_str(), spec.arity))
            .collect();
        sigs.sort_unstable();
        sigs
    }

    /// Instantiate `name` over `args`
    pub fn build(&self, name: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        let spec = self
            .get(name)
            .ok_or_else(|| QueryError::UnrecognizedFunction(name.to_string()))?;
        if args.len() != spec.arity {
            return Err(QueryError::Arity {
                function: name.to_string(),
                expected: spec.arity,
                got: args.len(),
            });
        }
        (spec.factory)(name, args)
    }
}
