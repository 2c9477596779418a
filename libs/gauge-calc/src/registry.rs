//! Registry - operator and function processors consulted by the evaluator
//!
//! Populated explicitly at startup, then shared read-only (`Arc<Registry>`)
//! between any number of evaluators.

use crate::builtin_functions;
use crate::token::{BinaryOp, UnaryOp, BINARY_COUNT, UNARY_COUNT};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Processor for a prefix operator
pub type UnaryFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Processor for an infix operator
pub type BinaryFn = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// Processor for a named function; receives its arguments left to right
pub type FunctionFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Table of operator and function implementations
#[derive(Clone)]
pub struct Registry {
    unary: [Option<UnaryFn>; UNARY_COUNT],
    binary: [Option<BinaryFn>; BINARY_COUNT],
    functions: FxHashMap<Box<str>, FunctionFn>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::empty()
    }
}

impl Registry {
    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self {
            unary: std::array::from_fn(|_| None),
            binary: std::array::from_fn(|_| None),
            functions: FxHashMap::default(),
        }
    }

    /// Registry with every standard operator and no functions
    pub fn with_operators() -> Self {
        let mut registry = Self::empty();
        builtin_functions::register_operators(&mut registry);
        registry
    }

    /// Registry with every standard operator and the built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::with_operators();
        builtin_functions::register_functions(&mut registry);
        registry
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            registry: Self::empty(),
        }
    }

    pub fn register_unary<F>(&mut self, op: UnaryOp, processor: F) -> &mut Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.unary[op.index()] = Some(Arc::new(processor));
        self
    }

    pub fn register_binary<F>(&mut self, op: BinaryOp, processor: F) -> &mut Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.binary[op.index()] = Some(Arc::new(processor));
        self
    }

    /// Register a function under `name` (case-insensitive), replacing any
    /// previous registration
    pub fn register_function<F>(&mut self, name: &str, processor: F) -> &mut Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        let name = name.to_lowercase().into_boxed_str();
        if self.functions.contains_key(&name) {
            debug!(function = %name, "Replacing registered function");
        }
        self.functions.insert(name, Arc::new(processor));
        self
    }

    #[inline]
    pub fn unary(&self, op: UnaryOp) -> Option<&UnaryFn> {
        self.unary[op.index()].as_ref()
    }

    #[inline]
    pub fn binary(&self, op: BinaryOp) -> Option<&BinaryFn> {
        self.binary[op.index()].as_ref()
    }

    /// Look up a function; `name` must already be lowercase, as program
    /// names are
    #[inline]
    pub fn function(&self, name: &str) -> Option<&FunctionFn> {
        self.functions.get(name)
    }

    pub fn contains_function(&self, name: &str) -> bool {
        self.functions.contains_key(name.to_lowercase().as_str())
    }

    /// Registered function names, sorted
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(|name| &**name).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("unary", &self.unary.iter().filter(|p| p.is_some()).count())
            .field("binary", &self.binary.iter().filter(|p| p.is_some()).count())
            .field("functions", &self.function_names())
            .finish()
    }
}

/// Chained construction of a [`Registry`]
///
/// # Example
/// ```
/// use gauge_calc::{Registry, token::BinaryOp};
///
/// let registry = Registry::builder()
///     .operators()
///     .binary(BinaryOp::Modulo, |a, b| a.rem_euclid(b))
///     .function("double", |args| args.first().map_or(f64::NAN, |v| v * 2.0))
///     .build();
/// assert!(registry.contains_function("double"));
/// ```
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    /// Add every standard operator
    pub fn operators(mut self) -> Self {
        builtin_functions::register_operators(&mut self.registry);
        self
    }

    /// Add the built-in function library
    pub fn builtins(mut self) -> Self {
        builtin_functions::register_functions(&mut self.registry);
        self
    }

    pub fn unary<F>(mut self, op: UnaryOp, processor: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.registry.register_unary(op, processor);
        self
    }

    pub fn binary<F>(mut self, op: BinaryOp, processor: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.registry.register_binary(op, processor);
        self
    }

    pub fn function<F>(mut self, name: &str, processor: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.registry.register_function(name, processor);
        self
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
