//! Variable resolvers - host-supplied lookup of current values
//!
//! Names arrive lowercased from the program. A resolver answers NaN for a
//! name it does not know; the evaluator carries that NaN through the rest of
//! the expression instead of failing.

use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// Lookup of a variable's current value
pub trait Resolver {
    /// Current value of `name`, or NaN when unknown
    fn resolve(&self, name: &str) -> f64;
}

impl<F> Resolver for F
where
    F: Fn(&str) -> f64,
{
    fn resolve(&self, name: &str) -> f64 {
        self(name)
    }
}

/// Resolver that knows nothing; every lookup is NaN
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVariables;

impl Resolver for NoVariables {
    fn resolve(&self, _name: &str) -> f64 {
        f64::NAN
    }
}

/// Static name -> value table, case-insensitive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    values: FxHashMap<String, f64>,
}

fn fold_case(name: &str) -> Cow<'_, str> {
    if name.chars().any(char::is_uppercase) {
        Cow::Owned(name.to_lowercase())
    } else {
        Cow::Borrowed(name)
    }
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value, returning the previous one
    pub fn set(&mut self, name: &str, value: f64) -> Option<f64> {
        self.values.insert(fold_case(name).into_owned(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(&*fold_case(name)).copied()
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(&*fold_case(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl Resolver for VariableTable {
    fn resolve(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(f64::NAN)
    }
}

impl<K: AsRef<str>> FromIterator<(K, f64)> for VariableTable {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<K: AsRef<str>> Extend<(K, f64)> for VariableTable {
    fn extend<I: IntoIterator<Item = (K, f64)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name.as_ref(), value);
        }
    }
}

/// Try `first`, fall back to `second` when it answers NaN
pub struct Chain<'a, A: ?Sized, B: ?Sized> {
    first: &'a A,
    second: &'a B,
}

impl<'a, A: Resolver + ?Sized, B: Resolver + ?Sized> Chain<'a, A, B> {
    pub fn new(first: &'a A, second: &'a B) -> Self {
        Self { first, second }
    }
}

impl<A: Resolver + ?Sized, B: Resolver + ?Sized> Resolver for Chain<'_, A, B> {
    fn resolve(&self, name: &str) -> f64 {
        let value = self.first.resolve(name);
        if value.is_nan() {
            self.second.resolve(name)
        } else {
            value
        }
    }
}
