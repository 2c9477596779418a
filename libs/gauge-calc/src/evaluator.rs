//! Stack evaluator for postfix programs, and the CalcEngine convenience wrapper
//!
//! Evaluation runs in a single pass over the program with three working
//! stacks:
//! - values: operands and intermediate results
//! - markers: value-stack depth at each open call, so a call knows how many
//!   arguments it owns
//! - conditions: outcome of each `?` until the matching `:` consumes it
//!
//! Data problems (unknown variable or function, missing processor, bitwise
//! operand out of range) become NaN and flow through the rest of the
//! expression. Only a malformed program is an error.

use crate::buffer::OrderedBuffer;
use crate::error::{EvalError, Result};
use crate::parser::parse;
use crate::program::Program;
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::token::{Operator, Token};
use std::sync::Arc;
use tracing::trace;

/// Truthiness of the expression language: nonzero and not NaN
#[inline]
pub fn truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

/// Reusable evaluation scratch space
///
/// One evaluator serves any number of programs, one at a time. The stacks
/// keep their capacity between calls, so steady-state evaluation does not
/// allocate.
#[derive(Debug, Default)]
pub struct Evaluator {
    values: OrderedBuffer<f64>,
    markers: OrderedBuffer<usize>,
    conditions: OrderedBuffer<bool>,
    arguments: Vec<f64>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `program` against `resolver` and `registry`
    ///
    /// Returns NaN for data errors. Any non-finite intermediate value turns
    /// into NaN where it appears and stays NaN through the rest of the
    /// expression.
    pub fn evaluate<R>(
        &mut self,
        program: &Program,
        resolver: &R,
        registry: &Registry,
    ) -> std::result::Result<f64, EvalError>
    where
        R: Resolver + ?Sized,
    {
        self.values.clear();
        self.markers.clear();
        self.conditions.clear();

        for (index, instruction) in program.instructions().iter().enumerate() {
            match instruction {
                Token::Number(value) => self.values.push_back(finite_or_nan(*value)),
                Token::Identifier(name) => {
                    let value = resolver.resolve(name);
                    if value.is_nan() {
                        trace!(variable = %name, "Variable unresolved");
                    }
                    self.values.push_back(finite_or_nan(value));
                },
                Token::LeftParen => self.markers.push_back(self.values.len()),
                Token::Call(name) => {
                    let value = self.call(index, name, registry)?;
                    self.values.push_back(value);
                },
                Token::Operator(op) => self.apply(index, *op, registry)?,
                Token::RightParen | Token::Comma => {
                    return Err(EvalError::InvalidInstruction {
                        token: instruction.to_string(),
                        index,
                    });
                },
            }
        }

        if self.values.len() != 1 {
            return Err(EvalError::UnbalancedProgram {
                remaining: self.values.len(),
            });
        }
        Ok(self.values.pop_back().map_or(f64::NAN, finite_or_nan))
    }

    fn pop(&mut self, index: usize) -> std::result::Result<f64, EvalError> {
        self.values
            .pop_back()
            .ok_or(EvalError::StackUnderflow { index })
    }

    fn call(
        &mut self,
        index: usize,
        name: &str,
        registry: &Registry,
    ) -> std::result::Result<f64, EvalError> {
        let depth = self
            .markers
            .pop_back()
            .ok_or(EvalError::MarkerUnderflow { index })?;
        let count = self
            .values
            .len()
            .checked_sub(depth)
            .ok_or(EvalError::StackUnderflow { index })?;

        self.arguments.clear();
        self.arguments.extend(self.values.pop_back_n(count));

        match registry.function(name) {
            Some(function) => Ok(finite_or_nan(function(&self.arguments))),
            None => {
                trace!(function = %name, "Function not registered");
                Ok(f64::NAN)
            },
        }
    }

    fn apply(
        &mut self,
        index: usize,
        op: Operator,
        registry: &Registry,
    ) -> std::result::Result<(), EvalError> {
        match op {
            Operator::Unary(unary) => {
                let operand = self.pop(index)?;
                let value = match registry.unary(unary) {
                    Some(processor) => finite_or_nan(processor(operand)),
                    None => {
                        trace!(operator = %op, "Operator not registered");
                        f64::NAN
                    },
                };
                self.values.push_back(value);
            },
            Operator::Binary(binary) => {
                let right = self.pop(index)?;
                let left = self.pop(index)?;
                let value = match registry.binary(binary) {
                    Some(processor) => finite_or_nan(processor(left, right)),
                    None => {
                        trace!(operator = %op, "Operator not registered");
                        f64::NAN
                    },
                };
                self.values.push_back(value);
            },
            Operator::If => {
                let then = self.pop(index)?;
                let condition = truthy(self.pop(index)?);
                if condition {
                    self.values.push_back(then);
                }
                self.conditions.push_back(condition);
            },
            Operator::Else => {
                let condition = self
                    .conditions
                    .pop_back()
                    .ok_or(EvalError::ConditionUnderflow { index })?;
                if condition {
                    // Drop the alternative, the selected `then` value stays below it
                    self.pop(index)?;
                }
            },
        }
        Ok(())
    }
}

/// Non-finite values are carried as NaN
fn finite_or_nan(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::NAN
    }
}

/// CalcEngine - Formula evaluation engine
///
/// Bundles a shared registry with one evaluator.
///
/// # Example
/// ```
/// use gauge_calc::{CalcEngine, VariableTable};
///
/// let mut engine = CalcEngine::with_builtins();
///
/// let mut vars = VariableTable::new();
/// vars.set("P", 1000.0);
/// vars.set("efficiency", 0.95);
///
/// let result = engine.evaluate_simple("P * efficiency", &vars).unwrap();
/// assert_eq!(result, 950.0);
///
/// let clamped = engine.evaluate_simple("clamp(P, 0, 500)", &vars).unwrap();
/// assert_eq!(clamped, 500.0);
/// ```
#[derive(Debug)]
pub struct CalcEngine {
    registry: Arc<Registry>,
    evaluator: Evaluator,
}

impl CalcEngine {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            evaluator: Evaluator::new(),
        }
    }

    /// Engine over the standard operators and built-in functions
    pub fn with_builtins() -> Self {
        Self::new(Arc::new(Registry::with_builtins()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Evaluate a parsed program
    pub fn evaluate<R>(&mut self, program: &Program, variables: &R) -> Result<f64>
    where
        R: Resolver + ?Sized,
    {
        Ok(self
            .evaluator
            .evaluate(program, variables, &self.registry)?)
    }

    /// Parse and evaluate in one step
    ///
    /// For expressions evaluated repeatedly, parse once and use
    /// [`evaluate`](Self::evaluate) instead.
    pub fn evaluate_simple<R>(&mut self, formula: &str, variables: &R) -> Result<f64>
    where
        R: Resolver + ?Sized,
    {
        let program = parse(formula)?;
        self.evaluate(&program, variables)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::resolver::{NoVariables, VariableTable};
    use crate::token::BinaryOp;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    fn make_vars(pairs: &[(&str, f64)]) -> VariableTable {
        pairs.iter().copied().collect()
    }

    fn eval(expression: &str) -> f64 {
        CalcEngine::with_builtins()
            .evaluate_simple(expression, &NoVariables)
            .unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("7 % 4"), 3.0);
        assert_eq!(eval("-2 * -3"), 6.0);
    }

    #[test]
    fn test_variables() {
        let vars = make_vars(&[("a", 4.0), ("b", 6.0)]);
        let mut engine = CalcEngine::with_builtins();
        assert_eq!(engine.evaluate_simple("(a + B) / 2", &vars).unwrap(), 5.0);
        assert!(engine
            .evaluate_simple("unknown_var + 1", &vars)
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_ternary() {
        let mut engine = CalcEngine::with_builtins();
        let program = parse("x > 0 ? y : z").unwrap();
        let positive = make_vars(&[("x", 1.0), ("y", 10.0), ("z", 20.0)]);
        let negative = make_vars(&[("x", -1.0), ("y", 10.0), ("z", 20.0)]);
        assert_eq!(engine.evaluate(&program, &positive).unwrap(), 10.0);
        assert_eq!(engine.evaluate(&program, &negative).unwrap(), 20.0);
    }

    #[test]
    fn test_nested_ternary() {
        assert_eq!(eval("1 ? 2 : 3 ? 4 : 5"), 2.0);
        assert_eq!(eval("0 ? 2 : 3 ? 4 : 5"), 4.0);
        assert_eq!(eval("0 ? 2 : 0 ? 4 : 5"), 5.0);
        assert_eq!(eval("1 ? 0 ? 6 : 7 : 8"), 7.0);
        assert_eq!(eval("(1 ? 2 : 3) + 10"), 12.0);
    }

    #[test]
    fn test_nan_condition_is_falsy() {
        let vars = make_vars(&[("y", 1.0), ("z", 2.0)]);
        let mut engine = CalcEngine::with_builtins();
        assert_eq!(engine.evaluate_simple("missing ? y : z", &vars).unwrap(), 2.0);
    }

    #[test]
    fn test_ternary_evaluates_both_arms() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = Registry::builder()
            .operators()
            .function("count", move |_| {
                counter.fetch_add(1, Ordering::SeqCst) as f64 + 1.0
            })
            .build();
        let mut engine = CalcEngine::new(Arc::new(registry));

        let value = engine
            .evaluate_simple("1 > 0 ? count() : count()", &NoVariables)
            .unwrap();
        assert_eq!(value, 1.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_function_arguments_in_order() {
        assert_eq!(eval("remap(5, 0, 10, 0, 1)"), 0.5);
        assert_eq!(eval("pow(2, 10)"), 1024.0);
        assert_eq!(eval("max(1, min(8, 3), 2) * 2"), 6.0);
        assert_eq!(eval("abs(-(2 + 3))"), 5.0);
        assert_eq!(eval("rand() < 1"), 1.0);
    }

    #[test]
    fn test_unknown_function_is_nan() {
        assert!(eval("nosuch(1, 2) + 1").is_nan());
    }

    #[test]
    fn test_missing_processor_is_nan() {
        let registry = Registry::builder()
            .binary(BinaryOp::Add, |a, b| a + b)
            .build();
        let mut engine = CalcEngine::new(Arc::new(registry));
        assert_eq!(engine.evaluate_simple("1 + 2", &NoVariables).unwrap(), 3.0);
        assert!(engine
            .evaluate_simple("1 * 2", &NoVariables)
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_infinity_normalized() {
        assert!(eval("1 / 0").is_nan());
        assert!(eval("1 / 0 > 5").is_nan());
        assert!(eval("min(1 / 0, 3)").is_nan());
        assert_eq!(eval("-1 / 0 < 0 ? 1 : 2"), 2.0);
    }

    #[test]
    fn test_infinite_variable_is_nan() {
        let resolver = |name: &str| if name == "big" { f64::INFINITY } else { f64::NAN };
        let mut engine = CalcEngine::with_builtins();
        let value = engine.evaluate_simple("big > 0 ? 1 : 2", &resolver).unwrap();
        assert_eq!(value, 2.0);
    }

    #[test]
    fn test_infinity_inside_clamp() {
        let vars: VariableTable = [("x", 50.0), ("y", 0.0)].into_iter().collect();
        let mut engine = CalcEngine::with_builtins();
        let value = engine
            .evaluate_simple("clamp(x / y, 0, 100)", &vars)
            .unwrap();
        assert!(value.is_nan());
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(eval("6 & 3"), 2.0);
        assert_eq!(eval("1 << 3 | 1"), 9.0);
        assert_eq!(eval("~0"), -1.0);
        assert!(eval("1.5 & 2").is_nan());
    }

    #[test]
    fn test_logic() {
        assert_eq!(eval("(5 > 3) && (2 < 1)"), 0.0);
        assert!(truthy(eval("(5 > 3) || (2 < 1)")));
        assert_eq!(eval("!0"), 1.0);
    }

    #[test]
    fn test_evaluator_reused_across_programs() {
        let registry = Registry::with_builtins();
        let mut evaluator = Evaluator::new();
        let first = parse("max(1, 2, 3)").unwrap();
        let second = parse("4 - 1").unwrap();
        for _ in 0..3 {
            assert_eq!(
                evaluator.evaluate(&first, &NoVariables, &registry).unwrap(),
                3.0
            );
            assert_eq!(
                evaluator.evaluate(&second, &NoVariables, &registry).unwrap(),
                3.0
            );
        }
    }

    #[test]
    fn test_malformed_program_is_error() {
        let registry = Registry::with_builtins();
        let mut evaluator = Evaluator::new();

        let program = Program::from_postfix(vec![Token::Number(1.0), Token::Number(2.0)]);
        assert_eq!(
            evaluator.evaluate(&program, &NoVariables, &registry),
            Err(EvalError::UnbalancedProgram { remaining: 2 })
        );

        let program = Program::from_postfix(vec![Token::Operator(Operator::Binary(
            BinaryOp::Add,
        ))]);
        assert_eq!(
            evaluator.evaluate(&program, &NoVariables, &registry),
            Err(EvalError::StackUnderflow { index: 0 })
        );

        let program = Program::from_postfix(vec![Token::Call("abs".into())]);
        assert_eq!(
            evaluator.evaluate(&program, &NoVariables, &registry),
            Err(EvalError::MarkerUnderflow { index: 0 })
        );

        let program = Program::from_postfix(vec![Token::Number(1.0), Token::Comma]);
        assert!(matches!(
            evaluator.evaluate(&program, &NoVariables, &registry),
            Err(EvalError::InvalidInstruction { index: 1, .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_soft_failures_traced() {
        assert!(eval("ghost + nosuch()").is_nan());
        assert!(logs_contain("Variable unresolved"));
        assert!(logs_contain("Function not registered"));
    }

    #[test]
    fn test_closure_resolver() {
        let mut engine = CalcEngine::with_builtins();
        let resolver = |name: &str| if name == "t" { 21.5 } else { f64::NAN };
        assert_eq!(engine.evaluate_simple("T * 2", &resolver).unwrap(), 43.0);
    }
}
