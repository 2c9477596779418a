//! gauge-calc - Expression engine for gauge channels
//!
//! Compiles a text formula into a postfix program once, then evaluates it
//! against live values as often as needed without allocating.
//!
//! # Features
//!
//! - **Tokenizer**: lazy, maximal-munch operator lexing, unary/binary sign detection
//! - **Parser**: shunting-yard with a static precedence table, variable-arity calls
//! - **Evaluator**: single-pass stack machine, NaN soft failure for data errors
//! - **Registry**: explicit registration of operator and function processors
//!
//! # Example
//!
//! ```rust
//! use gauge_calc::{parse, CalcEngine, VariableTable};
//!
//! let mut engine = CalcEngine::with_builtins();
//!
//! // Parse once
//! let program = parse("x > 0 ? remap(x, 0, 1, 30, 100) : 0").unwrap();
//!
//! // Evaluate many times
//! let mut vars = VariableTable::new();
//! vars.set("x", 0.5);
//! assert_eq!(engine.evaluate(&program, &vars).unwrap(), 65.0);
//!
//! // Unknown names degrade to NaN instead of failing; NaN is falsy
//! vars.remove("x");
//! assert_eq!(engine.evaluate(&program, &vars).unwrap(), 0.0);
//! assert!(engine.evaluate_simple("x + 1", &vars).unwrap().is_nan());
//! ```
//!
//! # Operators
//!
//! From tightest to loosest binding:
//!
//! | Rank | Operators | Associativity |
//! |------|-----------|---------------|
//! | 1 | unary `+ - ! ~`, function call | right |
//! | 2 | `* / %` | left |
//! | 3 | `+ -` | left |
//! | 4 | `<< >>` | left |
//! | 5 | `> >= < <=` | left |
//! | 6 | `== !=` | left |
//! | 7 | `&` | left |
//! | 8 | `^` | left |
//! | 9 | `\|` | left |
//! | 10 | `&&` | left |
//! | 11 | `\|\|` | left |
//! | 12 | `? :` | right |
//! | 13 | `,` | - |
//!
//! Bitwise operators work on 32-bit signed integers; any other operand
//! yields NaN. Both arms of a ternary are evaluated before one is selected.
//!
//! # Built-in Functions
//!
//! | Function | Signature | Description |
//! |----------|-----------|-------------|
//! | `remap` | `remap(v, in_min, in_max, out_min, out_max)` | Linear range mapping |
//! | `scale` | `scale(value, factor)` | Multiply by factor |
//! | `clamp` | `clamp(value, min, max)` | Limit to range |
//! | `abs` | `abs(value)` | Absolute value |
//! | `sign` | `sign(value)` | Sign: -1, 0, or 1 |
//! | `sqrt` | `sqrt(value)` | Square root |
//! | `floor` | `floor(value)` | Round down |
//! | `ceil` | `ceil(value)` | Round up |
//! | `round` | `round(value)` or `round(value, decimals)` | Round to decimals |
//! | `pow` | `pow(base, exp)` | Power |
//! | `min` | `min(a, b, ...)` | Minimum of all |
//! | `max` | `max(a, b, ...)` | Maximum of all |
//! | `avg` | `avg(a, b, ...)` | Arithmetic mean |
//! | `rand` | `rand()` or `rand(lo, hi)` | Uniform random value |

pub mod buffer;
pub mod builtin_functions;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod program;
pub mod registry;
pub mod resolver;
pub mod token;
pub mod tokenizer;

// Re-exports for convenience
pub use buffer::OrderedBuffer;
pub use error::{CalcError, EvalError, ParseError, Result};
pub use evaluator::{truthy, CalcEngine, Evaluator};
pub use parser::{parse, Parser};
pub use program::Program;
pub use registry::{Registry, RegistryBuilder};
pub use resolver::{Chain, NoVariables, Resolver, VariableTable};
pub use token::Token;
pub use tokenizer::tokenize;

// Re-export stateless functions for direct use
pub use builtin_functions::{abs, avg, clamp, max, min, remap, round, scale, sign};
