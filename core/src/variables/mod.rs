//! Named arithmetic variables resolved from `NAME=expression` assignments.
//!
//! Provides:
//! - A left-to-right arithmetic evaluator (`+ - * / ^ !`, parentheses)
//! - Variable references, including the predefined `PI` and `EN`
//! - Fixed-point resolution of forward references with cycle detection

pub mod types;
pub mod lexer;
pub mod evaluator;
pub mod resolver;


pub use types::{Constant, ResolvedVariable, VariableStore};
pub use lexer::{tokenize, Token};
pub use evaluator::{evaluate, EvalContext, EvalError};
pub use resolver::{
    resolve, resolve_with, Assignment, Attempt, Resolution, ResolveError, ResolveOptions,
    Resolver,
};
