//! Fixed-point resolution of `NAME=expression` assignments.
//!
//! Assignments sit in a FIFO queue. Each pass attempts exactly the items
//! that were pending when the pass started; an item whose dependencies are
//! all defined is evaluated, anything else goes to the back of the queue.
//! A pass that resolves nothing ends the run with
//! [`ResolveError::CircularOrUndefinedDependency`].

use super::evaluator::{evaluate_tokens, EvalError};
use super::lexer::{identifiers, is_identifier, tokenize};
use super::types::{ResolvedVariable, VariableStore};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Invalid assignment syntax: '{0}'")]
    InvalidAssignmentSyntax(String),
    #[error("Variable {0} is assigned more than once")]
    DuplicateAssignment(String),
    #[error("Circular dependency detected or undefined variables: {}", .0.join(", "))]
    CircularOrUndefinedDependency(Vec<String>),
    #[error("Failed to evaluate {name}")]
    Evaluation {
        name: String,
        #[source]
        source: EvalError,
    },
}

/// One input line split at its first `=`.
///
/// Only the split is kept; the expression text is re-tokenized on every
/// attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Uppercased target name
    pub name: String,
    /// Raw right-hand side
    pub expression: String,
}

impl Assignment {
    pub fn parse(line: &str) -> Result<Self, ResolveError> {
        let invalid = || ResolveError::InvalidAssignmentSyntax(line.to_string());
        let (name, expression) = line.split_once('=').ok_or_else(invalid)?;
        let name = name.trim();
        if !is_identifier(name) {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_ascii_uppercase(),
            expression: expression.to_string(),
        })
    }
}

impl FromStr for Assignment {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Outcome of trying one assignment against the current store
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Resolved(f64),
    /// Dependencies that are not defined yet
    NotReady(Vec<String>),
    /// All dependencies were defined but evaluation failed
    Failed(EvalError),
}

/// Resolver behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Abort on the first evaluation failure instead of re-queuing the
    /// assignment as if it were still waiting on a dependency
    pub strict: bool,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Resolved non-constant variables, sorted by name
    pub variables: Vec<ResolvedVariable>,
    /// Number of passes over the pending queue
    pub passes: usize,
}

pub struct Resolver {
    store: VariableStore,
    pending: VecDeque<Assignment>,
    options: ResolveOptions,
}

impl Resolver {
    /// Parse every line up front and queue them in input order.
    ///
    /// Syntax errors and duplicate targets (including the predefined
    /// constants) are reported here, before any pass runs.
    pub fn new<I, S>(lines: I) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let store = VariableStore::with_constants();
        let mut seen = HashSet::new();
        let mut pending = VecDeque::new();

        for line in lines {
            let assignment = Assignment::parse(line.as_ref())?;
            if store.is_constant(&assignment.name) || !seen.insert(assignment.name.clone()) {
                return Err(ResolveError::DuplicateAssignment(assignment.name));
            }
            pending.push_back(assignment);
        }

        Ok(Self {
            store,
            pending,
            options: ResolveOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Number of assignments still waiting
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Try one assignment without touching the store
    pub fn attempt(&self, assignment: &Assignment) -> Attempt {
        let tokens = match tokenize(&assignment.expression) {
            Ok(tokens) => tokens,
            Err(e) => return Attempt::Failed(e),
        };

        let missing: Vec<String> = identifiers(&tokens)
            .into_iter()
            .filter(|dep| !self.store.is_defined(dep))
            .collect();
        if !missing.is_empty() {
            return Attempt::NotReady(missing);
        }

        match evaluate_tokens(&tokens, &self.store) {
            Ok(value) => Attempt::Resolved(value),
            Err(e) => Attempt::Failed(e),
        }
    }

    /// Run one pass over the items pending at its start.
    /// Returns whether anything was resolved.
    pub fn run_pass(&mut self) -> Result<bool, ResolveError> {
        let mut progress = false;

        for _ in 0..self.pending.len() {
            let Some(assignment) = self.pending.pop_front() else {
                break;
            };

            match self.attempt(&assignment) {
                Attempt::Resolved(value) => {
                    trace!(name = %assignment.name, value, "resolved");
                    self.store.define(&assignment.name, value);
                    progress = true;
                }
                Attempt::NotReady(missing) => {
                    trace!(name = %assignment.name, ?missing, "waiting on dependencies");
                    self.pending.push_back(assignment);
                }
                Attempt::Failed(error) => {
                    if self.options.strict {
                        return Err(ResolveError::Evaluation {
                            name: assignment.name,
                            source: error,
                        });
                    }
                    debug!(name = %assignment.name, %error, "evaluation failed, re-queued");
                    self.pending.push_back(assignment);
                }
            }
        }

        Ok(progress)
    }

    /// Run passes until the queue drains or a pass makes no progress
    pub fn run(mut self) -> Result<Resolution, ResolveError> {
        let mut passes = 0;

        while !self.pending.is_empty() {
            passes += 1;
            let before = self.pending.len();
            let progress = self.run_pass()?;
            debug!(pass = passes, before, after = self.pending.len(), "resolution pass");

            if !progress {
                let names: Vec<String> = self.pending.iter().map(|a| a.name.clone()).collect();
                warn!(?names, "no progress, giving up");
                return Err(ResolveError::CircularOrUndefinedDependency(names));
            }
        }

        Ok(Resolution {
            variables: self.store.resolved(),
            passes,
        })
    }
}

/// Resolve assignment lines into sorted `(name, value)` pairs
pub fn resolve<I, S>(lines: I) -> Result<Vec<ResolvedVariable>, ResolveError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    resolve_with(lines, ResolveOptions::default()).map(|r| r.variables)
}

pub fn resolve_with<I, S>(lines: I, options: ResolveOptions) -> Result<Resolution, ResolveError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Resolver::new(lines)?.with_options(options).run()
}

#[cfg(test)]
mod resolver_tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let a = Assignment::parse("x=1+2").unwrap();
        assert_eq!(a.name, "X");
        assert_eq!(a.expression, "1+2");
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let a: Assignment = " total = a = b".parse().unwrap();
        assert_eq!(a.name, "TOTAL");
        assert_eq!(a.expression, " a = b");
    }

    #[test]
    fn test_parse_missing_equals() {
        let result = Assignment::parse("A 5");
        assert_eq!(
            result,
            Err(ResolveError::InvalidAssignmentSyntax("A 5".to_string()))
        );
    }

    #[test]
    fn test_parse_bad_name() {
        assert!(Assignment::parse("=5").is_err());
        assert!(Assignment::parse("2A=5").is_err());
        assert!(Assignment::parse("A B=5").is_err());
    }

    #[test]
    fn test_new_rejects_syntax_eagerly() {
        let result = Resolver::new(["A=1", "oops"]);
        assert!(matches!(result, Err(ResolveError::InvalidAssignmentSyntax(_))));
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let result = Resolver::new(["A=1", "a=2"]);
        assert!(matches!(result, Err(ResolveError::DuplicateAssignment(ref n)) if n == "A"));
    }

    #[test]
    fn test_new_rejects_constant_targets() {
        let result = Resolver::new(["PI=3"]);
        assert!(matches!(result, Err(ResolveError::DuplicateAssignment(ref n)) if n == "PI"));
    }

    #[test]
    fn test_attempt_outcomes() {
        let resolver = Resolver::new(Vec::<String>::new()).unwrap();

        let ready = Assignment::parse("A=PI*2").unwrap();
        assert!(matches!(resolver.attempt(&ready), Attempt::Resolved(_)));

        let waiting = Assignment::parse("B=C+D").unwrap();
        assert_eq!(
            resolver.attempt(&waiting),
            Attempt::NotReady(vec!["C".to_string(), "D".to_string()])
        );

        let broken = Assignment::parse("E=1/0").unwrap();
        assert_eq!(
            resolver.attempt(&broken),
            Attempt::Failed(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_single_pass_snapshot() {
        let mut resolver = Resolver::new(["B=A+1", "A=2"]).unwrap();

        // B is re-queued behind A and must not be retried within the same pass
        assert!(resolver.run_pass().unwrap());
        assert_eq!(resolver.pending(), 1);
        assert_eq!(resolver.store().get("A"), Some(2.0));
        assert_eq!(resolver.store().get("B"), None);

        assert!(resolver.run_pass().unwrap());
        assert_eq!(resolver.pending(), 0);
        assert_eq!(resolver.store().get("B"), Some(3.0));
    }

    #[test]
    fn test_failed_evaluation_is_requeued() {
        let mut resolver = Resolver::new(["A=1/0"]).unwrap();
        assert!(!resolver.run_pass().unwrap());
        assert_eq!(resolver.pending(), 1);
    }

    #[test]
    fn test_strict_mode_surfaces_failure() {
        let result = resolve_with(["A=1", "B=A/0"], ResolveOptions { strict: true });
        assert_eq!(
            result,
            Err(ResolveError::Evaluation {
                name: "B".to_string(),
                source: EvalError::DivisionByZero,
            })
        );
    }

    #[test]
    fn test_lenient_mode_reports_stuck_names() {
        let result = resolve(["A=1", "B=A/0"]);
        assert_eq!(
            result,
            Err(ResolveError::CircularOrUndefinedDependency(vec!["B".to_string()]))
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ResolveError::CircularOrUndefinedDependency(vec!["A".into(), "B".into()]);
        assert_eq!(
            err.to_string(),
            "Circular dependency detected or undefined variables: A, B"
        );
    }
}
