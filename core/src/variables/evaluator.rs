//! Expression evaluator with variable resolution and factorial.
//!
//! Evaluation is a single left-to-right scan over two stacks (values and
//! pending operators). Every new operator first folds all pending operators
//! back to the nearest `(`, so there is no precedence: `2+3*4` is `(2+3)*4`.

use super::lexer::{tokenize, BinaryOperator, Token};
use super::types::VariableStore;
use thiserror::Error;
use tracing::trace;

/// Largest n for which n! is finite in f64
const MAX_FINITE_FACTORIAL: u32 = 170;

/// Evaluation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Negative input for factorial: {0}")]
    NegativeFactorialInput(i64),
    #[error("Unsupported operation: '{0}'")]
    InvalidOperation(char),
    #[error("Malformed expression: {0}")]
    MalformedExpression(String),
}

/// Entry on the operator stack
#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingOp {
    Open,
    Binary(BinaryOperator),
    Unknown(char),
}

/// Evaluation context
pub struct EvalContext<'a> {
    store: &'a VariableStore,
    values: Vec<f64>,
    ops: Vec<PendingOp>,
}

impl<'a> EvalContext<'a> {
    pub fn new(store: &'a VariableStore) -> Self {
        Self {
            store,
            values: Vec::new(),
            ops: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Result<f64, EvalError> {
        self.store
            .get(name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    /// Replace every `operand !` pair with the computed factorial.
    /// The operand is the number or identifier token directly before `!`.
    fn resolve_factorials(&self, tokens: &[Token]) -> Result<Vec<Token>, EvalError> {
        let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if *token != Token::Bang {
                out.push(token.clone());
                continue;
            }
            let operand = match out.pop() {
                Some(Token::Number(n)) => n,
                Some(Token::Identifier(name)) => self.lookup(&name)?,
                _ => {
                    return Err(EvalError::MalformedExpression(
                        "'!' must follow a number or variable".to_string(),
                    ))
                }
            };
            out.push(Token::Number(factorial(operand)?));
        }
        Ok(out)
    }

    fn pop_value(&mut self) -> Result<f64, EvalError> {
        self.values
            .pop()
            .ok_or_else(|| EvalError::MalformedExpression("missing operand".to_string()))
    }

    /// Pop the top operator and fold it into the value stack
    fn reduce(&mut self) -> Result<(), EvalError> {
        let Some(op) = self.ops.pop() else {
            return Ok(());
        };
        let b = self.pop_value()?;
        let a = self.pop_value()?;
        let result = match op {
            PendingOp::Binary(op) => apply_operator(op, a, b)?,
            PendingOp::Unknown(c) => return Err(EvalError::InvalidOperation(c)),
            PendingOp::Open => {
                return Err(EvalError::MalformedExpression(
                    "unmatched '('".to_string(),
                ))
            }
        };
        self.values.push(result);
        Ok(())
    }

    /// Fold pending operators down to (not including) the nearest `(`
    fn reduce_to_open(&mut self) -> Result<(), EvalError> {
        while matches!(self.ops.last(), Some(op) if *op != PendingOp::Open) {
            self.reduce()?;
        }
        Ok(())
    }

    /// Evaluate one token stream. The stacks start empty on every call.
    pub fn eval_tokens(&mut self, tokens: &[Token]) -> Result<f64, EvalError> {
        self.values.clear();
        self.ops.clear();

        for token in self.resolve_factorials(tokens)? {
            match token {
                Token::Number(n) => self.values.push(n),
                Token::Identifier(name) => {
                    let value = self.lookup(&name)?;
                    self.values.push(value);
                }
                Token::LParen => self.ops.push(PendingOp::Open),
                Token::RParen => {
                    self.reduce_to_open()?;
                    if self.ops.pop() != Some(PendingOp::Open) {
                        return Err(EvalError::MalformedExpression(
                            "unmatched ')'".to_string(),
                        ));
                    }
                }
                Token::Operator(op) => {
                    self.reduce_to_open()?;
                    self.ops.push(PendingOp::Binary(op));
                }
                Token::Unknown(c) => {
                    self.reduce_to_open()?;
                    self.ops.push(PendingOp::Unknown(c));
                }
                // resolve_factorials consumed every Bang
                Token::Bang | Token::Eof => {}
            }
        }

        while !self.ops.is_empty() {
            self.reduce()?;
        }

        match self.values.as_slice() {
            [value] => Ok(*value),
            [] => Err(EvalError::MalformedExpression("empty expression".to_string())),
            _ => Err(EvalError::MalformedExpression(
                "missing operator between operands".to_string(),
            )),
        }
    }
}

fn apply_operator(op: BinaryOperator, a: f64, b: f64) -> Result<f64, EvalError> {
    match op {
        BinaryOperator::Add => Ok(a + b),
        BinaryOperator::Sub => Ok(a - b),
        BinaryOperator::Mul => Ok(a * b),
        BinaryOperator::Div => {
            if b == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(a / b)
            }
        }
        BinaryOperator::Pow => Ok(a.powf(b)),
    }
}

/// Factorial of `operand` truncated toward zero
pub fn factorial(operand: f64) -> Result<f64, EvalError> {
    let n = operand.trunc();
    if n < 0.0 {
        return Err(EvalError::NegativeFactorialInput(n as i64));
    }
    if n.is_nan() {
        return Ok(f64::NAN);
    }
    if n > f64::from(MAX_FINITE_FACTORIAL) {
        return Ok(f64::INFINITY);
    }
    Ok((2..=n as u32).map(f64::from).product())
}

/// Evaluate a token stream produced by [`tokenize`]
pub fn evaluate_tokens(tokens: &[Token], store: &VariableStore) -> Result<f64, EvalError> {
    let mut ctx = EvalContext::new(store);
    let value = ctx.eval_tokens(tokens)?;
    trace!(tokens = tokens.len(), value, "evaluated expression");
    Ok(value)
}

/// Evaluate an expression string given a variable store
pub fn evaluate(expression: &str, store: &VariableStore) -> Result<f64, EvalError> {
    let tokens = tokenize(expression)?;
    evaluate_tokens(&tokens, store)
}
