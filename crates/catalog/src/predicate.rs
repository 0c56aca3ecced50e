//! Filter predicates: `<column> <op> <literal>`.
//!
//! Accepted forms:
//! - `mag_r < 24.5`
//! - `tract == 4850`
//! - `band == 'r'` or `band != "i"`
//!
//! Operators are `<`, `<=`, `>`, `>=`, `==` and `!=`. Literals are numbers or
//! quoted strings. Comparisons involving NaN are false, except `!=`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{CatalogError, CatalogResult};
use crate::value::Value;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Op {
    /// Two-character operators first, so `<=` is not read as `<`.
    const TOKENS: [(&'static str, Op); 6] = [
        ("<=", Op::Le),
        (">=", Op::Ge),
        ("==", Op::Eq),
        ("!=", Op::Ne),
        ("<", Op::Lt),
        (">", Op::Gt),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Eq => "==",
            Op::Ne => "!=",
        }
    }

    fn holds(&self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Op::Ne, None) => true,
            (_, None) => false,
            (Op::Lt, Some(o)) => o == Ordering::Less,
            (Op::Le, Some(o)) => o != Ordering::Greater,
            (Op::Gt, Some(o)) => o == Ordering::Greater,
            (Op::Ge, Some(o)) => o != Ordering::Less,
            (Op::Eq, Some(o)) => o == Ordering::Equal,
            (Op::Ne, Some(o)) => o != Ordering::Equal,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub column: String,
    pub op: Op,
    pub literal: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: Op, literal: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            literal: literal.into(),
        }
    }

    /// Parse a list of filter strings.
    pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> CatalogResult<Vec<Predicate>> {
        inputs.iter().map(|s| s.as_ref().parse()).collect()
    }

    /// Test one cell.
    ///
    /// A number compared against a string literal (or the reverse) is a
    /// `TypeMismatch`.
    pub fn test(&self, value: &Value) -> CatalogResult<bool> {
        if std::mem::discriminant(value) != std::mem::discriminant(&self.literal) {
            return Err(CatalogError::TypeMismatch {
                column: self.column.clone(),
                message: format!(
                    "{} value compared with {} literal {}",
                    value.type_name(),
                    self.literal.type_name(),
                    self.literal
                ),
            });
        }
        Ok(self.op.holds(value.compare(&self.literal)))
    }
}

impl FromStr for Predicate {
    type Err = CatalogError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (pos, token, op) = Op::TOKENS
            .iter()
            .filter_map(|&(token, op)| input.find(token).map(|pos| (pos, token, op)))
            .min_by_key(|&(pos, token, _)| (pos, std::cmp::Reverse(token.len())))
            .ok_or_else(|| CatalogError::predicate(input, "no comparison operator"))?;

        let column = input[..pos].trim();
        if !is_identifier(column) {
            return Err(CatalogError::predicate(input, format!("invalid column name '{}'", column)));
        }
        let literal = parse_literal(input[pos + token.len()..].trim())
            .ok_or_else(|| CatalogError::predicate(input, "literal must be a number or a quoted string"))?;

        Ok(Predicate {
            column: column.to_string(),
            op,
            literal,
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            Value::Text(s) => write!(f, "{} {} '{}'", self.column, self.op, s),
            Value::Number(v) => write!(f, "{} {} {}", self.column, self.op, v),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_literal(s: &str) -> Option<Value> {
    for quote in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(quote) {
            let inner = inner.strip_suffix(quote)?;
            if inner.contains(quote) {
                return None;
            }
            return Some(Value::Text(inner.to_string()));
        }
    }
    if s.is_empty() || s.contains(char::is_whitespace) {
        return None;
    }
    s.parse::<f64>().ok().map(Value::Number)
}
