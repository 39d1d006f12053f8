//! Expression Module - Sandboxed evaluation of markup expressions
//!
//! Binding attributes carry small expressions (`count + 1`, `open && 'is-open'`,
//! `count++`). They are parsed once, when the binding is created, and the
//! syntax tree is evaluated on every render against a [`Scope`] whose
//! variables are the component's state keys and computed accessors.
//!
//! Nothing outside the scope is reachable: there is no global object, no
//! prototype chain and no dynamic code loading.
//!
//! # Example
//!
//! ```ignore
//! use spark_bind::expr::{Expression, ValueScope};
//! use spark_bind::Value;
//!
//! let expr = Expression::compile("count > 0 ? count + ' items' : 'empty'")?;
//! let scope = ValueScope::new(Value::from_pairs([("count", 3)]));
//! assert_eq!(expr.evaluate(&scope)?, Value::from("3 items"));
//! ```

pub mod ast;
mod builtins;
mod eval;
mod lexer;
mod parser;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use builtins::MethodOutcome;
pub use eval::{Scope, binary, evaluate};
pub use parser::parse;

use crate::error::{EvalError, ParseError};
use crate::types::{PathKey, Value};

// =============================================================================
// Compiled expression
// =============================================================================

/// A parsed expression together with its source text.
///
/// Cheap to clone; the syntax tree is shared.
#[derive(Clone)]
pub struct Expression {
    source: Rc<str>,
    ast: Rc<ast::Expr>,
}

impl Expression {
    /// Parse `source` once.
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        let ast = parse(source)?;
        Ok(Self {
            source: Rc::from(source),
            ast: Rc::new(ast),
        })
    }

    /// Original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed syntax tree.
    pub fn ast(&self) -> &ast::Expr {
        &self.ast
    }

    /// The identifier name if the whole expression is one bare identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        self.ast.as_ident()
    }

    /// Evaluate against `scope`.
    pub fn evaluate(&self, scope: &dyn Scope) -> Result<Value, EvalError> {
        evaluate(&self.ast, scope)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expression").field(&self.source).finish()
    }
}

// =============================================================================
// Scopes
// =============================================================================

/// Scope with no variables. Only literals and globals evaluate.
pub struct EmptyScope;

impl Scope for EmptyScope {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }

    fn assign(&self, path: &[PathKey], _value: Value) -> Result<(), EvalError> {
        Err(EvalError::Reference(root_name(path)))
    }
}

/// Scope over a plain object value. Writes go straight into the object.
///
/// Useful for hosts evaluating expressions outside a component.
pub struct ValueScope {
    data: RefCell<Value>,
}

impl ValueScope {
    /// Wrap an object value. Non-objects act as an empty scope.
    pub fn new(data: Value) -> Self {
        Self {
            data: RefCell::new(data),
        }
    }

    /// Snapshot of the current data.
    pub fn value(&self) -> Value {
        self.data.borrow().clone()
    }
}

impl Scope for ValueScope {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.data.borrow().as_object()?.get(name).cloned()
    }

    fn assign(&self, path: &[PathKey], value: Value) -> Result<(), EvalError> {
        let mut data = self.data.borrow_mut();
        let declared = match (&*data, path.first()) {
            (Value::Object(map), Some(PathKey::Key(root))) => map.contains_key(root),
            _ => false,
        };
        if !declared {
            return Err(EvalError::Reference(root_name(path)));
        }
        data.set_path(path, value)?;
        Ok(())
    }
}

pub(crate) fn root_name(path: &[PathKey]) -> String {
    path.first().map(|k| k.to_string()).unwrap_or_default()
}

// =============================================================================
// Literal parsing
// =============================================================================

/// Evaluate a constant object literal such as `{count: 0, tags: ['a']}`.
///
/// This is the loose syntax accepted by the state and props attributes:
/// unquoted keys, single quotes and trailing commas are all fine. Anything
/// that fails to parse or evaluate, or that is not an object, yields an
/// empty object and a warning.
pub fn parse_literal(source: &str) -> Value {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Value::object();
    }
    match Expression::compile(trimmed) {
        Ok(expr) => match expr.evaluate(&EmptyScope) {
            Ok(value @ Value::Object(_)) => value,
            Ok(other) => {
                tracing::warn!(source = %trimmed, found = other.type_of(), "literal is not an object");
                Value::object()
            }
            Err(error) => {
                tracing::warn!(source = %trimmed, %error, "cannot evaluate literal");
                Value::object()
            }
        },
        Err(error) => {
            tracing::warn!(source = %trimmed, %error, "cannot parse literal");
            Value::object()
        }
    }
}
