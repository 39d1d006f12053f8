//! Tree-walking evaluator.
//!
//! Identifiers resolve through a [`Scope`]; nothing else is reachable, so a
//! markup expression can only read and write what its component exposes.

use super::ast::{AssignOp, BinaryOp, Expr, LogicalOp, UnaryOp};
use super::builtins;
use crate::error::EvalError;
use crate::types::{Map, PathKey, Value};

/// Variable environment for an expression.
///
/// `lookup` returning `None` means the name is not declared at all, which
/// raises a reference error (reading a declared key holding `undefined`
/// returns `Some(Value::Undefined)`).
pub trait Scope {
    /// Resolve a top-level identifier.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Write `value` at `path`; `path[0]` is the top-level identifier.
    fn assign(&self, path: &[PathKey], value: Value) -> Result<(), EvalError>;

    /// Call a named function. `None` means no function by that name.
    fn call(&self, _name: &str, _args: &[Value]) -> Option<Result<Value, EvalError>> {
        None
    }

    /// Call `name` on the value at `path` before the builtin methods are
    /// tried. `None` falls through to them.
    fn call_member(&self, _path: &[PathKey], _name: &str, _args: &[Value]) -> Option<Result<Value, EvalError>> {
        None
    }
}

/// Evaluate `expr` against `scope`.
pub fn evaluate(expr: &Expr, scope: &dyn Scope) -> Result<Value, EvalError> {
    Evaluator { scope }.eval(expr)
}

struct Evaluator<'a> {
    scope: &'a dyn Scope,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Ident(name) => self
                .scope
                .lookup(name)
                .ok_or_else(|| EvalError::Reference(name.clone())),

            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            Expr::Object(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Ok(Value::Object(map))
            }

            Expr::Member { object, property } => {
                let target = self.eval(object)?;
                read_member(&target, &PathKey::Key(property.clone()))
            }

            Expr::Index { object, index } => {
                let target = self.eval(object)?;
                let key = PathKey::from_value(&self.eval(index)?);
                read_member(&target, &key)
            }

            Expr::Call { callee, args } => self.call(callee, args),

            Expr::Unary { op, operand } => self.unary(*op, operand),

            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let path = self.path_of(target)?;
                let old = self.read_path(&path)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.scope.assign(&path, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }

            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right))
            }

            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }

            Expr::Assign { op, target, value } => {
                let path = self.path_of(target)?;
                let value = match op.binary() {
                    Some(bin) => {
                        let current = self.read_path(&path)?;
                        binary(bin, &current, &self.eval(value)?)
                    }
                    None => self.eval(value)?,
                };
                self.scope.assign(&path, value.clone())?;
                Ok(value)
            }

            Expr::Sequence(items) => {
                let mut last = Value::Undefined;
                for item in items {
                    last = self.eval(item)?;
                }
                Ok(last)
            }
        }
    }

    fn unary(&self, op: UnaryOp, operand: &Expr) -> Result<Value, EvalError> {
        if op == UnaryOp::TypeOf {
            // typeof on an undeclared name is the one read that does not throw
            if let Some(name) = operand.as_ident() {
                return Ok(Value::from(
                    self.scope.lookup(name).map(|v| v.type_of()).unwrap_or("undefined"),
                ));
            }
        }
        let value = self.eval(operand)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.is_truthy()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::TypeOf => Value::from(value.type_of()),
            UnaryOp::Void => Value::Undefined,
        })
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        let eval_args = || {
            args.iter()
                .map(|arg| self.eval(arg))
                .collect::<Result<Vec<_>, _>>()
        };

        match callee {
            Expr::Ident(name) => {
                let args = eval_args()?;
                if let Some(result) = self.scope.call(name, &args) {
                    return result;
                }
                if self.scope.lookup(name).is_some() {
                    return Err(EvalError::NotCallable(name.clone()));
                }
                builtins::call_global(name, &args)
                    .unwrap_or_else(|| Err(EvalError::Reference(name.clone())))
            }
            Expr::Member { object, property } => {
                // Resolve the receiver once; its path doubles as the
                // write-back location for mutating methods.
                let path = match self.path_of(object) {
                    Ok(path) => Some(path),
                    Err(EvalError::NotAssignable) => None,
                    Err(error) => return Err(error),
                };
                let args = eval_args()?;
                if let Some(path) = &path {
                    if let Some(result) = self.scope.call_member(path, property, &args) {
                        return result;
                    }
                }
                let target = match &path {
                    Some(path) => self.read_path(path)?,
                    None => self.eval(object)?,
                };
                if target.is_nullish() {
                    return Err(read_error(&target, property));
                }
                let Some(outcome) = builtins::call_method(&target, property, &args) else {
                    return Err(EvalError::NotCallable(format!("{}.{}", target.type_of(), property)));
                };
                let outcome = outcome?;
                if let Some(updated) = outcome.updated {
                    // Mutating methods write back through the scope so state
                    // sees the change. Temporaries (`[1].push(2)`) have no home.
                    if let Some(path) = &path {
                        self.scope.assign(path, updated)?;
                    }
                }
                Ok(outcome.value)
            }
            other => Err(EvalError::NotCallable(describe(other))),
        }
    }

    /// Read the value at a resolved path without evaluating anything again.
    fn read_path(&self, path: &[PathKey]) -> Result<Value, EvalError> {
        let Some((PathKey::Key(root), rest)) = path.split_first() else {
            return Err(EvalError::NotAssignable);
        };
        let mut value = self
            .scope
            .lookup(root)
            .ok_or_else(|| EvalError::Reference(root.clone()))?;
        for key in rest {
            value = read_member(&value, key)?;
        }
        Ok(value)
    }

    /// Resolve an assignable expression to a state path.
    fn path_of(&self, expr: &Expr) -> Result<Vec<PathKey>, EvalError> {
        match expr {
            Expr::Ident(name) => Ok(vec![PathKey::Key(name.clone())]),
            Expr::Member { object, property } => {
                let mut path = self.path_of(object)?;
                path.push(PathKey::Key(property.clone()));
                Ok(path)
            }
            Expr::Index { object, index } => {
                let mut path = self.path_of(object)?;
                path.push(PathKey::from_value(&self.eval(index)?));
                Ok(path)
            }
            _ => Err(EvalError::NotAssignable),
        }
    }
}

fn read_member(target: &Value, key: &PathKey) -> Result<Value, EvalError> {
    if target.is_nullish() {
        return Err(read_error(target, &key.to_string()));
    }
    Ok(target.get(key))
}

fn read_error(target: &Value, property: &str) -> EvalError {
    EvalError::Type(format!(
        "cannot read properties of {} (reading '{}')",
        target, property
    ))
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Literal(value) => value.to_string(),
        _ => "expression".to_string(),
    }
}

/// Apply a binary operator with script coercions.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let stringy = |v: &Value| matches!(v, Value::String(_)) || v.is_container();
            if stringy(left) || stringy(right) {
                Value::String(format!("{}{}", left, right))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Value::Bool(compare(op, left, right))
        }
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (left.to_number(), right.to_number());
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;
    use crate::expr::ValueScope;

    fn scope() -> ValueScope {
        ValueScope::new(Value::from_pairs([
            ("count", Value::from(0)),
            ("name", Value::from("nik")),
            ("flag", Value::from(true)),
            ("items", Value::from(vec!["a", "b"])),
            ("user", Value::from_pairs([("age", 30)])),
        ]))
    }

    fn eval(source: &str, scope: &ValueScope) -> Result<Value, EvalError> {
        evaluate(&parse(source).unwrap(), scope)
    }

    #[test]
    fn test_identifiers_resolve_to_scope() {
        let s = scope();
        assert_eq!(eval("count", &s), Ok(Value::from(0)));
        assert_eq!(eval("user.age + 1", &s), Ok(Value::from(31)));
        assert_eq!(eval("items[1]", &s), Ok(Value::from("b")));
        assert_eq!(eval("items.length", &s), Ok(Value::from(2)));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        let s = scope();
        assert_eq!(eval("flag && 'bar'", &s), Ok(Value::from("bar")));
        assert_eq!(eval("!flag && 'bar'", &s), Ok(Value::from(false)));
        assert_eq!(eval("count || 'zero'", &s), Ok(Value::from("zero")));
        assert_eq!(eval("null ?? 'fallback'", &s), Ok(Value::from("fallback")));
        assert_eq!(eval("count ?? 5", &s), Ok(Value::from(0)));
    }

    #[test]
    fn test_update_and_assignment_write_through() {
        let s = scope();
        assert_eq!(eval("count++", &s), Ok(Value::from(0)));
        assert_eq!(eval("count", &s), Ok(Value::from(1)));
        assert_eq!(eval("++count", &s), Ok(Value::from(2)));
        assert_eq!(eval("count += 3", &s), Ok(Value::from(5)));
        assert_eq!(eval("user.age = 31; user.age", &s), Ok(Value::from(31)));
    }

    #[test]
    fn test_mutating_method_writes_back() {
        let s = scope();
        assert_eq!(eval("items.push('c')", &s), Ok(Value::from(3)));
        assert_eq!(eval("items.join('-')", &s), Ok(Value::from("a-b-c")));
        assert_eq!(eval("items.pop()", &s), Ok(Value::from("c")));
        assert_eq!(eval("items.length", &s), Ok(Value::from(2)));
    }

    #[test]
    fn test_reference_error_for_undeclared() {
        let s = scope();
        assert_eq!(eval("missing", &s), Err(EvalError::Reference("missing".into())));
        assert_eq!(eval("missing = 1", &s), Err(EvalError::Reference("missing".into())));
        assert_eq!(eval("typeof missing", &s), Ok(Value::from("undefined")));
    }

    #[test]
    fn test_reading_through_nullish_is_type_error() {
        let s = scope();
        assert!(matches!(eval("user.address.city", &s), Err(EvalError::Type(_))));
        assert_eq!(eval("user.address", &s), Ok(Value::Undefined));
    }

    #[test]
    fn test_string_concatenation_and_comparison() {
        let s = scope();
        assert_eq!(eval("'hi ' + name", &s), Ok(Value::from("hi nik")));
        assert_eq!(eval("count + 1 + '!'", &s), Ok(Value::from("1!")));
        assert_eq!(eval("'b' > 'a'", &s), Ok(Value::from(true)));
        assert_eq!(eval("count === 0 ? 'none' : 'some'", &s), Ok(Value::from("none")));
        assert_eq!(eval("'1' == 1", &s), Ok(Value::from(true)));
        assert_eq!(eval("'1' === 1", &s), Ok(Value::from(false)));
    }

    #[test]
    fn test_void_and_calls() {
        let s = scope();
        assert_eq!(eval("void 0", &s), Ok(Value::Undefined));
        assert_eq!(eval("name.toUpperCase()", &s), Ok(Value::from("NIK")));
        assert_eq!(eval("String(count)", &s), Ok(Value::from("0")));
        assert_eq!(eval("count()", &s), Err(EvalError::NotCallable("count".into())));
        assert_eq!(eval("nope()", &s), Err(EvalError::Reference("nope".into())));
    }

    #[test]
    fn test_index_is_evaluated_once() {
        let s = ValueScope::new(Value::from_pairs([
            ("i", Value::from(0)),
            ("nums", Value::from(vec![10, 20, 30])),
        ]));
        assert_eq!(eval("nums[i++] += 1", &s), Ok(Value::from(11)));
        assert_eq!(eval("nums[i++]++", &s), Ok(Value::from(20)));
        assert_eq!(eval("nums[i++].toString()", &s), Ok(Value::from("30")));
        assert_eq!(eval("i", &s), Ok(Value::from(3)));
        assert_eq!(eval("nums", &s), Ok(Value::from(vec![11, 21, 30])));

        let lists = ValueScope::new(Value::from_pairs([
            ("j", Value::from(0)),
            ("rows", Value::Array(vec![Value::from(vec![1]), Value::from(vec![2])])),
        ]));
        assert_eq!(eval("rows[j++].push(9)", &lists), Ok(Value::from(2)));
        assert_eq!(eval("j", &lists), Ok(Value::from(1)));
        assert_eq!(eval("rows[0]", &lists), Ok(Value::from(vec![1, 9])));
        assert_eq!(eval("rows[1]", &lists), Ok(Value::from(vec![2])));
    }

    struct Recorder {
        inner: ValueScope,
        calls: std::cell::RefCell<Vec<String>>,
    }

    impl Scope for Recorder {
        fn lookup(&self, name: &str) -> Option<Value> {
            self.inner.lookup(name)
        }

        fn assign(&self, path: &[PathKey], value: Value) -> Result<(), EvalError> {
            self.inner.assign(path, value)
        }

        fn call_member(&self, path: &[PathKey], name: &str, _args: &[Value]) -> Option<Result<Value, EvalError>> {
            if path != [PathKey::Key("host".into())] || name != "ping" {
                return None;
            }
            self.calls.borrow_mut().push(name.to_string());
            Some(Ok(Value::from("pong")))
        }
    }

    #[test]
    fn test_scope_member_calls_take_precedence() {
        let s = Recorder {
            inner: scope(),
            calls: Default::default(),
        };
        assert_eq!(evaluate(&parse("host.ping()").unwrap(), &s), Ok(Value::from("pong")));
        assert_eq!(evaluate(&parse("name.toUpperCase()").unwrap(), &s), Ok(Value::from("NIK")));
        assert_eq!(*s.calls.borrow(), vec!["ping".to_string()]);
    }
}
