//! Built-in methods and global functions available to expressions.

use crate::error::EvalError;
use crate::types::{Value, format_number, parse_number};

/// Result of a method call.
///
/// `updated` carries the new receiver for mutating methods (`push`, `pop`);
/// the evaluator writes it back through the scope.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodOutcome {
    pub value: Value,
    pub updated: Option<Value>,
}

impl MethodOutcome {
    fn pure(value: Value) -> Self {
        Self {
            value,
            updated: None,
        }
    }
}

/// Call `name` on `target`. `None` if no such method exists.
pub fn call_method(
    target: &Value,
    name: &str,
    args: &[Value],
) -> Option<Result<MethodOutcome, EvalError>> {
    if name == "toString" {
        return Some(Ok(MethodOutcome::pure(Value::String(target.to_string()))));
    }
    match target {
        Value::Array(items) => array_method(items, name, args).map(Ok),
        Value::String(s) => string_method(s, name, args).map(Ok),
        Value::Number(n) => number_method(*n, name, args),
        _ => None,
    }
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Resolve a possibly negative `slice` bound against `len`.
fn bound(value: &Value, len: usize, default: usize) -> usize {
    if value.is_nullish() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

fn array_method(items: &[Value], name: &str, args: &[Value]) -> Option<MethodOutcome> {
    let outcome = match name {
        "push" => {
            let mut next = items.to_vec();
            next.extend(args.iter().cloned());
            MethodOutcome {
                value: Value::from(next.len()),
                updated: Some(Value::Array(next)),
            }
        }
        "pop" => {
            let mut next = items.to_vec();
            let popped = next.pop().unwrap_or_default();
            MethodOutcome {
                value: popped,
                updated: Some(Value::Array(next)),
            }
        }
        "shift" => {
            let mut next = items.to_vec();
            let first = if next.is_empty() {
                Value::Undefined
            } else {
                next.remove(0)
            };
            MethodOutcome {
                value: first,
                updated: Some(Value::Array(next)),
            }
        }
        "includes" => {
            let needle = arg(args, 0);
            let found = items
                .iter()
                .any(|item| item.strict_eq(&needle) || (is_nan(item) && is_nan(&needle)));
            MethodOutcome::pure(Value::Bool(found))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let index = items
                .iter()
                .position(|item| item.strict_eq(&needle))
                .map(|i| i as f64)
                .unwrap_or(-1.0);
            MethodOutcome::pure(Value::Number(index))
        }
        "join" => {
            let separator = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.to_string(),
            };
            let joined = items
                .iter()
                .map(|item| if item.is_nullish() { String::new() } else { item.to_string() })
                .collect::<Vec<_>>()
                .join(&separator);
            MethodOutcome::pure(Value::String(joined))
        }
        "slice" => {
            let start = bound(&arg(args, 0), items.len(), 0);
            let end = bound(&arg(args, 1), items.len(), items.len());
            let slice = if start < end { items[start..end].to_vec() } else { Vec::new() };
            MethodOutcome::pure(Value::Array(slice))
        }
        "concat" => {
            let mut next = items.to_vec();
            for value in args {
                match value {
                    Value::Array(more) => next.extend(more.iter().cloned()),
                    other => next.push(other.clone()),
                }
            }
            MethodOutcome::pure(Value::Array(next))
        }
        _ => return None,
    };
    Some(outcome)
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Option<MethodOutcome> {
    let chars: Vec<char> = s.chars().collect();
    let value = match name {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "includes" => Value::Bool(s.contains(&arg(args, 0).to_string())),
        "startsWith" => Value::Bool(s.starts_with(&arg(args, 0).to_string())),
        "endsWith" => Value::Bool(s.ends_with(&arg(args, 0).to_string())),
        "indexOf" => {
            let needle = arg(args, 0).to_string();
            let index = s
                .find(&needle)
                .map(|byte| s[..byte].chars().count() as f64)
                .unwrap_or(-1.0);
            Value::Number(index)
        }
        "slice" => {
            let start = bound(&arg(args, 0), chars.len(), 0);
            let end = bound(&arg(args, 1), chars.len(), chars.len());
            let slice: String = if start < end {
                chars[start..end].iter().collect()
            } else {
                String::new()
            };
            Value::String(slice)
        }
        "split" => match arg(args, 0) {
            Value::Undefined => Value::from(vec![s.to_string()]),
            separator => {
                let separator = separator.to_string();
                if separator.is_empty() {
                    Value::Array(chars.iter().map(|c| Value::String(c.to_string())).collect())
                } else {
                    Value::Array(s.split(separator.as_str()).map(Value::from).collect())
                }
            }
        },
        _ => return None,
    };
    Some(MethodOutcome::pure(value))
}

fn number_method(n: f64, name: &str, args: &[Value]) -> Option<Result<MethodOutcome, EvalError>> {
    match name {
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits };
            if !(0.0..=100.0).contains(&digits) {
                return Some(Err(EvalError::Type(
                    "toFixed() digits argument must be between 0 and 100".to_string(),
                )));
            }
            let text = if n.is_finite() {
                format!("{:.*}", digits as usize, n)
            } else {
                format_number(n)
            };
            Some(Ok(MethodOutcome::pure(Value::String(text))))
        }
        _ => None,
    }
}

fn is_nan(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_nan())
}

/// Global conversion functions (`String(x)`, `Number(x)`, `Boolean(x)`,
/// `parseInt`, `parseFloat`). `None` if `name` is not one of them.
pub fn call_global(name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
    let first = arg(args, 0);
    let value = match name {
        "String" => Value::String(if args.is_empty() { String::new() } else { first.to_string() }),
        "Number" => Value::Number(if args.is_empty() { 0.0 } else { first.to_number() }),
        "Boolean" => Value::Bool(first.is_truthy()),
        "parseFloat" => Value::Number(leading_number(&first.to_string(), true)),
        "parseInt" => Value::Number(leading_number(&first.to_string(), false)),
        "isNaN" => Value::Bool(first.to_number().is_nan()),
        _ => return None,
    };
    Some(Ok(value))
}

/// Parse the longest numeric prefix, as `parseFloat`/`parseInt` do.
fn leading_number(raw: &str, allow_fraction: bool) -> f64 {
    let s = raw.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        if c.is_ascii_digit() {
            seen_digit = true;
            end = i + 1;
        } else if (c == '-' || c == '+') && i == 0 {
            end = i + 1;
        } else if c == '.' && allow_fraction && !seen_dot {
            seen_dot = true;
            end = i + 1;
        } else {
            break;
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    let n = parse_number(s[..end].trim_end_matches('.'));
    if allow_fraction { n } else { n.trunc() }
}
