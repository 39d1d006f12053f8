//! Class token combinator.
//!
//! Turns a `:class` value into `(token, enabled)` pairs:
//!
//! ```text
//! 'a b'                    → (a, on) (b, on)
//! {active: x, hidden: y}   → (active, x?) (hidden, y?)
//! [cond && 'c', 'd e']     → truthy items only, each split on whitespace
//! ```

use crate::types::Value;

fn tokenize(text: &str, enabled: bool, out: &mut Vec<(String, bool)>) {
    out.extend(text.split_whitespace().map(|token| (token.to_string(), enabled)));
}

/// Normalize a class value into ordered `(token, enabled)` pairs.
pub fn class_tokens(value: &Value) -> Vec<(String, bool)> {
    let mut out = Vec::new();
    match value {
        Value::String(text) => tokenize(text, true, &mut out),
        Value::Object(map) => {
            for (name, enabled) in map {
                // Keys may themselves hold several tokens ({'a b': true}).
                tokenize(name, enabled.is_truthy(), &mut out);
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter(|item| item.is_truthy()) {
                match item {
                    Value::String(text) => tokenize(text, true, &mut out),
                    other => out.extend(class_tokens(other)),
                }
            }
        }
        // Numbers and booleans contribute nothing, as do nullish values.
        _ => {}
    }
    out
}

/// Final class list: `base` tokens, then `value`'s tokens applied in order.
///
/// Enabled tokens are appended once; disabled tokens are removed, even when
/// they came from `base`.
pub fn combine(base: &[String], value: &Value) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();
    let toggles = base
        .iter()
        .map(|token| (token.clone(), true))
        .chain(class_tokens(value));
    for (token, enabled) in toggles {
        let present = classes.iter().position(|existing| *existing == token);
        match (enabled, present) {
            (true, None) => classes.push(token),
            (false, Some(index)) => {
                classes.remove(index);
            }
            _ => {}
        }
    }
    classes
}
