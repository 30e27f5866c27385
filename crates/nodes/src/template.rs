//! `{name}` template interpolation.
//!
//! Each executor that accepts user-facing text (e.g. `text_input`,
//! `text_operation`) calls [`interpolate`] itself rather than the engine
//! doing it centrally, so a node can decide when interpolation applies.

use std::collections::HashMap;

use serde_json::Value;

/// Replace every `{name}` (or dotted `{a.b}`) occurrence in `template` with
/// the stringified value from `context`. Unresolved placeholders are left
/// untouched rather than erroring — an unmatched `{brace}` in ordinary text
/// is legal input, not a failure.
pub fn interpolate(template: &str, context: &HashMap<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = chars[i..].iter().position(|c| *c == '}') {
                let end = i + end;
                let name: String = chars[i + 1..end].iter().collect();
                if is_valid_path(&name) {
                    match resolve(&name, context) {
                        Some(value) => {
                            out.push_str(&stringify(&value));
                            i = end + 1;
                            continue;
                        }
                        None => {
                            out.push_str(&chars[i..=end].iter().collect::<String>());
                            i = end + 1;
                            continue;
                        }
                    }
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn is_valid_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

fn resolve(path: &str, context: &HashMap<String, Value>) -> Option<Value> {
    let mut parts = path.split('.');
    let head = parts.next()?;
    let mut current = context.get(head)?.clone();
    for segment in parts {
        current = current.get(segment)?.clone();
    }
    Some(current)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn simple_substitution() {
        let c = ctx(&[("name", Value::String("ada".into()))]);
        assert_eq!(interpolate("hello {name}!", &c), "hello ada!");
    }

    #[test]
    fn dotted_path_substitution() {
        let c = ctx(&[("user", serde_json::json!({"email": "ada@example.com"}))]);
        assert_eq!(interpolate("contact: {user.email}", &c), "contact: ada@example.com");
    }

    #[test]
    fn unresolved_placeholder_is_left_intact() {
        let c = ctx(&[]);
        assert_eq!(interpolate("{missing} stays", &c), "{missing} stays");
    }

    #[test]
    fn number_is_stringified() {
        let c = ctx(&[("count", Value::from(3.0))]);
        assert_eq!(interpolate("total: {count}", &c), "total: 3.0");
    }
}
