//! `$name` placeholder substitution for call definitions.

use regex::{Captures, Regex};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Placeholder values keyed by name (without the leading `$`).
///
/// Ordered so that every derived artifact (substitution pattern, cache key)
/// is identical for identical mappings.
pub type Placeholders = BTreeMap<String, Value>;

/// String form of a placeholder value. `null` substitutes as the empty string
/// and strings substitute without JSON quotes.
pub fn placeholder_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// A compiled substitution for one placeholder mapping.
///
/// All names are matched in a single left-to-right pass, longest name first,
/// so `$price-new` is never clobbered by `$price` and substituted values are
/// never rescanned.
#[derive(Debug, Clone)]
pub struct Substitution {
    pattern: Option<Regex>,
    values: HashMap<String, String>,
}

impl Substitution {
    /// Compile a substitution for the given mapping.
    pub fn new(placeholders: &Placeholders) -> Result<Self, regex::Error> {
        let mut names: Vec<&str> = placeholders
            .keys()
            .map(String::as_str)
            .filter(|name| !name.is_empty())
            .collect();

        if names.is_empty() {
            return Ok(Self::empty());
        }

        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\$({alternation})"))?;

        let values = placeholders
            .iter()
            .map(|(name, value)| (name.clone(), placeholder_text(value).into_owned()))
            .collect();

        Ok(Self {
            pattern: Some(pattern),
            values,
        })
    }

    /// A substitution that leaves text untouched.
    pub fn empty() -> Self {
        Self {
            pattern: None,
            values: HashMap::new(),
        }
    }

    /// Replace every declared `$name` occurrence in `text`.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, |caps: &Captures<'_>| {
                self.values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_default()
            }),
            None => Cow::Borrowed(text),
        }
    }
}

/// One-shot substitution of `placeholders` into `text`.
pub fn substitute(text: &str, placeholders: &Placeholders) -> Result<String, regex::Error> {
    Ok(Substitution::new(placeholders)?.apply(text).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> Placeholders {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_substitutes_values() {
        let p = params(&[("new-price-param", json!(99)), ("name", json!("bob"))]);
        let out = substitute(r#"{"newPrice":$new-price-param,"who":"$name"}"#, &p).unwrap();
        assert_eq!(out, r#"{"newPrice":99,"who":"bob"}"#);
    }

    #[test]
    fn test_null_becomes_empty() {
        let p = params(&[("token", Value::Null)]);
        assert_eq!(substitute("Bearer $token", &p).unwrap(), "Bearer ");
    }

    #[test]
    fn test_undeclared_dollar_is_untouched() {
        let p = params(&[("a", json!(1))]);
        assert_eq!(substitute("cost: $5 and $b, $a", &p).unwrap(), "cost: $5 and $b, 1");
    }

    #[test]
    fn test_longest_name_wins() {
        let p = params(&[("price", json!(1)), ("price-new", json!(2))]);
        assert_eq!(substitute("$price-new/$price", &p).unwrap(), "2/1");
    }

    #[test]
    fn test_no_matching_keys_is_identity() {
        let p = params(&[("missing", json!("x"))]);
        let text = "GET /items?page=$page";
        assert_eq!(substitute(text, &p).unwrap(), text);
        assert_eq!(substitute(text, &Placeholders::new()).unwrap(), text);
    }

    #[test]
    fn test_substitution_is_idempotent() {
        let p = params(&[("id", json!(42)), ("user", json!("ann"))]);
        let once = substitute("/users/$user/items/$id", &p).unwrap();
        let twice = substitute(&once, &p).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let p = params(&[("a", json!("$b")), ("b", json!("x"))]);
        assert_eq!(substitute("$a", &p).unwrap(), "$b");
    }

    #[test]
    fn test_regex_metacharacters_in_names() {
        let p = params(&[("a.b", json!("dot"))]);
        assert_eq!(substitute("$a.b $aXb", &p).unwrap(), "dot $aXb");
    }
}
