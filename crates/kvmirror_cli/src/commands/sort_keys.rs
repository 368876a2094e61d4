//! Sort-keys command implementation.

use crate::Format;
use kvmirror_storage::{sort_tree_keys, try_int_key};
use serde::Serialize;

/// A key annotated with how the tree store classifies it.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SortedKey {
    /// The key as given.
    pub key: String,
    /// Integer value when the key sorts numerically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int: Option<i64>,
}

/// Sorts `keys` in tree-store order.
pub fn sort(mut keys: Vec<String>) -> Vec<SortedKey> {
    sort_tree_keys(&mut keys);
    keys.into_iter()
        .map(|key| SortedKey {
            int: try_int_key(&key),
            key,
        })
        .collect()
}

/// Renders sorted keys in the requested format.
pub fn render(keys: &[SortedKey], format: Format) -> Result<String, serde_json::Error> {
    match format {
        Format::Json => serde_json::to_string_pretty(keys),
        Format::Text => Ok(keys
            .iter()
            .map(|sorted| sorted.key.as_str())
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Runs the sort-keys command.
pub fn run(keys: Vec<String>, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render(&sort(keys), format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn integers_first_then_strings() {
        let sorted = sort(keys(&["b", "10", "007", "2", "a"]));
        let order: Vec<&str> = sorted.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(order, vec!["2", "007", "10", "a", "b"]);
        assert_eq!(sorted[1].int, Some(7));
        assert_eq!(sorted[3].int, None);
    }

    #[test]
    fn text_output_is_one_key_per_line() {
        let out = render(&sort(keys(&["10", "2"])), Format::Text).unwrap();
        assert_eq!(out, "2\n10");
    }

    #[test]
    fn json_output_omits_int_for_strings() {
        let out = render(&sort(keys(&["x", "1"])), Format::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([{"key": "1", "int": 1}, {"key": "x"}])
        );
    }
}
