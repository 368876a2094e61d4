//! Object key rewriting.
//!
//! Leading and trailing underscores are preserved by both conversions, so
//! `_privateKey_` becomes `_private_key_` and back.

/// Converts `camelCaseKeys` into `snake_case_keys`.
///
/// A word boundary is placed before an uppercase character that follows a
/// non-uppercase character, and before the last uppercase character of an
/// acronym that is followed by a lowercase one (`myURLValue` becomes
/// `my_url_value`).
pub fn to_snake_case(key: &str) -> String {
    let (leading, middle, trailing) = split_underscores(key);
    if middle.is_empty() {
        return key.to_string();
    }

    let chars: Vec<char> = middle.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    out.push_str(leading);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if !prev.is_uppercase() || next_is_lower {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out.push_str(trailing);
    out
}

/// Converts `snake_case_keys` into `camelCaseKeys`.
///
/// The first word is kept as is; every following word is capitalized with
/// the rest of its letters lowercased. Keys without an inner underscore are
/// returned unchanged.
pub fn from_snake_case(key: &str) -> String {
    let (leading, middle, trailing) = split_underscores(key);
    if !middle.contains('_') {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len());
    out.push_str(leading);
    for (i, word) in middle.split('_').enumerate() {
        if i == 0 {
            out.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out.push_str(trailing);
    out
}

fn split_underscores(key: &str) -> (&str, &str, &str) {
    let start = key.len() - key.trim_start_matches('_').len();
    if start == key.len() {
        return (key, "", "");
    }
    let end = key.trim_end_matches('_').len();
    (&key[..start], &key[start..end], &key[end..])
}
