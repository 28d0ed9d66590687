//! Reply parsing
//!
//! The model is asked for a numbered list but may answer with a JSON object, a JSON
//! array or free text. Each shape is a pure attempt from text to an optional list;
//! the first attempt that recognises its shape wins.

use serde_json::Value;

type Attempt = fn(&str) -> Option<Vec<String>>;

const ATTEMPTS: [Attempt; 3] = [parse_object, parse_array, parse_lines];

/// Turns the assistant's reply into an ordered list of subtask names
pub fn parse_reply(text: &str) -> Vec<String> {
    ATTEMPTS
        .iter()
        .find_map(|attempt| attempt(text))
        .unwrap_or_default()
}

/// `{"subtasks": [...]}`
fn parse_object(text: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => match map.get("subtasks")? {
            Value::Array(items) => Some(coerce(items)),
            _ => None,
        },
        _ => None,
    }
}

/// `[...]`
fn parse_array(text: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(items) => Some(coerce(&items)),
        _ => None,
    }
}

/// One subtask per line, enumeration markers stripped
fn parse_lines(text: &str) -> Option<Vec<String>> {
    let names = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| strip_marker(line.trim_start_matches('・').trim_start()))
        .filter(|name| !name.is_empty() && !name.starts_with(is_structural))
        .map(str::to_string)
        .collect();
    Some(names)
}

fn coerce(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|name| !name.is_empty())
        .collect()
}

fn is_structural(c: char) -> bool {
    matches!(c, '{' | '}' | '[' | ']')
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

fn is_circled_digit(c: char) -> bool {
    ('①'..='⑳').contains(&c)
}

fn is_terminator(c: char) -> bool {
    c == '.' || c == ')' || c == '．' || c == '）'
}

/// Strips `12.`, `3)` or `④` plus following whitespace. Bare leading digits are kept.
fn strip_marker(line: &str) -> &str {
    let digits_end = line.find(|c: char| !is_digit(c)).unwrap_or(line.len());
    if digits_end > 0 {
        return match line[digits_end..].strip_prefix(is_terminator) {
            Some(rest) => rest.trim_start(),
            None => line,
        };
    }

    let mut chars = line.chars();
    match chars.next() {
        Some(c) if is_circled_digit(c) => {
            let rest = chars.as_str();
            rest.strip_prefix(is_terminator).unwrap_or(rest).trim_start()
        }
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_object_shape() {
        let reply = r#"{"subtasks": ["Buy milk", " ", "Call Bob"]}"#;

        assert_eq!(parse_reply(reply), vec!["Buy milk", "Call Bob"]);
    }

    #[test]
    fn test_object_shape_coerces_non_strings() {
        let reply = r#"{"subtasks": ["  Step one ", 2, null, ""]}"#;

        assert_eq!(parse_reply(reply), vec!["Step one", "2"]);
    }

    #[test]
    fn test_array_shape() {
        let reply = r#"["資料を集める", "", "下書きを書く"]"#;

        assert_eq!(parse_reply(reply), vec!["資料を集める", "下書きを書く"]);
    }

    #[test]
    fn test_array_shape_coerces_non_strings() {
        assert_eq!(parse_reply(r#"[" 買う ", 3, true, null]"#), vec!["買う", "3", "true"]);
    }

    #[test]
    fn test_line_fallback() {
        let reply = "1. Draft outline\n2) Review\n③ Submit\n";

        assert_eq!(parse_reply(reply), vec!["Draft outline", "Review", "Submit"]);
    }

    #[test]
    fn test_object_without_subtasks_falls_back_to_lines() {
        let reply = r#"{"steps": ["a", "b"]}"#;

        // the single line is a brace fragment and is dropped
        assert!(parse_reply(reply).is_empty());
    }

    #[test]
    fn test_line_fallback_drops_structural_fragments() {
        let reply = "Here you go:\n{\n  1. Plan\n}\n[\n2. Do\n]";

        assert_eq!(parse_reply(reply), vec!["Here you go:", "Plan", "Do"]);
    }

    #[test]
    fn test_line_fallback_markers() {
        let reply = "・1. 買い物リストを作る\n１．店に行く\n⑳ Pay\n10)   Go home\n2024 budget review\n";

        assert_eq!(
            parse_reply(reply),
            vec![
                "買い物リストを作る",
                "店に行く",
                "Pay",
                "Go home",
                "2024 budget review"
            ]
        );
    }

    #[test]
    fn test_marker_only_lines_are_skipped() {
        assert_eq!(parse_reply("1.\n2) \n③\nReal"), vec!["Real"]);
    }

    #[test]
    fn test_empty_reply() {
        assert!(parse_reply("").is_empty());
        assert!(parse_reply("\n  \n").is_empty());
    }
}
