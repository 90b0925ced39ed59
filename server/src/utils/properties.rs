//! `.properties` text parsing
//!
//! Covers the line syntax metadata sidecars emit: `#`/`!` comments, blank
//! lines and `key=value`, `key:value` or `key value` pairs. Line
//! continuations and unicode escapes are not supported.

use std::collections::HashMap;

/// Parse properties text into a key/value map. Later keys win.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = split_pair(line);
        if !key.is_empty() {
            props.insert(key.to_string(), value.to_string());
        }
    }
    props
}

fn split_pair(line: &str) -> (&str, &str) {
    match line.find(['=', ':', ' ', '\t']) {
        Some(idx) => {
            let key = line[..idx].trim_end();
            let mut rest = line[idx..].trim_start();
            // `key = value` puts whitespace before the separator
            if let Some(stripped) = rest.strip_prefix(['=', ':']) {
                rest = stripped.trim_start();
            }
            (key, rest)
        }
        None => (line, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_separators() {
        let props = parse_properties("a=1\nb:2\nc 3\nd = 4\ne\t:\t5\n");
        assert_eq!(props.get("a").map(String::as_str), Some("1"));
        assert_eq!(props.get("b").map(String::as_str), Some("2"));
        assert_eq!(props.get("c").map(String::as_str), Some("3"));
        assert_eq!(props.get("d").map(String::as_str), Some("4"));
        assert_eq!(props.get("e").map(String::as_str), Some("5"));
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "# generated\n\n! legacy\n  MY_POD_NAME=pod1  \n";
        let props = parse_properties(text);
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("MY_POD_NAME").map(String::as_str), Some("pod1"));
    }

    #[test]
    fn test_parse_key_without_value() {
        let props = parse_properties("flag\n");
        assert_eq!(props.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn test_value_keeps_inner_separators() {
        let props = parse_properties("url=http://10.0.0.5:9411/podinfo\n");
        assert_eq!(
            props.get("url").map(String::as_str),
            Some("http://10.0.0.5:9411/podinfo")
        );
    }
}
