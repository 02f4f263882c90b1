//! Output comparison and capture helpers

/// Truncate a string to at most `max_bytes`, respecting char boundaries
pub fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Outputs match when byte-equal after trailing-whitespace removal
pub fn outputs_match(expected: &str, actual: &str) -> bool {
    expected.trim_end() == actual.trim_end()
}

/// Bounded unified-style diff between expected and actual output
pub fn bounded_diff(expected: &str, actual: &str, max_lines: usize) -> String {
    let expected_lines: Vec<&str> = expected.trim_end().lines().collect();
    let actual_lines: Vec<&str> = actual.trim_end().lines().collect();

    let mut lines = vec!["--- expected".to_string(), "+++ actual".to_string()];
    let total = expected_lines.len().max(actual_lines.len());

    for index in 0..total {
        let expected_line = expected_lines.get(index);
        let actual_line = actual_lines.get(index);
        if expected_line == actual_line {
            continue;
        }
        if lines.len() + 2 > max_lines {
            lines.push(format!("... ({} more lines)", total - index));
            break;
        }
        if let Some(line) = expected_line {
            lines.push(format!("-{line}"));
        }
        if let Some(line) = actual_line {
            lines.push(format!("+{line}"));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate_utf8("hello", 10), "hello");
        assert_eq!(truncate_utf8("hello", 3), "hel");
        // Never split a multi-byte char
        assert_eq!(truncate_utf8("héllo", 2), "h");
    }

    #[test]
    fn test_outputs_match_ignores_trailing_whitespace() {
        assert!(outputs_match("42\n", "42"));
        assert!(outputs_match("42", "42  \n\n"));
        assert!(!outputs_match("42", "43"));
        // Leading whitespace is significant
        assert!(!outputs_match(" 42", "42"));
    }

    #[test]
    fn test_bounded_diff_marks_mismatches() {
        let diff = bounded_diff("1\n2\n3", "1\n5\n3", 50);
        assert!(diff.contains("--- expected"));
        assert!(diff.contains("-2"));
        assert!(diff.contains("+5"));
        assert!(!diff.contains("-1"));
    }

    #[test]
    fn test_bounded_diff_is_bounded() {
        let expected: String = (0..200).map(|i| format!("{i}\n")).collect();
        let actual: String = (0..200).map(|i| format!("{}\n", i + 1)).collect();
        let diff = bounded_diff(&expected, &actual, 50);
        assert!(diff.lines().count() <= 51);
        assert!(diff.contains("more lines"));
    }
}
