//! Multi-statement scripts with `GO` batch separators.

use std::sync::OnceLock;

use regex::Regex;

fn go_line() -> &'static Regex {
    static GO_LINE: OnceLock<Regex> = OnceLock::new();
    GO_LINE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*GO[ \t]*;?[ \t]*\r?$").expect("invalid built-in GO regex")
    })
}

/// Whether the script contains at least one `GO` line.
pub fn has_batches(script: &str) -> bool {
    go_line().is_match(script)
}

/// Split a script on lines consisting solely of `GO` (case-insensitive).
///
/// Batches are trimmed; empty batches are dropped.
pub fn split_batches(script: &str) -> Vec<String> {
    go_line()
        .split(script)
        .map(str::trim)
        .filter(|batch| !batch.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_go_lines() {
        let script = "CREATE TABLE A (ID int)\nGO\nCREATE TABLE B (ID int)\ngo;\n\nGO\nDROP TABLE C";
        assert_eq!(
            split_batches(script),
            [
                "CREATE TABLE A (ID int)",
                "CREATE TABLE B (ID int)",
                "DROP TABLE C"
            ]
        );
    }

    #[test]
    fn go_inside_a_line_is_not_a_separator() {
        let script = "SELECT 'GO' AS Word\nUPDATE T SET Name = 'GOGO'";
        assert!(!has_batches(script));
        assert_eq!(split_batches(script).len(), 1);
    }

    #[test]
    fn windows_line_endings() {
        let script = "SELECT 1\r\nGO\r\nSELECT 2";
        assert_eq!(split_batches(script), ["SELECT 1", "SELECT 2"]);
    }
}
