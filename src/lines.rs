//! Line normalization ahead of call parsing.
//!
//! Blank lines separate the sections of a call definition, so comments must
//! disappear without leaving extra separators behind.

use crate::placeholder::Substitution;

/// Whether a line carries no content.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Drop `#` comments, substitute placeholders, and collapse blank-line runs.
///
/// The output never starts with a blank line and never holds two blank lines
/// in a row. Blank lines are emitted as empty strings.
pub fn normalize_lines<I, S>(lines: I, substitution: &Substitution) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut prepared = Vec::new();
    let mut last_blank = true;

    for line in lines {
        let line = line.as_ref();
        if line.starts_with('#') {
            continue;
        }

        let line = substitution.apply(line);
        let blank = is_blank(&line);
        if blank {
            if !last_blank {
                prepared.push(String::new());
            }
        } else {
            prepared.push(line.into_owned());
        }
        last_blank = blank;
    }

    prepared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::Placeholders;
    use serde_json::json;

    fn normalize(lines: &[&str]) -> Vec<String> {
        normalize_lines(lines.iter(), &Substitution::empty())
    }

    #[test]
    fn test_drops_comments() {
        let out = normalize(&["# header comment", "GET /a", "#Host: ignored", "Host: x"]);
        assert_eq!(out, vec!["GET /a", "Host: x"]);
    }

    #[test]
    fn test_collapses_blank_runs() {
        let out = normalize(&["", "  ", "GET /a", "", "", "\t", "body", ""]);
        assert_eq!(out, vec!["GET /a", "", "body", ""]);
    }

    #[test]
    fn test_comment_between_blanks_leaves_one_separator() {
        let out = normalize(&["a", "", "# note", "", "b"]);
        assert_eq!(out, vec!["a", "", "b"]);
    }

    #[test]
    fn test_never_two_blanks_or_leading_blank() {
        let inputs: [&[&str]; 4] = [
            &["", "", "", ""],
            &["#", "", "x", "", "#y", "", "", "z"],
            &["x", " ", "\t", "", "y"],
            &["", "x"],
        ];
        for input in inputs {
            let out = normalize(input);
            if let Some(first) = out.first() {
                assert!(!is_blank(first), "leading blank for {input:?}");
            }
            for pair in out.windows(2) {
                assert!(
                    !(is_blank(&pair[0]) && is_blank(&pair[1])),
                    "double blank for {input:?}"
                );
            }
        }
    }

    #[test]
    fn test_applies_placeholders() {
        let mut params = Placeholders::new();
        params.insert("id".to_string(), json!(7));
        params.insert("empty".to_string(), json!(null));
        let substitution = Substitution::new(&params).unwrap();

        let out = normalize_lines(["GET /items/$id", "$empty", "", "tail"], &substitution);
        // a line that substitutes to nothing counts as blank
        assert_eq!(out, vec!["GET /items/7", "", "tail"]);
    }
}
