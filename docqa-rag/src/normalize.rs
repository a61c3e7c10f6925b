//! Cleanup applied to raw extracted text before chunking.

/// Normalize raw extractor output.
///
/// Removes NUL characters, strips trailing whitespace from every line, drops blank lines so that
/// non-blank lines are separated by a single `\n`, and trims the result. Applying it twice gives
/// the same output as applying it once.
pub fn normalize(raw: &str) -> String {
    let without_nul = raw.replace('\0', "");

    let mut out = String::with_capacity(without_nul.len());
    for line in without_nul.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nul_and_outer_whitespace() {
        assert_eq!(normalize("\0  hello\0 world \n\n"), "hello world");
    }

    #[test]
    fn collapses_blank_line_runs() {
        let raw = "page one\n\n\n   \npage two\r\n\r\nend";
        assert_eq!(normalize(raw), "page one\npage two\nend");
    }

    #[test]
    fn whitespace_only_input_is_empty() {
        assert_eq!(normalize(" \n\t\n\0"), "");
    }

    #[test]
    fn keeps_inner_indentation() {
        assert_eq!(normalize("a\n    b"), "a\n    b");
    }
}
