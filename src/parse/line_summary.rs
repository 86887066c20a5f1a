use std::fmt;

/// longest prefix of an offending line that is kept for error messages. Lines read
/// out of a binary file can run into payload bytes, so the rest is dropped.
const MAX_SUMMARY_CHARS: usize = 48;

/// printable description of a line that failed to parse
#[derive(Debug, Clone, PartialEq)]
pub struct LineSummary {
    text: String,
    truncated: bool,
}

impl LineSummary {
    pub(crate) fn new(line: &[u8]) -> Self {
        let decoded = String::from_utf8_lossy(line);
        let trimmed = decoded.trim_end_matches(&['\r', '\n'][..]);

        let truncated = trimmed.chars().count() > MAX_SUMMARY_CHARS;
        let text = trimmed.chars().take(MAX_SUMMARY_CHARS).collect();

        Self { text, truncated }
    }

    pub(crate) fn eof() -> Self {
        Self {
            text: String::new(),
            truncated: false,
        }
    }
}

impl fmt::Display for LineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() && !self.truncated {
            return write!(f, "end of file");
        }

        if self.truncated {
            write!(f, "line `{}...`", self.text)
        } else {
            write!(f, "line `{}`", self.text)
        }
    }
}

impl From<&[u8]> for LineSummary {
    fn from(x: &[u8]) -> Self {
        Self::new(x)
    }
}

impl From<&str> for LineSummary {
    fn from(x: &str) -> Self {
        Self::new(x.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_lines_are_cut() {
        let line = vec![b'a'; 200];
        let summary = LineSummary::new(&line);
        let shown = summary.to_string();
        assert!(shown.ends_with("...`"));
        assert!(shown.len() < 70);
    }

    #[test]
    fn empty_line_is_eof() {
        assert_eq!(LineSummary::new(b"").to_string(), "end of file");
        assert_eq!(LineSummary::eof().to_string(), "end of file");
        assert_eq!(LineSummary::new(b"FOO 1\n").to_string(), "line `FOO 1`");
    }
}
