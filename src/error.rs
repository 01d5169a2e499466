use serde::Serialize;
use strum::Display;
use thiserror::Error;

/// Lines shown above and below the failing line in a parse error frame.
const FRAME_RADIUS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({line}:{column})")]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the failure.
    pub line: usize,
    /// 1-based column of the failure, counted in characters.
    pub column: usize,
}

impl ParseError {
    pub fn at_offset(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;

        Self {
            message: message.into(),
            line,
            column,
        }
    }

    /// Renders up to five numbered lines around the failure with a caret
    /// under the failing column.
    pub fn code_frame(&self, source: &str) -> String {
        let lines: Vec<&str> = source.lines().collect();
        let first = self.line.saturating_sub(FRAME_RADIUS).max(1);
        let last = (self.line + FRAME_RADIUS).min(lines.len().max(1));

        let mut frame = String::new();
        for number in first..=last {
            let text = lines.get(number - 1).copied().unwrap_or_default();
            let marker = if number == self.line { '>' } else { ' ' };
            frame.push_str(&format!("{marker} {number:>4} | {text}\n"));
            if number == self.line {
                let padding = " ".repeat(self.column.saturating_sub(1));
                frame.push_str(&format!("       | {padding}^\n"));
            }
        }
        frame
    }
}

#[derive(Debug, Error)]
pub enum PassError {
    #[error("pass `{pass}` failed: {source}")]
    Failed {
        pass: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("pass `{pass}` panicked: {message}")]
    Panicked { pass: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("unrecognized bundle format")]
    UnrecognizedBundleFormat,
    #[error("failed to parse bundle: {0}")]
    Parse(#[from] ParseError),
}

/// Any failure the library reports across a file boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Pass(#[from] PassError),
    #[error(transparent)]
    Unpack(#[from] UnpackError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A message attached to a processed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Pass that emitted the message, `None` for engine-level messages.
    pub pass: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(pass: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            pass: pass.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn warning(pass: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            pass: pass.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_line_and_column() {
        let source = "const a = 1;\nconst b = ;\n";
        let error = ParseError::at_offset(source, 23, "Unexpected token");
        assert_eq!(error.line, 2);
        assert_eq!(error.column, 11);
    }

    #[test]
    fn test_code_frame_window() {
        let source = "a\nb\nc\nd\ne\nf\ng";
        let error = ParseError {
            message: "boom".to_string(),
            line: 4,
            column: 1,
        };
        let frame = error.code_frame(source);

        assert!(frame.contains("   2 | b"));
        assert!(frame.contains(">    4 | d"));
        assert!(frame.contains("   6 | f"));
        assert!(!frame.contains("| a"));
        assert!(!frame.contains("| g"));
        assert!(frame.contains("       | ^"));
    }

    #[test]
    fn test_code_frame_at_file_start() {
        let error = ParseError {
            message: "boom".to_string(),
            line: 1,
            column: 3,
        };
        let frame = error.code_frame("abc\ndef");
        assert!(frame.starts_with(">    1 | abc"));
        assert!(frame.contains("|   ^"));
    }
}
