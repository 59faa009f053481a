//! Output layer shared by the run report and error rendering.
//!
//! Human output goes to stdout as plain lines; `--json` switches both the
//! report and any error to a single JSON object, errors on stderr.

use std::io::{self, Write};

use asyncbc_core::error::ErrorCode;
use serde::Serialize;

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    #[must_use]
    pub const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }

    /// Returns `true` if JSON output was requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (`E####`).
    pub error_code: String,
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: code.code().to_string(),
        }
    }
}

/// Render a serializable value to stdout in the requested format.
///
/// In JSON mode, the value is serialized with `serde_json`. In human mode,
/// the provided `human_fn` closure is called to produce text output.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Human => human_fn(value, &mut out)?,
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(mode, error, &mut out)
}

fn write_error(mode: OutputMode, error: &CliError, out: &mut dyn Write) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            writeln!(out, "error[{}]: {}", error.error_code, error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_selects_mode() {
        assert!(OutputMode::from_json_flag(true).is_json());
        assert!(!OutputMode::from_json_flag(false).is_json());
    }

    #[test]
    fn cli_error_carries_code_and_hint() {
        let err = CliError::new(ErrorCode::SourceOutOfRange, "start node 9 is outside the graph");
        assert_eq!(err.error_code, "E3001");
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn human_error_includes_code() {
        let err = CliError::new(ErrorCode::GraphIoError, "failed to read graph file");
        let mut buf = Vec::new();
        write_error(OutputMode::Human, &err, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("error[E2001]: failed to read graph file"));
        assert!(text.contains("suggestion:"));
    }

    #[test]
    fn json_error_is_wrapped() {
        let err = CliError::new(ErrorCode::InternalUnexpected, "boom");
        let mut buf = Vec::new();
        write_error(OutputMode::Json, &err, &mut buf).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["error"]["error_code"], "E9001");
        assert_eq!(value["error"]["message"], "boom");
    }

    #[test]
    fn kv_is_aligned() {
        let mut buf = Vec::new();
        pretty_kv(&mut buf, "nodes", "5").expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "nodes:         5\n");
    }
}
