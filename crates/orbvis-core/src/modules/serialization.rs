use serde::Serialize;
use std::fs;
use std::path::Path;

/// Right-aligned fixed-point text. NaN is written as `nan` in the same width
/// so gnuplot and numpy both read a break.
pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    if value.is_nan() {
        return format!("{:>width$}", "nan", width = width);
    }
    format!(
        "{value:>width$.precision$}",
        width = width,
        precision = precision
    )
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

pub fn write_json_artifact<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    write_text_artifact(path, &content)
}

#[cfg(test)]
mod tests {
    use super::{
        format_fixed_f64, normalize_text_artifact, write_json_artifact, write_text_artifact,
    };
    use serde_json::{Value, json};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn fixed_width_float_formatting_is_deterministic() {
        let first = format_fixed_f64(1.23, 13, 5);
        let second = format_fixed_f64(1.23, 13, 5);

        assert_eq!(first, "      1.23000");
        assert_eq!(first, second);
        assert_eq!(format_fixed_f64(f64::NAN, 6, 2), "   nan");
    }

    #[test]
    fn normalize_text_artifact_uses_canonical_line_endings() {
        let normalized = normalize_text_artifact("alpha\r\nbeta\rgamma");
        assert_eq!(normalized, "alpha\nbeta\ngamma\n");
    }

    #[test]
    fn repeated_text_writes_produce_identical_bytes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("artifact.dat");
        let input = "line 1\r\nline 2\rline 3";

        write_text_artifact(&path, input).expect("first write should succeed");
        let first = fs::read(&path).expect("artifact should be readable");

        write_text_artifact(&path, input).expect("second write should succeed");
        let second = fs::read(&path).expect("artifact should be readable");

        assert_eq!(first, second);
        assert_eq!(second, b"line 1\nline 2\nline 3\n");
    }

    #[test]
    fn json_artifacts_end_with_a_newline() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("summary.json");

        write_json_artifact(&path, &json!({ "segments": 3 })).expect("json write should succeed");
        let content = fs::read_to_string(&path).expect("artifact should be readable");

        assert!(content.ends_with("}\n"));
        let parsed: Value = serde_json::from_str(&content).expect("artifact should be valid JSON");
        assert_eq!(parsed["segments"], json!(3));
    }
}
