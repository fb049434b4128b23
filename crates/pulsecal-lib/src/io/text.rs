use anyhow::{Context, Result};
use std::path::Path;

/// Parse a newline-delimited floating point series, ignoring blank and
/// comment lines.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        out.push(value);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a newline-delimited floating point series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_comments_and_blanks() {
        let text = "# header\n1.5\n\n-2.25\n 3 \n";
        let values = parse_f64_series(text).unwrap();
        assert_eq!(values, vec![1.5, -2.25, 3.0]);
    }

    #[test]
    fn rejects_non_numeric_lines() {
        assert!(parse_f64_series("1.0\nbogus\n").is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_f64_series("# only comments\n").is_err());
    }
}
