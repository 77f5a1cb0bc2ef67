use anyhow::{Context, Result};
use log::warn;
use std::path::Path;

/// Raw recorder units per millivolt.
pub const SAMPLE_SCALE: f64 = 10_000.0;

/// Parse whitespace-delimited samples and convert them to millivolts.
///
/// Tokens that are not numbers are dropped rather than rejected; the number
/// dropped is logged. Fails only when nothing numeric remains.
pub fn parse_scaled_samples(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    let mut dropped = 0usize;
    for token in text.split_whitespace() {
        match token.parse::<f64>() {
            Ok(value) => out.push(value / SAMPLE_SCALE),
            Err(_) => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!("dropped {} malformed sample token(s)", dropped);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a whitespace-delimited sample file from disk.
pub fn read_scaled_samples(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_scaled_samples(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn scales_and_splits_on_any_whitespace() {
        let samples = parse_scaled_samples("10000 -5000\n2500\t 0\n").unwrap();
        assert_eq!(samples, vec![1.0, -0.5, 0.25, 0.0]);
    }

    #[test]
    fn drops_malformed_tokens() {
        let samples = parse_scaled_samples("100 abc 200 1e4x  300").unwrap();
        assert_eq!(samples, vec![0.01, 0.02, 0.03]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_scaled_samples("  \n foo ").is_err());
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "20000 10000").unwrap();
        let samples = read_scaled_samples(file.path()).unwrap();
        assert_eq!(samples, vec![2.0, 1.0]);
        assert!(read_scaled_samples(Path::new("/nonexistent/cardio.txt")).is_err());
    }
}
