//! LibSVM text format reader
//!
//! Supports problems in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! 1 1:0.5 3:1.2 7:0.8
//! 2 2:0.3 5:2.1
//!
//! Labels are integers and indices are 1-based and strictly ascending.

use crate::core::{LinearError, Problem, Result, SparseVector};
use crate::utils::{parse_int, parse_real};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

impl Problem {
    /// Load a problem from a libsvm format file
    ///
    /// `bias >= 0` enables the bias feature with that value.
    pub fn from_libsvm_file<P: AsRef<Path>>(path: P, bias: f64) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_libsvm_reader(BufReader::new(file), bias)
    }

    /// Load a problem from a reader (for testing and flexibility)
    pub fn from_libsvm_reader<R: BufRead>(reader: R, bias: f64) -> Result<Self> {
        let mut x = Vec::new();
        let mut y = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, features) = parse_line(line).map_err(|e| {
                LinearError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            y.push(label);
            x.push(features);
        }

        if x.is_empty() {
            return Err(LinearError::EmptyDataset);
        }

        Ok(Problem::new(x, y)?.with_bias(bias))
    }
}

/// Parse a single line in libsvm format
fn parse_line(line: &str) -> Result<(i32, SparseVector)> {
    let mut parts = line.split_whitespace();
    let label_token = parts
        .next()
        .ok_or_else(|| LinearError::ParseError("Empty line".to_string()))?;
    let label = parse_int(label_token)
        .map_err(|_| LinearError::ParseError(format!("Invalid label: {label_token}")))?;

    let mut indices = Vec::new();
    let mut values = Vec::new();

    for feature in parts {
        let (index_str, value_str) = feature.split_once(':').ok_or_else(|| {
            LinearError::ParseError(format!("Invalid feature format: {feature}"))
        })?;

        let index = parse_int(index_str)
            .map_err(|_| LinearError::ParseError(format!("Invalid feature index: {index_str}")))?;
        if index <= 0 {
            return Err(LinearError::ParseError(format!(
                "Feature index must be positive: {index}"
            )));
        }
        let index = index as usize;

        if let Some(&previous) = indices.last() {
            if index <= previous {
                return Err(LinearError::ParseError(format!(
                    "Feature indices must be in ascending order: {index} after {previous}"
                )));
            }
        }

        let value = parse_real(value_str)
            .map_err(|_| LinearError::ParseError(format!("Invalid feature value: {value_str}")))?;

        indices.push(index);
        values.push(value);
    }

    Ok((label, SparseVector::new(indices, values)))
}

/// Load per-instance weights, one real number per non-empty line
pub fn read_instance_weights<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let reader = BufReader::new(File::open(path)?);
    let mut weights = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let weight = parse_real(token).map_err(|_| {
            LinearError::ParseError(format!(
                "Invalid weight on line {}: {}",
                line_num + 1,
                token
            ))
        })?;
        weights.push(weight);
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_line_basic() {
        let (label, x) = parse_line("+1 1:0.5 3:1.2").unwrap();
        assert_eq!(label, 1);
        assert_eq!(x.indices, vec![1, 3]);
        assert_eq!(x.values, vec![0.5, 1.2]);
    }

    #[test]
    fn test_parse_line_multiclass_label() {
        let (label, x) = parse_line("7 2:0.3 5:2.1").unwrap();
        assert_eq!(label, 7);
        assert_eq!(x.indices, vec![2, 5]);

        let (label, x) = parse_line("-3").unwrap();
        assert_eq!(label, -3);
        assert!(x.is_empty());
    }

    #[test]
    fn test_parse_line_invalid_format() {
        assert!(parse_line("+1 1").is_err());
        assert!(parse_line("+1 a:1.0").is_err());
        assert!(parse_line("+1 1:abc").is_err());
        assert!(parse_line("+1 0:1.0").is_err());
        assert!(parse_line("1.5 1:1.0").is_err());
        assert!(parse_line("+1 1:0.5t").is_err());
    }

    #[test]
    fn test_parse_line_rejects_unsorted() {
        let err = parse_line("1 3:1.0 2:1.0").unwrap_err();
        assert!(err.to_string().contains("ascending order"));
    }

    #[test]
    fn test_from_reader() {
        let data = "# comment\n1 1:0.5 3:1.2\n\n2 2:0.3 5:2.1\n1 4:1.0\n";
        let problem = Problem::from_libsvm_reader(Cursor::new(data), -1.0).unwrap();

        assert_eq!(problem.len(), 3);
        assert_eq!(problem.n, 5);
        assert_eq!(problem.y, vec![1, 2, 1]);
        assert!(!problem.has_bias());
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn test_from_reader_with_bias() {
        let problem = Problem::from_libsvm_reader(Cursor::new("1 1:1\n-1 2:1\n"), 1.0).unwrap();
        assert_eq!(problem.bias, 1.0);
        assert_eq!(problem.feature_dim(), 3);
    }

    #[test]
    fn test_from_reader_errors() {
        assert!(matches!(
            Problem::from_libsvm_reader(Cursor::new("# only comments\n\n"), -1.0),
            Err(LinearError::EmptyDataset)
        ));

        let err = Problem::from_libsvm_reader(Cursor::new("1 1:1\n1 x\n"), -1.0).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_read_instance_weights() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "1.0\n\n0.5\n2").expect("Failed to write");
        file.flush().expect("Failed to flush");

        let weights = read_instance_weights(file.path()).unwrap();
        assert_eq!(weights, vec![1.0, 0.5, 2.0]);
    }
}
