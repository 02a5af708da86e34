//! Whitespace-separated text matrices, one example per line, as the
//! binarized MNIST split of Larochelle & Murray is distributed.

use crate::error::{Error, Result};

pub fn parse_amat(text: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line.split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| {
                    Error::dataset(format!("line {}: `{tok}` is not a number", line_no + 1))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(Error::dataset(format!(
                    "line {}: expected {} values, found {}",
                    line_no + 1,
                    first.len(),
                    row.len()
                )));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_lines() {
        let rows = parse_amat("0 1 1\n\n1 0 0\n").expect("valid");
        assert_eq!(rows, vec![vec![0.0, 1.0, 1.0], vec![1.0, 0.0, 0.0]]);
    }

    #[test]
    fn rejects_ragged_rows() {
        assert!(parse_amat("0 1\n1\n").is_err());
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_amat("0 x 1\n").unwrap_err();
        assert_eq!(err.to_string(), "dataset error: line 1: `x` is not a number");
    }
}
