//! Reader for the tab-separated star lists written by the star detector.
//!
//! The format is the WCSTools "starbase" table: free-form `key<TAB>value`
//! header lines, a line of tab-separated column names, a line of dashes,
//! then one row per star.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading a star table.
#[derive(Debug, Error)]
pub enum StarTableError {
    /// I/O error reading the table.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No dashed separator line between column names and rows.
    #[error("Star table has no column separator line")]
    MissingSeparator,

    /// A required column is absent.
    #[error("Star table has no '{column}' column")]
    MissingColumn { column: String },

    /// A cell could not be parsed as a number.
    #[error("Invalid value '{value}' in column '{column}' on row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },
}

/// A parsed star list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarTable {
    headers: Vec<(String, String)>,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl StarTable {
    pub fn parse(text: &str) -> Result<Self, StarTableError> {
        let lines: Vec<&str> = text.lines().collect();
        let separator = lines
            .iter()
            .position(|line| is_separator(line))
            .ok_or(StarTableError::MissingSeparator)?;

        let columns = match separator.checked_sub(1) {
            Some(idx) => split_row(lines[idx]),
            None => Vec::new(),
        };

        let headers = lines[..separator.saturating_sub(1)]
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| match line.split_once('\t') {
                Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
                None => (line.trim().to_string(), String::new()),
            })
            .collect();

        let rows = lines[separator + 1..]
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| split_row(line))
            .collect();

        Ok(Self {
            headers,
            columns,
            rows,
        })
    }

    pub async fn read(path: &Path) -> Result<Self, StarTableError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::parse(&text)
    }

    /// Number of stars listed.
    pub fn star_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value of a `key<TAB>value` header line.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Cells of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&str>, StarTableError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| StarTableError::MissingColumn {
                column: name.to_string(),
            })?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
            .collect())
    }

    /// Pixel coordinates of every star from the `x` and `y` columns.
    pub fn pixel_positions(&self) -> Result<Vec<(f64, f64)>, StarTableError> {
        let xs = self.numeric_column("x")?;
        let ys = self.numeric_column("y")?;
        Ok(xs.into_iter().zip(ys).collect())
    }

    fn numeric_column(&self, name: &str) -> Result<Vec<f64>, StarTableError> {
        self.column(name)?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.parse::<f64>()
                    .map_err(|_| StarTableError::InvalidValue {
                        column: name.to_string(),
                        row: row + 1,
                        value: cell.to_string(),
                    })
            })
            .collect()
    }
}

fn is_separator(line: &str) -> bool {
    let mut saw_dash = false;
    for c in line.chars() {
        match c {
            '-' => saw_dash = true,
            '\t' | ' ' => {}
            _ => return false,
        }
    }
    saw_dash
}

fn split_row(line: &str) -> Vec<String> {
    if line.contains('\t') {
        line.split('\t').map(|s| s.trim().to_string()).collect()
    } else {
        line.split_whitespace().map(str::to_string).collect()
    }
}
