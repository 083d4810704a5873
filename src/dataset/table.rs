use std::io;
use std::path::Path;

use crate::dataset::preprocess::coerce_optional;
use crate::error::{Error, Result};

/// A derived numeric column; `None` cells are written as empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn dense(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, values.into_iter().map(Some).collect())
    }
}

/// Header plus string cells, exactly as read from a delimited file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        Self::from_csv(reader)
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|header| header.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
        })
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some((0..self.len()).map(|row| self.cell(row, index)).collect())
    }

    /// Parses a column as numbers; unparseable cells become `None`.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let index = self.require_column(name)?;
        Ok((0..self.len())
            .map(|row| coerce_optional(self.cell(row, index)))
            .collect())
    }

    /// Returns a copy with `columns` merged in. A column whose name already
    /// exists replaces the old cells in place; new names are appended.
    pub fn with_columns(&self, columns: &[Column]) -> Result<Self> {
        let mut table = self.clone();
        for column in columns {
            if column.values.len() != table.len() {
                return Err(Error::Config(format!(
                    "column '{}' has {} values for {} rows",
                    column.name,
                    column.values.len(),
                    table.len()
                )));
            }

            let index = match table.column_index(&column.name) {
                Some(index) => index,
                None => {
                    table.headers.push(column.name.clone());
                    for row in table.rows.iter_mut() {
                        row.push(String::new());
                    }
                    table.headers.len() - 1
                }
            };

            for (row, value) in table.rows.iter_mut().zip(column.values.iter()) {
                row[index] = format_cell(*value);
            }
        }
        Ok(table)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => value.to_string(),
        _ => String::new(),
    }
}
