//! Column-ordered configuration tables and observation snapshots.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{GlintError, GlintResult};

/// A table of hyperparameter configurations: one row per trial, one column
/// per hyperparameter, all values `f64`. Column order is significant and
/// shared by every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl ConfigTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<f64>>) -> GlintResult<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    pub fn push_row(&mut self, row: Vec<f64>) -> GlintResult<()> {
        if row.len() != self.columns.len() {
            return Err(GlintError::ColumnCount {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a row given as a name → value map. Every column must be
    /// present in the map; extra keys are an error.
    pub fn push_map(&mut self, map: &HashMap<String, f64>) -> GlintResult<()> {
        if map.len() != self.columns.len() {
            return Err(GlintError::ColumnCount {
                expected: self.columns.len(),
                got: map.len(),
            });
        }
        let mut row = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = map
                .get(column)
                .ok_or_else(|| GlintError::MissingColumn {
                    name: column.clone(),
                })?;
            row.push(*value);
        }
        self.rows.push(row);
        Ok(())
    }

    /// Whether `map` carries exactly this table's columns.
    pub fn accepts_map(&self, map: &HashMap<String, f64>) -> bool {
        map.len() == self.columns.len() && self.columns.iter().all(|c| map.contains_key(c))
    }

    pub fn row_map(&self, index: usize) -> HashMap<String, f64> {
        self.columns
            .iter()
            .cloned()
            .zip(self.rows[index].iter().copied())
            .collect()
    }

    pub fn to_maps(&self) -> Vec<HashMap<String, f64>> {
        (0..self.rows.len()).map(|i| self.row_map(i)).collect()
    }

    /// Drop duplicate rows, keeping the first occurrence. Rows compare by
    /// exact `f64` equality.
    pub fn dedup_rows(&mut self) {
        let mut seen: Vec<Vec<f64>> = Vec::with_capacity(self.rows.len());
        self.rows.retain(|row| {
            if seen.contains(row) {
                false
            } else {
                seen.push(row.clone());
                true
            }
        });
    }

    /// Project the table onto `names`, in the given order.
    pub fn select_columns(&self, names: &[&str]) -> GlintResult<Self> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let index = self
                .column_index(name)
                .ok_or_else(|| GlintError::MissingColumn {
                    name: (*name).to_string(),
                })?;
            indices.push(index);
        }
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i]).collect())
            .collect();
        Ok(Self {
            columns: names.iter().map(|s| s.to_string()).collect(),
            rows,
        })
    }

    /// Apply `f` to every cell, keyed by column name. Used by warping
    /// transformers; shape and column order are preserved.
    pub fn map_columns<F>(&self, f: F) -> Self
    where
        F: Fn(&str, f64) -> f64,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(name, value)| f(name, *value))
                    .collect()
            })
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// An immutable snapshot of previously evaluated configurations paired with
/// their scalar performance values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    configs: ConfigTable,
    fvals: Vec<f64>,
}

impl ObservationSet {
    pub fn new(configs: ConfigTable, fvals: Vec<f64>) -> GlintResult<Self> {
        if configs.n_rows() != fvals.len() {
            return Err(GlintError::ColumnCount {
                expected: configs.n_rows(),
                got: fvals.len(),
            });
        }
        Ok(Self { configs, fvals })
    }

    pub fn configs(&self) -> &ConfigTable {
        &self.configs
    }

    pub fn fvals(&self) -> &[f64] {
        &self.fvals
    }

    pub fn len(&self) -> usize {
        self.fvals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fvals.is_empty()
    }
}
