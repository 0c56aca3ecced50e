//! Column-oriented result tables.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{CatalogError, CatalogResult};
use crate::predicate::Predicate;
use crate::value::Value;

/// Named columns of equal length, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, values)` pairs. All columns must have one length.
    pub fn from_columns<I>(columns: I) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = (String, Vec<Value>)>,
    {
        let mut table = Table::new();
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Append a column. Replaces a column of the same name.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> CatalogResult<()> {
        let name = name.into();
        if !self.columns.is_empty() && values.len() != self.num_rows() {
            return Err(CatalogError::Schema(format!(
                "column '{}' has {} rows, expected {}",
                name,
                values.len(),
                self.num_rows()
            )));
        }
        match self.index_of(&name) {
            Some(i) => self.columns[i] = values,
            None => {
                self.names.push(name);
                self.columns.push(values);
            }
        }
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.index_of(name).map(|i| self.columns[i].as_slice())
    }

    /// Column as numbers; `None` if missing or any cell is a string.
    pub fn numbers(&self, name: &str) -> Option<Vec<f64>> {
        self.column(name)?.iter().map(Value::as_f64).collect()
    }

    /// Values of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.num_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c[index]).collect())
    }

    /// Row `index` as a name → value map.
    pub fn record(&self, index: usize) -> Option<BTreeMap<&str, &Value>> {
        let row = self.row(index)?;
        Some(self.names.iter().map(String::as_str).zip(row).collect())
    }

    /// Rows where every predicate holds.
    pub fn filter(&self, predicates: &[Predicate]) -> CatalogResult<Table> {
        let mut keep = vec![true; self.num_rows()];
        for predicate in predicates {
            let column = self
                .column(&predicate.column)
                .ok_or_else(|| CatalogError::UnknownColumn(predicate.column.clone()))?;
            for (flag, value) in keep.iter_mut().zip(column) {
                if *flag {
                    *flag = predicate.test(value)?;
                }
            }
        }
        Ok(self.take_rows(&keep))
    }

    /// The named columns, in the requested order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> CatalogResult<Table> {
        let mut out = Table::new();
        for name in names {
            let name = name.as_ref();
            let values = self
                .column(name)
                .ok_or_else(|| CatalogError::UnknownColumn(name.to_string()))?;
            out.push_column(name, values.to_vec())?;
        }
        Ok(out)
    }

    /// Append the rows of `other`, which must have the same columns.
    pub fn append(&mut self, other: Table) -> CatalogResult<()> {
        if self.names.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.names != other.names {
            return Err(CatalogError::Schema(format!(
                "cannot append columns {:?} to {:?}",
                other.names, self.names
            )));
        }
        for (column, extra) in self.columns.iter_mut().zip(other.columns) {
            column.extend(extra);
        }
        Ok(())
    }

    fn take_rows(&self, keep: &[bool]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| v.clone())
                    .collect()
            })
            .collect();
        Table {
            names: self.names.clone(),
            columns,
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}
