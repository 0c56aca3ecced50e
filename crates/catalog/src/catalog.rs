//! The catalog capability and its in-memory implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::predicate::Predicate;
use crate::table::Table;
use crate::value::Value;

/// Columns of every light-curve table.
pub const LIGHT_CURVE_COLUMNS: [&str; 3] = ["mjd", "band", "mag"];

/// AB zero point for fluxes in nJy.
pub const NJY_ZERO_POINT: f64 = 31.4;

fn default_zero_point() -> f64 {
    NJY_ZERO_POINT
}

/// A read-only catalog handle.
pub trait Catalog: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Partition-level columns usable in native filters.
    fn native_quantities(&self) -> Vec<String>;

    /// Stored and derived row-level columns, sorted.
    fn list_quantities(&self) -> Vec<String>;

    /// Rows of `columns` passing every filter.
    ///
    /// `native_filters` are tested against each partition's native values
    /// first; partitions that fail are skipped without reading rows. Unknown
    /// columns fail before any partition is visited.
    fn get_quantities(
        &self,
        columns: &[String],
        filters: &[Predicate],
        native_filters: &[Predicate],
    ) -> CatalogResult<Table>;

    /// Lazily yield one light curve per object passing `object_filters`,
    /// keeping only rows that pass `row_filters`.
    fn light_curves<'a>(
        &'a self,
        object_filters: &[Predicate],
        row_filters: &[Predicate],
    ) -> CatalogResult<Box<dyn Iterator<Item = CatalogResult<LightCurve>> + 'a>>;
}

/// A quantity computed from stored columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Derived {
    /// Another name for a stored column.
    Alias { column: String },
    /// `zero_point - 2.5 log10(flux)`; non-positive fluxes give NaN.
    FluxToMag {
        column: String,
        #[serde(default = "default_zero_point")]
        zero_point: f64,
    },
    /// `a - b`, e.g. a colour from two magnitudes.
    Difference { a: String, b: String },
}

impl Derived {
    fn sources(&self) -> Vec<&str> {
        match self {
            Derived::Alias { column } | Derived::FluxToMag { column, .. } => vec![column.as_str()],
            Derived::Difference { a, b } => vec![a.as_str(), b.as_str()],
        }
    }

    fn compute(&self, name: &str, table: &Table) -> CatalogResult<Vec<Value>> {
        let numbers = |column: &str| {
            table.numbers(column).ok_or_else(|| CatalogError::TypeMismatch {
                column: name.to_string(),
                message: format!("source column '{}' is not numeric", column),
            })
        };
        match self {
            Derived::Alias { column } => table
                .column(column)
                .map(<[Value]>::to_vec)
                .ok_or_else(|| CatalogError::UnknownColumn(column.clone())),
            Derived::FluxToMag { column, zero_point } => Ok(numbers(column)?
                .into_iter()
                .map(|flux| {
                    let mag = if flux > 0.0 { zero_point - 2.5 * flux.log10() } else { f64::NAN };
                    Value::Number(mag)
                })
                .collect()),
            Derived::Difference { a, b } => Ok(numbers(a)?
                .into_iter()
                .zip(numbers(b)?)
                .map(|(x, y)| Value::Number(x - y))
                .collect()),
        }
    }
}

/// One object's light curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightCurve {
    /// Object-level values, e.g. `objectId`, `ra`, `dec`.
    pub object: BTreeMap<String, Value>,
    /// `mjd`, `band`, `mag` rows.
    pub table: Table,
}

impl LightCurve {
    fn matches(&self, filters: &[Predicate]) -> CatalogResult<bool> {
        for filter in filters {
            let Some(value) = self.object.get(&filter.column) else {
                return Ok(false);
            };
            if !filter.test(value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// On-disk JSON form of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub name: String,
    #[serde(default)]
    pub native_columns: Vec<String>,
    #[serde(default)]
    pub partitions: Vec<PartitionFile>,
    #[serde(default)]
    pub derived: BTreeMap<String, Derived>,
    #[serde(default)]
    pub light_curves: Vec<LightCurveFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionFile {
    #[serde(default)]
    pub native: BTreeMap<String, Value>,
    pub columns: BTreeMap<String, Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightCurveFile {
    pub object: BTreeMap<String, Value>,
    pub mjd: Vec<f64>,
    pub band: Vec<String>,
    pub mag: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Partition {
    native: BTreeMap<String, Value>,
    table: Table,
}

/// Catalog held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    name: String,
    native_columns: Vec<String>,
    stored: BTreeSet<String>,
    derived: BTreeMap<String, Derived>,
    partitions: Vec<Partition>,
    light_curves: Vec<LightCurve>,
    object_columns: BTreeSet<String>,
}

impl MemoryCatalog {
    /// Build from the file form, checking that the schema is consistent.
    pub fn from_file(file: CatalogFile) -> CatalogResult<Self> {
        let native_set: BTreeSet<&String> = file.native_columns.iter().collect();
        let stored: BTreeSet<String> = file
            .partitions
            .first()
            .map(|p| p.columns.keys().cloned().collect())
            .unwrap_or_default();

        let mut partitions = Vec::with_capacity(file.partitions.len());
        for (i, partition) in file.partitions.into_iter().enumerate() {
            if partition.native.keys().collect::<BTreeSet<_>>() != native_set {
                return Err(CatalogError::Schema(format!(
                    "partition {} native values do not match {:?}",
                    i, file.native_columns
                )));
            }
            if !partition.columns.keys().eq(stored.iter()) {
                return Err(CatalogError::Schema(format!("partition {} has a different column set", i)));
            }
            let table = Table::from_columns(partition.columns)
                .map_err(|e| CatalogError::Schema(format!("partition {}: {}", i, e)))?;
            partitions.push(Partition {
                native: partition.native,
                table,
            });
        }

        for (name, derived) in &file.derived {
            if stored.contains(name) {
                return Err(CatalogError::Schema(format!("derived '{}' shadows a stored column", name)));
            }
            if let Some(source) = derived.sources().into_iter().find(|s| !stored.contains(*s)) {
                return Err(CatalogError::Schema(format!(
                    "derived '{}' needs unknown column '{}'",
                    name, source
                )));
            }
        }

        let mut light_curves = Vec::with_capacity(file.light_curves.len());
        let mut object_columns = BTreeSet::new();
        for (i, lc) in file.light_curves.into_iter().enumerate() {
            object_columns.extend(lc.object.keys().cloned());
            let table = Table::from_columns([
                ("mjd".to_string(), lc.mjd.into_iter().map(Value::Number).collect::<Vec<_>>()),
                ("band".to_string(), lc.band.into_iter().map(Value::Text).collect::<Vec<_>>()),
                ("mag".to_string(), lc.mag.into_iter().map(Value::Number).collect::<Vec<_>>()),
            ])
            .map_err(|e| CatalogError::Schema(format!("light curve {}: {}", i, e)))?;
            light_curves.push(LightCurve {
                object: lc.object,
                table,
            });
        }

        debug!(
            catalog = %file.name,
            partitions = partitions.len(),
            light_curves = light_curves.len(),
            "Loaded catalog"
        );
        Ok(Self {
            name: file.name,
            native_columns: file.native_columns,
            stored,
            derived: file.derived,
            partitions,
            light_curves,
            object_columns,
        })
    }

    pub fn from_json(json: &str) -> CatalogResult<Self> {
        Self::from_file(serde_json::from_str(json)?)
    }

    /// Load a JSON catalog file.
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    fn is_quantity(&self, name: &str) -> bool {
        self.stored.contains(name) || self.derived.contains_key(name)
    }

    fn check_columns<'s>(&self, names: impl IntoIterator<Item = &'s str>) -> CatalogResult<()> {
        match names.into_iter().find(|n| !self.is_quantity(n)) {
            Some(unknown) => Err(CatalogError::UnknownColumn(unknown.to_string())),
            None => Ok(()),
        }
    }

    fn partition_selected(&self, partition: &Partition, native_filters: &[Predicate]) -> CatalogResult<bool> {
        for filter in native_filters {
            let value = partition
                .native
                .get(&filter.column)
                .ok_or_else(|| CatalogError::UnknownColumn(filter.column.clone()))?;
            if !filter.test(value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Stored columns plus whichever derived columns are `needed`.
    fn working_table(&self, partition: &Partition, needed: &BTreeSet<&str>) -> CatalogResult<Table> {
        let mut table = partition.table.clone();
        for name in needed {
            if let Some(derived) = self.derived.get(*name) {
                let values = derived.compute(name, &partition.table)?;
                table.push_column(*name, values)?;
            }
        }
        Ok(table)
    }
}

impl Catalog for MemoryCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn native_quantities(&self) -> Vec<String> {
        self.native_columns.clone()
    }

    fn list_quantities(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stored.iter().chain(self.derived.keys()).cloned().collect();
        names.sort();
        names
    }

    fn get_quantities(
        &self,
        columns: &[String],
        filters: &[Predicate],
        native_filters: &[Predicate],
    ) -> CatalogResult<Table> {
        if let Some(filter) = native_filters
            .iter()
            .find(|f| !self.native_columns.contains(&f.column))
        {
            return Err(CatalogError::UnknownColumn(filter.column.clone()));
        }
        self.check_columns(columns.iter().map(String::as_str))?;
        self.check_columns(filters.iter().map(|f| f.column.as_str()))?;

        let needed: BTreeSet<&str> = columns
            .iter()
            .map(String::as_str)
            .chain(filters.iter().map(|f| f.column.as_str()))
            .collect();

        let mut out = Table::from_columns(columns.iter().map(|c| (c.clone(), Vec::new())))?;
        let mut skipped = 0;
        for partition in &self.partitions {
            if !self.partition_selected(partition, native_filters)? {
                skipped += 1;
                continue;
            }
            let rows = self.working_table(partition, &needed)?.filter(filters)?;
            out.append(rows.select(columns)?)?;
        }

        debug!(
            catalog = %self.name,
            rows = out.num_rows(),
            partitions_skipped = skipped,
            "Catalog query"
        );
        Ok(out)
    }

    fn light_curves<'a>(
        &'a self,
        object_filters: &[Predicate],
        row_filters: &[Predicate],
    ) -> CatalogResult<Box<dyn Iterator<Item = CatalogResult<LightCurve>> + 'a>> {
        if let Some(filter) = object_filters
            .iter()
            .find(|f| !self.object_columns.contains(&f.column))
        {
            return Err(CatalogError::UnknownColumn(filter.column.clone()));
        }
        if let Some(filter) = row_filters
            .iter()
            .find(|f| !LIGHT_CURVE_COLUMNS.contains(&f.column.as_str()))
        {
            return Err(CatalogError::UnknownColumn(filter.column.clone()));
        }

        let object_filters = object_filters.to_vec();
        let row_filters = row_filters.to_vec();
        Ok(Box::new(self.light_curves.iter().filter_map(move |lc| {
            match lc.matches(&object_filters) {
                Ok(false) => None,
                Ok(true) => Some(lc.table.filter(&row_filters).map(|table| LightCurve {
                    object: lc.object.clone(),
                    table,
                })),
                Err(e) => Some(Err(e)),
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::from_json(
            r#"{
                "name": "mini",
                "native_columns": ["tract"],
                "partitions": [
                    {"native": {"tract": 1}, "columns": {"id": [1, 2], "flux_r": [1000.0, -5.0]}},
                    {"native": {"tract": 2}, "columns": {"id": [3], "flux_r": [100.0]}}
                ],
                "derived": {"mag_r": {"type": "flux_to_mag", "column": "flux_r"}}
            }"#,
        )
        .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flux_to_mag() {
        let table = catalog().get_quantities(&names(&["id", "mag_r"]), &[], &[]).unwrap();
        let mags = table.numbers("mag_r").unwrap();
        assert!((mags[0] - 23.9).abs() < 1e-9);
        assert!(mags[1].is_nan());
        assert!((mags[2] - 26.4).abs() < 1e-9);
    }

    #[test]
    fn test_quantities_listed() {
        let c = catalog();
        assert_eq!(c.list_quantities(), names(&["flux_r", "id", "mag_r"]));
        assert_eq!(c.native_quantities(), names(&["tract"]));
    }

    #[test]
    fn test_derived_must_reference_stored_column() {
        let err = MemoryCatalog::from_json(
            r#"{"name": "bad", "partitions": [{"columns": {"a": [1]}}],
                "derived": {"b": {"type": "alias", "column": "c"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Schema(_)));
    }

    #[test]
    fn test_partitions_must_share_columns() {
        let err = MemoryCatalog::from_json(
            r#"{"name": "bad", "partitions": [{"columns": {"a": [1]}}, {"columns": {"b": [1]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Schema(_)));
    }
}
