use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::domain::errors::DatasetError;

/// Ordered named columns of scalar values, all of the same length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct TabularData {
    columns: Vec<(String, Vec<Value>)>,
}

/// Serialized shape of [`TabularData`], checked on the way in
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<(String, Vec<Value>)>,
}

impl TryFrom<RawTable> for TabularData {
    type Error = DatasetError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        Self::from_columns(raw.columns)
    }
}

impl TabularData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from columns, checking names are unique and lengths agree
    pub fn from_columns<I, S>(columns: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let mut data = Self::new();
        for (name, values) in columns {
            data.push_column(name, values)?;
        }
        Ok(data)
    }

    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(DatasetError::InvalidArguments(format!(
                "Duplicate column '{}'",
                name
            )));
        }
        if let Some((first, existing)) = self.columns.first() {
            if existing.len() != values.len() {
                return Err(DatasetError::InvalidArguments(format!(
                    "Column '{}' has {} rows but '{}' has {}",
                    name,
                    values.len(),
                    first,
                    existing.len()
                )));
            }
        }
        self.columns.push((name, values));
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, values)| values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Parse CSV with a header row
    ///
    /// Cells are typed per value: empty → null, integers, floats and
    /// `true`/`false` become JSON numbers and booleans, anything else a string.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| DatasetError::InvalidArguments(format!("Reading CSV headers: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
        for (row_no, result) in reader.records().enumerate() {
            let record = result
                .map_err(|e| DatasetError::InvalidArguments(format!("CSV row {}: {}", row_no, e)))?;
            for (idx, column) in columns.iter_mut().enumerate() {
                column.push(parse_cell(record.get(idx).unwrap_or("")));
            }
        }

        Self::from_columns(headers.into_iter().zip(columns))
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|e| {
            DatasetError::InvalidArguments(format!("Opening {}: {}", path.display(), e))
        })?;
        Self::from_csv_reader(file)
    }
}

fn parse_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(float) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(float);
    }
    match trimmed {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}
