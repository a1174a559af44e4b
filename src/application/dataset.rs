use serde_json::{Map, Value};

use crate::domain::errors::DatasetError;

/// A named, persistable piece of pipeline data
pub trait Dataset {
    type LoadOutput;
    type SaveInput: ?Sized;

    fn load(&self) -> Result<Self::LoadOutput, DatasetError>;

    fn save(&self, data: &Self::SaveInput) -> Result<(), DatasetError>;

    /// Whether data exists at the load path; an unresolvable load path
    /// counts as missing
    fn exists(&self) -> Result<bool, DatasetError>;

    /// Parameters identifying this dataset
    fn describe(&self) -> Map<String, Value>;

    /// Drop cached state (resolved versions, filesystem caches)
    fn release(&self) -> Result<(), DatasetError>;
}

/// Render `TypeName(key=value, ...)` from a description, skipping null and
/// empty values
pub fn display_description(type_name: &str, description: &Map<String, Value>) -> String {
    let parts: Vec<String> = description
        .iter()
        .filter(|(_, value)| !is_blank(value))
        .map(|(key, value)| match value {
            Value::String(text) => format!("{}={}", key, text),
            other => format!("{}={}", key, other),
        })
        .collect();
    format!("{}({})", type_name, parts.join(", "))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
