use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accumulated field values for one application, keyed by canonical snake_case field name.
///
/// Step forms only ever hand back full slices; [`ApplicationRecord::merge`] folds them in so
/// keys owned by other steps survive. A slice marks a cleared field with `null`, which removes
/// the key from the aggregate on merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationRecord {
    fields: BTreeMap<String, Value>,
}

impl ApplicationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Textual form of a provided value, or `None` when the field counts as empty.
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(value_text)
    }

    pub fn is_provided(&self, field: &str) -> bool {
        self.text(field).is_some()
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Union with `slice`, where the slice's values win and `null` entries delete.
    pub fn merge(&mut self, slice: ApplicationRecord) {
        for (field, value) in slice.fields {
            if value.is_null() {
                self.fields.remove(&field);
            } else {
                self.fields.insert(field, value);
            }
        }
    }

    /// Copy of the fields named in `names` that are present in this record.
    pub fn slice<'a, I>(&self, names: I) -> ApplicationRecord
    where
        I: IntoIterator<Item = &'a str>,
    {
        let fields = names
            .into_iter()
            .filter_map(|name| {
                self.fields
                    .get(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect();
        Self { fields }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

impl From<BTreeMap<String, Value>> for ApplicationRecord {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for ApplicationRecord {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Empty strings, `false`, `null`, and empty containers are treated as "not provided".
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Bool(false) => None,
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_keeps_other_steps_and_drops_cleared_fields() {
        let mut record = ApplicationRecord::new();
        record.set("first_name", json!("Ayesha"));
        record.set("nationality", json!("Dual National"));
        record.set("second_nationality", json!("Canadian"));

        let slice: ApplicationRecord = [
            ("nationality".to_string(), json!("Pakistani")),
            ("second_nationality".to_string(), Value::Null),
        ]
        .into_iter()
        .collect();
        record.merge(slice);

        assert_eq!(record.text("first_name").as_deref(), Some("Ayesha"));
        assert_eq!(record.text("nationality").as_deref(), Some("Pakistani"));
        assert!(!record.contains("second_nationality"));
    }

    #[test]
    fn text_treats_blank_and_false_as_missing() {
        let mut record = ApplicationRecord::new();
        record.set("email", json!("   "));
        record.set("agreement_accepted", json!(false));
        record.set("matric_year", json!(2019));

        assert!(!record.is_provided("email"));
        assert!(!record.is_provided("agreement_accepted"));
        assert_eq!(record.text("matric_year").as_deref(), Some("2019"));
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut record = ApplicationRecord::new();
        record.set("cnic", json!("12345-1234567-1"));
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value, json!({ "cnic": "12345-1234567-1" }));
    }
}
