//! Per-field display metadata derived from a schema.
//!
//! Labels come from `title`, helper text from `description`, and an optional
//! UI hint from `format` via a [`UiHints`] lookup table. Extraction only
//! reads the schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display metadata for one property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper: Option<String>,
    #[serde(rename = "uiType", skip_serializing_if = "Option::is_none")]
    pub ui_type: Option<String>,
}

/// Field metadata of one named definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionMeta {
    pub fields: BTreeMap<String, FieldMeta>,
}

/// Maps schema `format` values to widget hints.
#[derive(Debug, Clone)]
pub struct UiHints {
    table: BTreeMap<String, String>,
}

impl Default for UiHints {
    fn default() -> Self {
        Self::empty()
            .with("rgb.Hex", "color")
            .with("color", "color")
            .with("date", "date")
            .with("date-time", "datetime")
            .with("email", "email")
            .with("uri", "url")
            .with("password", "password")
    }
}

impl UiHints {
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Add or replace the hint for `format`.
    pub fn with(mut self, format: &str, hint: &str) -> Self {
        self.table.insert(format.to_string(), hint.to_string());
        self
    }

    pub fn lookup(&self, format: &str) -> Option<&str> {
        self.table.get(format).map(String::as_str)
    }
}

/// Field metadata for a whole schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub fields: BTreeMap<String, FieldMeta>,
    pub definitions: BTreeMap<String, DefinitionMeta>,
}

impl FieldMetadata {
    /// Walk `schema.properties` and every definition under `definitions` or
    /// `$defs`. Missing sections yield empty maps.
    pub fn extract(schema: &Value, hints: &UiHints) -> Self {
        let fields = fields_of(schema, hints);
        let mut definitions = BTreeMap::new();
        for key in ["definitions", "$defs"] {
            let Some(section) = schema.get(key).and_then(Value::as_object) else {
                continue;
            };
            for (name, def) in section {
                definitions.insert(
                    name.clone(),
                    DefinitionMeta {
                        fields: fields_of(def, hints),
                    },
                );
            }
        }
        Self {
            fields,
            definitions,
        }
    }
}

fn fields_of(schema: &Value, hints: &UiHints) -> BTreeMap<String, FieldMeta> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return BTreeMap::new();
    };
    properties
        .iter()
        .map(|(key, prop)| (key.clone(), field_meta(prop, hints)))
        .collect()
}

fn field_meta(prop: &Value, hints: &UiHints) -> FieldMeta {
    let text = |key: &str| prop.get(key).and_then(Value::as_str).map(str::to_string);
    FieldMeta {
        label: text("title"),
        helper: text("description"),
        ui_type: prop
            .get("format")
            .and_then(Value::as_str)
            .and_then(|format| hints.lookup(format))
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn top_level_properties_get_label_and_helper() {
        let schema = json!({"properties": {"name": {"title": "Name", "description": "Full name"}}});
        let meta = FieldMetadata::extract(&schema, &UiHints::default());
        assert_eq!(
            serde_json::to_value(&meta.fields).unwrap(),
            json!({"name": {"label": "Name", "helper": "Full name"}})
        );
    }

    #[test]
    fn hex_format_in_definition_maps_to_color_picker() {
        let schema = json!({"definitions": {"Color": {"properties": {"hex": {"format": "rgb.Hex"}}}}});
        let meta = FieldMetadata::extract(&schema, &UiHints::default());
        let hex = &meta.definitions["Color"].fields["hex"];
        assert_eq!(hex.ui_type.as_deref(), Some("color"));
        assert!(hex.label.is_none());
    }

    #[test]
    fn defs_section_is_read_too() {
        let schema = json!({"$defs": {"Address": {"properties": {"city": {"title": "City"}}}}});
        let meta = FieldMetadata::extract(&schema, &UiHints::default());
        assert_eq!(
            meta.definitions["Address"].fields["city"].label.as_deref(),
            Some("City")
        );
    }

    #[test]
    fn no_definitions_means_empty_definition_metadata() {
        let schema = json!({"properties": {"a": {"title": "A"}}});
        let meta = FieldMetadata::extract(&schema, &UiHints::default());
        assert!(meta.definitions.is_empty());
    }

    #[test]
    fn schema_without_properties_yields_nothing() {
        let meta = FieldMetadata::extract(&json!({}), &UiHints::default());
        assert!(meta.fields.is_empty());
        assert!(meta.definitions.is_empty());
    }

    #[test]
    fn unknown_format_has_no_hint() {
        let schema = json!({"properties": {"id": {"format": "uuid"}}});
        let meta = FieldMetadata::extract(&schema, &UiHints::default());
        assert!(meta.fields["id"].ui_type.is_none());
    }

    #[test]
    fn hint_table_is_extensible() {
        let hints = UiHints::default().with("uuid", "text");
        let schema = json!({"properties": {"id": {"format": "uuid"}}});
        let meta = FieldMetadata::extract(&schema, &hints);
        assert_eq!(meta.fields["id"].ui_type.as_deref(), Some("text"));
    }

    #[test]
    fn ui_type_serializes_camel_case() {
        let meta = FieldMeta {
            ui_type: Some("color".to_string()),
            ..FieldMeta::default()
        };
        assert_eq!(serde_json::to_value(&meta).unwrap(), json!({"uiType": "color"}));
    }
}
