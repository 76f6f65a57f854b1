//! Contract with the external form-rendering widget.
//!
//! The widget library itself is out of scope. A controller hands it a
//! [`FormSpec`] and afterwards only reads the live value back and toggles
//! the response area. [`MemoryWidget`] is a headless implementation used by
//! tests and by hosts without a real UI.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::metadata::{DefinitionMeta, FieldMeta};

/// Everything a widget needs to render one verb's form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSpec {
    pub data: Value,
    pub schema: Value,
    pub field_metadata: BTreeMap<String, FieldMeta>,
    pub definition_metadata: BTreeMap<String, DefinitionMeta>,
    pub hidden: bool,
}

/// Strip `required` from the top-level schema so partially filled forms can
/// still be submitted; the server is the one that validates.
pub fn relax_required(schema: &mut Value) {
    if let Value::Object(map) = schema {
        map.remove("required");
    }
}

/// Whether the server described no form at all.
pub fn is_empty_schema(schema: &Value) -> bool {
    match schema {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// The rendering collaborator for one verb panel.
pub trait FormWidget {
    fn render(&mut self, spec: &FormSpec);

    /// Current form value, readable at any time.
    fn value(&self) -> Value;

    /// Show a formatted response, or hide the response area on `None`.
    fn show_response(&mut self, response: Option<&Value>);

    /// Blocking notification to the user.
    fn alert(&mut self, message: &str);

    fn set_visible(&mut self, visible: bool);

    fn is_visible(&self) -> bool;
}

/// Headless widget that records what it was asked to display.
#[derive(Debug, Clone, Default)]
pub struct MemoryWidget {
    spec: Option<FormSpec>,
    value: Value,
    response: Option<String>,
    alerts: Vec<String>,
    visible: bool,
}

impl MemoryWidget {
    pub fn new() -> Self {
        Self {
            value: Value::Object(Map::new()),
            ..Self::default()
        }
    }

    /// Simulate the user editing the form.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub fn spec(&self) -> Option<&FormSpec> {
        self.spec.as_ref()
    }

    /// Text currently shown in the response area, if it is visible.
    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }
}

impl FormWidget for MemoryWidget {
    fn render(&mut self, spec: &FormSpec) {
        self.value = spec.data.clone();
        self.visible = !spec.hidden;
        self.spec = Some(spec.clone());
    }

    fn value(&self) -> Value {
        self.value.clone()
    }

    fn show_response(&mut self, response: Option<&Value>) {
        self.response = response.map(|v| serde_json::to_string_pretty(v).unwrap_or_default());
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}
