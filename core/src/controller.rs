//! Per-verb form lifecycle.
//!
//! # Design
//! A `VerbFormController` owns one verb's [`FormState`] and its widget and
//! walks the states
//! `Uninitialized -> SchemaLoaded -> Rendered -> (Submitting <-> Rendered)`,
//! with `Hidden` for verbs the server has no form for, `Failed` for schemas
//! that cannot be resolved, and `Unmounted` once the page goes away.
//!
//! Like [`HttpBridge`], each network step is split into a request-building
//! half and a response-applying half (`schema_request` / `apply_schema`,
//! `begin_submit` / `finish_submit`). `load` and `submit` compose them over a
//! [`Transport`]; hosts that do their own I/O call the halves directly.
//! Failures are returned to the caller and never touch other controllers.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::bridge::HttpBridge;
use crate::error::{BridgeError, FormError};
use crate::form::{is_empty_schema, relax_required, FormSpec, FormWidget};
use crate::http::{HttpMethod, HttpRequest, Transport};
use crate::metadata::{DefinitionMeta, FieldMeta, FieldMetadata, UiHints};
use crate::persist::{storage_key, Interaction, PersistenceStore, StorageArea};
use crate::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabState {
    Uninitialized,
    SchemaLoaded,
    Rendered,
    Submitting,
    /// No form for this verb: the schema fetch failed or was empty.
    Hidden,
    /// The schema could not be resolved.
    Failed,
    Unmounted,
}

/// What a finished submission did to the response area.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The response was shown.
    Shown(Value),
    /// The server returned no value; the response area was hidden.
    Cleared,
    /// The submit was not started: another one is in flight or the tab is
    /// not rendered.
    Ignored,
    /// The tab was unmounted while the request was in flight.
    Discarded,
}

/// State of one rendered verb form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub verb: HttpMethod,
    pub path: String,
    pub schema: Value,
    pub fields: BTreeMap<String, FieldMeta>,
    pub definitions: BTreeMap<String, DefinitionMeta>,
    pub data: Value,
}

#[derive(Debug)]
pub struct VerbFormController<W> {
    verb: HttpMethod,
    path: String,
    single: bool,
    hints: UiHints,
    state: TabState,
    form: Option<FormState>,
    widget: W,
}

impl<W: FormWidget> VerbFormController<W> {
    /// Controller for `verb` on the resource at `path`. `single` selects the
    /// single-verb layout: no `method` query on the schema fetch and a storage
    /// key without the verb.
    pub fn new(verb: HttpMethod, path: &str, single: bool, widget: W) -> Self {
        Self {
            verb,
            path: path.to_string(),
            single,
            hints: UiHints::default(),
            state: TabState::Uninitialized,
            form: None,
            widget,
        }
    }

    pub fn with_hints(mut self, hints: UiHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn verb(&self) -> HttpMethod {
        self.verb
    }

    pub fn state(&self) -> TabState {
        self.state
    }

    pub fn form(&self) -> Option<&FormState> {
        self.form.as_ref()
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.state, TabState::Rendered | TabState::Submitting)
    }

    pub fn storage_key(&self) -> String {
        let verb = if self.single { None } else { Some(self.verb) };
        storage_key(verb, &self.path)
    }

    pub fn schema_request(&self, bridge: &HttpBridge) -> HttpRequest {
        let verb = if self.single { None } else { Some(self.verb) };
        bridge.schema_request(verb)
    }

    /// Apply the outcome of the schema fetch: resolve, extract metadata,
    /// restore persisted data, and render.
    ///
    /// A failed fetch or an empty schema hides the tab. Only the fetch
    /// failure is reported as an error.
    pub fn apply_schema<A: StorageArea>(
        &mut self,
        fetched: Result<Option<Value>, BridgeError>,
        store: &PersistenceStore<A>,
    ) -> Result<(), FormError> {
        if self.state != TabState::Uninitialized {
            warn!(verb = %self.verb, state = ?self.state, "schema applied twice, ignoring");
            return Ok(());
        }
        let mut schema = match fetched {
            Ok(Some(schema)) if !is_empty_schema(&schema) => schema,
            Ok(_) => {
                debug!(verb = %self.verb, "no schema for verb, hiding tab");
                self.hide(TabState::Hidden);
                return Ok(());
            }
            Err(err) => {
                self.hide(TabState::Hidden);
                return Err(FormError::SchemaFetch(err));
            }
        };
        self.state = TabState::SchemaLoaded;

        if let Err(err) = schema::resolve(&mut schema) {
            self.hide(TabState::Failed);
            return Err(err.into());
        }
        relax_required(&mut schema);
        let metadata = FieldMetadata::extract(&schema, &self.hints);
        let data = store.load(&self.storage_key());

        let spec = FormSpec {
            data: data.clone(),
            schema: schema.clone(),
            field_metadata: metadata.fields.clone(),
            definition_metadata: metadata.definitions.clone(),
            hidden: false,
        };
        self.widget.render(&spec);
        self.form = Some(FormState {
            verb: self.verb,
            path: self.path.clone(),
            schema,
            fields: metadata.fields,
            definitions: metadata.definitions,
            data,
        });
        self.state = TabState::Rendered;
        debug!(verb = %self.verb, "form rendered");
        Ok(())
    }

    fn hide(&mut self, state: TabState) {
        self.state = state;
        self.widget.set_visible(false);
    }

    /// Persist the widget's current value after a user interaction.
    pub fn on_interaction<A: StorageArea>(
        &mut self,
        store: &PersistenceStore<A>,
        interaction: Interaction,
    ) -> bool {
        if !self.is_rendered() {
            return false;
        }
        let value = self.widget.value();
        let saved = store.save(&self.storage_key(), &value);
        if saved {
            debug!(verb = %self.verb, ?interaction, "form value saved");
            if let Some(form) = self.form.as_mut() {
                form.data = value;
            }
        }
        saved
    }

    /// Start a submission with the widget's current value.
    ///
    /// Returns `Ok(None)` when the submit must be ignored because one is
    /// already in flight or the tab is not rendered.
    pub fn begin_submit(&mut self, bridge: &HttpBridge) -> Result<Option<HttpRequest>, FormError> {
        if self.state != TabState::Rendered {
            debug!(verb = %self.verb, state = ?self.state, "submit ignored");
            return Ok(None);
        }
        let value = self.widget.value();
        let request = match bridge.submit_request(self.verb, &value) {
            Ok(request) => request,
            Err(err) => {
                self.widget.alert(&err.to_string());
                return Err(FormError::Submit(err));
            }
        };
        if let Some(form) = self.form.as_mut() {
            form.data = value;
        }
        self.state = TabState::Submitting;
        Ok(Some(request))
    }

    /// Apply the outcome of a submission started by `begin_submit`.
    pub fn finish_submit(
        &mut self,
        result: Result<Option<Value>, BridgeError>,
    ) -> Result<SubmitOutcome, FormError> {
        if self.state != TabState::Submitting {
            debug!(verb = %self.verb, state = ?self.state, "late submit result discarded");
            return Ok(SubmitOutcome::Discarded);
        }
        self.state = TabState::Rendered;
        match result {
            Ok(Some(value)) => {
                self.widget.show_response(Some(&value));
                Ok(SubmitOutcome::Shown(value))
            }
            Ok(None) => {
                self.widget.show_response(None);
                Ok(SubmitOutcome::Cleared)
            }
            Err(err) => {
                warn!(verb = %self.verb, error = %err, "submit failed");
                self.widget.alert(&err.to_string());
                Err(FormError::Submit(err))
            }
        }
    }

    /// Fetch this verb's schema and render the form.
    pub async fn load<T: Transport, A: StorageArea>(
        &mut self,
        bridge: &HttpBridge,
        transport: &T,
        store: &PersistenceStore<A>,
    ) -> Result<(), FormError> {
        let request = self.schema_request(bridge);
        let fetched = bridge.send(transport, request).await;
        self.apply_schema(fetched, store)
    }

    /// Submit the form's current value and display the result.
    pub async fn submit<T: Transport>(
        &mut self,
        bridge: &HttpBridge,
        transport: &T,
    ) -> Result<SubmitOutcome, FormError> {
        let Some(request) = self.begin_submit(bridge)? else {
            return Ok(SubmitOutcome::Ignored);
        };
        let result = bridge.send(transport, request).await;
        self.finish_submit(result)
    }

    pub fn unmount(&mut self) {
        self.state = TabState::Unmounted;
        self.widget.set_visible(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::MemoryWidget;
    use crate::http::HttpResponse;
    use crate::persist::MemoryArea;
    use serde_json::json;

    fn controller(verb: HttpMethod) -> VerbFormController<MemoryWidget> {
        VerbFormController::new(verb, "/profile", false, MemoryWidget::new())
    }

    fn store() -> PersistenceStore<MemoryArea> {
        PersistenceStore::new(MemoryArea::new())
    }

    fn bridge() -> HttpBridge {
        HttpBridge::new("http://localhost:3000/profile")
    }

    fn rendered(verb: HttpMethod) -> VerbFormController<MemoryWidget> {
        let mut c = controller(verb);
        let schema = json!({"properties": {"x": {"type": "number"}}});
        c.apply_schema(Ok(Some(schema)), &store()).unwrap();
        c
    }

    #[test]
    fn schema_is_resolved_and_rendered() {
        let mut c = controller(HttpMethod::Put);
        let schema = json!({
            "required": ["name"],
            "properties": {
                "name": {"title": "Name", "description": "Full name"},
                "colour": {"$ref": "#/$defs/Color"}
            },
            "$defs": {"Color": {"type": "object", "properties": {"hex": {"format": "rgb.Hex"}}}}
        });
        c.apply_schema(Ok(Some(schema)), &store()).unwrap();

        assert_eq!(c.state(), TabState::Rendered);
        let spec = c.widget().spec().unwrap();
        assert!(!schema::has_references(&spec.schema));
        assert!(spec.schema.get("required").is_none());
        assert_eq!(spec.field_metadata["name"].label.as_deref(), Some("Name"));
        assert_eq!(
            spec.definition_metadata["Color"].fields["hex"].ui_type.as_deref(),
            Some("color")
        );
        assert!(c.widget().is_visible());
    }

    #[test]
    fn persisted_data_is_restored() {
        let s = store();
        s.save("POST /profile", &json!({"x": 7}));
        let mut c = controller(HttpMethod::Post);
        c.apply_schema(Ok(Some(json!({"properties": {"x": {}}}))), &s)
            .unwrap();
        assert_eq!(c.widget().value(), json!({"x": 7}));
        assert_eq!(c.form().unwrap().data, json!({"x": 7}));
    }

    #[test]
    fn empty_schema_hides_tab_without_error() {
        let mut c = controller(HttpMethod::Get);
        c.apply_schema(Ok(Some(json!({}))), &store()).unwrap();
        assert_eq!(c.state(), TabState::Hidden);
        assert!(!c.widget().is_visible());
    }

    #[test]
    fn fetch_failure_hides_tab_and_reports() {
        let mut c = controller(HttpMethod::Delete);
        let err = c
            .apply_schema(
                Err(BridgeError::Status {
                    status: 404,
                    body: String::new(),
                }),
                &store(),
            )
            .unwrap_err();
        assert!(matches!(err, FormError::SchemaFetch(_)));
        assert_eq!(c.state(), TabState::Hidden);
    }

    #[test]
    fn cyclic_schema_fails_the_tab() {
        let mut c = controller(HttpMethod::Post);
        let schema = json!({
            "properties": {"n": {"$ref": "#/$defs/N"}},
            "$defs": {"N": {"type": "object", "properties": {"n": {"$ref": "#/$defs/N"}}}}
        });
        let err = c.apply_schema(Ok(Some(schema)), &store()).unwrap_err();
        assert!(matches!(err, FormError::Schema(_)));
        assert_eq!(c.state(), TabState::Failed);
        assert!(c.widget().spec().is_none());
    }

    #[test]
    fn oversized_schema_fails_only_this_tab() {
        let mut defs = serde_json::Map::new();
        for i in 0..40 {
            let next = format!("#/$defs/T{}", i + 1);
            defs.insert(
                format!("T{i}"),
                json!({"type": "object", "properties": {"l": {"$ref": next}, "r": {"$ref": next}}}),
            );
        }
        defs.insert("T40".to_string(), json!({"type": "object", "properties": {}}));
        let schema = json!({"properties": {"t": {"$ref": "#/$defs/T0"}}, "$defs": defs});

        let s = store();
        let mut big = controller(HttpMethod::Post);
        let err = big.apply_schema(Ok(Some(schema)), &s).unwrap_err();
        assert!(matches!(err, FormError::Schema(crate::error::SchemaError::TooLarge { .. })));
        assert_eq!(big.state(), TabState::Failed);

        let sibling = rendered(HttpMethod::Put);
        assert_eq!(sibling.state(), TabState::Rendered);
    }

    #[test]
    fn single_verb_layout_uses_plain_key_and_no_query() {
        let c = VerbFormController::new(HttpMethod::Post, "/profile", true, MemoryWidget::new());
        assert_eq!(c.storage_key(), "/profile");
        assert_eq!(c.schema_request(&bridge()).path, "http://localhost:3000/profile");
    }

    #[test]
    fn interaction_persists_current_value() {
        let s = store();
        let mut c = rendered(HttpMethod::Put);
        c.widget_mut().set_value(json!({"x": 3}));
        assert!(c.on_interaction(&s, Interaction::Blur));
        assert_eq!(s.load("PUT /profile"), json!({"x": 3}));
    }

    #[test]
    fn interaction_before_render_is_ignored() {
        let s = store();
        let mut c = controller(HttpMethod::Put);
        c.widget_mut().set_value(json!({"x": 3}));
        assert!(!c.on_interaction(&s, Interaction::Click));
        assert!(s.area().is_empty());
    }

    #[test]
    fn second_submit_while_in_flight_is_ignored() {
        let mut c = rendered(HttpMethod::Put);
        assert!(c.begin_submit(&bridge()).unwrap().is_some());
        assert_eq!(c.state(), TabState::Submitting);
        assert!(c.begin_submit(&bridge()).unwrap().is_none());
    }

    #[test]
    fn get_submit_has_no_body() {
        let mut c = rendered(HttpMethod::Get);
        c.widget_mut().set_value(json!({"x": 1}));
        let req = c.begin_submit(&bridge()).unwrap().unwrap();
        assert!(req.body.is_none());
        assert_eq!(req.path, "http://localhost:3000/profile");
    }

    #[test]
    fn no_content_hides_stale_response() {
        let b = bridge();
        let mut c = rendered(HttpMethod::Put);
        c.begin_submit(&b).unwrap();
        c.finish_submit(Ok(Some(json!({"old": true})))).unwrap();
        assert!(c.widget().response().is_some());

        c.begin_submit(&b).unwrap();
        let outcome = c
            .finish_submit(b.interpret(HttpResponse::new(204, "")))
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Cleared);
        assert!(c.widget().response().is_none());
    }

    #[test]
    fn failed_submit_alerts_and_allows_retry() {
        let b = bridge();
        let mut c = rendered(HttpMethod::Post);
        c.widget_mut().set_value(json!({"x": 9}));
        c.begin_submit(&b).unwrap();
        let err = c
            .finish_submit(b.interpret(HttpResponse::new(422, "bad x")))
            .unwrap_err();
        assert!(matches!(err, FormError::Submit(BridgeError::Status { status: 422, .. })));
        assert_eq!(c.widget().alerts().len(), 1);
        assert!(c.widget().alerts()[0].contains("bad x"));
        assert_eq!(c.state(), TabState::Rendered);
        assert_eq!(c.widget().value(), json!({"x": 9}));
        assert!(c.begin_submit(&b).unwrap().is_some());
    }

    #[test]
    fn result_after_unmount_is_discarded() {
        let mut c = rendered(HttpMethod::Put);
        c.begin_submit(&bridge()).unwrap();
        c.unmount();
        let outcome = c.finish_submit(Ok(Some(json!({"late": 1})))).unwrap();
        assert_eq!(outcome, SubmitOutcome::Discarded);
        assert!(c.widget().response().is_none());
        assert_eq!(c.state(), TabState::Unmounted);
    }
}
