//! Multi-verb form page.
//!
//! # Design
//! `FormPage` owns the bridge, transport, and store and one
//! [`VerbFormController`] per configured verb. `load` runs every tab's
//! schema fetch concurrently on the current task (no spawning), together
//! with the optional read-only `GET` of the resource. Completion order across
//! tabs is unconstrained and each failure stays confined to its own tab: it
//! is logged and recorded in the returned [`LoadReport`].

use futures::future::join_all;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::bridge::{HttpBridge, JSON_MIME};
use crate::clipboard::{self, Clipboard, CopyOutcome};
use crate::config::{Layout, PageConfig};
use crate::controller::{SubmitOutcome, TabState, VerbFormController};
use crate::error::FormError;
use crate::form::FormWidget;
use crate::http::{HttpMethod, Transport};
use crate::persist::{Interaction, PersistenceStore, StorageArea};

/// Per-tab outcome of `FormPage::load`.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub rendered: Vec<HttpMethod>,
    pub hidden: Vec<HttpMethod>,
    pub failed: Vec<(HttpMethod, FormError)>,
}

pub struct FormPage<T, A, W> {
    bridge: HttpBridge,
    transport: T,
    store: PersistenceStore<A>,
    tabs: Vec<VerbFormController<W>>,
    initial_read: bool,
    snapshot: Option<Value>,
}

impl<T, A, W> FormPage<T, A, W>
where
    T: Transport,
    A: StorageArea,
    W: FormWidget,
{
    /// Build a page with one tab per configured verb; `widget` creates the
    /// rendering collaborator for each tab.
    pub fn new(
        config: &PageConfig,
        transport: T,
        store: PersistenceStore<A>,
        mut widget: impl FnMut(HttpMethod) -> W,
    ) -> Self {
        let single = config.layout == Layout::Single;
        let path = config.storage_path();
        let tabs = config
            .verbs
            .iter()
            .map(|&verb| VerbFormController::new(verb, &path, single, widget(verb)))
            .collect();
        Self {
            bridge: HttpBridge::new(&config.resource_url),
            transport,
            store,
            tabs,
            initial_read: config.initial_read,
            snapshot: None,
        }
    }

    pub fn bridge(&self) -> &HttpBridge {
        &self.bridge
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &PersistenceStore<A> {
        &self.store
    }

    pub fn tabs(&self) -> &[VerbFormController<W>] {
        &self.tabs
    }

    pub fn tab(&self, verb: HttpMethod) -> Option<&VerbFormController<W>> {
        self.tabs.iter().find(|tab| tab.verb() == verb)
    }

    pub fn tab_mut(&mut self, verb: HttpMethod) -> Option<&mut VerbFormController<W>> {
        self.tabs.iter_mut().find(|tab| tab.verb() == verb)
    }

    /// Resource value read at load time, if the read succeeded.
    pub fn snapshot(&self) -> Option<&Value> {
        self.snapshot.as_ref()
    }

    /// Initialize every tab and show the first rendered one.
    pub async fn load(&mut self) -> LoadReport {
        let bridge = &self.bridge;
        let transport = &self.transport;
        let store = &self.store;
        let initial_read = self.initial_read;

        let tab_loads = join_all(self.tabs.iter_mut().map(|tab| async move {
            let verb = tab.verb();
            (verb, tab.load(bridge, transport, store).await)
        }));
        let read = async {
            if !initial_read {
                return None;
            }
            match bridge.request(transport, HttpMethod::Get, JSON_MIME, "", None).await {
                Ok(value) => value,
                Err(err) => {
                    warn!(error = %err, "initial resource read failed");
                    None
                }
            }
        };
        let (results, snapshot) = futures::join!(tab_loads, read);
        self.snapshot = snapshot;

        let mut report = LoadReport::default();
        for (verb, result) in results {
            match result {
                Ok(()) => {}
                Err(err) => {
                    error!(%verb, error = %err, "tab initialization failed");
                    report.failed.push((verb, err));
                    continue;
                }
            }
            match self.tab(verb).map(VerbFormController::state) {
                Some(TabState::Rendered) => report.rendered.push(verb),
                _ => report.hidden.push(verb),
            }
        }
        if let Some(first) = report.rendered.first().copied() {
            self.select(first);
        }
        info!(
            rendered = report.rendered.len(),
            hidden = report.hidden.len(),
            failed = report.failed.len(),
            "form page loaded"
        );
        report
    }

    /// Make `verb`'s panel the visible one. Returns `false` when that tab
    /// has no rendered form.
    pub fn select(&mut self, verb: HttpMethod) -> bool {
        let selectable = self.tab(verb).is_some_and(VerbFormController::is_rendered);
        if !selectable {
            return false;
        }
        for tab in &mut self.tabs {
            let visible = tab.verb() == verb;
            tab.widget_mut().set_visible(visible);
        }
        true
    }

    /// Submit the form of `verb`.
    pub async fn submit(&mut self, verb: HttpMethod) -> Result<SubmitOutcome, FormError> {
        let Some(tab) = self.tabs.iter_mut().find(|tab| tab.verb() == verb) else {
            return Ok(SubmitOutcome::Ignored);
        };
        tab.submit(&self.bridge, &self.transport).await
    }

    /// A change or blur on a field of `verb`'s form.
    pub fn field_event(&mut self, verb: HttpMethod, interaction: Interaction) -> bool {
        let store = &self.store;
        self.tabs
            .iter_mut()
            .find(|tab| tab.verb() == verb)
            .is_some_and(|tab| tab.on_interaction(store, interaction))
    }

    /// A click anywhere in the document: every rendered form is saved.
    pub fn document_click(&mut self) -> usize {
        let store = &self.store;
        self.tabs
            .iter_mut()
            .map(|tab| tab.on_interaction(store, Interaction::Click))
            .filter(|saved| *saved)
            .count()
    }

    /// Handle a copy command.
    pub fn copy(&self, target: &mut dyn Clipboard) -> CopyOutcome {
        clipboard::export(self.tabs.iter().map(VerbFormController::widget), target)
    }

    pub fn unmount(&mut self) {
        for tab in &mut self.tabs {
            tab.unmount();
        }
    }
}
