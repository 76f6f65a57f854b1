//! Copy-command export of the visible form as structured JSON.

use tracing::debug;

use crate::form::FormWidget;

/// MIME type the form value is placed under.
pub const CLIPBOARD_MIME: &str = "application/json";

/// Destination of an intercepted copy command.
pub trait Clipboard {
    fn set_data(&mut self, mime: &str, data: &str);
}

/// Whether the host should suppress its default copy action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The visible form's value was placed on the clipboard.
    Exported,
    /// No panel is visible; leave the default copy behavior alone.
    Default,
}

/// Export the first visible panel's current value, JSON-serialized.
pub fn export<'a, W, I>(panels: I, clipboard: &mut dyn Clipboard) -> CopyOutcome
where
    W: FormWidget + 'a,
    I: IntoIterator<Item = &'a W>,
{
    let Some(panel) = panels.into_iter().find(|panel| panel.is_visible()) else {
        return CopyOutcome::Default;
    };
    let data = panel.value().to_string();
    debug!(bytes = data.len(), "exporting form value to clipboard");
    clipboard.set_data(CLIPBOARD_MIME, &data);
    CopyOutcome::Exported
}
