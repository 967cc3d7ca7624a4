//! The visible input the frame drives.
//!
//! The browser input element lives outside this crate; [`FieldSurface`] is
//! the seam. [`HeadlessSurface`] keeps the last rendered state in memory.

use std::fmt;

use zeroize::Zeroizing;

use crate::formatting::Selection;
use crate::params::Appearance;

/// Operations the session performs on the rendered field.
pub trait FieldSurface {
    /// Give the input keyboard focus.
    fn focus(&mut self);

    /// Remove keyboard focus.
    fn blur(&mut self);

    /// Show `display` with the given selection.
    fn render(&mut self, display: &str, selection: Selection);

    /// Replace the input with an inline failure indicator showing `code`.
    fn render_failure(&mut self, code: &'static str);

    /// Apply sanitized host styling.
    fn apply_appearance(&mut self, appearance: &Appearance);
}

/// In-memory surface.
#[derive(Default)]
pub struct HeadlessSurface {
    focused: bool,
    display: Zeroizing<String>,
    selection: Selection,
    failure: Option<&'static str>,
    appearance: Appearance,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_focused(&self) -> bool {
        self.focused
    }

    /// Last rendered display string.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }

    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    /// Code shown by the failure indicator, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&'static str> {
        self.failure
    }

    #[must_use]
    pub const fn appearance(&self) -> &Appearance {
        &self.appearance
    }
}

impl fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessSurface")
            .field("focused", &self.focused)
            .field("display_len", &self.display.len())
            .field("selection", &self.selection)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

impl FieldSurface for HeadlessSurface {
    fn focus(&mut self) {
        self.focused = true;
    }

    fn blur(&mut self) {
        self.focused = false;
    }

    fn render(&mut self, display: &str, selection: Selection) {
        self.display = Zeroizing::new(display.to_string());
        self.selection = selection;
    }

    fn render_failure(&mut self, code: &'static str) {
        self.display = Zeroizing::new(String::new());
        self.selection = Selection::default();
        self.failure = Some(code);
    }

    fn apply_appearance(&mut self, appearance: &Appearance) {
        self.appearance = appearance.clone();
    }
}
