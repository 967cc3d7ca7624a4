//! Input formatting state machine.
//!
//! Turns raw edit events (keystrokes, pastes, deletions, selection moves)
//! into a masked display string and the canonical value that gets encrypted.
//!
//! ```text
//!   EditEvent ──► filter ──► commit edit ──► reformat ──► EditOutcome::Changed
//!                  │                          (strip, rules, truncate,
//!                  └─► Rejected                reinsert separators, cursor)
//! ```
//!
//! The display only ever contains ASCII digits and the field's separator, so
//! byte offsets and character offsets coincide.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::params::FieldType;

/// Digits kept for a card number.
pub const MAX_NUMBER_DIGITS: usize = 19;

/// Digits kept for an expiry (`MMYY`).
pub const MAX_EXPIRY_DIGITS: usize = 4;

// ---------------------------------------------------------------------------
// Events and outcomes
// ---------------------------------------------------------------------------

/// Selection range in display offsets. The cursor is `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Offset where the selection was anchored.
    pub start: usize,
    /// Offset of the cursor.
    pub end: usize,
}

impl Selection {
    /// An empty selection at `pos`.
    #[must_use]
    pub const fn collapsed(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// `true` when start and end coincide.
    #[must_use]
    pub const fn is_collapsed(self) -> bool {
        self.start == self.end
    }

    const fn ordered(self) -> (usize, usize) {
        if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        }
    }
}

/// One user edit. A paste is an `Insert` carrying the pasted text.
#[derive(Clone, PartialEq, Eq)]
pub enum EditEvent {
    /// Replace the selection with text.
    Insert(String),
    /// Backspace.
    DeleteBackward,
    /// Delete key.
    DeleteForward,
    /// Selection or cursor moved without editing.
    Select { start: usize, end: usize },
}

impl fmt::Debug for EditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert(text) => write!(f, "Insert(<{} chars>)", text.chars().count()),
            Self::DeleteBackward => f.write_str("DeleteBackward"),
            Self::DeleteForward => f.write_str("DeleteForward"),
            Self::Select { start, end } => write!(f, "Select({start}..{end})"),
        }
    }
}

/// Canonical (separator-free) field value.
///
/// Holds cardholder data: zeroized on drop, masked in `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum FieldValue {
    /// Card number or CVN digits.
    Digits(String),
    /// Expiry split into its month and two-digit year.
    Expiry { month: String, year: String },
}

impl FieldValue {
    /// The values to encrypt, in wire order (month before year).
    #[must_use]
    pub fn parts(&self) -> Vec<&str> {
        match self {
            Self::Digits(digits) => vec![digits.as_str()],
            Self::Expiry { month, year } => vec![month.as_str(), year.as_str()],
        }
    }

    /// `true` when every part is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts().iter().all(|p| p.is_empty())
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldValue(***)")
    }
}

/// What an [`EditEvent`] did to the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Filtered out or a no-op; state unchanged.
    Rejected,
    /// Only the selection changed.
    CursorMoved,
    /// The display was rewritten; carries the new canonical value.
    Changed(FieldValue),
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Display and selection of one field.
pub struct FieldFormatter {
    field_type: FieldType,
    display: Zeroizing<String>,
    selection: Selection,
}

impl fmt::Debug for FieldFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldFormatter")
            .field("field_type", &self.field_type)
            .field("display_len", &self.display.len())
            .field("selection", &self.selection)
            .finish()
    }
}

impl FieldFormatter {
    /// An empty field with the cursor at 0.
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            display: Zeroizing::new(String::new()),
            selection: Selection::default(),
        }
    }

    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Current display string, separators included.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }

    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.selection.end
    }

    /// Canonical value of the current display.
    #[must_use]
    pub fn value(&self) -> FieldValue {
        canonical(self.field_type, &self.display)
    }

    /// Apply one edit.
    pub fn apply(&mut self, event: EditEvent) -> EditOutcome {
        match event {
            EditEvent::Insert(text) => self.insert(&Zeroizing::new(text)),
            EditEvent::DeleteBackward => self.delete(Direction::Backward),
            EditEvent::DeleteForward => self.delete(Direction::Forward),
            EditEvent::Select { start, end } => {
                let len = self.display.len();
                let next = Selection {
                    start: start.min(len),
                    end: end.min(len),
                };
                if next == self.selection {
                    return EditOutcome::Rejected;
                }
                self.selection = next;
                EditOutcome::CursorMoved
            }
        }
    }

    fn insert(&mut self, text: &str) -> EditOutcome {
        let accepted = !text.is_empty()
            && text
                .chars()
                .all(|c| c.is_ascii_digit() || (self.field_type == FieldType::CardExpiry && c == '/'));
        if !accepted {
            return EditOutcome::Rejected;
        }

        let (lo, hi) = self.clamped_range();
        // Only the first digit typed into an empty month gets a leading zero.
        let pad_month = self.field_type == FieldType::CardExpiry
            && !self.display[..lo].bytes().any(|b| b.is_ascii_digit())
            && text.bytes().any(|b| b.is_ascii_digit());
        let mut raw = Zeroizing::new(self.display.to_string());
        raw.replace_range(lo..hi, text);
        let raw_cursor = lo.saturating_add(text.len());
        self.commit(&raw, raw_cursor, Commit::Insert { pad_month })
    }

    fn delete(&mut self, direction: Direction) -> EditOutcome {
        let (lo, hi) = self.clamped_range();
        let len = self.display.len();

        if lo != hi {
            let mut raw = Zeroizing::new(self.display.to_string());
            raw.replace_range(lo..hi, "");
            return self.commit(&raw, lo, Commit::Delete);
        }

        let cursor = lo;
        let target = match direction {
            Direction::Backward if cursor == 0 => return EditOutcome::Rejected,
            Direction::Backward => cursor.saturating_sub(1),
            Direction::Forward if cursor >= len => return EditOutcome::Rejected,
            Direction::Forward => cursor,
        };

        let on_separator = self
            .display
            .as_bytes()
            .get(target)
            .is_some_and(|&b| is_separator(self.field_type, char::from(b)));
        if on_separator {
            let moved = match direction {
                Direction::Backward => target,
                Direction::Forward => target.saturating_add(1),
            };
            self.selection = Selection::collapsed(moved);
            return EditOutcome::CursorMoved;
        }

        let mut raw = Zeroizing::new(self.display.to_string());
        raw.remove(target);
        self.commit(&raw, target, Commit::Delete)
    }

    /// Reformat `raw` and store the result.
    ///
    /// After an insertion, or any edit of a collapsed selection, the cursor
    /// follows the digit it sat behind. Deleting a selection keeps the raw
    /// offset.
    fn commit(&mut self, raw: &str, raw_cursor: usize, kind: Commit) -> EditOutcome {
        let follow_digits = self.selection.is_collapsed() || matches!(kind, Commit::Insert { .. });
        let pad_month = matches!(kind, Commit::Insert { pad_month: true });
        let raw_cursor = raw_cursor.min(raw.len());
        let digits_before = raw[..raw_cursor].bytes().filter(u8::is_ascii_digit).count();

        let (digits, digits_before) = normalize_digits(self.field_type, raw, digits_before, pad_month);
        let display = Zeroizing::new(layout(self.field_type, &digits));

        let cursor = if follow_digits {
            cursor_after_digits(self.field_type, &display, digits_before)
        } else {
            raw_cursor.min(display.len())
        };

        self.display = display;
        self.selection = Selection::collapsed(cursor);
        EditOutcome::Changed(self.value())
    }

    fn clamped_range(&self) -> (usize, usize) {
        let len = self.display.len();
        let (lo, hi) = self.selection.ordered();
        (lo.min(len), hi.min(len))
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Backward,
    Forward,
}

#[derive(Clone, Copy)]
enum Commit {
    Insert { pad_month: bool },
    Delete,
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// Maximum digit count for a field, `None` when unbounded.
#[must_use]
pub const fn max_digits(field_type: FieldType) -> Option<usize> {
    match field_type {
        FieldType::CardNumber => Some(MAX_NUMBER_DIGITS),
        FieldType::CardExpiry => Some(MAX_EXPIRY_DIGITS),
        FieldType::CardCvn => None,
    }
}

/// `true` if `c` is the separator the field inserts itself.
#[must_use]
pub const fn is_separator(field_type: FieldType, c: char) -> bool {
    match field_type {
        FieldType::CardNumber => c == ' ',
        FieldType::CardExpiry => c == '/',
        FieldType::CardCvn => false,
    }
}

/// Strip everything but digits, zero-pad a 2–9 month when `pad_month` is set
/// and truncate. `digits_before` is shifted and clamped alongside.
fn normalize_digits(
    field_type: FieldType,
    raw: &str,
    digits_before: usize,
    pad_month: bool,
) -> (Zeroizing<String>, usize) {
    let mut digits = Zeroizing::new(raw.chars().filter(char::is_ascii_digit).collect::<String>());
    let mut digits_before = digits_before;

    if pad_month
        && field_type == FieldType::CardExpiry
        && digits.starts_with(|c: char| ('2'..='9').contains(&c))
    {
        digits.insert(0, '0');
        if digits_before > 0 {
            digits_before = digits_before.saturating_add(1);
        }
    }

    if let Some(max) = max_digits(field_type) {
        digits.truncate(max);
    }
    let len = digits.len();
    (digits, digits_before.min(len))
}

/// Reinsert separators into a digit string.
fn layout(field_type: FieldType, digits: &str) -> String {
    let mut out = String::with_capacity(digits.len().saturating_add(digits.len() / 4));
    for (i, c) in digits.chars().enumerate() {
        out.push(c);
        match field_type {
            FieldType::CardNumber if i % 4 == 3 => out.push(' '),
            FieldType::CardExpiry if i == 1 => out.push('/'),
            _ => {}
        }
    }
    out
}

/// Offset just after the `n`-th digit of `display`, past a separator that
/// immediately follows it.
fn cursor_after_digits(field_type: FieldType, display: &str, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut seen = 0usize;
    for (i, b) in display.bytes().enumerate() {
        if !b.is_ascii_digit() {
            continue;
        }
        seen = seen.saturating_add(1);
        if seen == n {
            let after = i.saturating_add(1);
            let skip = display
                .as_bytes()
                .get(after)
                .is_some_and(|&next| is_separator(field_type, char::from(next)));
            return if skip { after.saturating_add(1) } else { after };
        }
    }
    display.len()
}

/// Strip, truncate and re-separate an arbitrary string.
///
/// The expiry leading zero is not applied here; it only follows a typed
/// month digit. Applying `format` to its own output, or to any display a
/// [`FieldFormatter`] produced, returns it unchanged.
#[must_use]
pub fn format(field_type: FieldType, raw: &str) -> String {
    let (digits, _) = normalize_digits(field_type, raw, 0, false);
    layout(field_type, &digits)
}

/// Canonical value of a display string.
#[must_use]
pub fn canonical(field_type: FieldType, display: &str) -> FieldValue {
    let digits: String = display.chars().filter(char::is_ascii_digit).collect();
    match field_type {
        FieldType::CardExpiry => {
            let split = digits.len().min(2);
            FieldValue::Expiry {
                month: digits[..split].to_string(),
                year: digits[split..].to_string(),
            }
        }
        FieldType::CardNumber | FieldType::CardCvn => FieldValue::Digits(digits),
    }
}
