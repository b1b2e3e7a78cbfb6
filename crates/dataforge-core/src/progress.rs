use serde::Serialize;

/// Maximum number of characters kept from an output line.
pub const MAX_PROGRESS_CHARS: usize = 100;

const ELLIPSIS: &str = "...";
const FINISHING_TEXT: &str = "process finishing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    /// Derived from an output line.
    Output,
    /// Both output streams closed; the process is about to end.
    Finishing,
}

/// Display-only projection of the latest output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub text: String,
    pub kind: ProgressKind,
}

impl ProgressSnapshot {
    /// Build a snapshot from an output line, truncating to
    /// [`MAX_PROGRESS_CHARS`] characters plus `...`.
    pub fn from_line(line: &str) -> Self {
        Self {
            text: truncate(line, MAX_PROGRESS_CHARS),
            kind: ProgressKind::Output,
        }
    }

    pub fn finishing() -> Self {
        Self {
            text: FINISHING_TEXT.to_string(),
            kind: ProgressKind::Finishing,
        }
    }

    pub fn is_finishing(&self) -> bool {
        self.kind == ProgressKind::Finishing
    }
}

/// Truncate on a character boundary, appending `...` when anything was cut.
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
