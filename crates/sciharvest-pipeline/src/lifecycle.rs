//! Per-item state machine

use std::fmt;

/// PENDING → RESOLVING → DOWNLOADING → EXTRACTING → DONE.
///
/// Stages may be skipped forward (a failed resolve goes straight to `Done`)
/// but never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ItemState {
    Pending,
    Resolving,
    Downloading,
    Extracting,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: ItemState,
    pub to: ItemState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

impl ItemState {
    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }

    /// Move strictly forward
    pub fn advance(&mut self, next: ItemState) -> Result<(), InvalidTransition> {
        if next <= *self {
            return Err(InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

impl Default for ItemState {
    fn default() -> Self {
        Self::Pending
    }
}
