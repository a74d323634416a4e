use crate::schedule::{Epoch, EpochCounter};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypewriterPhase {
    #[default]
    Idle,
    Typing,
    Done,
}

impl TypewriterPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TypewriterPhase::Idle => "idle",
            TypewriterPhase::Typing => "typing",
            TypewriterPhase::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypewriterTick {
    /// The tick belongs to a superseded target.
    Stale,
    Typed,
    /// The target is fully revealed; the host should stop its timer.
    Done,
}

/// Character-by-character reveal of a target string.
///
/// Lengths count `char`s, so a partial reveal never splits a code point.
#[derive(Debug, Clone, Default)]
pub struct TypewriterSession {
    target_text: String,
    target_len: usize,
    revealed_length: usize,
    is_active: bool,
    has_target: bool,
    epochs: EpochCounter,
}

impl TypewriterSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_text(&self) -> &str {
        &self.target_text
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn revealed_length(&self) -> usize {
        self.revealed_length
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn phase(&self) -> TypewriterPhase {
        if !self.has_target {
            TypewriterPhase::Idle
        } else if self.is_active {
            TypewriterPhase::Typing
        } else {
            TypewriterPhase::Done
        }
    }

    /// Replace the target and restart from zero. Any tick carrying an older
    /// epoch is rejected from here on.
    pub fn set_target(&mut self, text: impl Into<String>) -> Epoch {
        self.target_text = text.into();
        self.target_len = self.target_text.chars().count();
        self.revealed_length = 0;
        self.is_active = self.target_len > 0;
        self.has_target = true;
        self.epochs.advance()
    }

    pub fn tick(&mut self, epoch: Epoch) -> TypewriterTick {
        if !self.epochs.is_current(epoch) {
            return TypewriterTick::Stale;
        }
        if !self.is_active {
            return TypewriterTick::Done;
        }

        self.revealed_length += 1;
        if self.revealed_length >= self.target_len {
            self.revealed_length = self.target_len;
            self.is_active = false;
            TypewriterTick::Done
        } else {
            TypewriterTick::Typed
        }
    }

    /// Stop typing where it is (teardown).
    pub fn halt(&mut self) {
        self.is_active = false;
        self.epochs.advance();
    }

    pub fn visible_text(&self) -> &str {
        let end = self
            .target_text
            .char_indices()
            .nth(self.revealed_length)
            .map(|(i, _)| i)
            .unwrap_or(self.target_text.len());
        &self.target_text[..end]
    }
}
