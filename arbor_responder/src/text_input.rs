// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Suppression of committed text that a key-down handler already handled.
//!
//! Platforms that deliver key events and committed text on separate channels produce a
//! `'\t'` or `'\r'` text event after a handled Tab or Enter key-down. A handler that wants
//! to swallow that duplicate calls
//! [`suppress_next_from_handled_key_down`](TextInputSuppression::suppress_next_from_handled_key_down);
//! the text path then asks [`try_consume_char`](TextInputSuppression::try_consume_char).
//!
//! ```
//! use arbor_responder::text_input::{SuppressibleKey, TextInputSuppression};
//!
//! let mut s = TextInputSuppression::default();
//! s.reset_per_key_down();
//! s.suppress_next_from_handled_key_down(SuppressibleKey::Enter);
//! assert!(s.try_consume_char('\r'));
//! assert!(!s.try_consume_char('\r'));
//! assert!(!s.try_consume_char('a'));
//! ```

bitflags::bitflags! {
    /// Keys whose next committed character is pending suppression.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SuppressedKeys: u8 {
        /// Tab; suppresses `'\t'`.
        const TAB = 1 << 0;
        /// Enter; suppresses `'\r'` or `'\n'`.
        const ENTER = 1 << 1;
    }
}

/// Keys eligible for suppression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SuppressibleKey {
    /// The Tab key.
    Tab,
    /// The Enter/Return key.
    Enter,
}

impl SuppressibleKey {
    /// Flag for this key.
    pub const fn flag(self) -> SuppressedKeys {
        match self {
            Self::Tab => SuppressedKeys::TAB,
            Self::Enter => SuppressedKeys::ENTER,
        }
    }

    /// The key whose committed text is `c`, if any.
    pub const fn for_char(c: char) -> Option<Self> {
        match c {
            '\t' => Some(Self::Tab),
            '\r' | '\n' => Some(Self::Enter),
            _ => None,
        }
    }
}

/// Per-window suppression flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TextInputSuppression {
    pending: SuppressedKeys,
}

impl TextInputSuppression {
    /// Clear all pending suppression. Called at the start of every key-down dispatch.
    pub fn reset_per_key_down(&mut self) {
        self.pending = SuppressedKeys::empty();
    }

    /// Drop the next committed character produced by `key`.
    pub fn suppress_next_from_handled_key_down(&mut self, key: SuppressibleKey) {
        self.pending |= key.flag();
    }

    /// Returns true, once, if `c` is the pending duplicate of a handled key.
    pub fn try_consume_char(&mut self, c: char) -> bool {
        match SuppressibleKey::for_char(c) {
            Some(key) if self.pending.contains(key.flag()) => {
                self.pending.remove(key.flag());
                log::trace!("suppressed committed {c:?} after handled {key:?}");
                true
            }
            _ => false,
        }
    }

    /// Keys currently pending suppression.
    pub fn pending(&self) -> SuppressedKeys {
        self.pending
    }
}
