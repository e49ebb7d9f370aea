// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the element tree: identifiers, flags, and per-element state.

/// Identifier for an element in the tree.
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `ElementId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `ElementId`.
///
/// ### Liveness
///
/// Use [`Tree::is_alive`](crate::Tree::is_alive) to check whether an `ElementId` still refers to a live element.
/// Stale ids never alias a different live element because the generation must match.
///
/// ### Notes
///
/// - The generation increments on slot reuse and never decreases.
/// - `u32` is ample for practical lifetimes; behavior on generation overflow is unspecified.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ElementId(pub(crate) u32, pub(crate) u32);

impl ElementId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Pack the id into a single `u64` (slot in the low half, generation in the high half).
    ///
    /// Useful as a coalescing key or a map key in layers that do not depend on this crate.
    pub const fn to_bits(self) -> u64 {
        ((self.1 as u64) << 32) | self.0 as u64
    }
}

bitflags::bitflags! {
    /// Element flags set by application code.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// Element is visible (rendered, hit-testable, focusable).
        const VISIBLE          = 0b0000_0001;
        /// Element is enabled. The effective value also depends on every ancestor.
        const ENABLED          = 0b0000_0010;
        /// Element can receive keyboard focus.
        const FOCUSABLE        = 0b0000_0100;
        /// Element participates in hit testing.
        const HIT_TEST_VISIBLE = 0b0000_1000;
    }
}

impl Default for ElementFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::ENABLED | Self::HIT_TEST_VISIBLE
    }
}

bitflags::bitflags! {
    /// Interaction state maintained by the input and focus layers.
    ///
    /// Stored on the element so styling code can read it without a side table.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ElementState: u8 {
        /// Element holds keyboard focus.
        const FOCUSED      = 0b0000_0001;
        /// Element or one of its (popup-aware) descendants holds keyboard focus.
        const FOCUS_WITHIN = 0b0000_0010;
        /// Pointer is over the element or one of its descendants.
        const POINTER_OVER = 0b0000_0100;
        /// Element holds the window's pointer capture.
        const CAPTURED     = 0b0000_1000;
    }
}

bitflags::bitflags! {
    /// Pending layout and render work for an element.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        /// Desired size must be recomputed.
        const MEASURE = 0b0000_0001;
        /// Bounds must be recomputed.
        const ARRANGE = 0b0000_0010;
        /// Element must be repainted; does not affect layout.
        const VISUAL  = 0b0000_0100;
    }
}

impl DirtyFlags {
    /// Flags carried by a freshly inserted element.
    pub const NEW: Self = Self::all();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_are_interactive_but_not_focusable() {
        let flags = ElementFlags::default();
        assert!(flags.contains(ElementFlags::VISIBLE | ElementFlags::ENABLED));
        assert!(flags.contains(ElementFlags::HIT_TEST_VISIBLE));
        assert!(!flags.contains(ElementFlags::FOCUSABLE));
    }

    #[test]
    fn bits_keep_slot_and_generation_apart() {
        let a = ElementId::new(3, 1);
        let b = ElementId::new(3, 2);
        assert_ne!(a.to_bits(), b.to_bits());
        assert_eq!(a.to_bits() & 0xffff_ffff, 3);
        assert_eq!(b.to_bits() >> 32, 2);
    }
}
