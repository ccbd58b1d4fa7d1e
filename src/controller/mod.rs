//! Gamepad input for the demo
//!
//! The input loop only cares about edges: which buttons went down since the previous
//! read. [`InputSource`] hands out exactly that once per loop iteration, so a held
//! button triggers its command once.
//!
//! ```text
//! Gamepad ──► GamepadInput (gilrs) ──► ButtonSet ──► CommandDispatcher
//! ```

pub mod event_collector;

pub use event_collector::GamepadInput;

use std::fmt;

/// Buttons the demo reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    X,
    Y,
    L,
    /// Leaves the demo
    Home,
}

impl Button {
    pub const ALL: [Button; 6] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::L,
        Button::Home,
    ];

    const fn bit(self) -> u8 {
        match self {
            Button::A => 1 << 0,
            Button::B => 1 << 1,
            Button::X => 1 << 2,
            Button::Y => 1 << 3,
            Button::L => 1 << 4,
            Button::Home => 1 << 5,
        }
    }
}

/// Buttons newly pressed during one frame
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonSet(u8);

impl ButtonSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    pub const fn contains(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::ALL
            .into_iter()
            .filter(move |button| self.contains(*button))
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = Button>>(iter: I) -> Self {
        let mut set = Self::empty();
        for button in iter {
            set.insert(button);
        }
        set
    }
}

impl fmt::Debug for ButtonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to initialize gamepad input: {0}")]
    InitializationError(String),

    #[error("Failed to read gamepad: {0}")]
    ReadError(String),
}

/// Source of per-frame button edges
pub trait InputSource {
    /// Returns the buttons pressed since the previous call
    ///
    /// May block for up to one frame.
    fn poll_triggers(&mut self) -> Result<ButtonSet, InputError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_set_tracks_membership() {
        let set: ButtonSet = [Button::X, Button::A].into_iter().collect();
        assert!(set.contains(Button::A));
        assert!(set.contains(Button::X));
        assert!(!set.contains(Button::Home));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Button::A, Button::X]);
        assert!(ButtonSet::empty().is_empty());
    }
}
