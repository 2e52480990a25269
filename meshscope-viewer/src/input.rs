//! Window-system independent input events

/// Keys the viewer distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable key, lowercased
    Character(char),
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Press,
    Release,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

/// Modifier keys held during an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub logo: bool,
}

/// One input event, in window pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { key: Key, action: Action, mods: Modifiers },
    MouseButton { button: MouseButton, action: Action, mods: Modifiers },
    MouseMove { x: f64, y: f64 },
    Scroll { x_offset: f64, y_offset: f64 },
    Resize { width: u32, height: u32 },
}

impl Key {
    /// Key for a character, case-insensitively
    pub fn from_char(c: char) -> Self {
        Key::Character(c.to_ascii_lowercase())
    }
}
