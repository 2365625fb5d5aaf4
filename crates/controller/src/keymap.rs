/// What a remote key press asks the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteKey {
    /// Same as the local "next" key: depart, or arrive at the next stop.
    Next,
    /// One stop further along the travel direction.
    Forward,
    /// One stop back against the travel direction.
    Back,
}

impl RemoteKey {
    /// Maps a DOM-style key code. Unknown codes map to `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Space" | " " | "Enter" | "NumpadEnter" => Some(RemoteKey::Next),
            "ArrowRight" | "PageDown" => Some(RemoteKey::Forward),
            "ArrowLeft" | "PageUp" => Some(RemoteKey::Back),
            _ => None,
        }
    }
}
