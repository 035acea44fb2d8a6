/// Result returned by input listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was handled. Dispatch stops before the next listener is visited.
    Handled,
    /// Event was not handled; keep routing.
    PassThrough,
}

impl EventResult {
    #[inline]
    pub fn is_handled(self) -> bool {
        self == EventResult::Handled
    }
}

impl From<bool> for EventResult {
    fn from(handled: bool) -> Self {
        if handled { EventResult::Handled } else { EventResult::PassThrough }
    }
}
