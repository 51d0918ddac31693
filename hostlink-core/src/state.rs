use std::fmt;

/// Where the session is in its life.
///
/// The bridge owns the `Loading -> Ready` edge (inside `start()`) and the
/// `Running -> Stopped` edge (inside `stop()`); the external control engine
/// owns `Ready -> Running` and completion detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Constructed,
    Loading,
    Ready,
    Running,
    Stopped,
}

impl SessionState {
    /// `Stopped` is terminal; everything else can still be torn down.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Constructed => "constructed",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
