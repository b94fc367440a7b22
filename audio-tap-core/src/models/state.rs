/// Remix engine lifecycle.
///
/// ```text
/// stopped ──start()──▶ running ──stop()──▶ stopped
/// ```
/// `start()` while running is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
}

impl EngineState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}
