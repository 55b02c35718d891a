/// Which tiers a field write touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Only the in-process value.
    LocalOnly,
    /// Only the shared mirror (when one is attached).
    RemoteOnly,
    /// Both.
    #[default]
    Default,
}

impl AccessMode {
    pub fn writes_local(self) -> bool {
        self != AccessMode::RemoteOnly
    }

    pub fn writes_remote(self) -> bool {
        self != AccessMode::LocalOnly
    }
}
