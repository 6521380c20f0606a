use serde::{Deserialize, Serialize};

/// Row version of a document header.
///
/// Inserted headers start at 1; each header write bumps it. Writers that
/// read a header may pass the version back to detect a concurrent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u32);

impl Version {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Version of a freshly inserted header.
    pub fn first() -> Self {
        Self(1)
    }

    /// Version after one more write.
    pub fn bumped(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns true if a writer expecting `expected` may write over this
    /// version. No expectation always passes.
    pub fn satisfies(self, expected: Option<Version>) -> bool {
        expected.is_none_or(|v| v == self)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::first()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u32> for Version {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
