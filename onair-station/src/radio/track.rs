//! Track reference type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque reference to a playable audio byte source
///
/// Only identity matters: two tracks are the same when their references are
/// equal. No audio metadata is modeled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track(String);

impl Track {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the reference as a local filesystem path
    pub fn path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Track {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Track {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Path> for Track {
    fn from(p: &Path) -> Self {
        Self(p.to_string_lossy().into_owned())
    }
}
