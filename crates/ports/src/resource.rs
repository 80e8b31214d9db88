//! Discovered file resources and how to open them.

use scanspec_shared::Result;
use std::io::Read;

/// A non-unit file found by the external traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedResource {
    /// Identifier of the directory or archive holding the file.
    pub container: Box<str>,
    /// Path relative to the container root, `/`-separated.
    pub relative_path: Box<str>,
    /// Declared length in bytes.
    pub length: u64,
}

impl ScannedResource {
    /// Describe a resource.
    pub fn new(container: impl Into<Box<str>>, relative_path: impl Into<Box<str>>, length: u64) -> Self {
        Self {
            container: container.into(),
            relative_path: relative_path.into(),
            length,
        }
    }

    /// Final path segment.
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Opens the byte stream behind a [`ScannedResource`].
pub trait ResourceOpenerPort: Send + Sync {
    /// Open a fresh stream positioned at the start of the resource.
    fn open(&self, resource: &ScannedResource) -> Result<Box<dyn Read + Send>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_name_is_last_segment() {
        let resource = ScannedResource::new("lib.jar", "META-INF/services/x.Y", 3);
        assert_eq!(resource.leaf_name(), "x.Y");
        assert_eq!(ScannedResource::new("d", "top.txt", 0).leaf_name(), "top.txt");
    }
}
