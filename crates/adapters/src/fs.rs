//! Filesystem-backed resource opener.

use scanspec_ports::{ResourceOpenerPort, ScannedResource};
use scanspec_shared::{ErrorCode, ErrorEnvelope, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// Opens resources whose container is a directory on disk.
///
/// The container string is read as a directory path, relative to `base` when
/// one is set. Archive containers are not opened by this adapter.
#[derive(Debug, Clone, Default)]
pub struct FsResourceOpener {
    base: Option<PathBuf>,
}

impl FsResourceOpener {
    /// Opener resolving containers against the working directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { base: None }
    }

    /// Opener resolving relative containers against `base`.
    #[must_use]
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    fn full_path(&self, resource: &ScannedResource) -> Result<PathBuf> {
        let relative = Path::new(&*resource.relative_path);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "resource path must be relative and must not leave its container",
            )
            .with_metadata("path", &*resource.relative_path));
        }
        let container = Path::new(&*resource.container);
        let root = match &self.base {
            Some(base) if container.is_relative() => base.join(container),
            _ => container.to_path_buf(),
        };
        Ok(root.join(relative))
    }
}

impl ResourceOpenerPort for FsResourceOpener {
    fn open(&self, resource: &ScannedResource) -> Result<Box<dyn Read + Send>> {
        let path = self.full_path(resource)?;
        let file = File::open(&path).map_err(|error| {
            ErrorEnvelope::from(error).with_metadata("path", path.to_string_lossy().to_string())
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}
