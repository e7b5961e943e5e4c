//! Provenance constants stamped into every emitted event.
//!
//! Injected as an explicit configuration value at construction; the identity
//! algorithm never reads ambient process state.

/// Version string used when the emitting source's version is unknown.
pub const UNKNOWN_SOURCE_VERSION: &str = "-1";

/// Identity of the emitting source: service name/version and host OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Emitting service or component name.
    pub source_type: Option<String>,
    /// Emitting service version; [`UNKNOWN_SOURCE_VERSION`] when unknown.
    pub source_version: String,
    /// Host operating system.
    pub os: Option<String>,
    /// Host operating system version.
    pub os_version: Option<String>,
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            source_type: None,
            source_version: UNKNOWN_SOURCE_VERSION.to_string(),
            os: None,
            os_version: None,
        }
    }
}

impl SourceInfo {
    /// Provenance for a named source at a known version.
    #[must_use]
    pub fn new(source_type: impl Into<String>, source_version: impl Into<String>) -> Self {
        Self {
            source_type: Some(source_type.into()),
            source_version: source_version.into(),
            ..Self::default()
        }
    }

    /// Provenance for a named source, sampling the host OS from the
    /// environment once at the composition root.
    #[must_use]
    pub fn detect(source_type: impl Into<String>, source_version: Option<&str>) -> Self {
        Self {
            source_type: Some(source_type.into()),
            source_version: source_version.unwrap_or(UNKNOWN_SOURCE_VERSION).to_string(),
            os: Some(std::env::consts::OS.to_string()),
            os_version: None,
        }
    }

    /// Override the host OS fields.
    #[must_use]
    pub fn with_os(mut self, os: impl Into<String>, os_version: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self.os_version = Some(os_version.into());
        self
    }
}
