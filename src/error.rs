//! Typed error taxonomy for the engine.
//!
//! Each category from the error handling design is its own enum with a
//! manual `Display`/`Error` impl, mirroring the style the teacher codebase
//! uses for its own FFI error type. `EngineError` aggregates them so stage
//! functions in the orchestrator can match on a single explicit result type
//! instead of propagating an opaque `anyhow::Error`.

use std::fmt;
use std::path::PathBuf;

/// Failures raised while loading or validating device/build configuration.
/// Terminal: none are retried.
#[derive(Debug)]
pub enum ConfigError {
    /// Device profile or build config JSON file not found.
    ConfigMissing(PathBuf),
    /// The JSON failed to parse.
    ConfigParseError { path: PathBuf, source: serde_json::Error },
    /// One schema, one or more violations.
    SchemaViolation(Vec<String>),
    /// Requested OS id is not in the device profile's supported set.
    OSIncompatible { os_id: u32, supported: Vec<u32> },
    /// Requested OS id has no WIM mapping in the build config.
    WimMappingMissing { os_id: u32, available: Vec<u32> },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ConfigMissing(path) => write!(f, "configuration file not found: {}", path.display()),
            ConfigError::ConfigParseError { path, source } => {
                write!(f, "failed to parse {}: {}", path.display(), source)
            }
            ConfigError::SchemaViolation(violations) => {
                write!(f, "schema validation failed:")?;
                for v in violations {
                    write!(f, "\n  - {v}")?;
                }
                Ok(())
            }
            ConfigError::OSIncompatible { os_id, supported } => {
                write!(f, "os id {os_id} is not supported (supported: {supported:?})")
            }
            ConfigError::WimMappingMissing { os_id, available } => {
                write!(f, "no wim mapping for os id {os_id} (available: {available:?})")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ConfigParseError { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Raised when `GetImageInfo` fails, or succeeds without reporting Index 1.
/// Terminal at the stage boundary that raised it.
#[derive(Debug)]
pub struct IntegrityError {
    pub wim_path: PathBuf,
    pub reason: String,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wim integrity check failed for {}: {}", self.wim_path.display(), self.reason)
    }
}

impl std::error::Error for IntegrityError {}

/// Non-zero exit from a servicer command. Retriable only for `AddPackage`.
#[derive(Debug)]
pub struct ServicerError {
    pub operation: &'static str,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl fmt::Display for ServicerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "servicer operation {} failed (exit {:?}): {}",
            self.operation, self.exit_code, self.stderr
        )
    }
}

impl std::error::Error for ServicerError {}

/// Manifest parse failure or missing payload file. Non-fatal: the caller
/// skips the individual driver/update.
#[derive(Debug)]
pub enum AssetError {
    ParseFailed { path: PathBuf, source: serde_json::Error },
    MissingPayload { manifest: PathBuf, expected: PathBuf },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::ParseFailed { path, source } => write!(f, "failed to parse manifest {}: {}", path.display(), source),
            AssetError::MissingPayload { manifest, expected } => {
                write!(f, "manifest {} references missing payload {}", manifest.display(), expected.display())
            }
        }
    }
}

impl std::error::Error for AssetError {}

/// Copy failure while staging a payload into the mounted image. Per-item:
/// counted as Failed, loop continues.
#[derive(Debug)]
pub struct StagingError {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub reason: String,
}

impl fmt::Display for StagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to stage {} into {}: {}",
            self.source.display(),
            self.destination.display(),
            self.reason
        )
    }
}

impl std::error::Error for StagingError {}

/// Invalid selection at the interactive device prompt. Re-prompted by the
/// caller; never reaches the orchestrator.
#[derive(Debug)]
pub struct OperatorError {
    pub message: String,
}

impl fmt::Display for OperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for OperatorError {}

/// Aggregate error type returned by orchestrator stages.
#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Integrity(IntegrityError),
    Servicer(ServicerError),
    Asset(AssetError),
    Staging(StagingError),
    Operator(OperatorError),
    Io(std::io::Error),
    Other(anyhow::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(e) => write!(f, "{e}"),
            EngineError::Integrity(e) => write!(f, "{e}"),
            EngineError::Servicer(e) => write!(f, "{e}"),
            EngineError::Asset(e) => write!(f, "{e}"),
            EngineError::Staging(e) => write!(f, "{e}"),
            EngineError::Operator(e) => write!(f, "{e}"),
            EngineError::Io(e) => write!(f, "{e}"),
            EngineError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Config(e) => Some(e),
            EngineError::Integrity(e) => Some(e),
            EngineError::Servicer(e) => Some(e),
            EngineError::Asset(e) => Some(e),
            EngineError::Staging(e) => Some(e),
            EngineError::Operator(e) => Some(e),
            EngineError::Io(e) => Some(e),
            EngineError::Other(e) => e.source(),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Config(e)
    }
}
impl From<IntegrityError> for EngineError {
    fn from(e: IntegrityError) -> Self {
        EngineError::Integrity(e)
    }
}
impl From<ServicerError> for EngineError {
    fn from(e: ServicerError) -> Self {
        EngineError::Servicer(e)
    }
}
impl From<AssetError> for EngineError {
    fn from(e: AssetError) -> Self {
        EngineError::Asset(e)
    }
}
impl From<StagingError> for EngineError {
    fn from(e: StagingError) -> Self {
        EngineError::Staging(e)
    }
}
impl From<OperatorError> for EngineError {
    fn from(e: OperatorError) -> Self {
        EngineError::Operator(e)
    }
}
impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e)
    }
}
impl From<anyhow::Error> for EngineError {
    fn from(e: anyhow::Error) -> Self {
        EngineError::Other(e)
    }
}

/// `true` for error categories the §7 propagation policy allows to retry
/// (only `AddPackage` via `ServicerError`, and only by the update engine's
/// own retry loop -- this just identifies the category).
impl EngineError {
    pub fn is_servicer(&self) -> bool {
        matches!(self, EngineError::Servicer(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
