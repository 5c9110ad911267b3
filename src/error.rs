//! Error types for schema loading, data loading and hot reload.
//!
//! Every error maps to a stable [`ErrorCode`] so the CLI can report failures
//! in machine-readable form.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Schema errors
    SchemaParse,
    EmptyPackageName,
    DuplicatePackage,
    DuplicateName,
    DuplicateField,
    UnresolvedType,
    TableReference,
    MissingElementType,
    NestedContainer,

    // Data errors
    FileNotFound,
    IoError,
    MalformedJson,
    AfterLoadFailed,

    // Reload errors
    NotRegistered,
    NotReloadable,

    // Settings / setup
    InvalidSettings,
    InternalError,
}

/// Failure while parsing or validating a schema package.
///
/// Validation is fail-fast: the first violation found is the one reported.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("package name is empty")]
    EmptyPackageName,

    #[error("package {name} is declared by both {first} and {second}")]
    DuplicatePackage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("duplicate {kind} name {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("duplicate field {owner}.{field}")]
    DuplicateField { owner: String, field: String },

    #[error("type not found {owner}.{field} type:{type_name}")]
    UnresolvedType {
        owner: String,
        field: String,
        type_name: String,
    },

    #[error("type is table {owner}.{field} type:{type_name}")]
    TableReference {
        owner: String,
        field: String,
        type_name: String,
    },

    #[error("elementType is empty {owner}.{field} type:{container}")]
    MissingElementType {
        owner: String,
        field: String,
        container: String,
    },

    #[error("container of container {owner}.{field} type:{container}<{element}>")]
    NestedContainer {
        owner: String,
        field: String,
        container: String,
        element: String,
    },
}

impl SchemaError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SchemaError::Io { .. } => ErrorCode::IoError,
            SchemaError::Parse(_) => ErrorCode::SchemaParse,
            SchemaError::EmptyPackageName => ErrorCode::EmptyPackageName,
            SchemaError::DuplicatePackage { .. } => ErrorCode::DuplicatePackage,
            SchemaError::DuplicateName { .. } => ErrorCode::DuplicateName,
            SchemaError::DuplicateField { .. } => ErrorCode::DuplicateField,
            SchemaError::UnresolvedType { .. } => ErrorCode::UnresolvedType,
            SchemaError::TableReference { .. } => ErrorCode::TableReference,
            SchemaError::MissingElementType { .. } => ErrorCode::MissingElementType,
            SchemaError::NestedContainer { .. } => ErrorCode::NestedContainer,
        }
    }
}

/// Failure while loading one data file into a typed object.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("after-load hook failed for {file}: {source}")]
    AfterLoad {
        file: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LoadError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LoadError::NotFound { .. } => ErrorCode::FileNotFound,
            LoadError::Io { .. } => ErrorCode::IoError,
            LoadError::Decode { .. } => ErrorCode::MalformedJson,
            LoadError::AfterLoad { .. } => ErrorCode::AfterLoadFailed,
        }
    }

    /// Classify an I/O error on `path`, separating a missing file from other failures.
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound { path }
        } else {
            LoadError::Io { path, source }
        }
    }
}

/// Failure of a reload request. The previously active value is never touched.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("no config object registered for {0}")]
    NotRegistered(String),

    #[error("config object for {0} does not support reload")]
    NotReloadable(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl ReloadError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ReloadError::NotRegistered(_) => ErrorCode::NotRegistered,
            ReloadError::NotReloadable(_) => ErrorCode::NotReloadable,
            ReloadError::Load(e) => e.code(),
        }
    }
}

/// Failure while reading tool settings or opening the data root.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl SettingsError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SettingsError::Io { .. } => ErrorCode::IoError,
            SettingsError::Parse { .. } | SettingsError::InvalidValue { .. } => {
                ErrorCode::InvalidSettings
            }
        }
    }
}

/// Failure to start a change watcher.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to scan data root {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to watch data root: {0}")]
    Notify(#[from] notify::Error),
}

impl WatcherError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WatcherError::Scan { .. } => ErrorCode::IoError,
            WatcherError::Notify(_) => ErrorCode::InternalError,
        }
    }
}

/// Structured error report for machine-readable CLI output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            file: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl From<&SchemaError> for ErrorReport {
    fn from(err: &SchemaError) -> Self {
        ErrorReport::new(err.code(), err.to_string())
    }
}

impl From<&ReloadError> for ErrorReport {
    fn from(err: &ReloadError) -> Self {
        ErrorReport::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_classified() {
        let err = LoadError::from_io(
            PathBuf::from("pkg/T.json"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.code(), ErrorCode::FileNotFound);

        let err = LoadError::from_io(
            PathBuf::from("pkg/T.json"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.code(), ErrorCode::IoError);
    }

    #[test]
    fn test_reload_error_code_passes_through() {
        let err = ReloadError::from(LoadError::AfterLoad {
            file: "a.json".into(),
            source: anyhow::anyhow!("bad row"),
        });
        assert_eq!(err.code(), ErrorCode::AfterLoadFailed);
        assert_eq!(
            ReloadError::NotReloadable("a.json".into()).code(),
            ErrorCode::NotReloadable
        );
    }

    #[test]
    fn test_report_serializes_code() {
        let report = ErrorReport::new(ErrorCode::TableReference, "type is table").with_file("p.yaml");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["code"], "TABLE_REFERENCE");
        assert_eq!(json["file"], "p.yaml");
    }
}
