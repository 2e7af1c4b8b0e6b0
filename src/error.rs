//! Error types for the ClickHouse type bridge.

use std::fmt;
use thiserror::Error;

/// DDL features the MergeTree family cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlFeature {
    ForeignKey,
    UniqueIndex,
    UniqueConstraint,
    PrimaryKeyChange,
    ColumnRename,
}

impl fmt::Display for DdlFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdlFeature::ForeignKey => write!(f, "foreign keys"),
            DdlFeature::UniqueIndex => write!(f, "unique indexes"),
            DdlFeature::UniqueConstraint => write!(f, "unique constraints"),
            DdlFeature::PrimaryKeyChange => write!(f, "primary key changes after creation"),
            DdlFeature::ColumnRename => write!(f, "column rename"),
        }
    }
}

/// The main error type for the type bridge.
#[derive(Debug, Error)]
pub enum ChError {
    /// No grammar rule matched a store type string.
    #[error("Unresolved store type: '{store_type}'")]
    UnresolvedType { store_type: String },

    /// The storage engine cannot express the requested DDL.
    #[error("ClickHouse does not support {}: {}{}", .feature, .object, hint_suffix(.hint))]
    UnsupportedDdlFeature {
        feature: DdlFeature,
        object: String,
        hint: Option<String>,
    },

    /// Two schema objects of the same kind share a name.
    #[error("Duplicate {kind} '{name}' on table '{table}'")]
    DuplicateNamedObject {
        kind: &'static str,
        name: String,
        table: String,
    },

    /// Out-of-range or malformed configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A value cannot be rendered as a literal of the given store type.
    #[error("Cannot format {value} as a literal of type {store_type}")]
    LiteralMismatch { store_type: String, value: String },

    /// A value does not fit the store type.
    #[error("Value {value} is out of range for {store_type}")]
    ValueOutOfRange { store_type: String, value: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(" ({})", h),
        None => String::new(),
    }
}

impl ChError {
    /// Create an unsupported-feature error for the named object.
    pub fn unsupported(feature: DdlFeature, object: impl Into<String>) -> Self {
        Self::UnsupportedDdlFeature {
            feature,
            object: object.into(),
            hint: None,
        }
    }

    /// Create an unsupported-feature error carrying a suggestion.
    pub fn unsupported_with_hint(
        feature: DdlFeature,
        object: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::UnsupportedDdlFeature {
            feature,
            object: object.into(),
            hint: Some(hint.into()),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// The unsupported feature, if this is an `UnsupportedDdlFeature`.
    pub fn feature(&self) -> Option<DdlFeature> {
        match self {
            Self::UnsupportedDdlFeature { feature, .. } => Some(*feature),
            _ => None,
        }
    }
}

/// Result type alias for type bridge operations.
pub type ChResult<T> = Result<T, ChError>;
