use sqlproxy_core_types::TableIdError;
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code. The kinds are chosen so a caller
/// can decide between retrying (backing store trouble), fixing its input, or
/// treating stored data as corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input
    InvalidInput,
    MissingArgument,
    UnsupportedType,

    // Stored data
    /// A stored value could not be decoded for its type tag
    Decode,
    Serialization,

    // Lifecycle
    /// Root element was never bootstrapped, or has been dropped
    NamespaceNotInitialized,

    // Integration/IO
    Persistence,
    Concurrency,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::MissingArgument => "ERR_MISSING_ARGUMENT",
            ExErrorKind::UnsupportedType => "ERR_UNSUPPORTED_TYPE",
            ExErrorKind::Decode => "ERR_DECODE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::NamespaceNotInitialized => "ERR_NAMESPACE_NOT_INITIALIZED",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExErrorKind::Persistence | ExErrorKind::Concurrency)
    }
}

/// Canonical structured error type
///
/// Carries a classification kind for programmatic handling plus context
/// (operation, table) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    table_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            table_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add table context
    pub fn with_table_id(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the table context, if any
    pub fn table_id(&self) -> Option<&str> {
        self.table_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(table_id) = &self.table_id {
            write!(f, " (table_id: {})", table_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Create a backing-store error for a failed statement
pub fn persistence(op: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op(op.to_string())
        .with_message(message)
}

/// Create an error for a poisoned lock or similar broken internal state
pub fn internal(op: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op.to_string())
        .with_message(message)
}

// ========== End Error Facility ==========

/// Failures raised by the codec, the views and the root element
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProxyError {
    /// Value falls in a category the codec refuses to store
    #[error("Unknown element type: {type_name}")]
    UnknownElementType { type_name: String },

    /// Stored `type` column holds a code outside the tag set
    #[error("Unknown type code {code}")]
    UnknownTypeCode { code: i64 },

    /// Stored payload is malformed for its tag
    #[error("Cannot decode {tag} value: {reason}")]
    DecodeFailed { tag: String, reason: String },

    /// Result row lacks a column the result shape declared
    #[error("Result row has no column '{column}'")]
    MissingColumn { column: String },

    /// Required argument absent or empty
    #[error("Missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("Invalid table identifier: {0}")]
    InvalidTableId(#[from] TableIdError),

    /// Root element not bootstrapped or already dropped
    #[error("Namespace {root_table_id} is not initialized")]
    NamespaceNotInitialized { root_table_id: String },

    /// Root table holds no allocator row
    #[error("Root table {root_table_id} has no allocator row")]
    AllocatorRowMissing { root_table_id: String },

    /// Compare-and-swap allocation lost every attempt
    #[error("Identifier allocation on {root_table_id} lost {attempts} consecutive races")]
    AllocationContended { root_table_id: String, attempts: u32 },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<ProxyError> for ExError {
    fn from(err: ProxyError) -> Self {
        let message = err.to_string();
        match err {
            ProxyError::UnknownElementType { .. } => {
                ExError::new(ExErrorKind::UnsupportedType).with_message(message)
            }
            ProxyError::UnknownTypeCode { .. }
            | ProxyError::DecodeFailed { .. }
            | ProxyError::MissingColumn { .. } => {
                ExError::new(ExErrorKind::Decode).with_message(message)
            }
            ProxyError::MissingArgument { .. } | ProxyError::InvalidTableId(TableIdError::Empty) => {
                ExError::new(ExErrorKind::MissingArgument).with_message(message)
            }
            ProxyError::InvalidTableId(_) | ProxyError::InvalidConfig { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            ProxyError::NamespaceNotInitialized { root_table_id } => {
                ExError::new(ExErrorKind::NamespaceNotInitialized)
                    .with_table_id(root_table_id)
                    .with_message(message)
            }
            ProxyError::AllocatorRowMissing { root_table_id } => {
                ExError::new(ExErrorKind::Decode)
                    .with_table_id(root_table_id)
                    .with_message(message)
            }
            ProxyError::AllocationContended { root_table_id, .. } => {
                ExError::new(ExErrorKind::Concurrency)
                    .with_table_id(root_table_id)
                    .with_message(message)
            }
            ProxyError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<TableIdError> for ExError {
    fn from(err: TableIdError) -> Self {
        ProxyError::from(err).into()
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Serialization {
            message: err.to_string(),
        }
    }
}
