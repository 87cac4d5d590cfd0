use stocktake_core_types::RequestId;
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used for programmatic handling,
/// test assertions and the CLI exit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural sources
    /// Inventory source or persistence store unreachable (retryable)
    SourceUnavailable,
    /// Event log present but missing required fields (non-fatal)
    SchemaInvalid,
    /// A single event row could not be normalised (skipped)
    EventParseSkipped,

    // Lifecycle
    /// Mutation attempted on a locked snapshot
    Locked,
    /// Another generation for the same period holds the period lock
    ConcurrentGenerationInProgress,

    // Validation
    InvalidInput,
    NotFound,

    // Integration
    Serialization,
    Persistence,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::SourceUnavailable => "ERR_SOURCE_UNAVAILABLE",
            ExErrorKind::SchemaInvalid => "ERR_SCHEMA_INVALID",
            ExErrorKind::EventParseSkipped => "ERR_EVENT_PARSE_SKIPPED",
            ExErrorKind::Locked => "ERR_LOCKED",
            ExErrorKind::ConcurrentGenerationInProgress => "ERR_CONCURRENT_GENERATION",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether a caller may reasonably retry the failed operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExErrorKind::SourceUnavailable | ExErrorKind::ConcurrentGenerationInProgress
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification plus the period/slug context the failure
/// happened in, so callers can react without parsing messages.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    period_key: Option<String>,
    slug: Option<String>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            period_key: None,
            slug: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add period context
    pub fn with_period_key(mut self, period_key: impl Into<String>) -> Self {
        self.period_key = Some(period_key.into());
        self
    }

    /// Add component slug context
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
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

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn period_key(&self) -> Option<&str> {
        self.period_key.as_deref()
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
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
        if let Some(period_key) = &self.period_key {
            write!(f, " (period_key: {})", period_key)?;
        }
        if let Some(slug) = &self.slug {
            write!(f, " (slug: {})", slug)?;
        }
        if let Some(source) = &self.source {
            write!(f, "; caused by {}", source)?;
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

// ========== End Error Facility ==========

/// Domain error taxonomy for snapshot operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StocktakeError {
    #[error("Snapshot not found for period {period_key}")]
    SnapshotNotFound { period_key: String },

    #[error("Snapshot for period {period_key} is locked")]
    SnapshotLocked { period_key: String },

    #[error("No row for component {slug} in period {period_key}")]
    RowNotFound { period_key: String, slug: String },

    #[error("Invalid period key '{value}': expected YYYY-MM")]
    InvalidPeriodKey { value: String },

    #[error("Duplicate component slug in inventory: {slug}")]
    DuplicateSlug { slug: String },

    #[error("Component slug must not be empty")]
    EmptySlug,

    #[error("Inventory source unavailable: {reason}")]
    InventoryUnavailable { reason: String },

    #[error("Generation already in progress for period {period_key}")]
    GenerationInProgress { period_key: String },

    #[error("Event log is missing required fields: {missing:?}")]
    EventSchemaInvalid { missing: Vec<String> },

    #[error("Event row skipped: {reason}")]
    EventParseSkipped { reason: String },

    #[error("Invalid identifier '{name}': only ASCII letters, digits and '_' are allowed")]
    InvalidIdentifier { name: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<StocktakeError> for ExError {
    fn from(err: StocktakeError) -> Self {
        let message = err.to_string();
        match err {
            StocktakeError::SnapshotNotFound { period_key } => {
                ExError::new(ExErrorKind::NotFound).with_period_key(period_key)
            }
            StocktakeError::SnapshotLocked { period_key } => {
                ExError::new(ExErrorKind::Locked).with_period_key(period_key)
            }
            StocktakeError::RowNotFound { period_key, slug } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_period_key(period_key)
                    .with_slug(slug)
            }
            StocktakeError::InvalidPeriodKey { .. } => ExError::new(ExErrorKind::InvalidInput),
            StocktakeError::DuplicateSlug { slug } => {
                ExError::new(ExErrorKind::InvalidInput).with_slug(slug)
            }
            StocktakeError::EmptySlug => ExError::new(ExErrorKind::InvalidInput),
            StocktakeError::InventoryUnavailable { .. } => {
                ExError::new(ExErrorKind::SourceUnavailable)
            }
            StocktakeError::GenerationInProgress { period_key } => {
                ExError::new(ExErrorKind::ConcurrentGenerationInProgress)
                    .with_period_key(period_key)
            }
            StocktakeError::EventSchemaInvalid { .. } => ExError::new(ExErrorKind::SchemaInvalid),
            StocktakeError::EventParseSkipped { .. } => {
                ExError::new(ExErrorKind::EventParseSkipped)
            }
            StocktakeError::InvalidIdentifier { .. } => ExError::new(ExErrorKind::InvalidInput),
            StocktakeError::Serialization { .. } => ExError::new(ExErrorKind::Serialization),
            StocktakeError::Internal { .. } => ExError::new(ExErrorKind::Internal),
        }
        .with_message(message)
    }
}
