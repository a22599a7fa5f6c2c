#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    // fatal: the destination type's annotations are malformed
    UnknownClause,
    UnknownCapability,
    InvalidConfig,

    // field-scoped
    InvalidArgs,
    InvalidDocument,
    ParseFailed,
    TypeMismatch,
    ArithmeticFailed,
}

impl DecodeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeErrorKind::UnknownClause => "UnknownClause",
            DecodeErrorKind::UnknownCapability => "UnknownCapability",
            DecodeErrorKind::InvalidArgs => "InvalidArgs",
            DecodeErrorKind::InvalidConfig => "InvalidConfig",
            DecodeErrorKind::InvalidDocument => "InvalidDocument",
            DecodeErrorKind::ParseFailed => "ParseFailed",
            DecodeErrorKind::TypeMismatch => "TypeMismatch",
            DecodeErrorKind::ArithmeticFailed => "ArithmeticFailed",
        }
    }

    /// Fatal kinds describe a malformed destination type; no input document
    /// can make a decode succeed while they are present.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecodeErrorKind::UnknownClause
                | DecodeErrorKind::UnknownCapability
                | DecodeErrorKind::InvalidConfig
        )
    }
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub message: String,
    pub field: Option<String>,
    pub clause: Option<String>,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            clause: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_clause(mut self, clause: impl Into<String>) -> Self {
        self.clause = Some(clause.into());
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tagmorph: {}", self.message)?;
        match (&self.field, &self.clause) {
            (Some(field), Some(clause)) => write!(f, " (field: {}, clause: {})", field, clause),
            (Some(field), None) => write!(f, " (field: {})", field),
            (None, Some(clause)) => write!(f, " (clause: {})", clause),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::new(
            DecodeErrorKind::InvalidDocument,
            format!("json error: {}", err),
        )
    }
}

impl From<serde_yaml::Error> for DecodeError {
    fn from(err: serde_yaml::Error) -> Self {
        DecodeError::new(
            DecodeErrorKind::InvalidConfig,
            format!("yaml error: {}", err),
        )
    }
}

/// Error produced when a value cannot be stored in a destination slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignError {
    pub expected: String,
    pub found: &'static str,
}

impl AssignError {
    pub fn new(expected: impl Into<String>, found: &'static str) -> Self {
        Self {
            expected: expected.into(),
            found,
        }
    }
}

impl std::fmt::Display for AssignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot assign {} to {}", self.found, self.expected)
    }
}

impl std::error::Error for AssignError {}

impl From<AssignError> for DecodeError {
    fn from(err: AssignError) -> Self {
        DecodeError::new(DecodeErrorKind::TypeMismatch, err.to_string())
    }
}
