//! Crate-wide error type.
//!
//! One `#[derive(Error)]` enum covers every entry in the error taxonomy
//! the runtime surfaces; iterator flow misuse stays a programmer error and
//! is raised through [`JsoniqError::iterator_flow`] rather than recovered.

use std::fmt;

use thiserror::Error;

/// Where in the source an error occurred, plus the offending fragment.
///
/// Parsing is out of scope for this crate, but every AST node the parser
/// hands us carries this metadata (§6), and every error we raise re-attaches
/// it so the driver can report a useful message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    pub fragment: String,
}

impl SourceSpan {
    pub fn new(file: impl Into<Option<String>>, line: u32, column: u32, fragment: impl Into<String>) -> Self {
        SourceSpan {
            file: file.into(),
            line,
            column,
            fragment: fragment.into(),
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}:{}:{} (`{}`)", self.line, self.column, self.fragment),
            None => write!(f, "{}:{} (`{}`)", self.line, self.column, self.fragment),
        }
    }
}

pub type JResult<T> = Result<T, JsoniqError>;

#[derive(Error, Debug, Clone)]
pub enum JsoniqError {
    #[error("type error: {message}{}", at(.span))]
    TypeError { message: String, span: Option<SourceSpan> },

    #[error("dynamic error: {message}{}", at(.span))]
    DynamicError { message: String, span: Option<SourceSpan> },

    #[error("cannot use a non-atomic item as a sort/group key{}", at(.span))]
    NonAtomicKey { span: Option<SourceSpan> },

    #[error("unexpected type: expected {expected}, found {found}{}", at(.span))]
    UnexpectedType {
        expected: String,
        found: String,
        span: Option<SourceSpan>,
    },

    #[error("invalid argument: {message}{}", at(.span))]
    InvalidArgument { message: String, span: Option<SourceSpan> },

    #[error("function not found: {name}/{arity}{}", at(.span))]
    FunctionNotFound {
        name: String,
        arity: usize,
        span: Option<SourceSpan>,
    },

    /// Internal misuse of the iterator protocol (e.g. `next()` called when
    /// `hasNext()` is false). Not a user-facing error; callers should treat
    /// this as a bug.
    #[error("iterator flow error at {site}: {message}")]
    IteratorFlow { site: &'static str, message: String },

    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    #[error("query cancelled")]
    Cancelled,

    #[error("this iterator does not support reset/rewind: {reason}")]
    NotRewindable { reason: String },
}

fn at(span: &Option<SourceSpan>) -> String {
    match span {
        Some(s) => format!(" at {s}"),
        None => String::new(),
    }
}

impl JsoniqError {
    pub fn type_error(message: impl Into<String>) -> Self {
        JsoniqError::TypeError { message: message.into(), span: None }
    }

    pub fn dynamic(message: impl Into<String>) -> Self {
        JsoniqError::DynamicError { message: message.into(), span: None }
    }

    pub fn unexpected_type(expected: impl Into<String>, found: impl Into<String>) -> Self {
        JsoniqError::UnexpectedType {
            expected: expected.into(),
            found: found.into(),
            span: None,
        }
    }

    pub fn function_not_found(name: impl Into<String>, arity: usize) -> Self {
        JsoniqError::FunctionNotFound { name: name.into(), arity, span: None }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        JsoniqError::InvalidArgument { message: message.into(), span: None }
    }

    /// Raise an internal iterator-protocol misuse. Reserved for call sites
    /// that are programmer errors, not dynamic query errors (§4.1, §7).
    pub fn iterator_flow(site: &'static str, message: impl Into<String>) -> Self {
        debug_assert!(false, "iterator flow violation at {site}");
        JsoniqError::IteratorFlow { site, message: message.into() }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        match &mut self {
            JsoniqError::TypeError { span: s, .. }
            | JsoniqError::DynamicError { span: s, .. }
            | JsoniqError::NonAtomicKey { span: s }
            | JsoniqError::UnexpectedType { span: s, .. }
            | JsoniqError::InvalidArgument { span: s, .. }
            | JsoniqError::FunctionNotFound { span: s, .. } => *s = Some(span),
            _ => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_renders_file_and_fragment() {
        let span = SourceSpan::new(Some("q.jq".to_string()), 3, 7, "$x + 1");
        let err = JsoniqError::type_error("cannot add string and integer").with_span(span);
        let rendered = err.to_string();
        assert!(rendered.contains("q.jq:3:7"));
        assert!(rendered.contains("$x + 1"));
    }

    #[test]
    fn span_omitted_when_absent() {
        let err = JsoniqError::dynamic("division by zero");
        assert_eq!(err.to_string(), "dynamic error: division by zero");
    }
}
