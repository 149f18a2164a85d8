//! Metagram Error Handling
//!
//! Every failure that crosses a public boundary is a [`MetaError`]. Internal
//! match failures never appear here directly; they are rewrapped as
//! [`ErrorKind::Parse`], [`ErrorKind::GrammarLoad`] or [`ErrorKind::Transform`]
//! once they escape `match_all`, `load_grammar` or `translate`.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::engine::ParseFailure;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Named source text attached to errors so `miette` can render a labelled span.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }

    /// Creates an error of `kind` labelled at `span` in this source.
    pub fn report(&self, kind: ErrorKind, span: SourceSpan) -> MetaError {
        MetaError::new(kind).with_source(self, span)
    }
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// The single error type: what went wrong, where, and how to help.
#[derive(Debug)]
pub struct MetaError {
    pub kind: ErrorKind,
    pub source_info: Option<SourceInfo>,
    pub diagnostic_info: DiagnosticInfo,
}

/// All error kinds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Load errors - grammar text or grammar structure is unusable
    #[error("malformed grammar: {failure}")]
    GrammarLoad { failure: ParseFailure },
    #[error("rule '{rule}' is not defined in grammar '{grammar}'")]
    UnknownRule { rule: String, grammar: String },
    #[error("grammar '{name}' is not defined")]
    UnknownGrammar { name: String },
    #[error("cyclic grammar inheritance: {}", .chain.join(" < "))]
    CyclicParent { chain: Vec<String> },
    #[error("rule '{rule}' is defined twice in grammar '{grammar}'")]
    DuplicateRule { rule: String, grammar: String },
    #[error("grammar '{name}' is defined twice")]
    DuplicateGrammar { name: String },
    #[error("rule '{rule}' expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        rule: String,
        expected: String,
        actual: usize,
    },
    #[error("malformed grammar: {message}")]
    MalformedGrammar { message: String },

    // Match errors - a match failure escaped the boundary
    #[error("parse error: {failure}")]
    Parse { failure: ParseFailure },
    #[error("no matching transformation rule for node tag {tag}")]
    Transform {
        tag: String,
        path: Vec<String>,
        failure: ParseFailure,
    },

    // Action errors - semantic action code misbehaved
    #[error("undefined variable '{name}' in action")]
    UndefinedVariable { name: String },
    #[error("unknown action function '{name}'")]
    UnknownAction { name: String },
    #[error("action '{action}' expects {expected} argument(s), got {actual}")]
    ActionArity {
        action: String,
        expected: String,
        actual: usize,
    },
    #[error("type error: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    // Runtime errors
    #[error("recursion limit of {limit} rule applications exceeded")]
    RecursionLimit { limit: usize },
    #[error("cannot access '{path}': {message}")]
    Io { path: String, message: String },
}

/// Where an error happened in some named source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Load,
    Parse,
    Transform,
    Action,
    Runtime,
}

impl ErrorCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Load => "load",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Transform => "transform",
            ErrorCategory::Action => "action",
            ErrorCategory::Runtime => "runtime",
        }
    }
}

impl ErrorKind {
    /// Get the error category for test assertions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::GrammarLoad { .. }
            | Self::UnknownRule { .. }
            | Self::UnknownGrammar { .. }
            | Self::CyclicParent { .. }
            | Self::DuplicateRule { .. }
            | Self::DuplicateGrammar { .. }
            | Self::ArityMismatch { .. }
            | Self::MalformedGrammar { .. } => ErrorCategory::Load,

            Self::Parse { .. } => ErrorCategory::Parse,

            Self::Transform { .. } => ErrorCategory::Transform,

            Self::UndefinedVariable { .. }
            | Self::UnknownAction { .. }
            | Self::ActionArity { .. }
            | Self::TypeMismatch { .. } => ErrorCategory::Action,

            Self::RecursionLimit { .. } | Self::Io { .. } => ErrorCategory::Runtime,
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::GrammarLoad { .. } => "grammar_load",
            Self::UnknownRule { .. } => "unknown_rule",
            Self::UnknownGrammar { .. } => "unknown_grammar",
            Self::CyclicParent { .. } => "cyclic_parent",
            Self::DuplicateRule { .. } => "duplicate_rule",
            Self::DuplicateGrammar { .. } => "duplicate_grammar",
            Self::ArityMismatch { .. } => "arity_mismatch",
            Self::MalformedGrammar { .. } => "malformed_grammar",
            Self::Parse { .. } => "parse",
            Self::Transform { .. } => "transform",
            Self::UndefinedVariable { .. } => "undefined_variable",
            Self::UnknownAction { .. } => "unknown_action",
            Self::ActionArity { .. } => "action_arity",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::RecursionLimit { .. } => "recursion_limit",
            Self::Io { .. } => "io",
        }
    }

    /// The match failure carried by this error, if any.
    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            Self::GrammarLoad { failure }
            | Self::Parse { failure }
            | Self::Transform { failure, .. } => Some(failure),
            _ => None,
        }
    }

    fn primary_label(&self) -> String {
        match self {
            Self::GrammarLoad { failure } | Self::Parse { failure } => {
                format!("expected {}", failure.expected_summary())
            }
            Self::Transform { tag, .. } => format!("no rule for {}", tag),
            Self::UnknownRule { .. } => "undefined rule".into(),
            Self::UnknownGrammar { .. } => "undefined grammar".into(),
            Self::CyclicParent { .. } => "inheritance cycle".into(),
            Self::DuplicateRule { .. } | Self::DuplicateGrammar { .. } => {
                "duplicate definition".into()
            }
            Self::ArityMismatch { .. } | Self::ActionArity { .. } => "arity mismatch".into(),
            Self::MalformedGrammar { .. } => "malformed".into(),
            Self::UndefinedVariable { .. } => "undefined variable".into(),
            Self::UnknownAction { .. } => "unknown action".into(),
            Self::TypeMismatch { .. } => "type mismatch".into(),
            Self::RecursionLimit { .. } => "recursion limit exceeded".into(),
            Self::Io { .. } => "io".into(),
        }
    }
}

impl MetaError {
    /// Creates an error with no source attached.
    pub fn new(kind: ErrorKind) -> Self {
        let error_code = format!("metagram::{}::{}", kind.category().as_str(), kind.code_suffix());
        Self {
            kind,
            source_info: None,
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }

    /// Attaches a labelled span in `source`.
    pub fn with_source(mut self, source: &SourceContext, span: SourceSpan) -> Self {
        self.source_info = Some(SourceInfo {
            source: source.to_named_source(),
            primary_span: span,
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic_info.help = Some(help.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl From<ErrorKind> for MetaError {
    fn from(kind: ErrorKind) -> Self {
        MetaError::new(kind)
    }
}

impl std::error::Error for MetaError {}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Diagnostic for MetaError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let info = self.source_info.as_ref()?;
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.kind.primary_label()),
            info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_info
            .as_ref()
            .map(|info| &*info.source as &dyn miette::SourceCode)
    }
}

// ============================================================================
// CONSTRUCTION HELPERS
// ============================================================================

pub(crate) fn type_mismatch(expected: &str, actual: &str) -> MetaError {
    MetaError::new(ErrorKind::TypeMismatch {
        expected: expected.into(),
        actual: actual.into(),
    })
}

pub(crate) fn malformed(message: impl Into<String>) -> MetaError {
    MetaError::new(ErrorKind::MalformedGrammar {
        message: message.into(),
    })
}

pub(crate) fn io_error(path: &std::path::Path, err: std::io::Error) -> MetaError {
    MetaError::new(ErrorKind::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Converts a character offset into `text` to a byte-based miette span.
pub fn char_span(text: &str, char_pos: usize) -> SourceSpan {
    let start = text
        .char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let len = text[start..].chars().next().map_or(0, char::len_utf8);
    SourceSpan::from(start..start + len)
}

/// Creates a placeholder span for errors not tied to a specific location.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a MetaError with full miette diagnostics
pub fn print_error(error: MetaError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}
