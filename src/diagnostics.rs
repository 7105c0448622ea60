use std::fmt;
use std::sync::Arc;

/// Non-fatal conditions noticed while normalizing a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A `query` or `body` set on the options was replaced by the explicit
    /// argument passed to the verb.
    OptionOverwritten { field: &'static str },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::OptionOverwritten { field } => write!(
                f,
                "{field} set on request options overwritten by argument {field}"
            ),
        }
    }
}

/// Receives diagnostics. The default sink logs them with `tracing::warn!`.
pub type DiagnosticSink = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

pub(crate) fn tracing_sink() -> DiagnosticSink {
    Arc::new(|d: &Diagnostic| {
        tracing::warn!(diagnostic = ?d, "{}", d);
    })
}
