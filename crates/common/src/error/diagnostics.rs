use std::{borrow::Cow, fmt, panic::Location};

/// Error text paired with the source location that raised it.
///
/// Every error enum in the workspace wraps one of these, so a log line such as
/// `query rejected: relation "foo" does not exist (at crates/...:42)` points
/// straight at the code that gave up. Build one with [`DiagnosticMessage::new`]
/// or the [`diag!`] macro; both record the caller via `#[track_caller]`.
#[derive(Clone, Debug)]
pub struct DiagnosticMessage {
    message: Cow<'static, str>,
    location: &'static Location<'static>,
}

impl DiagnosticMessage {
    #[track_caller]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// The bare message, without the location suffix. This is what may be
    /// shown to an HTTP client when a provider error is echoed back.
    pub fn message(&self) -> &str {
        self.message.as_ref()
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at {}:{})",
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}

/// `format!`-style shorthand for [`DiagnosticMessage::new`].
#[macro_export]
macro_rules! diag {
    ($msg:literal $(,)?) => {
        $crate::error::diagnostics::DiagnosticMessage::new($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::diagnostics::DiagnosticMessage::new(format!($fmt, $($arg)*))
    };
}
