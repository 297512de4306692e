//! Error module. See the [failure](https://crates.io/crates/failure) crate for details.

use std::fmt;
use std::result;

use failure::{Backtrace, Context, Fail};

/// Convenient alias for this crate's error type.
pub type Result<T> = result::Result<T, Error>;

/// Error type for all msh operations.
#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    pub(crate) fn empty_command() -> Error {
        Error::from(ErrorKind::EmptyCommand)
    }

    pub(crate) fn builtin_command<T: AsRef<str>>(message: T, code: i32) -> Error {
        Error::from(ErrorKind::BuiltinCommand {
            message: message.as_ref().to_string(),
            code,
        })
    }

    pub(crate) fn command_not_found<T: AsRef<str>>(command: T) -> Error {
        Error::from(ErrorKind::CommandNotFound(command.as_ref().to_string()))
    }

    pub(crate) fn no_such_job<T: AsRef<str>>(job: T) -> Error {
        Error::from(ErrorKind::NoSuchJob(job.as_ref().to_string()))
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.ctx.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.ctx.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ctx.fmt(f)
    }
}

/// The kinds of errors msh operations can produce.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A line (or pipeline stage) contained no tokens after trimming.
    EmptyCommand,
    /// A builtin command failed; `code` is its exit status.
    BuiltinCommand {
        /// Operator-visible failure message.
        message: String,
        /// Exit status the builtin finished with.
        code: i32,
    },
    /// No stage of a pipeline could be located or executed.
    CommandNotFound(String),
    /// The history file does not exist yet.
    HistoryFileNotFound,
    /// A job id outside the live set was referenced.
    NoSuchJob(String),
    /// Argument parsing failed.
    Docopt,
    /// Wrapper around I/O errors.
    Io,
    /// Wrapper around OS-level (nix) errors, e.g. signal delivery failures.
    Nix,
    /// Wrapper around line-editing errors.
    Readline,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorKind::EmptyCommand => write!(f, "empty command"),
            ErrorKind::BuiltinCommand { ref message, .. } => write!(f, "{}", message),
            ErrorKind::CommandNotFound(ref line) => write!(f, "{}: command not found", line),
            ErrorKind::HistoryFileNotFound => write!(f, "history file not found"),
            ErrorKind::NoSuchJob(ref job) => write!(f, "{}: no such job", job),
            ErrorKind::Docopt => write!(f, "Docopt error occurred"),
            ErrorKind::Io => write!(f, "I/O error occurred"),
            ErrorKind::Nix => write!(f, "Nix error occurred"),
            ErrorKind::Readline => write!(f, "Readline error occurred"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::from(Context::new(kind))
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(ctx: Context<ErrorKind>) -> Error {
        Error { ctx }
    }
}
