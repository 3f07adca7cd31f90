use std::fmt;
use std::path::{Path, PathBuf};

/// A type alias for handling errors throughout tmdb-analysis.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while loading or querying movie records.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Return a reference to the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Transfer ownership of the kind of this error.
    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub(crate) fn no_input<P: AsRef<Path>>(path: P) -> Error {
        Error { kind: ErrorKind::NoInput(path.as_ref().to_path_buf()) }
    }

    pub(crate) fn json<T: AsRef<str>>(msg: T) -> Error {
        Error { kind: ErrorKind::Json(msg.as_ref().to_string()) }
    }

    pub(crate) fn unknown_column<T: AsRef<str>>(unk: T) -> Error {
        Error { kind: ErrorKind::UnknownColumn(unk.as_ref().to_string()) }
    }

    pub(crate) fn unknown_metric<T: AsRef<str>>(unk: T) -> Error {
        Error { kind: ErrorKind::UnknownMetric(unk.as_ref().to_string()) }
    }

    pub(crate) fn unknown_directive<T: AsRef<str>>(unk: T) -> Error {
        Error { kind: ErrorKind::UnknownDirective(unk.as_ref().to_string()) }
    }

    pub(crate) fn bug<T: AsRef<str>>(msg: T) -> Error {
        Error { kind: ErrorKind::Bug(msg.as_ref().to_string()) }
    }

    pub(crate) fn config<T: AsRef<str>>(msg: T) -> Error {
        Error { kind: ErrorKind::Config(msg.as_ref().to_string()) }
    }

    pub(crate) fn csv(err: csv::Error) -> Error {
        Error { kind: ErrorKind::Csv(err.to_string()) }
    }

    pub(crate) fn io_path<P: AsRef<Path>>(
        err: std::io::Error,
        path: P,
    ) -> Error {
        Error {
            kind: ErrorKind::Io {
                err,
                path: Some(path.as_ref().to_path_buf()),
            },
        }
    }

    pub(crate) fn number<E: std::error::Error + Send + Sync + 'static>(
        err: E,
    ) -> Error {
        Error { kind: ErrorKind::Number(Box::new(err)) }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            ErrorKind::Io { ref err, .. } => Some(err),
            ErrorKind::Number(ref err) => Some(&**err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error { kind: ErrorKind::Io { err, path: None } }
    }
}

/// The specific kind of error that can occur.
#[derive(Debug)]
pub enum ErrorKind {
    /// The input source could not be read, or it contained no movie
    /// documents at all.
    ///
    /// This is the only fatal condition during ingestion. Individual
    /// malformed documents are dropped instead of producing an error.
    NoInput(PathBuf),
    /// An error parsing a JSON document.
    Json(String),
    /// An error parsing the name of a column.
    ///
    /// The data provided is the unrecognized name.
    UnknownColumn(String),
    /// An error parsing the name of a ranking or grouping metric.
    ///
    /// The data provided is the unrecognized name.
    UnknownMetric(String),
    /// An error parsing the name of a directive from a free-form query.
    ///
    /// The data provided is the unrecognized name.
    UnknownDirective(String),
    /// An unexpected error occurred that should not have occurred.
    /// Generally, these errors correspond to bugs in this library.
    Bug(String),
    /// An error occurred while reading the session config.
    Config(String),
    /// An error that occured while writing CSV data.
    Csv(String),
    /// An unexpected I/O error occurred.
    Io {
        /// The underlying I/O error.
        err: std::io::Error,
        /// A file path, if the I/O error occurred in the context of a named
        /// file.
        path: Option<PathBuf>,
    },
    /// An error occurred while parsing a number in a free-form query.
    Number(Box<dyn std::error::Error + Send + Sync>),
    /// Hints that destructuring should not be exhaustive.
    ///
    /// This enum may grow additional variants, so this makes sure clients
    /// don't count on exhaustive matching. (Otherwise, adding a new variant
    /// could break existing code.)
    #[doc(hidden)]
    __Nonexhaustive,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorKind::NoInput(ref path) => write!(
                f,
                "no movie documents could be read from {}",
                path.display()
            ),
            ErrorKind::Json(ref msg) => write!(f, "JSON error: {}", msg),
            ErrorKind::UnknownColumn(ref unk) => {
                write!(f, "unrecognized column name: '{}'", unk)
            }
            ErrorKind::UnknownMetric(ref unk) => {
                write!(f, "unrecognized metric name: '{}'", unk)
            }
            ErrorKind::UnknownDirective(ref unk) => {
                write!(f, "unrecognized search directive: '{}'", unk)
            }
            ErrorKind::Bug(ref msg) => write!(f, "BUG: {}", msg),
            ErrorKind::Config(ref msg) => write!(f, "config error: {}", msg),
            ErrorKind::Csv(ref msg) => write!(f, "{}", msg),
            ErrorKind::Io { path: None, .. } => write!(f, "I/O error"),
            ErrorKind::Io { path: Some(ref p), .. } => {
                write!(f, "{}", p.display())
            }
            ErrorKind::Number(_) => write!(f, "error parsing number"),
            ErrorKind::__Nonexhaustive => panic!("invalid error"),
        }
    }
}
