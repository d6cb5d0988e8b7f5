use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The taxonomy follows what the build pipeline guarantees to callers:
///
/// - Encoding problems ([`Error::UnknownEncoding`], [`Error::Malformed`],
///   [`Error::TypedefCycle`], [`Error::RecursionLimit`]) are fatal for the whole
///   generation run; a mis-decoded type would silently corrupt argument
///   marshaling downstream.
/// - [`Error::UnresolvedReference`] is fatal unless the resolver could produce
///   "did you mean" suggestions, in which case it is logged and the name skipped.
/// - Cache corruption is *never* surfaced as an error; the cache degrades to a
///   cold rebuild instead, so there is deliberately no variant for it.
/// - I/O failures ([`Error::FileError`]) fail the run before the generated set
///   is committed, so the next invocation retries as a cold build.
#[derive(Error, Debug)]
pub enum Error {
    /// A type-encoding string uses a token this decoder does not know.
    ///
    /// Carries the full offending encoding and the cursor index at which
    /// decoding stopped, so the root cause can be located in the native
    /// headers without reading the decoder internals.
    #[error("unknown type encoding {encoding:?} at index {index}")]
    UnknownEncoding {
        /// The complete encoding string being decoded
        encoding: String,
        /// Byte index of the character that could not be dispatched
        index: usize,
    },

    /// Metadata or an encoding was structurally invalid.
    ///
    /// Includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while decoding an encoding string.
    #[error("out of bound read would have occurred")]
    OutOfBounds,

    /// A named class, struct, protocol or typedef reference could not be
    /// resolved against the metabase.
    ///
    /// When `suggestions` is non-empty the resolver treats this as a warning
    /// ("did you mean ...") instead of failing the run.
    #[error("could not resolve type reference {name:?}{}", format_suggestions(suggestions))]
    UnresolvedReference {
        /// The name that failed to resolve
        name: String,
        /// Phonetically close known names, if any
        suggestions: Vec<String>,
    },

    /// A typedef chain loops back on itself.
    ///
    /// Valid native headers never produce this, but the decoder must fail
    /// rather than follow the chain forever.
    #[error("typedef {0:?} is part of a cycle")]
    TypedefCycle(String),

    /// Recursion limit reached while decoding a nested encoding.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("reached the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// A metabase entry carries an encoding its decoder rejected.
    ///
    /// Wraps the underlying decode failure with the owning type and the
    /// header it was scanned from, so a fatal run points at the native
    /// declaration instead of a bare encoding string.
    #[error("failed to decode type {name:?} from {filename}: {source}")]
    TypeDecode {
        /// The metabase entry that owns the bad encoding
        name: String,
        /// Header file the entry was scanned from
        filename: String,
        /// The underlying decode failure
        source: Box<Error>,
    },

    /// A block signature had no matching block descriptor in any module.
    #[error("no block found with signature {0:?}")]
    BlockNotFound(String),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that occur while reading the metabase or
    /// writing and deleting generated sources.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The metabase document could not be deserialized.
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Attach the owning metabase entry to a decode failure.
    #[must_use]
    pub fn in_type(self, name: &str, filename: &str) -> Error {
        Error::TypeDecode {
            name: name.to_string(),
            filename: filename.to_string(),
            source: Box::new(self),
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" - did you mean {}?", suggestions.join(" or "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_macro_captures_location() {
        let err = malformed_error!("unbalanced struct span in {}", "{CGRect");
        match err {
            Error::Malformed { message, file, .. } => {
                assert!(message.contains("{CGRect"));
                assert!(file.ends_with("error.rs"));
            }
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn test_unresolved_reference_display() {
        let err = Error::UnresolvedReference {
            name: "UIVew".into(),
            suggestions: vec!["UIView".into()],
        };
        let text = err.to_string();
        assert!(text.contains("UIVew"));
        assert!(text.contains("did you mean UIView?"));

        let bare = Error::UnresolvedReference {
            name: "Bogus".into(),
            suggestions: Vec::new(),
        };
        assert!(!bare.to_string().contains("did you mean"));
    }

    #[test]
    fn test_type_decode_context_display() {
        let err = Error::UnknownEncoding {
            encoding: "z".into(),
            index: 0,
        }
        .in_type("UIView", "UIView.h");
        let text = err.to_string();
        assert!(text.contains("UIView"));
        assert!(text.contains("UIView.h"));
        assert!(text.contains("unknown type encoding"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "metabase.json");
        let err: Error = io.into();
        assert!(matches!(err, Error::FileError(_)));
    }
}
