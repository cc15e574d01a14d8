//! errors returned while evaluating a configuration
//!
//! Every stage returns the first error it encounters, there are no partial results.
use crate::value::ConversionError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{filename}: unable to parse configuration")]
    Syntax {
        filename: String,
        #[source]
        source: SyntaxError,
    },
    #[error("{filename}: multiple bare include blocks (include blocks without label) are not supported")]
    MultipleBareIncludes { filename: String },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unable to convert value")]
    ConversionFailed(#[from] ConversionError),
    #[error("{filename}: no configuration found")]
    NoConfigurationFound { filename: String },
    #[error("outputs of dependency {name:?} are unavailable")]
    DependencyOutputUnavailable {
        name: String,
        #[source]
        source: RetrievalError,
    },
    #[error("IO error")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum SyntaxError {
    #[error("configuration is not valid utf-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    Hcl(#[from] hcl_edit::parser::Error),
}

/// Failure reported by an [crate::dependency::OutputRetriever]
pub type RetrievalError = Box<dyn std::error::Error + Send + Sync>;

/// Structural decoding failed
#[derive(thiserror::Error, Debug, derive_new::new)]
#[error("{filename}: unable to decode configuration")]
pub struct DecodeError {
    pub filename: String,
    #[source]
    pub kind: DecodeErrorKind,
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeErrorKind {
    #[error("unsupported argument {name:?}")]
    UnsupportedArgument { name: String },
    #[error("unsupported block type {name:?}")]
    UnsupportedBlock { name: String },
    #[error("missing required argument {name:?} in {block} block")]
    MissingArgument { block: String, name: String },
    /// Only reachable for bodies built in code, the parser rejects repeated keys already
    #[error("argument {name:?} was already set")]
    DuplicateArgument { name: String },
    #[error("duplicate {name} block")]
    DuplicateBlock { name: String },
    #[error("dependency {name:?} is declared more than once")]
    DuplicateDependency { name: String },
    #[error("{block} block expects {expected} label(s), found {found}")]
    LabelCount {
        block: String,
        expected: usize,
        found: usize,
    },
    #[error("argument {name:?} expects {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: String,
    },
    #[error("unable to evaluate argument {name:?}")]
    Evaluation {
        name: String,
        #[source]
        source: hcl::eval::Error,
    },
    #[error("dependency {dependency:?} references {reference}; dependency blocks cannot use outputs of other dependencies")]
    DependencyReference {
        dependency: String,
        reference: String,
    },
}

impl DecodeErrorKind {
    /// Evaluation failed because of an undefined variable
    pub fn is_undefined_variable(&self) -> bool {
        let DecodeErrorKind::Evaluation { source, .. } = self else {
            return false;
        };

        matches!(source.kind(), hcl::eval::ErrorKind::UndefinedVar(_))
    }
}
