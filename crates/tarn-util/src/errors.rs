use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all tarn operations.
#[derive(Debug, Error, Diagnostic)]
pub enum TarnError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A requirement string could not be parsed.
    #[error("Invalid requirement `{input}`: {message}")]
    #[diagnostic(help("Requirements look like `name[extra]>=1.0; python_version >= \"3.8\"`"))]
    Requirement { input: String, message: String },

    /// A version specifier could not be parsed.
    #[error("Invalid version specifier `{input}`: {message}")]
    Specifier { input: String, message: String },

    /// An environment marker could not be parsed.
    #[error("Invalid marker `{input}`: {message}")]
    Marker { input: String, message: String },

    /// A URL or path link could not be parsed.
    #[error("Invalid link `{input}`: {message}")]
    Link { input: String, message: String },

    /// Package metadata was unreadable or inconsistent with what was expected.
    #[error("Metadata error for {package}: {message}")]
    Metadata { package: String, message: String },

    /// The package index could not be read or queried.
    #[error("Index error: {message}")]
    #[diagnostic(help("Check the index file passed with --index"))]
    Index { message: String },

    /// Dependency resolution failed (conflicts, missing packages, too many rounds).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// A requirement cannot be turned into something installable.
    #[error("Installation error: {message}")]
    Installation { message: String },

    /// An artifact's digest did not match any allowed hash.
    #[error("Hash mismatch for {path}: got {algorithm}:{got}")]
    #[diagnostic(help("The artifact changed or the --hash option is wrong"))]
    HashMismatch {
        path: String,
        algorithm: String,
        got: String,
    },

    /// Invalid or malformed configuration file.
    #[error("Config error: {message}")]
    #[diagnostic(help("Check ~/.tarn/config.toml for syntax errors"))]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type TarnResult<T> = miette::Result<T>;
