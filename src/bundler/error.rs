//! Error types for packaging operations.
//!
//! Provides contextual error chaining, filesystem-specific errors and the
//! packaging taxonomy (validation, structure, template, runtime, external tool
//! and installer errors).
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages
//!
//! # Example
//!
//! ```no_run
//! use app_packager::bundler::{Error, Result};
//! use std::path::Path;
//!
//! fn require_icon(path: &Path) -> Result<()> {
//!     if !path.exists() {
//!         return Err(Error::Validation(format!("icon {} not found", path.display())));
//!     }
//!     Ok(())
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the packager.
///
/// Every variant except [`Error::RuntimeCustomization`] is fatal to the
/// current run. Nothing is retried.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "reading icon file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// A child process could not be spawned.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// Bad or missing required configuration. Raised before any output is written.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// The app folder could not be assembled.
    #[error("app structure error: {0}")]
    Structure(String),

    /// A template failed to render.
    #[error("failed to render template {template}: {reason}")]
    Template {
        /// Template id
        template: String,
        /// Renderer message
        reason: String,
    },

    /// No template is registered under the requested id.
    #[error("unknown template {0}")]
    UnknownTemplate(String),

    /// Module analysis could not produce a complete module set.
    ///
    /// The runtime customizer recovers from this by bundling all modules.
    #[error("runtime customization failed: {0}")]
    RuntimeCustomization(String),

    /// An external packaging tool reported a failure.
    #[error("{tool} {goal} failed: {reason}")]
    ExternalTool {
        /// Tool identity
        tool: String,
        /// Goal or operation id
        goal: String,
        /// Exit status and captured stderr, or the in-process failure
        reason: String,
    },

    /// An external tool is not installed.
    #[error("{tool} not found (looked in {searched})")]
    ToolNotFound {
        /// Tool identity
        tool: String,
        /// Where the program was searched
        searched: String,
    },

    /// Generating one installer format failed.
    #[error("failed to generate {format} installer: {source}")]
    InstallerGeneration {
        /// Installer format short name
        format: &'static str,
        /// The underlying failure
        #[source]
        source: Box<Self>,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Image processing error (icon conversion, resizing).
    #[error("{0}")]
    ImageError(#[from] image::ImageError),

    /// Error walking a directory.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// ZIP archive creation/extraction error.
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    TemplateParse(#[from] handlebars::TemplateError),

    /// JSON serialization error.
    #[error("{0}")]
    JsonError(#[from] serde_json::error::Error),

    /// Property list writing error.
    #[error("{0}")]
    Plist(#[from] plist::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Wraps a failure of one installer format.
    pub fn installer(format: &'static str, source: Error) -> Self {
        Error::InstallerGeneration {
            format,
            source: Box::new(source),
        }
    }

    /// Returns the innermost error, skipping context and installer wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Context(_, inner) => inner.root_cause(),
            Error::InstallerGeneration { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the packager's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying dependency".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_unwraps_installer_and_context() {
        let err = Error::installer(
            "deb",
            Error::Context(
                "invoking jdeb".into(),
                Box::new(Error::ExternalTool {
                    tool: "jdeb".into(),
                    goal: "jdeb".into(),
                    reason: "boom".into(),
                }),
            ),
        );
        assert!(matches!(err.root_cause(), Error::ExternalTool { .. }));
        assert!(err.to_string().starts_with("failed to generate deb installer"));
    }

    #[test]
    fn fs_context_keeps_path() {
        let res: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = res.fs_context("reading icon", "/tmp/icon.png").unwrap_err();
        assert_eq!(err.to_string(), "reading icon /tmp/icon.png: gone");
    }
}
