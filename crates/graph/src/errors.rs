//! Error types for the node graph.
//!
//! [`SourceError`] is what a source provider or type loader may fail with; the
//! compilation driver never lets it escape, it is translated into an issue at
//! the call boundary. [`CompileError`] covers conditions that halt a compile
//! as a whole, after the issues explaining them have been delivered.

use thiserror::Error;

use crate::NodeKind;

// ---------------------------------------------------------------------------
// Provider-facing errors
// ---------------------------------------------------------------------------

/// Failure raised by a source provider or type loader.
///
/// The `Unknown*` variants are the well-known structured failures and are
/// translated into specific issue messages. [`SourceError::AlreadyReported`]
/// means the provider has already raised an issue through its designer and no
/// further issue should be added. Anything else is carried as
/// [`SourceError::Other`] and reported as a generic sourcing failure with the
/// cause attached.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A required property was not configured.
    #[error("Must specify property '{name}'")]
    UnknownProperty {
        /// Name of the missing property.
        name: String,
    },

    /// A type referenced by the provider could not be resolved.
    #[error("Can not load type '{type_name}'")]
    UnknownType {
        /// The unresolvable type name.
        type_name: String,
    },

    /// A resource referenced by the provider could not be obtained.
    #[error("Can not obtain resource at location '{location}'")]
    UnknownResource {
        /// Location of the missing resource.
        location: String,
    },

    /// No provider factory is registered under the requested name.
    #[error("Can not find {kind} source '{name}'")]
    UnknownProvider {
        /// Category of the provider being instantiated.
        kind: NodeKind,
        /// Name the provider was requested under.
        name: String,
    },

    /// The provider has already reported the problem as an issue.
    #[error("Failure already reported")]
    AlreadyReported,

    /// Any other provider failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Compile-level errors
// ---------------------------------------------------------------------------

/// Errors that halt a compile.
///
/// Each stage variant records how many issues had been raised when the stage
/// gave up; the issues themselves have already been delivered to the caller's
/// [`crate::CompilerIssues`] sink.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Sourcing the OfficeFloor tree failed.
    #[error("Failed to source the OfficeFloor ({issues} issues)")]
    Sourcing {
        /// Issues raised so far.
        issues: usize,
    },

    /// The node tree was not fully initialised after sourcing.
    #[error("OfficeFloor node tree is not fully initialised ({issues} issues)")]
    Uninitialised {
        /// Issues raised so far.
        issues: usize,
    },

    /// Auto-wiring could not resolve the graph.
    #[error("Failed to auto-wire the OfficeFloor ({issues} issues)")]
    AutoWire {
        /// Issues raised so far.
        issues: usize,
    },

    /// An execution explorer rejected the wired graph.
    #[error("Execution exploration failed ({issues} issues)")]
    Exploration {
        /// Issues raised so far.
        issues: usize,
    },

    /// Building against the external builder failed.
    #[error("Failed to build the OfficeFloor ({issues} issues)")]
    Build {
        /// Issues raised so far.
        issues: usize,
    },

    /// The compiler configuration is invalid.
    ///
    /// Produced at load time; a compile never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}
