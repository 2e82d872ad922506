use miette::Diagnostic;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("{message}")]
    CompilerTooOld {
        compiler: String,
        version: f64,
        minimum: f64,
        message: String,
    },

    #[error("compiler version `{version}` of {compiler} is not a number")]
    #[diagnostic(help("pass a numeric setting, e.g. -s compiler.version=15"))]
    InvalidCompilerVersion { compiler: String, version: String },
}

/// A build-system step that did not complete.
#[derive(Debug, Error)]
pub enum DelegateFailure {
    #[error("{step} failed: {status}")]
    Failed { step: &'static str, status: ExitStatus },

    #[error("failed to launch {program} for {step}")]
    Spawn {
        step: &'static str,
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CopyFailure {
    #[error("invalid copy pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },

    #[error("failed copying {from} to {to}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
