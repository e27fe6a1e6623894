//! Error types for the codeweave-ir crate.
//!
//! Categorized error kinds with optional file/line context and source
//! chaining. Per-file faults are contained by callers; only the categories
//! here cross module boundaries.

use std::fmt;

/// Error kind categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Parsing errors (unparseable source)
    Parse,
    /// Walker faults converting AST to IR
    IrGeneration,
    /// Type resolution errors
    TypeResolution,
    /// Cross-file resolution errors
    CrossFile,
    /// Provenance fingerprinting errors
    Provenance,
    /// Wire format encode/decode errors
    Wire,
    /// Configuration errors
    Config,
    /// IO errors
    Io,
    /// Internal errors (bugs)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::IrGeneration => "ir_generation",
            ErrorKind::TypeResolution => "type_resolution",
            ErrorKind::CrossFile => "cross_file",
            ErrorKind::Provenance => "provenance",
            ErrorKind::Wire => "wire",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Unified error type
#[derive(Debug)]
pub struct CodeweaveError {
    pub kind: ErrorKind,
    pub message: String,
    pub file_path: Option<String>,
    pub line: Option<u32>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CodeweaveError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file_path: None,
            line: None,
            source: None,
        }
    }

    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn ir_generation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IrGeneration, message)
    }

    pub fn type_resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeResolution, message)
    }

    pub fn cross_file(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CrossFile, message)
    }

    pub fn provenance(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Provenance, message)
    }

    pub fn wire(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Wire, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for CodeweaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)?;
        if let Some(ref file) = self.file_path {
            write!(f, " in {}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CodeweaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for CodeweaveError {
    fn from(err: std::io::Error) -> Self {
        CodeweaveError::io(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for CodeweaveError {
    fn from(err: serde_json::Error) -> Self {
        CodeweaveError::wire(format!("JSON serialization error: {}", err)).with_source(err)
    }
}

impl From<rmp_serde::encode::Error> for CodeweaveError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        CodeweaveError::wire(format!("msgpack encode error: {}", err)).with_source(err)
    }
}

impl From<rmp_serde::decode::Error> for CodeweaveError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        CodeweaveError::wire(format!("msgpack decode error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CodeweaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodeweaveError::parse("unexpected token")
            .with_file("test.py")
            .with_line(42);

        let msg = format!("{}", err);
        assert!(msg.contains("parse"));
        assert!(msg.contains("unexpected token"));
        assert!(msg.contains("test.py"));
        assert!(msg.contains("42"));
    }
}
