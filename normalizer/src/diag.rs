// diag.rs — Unified diagnostics model
//
// Provides the diagnostic and error types shared by every normalization pass.
// Diagnostics point at a graph location (node, optionally a port) instead of
// a source span: the normalizer never sees source text.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::graph::NodeId;
use crate::pass::{descriptor, PassId};

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// Input is not a network port graph (validator rejected it).
    pub const E0001: DiagCode = DiagCode("E0001");
    /// Structural problem found by the default validator.
    pub const E0002: DiagCode = DiagCode("E0002");
    /// A fan bundle reached tree synthesis with no endpoints.
    pub const E0100: DiagCode = DiagCode("E0100");
    /// No placement rule produced a parent scope.
    pub const E0101: DiagCode = DiagCode("E0101");
    /// A synthesized node id is already taken.
    pub const E0102: DiagCode = DiagCode("E0102");
    /// A port has no declared type.
    pub const E0103: DiagCode = DiagCode("E0103");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Location ─────────────────────────────────────────────────────────────

/// Where in the graph a diagnostic applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub node: NodeId,
    pub port: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => write!(f, "{}:{}", self.node, port),
            None => write!(f, "{}", self.node),
        }
    }
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by validation or by any normalization pass.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub location: Option<Location>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, location, or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            location: None,
            message: message.into(),
            hint: None,
        }
    }

    /// Shorthand for an error-level diagnostic carrying `code`.
    pub fn error(code: DiagCode, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message).with_code(code)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the node the diagnostic refers to.
    pub fn at_node(mut self, node: &NodeId) -> Self {
        self.location = Some(Location {
            node: node.clone(),
            port: None,
        });
        self
    }

    /// Attach the port the diagnostic refers to.
    pub fn at_port(mut self, node: &NodeId, port: &str) -> Self {
        self.location = Some(Location {
            node: node.clone(),
            port: Some(port.to_string()),
        });
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(location) = &self.location {
            write!(f, "\n  at: {}", location)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Error type ───────────────────────────────────────────────────────────

/// Normalization failed; nothing was committed.
///
/// `failing_pass` is `None` when the input was rejected before any pass ran.
#[derive(Debug, Clone)]
pub struct NormalizeError {
    pub failing_pass: Option<PassId>,
    pub diagnostics: Vec<Diagnostic>,
}

impl NormalizeError {
    pub fn in_pass(pass: PassId, diagnostic: Diagnostic) -> Self {
        Self {
            failing_pass: Some(pass),
            diagnostics: vec![diagnostic],
        }
    }

    /// Whether any diagnostic carries `code`.
    pub fn has_code(&self, code: DiagCode) -> bool {
        self.diagnostics.iter().any(|d| d.code == Some(code))
    }
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failing_pass {
            Some(pass) => write!(f, "normalization failed in {}", descriptor(pass).name)?,
            None => write!(f, "cannot normalize input")?,
        }
        for diag in &self.diagnostics {
            write!(f, "\n{}", diag)?;
        }
        Ok(())
    }
}

impl std::error::Error for NormalizeError {}
