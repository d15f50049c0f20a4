use std::fmt::{self, Display};

use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One located message about a directive of the unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub file: SmolStr,
    pub line: u32,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(file: impl Into<SmolStr>, line: u32, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
            severity,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.file, self.line, self.severity, self.message)
    }
}

/// Outcome of translating one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    file: SmolStr,
    diagnostics: Vec<Diagnostic>,
    applied: usize,
    dropped: usize,
}

impl Report {
    pub fn new(file: impl Into<SmolStr>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Transformations whose edit went through.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Transformations rejected by their analysis or failed during their edit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub(crate) fn record_applied(&mut self) {
        self.applied += 1;
    }

    pub(crate) fn record_dropped(&mut self, line: u32, message: impl Into<String>, severity: Severity) {
        self.dropped += 1;
        self.push(line, message, severity);
    }

    pub(crate) fn push(&mut self, line: u32, message: impl Into<String>, severity: Severity) {
        let diagnostic = Diagnostic::new(self.file.clone(), line, message, severity);
        match severity {
            Severity::Error => log::warn!("{}", diagnostic),
            Severity::Warning | Severity::Info => log::info!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::new("demo.f90", 12, "Unknown directive `fuse`", Severity::Warning);

        assert_eq!(diagnostic.to_string(), "demo.f90:12: warning: Unknown directive `fuse`");
    }

    #[test]
    fn test_report_counts() {
        let mut report = Report::new("demo.f90");
        report.record_applied();
        report.record_dropped(3, "rejected", Severity::Warning);
        assert!(!report.has_errors());

        report.record_dropped(7, "failed", Severity::Error);
        report.push(9, "note", Severity::Info);

        assert_eq!(report.applied(), 1);
        assert_eq!(report.dropped(), 2);
        assert!(report.has_errors());
        assert_eq!(report.diagnostics().len(), 3);
        assert_eq!(report.diagnostics()[1].line, 7);
        assert_eq!(report.diagnostics()[1].file, "demo.f90");
    }
}
