use std::borrow::Cow;

use loopsmith_ir::IrError;
use miette::Diagnostic;

/// A whole-unit failure. The program is left exactly as it was handed in.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{file}: {cause}")]
pub struct FatalError {
    /// The underlying cause of the error.
    pub cause: IrError,
    /// Source file of the unit that could not be translated.
    pub file: String,
}

impl FatalError {
    pub fn new(file: impl Into<String>, cause: IrError) -> Self {
        Self {
            cause,
            file: file.into(),
        }
    }
}

impl Diagnostic for FatalError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match self.cause {
            IrError::Xml(_) => "loopsmith::fatal::Xml",
            IrError::EmptyDocument => "loopsmith::fatal::EmptyDocument",
            IrError::UnexpectedRoot { .. } => "loopsmith::fatal::UnexpectedRoot",
            IrError::MissingTable(_) => "loopsmith::fatal::MissingTable",
            IrError::IOError(_) => "loopsmith::fatal::IOError",
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            IrError::Xml(_) => Some("The input is not well-formed XML.".to_string()),
            IrError::EmptyDocument => Some("The input document has no root element.".to_string()),
            IrError::UnexpectedRoot { expected, .. } => {
                Some(format!("A translation unit must be rooted at `{expected}`."))
            }
            IrError::MissingTable(table) => Some(format!(
                "Every translation unit needs a `{table}` element directly below its root."
            )),
            IrError::IOError(_) => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }
}

/// Failure to read or parse a translator configuration file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file `{path}`: {message}")]
    IOError { path: Cow<'static, str>, message: String },
    #[error("Invalid config: {0}")]
    Parse(String),
}

impl Diagnostic for ConfigError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match self {
            ConfigError::IOError { .. } => "loopsmith::config::IOError",
            ConfigError::Parse(_) => "loopsmith::config::Parse",
        };

        Some(Box::new(c))
    }
}
