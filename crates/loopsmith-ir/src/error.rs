use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IrError {
    #[error("XML error: {0}")]
    Xml(String),
    #[error("Document has no root element")]
    EmptyDocument,
    #[error("Unexpected root element `{found}`, expected `{expected}`")]
    UnexpectedRoot { expected: &'static str, found: SmolStr },
    #[error("Missing required table `{0}`")]
    MissingTable(&'static str),
    #[error("IO error: {0}")]
    IOError(String),
}
