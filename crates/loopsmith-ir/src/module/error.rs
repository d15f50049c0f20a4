use std::borrow::Cow;

use thiserror::Error;

use crate::IrError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModuleError {
    #[error("Module `{0}` not found")]
    NotFound(Cow<'static, str>),
    #[error("Module `{name}` is invalid: {source}")]
    Invalid { name: Cow<'static, str>, source: IrError },
    #[error("IO error: {0}")]
    IOError(Cow<'static, str>),
}
