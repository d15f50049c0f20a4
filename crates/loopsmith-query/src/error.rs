use loopsmith_ir::ModuleError;
use smol_str::SmolStr;
use thiserror::Error;

/// Failure of one structural edit, scoped to the transformation that requested it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Lower/upper bound type currently not supported ({0})")]
    UnsupportedBound(SmolStr),
    #[error("Induction variable or index range missing")]
    MissingIterationRange,
    #[error("Expected a do statement, found `{0}`")]
    NotALoop(SmolStr),
    #[error("One of the bodies is missing")]
    NotABody,
    #[error("{0}")]
    Illegal(String),
    #[error(transparent)]
    Module(#[from] ModuleError),
}
