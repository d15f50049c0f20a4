use std::fmt;

use loopsmith_ir::Program;
use loopsmith_query::TransformError;

use crate::{
    directive::Directive,
    transformations::{Demote, ImportBounds, LoopFusion, LoopInterchange, Remove, RotateOperands},
    translator::TranslationContext,
};

/// Lifecycle of one directive occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    New,
    Accepted,
    Rejected,
    Paired,
    Applied,
    Failed,
}

/// The analyze/transform protocol every transformation kind implements.
pub trait Transform: fmt::Debug {
    /// Read-only check of the program around the directive. Facts needed by
    /// [`Transform::transform`] are cached on `self`.
    fn analyze(&mut self, program: &Program, directive: &Directive, ctx: &mut TranslationContext<'_>) -> bool;

    /// Whether `self` and a later `other` of the same kind can be applied as one edit.
    fn can_be_transformed_with(&self, _program: &Program, _other: &Self) -> bool {
        false
    }

    /// Performs the edit. `other` is set only when the group paired two occurrences.
    fn transform(
        &mut self,
        program: &mut Program,
        directive: &Directive,
        ctx: &mut TranslationContext<'_>,
        other: Option<&Self>,
    ) -> Result<(), TransformError>;
}

/// Closed set of transformation kinds, one per registered keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformationKind {
    LoopFusion(LoopFusion),
    LoopInterchange(LoopInterchange),
    ImportBounds(ImportBounds),
    Demote(Demote),
    Remove(Remove),
    RotateOperands(RotateOperands),
}

macro_rules! dispatch {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            TransformationKind::LoopFusion($t) => $body,
            TransformationKind::LoopInterchange($t) => $body,
            TransformationKind::ImportBounds($t) => $body,
            TransformationKind::Demote($t) => $body,
            TransformationKind::Remove($t) => $body,
            TransformationKind::RotateOperands($t) => $body,
        }
    };
}

impl TransformationKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "loop-fusion" => Some(Self::LoopFusion(LoopFusion::default())),
            "loop-interchange" => Some(Self::LoopInterchange(LoopInterchange::default())),
            "import-bounds" => Some(Self::ImportBounds(ImportBounds::default())),
            "demote" => Some(Self::Demote(Demote::default())),
            "remove" => Some(Self::Remove(Remove::default())),
            "rotate-operands" => Some(Self::RotateOperands(RotateOperands::default())),
            _ => None,
        }
    }

    fn analyze(&mut self, program: &Program, directive: &Directive, ctx: &mut TranslationContext<'_>) -> bool {
        dispatch!(self, t => t.analyze(program, directive, ctx))
    }

    fn can_be_transformed_with(&self, program: &Program, other: &TransformationKind) -> bool {
        match (self, other) {
            (Self::LoopFusion(l), Self::LoopFusion(r)) => l.can_be_transformed_with(program, r),
            (Self::LoopInterchange(l), Self::LoopInterchange(r)) => l.can_be_transformed_with(program, r),
            (Self::ImportBounds(l), Self::ImportBounds(r)) => l.can_be_transformed_with(program, r),
            (Self::Demote(l), Self::Demote(r)) => l.can_be_transformed_with(program, r),
            (Self::Remove(l), Self::Remove(r)) => l.can_be_transformed_with(program, r),
            (Self::RotateOperands(l), Self::RotateOperands(r)) => l.can_be_transformed_with(program, r),
            _ => false,
        }
    }

    fn transform(
        &mut self,
        program: &mut Program,
        directive: &Directive,
        ctx: &mut TranslationContext<'_>,
        other: Option<&TransformationKind>,
    ) -> Result<(), TransformError> {
        match (self, other) {
            (Self::LoopFusion(t), Some(Self::LoopFusion(o))) => t.transform(program, directive, ctx, Some(o)),
            (Self::LoopInterchange(t), Some(Self::LoopInterchange(o))) => t.transform(program, directive, ctx, Some(o)),
            (Self::ImportBounds(t), Some(Self::ImportBounds(o))) => t.transform(program, directive, ctx, Some(o)),
            (Self::Demote(t), Some(Self::Demote(o))) => t.transform(program, directive, ctx, Some(o)),
            (Self::Remove(t), Some(Self::Remove(o))) => t.transform(program, directive, ctx, Some(o)),
            (Self::RotateOperands(t), Some(Self::RotateOperands(o))) => t.transform(program, directive, ctx, Some(o)),
            (_, Some(_)) => Err(TransformError::Illegal(
                "Cannot pair transformations of different kinds".to_string(),
            )),
            (kind, None) => dispatch!(kind, t => t.transform(program, directive, ctx, None)),
        }
    }
}

/// One directive occurrence bound to its transformation kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    directive: Directive,
    kind: TransformationKind,
    state: State,
}

impl Transformation {
    pub fn new(directive: Directive, kind: TransformationKind) -> Self {
        Self {
            directive,
            kind,
            state: State::New,
        }
    }

    pub fn directive(&self) -> &Directive {
        &self.directive
    }

    pub fn kind(&self) -> &TransformationKind {
        &self.kind
    }

    pub fn state(&self) -> State {
        self.state
    }

    #[inline(always)]
    pub fn line(&self) -> u32 {
        self.directive.line
    }

    /// Whether the directive pragma is still attached to the tree.
    pub fn is_live(&self, program: &Program) -> bool {
        program.tree().parent(self.directive.pragma).is_some()
    }

    pub fn analyze(&mut self, program: &Program, ctx: &mut TranslationContext<'_>) -> bool {
        let accepted = self.kind.analyze(program, &self.directive, ctx);
        self.state = if accepted { State::Accepted } else { State::Rejected };
        accepted
    }

    pub fn can_be_transformed_with(&self, program: &Program, other: &Transformation) -> bool {
        self.state == State::Accepted
            && other.state == State::Accepted
            && self.kind.can_be_transformed_with(program, &other.kind)
    }

    pub fn apply(&mut self, program: &mut Program, ctx: &mut TranslationContext<'_>) -> Result<(), TransformError> {
        self.run(program, ctx, None)
    }

    /// Applies `self` and `other` as one edit and removes both pragmas.
    pub fn apply_with(
        &mut self,
        program: &mut Program,
        ctx: &mut TranslationContext<'_>,
        other: &mut Transformation,
    ) -> Result<(), TransformError> {
        self.run(program, ctx, Some(other))
    }

    fn run(
        &mut self,
        program: &mut Program,
        ctx: &mut TranslationContext<'_>,
        mut other: Option<&mut Transformation>,
    ) -> Result<(), TransformError> {
        let ready = |state: State| state == State::Accepted;
        if !ready(self.state) || other.as_deref().is_some_and(|o| !ready(o.state)) {
            return Err(TransformError::Illegal(format!(
                "Directive `{}` applied before a successful analysis",
                self.directive.keyword
            )));
        }

        if let Some(other) = other.as_deref_mut() {
            self.state = State::Paired;
            other.state = State::Paired;
        }

        let result = self.kind.transform(
            program,
            &self.directive,
            ctx,
            other.as_deref().map(|o| &o.kind),
        );
        let state = if result.is_ok() { State::Applied } else { State::Failed };

        self.state = state;
        if result.is_ok() {
            program.tree_mut().delete(self.directive.pragma);
        }
        if let Some(other) = other {
            other.state = state;
            if result.is_ok() {
                program.tree_mut().delete(other.directive.pragma);
            }
        }

        result
    }
}
