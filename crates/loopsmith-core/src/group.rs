use loopsmith_ir::Program;
use loopsmith_query::TransformError;
use smol_str::SmolStr;

use crate::{
    diagnostics::{Report, Severity},
    transformation::{State, Transformation},
    translator::TranslationContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Each member is analyzed and applied on its own, in discovery order.
    Independent,
    /// Accepted members are paired with a compatible later member and applied as one edit.
    /// A member left without a partner only loses its directive and counts as dropped.
    Dependent,
}

/// All occurrences of one directive keyword in a unit.
#[derive(Debug, Clone)]
pub struct TransformationGroup {
    keyword: SmolStr,
    kind: GroupKind,
    members: Vec<Transformation>,
}

impl TransformationGroup {
    pub fn new(keyword: &str, kind: GroupKind) -> Self {
        Self {
            keyword: keyword.into(),
            kind,
            members: Vec::new(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Transformation] {
        &self.members
    }

    pub fn push(&mut self, transformation: Transformation) {
        self.members.push(transformation);
    }

    pub fn apply(&mut self, program: &mut Program, ctx: &mut TranslationContext<'_>, report: &mut Report) {
        match self.kind {
            GroupKind::Independent => self.apply_independent(program, ctx, report),
            GroupKind::Dependent => self.apply_dependent(program, ctx, report),
        }
    }

    fn apply_independent(&mut self, program: &mut Program, ctx: &mut TranslationContext<'_>, report: &mut Report) {
        let keyword = self.keyword.clone();

        for member in self.members.iter_mut() {
            if !member.is_live(program) {
                log::debug!("Skipping detached `{}` directive at line {}", keyword, member.line());
                continue;
            }
            if !member.analyze(program, ctx) {
                reject(report, &keyword, member);
                continue;
            }

            let result = member.apply(program, ctx);
            record(report, &keyword, member.line(), &result);
        }
    }

    fn apply_dependent(&mut self, program: &mut Program, ctx: &mut TranslationContext<'_>, report: &mut Report) {
        let keyword = self.keyword.clone();

        for member in self.members.iter_mut() {
            if member.is_live(program) && !member.analyze(program, ctx) {
                reject(report, &keyword, member);
            }
        }

        for index in 0..self.members.len() {
            if self.members[index].state() != State::Accepted || !self.members[index].is_live(program) {
                continue;
            }

            let partner = (index + 1..self.members.len()).find(|other| {
                self.members[*other].is_live(program)
                    && self.members[index].can_be_transformed_with(program, &self.members[*other])
            });

            match partner {
                Some(other) => {
                    let (head, tail) = self.members.split_at_mut(other);
                    let (member, partner) = (&mut head[index], &mut tail[0]);
                    log::debug!(
                        "Pairing `{}` directives at lines {} and {}",
                        keyword,
                        member.line(),
                        partner.line()
                    );

                    let result = member.apply_with(program, ctx, partner);
                    record(report, &keyword, member.line(), &result);
                    record(report, &keyword, partner.line(), &result);
                }
                None => {
                    let member = &mut self.members[index];
                    match member.apply(program, ctx) {
                        Ok(()) => report.record_dropped(
                            member.line(),
                            format!("`{}` directive has no compatible partner", keyword),
                            Severity::Info,
                        ),
                        result => record(report, &keyword, member.line(), &result),
                    }
                }
            }
        }
    }
}

fn reject(report: &mut Report, keyword: &str, member: &Transformation) {
    report.record_dropped(
        member.line(),
        format!("`{}` directive rejected by analysis", keyword),
        Severity::Warning,
    );
}

fn record(report: &mut Report, keyword: &str, line: u32, result: &Result<(), TransformError>) {
    match result {
        Ok(()) => {
            log::debug!("Applied `{}` directive at line {}", keyword, line);
            report.record_applied();
        }
        Err(e) => report.record_dropped(line, format!("`{}` directive failed: {}", keyword, e), Severity::Error),
    }
}
