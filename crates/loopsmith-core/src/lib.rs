//! `loopsmith-core` runs directive-driven transformations over a loopsmith program.
//!
//! Directives are pragmas starting with the reserved prefix (`lsm` unless configured
//! otherwise). The [`Translator`] discovers them, groups them by keyword and applies every
//! group in registration order. A directive that cannot be applied is dropped and reported,
//! the rest of the unit is still transformed.
//!
//! ## Example
//!
//! ```rust
//! use loopsmith_core::{Translator, TranslatorConfig};
//! use loopsmith_ir::{ModuleCache, Program};
//!
//! let mut program = Program::from_xml(r#"
//!   <XcodeProgram source="sample.f90">
//!     <typeTable/>
//!     <globalSymbols/>
//!     <globalDeclarations>
//!       <FfunctionDefinition lineno="1">
//!         <name>sample</name>
//!         <body>
//!           <FpragmaStatement lineno="2">lsm remove</FpragmaStatement>
//!           <FassignStatement lineno="3"><Var>x</Var><Var>y</Var></FassignStatement>
//!         </body>
//!       </FfunctionDefinition>
//!     </globalDeclarations>
//!   </XcodeProgram>"#).unwrap();
//!
//! let translator = Translator::new(TranslatorConfig::default());
//! let report = translator.translate(&mut program, &mut ModuleCache::default()).unwrap();
//!
//! assert_eq!(report.applied(), 1);
//! assert!(!program.to_xml().unwrap().contains("FassignStatement"));
//! ```
mod config;
mod diagnostics;
mod directive;
mod error;
mod group;
mod transformation;
pub mod transformations;
mod translator;

pub use config::{DEFAULT_RESERVED_PREFIX, TranslatorConfig};
pub use diagnostics::{Diagnostic, Report, Severity};
pub use directive::{Clause, ClauseParser, Directive, DirectiveParser, END_KEYWORD};
pub use error::{ConfigError, FatalError};
pub use group::{GroupKind, TransformationGroup};
pub use transformation::{State, Transform, Transformation, TransformationKind};
pub use translator::{REGISTRY, TranslationContext, Translator};
