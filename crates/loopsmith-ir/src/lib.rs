//! `loopsmith-ir` holds the intermediate tree that every loopsmith transformation mutates.
//!
//! The tree is an arena of nodes addressed by [`NodeId`] handles. A [`Program`] owns one
//! translation unit (tree, type table, global symbols and declarations), a [`Module`] is a
//! separately compiled unit loaded read-only through the [`ModuleCache`].
//!
//! ## Example
//!
//! ```rust
//! use loopsmith_ir::{Program, Xcode};
//!
//! let program = Program::from_xml(r#"
//!   <XcodeProgram source="demo.f90" language="Fortran">
//!     <typeTable/>
//!     <globalSymbols/>
//!     <globalDeclarations>
//!       <FfunctionDefinition lineno="1"><name>demo</name><body/></FfunctionDefinition>
//!     </globalDeclarations>
//!   </XcodeProgram>"#).unwrap();
//!
//! let tree = program.tree();
//! let functions = tree.match_all(program.root(), Xcode::FunctionDefinition);
//! assert_eq!(functions.len(), 1);
//! assert_eq!(program.global_declarations().len(), 1);
//! ```
mod error;
pub mod module;
mod node;
mod program;
mod symbol;
mod types;
pub mod xattr;
mod xcode;
pub mod xml;

pub use error::IrError;
pub use module::error::ModuleError;
pub use module::resolver::{LocalFsModuleResolver, ModuleResolver};
pub use module::{MODULE_FILE_EXTENSION, Module, ModuleCache};
pub use node::{NodeData, NodeId, Tree};
pub use program::{Program, Unit};
pub use symbol::{DeclarationTable, Symbol, SymbolTable};
pub use types::{BasicType, FunctionType, Intent, Param, TypeEntry, TypeTable, is_builtin_type};
pub use xcode::Xcode;
