//! `loopsmith-query` is the toolbox transformations are written with.
//!
//! Every function takes the [`Tree`](loopsmith_ir::Tree) explicitly. Lookups return `Option`
//! or an empty `Vec` when nothing matches, edits that can fail return a [`TransformError`]
//! scoped to the transformation that asked for them.
//!
//! ## Example
//!
//! ```rust
//! use loopsmith_ir::xml;
//! use loopsmith_query::loops;
//!
//! let (mut tree, root) = xml::parse(r#"
//!   <body>
//!     <FdoStatement lineno="1">
//!       <Var>i</Var><indexRange><lowerBound><FintConstant>1</FintConstant></lowerBound>
//!       <upperBound><Var>n</Var></upperBound></indexRange><body/>
//!     </FdoStatement>
//!     <FdoStatement lineno="4">
//!       <Var>j</Var><indexRange><lowerBound><FintConstant>1</FintConstant></lowerBound>
//!       <upperBound><Var>m</Var></upperBound></indexRange><body/>
//!     </FdoStatement>
//!   </body>"#).unwrap();
//!
//! let first = tree.child(root, 0).unwrap();
//! let second = tree.child(root, 1).unwrap();
//! assert!(!loops::has_same_index_range(&tree, first, second));
//!
//! loops::swap_iteration_range(&mut tree, first, second).unwrap();
//! assert_eq!(loops::extract_induction_variable(&tree, first), Some("j"));
//! ```
pub mod body;
pub mod bound;
pub mod call;
mod error;
pub mod function;
pub mod loops;
pub mod pragma;
pub mod references;
pub mod siblings;

pub use error::TransformError;
