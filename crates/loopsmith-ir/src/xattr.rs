//! Attribute names used by the intermediate tree.

pub const COMPILER_INFO: &str = "compiler-info";
pub const FILE: &str = "file";
pub const INTENT: &str = "intent";
pub const IS_ASSUMED_SHAPE: &str = "is_assumed_shape";
pub const IS_CONTINUED: &str = "is_continued";
pub const IS_PURE: &str = "is_pure";
pub const LANGUAGE: &str = "language";
pub const LINENO: &str = "lineno";
pub const NAME: &str = "name";
pub const REF: &str = "ref";
pub const RETURN_TYPE: &str = "return_type";
pub const SCLASS: &str = "sclass";
pub const SCOPE: &str = "scope";
pub const SOURCE: &str = "source";
pub const TIME: &str = "time";
pub const TYPE: &str = "type";
pub const VERSION: &str = "version";
