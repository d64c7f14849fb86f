//! Type-graph walker
//!
//! Decomposes a type into its structural parts and reports each one to a
//! [`TypeVisitor`]. Descent stops at every named type, so a struct that
//! refers to itself (directly or through other named types) still yields a
//! finite walk. To go deeper, walk the named type's underlying type
//! explicitly.
//!
//! Shapes handled: structs, slices, arrays, pointers, maps, named types and
//! basic types. Interfaces, function types and channels are rejected with
//! [`Error::UnhandledKind`](crate::Error::UnhandledKind).

mod visitor;
mod walker;

pub use visitor::{MultiVisitor, PartialVisitor, TypeVisitor};
pub use walker::{walk, WalkContext};

use crate::type_name::TypeName;
use crate::types::StructType;

/// What an `enter_*` hook wants the walker to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    /// Do not descend into this node; its `leave_*` hook is not called
    /// either. Siblings are still walked.
    SkipBranch,
}

/// A struct being walked.
///
/// Anonymous structs have no [`TypeName`] of their own, so `package` and
/// `name` describe where the struct sits: the root's package and name at
/// the top, the declaring package and field name for a field's type, and
/// the element type's spelling inside containers.
#[derive(Debug, Clone, Copy)]
pub struct StructInfo<'s> {
    pub package: &'s str,
    pub name: &'s str,
    /// Type the walk started from
    pub root: &'s TypeName,
    pub strukt: &'s StructType,
}
