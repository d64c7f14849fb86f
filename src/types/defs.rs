//! Package-scope definitions produced by a checker

use super::{Signature, Type};
use crate::type_name::{is_exported_ident, TypeName};
use serde::Serialize;
use std::fmt;

/// Where a declaration lives in its package's sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    /// File base name inside the package directory
    pub file: String,
    pub start_byte: usize,
    pub end_byte: usize,
    /// 1-based line of the first byte
    pub line: usize,
}

/// A method declared on a named type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    pub name: String,
    /// Declared on `*T` rather than `T`
    pub pointer_receiver: bool,
    pub signature: Signature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// A package-scope named type as the object index stores it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDef {
    pub name: TypeName,
    /// Underlying structure, or the aliased type when `alias` is set
    pub underlying: Type,
    pub methods: Vec<Method>,
    pub alias: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl TypeDef {
    pub fn new(name: TypeName, underlying: Type) -> Self {
        Self { name, underlying, methods: Vec::new(), alias: false, span: None }
    }

    pub fn with_methods(mut self, methods: Vec<Method>) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn is_interface(&self) -> bool {
        !self.alias && matches!(self.underlying, Type::Interface(_))
    }

    /// The type this definition introduces when referenced by name
    pub fn as_type(&self) -> Type {
        if self.alias {
            self.underlying.clone()
        } else {
            Type::named(self.name.clone())
        }
    }
}

/// A compile-time constant value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Constant {
    Bool(bool),
    String(String),
    Int(i128),
    Float(f64),
}

impl Constant {
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Constant::Int(v) => Some(*v),
            Constant::Float(v) if v.fract() == 0.0 => Some(*v as i128),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Constant::Int(v) => Some(*v as f64),
            Constant::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(v) => write!(f, "{}", v),
            Constant::String(v) => write!(f, "{:?}", v),
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A package-scope constant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    pub value: Constant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl ConstDef {
    pub fn is_exported(&self) -> bool {
        is_exported_ident(&self.name)
    }
}
