//! Structural type model
//!
//! The checker produces these, the engine indexes them and the walker
//! decomposes them. Named types are referenced by [`TypeName`] only; their
//! definitions live in the object index, which keeps cyclic graphs finite.

mod defs;

pub use defs::{ConstDef, Constant, Method, Span, TypeDef};

use crate::type_name::{is_exported_ident, TypeName};
use serde::Serialize;
use std::fmt;

/// Predeclared primitive kinds, plus the untyped constant kinds and `Invalid`
/// for anything the checker could not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasicKind::Invalid => "invalid type",
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    /// Look up a predeclared basic type by its identifier. `byte` and `rune`
    /// are aliases and come back as `uint8` and `int32`.
    pub fn from_ident(ident: &str) -> Option<Self> {
        let kind = match ident {
            "bool" => BasicKind::Bool,
            "int" => BasicKind::Int,
            "int8" => BasicKind::Int8,
            "int16" => BasicKind::Int16,
            "int32" | "rune" => BasicKind::Int32,
            "int64" => BasicKind::Int64,
            "uint" => BasicKind::Uint,
            "uint8" | "byte" => BasicKind::Uint8,
            "uint16" => BasicKind::Uint16,
            "uint32" => BasicKind::Uint32,
            "uint64" => BasicKind::Uint64,
            "uintptr" => BasicKind::Uintptr,
            "float32" => BasicKind::Float32,
            "float64" => BasicKind::Float64,
            "complex64" => BasicKind::Complex64,
            "complex128" => BasicKind::Complex128,
            "string" => BasicKind::String,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_untyped(&self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Int8
                | BasicKind::Int16
                | BasicKind::Int32
                | BasicKind::Int64
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, BasicKind::Float32 | BasicKind::Float64 | BasicKind::UntypedFloat)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }
}

impl fmt::Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    /// Tag contents without the surrounding quotes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub embedded: bool,
    /// Import path of the package declaring the field
    pub package: String,
}

impl Field {
    pub fn is_exported(&self) -> bool {
        is_exported_ident(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StructType {
    pub fields: Vec<Field>,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    /// The last param is a slice collected from `...T`
    pub variadic: bool,
}

impl Signature {
    pub fn is_nullary(&self) -> bool {
        self.params.is_empty() && self.results.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceMethod {
    pub name: String,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InterfaceType {
    pub methods: Vec<InterfaceMethod>,
    /// Embedded interfaces (and constraint terms, which carry no methods)
    pub embedded: Vec<Type>,
}

/// A type's structural shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    Basic { basic: BasicKind },
    Named { name: TypeName },
    Struct(StructType),
    Slice { elem: Box<Type> },
    Array { len: u64, elem: Box<Type> },
    Pointer { elem: Box<Type> },
    Map { key: Box<Type>, value: Box<Type> },
    Interface(InterfaceType),
    Signature(Signature),
    Chan { dir: ChanDir, elem: Box<Type> },
}

impl Type {
    pub fn basic(kind: BasicKind) -> Self {
        Type::Basic { basic: kind }
    }

    pub fn named(name: TypeName) -> Self {
        Type::Named { name }
    }

    pub fn invalid() -> Self {
        Type::basic(BasicKind::Invalid)
    }

    pub fn slice(elem: Type) -> Self {
        Type::Slice { elem: Box::new(elem) }
    }

    pub fn array(len: u64, elem: Type) -> Self {
        Type::Array { len, elem: Box::new(elem) }
    }

    pub fn pointer(elem: Type) -> Self {
        Type::Pointer { elem: Box::new(elem) }
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map { key: Box::new(key), value: Box::new(value) }
    }

    /// The predeclared `error` type
    pub fn error() -> Self {
        Type::named(TypeName::builtin("error"))
    }

    /// Underlying structure of the predeclared `error` interface
    pub fn error_interface() -> Self {
        Type::Interface(InterfaceType {
            methods: vec![InterfaceMethod {
                name: "Error".to_string(),
                signature: Signature {
                    params: vec![],
                    results: vec![Type::basic(BasicKind::String)],
                    variadic: false,
                },
            }],
            embedded: vec![],
        })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Basic { basic: BasicKind::Invalid })
    }

    pub fn as_named(&self) -> Option<&TypeName> {
        match self {
            Type::Named { name } => Some(name),
            _ => None,
        }
    }

    pub fn as_basic(&self) -> Option<BasicKind> {
        match self {
            Type::Basic { basic } => Some(*basic),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceType> {
        match self {
            Type::Interface(i) => Some(i),
            _ => None,
        }
    }

    /// Short kind label used in diagnostics
    pub fn kind_str(&self) -> &'static str {
        match self {
            Type::Basic { .. } => "basic",
            Type::Named { .. } => "named",
            Type::Struct(_) => "struct",
            Type::Slice { .. } => "slice",
            Type::Array { .. } => "array",
            Type::Pointer { .. } => "pointer",
            Type::Map { .. } => "map",
            Type::Interface(_) => "interface",
            Type::Signature(_) => "signature",
            Type::Chan { .. } => "chan",
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, types: &[Type], variadic: bool) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match ty {
            Type::Slice { elem } if variadic && i == types.len() - 1 => write!(f, "...{}", elem)?,
            _ => write!(f, "{}", ty)?,
        }
    }
    Ok(())
}

fn write_signature(f: &mut fmt::Formatter<'_>, sig: &Signature) -> fmt::Result {
    f.write_str("(")?;
    write_list(f, &sig.params, sig.variadic)?;
    f.write_str(")")?;
    match sig.results.len() {
        0 => Ok(()),
        1 => write!(f, " {}", sig.results[0]),
        _ => {
            f.write_str(" (")?;
            write_list(f, &sig.results, false)?;
            f.write_str(")")
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic { basic } => f.write_str(basic.as_str()),
            Type::Named { name } => write!(f, "{}", name),
            Type::Struct(s) => {
                f.write_str("struct{")?;
                for (i, field) in s.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                    if let Some(tag) = &field.tag {
                        write!(f, " {:?}", tag)?;
                    }
                }
                f.write_str("}")
            }
            Type::Slice { elem } => write!(f, "[]{}", elem),
            Type::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            Type::Pointer { elem } => write!(f, "*{}", elem),
            Type::Map { key, value } => write!(f, "map[{}]{}", key, value),
            Type::Interface(iface) => {
                f.write_str("interface{")?;
                let mut first = true;
                for embedded in &iface.embedded {
                    if !first {
                        f.write_str("; ")?;
                    }
                    first = false;
                    write!(f, "{}", embedded)?;
                }
                for method in &iface.methods {
                    if !first {
                        f.write_str("; ")?;
                    }
                    first = false;
                    f.write_str(&method.name)?;
                    write_signature(f, &method.signature)?;
                }
                f.write_str("}")
            }
            Type::Signature(sig) => {
                f.write_str("func")?;
                write_signature(f, sig)
            }
            Type::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {}", elem),
                ChanDir::Send => write!(f, "chan<- {}", elem),
                ChanDir::Recv => write!(f, "<-chan {}", elem),
            },
        }
    }
}
