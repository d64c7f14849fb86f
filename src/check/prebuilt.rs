//! Type models for system packages
//!
//! System packages are never parsed. A package found here is served from its
//! prebuilt model; any other system package resolves as opaque, meaning
//! qualified references into it are trusted as named types without checking.

use super::CheckedPackage;
use crate::type_name::TypeName;
use crate::types::{
    BasicKind, ConstDef, Constant, InterfaceMethod, InterfaceType, Method, Signature, StructType,
    Type, TypeDef,
};
use std::collections::HashMap;

/// Registry of ready-made system package models, keyed by import path
#[derive(Debug, Clone, Default)]
pub struct PrebuiltPackages {
    packages: HashMap<String, CheckedPackage>,
}

impl PrebuiltPackages {
    /// Empty registry: every system package is opaque
    pub fn new() -> Self {
        Self::default()
    }

    /// The handful of standard packages generated code most often refers to
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.insert("fmt", fmt_package());
        registry.insert("io", io_package());
        registry.insert("time", time_package());
        registry.insert("encoding/json", json_package());
        registry.insert("errors", CheckedPackage { name: "errors".to_string(), ..Default::default() });
        registry
    }

    pub fn insert(&mut self, path: impl Into<String>, package: CheckedPackage) {
        self.packages.insert(path.into(), package);
    }

    pub fn get(&self, path: &str) -> Option<&CheckedPackage> {
        self.packages.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.packages.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

fn basic(kind: BasicKind) -> Type {
    Type::basic(kind)
}

fn sig(params: Vec<Type>, results: Vec<Type>) -> Signature {
    Signature { params, results, variadic: false }
}

fn iface(methods: Vec<(&str, Signature)>, embedded: Vec<Type>) -> Type {
    Type::Interface(InterfaceType {
        methods: methods
            .into_iter()
            .map(|(name, signature)| InterfaceMethod { name: name.to_string(), signature })
            .collect(),
        embedded,
    })
}

fn value_method(name: &str, signature: Signature) -> Method {
    Method { name: name.to_string(), pointer_receiver: false, signature, span: None }
}

fn fmt_package() -> CheckedPackage {
    let stringer = TypeDef::new(
        TypeName::new("fmt", "Stringer"),
        iface(vec![("String", sig(vec![], vec![basic(BasicKind::String)]))], vec![]),
    );
    CheckedPackage { name: "fmt".to_string(), types: vec![stringer], ..Default::default() }
}

fn io_package() -> CheckedPackage {
    let bytes = Type::slice(basic(BasicKind::Uint8));
    let rw = sig(vec![bytes], vec![basic(BasicKind::Int), Type::error()]);
    let named = |n: &str| Type::named(TypeName::new("io", n));
    let types = vec![
        TypeDef::new(TypeName::new("io", "Reader"), iface(vec![("Read", rw.clone())], vec![])),
        TypeDef::new(TypeName::new("io", "Writer"), iface(vec![("Write", rw)], vec![])),
        TypeDef::new(
            TypeName::new("io", "Closer"),
            iface(vec![("Close", sig(vec![], vec![Type::error()]))], vec![]),
        ),
        TypeDef::new(
            TypeName::new("io", "ReadCloser"),
            iface(vec![], vec![named("Reader"), named("Closer")]),
        ),
        TypeDef::new(
            TypeName::new("io", "WriteCloser"),
            iface(vec![], vec![named("Writer"), named("Closer")]),
        ),
        TypeDef::new(
            TypeName::new("io", "ReadWriter"),
            iface(vec![], vec![named("Reader"), named("Writer")]),
        ),
    ];
    CheckedPackage { name: "io".to_string(), types, ..Default::default() }
}

fn time_package() -> CheckedPackage {
    let duration = TypeName::new("time", "Duration");
    let string_method = value_method("String", sig(vec![], vec![basic(BasicKind::String)]));
    let types = vec![
        TypeDef::new(duration.clone(), basic(BasicKind::Int64)).with_methods(vec![string_method.clone()]),
        TypeDef::new(TypeName::new("time", "Month"), basic(BasicKind::Int)).with_methods(vec![string_method.clone()]),
        TypeDef::new(TypeName::new("time", "Weekday"), basic(BasicKind::Int)).with_methods(vec![string_method.clone()]),
        TypeDef::new(TypeName::new("time", "Time"), Type::Struct(StructType::default()))
            .with_methods(vec![string_method]),
    ];
    let units = [
        ("Nanosecond", 1i128),
        ("Microsecond", 1_000),
        ("Millisecond", 1_000_000),
        ("Second", 1_000_000_000),
        ("Minute", 60_000_000_000),
        ("Hour", 3_600_000_000_000),
    ];
    let consts = units
        .into_iter()
        .map(|(name, value)| ConstDef {
            name: name.to_string(),
            ty: Type::named(duration.clone()),
            value: Constant::Int(value),
            span: None,
        })
        .collect();
    CheckedPackage { name: "time".to_string(), types, consts, ..Default::default() }
}

fn json_package() -> CheckedPackage {
    let bytes = Type::slice(basic(BasicKind::Uint8));
    let types = vec![
        TypeDef::new(
            TypeName::new("encoding/json", "Marshaler"),
            iface(vec![("MarshalJSON", sig(vec![], vec![bytes.clone(), Type::error()]))], vec![]),
        ),
        TypeDef::new(
            TypeName::new("encoding/json", "Unmarshaler"),
            iface(vec![("UnmarshalJSON", sig(vec![bytes.clone()], vec![Type::error()]))], vec![]),
        ),
        TypeDef::new(TypeName::new("encoding/json", "RawMessage"), bytes),
    ];
    CheckedPackage { name: "json".to_string(), types, ..Default::default() }
}
