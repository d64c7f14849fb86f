//! Interface satisfaction
//!
//! Method sets follow Go's rules: a value of type `T` has the value-receiver
//! methods of `T`, `*T` has all of them, and methods promoted through
//! embedded fields keep the receiver form of the embedding. Shallower
//! methods shadow deeper ones.

use super::PackageSet;
use crate::type_name::TypeName;
use crate::types::{Field, InterfaceType, Signature, Type, TypeDef};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Which form of a type satisfies an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Implementation {
    /// `T` itself
    Value,
    /// Only `*T`
    Pointer,
}

impl Implementation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Implementation::Value => "value",
            Implementation::Pointer => "pointer",
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(super) type MethodSet = BTreeMap<String, Signature>;

/// Alias chains longer than this are treated as broken
const MAX_ALIAS_DEPTH: usize = 32;

impl PackageSet {
    /// Every indexed non-interface type that satisfies `iface`, by value or
    /// through a pointer.
    ///
    /// Only packages resolved so far are searched; the interface's own
    /// package is resolved if needed.
    pub fn find_implementers(&mut self, iface: &TypeName) -> Result<BTreeMap<TypeName, Implementation>> {
        if self.package(&iface.package_path).is_none() {
            self.resolve(&iface.package_path)?;
        }
        let def = self
            .definition(iface)
            .ok_or_else(|| Error::ObjectNotFound(iface.to_string()))?;
        let required = self
            .interface_methods(&def.as_type())
            .ok_or_else(|| Error::NotInterface(iface.to_string()))?;

        let mut found = BTreeMap::new();
        for (name, obj) in self.index().iter() {
            if name == iface || obj.alias || obj.is_interface() {
                continue;
            }
            let value = Type::named(name.clone());
            if self.satisfies(&value, &required) {
                found.insert(name.clone(), Implementation::Value);
            } else if self.satisfies(&Type::pointer(value), &required) {
                found.insert(name.clone(), Implementation::Pointer);
            }
        }
        tracing::debug!(interface = %iface, found = found.len(), "implementer search");
        Ok(found)
    }

    /// Whether `ty` or `*ty` satisfies `iface`, which may be a named
    /// interface or an interface literal
    pub fn implements(&self, ty: &Type, iface: &Type) -> Result<bool> {
        let required = self
            .interface_methods(iface)
            .ok_or_else(|| Error::NotInterface(iface.to_string()))?;
        if ty == iface || self.satisfies(ty, &required) {
            return Ok(true);
        }
        if matches!(ty, Type::Pointer { .. }) {
            return Ok(false);
        }
        Ok(self.satisfies(&Type::pointer(ty.clone()), &required))
    }

    fn satisfies(&self, ty: &Type, required: &MethodSet) -> bool {
        let have = self.method_set(ty);
        required
            .iter()
            .all(|(name, sig)| have.get(name).is_some_and(|found| found == sig))
    }

    /// Also knows the predeclared `error`
    fn type_def(&self, name: &TypeName) -> Option<Arc<TypeDef>> {
        if name.is_builtin() {
            return (name.name == "error")
                .then(|| Arc::new(TypeDef::new(name.clone(), Type::error_interface())));
        }
        self.definition(name)
    }

    fn unalias(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        for _ in 0..MAX_ALIAS_DEPTH {
            let Type::Named { name } = &current else { break };
            match self.type_def(name) {
                Some(def) if def.alias => current = def.underlying.clone(),
                _ => break,
            }
        }
        current
    }

    /// Flattened method set of an interface type, `None` if `ty` is not one
    fn interface_methods(&self, ty: &Type) -> Option<MethodSet> {
        let mut visited = HashSet::new();
        self.interface_methods_inner(ty, &mut visited)
    }

    fn interface_methods_inner(&self, ty: &Type, visited: &mut HashSet<TypeName>) -> Option<MethodSet> {
        match self.unalias(ty) {
            Type::Named { name } => {
                if !visited.insert(name.clone()) {
                    return Some(MethodSet::new());
                }
                let def = self.type_def(&name)?;
                match &def.underlying {
                    Type::Interface(iface) => Some(self.flatten(iface, visited)),
                    _ => None,
                }
            }
            Type::Interface(iface) => Some(self.flatten(&iface, visited)),
            _ => None,
        }
    }

    fn flatten(&self, iface: &InterfaceType, visited: &mut HashSet<TypeName>) -> MethodSet {
        let mut set: MethodSet = iface
            .methods
            .iter()
            .map(|m| (m.name.clone(), m.signature.clone()))
            .collect();
        for embedded in &iface.embedded {
            // Constraint terms such as `~int` carry no methods
            if let Some(inner) = self.interface_methods_inner(embedded, visited) {
                for (name, sig) in inner {
                    set.entry(name).or_insert(sig);
                }
            }
        }
        set
    }

    pub(super) fn method_set(&self, ty: &Type) -> MethodSet {
        match self.unalias(ty) {
            ty @ Type::Interface(_) => self.interface_methods(&ty).unwrap_or_default(),
            Type::Named { name } => match self.type_def(&name) {
                Some(def) if def.is_interface() => {
                    self.interface_methods(&Type::named(name)).unwrap_or_default()
                }
                Some(_) => self.promoted_methods(vec![(name, false)]),
                None => MethodSet::new(),
            },
            Type::Pointer { elem } => match self.unalias(&elem) {
                Type::Named { name } => match self.type_def(&name) {
                    Some(def) if !def.is_interface() => self.promoted_methods(vec![(name, true)]),
                    _ => MethodSet::new(),
                },
                _ => MethodSet::new(),
            },
            Type::Struct(strukt) => {
                let level = embedded_names(&strukt.fields, false);
                self.promoted_methods(level)
            }
            _ => MethodSet::new(),
        }
    }

    /// Breadth-first over embedding depth. Each entry carries whether
    /// pointer-receiver methods are reachable at that point.
    fn promoted_methods(&self, mut level: Vec<(TypeName, bool)>) -> MethodSet {
        let mut set = MethodSet::new();
        let mut seen = HashSet::new();
        while !level.is_empty() {
            let mut depth_set = MethodSet::new();
            let mut next = Vec::new();
            for (name, pointer) in level {
                if !seen.insert(name.clone()) {
                    continue;
                }
                let Some(def) = self.type_def(&name) else { continue };
                if def.alias {
                    if let Type::Named { name } = self.unalias(&def.underlying) {
                        next.push((name, pointer));
                    }
                    continue;
                }
                match &def.underlying {
                    Type::Interface(_) => {
                        let methods = self.interface_methods(&Type::named(name.clone())).unwrap_or_default();
                        for (method, sig) in methods {
                            depth_set.entry(method).or_insert(sig);
                        }
                    }
                    underlying => {
                        for method in def.methods.iter().filter(|m| pointer || !m.pointer_receiver) {
                            depth_set
                                .entry(method.name.clone())
                                .or_insert_with(|| method.signature.clone());
                        }
                        if let Type::Struct(strukt) = underlying {
                            next.extend(embedded_names(&strukt.fields, pointer));
                        }
                    }
                }
            }
            for (method, sig) in depth_set {
                set.entry(method).or_insert(sig);
            }
            level = next;
        }
        set
    }
}

fn embedded_names(fields: &[Field], pointer: bool) -> Vec<(TypeName, bool)> {
    fields
        .iter()
        .filter(|f| f.embedded)
        .filter_map(|f| match &f.ty {
            Type::Named { name } => Some((name.clone(), pointer)),
            Type::Pointer { elem } => elem.as_named().map(|name| (name.clone(), true)),
            _ => None,
        })
        .collect()
}
