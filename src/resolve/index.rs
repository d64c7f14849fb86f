//! Object index
//!
//! Maps every package-scope named type to its definition. A package's batch
//! is merged all at once or not at all.

use crate::type_name::TypeName;
use crate::types::TypeDef;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct ObjectIndex {
    objects: BTreeMap<TypeName, Arc<TypeDef>>,
}

impl ObjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &TypeName) -> Option<&Arc<TypeDef>> {
        self.objects.get(name)
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.objects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Sorted by full name
    pub fn iter(&self) -> impl Iterator<Item = (&TypeName, &Arc<TypeDef>)> {
        self.objects.iter()
    }

    /// Every object declared by one package
    pub fn package<'s>(&'s self, path: &'s str) -> impl Iterator<Item = &'s Arc<TypeDef>> + 's {
        self.objects
            .iter()
            .filter(move |(name, _)| name.package_path == path)
            .map(|(_, def)| def)
    }

    /// Add one package's definitions.
    ///
    /// Every entry must belong to `path` and be new to the index. The batch
    /// is validated before anything is inserted.
    pub fn merge(&mut self, path: &str, defs: &[Arc<TypeDef>]) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for def in defs {
            if def.name.package_path != path {
                return Err(Error::Invariant(format!(
                    "foreign object {} in batch for {}",
                    def.name, path
                )));
            }
            if self.objects.contains_key(&def.name) || !seen.insert(&def.name) {
                return Err(Error::Invariant(format!("double-up: {}", def.name)));
            }
        }
        for def in defs {
            self.objects.insert(def.name.clone(), Arc::clone(def));
        }
        tracing::trace!(package = path, added = defs.len(), total = self.objects.len(), "indexed objects");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BasicKind, Type};

    fn def(path: &str, name: &str) -> Arc<TypeDef> {
        Arc::new(TypeDef::new(TypeName::new(path, name), Type::basic(BasicKind::Int)))
    }

    #[test]
    fn test_merge_and_lookup() {
        let mut index = ObjectIndex::new();
        index.merge("a/b", &[def("a/b", "X"), def("a/b", "Y")]).unwrap();
        index.merge("a/c", &[def("a/c", "X")]).unwrap();

        assert_eq!(index.len(), 3);
        assert!(index.contains(&TypeName::new("a/b", "Y")));
        assert_eq!(index.package("a/b").count(), 2);
        let order: Vec<String> = index.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(order, vec!["a/b.X", "a/b.Y", "a/c.X"]);
    }

    #[test]
    fn test_duplicate_is_invariant_and_atomic() {
        let mut index = ObjectIndex::new();
        index.merge("a/b", &[def("a/b", "X")]).unwrap();

        let err = index.merge("a/b", &[def("a/b", "Y"), def("a/b", "X")]).unwrap_err();
        assert!(err.is_invariant());
        assert!(err.to_string().contains("double-up: a/b.X"));
        assert!(!index.contains(&TypeName::new("a/b", "Y")));

        let err = index.merge("a/d", &[def("a/d", "Z"), def("a/d", "Z")]).unwrap_err();
        assert!(err.is_invariant());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_foreign_object_rejected() {
        let mut index = ObjectIndex::new();
        let err = index.merge("a/b", &[def("a/c", "X")]).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
        assert!(index.is_empty());
    }
}
