//! Constant groups and enums
//!
//! Go has no enum construct. A named type whose value method set has a
//! nullary `IsEnum()` is treated as one: its constants are taken to be every
//! value the type can hold. Without the marker the group is just a bag of
//! constants.

use super::PackageSet;
use crate::type_name::TypeName;
use crate::types::{Constant, Signature, Type};
use crate::{Error, Result};
use serde::Serialize;

/// Name of the zero-argument marker method
pub const ENUM_MARKER: &str = "IsEnum";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstValue {
    pub name: TypeName,
    pub value: Constant,
}

/// Every constant of one declared type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consts {
    #[serde(rename = "type")]
    pub ty: TypeName,
    pub underlying: Type,
    pub is_enum: bool,
    /// Declaration order
    pub values: Vec<ConstValue>,
}

impl Consts {
    pub fn sorted_values(&self) -> Vec<&ConstValue> {
        let mut sorted: Vec<_> = self.values.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PackageSet {
    /// Constants in `name`'s package declared with exactly type `name`.
    ///
    /// The package must already be resolved.
    pub fn extract_consts(&self, name: &TypeName, include_unexported: bool) -> Result<Consts> {
        let def = self
            .definition(name)
            .ok_or_else(|| Error::ObjectNotFound(name.to_string()))?;
        if def.alias {
            return Err(Error::ObjectNotFound(format!("{} is an alias, not a defined type", name)));
        }
        let pkg = self
            .package(&name.package_path)
            .ok_or_else(|| Error::PackageNotFound(name.package_path.clone()))?;

        let is_enum = self
            .method_set(&Type::named(name.clone()))
            .get(ENUM_MARKER)
            .is_some_and(Signature::is_nullary);

        let values = pkg
            .consts
            .iter()
            .filter(|c| name.is_type(&c.ty))
            .filter(|c| include_unexported || c.is_exported())
            .map(|c| ConstValue {
                name: TypeName::new(&name.package_path, &c.name),
                value: c.value.clone(),
            })
            .collect();

        Ok(Consts { ty: name.clone(), underlying: def.underlying.clone(), is_enum, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::engine::tests::{fixture_set, testpkg};
    use crate::types::BasicKind;

    fn extract(name: &str, include_unexported: bool) -> Consts {
        let mut set = fixture_set();
        let path = testpkg("consts");
        set.resolve(&path).unwrap();
        set.extract_consts(&TypeName::new(&path, name), include_unexported).unwrap()
    }

    fn value_names(consts: &Consts) -> Vec<&str> {
        consts.values.iter().map(|v| v.name.name.as_str()).collect()
    }

    #[test]
    fn test_string_consts() {
        let consts = extract("Color", false);
        assert_eq!(consts.underlying.to_string(), "string");
        assert!(!consts.is_enum);
        assert_eq!(value_names(&consts), vec!["Red", "Green", "Blue", "Yellow"]);
        assert_eq!(consts.values[3].value, Constant::String("yellow".to_string()));

        let all = extract("Color", true);
        assert_eq!(all.len(), 5);
        let sorted: Vec<&str> = all.sorted_values().iter().map(|v| v.name.name.as_str()).collect();
        assert_eq!(sorted, vec!["Blue", "Green", "Red", "Yellow", "black"]);
    }

    #[test]
    fn test_exact_type_match_only() {
        let level = extract("Level", true);
        assert_eq!(level.underlying, Type::basic(BasicKind::Int));
        assert_eq!(value_names(&level), vec!["Low", "High"]);

        let sub = extract("SubLevel", true);
        assert_eq!(sub.underlying, Type::basic(BasicKind::Int));
        assert_eq!(value_names(&sub), vec!["SubLow", "SubHigh"]);
        assert_eq!(sub.values[1].value, Constant::Int(20));
    }

    #[test]
    fn test_iota_consts() {
        let step = extract("Step", false);
        let values: Vec<i128> = step.values.iter().filter_map(|v| v.value.as_int()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_enum_marker() {
        assert!(extract("Suit", false).is_enum);
        // marker on the pointer receiver is not in the value method set
        assert!(!extract("Rank", false).is_enum);
        assert!(!extract("Level", false).is_enum);
    }

    #[test]
    fn test_system_package_consts() {
        let mut set = fixture_set();
        set.resolve("time").unwrap();
        let duration = set.extract_consts(&TypeName::new("time", "Duration"), false).unwrap();
        assert_eq!(duration.len(), 6);
        assert_eq!(duration.underlying, Type::basic(BasicKind::Int64));
    }

    #[test]
    fn test_missing_type() {
        let mut set = fixture_set();
        set.resolve(&testpkg("consts")).unwrap();
        let missing = TypeName::new(testpkg("consts"), "Nope");
        assert!(matches!(set.extract_consts(&missing, false), Err(Error::ObjectNotFound(_))));
    }
}
