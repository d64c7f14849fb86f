use super::{Flow, StructInfo, TypeVisitor};
use crate::type_name::TypeName;
use crate::types::{StructType, Type};
use crate::{Error, Result};

/// Where the walker currently is
#[derive(Debug)]
pub struct WalkContext<'a> {
    stack: Vec<&'a Type>,
    root: &'a TypeName,
}

impl<'a> WalkContext<'a> {
    /// Enclosing composite types, outermost first. The node whose hook is
    /// running is on top.
    pub fn stack(&self) -> &[&'a Type] {
        &self.stack
    }

    pub fn parent(&self) -> Option<&'a Type> {
        self.stack.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn root(&self) -> &'a TypeName {
        self.root
    }
}

/// Walk `ty`, reporting every node to `visitor`.
///
/// `root` names the type being walked and is handed to every hook through
/// the context. The first error a hook returns aborts the walk and is
/// returned as is; `leave_*` hooks of nodes still open are not called.
pub fn walk<V: TypeVisitor + ?Sized>(root: &TypeName, ty: &Type, visitor: &mut V) -> Result<()> {
    let mut walker = Walker {
        ctx: WalkContext { stack: Vec::new(), root },
        visitor,
    };
    walker.walk_type(&root.package_path, &root.name, ty)
}

struct Walker<'a, 'v, V: ?Sized> {
    ctx: WalkContext<'a>,
    visitor: &'v mut V,
}

impl<'a, V: TypeVisitor + ?Sized> Walker<'a, '_, V> {
    fn walk_type(&mut self, package: &str, name: &str, ty: &'a Type) -> Result<()> {
        match ty {
            Type::Basic { basic } => self.visitor.visit_basic(&self.ctx, *basic),
            Type::Named { name } => self.visitor.visit_named(&self.ctx, name),
            Type::Struct(strukt) => self.scoped(ty, |w| w.walk_struct(package, name, strukt)),
            Type::Slice { elem } => self.scoped(ty, |w| {
                if w.visitor.enter_slice(&w.ctx, elem)? == Flow::SkipBranch {
                    return Ok(());
                }
                w.walk_type(package, &elem.to_string(), elem)?;
                w.visitor.leave_slice(&w.ctx, elem)
            }),
            Type::Array { len, elem } => self.scoped(ty, |w| {
                if w.visitor.enter_array(&w.ctx, *len, elem)? == Flow::SkipBranch {
                    return Ok(());
                }
                w.walk_type(package, &elem.to_string(), elem)?;
                w.visitor.leave_array(&w.ctx, *len, elem)
            }),
            Type::Pointer { elem } => self.scoped(ty, |w| {
                if w.visitor.enter_pointer(&w.ctx, elem)? == Flow::SkipBranch {
                    return Ok(());
                }
                w.walk_type(package, &elem.to_string(), elem)?;
                w.visitor.leave_pointer(&w.ctx, elem)
            }),
            Type::Map { key, value } => self.scoped(ty, |w| {
                if w.visitor.enter_map_key(&w.ctx, key)? == Flow::Continue {
                    w.walk_type(package, &key.to_string(), key)?;
                    w.visitor.leave_map_key(&w.ctx, key)?;
                }
                if w.visitor.enter_map_elem(&w.ctx, value)? == Flow::Continue {
                    w.walk_type(package, &value.to_string(), value)?;
                    w.visitor.leave_map_elem(&w.ctx, value)?;
                }
                Ok(())
            }),
            Type::Interface(_) | Type::Signature(_) | Type::Chan { .. } => {
                Err(Error::UnhandledKind(format!("{} ({})", ty.kind_str(), ty)))
            }
        }
    }

    /// Run `f` with `ty` pushed on the context stack
    fn scoped(&mut self, ty: &'a Type, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.ctx.stack.push(ty);
        let result = f(self);
        self.ctx.stack.pop();
        result
    }

    fn walk_struct(&mut self, package: &str, name: &str, strukt: &'a StructType) -> Result<()> {
        let root = self.ctx.root;
        let info = StructInfo { package, name, root, strukt };
        if self.visitor.enter_struct(&self.ctx, &info)? == Flow::SkipBranch {
            return Ok(());
        }
        for field in &strukt.fields {
            if self.visitor.enter_field(&self.ctx, &info, field)? == Flow::SkipBranch {
                continue;
            }
            self.walk_type(&field.package, &field.name, &field.ty)?;
            self.visitor.leave_field(&self.ctx, &info, field)?;
        }
        self.visitor.leave_struct(&self.ctx, &info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::engine::tests::{fixture_set, testpkg};
    use crate::types::{BasicKind, ChanDir, Field};
    use crate::walk::{MultiVisitor, PartialVisitor};

    fn field(name: &str, ty: Type) -> Field {
        Field { name: name.to_string(), ty, tag: None, embedded: false, package: "example.com/w".to_string() }
    }

    fn int() -> Type {
        Type::basic(BasicKind::Int)
    }

    fn root() -> TypeName {
        TypeName::new("example.com/w", "Root")
    }

    /// Logs every hook as a short event string
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        skip_fields: Vec<&'static str>,
        skip_map_keys: bool,
        fail_on_named: bool,
    }

    impl TypeVisitor for Recorder {
        fn enter_struct(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>) -> Result<Flow> {
            self.events.push(format!("enter struct {} {}", info.name, ctx.depth()));
            Ok(Flow::Continue)
        }
        fn leave_struct(&mut self, _ctx: &WalkContext<'_>, info: &StructInfo<'_>) -> Result<()> {
            self.events.push(format!("leave struct {}", info.name));
            Ok(())
        }
        fn enter_field(&mut self, _ctx: &WalkContext<'_>, _info: &StructInfo<'_>, field: &Field) -> Result<Flow> {
            self.events.push(format!("enter field {}", field.name));
            if self.skip_fields.contains(&field.name.as_str()) {
                return Ok(Flow::SkipBranch);
            }
            Ok(Flow::Continue)
        }
        fn leave_field(&mut self, _ctx: &WalkContext<'_>, _info: &StructInfo<'_>, field: &Field) -> Result<()> {
            self.events.push(format!("leave field {}", field.name));
            Ok(())
        }
        fn enter_map_key(&mut self, _ctx: &WalkContext<'_>, _key: &Type) -> Result<Flow> {
            self.events.push("enter key".to_string());
            Ok(if self.skip_map_keys { Flow::SkipBranch } else { Flow::Continue })
        }
        fn leave_map_key(&mut self, _ctx: &WalkContext<'_>, _key: &Type) -> Result<()> {
            self.events.push("leave key".to_string());
            Ok(())
        }
        fn enter_map_elem(&mut self, _ctx: &WalkContext<'_>, _elem: &Type) -> Result<Flow> {
            self.events.push("enter elem".to_string());
            Ok(Flow::Continue)
        }
        fn leave_map_elem(&mut self, _ctx: &WalkContext<'_>, _elem: &Type) -> Result<()> {
            self.events.push("leave elem".to_string());
            Ok(())
        }
        fn enter_pointer(&mut self, _ctx: &WalkContext<'_>, _elem: &Type) -> Result<Flow> {
            self.events.push("enter pointer".to_string());
            Ok(Flow::Continue)
        }
        fn leave_pointer(&mut self, _ctx: &WalkContext<'_>, _elem: &Type) -> Result<()> {
            self.events.push("leave pointer".to_string());
            Ok(())
        }
        fn enter_slice(&mut self, _ctx: &WalkContext<'_>, _elem: &Type) -> Result<Flow> {
            self.events.push("enter slice".to_string());
            Ok(Flow::Continue)
        }
        fn leave_slice(&mut self, _ctx: &WalkContext<'_>, _elem: &Type) -> Result<()> {
            self.events.push("leave slice".to_string());
            Ok(())
        }
        fn enter_array(&mut self, _ctx: &WalkContext<'_>, len: u64, _elem: &Type) -> Result<Flow> {
            self.events.push(format!("enter array {}", len));
            Ok(Flow::Continue)
        }
        fn leave_array(&mut self, _ctx: &WalkContext<'_>, len: u64, _elem: &Type) -> Result<()> {
            self.events.push(format!("leave array {}", len));
            Ok(())
        }
        fn visit_basic(&mut self, _ctx: &WalkContext<'_>, kind: BasicKind) -> Result<()> {
            self.events.push(format!("basic {}", kind));
            Ok(())
        }
        fn visit_named(&mut self, _ctx: &WalkContext<'_>, name: &TypeName) -> Result<()> {
            self.events.push(format!("named {}", name));
            if self.fail_on_named {
                return Err(anyhow::anyhow!("refusing {}", name).into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_nested_containers_balance() {
        // []map[string][2]int
        let ty = Type::slice(Type::map(Type::basic(BasicKind::String), Type::array(2, int())));
        let mut rec = Recorder::default();
        walk(&root(), &ty, &mut rec).unwrap();
        assert_eq!(
            rec.events,
            vec![
                "enter slice",
                "enter key",
                "basic string",
                "leave key",
                "enter elem",
                "enter array 2",
                "basic int",
                "leave array 2",
                "leave elem",
                "leave slice",
            ]
        );
    }

    #[test]
    fn test_container_chains_balance() {
        for n in 0..=8usize {
            let mut ty = if n % 2 == 0 { int() } else { Type::named(TypeName::new("x/y", "Z")) };
            for i in 0..n {
                ty = match i % 4 {
                    0 => Type::slice(ty),
                    1 => Type::array(2, ty),
                    2 => Type::pointer(ty),
                    _ => Type::map(Type::basic(BasicKind::String), ty),
                };
            }

            // keys are skipped so each map contributes only its elem pair
            let mut rec = Recorder { skip_map_keys: true, ..Default::default() };
            walk(&root(), &ty, &mut rec).unwrap();
            let events: Vec<&str> =
                rec.events.iter().map(String::as_str).filter(|e| *e != "enter key").collect();

            let leaves: Vec<&str> = events
                .iter()
                .copied()
                .filter(|e| e.starts_with("basic") || e.starts_with("named"))
                .collect();
            assert_eq!(leaves.len(), 1, "depth {}: {:?}", n, events);
            assert_eq!(events.len(), 2 * n + 1, "depth {}: {:?}", n, events);
            assert_eq!(events[n], leaves[0]);

            let mut open = Vec::new();
            for event in &events {
                if let Some(kind) = event.strip_prefix("enter ") {
                    open.push(kind);
                } else if let Some(kind) = event.strip_prefix("leave ") {
                    assert_eq!(open.pop(), Some(kind), "depth {}: {:?}", n, events);
                }
            }
            assert!(open.is_empty(), "depth {}: {:?}", n, events);
            assert_eq!(events.iter().filter(|e| e.starts_with("enter ")).count(), n);
        }
    }

    #[test]
    fn test_struct_fields_and_skip() {
        let inner = Type::Struct(StructType { fields: vec![field("X", int())] });
        let ty = Type::Struct(StructType {
            fields: vec![
                field("A", int()),
                field("B", Type::pointer(inner.clone())),
                field("C", inner),
            ],
        });
        let mut rec = Recorder { skip_fields: vec!["B"], ..Default::default() };
        walk(&root(), &ty, &mut rec).unwrap();
        assert_eq!(
            rec.events,
            vec![
                "enter struct Root 1",
                "enter field A",
                "basic int",
                "leave field A",
                "enter field B",
                "enter field C",
                "enter struct C 2",
                "enter field X",
                "basic int",
                "leave field X",
                "leave struct C",
                "leave field C",
                "leave struct Root",
            ]
        );
    }

    #[test]
    fn test_map_key_skip_keeps_elem() {
        let ty = Type::map(int(), Type::slice(int()));
        let mut rec = Recorder { skip_map_keys: true, ..Default::default() };
        walk(&root(), &ty, &mut rec).unwrap();
        assert_eq!(
            rec.events,
            vec!["enter key", "enter elem", "enter slice", "basic int", "leave slice", "leave elem"]
        );
    }

    #[test]
    fn test_named_types_stop_descent() {
        let mut set = fixture_set();
        let path = testpkg("walkme");
        set.resolve(&path).unwrap();
        let name = TypeName::new(&path, "Node");
        let def = set.find_object(&name).unwrap();

        let mut rec = Recorder::default();
        walk(&name, &def.underlying, &mut rec).unwrap();
        assert!(rec.events.contains(&format!("named {}", name)));
        assert_eq!(rec.events.first().map(String::as_str), Some("enter struct Node 1"));
        assert_eq!(rec.events.last().map(String::as_str), Some("leave struct Node"));

        let mut rec = Recorder::default();
        walk(&name, &def.as_type(), &mut rec).unwrap();
        assert_eq!(rec.events, vec![format!("named {}", name)]);
    }

    #[test]
    fn test_visitor_error_aborts_unchanged() {
        let ty = Type::Struct(StructType {
            fields: vec![
                field("A", Type::pointer(Type::named(TypeName::new("x/y", "Z")))),
                field("B", int()),
            ],
        });
        let mut rec = Recorder { fail_on_named: true, ..Default::default() };
        let err = walk(&root(), &ty, &mut rec).unwrap_err();
        assert!(matches!(err, Error::Visitor(_)));
        assert_eq!(err.to_string(), "refusing x/y.Z");
        assert_eq!(rec.events.last().map(String::as_str), Some("named x/y.Z"));
        assert!(!rec.events.iter().any(|e| e.starts_with("leave")));
    }

    #[test]
    fn test_unhandled_kinds() {
        let chan = Type::Chan { dir: ChanDir::Both, elem: Box::new(int()) };
        let ty = Type::slice(chan);
        let err = walk(&root(), &ty, &mut Recorder::default()).unwrap_err();
        assert!(matches!(err, Error::UnhandledKind(_)));
        assert!(err.is_invariant());
        assert!(err.to_string().contains("chan int"));
    }

    #[test]
    fn test_parent_stack() {
        // struct{L []map[[3]int]struct{P *Root}}
        let leaf = Type::Struct(StructType {
            fields: vec![field("P", Type::pointer(Type::named(root())))],
        });
        let ty = Type::Struct(StructType {
            fields: vec![field("L", Type::slice(Type::map(Type::array(3, int()), leaf)))],
        });

        let mut parents = Vec::new();
        let mut depths = Vec::new();
        let mut visitor = PartialVisitor::new()
            .on_visit_basic(|ctx, _| {
                parents.push(ctx.parent().map(|p| p.to_string()).unwrap_or_default());
                depths.push(ctx.depth());
                Ok(())
            })
            .on_visit_named(|ctx, name| {
                assert_eq!(ctx.root(), name);
                assert_eq!(ctx.stack().len(), 5);
                Ok(())
            });
        walk(&root(), &ty, &mut visitor).unwrap();
        drop(visitor);

        assert_eq!(parents, vec!["[3]int"]);
        assert_eq!(depths, vec![4]);
    }

    #[test]
    fn test_multi_visitor_first_skip_wins() {
        let ty = Type::Struct(StructType { fields: vec![field("A", int()), field("B", int())] });
        let mut first = Recorder { skip_fields: vec!["A"], ..Default::default() };
        let mut second = Recorder::default();
        {
            let mut multi = MultiVisitor::new().with(&mut first).with(&mut second);
            walk(&root(), &ty, &mut multi).unwrap();
        }
        assert_eq!(second.events, vec![
            "enter struct Root 1",
            "enter field B",
            "basic int",
            "leave field B",
            "leave struct Root",
        ]);
        assert!(first.events.contains(&"enter field A".to_string()));
    }

    #[test]
    fn test_multi_visitor_stops_at_first_error() {
        let ty = Type::named(TypeName::new("x/y", "Z"));
        let mut failing = Recorder { fail_on_named: true, ..Default::default() };
        let mut after = Recorder::default();
        let result = {
            let mut multi = MultiVisitor::new().with(&mut failing).with(&mut after);
            walk(&root(), &ty, &mut multi)
        };
        assert!(result.is_err());
        assert!(after.events.is_empty());
    }
}
