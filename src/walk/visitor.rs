use super::{Flow, StructInfo, WalkContext};
use crate::type_name::TypeName;
use crate::types::{BasicKind, Field, Type};
use crate::Result;

/// Callbacks for [`walk`](super::walk).
///
/// Every hook defaults to doing nothing and continuing, so implementors only
/// override what they care about. Enter and leave hooks run with the node
/// already on the context stack. Container hooks receive the element type;
/// the container itself is `ctx.parent()`.
#[allow(unused_variables)]
pub trait TypeVisitor {
    fn enter_struct(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>) -> Result<Flow> {
        Ok(Flow::Continue)
    }
    fn leave_struct(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>) -> Result<()> {
        Ok(())
    }

    /// Skipping a field moves on to the next one
    fn enter_field(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>, field: &Field) -> Result<Flow> {
        Ok(Flow::Continue)
    }
    fn leave_field(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>, field: &Field) -> Result<()> {
        Ok(())
    }

    /// Skipping the key still walks the element, and the other way round
    fn enter_map_key(&mut self, ctx: &WalkContext<'_>, key: &Type) -> Result<Flow> {
        Ok(Flow::Continue)
    }
    fn leave_map_key(&mut self, ctx: &WalkContext<'_>, key: &Type) -> Result<()> {
        Ok(())
    }
    fn enter_map_elem(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<Flow> {
        Ok(Flow::Continue)
    }
    fn leave_map_elem(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<()> {
        Ok(())
    }

    fn enter_pointer(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<Flow> {
        Ok(Flow::Continue)
    }
    fn leave_pointer(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<()> {
        Ok(())
    }
    fn enter_slice(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<Flow> {
        Ok(Flow::Continue)
    }
    fn leave_slice(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<()> {
        Ok(())
    }
    fn enter_array(&mut self, ctx: &WalkContext<'_>, len: u64, elem: &Type) -> Result<Flow> {
        Ok(Flow::Continue)
    }
    fn leave_array(&mut self, ctx: &WalkContext<'_>, len: u64, elem: &Type) -> Result<()> {
        Ok(())
    }

    fn visit_basic(&mut self, ctx: &WalkContext<'_>, kind: BasicKind) -> Result<()> {
        Ok(())
    }
    /// Named types are leaves
    fn visit_named(&mut self, ctx: &WalkContext<'_>, name: &TypeName) -> Result<()> {
        Ok(())
    }
}

type StructHook<'f, R> = Box<dyn FnMut(&WalkContext<'_>, &StructInfo<'_>) -> Result<R> + 'f>;
type FieldHook<'f, R> = Box<dyn FnMut(&WalkContext<'_>, &StructInfo<'_>, &Field) -> Result<R> + 'f>;
type ElemHook<'f, R> = Box<dyn FnMut(&WalkContext<'_>, &Type) -> Result<R> + 'f>;
type ArrayHook<'f, R> = Box<dyn FnMut(&WalkContext<'_>, u64, &Type) -> Result<R> + 'f>;
type BasicHook<'f> = Box<dyn FnMut(&WalkContext<'_>, BasicKind) -> Result<()> + 'f>;
type NamedHook<'f> = Box<dyn FnMut(&WalkContext<'_>, &TypeName) -> Result<()> + 'f>;

/// Visitor assembled from closures; hooks left unset continue.
///
/// ```
/// use structer::{walk, PartialVisitor, Type, TypeName};
/// use structer::types::BasicKind;
///
/// let mut seen = Vec::new();
/// let mut visitor = PartialVisitor::new().on_visit_basic(|_, kind| {
///     seen.push(kind);
///     Ok(())
/// });
/// let ty = Type::slice(Type::basic(BasicKind::Int));
/// walk(&TypeName::new("example.com/p", "T"), &ty, &mut visitor).unwrap();
/// drop(visitor);
/// assert_eq!(seen, vec![BasicKind::Int]);
/// ```
#[derive(Default)]
pub struct PartialVisitor<'f> {
    enter_struct: Option<StructHook<'f, Flow>>,
    leave_struct: Option<StructHook<'f, ()>>,
    enter_field: Option<FieldHook<'f, Flow>>,
    leave_field: Option<FieldHook<'f, ()>>,
    enter_map_key: Option<ElemHook<'f, Flow>>,
    leave_map_key: Option<ElemHook<'f, ()>>,
    enter_map_elem: Option<ElemHook<'f, Flow>>,
    leave_map_elem: Option<ElemHook<'f, ()>>,
    enter_pointer: Option<ElemHook<'f, Flow>>,
    leave_pointer: Option<ElemHook<'f, ()>>,
    enter_slice: Option<ElemHook<'f, Flow>>,
    leave_slice: Option<ElemHook<'f, ()>>,
    enter_array: Option<ArrayHook<'f, Flow>>,
    leave_array: Option<ArrayHook<'f, ()>>,
    visit_basic: Option<BasicHook<'f>>,
    visit_named: Option<NamedHook<'f>>,
}

impl<'f> PartialVisitor<'f> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enter_struct(
        mut self,
        f: impl FnMut(&WalkContext<'_>, &StructInfo<'_>) -> Result<Flow> + 'f,
    ) -> Self {
        self.enter_struct = Some(Box::new(f));
        self
    }

    pub fn on_leave_struct(
        mut self,
        f: impl FnMut(&WalkContext<'_>, &StructInfo<'_>) -> Result<()> + 'f,
    ) -> Self {
        self.leave_struct = Some(Box::new(f));
        self
    }

    pub fn on_enter_field(
        mut self,
        f: impl FnMut(&WalkContext<'_>, &StructInfo<'_>, &Field) -> Result<Flow> + 'f,
    ) -> Self {
        self.enter_field = Some(Box::new(f));
        self
    }

    pub fn on_leave_field(
        mut self,
        f: impl FnMut(&WalkContext<'_>, &StructInfo<'_>, &Field) -> Result<()> + 'f,
    ) -> Self {
        self.leave_field = Some(Box::new(f));
        self
    }

    pub fn on_enter_map_key(mut self, f: impl FnMut(&WalkContext<'_>, &Type) -> Result<Flow> + 'f) -> Self {
        self.enter_map_key = Some(Box::new(f));
        self
    }

    pub fn on_leave_map_key(mut self, f: impl FnMut(&WalkContext<'_>, &Type) -> Result<()> + 'f) -> Self {
        self.leave_map_key = Some(Box::new(f));
        self
    }

    pub fn on_enter_map_elem(mut self, f: impl FnMut(&WalkContext<'_>, &Type) -> Result<Flow> + 'f) -> Self {
        self.enter_map_elem = Some(Box::new(f));
        self
    }

    pub fn on_leave_map_elem(mut self, f: impl FnMut(&WalkContext<'_>, &Type) -> Result<()> + 'f) -> Self {
        self.leave_map_elem = Some(Box::new(f));
        self
    }

    pub fn on_enter_pointer(mut self, f: impl FnMut(&WalkContext<'_>, &Type) -> Result<Flow> + 'f) -> Self {
        self.enter_pointer = Some(Box::new(f));
        self
    }

    pub fn on_leave_pointer(mut self, f: impl FnMut(&WalkContext<'_>, &Type) -> Result<()> + 'f) -> Self {
        self.leave_pointer = Some(Box::new(f));
        self
    }

    pub fn on_enter_slice(mut self, f: impl FnMut(&WalkContext<'_>, &Type) -> Result<Flow> + 'f) -> Self {
        self.enter_slice = Some(Box::new(f));
        self
    }

    pub fn on_leave_slice(mut self, f: impl FnMut(&WalkContext<'_>, &Type) -> Result<()> + 'f) -> Self {
        self.leave_slice = Some(Box::new(f));
        self
    }

    pub fn on_enter_array(mut self, f: impl FnMut(&WalkContext<'_>, u64, &Type) -> Result<Flow> + 'f) -> Self {
        self.enter_array = Some(Box::new(f));
        self
    }

    pub fn on_leave_array(mut self, f: impl FnMut(&WalkContext<'_>, u64, &Type) -> Result<()> + 'f) -> Self {
        self.leave_array = Some(Box::new(f));
        self
    }

    pub fn on_visit_basic(mut self, f: impl FnMut(&WalkContext<'_>, BasicKind) -> Result<()> + 'f) -> Self {
        self.visit_basic = Some(Box::new(f));
        self
    }

    pub fn on_visit_named(mut self, f: impl FnMut(&WalkContext<'_>, &TypeName) -> Result<()> + 'f) -> Self {
        self.visit_named = Some(Box::new(f));
        self
    }
}

impl TypeVisitor for PartialVisitor<'_> {
    fn enter_struct(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>) -> Result<Flow> {
        self.enter_struct.as_mut().map_or(Ok(Flow::Continue), |f| f(ctx, info))
    }
    fn leave_struct(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>) -> Result<()> {
        self.leave_struct.as_mut().map_or(Ok(()), |f| f(ctx, info))
    }
    fn enter_field(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>, field: &Field) -> Result<Flow> {
        self.enter_field.as_mut().map_or(Ok(Flow::Continue), |f| f(ctx, info, field))
    }
    fn leave_field(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>, field: &Field) -> Result<()> {
        self.leave_field.as_mut().map_or(Ok(()), |f| f(ctx, info, field))
    }
    fn enter_map_key(&mut self, ctx: &WalkContext<'_>, key: &Type) -> Result<Flow> {
        self.enter_map_key.as_mut().map_or(Ok(Flow::Continue), |f| f(ctx, key))
    }
    fn leave_map_key(&mut self, ctx: &WalkContext<'_>, key: &Type) -> Result<()> {
        self.leave_map_key.as_mut().map_or(Ok(()), |f| f(ctx, key))
    }
    fn enter_map_elem(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<Flow> {
        self.enter_map_elem.as_mut().map_or(Ok(Flow::Continue), |f| f(ctx, elem))
    }
    fn leave_map_elem(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<()> {
        self.leave_map_elem.as_mut().map_or(Ok(()), |f| f(ctx, elem))
    }
    fn enter_pointer(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<Flow> {
        self.enter_pointer.as_mut().map_or(Ok(Flow::Continue), |f| f(ctx, elem))
    }
    fn leave_pointer(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<()> {
        self.leave_pointer.as_mut().map_or(Ok(()), |f| f(ctx, elem))
    }
    fn enter_slice(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<Flow> {
        self.enter_slice.as_mut().map_or(Ok(Flow::Continue), |f| f(ctx, elem))
    }
    fn leave_slice(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<()> {
        self.leave_slice.as_mut().map_or(Ok(()), |f| f(ctx, elem))
    }
    fn enter_array(&mut self, ctx: &WalkContext<'_>, len: u64, elem: &Type) -> Result<Flow> {
        self.enter_array.as_mut().map_or(Ok(Flow::Continue), |f| f(ctx, len, elem))
    }
    fn leave_array(&mut self, ctx: &WalkContext<'_>, len: u64, elem: &Type) -> Result<()> {
        self.leave_array.as_mut().map_or(Ok(()), |f| f(ctx, len, elem))
    }
    fn visit_basic(&mut self, ctx: &WalkContext<'_>, kind: BasicKind) -> Result<()> {
        self.visit_basic.as_mut().map_or(Ok(()), |f| f(ctx, kind))
    }
    fn visit_named(&mut self, ctx: &WalkContext<'_>, name: &TypeName) -> Result<()> {
        self.visit_named.as_mut().map_or(Ok(()), |f| f(ctx, name))
    }
}

/// Runs several visitors in one walk.
///
/// Visitors are called in the order they were added. For enter hooks the
/// first visitor to skip decides, and later visitors are not asked. Any
/// error stops the fan-out and the walk.
#[derive(Default)]
pub struct MultiVisitor<'v> {
    visitors: Vec<&'v mut dyn TypeVisitor>,
}

impl<'v> MultiVisitor<'v> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, visitor: &'v mut dyn TypeVisitor) -> Self {
        self.visitors.push(visitor);
        self
    }

    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty()
    }

    fn enter(&mut self, mut hook: impl FnMut(&mut (dyn TypeVisitor + 'v)) -> Result<Flow>) -> Result<Flow> {
        for visitor in self.visitors.iter_mut() {
            if hook(&mut **visitor)? == Flow::SkipBranch {
                return Ok(Flow::SkipBranch);
            }
        }
        Ok(Flow::Continue)
    }

    fn each(&mut self, mut hook: impl FnMut(&mut (dyn TypeVisitor + 'v)) -> Result<()>) -> Result<()> {
        for visitor in self.visitors.iter_mut() {
            hook(&mut **visitor)?;
        }
        Ok(())
    }
}

impl TypeVisitor for MultiVisitor<'_> {
    fn enter_struct(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>) -> Result<Flow> {
        self.enter(|v| v.enter_struct(ctx, info))
    }
    fn leave_struct(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>) -> Result<()> {
        self.each(|v| v.leave_struct(ctx, info))
    }
    fn enter_field(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>, field: &Field) -> Result<Flow> {
        self.enter(|v| v.enter_field(ctx, info, field))
    }
    fn leave_field(&mut self, ctx: &WalkContext<'_>, info: &StructInfo<'_>, field: &Field) -> Result<()> {
        self.each(|v| v.leave_field(ctx, info, field))
    }
    fn enter_map_key(&mut self, ctx: &WalkContext<'_>, key: &Type) -> Result<Flow> {
        self.enter(|v| v.enter_map_key(ctx, key))
    }
    fn leave_map_key(&mut self, ctx: &WalkContext<'_>, key: &Type) -> Result<()> {
        self.each(|v| v.leave_map_key(ctx, key))
    }
    fn enter_map_elem(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<Flow> {
        self.enter(|v| v.enter_map_elem(ctx, elem))
    }
    fn leave_map_elem(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<()> {
        self.each(|v| v.leave_map_elem(ctx, elem))
    }
    fn enter_pointer(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<Flow> {
        self.enter(|v| v.enter_pointer(ctx, elem))
    }
    fn leave_pointer(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<()> {
        self.each(|v| v.leave_pointer(ctx, elem))
    }
    fn enter_slice(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<Flow> {
        self.enter(|v| v.enter_slice(ctx, elem))
    }
    fn leave_slice(&mut self, ctx: &WalkContext<'_>, elem: &Type) -> Result<()> {
        self.each(|v| v.leave_slice(ctx, elem))
    }
    fn enter_array(&mut self, ctx: &WalkContext<'_>, len: u64, elem: &Type) -> Result<Flow> {
        self.enter(|v| v.enter_array(ctx, len, elem))
    }
    fn leave_array(&mut self, ctx: &WalkContext<'_>, len: u64, elem: &Type) -> Result<()> {
        self.each(|v| v.leave_array(ctx, len, elem))
    }
    fn visit_basic(&mut self, ctx: &WalkContext<'_>, kind: BasicKind) -> Result<()> {
        self.each(|v| v.visit_basic(ctx, kind))
    }
    fn visit_named(&mut self, ctx: &WalkContext<'_>, name: &TypeName) -> Result<()> {
        self.each(|v| v.visit_named(ctx, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::walk;

    #[test]
    fn test_partial_visitor_defaults_continue() {
        let ty = Type::map(Type::basic(BasicKind::String), Type::pointer(Type::basic(BasicKind::Bool)));
        let mut visitor = PartialVisitor::new();
        walk(&TypeName::new("example.com/p", "T"), &ty, &mut visitor).unwrap();
    }

    #[test]
    fn test_partial_visitor_skip_pointer() {
        let mut basics = Vec::new();
        let ty = Type::map(Type::basic(BasicKind::String), Type::pointer(Type::basic(BasicKind::Bool)));
        let mut visitor = PartialVisitor::new()
            .on_enter_pointer(|_, _| Ok(Flow::SkipBranch))
            .on_visit_basic(|_, kind| {
                basics.push(kind);
                Ok(())
            });
        walk(&TypeName::new("example.com/p", "T"), &ty, &mut visitor).unwrap();
        drop(visitor);
        assert_eq!(basics, vec![BasicKind::String]);
    }

    #[test]
    fn test_multi_visitor_len() {
        let mut a = PartialVisitor::new();
        let mut b = PartialVisitor::new();
        let multi = MultiVisitor::new().with(&mut a).with(&mut b);
        assert_eq!(multi.len(), 2);
        assert!(MultiVisitor::new().is_empty());
    }
}
