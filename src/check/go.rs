//! Go checker built on tree-sitter-go
//!
//! Resolves package-scope declarations only: named types, aliases, constants
//! and method sets. Function bodies are never looked at beyond finding which
//! imports they use.

use super::constant::{self, ConstResult};
use super::{CheckOutcome, CheckUnit, CheckedPackage, Checker, Importer, TypeError};
use crate::resolve::Package;
use crate::type_name::{is_exported_ident, TypeName};
use crate::types::{
    BasicKind, ChanDir, ConstDef, Constant, Field, InterfaceMethod, InterfaceType, Method,
    Signature, Span, StructType, Type, TypeDef,
};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tree_sitter::Node;

/// Default [`Checker`] for Go packages
#[derive(Debug, Default, Clone, Copy)]
pub struct GoChecker;

impl GoChecker {
    pub fn new() -> Self {
        Self
    }
}

impl Checker for GoChecker {
    fn name(&self) -> &str {
        "go"
    }

    fn check(&self, unit: CheckUnit<'_>, importer: &mut dyn Importer) -> CheckOutcome {
        let mut pass = Pass::new(unit, importer);
        pass.collect();
        pass.finish()
    }
}

fn build_ignore_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^//\s*(?:go:build|\+build)\s+ignore\s*$").ok())
        .as_ref()
}

/// Files constrained with `//go:build ignore` are excluded from the package
fn build_ignored(root: Node, src: &[u8]) -> bool {
    let header_end = named(root)
        .into_iter()
        .find(|n| n.kind() == "package_clause")
        .map(|n| n.start_byte())
        .unwrap_or(src.len());
    let header = String::from_utf8_lossy(&src[..header_end]);
    build_ignore_re().is_some_and(|re| re.is_match(&header))
}

/// Named children without comments
fn named(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

fn field_all<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn predeclared(name: &str) -> Option<Type> {
    if let Some(kind) = BasicKind::from_ident(name) {
        return Some(Type::basic(kind));
    }
    match name {
        "error" => Some(Type::error()),
        "any" => Some(Type::Interface(InterfaceType::default())),
        "comparable" => Some(Type::named(TypeName::builtin("comparable"))),
        _ => None,
    }
}

struct SourceFile<'a> {
    name: &'a str,
    src: &'a [u8],
    root: Node<'a>,
    /// Local import name to binding index
    imports: HashMap<String, usize>,
    dots: Vec<usize>,
    /// Named (non-dot, non-blank) imports in order, for the unused check
    named_imports: Vec<(String, usize, Node<'a>)>,
}

struct ImportBinding {
    path: String,
    package: Option<Arc<Package>>,
    unsafe_pkg: bool,
}

#[derive(Clone)]
struct TypeDecl<'a> {
    file: usize,
    node: Node<'a>,
    alias: bool,
    tparams: Vec<String>,
}

#[derive(Clone)]
struct ConstDecl<'a> {
    name: String,
    file: usize,
    spec: Node<'a>,
    ty: Option<Node<'a>>,
    expr: Option<Node<'a>>,
    iota: i128,
}

struct Pass<'a, 'i> {
    unit: CheckUnit<'a>,
    importer: &'i mut dyn Importer,
    files: Vec<SourceFile<'a>>,
    bindings: Vec<ImportBinding>,
    packages: HashMap<String, Option<Arc<Package>>>,
    types: BTreeMap<String, TypeDecl<'a>>,
    consts: Vec<ConstDecl<'a>>,
    const_index: HashMap<String, usize>,
    other_names: HashSet<String>,
    methods: Vec<(usize, Node<'a>)>,
    underlying: HashMap<String, Type>,
    resolving: Vec<String>,
    aliases: HashMap<String, Type>,
    const_values: HashMap<usize, Option<(Constant, Type)>>,
    evaluating: HashSet<usize>,
    errors: Vec<TypeError>,
}

impl<'a, 'i> Pass<'a, 'i> {
    fn new(unit: CheckUnit<'a>, importer: &'i mut dyn Importer) -> Self {
        Self {
            unit,
            importer,
            files: Vec::new(),
            bindings: Vec::new(),
            packages: HashMap::new(),
            types: BTreeMap::new(),
            consts: Vec::new(),
            const_index: HashMap::new(),
            other_names: HashSet::new(),
            methods: Vec::new(),
            underlying: HashMap::new(),
            resolving: Vec::new(),
            aliases: HashMap::new(),
            const_values: HashMap::new(),
            evaluating: HashSet::new(),
            errors: Vec::new(),
        }
    }

    fn path(&self) -> &'a str {
        self.unit.import_path
    }

    fn text(&self, file: usize, node: Node<'a>) -> &'a str {
        let src: &'a [u8] = self.files[file].src;
        node.utf8_text(src).unwrap_or("")
    }

    fn error(&mut self, file: usize, node: Node<'a>, soft: bool, message: String) {
        let err = TypeError { message, soft, file: None, line: None }
            .at(self.files[file].name, node.start_position().row + 1);
        self.errors.push(err);
    }

    fn hard(&mut self, file: usize, node: Node<'a>, message: String) {
        self.error(file, node, false, message);
    }

    fn span(&self, file: usize, node: Node<'a>) -> Span {
        Span {
            file: self.files[file].name.to_string(),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            line: node.start_position().row + 1,
        }
    }

    // ----------------------------------------------------------------------
    // Collection
    // ----------------------------------------------------------------------

    fn collect(&mut self) {
        let source = self.unit.source;
        for name in &source.files {
            let (Some(tree), Some(src)) = (source.tree(name), source.contents(name)) else {
                continue;
            };
            let root = tree.root_node();
            if build_ignored(root, src) {
                tracing::trace!(file = %name, "skipping build-ignored file");
                continue;
            }
            self.files.push(SourceFile {
                name,
                src,
                root,
                imports: HashMap::new(),
                dots: Vec::new(),
                named_imports: Vec::new(),
            });
        }

        for file in 0..self.files.len() {
            let root = self.files[file].root;
            for decl in named(root) {
                match decl.kind() {
                    "import_declaration" => self.collect_imports(file, decl),
                    "type_declaration" => {
                        for spec in named(decl) {
                            if matches!(spec.kind(), "type_spec" | "type_alias") {
                                self.collect_type(file, spec);
                            }
                        }
                    }
                    "const_declaration" => self.collect_consts(file, decl),
                    "var_declaration" => self.collect_vars(file, decl),
                    "function_declaration" => {
                        if let Some(name) = decl.child_by_field_name("name") {
                            let text = self.text(file, name);
                            if text != "init" && self.declare(file, name, text) {
                                self.other_names.insert(text.to_string());
                            }
                        }
                    }
                    "method_declaration" => self.methods.push((file, decl)),
                    _ => {}
                }
            }
        }
    }

    /// Claim a package-scope name. Returns false for `_` and redeclarations.
    fn declare(&mut self, file: usize, node: Node<'a>, name: &str) -> bool {
        if name == "_" {
            return false;
        }
        if self.types.contains_key(name)
            || self.const_index.contains_key(name)
            || self.other_names.contains(name)
        {
            self.hard(file, node, format!("{} redeclared in this block", name));
            return false;
        }
        true
    }

    fn collect_imports(&mut self, file: usize, decl: Node<'a>) {
        let mut specs = Vec::new();
        for child in named(decl) {
            match child.kind() {
                "import_spec" => specs.push(child),
                "import_spec_list" => specs.extend(named(child).into_iter().filter(|n| n.kind() == "import_spec")),
                _ => {}
            }
        }

        for spec in specs {
            let Some(path_node) = spec.child_by_field_name("path") else { continue };
            let Some(path) = constant::unquote(self.text(file, path_node)) else {
                self.hard(file, spec, "malformed import path".to_string());
                continue;
            };
            if path == "C" {
                continue;
            }
            let binding = self.bind_import(file, spec, &path);
            let name_node = spec.child_by_field_name("name");
            match name_node.map(|n| n.kind()) {
                Some("dot") => self.files[file].dots.push(binding),
                Some("blank_identifier") => {}
                _ => {
                    let local = match name_node {
                        Some(n) => self.text(file, n).to_string(),
                        None => self.default_import_name(binding),
                    };
                    let entry = &mut self.files[file];
                    entry.imports.insert(local.clone(), binding);
                    entry.named_imports.push((local, binding, spec));
                }
            }
        }
    }

    fn default_import_name(&self, binding: usize) -> String {
        let binding = &self.bindings[binding];
        match &binding.package {
            Some(pkg) if !pkg.name.is_empty() => pkg.name.clone(),
            _ => binding.path.rsplit('/').next().unwrap_or(&binding.path).to_string(),
        }
    }

    fn bind_import(&mut self, file: usize, spec: Node<'a>, path: &str) -> usize {
        let unsafe_pkg = path == "unsafe";
        let package = if unsafe_pkg {
            None
        } else if let Some(cached) = self.packages.get(path) {
            cached.clone()
        } else {
            let dir = self.unit.source.dir.clone();
            let imported = match self.importer.import(path, &dir) {
                Ok(pkg) => Some(pkg),
                Err(e) => {
                    self.hard(file, spec, format!("could not import {} ({})", path, e));
                    None
                }
            };
            self.packages.insert(path.to_string(), imported.clone());
            imported
        };
        self.bindings.push(ImportBinding { path: path.to_string(), package, unsafe_pkg });
        self.bindings.len() - 1
    }

    fn collect_type(&mut self, file: usize, spec: Node<'a>) {
        let Some(name_node) = spec.child_by_field_name("name") else { return };
        let name = self.text(file, name_node);
        if !self.declare(file, name_node, name) {
            return;
        }
        let mut tparams = Vec::new();
        if let Some(list) = spec.child_by_field_name("type_parameters") {
            for param in named(list) {
                for ident in field_all(param, "name") {
                    tparams.push(self.text(file, ident).to_string());
                }
            }
        }
        let decl = TypeDecl { file, node: spec, alias: spec.kind() == "type_alias", tparams };
        self.types.insert(name.to_string(), decl);
    }

    fn collect_vars(&mut self, file: usize, decl: Node<'a>) {
        let mut specs = Vec::new();
        for child in named(decl) {
            match child.kind() {
                "var_spec" => specs.push(child),
                "var_spec_list" => specs.extend(named(child).into_iter().filter(|n| n.kind() == "var_spec")),
                _ => {}
            }
        }
        for spec in specs {
            for ident in field_all(spec, "name") {
                let text = self.text(file, ident);
                if self.declare(file, ident, text) {
                    self.other_names.insert(text.to_string());
                }
            }
        }
    }

    /// Const groups repeat the previous spec's type and expressions when a
    /// spec has neither, each with its own `iota`.
    fn collect_consts(&mut self, file: usize, decl: Node<'a>) {
        let mut last: Option<(Option<Node<'a>>, Node<'a>)> = None;
        let specs: Vec<Node<'a>> = named(decl).into_iter().filter(|n| n.kind() == "const_spec").collect();
        for (iota, spec) in specs.into_iter().enumerate() {
            let names = field_all(spec, "name");
            let declared = spec.child_by_field_name("type");
            let (ty, values) = match spec.child_by_field_name("value") {
                Some(values) => {
                    last = Some((declared, values));
                    (declared, Some(values))
                }
                None if declared.is_none() => match last {
                    Some((ty, values)) => (ty, Some(values)),
                    None => (None, None),
                },
                None => (declared, None),
            };

            let exprs = values.map(named).unwrap_or_default();
            if exprs.len() < names.len() {
                self.hard(file, spec, "missing init expr for const declaration".to_string());
            } else if exprs.len() > names.len() {
                self.hard(file, spec, "extra init expr".to_string());
            }

            for (i, ident) in names.into_iter().enumerate() {
                let name = self.text(file, ident);
                if !self.declare(file, ident, name) {
                    continue;
                }
                self.const_index.insert(name.to_string(), self.consts.len());
                self.consts.push(ConstDecl {
                    name: name.to_string(),
                    file,
                    spec,
                    ty,
                    expr: exprs.get(i).copied(),
                    iota: iota as i128,
                });
            }
        }
    }

    // ----------------------------------------------------------------------
    // Type expressions
    // ----------------------------------------------------------------------

    fn resolve_type(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        match node.kind() {
            "type_identifier" | "identifier" => {
                let name = self.text(file, node);
                self.lookup_type(file, node, name, tparams)
            }
            "qualified_type" => {
                match (node.child_by_field_name("package"), node.child_by_field_name("name")) {
                    (Some(pkg), Some(name)) => self.qualified_type(file, pkg, name),
                    _ => Type::invalid(),
                }
            }
            "generic_type" => match node.child_by_field_name("type") {
                Some(base) => self.resolve_type(file, base, tparams),
                None => Type::invalid(),
            },
            "parenthesized_type" | "negated_type" => match named(node).first() {
                Some(inner) => self.resolve_type(file, *inner, tparams),
                None => Type::invalid(),
            },
            "pointer_type" => match named(node).first() {
                Some(inner) => Type::pointer(self.resolve_type(file, *inner, tparams)),
                None => Type::invalid(),
            },
            "slice_type" => match node.child_by_field_name("element") {
                Some(elem) => Type::slice(self.resolve_type(file, elem, tparams)),
                None => Type::invalid(),
            },
            "array_type" => self.array_type(file, node, tparams),
            "implicit_length_array_type" => {
                self.hard(file, node, "invalid use of [...] array outside a composite literal".to_string());
                Type::invalid()
            }
            "map_type" => match (node.child_by_field_name("key"), node.child_by_field_name("value")) {
                (Some(k), Some(v)) => {
                    let key = self.resolve_type(file, k, tparams);
                    let value = self.resolve_type(file, v, tparams);
                    Type::map(key, value)
                }
                _ => Type::invalid(),
            },
            "channel_type" => {
                let text = self.text(file, node).trim_start();
                let dir = if text.starts_with("<-") {
                    ChanDir::Recv
                } else if text.trim_start_matches("chan").trim_start().starts_with("<-") {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                match node.child_by_field_name("value") {
                    Some(v) => Type::Chan { dir, elem: Box::new(self.resolve_type(file, v, tparams)) },
                    None => Type::invalid(),
                }
            }
            "function_type" => {
                let sig = self.signature(
                    file,
                    node.child_by_field_name("parameters"),
                    node.child_by_field_name("result"),
                    tparams,
                );
                Type::Signature(sig)
            }
            "struct_type" => self.struct_type(file, node, tparams),
            "interface_type" => self.interface_type(file, node, tparams),
            other => {
                self.hard(file, node, format!("unsupported type expression {}", other));
                Type::invalid()
            }
        }
    }

    fn lookup_type(&mut self, file: usize, node: Node<'a>, name: &str, tparams: &[String]) -> Type {
        if tparams.iter().any(|t| t == name) {
            return Type::named(TypeName::builtin(name));
        }
        if let Some(alias) = self.types.get(name).map(|d| d.alias) {
            return if alias {
                self.alias_type(name)
            } else {
                Type::named(TypeName::new(self.path(), name))
            };
        }
        if self.const_index.contains_key(name) || self.other_names.contains(name) {
            self.hard(file, node, format!("{} is not a type", name));
            return Type::invalid();
        }
        if let Some(ty) = predeclared(name) {
            return ty;
        }
        if let Some(ty) = self.dot_type(file, name) {
            return ty;
        }
        self.hard(file, node, format!("undefined: {}", name));
        Type::invalid()
    }

    fn dot_type(&self, file: usize, name: &str) -> Option<Type> {
        if !is_exported_ident(name) {
            return None;
        }
        self.files[file].dots.iter().find_map(|b| {
            let pkg = self.bindings[*b].package.as_ref()?;
            if pkg.opaque {
                return None;
            }
            pkg.lookup(name).map(|def| def.as_type())
        })
    }

    fn qualified_type(&mut self, file: usize, pkg_node: Node<'a>, name_node: Node<'a>) -> Type {
        let alias = self.text(file, pkg_node);
        let name = self.text(file, name_node);
        let Some(&binding) = self.files[file].imports.get(alias) else {
            self.hard(file, pkg_node, format!("undefined: {}", alias));
            return Type::invalid();
        };
        if self.bindings[binding].unsafe_pkg {
            if name == "Pointer" {
                return Type::basic(BasicKind::UnsafePointer);
            }
            self.hard(file, name_node, format!("undefined: unsafe.{}", name));
            return Type::invalid();
        }
        let Some(pkg) = self.bindings[binding].package.clone() else {
            return Type::invalid();
        };
        if !is_exported_ident(name) {
            self.hard(file, name_node, format!("name {} not exported by package {}", name, alias));
            return Type::invalid();
        }
        if pkg.opaque {
            return Type::named(TypeName::new(&pkg.path, name));
        }
        match pkg.lookup(name) {
            Some(def) => def.as_type(),
            None => {
                self.hard(file, name_node, format!("undefined: {}.{}", alias, name));
                Type::invalid()
            }
        }
    }

    fn array_type(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        let (Some(len_node), Some(elem_node)) =
            (node.child_by_field_name("length"), node.child_by_field_name("element"))
        else {
            return Type::invalid();
        };
        let elem = self.resolve_type(file, elem_node, tparams);
        let len = self
            .eval(file, len_node, None)
            .ok()
            .and_then(|(v, _)| v.as_int())
            .and_then(|v| u64::try_from(v).ok());
        match len {
            Some(len) => Type::array(len, elem),
            None => {
                let text = self.text(file, len_node);
                self.hard(file, len_node, format!("invalid array length {}", text));
                Type::invalid()
            }
        }
    }

    fn struct_type(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        let mut fields: Vec<Field> = Vec::new();
        let Some(list) = named(node).into_iter().find(|n| n.kind() == "field_declaration_list") else {
            return Type::Struct(StructType::default());
        };
        for decl in named(list).into_iter().filter(|n| n.kind() == "field_declaration") {
            let Some(ty_node) = decl.child_by_field_name("type") else { continue };
            let tag = decl
                .child_by_field_name("tag")
                .and_then(|t| constant::unquote(self.text(file, t)));
            let names = field_all(decl, "name");

            let mut entries = Vec::new();
            if names.is_empty() {
                let mut cursor = decl.walk();
                let star = decl.children(&mut cursor).any(|c| c.kind() == "*");
                let base = self.resolve_type(file, ty_node, tparams);
                let ty = if star { Type::pointer(base) } else { base };
                entries.push((self.embedded_name(file, ty_node), ty, true, ty_node));
            } else {
                let ty = self.resolve_type(file, ty_node, tparams);
                for ident in names {
                    entries.push((self.text(file, ident).to_string(), ty.clone(), false, ident));
                }
            }

            for (name, ty, embedded, at) in entries {
                if name != "_" && fields.iter().any(|f| f.name == name) {
                    self.hard(file, at, format!("{} redeclared", name));
                    continue;
                }
                fields.push(Field {
                    name,
                    ty,
                    tag: tag.clone(),
                    embedded,
                    package: self.path().to_string(),
                });
            }
        }
        Type::Struct(StructType { fields })
    }

    fn embedded_name(&self, file: usize, node: Node<'a>) -> String {
        match node.kind() {
            "qualified_type" => node
                .child_by_field_name("name")
                .map(|n| self.text(file, n).to_string())
                .unwrap_or_default(),
            "generic_type" => node
                .child_by_field_name("type")
                .map(|n| self.embedded_name(file, n))
                .unwrap_or_default(),
            "pointer_type" | "parenthesized_type" => named(node)
                .first()
                .map(|n| self.embedded_name(file, *n))
                .unwrap_or_default(),
            _ => self.text(file, node).to_string(),
        }
    }

    fn interface_type(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        let mut iface = InterfaceType::default();
        for elem in named(node) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let Some(name) = elem.child_by_field_name("name") else { continue };
                    let signature = self.signature(
                        file,
                        elem.child_by_field_name("parameters"),
                        elem.child_by_field_name("result"),
                        tparams,
                    );
                    let name = self.text(file, name).to_string();
                    if iface.methods.iter().any(|m| m.name == name) {
                        self.hard(file, elem, format!("duplicate method {}", name));
                        continue;
                    }
                    iface.methods.push(InterfaceMethod { name, signature });
                }
                "type_elem" | "constraint_elem" | "interface_type_name" => {
                    for term in named(elem) {
                        let ty = self.resolve_type(file, term, tparams);
                        iface.embedded.push(ty);
                    }
                }
                _ => {
                    let ty = self.resolve_type(file, elem, tparams);
                    iface.embedded.push(ty);
                }
            }
        }
        Type::Interface(iface)
    }

    fn signature(
        &mut self,
        file: usize,
        params: Option<Node<'a>>,
        result: Option<Node<'a>>,
        tparams: &[String],
    ) -> Signature {
        let mut sig = Signature::default();
        if let Some(params) = params {
            sig.variadic = self.parameter_types(file, params, tparams, &mut sig.params);
        }
        if let Some(result) = result {
            if result.kind() == "parameter_list" {
                self.parameter_types(file, result, tparams, &mut sig.results);
            } else {
                let ty = self.resolve_type(file, result, tparams);
                sig.results.push(ty);
            }
        }
        sig
    }

    /// Returns true when the list ends with a variadic parameter
    fn parameter_types(&mut self, file: usize, list: Node<'a>, tparams: &[String], out: &mut Vec<Type>) -> bool {
        let mut variadic = false;
        for param in named(list) {
            let Some(ty_node) = param.child_by_field_name("type") else { continue };
            match param.kind() {
                "variadic_parameter_declaration" => {
                    let elem = self.resolve_type(file, ty_node, tparams);
                    out.push(Type::slice(elem));
                    variadic = true;
                }
                _ => {
                    let count = field_all(param, "name").len().max(1);
                    let ty = self.resolve_type(file, ty_node, tparams);
                    out.extend(std::iter::repeat_n(ty, count));
                }
            }
        }
        variadic
    }

    fn alias_type(&mut self, name: &str) -> Type {
        if let Some(ty) = self.aliases.get(name) {
            return ty.clone();
        }
        let Some(decl) = self.types.get(name).cloned() else {
            return Type::invalid();
        };
        let key = format!("={}", name);
        if self.resolving.contains(&key) {
            self.hard(decl.file, decl.node, format!("invalid recursive type alias {}", name));
            return Type::invalid();
        }
        self.resolving.push(key);
        let ty = match decl.node.child_by_field_name("type") {
            Some(node) => self.resolve_type(decl.file, node, &decl.tparams),
            None => Type::invalid(),
        };
        self.resolving.pop();
        self.aliases.insert(name.to_string(), ty.clone());
        ty
    }

    fn underlying_of(&mut self, name: &str) -> Type {
        if let Some(ty) = self.underlying.get(name) {
            return ty.clone();
        }
        let Some(decl) = self.types.get(name).cloned() else {
            return Type::invalid();
        };
        if self.resolving.iter().any(|n| n == name) {
            self.hard(decl.file, decl.node, format!("invalid recursive type {}", name));
            return Type::invalid();
        }
        self.resolving.push(name.to_string());
        let ty = match decl.node.child_by_field_name("type") {
            Some(node) => self.resolve_type(decl.file, node, &decl.tparams),
            None => Type::invalid(),
        };
        let underlying = self.underlying(&ty);
        self.resolving.pop();
        self.underlying.insert(name.to_string(), underlying.clone());
        underlying
    }

    fn underlying(&mut self, ty: &Type) -> Type {
        let Type::Named { name } = ty else {
            return ty.clone();
        };
        if name.is_builtin() {
            return match name.name.as_str() {
                "error" => Type::error_interface(),
                _ => Type::Interface(InterfaceType::default()),
            };
        }
        if name.package_path == self.path() {
            return self.underlying_of(&name.name);
        }
        let Some(pkg) = self.package_by_path(&name.package_path) else {
            return Type::invalid();
        };
        match pkg.lookup(&name.name) {
            Some(def) if def.alias => {
                let aliased = def.underlying.clone();
                self.underlying(&aliased)
            }
            Some(def) => def.underlying.clone(),
            None => Type::invalid(),
        }
    }

    /// A package referenced by path, possibly only transitively
    fn package_by_path(&mut self, path: &str) -> Option<Arc<Package>> {
        if let Some(cached) = self.packages.get(path) {
            return cached.clone();
        }
        let dir = self.unit.source.dir.clone();
        let pkg = self.importer.import(path, &dir).ok();
        self.packages.insert(path.to_string(), pkg.clone());
        pkg
    }

    // ----------------------------------------------------------------------
    // Methods
    // ----------------------------------------------------------------------

    fn check_methods(&mut self) -> HashMap<String, Vec<Method>> {
        let mut out: HashMap<String, Vec<Method>> = HashMap::new();
        for (file, decl) in self.methods.clone() {
            let Some(recv_ty) = decl
                .child_by_field_name("receiver")
                .and_then(|r| named(r).into_iter().find(|p| p.kind() == "parameter_declaration"))
                .and_then(|p| p.child_by_field_name("type"))
            else {
                self.hard(file, decl, "method has no receiver".to_string());
                continue;
            };
            let Some(name_node) = decl.child_by_field_name("name") else { continue };
            let name = self.text(file, name_node).to_string();
            let (base, pointer, tparams) = self.receiver_base(file, recv_ty);

            let local = self.types.get(&base).is_some_and(|d| !d.alias);
            if !local {
                self.hard(file, recv_ty, format!("cannot define new methods on non-local type {}", base));
                continue;
            }
            if name == "_" {
                continue;
            }

            let signature = self.signature(
                file,
                decl.child_by_field_name("parameters"),
                decl.child_by_field_name("result"),
                &tparams,
            );
            let entry = out.entry(base.clone()).or_default();
            if entry.iter().any(|m| m.name == name) {
                self.hard(file, name_node, format!("method {}.{} already declared", base, name));
                continue;
            }
            entry.push(Method {
                name,
                pointer_receiver: pointer,
                signature,
                span: Some(self.span(file, decl)),
            });
        }
        out
    }

    fn receiver_base(&self, file: usize, mut node: Node<'a>) -> (String, bool, Vec<String>) {
        let mut pointer = false;
        let mut tparams = Vec::new();
        loop {
            match node.kind() {
                "pointer_type" => {
                    pointer = true;
                    match named(node).first() {
                        Some(inner) => node = *inner,
                        None => break,
                    }
                }
                "parenthesized_type" => match named(node).first() {
                    Some(inner) => node = *inner,
                    None => break,
                },
                "generic_type" => {
                    if let Some(args) = node.child_by_field_name("type_arguments") {
                        let mut stack = vec![args];
                        while let Some(n) = stack.pop() {
                            if n.kind() == "type_identifier" || n.kind() == "identifier" {
                                tparams.push(self.text(file, n).to_string());
                            }
                            stack.extend(named(n));
                        }
                    }
                    match node.child_by_field_name("type") {
                        Some(inner) => node = inner,
                        None => break,
                    }
                }
                _ => break,
            }
        }
        (self.text(file, node).to_string(), pointer, tparams)
    }

    // ----------------------------------------------------------------------
    // Constants
    // ----------------------------------------------------------------------

    fn const_value(&mut self, idx: usize) -> Option<(Constant, Type)> {
        if let Some(value) = self.const_values.get(&idx) {
            return value.clone();
        }
        let decl = self.consts[idx].clone();
        if !self.evaluating.insert(idx) {
            self.hard(decl.file, decl.spec, format!("initialization cycle for {}", decl.name));
            return None;
        }

        let result = decl.expr.map(|expr| {
            let value = self.eval(decl.file, expr, Some(decl.iota))?;
            match decl.ty {
                Some(ty_node) => {
                    let target = self.resolve_type(decl.file, ty_node, &[]);
                    self.assign(value, target)
                }
                None => Ok(value),
            }
        });

        let value = match result {
            Some(Ok(value)) => Some(value),
            Some(Err(msg)) => {
                self.hard(decl.file, decl.spec, format!("invalid constant {}: {}", decl.name, msg));
                None
            }
            None => None,
        };
        self.evaluating.remove(&idx);
        self.const_values.insert(idx, value.clone());
        value
    }

    /// Implicit conversion of a constant to a declared type
    fn assign(&mut self, (value, from): (Constant, Type), target: Type) -> ConstResult<(Constant, Type)> {
        let untyped = from.as_basic().is_some_and(|k| k.is_untyped());
        if !untyped && from != target && !from.is_invalid() {
            return Err(format!("cannot use {} (constant of type {}) as {} value", value, from, target));
        }
        self.convert_to(value, target)
    }

    /// Explicit conversion `T(x)`
    fn convert_to(&mut self, value: Constant, target: Type) -> ConstResult<(Constant, Type)> {
        if target.is_invalid() {
            return Ok((value, target));
        }
        match self.underlying(&target) {
            Type::Basic { basic: BasicKind::Invalid } => Ok((value, target)),
            Type::Basic { basic } => constant::convert(&value, basic).map(|v| (v, target)),
            other => Err(format!("invalid constant type {} ({})", target, other.kind_str())),
        }
    }

    fn eval(&mut self, file: usize, node: Node<'a>, iota: Option<i128>) -> ConstResult<(Constant, Type)> {
        let text = self.text(file, node);
        let untyped = |v: Constant, kind: BasicKind| Ok((v, Type::basic(kind)));
        match node.kind() {
            "int_literal" => match constant::parse_int(text) {
                Some(v) => untyped(Constant::Int(v), BasicKind::UntypedInt),
                None => Err(format!("malformed integer {}", text)),
            },
            "float_literal" => match constant::parse_float(text) {
                Some(v) => untyped(Constant::Float(v), BasicKind::UntypedFloat),
                None => Err(format!("malformed float {}", text)),
            },
            "rune_literal" => match constant::parse_rune(text) {
                Some(v) => untyped(Constant::Int(v), BasicKind::UntypedRune),
                None => Err(format!("malformed rune {}", text)),
            },
            "interpreted_string_literal" | "raw_string_literal" => match constant::unquote(text) {
                Some(v) => untyped(Constant::String(v), BasicKind::UntypedString),
                None => Err(format!("malformed string {}", text)),
            },
            "true" => untyped(Constant::Bool(true), BasicKind::UntypedBool),
            "false" => untyped(Constant::Bool(false), BasicKind::UntypedBool),
            "iota" => match iota {
                Some(v) => untyped(Constant::Int(v), BasicKind::UntypedInt),
                None => Err("cannot use iota outside constant declaration".to_string()),
            },
            "nil" => Err("nil is not a constant".to_string()),
            "imaginary_literal" => Err("complex constants are not supported".to_string()),
            "parenthesized_expression" => match named(node).first() {
                Some(inner) => self.eval(file, *inner, iota),
                None => Err("empty expression".to_string()),
            },
            "identifier" => self.ident_const(file, text),
            "selector_expression" => {
                match (node.child_by_field_name("operand"), node.child_by_field_name("field")) {
                    (Some(op), Some(field)) if op.kind() == "identifier" => {
                        let alias = self.text(file, op);
                        let name = self.text(file, field);
                        self.qualified_const(file, alias, name)
                    }
                    _ => Err(format!("{} is not constant", text)),
                }
            }
            "unary_expression" => {
                let (Some(op), Some(operand)) =
                    (node.child_by_field_name("operator"), node.child_by_field_name("operand"))
                else {
                    return Err(format!("malformed expression {}", text));
                };
                let (value, ty) = self.eval(file, operand, iota)?;
                let value = constant::unary_op(op.kind(), &value)?;
                Ok((value, ty))
            }
            "binary_expression" => self.eval_binary(file, node, iota),
            "call_expression" => self.eval_call(file, node, iota),
            "type_conversion_expression" => {
                let (Some(ty_node), Some(operand)) =
                    (node.child_by_field_name("type"), node.child_by_field_name("operand"))
                else {
                    return Err(format!("malformed conversion {}", text));
                };
                let target = self.resolve_type(file, ty_node, &[]);
                let (value, _) = self.eval(file, operand, iota)?;
                self.convert_to(value, target)
            }
            _ => Err(format!("{} is not a constant expression", text)),
        }
    }

    fn eval_binary(&mut self, file: usize, node: Node<'a>, iota: Option<i128>) -> ConstResult<(Constant, Type)> {
        let (Some(left), Some(op), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("operator"),
            node.child_by_field_name("right"),
        ) else {
            return Err(format!("malformed expression {}", self.text(file, node)));
        };
        let op = op.kind();
        let (lv, lt) = self.eval(file, left, iota)?;
        let (rv, rt) = self.eval(file, right, iota)?;
        let value = constant::binary_op(op, &lv, &rv)?;

        if constant::is_comparison(op) {
            return Ok((value, Type::basic(BasicKind::UntypedBool)));
        }
        if matches!(op, "<<" | ">>") {
            return match lt.as_basic() {
                Some(kind) if kind.is_untyped() => Ok((value, lt)),
                _ => self.convert_to(value, lt),
            };
        }

        let l_untyped = lt.as_basic().filter(|k| k.is_untyped());
        let r_untyped = rt.as_basic().filter(|k| k.is_untyped());
        match (l_untyped, r_untyped) {
            (Some(l), Some(r)) => {
                let mut kind = constant::untyped_rank(l, r);
                if matches!(value, Constant::Float(_)) && kind.is_integer() {
                    kind = BasicKind::UntypedFloat;
                }
                Ok((value, Type::basic(kind)))
            }
            (Some(_), None) => self.convert_to(value, rt),
            (None, Some(_)) => self.convert_to(value, lt),
            (None, None) if lt == rt => self.convert_to(value, lt),
            (None, None) => Err(format!("mismatched types {} and {}", lt, rt)),
        }
    }

    fn eval_call(&mut self, file: usize, node: Node<'a>, iota: Option<i128>) -> ConstResult<(Constant, Type)> {
        let text = self.text(file, node);
        let (Some(func), Some(args)) =
            (node.child_by_field_name("function"), node.child_by_field_name("arguments"))
        else {
            return Err(format!("malformed call {}", text));
        };
        let args = named(args);
        if args.len() != 1 {
            return Err(format!("{} is not constant", text));
        }

        if func.kind() == "identifier" && self.text(file, func) == "len" && !self.types.contains_key("len") {
            return match self.eval(file, args[0], iota)? {
                (Constant::String(s), _) => Ok((Constant::Int(s.len() as i128), Type::basic(BasicKind::Int))),
                _ => Err(format!("{} is not constant", text)),
            };
        }

        let Some(target) = self.conversion_target(file, func) else {
            return Err(format!("{} is not constant", text));
        };
        let (value, _) = self.eval(file, args[0], iota)?;
        self.convert_to(value, target)
    }

    /// The type a call's function position denotes, if it is a conversion
    fn conversion_target(&mut self, file: usize, node: Node<'a>) -> Option<Type> {
        match node.kind() {
            "identifier" | "type_identifier" => {
                let name = self.text(file, node);
                if self.types.contains_key(name) {
                    Some(self.lookup_type(file, node, name, &[]))
                } else if self.const_index.contains_key(name) || self.other_names.contains(name) {
                    None
                } else {
                    predeclared(name).or_else(|| self.dot_type(file, name))
                }
            }
            "selector_expression" => {
                let op = node.child_by_field_name("operand")?;
                let field = node.child_by_field_name("field")?;
                let binding = *self.files[file].imports.get(self.text(file, op))?;
                let name = self.text(file, field);
                let pkg = self.bindings[binding].package.clone()?;
                if pkg.opaque {
                    return is_exported_ident(name).then(|| Type::named(TypeName::new(&pkg.path, name)));
                }
                pkg.lookup(name).map(|def| def.as_type())
            }
            "parenthesized_expression" | "parenthesized_type" => {
                let inner = *named(node).first()?;
                self.conversion_target(file, inner)
            }
            "qualified_type" | "generic_type" | "pointer_type" | "slice_type" | "array_type" | "map_type" => {
                Some(self.resolve_type(file, node, &[]))
            }
            _ => None,
        }
    }

    fn ident_const(&mut self, file: usize, name: &str) -> ConstResult<(Constant, Type)> {
        if let Some(&idx) = self.const_index.get(name) {
            return self
                .const_value(idx)
                .ok_or_else(|| format!("{} is not a valid constant", name));
        }
        match name {
            "true" => return Ok((Constant::Bool(true), Type::basic(BasicKind::UntypedBool))),
            "false" => return Ok((Constant::Bool(false), Type::basic(BasicKind::UntypedBool))),
            _ => {}
        }
        for b in self.files[file].dots.clone() {
            if let Some(c) = self.bindings[b].package.as_ref().and_then(|p| p.constant(name)) {
                return Ok((c.value.clone(), c.ty.clone()));
            }
        }
        Err(format!("undefined: {}", name))
    }

    fn qualified_const(&mut self, file: usize, alias: &str, name: &str) -> ConstResult<(Constant, Type)> {
        let binding = *self.files[file]
            .imports
            .get(alias)
            .ok_or_else(|| format!("undefined: {}", alias))?;
        let pkg = self.bindings[binding]
            .package
            .clone()
            .ok_or_else(|| format!("{}.{} refers to a package that failed to import", alias, name))?;
        if pkg.opaque {
            return Err(format!("cannot evaluate {}.{}: no type information for {}", alias, name, pkg.path));
        }
        pkg.constant(name)
            .map(|c| (c.value.clone(), c.ty.clone()))
            .ok_or_else(|| format!("undefined: {}.{}", alias, name))
    }

    // ----------------------------------------------------------------------
    // Output
    // ----------------------------------------------------------------------

    fn check_unused_imports(&mut self) {
        for file in 0..self.files.len() {
            let used = used_qualifiers(self.files[file].root, self.files[file].src);
            let named_imports = self.files[file].named_imports.clone();
            for (local, binding, spec) in named_imports {
                if !used.contains(&local) {
                    let path = self.bindings[binding].path.clone();
                    let message = if local == path.rsplit('/').next().unwrap_or(&path) {
                        format!("{:?} imported and not used", path)
                    } else {
                        format!("{:?} imported as {} and not used", path, local)
                    };
                    self.error(file, spec, true, message);
                }
            }
        }
    }

    fn finish(mut self) -> CheckOutcome {
        let mut methods = self.check_methods();

        let names: Vec<String> = self.types.keys().cloned().collect();
        let mut types = Vec::with_capacity(names.len());
        for name in names {
            let Some(decl) = self.types.get(&name).cloned() else { continue };
            let type_name = TypeName::new(self.path(), &name);
            let span = self.span(decl.file, decl.node);
            let def = if decl.alias {
                let mut def = TypeDef::new(type_name, self.alias_type(&name));
                def.alias = true;
                def
            } else {
                TypeDef::new(type_name, self.underlying_of(&name))
                    .with_methods(methods.remove(&name).unwrap_or_default())
            };
            types.push(def.with_span(span));
        }

        let mut consts = Vec::new();
        for idx in 0..self.consts.len() {
            if let Some((value, ty)) = self.const_value(idx) {
                let decl = &self.consts[idx];
                let span = self.span(decl.file, decl.spec);
                consts.push(ConstDef { name: decl.name.clone(), ty, value, span: Some(span) });
            }
        }

        self.check_unused_imports();

        let mut imports: Vec<String> = self.bindings.iter().map(|b| b.path.clone()).collect();
        imports.sort();
        imports.dedup();

        let name = self.unit.source.name.clone();
        tracing::debug!(
            package = %self.path(),
            types = types.len(),
            consts = consts.len(),
            errors = self.errors.len(),
            "checked package"
        );

        CheckOutcome {
            package: CheckedPackage { name, types, consts, imports },
            errors: self.errors,
        }
    }
}

/// Identifiers used as package qualifiers anywhere in a file
fn used_qualifiers(root: Node, src: &[u8]) -> HashSet<String> {
    let mut used = HashSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let qualifier = match node.kind() {
            "qualified_type" => node.child_by_field_name("package"),
            "selector_expression" => node
                .child_by_field_name("operand")
                .filter(|n| n.kind() == "identifier"),
            _ => None,
        };
        if let Some(q) = qualifier.and_then(|q| q.utf8_text(src).ok()) {
            used.insert(q.to_string());
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    used
}
