//! Declaration source and doc comments
//!
//! Docs are the run of `//` lines directly above a declaration plus any `//`
//! comment trailing it on its last line, formatted the way Go's
//! `CommentGroup.Text` does it.

use super::PackageSet;
use crate::source::LoadedPackage;
use crate::type_name::TypeName;
use crate::types::{Span, TypeDef};
use crate::{Error, Result};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tree_sitter::Node;

fn directive_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:line |extern |export |[a-z0-9]+:[a-z0-9])").ok())
        .as_ref()
}

struct Declaration {
    def: Arc<TypeDef>,
    source: Arc<LoadedPackage>,
    span: Span,
}

impl PackageSet {
    fn declaration(&self, name: &TypeName) -> Result<Declaration> {
        let def = self
            .find_object(name)
            .ok_or_else(|| Error::ObjectNotFound(name.to_string()))?;
        let source = self
            .package(&name.package_path)
            .and_then(|pkg| pkg.source.clone())
            .ok_or_else(|| Error::ObjectNotFound(format!("no sources loaded for {}", name)))?;
        let span = def
            .span
            .clone()
            .ok_or_else(|| Error::ObjectNotFound(format!("no declaration position for {}", name)))?;
        Ok(Declaration { def, source, span })
    }

    /// Original text of the type spec, without the `type` keyword
    pub fn extract_source(&self, name: &TypeName) -> Result<Vec<u8>> {
        let decl = self.declaration(name)?;
        decl.source
            .slice(&decl.span.file, decl.span.start_byte, decl.span.end_byte)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::ObjectNotFound(format!("no contents for {} in {}", name, decl.span.file)))
    }

    /// Doc comment of a type; empty if it has none
    pub fn type_doc(&self, name: &TypeName) -> Result<String> {
        let decl = self.declaration(name)?;
        let contents = decl.source.contents(&decl.span.file).unwrap_or_default();
        Ok(doc_at(contents, decl.span.start_byte, decl.span.end_byte))
    }

    /// Doc comment of one struct field; empty if the field has none or
    /// does not exist
    pub fn field_doc(&self, name: &TypeName, field: &str) -> Result<String> {
        let decl = self.declaration(name)?;
        if decl.def.underlying.as_struct().is_none() {
            return Err(Error::NotStruct(name.to_string()));
        }
        let (Some(tree), Some(contents)) =
            (decl.source.tree(&decl.span.file), decl.source.contents(&decl.span.file))
        else {
            return Ok(String::new());
        };

        let Some(spec) = tree
            .root_node()
            .descendant_for_byte_range(decl.span.start_byte, decl.span.end_byte)
            .and_then(enclosing_spec)
        else {
            return Ok(String::new());
        };

        let found = spec
            .child_by_field_name("type")
            .filter(|t| t.kind() == "struct_type")
            .and_then(|strukt| field_declaration(strukt, contents, field));
        Ok(found
            .map(|node| doc_at(contents, node.start_byte(), node.end_byte()))
            .unwrap_or_default())
    }
}

fn enclosing_spec(node: Node) -> Option<Node> {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.kind() == "type_spec" {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

fn field_declaration<'t>(strukt: Node<'t>, src: &[u8], field: &str) -> Option<Node<'t>> {
    let mut cursor = strukt.walk();
    let list = strukt
        .named_children(&mut cursor)
        .find(|n| n.kind() == "field_declaration_list")?;
    let mut cursor = list.walk();
    let found = list
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "field_declaration")
        .find(|decl| field_names(*decl, src).iter().any(|n| n == field));
    found
}

fn field_names(decl: Node, src: &[u8]) -> Vec<String> {
    let text = |n: Node| n.utf8_text(src).unwrap_or("").to_string();
    let mut cursor = decl.walk();
    let names: Vec<String> = decl.children_by_field_name("name", &mut cursor).map(text).collect();
    if !names.is_empty() {
        return names;
    }
    // Embedded: the field is named after its type
    let Some(ty) = decl.child_by_field_name("type") else {
        return names;
    };
    let spelled = text(ty);
    let base = spelled.trim_start_matches('*');
    let base = base.split('[').next().unwrap_or(base);
    let base = base.rsplit('.').next().unwrap_or(base);
    vec![base.trim().to_string()]
}

/// Doc for a node spanning `start..end`
fn doc_at(src: &[u8], start: usize, end: usize) -> String {
    let Ok(text) = std::str::from_utf8(src) else {
        return String::new();
    };
    if start > end || end > text.len() {
        return String::new();
    }

    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let mut lines: Vec<&str> = text[..line_start]
        .lines()
        .rev()
        .map(str::trim)
        .take_while(|l| l.starts_with("//"))
        .collect();
    lines.reverse();

    let line_end = text[end..].find('\n').map_or(text.len(), |i| end + i);
    let trailing = text[end..line_end].trim();
    if trailing.starts_with("//") {
        lines.push(trailing);
    }
    comment_text(&lines)
}

fn comment_text(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in lines {
        let body = line.strip_prefix("//").unwrap_or(line);
        if directive_re().is_some_and(|re| re.is_match(body)) {
            continue;
        }
        let body = body.strip_prefix(' ').unwrap_or(body).trim_end();
        if body.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(body);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    if out.is_empty() {
        return String::new();
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::engine::tests::{fixture_set, testpkg};

    fn doc_set() -> (PackageSet, String) {
        let mut set = fixture_set();
        let path = testpkg("doc");
        set.resolve(&path).unwrap();
        (set, path)
    }

    #[test]
    fn test_type_doc() {
        let (set, path) = doc_set();
        let doc = |name: &str| set.type_doc(&TypeName::new(&path, name)).unwrap();
        assert_eq!(doc("Mode"), "Mode selects how output is written.\n");
        assert_eq!(doc("Options"), "Options configures a run\n");
        assert_eq!(doc("Bare"), "");
        assert_eq!(doc("Labelled"), "Labelled carries a trailing note\n");
    }

    #[test]
    fn test_grouped_type_doc() {
        let (set, path) = doc_set();
        assert_eq!(set.type_doc(&TypeName::new(&path, "Circle")).unwrap(), "Circle is round\n");
        assert_eq!(
            set.type_doc(&TypeName::new(&path, "Square")).unwrap(),
            "Square has corners.\nFour of them.\n"
        );
    }

    #[test]
    fn test_field_doc() {
        let (set, path) = doc_set();
        let options = TypeName::new(&path, "Options");
        let doc = |field: &str| set.field_doc(&options, field).unwrap();
        assert_eq!(doc("Verbose"), "Verbose prints more!\n");
        assert_eq!(doc("Depth"), "Depth limits\nrecursion.\n");
        assert_eq!(doc("Name"), "Name labels the run\n");
        assert_eq!(doc("Tags"), "  Tags are free-form\n");
        assert_eq!(doc("Plain"), "");
        assert_eq!(doc("Missing"), "");
        assert_eq!(doc("Circle"), "Circle is embedded\n");
    }

    #[test]
    fn test_field_doc_requires_struct() {
        let (set, path) = doc_set();
        assert!(matches!(
            set.field_doc(&TypeName::new(&path, "Mode"), "X"),
            Err(Error::NotStruct(_))
        ));
        assert!(matches!(
            set.type_doc(&TypeName::new(&path, "Nope")),
            Err(Error::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_extract_source() {
        let (set, path) = doc_set();
        let src = set.extract_source(&TypeName::new(&path, "Mode")).unwrap();
        assert_eq!(src, b"Mode string");
        let src = set.extract_source(&TypeName::new(&path, "Circle")).unwrap();
        assert_eq!(src, b"Circle struct{}");
    }

    #[test]
    fn test_comment_text_formatting() {
        assert_eq!(comment_text(&["// a", "//", "//", "// b", "//"]), "a\n\nb\n");
        assert_eq!(comment_text(&["//go:generate stringer", "// Real doc"]), "Real doc\n");
        assert_eq!(comment_text(&["//"]), "");
        assert_eq!(comment_text(&[]), "");
    }
}
