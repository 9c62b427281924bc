use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use skiptrace_core::analyzer::TestFileAnalyzer;
use skiptrace_core::types::{ClassRecord, MethodRecord, TriState};

/// Kinds that count as an enclosing declaration context for a method.
const CONTEXT_KINDS: [&str; 6] = [
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
    "object_creation_expression",
];

/// Java test-method analyzer using tree-sitter.
///
/// Extraction is syntax-level: a method counts as a test if it carries an
/// explicit `@Test` annotation or its name starts with "test" in any casing,
/// unless `@Ignore` is present.
pub struct JavaAnalyzer {
    language: Language,
    method_query: Query,
}

impl JavaAnalyzer {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_java::LANGUAGE.into();

        let method_query = Query::new(&language, "(method_declaration) @method")
            .context("failed to compile method query")?;

        Ok(Self {
            language,
            method_query,
        })
    }
}

impl TestFileAnalyzer for JavaAnalyzer {
    fn language(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &[&str] {
        &["java"]
    }

    fn extract_methods(&self, path: &Path, content: &str) -> Result<Vec<MethodRecord>> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to set Java language")?;
        let tree = parser
            .parse(content, None)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if tree.root_node().has_error() {
            anyhow::bail!("syntax errors in {}", path.display());
        }

        let package = package_name(tree.root_node(), content);

        let mut methods = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.method_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                methods.push(method_record(capture.node, package.as_deref(), content));
            }
        }

        Ok(methods)
    }
}

fn method_record(node: Node, package: Option<&str>, src: &str) -> MethodRecord {
    let class = owning_class(node, package, src);
    let signature = signature_text(node, src);
    let mut method = MethodRecord::new(class, signature);
    method.is_override = TriState::from(has_annotation(node, src, "Override"));
    method.is_test = TriState::from(is_test_method(node, src));
    method.is_abstract = TriState::from(has_modifier_keyword(node, "abstract"));
    method
}

fn is_test_method(node: Node, src: &str) -> bool {
    if has_annotation(node, src, "Ignore") {
        return false;
    }
    has_annotation(node, src, "Test") || method_name(node, src).to_lowercase().starts_with("test")
}

/// Compute the owning class by walking outward through enclosing declaration
/// contexts. Nested classes and anonymous class bodies contribute name
/// segments; any other context contributes nothing. The simple name and the
/// recorded parent name come from the innermost context, and only when that
/// context is a class or interface declaration.
fn owning_class(method: Node, package: Option<&str>, src: &str) -> ClassRecord {
    let mut segments: Vec<String> = Vec::new();
    let mut simple_name: Option<String> = None;
    let mut parent_name: Option<String> = None;
    let mut innermost_seen = false;

    let mut current = method.parent();
    while let Some(node) = current {
        let kind = node.kind();
        if CONTEXT_KINDS.contains(&kind) {
            if !innermost_seen {
                innermost_seen = true;
                if matches!(kind, "class_declaration" | "interface_declaration") {
                    simple_name = node
                        .child_by_field_name("name")
                        .map(|n| node_text(n, src));
                    parent_name = recorded_parent_name(node, src);
                }
            }
            match kind {
                "class_declaration" | "interface_declaration" => {
                    if let Some(name) = node.child_by_field_name("name") {
                        segments.push(node_text(name, src));
                    }
                }
                "object_creation_expression" => {
                    if let Some(name) = node
                        .child_by_field_name("type")
                        .and_then(|ty| type_simple_name(ty, src))
                    {
                        segments.push(name);
                    }
                }
                _ => {}
            }
        }
        current = node.parent();
    }

    segments.reverse();
    let nested = segments.join(".");
    let qualified = match package {
        Some(pkg) => format!("{pkg}.{nested}"),
        None => nested,
    };

    let mut class = ClassRecord::new(qualified, simple_name);
    class.parent_class = parent_name;
    class
}

/// Signature text: method name plus parameter type texts, e.g.
/// `check(List<String>, int)`.
fn signature_text(node: Node, src: &str) -> String {
    let name = method_name(node, src);
    let mut parts: Vec<String> = Vec::new();
    if let Some(params) = node.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            match param.kind() {
                "formal_parameter" => {
                    if let Some(ty) = param.child_by_field_name("type") {
                        parts.push(node_text(ty, src));
                    }
                }
                "spread_parameter" => {
                    let mut param_cursor = param.walk();
                    let found = param
                        .named_children(&mut param_cursor)
                        .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"));
                    if let Some(ty) = found {
                        parts.push(format!("{}...", node_text(ty, src)));
                    }
                }
                _ => {}
            }
        }
    }
    format!("{name}({})", parts.join(", "))
}

/// The superclass's simple identifier, with any qualifier or type arguments
/// stripped. An interface records the first of its extended interfaces.
fn recorded_parent_name(node: Node, src: &str) -> Option<String> {
    if node.kind() == "class_declaration" {
        let superclass = node.child_by_field_name("superclass")?;
        let mut cursor = superclass.walk();
        let ty = superclass.named_children(&mut cursor).next()?;
        return type_simple_name(ty, src);
    }

    let mut cursor = node.walk();
    let extends = node
        .children(&mut cursor)
        .find(|c| c.kind() == "extends_interfaces")?;
    let mut list_cursor = extends.walk();
    let list = extends
        .named_children(&mut list_cursor)
        .find(|c| c.kind() == "type_list")?;
    let mut type_cursor = list.walk();
    let ty = list.named_children(&mut type_cursor).next()?;
    type_simple_name(ty, src)
}

fn type_simple_name(node: Node, src: &str) -> Option<String> {
    match node.kind() {
        "type_identifier" | "identifier" => Some(node_text(node, src)),
        "generic_type" => {
            let mut cursor = node.walk();
            let inner = node
                .named_children(&mut cursor)
                .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))?;
            type_simple_name(inner, src)
        }
        "scoped_type_identifier" => {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .filter(|c| c.kind() == "type_identifier")
                .last()
                .map(|n| node_text(n, src))
        }
        _ => None,
    }
}

fn method_name(node: Node, src: &str) -> String {
    node.child_by_field_name("name")
        .map(|n| node_text(n, src))
        .unwrap_or_default()
}

fn modifiers(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == "modifiers");
    found
}

fn has_annotation(node: Node, src: &str, name: &str) -> bool {
    let Some(mods) = modifiers(node) else {
        return false;
    };
    let mut cursor = mods.walk();
    let found = mods.children(&mut cursor).any(|child| {
        matches!(child.kind(), "marker_annotation" | "annotation")
            && child
                .child_by_field_name("name")
                .map(|n| node_text(n, src))
                .as_deref()
                == Some(name)
    });
    found
}

fn has_modifier_keyword(node: Node, keyword: &str) -> bool {
    let Some(mods) = modifiers(node) else {
        return false;
    };
    let mut cursor = mods.walk();
    let found = mods.children(&mut cursor).any(|child| child.kind() == keyword);
    found
}

fn package_name(root: Node, src: &str) -> Option<String> {
    let mut cursor = root.walk();
    let decl = root
        .named_children(&mut cursor)
        .find(|c| c.kind() == "package_declaration")?;
    let mut name_cursor = decl.walk();
    let found = decl
        .named_children(&mut name_cursor)
        .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
        .map(|n| node_text(n, src));
    found
}

/// Extract text from a tree-sitter node.
fn node_text(node: Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}
