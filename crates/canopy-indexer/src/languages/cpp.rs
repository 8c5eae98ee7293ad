//! C++ language parser, backed by `tree-sitter-cpp`. Extends the C
//! extraction shape with namespaces, classes, and using-directives.

use async_trait::async_trait;
use canopy_core::{EntityType, RelationshipType};
use tree_sitter::Node;

use super::fqn::{compute_fqn, normalize_param_list, normalize_segment_name, ScopeRule};
use crate::parser::{CallSiteReference, LanguageParser, ParseEvent, ParsedEntity, ParsedRelationship};
use crate::parser_pool::{FileKind, ParserPool};

const SCOPE_RULES: &[ScopeRule] = &[
    ScopeRule { node_kind: "namespace_definition", name_field: "name", callable: false },
    ScopeRule { node_kind: "class_specifier", name_field: "name", callable: false },
    ScopeRule { node_kind: "struct_specifier", name_field: "name", callable: false },
];

pub struct CppParser {
    pool: ParserPool,
}

impl CppParser {
    pub fn new(pool: ParserPool) -> Self {
        CppParser { pool }
    }
}

#[async_trait]
impl LanguageParser for CppParser {
    fn language_key(&self) -> &'static str {
        "cpp"
    }

    async fn parse(&self, content: &str) -> anyhow::Result<Vec<ParseEvent>> {
        let tree = self.pool.parse(FileKind::Cpp, content.to_string()).await?;
        let source = content.as_bytes();
        let mut events = vec![ParseEvent::SliceLines(collect_slice_lines(&tree.root_node()))];
        walk(tree.root_node(), source, &mut events);
        Ok(events)
    }
}

fn collect_slice_lines(root: &Node) -> Vec<usize> {
    let mut lines = vec![0usize];
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if matches!(
            child.kind(),
            "function_definition" | "class_specifier" | "struct_specifier" | "namespace_definition"
        ) {
            lines.push(child.start_position().row);
        }
    }
    lines
}

fn function_declarator_name<'a>(node: Node<'a>, source: &'a [u8]) -> Option<(&'a str, Node<'a>)> {
    if node.kind() == "function_declarator" {
        let declarator = node.child_by_field_name("declarator")?;
        return Some((declarator.utf8_text(source).ok()?, node));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = function_declarator_name(child, source) {
            return Some(found);
        }
    }
    None
}

fn namespace_name<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.child_by_field_name("name")
        .and_then(|n| n.utf8_text(source).ok())
        .unwrap_or("anonymous")
}

fn walk(node: Node, source: &[u8], events: &mut Vec<ParseEvent>) {
    match node.kind() {
        "namespace_definition" => {
            let name = namespace_name(node, source);
            let fqn = compute_fqn(node, source, SCOPE_RULES, name, false, "");
            events.push(ParseEvent::Entity(ParsedEntity {
                entity_type: EntityType::NamespaceDefinition,
                name: name.to_string(),
                fqn,
                source_snippet: String::new(),
                start_line: node.start_position().row as u32 + 1,
                end_line: node.end_position().row as u32 + 1,
            }));
        }
        "class_specifier" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_plain(node, name_node, source, EntityType::ClassDefinition, events);
            }
        }
        "struct_specifier" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_plain(node, name_node, source, EntityType::StructDefinition, events);
            }
        }
        "function_definition" => {
            if let Some(declarator) = node.child_by_field_name("declarator") {
                if let Some((name, func_declarator)) = function_declarator_name(declarator, source) {
                    let params = func_declarator
                        .child_by_field_name("parameters")
                        .and_then(|n| n.utf8_text(source).ok())
                        .map(normalize_param_list)
                        .unwrap_or_default();
                    let fqn = compute_fqn(node, source, SCOPE_RULES, name, true, &params);
                    events.push(ParseEvent::Entity(ParsedEntity {
                        entity_type: EntityType::FunctionDefinition,
                        name: name.to_string(),
                        fqn,
                        source_snippet: node.utf8_text(source).unwrap_or("").to_string(),
                        start_line: node.start_position().row as u32 + 1,
                        end_line: node.end_position().row as u32 + 1,
                    }));
                }
            }
        }
        "using_declaration" => {
            if let Ok(text) = node.utf8_text(source) {
                events.push(ParseEvent::Entity(ParsedEntity {
                    entity_type: EntityType::UsingDirective,
                    name: text.trim_end_matches(';').to_string(),
                    fqn: compute_fqn(node, source, SCOPE_RULES, text.trim_end_matches(';'), false, ""),
                    source_snippet: text.to_string(),
                    start_line: node.start_position().row as u32 + 1,
                    end_line: node.end_position().row as u32 + 1,
                }));
            }
        }
        "namespace_alias_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_plain(node, name_node, source, EntityType::NamespaceAliasDefinition, events);
            }
        }
        "preproc_include" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if matches!(child.kind(), "string_literal" | "system_lib_string") {
                    if let Ok(text) = child.utf8_text(source) {
                        let target = text.trim_matches(['"', '<', '>']).to_string();
                        events.push(ParseEvent::Entity(ParsedEntity {
                            entity_type: EntityType::ExternalReference,
                            name: target.clone(),
                            fqn: target.clone(),
                            source_snippet: target.clone(),
                            start_line: node.start_position().row as u32 + 1,
                            end_line: node.end_position().row as u32 + 1,
                        }));
                        events.push(ParseEvent::Relationship(ParsedRelationship {
                            rel_type: RelationshipType::Imports,
                            source_fqn: String::new(),
                            target_text: target,
                        }));
                    }
                }
            }
        }
        "field_declaration" | "declaration" => {
            // Member-function/constructor *declarations* (no body, e.g.
            // `Foo(int x);` inside a class) — `function_definition` only
            // covers the defined form.
            if let Some((name, func_declarator)) = function_declarator_name(node, source) {
                let params = func_declarator
                    .child_by_field_name("parameters")
                    .and_then(|n| n.utf8_text(source).ok())
                    .map(normalize_param_list)
                    .unwrap_or_default();
                let fqn = compute_fqn(node, source, SCOPE_RULES, name, true, &params);
                events.push(ParseEvent::Entity(ParsedEntity {
                    entity_type: EntityType::FunctionDeclaration,
                    name: name.to_string(),
                    fqn,
                    source_snippet: node.utf8_text(source).unwrap_or("").to_string(),
                    start_line: node.start_position().row as u32 + 1,
                    end_line: node.end_position().row as u32 + 1,
                }));
            }
        }
        "call_expression" => {
            if let Some(function_node) = node.child_by_field_name("function") {
                if let Ok(callee) = function_node.utf8_text(source) {
                    let calling_fqn = enclosing_function_fqn(node, source).unwrap_or_default();
                    let args_node = node.child_by_field_name("arguments");
                    let (argument_text, argument_count) = args_node
                        .and_then(|n| n.utf8_text(source).ok().map(|t| (t.to_string(), n.named_child_count())))
                        .unwrap_or_default();
                    events.push(ParseEvent::CallSite(CallSiteReference {
                        calling_entity_fqn: calling_fqn,
                        callee_expression: strip_template_args(callee),
                        line: node.start_position().row as u32,
                        argument_text,
                        argument_count,
                    }));
                }
            }
        }
        "binary_expression" => {
            if let Some(op_node) = node.child_by_field_name("operator") {
                if let Ok(op) = op_node.utf8_text(source) {
                    let calling_fqn = enclosing_function_fqn(node, source).unwrap_or_default();
                    events.push(ParseEvent::CallSite(CallSiteReference {
                        calling_entity_fqn: calling_fqn,
                        callee_expression: normalize_segment_name(&format!("operator{op}")),
                        line: node.start_position().row as u32,
                        argument_text: node.utf8_text(source).unwrap_or("").to_string(),
                        argument_count: 2,
                    }));
                }
            }
        }
        "new_expression" => {
            let calling_fqn = enclosing_function_fqn(node, source).unwrap_or_default();
            let callee = node
                .child_by_field_name("type")
                .and_then(|n| n.utf8_text(source).ok())
                .map(strip_template_args)
                .unwrap_or_else(|| "operator new".to_string());
            let args_node = node.child_by_field_name("arguments");
            let (argument_text, argument_count) = args_node
                .and_then(|n| n.utf8_text(source).ok().map(|t| (t.to_string(), n.named_child_count())))
                .unwrap_or_default();
            events.push(ParseEvent::CallSite(CallSiteReference {
                calling_entity_fqn: calling_fqn,
                callee_expression: callee,
                line: node.start_position().row as u32,
                argument_text,
                argument_count,
            }));
        }
        "delete_expression" => {
            let calling_fqn = enclosing_function_fqn(node, source).unwrap_or_default();
            events.push(ParseEvent::CallSite(CallSiteReference {
                calling_entity_fqn: calling_fqn,
                callee_expression: "operator delete".to_string(),
                line: node.start_position().row as u32,
                argument_text: node.utf8_text(source).unwrap_or("").to_string(),
                argument_count: 1,
            }));
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, events);
    }
}

fn emit_plain(def_node: Node, name_node: Node, source: &[u8], entity_type: EntityType, events: &mut Vec<ParseEvent>) {
    let Ok(name) = name_node.utf8_text(source) else { return };
    let fqn = compute_fqn(def_node, source, SCOPE_RULES, name, false, "");
    events.push(ParseEvent::Entity(ParsedEntity {
        entity_type,
        name: name.to_string(),
        fqn,
        source_snippet: def_node.utf8_text(source).unwrap_or("").to_string(),
        start_line: def_node.start_position().row as u32 + 1,
        end_line: def_node.end_position().row as u32 + 1,
    }));
}

/// Drops a trailing `<...>` template-argument list from a callee expression,
/// per §4.3's "textual callee with template arguments stripped".
fn strip_template_args(text: &str) -> String {
    match text.find('<') {
        Some(idx) => text[..idx].trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn enclosing_function_fqn(node: Node, source: &[u8]) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "function_definition" {
            if let Some(declarator) = n.child_by_field_name("declarator") {
                if let Some((name, func_declarator)) = function_declarator_name(declarator, source) {
                    let params = func_declarator
                        .child_by_field_name("parameters")
                        .and_then(|p| p.utf8_text(source).ok())
                        .map(normalize_param_list)
                        .unwrap_or_default();
                    return Some(compute_fqn(n, source, SCOPE_RULES, name, true, &params));
                }
            }
        }
        current = n.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::create_parser_pool;

    #[tokio::test]
    async fn extracts_namespaced_classes_and_methods() {
        let parser = CppParser::new(create_parser_pool());
        let code = r#"
namespace app {
    class Widget {
        void render() {}
    };
}
"#;
        let events = parser.parse(code).await.unwrap();
        let entities: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Entity(entity) => Some(entity),
                _ => None,
            })
            .collect();
        assert!(entities.iter().any(|e| e.fqn == "app" && e.entity_type == EntityType::NamespaceDefinition));
        assert!(entities.iter().any(|e| e.fqn == "app::Widget" && e.entity_type == EntityType::ClassDefinition));
    }

    #[tokio::test]
    async fn constructor_declaration_inside_class_body_is_captured() {
        let parser = CppParser::new(create_parser_pool());
        let code = "class Foo {\npublic:\n    Foo(int x);\n};\n";
        let events = parser.parse(code).await.unwrap();
        let entities: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Entity(entity) => Some(entity),
                _ => None,
            })
            .collect();
        assert!(entities
            .iter()
            .any(|e| e.fqn == "Foo::Foo(int)" && e.entity_type == EntityType::FunctionDeclaration));
    }

    #[tokio::test]
    async fn binary_operator_use_yields_operator_call_site() {
        let parser = CppParser::new(create_parser_pool());
        let code = "Vec operator+(const Vec& a, const Vec& b);\nVec sum(Vec a, Vec b) {\n    return a + b;\n}\n";
        let events = parser.parse(code).await.unwrap();
        let calls: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::CallSite(cs) => Some(cs),
                _ => None,
            })
            .collect();
        assert!(calls.iter().any(|c| c.callee_expression == "operator+" && c.argument_count == 2));
    }

    #[tokio::test]
    async fn include_emits_external_reference_and_imports_edge() {
        let parser = CppParser::new(create_parser_pool());
        let code = "#include <vector>\n#include <vector>\n";
        let events = parser.parse(code).await.unwrap();
        let external_refs: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Entity(entity) if entity.entity_type == EntityType::ExternalReference => Some(entity),
                _ => None,
            })
            .collect();
        assert_eq!(external_refs.len(), 2);
        assert!(external_refs.iter().all(|e| e.fqn == "vector"));

        let imports: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Relationship(r) if r.rel_type == RelationshipType::Imports => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(imports.len(), 2);
    }
}
