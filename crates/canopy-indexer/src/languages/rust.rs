//! Rust language parser, backed by `tree-sitter-rust`.

use async_trait::async_trait;
use canopy_core::{EntityType, RelationshipType};
use tree_sitter::Node;

use super::fqn::{compute_fqn, normalize_param_list, normalize_segment_name, ScopeRule};
use crate::parser::{CallSiteReference, LanguageParser, ParseEvent, ParsedEntity, ParsedRelationship};
use crate::parser_pool::{FileKind, ParserPool};

const SCOPE_RULES: &[ScopeRule] = &[
    ScopeRule { node_kind: "mod_item", name_field: "name", callable: false },
    ScopeRule { node_kind: "impl_item", name_field: "type", callable: false },
    ScopeRule { node_kind: "trait_item", name_field: "name", callable: false },
    ScopeRule { node_kind: "function_item", name_field: "name", callable: true },
];

pub struct RustParser {
    pool: ParserPool,
}

impl RustParser {
    pub fn new(pool: ParserPool) -> Self {
        RustParser { pool }
    }
}

#[async_trait]
impl LanguageParser for RustParser {
    fn language_key(&self) -> &'static str {
        "rust"
    }

    async fn parse(&self, content: &str) -> anyhow::Result<Vec<ParseEvent>> {
        let tree = self.pool.parse(FileKind::Rust, content.to_string()).await?;
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
            "function_item" | "struct_item" | "enum_item" | "trait_item" | "impl_item" | "mod_item" | "macro_definition"
        ) {
            lines.push(child.start_position().row);
        }
    }
    lines
}

fn walk(node: Node, source: &[u8], events: &mut Vec<ParseEvent>) {
    match node.kind() {
        "function_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_entity(node, name_node, source, EntityType::FunctionDefinition, true, events);
            }
        }
        "struct_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_entity(node, name_node, source, EntityType::StructDefinition, false, events);
            }
        }
        "enum_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_entity(node, name_node, source, EntityType::EnumDefinition, false, events);
            }
        }
        "trait_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_entity(node, name_node, source, EntityType::TraitDefinition, false, events);
            }
        }
        "mod_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_entity(node, name_node, source, EntityType::ModuleDefinition, false, events);
            }
        }
        "macro_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_entity(node, name_node, source, EntityType::MacroDefinition, false, events);
            }
        }
        "impl_item" => {
            if let Some(type_node) = node.child_by_field_name("type") {
                emit_entity(node, type_node, source, EntityType::Implementation, false, events);
                if let Some(trait_node) = node.child_by_field_name("trait") {
                    if let Ok(trait_text) = trait_node.utf8_text(source) {
                        let impl_fqn = compute_fqn(node, source, SCOPE_RULES, &node_text(type_node, source), false, "");
                        events.push(ParseEvent::Relationship(ParsedRelationship {
                            rel_type: RelationshipType::Implements,
                            source_fqn: impl_fqn,
                            target_text: trait_text.to_string(),
                        }));
                    }
                }
            }
        }
        "use_declaration" => {
            if let Some(arg) = node.child(1) {
                if let Ok(text) = arg.utf8_text(source) {
                    let target = text.trim_end_matches(';').trim().to_string();
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
                        callee_expression: normalize_segment_name(callee),
                        line: node.start_position().row as u32,
                        argument_text,
                        argument_count,
                    }));
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, events);
    }
}

fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

fn emit_entity(
    def_node: Node,
    name_node: Node,
    source: &[u8],
    entity_type: EntityType,
    callable: bool,
    events: &mut Vec<ParseEvent>,
) {
    let Ok(name) = name_node.utf8_text(source) else { return };
    let params = if callable {
        def_node
            .child_by_field_name("parameters")
            .and_then(|n| n.utf8_text(source).ok())
            .map(normalize_param_list)
            .unwrap_or_default()
    } else {
        String::new()
    };
    let fqn = compute_fqn(def_node, source, SCOPE_RULES, name, callable, &params);
    let snippet = def_node.utf8_text(source).unwrap_or("").to_string();
    events.push(ParseEvent::Entity(ParsedEntity {
        entity_type,
        name: name.to_string(),
        fqn,
        source_snippet: snippet,
        start_line: def_node.start_position().row as u32 + 1,
        end_line: def_node.end_position().row as u32 + 1,
    }));
}

/// Climbs to the nearest enclosing `function_item` and computes its FQN, for
/// attributing a call site to its caller.
fn enclosing_function_fqn(node: Node, source: &[u8]) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "function_item" {
            let name_node = n.child_by_field_name("name")?;
            let name = name_node.utf8_text(source).ok()?;
            let params = n
                .child_by_field_name("parameters")
                .and_then(|p| p.utf8_text(source).ok())
                .map(normalize_param_list)
                .unwrap_or_default();
            return Some(compute_fqn(n, source, SCOPE_RULES, name, true, &params));
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
    async fn extracts_functions_structs_and_calls() {
        let parser = RustParser::new(create_parser_pool());
        let code = r#"
struct Point { x: i32, y: i32 }

fn helper() -> i32 { 1 }

fn main() {
    let p = Point { x: 1, y: 2 };
    helper();
}
"#;
        let events = parser.parse(code).await.unwrap();
        assert!(matches!(events[0], ParseEvent::SliceLines(_)));

        let entities: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Entity(entity) => Some(entity),
                _ => None,
            })
            .collect();
        assert!(entities.iter().any(|e| e.fqn == "Point" && e.entity_type == EntityType::StructDefinition));
        assert!(entities.iter().any(|e| e.fqn == "helper()" && e.entity_type == EntityType::FunctionDefinition));

        let calls: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::CallSite(cs) => Some(cs),
                _ => None,
            })
            .collect();
        assert!(calls.iter().any(|c| c.callee_expression == "helper" && c.calling_entity_fqn == "main()"));
    }

    #[tokio::test]
    async fn impl_block_emits_implements_relationship() {
        let parser = RustParser::new(create_parser_pool());
        let code = r#"
trait Greet { fn hello(&self); }
struct Foo;
impl Greet for Foo {
    fn hello(&self) {}
}
"#;
        let events = parser.parse(code).await.unwrap();
        let rel = events.iter().find_map(|e| match e {
            ParseEvent::Relationship(r) if r.rel_type == RelationshipType::Implements => Some(r),
            _ => None,
        });
        assert!(rel.is_some());
        assert_eq!(rel.unwrap().target_text, "Greet");
    }
}
