//! Shared extraction logic for the JavaScript/TypeScript grammar family —
//! both grammars expose the same node kinds for the constructs this
//! project extracts, so one walker serves both parsers.

use canopy_core::{EntityType, RelationshipType};
use tree_sitter::Node;

use super::fqn::{compute_fqn, normalize_param_list, ScopeRule};
use crate::parser::{CallSiteReference, ParseEvent, ParsedEntity, ParsedRelationship};

pub const SCOPE_RULES: &[ScopeRule] = &[
    ScopeRule { node_kind: "class_declaration", name_field: "name", callable: false },
    ScopeRule { node_kind: "function_declaration", name_field: "name", callable: true },
    ScopeRule { node_kind: "method_definition", name_field: "name", callable: true },
];

pub fn collect_slice_lines(root: &Node) -> Vec<usize> {
    let mut lines = vec![0usize];
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if matches!(child.kind(), "function_declaration" | "class_declaration") {
            lines.push(child.start_position().row);
        }
    }
    lines
}

pub fn walk(node: Node, source: &[u8], events: &mut Vec<ParseEvent>) {
    match node.kind() {
        "function_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_entity(node, name_node, source, EntityType::FunctionDefinition, true, events);
            }
        }
        "class_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_entity(node, name_node, source, EntityType::ClassDefinition, false, events);
            }
        }
        "method_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_entity(node, name_node, source, EntityType::FunctionDefinition, true, events);
            }
        }
        "import_statement" => {
            if let Some(source_node) = node.child_by_field_name("source") {
                if let Ok(text) = source_node.utf8_text(source) {
                    let target = text.trim_matches(['"', '\'']).to_string();
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
                    let calling_fqn = enclosing_callable_fqn(node, source).unwrap_or_default();
                    let args_node = node.child_by_field_name("arguments");
                    let (argument_text, argument_count) = args_node
                        .and_then(|n| n.utf8_text(source).ok().map(|t| (t.to_string(), n.named_child_count())))
                        .unwrap_or_default();
                    events.push(ParseEvent::CallSite(CallSiteReference {
                        calling_entity_fqn: calling_fqn,
                        callee_expression: callee.to_string(),
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

fn enclosing_callable_fqn(node: Node, source: &[u8]) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(n.kind(), "function_declaration" | "method_definition") {
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
