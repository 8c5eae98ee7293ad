//! C language parser, backed by `tree-sitter-c`.

use async_trait::async_trait;
use canopy_core::{EntityType, RelationshipType};
use tree_sitter::Node;

use super::fqn::{compute_fqn, normalize_param_list, ScopeRule};
use crate::parser::{CallSiteReference, LanguageParser, ParseEvent, ParsedEntity, ParsedRelationship};
use crate::parser_pool::{FileKind, ParserPool};

const SCOPE_RULES: &[ScopeRule] = &[ScopeRule { node_kind: "struct_specifier", name_field: "name", callable: false }];

pub struct CParser {
    pool: ParserPool,
}

impl CParser {
    pub fn new(pool: ParserPool) -> Self {
        CParser { pool }
    }
}

#[async_trait]
impl LanguageParser for CParser {
    fn language_key(&self) -> &'static str {
        "c"
    }

    async fn parse(&self, content: &str) -> anyhow::Result<Vec<ParseEvent>> {
        let tree = self.pool.parse(FileKind::C, content.to_string()).await?;
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
        if matches!(child.kind(), "function_definition" | "struct_specifier" | "enum_specifier" | "type_definition") {
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

fn walk(node: Node, source: &[u8], events: &mut Vec<ParseEvent>) {
    match node.kind() {
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
        "struct_specifier" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_plain(node, name_node, source, EntityType::StructDefinition, events);
            }
        }
        "enum_specifier" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                emit_plain(node, name_node, source, EntityType::EnumDefinition, events);
            }
        }
        "type_definition" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "type_identifier" {
                    emit_plain(node, child, source, EntityType::TypeAlias, events);
                    break;
                }
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
    async fn extracts_functions_structs_and_includes() {
        let parser = CParser::new(create_parser_pool());
        let code = r#"
#include <stdio.h>

struct Point { int x; int y; };

int helper(int x) { return x; }

int main() {
    return helper(1);
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
        assert!(entities.iter().any(|e| e.fqn == "Point" && e.entity_type == EntityType::StructDefinition));
        assert!(entities.iter().any(|e| e.name == "helper"));

        let calls: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::CallSite(cs) => Some(cs),
                _ => None,
            })
            .collect();
        assert!(calls.iter().any(|c| c.callee_expression == "helper"));
    }
}
