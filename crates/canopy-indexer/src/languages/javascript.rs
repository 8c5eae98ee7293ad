//! JavaScript language parser, backed by `tree-sitter-javascript`.

use async_trait::async_trait;

use super::js_family::{collect_slice_lines, walk};
use crate::parser::{LanguageParser, ParseEvent};
use crate::parser_pool::{FileKind, ParserPool};

pub struct JavaScriptParser {
    pool: ParserPool,
}

impl JavaScriptParser {
    pub fn new(pool: ParserPool) -> Self {
        JavaScriptParser { pool }
    }
}

#[async_trait]
impl LanguageParser for JavaScriptParser {
    fn language_key(&self) -> &'static str {
        "javascript"
    }

    async fn parse(&self, content: &str) -> anyhow::Result<Vec<ParseEvent>> {
        let tree = self.pool.parse(FileKind::JavaScript, content.to_string()).await?;
        let source = content.as_bytes();
        let mut events = vec![ParseEvent::SliceLines(collect_slice_lines(&tree.root_node()))];
        walk(tree.root_node(), source, &mut events);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::create_parser_pool;

    #[tokio::test]
    async fn extracts_class_and_function_and_calls() {
        let parser = JavaScriptParser::new(create_parser_pool());
        let code = r#"
import React from 'react';

class User {
    getName() {
        return format(this.name);
    }
}

function format(name) { return name; }
"#;
        let events = parser.parse(code).await.unwrap();
        let entities: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Entity(entity) => Some(entity),
                _ => None,
            })
            .collect();
        assert!(entities.iter().any(|e| e.fqn == "User"));
        assert!(entities.iter().any(|e| e.fqn == "User::getName()"));
        assert!(entities.iter().any(|e| e.fqn == "format()"));

        let imports: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Relationship(r) => Some(r),
                _ => None,
            })
            .collect();
        assert!(imports.iter().any(|r| r.target_text == "react"));
    }
}
