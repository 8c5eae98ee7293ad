//! TypeScript language parser, backed by `tree-sitter-typescript`.

use async_trait::async_trait;

use super::js_family::{collect_slice_lines, walk};
use crate::parser::{LanguageParser, ParseEvent};
use crate::parser_pool::{FileKind, ParserPool};

pub struct TypeScriptParser {
    pool: ParserPool,
}

impl TypeScriptParser {
    pub fn new(pool: ParserPool) -> Self {
        TypeScriptParser { pool }
    }
}

#[async_trait]
impl LanguageParser for TypeScriptParser {
    fn language_key(&self) -> &'static str {
        "typescript"
    }

    async fn parse(&self, content: &str) -> anyhow::Result<Vec<ParseEvent>> {
        let tree = self.pool.parse(FileKind::TypeScript, content.to_string()).await?;
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
    async fn extracts_typed_class_members() {
        let parser = TypeScriptParser::new(create_parser_pool());
        let code = r#"
class Repo {
    find(id: string): void {
        helper(id);
    }
}

function helper(id: string): void {}
"#;
        let events = parser.parse(code).await.unwrap();
        let entities: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Entity(entity) => Some(entity),
                _ => None,
            })
            .collect();
        assert!(entities.iter().any(|e| e.fqn == "Repo::find(string)"));
    }
}
