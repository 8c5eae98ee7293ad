//! Per-language parser implementations and the registry that maps a
//! discovered file's language key onto the right one.

pub mod c;
pub mod cpp;
pub mod fqn;
pub mod generic;
pub mod javascript;
mod js_family;
pub mod python;
pub mod rust;
pub mod typescript;

use std::collections::HashMap;
use std::sync::Arc;

use crate::parser::LanguageParser;
use crate::parser_pool::ParserPool;

/// Builds a parser for every language key this crate knows about. Callers
/// not covered here (unrecognized language keys) should log and skip the
/// file, per the Orchestrator's contract.
pub fn build_registry(pool: ParserPool) -> HashMap<&'static str, Arc<dyn LanguageParser>> {
    let mut registry: HashMap<&'static str, Arc<dyn LanguageParser>> = HashMap::new();
    registry.insert("rust", Arc::new(rust::RustParser::new(pool.clone())));
    registry.insert("python", Arc::new(python::PythonParser::new(pool.clone())));
    registry.insert("javascript", Arc::new(javascript::JavaScriptParser::new(pool.clone())));
    registry.insert("typescript", Arc::new(typescript::TypeScriptParser::new(pool.clone())));
    registry.insert("c", Arc::new(c::CParser::new(pool.clone())));
    registry.insert("cpp", Arc::new(cpp::CppParser::new(pool)));

    for key in ["css", "markdown", "yaml", "toml", "dockerfile"] {
        registry.insert(key, Arc::new(generic::GenericParser::new(key)));
    }
    registry
}
