//! Shared fully-qualified-name computation, used by every tree-sitter
//! backed language parser. A FQN is built by climbing a node's named
//! enclosing scopes (module, namespace, type, function) and joining their
//! names with `::`.

use tree_sitter::Node;

/// Describes, for one language's grammar, which node kinds introduce a
/// named scope and how to find that scope's name.
pub struct ScopeRule {
    pub node_kind: &'static str,
    pub name_field: &'static str,
    /// True for function/method-like scopes, whose FQN segment gets a
    /// parameter-list suffix so overloads stay distinguishable.
    pub callable: bool,
}

/// Node kinds treated as an anonymous namespace: contribute the literal
/// segment `anonymous` rather than a generated id, so FQNs stay stable
/// across identical runs.
pub fn is_anonymous_namespace(node: Node, source: &[u8], rules: &[ScopeRule]) -> bool {
    rules
        .iter()
        .find(|r| r.node_kind == node.kind())
        .map(|r| node.child_by_field_name(r.name_field).is_none())
        .unwrap_or(false)
        && node.kind().contains("namespace")
        && node_text(node, source).is_some_and(|t| !t.is_empty())
}

fn node_text<'a>(node: Node, source: &'a [u8]) -> Option<&'a str> {
    node.utf8_text(source).ok()
}

/// Normalizes a raw name for FQN purposes: operator overloads become
/// `operator<symbol>`, `operator new[]` / `operator delete[]` for the
/// array allocation forms, everything else passes through unchanged.
pub fn normalize_segment_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("operator") {
        let symbol = rest.trim();
        if symbol.is_empty() {
            return "operator".to_string();
        }
        if symbol.starts_with("new[") || symbol.starts_with("new [") {
            return "operator new[]".to_string();
        }
        if symbol.starts_with("delete[") || symbol.starts_with("delete [") {
            return "operator delete[]".to_string();
        }
        return format!("operator{symbol}");
    }
    trimmed.to_string()
}

/// Turns a raw `parameters` node's text (including its own `( )`, as every
/// parser passes it) into a normalized, parenthesized, comma-separated
/// parameter-*type* list: names are stripped, whitespace collapsed, `*`/`&`/
/// `[]` stay attached to the type, and `(void)`/`()` both normalize to `()`.
/// Implicit receivers (`self`, `&self`, `&mut self`, `cls`, `this`) and
/// untyped bare names (Python/JS parameters with no annotation) carry no
/// declared type and are dropped rather than echoed back as a "type".
pub fn normalize_param_list(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed)
        .trim();

    if inner.is_empty() || inner.eq_ignore_ascii_case("void") {
        return "()".to_string();
    }

    let types: Vec<String> = split_top_level_commas(inner)
        .into_iter()
        .filter_map(extract_param_type)
        .collect();
    format!("({})", types.join(", "))
}

const RECEIVER_FORMS: &[&str] = &["self", "&self", "&mut self", "*self", "cls", "this"];

/// Splits on commas that aren't nested inside `()`, `[]`, `{}`, or `<>`, so
/// default-value expressions and generic argument lists don't get cut.
fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            ',' if depth == 0 => {
                segments.push(s[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(s[start..].trim());
    segments.into_iter().filter(|s| !s.is_empty()).collect()
}

fn top_level_char(s: &str, target: char) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips a trailing `[...]` (array declarator) from `segment`, returning the
/// remainder and a normalized `[]` suffix if one was present. Array sizes are
/// dropped so the normalized form stays stable regardless of the declared
/// bound.
fn split_trailing_array(segment: &str) -> (&str, &'static str) {
    let trimmed = segment.trim_end();
    if trimmed.ends_with(']') {
        if let Some(open) = trimmed.rfind('[') {
            return (trimmed[..open].trim_end(), "[]");
        }
    }
    (trimmed, "")
}

/// Finds a trailing identifier token in `base` (the declarator name), and
/// splits it off from whatever precedes it (the type, possibly with an
/// attached `*`/`&`). Returns `None` if `base` has no trailing identifier at
/// all (it's already bare a type, e.g. an unnamed parameter).
fn trailing_identifier_split(base: &str) -> Option<(&str, &str)> {
    let mut boundary = base.len();
    for (i, c) in base.char_indices().rev() {
        if c.is_alphanumeric() || c == '_' {
            boundary = i;
        } else {
            break;
        }
    }
    if boundary == base.len() {
        return None;
    }
    let name = &base[boundary..];
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((&base[..boundary], name))
}

/// Extracts the declared type from one parameter segment, or `None` if the
/// segment carries no type at all (an implicit receiver or an untyped bare
/// name) and should be omitted from the normalized list entirely.
fn extract_param_type(segment: &str) -> Option<String> {
    let segment = segment.trim();
    if segment.is_empty() || RECEIVER_FORMS.contains(&segment) {
        return None;
    }

    if let Some(colon_idx) = top_level_char(segment, ':') {
        let after = segment[colon_idx + 1..].trim();
        let ty = match top_level_char(after, '=') {
            Some(eq_idx) => after[..eq_idx].trim(),
            None => after,
        };
        return if ty.is_empty() { None } else { Some(collapse_ws(ty)) };
    }

    let (base, array_suffix) = split_trailing_array(segment);
    match trailing_identifier_split(base) {
        None => Some(format!("{}{array_suffix}", collapse_ws(base))),
        Some((type_part, _name)) if !type_part.trim_end().is_empty() => {
            Some(format!("{}{array_suffix}", collapse_ws(type_part.trim_end())))
        }
        Some(_) => None,
    }
}

/// Climbs `node`'s ancestors, building a `::`-joined FQN from every scope
/// in `rules` found along the way (root to leaf), then appends `leaf_name`
/// (already normalized) as the final segment. If `leaf_is_callable`, also
/// appends `leaf_params` (already normalized) in parentheses.
pub fn compute_fqn(
    node: Node,
    source: &[u8],
    rules: &[ScopeRule],
    leaf_name: &str,
    leaf_is_callable: bool,
    leaf_params: &str,
) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = node.parent();
    while let Some(n) = current {
        if let Some(rule) = rules.iter().find(|r| r.node_kind == n.kind()) {
            let name = n
                .child_by_field_name(rule.name_field)
                .and_then(|nm| node_text(nm, source))
                .map(normalize_segment_name)
                .unwrap_or_else(|| "anonymous".to_string());
            let segment = if rule.callable {
                format!("{name}()")
            } else {
                name
            };
            segments.push(segment);
        }
        current = n.parent();
    }
    segments.reverse();

    let leaf = normalize_segment_name(leaf_name);
    let leaf_segment = if leaf_is_callable {
        // Callers already run `leaf_params` through `normalize_param_list`,
        // so it arrives wrapped in its own parens — appending it directly
        // avoids wrapping it a second time.
        format!("{leaf}{leaf_params}")
    } else {
        leaf
    };
    segments.push(leaf_segment);
    segments.join("::")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_operator_overloads() {
        assert_eq!(normalize_segment_name("operator+"), "operator+");
        assert_eq!(normalize_segment_name("operator =="), "operator==");
        assert_eq!(normalize_segment_name("operator new[]"), "operator new[]");
    }

    #[test]
    fn strips_names_and_collapses_whitespace() {
        assert_eq!(normalize_param_list("int  x,\n  char y"), "(int, char)");
    }

    #[test]
    fn empty_and_void_normalize_to_empty_parens() {
        assert_eq!(normalize_param_list("()"), "()");
        assert_eq!(normalize_param_list("(void)"), "()");
    }

    #[test]
    fn rust_style_annotations_keep_only_the_type() {
        assert_eq!(normalize_param_list("(name: string)"), "(string)");
        assert_eq!(normalize_param_list("(count: i32 = 0)"), "(i32)");
    }

    #[test]
    fn implicit_receivers_carry_no_type() {
        assert_eq!(normalize_param_list("(self)"), "()");
        assert_eq!(normalize_param_list("(&self)"), "()");
        assert_eq!(normalize_param_list("(&mut self)"), "()");
    }

    #[test]
    fn untyped_bare_names_are_dropped() {
        assert_eq!(normalize_param_list("(name)"), "()");
    }

    #[test]
    fn pointer_reference_and_array_adjacency_is_preserved() {
        assert_eq!(normalize_param_list("(int* x, const Vec& y, char name[])"), "(int*, const Vec&, char[])");
    }

    #[test]
    fn unnamed_parameter_is_kept_as_a_bare_type() {
        assert_eq!(normalize_param_list("(int)"), "(int)");
    }

    #[test]
    fn compute_fqn_does_not_double_wrap_parens() {
        // Regression: `leaf_params` already carries (or produces) its own
        // parens; compute_fqn must not add a second pair around it.
        assert_eq!(format!("helper{}", normalize_param_list("()")), "helper()");
    }
}
