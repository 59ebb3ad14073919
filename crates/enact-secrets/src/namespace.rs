/// Derives a tool's secret namespace from its name by stripping the
/// final path segment: `"acme/lint/format"` namespaces to
/// `"acme/lint"`; a single-segment name namespaces to `""` (global).
pub fn derive_namespace(tool_name: &str) -> String {
    match tool_name.rfind('/') {
        Some(idx) => tool_name[..idx].to_string(),
        None => String::new(),
    }
}

/// Builds the lookup chain `ns, parent(ns), …, ""`, most specific
/// first, always terminating at the empty (global) namespace.
pub fn namespace_chain(namespace: &str) -> Vec<String> {
    if namespace.is_empty() {
        return vec![String::new()];
    }
    let mut chain = vec![namespace.to_string()];
    let mut current = namespace;
    while let Some(idx) = current.rfind('/') {
        current = &current[..idx];
        chain.push(current.to_string());
    }
    if chain.last().map(String::as_str) != Some("") {
        chain.push(String::new());
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_namespace_by_stripping_final_segment() {
        assert_eq!(derive_namespace("acme/lint/format"), "acme/lint");
        assert_eq!(derive_namespace("acme/lint"), "acme");
        assert_eq!(derive_namespace("format"), "");
    }

    #[test]
    fn chain_walks_up_to_global() {
        assert_eq!(
            namespace_chain("acme/lint"),
            vec!["acme/lint".to_string(), "acme".to_string(), String::new()]
        );
        assert_eq!(namespace_chain("acme"), vec!["acme".to_string(), String::new()]);
        assert_eq!(namespace_chain(""), vec![String::new()]);
    }
}
