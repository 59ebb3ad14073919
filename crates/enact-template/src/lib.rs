//! Parses command templates containing `${param}` / `{{param}}`
//! placeholders, substitutes values from a parameter map with shell-safe
//! escaping, and emits either an `argv` vector or a `["sh", "-c", ...]`
//! shell-invocation vector depending on whether the interpolated string
//! needs a shell to interpret it.

mod errors;
mod params;
mod quoting;

pub use errors::{TemplateError, TemplateResult};
pub use params::Param;

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// The two placeholder syntaxes recognized in a command template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStyle {
    /// `${name}`
    Dollar,
    /// `{{name}}`
    DoubleBrace,
    /// Recognize both styles in the same template.
    Both,
}

/// What to do when a template references a parameter that was not
/// supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingParamPolicy {
    /// Fail with [`TemplateError::MissingParam`] (the default).
    #[default]
    Error,
    /// Leave the placeholder text untouched in the rendered output.
    LeaveIntact,
}

/// The rendered form of a command, ready to be handed to a process
/// spawner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// No shell metacharacters were present after substitution: this is
    /// a plain argv vector.
    Argv(Vec<String>),
    /// Shell metacharacters were present: wrap the interpolated string
    /// in `sh -c`.
    Shell(Vec<String>),
}

impl Command {
    pub fn argv(&self) -> &[String] {
        match self {
            Command::Argv(v) => v,
            Command::Shell(v) => v,
        }
    }
}

fn dollar_pattern() -> &'static Regex {
    static P: OnceLock<Regex> = OnceLock::new();
    P.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.\[\]]*)\}").unwrap())
}

fn brace_pattern() -> &'static Regex {
    static P: OnceLock<Regex> = OnceLock::new();
    P.get_or_init(|| Regex::new(r"\{\{([A-Za-z_][A-Za-z0-9_.\[\]]*)\}\}").unwrap())
}

fn token_names(template: &str, style: TokenStyle) -> Vec<String> {
    let mut names = Vec::new();
    if matches!(style, TokenStyle::Dollar | TokenStyle::Both) {
        for cap in dollar_pattern().captures_iter(template) {
            names.push(cap[1].to_string());
        }
    }
    if matches!(style, TokenStyle::DoubleBrace | TokenStyle::Both) {
        for cap in brace_pattern().captures_iter(template) {
            names.push(cap[1].to_string());
        }
    }
    names
}

/// Returns the set of parameter names referenced by `template` that are
/// absent from `provided`. Useful for pre-flight checks before
/// rendering.
pub fn missing_params(
    template: &str,
    provided: &BTreeMap<String, Param>,
    style: TokenStyle,
) -> Vec<String> {
    let mut missing: Vec<String> = token_names(template, style)
        .into_iter()
        .filter(|name| !provided.contains_key(name))
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

/// Substitutes every recognized placeholder in `template` with its
/// shell-escaped value from `params`, then splits the result into an
/// argv vector or wraps it for shell interpretation, depending on
/// whether the rendered string contains shell metacharacters.
pub fn render(
    template: &str,
    params: &BTreeMap<String, Param>,
    style: TokenStyle,
    on_missing: MissingParamPolicy,
) -> TemplateResult<Command> {
    let interpolated = interpolate(template, params, style, on_missing)?;
    if quoting::contains_shell_metacharacters(&interpolated) {
        Ok(Command::Shell(vec![
            "sh".to_string(),
            "-c".to_string(),
            interpolated,
        ]))
    } else {
        Ok(Command::Argv(quoting::split_argv(&interpolated)?))
    }
}

fn interpolate(
    template: &str,
    params: &BTreeMap<String, Param>,
    style: TokenStyle,
    on_missing: MissingParamPolicy,
) -> TemplateResult<String> {
    let mut result = template.to_string();
    if matches!(style, TokenStyle::Dollar | TokenStyle::Both) {
        result = replace_with(&result, dollar_pattern(), params, on_missing)?;
    }
    if matches!(style, TokenStyle::DoubleBrace | TokenStyle::Both) {
        result = replace_with(&result, brace_pattern(), params, on_missing)?;
    }
    Ok(result)
}

fn replace_with(
    input: &str,
    pattern: &Regex,
    params: &BTreeMap<String, Param>,
    on_missing: MissingParamPolicy,
) -> TemplateResult<String> {
    let mut err: Option<TemplateError> = None;
    let replaced = pattern.replace_all(input, |caps: &regex::Captures| {
        let name = &caps[1];
        match params.get(name) {
            Some(value) => quoting::shell_safe(value),
            None => match on_missing {
                MissingParamPolicy::Error => {
                    err.get_or_insert_with(|| TemplateError::MissingParam(name.to_string()));
                    String::new()
                }
                MissingParamPolicy::LeaveIntact => caps[0].to_string(),
            },
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(replaced.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(pairs: &[(&str, Param)]) -> BTreeMap<String, Param> {
        pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn renders_plain_argv_when_safe() {
        let p = params(&[("name", Param::String("world".into()))]);
        let cmd = render("echo hello ${name}", &p, TokenStyle::Dollar, MissingParamPolicy::Error)
            .unwrap();
        assert_eq!(
            cmd,
            Command::Argv(vec!["echo".into(), "hello".into(), "world".into()])
        );
    }

    #[test]
    fn renders_shell_form_when_metacharacters_present() {
        let p = params(&[("name", Param::String("world; rm -rf /".into()))]);
        let cmd = render("echo ${name}", &p, TokenStyle::Dollar, MissingParamPolicy::Error).unwrap();
        match cmd {
            Command::Shell(argv) => {
                assert_eq!(argv[0], "sh");
                assert_eq!(argv[1], "-c");
                assert!(argv[2].contains("'world; rm -rf /'"));
            }
            _ => panic!("expected shell form"),
        }
    }

    #[test]
    fn double_brace_style_is_recognized() {
        let p = params(&[("name", Param::String("world".into()))]);
        let cmd = render(
            "echo {{name}}",
            &p,
            TokenStyle::DoubleBrace,
            MissingParamPolicy::Error,
        )
        .unwrap();
        assert_eq!(cmd, Command::Argv(vec!["echo".into(), "world".into()]));
    }

    #[test]
    fn missing_param_errors_by_default() {
        let p = BTreeMap::new();
        let err = render("echo ${name}", &p, TokenStyle::Dollar, MissingParamPolicy::Error);
        assert!(matches!(err, Err(TemplateError::MissingParam(n)) if n == "name"));
    }

    #[test]
    fn missing_param_can_be_left_intact() {
        let p = BTreeMap::new();
        let cmd = render(
            "echo ${name}",
            &p,
            TokenStyle::Dollar,
            MissingParamPolicy::LeaveIntact,
        )
        .unwrap();
        assert_eq!(cmd, Command::Argv(vec!["echo".into(), "${name}".into()]));
    }

    #[rstest]
    #[case(Param::Number(3.5), "3.5")]
    #[case(Param::Integer(42), "42")]
    #[case(Param::Bool(true), "true")]
    #[case(Param::Null, "''")]
    fn scalar_values_convert_canonically(#[case] value: Param, #[case] expected_fragment: &str) {
        let p = params(&[("x", value)]);
        let cmd = render("echo ${x}", &p, TokenStyle::Dollar, MissingParamPolicy::Error).unwrap();
        match cmd {
            Command::Argv(argv) => assert_eq!(argv[1], expected_fragment),
            Command::Shell(argv) => assert!(argv[2].contains(expected_fragment)),
        }
    }

    #[test]
    fn composite_values_are_json_serialized() {
        let p = params(&[(
            "items",
            Param::Array(vec![Param::Integer(1), Param::Integer(2)]),
        )]);
        let cmd = render("run ${items}", &p, TokenStyle::Dollar, MissingParamPolicy::Error).unwrap();
        match cmd {
            Command::Shell(argv) => assert!(argv[2].contains("[1,2]")),
            other => panic!("expected shell form due to brackets, got {other:?}"),
        }
    }

    #[test]
    fn missing_params_lists_unsupplied_names() {
        let p = params(&[("a", Param::String("x".into()))]);
        let missing = missing_params("echo ${a} ${b} {{c}}", &p, TokenStyle::Both);
        assert_eq!(missing, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn argv_splitting_respects_quotes_injected_by_escaping() {
        // `msg` contains a space, so `shell_safe` wraps it in single
        // quotes; the surrounding "prefix:" text has no whitespace, so
        // the whole thing remains one argv token once de-quoted.
        let p = params(&[("msg", Param::String("hello world".into()))]);
        let cmd = render(
            "echo prefix:${msg}",
            &p,
            TokenStyle::Dollar,
            MissingParamPolicy::Error,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::Argv(vec!["echo".into(), "prefix:hello world".into()])
        );
    }
}
