//! Bracket reference resolution.
//!
//! Step text refers to context values as `[name]`, or to several at once as
//! `[first,second]` (values joined with a comma). Resolution rescans each
//! substituted value, so a value may itself contain references.
//!
//! Only bracket spans whose tokens look like keys are references. JSON arrays
//! such as `[1,2]`, `["a"]`, `[true]` or `[]` are left as literal text, which
//! lets payload documents pass through the resolver unharmed.
//!
//! Nested references resolve innermost first: in `[[kind],id]` the inner
//! `[kind]` is substituted, then the resulting `[value,id]` is resolved.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::context::ScenarioContext;

/// Innermost bracket spans: no brackets between the delimiters.
static BRACKET_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("bracket span pattern is valid"));

static KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_.\-$]*$").expect("key pattern is valid"));

/// Separator between keys of a multi-valued reference.
pub const KEY_SEPARATOR: char = ',';

/// Something noteworthy that happened while resolving. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The key was not in the context; the placeholder was substituted.
    ResolutionMiss { key: String },
    /// A key reappeared inside its own expansion; the reference was left as
    /// literal text.
    CyclicReference { key: String },
    /// Resolution stopped after the configured number of passes.
    PassLimit { passes: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ResolutionMiss { key } => write!(f, "value missing for [{}]", key),
            Diagnostic::CyclicReference { key } => write!(f, "cyclic reference [{}] left unresolved", key),
            Diagnostic::PassLimit { passes } => write!(f, "resolution stopped after {} passes", passes),
        }
    }
}

/// Resolved text plus everything the resolver had to flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub value: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    fn unchanged(raw: &str) -> Self {
        Self {
            value: raw.to_string(),
            diagnostics: Vec::new(),
        }
    }

    /// True when every reference was found.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Keys that were missing from the context.
    pub fn misses(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::ResolutionMiss { key } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

/// Resolver settings.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Substituted for keys missing from the context
    pub placeholder: String,
    /// Upper bound on substitution passes per call
    pub max_passes: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            placeholder: String::new(),
            max_passes: 64,
        }
    }
}

/// Resolves bracket references against a [`ScenarioContext`].
#[derive(Debug, Clone, Default)]
pub struct VariableResolver {
    config: ResolverConfig,
}

impl VariableResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve every reference in `raw`, splicing values in place.
    ///
    /// Each pass takes the leftmost innermost reference, resolves the values
    /// of its keys, replaces every occurrence of that exact expression, and
    /// rescans. A key that reappears inside its own expansion is a cycle and
    /// its reference is left as text. Text without references is returned
    /// unchanged.
    ///
    /// # Example
    /// ```
    /// use msgscenario::context::ScenarioContext;
    /// use msgscenario::resolve::VariableResolver;
    ///
    /// let mut ctx = ScenarioContext::empty();
    /// ctx.set("id", "7");
    /// ctx.set("status", "NEW");
    ///
    /// let resolver = VariableResolver::default();
    /// let resolved = resolver.resolve(&ctx, r#"{"id":"[id]","tags":[[id,status]]}"#);
    /// assert_eq!(resolved.value, r#"{"id":"7","tags":[7,NEW]}"#);
    /// ```
    pub fn resolve(&self, ctx: &ScenarioContext, raw: &str) -> Resolution {
        let mut walk = Walk::default();
        let value = self.expand(ctx, raw, &mut Vec::new(), &mut walk);
        if walk.stopped {
            tracing::warn!("Stopped resolving {:?} after {} passes", raw, walk.passes);
        }
        Resolution {
            value,
            diagnostics: walk.diagnostics,
        }
    }

    /// Resolve `text` while the keys in `chain` are being expanded.
    fn expand(&self, ctx: &ScenarioContext, text: &str, chain: &mut Vec<String>, walk: &mut Walk) -> String {
        let mut text = text.to_string();

        while let Some((expression, content)) = next_reference(&text, &walk.literal) {
            if walk.stopped {
                break;
            }
            if walk.passes == self.config.max_passes {
                walk.stopped = true;
                walk.diagnostics.push(Diagnostic::PassLimit { passes: walk.passes });
                break;
            }
            walk.passes += 1;

            let keys: Vec<&str> = content.split(KEY_SEPARATOR).map(str::trim).collect();
            if let Some(key) = keys.iter().find(|key| chain.iter().any(|k| k == *key)) {
                tracing::warn!("Cyclic reference {} left unresolved", expression);
                walk.diagnostics.push(Diagnostic::CyclicReference { key: key.to_string() });
                walk.literal.insert(expression);
                continue;
            }

            let mut values = Vec::with_capacity(keys.len());
            for key in keys {
                let value = match ctx.get(key) {
                    Some(stored) => {
                        chain.push(key.to_string());
                        let expanded = self.expand(ctx, stored, chain, walk);
                        chain.pop();
                        expanded
                    }
                    None => self.miss(key, &mut walk.diagnostics),
                };
                values.push(value);
            }
            text = text.replace(&expression, &values.join(&KEY_SEPARATOR.to_string()));
        }

        text
    }

    /// Return only the value of the first reference in `raw`.
    ///
    /// Text around the reference is discarded; multi-key references yield
    /// the comma-joined values. Without a reference `raw` is returned as is.
    ///
    /// # Example
    /// ```
    /// use msgscenario::context::ScenarioContext;
    /// use msgscenario::resolve::VariableResolver;
    ///
    /// let mut ctx = ScenarioContext::empty();
    /// ctx.set_all([("a", "1"), ("b", "2")]);
    ///
    /// let resolver = VariableResolver::default();
    /// assert_eq!(resolver.flatten(&ctx, "ids: [a,b]").value, "1,2");
    /// ```
    pub fn flatten(&self, ctx: &ScenarioContext, raw: &str) -> Resolution {
        match next_reference(raw, &HashSet::new()) {
            Some((_, content)) => {
                let mut diagnostics = Vec::new();
                let value = self.lookup(ctx, &content, &mut diagnostics);
                Resolution { value, diagnostics }
            }
            None => Resolution::unchanged(raw),
        }
    }

    /// Look up a reference body, joining multi-key values.
    fn lookup(&self, ctx: &ScenarioContext, content: &str, diagnostics: &mut Vec<Diagnostic>) -> String {
        content
            .split(KEY_SEPARATOR)
            .map(|token| self.lookup_one(ctx, token.trim(), diagnostics))
            .collect::<Vec<_>>()
            .join(&KEY_SEPARATOR.to_string())
    }

    fn lookup_one(&self, ctx: &ScenarioContext, key: &str, diagnostics: &mut Vec<Diagnostic>) -> String {
        match ctx.get(key) {
            Some(value) => value.to_string(),
            None => self.miss(key, diagnostics),
        }
    }

    fn miss(&self, key: &str, diagnostics: &mut Vec<Diagnostic>) -> String {
        tracing::warn!("Value missing for context reference [{}]", key);
        diagnostics.push(Diagnostic::ResolutionMiss { key: key.to_string() });
        self.config.placeholder.clone()
    }
}

/// State shared by every level of one [`VariableResolver::resolve`] call.
#[derive(Default)]
struct Walk {
    diagnostics: Vec<Diagnostic>,
    /// Cyclic expressions, skipped from then on
    literal: HashSet<String>,
    passes: usize,
    stopped: bool,
}

/// Find the leftmost innermost reference span not marked literal.
///
/// # Returns
/// `(expression, content)` such as `("[a,b]", "a,b")`
fn next_reference(text: &str, literal: &HashSet<String>) -> Option<(String, String)> {
    BRACKET_SPAN
        .captures_iter(text)
        .filter_map(|caps| {
            let expression = caps.get(0)?.as_str();
            let content = caps.get(1)?.as_str();
            if !is_reference(content) {
                if looks_like_name(content) {
                    tracing::debug!("Bracket span {} is not a reference and stays as text", expression);
                }
                return None;
            }
            (!literal.contains(expression)).then(|| (expression.to_string(), content.to_string()))
        })
        .next()
}

/// True if every comma-separated token of `content` is a key.
pub fn is_reference(content: &str) -> bool {
    !content.is_empty()
        && content.split(KEY_SEPARATOR).all(|token| {
            let token = token.trim();
            KEY.is_match(token) && !matches!(token, "true" | "false" | "null")
        })
}

/// Spans like `[order id]` or `[1st]` that were probably meant as keys, as
/// opposed to JSON array bodies such as `1,2` or `"a"`.
fn looks_like_name(content: &str) -> bool {
    !content.contains('"')
        && content.chars().any(char::is_alphabetic)
        && !content
            .split(KEY_SEPARATOR)
            .all(|token| matches!(token.trim(), "true" | "false" | "null"))
}
