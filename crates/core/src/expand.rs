// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${...}` substitution for build directories, environments and cache values

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

/// `$$` escape, `${env:NAME}` or `${name}`
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{(env:)?([A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("constant regex pattern is valid")
});

/// Values available to [`expand`].
#[derive(Debug, Clone, Default)]
pub struct ExpansionContext {
    /// Base environment consulted by `${env:NAME}`
    pub env: HashMap<String, String>,
    /// Named variables such as `buildType` or `sourceDirectory`
    pub vars: HashMap<String, String>,
}

impl ExpansionContext {
    pub fn new(env: HashMap<String, String>) -> Self {
        Self { env, vars: HashMap::new() }
    }

    /// Context over the current process environment.
    pub fn from_process_env() -> Self {
        Self::new(std::env::vars().collect())
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

/// Substitute placeholders in `template`.
///
/// - `$$` yields a literal `$`, and the text after it is not expanded
/// - `${env:NAME}` yields the environment value, or nothing when unset
/// - `${name}` yields the named variable; unknown names are left as-is
pub fn expand(template: &str, ctx: &ExpansionContext) -> String {
    VAR_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            let Some(name) = caps.get(2) else {
                return "$".to_string();
            };
            if caps.get(1).is_some() {
                return ctx.env.get(name.as_str()).cloned().unwrap_or_default();
            }
            match ctx.vars.get(name.as_str()) {
                Some(val) => val.clone(),
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

/// Expand `overrides` against the base environment and merge them over it.
///
/// Every override sees the base environment only, never another override.
pub fn expand_environment(
    overrides: &IndexMap<String, String>,
    ctx: &ExpansionContext,
) -> HashMap<String, String> {
    let mut env = ctx.env.clone();
    for (key, value) in overrides {
        env.insert(key.clone(), expand(value, ctx));
    }
    env
}

#[cfg(test)]
#[path = "expand_tests.rs"]
mod tests;
