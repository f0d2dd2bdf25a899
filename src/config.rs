use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Resolver configuration: which filename addresses a folder item, and which
/// updated dependencies stay significant enough to publish together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRulesConfig {
    #[serde(default = "default_index_file")]
    pub index_file: String,
    /// Ordered regular expressions; evaluated first-match-wins against a full
    /// dependency path.
    #[serde(default)]
    pub content_specific_dependencies: Vec<String>,
}

fn default_index_file() -> String {
    "index.xml".to_string()
}

impl Default for DependencyRulesConfig {
    fn default() -> Self {
        Self {
            index_file: default_index_file(),
            content_specific_dependencies: Vec::new(),
        }
    }
}

impl DependencyRulesConfig {
    pub fn trace_loaded(&self) {
        info!(
            index_file = %self.index_file,
            patterns_count = self.content_specific_dependencies.len(),
            "Loaded DependencyRulesConfig"
        );
        debug!(?self, "DependencyRulesConfig loaded (full debug)");
    }

    /// Compile the configured patterns once, at configuration-load time.
    pub fn compile_rules(&self) -> Result<PatternRuleSet, RuleCompileError> {
        PatternRuleSet::compile(&self.content_specific_dependencies)
    }
}

/// Ordered, pre-compiled dependency patterns. A path matches when any pattern
/// matches it in full; evaluation stops at the first match.
#[derive(Debug, Clone)]
pub struct PatternRuleSet {
    rules: Vec<Regex>,
}

impl PatternRuleSet {
    /// A rule set that matches nothing.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, RuleCompileError> {
        let mut rules = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            // Anchored so a rule matches the whole path, not a substring.
            let anchored = format!("^(?:{pattern})$");
            match Regex::new(&anchored) {
                Ok(rule) => rules.push(rule),
                Err(source) => {
                    return Err(RuleCompileError {
                        pattern: pattern.to_string(),
                        source,
                    })
                }
            }
        }
        Ok(Self { rules })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.is_match(path))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// A configured dependency pattern failed to compile. Surfaced when the
/// configuration is loaded, never during resolution.
#[derive(Debug)]
pub struct RuleCompileError {
    pub pattern: String,
    pub source: regex::Error,
}

impl fmt::Display for RuleCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid dependency pattern '{}': {}",
            self.pattern, self.source
        )
    }
}

impl std::error::Error for RuleCompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
