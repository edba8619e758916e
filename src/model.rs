use std::collections::BTreeSet;

use serde::Serialize;

use crate::lang::ModuleSystem;

/// One classified fragment of a resolved expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValueComponent {
    Literal {
        value: String,
    },
    Env {
        #[serde(rename = "envVar", skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Variable {
        #[serde(rename = "varName")]
        name: String,
        /// Set when the binding resolved to a single literal.
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Unknown,
}

/// Symbolic description of an expression's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedValue {
    pub components: Vec<ValueComponent>,
    pub approximate_text: String,
    pub referenced_env_vars: BTreeSet<String>,
    pub is_fully_static: bool,
}

impl ResolvedValue {
    pub fn literal(value: &str) -> Self {
        Self {
            components: vec![ValueComponent::Literal {
                value: value.to_string(),
            }],
            approximate_text: value.to_string(),
            referenced_env_vars: BTreeSet::new(),
            is_fully_static: true,
        }
    }

    /// An unresolvable value; `marker` is the placeholder used in the text.
    pub fn unknown(marker: &str) -> Self {
        Self {
            components: vec![ValueComponent::Unknown],
            approximate_text: marker.to_string(),
            referenced_env_vars: BTreeSet::new(),
            is_fully_static: false,
        }
    }

    pub fn unbound(name: &str) -> Self {
        Self {
            components: vec![ValueComponent::Variable {
                name: name.to_string(),
                value: None,
            }],
            approximate_text: format!("${{{name}}}"),
            referenced_env_vars: BTreeSet::new(),
            is_fully_static: false,
        }
    }

    pub fn env(name: Option<&str>) -> Self {
        let approximate_text = match name {
            Some(n) => format!("${{process.env.{n}}}"),
            None => "${process.env.<dynamic>}".to_string(),
        };
        Self {
            components: vec![ValueComponent::Env {
                name: name.map(String::from),
            }],
            approximate_text,
            referenced_env_vars: name.map(String::from).into_iter().collect(),
            is_fully_static: false,
        }
    }

    /// Start of an accumulation; callers must append at least one part.
    pub(crate) fn empty() -> Self {
        Self {
            components: Vec::new(),
            approximate_text: String::new(),
            referenced_env_vars: BTreeSet::new(),
            is_fully_static: true,
        }
    }

    /// Append `other` after `self`, preserving source order.
    pub fn append(&mut self, other: ResolvedValue) {
        self.components.extend(other.components);
        self.approximate_text.push_str(&other.approximate_text);
        self.referenced_env_vars.extend(other.referenced_env_vars);
        self.is_fully_static &= other.is_fully_static;
    }

    pub(crate) fn push_literal(&mut self, value: &str) {
        self.append(Self::literal(value));
    }
}

/// An outbound HTTP request found in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpCallSite {
    pub url: ResolvedValue,
    pub method: String,
    pub location: String,
}

/// A package the function depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Dependency {
    pub fn declared(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: Some(version.to_string()),
        }
    }

    pub fn loaded(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: None,
        }
    }
}

/// AWS SDK major version a usage was recognized through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkVersion {
    V2,
    V3,
}

/// One AWS service client seen in a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsUsage {
    pub service: String,
    pub sdk_version: SdkVersion,
    pub operations: BTreeSet<String>,
}

/// Aggregated AWS service usage across the function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsServiceUsage {
    pub service: String,
    pub operations: Vec<String>,
    pub sdk_version: SdkVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// How the function's entry point is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerConfig {
    pub file: String,
    pub export: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: Confidence,
    pub source: String,
}

/// An exported symbol that could serve as the entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerCandidate {
    pub export: String,
    pub source: &'static str,
    pub line: usize,
}

/// A test file shipped with the function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredTest {
    pub name: String,
    pub fixture: String,
}

/// Everything recovered from one source file.
#[derive(Debug)]
pub struct FileAnalysis {
    pub display_path: String,
    pub module: ModuleSystem,
    pub env_vars: BTreeSet<String>,
    /// Number of `process.env[expr]` reads with a computed key.
    pub dynamic_env_reads: usize,
    pub http_calls: Vec<HttpCallSite>,
    pub dependencies: Vec<Dependency>,
    pub aws: Vec<AwsUsage>,
    pub handlers: Vec<HandlerCandidate>,
    pub warnings: Vec<String>,
}

impl FileAnalysis {
    pub fn new(display_path: &str, module: ModuleSystem) -> Self {
        Self {
            display_path: display_path.to_string(),
            module,
            env_vars: BTreeSet::new(),
            dynamic_env_reads: 0,
            http_calls: Vec::new(),
            dependencies: Vec::new(),
            aws: Vec::new(),
            handlers: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// The document emitted to the host process. Field order is part of the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerResult {
    pub environment: Vec<String>,
    pub aws_services: Vec<AwsServiceUsage>,
    pub tests: Vec<DiscoveredTest>,
    pub handler: Option<HandlerConfig>,
    pub warnings: Vec<String>,
    pub dependencies: Vec<Dependency>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub http_calls: Vec<HttpCallSite>,
}
