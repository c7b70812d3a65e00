// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability kinds
//!
//! A [`Kind`] is an opaque token describing what a provisioned resource can
//! run (an instance class, an image, ...). Workers declare a [`KindExpr`]
//! which is rendered against the requesting build's properties at
//! substantiation time. `None` means "no preference".

use minijinja::{Environment, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Capability token of a provisioned resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(String);

impl Kind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Kind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Properties of the build requesting a worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    pub properties: HashMap<String, String>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Errors rendering a kind template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KindError {
    #[error("kind template {template:?} failed to render: {message}")]
    Render { template: String, message: String },
}

/// How a worker's kind is derived for a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KindExpr {
    /// No preference; any started resource is reused
    #[default]
    Any,
    /// A fixed kind regardless of the build
    Static(Kind),
    /// A minijinja template over the build properties
    Template(String),
}

impl KindExpr {
    /// Parse a configured kind string. Strings containing template markers
    /// become templates, everything else is a static kind.
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            KindExpr::Any
        } else if trimmed.contains("{{") || trimmed.contains("{%") {
            KindExpr::Template(trimmed.to_string())
        } else {
            KindExpr::Static(Kind::new(trimmed))
        }
    }

    /// Render the expression for a build.
    ///
    /// Undefined properties are an error rather than an empty string, so a
    /// typo in the template cannot silently collapse to "no preference".
    pub fn render(&self, build: &BuildContext) -> Result<Option<Kind>, KindError> {
        match self {
            KindExpr::Any => Ok(None),
            KindExpr::Static(kind) => Ok(Some(kind.clone())),
            KindExpr::Template(template) => {
                let mut env = Environment::new();
                env.set_undefined_behavior(UndefinedBehavior::Strict);
                let rendered =
                    env.render_str(template, &build.properties)
                        .map_err(|e| KindError::Render {
                            template: template.clone(),
                            message: e.to_string(),
                        })?;
                let rendered = rendered.trim();
                if rendered.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Kind::new(rendered)))
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "kind_tests.rs"]
mod tests;
