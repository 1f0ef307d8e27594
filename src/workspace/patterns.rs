// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Declared and resolved pattern shapes
//!
//! A task declares its files as a single glob, an ordered list of globs, or
//! a mapping from logical names to either. Resolution keeps that shape and
//! swaps every glob for the paths it matched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Glob pattern specification for a task's input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
    /// Single glob pattern
    Single(String),

    /// Ordered list of glob patterns
    List(Vec<String>),

    /// Logical names mapped to a glob or a list of globs
    Named(BTreeMap<String, Patterns>),
}

impl Patterns {
    /// Build a named mapping from `(name, patterns)` pairs
    pub fn named<K, P>(entries: impl IntoIterator<Item = (K, P)>) -> Self
    where
        K: Into<String>,
        P: Into<Patterns>,
    {
        Self::Named(
            entries
                .into_iter()
                .map(|(k, p)| (k.into(), p.into()))
                .collect(),
        )
    }

    /// Every glob in declaration order (mapping entries in key order)
    pub fn globs(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::List(v) => v.iter().map(String::as_str).collect(),
            Self::Named(map) => map.values().flat_map(Patterns::globs).collect(),
        }
    }

    /// Check the shape is well formed
    ///
    /// Returns a human readable reason when it is not.
    pub fn check(&self) -> Result<(), String> {
        self.check_at(0)
    }

    fn check_at(&self, depth: usize) -> Result<(), String> {
        match self {
            Self::Single(glob) => check_glob(glob),
            Self::List(globs) => {
                if globs.is_empty() {
                    return Err("pattern list is empty".into());
                }
                globs.iter().try_for_each(|g| check_glob(g))
            }
            Self::Named(map) => {
                if depth > 0 {
                    return Err("mappings cannot be nested inside a mapping".into());
                }
                if map.is_empty() {
                    return Err("pattern mapping is empty".into());
                }
                for (name, inner) in map {
                    if name.is_empty() {
                        return Err("pattern mapping has an empty name".into());
                    }
                    inner
                        .check_at(depth + 1)
                        .map_err(|reason| format!("'{}': {}", name, reason))?;
                }
                Ok(())
            }
        }
    }
}

fn check_glob(glob: &str) -> Result<(), String> {
    if glob.trim().is_empty() {
        return Err("glob pattern is empty".into());
    }
    glob::Pattern::new(glob)
        .map(|_| ())
        .map_err(|e| format!("invalid glob '{}': {}", glob, e))
}

impl From<&str> for Patterns {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for Patterns {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<Vec<String>> for Patterns {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl From<Vec<&str>> for Patterns {
    fn from(v: Vec<&str>) -> Self {
        Self::List(v.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Patterns {
    fn from(v: [&str; N]) -> Self {
        Self::List(v.into_iter().map(String::from).collect())
    }
}

impl fmt::Display for Patterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.globs().join(" "))
    }
}

/// Paths matched by one glob, in lexical order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matched(pub Vec<PathBuf>);

impl Matched {
    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn first(&self) -> Option<&PathBuf> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Matched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(|p| p.display().to_string()).collect();
        write!(f, "{}", joined.join(" "))
    }
}

/// Patterns after resolution against a workspace, same shape as declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resolved {
    Single(Matched),
    List(Vec<Matched>),
    Named(BTreeMap<String, Resolved>),
}

impl Resolved {
    /// Look up a named entry
    pub fn get(&self, name: &str) -> Option<&Resolved> {
        match self {
            Self::Named(map) => map.get(name),
            _ => None,
        }
    }

    /// Matches of the i-th glob of a list; index 0 of a single glob is itself
    pub fn at(&self, index: usize) -> Option<&Matched> {
        match self {
            Self::Single(m) if index == 0 => Some(m),
            Self::List(v) => v.get(index),
            _ => None,
        }
    }

    /// All matched paths, flattened in declaration order
    pub fn paths(&self) -> Vec<&PathBuf> {
        match self {
            Self::Single(m) => m.0.iter().collect(),
            Self::List(v) => v.iter().flat_map(|m| m.0.iter()).collect(),
            Self::Named(map) => map.values().flat_map(Resolved::paths).collect(),
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.paths().iter().map(|p| p.display().to_string()).collect();
        write!(f, "{}", joined.join(" "))
    }
}
