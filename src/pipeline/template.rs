// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Command templates for pipeline files
//!
//! A template is a shell command with placeholders filled from the task's
//! execution context:
//!
//! - `{input}`, `{input[0]}`, `{input.reads}`, `{input.reads[1]}`
//! - `{output}` and friends, rendered from the declared patterns
//! - `{params.key}`, `{dir}`, `{name}`
//!
//! Resolved input paths and `{dir}` are shell-quoted when they contain
//! anything beyond plain path characters. `{output}` renders the declared
//! globs as written and `{params.*}` values are inserted verbatim.
//!
//! Anything else in braces (`${HOME}`, awk programs) is left untouched.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::task::{Context, TaskDescriptor};
use crate::workspace::{Patterns, Resolved};

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{(input|output|params|dir|name)(?:\.([A-Za-z0-9_-]+))?(?:\[(\d+)\])?\}")
            .expect("placeholder regex is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Root {
    Input,
    Output,
    Params,
    Dir,
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    root: Root,
    key: Option<String>,
    index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Parsed command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    /// Parse a template and check its placeholders against a descriptor
    pub fn parse(source: &str, descriptor: &TaskDescriptor) -> Result<Self, String> {
        if source.trim().is_empty() {
            return Err("command is empty".into());
        }

        let mut segments = Vec::new();
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(source[last..whole.start()].to_string()));
            }

            let root = match &caps[1] {
                "input" => Root::Input,
                "output" => Root::Output,
                "params" => Root::Params,
                "dir" => Root::Dir,
                _ => Root::Name,
            };
            let key = caps.get(2).map(|m| m.as_str().to_string());
            let index = match caps.get(3) {
                Some(m) => Some(
                    m.as_str()
                        .parse::<usize>()
                        .map_err(|e| format!("bad index in '{}': {}", whole.as_str(), e))?,
                ),
                None => None,
            };

            let placeholder = Placeholder { root, key, index };
            check_placeholder(&placeholder, whole.as_str(), descriptor)?;
            segments.push(Segment::Placeholder(placeholder));
            last = whole.end();
        }

        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fill the placeholders from a context
    pub fn render(&self, ctx: &Context) -> Result<String, String> {
        let mut out = String::with_capacity(self.source.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Placeholder(p) => out.push_str(&render_placeholder(p, ctx)?),
            }
        }

        Ok(out)
    }
}

fn check_placeholder(p: &Placeholder, text: &str, descriptor: &TaskDescriptor) -> Result<(), String> {
    match p.root {
        Root::Dir | Root::Name => {
            if p.key.is_some() || p.index.is_some() {
                return Err(format!("'{}' takes no key or index", text));
            }
            Ok(())
        }
        Root::Params => match p.key {
            None => Err(format!("'{}' needs a parameter name", text)),
            Some(ref key) if !descriptor.params.contains_key(key) => {
                Err(format!("'{}' refers to undefined parameter '{}'", text, key))
            }
            Some(_) if p.index.is_some() => Err(format!("'{}': parameters cannot be indexed", text)),
            Some(_) => Ok(()),
        },
        Root::Input | Root::Output => {
            let side = if p.root == Root::Input { "input" } else { "output" };
            let declared = if p.root == Root::Input {
                descriptor.input.as_ref()
            } else {
                descriptor.output.as_ref()
            };
            let Some(declared) = declared else {
                return Err(format!("'{}' used but the task declares no {}", text, side));
            };
            select_patterns(declared, p.key.as_deref(), p.index)
                .map(|_| ())
                .ok_or_else(|| format!("'{}' does not match the declared {} shape", text, side))
        }
    }
}

fn select_patterns<'a>(patterns: &'a Patterns, key: Option<&str>, index: Option<usize>) -> Option<Patterns> {
    let keyed: &'a Patterns = match (patterns, key) {
        (Patterns::Named(map), Some(k)) => map.get(k)?,
        (_, Some(_)) => return None,
        (p, None) => p,
    };

    match (keyed, index) {
        (p, None) => Some(p.clone()),
        (Patterns::Single(s), Some(0)) => Some(Patterns::Single(s.clone())),
        (Patterns::List(v), Some(i)) => v.get(i).cloned().map(Patterns::Single),
        _ => None,
    }
}

fn render_placeholder(p: &Placeholder, ctx: &Context) -> Result<String, String> {
    match p.root {
        Root::Dir => Ok(quote_path(&ctx.dir)),
        Root::Name => Ok(ctx.name.clone()),
        Root::Params => {
            let key = p.key.as_deref().unwrap_or_default();
            ctx.param_str(key)
                .ok_or_else(|| format!("parameter '{}' is not set", key))
        }
        Root::Input => {
            let input = ctx
                .input
                .as_ref()
                .ok_or_else(|| "task has no resolved input".to_string())?;
            select_resolved(input, p.key.as_deref(), p.index)
                .ok_or_else(|| "input placeholder does not match the resolved shape".to_string())
        }
        Root::Output => {
            let output = ctx
                .output
                .as_ref()
                .ok_or_else(|| "task declares no output".to_string())?;
            select_patterns(output, p.key.as_deref(), p.index)
                .map(|p| p.to_string())
                .ok_or_else(|| "output placeholder does not match the declared shape".to_string())
        }
    }
}

fn select_resolved(resolved: &Resolved, key: Option<&str>, index: Option<usize>) -> Option<String> {
    let keyed = match key {
        Some(k) => resolved.get(k)?,
        None => resolved,
    };

    match index {
        Some(i) => keyed.at(i).map(|m| quote_paths(m.paths().iter())),
        None => Some(quote_paths(keyed.paths())),
    }
}

fn quote_paths<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> String {
    paths
        .into_iter()
        .map(|p| quote_path(p))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Single-quote a path for `sh` unless it only holds plain path characters
fn quote_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '%' | ':' | '+' | ','))
    {
        return s.into_owned();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Matched;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn bowtie_descriptor() -> TaskDescriptor {
        TaskDescriptor::new("Mapping with bowtie2")
            .input(Patterns::named([
                ("reads", Patterns::from(["*_1.fastq.gz", "*_2.fastq.gz"])),
                ("reference", Patterns::from("*_genomic.fna.gz")),
            ]))
            .output("*.sam")
            .param("output", "bowtie2_output.sam")
            .param("threads", 4)
    }

    fn bowtie_context() -> Context {
        let reads = Resolved::List(vec![
            Matched(vec![PathBuf::from("/ws/ERR_1.fastq.gz")]),
            Matched(vec![PathBuf::from("/ws/ERR_2.fastq.gz")]),
        ]);
        let reference = Resolved::Single(Matched(vec![PathBuf::from("/ws/ref_genomic.fna.gz")]));
        let descriptor = bowtie_descriptor();

        Context {
            name: descriptor.name.clone(),
            input: Some(Resolved::Named(BTreeMap::from([
                ("reads".to_string(), reads),
                ("reference".to_string(), reference),
            ]))),
            output: descriptor.output.clone(),
            params: descriptor.params.clone(),
            dir: PathBuf::from("/ws"),
        }
    }

    #[test]
    fn test_render_named_input() {
        let template = CommandTemplate::parse(
            "bowtie2 -p {params.threads} -x bowtie_index -1 {input.reads[0]} -2 {input.reads[1]} -S {params.output}",
            &bowtie_descriptor(),
        )
        .unwrap();

        let rendered = template.render(&bowtie_context()).unwrap();
        assert_eq!(
            rendered,
            "bowtie2 -p 4 -x bowtie_index -1 /ws/ERR_1.fastq.gz -2 /ws/ERR_2.fastq.gz -S bowtie2_output.sam"
        );
    }

    #[test]
    fn test_render_whole_input_dir_and_output() {
        let template =
            CommandTemplate::parse("cd {dir} && ls {input.reads} > {output}", &bowtie_descriptor()).unwrap();

        let rendered = template.render(&bowtie_context()).unwrap();
        assert_eq!(rendered, "cd /ws && ls /ws/ERR_1.fastq.gz /ws/ERR_2.fastq.gz > *.sam");
    }

    #[test]
    fn test_shell_braces_left_alone() {
        let descriptor = TaskDescriptor::new("awk").param("col", json!(2));
        let template = CommandTemplate::parse("awk '{print $1}' ${HOME}/x | cut -f{params.col}", &descriptor).unwrap();

        let ctx = Context {
            name: "awk".into(),
            input: None,
            output: None,
            params: descriptor.params.clone(),
            dir: PathBuf::from("/ws"),
        };
        assert_eq!(template.render(&ctx).unwrap(), "awk '{print $1}' ${HOME}/x | cut -f2");
    }

    #[test]
    fn test_parse_rejects_undefined_references() {
        let descriptor = bowtie_descriptor();

        assert!(CommandTemplate::parse("echo {params.missing}", &descriptor).is_err());
        assert!(CommandTemplate::parse("echo {params}", &descriptor).is_err());
        assert!(CommandTemplate::parse("echo {input.adapters}", &descriptor).is_err());
        assert!(CommandTemplate::parse("echo {input.reads[2]}", &descriptor).is_err());
        assert!(CommandTemplate::parse("echo {dir.x}", &descriptor).is_err());
        assert!(CommandTemplate::parse("   ", &descriptor).is_err());

        let root = TaskDescriptor::new("download");
        let err = CommandTemplate::parse("cat {input}", &root).unwrap_err();
        assert!(err.contains("declares no input"));
    }

    #[test]
    fn test_paths_with_spaces_are_quoted() {
        let descriptor = TaskDescriptor::new("count").input("*.fa");
        let template = CommandTemplate::parse("wc -c {input} && ls {dir}", &descriptor).unwrap();

        let ctx = Context {
            name: "count".into(),
            input: Some(Resolved::Single(Matched(vec![
                PathBuf::from("/my data/ref.fa"),
                PathBuf::from("/my data/it's.fa"),
            ]))),
            output: None,
            params: descriptor.params.clone(),
            dir: PathBuf::from("/my data"),
        };

        assert_eq!(
            template.render(&ctx).unwrap(),
            r"wc -c '/my data/ref.fa' '/my data/it'\''s.fa' && ls '/my data'"
        );
    }
}
