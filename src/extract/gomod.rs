use std::collections::HashMap;

use super::SourceTree;
use crate::error::{Error, Result};
use crate::types::Dependency;

pub const MANIFEST: &str = "go.mod";

#[derive(Clone, Copy, PartialEq)]
enum Block {
    None,
    Require,
    Replace,
    Other,
}

/// Reads `require` directives from `go.mod`; a `replace` of a required
/// module becomes its source.
pub fn read(tree: &dyn SourceTree) -> Result<Option<Vec<Dependency>>> {
    let Some(raw) = tree.read(MANIFEST)? else {
        return Ok(None);
    };
    parse(&raw).map(Some)
}

fn parse(raw: &str) -> Result<Vec<Dependency>> {
    let mut deps = Vec::new();
    let mut replacements = HashMap::new();
    let mut block = Block::None;

    for (n, line) in raw.lines().enumerate() {
        let line = match line.find("//") {
            Some(i) => &line[..i],
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        if block != Block::None {
            if line == ")" {
                block = Block::None;
                continue;
            }
            match block {
                Block::Require => deps.push(require(line, n)?),
                Block::Replace => {
                    let (from, to) = replace(line, n)?;
                    replacements.insert(from, to);
                }
                _ => {}
            }
            continue;
        }

        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let kind = match verb {
            "require" => Block::Require,
            "replace" => Block::Replace,
            _ => Block::Other,
        };
        if rest == "(" {
            block = kind;
            continue;
        }
        match kind {
            Block::Require => deps.push(require(rest, n)?),
            Block::Replace => {
                let (from, to) = replace(rest, n)?;
                replacements.insert(from, to);
            }
            _ => {}
        }
    }

    for dep in &mut deps {
        if let Some(to) = replacements.remove(&dep.name) {
            dep.source = Some(to);
        }
    }
    Ok(deps)
}

fn malformed(n: usize, line: &str) -> Error {
    Error::Extract(format!("{MANIFEST}:{}: malformed directive {line:?}", n + 1))
}

fn require(directive: &str, n: usize) -> Result<Dependency> {
    let mut fields = directive.split_whitespace();
    match (fields.next(), fields.next()) {
        (Some(path), Some(version)) => Ok(Dependency::new(unquote(path), version)),
        _ => Err(malformed(n, directive)),
    }
}

fn replace(directive: &str, n: usize) -> Result<(String, String)> {
    let (from, to) = directive.split_once("=>").ok_or_else(|| malformed(n, directive))?;
    let from = from.split_whitespace().next().ok_or_else(|| malformed(n, directive))?;
    let to = to.split_whitespace().next().ok_or_else(|| malformed(n, directive))?;
    Ok((unquote(from).to_string(), unquote(to).to_string()))
}

fn unquote(s: &str) -> &str {
    s.trim_matches('"')
}
