//! Symbol sidecar: per-definition locations, kept in lockstep with the
//! tracked file set

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SIDECAR_FILE: &str = "symbols.jsonl";

/// One definition row: name → file:line-range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRow {
    pub symbol: String,
    pub kind: String,
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
}

/// Extract definition rows from one file's content.
///
/// Pure and re-derivable from the content alone. Python-only for now;
/// unsupported extensions yield an empty list.
pub fn extract_symbols(path: &str, ext: &str, source: &str) -> Vec<SymbolRow> {
    match ext {
        ".py" => extract_python(path, source),
        _ => Vec::new(),
    }
}

fn extract_python(path: &str, source: &str) -> Vec<SymbolRow> {
    let mut parser = tree_sitter::Parser::new();
    if parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .is_err()
    {
        return Vec::new();
    }

    let tree = match parser.parse(source, None) {
        Some(t) => t,
        None => return Vec::new(),
    };

    let mut rows = Vec::new();
    collect_python_symbols(&tree.root_node(), source, path, &mut rows);
    rows
}

fn collect_python_symbols(
    node: &tree_sitter::Node,
    source: &str,
    path: &str,
    rows: &mut Vec<SymbolRow>,
) {
    let kind = match node.kind() {
        "function_definition" => Some("function"),
        "class_definition" => Some("class"),
        _ => None,
    };

    if let Some(kind) = kind {
        if let Some(name) = find_child_text(node, "identifier", source) {
            rows.push(SymbolRow {
                symbol: name,
                kind: kind.to_string(),
                path: path.to_string(),
                start_line: node.start_position().row + 1,
                end_line: node.end_position().row + 1,
                language: "python".to_string(),
            });
        }
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_python_symbols(&child, source, path, rows);
        }
    }
}

fn find_child_text(node: &tree_sitter::Node, kind: &str, source: &str) -> Option<String> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return Some(source[child.start_byte()..child.end_byte()].to_string());
            }
        }
    }
    None
}

/// Line-delimited persisted sidecar
pub struct SymbolSidecar {
    path: PathBuf,
}

impl SymbolSidecar {
    pub fn new(persist_dir: &Path) -> Self {
        Self {
            path: persist_dir.join(SIDECAR_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all rows. Missing file means no symbols; unparseable lines
    /// are skipped with a warning.
    pub fn load(&self) -> Vec<SymbolRow> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        let mut rows = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SymbolRow>(line) {
                Ok(row) => rows.push(row),
                Err(e) => warn!(error = %e, "skipping unparseable sidecar row"),
            }
        }
        rows
    }

    /// Replace the sidecar wholesale, one JSON document per line
    pub fn save(&self, rows: &[SymbolRow]) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = String::new();
        for row in rows {
            out.push_str(&serde_json::to_string(row)?);
            out.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, out)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
