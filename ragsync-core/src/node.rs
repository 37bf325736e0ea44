//! Derived nodes and the splitter that produces them

use crate::corpus::SourceItem;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One derived chunk: the atomic unit tracked and stored in the index.
///
/// A fixed structured record, stamped at construction — node metadata is
/// never reconstructed by inspecting loosely-typed maps later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Canonical path of the source item this node was derived from
    pub path: String,
    pub ext: String,
    pub text: String,
    /// 1-indexed line range within the source item
    pub start_line: usize,
    pub end_line: usize,
}

/// Deterministic node id: hash prefix over path, chunk index and chunk
/// text. Content changes yield fresh ids; ids partition by source file.
fn node_id(path: &str, index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update([b':']);
    hasher.update(index.to_le_bytes());
    hasher.update([b':']);
    hasher.update(text.as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..12])
}

/// Turns one source item into zero or more nodes
pub trait Splitter {
    fn split(&self, item: &SourceItem) -> crate::Result<Vec<Node>>;
}

/// Line-window splitter: `chunk_lines` per node, overlapping by
/// `chunk_overlap`
pub struct LineSplitter {
    chunk_lines: usize,
    chunk_overlap: usize,
}

impl LineSplitter {
    pub fn new(chunk_lines: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_lines: chunk_lines.max(1),
            chunk_overlap,
        }
    }
}

impl Splitter for LineSplitter {
    fn split(&self, item: &SourceItem) -> crate::Result<Vec<Node>> {
        let lines: Vec<&str> = item.text.lines().collect();
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let step = self.chunk_lines.saturating_sub(self.chunk_overlap).max(1);
        let mut nodes = Vec::new();
        let mut index = 0;

        let mut i = 0;
        while i < lines.len() {
            let end = (i + self.chunk_lines).min(lines.len());
            let text = lines[i..end].join("\n");

            nodes.push(Node {
                id: node_id(&item.path, index, &text),
                path: item.path.clone(),
                ext: item.ext.clone(),
                text,
                start_line: i + 1,
                end_line: end,
            });

            index += 1;
            if end == lines.len() {
                break;
            }
            i += step;
        }

        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str, text: &str) -> SourceItem {
        SourceItem {
            path: path.to_string(),
            text: text.to_string(),
            ext: ".py".to_string(),
        }
    }

    fn numbered_lines(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn test_empty_item_yields_no_nodes() {
        let splitter = LineSplitter::new(80, 20);
        assert!(splitter.split(&item("a.py", "")).unwrap().is_empty());
    }

    #[test]
    fn test_small_item_yields_single_node() {
        let splitter = LineSplitter::new(80, 20);
        let nodes = splitter.split(&item("a.py", "one\ntwo\n")).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].start_line, 1);
        assert_eq!(nodes[0].end_line, 2);
        assert_eq!(nodes[0].text, "one\ntwo");
        assert_eq!(nodes[0].path, "a.py");
    }

    #[test]
    fn test_windows_overlap() {
        let splitter = LineSplitter::new(10, 2);
        let nodes = splitter.split(&item("a.py", &numbered_lines(25))).unwrap();
        // step 8: windows 1-10, 9-18, 17-25
        assert_eq!(nodes.len(), 3);
        assert_eq!((nodes[0].start_line, nodes[0].end_line), (1, 10));
        assert_eq!((nodes[1].start_line, nodes[1].end_line), (9, 18));
        assert_eq!((nodes[2].start_line, nodes[2].end_line), (17, 25));
    }

    #[test]
    fn test_ids_unique_within_file() {
        let splitter = LineSplitter::new(5, 0);
        let nodes = splitter.split(&item("a.py", &numbered_lines(20))).unwrap();
        let mut ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), nodes.len());
    }

    #[test]
    fn test_ids_change_with_content() {
        let splitter = LineSplitter::new(80, 20);
        let before = splitter.split(&item("b.txt", "beta")).unwrap();
        let after = splitter.split(&item("b.txt", "beta2")).unwrap();
        assert_ne!(before[0].id, after[0].id);
    }

    #[test]
    fn test_ids_differ_across_paths_with_same_content() {
        let splitter = LineSplitter::new(80, 20);
        let a = splitter.split(&item("a.txt", "same")).unwrap();
        let b = splitter.split(&item("b.txt", "same")).unwrap();
        assert_ne!(a[0].id, b[0].id);
    }
}
