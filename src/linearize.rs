//! Content tree validation and linearization.
//!
//! Flattens the hierarchical content tree into the reading order every
//! later stage works from: deterministic pre-order traversal, siblings
//! sorted by explicit order key with ties broken by id, and each node
//! annotated with its nearest enclosing chapter.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::model::{ContentNode, LinearNode, NodeKind};

/// Flatten a content tree into reading order.
///
/// The tree is validated first: duplicate ids, dangling parent references,
/// parent cycles, and malformed ids are all rejected before any rendering
/// happens. The traversal itself is pure and repeatable: identical input
/// produces an identical sequence.
pub fn linearize(nodes: &[ContentNode]) -> Result<Vec<LinearNode>> {
    validate(nodes)?;

    let mut children: HashMap<&str, Vec<&ContentNode>> = HashMap::new();
    let mut roots: Vec<&ContentNode> = Vec::new();
    for node in nodes {
        match node.parent_id.as_deref() {
            Some(parent) => children.entry(parent).or_default().push(node),
            None => roots.push(node),
        }
    }
    sort_siblings(&mut roots);
    for siblings in children.values_mut() {
        sort_siblings(siblings);
    }

    let mut sequence = Vec::with_capacity(nodes.len());
    for root in roots {
        visit(root, 1, None, &children, &mut sequence);
    }
    Ok(sequence)
}

fn sort_siblings(siblings: &mut [&ContentNode]) {
    siblings.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
}

fn visit(
    node: &ContentNode,
    level: usize,
    enclosing: Option<&ContentNode>,
    children: &HashMap<&str, Vec<&ContentNode>>,
    out: &mut Vec<LinearNode>,
) {
    // Nearest ancestor-or-self chapter; Part and Heading nodes pass the
    // enclosing chapter through unchanged.
    let chapter = if node.kind == NodeKind::Chapter {
        Some(node)
    } else {
        enclosing
    };

    out.push(LinearNode {
        id: node.id.clone(),
        kind: node.kind,
        title: node.title.clone(),
        level,
        chapter_id: chapter.map(|c| c.id.clone()),
        chapter_title: chapter.map(|c| c.title.clone()).unwrap_or_default(),
        body: node.body.clone(),
    });

    if let Some(kids) = children.get(node.id.as_str()) {
        for child in kids {
            visit(child, level + 1, chapter, children, out);
        }
    }
}

fn validate(nodes: &[ContentNode]) -> Result<()> {
    let mut ids = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if node.id.is_empty() || !node.id.bytes().all(is_id_byte) {
            return Err(Error::InvalidTree(format!(
                "node id {:?} is not of the form [A-Za-z0-9_-]+",
                node.id
            )));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(Error::InvalidTree(format!("duplicate node id {:?}", node.id)));
        }
    }

    for node in nodes {
        if let Some(parent) = node.parent_id.as_deref() {
            if !ids.contains(parent) {
                return Err(Error::InvalidTree(format!(
                    "node {:?} references missing parent {:?}",
                    node.id, parent
                )));
            }
            if parent == node.id {
                return Err(Error::InvalidTree(format!("node {:?} is its own parent", node.id)));
            }
        }
    }

    // Every node whose parents all exist must be reachable from a root;
    // anything left over sits on a parent cycle.
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut pending: Vec<&str> = Vec::new();
    for node in nodes {
        match node.parent_id.as_deref() {
            Some(parent) => children.entry(parent).or_default().push(node.id.as_str()),
            None => pending.push(node.id.as_str()),
        }
    }
    let mut reachable = HashSet::with_capacity(nodes.len());
    while let Some(id) = pending.pop() {
        if !reachable.insert(id) {
            continue;
        }
        if let Some(kids) = children.get(id) {
            pending.extend(kids.iter().copied());
        }
    }
    if reachable.len() != nodes.len() {
        let mut cyclic: Vec<&str> = nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| !reachable.contains(id))
            .collect();
        cyclic.sort_unstable();
        return Err(Error::InvalidTree(format!(
            "parent cycle involving nodes {:?}",
            cyclic
        )));
    }

    Ok(())
}

pub(crate) fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}
