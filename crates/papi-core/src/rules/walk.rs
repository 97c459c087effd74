//! Tree traversal helpers
//!
//! All traversals use an explicit stack, so arbitrarily deep trees are fine.
//! Behaviors can also be addressed by a path of rule names.

use std::fmt;

use super::{MatchEntry, RuleNode, RuleOptionsMap};
use crate::error::{Error, Result};

/// Position of a node inside a tree, as child indexes from the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RulePath(Vec<usize>);

impl RulePath {
    /// The root position
    pub fn root() -> Self {
        Self::default()
    }

    /// Child indexes from the root
    pub fn indexes(&self) -> &[usize] {
        &self.0
    }

    /// Number of steps from the root
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root position
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn child(&self, index: usize) -> Self {
        let mut indexes = Vec::with_capacity(self.0.len() + 1);
        indexes.extend_from_slice(&self.0);
        indexes.push(index);
        Self(indexes)
    }

    /// JSON pointer in the form used by API error locations: `#/rules/children/0`
    pub fn to_pointer(&self) -> String {
        let mut pointer = String::from("#/rules");
        for index in &self.0 {
            pointer.push_str("/children/");
            pointer.push_str(&index.to_string());
        }
        pointer
    }

    /// Validation field path: `Children[0].Children[2]`; empty for the root
    pub fn to_field_path(&self) -> String {
        self.0
            .iter()
            .map(|index| format!("Children[{}]", index))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for RulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer())
    }
}

/// Pre-order iterator over the nodes of a tree
pub struct Walk<'a> {
    stack: Vec<&'a RuleNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a RuleNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Pre-order iterator yielding each node with its position
pub struct WalkWithPaths<'a> {
    stack: Vec<(RulePath, &'a RuleNode)>,
}

impl<'a> Iterator for WalkWithPaths<'a> {
    type Item = (RulePath, &'a RuleNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;
        for (index, child) in node.children.iter().enumerate().rev() {
            self.stack.push((path.child(index), child));
        }
        Some((path, node))
    }
}

/// What an error location pointer resolved to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleLocation<'a> {
    /// A rule
    Node(&'a RuleNode),
    /// A behavior of a rule
    Behavior {
        node: &'a RuleNode,
        behavior: &'a MatchEntry,
    },
    /// A criterion of a rule
    Criterion {
        node: &'a RuleNode,
        criterion: &'a MatchEntry,
    },
}

impl<'a> RuleLocation<'a> {
    /// The rule that owns the location
    pub fn node(&self) -> &'a RuleNode {
        match self {
            RuleLocation::Node(node)
            | RuleLocation::Behavior { node, .. }
            | RuleLocation::Criterion { node, .. } => node,
        }
    }
}

impl RuleNode {
    /// Visit every node, parents before children, children in stored order
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Like [`walk`](Self::walk), with the position of each node
    pub fn walk_with_paths(&self) -> WalkWithPaths<'_> {
        WalkWithPaths {
            stack: vec![(RulePath::root(), self)],
        }
    }

    /// Every behavior with the given name, in walk order
    pub fn find_behaviors(&self, name: &str) -> Vec<(RulePath, &MatchEntry)> {
        self.walk_with_paths()
            .flat_map(|(path, node)| {
                node.behaviors
                    .iter()
                    .filter(|b| b.name == name)
                    .map(move |b| (path.clone(), b))
            })
            .collect()
    }

    /// Every criterion with the given name, in walk order
    pub fn find_criteria(&self, name: &str) -> Vec<(RulePath, &MatchEntry)> {
        self.walk_with_paths()
            .flat_map(|(path, node)| {
                node.criteria
                    .iter()
                    .filter(|c| c.name == name)
                    .map(move |c| (path.clone(), c))
            })
            .collect()
    }

    /// Total number of nodes, the root included
    pub fn node_count(&self) -> usize {
        self.walk().count()
    }

    /// Number of levels; a lone root has depth 1
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1_usize)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|child| (child, level + 1)));
        }
        deepest
    }

    /// Node at a position, if it exists
    pub fn get(&self, path: &RulePath) -> Option<&RuleNode> {
        path.indexes()
            .iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Resolve an error location pointer such as `#/rules/children/1/behaviors/0`
    ///
    /// Segments after a behavior or criterion index (for example
    /// `/options/ttl`) still resolve to that behavior or criterion.
    pub fn locate(&self, pointer: &str) -> Option<RuleLocation<'_>> {
        let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
        let rest = pointer.strip_prefix("/rules")?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }

        let mut node = self;
        let mut segments = rest.split('/').skip(1);

        while let Some(kind) = segments.next() {
            let index: usize = segments.next()?.parse().ok()?;
            match kind {
                "children" => node = node.children.get(index)?,
                "behaviors" => {
                    let behavior = node.behaviors.get(index)?;
                    return Some(RuleLocation::Behavior { node, behavior });
                }
                "criteria" => {
                    let criterion = node.criteria.get(index)?;
                    return Some(RuleLocation::Criterion { node, criterion });
                }
                _ => return None,
            }
        }

        Some(RuleLocation::Node(node))
    }

    /// Rebuild the tree bottom-up, children before their parent
    ///
    /// `f` receives each node with its already rebuilt children attached.
    pub fn map_bottom_up<F>(self, mut f: F) -> RuleNode
    where
        F: FnMut(RuleNode) -> RuleNode,
    {
        struct Frame {
            node: RuleNode,
            pending: std::vec::IntoIter<RuleNode>,
            done: Vec<RuleNode>,
        }

        impl Frame {
            fn new(mut node: RuleNode) -> Self {
                let children = std::mem::take(&mut node.children);
                Self {
                    done: Vec::with_capacity(children.len()),
                    pending: children.into_iter(),
                    node,
                }
            }
        }

        let mut stack = vec![Frame::new(self)];
        let mut result = None;

        while let Some(frame) = stack.last_mut() {
            if let Some(child) = frame.pending.next() {
                stack.push(Frame::new(child));
                continue;
            }

            let Some(Frame { mut node, done, .. }) = stack.pop() else {
                break;
            };
            node.children = done;
            let mapped = f(node);
            match stack.last_mut() {
                Some(parent) => parent.done.push(mapped),
                None => result = Some(mapped),
            }
        }

        result.unwrap_or_default()
    }

    /// Find a behavior by a path of rule names, e.g.
    /// `/Performance/JPEG Images/adaptiveImageCompression`
    ///
    /// Every segment but the last names a child of the previous rule; the
    /// last names a behavior of the rule reached. A single segment looks at
    /// the root's own behaviors. Matching ignores ASCII case and takes the
    /// first rule or behavior with a matching name.
    pub fn find_behavior_by_path(&self, path: &str) -> Option<&MatchEntry> {
        let (position, index) = self.resolve_behavior_path(path)?;
        self.get(&position)?.behaviors.get(index)
    }

    /// Rebuild the tree with `options` merged into the behavior at `path`
    ///
    /// Keys in `options` replace existing keys; other options are kept.
    /// Paths follow [`find_behavior_by_path`](Self::find_behavior_by_path).
    pub fn merge_behavior_options(self, path: &str, options: RuleOptionsMap) -> Result<RuleNode> {
        let (position, index) = self
            .resolve_behavior_path(path)
            .ok_or_else(|| Error::not_found(format!("behavior path {:?}", path)))?;

        // map_bottom_up visits nodes in post-order; find the target's turn
        let preorder = self
            .walk_with_paths()
            .position(|(p, _)| p == position)
            .unwrap_or_default();
        let subtree = self.get(&position).map(RuleNode::node_count).unwrap_or(1);
        let target = preorder + subtree - 1 - position.len();

        let mut options = Some(options);
        let mut visited = 0;
        Ok(self.map_bottom_up(|mut node| {
            if visited == target {
                if let (Some(behavior), Some(options)) = (node.behaviors.get_mut(index), options.take()) {
                    behavior.options.extend(options);
                }
            }
            visited += 1;
            node
        }))
    }

    fn resolve_behavior_path(&self, path: &str) -> Option<(RulePath, usize)> {
        let segments: Vec<&str> = path.strip_prefix('/').unwrap_or(path).split('/').collect();
        let (behavior_name, rule_names) = segments.split_last()?;
        if behavior_name.is_empty() {
            return None;
        }

        let mut node = self;
        let mut position = RulePath::root();
        for rule_name in rule_names {
            let (index, child) = node
                .children
                .iter()
                .enumerate()
                .find(|(_, child)| child.name.eq_ignore_ascii_case(rule_name))?;
            node = child;
            position = position.child(index);
        }

        let index = node
            .behaviors
            .iter()
            .position(|b| b.name.eq_ignore_ascii_case(behavior_name))?;
        Some((position, index))
    }
}
