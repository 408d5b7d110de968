//! Organization group tree with aggregate counts and incremental name search.
//!
//! Nodes live in an arena indexed by [`NodeId`]. Ids are assigned in pre-order,
//! so every child has a larger id than its parent; walking the arena backwards
//! visits children before parents, which is all the bottom-up passes need.
//! No pass recurses, so depth is bounded only by memory.
//!
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Context, Result, TreeError, simple_error};

const SAMPLE_FOREST: &str = include_str!("../data/groups.json");

pub type NodeId = usize;

/// Source description of one group and its subgroups.
///
/// `count` is authoritative only for leaves; counts given for groups with
/// children are ignored and re-derived.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSource {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GroupSource>,
}

impl Drop for GroupSource {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl GroupSource {
    pub fn leaf(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
            children: Vec::new(),
        }
    }

    pub fn branch(name: impl Into<String>, children: Vec<GroupSource>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            children,
        }
    }

    /// Parse a forest; every group needs a non-blank name.
    pub fn forest_from_json(text: &str) -> Result<Vec<Self>> {
        let forest: Vec<Self> = serde_json::from_str(text).with_ctx(|| "parse group forest".to_string())?;
        let mut stack: Vec<&GroupSource> = forest.iter().collect();
        while let Some(group) = stack.pop() {
            if group.name.trim().is_empty() {
                return Err(simple_error("group forest contains a group without a name"));
            }
            stack.extend(group.children.iter());
        }
        Ok(forest)
    }

    pub fn forest_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_ctx(|| format!("read group forest {}", path.display()))?;
        Self::forest_from_json(&text)
    }

    pub fn sample_forest() -> Result<Vec<Self>> {
        Self::forest_from_json(SAMPLE_FOREST)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupNode {
    pub name: String,
    pub aggregate_count: u64,
    /// Back-reference for upward walks; the arena owns every node.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub depth: usize,
    folded: String,
}

impl GroupNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct EntityTreeIndex {
    nodes: Vec<GroupNode>,
    roots: Vec<NodeId>,
}

impl EntityTreeIndex {
    pub fn build(forest: &[GroupSource]) -> Self {
        let mut nodes: Vec<GroupNode> = Vec::new();
        let mut roots = Vec::with_capacity(forest.len());
        let mut leaf_counts: Vec<u64> = Vec::new();

        let mut stack: Vec<(&GroupSource, Option<NodeId>, usize)> =
            forest.iter().rev().map(|src| (src, None, 0)).collect();
        while let Some((src, parent, depth)) = stack.pop() {
            let id = nodes.len();
            nodes.push(GroupNode {
                name: src.name.clone(),
                aggregate_count: 0,
                parent,
                children: Vec::with_capacity(src.children.len()),
                depth,
                folded: src.name.to_lowercase(),
            });
            leaf_counts.push(src.count);
            match parent {
                Some(p) => nodes[p].children.push(id),
                None => roots.push(id),
            }
            stack.extend(src.children.iter().rev().map(|child| (child, Some(id), depth + 1)));
        }

        for id in (0..nodes.len()).rev() {
            let count: u64 = if nodes[id].is_leaf() {
                leaf_counts[id]
            } else {
                nodes[id].children.iter().map(|&c| nodes[c].aggregate_count).sum()
            };
            nodes[id].aggregate_count = count;
        }

        Self { nodes, roots }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&GroupNode> {
        self.nodes.get(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// `Root/Child/.../Node`.
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let node = self.nodes.get(id)?;
        let mut names: Vec<&str> = self.ancestors(id).map(|a| self.nodes[a].name.as_str()).collect();
        names.reverse();
        names.push(&node.name);
        Some(names.join("/"))
    }

    /// Exact (case-sensitive) lookup of a `/`-joined path.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut level: &[NodeId] = &self.roots;
        let mut found = None;
        for segment in path.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            let id = *level.iter().find(|&&id| self.nodes[id].name == segment)?;
            found = Some(id);
            level = &self.nodes[id].children;
        }
        found
    }

    /// Replace a leaf's count and re-derive its ancestors.
    pub fn set_leaf_count(&mut self, id: NodeId, count: u64) -> std::result::Result<(), TreeError> {
        let node = self.nodes.get_mut(id).ok_or(TreeError::UnknownNode(id))?;
        if !node.is_leaf() {
            return Err(TreeError::NotALeaf(node.name.clone()));
        }
        node.aggregate_count = count;
        let mut cursor = node.parent;
        while let Some(p) = cursor {
            let sum: u64 = self.nodes[p].children.iter().map(|&c| self.nodes[c].aggregate_count).sum();
            self.nodes[p].aggregate_count = sum;
            cursor = self.nodes[p].parent;
        }
        Ok(())
    }

    /// Shift a leaf's count by `delta`, saturating at zero.
    pub fn adjust_leaf_count(&mut self, id: NodeId, delta: i64) -> std::result::Result<u64, TreeError> {
        let current = self.node(id).ok_or(TreeError::UnknownNode(id))?.aggregate_count;
        let next = current.saturating_add_signed(delta);
        self.set_leaf_count(id, next)?;
        Ok(next)
    }

    /// Narrow the tree to nodes whose own name contains `query` (case-insensitive)
    /// plus their ancestors. An empty query returns the whole tree unflagged.
    pub fn search(&self, query: &str) -> SearchView {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.project(query, |_| true, |_| false);
        }
        let matched: Vec<bool> = self.nodes.iter().map(|n| n.folded.contains(&needle)).collect();
        self.project_matches(query, &matched)
    }

    /// Path-aware search: `"Group 1/Group 4"` matches a node whose name contains
    /// the last segment and whose ancestors contain the earlier segments, in order,
    /// with intermediate levels allowed in between.
    pub fn search_path(&self, query: &str) -> SearchView {
        let segments: Vec<String> = query
            .split('/')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let Some((last, leading)) = segments.split_last() else {
            return self.search("");
        };
        let matched: Vec<bool> = (0..self.nodes.len())
            .map(|id| {
                if !self.nodes[id].folded.contains(last.as_str()) {
                    return false;
                }
                let mut pending = leading.iter().rev().peekable();
                for a in self.ancestors(id) {
                    match pending.peek() {
                        Some(seg) if self.nodes[a].folded.contains(seg.as_str()) => {
                            pending.next();
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
                pending.peek().is_none()
            })
            .collect();
        self.project_matches(query, &matched)
    }

    /// Path search when the query contains `/`, name search otherwise.
    pub fn search_auto(&self, query: &str) -> SearchView {
        if query.contains('/') {
            self.search_path(query)
        } else {
            self.search(query)
        }
    }

    /// Fully expanded view of the subtree rooted at `id`.
    pub fn subtree(&self, id: NodeId) -> Option<SearchView> {
        self.nodes.get(id)?;
        let mut inside = vec![false; self.nodes.len()];
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            inside[n] = true;
            stack.extend(self.nodes[n].children.iter().copied());
        }
        Some(self.project(&self.nodes[id].name, |n| inside[n], |_| false))
    }

    fn project_matches(&self, query: &str, matched: &[bool]) -> SearchView {
        let mut retain = matched.to_vec();
        for id in (0..self.nodes.len()).rev() {
            if retain[id] {
                if let Some(p) = self.nodes[id].parent {
                    retain[p] = true;
                }
            }
        }
        self.project(query, |id| retain[id], |id| matched[id])
    }

    /// Assemble the view bottom-up from per-node keep/match decisions.
    fn project(
        &self,
        query: &str,
        keep: impl Fn(NodeId) -> bool,
        is_match: impl Fn(NodeId) -> bool,
    ) -> SearchView {
        let mut built: Vec<Option<ViewNode>> = vec![None; self.nodes.len()];
        for id in (0..self.nodes.len()).rev() {
            if !keep(id) {
                continue;
            }
            let node = &self.nodes[id];
            let children: Vec<ViewNode> = node.children.iter().filter_map(|&c| built[c].take()).collect();
            built[id] = Some(ViewNode {
                id,
                name: node.name.clone(),
                aggregate_count: node.aggregate_count,
                matched: is_match(id),
                hidden_children: node.children.len() - children.len(),
                children,
            });
        }
        let roots = built.iter_mut().filter_map(Option::take).collect();
        SearchView {
            query: query.to_string(),
            roots,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewNode {
    pub id: NodeId,
    pub name: String,
    pub aggregate_count: u64,
    /// The node's own name matched the query.
    pub matched: bool,
    /// Children left out of the view; non-zero means the node renders collapsed.
    pub hidden_children: usize,
    pub children: Vec<ViewNode>,
}

// Unlink children onto a heap stack so deep views drop in constant stack space.
impl Drop for ViewNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// One line of a flattened [`SearchView`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewRow<'a> {
    pub depth: usize,
    pub node: &'a ViewNode,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchView {
    pub query: String,
    pub roots: Vec<ViewNode>,
}

impl SearchView {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of nodes in the view.
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    /// Pre-order rows with their depth in the view.
    pub fn rows(&self) -> Vec<ViewRow<'_>> {
        let mut rows = Vec::new();
        let mut stack: Vec<(usize, &ViewNode)> = self.roots.iter().rev().map(|n| (0, n)).collect();
        while let Some((depth, node)) = stack.pop() {
            rows.push(ViewRow { depth, node });
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
        }
        rows
    }

    pub fn matched_ids(&self) -> Vec<NodeId> {
        self.rows().into_iter().filter(|r| r.node.matched).map(|r| r.node.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> EntityTreeIndex {
        EntityTreeIndex::build(&[GroupSource::branch(
            "Cardinal Health",
            vec![GroupSource::branch(
                "Ball And Foodstores",
                vec![GroupSource::branch("Pharmacy 5", vec![GroupSource::leaf("NCPDP 13", 15)])],
            )],
        )])
    }

    fn assert_aggregates(index: &EntityTreeIndex) {
        for id in 0..index.len() {
            let node = index.node(id).unwrap();
            if !node.is_leaf() {
                let sum: u64 = node.children.iter().map(|&c| index.node(c).unwrap().aggregate_count).sum();
                assert_eq!(node.aggregate_count, sum, "aggregate of {}", node.name);
            }
        }
    }

    #[test]
    fn build_preserves_order_and_back_references() {
        let index = EntityTreeIndex::build(&GroupSource::sample_forest().unwrap());
        assert_eq!(index.roots().len(), 2);
        let root = index.roots()[0];
        let names: Vec<_> = index.children(root).iter().map(|&c| index.node(c).unwrap().name.as_str()).collect();
        assert_eq!(names, vec!["Ball And Foodstores", "Harbor Region"]);
        for &c in index.children(root) {
            assert_eq!(index.parent(c), Some(root));
        }
        assert_aggregates(&index);
    }

    #[test]
    fn sample_counts_match_reference_badges() {
        let index = EntityTreeIndex::build(&GroupSource::sample_forest().unwrap());
        let count = |p: &str| index.node(index.find_by_path(p).unwrap()).unwrap().aggregate_count;
        assert_eq!(count("Cardinal Health"), 4923);
        assert_eq!(count("Cardinal Health/Ball And Foodstores"), 2573);
        assert_eq!(count("Cardinal Health/Ball And Foodstores/Pharmacy 5"), 534);
        assert_eq!(count("Cardinal Health/Ball And Foodstores/Pharmacy 5/NCPDP 13"), 15);
    }

    #[test]
    fn internal_source_counts_are_ignored() {
        let mut parent = GroupSource::branch("P", vec![GroupSource::leaf("a", 2), GroupSource::leaf("b", 3)]);
        parent.count = 1000;
        let index = EntityTreeIndex::build(&[parent]);
        assert_eq!(index.node(0).unwrap().aggregate_count, 5);
    }

    #[test]
    fn deep_chains_do_not_recurse() {
        // Small stack: any per-level recursion in build, search or drop would overflow it.
        let worker = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let mut src = GroupSource::leaf("leaf", 7);
                for i in 0..50_000 {
                    src = GroupSource::branch(format!("level {i}"), vec![src]);
                }
                let index = EntityTreeIndex::build(std::slice::from_ref(&src));
                assert_eq!(index.len(), 50_001);
                assert_eq!(index.node(0).unwrap().aggregate_count, 7);
                let view = index.search("leaf");
                assert_eq!(view.len(), 50_001);
                assert_eq!(view.matched_ids(), vec![50_000]);
                drop(view);
                drop(src);
            })
            .unwrap();
        worker.join().unwrap();
    }

    #[test]
    fn unnamed_groups_are_rejected() {
        let err = GroupSource::forest_from_json(r#"[{"name":"Org","children":[{"name":"  ","count":3}]}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("without a name"));
        assert_eq!(GroupSource::forest_from_json(r#"[{"name":"Org","count":2}]"#).unwrap().len(), 1);
    }

    #[test]
    fn leaf_changes_rederive_ancestors() {
        let mut index = EntityTreeIndex::build(&GroupSource::sample_forest().unwrap());
        let leaf = index.find_by_path("Cardinal Health/Ball And Foodstores/Pharmacy 5/NCPDP 13").unwrap();
        index.set_leaf_count(leaf, 20).unwrap();
        assert_aggregates(&index);
        assert_eq!(index.node(index.roots()[0]).unwrap().aggregate_count, 4928);

        assert_eq!(index.adjust_leaf_count(leaf, -25).unwrap(), 0);
        assert_aggregates(&index);

        let branch = index.find_by_path("Cardinal Health").unwrap();
        assert!(matches!(index.set_leaf_count(branch, 1), Err(TreeError::NotALeaf(_))));
        assert_eq!(index.set_leaf_count(999, 1), Err(TreeError::UnknownNode(999)));
    }

    #[test]
    fn search_keeps_ancestor_chain_and_flags_only_the_match() {
        let index = chain();
        let view = index.search("NCPDP");
        let rows = view.rows();
        let names: Vec<_> = rows.iter().map(|r| r.node.name.as_str()).collect();
        assert_eq!(names, vec!["Cardinal Health", "Ball And Foodstores", "Pharmacy 5", "NCPDP 13"]);
        let flags: Vec<_> = rows.iter().map(|r| r.node.matched).collect();
        assert_eq!(flags, vec![false, false, false, true]);
        assert_eq!(rows[3].depth, 3);
    }

    #[test]
    fn search_matching_root_only_returns_it_collapsed() {
        let index = chain();
        let view = index.search("cardinal");
        assert_eq!(view.len(), 1);
        let root = &view.roots[0];
        assert!(root.matched);
        assert!(root.children.is_empty());
        assert_eq!(root.hidden_children, 1);
        assert_eq!(root.aggregate_count, 15);

        let expanded = index.subtree(root.id).unwrap();
        assert_eq!(expanded.len(), 4);
        assert!(expanded.rows().iter().all(|r| r.node.hidden_children == 0));
    }

    #[test]
    fn empty_and_unmatched_queries() {
        let index = EntityTreeIndex::build(&GroupSource::sample_forest().unwrap());
        let all = index.search("");
        assert_eq!(all.len(), index.len());
        assert!(all.rows().iter().all(|r| !r.node.matched && r.node.hidden_children == 0));

        assert!(index.search("no such group").is_empty());
    }

    #[test]
    fn every_row_matches_or_has_a_descendant_in_view() {
        let index = EntityTreeIndex::build(&GroupSource::sample_forest().unwrap());
        for q in ["pharmacy", "region", "2", "ncpdp 3", "summit"] {
            let view = index.search(q);
            for row in view.rows() {
                let name_hit = row.node.name.to_lowercase().contains(q);
                assert_eq!(row.node.matched, name_hit);
                assert!(row.node.matched || !row.node.children.is_empty(), "{q}: {}", row.node.name);
            }
        }
    }

    #[test]
    fn path_search_allows_skipped_levels() {
        let index = EntityTreeIndex::build(&GroupSource::sample_forest().unwrap());
        let view = index.search_path("cardinal/ pharmacy 5 /ncpdp");
        let hits: Vec<_> = view.matched_ids().into_iter().map(|id| index.path_of(id).unwrap()).collect();
        assert_eq!(
            hits,
            vec![
                "Cardinal Health/Ball And Foodstores/Pharmacy 5/NCPDP 13",
                "Cardinal Health/Ball And Foodstores/Pharmacy 5/NCPDP 14",
            ]
        );
        assert!(index.search_path("summit/ncpdp 13").is_empty());
        assert_eq!(index.search_auto("/").len(), index.len());
        assert_eq!(index.search_auto("harbor").matched_ids().len(), 1);
    }
}
