//! Reassembles flat, parent-linked comment rows into nested trees.

use std::collections::{HashMap, HashSet};

use crate::models::comment::{Comment, CommentTree};

/// Groups a flat record set by `parent_id` so each node's replies are found in O(1).
///
/// Siblings are kept in creation order (`created_at`, then `id`).
pub struct ChildIndex<'a> {
    children: HashMap<i64, Vec<&'a Comment>>,
}

impl<'a> ChildIndex<'a> {
    pub fn new(records: &'a [Comment]) -> Self {
        let mut children: HashMap<i64, Vec<&'a Comment>> = HashMap::new();
        for record in records {
            if let Some(parent_id) = record.parent_id {
                children.entry(parent_id).or_default().push(record);
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|c| (c.created_at, c.id));
        }
        Self { children }
    }

    /// Expands `root` into a tree using the indexed records.
    ///
    /// A record already placed in the tree is not expanded twice, so malformed
    /// (cyclic) input still terminates.
    pub fn build(&self, root: &Comment) -> CommentTree {
        let mut placed = HashSet::new();
        self.build_node(root, &mut placed)
    }

    fn build_node(&self, comment: &Comment, placed: &mut HashSet<i64>) -> CommentTree {
        placed.insert(comment.id);

        let mut children = Vec::new();
        for reply in self.children.get(&comment.id).into_iter().flatten() {
            if placed.contains(&reply.id) {
                continue;
            }
            children.push(self.build_node(reply, placed));
        }

        CommentTree {
            comment: comment.clone(),
            children,
        }
    }
}

/// Builds the tree rooted at `root` out of `records`.
pub fn build_tree(root: &Comment, records: &[Comment]) -> CommentTree {
    ChildIndex::new(records).build(root)
}

/// Builds one tree per root, in the order the roots are given.
pub fn build_forest(roots: &[Comment], records: &[Comment]) -> Vec<CommentTree> {
    let index = ChildIndex::new(records);
    roots.iter().map(|root| index.build(root)).collect()
}
