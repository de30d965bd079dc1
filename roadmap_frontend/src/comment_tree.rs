//! Pure transformations of an item's comment tree.
//!
//! Every function takes the current roots by reference and returns a fresh
//! tree; the input is never touched. Ids are matched at any depth. An id that
//! is not present leaves the tree as it was: callers that care about the miss
//! check with [`contains`] first.

use crate::models::Comment;

/// Deepest level a reply may be attached to (root = 0).
pub const MAX_REPLY_DEPTH: usize = 2;
pub const MAX_COMMENT_LEN: usize = 300;

/// Appends `reply` to the children of the node whose id is `parent_id`.
pub fn insert_reply(tree: &[Comment], parent_id: &str, reply: Comment) -> Vec<Comment> {
    let mut reply = Some(reply);
    insert_into(tree, parent_id, &mut reply)
}

fn insert_into(tree: &[Comment], parent_id: &str, reply: &mut Option<Comment>) -> Vec<Comment> {
    tree.iter()
        .map(|node| {
            if reply.is_none() {
                return node.clone();
            }
            if node.id == parent_id {
                let mut node = node.clone();
                if let Some(reply) = reply.take() {
                    node.children.push(reply);
                }
                return node;
            }
            Comment {
                children: insert_into(&node.children, parent_id, reply),
                ..node.clone()
            }
        })
        .collect()
}

/// Adds `comment` as a new root, or as a reply when `parent_id` is set.
pub fn attach(tree: &[Comment], parent_id: Option<&str>, comment: Comment) -> Vec<Comment> {
    match parent_id {
        Some(parent_id) => insert_reply(tree, parent_id, comment),
        None => {
            let mut roots = tree.to_vec();
            roots.push(comment);
            roots
        }
    }
}

/// Replaces the first node whose id equals `updated.id` with `updated`.
///
/// The whole node is swapped, children included: `updated` must already hold
/// the reply list the node should keep. [`carry_replies`] builds that from the
/// current tree when the incoming copy has none.
pub fn update_comment(tree: &[Comment], updated: &Comment) -> Vec<Comment> {
    let mut pending = true;
    replace_in(tree, updated, &mut pending)
}

fn replace_in(tree: &[Comment], updated: &Comment, pending: &mut bool) -> Vec<Comment> {
    tree.iter()
        .map(|node| {
            if !*pending {
                return node.clone();
            }
            if node.id == updated.id {
                *pending = false;
                return updated.clone();
            }
            Comment {
                children: replace_in(&node.children, updated, pending),
                ..node.clone()
            }
        })
        .collect()
}

/// Removes the node with `comment_id` and its whole subtree.
pub fn delete_comment(tree: &[Comment], comment_id: &str) -> Vec<Comment> {
    detach(tree, comment_id).0
}

/// A node cut out of a tree together with where it used to hang.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    pub node: Comment,
    pub parent_id: Option<String>,
    pub index: usize,
}

/// Like [`delete_comment`], but hands back the removed subtree so it can be
/// put back with [`restore`].
pub fn detach(tree: &[Comment], comment_id: &str) -> (Vec<Comment>, Option<Detached>) {
    let mut detached = None;
    let pruned = detach_from(tree, comment_id, None, &mut detached);
    (pruned, detached)
}

fn detach_from(
    tree: &[Comment],
    comment_id: &str,
    parent_id: Option<&str>,
    detached: &mut Option<Detached>,
) -> Vec<Comment> {
    let mut kept = Vec::with_capacity(tree.len());
    for (index, node) in tree.iter().enumerate() {
        if detached.is_some() {
            kept.push(node.clone());
        } else if node.id == comment_id {
            *detached = Some(Detached {
                node: node.clone(),
                parent_id: parent_id.map(str::to_string),
                index,
            });
        } else {
            kept.push(Comment {
                children: detach_from(&node.children, comment_id, Some(&node.id), detached),
                ..node.clone()
            });
        }
    }
    kept
}

/// Puts a detached subtree back at its old position, clamped to the current
/// sibling count. If its parent has since disappeared the tree is unchanged.
pub fn restore(tree: &[Comment], detached: Detached) -> Vec<Comment> {
    let Detached {
        node,
        parent_id,
        index,
    } = detached;
    match parent_id {
        None => {
            let mut roots = tree.to_vec();
            let at = index.min(roots.len());
            roots.insert(at, node);
            roots
        }
        Some(parent_id) => {
            let mut slot = Some((node, index));
            restore_into(tree, &parent_id, &mut slot)
        }
    }
}

fn restore_into(
    tree: &[Comment],
    parent_id: &str,
    slot: &mut Option<(Comment, usize)>,
) -> Vec<Comment> {
    tree.iter()
        .map(|node| {
            if slot.is_none() {
                return node.clone();
            }
            if node.id == parent_id {
                let mut node = node.clone();
                if let Some((child, index)) = slot.take() {
                    let at = index.min(node.children.len());
                    node.children.insert(at, child);
                }
                return node;
            }
            Comment {
                children: restore_into(&node.children, parent_id, slot),
                ..node.clone()
            }
        })
        .collect()
}

pub fn find<'a>(tree: &'a [Comment], comment_id: &str) -> Option<&'a Comment> {
    tree.iter().find_map(|node| {
        if node.id == comment_id {
            Some(node)
        } else {
            find(&node.children, comment_id)
        }
    })
}

pub fn contains(tree: &[Comment], comment_id: &str) -> bool {
    find(tree, comment_id).is_some()
}

/// Depth of the node (roots are 0), or `None` if absent.
pub fn depth_of(tree: &[Comment], comment_id: &str) -> Option<usize> {
    tree.iter().find_map(|node| {
        if node.id == comment_id {
            Some(0)
        } else {
            depth_of(&node.children, comment_id).map(|depth| depth + 1)
        }
    })
}

/// Total number of nodes at every depth.
pub fn count(tree: &[Comment]) -> usize {
    tree.iter().map(|node| 1 + count(&node.children)).sum()
}

/// Returns `updated`, borrowing the current node's replies when `updated`
/// arrives without any.
pub fn carry_replies(tree: &[Comment], updated: Comment) -> Comment {
    if !updated.children.is_empty() {
        return updated;
    }
    match find(tree, &updated.id) {
        Some(existing) => Comment {
            children: existing.children.clone(),
            ..updated
        },
        None => updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: &str, children: Vec<Comment>) -> Comment {
        Comment {
            id: id.to_string(),
            author_id: "u1".to_string(),
            author_name: "alice".to_string(),
            content: format!("comment {id}"),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            parent_id: None,
            children,
        }
    }

    fn sample() -> Vec<Comment> {
        vec![
            node(
                "A",
                vec![node("A1", vec![node("A1a", vec![])]), node("A2", vec![])],
            ),
            node("B", vec![]),
        ]
    }

    #[test]
    fn reply_nests_under_parent_at_each_level() {
        let tree = vec![node("A", vec![])];
        let tree = insert_reply(&tree, "A", node("B", vec![]));
        assert_eq!(tree, vec![node("A", vec![node("B", vec![])])]);

        let tree = insert_reply(&tree, "B", node("C", vec![]));
        assert_eq!(
            tree,
            vec![node("A", vec![node("B", vec![node("C", vec![])])])]
        );
        assert_eq!(depth_of(&tree, "C"), Some(2));
    }

    #[test]
    fn reply_is_appended_after_existing_children() {
        let tree = insert_reply(&sample(), "A", node("A3", vec![]));
        let ids: Vec<_> = tree[0].children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2", "A3"]);
        assert_eq!(count(&tree), count(&sample()) + 1);
    }

    #[test]
    fn reply_to_missing_parent_leaves_tree_unchanged() {
        let tree = sample();
        assert_eq!(insert_reply(&tree, "nope", node("X", vec![])), tree);
    }

    #[test]
    fn attach_without_parent_appends_root() {
        let tree = attach(&sample(), None, node("C", vec![]));
        let roots: Vec<_> = tree.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(roots, vec!["A", "B", "C"]);
        let tree = attach(&tree, Some("C"), node("C1", vec![]));
        assert_eq!(depth_of(&tree, "C1"), Some(1));
    }

    #[test]
    fn insert_does_not_touch_input() {
        let tree = sample();
        let before = tree.clone();
        let _ = insert_reply(&tree, "A1a", node("deep", vec![]));
        assert_eq!(tree, before);
    }

    #[test]
    fn delete_removes_whole_subtree() {
        let tree = sample();
        let pruned = delete_comment(&tree, "A1");
        assert_eq!(count(&pruned), count(&tree) - 2);
        assert!(!contains(&pruned, "A1"));
        assert!(!contains(&pruned, "A1a"));
        assert!(contains(&pruned, "A2"));
    }

    #[test]
    fn delete_root_and_missing_id() {
        let tree = sample();
        let pruned = delete_comment(&tree, "B");
        assert_eq!(pruned.len(), 1);
        assert_eq!(delete_comment(&tree, "missing"), tree);
    }

    #[test]
    fn update_replaces_node_and_is_idempotent() {
        let tree = sample();
        let mut edited = find(&tree, "A2").cloned().expect("A2 present");
        edited.content = "edited".into();

        let once = update_comment(&tree, &edited);
        let twice = update_comment(&once, &edited);
        assert_eq!(once, twice);
        assert_eq!(find(&once, "A2").map(|c| c.content.as_str()), Some("edited"));
    }

    #[test]
    fn update_without_replies_drops_them_unless_carried() {
        let tree = sample();
        let mut bare = node("A1", vec![]);
        bare.content = "edited".into();

        let dropped = update_comment(&tree, &bare);
        assert!(!contains(&dropped, "A1a"));

        let carried = carry_replies(&tree, bare);
        let kept = update_comment(&tree, &carried);
        assert!(contains(&kept, "A1a"));
        assert_eq!(find(&kept, "A1").map(|c| c.content.as_str()), Some("edited"));
    }

    #[test]
    fn detach_then_restore_returns_original() {
        let tree = sample();
        let (pruned, detached) = detach(&tree, "A1");
        let detached = detached.expect("A1 detached");
        assert_eq!(detached.parent_id.as_deref(), Some("A"));
        assert_eq!(detached.index, 0);
        assert_eq!(restore(&pruned, detached), tree);

        let (pruned, detached) = detach(&tree, "B");
        assert_eq!(restore(&pruned, detached.expect("B detached")), tree);
    }

    #[test]
    fn restore_under_vanished_parent_is_noop() {
        let tree = sample();
        let (_, detached) = detach(&tree, "A1a");
        let without_parent = delete_comment(&tree, "A1");
        assert_eq!(
            restore(&without_parent, detached.expect("detached")),
            without_parent
        );
    }
}
