//! Nested comment use-cases shared by deals, vendors and forum posts.
//!
//! # Responsibility
//! - Validate and persist flat comment records per thread.
//! - Rebuild reply trees from flat records at read time.
//! - Toggle like/dislike on comments scoped to their thread.
//!
//! # Invariants
//! - Tree reconstruction never drops a comment: orphans and members of a
//!   parent cycle are promoted to roots.
//! - Siblings are ordered by `created_at ASC`, ties keep input order.
//! - Trees are at most `MAX_REPLY_DEPTH` replies deep; deeper replies attach
//!   to their ancestor one level above the cap.
//! - A reply's parent always belongs to the same thread.

use crate::model::comment::{Author, Comment, CommentNode, CommentTarget, NewComment};
use crate::model::reaction::{Reaction, ReactionSummary, ReactionTarget};
use crate::model::{now_epoch_ms, optional_text, require_text, CommentId, UserId, ValidationError};
use crate::repo::comment_repo::CommentRepository;
use crate::repo::reaction_repo::ReactionRepository;
use crate::repo::RepoError;
use log::info;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for comment use-cases.
#[derive(Debug)]
pub enum CommentServiceError {
    Validation(ValidationError),
    /// Thread owner or comment does not exist.
    NotFound { entity: &'static str, id: String },
    /// Parent comment is not part of the addressed thread.
    ParentNotInThread(CommentId),
    Repo(RepoError),
}

impl Display for CommentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::ParentNotInThread(id) => {
                write!(f, "parent comment {id} does not belong to this thread")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CommentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for CommentServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CommentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Comment service facade over comment and reaction repositories.
pub struct CommentService<C: CommentRepository, R: ReactionRepository> {
    comments: C,
    reactions: R,
}

impl<C: CommentRepository, R: ReactionRepository> CommentService<C, R> {
    pub fn new(comments: C, reactions: R) -> Self {
        Self {
            comments,
            reactions,
        }
    }

    /// Adds one comment or reply to a thread.
    pub fn add_comment(
        &self,
        target: CommentTarget,
        target_id: Uuid,
        input: NewComment,
    ) -> Result<Comment, CommentServiceError> {
        self.ensure_owner(target, target_id)?;
        let name = require_text("name", &input.author_name)?;
        let body = require_text("comment", &input.body)?;

        let parent_id = match parse_parent_ref(input.parent_id.as_deref())? {
            None => None,
            Some(parent_id) => {
                if self
                    .comments
                    .get_comment(target, target_id, parent_id)?
                    .is_none()
                {
                    return Err(CommentServiceError::ParentNotInThread(parent_id));
                }
                Some(parent_id)
            }
        };

        let comment = Comment {
            id: Uuid::new_v4(),
            target,
            target_id,
            author: Author {
                user_id: input.author_user_id,
                name,
                image: optional_text(input.author_image.as_deref())
                    .unwrap_or_else(|| target.default_avatar().to_string()),
                is_verified: input.author_is_verified,
                reputation: input.author_reputation,
            },
            body,
            parent_id,
            created_at: now_epoch_ms(),
            reactions: ReactionSummary::default(),
        };
        self.comments.insert_comment(&comment)?;
        info!(
            "event=comment_add module=comments status=ok target={} reply={}",
            target.as_str(),
            comment.parent_id.is_some()
        );
        Ok(comment)
    }

    /// Returns the reply tree of one thread.
    pub fn comment_tree(
        &self,
        target: CommentTarget,
        target_id: Uuid,
    ) -> Result<Vec<CommentNode>, CommentServiceError> {
        self.ensure_owner(target, target_id)?;
        let flat = self.comments.list_thread(target, target_id)?;
        Ok(build_comment_tree(flat))
    }

    /// Toggles a reaction on a comment of the addressed thread.
    pub fn react_to_comment(
        &self,
        target: CommentTarget,
        target_id: Uuid,
        comment_id: CommentId,
        user_id: UserId,
        reaction: Reaction,
    ) -> Result<ReactionSummary, CommentServiceError> {
        self.ensure_owner(target, target_id)?;
        if self
            .comments
            .get_comment(target, target_id, comment_id)?
            .is_none()
        {
            return Err(CommentServiceError::NotFound {
                entity: "comment",
                id: comment_id.to_string(),
            });
        }
        let state =
            self.reactions
                .apply_toggle(ReactionTarget::Comment, comment_id, user_id, reaction)?;
        info!(
            "event=comment_react module=comments status=ok reaction={} state={}",
            reaction.as_str(),
            state.map(Reaction::as_str).unwrap_or("none")
        );
        Ok(self.reactions.summary(ReactionTarget::Comment, comment_id)?)
    }

    fn ensure_owner(&self, target: CommentTarget, target_id: Uuid) -> Result<(), CommentServiceError> {
        if self.comments.owner_exists(target, target_id)? {
            return Ok(());
        }
        Err(CommentServiceError::NotFound {
            entity: owner_label(target),
            id: target_id.to_string(),
        })
    }
}

fn owner_label(target: CommentTarget) -> &'static str {
    match target {
        CommentTarget::Deal => "deal",
        CommentTarget::Vendor => "vendor",
        CommentTarget::ForumPost => "forum post",
    }
}

/// Parses a raw parent reference; absent, blank and `"0"` mean top-level.
pub fn parse_parent_ref(raw: Option<&str>) -> Result<Option<CommentId>, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty() && *value != "0") else {
        return Ok(None);
    };
    Uuid::parse_str(raw)
        .map(Some)
        .map_err(|_| ValidationError::invalid("parentCommentId", "must be a comment id"))
}

/// Deepest reply level kept in a tree. Serializing and dropping a
/// `CommentNode` recurse once per level.
pub const MAX_REPLY_DEPTH: usize = 32;

/// Rebuilds reply trees from a flat comment list.
///
/// Runs in `O(n log n)`: one pass for parent resolution, one for cycle
/// breaking, one for depth capping, one sort per sibling list and one
/// bottom-up assembly.
pub fn build_comment_tree(flat: Vec<Comment>) -> Vec<CommentNode> {
    let mut seen = HashSet::with_capacity(flat.len());
    let mut comments: Vec<Option<Comment>> = flat
        .into_iter()
        .filter(|comment| seen.insert(comment.id))
        .map(Some)
        .collect();
    let len = comments.len();

    let index_of: HashMap<CommentId, usize> = comments
        .iter()
        .enumerate()
        .filter_map(|(index, comment)| comment.as_ref().map(|comment| (comment.id, index)))
        .collect();
    let mut parent_of: Vec<Option<usize>> = comments
        .iter()
        .map(|comment| {
            comment
                .as_ref()
                .and_then(|comment| comment.parent_id)
                .and_then(|parent_id| index_of.get(&parent_id).copied())
        })
        .collect();

    break_parent_cycles(&mut parent_of);

    let created_at: Vec<i64> = comments
        .iter()
        .map(|comment| comment.as_ref().map_or(0, |comment| comment.created_at))
        .collect();
    let (mut roots, mut children) = sibling_lists(&parent_of, &created_at);
    if cap_reply_depth(&mut parent_of, &roots, &children) {
        (roots, children) = sibling_lists(&parent_of, &created_at);
    }

    // Pre-order walk; assembling in reverse builds every child before its parent.
    let mut order = Vec::with_capacity(len);
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(index) = stack.pop() {
        order.push(index);
        stack.extend(children[index].iter().rev().copied());
    }

    let mut built: Vec<Option<CommentNode>> = (0..len).map(|_| None).collect();
    for &index in order.iter().rev() {
        let replies = children[index]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        if let Some(comment) = comments[index].take() {
            built[index] = Some(CommentNode { comment, replies });
        }
    }
    roots
        .into_iter()
        .filter_map(|index| built[index].take())
        .collect()
}

/// Groups indexes under their parents, each list sorted by `created_at`.
fn sibling_lists(parent_of: &[Option<usize>], created_at: &[i64]) -> (Vec<usize>, Vec<Vec<usize>>) {
    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); parent_of.len()];
    for (index, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(index),
            None => roots.push(index),
        }
    }
    roots.sort_by_key(|index| created_at[*index]);
    for siblings in &mut children {
        siblings.sort_by_key(|index| created_at[*index]);
    }
    (roots, children)
}

/// Re-parents replies below `MAX_REPLY_DEPTH` onto the ancestor one level
/// above the cap. Returns whether any parent changed.
fn cap_reply_depth(
    parent_of: &mut [Option<usize>],
    roots: &[usize],
    children: &[Vec<usize>],
) -> bool {
    let mut changed = false;
    // `ancestors[d]` is the node at depth `d` on the current path.
    let mut ancestors: Vec<usize> = Vec::new();
    let mut stack: Vec<(usize, usize)> = roots.iter().rev().map(|index| (*index, 0)).collect();
    while let Some((index, depth)) = stack.pop() {
        ancestors.truncate(depth);
        ancestors.push(index);
        for &child in children[index].iter().rev() {
            if depth < MAX_REPLY_DEPTH {
                stack.push((child, depth + 1));
            } else {
                parent_of[child] = Some(ancestors[MAX_REPLY_DEPTH - 1]);
                changed = true;
                stack.push((child, MAX_REPLY_DEPTH));
            }
        }
    }
    changed
}

/// Detaches every comment that sits on a parent cycle.
fn break_parent_cycles(parent_of: &mut [Option<usize>]) {
    const UNVISITED: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNVISITED; parent_of.len()];
    let mut path = Vec::new();
    for start in 0..parent_of.len() {
        let mut cursor = Some(start);
        while let Some(index) = cursor {
            match state[index] {
                UNVISITED => {
                    state[index] = ON_PATH;
                    path.push(index);
                    cursor = parent_of[index];
                }
                ON_PATH => {
                    if let Some(cycle_start) = path.iter().position(|node| *node == index) {
                        for node in &path[cycle_start..] {
                            parent_of[*node] = None;
                        }
                    }
                    cursor = None;
                }
                _ => cursor = None,
            }
        }
        for node in path.drain(..) {
            state[node] = DONE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{build_comment_tree, parse_parent_ref, MAX_REPLY_DEPTH};
    use crate::model::comment::{Author, Comment, CommentNode, CommentTarget};
    use crate::model::reaction::ReactionSummary;
    use uuid::Uuid;

    fn comment(id: u128, parent: Option<u128>, created_at: i64) -> Comment {
        Comment {
            id: Uuid::from_u128(id),
            target: CommentTarget::Deal,
            target_id: Uuid::from_u128(999),
            author: Author {
                user_id: None,
                name: "ann".to_string(),
                image: String::new(),
                is_verified: false,
                reputation: 0,
            },
            body: format!("comment {id}"),
            parent_id: parent.map(Uuid::from_u128),
            created_at,
            reactions: ReactionSummary::default(),
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<u128> {
        nodes.iter().map(|node| node.comment.id.as_u128()).collect()
    }

    #[test]
    fn nests_replies_under_parents_in_time_order() {
        let tree = build_comment_tree(vec![
            comment(1, None, 10),
            comment(2, Some(1), 30),
            comment(3, Some(1), 20),
            comment(4, Some(3), 40),
            comment(5, None, 5),
        ]);

        assert_eq!(ids(&tree), vec![5, 1]);
        assert_eq!(ids(&tree[1].replies), vec![3, 2]);
        assert_eq!(ids(&tree[1].replies[0].replies), vec![4]);
        assert_eq!(tree.iter().map(CommentNode::subtree_len).sum::<usize>(), 5);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let tree = build_comment_tree(vec![
            comment(7, None, 1),
            comment(3, None, 1),
            comment(9, None, 1),
        ]);
        assert_eq!(ids(&tree), vec![7, 3, 9]);
    }

    #[test]
    fn orphans_are_promoted_to_roots() {
        let tree = build_comment_tree(vec![comment(1, None, 1), comment(2, Some(42), 2)]);
        assert_eq!(ids(&tree), vec![1, 2]);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let mut duplicate = comment(1, None, 50);
        duplicate.body = "late copy".to_string();
        let tree = build_comment_tree(vec![comment(1, None, 1), duplicate]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.body, "comment 1");
    }

    #[test]
    fn parent_cycles_do_not_lose_comments() {
        let tree = build_comment_tree(vec![
            comment(1, Some(2), 1),
            comment(2, Some(1), 2),
            comment(3, Some(3), 3),
            comment(4, Some(1), 4),
        ]);

        assert_eq!(ids(&tree), vec![1, 2, 3]);
        assert_eq!(ids(&tree[0].replies), vec![4]);
        assert_eq!(tree.iter().map(CommentNode::subtree_len).sum::<usize>(), 4);
    }

    fn max_depth(nodes: &[CommentNode]) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(&CommentNode, usize)> = nodes.iter().map(|node| (node, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.replies.iter().map(|reply| (reply, depth + 1)));
        }
        deepest
    }

    fn chain(len: u128) -> Vec<Comment> {
        (1..=len)
            .map(|id| comment(id, (id > 1).then(|| id - 1), id as i64))
            .collect()
    }

    #[test]
    fn replies_past_the_depth_cap_attach_to_the_last_allowed_level() {
        let extra = 3;
        let len = (MAX_REPLY_DEPTH + 1 + extra) as u128;
        let tree = build_comment_tree(chain(len));

        assert_eq!(max_depth(&tree), MAX_REPLY_DEPTH);
        let mut node = &tree[0];
        for _ in 0..MAX_REPLY_DEPTH - 1 {
            assert_eq!(node.replies.len(), 1);
            node = &node.replies[0];
        }
        // The cap-level parent holds its own child plus every deeper reply, oldest first.
        let expected: Vec<u128> = (MAX_REPLY_DEPTH as u128 + 1..=len).collect();
        assert_eq!(ids(&node.replies), expected);
        assert!(node.replies.iter().all(|reply| reply.replies.is_empty()));
        assert_eq!(tree[0].subtree_len(), len as usize);
    }

    #[test]
    fn long_reply_chains_serialize_on_a_small_stack() {
        let worker = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let tree = build_comment_tree(chain(100_000));
                let json = serde_json::to_string(&tree).unwrap();
                (max_depth(&tree), tree[0].subtree_len(), json.len())
            })
            .unwrap();
        let (depth, total, json_len) = worker.join().unwrap();
        assert_eq!(depth, MAX_REPLY_DEPTH);
        assert_eq!(total, 100_000);
        assert!(json_len > 0);
    }

    #[test]
    fn parent_ref_treats_zero_and_blank_as_top_level() {
        assert_eq!(parse_parent_ref(None), Ok(None));
        assert_eq!(parse_parent_ref(Some("0")), Ok(None));
        assert_eq!(parse_parent_ref(Some("  ")), Ok(None));
        let id = Uuid::new_v4();
        assert_eq!(parse_parent_ref(Some(&id.to_string())), Ok(Some(id)));
        assert!(parse_parent_ref(Some("not-an-id")).is_err());
    }
}
