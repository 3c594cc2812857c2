use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;
use crate::error::DomainError;

pub const MAX_COMMENT_LENGTH: usize = 5000;

/// Deepest reply level; top-level comments sit at depth 0.
pub const MAX_REPLY_DEPTH: usize = 10;

/// Comment entity - a reply to a post, optionally nested under another comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(post_id: Uuid, user_id: Uuid, parent_id: Option<Uuid>, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            parent_id,
            content,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentInput {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

impl CommentInput {
    /// Validate and return the trimmed content.
    pub fn validated_content(&self) -> Result<String, DomainError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(DomainError::Validation("content must not be empty".into()));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(DomainError::Validation(format!(
                "content must be at most {MAX_COMMENT_LENGTH} characters"
            )));
        }
        Ok(content.to_string())
    }
}

/// A comment with its author, like state and nested replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    pub comment: Comment,
    pub author: Option<UserSummary>,
    pub likes_count: i64,
    pub is_liked: bool,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(comment: Comment) -> Self {
        Self {
            comment,
            author: None,
            likes_count: 0,
            is_liked: false,
            replies: Vec::new(),
        }
    }

    /// Number of comments in this subtree, including this one.
    pub fn len(&self) -> usize {
        1 + self.replies.iter().map(CommentNode::len).sum::<usize>()
    }
}

/// Arrange flat comments into reply trees.
///
/// Siblings are ordered oldest first at every depth. Replies whose parent is
/// not part of the input are dropped. Anything nested below
/// [`MAX_REPLY_DEPTH`] is listed flat under its ancestor at that depth.
pub fn build_thread(nodes: Vec<CommentNode>) -> Vec<CommentNode> {
    let mut roots = Vec::new();
    let mut children: HashMap<Uuid, Vec<CommentNode>> = HashMap::new();

    for node in nodes {
        match node.comment.parent_id {
            Some(parent_id) => children.entry(parent_id).or_default().push(node),
            None => roots.push(node),
        }
    }

    sort_siblings(&mut roots);
    roots
        .into_iter()
        .map(|root| attach_replies(root, 0, &mut children))
        .collect()
}

/// Depth of a new reply under `parent_id`, given each comment's parent.
/// Stops counting once the limit is passed.
pub fn reply_depth(parent_id: Uuid, parents: &HashMap<Uuid, Option<Uuid>>) -> usize {
    let mut depth = 1;
    let mut cursor = parents.get(&parent_id).copied().flatten();
    while let Some(id) = cursor {
        depth += 1;
        if depth > MAX_REPLY_DEPTH {
            break;
        }
        cursor = parents.get(&id).copied().flatten();
    }
    depth
}

fn attach_replies(
    mut node: CommentNode,
    depth: usize,
    children: &mut HashMap<Uuid, Vec<CommentNode>>,
) -> CommentNode {
    if depth >= MAX_REPLY_DEPTH {
        node.replies = descendants(node.comment.id, children);
        return node;
    }
    if let Some(mut replies) = children.remove(&node.comment.id) {
        sort_siblings(&mut replies);
        node.replies = replies
            .into_iter()
            .map(|reply| attach_replies(reply, depth + 1, children))
            .collect();
    }
    node
}

/// Every comment below `id`, flattened.
fn descendants(id: Uuid, children: &mut HashMap<Uuid, Vec<CommentNode>>) -> Vec<CommentNode> {
    let mut flat = Vec::new();
    let mut pending = vec![id];
    while let Some(id) = pending.pop() {
        if let Some(replies) = children.remove(&id) {
            pending.extend(replies.iter().map(|r| r.comment.id));
            flat.extend(replies);
        }
    }
    sort_siblings(&mut flat);
    flat
}

fn sort_siblings(nodes: &mut [CommentNode]) {
    nodes.sort_by(|a, b| {
        a.comment
            .created_at
            .cmp(&b.comment.created_at)
            .then_with(|| a.comment.id.cmp(&b.comment.id))
    });
}
