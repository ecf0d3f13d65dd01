//! Deliberation comments

use crate::ids::{AgentId, BillId, CommentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deepest reply level a thread holds; top-level comments sit at depth 0.
pub const MAX_REPLY_DEPTH: usize = 32;

/// Append-only comment on a bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub bill_id: BillId,
    pub author_id: AgentId,
    pub text: String,
    pub reply_to: Option<CommentId>,
    pub created_at: DateTime<Utc>,
}

/// A comment with its replies, as returned by the thread builder.
///
/// Serialization and drop recurse once per level; the builder keeps nesting
/// within [`MAX_REPLY_DEPTH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Number of comments in this subtree, including the root
    pub fn subtree_len(&self) -> usize {
        1 + self.replies.iter().map(CommentNode::subtree_len).sum::<usize>()
    }
}
