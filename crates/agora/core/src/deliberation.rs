//! Deliberation threads
//!
//! Comments are stored flat. [`build_thread`] rebuilds the reply forest on
//! demand from the ordered records.

use agora_types::{Agent, BillId, Comment, CommentId, CommentNode, MAX_REPLY_DEPTH};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::context::CivicContext;
use crate::error::{CivicError, CivicResult};

const COMMENT_MAX_LEN: usize = 10_000;

/// Reply forest for one bill.
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    pub bill_id: BillId,
    pub comments: Vec<CommentNode>,
    pub total: usize,
}

/// Build the reply forest from comments sorted by creation time (ties by id).
///
/// The builder is permissive and never fails:
/// - a comment becomes a root when its `reply_to` names no comment in
///   `comments`, including a parent on another bill;
/// - a comment also becomes a root when its parent appears later in the
///   input, which rules out cycles;
/// - a reply to a comment already at [`MAX_REPLY_DEPTH`] is attached to
///   that comment's parent instead, so nesting stays bounded.
///
/// Siblings keep input order.
pub fn build_thread(comments: Vec<Comment>) -> Vec<CommentNode> {
    let index: HashMap<CommentId, usize> = comments
        .iter()
        .enumerate()
        .map(|(pos, comment)| (comment.id, pos))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut attached_to: Vec<Option<usize>> = vec![None; comments.len()];
    let mut depth = vec![0usize; comments.len()];
    let mut roots = Vec::new();
    for (pos, comment) in comments.iter().enumerate() {
        let parent = match comment.reply_to.and_then(|parent| index.get(&parent)) {
            Some(&parent) if parent < pos => parent,
            _ => {
                roots.push(pos);
                continue;
            }
        };
        let (anchor, level) = if depth[parent] < MAX_REPLY_DEPTH {
            (Some(parent), depth[parent] + 1)
        } else {
            (attached_to[parent], depth[parent])
        };
        match anchor {
            Some(anchor) => children[anchor].push(pos),
            None => roots.push(pos),
        }
        attached_to[pos] = anchor;
        depth[pos] = level;
    }

    // Children always sit after their parent, so a reverse sweep finishes
    // every subtree before its parent needs it.
    let mut nodes: Vec<Option<CommentNode>> = Vec::with_capacity(comments.len());
    nodes.resize_with(comments.len(), || None);
    let mut slots: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    for pos in (0..slots.len()).rev() {
        let Some(comment) = slots[pos].take() else {
            continue;
        };
        let replies = children[pos]
            .iter()
            .filter_map(|&child| nodes[child].take())
            .collect();
        nodes[pos] = Some(CommentNode { comment, replies });
    }

    roots
        .into_iter()
        .filter_map(|pos| nodes[pos].take())
        .collect()
}

/// Posting and reading deliberation on bills.
#[derive(Clone)]
pub struct DeliberationService {
    ctx: CivicContext,
}

impl DeliberationService {
    pub fn new(ctx: CivicContext) -> Self {
        Self { ctx }
    }

    pub async fn post_comment(
        &self,
        author: &Agent,
        bill_id: &BillId,
        text: &str,
        reply_to: Option<CommentId>,
    ) -> CivicResult<Comment> {
        if !author.is_verified() {
            return Err(CivicError::forbidden("only verified agents may comment"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(CivicError::invalid("comment text is required"));
        }
        if text.chars().count() > COMMENT_MAX_LEN {
            return Err(CivicError::invalid(format!(
                "comment must be at most {COMMENT_MAX_LEN} characters"
            )));
        }

        let storage = self.ctx.storage();
        if storage.get_bill(bill_id).await?.is_none() {
            return Err(CivicError::not_found(format!("bill {bill_id} not found")));
        }
        if let Some(parent_id) = reply_to {
            let parent = match storage.get_comment(&parent_id).await? {
                Some(parent) if &parent.bill_id == bill_id => parent,
                _ => {
                    return Err(CivicError::invalid(format!(
                        "comment {parent_id} is not part of this bill's deliberation"
                    )))
                }
            };
            if self.depth_of(parent).await? >= MAX_REPLY_DEPTH {
                return Err(CivicError::invalid(format!(
                    "replies may nest at most {MAX_REPLY_DEPTH} levels deep"
                )));
            }
        }

        let comment = Comment {
            id: CommentId::generate(),
            bill_id: *bill_id,
            author_id: author.id,
            text: text.to_string(),
            reply_to,
            created_at: self.ctx.now(),
        };
        storage.insert_comment(comment.clone()).await?;

        info!(comment_id = %comment.id, bill_id = %bill_id, author_id = %author.id, "comment posted");
        self.ctx
            .reward(&author.id, self.ctx.policy().comment_reward, "comment")
            .await;
        Ok(comment)
    }

    /// Reply depth of a stored comment, counted up to `MAX_REPLY_DEPTH`.
    async fn depth_of(&self, mut comment: Comment) -> CivicResult<usize> {
        let mut depth = 0;
        while let Some(parent_id) = comment.reply_to {
            if depth >= MAX_REPLY_DEPTH {
                break;
            }
            match self.ctx.storage().get_comment(&parent_id).await? {
                Some(parent) => {
                    depth += 1;
                    comment = parent;
                }
                None => break,
            }
        }
        Ok(depth)
    }

    pub async fn thread(&self, bill_id: &BillId) -> CivicResult<CommentThread> {
        let storage = self.ctx.storage();
        if storage.get_bill(bill_id).await?.is_none() {
            return Err(CivicError::not_found(format!("bill {bill_id} not found")));
        }
        let comments = storage.list_comments(bill_id).await?;
        let total = comments.len();
        Ok(CommentThread {
            bill_id: *bill_id,
            comments: build_thread(comments),
            total,
        })
    }
}
