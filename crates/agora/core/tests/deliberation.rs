mod common;

use agora_core::CivicError;
use agora_types::{BillId, CommentId, MAX_REPLY_DEPTH};
use chrono::Duration;
use common::Harness;

#[tokio::test]
async fn thread_nests_replies_chronologically() {
    let h = Harness::new();
    let author = h.citizen("author", 20).await;
    let bill_id = h
        .lifecycle
        .propose(&author, "Reef Act", "s", "t")
        .await
        .unwrap()
        .bill_id;

    let root = h
        .deliberation
        .post_comment(&author, &bill_id, "Opening remarks", None)
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(1));
    let reply = h
        .deliberation
        .post_comment(&author, &bill_id, "A reply", Some(root.id))
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(1));
    let second_root = h
        .deliberation
        .post_comment(&author, &bill_id, "Another point", None)
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(1));
    h.deliberation
        .post_comment(&author, &bill_id, "Nested", Some(reply.id))
        .await
        .unwrap();

    let thread = h.deliberation.thread(&bill_id).await.unwrap();
    assert_eq!(thread.total, 4);
    assert_eq!(thread.comments.len(), 2);
    assert_eq!(thread.comments[0].comment.id, root.id);
    assert_eq!(thread.comments[1].comment.id, second_root.id);
    assert_eq!(thread.comments[0].replies[0].comment.id, reply.id);
    assert_eq!(thread.comments[0].replies[0].replies.len(), 1);

    let again = h.deliberation.thread(&bill_id).await.unwrap();
    assert_eq!(again.comments, thread.comments);

    // 20 to propose, +5 reward, +1 per comment.
    assert_eq!(h.agent(&author.id).await.activity_score, 29);
}

#[tokio::test]
async fn replies_must_stay_on_the_same_bill() {
    let h = Harness::new();
    let author = h.citizen("author", 20).await;
    let first = h
        .lifecycle
        .propose(&author, "First", "s", "t")
        .await
        .unwrap()
        .bill_id;
    let second = h
        .lifecycle
        .propose(&author, "Second", "s", "t")
        .await
        .unwrap()
        .bill_id;
    let elsewhere = h
        .deliberation
        .post_comment(&author, &first, "On the first bill", None)
        .await
        .unwrap();

    assert!(matches!(
        h.deliberation
            .post_comment(&author, &second, "Cross-post", Some(elsewhere.id))
            .await,
        Err(CivicError::InvalidInput(_))
    ));
    assert!(matches!(
        h.deliberation
            .post_comment(&author, &second, "Dangling", Some(CommentId::generate()))
            .await,
        Err(CivicError::InvalidInput(_))
    ));
    assert_eq!(h.deliberation.thread(&second).await.unwrap().total, 0);
}

#[tokio::test]
async fn comment_requirements() {
    let h = Harness::new();
    let author = h.citizen("author", 20).await;
    let applicant = h.applicant("applicant").await;
    let bill_id = h
        .lifecycle
        .propose(&author, "Act", "s", "t")
        .await
        .unwrap()
        .bill_id;

    assert!(matches!(
        h.deliberation
            .post_comment(&applicant, &bill_id, "hi", None)
            .await,
        Err(CivicError::Forbidden(_))
    ));
    assert!(matches!(
        h.deliberation.post_comment(&author, &bill_id, "   ", None).await,
        Err(CivicError::InvalidInput(_))
    ));
    assert!(matches!(
        h.deliberation
            .post_comment(&author, &BillId::generate(), "hi", None)
            .await,
        Err(CivicError::NotFound(_))
    ));
    assert!(matches!(
        h.deliberation.thread(&BillId::generate()).await,
        Err(CivicError::NotFound(_))
    ));
}

#[tokio::test]
async fn replies_stop_at_the_depth_limit() {
    let h = Harness::new();
    let author = h.citizen("author", 20).await;
    let bill_id = h
        .lifecycle
        .propose(&author, "Depth Act", "s", "t")
        .await
        .unwrap()
        .bill_id;

    let mut chain = Vec::new();
    let mut parent = None;
    for level in 0..=MAX_REPLY_DEPTH {
        h.clock.advance(Duration::seconds(1));
        let comment = h
            .deliberation
            .post_comment(&author, &bill_id, &format!("level {level}"), parent)
            .await
            .unwrap();
        parent = Some(comment.id);
        chain.push(comment);
    }

    let deepest = chain[MAX_REPLY_DEPTH].id;
    assert!(matches!(
        h.deliberation
            .post_comment(&author, &bill_id, "one too many", Some(deepest))
            .await,
        Err(CivicError::InvalidInput(_))
    ));
    h.deliberation
        .post_comment(&author, &bill_id, "still fine", Some(chain[MAX_REPLY_DEPTH - 1].id))
        .await
        .unwrap();

    let thread = h.deliberation.thread(&bill_id).await.unwrap();
    assert_eq!(thread.total, MAX_REPLY_DEPTH + 2);
    assert_eq!(thread.comments.len(), 1);
}
