//! Per-response scoring rule shared by both fan-out levels

use crate::site::{CommentNode, ResponseScore};

/// Scores one comment or reply response
///
/// Comments arrive sorted by like-count descending, so accumulation stops at
/// the first comment with no likes. Every comment that has replies is still
/// reported, including those past the cut-off, so its replies get fetched.
pub fn score_comments(comments: &[CommentNode]) -> ResponseScore {
    let score = comments
        .iter()
        .map(|comment| comment.like_count)
        .take_while(|&likes| likes != 0)
        .sum();

    let replies = comments
        .iter()
        .filter(|comment| comment.reply_count > 0 && !comment.comment_id.is_empty())
        .map(|comment| (comment.comment_id.clone(), comment.reply_count))
        .collect();

    ResponseScore { score, replies }
}
