//! Timestamp derivations over raw API objects.
//!
//! Every function here is pure: the same reviews and timeline always yield the
//! same timestamps.

use crate::github::{RawComment, RawCommit, RawPullRequest, RawReview, RawTimelineEvent};
use crate::types::{
    Comment, CommentKind, CommentSummary, PullRequestMeta, ReviewEvent, ReviewState, TimelineEvent,
};
use chrono::{DateTime, Utc};

const READY_EVENTS: [&str; 2] = ["ready_for_review", "review_requested"];

/// When the pull request became reviewable.
///
/// Non-draft PRs are ready at creation. Drafts take the first
/// `ready_for_review` or `review_requested` event in timeline order, and fall
/// back to creation time when neither appears.
pub fn ready_for_review_at(
    pr: &RawPullRequest,
    timeline: &[RawTimelineEvent],
) -> Option<DateTime<Utc>> {
    if !pr.is_draft() {
        return pr.created_at;
    }

    timeline
        .iter()
        .find(|event| {
            event
                .event
                .as_deref()
                .is_some_and(|kind| READY_EVENTS.contains(&kind))
        })
        .map_or(pr.created_at, |event| event.created_at)
}

/// Earliest submission among approving reviews.
pub fn first_approval_at(reviews: &[RawReview]) -> Option<DateTime<Utc>> {
    reviews
        .iter()
        .filter(|r| r.state == ReviewState::Approved)
        .filter_map(|r| r.submitted_at)
        .min()
}

/// Earliest review that says something: a change request, a comment, or an
/// approval with a body.
pub fn first_review_at(reviews: &[RawReview]) -> Option<DateTime<Utc>> {
    reviews
        .iter()
        .filter(|r| is_substantive(r))
        .filter_map(|r| r.submitted_at)
        .min()
}

fn is_substantive(review: &RawReview) -> bool {
    match review.state {
        ReviewState::ChangesRequested | ReviewState::Commented => true,
        ReviewState::Approved => review.has_body(),
        ReviewState::Other => false,
    }
}

pub fn project_pull_request(pr: &RawPullRequest) -> PullRequestMeta {
    PullRequestMeta {
        number: pr.number,
        title: pr.title.clone(),
        author: pr.author_login().map(str::to_string),
        draft: pr.is_draft(),
        created_at: pr.created_at,
        updated_at: pr.updated_at,
        closed_at: pr.closed_at,
        merged_at: pr.merged_at,
    }
}

pub fn project_review(review: &RawReview) -> ReviewEvent {
    ReviewEvent {
        state: review.state,
        created_at: review.submitted_at,
        author: review.user.as_ref().map(|u| u.login.clone()),
    }
}

/// Reduces a timeline item to kind, actor and time.
///
/// `committed` items carry no actor or `created_at`; their git author name
/// and date stand in.
pub fn project_timeline_event(event: &RawTimelineEvent) -> TimelineEvent {
    let git_author = event.author.as_ref();
    TimelineEvent {
        event: event.event.clone(),
        author: event
            .actor
            .as_ref()
            .map(|a| a.login.clone())
            .or_else(|| git_author.and_then(|a| a.name.clone())),
        created_at: event
            .created_at
            .or_else(|| git_author.and_then(|a| a.date)),
    }
}

/// Gathers comments left by anyone other than the PR author, oldest first.
pub fn collect_comments(
    pr_author: Option<&str>,
    reviews: &[RawReview],
    review_comments: &[RawComment],
    issue_comments: &[RawComment],
) -> CommentSummary {
    let by_other = |login: &str| pr_author != Some(login);

    let mut comments: Vec<Comment> = Vec::new();

    let plain = review_comments
        .iter()
        .map(|c| (CommentKind::ReviewComment, c))
        .chain(issue_comments.iter().map(|c| (CommentKind::IssueComment, c)));
    for (kind, comment) in plain {
        let Some(user) = &comment.user else { continue };
        if by_other(&user.login) {
            comments.push(Comment {
                timestamp: comment.created_at,
                kind,
                author: user.login.clone(),
                comment_id: comment.id.to_string(),
            });
        }
    }

    for review in reviews.iter().filter(|r| r.has_body()) {
        let (Some(user), Some(submitted_at)) = (&review.user, review.submitted_at) else {
            continue;
        };
        if by_other(&user.login) {
            comments.push(Comment {
                timestamp: submitted_at,
                kind: CommentKind::ReviewSummary,
                author: user.login.clone(),
                comment_id: review.id.to_string(),
            });
        }
    }

    comments.sort_by_key(|c| c.timestamp);

    CommentSummary {
        total_comments: comments.len(),
        comments,
    }
}

/// Author dates of the non-merge commits, sorted.
pub fn update_timestamps(commits: &[RawCommit]) -> Vec<DateTime<Utc>> {
    let mut timestamps: Vec<DateTime<Utc>> = commits
        .iter()
        .filter(|c| c.parents.len() <= 1)
        .filter_map(|c| c.commit.author.as_ref().and_then(|a| a.date))
        .collect();
    timestamps.sort();
    timestamps
}
