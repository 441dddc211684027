//! Entity types shared across the engine.
//!
//! Identities are plain signed integers (SQLite rowids); zero is never a
//! valid identity and the capability layer treats it as "item not yet
//! persisted". Post and comment identities are domain-local sequences:
//! a user post and a project post may share the same number.

mod content;

pub use content::{
    Comment, Content, ContentRef, Conversation, HomePost, Post, PrivateMessage, Revision,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// User identity (`users.user_id`).
pub type UserId = i64;
/// Project identity (`projects.project_id`).
pub type ProjectId = i64;
/// Post identity within one content domain (`*_posts.post_id`).
pub type PostId = i64;
/// Comment identity within one content domain (`*_comments.comment_id`).
pub type CommentId = i64;
/// Private-message identity (`private_messages.pm_id`).
pub type PmId = i64;

/// The two parallel content domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Content on a user's board.
    User,
    /// Content on a project's board.
    Project,
}

impl Domain {
    /// Storage discriminator, also used by the `timeline` view.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
        }
    }

    pub(crate) const fn post_table(self) -> &'static str {
        match self {
            Self::User => "user_posts",
            Self::Project => "project_posts",
        }
    }

    pub(crate) const fn comment_table(self) -> &'static str {
        match self {
            Self::User => "user_comments",
            Self::Project => "project_comments",
        }
    }

    pub(crate) const fn post_revision_table(self) -> &'static str {
        match self {
            Self::User => "user_post_revisions",
            Self::Project => "project_post_revisions",
        }
    }

    pub(crate) const fn comment_revision_table(self) -> &'static str {
        match self {
            Self::User => "user_comment_revisions",
            Self::Project => "project_comment_revisions",
        }
    }

    pub(crate) const fn post_vote_table(self) -> &'static str {
        match self {
            Self::User => "user_post_votes",
            Self::Project => "project_post_votes",
        }
    }

    pub(crate) const fn comment_vote_table(self) -> &'static str {
        match self {
            Self::User => "user_comment_votes",
            Self::Project => "project_comment_votes",
        }
    }

    pub(crate) const fn bookmark_table(self) -> &'static str {
        match self {
            Self::User => "user_post_bookmarks",
            Self::Project => "project_post_bookmarks",
        }
    }

    pub(crate) const fn lurk_table(self) -> &'static str {
        match self {
            Self::User => "user_post_lurks",
            Self::Project => "project_post_lurks",
        }
    }

    pub(crate) const fn lock_table(self) -> &'static str {
        match self {
            Self::User => "user_post_locks",
            Self::Project => "project_post_locks",
        }
    }

    pub(crate) const fn pair_lock_table(self) -> &'static str {
        match self {
            Self::User => "user_post_pair_locks",
            Self::Project => "project_post_pair_locks",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a content wall: a user's or a project's board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "domain", content = "id")]
pub enum Board {
    User(UserId),
    Project(ProjectId),
}

impl Board {
    /// Numeric identity of the board within its domain.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::User(id) | Self::Project(id) => id,
        }
    }

    /// The content domain this board belongs to.
    #[must_use]
    pub const fn domain(self) -> Domain {
        match self {
            Self::User(_) => Domain::User,
            Self::Project(_) => Domain::Project,
        }
    }
}

/// A registered user (`users` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Preferred language, the submission fallback.
    pub lang: String,
    /// Language the user's own board defaults to.
    pub board_lang: String,
    pub private: bool,
    /// Last observed activity, microseconds since the Unix epoch.
    pub last_seen_at_us: i64,
    pub created_at_us: i64,
}

/// A project board (`projects` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Whether the board is readable by non-members.
    pub visible: bool,
    /// Whether non-members may post.
    pub open: bool,
    pub private: bool,
    pub created_at_us: i64,
}
