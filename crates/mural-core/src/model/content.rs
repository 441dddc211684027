//! Content items: the closed set of things users publish.
//!
//! Posts and comments exist in two parallel domains (user boards and
//! project boards) that share one shape but live in separate tables with
//! independent identity sequences. [`Content`] is the closed sum over all
//! variants plus private messages; the capability layer works against
//! this surface instead of open trait dispatch.

use serde::{Deserialize, Serialize};

use super::{Board, CommentId, Domain, PmId, PostId, UserId};

/// A post on a user or project board.
///
/// `id` is the storage-wide identity within the post's domain; `pid` is
/// the per-board local sequence used in human-facing URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub board_id: i64,
    pub sender_id: UserId,
    pub pid: i64,
    pub body: String,
    pub lang: String,
    pub closed: bool,
    pub created_at_us: i64,
}

/// A comment under a post. `board_id` denormalizes the parent post's
/// board so capability checks need no join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub board_id: i64,
    pub sender_id: UserId,
    pub body: String,
    pub lang: String,
    pub editable: bool,
    pub created_at_us: i64,
}

/// A private message between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub id: PmId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: String,
    pub lang: String,
    pub unread: bool,
    pub created_at_us: i64,
}

/// Immutable snapshot of a content item's body before one edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub rev_no: i64,
    pub body: String,
    pub created_at_us: i64,
}

/// Derived per-peer aggregate over a private-message history. Never a
/// stored row; see `feed::conversations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub peer_id: UserId,
    pub last_body: String,
    pub last_time_us: i64,
    pub unread: bool,
}

/// One row of the cross-domain home timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomePost {
    pub domain: Domain,
    #[serde(flatten)]
    pub post: Post,
}

/// Lightweight reference to a content item, used by mutation entry
/// points that must load the row themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRef {
    UserPost(PostId),
    ProjectPost(PostId),
    UserComment(CommentId),
    ProjectComment(CommentId),
    Private(PmId),
}

impl ContentRef {
    /// The referenced identity.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::UserPost(id)
            | Self::ProjectPost(id)
            | Self::UserComment(id)
            | Self::ProjectComment(id)
            | Self::Private(id) => id,
        }
    }
}

/// A loaded content item: the closed sum over every publishable variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    UserPost(Post),
    ProjectPost(Post),
    UserComment(Comment),
    ProjectComment(Comment),
    Private(PrivateMessage),
}

impl Content {
    /// Identity within the variant's domain.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::UserPost(p) | Self::ProjectPost(p) => p.id,
            Self::UserComment(c) | Self::ProjectComment(c) => c.id,
            Self::Private(pm) => pm.id,
        }
    }

    /// The user who published the item.
    #[must_use]
    pub const fn sender_id(&self) -> UserId {
        match self {
            Self::UserPost(p) | Self::ProjectPost(p) => p.sender_id,
            Self::UserComment(c) | Self::ProjectComment(c) => c.sender_id,
            Self::Private(pm) => pm.sender_id,
        }
    }

    /// The board the item targets; private messages target a user
    /// directly, not a board.
    #[must_use]
    pub const fn board(&self) -> Option<Board> {
        match self {
            Self::UserPost(p) => Some(Board::User(p.board_id)),
            Self::ProjectPost(p) => Some(Board::Project(p.board_id)),
            Self::UserComment(c) => Some(Board::User(c.board_id)),
            Self::ProjectComment(c) => Some(Board::Project(c.board_id)),
            Self::Private(_) => None,
        }
    }

    /// Whether editing is permitted for this item at all. Posts are
    /// always editable, comments carry a flag, private messages never
    /// change once sent.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        match self {
            Self::UserPost(_) | Self::ProjectPost(_) => true,
            Self::UserComment(c) | Self::ProjectComment(c) => c.editable,
            Self::Private(_) => false,
        }
    }

    /// Whether the item refuses new comments. Only posts close.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        match self {
            Self::UserPost(p) | Self::ProjectPost(p) => p.closed,
            Self::UserComment(_) | Self::ProjectComment(_) | Self::Private(_) => false,
        }
    }

    /// Current body text.
    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::UserPost(p) | Self::ProjectPost(p) => &p.body,
            Self::UserComment(c) | Self::ProjectComment(c) => &c.body,
            Self::Private(pm) => &pm.body,
        }
    }

    /// Language tag of the body.
    #[must_use]
    pub fn lang(&self) -> &str {
        match self {
            Self::UserPost(p) | Self::ProjectPost(p) => &p.lang,
            Self::UserComment(c) | Self::ProjectComment(c) => &c.lang,
            Self::Private(pm) => &pm.lang,
        }
    }

    /// View this item as a post, with its domain. Comments and private
    /// messages are not posts.
    #[must_use]
    pub const fn as_post(&self) -> Option<(Domain, &Post)> {
        match self {
            Self::UserPost(p) => Some((Domain::User, p)),
            Self::ProjectPost(p) => Some((Domain::Project, p)),
            Self::UserComment(_) | Self::ProjectComment(_) | Self::Private(_) => None,
        }
    }

    /// Reference form of this item.
    #[must_use]
    pub const fn as_ref(&self) -> ContentRef {
        match self {
            Self::UserPost(p) => ContentRef::UserPost(p.id),
            Self::ProjectPost(p) => ContentRef::ProjectPost(p.id),
            Self::UserComment(c) => ContentRef::UserComment(c.id),
            Self::ProjectComment(c) => ContentRef::ProjectComment(c.id),
            Self::Private(pm) => ContentRef::Private(pm.id),
        }
    }
}
