//! Capability evaluation and per-item annotation.
//!
//! Pure reads of (viewer, content item): what the viewer may do to the
//! item, plus the aggregate counters shown next to it. The blacklist
//! direction differs on purpose between `can_see` (board owner
//! blacklisted the viewer) and `can_comment` (the item's sender
//! blacklisted the viewer) — both model "may this person reach me", the
//! opposite of feed visibility's "do I want to see this board".

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    Board, CommentId, Content, ContentRef, Domain, Post, PostId, Revision, UserId,
};
use crate::relations;

// ---------------------------------------------------------------------------
// Content loading
// ---------------------------------------------------------------------------

fn load_post(conn: &Connection, domain: Domain, id: PostId) -> Result<Post> {
    let sql = format!(
        "SELECT post_id, board_id, sender_id, pid, body, lang, closed, created_at_us
         FROM {} WHERE post_id = ?1",
        domain.post_table()
    );
    conn.query_row(&sql, params![id], |row| {
        Ok(Post {
            id: row.get(0)?,
            board_id: row.get(1)?,
            sender_id: row.get(2)?,
            pid: row.get(3)?,
            body: row.get(4)?,
            lang: row.get(5)?,
            closed: row.get(6)?,
            created_at_us: row.get(7)?,
        })
    })
    .optional()?
    .ok_or(Error::NotFound("post"))
}

fn load_comment(conn: &Connection, domain: Domain, id: CommentId) -> Result<crate::model::Comment> {
    let sql = format!(
        "SELECT comment_id, post_id, board_id, sender_id, body, lang, editable, created_at_us
         FROM {} WHERE comment_id = ?1",
        domain.comment_table()
    );
    conn.query_row(&sql, params![id], |row| {
        Ok(crate::model::Comment {
            id: row.get(0)?,
            post_id: row.get(1)?,
            board_id: row.get(2)?,
            sender_id: row.get(3)?,
            body: row.get(4)?,
            lang: row.get(5)?,
            editable: row.get(6)?,
            created_at_us: row.get(7)?,
        })
    })
    .optional()?
    .ok_or(Error::NotFound("comment"))
}

fn load_pm(conn: &Connection, id: i64) -> Result<crate::model::PrivateMessage> {
    conn.query_row(
        "SELECT pm_id, sender_id, recipient_id, body, lang, unread, created_at_us
         FROM private_messages WHERE pm_id = ?1",
        params![id],
        |row| {
            Ok(crate::model::PrivateMessage {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                recipient_id: row.get(2)?,
                body: row.get(3)?,
                lang: row.get(4)?,
                unread: row.get(5)?,
                created_at_us: row.get(6)?,
            })
        },
    )
    .optional()?
    .ok_or(Error::NotFound("message"))
}

/// Load the content item a reference points at.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the referenced row does not exist.
pub fn load(conn: &Connection, target: ContentRef) -> Result<Content> {
    match target {
        ContentRef::UserPost(id) => load_post(conn, Domain::User, id).map(Content::UserPost),
        ContentRef::ProjectPost(id) => {
            load_post(conn, Domain::Project, id).map(Content::ProjectPost)
        }
        ContentRef::UserComment(id) => {
            load_comment(conn, Domain::User, id).map(Content::UserComment)
        }
        ContentRef::ProjectComment(id) => {
            load_comment(conn, Domain::Project, id).map(Content::ProjectComment)
        }
        ContentRef::Private(id) => load_pm(conn, id).map(Content::Private),
    }
}

// ---------------------------------------------------------------------------
// Owner sets
// ---------------------------------------------------------------------------

/// The users who may act on an item: {sender, board owner} on a user
/// board, {sender} plus the project's owners on a project board, both
/// participants for a private message.
///
/// # Errors
///
/// Returns an error if the owner query fails.
pub fn owner_set(conn: &Connection, item: &Content) -> Result<Vec<UserId>> {
    match item {
        Content::UserPost(p) => Ok(vec![p.sender_id, p.board_id]),
        Content::UserComment(c) => Ok(vec![c.sender_id, c.board_id]),
        Content::ProjectPost(Post {
            sender_id,
            board_id,
            ..
        })
        | Content::ProjectComment(crate::model::Comment {
            sender_id,
            board_id,
            ..
        }) => {
            let mut owners = vec![*sender_id];
            for owner in relations::owner_ids(conn, *board_id)? {
                if !owners.contains(&owner) {
                    owners.push(owner);
                }
            }
            Ok(owners)
        }
        Content::Private(pm) => Ok(vec![pm.sender_id, pm.recipient_id]),
    }
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

/// Whether `viewer` may edit the item: persisted, editable, owned.
///
/// # Errors
///
/// Returns an error if the owner query fails.
pub fn can_edit(conn: &Connection, viewer: UserId, item: &Content) -> Result<bool> {
    Ok(item.id() > 0 && item.is_editable() && owner_set(conn, item)?.contains(&viewer))
}

/// Whether `viewer` may delete the item: persisted and owned.
/// Editability is not required — owners always keep deletion.
///
/// # Errors
///
/// Returns an error if the owner query fails.
pub fn can_delete(conn: &Connection, viewer: UserId, item: &Content) -> Result<bool> {
    Ok(item.id() > 0 && owner_set(conn, item)?.contains(&viewer))
}

fn has_marker(
    conn: &Connection,
    table: &str,
    post_id: PostId,
    user: UserId,
) -> rusqlite::Result<bool> {
    conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE post_id = ?1 AND user_id = ?2)"),
        params![post_id, user],
        |row| row.get(0),
    )
}

/// Whether `viewer` may bookmark the item: a persisted post they have
/// not bookmarked yet. Only posts are bookmarkable.
///
/// # Errors
///
/// Returns an error if the marker query fails.
pub fn can_bookmark(conn: &Connection, viewer: UserId, item: &Content) -> Result<bool> {
    let Some((domain, post)) = item.as_post() else {
        return Ok(false);
    };
    Ok(post.id > 0 && !has_marker(conn, domain.bookmark_table(), post.id, viewer)?)
}

/// Whether `viewer` may lurk the item: a persisted post they are not
/// already lurking. Only posts are lurkable.
///
/// # Errors
///
/// Returns an error if the marker query fails.
pub fn can_lurk(conn: &Connection, viewer: UserId, item: &Content) -> Result<bool> {
    let Some((domain, post)) = item.as_post() else {
        return Ok(false);
    };
    Ok(post.id > 0 && !has_marker(conn, domain.lurk_table(), post.id, viewer)?)
}

/// Whether `viewer` may comment under the item: an open, persisted post
/// whose sender has not blacklisted the viewer. Note the direction:
/// sender → viewer, the opposite of board visibility.
///
/// # Errors
///
/// Returns an error if the blacklist query fails.
pub fn can_comment(conn: &Connection, viewer: UserId, item: &Content) -> Result<bool> {
    let Some((_, post)) = item.as_post() else {
        return Ok(false);
    };
    Ok(post.id > 0
        && !post.closed
        && !relations::has_blacklisted(conn, post.sender_id, viewer)?)
}

/// Whether `viewer` may see a board at all. User board: its owner has
/// not blacklisted the viewer. Project board: visible, or the viewer is
/// an owner or member.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the board does not exist.
pub fn can_see(conn: &Connection, viewer: UserId, board: Board) -> Result<bool> {
    match board {
        Board::User(owner) => {
            if !relations::user_exists(conn, owner)? {
                return Err(Error::NotFound("user"));
            }
            Ok(!relations::has_blacklisted(conn, owner, viewer)?)
        }
        Board::Project(id) => {
            let project = relations::get_project(conn, id)?;
            if project.visible {
                return Ok(true);
            }
            Ok(relations::is_owner(conn, id, viewer)? || relations::is_member(conn, id, viewer)?)
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate counters
// ---------------------------------------------------------------------------

/// Sum of signed vote values for a post or comment; 0 with no votes.
/// Private messages have no votes.
///
/// # Errors
///
/// Returns an error if the aggregate query fails.
pub fn vote_score(conn: &Connection, item: &Content) -> Result<i64> {
    let (table, column, id) = match item {
        Content::UserPost(p) => (Domain::User.post_vote_table(), "post_id", p.id),
        Content::ProjectPost(p) => (Domain::Project.post_vote_table(), "post_id", p.id),
        Content::UserComment(c) => (Domain::User.comment_vote_table(), "comment_id", c.id),
        Content::ProjectComment(c) => (Domain::Project.comment_vote_table(), "comment_id", c.id),
        Content::Private(_) => return Ok(0),
    };
    let score: i64 = conn.query_row(
        &format!("SELECT COALESCE(SUM(value), 0) FROM {table} WHERE {column} = ?1"),
        params![id],
        |row| row.get(0),
    )?;
    Ok(score)
}

fn count_rows(conn: &Connection, table: &str, column: &str, id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1"),
        params![id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Number of comments under a post.
///
/// # Errors
///
/// Returns an error if the count query fails.
pub fn comment_count(conn: &Connection, domain: Domain, post_id: PostId) -> Result<i64> {
    count_rows(conn, domain.comment_table(), "post_id", post_id)
}

/// Number of users who bookmarked a post.
///
/// # Errors
///
/// Returns an error if the count query fails.
pub fn bookmark_count(conn: &Connection, domain: Domain, post_id: PostId) -> Result<i64> {
    count_rows(conn, domain.bookmark_table(), "post_id", post_id)
}

/// Number of users lurking a post.
///
/// # Errors
///
/// Returns an error if the count query fails.
pub fn lurker_count(conn: &Connection, domain: Domain, post_id: PostId) -> Result<i64> {
    count_rows(conn, domain.lurk_table(), "post_id", post_id)
}

// ---------------------------------------------------------------------------
// Revisions
// ---------------------------------------------------------------------------

fn list_revisions(conn: &Connection, table: &str, column: &str, id: i64) -> Result<Vec<Revision>> {
    let sql = format!(
        "SELECT rev_no, body, created_at_us FROM {table} WHERE {column} = ?1 ORDER BY rev_no ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![id], |row| {
        Ok(Revision {
            rev_no: row.get(0)?,
            body: row.get(1)?,
            created_at_us: row.get(2)?,
        })
    })?;
    let mut revisions = Vec::new();
    for row in rows {
        revisions.push(row?);
    }
    Ok(revisions)
}

/// Prior bodies of a post, ascending by revision number.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn post_revisions(conn: &Connection, domain: Domain, post_id: PostId) -> Result<Vec<Revision>> {
    list_revisions(conn, domain.post_revision_table(), "post_id", post_id)
}

/// Prior bodies of a comment, ascending by revision number.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn comment_revisions(
    conn: &Connection,
    domain: Domain,
    comment_id: CommentId,
) -> Result<Vec<Revision>> {
    list_revisions(conn, domain.comment_revision_table(), "comment_id", comment_id)
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// The viewer's action flags for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub edit: bool,
    pub delete: bool,
    pub bookmark: bool,
    pub lurk: bool,
    pub comment: bool,
}

/// A post with its counters and the viewer's capability flags — the
/// viewer-facing feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedPost {
    pub domain: Domain,
    #[serde(flatten)]
    pub post: Post,
    pub score: i64,
    pub comments: i64,
    pub bookmarks: i64,
    pub lurkers: i64,
    pub capabilities: Capabilities,
}

/// Annotate one post for a viewer: counters plus capability flags.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the post does not exist.
pub fn annotate_post(
    conn: &Connection,
    viewer: UserId,
    domain: Domain,
    post_id: PostId,
) -> Result<AnnotatedPost> {
    let item = match domain {
        Domain::User => Content::UserPost(load_post(conn, domain, post_id)?),
        Domain::Project => Content::ProjectPost(load_post(conn, domain, post_id)?),
    };

    let capabilities = Capabilities {
        edit: can_edit(conn, viewer, &item)?,
        delete: can_delete(conn, viewer, &item)?,
        bookmark: can_bookmark(conn, viewer, &item)?,
        lurk: can_lurk(conn, viewer, &item)?,
        comment: can_comment(conn, viewer, &item)?,
    };
    let score = vote_score(conn, &item)?;

    let (Content::UserPost(post) | Content::ProjectPost(post)) = item else {
        return Err(Error::NotFound("post"));
    };

    Ok(AnnotatedPost {
        domain,
        score,
        comments: comment_count(conn, domain, post_id)?,
        bookmarks: bookmark_count(conn, domain, post_id)?,
        lurkers: lurker_count(conn, domain, post_id)?,
        capabilities,
        post,
    })
}
