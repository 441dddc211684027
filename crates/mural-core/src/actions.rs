//! Mutation entry points: submit, edit, delete, vote, markers, graph
//! edges and private messages.
//!
//! Every operation that needs a permission gate goes through the
//! capability evaluator and returns a typed failure when refused.
//! Single logical mutations are single SQL statements (vote upsert,
//! marker insert/delete); the only compound mutation, edit, wraps its
//! revision append and body update in one transaction so a failure
//! leaves stored state untouched.

use rusqlite::{Connection, params};
use tracing::debug;

use crate::capability;
use crate::db::now_us;
use crate::error::{Error, Result};
use crate::language;
use crate::model::{
    Board, Comment, Content, ContentRef, Domain, Post, PostId, PrivateMessage, UserId,
};
use crate::relations;

/// Body and optional language for a submission or an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub body: String,
    /// Explicit language tag; `None` falls back (to the sender's
    /// preference on submit, to the item's current language on edit).
    pub lang: Option<String>,
}

/// HTML-entity escaping applied to every stored body before insert.
fn escape_body(body: &str) -> String {
    let mut escaped = String::with_capacity(body.len());
    for ch in body.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Shared submit-path population: body required, language resolved
/// against `default_lang`, body escaped. Runs before any write.
fn prepare_body(draft: &Draft, default_lang: &str) -> Result<(String, String)> {
    if draft.body.trim().is_empty() {
        return Err(Error::InvalidArgument("empty body".into()));
    }
    let lang = language::resolve(draft.lang.as_deref().unwrap_or(""), default_lang)?;
    Ok((escape_body(&draft.body), lang))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// Publish a post on a board.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for a missing sender or board,
/// [`Error::Forbidden`] when the board is not writable for the sender,
/// [`Error::InvalidArgument`] for an empty body or unsupported language.
pub fn submit_post(
    conn: &Connection,
    sender: UserId,
    board: Board,
    draft: &Draft,
) -> Result<Post> {
    let sender_row = relations::get_user(conn, sender)?;
    let (body, lang) = prepare_body(draft, &sender_row.lang)?;

    match board {
        Board::User(owner) => {
            if !relations::user_exists(conn, owner)? {
                return Err(Error::NotFound("user"));
            }
            if relations::has_blacklisted(conn, owner, sender)? {
                return Err(Error::Forbidden("the board owner has blacklisted you"));
            }
        }
        Board::Project(id) => {
            let project = relations::get_project(conn, id)?;
            let insider = relations::is_owner(conn, id, sender)?
                || relations::is_member(conn, id, sender)?;
            if !insider && !(project.visible && project.open) {
                return Err(Error::Forbidden("project board is closed to non-members"));
            }
        }
    }

    let table = board.domain().post_table();
    conn.execute(
        &format!(
            "INSERT INTO {table} (board_id, sender_id, pid, body, lang, created_at_us)
             VALUES (?1, ?2,
                     (SELECT COALESCE(MAX(pid), 0) + 1 FROM {table} WHERE board_id = ?1),
                     ?3, ?4, ?5)"
        ),
        params![board.id(), sender, body, lang, now_us()],
    )?;
    let id = conn.last_insert_rowid();
    debug!(sender, board = board.id(), post = id, "post submitted");

    let target = match board.domain() {
        Domain::User => ContentRef::UserPost(id),
        Domain::Project => ContentRef::ProjectPost(id),
    };
    let (Content::UserPost(post) | Content::ProjectPost(post)) = capability::load(conn, target)?
    else {
        return Err(Error::NotFound("post"));
    };
    Ok(post)
}

/// Publish a comment under a post.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for a missing sender or post,
/// [`Error::Forbidden`] when the post is closed or its sender
/// blacklisted the commenter, [`Error::InvalidArgument`] for an empty
/// body or unsupported language.
pub fn submit_comment(
    conn: &Connection,
    sender: UserId,
    domain: Domain,
    post_id: PostId,
    draft: &Draft,
) -> Result<Comment> {
    let sender_row = relations::get_user(conn, sender)?;
    let (body, lang) = prepare_body(draft, &sender_row.lang)?;

    let post_ref = match domain {
        Domain::User => ContentRef::UserPost(post_id),
        Domain::Project => ContentRef::ProjectPost(post_id),
    };
    let post_item = capability::load(conn, post_ref)?;
    if !capability::can_comment(conn, sender, &post_item)? {
        return Err(Error::Forbidden("commenting on this post is not allowed"));
    }

    let table = domain.comment_table();
    conn.execute(
        &format!(
            "INSERT INTO {table} (post_id, board_id, sender_id, body, lang, created_at_us)
             VALUES (?1, (SELECT board_id FROM {posts} WHERE post_id = ?1), ?2, ?3, ?4, ?5)",
            posts = domain.post_table()
        ),
        params![post_id, sender, body, lang, now_us()],
    )?;
    let id = conn.last_insert_rowid();

    let target = match domain {
        Domain::User => ContentRef::UserComment(id),
        Domain::Project => ContentRef::ProjectComment(id),
    };
    let (Content::UserComment(comment) | Content::ProjectComment(comment)) =
        capability::load(conn, target)?
    else {
        return Err(Error::NotFound("comment"));
    };
    Ok(comment)
}

/// Send a private message.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a self-addressed message,
/// [`Error::NotFound`] for a missing participant, [`Error::Forbidden`]
/// when the recipient has blacklisted the sender.
pub fn send_private_message(
    conn: &Connection,
    sender: UserId,
    recipient: UserId,
    draft: &Draft,
) -> Result<PrivateMessage> {
    if sender == recipient {
        return Err(Error::InvalidArgument(
            "cannot send a message to yourself".into(),
        ));
    }
    let sender_row = relations::get_user(conn, sender)?;
    if !relations::user_exists(conn, recipient)? {
        return Err(Error::NotFound("user"));
    }
    if relations::has_blacklisted(conn, recipient, sender)? {
        return Err(Error::Forbidden("the recipient has blacklisted you"));
    }
    let (body, lang) = prepare_body(draft, &sender_row.lang)?;

    conn.execute(
        "INSERT INTO private_messages (sender_id, recipient_id, body, lang, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![sender, recipient, body, lang, now_us()],
    )?;

    let Content::Private(pm) =
        capability::load(conn, ContentRef::Private(conn.last_insert_rowid()))?
    else {
        return Err(Error::NotFound("message"));
    };
    Ok(pm)
}

// ---------------------------------------------------------------------------
// Edit & delete
// ---------------------------------------------------------------------------

/// Edit a content item: re-runs the submit sanitization path, appends a
/// revision holding the pre-edit body, and updates the row, atomically.
/// Validation failures return before the first write, so a failed edit
/// is an idempotent no-op on stored state.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for a missing item, [`Error::Forbidden`]
/// when the editor lacks edit rights, [`Error::InvalidArgument`] for an
/// empty body or unsupported language.
pub fn edit(
    conn: &Connection,
    editor: UserId,
    target: ContentRef,
    draft: &Draft,
) -> Result<Content> {
    let item = capability::load(conn, target)?;
    if !capability::can_edit(conn, editor, &item)? {
        return Err(Error::Forbidden("editing this item is not allowed"));
    }

    // All validation happens before the first write.
    let (body, lang) = prepare_body(draft, item.lang())?;

    let (table, id_column, rev_table) = match target {
        ContentRef::UserPost(_) => ("user_posts", "post_id", "user_post_revisions"),
        ContentRef::ProjectPost(_) => ("project_posts", "post_id", "project_post_revisions"),
        ContentRef::UserComment(_) => ("user_comments", "comment_id", "user_comment_revisions"),
        ContentRef::ProjectComment(_) => {
            ("project_comments", "comment_id", "project_comment_revisions")
        }
        // Unreachable in practice: private messages are never editable.
        ContentRef::Private(_) => {
            return Err(Error::Forbidden("editing this item is not allowed"));
        }
    };

    conn.execute_batch("BEGIN IMMEDIATE")?;
    let applied = conn
        .execute(
            &format!(
                "INSERT INTO {rev_table} ({id_column}, rev_no, body, created_at_us)
                 VALUES (?1,
                         (SELECT COALESCE(MAX(rev_no), 0) + 1
                          FROM {rev_table} WHERE {id_column} = ?1),
                         ?2, ?3)"
            ),
            params![item.id(), item.body(), now_us()],
        )
        .and_then(|_| {
            conn.execute(
                &format!("UPDATE {table} SET body = ?1, lang = ?2 WHERE {id_column} = ?3"),
                params![body, lang, item.id()],
            )
        });

    match applied {
        Ok(_) => {
            conn.execute_batch("COMMIT")?;
            debug!(editor, id = item.id(), "item edited");
            capability::load(conn, target)
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK")?;
            Err(e.into())
        }
    }
}

/// Delete a content item. Relation rows (votes, markers, revisions,
/// comments) are removed by the store's cascades.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for a missing item, [`Error::Forbidden`]
/// when the actor is not in the item's owner set.
pub fn delete(conn: &Connection, actor: UserId, target: ContentRef) -> Result<()> {
    let item = capability::load(conn, target)?;
    if !capability::can_delete(conn, actor, &item)? {
        return Err(Error::Forbidden("deleting this item is not allowed"));
    }

    let (table, id_column) = match target {
        ContentRef::UserPost(_) => ("user_posts", "post_id"),
        ContentRef::ProjectPost(_) => ("project_posts", "post_id"),
        ContentRef::UserComment(_) => ("user_comments", "comment_id"),
        ContentRef::ProjectComment(_) => ("project_comments", "comment_id"),
        ContentRef::Private(_) => ("private_messages", "pm_id"),
    };
    conn.execute(
        &format!("DELETE FROM {table} WHERE {id_column} = ?1"),
        params![item.id()],
    )?;
    debug!(actor, id = item.id(), "item deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

/// Cast a vote on a post or comment. Any positive value normalizes to
/// +1, any negative to −1; zero withdraws the existing vote. Casting is
/// a single upsert keyed on the (item, voter) pair.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for a missing voter or item,
/// [`Error::InvalidArgument`] when the target is a private message.
pub fn vote(conn: &Connection, voter: UserId, target: ContentRef, value: i8) -> Result<i8> {
    if !relations::user_exists(conn, voter)? {
        return Err(Error::NotFound("user"));
    }
    let item = capability::load(conn, target)?;
    let (table, column) = match &item {
        Content::UserPost(_) => (Domain::User.post_vote_table(), "post_id"),
        Content::ProjectPost(_) => (Domain::Project.post_vote_table(), "post_id"),
        Content::UserComment(_) => (Domain::User.comment_vote_table(), "comment_id"),
        Content::ProjectComment(_) => (Domain::Project.comment_vote_table(), "comment_id"),
        Content::Private(_) => {
            return Err(Error::InvalidArgument(
                "private messages cannot be voted on".into(),
            ));
        }
    };

    let normalized = value.signum();
    if normalized == 0 {
        conn.execute(
            &format!("DELETE FROM {table} WHERE {column} = ?1 AND voter_id = ?2"),
            params![item.id(), voter],
        )?;
        return Ok(0);
    }

    conn.execute(
        &format!(
            "INSERT INTO {table} ({column}, voter_id, value, created_at_us)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT({column}, voter_id)
             DO UPDATE SET value = excluded.value, created_at_us = excluded.created_at_us"
        ),
        params![item.id(), voter, i64::from(normalized), now_us()],
    )?;
    Ok(normalized)
}

// ---------------------------------------------------------------------------
// Markers: bookmarks, lurks, locks
// ---------------------------------------------------------------------------

fn require_post(conn: &Connection, domain: Domain, post_id: PostId) -> Result<()> {
    let exists: bool = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE post_id = ?1)",
            domain.post_table()
        ),
        params![post_id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(Error::NotFound("post"))
    }
}

fn insert_marker(
    conn: &Connection,
    table: &str,
    domain: Domain,
    post_id: PostId,
    user: UserId,
    what: &'static str,
) -> Result<()> {
    require_post(conn, domain, post_id)?;
    if !relations::user_exists(conn, user)? {
        return Err(Error::NotFound("user"));
    }
    conn.execute(
        &format!("INSERT INTO {table} (post_id, user_id, created_at_us) VALUES (?1, ?2, ?3)"),
        params![post_id, user, now_us()],
    )
    .map_err(|e| Error::conflict_on_unique(e, what))?;
    Ok(())
}

fn delete_marker(conn: &Connection, table: &str, post_id: PostId, user: UserId) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE post_id = ?1 AND user_id = ?2"),
        params![post_id, user],
    )?;
    Ok(())
}

/// Bookmark a post.
///
/// # Errors
///
/// Returns [`Error::Conflict`] if the bookmark already exists,
/// [`Error::NotFound`] for a missing post or user.
pub fn bookmark(conn: &Connection, user: UserId, domain: Domain, post_id: PostId) -> Result<()> {
    insert_marker(conn, domain.bookmark_table(), domain, post_id, user, "bookmark")
}

/// Remove a bookmark. Removing an absent bookmark is a no-op, not an
/// error.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn unbookmark(conn: &Connection, user: UserId, domain: Domain, post_id: PostId) -> Result<()> {
    delete_marker(conn, domain.bookmark_table(), post_id, user)
}

/// Lurk a post (passive watching).
///
/// # Errors
///
/// Returns [`Error::Conflict`] if the lurk already exists,
/// [`Error::NotFound`] for a missing post or user.
pub fn lurk(conn: &Connection, user: UserId, domain: Domain, post_id: PostId) -> Result<()> {
    insert_marker(conn, domain.lurk_table(), domain, post_id, user, "lurk")
}

/// Stop lurking a post. A no-op when not lurking.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn unlurk(conn: &Connection, user: UserId, domain: Domain, post_id: PostId) -> Result<()> {
    delete_marker(conn, domain.lurk_table(), post_id, user)
}

/// Suppress notifications on a post: for the whole post when `targets`
/// is empty, otherwise from each listed user individually.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a self-referential target,
/// [`Error::Conflict`] for an existing lock, [`Error::NotFound`] for a
/// missing post or user.
pub fn lock(
    conn: &Connection,
    user: UserId,
    domain: Domain,
    post_id: PostId,
    targets: &[UserId],
) -> Result<()> {
    if targets.is_empty() {
        return insert_marker(conn, domain.lock_table(), domain, post_id, user, "lock");
    }

    require_post(conn, domain, post_id)?;
    let table = domain.pair_lock_table();
    for &target in targets {
        if target == user {
            return Err(Error::InvalidArgument(
                "cannot lock notifications from yourself".into(),
            ));
        }
        if !relations::user_exists(conn, target)? {
            return Err(Error::NotFound("user"));
        }
        conn.execute(
            &format!(
                "INSERT INTO {table} (post_id, source_id, target_id, created_at_us)
                 VALUES (?1, ?2, ?3, ?4)"
            ),
            params![post_id, user, target, now_us()],
        )
        .map_err(|e| Error::conflict_on_unique(e, "lock"))?;
    }
    Ok(())
}

/// Release notification locks; the whole-post lock when `targets` is
/// empty, otherwise each listed pair lock. Absent locks are no-ops.
///
/// # Errors
///
/// Returns an error if a delete fails.
pub fn unlock(
    conn: &Connection,
    user: UserId,
    domain: Domain,
    post_id: PostId,
    targets: &[UserId],
) -> Result<()> {
    if targets.is_empty() {
        return delete_marker(conn, domain.lock_table(), post_id, user);
    }
    let table = domain.pair_lock_table();
    for &target in targets {
        conn.execute(
            &format!("DELETE FROM {table} WHERE post_id = ?1 AND source_id = ?2 AND target_id = ?3"),
            params![post_id, user, target],
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Graph edges: follow, blacklist, whitelist
// ---------------------------------------------------------------------------

/// Follow a user or project board.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a self-follow,
/// [`Error::NotFound`] for a missing board, [`Error::Conflict`] for a
/// duplicate follow.
pub fn follow(conn: &Connection, user: UserId, board: Board) -> Result<()> {
    if !relations::user_exists(conn, user)? {
        return Err(Error::NotFound("user"));
    }
    match board {
        Board::User(target) => {
            if target == user {
                return Err(Error::InvalidArgument("cannot follow yourself".into()));
            }
            if !relations::user_exists(conn, target)? {
                return Err(Error::NotFound("user"));
            }
            conn.execute(
                "INSERT INTO user_follows (source_id, target_id, created_at_us)
                 VALUES (?1, ?2, ?3)",
                params![user, target, now_us()],
            )
            .map_err(|e| Error::conflict_on_unique(e, "follow"))?;
        }
        Board::Project(project) => {
            if !relations::project_exists(conn, project)? {
                return Err(Error::NotFound("project"));
            }
            conn.execute(
                "INSERT INTO project_follows (source_id, project_id, created_at_us)
                 VALUES (?1, ?2, ?3)",
                params![user, project, now_us()],
            )
            .map_err(|e| Error::conflict_on_unique(e, "follow"))?;
        }
    }
    Ok(())
}

/// Stop following a board. A no-op when not following.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn unfollow(conn: &Connection, user: UserId, board: Board) -> Result<()> {
    match board {
        Board::User(target) => {
            conn.execute(
                "DELETE FROM user_follows WHERE source_id = ?1 AND target_id = ?2",
                params![user, target],
            )?;
        }
        Board::Project(project) => {
            conn.execute(
                "DELETE FROM project_follows WHERE source_id = ?1 AND project_id = ?2",
                params![user, project],
            )?;
        }
    }
    Ok(())
}

/// Blacklist another user, with a motivation.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a self-blacklist,
/// [`Error::NotFound`] for a missing user, [`Error::Conflict`] for a
/// duplicate entry.
pub fn blacklist(conn: &Connection, user: UserId, target: UserId, reason: &str) -> Result<()> {
    if target == user {
        return Err(Error::InvalidArgument("cannot blacklist yourself".into()));
    }
    if !relations::user_exists(conn, user)? || !relations::user_exists(conn, target)? {
        return Err(Error::NotFound("user"));
    }
    conn.execute(
        "INSERT INTO blacklists (source_id, target_id, reason, created_at_us)
         VALUES (?1, ?2, ?3, ?4)",
        params![user, target, reason, now_us()],
    )
    .map_err(|e| Error::conflict_on_unique(e, "blacklist entry"))?;
    Ok(())
}

/// Remove a blacklist entry. A no-op when absent.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn unblacklist(conn: &Connection, user: UserId, target: UserId) -> Result<()> {
    conn.execute(
        "DELETE FROM blacklists WHERE source_id = ?1 AND target_id = ?2",
        params![user, target],
    )?;
    Ok(())
}

/// Whitelist another user.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a self-whitelist,
/// [`Error::NotFound`] for a missing user, [`Error::Conflict`] for a
/// duplicate entry.
pub fn whitelist(conn: &Connection, user: UserId, target: UserId) -> Result<()> {
    if target == user {
        return Err(Error::InvalidArgument("cannot whitelist yourself".into()));
    }
    if !relations::user_exists(conn, user)? || !relations::user_exists(conn, target)? {
        return Err(Error::NotFound("user"));
    }
    conn.execute(
        "INSERT INTO whitelists (source_id, target_id, created_at_us) VALUES (?1, ?2, ?3)",
        params![user, target, now_us()],
    )
    .map_err(|e| Error::conflict_on_unique(e, "whitelist entry"))?;
    Ok(())
}

/// Remove a whitelist entry. A no-op when absent.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn unwhitelist(conn: &Connection, user: UserId, target: UserId) -> Result<()> {
    conn.execute(
        "DELETE FROM whitelists WHERE source_id = ?1 AND target_id = ?2",
        params![user, target],
    )?;
    Ok(())
}

/// Delete the whole two-direction message history with one peer.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_conversation(conn: &Connection, me: UserId, peer: UserId) -> Result<()> {
    conn.execute(
        "DELETE FROM private_messages
         WHERE (sender_id = ?1 AND recipient_id = ?2)
            OR (sender_id = ?2 AND recipient_id = ?1)",
        params![me, peer],
    )?;
    Ok(())
}
