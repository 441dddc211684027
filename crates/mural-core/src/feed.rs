//! Feed assembly: windowed, ordered, visibility-filtered content
//! selection.
//!
//! Three read shapes share one construction: build a conditions/params
//! vector (visibility predicate first, then relational filters, then the
//! pagination window), splice it into a single SELECT, and map rows to
//! typed structs. Because each read is one statement, the predicate and
//! the window observe the same data version.
//!
//! Ordering is newest-first with ascending-identity tie-break everywhere
//! (the cross-domain timeline adds the domain tag as a final tie-break),
//! so repeated windowed calls never skip or duplicate rows.

use rusqlite::{Connection, params, params_from_iter, types::ToSql, types::Type};
use tracing::debug;

use crate::error::{Error, Result};
use crate::language;
use crate::model::{
    Board, Comment, Conversation, Domain, HomePost, Post, PostId, PrivateMessage, UserId,
};
use crate::page::{self, PageOptions};
use crate::relations;
use crate::visibility;

const POST_COLUMNS: &str = "post_id, board_id, sender_id, pid, body, lang, closed, created_at_us";
const COMMENT_COLUMNS: &str =
    "comment_id, post_id, board_id, sender_id, body, lang, editable, created_at_us";
const PM_COLUMNS: &str = "pm_id, sender_id, recipient_id, body, lang, unread, created_at_us";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options for board feeds and the home timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedOptions {
    /// Pagination window.
    pub page: PageOptions,
    /// Restrict to senders the viewer follows (plus the viewer).
    pub following: bool,
    /// Restrict to the viewer's followers (plus the viewer). Combined
    /// with `following`, restricts to friends (mutual follows).
    pub followers: bool,
    /// Restrict to one content language.
    pub language: Option<String>,
}

impl FeedOptions {
    fn validate(&self) -> Result<()> {
        if let Some(tag) = &self.language
            && !language::is_supported(tag)
        {
            return Err(Error::InvalidArgument(format!(
                "unsupported language tag '{tag}'"
            )));
        }
        Ok(())
    }
}

/// Options for a comment thread. Relational filters are not
/// representable here on purpose: a thread is already scoped to one
/// post. All-default options mean the full thread in creation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadOptions {
    /// Page size; 0 with no cursors means the whole thread.
    pub count: u32,
    pub older: Option<i64>,
    pub newer: Option<i64>,
}

impl ThreadOptions {
    const fn is_bounded(self) -> bool {
        self.count != 0 || self.older.is_some() || self.newer.is_some()
    }
}

// ---------------------------------------------------------------------------
// Row mappers
// ---------------------------------------------------------------------------

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
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
}

fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        board_id: row.get(2)?,
        sender_id: row.get(3)?,
        body: row.get(4)?,
        lang: row.get(5)?,
        editable: row.get(6)?,
        created_at_us: row.get(7)?,
    })
}

fn row_to_pm(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrivateMessage> {
    Ok(PrivateMessage {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        body: row.get(3)?,
        lang: row.get(4)?,
        unread: row.get(5)?,
        created_at_us: row.get(6)?,
    })
}

// ---------------------------------------------------------------------------
// Filter helpers
// ---------------------------------------------------------------------------

fn push_language(
    options: &FeedOptions,
    conditions: &mut Vec<String>,
    params_v: &mut Vec<Box<dyn ToSql>>,
) {
    if let Some(tag) = &options.language {
        params_v.push(Box::new(tag.clone()));
        conditions.push(format!("lang = ?{}", params_v.len()));
    }
}

/// Resolve the `following`/`followers` flags into an explicit sender
/// id-set (always including the viewer) and AND it into the predicate.
fn push_sender_scope(
    conn: &Connection,
    viewer: UserId,
    options: &FeedOptions,
    conditions: &mut Vec<String>,
    params_v: &mut Vec<Box<dyn ToSql>>,
) -> Result<()> {
    let mut ids = match (options.following, options.followers) {
        (false, false) => return Ok(()),
        (true, false) => relations::following_ids(conn, viewer)?,
        (false, true) => relations::follower_ids(conn, viewer)?,
        (true, true) => relations::friend_ids(conn, viewer)?,
    };
    ids.push(viewer);

    let placeholders: Vec<String> = ids
        .iter()
        .map(|id| {
            params_v.push(Box::new(*id));
            format!("?{}", params_v.len())
        })
        .collect();
    conditions.push(format!("sender_id IN ({})", placeholders.join(", ")));
    Ok(())
}

fn collect_rows<T>(
    conn: &Connection,
    sql: &str,
    params_v: &[Box<dyn ToSql>],
    mapper: impl Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let params_ref: Vec<&dyn ToSql> = params_v.iter().map(AsRef::as_ref).collect();
    let rows = stmt.query_map(params_from_iter(params_ref), mapper)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Board feed
// ---------------------------------------------------------------------------

/// Posts targeting one board, newest-first by identity, visible to
/// `viewer`, optionally restricted by relational filters, windowed.
///
/// An invisible board (blacklisted owner, closed project) yields an
/// empty page, not an error: visibility is a predicate, never a failure.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the board does not exist,
/// [`Error::InvalidArgument`] for an unsupported language filter.
pub fn board_posts(
    conn: &Connection,
    board: Board,
    viewer: UserId,
    options: &FeedOptions,
) -> Result<Vec<Post>> {
    options.validate()?;
    match board {
        Board::User(id) => {
            if !relations::user_exists(conn, id)? {
                return Err(Error::NotFound("user"));
            }
        }
        Board::Project(id) => {
            if !relations::project_exists(conn, id)? {
                return Err(Error::NotFound("project"));
            }
        }
    }

    let window = page::resolve(&options.page, &page::POST_PAGE);
    if window.is_empty() {
        return Ok(Vec::new());
    }

    let mut conditions: Vec<String> = Vec::new();
    let mut params_v: Vec<Box<dyn ToSql>> = Vec::new();

    params_v.push(Box::new(board.id()));
    conditions.push(format!("board_id = ?{}", params_v.len()));

    match board.domain() {
        Domain::User => {
            visibility::push_user_board_visible(viewer, "board_id", &mut conditions, &mut params_v);
        }
        Domain::Project => {
            visibility::push_project_board_visible(
                viewer,
                "board_id",
                &mut conditions,
                &mut params_v,
            );
        }
    }

    push_sender_scope(conn, viewer, options, &mut conditions, &mut params_v)?;
    push_language(options, &mut conditions, &mut params_v);
    window.push_condition("post_id", &mut conditions, &mut params_v);

    let sql = format!(
        "SELECT {POST_COLUMNS} FROM {table} WHERE {conds} \
         ORDER BY post_id DESC LIMIT {limit}",
        table = board.domain().post_table(),
        conds = conditions.join(" AND "),
        limit = window.limit,
    );

    let mut posts = collect_rows(conn, &sql, &params_v, row_to_post)?;
    if window.reverse_output() {
        posts.reverse();
    }
    debug!(board = board.id(), viewer, returned = posts.len(), "board feed");
    Ok(posts)
}

// ---------------------------------------------------------------------------
// Home timeline
// ---------------------------------------------------------------------------

/// The cross-domain home timeline: both post domains unioned by the
/// `timeline` view, ordered by creation time (identities are
/// domain-local), filtered by the viewer's blacklist and per-domain
/// visibility, then windowed.
///
/// An unknown viewer sees the public default; never an error.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for an unsupported language
/// filter.
pub fn home_timeline(
    conn: &Connection,
    viewer: UserId,
    options: &FeedOptions,
) -> Result<Vec<HomePost>> {
    options.validate()?;

    let window = page::resolve(&options.page, &page::POST_PAGE);
    if window.is_empty() {
        return Ok(Vec::new());
    }

    let mut conditions: Vec<String> = Vec::new();
    let mut params_v: Vec<Box<dyn ToSql>> = Vec::new();

    // ?1 binds the viewer inside the blist CTE.
    params_v.push(Box::new(viewer));
    visibility::push_home_visible(viewer, &mut conditions, &mut params_v);
    push_sender_scope(conn, viewer, options, &mut conditions, &mut params_v)?;
    push_language(options, &mut conditions, &mut params_v);
    window.push_condition("post_id", &mut conditions, &mut params_v);

    let sql = format!(
        "{cte} SELECT domain, {POST_COLUMNS} FROM timeline WHERE {conds} \
         ORDER BY created_at_us DESC, post_id ASC, domain ASC LIMIT {limit}",
        cte = visibility::HOME_BLIST_CTE,
        conds = conditions.join(" AND "),
        limit = window.limit,
    );

    let mut items = collect_rows(conn, &sql, &params_v, |row| {
        let tag: String = row.get(0)?;
        let domain = match tag.as_str() {
            "user" => Domain::User,
            "project" => Domain::Project,
            other => {
                return Err(rusqlite::Error::FromSqlConversionFailure(
                    0,
                    Type::Text,
                    format!("unknown timeline domain '{other}'").into(),
                ));
            }
        };
        Ok(HomePost {
            domain,
            post: Post {
                id: row.get(1)?,
                board_id: row.get(2)?,
                sender_id: row.get(3)?,
                pid: row.get(4)?,
                body: row.get(5)?,
                lang: row.get(6)?,
                closed: row.get(7)?,
                created_at_us: row.get(8)?,
            },
        })
    })?;
    if window.reverse_output() {
        items.reverse();
    }
    debug!(viewer, returned = items.len(), "home timeline");
    Ok(items)
}

// ---------------------------------------------------------------------------
// Thread feed
// ---------------------------------------------------------------------------

/// Comments under one post. Default is the full thread in creation
/// order; bounded requests fetch newest-first, window, then re-reverse
/// so the page reads chronologically.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the parent post does not exist.
pub fn thread_comments(
    conn: &Connection,
    domain: Domain,
    post_id: PostId,
    options: &ThreadOptions,
) -> Result<Vec<Comment>> {
    let exists: bool = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE post_id = ?1)",
            domain.post_table()
        ),
        params![post_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(Error::NotFound("post"));
    }

    let table = domain.comment_table();

    if !options.is_bounded() {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM {table} WHERE post_id = ?1 ORDER BY comment_id ASC"
        );
        let params_v: Vec<Box<dyn ToSql>> = vec![Box::new(post_id)];
        return collect_rows(conn, &sql, &params_v, row_to_comment);
    }

    let window = page::resolve(
        &PageOptions {
            count: options.count,
            older: options.older,
            newer: options.newer,
        },
        &page::COMMENT_PAGE,
    );
    if window.is_empty() {
        return Ok(Vec::new());
    }

    let mut conditions: Vec<String> = Vec::new();
    let mut params_v: Vec<Box<dyn ToSql>> = Vec::new();
    params_v.push(Box::new(post_id));
    conditions.push(format!("post_id = ?{}", params_v.len()));
    window.push_condition("comment_id", &mut conditions, &mut params_v);

    let sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM {table} WHERE {conds} \
         ORDER BY comment_id DESC LIMIT {limit}",
        conds = conditions.join(" AND "),
        limit = window.limit,
    );

    let mut comments = collect_rows(conn, &sql, &params_v, row_to_comment)?;
    // Bounded pages always read chronologically.
    comments.reverse();
    Ok(comments)
}

// ---------------------------------------------------------------------------
// Private messages
// ---------------------------------------------------------------------------

/// The two-direction message history between `me` and `peer`,
/// newest-first, windowed under the private-message limits.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `me == peer`,
/// [`Error::NotFound`] if either user does not exist.
pub fn private_messages(
    conn: &Connection,
    me: UserId,
    peer: UserId,
    options: &PageOptions,
) -> Result<Vec<PrivateMessage>> {
    if me == peer {
        return Err(Error::InvalidArgument(
            "cannot read a conversation with yourself".into(),
        ));
    }
    if !relations::user_exists(conn, me)? || !relations::user_exists(conn, peer)? {
        return Err(Error::NotFound("user"));
    }

    let window = page::resolve(options, &page::PM_PAGE);
    if window.is_empty() {
        return Ok(Vec::new());
    }

    let mut conditions: Vec<String> = Vec::new();
    let mut params_v: Vec<Box<dyn ToSql>> = Vec::new();
    params_v.push(Box::new(me));
    params_v.push(Box::new(peer));
    conditions.push(
        "((sender_id = ?1 AND recipient_id = ?2) OR (sender_id = ?2 AND recipient_id = ?1))"
            .to_owned(),
    );
    window.push_condition("pm_id", &mut conditions, &mut params_v);

    let sql = format!(
        "SELECT {PM_COLUMNS} FROM private_messages WHERE {conds} \
         ORDER BY pm_id DESC LIMIT {limit}",
        conds = conditions.join(" AND "),
        limit = window.limit,
    );

    let mut messages = collect_rows(conn, &sql, &params_v, row_to_pm)?;
    if window.reverse_output() {
        messages.reverse();
    }
    Ok(messages)
}

/// Per-peer conversation aggregates for `me`: latest message per peer
/// plus an unread flag, unread conversations first. A derived read over
/// `private_messages`; conversations are never stored rows.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the user does not exist.
pub fn conversations(conn: &Connection, me: UserId, count: u32) -> Result<Vec<Conversation>> {
    if !relations::user_exists(conn, me)? {
        return Err(Error::NotFound("user"));
    }

    let limits = page::PM_PAGE;
    let limit = if count == 0 { limits.default } else { count }.clamp(limits.min, limits.max);

    let sql = format!(
        "WITH peers AS (
            SELECT CASE WHEN sender_id = ?1 THEN recipient_id ELSE sender_id END AS peer_id,
                   MAX(pm_id) AS last_pm_id
            FROM private_messages
            WHERE sender_id = ?1 OR recipient_id = ?1
            GROUP BY peer_id
        )
        SELECT p.peer_id, m.body, m.created_at_us,
               EXISTS(SELECT 1 FROM private_messages u
                      WHERE u.sender_id = p.peer_id AND u.recipient_id = ?1 AND u.unread = 1)
                   AS unread
        FROM peers p
        JOIN private_messages m ON m.pm_id = p.last_pm_id
        ORDER BY unread DESC, m.created_at_us DESC, p.peer_id ASC
        LIMIT {limit}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![me], |row| {
        Ok(Conversation {
            peer_id: row.get(0)?,
            last_body: row.get(1)?,
            last_time_us: row.get(2)?,
            unread: row.get(3)?,
        })
    })?;
    let mut convs = Vec::new();
    for row in rows {
        convs.push(row?);
    }
    Ok(convs)
}

/// Mark every message from `peer` to `me` as read. Single statement;
/// marking an already-read history is a no-op.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn mark_conversation_read(conn: &Connection, me: UserId, peer: UserId) -> Result<()> {
    conn.execute(
        "UPDATE private_messages SET unread = 0 WHERE recipient_id = ?1 AND sender_id = ?2",
        params![me, peer],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        FeedOptions, ThreadOptions, board_posts, conversations, home_timeline,
        mark_conversation_read, private_messages, thread_comments,
    };
    use crate::error::Error;
    use crate::model::{Board, Domain};
    use crate::page::PageOptions;
    use crate::testutil;
    use rusqlite::{Connection, params};

    fn page(count: u32, older: Option<i64>, newer: Option<i64>) -> FeedOptions {
        FeedOptions {
            page: PageOptions {
                count,
                older,
                newer,
            },
            ..FeedOptions::default()
        }
    }

    fn send_pm(conn: &Connection, sender: i64, recipient: i64, body: &str, at: i64) {
        conn.execute(
            "INSERT INTO private_messages (sender_id, recipient_id, body, lang, created_at_us)
             VALUES (?1, ?2, ?3, 'en', ?4)",
            params![sender, recipient, body, at],
        )
        .expect("insert pm");
    }

    #[test]
    fn board_feed_is_newest_first_and_windowed() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        for n in 0..110 {
            testutil::post_at(
                &conn,
                Domain::User,
                alice,
                alice,
                "body",
                "en",
                1_000 + i64::from(n),
            );
        }

        let posts =
            board_posts(&conn, Board::User(alice), alice, &page(4, None, None)).expect("feed");
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![110, 109, 108, 107]);
    }

    #[test]
    fn between_window_excludes_cursors_and_truncates() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        for n in 0..110 {
            testutil::post_at(
                &conn,
                Domain::User,
                alice,
                alice,
                "body",
                "en",
                1_000 + i64::from(n),
            );
        }

        let posts = board_posts(
            &conn,
            Board::User(alice),
            alice,
            &page(4, Some(103), Some(97)),
        )
        .expect("feed");
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        // Strictly inside (97, 103), descending, truncated to 4.
        assert_eq!(ids, vec![102, 101, 100, 99]);
    }

    #[test]
    fn older_only_returns_strictly_older_ids() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        for n in 0..30 {
            testutil::post_at(
                &conn,
                Domain::User,
                alice,
                alice,
                "body",
                "en",
                1_000 + i64::from(n),
            );
        }

        let posts = board_posts(
            &conn,
            Board::User(alice),
            alice,
            &page(10, Some(15), None),
        )
        .expect("feed");
        assert!(posts.len() <= 10);
        assert!(posts.iter().all(|p| p.id < 15));
    }

    #[test]
    fn inverted_cursors_yield_empty_not_error() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        testutil::post(&conn, Domain::User, alice, alice, "body");

        let posts = board_posts(
            &conn,
            Board::User(alice),
            alice,
            &page(5, Some(1), Some(80_000)),
        )
        .expect("feed");
        assert!(posts.is_empty());
    }

    #[test]
    fn newer_only_page_reads_chronologically() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        for n in 0..10 {
            testutil::post_at(
                &conn,
                Domain::User,
                alice,
                alice,
                "body",
                "en",
                1_000 + i64::from(n),
            );
        }

        let posts =
            board_posts(&conn, Board::User(alice), alice, &page(3, None, Some(4))).expect("feed");
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![8, 9, 10]);
    }

    #[test]
    fn unknown_board_is_not_found() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let err = board_posts(&conn, Board::User(99), alice, &FeedOptions::default())
            .expect_err("missing board");
        assert!(matches!(err, Error::NotFound("user")));
    }

    #[test]
    fn unsupported_language_filter_is_invalid_argument() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let options = FeedOptions {
            language: Some("tlh".into()),
            ..FeedOptions::default()
        };
        let err =
            board_posts(&conn, Board::User(alice), alice, &options).expect_err("bad language");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn language_filter_restricts_rows() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        testutil::post_at(&conn, Domain::User, alice, alice, "ciao", "it", 1_000);
        testutil::post_at(&conn, Domain::User, alice, alice, "hello", "en", 1_001);

        let options = FeedOptions {
            language: Some("it".into()),
            ..FeedOptions::default()
        };
        let posts = board_posts(&conn, Board::User(alice), alice, &options).expect("feed");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].body, "ciao");
    }

    #[test]
    fn board_of_blacklisted_owner_is_empty_for_viewer() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let bob = testutil::user(&conn, "bob");
        testutil::post(&conn, Domain::User, bob, bob, "on bob's wall");
        testutil::blacklist(&conn, alice, bob);

        let posts =
            board_posts(&conn, Board::User(bob), alice, &FeedOptions::default()).expect("feed");
        assert!(posts.is_empty());
        // Bob still sees his own wall.
        let own = board_posts(&conn, Board::User(bob), bob, &FeedOptions::default()).expect("feed");
        assert_eq!(own.len(), 1);
    }

    #[test]
    fn following_filter_limits_to_followed_senders_plus_self() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let bob = testutil::user(&conn, "bob");
        let carol = testutil::user(&conn, "carol");
        testutil::follow(&conn, alice, bob);
        testutil::post_at(&conn, Domain::User, alice, bob, "from bob", "en", 1_000);
        testutil::post_at(&conn, Domain::User, alice, carol, "from carol", "en", 1_001);
        testutil::post_at(&conn, Domain::User, alice, alice, "from me", "en", 1_002);

        let options = FeedOptions {
            following: true,
            ..FeedOptions::default()
        };
        let posts = board_posts(&conn, Board::User(alice), alice, &options).expect("feed");
        let senders: Vec<i64> = posts.iter().map(|p| p.sender_id).collect();
        assert_eq!(senders, vec![alice, bob]);
    }

    #[test]
    fn friends_filter_requires_mutual_follow() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let bob = testutil::user(&conn, "bob");
        let carol = testutil::user(&conn, "carol");
        testutil::follow(&conn, alice, bob);
        testutil::follow(&conn, bob, alice);
        testutil::follow(&conn, alice, carol); // one-way
        testutil::post_at(&conn, Domain::User, alice, bob, "friend", "en", 1_000);
        testutil::post_at(&conn, Domain::User, alice, carol, "not friend", "en", 1_001);

        let options = FeedOptions {
            following: true,
            followers: true,
            ..FeedOptions::default()
        };
        let posts = board_posts(&conn, Board::User(alice), alice, &options).expect("feed");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].sender_id, bob);
    }

    #[test]
    fn home_excludes_blacklisted_senders_even_when_most_recent() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let bob = testutil::user(&conn, "bob");
        let carol = testutil::user(&conn, "carol");
        testutil::blacklist(&conn, alice, bob);

        testutil::post_at(&conn, Domain::User, carol, carol, "old carol", "en", 1_000);
        // Bob's posts are the ten most recent in the unfiltered stream.
        for n in 0..10 {
            testutil::post_at(
                &conn,
                Domain::User,
                bob,
                bob,
                "recent bob",
                "en",
                2_000 + i64::from(n),
            );
        }

        let items = home_timeline(&conn, alice, &page(10, None, None)).expect("home");
        assert!(!items.is_empty());
        assert!(items.iter().all(|item| item.post.sender_id != bob));
    }

    #[test]
    fn home_hides_invisible_projects_from_non_members() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let bob = testutil::user(&conn, "bob");
        let hidden = testutil::project(&conn, "skunkworks", bob, false);
        let open = testutil::project(&conn, "atrium", bob, true);
        testutil::post_at(&conn, Domain::Project, hidden, bob, "secret", "en", 1_000);
        testutil::post_at(&conn, Domain::Project, open, bob, "public", "en", 1_001);

        let items = home_timeline(&conn, alice, &FeedOptions::default()).expect("home");
        let bodies: Vec<&str> = items.iter().map(|i| i.post.body.as_str()).collect();
        assert_eq!(bodies, vec!["public"]);

        // The owner sees both.
        let items = home_timeline(&conn, bob, &FeedOptions::default()).expect("home");
        assert_eq!(items.len(), 2);

        // A member sees both too.
        crate::relations::add_member(&conn, hidden, alice).expect("member");
        let items = home_timeline(&conn, alice, &FeedOptions::default()).expect("home");
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn home_merges_domains_by_creation_time() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let atrium = testutil::project(&conn, "atrium", alice, true);
        testutil::post_at(&conn, Domain::User, alice, alice, "first", "en", 1_000);
        testutil::post_at(&conn, Domain::Project, atrium, alice, "second", "en", 1_500);
        testutil::post_at(&conn, Domain::User, alice, alice, "third", "en", 2_000);

        let items = home_timeline(&conn, alice, &FeedOptions::default()).expect("home");
        let bodies: Vec<&str> = items.iter().map(|i| i.post.body.as_str()).collect();
        assert_eq!(bodies, vec!["third", "second", "first"]);
        assert_eq!(items[1].domain, Domain::Project);
    }

    #[test]
    fn unknown_viewer_gets_public_default_home() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let hidden = testutil::project(&conn, "skunkworks", alice, false);
        testutil::post_at(&conn, Domain::User, alice, alice, "wall", "en", 1_000);
        testutil::post_at(&conn, Domain::Project, hidden, alice, "secret", "en", 1_001);

        // Viewer 999 does not exist: user content stays at the public
        // default, invisible projects stay invisible.
        let items = home_timeline(&conn, 999, &FeedOptions::default()).expect("home");
        let bodies: Vec<&str> = items.iter().map(|i| i.post.body.as_str()).collect();
        assert_eq!(bodies, vec!["wall"]);
    }

    #[test]
    fn thread_defaults_to_full_list_in_creation_order() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let post = testutil::post(&conn, Domain::User, alice, alice, "root");
        for n in 0..5 {
            testutil::comment_at(&conn, Domain::User, post, alice, "c", 1_000 + i64::from(n));
        }

        let comments = thread_comments(&conn, Domain::User, post, &ThreadOptions::default())
            .expect("thread");
        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn bounded_thread_returns_last_n_chronologically() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let post = testutil::post(&conn, Domain::User, alice, alice, "root");
        for n in 0..6 {
            testutil::comment_at(&conn, Domain::User, post, alice, "c", 1_000 + i64::from(n));
        }

        let options = ThreadOptions {
            count: 3,
            ..ThreadOptions::default()
        };
        let comments = thread_comments(&conn, Domain::User, post, &options).expect("thread");
        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 5, 6]);
    }

    #[test]
    fn thread_window_cursors_apply_to_comment_ids() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let post = testutil::post(&conn, Domain::User, alice, alice, "root");
        for n in 0..6 {
            testutil::comment_at(&conn, Domain::User, post, alice, "c", 1_000 + i64::from(n));
        }

        let options = ThreadOptions {
            count: 10,
            older: Some(5),
            newer: Some(1),
        };
        let comments = thread_comments(&conn, Domain::User, post, &options).expect("thread");
        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn thread_for_missing_post_is_not_found() {
        let conn = testutil::store();
        testutil::user(&conn, "alice");
        let err = thread_comments(&conn, Domain::User, 42, &ThreadOptions::default())
            .expect_err("missing post");
        assert!(matches!(err, Error::NotFound("post")));
    }

    #[test]
    fn pm_history_covers_both_directions() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let bob = testutil::user(&conn, "bob");
        let carol = testutil::user(&conn, "carol");
        send_pm(&conn, alice, bob, "hi bob", 1_000);
        send_pm(&conn, bob, alice, "hi alice", 1_001);
        send_pm(&conn, carol, alice, "unrelated", 1_002);

        let history =
            private_messages(&conn, alice, bob, &PageOptions::default()).expect("history");
        let bodies: Vec<&str> = history.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hi alice", "hi bob"]);
    }

    #[test]
    fn pm_history_with_self_is_invalid() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let err = private_messages(&conn, alice, alice, &PageOptions::default())
            .expect_err("self conversation");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn conversations_aggregate_latest_message_per_peer() {
        let conn = testutil::store();
        let alice = testutil::user(&conn, "alice");
        let bob = testutil::user(&conn, "bob");
        let carol = testutil::user(&conn, "carol");
        send_pm(&conn, alice, bob, "first", 1_000);
        send_pm(&conn, bob, alice, "latest from bob", 2_000);
        send_pm(&conn, alice, carol, "to carol", 1_500);

        let convs = conversations(&conn, alice, 0).expect("conversations");
        assert_eq!(convs.len(), 2);
        // Bob's conversation has an unread incoming message, so it sorts
        // first.
        assert_eq!(convs[0].peer_id, bob);
        assert_eq!(convs[0].last_body, "latest from bob");
        assert!(convs[0].unread);
        assert_eq!(convs[1].peer_id, carol);
        assert!(!convs[1].unread);

        mark_conversation_read(&conn, alice, bob).expect("mark read");
        let convs = conversations(&conn, alice, 0).expect("conversations");
        assert!(convs.iter().all(|c| !c.unread));
    }
}
