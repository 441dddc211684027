//! Identity & relationship store adapter.
//!
//! Lookup, creation and id-set queries over users, projects and their
//! graph edges. The feed assembler resolves relational filters through
//! the `*_ids` functions here before it queries content, and the
//! capability evaluator uses the membership probes. Friendship is never
//! stored: it is derived by intersecting the two follow directions.

use rusqlite::{Connection, OptionalExtension, params};

use crate::db::now_us;
use crate::error::{Error, Result};
use crate::language;
use crate::model::{Project, ProjectId, User, UserId};

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        lang: row.get(2)?,
        board_lang: row.get(3)?,
        private: row.get(4)?,
        last_seen_at_us: row.get(5)?,
        created_at_us: row.get(6)?,
    })
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        visible: row.get(2)?,
        open: row.get(3)?,
        private: row.get(4)?,
        created_at_us: row.get(5)?,
    })
}

const USER_COLUMNS: &str =
    "user_id, username, lang, board_lang, private, last_seen_at_us, created_at_us";
const PROJECT_COLUMNS: &str = "project_id, name, visible, open, private, created_at_us";

/// Fetch a user by identity.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no such user exists.
pub fn get_user(conn: &Connection, id: UserId) -> Result<User> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1");
    conn.query_row(&sql, params![id], row_to_user)
        .optional()?
        .ok_or(Error::NotFound("user"))
}

/// Fetch a user by unique username.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no such user exists.
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<User> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    conn.query_row(&sql, params![username], row_to_user)
        .optional()?
        .ok_or(Error::NotFound("user"))
}

/// Fetch a project by identity.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no such project exists.
pub fn get_project(conn: &Connection, id: ProjectId) -> Result<Project> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?1");
    conn.query_row(&sql, params![id], row_to_project)
        .optional()?
        .ok_or(Error::NotFound("project"))
}

/// Whether a user with this identity exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn user_exists(conn: &Connection, id: UserId) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Whether a project with this identity exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn project_exists(conn: &Connection, id: ProjectId) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE project_id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

// ---------------------------------------------------------------------------
// Identity creation & maintenance
// ---------------------------------------------------------------------------

/// Create a user.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for an empty username or an
/// unsupported language, [`Error::Conflict`] for a duplicate username.
pub fn create_user(conn: &Connection, username: &str, lang: &str) -> Result<User> {
    if username.trim().is_empty() {
        return Err(Error::InvalidArgument("empty username".into()));
    }
    if !language::is_supported(lang) {
        return Err(Error::InvalidArgument(format!(
            "unsupported language tag '{lang}'"
        )));
    }

    let now = now_us();
    conn.execute(
        "INSERT INTO users (username, lang, board_lang, private, last_seen_at_us, created_at_us)
         VALUES (?1, ?2, ?2, 0, ?3, ?3)",
        params![username, lang, now],
    )
    .map_err(|e| Error::conflict_on_unique(e, "username"))?;

    get_user(conn, conn.last_insert_rowid())
}

/// Create a project and register `owner` as its first owner. The two
/// inserts run in one transaction.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for an empty name,
/// [`Error::NotFound`] if the owner does not exist.
pub fn create_project(
    conn: &Connection,
    name: &str,
    owner: UserId,
    visible: bool,
    open: bool,
    private: bool,
) -> Result<Project> {
    if name.trim().is_empty() {
        return Err(Error::InvalidArgument("empty project name".into()));
    }
    if !user_exists(conn, owner)? {
        return Err(Error::NotFound("user"));
    }

    let now = now_us();
    conn.execute_batch("BEGIN IMMEDIATE")?;
    let created = conn
        .execute(
            "INSERT INTO projects (name, visible, open, private, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, visible, open, private, now],
        )
        .and_then(|_| {
            let project_id = conn.last_insert_rowid();
            conn.execute(
                "INSERT INTO project_owners (project_id, user_id, notify, created_at_us)
                 VALUES (?1, ?2, 1, ?3)",
                params![project_id, owner, now],
            )?;
            Ok(project_id)
        });

    match created {
        Ok(project_id) => {
            conn.execute_batch("COMMIT")?;
            get_project(conn, project_id)
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK")?;
            Err(e.into())
        }
    }
}

/// Add a member to a project. Owners and members are independent
/// relations; an owner does not need a member row.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for a missing user or project,
/// [`Error::Conflict`] for a duplicate membership.
pub fn add_member(conn: &Connection, project: ProjectId, user: UserId) -> Result<()> {
    if !project_exists(conn, project)? {
        return Err(Error::NotFound("project"));
    }
    if !user_exists(conn, user)? {
        return Err(Error::NotFound("user"));
    }
    conn.execute(
        "INSERT INTO project_members (project_id, user_id, notify, created_at_us)
         VALUES (?1, ?2, 1, ?3)",
        params![project, user, now_us()],
    )
    .map_err(|e| Error::conflict_on_unique(e, "membership"))?;
    Ok(())
}

/// Remove a member from a project. Removing a non-member is a no-op.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn remove_member(conn: &Connection, project: ProjectId, user: UserId) -> Result<()> {
    conn.execute(
        "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2",
        params![project, user],
    )?;
    Ok(())
}

/// Record user activity now (the online-activity timestamp).
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the user does not exist.
pub fn touch_user(conn: &Connection, user: UserId) -> Result<()> {
    let changed = conn.execute(
        "UPDATE users SET last_seen_at_us = ?1 WHERE user_id = ?2",
        params![now_us(), user],
    )?;
    if changed == 0 {
        return Err(Error::NotFound("user"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Id-set queries
// ---------------------------------------------------------------------------

fn pluck_ids(conn: &Connection, sql: &str, id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![id], |row| row.get(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Users `user` has blacklisted (the outgoing direction used by board
/// and feed visibility).
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn blacklisted_ids(conn: &Connection, user: UserId) -> Result<Vec<UserId>> {
    pluck_ids(
        conn,
        "SELECT target_id FROM blacklists WHERE source_id = ?1 ORDER BY target_id",
        user,
    )
}

/// Users who have blacklisted `user` (the incoming direction used by
/// `can_comment`).
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn blacklisting_ids(conn: &Connection, user: UserId) -> Result<Vec<UserId>> {
    pluck_ids(
        conn,
        "SELECT source_id FROM blacklists WHERE target_id = ?1 ORDER BY source_id",
        user,
    )
}

/// Users `user` follows.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn following_ids(conn: &Connection, user: UserId) -> Result<Vec<UserId>> {
    pluck_ids(
        conn,
        "SELECT target_id FROM user_follows WHERE source_id = ?1 ORDER BY target_id",
        user,
    )
}

/// Users following `user`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn follower_ids(conn: &Connection, user: UserId) -> Result<Vec<UserId>> {
    pluck_ids(
        conn,
        "SELECT source_id FROM user_follows WHERE target_id = ?1 ORDER BY source_id",
        user,
    )
}

/// Projects `user` follows.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn project_following_ids(conn: &Connection, user: UserId) -> Result<Vec<ProjectId>> {
    pluck_ids(
        conn,
        "SELECT project_id FROM project_follows WHERE source_id = ?1 ORDER BY project_id",
        user,
    )
}

/// Friends of `user`: mutual follows, derived by set intersection.
/// A named derived read, never a stored relation.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn friend_ids(conn: &Connection, user: UserId) -> Result<Vec<UserId>> {
    let mut stmt = conn.prepare(
        "SELECT target_id FROM user_follows WHERE source_id = ?1
         INTERSECT
         SELECT source_id FROM user_follows WHERE target_id = ?1
         ORDER BY 1",
    )?;
    let rows = stmt.query_map(params![user], |row| row.get(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Users in `user`'s whitelist, plus `user` itself.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn whitelisted_ids(conn: &Connection, user: UserId) -> Result<Vec<UserId>> {
    let mut ids = pluck_ids(
        conn,
        "SELECT target_id FROM whitelists WHERE source_id = ?1 ORDER BY target_id",
        user,
    )?;
    ids.push(user);
    Ok(ids)
}

/// Members of a project.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn member_ids(conn: &Connection, project: ProjectId) -> Result<Vec<UserId>> {
    pluck_ids(
        conn,
        "SELECT user_id FROM project_members WHERE project_id = ?1 ORDER BY user_id",
        project,
    )
}

/// Owners of a project.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn owner_ids(conn: &Connection, project: ProjectId) -> Result<Vec<UserId>> {
    pluck_ids(
        conn,
        "SELECT user_id FROM project_owners WHERE project_id = ?1 ORDER BY user_id",
        project,
    )
}

/// Projects owned by `user`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn owned_project_ids(conn: &Connection, user: UserId) -> Result<Vec<ProjectId>> {
    pluck_ids(
        conn,
        "SELECT project_id FROM project_owners WHERE user_id = ?1 ORDER BY project_id",
        user,
    )
}

// ---------------------------------------------------------------------------
// Membership probes
// ---------------------------------------------------------------------------

/// Whether `source` has blacklisted `target`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn has_blacklisted(conn: &Connection, source: UserId, target: UserId) -> Result<bool> {
    let hit: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM blacklists WHERE source_id = ?1 AND target_id = ?2)",
        params![source, target],
        |row| row.get(0),
    )?;
    Ok(hit)
}

/// Whether `user` is a member of `project`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn is_member(conn: &Connection, project: ProjectId, user: UserId) -> Result<bool> {
    let hit: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = ?1 AND user_id = ?2)",
        params![project, user],
        |row| row.get(0),
    )?;
    Ok(hit)
}

/// Whether `user` is an owner of `project`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn is_owner(conn: &Connection, project: ProjectId, user: UserId) -> Result<bool> {
    let hit: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM project_owners WHERE project_id = ?1 AND user_id = ?2)",
        params![project, user],
        |row| row.get(0),
    )?;
    Ok(hit)
}
