//! Shared fixtures for module tests: an in-memory store plus seed
//! helpers with controllable timestamps, so ordering and windowing
//! assertions are deterministic.

use rusqlite::{Connection, params};

use crate::db::{now_us, open_in_memory};
use crate::model::{Domain, PostId, ProjectId, UserId};
use crate::relations;

pub fn store() -> Connection {
    open_in_memory().expect("open in-memory store")
}

pub fn user(conn: &Connection, username: &str) -> UserId {
    relations::create_user(conn, username, "en")
        .expect("create fixture user")
        .id
}

pub fn project(conn: &Connection, name: &str, owner: UserId, visible: bool) -> ProjectId {
    relations::create_project(conn, name, owner, visible, true, false)
        .expect("create fixture project")
        .id
}

pub fn post_at(
    conn: &Connection,
    domain: Domain,
    board: i64,
    sender: UserId,
    body: &str,
    lang: &str,
    created_at_us: i64,
) -> PostId {
    let sql = format!(
        "INSERT INTO {table} (board_id, sender_id, pid, body, lang, created_at_us)
         VALUES (?1, ?2,
                 (SELECT COALESCE(MAX(pid), 0) + 1 FROM {table} WHERE board_id = ?1),
                 ?3, ?4, ?5)",
        table = domain.post_table()
    );
    conn.execute(&sql, params![board, sender, body, lang, created_at_us])
        .expect("insert fixture post");
    conn.last_insert_rowid()
}

pub fn post(conn: &Connection, domain: Domain, board: i64, sender: UserId, body: &str) -> PostId {
    post_at(conn, domain, board, sender, body, "en", now_us())
}

pub fn comment_at(
    conn: &Connection,
    domain: Domain,
    post_id: PostId,
    sender: UserId,
    body: &str,
    created_at_us: i64,
) -> i64 {
    let sql = format!(
        "INSERT INTO {table} (post_id, board_id, sender_id, body, lang, created_at_us)
         VALUES (?1,
                 (SELECT board_id FROM {posts} WHERE post_id = ?1),
                 ?2, ?3, 'en', ?4)",
        table = domain.comment_table(),
        posts = domain.post_table()
    );
    conn.execute(&sql, params![post_id, sender, body, created_at_us])
        .expect("insert fixture comment");
    conn.last_insert_rowid()
}

pub fn follow(conn: &Connection, source: UserId, target: UserId) {
    conn.execute(
        "INSERT INTO user_follows (source_id, target_id, created_at_us) VALUES (?1, ?2, ?3)",
        params![source, target, now_us()],
    )
    .expect("insert fixture follow");
}

pub fn blacklist(conn: &Connection, source: UserId, target: UserId) {
    conn.execute(
        "INSERT INTO blacklists (source_id, target_id, reason, created_at_us)
         VALUES (?1, ?2, '', ?3)",
        params![source, target, now_us()],
    )
    .expect("insert fixture blacklist");
}
