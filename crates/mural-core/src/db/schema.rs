//! Canonical SQLite schema for the mural store.
//!
//! The two content domains (user boards, project boards) are parallel
//! table families with independent identity sequences; the `timeline`
//! view unions them for the cross-domain home feed. Relation tables key
//! on their natural pair so duplicate relations fail at the constraint
//! and single-statement upserts stay atomic. All referential cleanup is
//! ON DELETE CASCADE: deleting a content item removes its votes,
//! markers and revisions without engine involvement.

/// Migration v1: entities, content tables, relation tables, timeline view.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE CHECK (length(trim(username)) > 0),
    lang TEXT NOT NULL DEFAULT 'en',
    board_lang TEXT NOT NULL DEFAULT 'en',
    private INTEGER NOT NULL DEFAULT 0 CHECK (private IN (0, 1)),
    last_seen_at_us INTEGER NOT NULL DEFAULT 0,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    project_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    visible INTEGER NOT NULL DEFAULT 1 CHECK (visible IN (0, 1)),
    open INTEGER NOT NULL DEFAULT 1 CHECK (open IN (0, 1)),
    private INTEGER NOT NULL DEFAULT 0 CHECK (private IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS project_owners (
    project_id INTEGER NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    notify INTEGER NOT NULL DEFAULT 1 CHECK (notify IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

CREATE TABLE IF NOT EXISTS project_members (
    project_id INTEGER NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    notify INTEGER NOT NULL DEFAULT 1 CHECK (notify IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

CREATE TABLE IF NOT EXISTS user_follows (
    source_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    notify INTEGER NOT NULL DEFAULT 0 CHECK (notify IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (source_id, target_id),
    CHECK (source_id <> target_id)
);

CREATE TABLE IF NOT EXISTS project_follows (
    source_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    project_id INTEGER NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    notify INTEGER NOT NULL DEFAULT 0 CHECK (notify IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (source_id, project_id)
);

CREATE TABLE IF NOT EXISTS blacklists (
    source_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    reason TEXT NOT NULL DEFAULT '',
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (source_id, target_id),
    CHECK (source_id <> target_id)
);

CREATE TABLE IF NOT EXISTS whitelists (
    source_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (source_id, target_id),
    CHECK (source_id <> target_id)
);

CREATE TABLE IF NOT EXISTS user_posts (
    post_id INTEGER PRIMARY KEY AUTOINCREMENT,
    board_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    sender_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    pid INTEGER NOT NULL,
    body TEXT NOT NULL CHECK (length(body) > 0),
    lang TEXT NOT NULL,
    closed INTEGER NOT NULL DEFAULT 0 CHECK (closed IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    UNIQUE (board_id, pid)
);

CREATE TABLE IF NOT EXISTS project_posts (
    post_id INTEGER PRIMARY KEY AUTOINCREMENT,
    board_id INTEGER NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    sender_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    pid INTEGER NOT NULL,
    body TEXT NOT NULL CHECK (length(body) > 0),
    lang TEXT NOT NULL,
    closed INTEGER NOT NULL DEFAULT 0 CHECK (closed IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    UNIQUE (board_id, pid)
);

CREATE TABLE IF NOT EXISTS user_comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES user_posts(post_id) ON DELETE CASCADE,
    board_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    sender_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    body TEXT NOT NULL CHECK (length(body) > 0),
    lang TEXT NOT NULL,
    editable INTEGER NOT NULL DEFAULT 1 CHECK (editable IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS project_comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES project_posts(post_id) ON DELETE CASCADE,
    board_id INTEGER NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    sender_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    body TEXT NOT NULL CHECK (length(body) > 0),
    lang TEXT NOT NULL,
    editable INTEGER NOT NULL DEFAULT 1 CHECK (editable IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_post_revisions (
    post_id INTEGER NOT NULL REFERENCES user_posts(post_id) ON DELETE CASCADE,
    rev_no INTEGER NOT NULL CHECK (rev_no > 0),
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, rev_no)
);

CREATE TABLE IF NOT EXISTS project_post_revisions (
    post_id INTEGER NOT NULL REFERENCES project_posts(post_id) ON DELETE CASCADE,
    rev_no INTEGER NOT NULL CHECK (rev_no > 0),
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, rev_no)
);

CREATE TABLE IF NOT EXISTS user_comment_revisions (
    comment_id INTEGER NOT NULL REFERENCES user_comments(comment_id) ON DELETE CASCADE,
    rev_no INTEGER NOT NULL CHECK (rev_no > 0),
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (comment_id, rev_no)
);

CREATE TABLE IF NOT EXISTS project_comment_revisions (
    comment_id INTEGER NOT NULL REFERENCES project_comments(comment_id) ON DELETE CASCADE,
    rev_no INTEGER NOT NULL CHECK (rev_no > 0),
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (comment_id, rev_no)
);

CREATE TABLE IF NOT EXISTS user_post_votes (
    post_id INTEGER NOT NULL REFERENCES user_posts(post_id) ON DELETE CASCADE,
    voter_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    value INTEGER NOT NULL CHECK (value IN (-1, 1)),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, voter_id)
);

CREATE TABLE IF NOT EXISTS project_post_votes (
    post_id INTEGER NOT NULL REFERENCES project_posts(post_id) ON DELETE CASCADE,
    voter_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    value INTEGER NOT NULL CHECK (value IN (-1, 1)),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, voter_id)
);

CREATE TABLE IF NOT EXISTS user_comment_votes (
    comment_id INTEGER NOT NULL REFERENCES user_comments(comment_id) ON DELETE CASCADE,
    voter_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    value INTEGER NOT NULL CHECK (value IN (-1, 1)),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (comment_id, voter_id)
);

CREATE TABLE IF NOT EXISTS project_comment_votes (
    comment_id INTEGER NOT NULL REFERENCES project_comments(comment_id) ON DELETE CASCADE,
    voter_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    value INTEGER NOT NULL CHECK (value IN (-1, 1)),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (comment_id, voter_id)
);

CREATE TABLE IF NOT EXISTS user_post_bookmarks (
    post_id INTEGER NOT NULL REFERENCES user_posts(post_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS project_post_bookmarks (
    post_id INTEGER NOT NULL REFERENCES project_posts(post_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS user_post_lurks (
    post_id INTEGER NOT NULL REFERENCES user_posts(post_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS project_post_lurks (
    post_id INTEGER NOT NULL REFERENCES project_posts(post_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS user_post_locks (
    post_id INTEGER NOT NULL REFERENCES user_posts(post_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS project_post_locks (
    post_id INTEGER NOT NULL REFERENCES project_posts(post_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS user_post_pair_locks (
    post_id INTEGER NOT NULL REFERENCES user_posts(post_id) ON DELETE CASCADE,
    source_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, source_id, target_id),
    CHECK (source_id <> target_id)
);

CREATE TABLE IF NOT EXISTS project_post_pair_locks (
    post_id INTEGER NOT NULL REFERENCES project_posts(post_id) ON DELETE CASCADE,
    source_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (post_id, source_id, target_id),
    CHECK (source_id <> target_id)
);

CREATE TABLE IF NOT EXISTS private_messages (
    pm_id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    recipient_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    body TEXT NOT NULL CHECK (length(body) > 0),
    lang TEXT NOT NULL,
    unread INTEGER NOT NULL DEFAULT 1 CHECK (unread IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    CHECK (sender_id <> recipient_id)
);

CREATE VIEW IF NOT EXISTS timeline AS
SELECT 'user' AS domain, post_id, board_id, sender_id, pid, body, lang, closed, created_at_us
FROM user_posts
UNION ALL
SELECT 'project' AS domain, post_id, board_id, sender_id, pid, body, lang, closed, created_at_us
FROM project_posts;
";

/// Migration v2: read-path indexes for feeds, threads and relations.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_user_posts_board
    ON user_posts(board_id, post_id DESC);

CREATE INDEX IF NOT EXISTS idx_project_posts_board
    ON project_posts(board_id, post_id DESC);

CREATE INDEX IF NOT EXISTS idx_user_posts_created
    ON user_posts(created_at_us DESC, post_id);

CREATE INDEX IF NOT EXISTS idx_project_posts_created
    ON project_posts(created_at_us DESC, post_id);

CREATE INDEX IF NOT EXISTS idx_user_posts_sender
    ON user_posts(sender_id);

CREATE INDEX IF NOT EXISTS idx_project_posts_sender
    ON project_posts(sender_id);

CREATE INDEX IF NOT EXISTS idx_user_comments_post
    ON user_comments(post_id, comment_id);

CREATE INDEX IF NOT EXISTS idx_project_comments_post
    ON project_comments(post_id, comment_id);

CREATE INDEX IF NOT EXISTS idx_blacklists_target
    ON blacklists(target_id);

CREATE INDEX IF NOT EXISTS idx_user_follows_target
    ON user_follows(target_id);

CREATE INDEX IF NOT EXISTS idx_private_messages_pair
    ON private_messages(sender_id, recipient_id, pm_id DESC);

CREATE INDEX IF NOT EXISTS idx_private_messages_recipient
    ON private_messages(recipient_id, pm_id DESC);
";

/// Indexes the migration suite asserts exist after migrating.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_user_posts_board",
    "idx_project_posts_board",
    "idx_user_posts_created",
    "idx_project_posts_created",
    "idx_user_posts_sender",
    "idx_project_posts_sender",
    "idx_user_comments_post",
    "idx_project_comments_post",
    "idx_blacklists_target",
    "idx_user_follows_target",
    "idx_private_messages_pair",
    "idx_private_messages_recipient",
];
