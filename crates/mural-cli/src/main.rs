#![forbid(unsafe_code)]

//! `mural` — inspection and administration CLI over the mural engine.
//!
//! Thin veneer: every subcommand maps onto one library call, so the
//! whole engine surface is exercisable end-to-end from a shell. Output
//! is human-readable by default, `--json` for machines.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use mural_core::actions::{self, Draft};
use mural_core::capability;
use mural_core::feed::{self, FeedOptions, ThreadOptions};
use mural_core::model::{Board, ContentRef, Domain};
use mural_core::page::PageOptions;
use mural_core::{config, db, relations};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "mural: social-board data layer",
    long_about = None
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "mural.toml")]
    config: PathBuf,

    /// Override the store path from the configuration.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct BoardArgs {
    /// Target a user board by user id.
    #[arg(long, conflicts_with = "project")]
    user: Option<i64>,

    /// Target a project board by project id.
    #[arg(long)]
    project: Option<i64>,
}

impl BoardArgs {
    fn board(&self) -> Result<Board> {
        match (self.user, self.project) {
            (Some(id), None) => Ok(Board::User(id)),
            (None, Some(id)) => Ok(Board::Project(id)),
            _ => bail!("specify exactly one of --user or --project"),
        }
    }
}

#[derive(Args, Debug, Clone, Copy)]
struct PageArgs {
    /// Page size (0 = domain default).
    #[arg(long, default_value_t = 0)]
    count: u32,

    /// Items strictly older than this identity.
    #[arg(long)]
    older: Option<i64>,

    /// Items strictly newer than this identity.
    #[arg(long)]
    newer: Option<i64>,
}

impl PageArgs {
    const fn options(self) -> PageOptions {
        PageOptions {
            count: self.count,
            older: self.older,
            newer: self.newer,
        }
    }
}

#[derive(Args, Debug)]
struct FeedArgs {
    #[command(flatten)]
    page: PageArgs,

    /// Only senders the viewer follows.
    #[arg(long)]
    following: bool,

    /// Only the viewer's followers (with --following: friends only).
    #[arg(long)]
    followers: bool,

    /// Only this content language.
    #[arg(long)]
    language: Option<String>,
}

impl FeedArgs {
    fn options(&self) -> FeedOptions {
        FeedOptions {
            page: self.page.options(),
            following: self.following,
            followers: self.followers,
            language: self.language.clone(),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DomainArg {
    User,
    Project,
}

impl From<DomainArg> for Domain {
    fn from(value: DomainArg) -> Self {
        match value {
            DomainArg::User => Self::User,
            DomainArg::Project => Self::Project,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the store file and apply migrations.
    Init,

    /// Register a user.
    UserAdd {
        username: String,
        /// Language tag; defaults to the configured language.
        #[arg(long)]
        lang: Option<String>,
    },

    /// Register a project owned by a user.
    ProjectAdd {
        name: String,
        #[arg(long)]
        owner: i64,
        /// Hide the board from non-members.
        #[arg(long)]
        hidden: bool,
        /// Refuse posts from non-members.
        #[arg(long)]
        closed: bool,
        #[arg(long)]
        private: bool,
    },

    /// Add a member to a project.
    MemberAdd {
        #[arg(long)]
        project: i64,
        #[arg(long)]
        user: i64,
    },

    /// Publish a post on a board.
    Post {
        /// Acting user id.
        #[arg(long = "as")]
        sender: i64,
        #[command(flatten)]
        board: BoardArgs,
        body: String,
        #[arg(long)]
        lang: Option<String>,
    },

    /// Publish a comment under a post.
    Comment {
        #[arg(long = "as")]
        sender: i64,
        #[arg(long, value_enum)]
        domain: DomainArg,
        #[arg(long)]
        post: i64,
        body: String,
        #[arg(long)]
        lang: Option<String>,
    },

    /// List a board's posts as seen by a viewer.
    Board {
        #[arg(long)]
        viewer: i64,
        #[command(flatten)]
        board: BoardArgs,
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// The viewer's cross-board home timeline.
    Home {
        #[arg(long)]
        viewer: i64,
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Comments under one post.
    Thread {
        #[arg(long, value_enum)]
        domain: DomainArg,
        #[arg(long)]
        post: i64,
        #[command(flatten)]
        page: PageArgs,
    },

    /// One post with counters and the viewer's capability flags.
    Show {
        #[arg(long)]
        viewer: i64,
        #[arg(long, value_enum)]
        domain: DomainArg,
        #[arg(long)]
        post: i64,
    },

    /// Prior bodies of a post or comment.
    Revisions {
        #[arg(long, value_enum)]
        domain: DomainArg,
        #[arg(long, conflicts_with = "comment")]
        post: Option<i64>,
        #[arg(long)]
        comment: Option<i64>,
    },

    /// Edit a post or comment.
    Edit {
        #[arg(long = "as")]
        editor: i64,
        #[arg(long, value_enum)]
        domain: DomainArg,
        #[arg(long, conflicts_with = "comment")]
        post: Option<i64>,
        #[arg(long)]
        comment: Option<i64>,
        body: String,
        #[arg(long)]
        lang: Option<String>,
    },

    /// Delete a post, comment or private message.
    Delete {
        #[arg(long = "as")]
        actor: i64,
        #[arg(long, value_enum)]
        domain: Option<DomainArg>,
        #[arg(long)]
        post: Option<i64>,
        #[arg(long)]
        comment: Option<i64>,
        #[arg(long)]
        pm: Option<i64>,
    },

    /// Cast a vote (positive, negative, or 0 to withdraw).
    Vote {
        #[arg(long = "as")]
        voter: i64,
        #[arg(long, value_enum)]
        domain: DomainArg,
        #[arg(long, conflicts_with = "comment")]
        post: Option<i64>,
        #[arg(long)]
        comment: Option<i64>,
        value: i8,
    },

    /// Bookmark a post.
    Bookmark {
        #[arg(long = "as")]
        user: i64,
        #[arg(long, value_enum)]
        domain: DomainArg,
        #[arg(long)]
        post: i64,
        /// Remove the bookmark instead.
        #[arg(long)]
        remove: bool,
    },

    /// Lurk a post.
    Lurk {
        #[arg(long = "as")]
        user: i64,
        #[arg(long, value_enum)]
        domain: DomainArg,
        #[arg(long)]
        post: i64,
        /// Stop lurking instead.
        #[arg(long)]
        remove: bool,
    },

    /// Suppress notifications on a post, wholly or per user.
    Lock {
        #[arg(long = "as")]
        user: i64,
        #[arg(long, value_enum)]
        domain: DomainArg,
        #[arg(long)]
        post: i64,
        /// Suppress only notifications from these users.
        #[arg(long = "target")]
        targets: Vec<i64>,
        /// Release instead of create.
        #[arg(long)]
        remove: bool,
    },

    /// Follow a user or project board.
    Follow {
        #[arg(long = "as")]
        user: i64,
        #[command(flatten)]
        board: BoardArgs,
        /// Unfollow instead.
        #[arg(long)]
        remove: bool,
    },

    /// Blacklist a user.
    Blacklist {
        #[arg(long = "as")]
        user: i64,
        #[arg(long)]
        target: i64,
        #[arg(long, default_value = "")]
        reason: String,
        /// Remove the entry instead.
        #[arg(long)]
        remove: bool,
    },

    /// Whitelist a user.
    Whitelist {
        #[arg(long = "as")]
        user: i64,
        #[arg(long)]
        target: i64,
        /// Remove the entry instead.
        #[arg(long)]
        remove: bool,
    },

    /// Send a private message.
    PmSend {
        #[arg(long = "as")]
        sender: i64,
        #[arg(long)]
        to: i64,
        body: String,
    },

    /// Message history with one peer.
    Pms {
        #[arg(long = "as")]
        user: i64,
        #[arg(long)]
        with: i64,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Conversation summaries, unread first.
    Conversations {
        #[arg(long = "as")]
        user: i64,
        #[arg(long, default_value_t = 0)]
        count: u32,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn when(us: i64) -> String {
    chrono::DateTime::from_timestamp_micros(us)
        .map_or_else(|| us.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

const fn draft(body: String, lang: Option<String>) -> Draft {
    Draft { body, lang }
}

fn content_target(
    domain: Option<DomainArg>,
    post: Option<i64>,
    comment: Option<i64>,
    pm: Option<i64>,
) -> Result<ContentRef> {
    match (domain, post, comment, pm) {
        (Some(d), Some(id), None, None) => Ok(match Domain::from(d) {
            Domain::User => ContentRef::UserPost(id),
            Domain::Project => ContentRef::ProjectPost(id),
        }),
        (Some(d), None, Some(id), None) => Ok(match Domain::from(d) {
            Domain::User => ContentRef::UserComment(id),
            Domain::Project => ContentRef::ProjectComment(id),
        }),
        (None, None, None, Some(id)) => Ok(ContentRef::Private(id)),
        _ => bail!("specify --domain with exactly one of --post/--comment, or --pm alone"),
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli, conn: &Connection) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Init => {
            // Opening the store already migrated it.
            println!("store ready");
        }
        Commands::UserAdd { username, lang } => {
            let config = config::load(&cli.config)?;
            let lang = lang.unwrap_or(config.language.default);
            let user = relations::create_user(conn, &username, &lang)?;
            emit(json, &user, |u| {
                println!("user {} '{}' ({})", u.id, u.username, u.lang);
            })?;
        }
        Commands::ProjectAdd {
            name,
            owner,
            hidden,
            closed,
            private,
        } => {
            let project = relations::create_project(conn, &name, owner, !hidden, !closed, private)?;
            emit(json, &project, |p| {
                println!("project {} '{}' (visible: {})", p.id, p.name, p.visible);
            })?;
        }
        Commands::MemberAdd { project, user } => {
            relations::add_member(conn, project, user)?;
            println!("member added");
        }
        Commands::Post {
            sender,
            board,
            body,
            lang,
        } => {
            let post = actions::submit_post(conn, sender, board.board()?, &draft(body, lang))?;
            emit(json, &post, |p| {
                println!("post {} (pid {} on board {})", p.id, p.pid, p.board_id);
            })?;
        }
        Commands::Comment {
            sender,
            domain,
            post,
            body,
            lang,
        } => {
            let comment =
                actions::submit_comment(conn, sender, domain.into(), post, &draft(body, lang))?;
            emit(json, &comment, |c| {
                println!("comment {} on post {}", c.id, c.post_id);
            })?;
        }
        Commands::Board {
            viewer,
            board,
            feed: feed_args,
        } => {
            let posts = feed::board_posts(conn, board.board()?, viewer, &feed_args.options())?;
            emit(json, &posts, |posts| {
                for p in posts {
                    println!(
                        "[{}] {} u{}: {}",
                        p.id,
                        when(p.created_at_us),
                        p.sender_id,
                        p.body
                    );
                }
            })?;
        }
        Commands::Home {
            viewer,
            feed: feed_args,
        } => {
            let items = feed::home_timeline(conn, viewer, &feed_args.options())?;
            emit(json, &items, |items| {
                for item in items {
                    println!(
                        "[{}:{}] {} u{}: {}",
                        item.domain,
                        item.post.id,
                        when(item.post.created_at_us),
                        item.post.sender_id,
                        item.post.body
                    );
                }
            })?;
        }
        Commands::Thread { domain, post, page } => {
            let options = ThreadOptions {
                count: page.count,
                older: page.older,
                newer: page.newer,
            };
            let comments = feed::thread_comments(conn, domain.into(), post, &options)?;
            emit(json, &comments, |comments| {
                for c in comments {
                    println!("[{}] u{}: {}", c.id, c.sender_id, c.body);
                }
            })?;
        }
        Commands::Show {
            viewer,
            domain,
            post,
        } => {
            let annotated = capability::annotate_post(conn, viewer, domain.into(), post)?;
            emit(json, &annotated, |a| {
                println!(
                    "[{}:{}] u{}: {}",
                    a.domain, a.post.id, a.post.sender_id, a.post.body
                );
                println!(
                    "score {} | comments {} | bookmarks {} | lurkers {}",
                    a.score, a.comments, a.bookmarks, a.lurkers
                );
                println!(
                    "edit {} | delete {} | bookmark {} | lurk {} | comment {}",
                    a.capabilities.edit,
                    a.capabilities.delete,
                    a.capabilities.bookmark,
                    a.capabilities.lurk,
                    a.capabilities.comment
                );
            })?;
        }
        Commands::Revisions {
            domain,
            post,
            comment,
        } => {
            let revisions = match (post, comment) {
                (Some(id), None) => capability::post_revisions(conn, domain.into(), id)?,
                (None, Some(id)) => capability::comment_revisions(conn, domain.into(), id)?,
                _ => bail!("specify exactly one of --post or --comment"),
            };
            emit(json, &revisions, |revisions| {
                for r in revisions {
                    println!("r{} {}: {}", r.rev_no, when(r.created_at_us), r.body);
                }
            })?;
        }
        Commands::Edit {
            editor,
            domain,
            post,
            comment,
            body,
            lang,
        } => {
            let target = content_target(Some(domain), post, comment, None)?;
            actions::edit(conn, editor, target, &draft(body, lang))?;
            println!("edited");
        }
        Commands::Delete {
            actor,
            domain,
            post,
            comment,
            pm,
        } => {
            let target = content_target(domain, post, comment, pm)?;
            actions::delete(conn, actor, target)?;
            println!("deleted");
        }
        Commands::Vote {
            voter,
            domain,
            post,
            comment,
            value,
        } => {
            let target = content_target(Some(domain), post, comment, None)?;
            let cast = actions::vote(conn, voter, target, value)?;
            println!("vote recorded: {cast}");
        }
        Commands::Bookmark {
            user,
            domain,
            post,
            remove,
        } => {
            if remove {
                actions::unbookmark(conn, user, domain.into(), post)?;
                println!("bookmark removed");
            } else {
                actions::bookmark(conn, user, domain.into(), post)?;
                println!("bookmarked");
            }
        }
        Commands::Lurk {
            user,
            domain,
            post,
            remove,
        } => {
            if remove {
                actions::unlurk(conn, user, domain.into(), post)?;
                println!("lurk removed");
            } else {
                actions::lurk(conn, user, domain.into(), post)?;
                println!("lurking");
            }
        }
        Commands::Lock {
            user,
            domain,
            post,
            targets,
            remove,
        } => {
            if remove {
                actions::unlock(conn, user, domain.into(), post, &targets)?;
                println!("unlocked");
            } else {
                actions::lock(conn, user, domain.into(), post, &targets)?;
                println!("locked");
            }
        }
        Commands::Follow {
            user,
            board,
            remove,
        } => {
            if remove {
                actions::unfollow(conn, user, board.board()?)?;
                println!("unfollowed");
            } else {
                actions::follow(conn, user, board.board()?)?;
                println!("followed");
            }
        }
        Commands::Blacklist {
            user,
            target,
            reason,
            remove,
        } => {
            if remove {
                actions::unblacklist(conn, user, target)?;
                println!("blacklist entry removed");
            } else {
                actions::blacklist(conn, user, target, &reason)?;
                println!("blacklisted");
            }
        }
        Commands::Whitelist {
            user,
            target,
            remove,
        } => {
            if remove {
                actions::unwhitelist(conn, user, target)?;
                println!("whitelist entry removed");
            } else {
                actions::whitelist(conn, user, target)?;
                println!("whitelisted");
            }
        }
        Commands::PmSend { sender, to, body } => {
            let pm = actions::send_private_message(conn, sender, to, &draft(body, None))?;
            emit(json, &pm, |m| {
                println!("message {} to u{}", m.id, m.recipient_id);
            })?;
        }
        Commands::Pms { user, with, page } => {
            let messages = feed::private_messages(conn, user, with, &page.options())?;
            emit(json, &messages, |messages| {
                for m in messages {
                    println!(
                        "[{}] {} u{} -> u{}: {}",
                        m.id,
                        when(m.created_at_us),
                        m.sender_id,
                        m.recipient_id,
                        m.body
                    );
                }
            })?;
            feed::mark_conversation_read(conn, user, with)?;
        }
        Commands::Conversations { user, count } => {
            let convs = feed::conversations(conn, user, count)?;
            emit(json, &convs, |convs| {
                for c in convs {
                    let marker = if c.unread { "*" } else { " " };
                    println!(
                        "{marker} u{} {}: {}",
                        c.peer_id,
                        when(c.last_time_us),
                        c.last_body
                    );
                }
            })?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load(&cli.config)?;
    let store_path = cli.store.clone().unwrap_or(config.store.path);
    let conn = db::open_store(&store_path)?;
    tracing::debug!(store = %store_path.display(), "store opened");

    run(cli, &conn)
}
