//! Visibility predicate construction.
//!
//! Translates a viewer identity into boolean SQL filters over content
//! rows. The fragments push into the same conditions/params vectors the
//! feed assembler uses for its other filters, so predicate and window
//! always land in one statement (one consistent snapshot).
//!
//! Directions matter and are deliberately asymmetric:
//! - board visibility excludes boards the *viewer* blacklisted;
//! - `can_comment` (capability layer) excludes viewers the *sender*
//!   blacklisted.
//!
//! A viewer identity that does not exist matches no blacklist, member or
//! owner rows, so every predicate degrades to the public default
//! (visible projects only, no user-board exclusions). Visibility never
//! fails open and never errors on an unknown viewer.

use rusqlite::types::ToSql;

use crate::model::UserId;

/// Common-table-expression header for home-timeline queries: the
/// viewer's outgoing blacklist, named once, consulted twice. The caller
/// binds the viewer as `?1` before pushing further conditions.
pub const HOME_BLIST_CTE: &str =
    "WITH blist AS (SELECT target_id FROM blacklists WHERE source_id = ?1)";

/// User-board rule: the row's board must not be in the viewer's
/// outgoing blacklist.
pub fn push_user_board_visible(
    viewer: UserId,
    board_column: &str,
    conditions: &mut Vec<String>,
    params: &mut Vec<Box<dyn ToSql>>,
) {
    params.push(Box::new(viewer));
    conditions.push(format!(
        "{board_column} NOT IN (SELECT target_id FROM blacklists WHERE source_id = ?{})",
        params.len()
    ));
}

/// Project-board rule: the project is visible, or the viewer is a
/// member, or the viewer is an owner. Private projects without a
/// membership stay invisible regardless of other flags.
pub fn push_project_board_visible(
    viewer: UserId,
    board_column: &str,
    conditions: &mut Vec<String>,
    params: &mut Vec<Box<dyn ToSql>>,
) {
    params.push(Box::new(viewer));
    let member = params.len();
    params.push(Box::new(viewer));
    let owner = params.len();
    conditions.push(format!(
        "({board_column} IN (SELECT project_id FROM projects WHERE visible = 1) \
         OR ?{member} IN (SELECT user_id FROM project_members WHERE project_id = {board_column}) \
         OR ?{owner} IN (SELECT user_id FROM project_owners WHERE project_id = {board_column}))"
    ));
}

/// Cross-domain home rule over the `timeline` view: blacklisted senders
/// are invisible everywhere, then the per-domain board rule applies.
/// Requires [`HOME_BLIST_CTE`] with the viewer bound as `?1`.
pub fn push_home_visible(
    viewer: UserId,
    conditions: &mut Vec<String>,
    params: &mut Vec<Box<dyn ToSql>>,
) {
    conditions.push("sender_id NOT IN (SELECT target_id FROM blist)".to_owned());

    params.push(Box::new(viewer));
    let member = params.len();
    params.push(Box::new(viewer));
    let owner = params.len();
    conditions.push(format!(
        "CASE domain \
         WHEN 'user' THEN board_id NOT IN (SELECT target_id FROM blist) \
         ELSE (board_id IN (SELECT project_id FROM projects WHERE visible = 1) \
               OR ?{member} IN (SELECT user_id FROM project_members WHERE project_id = board_id) \
               OR ?{owner} IN (SELECT user_id FROM project_owners WHERE project_id = board_id)) \
         END"
    ));
}
