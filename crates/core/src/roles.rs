//! Well-known role names carried in access tokens.

use crate::types::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Whether `actor` may cancel or remove work owned by `owner`.
///
/// Admins may control anything; everyone else only their own jobs.
pub fn can_control(actor: DbId, is_admin: bool, owner: DbId) -> bool {
    is_admin || actor == owner
}
