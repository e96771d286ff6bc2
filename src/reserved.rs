//! Reserved identifiers shared across the connection and session subsystems.

/// Sentinel player id assigned to a connection before it authenticates.
pub const UNDETERMINED_PLAYER_ID: &str = "[Undetermined]";

/// User id reserved for the administrative account.
///
/// Sessions issued for this user id receive [`ADMIN_TOKEN`] instead of a
/// freshly generated UUID, so the admin account always carries the same
/// well-known token.
pub const ADMIN_USER_ID: &str = "admin";

/// Fixed token issued to the reserved admin account.
pub const ADMIN_TOKEN: &str = "00000000-0000-0000-0000-000000000000";
