//! Router modules, split by access level.
//!
//! Access control is applied per module in `create_router`, so a handler
//! placed in the wrong module is the only way to expose it.

/// Anonymous access. Handlers that return routes still hide drafts from
/// callers who may not edit them.
pub mod public;

/// Requires a valid access token of a non-blocked user.
pub mod authenticated;

/// Requires role `admin` on top of authentication.
pub mod admin;
