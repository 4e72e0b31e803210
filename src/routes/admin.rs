use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// Account administration, nested under `/admin`. The router sits behind the
/// authentication layer and every handler additionally checks for role `admin`.
/// Acting on one's own account, deleting an admin and resetting an admin's
/// password are refused by `policy::ensure_can_manage_account`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // Body: `{login, block_user, block_reason}`. Blocking needs a reason.
        .route("/toggle_user_active", post(handlers::admin::toggle_user_active))
        .route("/set_user_role", post(handlers::admin::set_user_role))
        .route(
            "/reset_user_password",
            post(handlers::admin::reset_user_password),
        )
        // ?identifier=<login or email>
        .route("/delete_user", delete(handlers::admin::delete_user))
        .route("/get_user_info", get(handlers::admin::get_user_info))
        .route("/get_users_list", get(handlers::admin::get_users_list))
}
