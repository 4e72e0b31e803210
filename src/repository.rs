use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    lifecycle::Transition,
    models::{
        Comment, CommentView, NewUser, ReferenceItem, Route, RouteCard, RouteFilter, RouteOrdering,
        RouteSummary, UpdateProfileRequest, UpdateRouteRequest, UpdateWaypointRequest, User,
        UserRole, Waypoint,
    },
    ordering,
};

/// ReferenceTable
///
/// The lookup tables exposed under `/utils`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTable {
    RouteTypes,
    DifficultyTypes,
    TargetTypes,
    RouteTags,
}

impl ReferenceTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            ReferenceTable::RouteTypes => "route_types",
            ReferenceTable::DifficultyTypes => "difficulty_types",
            ReferenceTable::TargetTypes => "target_types",
            ReferenceTable::RouteTags => "route_tags",
        }
    }
}

/// NewRoute
///
/// A fully prepared route: ids assigned, publication decided and waypoints
/// already sequenced. The repository stores it as-is in one transaction.
#[derive(Debug, Clone)]
pub struct NewRoute {
    pub route: Route,
    pub tags: Vec<Uuid>,
    pub waypoints: Vec<Waypoint>,
}

/// RouteEdit
///
/// Partial update of a route. `waypoints`, when present, replaces the whole set
/// and must already be sequenced.
#[derive(Debug, Clone)]
pub struct RouteEdit {
    pub changes: UpdateRouteRequest,
    pub waypoints: Option<Vec<Waypoint>>,
    pub editor_id: Uuid,
    pub editor_role: UserRole,
}

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers only see this
/// trait; the Postgres implementation lives below and tests provide an
/// in-memory one.
///
/// Waypoint mutations must keep the connected sequence well formed: the
/// implementation resequences with `ordering` inside the same transaction.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    /// Looks a user up by login or email (case-insensitive).
    async fn find_user(&self, identifier: &str) -> AppResult<Option<User>>;
    async fn login_taken(&self, login: &str) -> AppResult<bool>;
    /// True when another account (other than `except`) already uses `email`.
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> AppResult<bool>;
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn update_profile(&self, id: Uuid, changes: UpdateProfileRequest) -> AppResult<Option<User>>;
    async fn set_profile_picture(&self, id: Uuid, url: &str) -> AppResult<Option<User>>;
    async fn set_password_hash(&self, id: Uuid, hashed_password: &str) -> AppResult<bool>;
    async fn record_login(&self, id: Uuid) -> AppResult<()>;
    async fn list_users(&self, skip: i64, limit: i64) -> AppResult<Vec<User>>;
    async fn set_block_status(
        &self,
        id: Uuid,
        blocked: bool,
        reason: Option<String>,
    ) -> AppResult<Option<User>>;
    async fn set_role(&self, id: Uuid, role: UserRole) -> AppResult<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;

    // --- Reference data ---
    async fn list_reference(&self, table: ReferenceTable) -> AppResult<Vec<ReferenceItem>>;
    async fn reference_exists(&self, table: ReferenceTable, id: Uuid) -> AppResult<bool>;
    async fn target_type_exists(&self, name: &str) -> AppResult<bool>;

    // --- Routes ---
    async fn get_route(&self, id: Uuid) -> AppResult<Option<Route>>;
    /// Route with display names, counters and the viewer's like/favorite flags.
    async fn route_summary(&self, id: Uuid, viewer: Option<Uuid>) -> AppResult<Option<RouteSummary>>;
    async fn route_tags(&self, id: Uuid) -> AppResult<Vec<Uuid>>;
    async fn list_public_routes(&self, filter: &RouteFilter, viewer: Option<Uuid>) -> AppResult<Vec<RouteCard>>;
    /// Routes of `creator`, newest first. Drafts are included only when asked.
    async fn list_user_routes(
        &self,
        creator: Uuid,
        include_drafts: bool,
        viewer: Option<Uuid>,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<RouteCard>>;
    async fn list_favorite_routes(&self, user: Uuid) -> AppResult<Vec<RouteCard>>;
    async fn create_route(&self, new_route: NewRoute) -> AppResult<Route>;
    async fn update_route(&self, id: Uuid, edit: RouteEdit) -> AppResult<Option<Route>>;
    async fn apply_transition(&self, id: Uuid, transition: Transition) -> AppResult<Option<Route>>;
    async fn delete_route(&self, id: Uuid) -> AppResult<bool>;

    // Junction inserts/removals report whether a row was actually affected.
    async fn like_route(&self, user: Uuid, route: Uuid) -> AppResult<bool>;
    async fn unlike_route(&self, user: Uuid, route: Uuid) -> AppResult<bool>;
    async fn favorite_route(&self, user: Uuid, route: Uuid) -> AppResult<bool>;
    async fn unfavorite_route(&self, user: Uuid, route: Uuid) -> AppResult<bool>;

    // --- Waypoints ---
    /// Connected waypoints by position, then isolated ones.
    async fn list_waypoints(&self, route: Uuid) -> AppResult<Vec<Waypoint>>;
    async fn get_waypoint(&self, route: Uuid, id: Uuid) -> AppResult<Option<Waypoint>>;
    /// Stores a waypoint built by `ordering::new_waypoint`. Connected ones are
    /// appended to the sequence.
    async fn add_waypoint(&self, waypoint: Waypoint) -> AppResult<Waypoint>;
    async fn update_waypoint(
        &self,
        route: Uuid,
        id: Uuid,
        changes: UpdateWaypointRequest,
    ) -> AppResult<Option<Waypoint>>;
    async fn delete_waypoint(&self, route: Uuid, id: Uuid) -> AppResult<bool>;

    // --- Comments ---
    async fn list_comments(
        &self,
        target_type: &str,
        target_id: Uuid,
        viewer: Option<Uuid>,
    ) -> AppResult<Vec<CommentView>>;
    async fn create_comment(
        &self,
        author: Uuid,
        target_type: &str,
        target_id: Uuid,
        text: &str,
    ) -> AppResult<CommentView>;
    async fn get_comment(&self, id: Uuid) -> AppResult<Option<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> AppResult<bool>;
    async fn like_comment(&self, user: Uuid, comment: Uuid) -> AppResult<bool>;
    async fn unlike_comment(&self, user: Uuid, comment: Uuid) -> AppResult<bool>;
}

/// RepositoryState
///
/// Shared handle to the persistence layer held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL through a `PgPool`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// --- SQL fragments ---

const USER_COLUMNS: &str = "id, login, email, first_name, last_name, hashed_password, gender, role, \
     age, profile_picture, description, last_login, is_blocked, block_reason, block_date, created_at";

const ROUTE_COLUMNS: &str = "r.id, r.creator_id, r.name, r.location, r.description, r.route_type_id, \
     r.difficulty_id, r.thumbnail_url, r.duration, r.distance, r.avg_rating, r.created_at, \
     r.edited_at, r.is_public, r.published_at, r.last_edited_by_id, r.last_edited_by_role, r.geo_data";

const WAYPOINT_COLUMNS: &str =
    "id, route_id, lat, lon, position, waypoint_type, description, photo_url";

const ROUTE_COMMENTS_COUNT: &str = "(SELECT COUNT(*) FROM comments c \
     JOIN target_types t ON t.id = c.target_type_id \
     WHERE t.name = 'route' AND c.target_id = r.id) AS comments_count";

const ROUTE_JOINS: &str = " FROM routes r \
     LEFT JOIN route_types rt ON rt.id = r.route_type_id \
     LEFT JOIN difficulty_types dt ON dt.id = r.difficulty_id";

/// Pushes the viewer-dependent counters shared by cards and summaries.
fn push_engagement(qb: &mut QueryBuilder<'_, Postgres>, viewer: Option<Uuid>) {
    qb.push(", rt.name AS route_type_name, dt.name AS difficulty_name");
    qb.push(", (SELECT COUNT(*) FROM route_likes l WHERE l.route_id = r.id) AS likes_count, ");
    qb.push(ROUTE_COMMENTS_COUNT);
    qb.push(", EXISTS(SELECT 1 FROM route_likes l WHERE l.route_id = r.id AND l.user_id = ");
    qb.push_bind(viewer);
    qb.push(") AS is_liked");
    qb.push(", EXISTS(SELECT 1 FROM route_favorites f WHERE f.route_id = r.id AND f.user_id = ");
    qb.push_bind(viewer);
    qb.push(") AS is_favorite");
    qb.push(ROUTE_JOINS);
}

/// SELECT of `RouteCard` rows, ready for `AND ...` filters.
fn card_query<'a>(viewer: Option<Uuid>) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT r.id, r.name, r.location, r.avg_rating, r.thumbnail_url, r.route_type_id",
    );
    push_engagement(&mut qb, viewer);
    qb
}

/// `ILIKE` pattern matching `term` literally anywhere in the column.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

async fn insert_waypoint(conn: &mut PgConnection, wp: &Waypoint) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO waypoints (id, route_id, lat, lon, position, waypoint_type, description, photo_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(wp.id)
    .bind(wp.route_id)
    .bind(wp.lat)
    .bind(wp.lon)
    .bind(wp.position)
    .bind(wp.kind)
    .bind(&wp.description)
    .bind(&wp.photo_url)
    .execute(conn)
    .await?;
    Ok(())
}

/// Locks and loads the connected waypoints of a route for resequencing.
async fn lock_connected(conn: &mut PgConnection, route: Uuid) -> Result<Vec<Waypoint>, sqlx::Error> {
    sqlx::query_as::<_, Waypoint>(&format!(
        "SELECT {WAYPOINT_COLUMNS} FROM waypoints \
         WHERE route_id = $1 AND waypoint_type <> 'isolated' \
         ORDER BY position FOR UPDATE"
    ))
    .bind(route)
    .fetch_all(conn)
    .await
}

/// Writes back positions and types computed by `ordering::reindex`.
async fn write_sequence(conn: &mut PgConnection, changed: &[Waypoint]) -> Result<(), sqlx::Error> {
    for wp in changed {
        sqlx::query("UPDATE waypoints SET position = $2, waypoint_type = $3 WHERE id = $1")
            .bind(wp.id)
            .bind(wp.position)
            .bind(wp.kind)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Deletes the comments of every route matching `route_filter` (bound to `$1`).
async fn delete_route_comments(
    conn: &mut PgConnection,
    route_filter: &'static str,
    value: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "DELETE FROM comments c USING target_types t \
         WHERE t.id = c.target_type_id AND t.name = 'route' \
         AND c.target_id IN (SELECT r.id FROM routes r WHERE {route_filter})"
    ))
    .bind(value)
    .execute(conn)
    .await?;
    Ok(())
}

async fn touch_route(conn: &mut PgConnection, route: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE routes SET edited_at = NOW() WHERE id = $1")
        .bind(route)
        .execute(conn)
        .await?;
    Ok(())
}

async fn replace_tags(conn: &mut PgConnection, route: Uuid, tags: &[Uuid]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM route_tag_links WHERE route_id = $1")
        .bind(route)
        .execute(&mut *conn)
        .await?;
    for tag in tags {
        sqlx::query(
            "INSERT INTO route_tag_links (route_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(route)
        .bind(tag)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user(&self, identifier: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = lower($1) OR email = lower($1)"
        ))
        .bind(identifier.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn login_taken(&self, login: &str) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE login = $1)")
            .bind(login)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (login, email, hashed_password, first_name, last_name, gender, age, \
             profile_picture, description) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.login)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.gender)
        .bind(user.age)
        .bind(&user.profile_picture)
        .bind(&user.description)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(user_id = %created.id, login = %created.login, "user registered");
        Ok(created)
    }

    /// update_profile
    ///
    /// `COALESCE` keeps every column the request leaves as `None`.
    async fn update_profile(&self, id: Uuid, changes: UpdateProfileRequest) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                gender = COALESCE($4, gender), \
                age = COALESCE($5, age), \
                email = COALESCE($6, email), \
                description = COALESCE($7, description) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.gender)
        .bind(changes.age)
        .bind(changes.email)
        .bind(changes.description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_profile_picture(&self, id: Uuid, url: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET profile_picture = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_password_hash(&self, id: Uuid, hashed_password: &str) -> AppResult<bool> {
        let res = sqlx::query("UPDATE users SET hashed_password = $2 WHERE id = $1")
            .bind(id)
            .bind(hashed_password)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_users(&self, skip: i64, limit: i64) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, login OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn set_block_status(
        &self,
        id: Uuid,
        blocked: bool,
        reason: Option<String>,
    ) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                is_blocked = $2, \
                block_reason = CASE WHEN $2 THEN $3 ELSE NULL END, \
                block_date = CASE WHEN $2 THEN NOW() ELSE NULL END \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(blocked)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// delete_user
    ///
    /// The user's routes cascade away with the account, so comments left on
    /// those routes by others are removed first.
    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        delete_route_comments(&mut tx, "r.creator_id = $1", id).await?;
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    // --- REFERENCE DATA ---

    async fn list_reference(&self, table: ReferenceTable) -> AppResult<Vec<ReferenceItem>> {
        let items = sqlx::query_as::<_, ReferenceItem>(&format!(
            "SELECT id, name FROM {} ORDER BY name",
            table.table_name()
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn reference_exists(&self, table: ReferenceTable, id: Uuid) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            table.table_name()
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn target_type_exists(&self, name: &str) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM target_types WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    // --- ROUTES ---

    async fn get_route(&self, id: Uuid) -> AppResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>(&format!("SELECT {ROUTE_COLUMNS} FROM routes r WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(route)
    }

    async fn route_summary(&self, id: Uuid, viewer: Option<Uuid>) -> AppResult<Option<RouteSummary>> {
        let mut qb = QueryBuilder::new(format!("SELECT {ROUTE_COLUMNS}, u.login AS creator_login"));
        push_engagement(&mut qb, viewer);
        qb.push(" LEFT JOIN users u ON u.id = r.creator_id WHERE r.id = ");
        qb.push_bind(id);

        let summary = qb
            .build_query_as::<RouteSummary>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(summary)
    }

    async fn route_tags(&self, id: Uuid) -> AppResult<Vec<Uuid>> {
        let tags = sqlx::query_scalar::<_, Uuid>(
            "SELECT tag_id FROM route_tag_links WHERE route_id = $1 ORDER BY tag_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    /// list_public_routes
    ///
    /// Filters are pushed through `QueryBuilder` binds, never interpolated.
    async fn list_public_routes(&self, filter: &RouteFilter, viewer: Option<Uuid>) -> AppResult<Vec<RouteCard>> {
        let mut qb = card_query(viewer);
        qb.push(" WHERE r.is_public = true");

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            qb.push(" AND r.name ILIKE ");
            qb.push_bind(contains_pattern(search));
            qb.push(r" ESCAPE '\'");
        }
        if let Some(route_type_id) = filter.route_type_id {
            qb.push(" AND r.route_type_id = ");
            qb.push_bind(route_type_id);
        }
        if let Some(difficulty_id) = filter.difficulty_id {
            qb.push(" AND r.difficulty_id = ");
            qb.push_bind(difficulty_id);
        }
        if let Some(location) = filter.location.as_deref().filter(|s| !s.trim().is_empty()) {
            qb.push(" AND r.location ILIKE ");
            qb.push_bind(contains_pattern(location));
            qb.push(r" ESCAPE '\'");
        }

        qb.push(match filter.ordering {
            Some(RouteOrdering::Rating) => " ORDER BY r.avg_rating DESC, r.created_at DESC",
            Some(RouteOrdering::Recent) => " ORDER BY r.published_at DESC NULLS LAST, r.created_at DESC",
            None => " ORDER BY r.created_at DESC",
        });

        let (skip, limit) = filter.page();
        qb.push(" OFFSET ");
        qb.push_bind(skip);
        qb.push(" LIMIT ");
        qb.push_bind(limit);

        let cards = qb.build_query_as::<RouteCard>().fetch_all(&self.pool).await?;
        Ok(cards)
    }

    async fn list_user_routes(
        &self,
        creator: Uuid,
        include_drafts: bool,
        viewer: Option<Uuid>,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<RouteCard>> {
        let mut qb = card_query(viewer);
        qb.push(" WHERE r.creator_id = ");
        qb.push_bind(creator);
        if !include_drafts {
            qb.push(" AND r.is_public = true");
        }
        qb.push(" ORDER BY r.created_at DESC OFFSET ");
        qb.push_bind(skip);
        qb.push(" LIMIT ");
        qb.push_bind(limit);

        let cards = qb.build_query_as::<RouteCard>().fetch_all(&self.pool).await?;
        Ok(cards)
    }

    async fn list_favorite_routes(&self, user: Uuid) -> AppResult<Vec<RouteCard>> {
        let mut qb = card_query(Some(user));
        qb.push(" JOIN route_favorites fav ON fav.route_id = r.id AND fav.user_id = ");
        qb.push_bind(user);
        qb.push(" WHERE (r.is_public = true OR r.creator_id = ");
        qb.push_bind(user);
        qb.push(") ORDER BY r.created_at DESC");

        let cards = qb.build_query_as::<RouteCard>().fetch_all(&self.pool).await?;
        Ok(cards)
    }

    /// create_route
    ///
    /// Route row, tag links and waypoints are written in one transaction.
    async fn create_route(&self, new_route: NewRoute) -> AppResult<Route> {
        let NewRoute { route, tags, waypoints } = new_route;
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Route>(&format!(
            "INSERT INTO routes AS r (id, creator_id, name, location, description, route_type_id, \
             difficulty_id, thumbnail_url, duration, distance, avg_rating, created_at, edited_at, \
             is_public, published_at, last_edited_by_id, last_edited_by_role, geo_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {ROUTE_COLUMNS}"
        ))
        .bind(route.id)
        .bind(route.creator_id)
        .bind(&route.name)
        .bind(&route.location)
        .bind(&route.description)
        .bind(route.route_type_id)
        .bind(route.difficulty_id)
        .bind(&route.thumbnail_url)
        .bind(route.duration)
        .bind(route.distance)
        .bind(route.avg_rating)
        .bind(route.created_at)
        .bind(route.edited_at)
        .bind(route.is_public)
        .bind(route.published_at)
        .bind(route.last_edited_by_id)
        .bind(route.last_edited_by_role)
        .bind(&route.geo_data)
        .fetch_one(&mut *tx)
        .await?;

        replace_tags(&mut tx, created.id, &tags).await?;
        for wp in &waypoints {
            insert_waypoint(&mut tx, wp).await?;
        }

        tx.commit().await?;
        tracing::info!(route_id = %created.id, waypoints = waypoints.len(), "route created");
        Ok(created)
    }

    async fn update_route(&self, id: Uuid, edit: RouteEdit) -> AppResult<Option<Route>> {
        let RouteEdit {
            changes,
            waypoints,
            editor_id,
            editor_role,
        } = edit;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Route>(&format!(
            "UPDATE routes AS r SET \
                name = COALESCE($2, name), \
                location = COALESCE($3, location), \
                description = COALESCE($4, description), \
                route_type_id = COALESCE($5, route_type_id), \
                difficulty_id = COALESCE($6, difficulty_id), \
                thumbnail_url = COALESCE($7, thumbnail_url), \
                duration = COALESCE($8, duration), \
                distance = COALESCE($9, distance), \
                geo_data = COALESCE($12, geo_data), \
                edited_at = NOW(), \
                last_edited_by_id = $10, \
                last_edited_by_role = $11 \
             WHERE r.id = $1 RETURNING {ROUTE_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.location)
        .bind(changes.description)
        .bind(changes.route_type_id)
        .bind(changes.difficulty_id)
        .bind(changes.thumbnail_url)
        .bind(changes.duration)
        .bind(changes.distance)
        .bind(editor_id)
        .bind(editor_role)
        .bind(changes.geo_data)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            return Ok(None);
        };

        if let Some(tags) = changes.tags {
            replace_tags(&mut tx, id, &tags).await?;
        }
        if let Some(waypoints) = waypoints {
            sqlx::query("DELETE FROM waypoints WHERE route_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for wp in &waypoints {
                insert_waypoint(&mut tx, wp).await?;
            }
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn apply_transition(&self, id: Uuid, transition: Transition) -> AppResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>(&format!(
            "UPDATE routes AS r SET \
                is_public = $2, \
                published_at = $3, \
                last_edited_by_id = $4, \
                last_edited_by_role = $5, \
                edited_at = NOW() \
             WHERE r.id = $1 RETURNING {ROUTE_COLUMNS}"
        ))
        .bind(id)
        .bind(transition.is_public)
        .bind(transition.published_at)
        .bind(transition.edited_by)
        .bind(transition.edited_by_role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(route)
    }

    /// delete_route
    ///
    /// Comments point at routes without a foreign key, so they are removed in
    /// the same transaction. Waypoints, tags, likes and favorites cascade.
    async fn delete_route(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        delete_route_comments(&mut tx, "r.id = $1", id).await?;
        let res = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn like_route(&self, user: Uuid, route: Uuid) -> AppResult<bool> {
        let res = sqlx::query(
            "INSERT INTO route_likes (user_id, route_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user)
        .bind(route)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn unlike_route(&self, user: Uuid, route: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM route_likes WHERE user_id = $1 AND route_id = $2")
            .bind(user)
            .bind(route)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn favorite_route(&self, user: Uuid, route: Uuid) -> AppResult<bool> {
        let res = sqlx::query(
            "INSERT INTO route_favorites (user_id, route_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user)
        .bind(route)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn unfavorite_route(&self, user: Uuid, route: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM route_favorites WHERE user_id = $1 AND route_id = $2")
            .bind(user)
            .bind(route)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- WAYPOINTS ---

    async fn list_waypoints(&self, route: Uuid) -> AppResult<Vec<Waypoint>> {
        let waypoints = sqlx::query_as::<_, Waypoint>(&format!(
            "SELECT {WAYPOINT_COLUMNS} FROM waypoints WHERE route_id = $1 \
             ORDER BY position NULLS LAST, id"
        ))
        .bind(route)
        .fetch_all(&self.pool)
        .await?;
        Ok(waypoints)
    }

    async fn get_waypoint(&self, route: Uuid, id: Uuid) -> AppResult<Option<Waypoint>> {
        let waypoint = sqlx::query_as::<_, Waypoint>(&format!(
            "SELECT {WAYPOINT_COLUMNS} FROM waypoints WHERE route_id = $1 AND id = $2"
        ))
        .bind(route)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(waypoint)
    }

    /// add_waypoint
    ///
    /// Connected points lock the current sequence (`FOR UPDATE`), append the new
    /// point and write back only the rows whose slot changed.
    async fn add_waypoint(&self, waypoint: Waypoint) -> AppResult<Waypoint> {
        let mut tx = self.pool.begin().await?;

        let stored = if waypoint.is_isolated() {
            insert_waypoint(&mut tx, &waypoint).await?;
            waypoint
        } else {
            let mut sequence = lock_connected(&mut tx, waypoint.route_id).await?;
            sequence.push(waypoint.clone());

            let changed = ordering::reindex(sequence);
            let mut stored = waypoint;
            let mut others = Vec::with_capacity(changed.len());
            for wp in changed {
                if wp.id == stored.id {
                    stored = wp;
                } else {
                    others.push(wp);
                }
            }
            write_sequence(&mut tx, &others).await?;
            insert_waypoint(&mut tx, &stored).await?;
            stored
        };

        touch_route(&mut tx, stored.route_id).await?;
        tx.commit().await?;
        tracing::debug!(route_id = %stored.route_id, waypoint_id = %stored.id, kind = ?stored.kind, "waypoint added");
        Ok(stored)
    }

    /// update_waypoint
    ///
    /// Isolated points may move; connected ones only change their description
    /// and photo, after which the sequence is re-validated.
    async fn update_waypoint(
        &self,
        route: Uuid,
        id: Uuid,
        changes: UpdateWaypointRequest,
    ) -> AppResult<Option<Waypoint>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Waypoint>(&format!(
            "SELECT {WAYPOINT_COLUMNS} FROM waypoints WHERE route_id = $1 AND id = $2 FOR UPDATE"
        ))
        .bind(route)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(current) = current else {
            return Ok(None);
        };

        if current.is_isolated() {
            sqlx::query(
                "UPDATE waypoints SET lat = COALESCE($2, lat), lon = COALESCE($3, lon), \
                 description = COALESCE($4, description), photo_url = COALESCE($5, photo_url) \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(changes.lat)
            .bind(changes.lon)
            .bind(changes.description)
            .bind(changes.photo_url)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                "UPDATE waypoints SET description = COALESCE($2, description), \
                 photo_url = COALESCE($3, photo_url) WHERE id = $1",
            )
            .bind(id)
            .bind(changes.description)
            .bind(changes.photo_url)
            .execute(&mut *tx)
            .await?;

            let sequence = lock_connected(&mut tx, route).await?;
            write_sequence(&mut tx, &ordering::reindex(sequence)).await?;
        }

        let updated = sqlx::query_as::<_, Waypoint>(&format!(
            "SELECT {WAYPOINT_COLUMNS} FROM waypoints WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        touch_route(&mut tx, route).await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_waypoint(&self, route: Uuid, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let mut sequence = lock_connected(&mut tx, route).await?;
        let res = sqlx::query("DELETE FROM waypoints WHERE route_id = $1 AND id = $2")
            .bind(route)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Ok(false);
        }

        let before = sequence.len();
        sequence.retain(|wp| wp.id != id);
        if sequence.len() != before {
            write_sequence(&mut tx, &ordering::reindex(sequence)).await?;
        }

        touch_route(&mut tx, route).await?;
        tx.commit().await?;
        tracing::debug!(route_id = %route, waypoint_id = %id, "waypoint deleted");
        Ok(true)
    }

    // --- COMMENTS ---

    async fn list_comments(
        &self,
        target_type: &str,
        target_id: Uuid,
        viewer: Option<Uuid>,
    ) -> AppResult<Vec<CommentView>> {
        let comments = sqlx::query_as::<_, CommentView>(
            "SELECT c.id, c.comment_text, c.created_at, \
                    u.login AS creator_login, u.profile_picture AS creator_avatar, \
                    (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS likes_count, \
                    EXISTS(SELECT 1 FROM comment_likes cl WHERE cl.comment_id = c.id AND cl.user_id = $3) AS is_liked \
             FROM comments c \
             JOIN target_types t ON t.id = c.target_type_id \
             JOIN users u ON u.id = c.creator_id \
             WHERE t.name = $1 AND c.target_id = $2 \
             ORDER BY c.created_at ASC",
        )
        .bind(target_type)
        .bind(target_id)
        .bind(viewer)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    /// create_comment
    ///
    /// Insert and author join in one statement through a CTE.
    async fn create_comment(
        &self,
        author: Uuid,
        target_type: &str,
        target_id: Uuid,
        text: &str,
    ) -> AppResult<CommentView> {
        let comment = sqlx::query_as::<_, CommentView>(
            "WITH inserted AS ( \
                INSERT INTO comments (creator_id, target_type_id, target_id, comment_text) \
                SELECT $1, t.id, $3, $4 FROM target_types t WHERE t.name = $2 \
                RETURNING id, creator_id, comment_text, created_at \
             ) \
             SELECT i.id, i.comment_text, i.created_at, \
                    u.login AS creator_login, u.profile_picture AS creator_avatar, \
                    0::BIGINT AS likes_count, false AS is_liked \
             FROM inserted i JOIN users u ON u.id = i.creator_id",
        )
        .bind(author)
        .bind(target_type)
        .bind(target_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT c.id, c.creator_id, t.name AS target_type, c.target_id, c.comment_text, c.created_at \
             FROM comments c JOIN target_types t ON t.id = c.target_type_id WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn like_comment(&self, user: Uuid, comment: Uuid) -> AppResult<bool> {
        let res = sqlx::query(
            "INSERT INTO comment_likes (user_id, comment_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user)
        .bind(comment)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn unlike_comment(&self, user: Uuid, comment: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2")
            .bind(user)
            .bind(comment)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
