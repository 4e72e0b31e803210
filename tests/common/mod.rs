//! Shared test scaffolding: an in-memory `Repository` and state builders.
//!
//! The in-memory store keeps the same waypoint rules as Postgres by running
//! every sequence mutation through `ordering::reindex`.

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use turtut_backend::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    error::AppResult,
    lifecycle::Transition,
    models::{
        Comment, CommentView, NewUser, ReferenceItem, Route, RouteCard, RouteFilter,
        RouteOrdering, RouteSummary, UpdateProfileRequest, UpdateWaypointRequest, User, UserRole,
        Waypoint,
    },
    ordering,
    repository::{NewRoute, ReferenceTable, Repository, RepositoryState, RouteEdit},
    storage::{MockStorageService, StorageState},
};
use uuid::Uuid;

pub const PASSWORD: &str = "trail2024";

#[derive(Default)]
struct Store {
    users: Vec<User>,
    routes: Vec<Route>,
    tags: HashMap<Uuid, Vec<Uuid>>,
    waypoints: Vec<Waypoint>,
    route_likes: HashSet<(Uuid, Uuid)>,
    favorites: HashSet<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    comment_likes: HashSet<(Uuid, Uuid)>,
    reference: HashMap<&'static str, Vec<ReferenceItem>>,
}

impl Store {
    fn connected(&self, route: Uuid) -> Vec<Waypoint> {
        self.waypoints
            .iter()
            .filter(|w| w.route_id == route && !w.is_isolated())
            .cloned()
            .collect()
    }

    fn write_sequence(&mut self, changed: Vec<Waypoint>) {
        for wp in changed {
            if let Some(stored) = self.waypoints.iter_mut().find(|w| w.id == wp.id) {
                stored.position = wp.position;
                stored.kind = wp.kind;
            }
        }
    }

    fn touch(&mut self, route: Uuid) {
        if let Some(r) = self.routes.iter_mut().find(|r| r.id == route) {
            r.edited_at = Utc::now();
        }
    }

    fn reference_name(&self, table: ReferenceTable, id: Option<Uuid>) -> Option<String> {
        let id = id?;
        self.reference
            .get(table.table_name())?
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.name.clone())
    }

    fn comments_on_route(&self, route: Uuid) -> i64 {
        self.comments
            .iter()
            .filter(|c| c.target_type == "route" && c.target_id == route)
            .count() as i64
    }

    fn card(&self, route: &Route, viewer: Option<Uuid>) -> RouteCard {
        RouteCard {
            id: route.id,
            name: route.name.clone(),
            location: route.location.clone(),
            avg_rating: route.avg_rating,
            likes_count: self.route_likes.iter().filter(|(_, r)| *r == route.id).count() as i64,
            comments_count: self.comments_on_route(route.id),
            is_favorite: viewer.is_some_and(|v| self.favorites.contains(&(v, route.id))),
            is_liked: viewer.is_some_and(|v| self.route_likes.contains(&(v, route.id))),
            thumbnail_url: route.thumbnail_url.clone(),
            route_type_id: route.route_type_id,
            route_type_name: self.reference_name(ReferenceTable::RouteTypes, route.route_type_id),
            difficulty_name: self
                .reference_name(ReferenceTable::DifficultyTypes, route.difficulty_id),
        }
    }

    fn comment_view(&self, comment: &Comment, viewer: Option<Uuid>) -> CommentView {
        let author = self.users.iter().find(|u| u.id == comment.creator_id);
        CommentView {
            id: comment.id,
            comment_text: comment.comment_text.clone(),
            created_at: comment.created_at,
            creator_login: author.map(|u| u.login.clone()).unwrap_or_default(),
            creator_avatar: author.and_then(|u| u.profile_picture.clone()),
            likes_count: self
                .comment_likes
                .iter()
                .filter(|(_, c)| *c == comment.id)
                .count() as i64,
            is_liked: viewer.is_some_and(|v| self.comment_likes.contains(&(v, comment.id))),
        }
    }

    fn remove_route(&mut self, id: Uuid) -> bool {
        let before = self.routes.len();
        self.routes.retain(|r| r.id != id);
        if self.routes.len() == before {
            return false;
        }
        self.waypoints.retain(|w| w.route_id != id);
        self.tags.remove(&id);
        self.route_likes.retain(|(_, r)| *r != id);
        self.favorites.retain(|(_, r)| *r != id);

        let dropped: HashSet<Uuid> = self
            .comments
            .iter()
            .filter(|c| c.target_type == "route" && c.target_id == id)
            .map(|c| c.id)
            .collect();
        self.comments.retain(|c| !dropped.contains(&c.id));
        self.comment_likes.retain(|(_, c)| !dropped.contains(c));
        true
    }
}

/// InMemoryRepository
///
/// `Repository` over plain vectors, seeded with a few rows per lookup table.
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

fn seed(names: &[&str]) -> Vec<ReferenceItem> {
    names
        .iter()
        .map(|name| ReferenceItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
        })
        .collect()
}

impl InMemoryRepository {
    pub fn new() -> Self {
        let mut store = Store::default();
        store
            .reference
            .insert("route_types", seed(&["cycling", "hiking", "walking"]));
        store
            .reference
            .insert("difficulty_types", seed(&["easy", "hard", "medium"]));
        store
            .reference
            .insert("target_types", seed(&["news", "post", "route"]));
        store
            .reference
            .insert("route_tags", seed(&["forest", "lake", "mountains"]));
        Self {
            store: Mutex::new(store),
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }

    /// Id of a seeded lookup row.
    pub fn reference_id(&self, table: ReferenceTable, name: &str) -> Uuid {
        self.store().reference[table.table_name()]
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.id)
            .unwrap()
    }

    /// Inserts a user with `PASSWORD` hashed at bcrypt's minimum cost.
    pub fn seed_user(&self, login: &str, role: UserRole) -> User {
        let user = User {
            id: Uuid::new_v4(),
            login: login.to_string(),
            email: format!("{login}@example.com"),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            hashed_password: bcrypt::hash(PASSWORD, 4).unwrap(),
            role,
            created_at: Utc::now(),
            ..User::default()
        };
        self.store().users.push(user.clone());
        user
    }

    pub fn block(&self, id: Uuid) {
        if let Some(user) = self.store().users.iter_mut().find(|u| u.id == id) {
            user.is_blocked = true;
            user.block_reason = Some("spam".to_string());
        }
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.store().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn route(&self, id: Uuid) -> Option<Route> {
        self.store().routes.iter().find(|r| r.id == id).cloned()
    }

    pub fn waypoints_of(&self, route: Uuid) -> Vec<Waypoint> {
        self.store()
            .waypoints
            .iter()
            .filter(|w| w.route_id == route)
            .cloned()
            .collect()
    }

    pub fn comment_count(&self) -> usize {
        self.store().comments.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.user(id))
    }

    async fn find_user(&self, identifier: &str) -> AppResult<Option<User>> {
        let identifier = identifier.trim().to_lowercase();
        Ok(self
            .store()
            .users
            .iter()
            .find(|u| u.login == identifier || u.email == identifier)
            .cloned())
    }

    async fn login_taken(&self, login: &str) -> AppResult<bool> {
        Ok(self.store().users.iter().any(|u| u.login == login))
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> AppResult<bool> {
        Ok(self
            .store()
            .users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except))
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let created = User {
            id: Uuid::new_v4(),
            login: user.login,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            hashed_password: user.hashed_password,
            gender: user.gender,
            age: user.age,
            profile_picture: user.profile_picture,
            description: user.description,
            created_at: Utc::now(),
            ..User::default()
        };
        self.store().users.push(created.clone());
        Ok(created)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: UpdateProfileRequest,
    ) -> AppResult<Option<User>> {
        let mut store = self.store();
        let Some(user) = store.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.first_name {
            user.first_name = v;
        }
        if let Some(v) = changes.last_name {
            user.last_name = v;
        }
        if changes.gender.is_some() {
            user.gender = changes.gender;
        }
        if changes.age.is_some() {
            user.age = changes.age;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        if changes.description.is_some() {
            user.description = changes.description;
        }
        Ok(Some(user.clone()))
    }

    async fn set_profile_picture(&self, id: Uuid, url: &str) -> AppResult<Option<User>> {
        let mut store = self.store();
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.profile_picture = Some(url.to_string());
            user.clone()
        }))
    }

    async fn set_password_hash(&self, id: Uuid, hashed_password: &str) -> AppResult<bool> {
        let mut store = self.store();
        Ok(store
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .map(|user| user.hashed_password = hashed_password.to_string())
            .is_some())
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        if let Some(user) = self.store().users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_users(&self, skip: i64, limit: i64) -> AppResult<Vec<User>> {
        Ok(self
            .store()
            .users
            .iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn set_block_status(
        &self,
        id: Uuid,
        blocked: bool,
        reason: Option<String>,
    ) -> AppResult<Option<User>> {
        let mut store = self.store();
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.is_blocked = blocked;
            user.block_reason = if blocked { reason } else { None };
            user.block_date = blocked.then(Utc::now);
            user.clone()
        }))
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> AppResult<Option<User>> {
        let mut store = self.store();
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.store();
        let before = store.users.len();
        store.users.retain(|u| u.id != id);
        if store.users.len() == before {
            return Ok(false);
        }
        let owned: Vec<Uuid> = store
            .routes
            .iter()
            .filter(|r| r.creator_id == id)
            .map(|r| r.id)
            .collect();
        for route in owned {
            store.remove_route(route);
        }
        store.comments.retain(|c| c.creator_id != id);
        store.route_likes.retain(|(u, _)| *u != id);
        store.favorites.retain(|(u, _)| *u != id);
        store.comment_likes.retain(|(u, _)| *u != id);
        Ok(true)
    }

    async fn list_reference(&self, table: ReferenceTable) -> AppResult<Vec<ReferenceItem>> {
        Ok(self.store().reference[table.table_name()].clone())
    }

    async fn reference_exists(&self, table: ReferenceTable, id: Uuid) -> AppResult<bool> {
        Ok(self.store().reference[table.table_name()]
            .iter()
            .any(|item| item.id == id))
    }

    async fn target_type_exists(&self, name: &str) -> AppResult<bool> {
        Ok(self.store().reference["target_types"]
            .iter()
            .any(|item| item.name == name))
    }

    async fn get_route(&self, id: Uuid) -> AppResult<Option<Route>> {
        Ok(self.route(id))
    }

    async fn route_summary(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> AppResult<Option<RouteSummary>> {
        let store = self.store();
        let Some(route) = store.routes.iter().find(|r| r.id == id) else {
            return Ok(None);
        };
        let card = store.card(route, viewer);
        Ok(Some(RouteSummary {
            route: route.clone(),
            creator_login: store
                .users
                .iter()
                .find(|u| u.id == route.creator_id)
                .map(|u| u.login.clone()),
            route_type_name: card.route_type_name,
            difficulty_name: card.difficulty_name,
            likes_count: card.likes_count,
            comments_count: card.comments_count,
            is_liked: card.is_liked,
            is_favorite: card.is_favorite,
        }))
    }

    async fn route_tags(&self, id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut tags = self.store().tags.get(&id).cloned().unwrap_or_default();
        tags.sort();
        Ok(tags)
    }

    async fn list_public_routes(
        &self,
        filter: &RouteFilter,
        viewer: Option<Uuid>,
    ) -> AppResult<Vec<RouteCard>> {
        let store = self.store();
        let contains = |value: &Option<String>, needle: &Option<String>| match needle
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            Some(needle) => value
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase())),
            None => true,
        };

        let mut routes: Vec<&Route> = store
            .routes
            .iter()
            .filter(|r| r.is_public)
            .filter(|r| contains(&Some(r.name.clone()), &filter.search))
            .filter(|r| contains(&r.location, &filter.location))
            .filter(|r| filter.route_type_id.is_none_or(|t| r.route_type_id == Some(t)))
            .filter(|r| filter.difficulty_id.is_none_or(|d| r.difficulty_id == Some(d)))
            .collect();

        match filter.ordering {
            Some(RouteOrdering::Rating) => routes.sort_by(|a, b| {
                b.avg_rating
                    .total_cmp(&a.avg_rating)
                    .then(b.created_at.cmp(&a.created_at))
            }),
            Some(RouteOrdering::Recent) => routes.sort_by(|a, b| {
                b.published_at
                    .cmp(&a.published_at)
                    .then(b.created_at.cmp(&a.created_at))
            }),
            None => routes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        let (skip, limit) = filter.page();
        Ok(routes
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|r| store.card(r, viewer))
            .collect())
    }

    async fn list_user_routes(
        &self,
        creator: Uuid,
        include_drafts: bool,
        viewer: Option<Uuid>,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<RouteCard>> {
        let store = self.store();
        let mut routes: Vec<&Route> = store
            .routes
            .iter()
            .filter(|r| r.creator_id == creator && (include_drafts || r.is_public))
            .collect();
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(routes
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|r| store.card(r, viewer))
            .collect())
    }

    async fn list_favorite_routes(&self, user: Uuid) -> AppResult<Vec<RouteCard>> {
        let store = self.store();
        Ok(store
            .routes
            .iter()
            .filter(|r| store.favorites.contains(&(user, r.id)))
            .filter(|r| r.is_public || r.creator_id == user)
            .map(|r| store.card(r, Some(user)))
            .collect())
    }

    async fn create_route(&self, new_route: NewRoute) -> AppResult<Route> {
        let NewRoute {
            route,
            tags,
            waypoints,
        } = new_route;
        let mut store = self.store();
        store.routes.push(route.clone());
        store.tags.insert(route.id, tags);
        store.waypoints.extend(waypoints);
        Ok(route)
    }

    async fn update_route(&self, id: Uuid, edit: RouteEdit) -> AppResult<Option<Route>> {
        let RouteEdit {
            changes,
            waypoints,
            editor_id,
            editor_role,
        } = edit;
        let mut store = self.store();
        let Some(route) = store.routes.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        if let Some(v) = changes.name {
            route.name = v;
        }
        if changes.location.is_some() {
            route.location = changes.location;
        }
        if changes.description.is_some() {
            route.description = changes.description;
        }
        if changes.route_type_id.is_some() {
            route.route_type_id = changes.route_type_id;
        }
        if changes.difficulty_id.is_some() {
            route.difficulty_id = changes.difficulty_id;
        }
        if changes.thumbnail_url.is_some() {
            route.thumbnail_url = changes.thumbnail_url;
        }
        if changes.duration.is_some() {
            route.duration = changes.duration;
        }
        if changes.distance.is_some() {
            route.distance = changes.distance;
        }
        if changes.geo_data.is_some() {
            route.geo_data = changes.geo_data;
        }
        route.edited_at = Utc::now();
        route.last_edited_by_id = Some(editor_id);
        route.last_edited_by_role = Some(editor_role);
        let updated = route.clone();

        if let Some(tags) = changes.tags {
            store.tags.insert(id, tags);
        }
        if let Some(waypoints) = waypoints {
            store.waypoints.retain(|w| w.route_id != id);
            store.waypoints.extend(waypoints);
        }
        Ok(Some(updated))
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        transition: Transition,
    ) -> AppResult<Option<Route>> {
        let mut store = self.store();
        Ok(store.routes.iter_mut().find(|r| r.id == id).map(|route| {
            route.is_public = transition.is_public;
            route.published_at = transition.published_at;
            route.last_edited_by_id = Some(transition.edited_by);
            route.last_edited_by_role = Some(transition.edited_by_role);
            route.edited_at = Utc::now();
            route.clone()
        }))
    }

    async fn delete_route(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.store().remove_route(id))
    }

    async fn like_route(&self, user: Uuid, route: Uuid) -> AppResult<bool> {
        Ok(self.store().route_likes.insert((user, route)))
    }

    async fn unlike_route(&self, user: Uuid, route: Uuid) -> AppResult<bool> {
        Ok(self.store().route_likes.remove(&(user, route)))
    }

    async fn favorite_route(&self, user: Uuid, route: Uuid) -> AppResult<bool> {
        Ok(self.store().favorites.insert((user, route)))
    }

    async fn unfavorite_route(&self, user: Uuid, route: Uuid) -> AppResult<bool> {
        Ok(self.store().favorites.remove(&(user, route)))
    }

    async fn list_waypoints(&self, route: Uuid) -> AppResult<Vec<Waypoint>> {
        let mut waypoints = self.waypoints_of(route);
        waypoints.sort_by_key(|w| (w.position.is_none(), w.position, w.id));
        Ok(waypoints)
    }

    async fn get_waypoint(&self, route: Uuid, id: Uuid) -> AppResult<Option<Waypoint>> {
        Ok(self
            .store()
            .waypoints
            .iter()
            .find(|w| w.route_id == route && w.id == id)
            .cloned())
    }

    async fn add_waypoint(&self, waypoint: Waypoint) -> AppResult<Waypoint> {
        let mut store = self.store();
        let route = waypoint.route_id;

        let stored = if waypoint.is_isolated() {
            waypoint
        } else {
            let mut sequence = store.connected(route);
            sequence.push(waypoint.clone());
            let mut stored = waypoint;
            let mut others = Vec::new();
            for wp in ordering::reindex(sequence) {
                if wp.id == stored.id {
                    stored = wp;
                } else {
                    others.push(wp);
                }
            }
            store.write_sequence(others);
            stored
        };

        store.waypoints.push(stored.clone());
        store.touch(route);
        Ok(stored)
    }

    async fn update_waypoint(
        &self,
        route: Uuid,
        id: Uuid,
        changes: UpdateWaypointRequest,
    ) -> AppResult<Option<Waypoint>> {
        let mut store = self.store();
        let Some(current) = store
            .waypoints
            .iter_mut()
            .find(|w| w.route_id == route && w.id == id)
        else {
            return Ok(None);
        };

        if current.is_isolated() {
            if let Some(lat) = changes.lat {
                current.lat = lat;
            }
            if let Some(lon) = changes.lon {
                current.lon = lon;
            }
        }
        if changes.description.is_some() {
            current.description = changes.description;
        }
        if changes.photo_url.is_some() {
            current.photo_url = changes.photo_url;
        }
        let isolated = current.is_isolated();

        if !isolated {
            let changed = ordering::reindex(store.connected(route));
            store.write_sequence(changed);
        }
        store.touch(route);
        Ok(store.waypoints.iter().find(|w| w.id == id).cloned())
    }

    async fn delete_waypoint(&self, route: Uuid, id: Uuid) -> AppResult<bool> {
        let mut store = self.store();
        let Some(index) = store
            .waypoints
            .iter()
            .position(|w| w.route_id == route && w.id == id)
        else {
            return Ok(false);
        };

        let removed = store.waypoints.remove(index);
        if !removed.is_isolated() {
            let changed = ordering::reindex(store.connected(route));
            store.write_sequence(changed);
        }
        store.touch(route);
        Ok(true)
    }

    async fn list_comments(
        &self,
        target_type: &str,
        target_id: Uuid,
        viewer: Option<Uuid>,
    ) -> AppResult<Vec<CommentView>> {
        let store = self.store();
        Ok(store
            .comments
            .iter()
            .filter(|c| c.target_type == target_type && c.target_id == target_id)
            .map(|c| store.comment_view(c, viewer))
            .collect())
    }

    async fn create_comment(
        &self,
        author: Uuid,
        target_type: &str,
        target_id: Uuid,
        text: &str,
    ) -> AppResult<CommentView> {
        let mut store = self.store();
        let comment = Comment {
            id: Uuid::new_v4(),
            creator_id: author,
            target_type: target_type.to_string(),
            target_id,
            comment_text: text.to_string(),
            created_at: Utc::now(),
        };
        store.comments.push(comment.clone());
        Ok(store.comment_view(&comment, Some(author)))
    }

    async fn get_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        Ok(self.store().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn delete_comment(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.store();
        let before = store.comments.len();
        store.comments.retain(|c| c.id != id);
        store.comment_likes.retain(|(_, c)| *c != id);
        Ok(store.comments.len() != before)
    }

    async fn like_comment(&self, user: Uuid, comment: Uuid) -> AppResult<bool> {
        Ok(self.store().comment_likes.insert((user, comment)))
    }

    async fn unlike_comment(&self, user: Uuid, comment: Uuid) -> AppResult<bool> {
        Ok(self.store().comment_likes.remove(&(user, comment)))
    }
}

// --- State builders ---

pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    state_with_storage(repo, MockStorageService::new())
}

pub fn state_with_storage(repo: Arc<InMemoryRepository>, storage: MockStorageService) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        storage: Arc::new(storage) as StorageState,
        config: AppConfig::default(),
    }
}

pub fn auth(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role,
    }
}
