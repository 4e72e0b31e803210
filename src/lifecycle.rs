//! Route publication state machine.
//!
//! A route is either a draft (`is_public = false`) or published. Only the two
//! transitions below change that state; ordinary edits never do.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Route, UserRole},
};

pub const MIN_WAYPOINTS_TO_PUBLISH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Draft,
    Published,
}

impl RouteState {
    pub fn of(route: &Route) -> Self {
        if route.is_public {
            RouteState::Published
        } else {
            RouteState::Draft
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Route is already published")]
    AlreadyPublished,

    #[error("Route is already a draft")]
    AlreadyDraft,

    /// Every failed publish check, in a fixed order.
    #[error("{}", .0.join(" "))]
    NotPublishable(Vec<String>),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// The fields the publish checks look at.
#[derive(Debug, Clone, Copy)]
pub struct PublishCandidate<'a> {
    pub name: &'a str,
    pub location: Option<&'a str>,
    pub description: Option<&'a str>,
    pub waypoint_count: usize,
}

impl<'a> PublishCandidate<'a> {
    pub fn from_route(route: &'a Route, waypoint_count: usize) -> Self {
        Self {
            name: &route.name,
            location: route.location.as_deref(),
            description: route.description.as_deref(),
            waypoint_count,
        }
    }
}

fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Runs all publish checks and reports every failure at once.
pub fn check_publishable(candidate: &PublishCandidate<'_>) -> Result<(), LifecycleError> {
    let mut errors = Vec::new();
    if blank(Some(candidate.name)) {
        errors.push("Route name is required.".to_string());
    }
    if blank(candidate.location) {
        errors.push("Route location is required.".to_string());
    }
    if blank(candidate.description) {
        errors.push("Route description is required.".to_string());
    }
    if candidate.waypoint_count < MIN_WAYPOINTS_TO_PUBLISH {
        errors.push(format!(
            "At least {MIN_WAYPOINTS_TO_PUBLISH} waypoints are required to publish a route."
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(LifecycleError::NotPublishable(errors))
    }
}

/// Transition
///
/// The column values a successful transition writes to the route.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub is_public: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub edited_by: Uuid,
    pub edited_by_role: UserRole,
}

/// Draft → Published.
pub fn publish(
    state: RouteState,
    candidate: &PublishCandidate<'_>,
    actor: Uuid,
    actor_role: UserRole,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    if state == RouteState::Published {
        return Err(LifecycleError::AlreadyPublished);
    }
    check_publishable(candidate)?;
    Ok(Transition {
        is_public: true,
        published_at: Some(now),
        edited_by: actor,
        edited_by_role: actor_role,
    })
}

/// Published → Draft.
pub fn to_draft(
    state: RouteState,
    actor: Uuid,
    actor_role: UserRole,
) -> Result<Transition, LifecycleError> {
    if state == RouteState::Draft {
        return Err(LifecycleError::AlreadyDraft);
    }
    Ok(Transition {
        is_public: false,
        published_at: None,
        edited_by: actor,
        edited_by_role: actor_role,
    })
}
