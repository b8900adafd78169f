//! Caller-facing availability and account API.
//!
//! # Responsibility
//! - Accept loosely-typed request payloads (JSON strings, query values).
//! - Run the matching use-case and map every outcome to a JSON body plus a
//!   status-code equivalent.
//!
//! # Invariants
//! - Handlers never panic; all failures become an `ApiError`.
//! - Storage failures are reported generically; details go to the log only.
//! - Routing, cookies and transport belong to the embedding web layer.

use crate::clock::Clock;
use crate::identity::IdentityProvider;
use crate::model::interval::{to_storage_precision, AvailabilityInterval};
use crate::model::user::User;
use crate::repo::interval_repo::IntervalRepository;
use crate::repo::user_repo::{UserDirectory, UserRepository};
use crate::service::availability_service::{AvailabilityError, AvailabilityService, IntervalView};
use crate::service::user_service::{CreateUserRequest, UserService, UserServiceError};
use crate::service::week::WeekWindow;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const LOCAL_INSTANT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Status classes an embedding web layer maps onto its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    Ok,
    BadRequest,
    Unauthorized,
    Forbidden,
    Conflict,
    Internal,
}

impl ApiStatus {
    /// HTTP-equivalent numeric code.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// Failed request: status class plus a caller-safe message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: ApiStatus,
    pub message: String,
}

impl ApiError {
    fn new(status: ApiStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiStatus::BadRequest, message)
    }
}

impl From<AvailabilityError> for ApiError {
    fn from(value: AvailabilityError) -> Self {
        match value {
            AvailabilityError::InvalidRange(_) => Self::bad_request("End must be after start"),
            AvailabilityError::NotAuthenticated => {
                Self::new(ApiStatus::Unauthorized, "Not authenticated")
            }
            other => {
                error!(
                    "event=api_request module=api status=error error_code=availability_failure error={}",
                    other
                );
                Self::new(ApiStatus::Internal, "Internal error")
            }
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(value: UserServiceError) -> Self {
        match value {
            UserServiceError::NotAuthorized => Self::new(ApiStatus::Forbidden, "Not authorized"),
            UserServiceError::MissingField(_) => {
                Self::bad_request("Missing name or email")
            }
            UserServiceError::InvalidEmail(_) => Self::bad_request("Invalid email"),
            UserServiceError::DuplicateEmail(_) => Self::new(
                ApiStatus::Conflict,
                "User with that email already exists",
            ),
            UserServiceError::Repo(err) => {
                error!(
                    "event=api_request module=api status=error error_code=user_failure error={}",
                    err
                );
                Self::new(ApiStatus::Internal, "Internal error")
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Renders a handler outcome as `(status_code, json_body)`.
///
/// Errors become `{"error": "<message>"}`.
pub fn respond<T: Serialize>(result: ApiResult<T>) -> (u16, Value) {
    match result {
        Ok(body) => match serde_json::to_value(&body) {
            Ok(value) => (ApiStatus::Ok.status_code(), value),
            Err(err) => {
                error!(
                    "event=api_respond module=api status=error error_code=serialize_failed error={}",
                    err
                );
                (
                    ApiStatus::Internal.status_code(),
                    json!({ "error": "Internal error" }),
                )
            }
        },
        Err(err) => (err.status.status_code(), json!({ "error": err.message })),
    }
}

/// `?weekStart=YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub week_start: Option<String>,
}

/// `{ "start": "...", "end": "..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AvailabilityBody {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// `{ "name", "email", "role" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateUserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekBlocksResponse {
    pub blocks: Vec<IntervalView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AckResponse {
    pub ok: bool,
}

/// Lists intervals touching `[weekStart, weekStart + 7d)`.
///
/// `weekStart` is used as given (not snapped to Sunday). A date whose week
/// would run past the calendar edge is a bad request.
pub fn get_availability<I, U, C>(
    service: &AvailabilityService<I, U, C>,
    query: &WeekQuery,
) -> ApiResult<WeekBlocksResponse>
where
    I: IntervalRepository,
    U: UserDirectory,
    C: Clock,
{
    let raw = query
        .week_start
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing weekStart"))?;
    let window = parse_week_start(raw)
        .and_then(WeekWindow::starting_on)
        .ok_or_else(|| {
            warn!("event=api_request module=api status=rejected error_code=invalid_week_start");
            ApiError::bad_request("Invalid weekStart")
        })?;

    let blocks = service.list_week(window)?;
    Ok(WeekBlocksResponse { blocks })
}

/// Creates or replaces the caller's availability over `[start, end)`.
pub fn post_availability<I, U, C>(
    service: &AvailabilityService<I, U, C>,
    identity: &impl IdentityProvider,
    body: &AvailabilityBody,
) -> ApiResult<AvailabilityInterval>
where
    I: IntervalRepository,
    U: UserDirectory,
    C: Clock,
{
    require_identity(identity)?;
    let (start, end) = parse_body_range(body)?;
    Ok(service.set_for_caller(identity, start, end)?)
}

/// Clears the caller's availability over `[start, end)`. Always acknowledges
/// once the payload parses.
pub fn delete_availability<I, U, C>(
    service: &AvailabilityService<I, U, C>,
    identity: &impl IdentityProvider,
    body: &AvailabilityBody,
) -> ApiResult<AckResponse>
where
    I: IntervalRepository,
    U: UserDirectory,
    C: Clock,
{
    require_identity(identity)?;
    let (start, end) = parse_body_range(body)?;
    service.clear_for_caller(identity, start, end)?;
    Ok(AckResponse { ok: true })
}

/// Admin-only account creation.
pub fn create_user<R: UserRepository>(
    service: &UserService<R>,
    identity: &impl IdentityProvider,
    body: &CreateUserBody,
) -> ApiResult<User> {
    let request = CreateUserRequest {
        name: body.name.clone(),
        email: body.email.clone(),
        role: body.role.clone(),
    };
    Ok(service.create_user(identity, &request)?)
}

/// Parses a date (`2024-06-09`) or a date-time, keeping the date part.
pub fn parse_week_start(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_instant(value).map(|instant| instant.date()))
}

/// Parses an instant as local wall-clock time.
///
/// Values carrying an offset or `Z` are converted to the host's local time;
/// offset-less values are taken as already local. Digits below a millisecond
/// are dropped.
pub fn parse_instant(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Some(to_storage_precision(
            with_offset.with_timezone(&Local).naive_local(),
        ));
    }
    LOCAL_INSTANT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(to_storage_precision)
}

fn require_identity(identity: &impl IdentityProvider) -> ApiResult<()> {
    identity
        .current_identity()
        .map(|_| ())
        .ok_or_else(|| ApiError::new(ApiStatus::Unauthorized, "Not authenticated"))
}

fn parse_body_range(body: &AvailabilityBody) -> ApiResult<(NaiveDateTime, NaiveDateTime)> {
    let (Some(start), Some(end)) = (body.start.as_deref(), body.end.as_deref()) else {
        return Err(ApiError::bad_request("Missing start or end"));
    };
    let start = parse_instant(start).ok_or_else(|| ApiError::bad_request("Invalid start"))?;
    let end = parse_instant(end).ok_or_else(|| ApiError::bad_request("Invalid end"))?;
    Ok((start, end))
}
