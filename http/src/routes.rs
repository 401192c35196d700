//! Route table and handlers.

use crate::error::{IngressError, IngressResult};
use crate::ingress::AppState;
use crate::response::{empty, json};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use http::{Method, Response, StatusCode};
use http_body_util::Full;
use matchit::Router;
use packtrack_core::attendance::{AttendanceEntry, AttendanceQuery};
use packtrack_core::bus::Bus;
use packtrack_core::daily_log::{DailyLogEntry, DailyLogQuery};
use packtrack_core::package::{SortField, SortOrder};
use packtrack_core::{PackageQuery, PackageStatus, PackageUpdate, SessionContext};
use packtrack_db::RecordStore;
use packtrack_session::bearer_token;
use serde::Deserialize;
use serde::de::DeserializeOwned;

type HttpResponse = Response<Full<Bytes>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Session,
    Packages,
    Summary,
    Package,
    PackageStatus,
    Attendance,
    Logs,
}

impl Route {
    /// Routes that need a signed-in session when a passcode is configured.
    pub fn is_protected(self) -> bool {
        matches!(self, Route::Attendance | Route::Logs)
    }
}

pub fn router() -> Result<Router<Route>, matchit::InsertError> {
    let mut router = Router::new();
    router.insert("/health", Route::Health)?;
    router.insert("/session", Route::Session)?;
    router.insert("/packages", Route::Packages)?;
    router.insert("/packages/summary", Route::Summary)?;
    router.insert("/packages/{code}", Route::Package)?;
    router.insert("/packages/{code}/status", Route::PackageStatus)?;
    router.insert("/attendance", Route::Attendance)?;
    router.insert("/logs", Route::Logs)?;
    Ok(router)
}

/// A routed request with its body already read.
#[derive(Debug, Clone)]
pub struct RoutedRequest {
    pub method: Method,
    pub code: Option<String>,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Bytes,
}

impl RoutedRequest {
    fn json<T: DeserializeOwned>(&self) -> IngressResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Like [`json`](Self::json) but an empty body yields the default.
    fn json_or_default<T: DeserializeOwned + Default>(&self) -> IngressResult<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        self.json()
    }

    fn query<T: DeserializeOwned>(&self) -> IngressResult<T> {
        Ok(serde_urlencoded::from_str(self.query.as_deref().unwrap_or(""))?)
    }

    fn code(&self) -> IngressResult<&str> {
        self.code
            .as_deref()
            .ok_or_else(|| IngressError::BadRequest("Missing package code".into()))
    }
}

pub async fn handle(
    state: &AppState,
    route: Route,
    request: &RoutedRequest,
    bus: &mut Bus,
) -> IngressResult<HttpResponse> {
    if route.is_protected() {
        let signed_in = bus
            .get::<SessionContext>()
            .is_some_and(SessionContext::is_authenticated);
        if !signed_in {
            return Err(IngressError::Unauthorized("Sign in required".into()));
        }
    }

    match (route, request.method.as_str()) {
        (Route::Health, "GET") => health(state).await,
        (Route::Session, "POST") => login(state, request),
        (Route::Session, "DELETE") => logout(state, request),
        (Route::Packages, "POST") => generate(state, request).await,
        (Route::Packages, "GET") => list_packages(state, request).await,
        (Route::Summary, "GET") => summary(state).await,
        (Route::Package, "GET") => get_package(state, request).await,
        (Route::PackageStatus, "POST") => update_status(state, request, bus).await,
        (Route::Attendance, "PUT") => put_attendance(state, request).await,
        (Route::Attendance, "GET") => list_attendance(state, request).await,
        (Route::Logs, "PUT") => put_log(state, request, bus).await,
        (Route::Logs, "GET") => list_logs(state, request).await,
        _ => Err(IngressError::MethodNotAllowed(request.method.clone())),
    }
}

async fn health(state: &AppState) -> IngressResult<HttpResponse> {
    let store = state.packages.store();
    store
        .ping()
        .await
        .map_err(|e| IngressError::Unavailable(e.to_string()))?;
    Ok(json(
        StatusCode::OK,
        &serde_json::json!({ "status": "ok", "store": store.backend() }),
    ))
}

// ============== Session ==============

#[derive(Debug, Deserialize)]
struct LoginRequest {
    passcode: String,
    #[serde(default)]
    operator: Option<String>,
}

fn login(state: &AppState, request: &RoutedRequest) -> IngressResult<HttpResponse> {
    let body: LoginRequest = request.json()?;
    let token = state.sessions.login(&body.passcode, body.operator)?;
    Ok(json(StatusCode::OK, &token))
}

fn logout(state: &AppState, request: &RoutedRequest) -> IngressResult<HttpResponse> {
    let token = request.authorization.as_deref().and_then(bearer_token);
    let revoked = token.is_some_and(|t| state.sessions.revoke(t));
    if !revoked && !state.sessions.is_open() {
        return Err(IngressError::Unauthorized("Unknown or expired session".into()));
    }
    Ok(empty(StatusCode::NO_CONTENT))
}

// ============== Packages ==============

#[derive(Debug, Default, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    count: Option<u32>,
}

async fn generate(state: &AppState, request: &RoutedRequest) -> IngressResult<HttpResponse> {
    let body: GenerateRequest = request.json_or_default()?;
    let records = state.packages.generate(body.count.unwrap_or(1)).await?;
    Ok(json(StatusCode::CREATED, &records))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    status: Option<String>,
    prefix: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    sort: Option<SortField>,
    order: Option<SortOrder>,
    limit: Option<u32>,
}

impl From<ListParams> for PackageQuery {
    fn from(params: ListParams) -> Self {
        PackageQuery {
            status: params.status.as_deref().map(PackageStatus::parse),
            code_prefix: params.prefix.filter(|p| !p.is_empty()),
            created_from: params.from,
            created_to: params.to,
            sort: params.sort.unwrap_or_default(),
            order: params.order.unwrap_or_default(),
            limit: params.limit,
        }
    }
}

async fn list_packages(state: &AppState, request: &RoutedRequest) -> IngressResult<HttpResponse> {
    let params: ListParams = request.query()?;
    let records = state.packages.list(&params.into()).await?;
    Ok(json(StatusCode::OK, &records))
}

async fn summary(state: &AppState) -> IngressResult<HttpResponse> {
    Ok(json(StatusCode::OK, &state.packages.summary().await?))
}

async fn get_package(state: &AppState, request: &RoutedRequest) -> IngressResult<HttpResponse> {
    let record = state.packages.get(request.code()?).await?;
    Ok(json(StatusCode::OK, &record))
}

async fn update_status(
    state: &AppState,
    request: &RoutedRequest,
    bus: &mut Bus,
) -> IngressResult<HttpResponse> {
    let update: PackageUpdate = request.json()?;
    let record = state
        .packages
        .update_status(request.code()?, update, bus)
        .await?;
    Ok(json(StatusCode::OK, &record))
}

// ============== Attendance & logs ==============

async fn put_attendance(state: &AppState, request: &RoutedRequest) -> IngressResult<HttpResponse> {
    let entry: AttendanceEntry = request.json()?;
    let record = state.records.record_attendance(entry).await?;
    Ok(json(StatusCode::OK, &record))
}

async fn list_attendance(state: &AppState, request: &RoutedRequest) -> IngressResult<HttpResponse> {
    let query: AttendanceQuery = request.query()?;
    Ok(json(StatusCode::OK, &state.records.attendance(&query).await?))
}

async fn put_log(state: &AppState, request: &RoutedRequest, bus: &mut Bus) -> IngressResult<HttpResponse> {
    let entry: DailyLogEntry = request.json()?;
    let session = bus
        .get::<SessionContext>()
        .cloned()
        .unwrap_or_else(SessionContext::anonymous);
    let log = state.records.record_log(entry, &session).await?;
    Ok(json(StatusCode::OK, &log))
}

#[derive(Debug, Default, Deserialize)]
struct LogParams {
    kind: Option<String>,
    date: Option<NaiveDate>,
}

async fn list_logs(state: &AppState, request: &RoutedRequest) -> IngressResult<HttpResponse> {
    let params: LogParams = request.query()?;
    let query = DailyLogQuery {
        kind: params.kind.as_deref().map(str::parse).transpose()?,
        date: params.date,
    };
    Ok(json(StatusCode::OK, &state.records.logs(&query).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_segment_wins_over_code() {
        let router = router().unwrap();
        assert_eq!(*router.at("/packages/summary").unwrap().value, Route::Summary);

        let matched = router.at("/packages/20261018-0001").unwrap();
        assert_eq!(*matched.value, Route::Package);
        assert_eq!(matched.params.get("code"), Some("20261018-0001"));

        assert_eq!(
            *router.at("/packages/20261018-0001/status").unwrap().value,
            Route::PackageStatus
        );
        assert!(router.at("/nope").is_err());
    }

    #[test]
    fn test_list_params_build_query() {
        let params: ListParams =
            serde_urlencoded::from_str("status=packed&prefix=20261018-&sort=code&order=asc&limit=5")
                .unwrap();
        let query = PackageQuery::from(params);
        assert_eq!(query.status, Some(PackageStatus::Packed));
        assert_eq!(query.code_prefix.as_deref(), Some("20261018-"));
        assert_eq!(query.sort, SortField::Code);
        assert_eq!(query.order, SortOrder::Asc);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_only_records_routes_are_protected() {
        assert!(Route::Attendance.is_protected());
        assert!(Route::Logs.is_protected());
        assert!(!Route::PackageStatus.is_protected());
    }
}
