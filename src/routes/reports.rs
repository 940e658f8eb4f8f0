use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::AppState;
use crate::db::ReportMetadata;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::pipeline::GeneratedReport;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateReportBody {
    pub period_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn create_report(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<CreateReportBody>,
) -> AppResult<(StatusCode, Json<GeneratedReport>)> {
    let period_id = body
        .period_id
        .ok_or_else(|| AppError::Validation("period_id is required".into()))?;

    let report = state
        .orchestrator
        .generate_report(&principal, period_id)
        .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_reports(
    State(state): State<AppState>,
    AuthUser(_principal): AuthUser,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Vec<ReportMetadata>>> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let reports = state.store.list_reports(limit, offset).await?;

    Ok(Json(reports))
}

pub async fn get_report(
    State(state): State<AppState>,
    AuthUser(_principal): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ReportMetadata>> {
    let report = state
        .store
        .get_report(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::auth::{Principal, Role, TokenVerifier};
    use crate::db::memory::{MemoryStore, program};
    use crate::deck::DeckEngine;
    use crate::pipeline::{GenerationSettings, ReportOrchestrator, SlideLayout, StatusColorMap};

    const SECRET: &str = "route-test-secret";

    fn test_state(reports_dir: &std::path::Path) -> AppState {
        let mut store = MemoryStore::with_period(4, 2024);
        store.add_sector(1, "Education");
        store.add_program(1, 1, program(1, "School Meals", "delayed", None));
        let store: Arc<MemoryStore> = Arc::new(store);

        AppState {
            store: store.clone(),
            orchestrator: ReportOrchestrator {
                store,
                engine: DeckEngine::default(),
                settings: Arc::new(GenerationSettings {
                    reports_dir: reports_dir.to_path_buf(),
                    layout: SlideLayout::default(),
                    colors: StatusColorMap::default(),
                    creator: "Route Tests".to_string(),
                }),
            },
            tokens: TokenVerifier::new(SECRET),
        }
    }

    fn bearer(role: Role) -> String {
        let token = TokenVerifier::new(SECRET)
            .issue(&Principal { user_id: 9, role }, chrono::Duration::hours(1))
            .unwrap();
        format!("Bearer {token}")
    }

    fn post_report(auth: Option<String>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/reports")
            .header("content-type", "application/json");
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn list_len(app: &axum::Router, query: &str) -> usize {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/reports{query}"))
                    .header("authorization", bearer(Role::Viewer))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await.as_array().unwrap().len()
    }

    #[tokio::test]
    async fn test_list_paging_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let app = crate::routes::router(test_state(dir.path()));
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_report(Some(bearer(Role::Admin)), r#"{"period_id": 1}"#))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        assert_eq!(list_len(&app, "").await, 2);
        assert_eq!(list_len(&app, "?limit=0").await, 1);
        assert_eq!(list_len(&app, "?limit=-7&offset=-3").await, 1);
        assert_eq!(list_len(&app, "?offset=-3").await, 2);
        assert_eq!(list_len(&app, "?limit=500&offset=1").await, 1);
    }

    #[tokio::test]
    async fn test_create_requires_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = crate::routes::router(test_state(dir.path()));

        let response = app.oneshot(post_report(None, r#"{"period_id": 1}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_forbidden_for_non_admin() {
        let dir = tempfile::tempdir().unwrap();
        let app = crate::routes::router(test_state(dir.path()));

        let response = app
            .oneshot(post_report(Some(bearer(Role::Agency)), r#"{"period_id": 1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!dir.path().join("pptx").exists());
    }

    #[tokio::test]
    async fn test_create_missing_period_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = crate::routes::router(test_state(dir.path()));

        let response = app
            .oneshot(post_report(Some(bearer(Role::Admin)), "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_then_fetch_report() {
        let dir = tempfile::tempdir().unwrap();
        let app = crate::routes::router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(post_report(Some(bearer(Role::Admin)), r#"{"period_id": 1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        let report_id = created["report_id"].as_i64().unwrap();
        let pptx_path = created["pptx_path"].as_str().unwrap().to_string();
        assert!(dir.path().join(&pptx_path).exists());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/reports/{report_id}"))
                    .header("authorization", bearer(Role::Viewer))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = json_body(response).await;
        assert_eq!(fetched["pptx_path"], pptx_path.as_str());
        assert_eq!(fetched["report_name"], "Q4 2024 Sector Performance Report");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reports?limit=500")
                    .header("authorization", bearer(Role::Viewer))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_report_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = crate::routes::router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reports/404")
                    .header("authorization", bearer(Role::Admin))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
