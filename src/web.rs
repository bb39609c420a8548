use actix_web::{http::StatusCode, middleware, web, App, HttpResponse, HttpServer, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::SlotFinderConfig;
use crate::error::{ErrorKind, SlotFinderError, StoreError};
use crate::model::{StudentId, TermId};
use crate::schedule::slot_utils::{day_name, format_time_slot};
use crate::schedule::{find_placements, PlacementPlan, PlacementRequest};
use crate::store::{PlanExecutor, ScheduleStore, SlotStore};

pub struct AppState {
    pub store: Arc<dyn SlotStore>,
    pub config: SlotFinderConfig,
}

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum AppError {
    Placement(SlotFinderError),
    Store(StoreError),
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Placement(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::BadRequest(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<SlotFinderError> for AppError {
    fn from(e: SlotFinderError) -> Self {
        AppError::Placement(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Placement(e) => match e.kind() {
                ErrorKind::NotFound => "NOT_FOUND",
                ErrorKind::PreconditionFailed => "PRECONDITION_FAILED",
                ErrorKind::DependencyUnavailable => "DEPENDENCY_UNAVAILABLE",
                ErrorKind::Configuration => "CONFIGURATION_ERROR",
            },
            AppError::Store(StoreError::PlanRejected(_)) => "PLAN_REJECTED",
            AppError::Store(_) => "STORE_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Placement(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::PreconditionFailed => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Store(StoreError::PlanRejected(_)) => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiError {
            code: self.code().to_string(),
            message: self.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PlacementQuery {
    term_id: Option<TermId>,
    max_results: Option<usize>,
    include_displacements: Option<bool>,
    timeout_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct GroupResponse {
    id: u32,
    name: String,
    coach: String,
    day: String,
    time_slot: String,
    current_size: u32,
    max_capacity: u32,
    effective_type: String,
    members: Vec<String>,
}

async fn resolve_term(store: &dyn SlotStore, requested: Option<TermId>) -> Result<TermId, AppError> {
    match requested {
        Some(term) => Ok(term),
        None => store
            .active_term()
            .await?
            .ok_or_else(|| {
                AppError::Placement(SlotFinderError::PreconditionFailed(
                    "no active term".to_string(),
                ))
            }),
    }
}

// Placement recommendations for one student
async fn get_placements(
    student_id: web::Path<StudentId>,
    query: web::Query<PlacementQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let student_id = student_id.into_inner();
    if query.max_results == Some(0) {
        return Err(AppError::BadRequest("max_results must be at least 1".to_string()));
    }
    let term_id = resolve_term(state.store.as_ref(), query.term_id).await?;

    let mut request = PlacementRequest::new(student_id, term_id)
        .with_max_results(query.max_results.unwrap_or(state.config.search.max_results))
        .with_displacements(
            query
                .include_displacements
                .unwrap_or(state.config.search.include_displacements),
        );
    if let Some(ms) = query.timeout_ms {
        request = request.with_deadline(Instant::now() + Duration::from_millis(ms));
    }

    let report = find_placements(state.store.as_ref(), &request, &state.config).await?;
    Ok(HttpResponse::Ok().json(report))
}

// Apply an accepted recommendation's plan
async fn execute_plan(
    plan: web::Json<PlacementPlan>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let plan = plan.into_inner();
    if plan.operations.is_empty() {
        return Err(AppError::BadRequest("plan has no operations".to_string()));
    }
    state.store.execute_plan(&plan).await?;
    info!(operations = plan.operations.len(), "Plan executed");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "operations": plan.operations.len()
    })))
}

// Groups of the active term with their current members
async fn get_groups(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let term_id = resolve_term(state.store.as_ref(), None).await?;
    let mut groups = state.store.list_candidate_groups(term_id).await?;
    crate::schedule::slot_utils::sort_groups_chronologically(&mut groups);

    let response: Vec<GroupResponse> = groups
        .iter()
        .map(|g| {
            let occupancy = g.occupancy();
            GroupResponse {
                id: g.id,
                name: g.name.clone(),
                coach: g.coach_name.clone(),
                day: day_name(g.day).to_string(),
                time_slot: format_time_slot(&g.time_slot),
                current_size: occupancy.current_size(),
                max_capacity: g.max_capacity,
                effective_type: occupancy.effective_type().label().to_string(),
                members: occupancy.member_names(),
            }
        })
        .collect();
    Ok(HttpResponse::Ok().json(response))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/api/groups", web::get().to(get_groups))
        .route("/api/plans/execute", web::post().to(execute_plan))
        .service(web::resource("/api/placements/{student_id}").route(web::get().to(get_placements)));
}

pub async fn start_server(store: Arc<dyn SlotStore>, config: SlotFinderConfig) -> std::io::Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let app_state = web::Data::new(AppState { store, config });

    info!("Server listening on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use crate::error::StoreResult;
    use crate::model::{CoachId, Enrollment, Group, SkillLevel, Student, Unavailability};
    use crate::store::InMemoryStore;
    use actix_web::test;
    use async_trait::async_trait;

    /// A store whose backend is gone
    struct OfflineStore;

    fn offline() -> StoreError {
        StoreError::Unavailable("backend offline".to_string())
    }

    #[async_trait]
    impl ScheduleStore for OfflineStore {
        async fn get_student(&self, _student_id: StudentId) -> StoreResult<Option<Student>> {
            Err(offline())
        }

        async fn get_enrollment(
            &self,
            _student_id: StudentId,
            _term_id: TermId,
        ) -> StoreResult<Option<Enrollment>> {
            Err(offline())
        }

        async fn list_unavailability(&self, _student_id: StudentId) -> StoreResult<Vec<Unavailability>> {
            Err(offline())
        }

        async fn list_candidate_groups(&self, _term_id: TermId) -> StoreResult<Vec<Group>> {
            Err(offline())
        }

        async fn get_coach_specialization(
            &self,
            _coach_id: CoachId,
        ) -> StoreResult<Option<Vec<SkillLevel>>> {
            Err(offline())
        }

        async fn active_term(&self) -> StoreResult<Option<TermId>> {
            Ok(Some(1))
        }
    }

    #[async_trait]
    impl PlanExecutor for OfflineStore {
        async fn execute_plan(&self, _plan: &PlacementPlan) -> StoreResult<()> {
            Err(offline())
        }
    }

    fn state() -> web::Data<AppState> {
        let store = InMemoryStore::from_seed(demo::generate_seed(7)).unwrap();
        web::Data::new(AppState {
            store: Arc::new(store),
            config: SlotFinderConfig::default(),
        })
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_unknown_student_is_404() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/placements/999999")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.code, "NOT_FOUND");
    }

    #[actix_web::test]
    async fn test_placements_for_demo_student() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/placements/1?max_results=3")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        let recommendations = body["recommendations"].as_array().unwrap();
        assert!(recommendations.len() <= 3);
        assert_eq!(body["summary"]["total"].as_u64().unwrap() as usize, recommendations.len());
    }

    #[actix_web::test]
    async fn test_empty_plan_is_bad_request() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/plans/execute")
            .set_json(PlacementPlan::default())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_other_store_backends_plug_in() {
        let state = web::Data::new(AppState {
            store: Arc::new(OfflineStore),
            config: SlotFinderConfig::default(),
        });
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/placements/1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.code, "DEPENDENCY_UNAVAILABLE");

        let plan = PlacementPlan {
            operations: vec![crate::schedule::PlanOperation::AddMember { group_id: 1, student_id: 1 }],
        };
        let req = test::TestRequest::post()
            .uri("/api/plans/execute")
            .set_json(plan)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
