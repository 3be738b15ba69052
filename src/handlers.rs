// handlers.rs
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::{self, SurveyFilter};
use crate::error::ApiError;
use crate::models::{
    page_window, CreateSurveyRequest, ListResponsesQuery, ListSurveysQuery, Pagination,
    ResponsePage, SubmitResponseRequest, Survey, SurveyPage, SurveyResponse,
    UpdateSurveyRequest,
};
use crate::reports::{self, OverviewReport, SurveyAnalyticsReport};
use crate::responses::{self, ResponseFilter};

/// List surveys with pagination and optional category/active/search filters
pub async fn list_surveys(
    State(pool): State<PgPool>,
    Query(params): Query<ListSurveysQuery>,
) -> Result<Json<SurveyPage>, ApiError> {
    let (page, limit) = page_window(params.page, params.limit);
    let filter = SurveyFilter {
        category: params.category,
        is_active: params.is_active,
        search: params.search,
    };
    let (surveys, total) = catalog::list(&pool, &filter, page, limit).await?;
    Ok(Json(SurveyPage {
        surveys,
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn get_survey(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Survey>, ApiError> {
    let survey = catalog::get(&pool, id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;
    Ok(Json(survey))
}

pub async fn create_survey(
    State(pool): State<PgPool>,
    Json(req): Json<CreateSurveyRequest>,
) -> Result<(StatusCode, Json<Survey>), ApiError> {
    req.validate()?;
    let survey = catalog::create(&pool, req).await?;
    tracing::info!(survey_id = %survey.id, "survey created");
    Ok((StatusCode::CREATED, Json(survey)))
}

pub async fn update_survey(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSurveyRequest>,
) -> Result<Json<Survey>, ApiError> {
    req.validate()?;
    let survey = catalog::update(&pool, id, req)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;
    Ok(Json(survey))
}

/// Delete a survey along with every response referencing it
pub async fn delete_survey(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !catalog::delete(&pool, id).await? {
        return Err(ApiError::NotFound("survey"));
    }
    tracing::info!(survey_id = %id, "survey deleted");
    Ok(Json(json!({ "message": "Survey deleted successfully" })))
}

/// Recompute the survey's cached response count from the response store
pub async fn reconcile_survey(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let response_count = catalog::reconcile_response_count(&pool, id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;
    Ok(Json(json!({ "responseCount": response_count })))
}

pub async fn list_responses(
    State(pool): State<PgPool>,
    Query(params): Query<ListResponsesQuery>,
) -> Result<Json<ResponsePage>, ApiError> {
    let (page, limit) = page_window(params.page, params.limit);
    let filter = ResponseFilter {
        survey_id: params.survey_id,
        since: None,
    };
    let (responses, total) = responses::find(&pool, &filter, page, limit).await?;
    Ok(Json(ResponsePage {
        responses,
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn get_response(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<SurveyResponse>, ApiError> {
    let response = responses::get(&pool, id)
        .await?
        .ok_or(ApiError::NotFound("response"))?;
    Ok(Json(response))
}

/// Submit a response; the owning survey must exist and be active
pub async fn submit_response(
    State(pool): State<PgPool>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<SubmitResponseRequest>,
) -> Result<(StatusCode, Json<SurveyResponse>), ApiError> {
    req.validate()?;

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let response = responses::insert(&pool, req, Some(addr.ip().to_string()), user_agent).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_survey_responses(
    State(pool): State<PgPool>,
    Path(survey_id): Path<Uuid>,
    Query(params): Query<ListResponsesQuery>,
) -> Result<Json<ResponsePage>, ApiError> {
    let (page, limit) = page_window(params.page, params.limit);
    let filter = ResponseFilter {
        survey_id: Some(survey_id),
        since: None,
    };
    let (responses, total) = responses::find(&pool, &filter, page, limit).await?;
    Ok(Json(ResponsePage {
        responses,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// Cross-survey analytics overview
pub async fn overview_analytics(
    State(pool): State<PgPool>,
) -> Result<Json<OverviewReport>, ApiError> {
    Ok(Json(reports::overview(&pool).await?))
}

/// Analytics for a single survey
pub async fn survey_analytics(
    State(pool): State<PgPool>,
    Path(survey_id): Path<Uuid>,
) -> Result<Json<SurveyAnalyticsReport>, ApiError> {
    let report = reports::survey_analytics(&pool, survey_id)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;
    Ok(Json(report))
}
