//! HTTP handlers for lookups and assessments.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use landiq::assessment::{
    AssessmentError, AssessmentOutcome, AssessmentView, CreateAssessmentRequest,
};
use landiq::{Coordinate, Coverage, GeoLookupError, LookupResult};

use crate::AppState;

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    error: String,
    message: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

impl From<GeoLookupError> for ErrorBody {
    fn from(e: GeoLookupError) -> Self {
        ErrorBody {
            error: "Soil dataset unavailable".to_string(),
            message: e.to_string(),
        }
    }
}

fn assessment_error(e: AssessmentError) -> ApiError {
    match e {
        AssessmentError::InvalidInput(message) => {
            api_error(StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        AssessmentError::NotFound(_) => {
            api_error(StatusCode::NOT_FOUND, "Assessment not found", e.to_string())
        }
        AssessmentError::DataIntegrity { .. } | AssessmentError::MissingUnitRecord { .. } => {
            error!("{}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Data integrity error",
                e.to_string(),
            )
        }
        AssessmentError::Lookup(e) => (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorBody::from(e))),
        AssessmentError::Repository(_) => {
            error!("Assessment storage failed: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                e.to_string(),
            )
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    dataset_loaded: bool,
    mapping_units: usize,
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mapping_units = state
        .lookup
        .service()
        .map(|s| s.store().len())
        .unwrap_or(0);

    Json(HealthResponse {
        status: if state.lookup.is_loaded() { "ok" } else { "degraded" },
        dataset_loaded: state.lookup.is_loaded(),
        mapping_units,
    })
}

#[derive(Deserialize)]
pub struct LookupQueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Debug)]
pub struct LookupResponse {
    coverage: Coverage,
    #[serde(flatten)]
    result: Option<LookupResult>,
}

/// Resolve the soil mapping unit for a coordinate
pub async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupQueryParams>,
) -> Result<Json<LookupResponse>, ApiError> {
    let coord = Coordinate::new(params.lat, params.lon);
    if !coord.is_valid() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid input",
            "lat must be between -90 and 90 and lon between -180 and 180",
        ));
    }

    let result = state
        .lookup
        .lookup(coord)
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorBody::from(e))))?;

    Ok(Json(LookupResponse {
        coverage: result.as_ref().map_or(Coverage::None, LookupResult::coverage),
        result,
    }))
}

/// Create a land assessment from coordinates
pub async fn create_assessment_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAssessmentRequest>,
) -> Result<Response, ApiError> {
    let outcome = state
        .assessments
        .create_assessment(request)
        .await
        .map_err(assessment_error)?;

    Ok(match outcome {
        // The explanation task keeps running after its handle is dropped
        AssessmentOutcome::Assessed { view, .. } => (StatusCode::CREATED, Json(view)).into_response(),
        AssessmentOutcome::NoCoverage(view) => (StatusCode::NOT_FOUND, Json(view)).into_response(),
    })
}

pub async fn list_assessments_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AssessmentView>>, ApiError> {
    let views = state
        .assessments
        .list_saved()
        .await
        .map_err(assessment_error)?;
    Ok(Json(views))
}

pub async fn get_assessment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssessmentView>, ApiError> {
    let view = state
        .assessments
        .get_assessment(id)
        .await
        .map_err(assessment_error)?;
    Ok(Json(view))
}

pub async fn save_assessment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssessmentView>, ApiError> {
    let view = state
        .assessments
        .save_assessment(id)
        .await
        .map_err(assessment_error)?;
    Ok(Json(view))
}

pub async fn delete_assessment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .assessments
        .delete_assessment(id)
        .await
        .map_err(assessment_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use landiq::assessment::{AssessmentService, InMemoryRepository};
    use landiq::explanation::ExplanationService;
    use landiq::{GeoLookupService, LookupHandle, PolygonStore};
    use serde_json::json;

    fn state(loaded: bool) -> Arc<AppState> {
        let store = PolygonStore::from_geojson_str(
            &json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": { "mapping_unit": "SQ", "badge": "GOLD", "total_score": 90 },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[3.0, 6.0], [4.0, 6.0], [4.0, 7.0], [3.0, 7.0], [3.0, 6.0]]]
                    }
                }]
            })
            .to_string(),
        )
        .unwrap();

        let repository = Arc::new(InMemoryRepository::seeded_from(&store));
        let lookup = if loaded {
            LookupHandle::loaded(Arc::new(GeoLookupService::new(Arc::new(store))))
        } else {
            LookupHandle::unloaded()
        };
        let explanations = Arc::new(ExplanationService::new(None, repository.clone()));

        Arc::new(AppState {
            lookup: lookup.clone(),
            assessments: AssessmentService::new(
                lookup,
                repository.clone(),
                repository,
                explanations,
            ),
        })
    }

    #[tokio::test]
    async fn test_lookup_exact() {
        let Json(response) = lookup_handler(
            State(state(true)),
            Query(LookupQueryParams { lat: 6.5, lon: 3.5 }),
        )
        .await
        .unwrap();

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["coverage"], "exact");
        assert_eq!(body["mapping_unit"], "SQ");
        assert_eq!(body["is_estimated"], false);
        assert!(body.get("distance_km").is_none());
    }

    #[tokio::test]
    async fn test_lookup_rejects_invalid_coordinate() {
        let (status, _) = lookup_handler(
            State(state(true)),
            Query(LookupQueryParams { lat: 95.0, lon: 3.5 }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_lookup_unloaded_dataset() {
        let (status, _) = lookup_handler(
            State(state(false)),
            Query(LookupQueryParams { lat: 6.5, lon: 3.5 }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let Json(health) = health_handler(State(state(false))).await;
        assert!(!health.dataset_loaded);
        assert_eq!(health.status, "degraded");
    }

    #[tokio::test]
    async fn test_assessment_lifecycle() {
        let state = state(true);
        let request = CreateAssessmentRequest {
            latitude: 6.5,
            longitude: 3.5,
            area_hectares: 1.5,
        };
        let response = create_assessment_handler(State(state.clone()), Json(request.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let id = match state.assessments.create_assessment(request).await.unwrap() {
            AssessmentOutcome::Assessed { view, .. } => view.assessment_id,
            AssessmentOutcome::NoCoverage(_) => panic!("expected an assessment"),
        };

        let Json(listed) = list_assessments_handler(State(state.clone())).await.unwrap();
        assert!(listed.is_empty());

        let Json(saved) = save_assessment_handler(State(state.clone()), Path(id))
            .await
            .unwrap();
        assert!(saved.is_saved);
        assert_eq!(saved.mapping_unit, "SQ");

        let Json(listed) = list_assessments_handler(State(state.clone())).await.unwrap();
        assert_eq!(listed.len(), 1);

        let status = delete_assessment_handler(State(state.clone()), Path(id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unknown_assessment_not_found() {
        let state = state(true);
        let (status, Json(body)) = get_assessment_handler(State(state.clone()), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Assessment not found");

        let (status, _) = delete_assessment_handler(State(state), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_area_is_bad_request() {
        let (status, _) = create_assessment_handler(
            State(state(true)),
            Json(CreateAssessmentRequest {
                latitude: 6.5,
                longitude: 3.5,
                area_hectares: 0.0,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
