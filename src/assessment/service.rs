use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::repository::{AssessmentRepository, RepositoryError, SoilUnitRepository};
use crate::explanation::ExplanationService;
use crate::geo_lookup::{GeoLookupError, LookupHandle};
use crate::models::{
    Badge, Coordinate, Coverage, DegradationRisk, ExplanationStatus, LandAssessment,
    LookupResult, SoilHealthScore, SoilUnitRecord,
};

/// Smallest plot accepted for an assessment
pub const MIN_AREA_HECTARES: f64 = 0.01;

/// How long an unsaved assessment is kept
const TEMPORARY_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("assessment {0} not found")]
    NotFound(Uuid),

    #[error("mapping unit {mapping_unit} found in the dataset but has no unit record")]
    DataIntegrity { mapping_unit: String },

    #[error("assessment references unit {unit_id}, which has no unit record")]
    MissingUnitRecord { unit_id: Uuid },

    #[error(transparent)]
    Lookup(#[from] GeoLookupError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssessmentRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub area_hectares: f64,
}

impl CreateAssessmentRequest {
    pub fn validate(&self) -> Result<(), AssessmentError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AssessmentError::InvalidInput(
                "latitude must be between -90 and 90".to_string(),
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AssessmentError::InvalidInput(
                "longitude must be between -180 and 180".to_string(),
            ));
        }
        if !self.area_hectares.is_finite() || self.area_hectares < MIN_AREA_HECTARES {
            return Err(AssessmentError::InvalidInput(format!(
                "area_hectares must be at least {}",
                MIN_AREA_HECTARES
            )));
        }
        Ok(())
    }

    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub area_hectares: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SoilHealth {
    pub badge: Option<Badge>,
    pub total_score: Option<u8>,
    pub degradation_risk: Option<DegradationRisk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SoilProperties {
    pub suitability: Option<String>,
    pub drainage: Option<String>,
    pub ph_range: Option<String>,
    pub slope: Option<String>,
    pub soil_texture: Option<String>,
    pub soil_depth: Option<String>,
    pub ecological_zone: Option<String>,
    pub major_crops: Option<String>,
    pub risk_factors: Option<String>,
}

impl From<&SoilUnitRecord> for SoilProperties {
    fn from(unit: &SoilUnitRecord) -> Self {
        Self {
            suitability: unit.suitability.clone(),
            drainage: unit.drainage.clone(),
            ph_range: unit.ph_range.clone(),
            slope: unit.slope.clone(),
            soil_texture: unit.soil_texture.clone(),
            soil_depth: unit.soil_depth.clone(),
            ecological_zone: unit.ecological_zone.clone(),
            major_crops: unit.major_crops.clone(),
            risk_factors: unit.risk_factors.clone(),
        }
    }
}

/// An assessment as returned to callers
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub assessment_id: Uuid,
    pub location: Location,
    pub mapping_unit: String,
    pub coverage: Coverage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub outside_bounds: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub soil_health: SoilHealth,
    pub soil_properties: SoilProperties,
    pub ai_explanation: Option<String>,
    pub ai_explanation_status: ExplanationStatus,
    pub is_saved: bool,
    pub is_temporary: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AssessmentView {
    fn build(assessment: &LandAssessment, score: &SoilHealthScore, unit: &SoilUnitRecord) -> Self {
        Self {
            assessment_id: assessment.assessment_id,
            location: Location {
                latitude: assessment.latitude,
                longitude: assessment.longitude,
                area_hectares: assessment.area_hectares,
            },
            mapping_unit: unit.mapping_unit.clone(),
            coverage: assessment.coverage,
            distance_km: assessment.distance_km,
            outside_bounds: assessment.outside_bounds,
            notice: estimate_notice(assessment),
            soil_health: SoilHealth {
                badge: score.badge,
                total_score: score.total_score,
                degradation_risk: score.degradation_risk,
            },
            soil_properties: SoilProperties::from(unit),
            ai_explanation: score.ai_plain_explanation.clone(),
            ai_explanation_status: score.ai_explanation_status,
            is_saved: assessment.is_saved,
            is_temporary: assessment.is_temporary,
            expires_at: assessment.expires_at,
            created_at: assessment.created_at,
        }
    }
}

fn estimate_notice(assessment: &LandAssessment) -> Option<String> {
    if assessment.coverage != Coverage::Estimated {
        return None;
    }

    let mut notice = match assessment.distance_km {
        Some(d) => format!(
            "Soil data for this exact location is not mapped. Results are estimated from the nearest soil mapping unit, about {:.1} km away.",
            d
        ),
        None => "Soil data for this exact location is not mapped. Results are estimated from the nearest soil mapping unit.".to_string(),
    };
    if assessment.outside_bounds {
        notice.push_str(" This location is outside the mapped coverage area.");
    }
    notice.push_str(" Verify with a local soil test before making decisions.");
    Some(notice)
}

/// Response for a coordinate with no usable soil data
#[derive(Debug, Clone, Serialize)]
pub struct NoCoverageView {
    pub coverage: Coverage,
    pub latitude: f64,
    pub longitude: f64,
    pub message: String,
    pub general_advice: String,
}

pub enum AssessmentOutcome {
    /// Records were created; the explanation is generated by `explanation_task`
    Assessed {
        view: AssessmentView,
        explanation_task: JoinHandle<()>,
    },
    NoCoverage(NoCoverageView),
}

/// Creates and manages land assessments on top of the lookup engine
pub struct AssessmentService {
    lookup: LookupHandle,
    units: Arc<dyn SoilUnitRepository>,
    assessments: Arc<dyn AssessmentRepository>,
    explanations: Arc<ExplanationService>,
}

impl AssessmentService {
    pub fn new(
        lookup: LookupHandle,
        units: Arc<dyn SoilUnitRepository>,
        assessments: Arc<dyn AssessmentRepository>,
        explanations: Arc<ExplanationService>,
    ) -> Self {
        Self {
            lookup,
            units,
            assessments,
            explanations,
        }
    }

    pub fn lookup(&self) -> &LookupHandle {
        &self.lookup
    }

    pub async fn create_assessment(
        &self,
        request: CreateAssessmentRequest,
    ) -> Result<AssessmentOutcome, AssessmentError> {
        request.validate()?;

        let Some(result) = self.lookup.lookup(request.coordinate())? else {
            info!(
                "No soil coverage for ({}, {})",
                request.latitude, request.longitude
            );
            let general_advice = self
                .explanations
                .general_guidance(request.latitude, request.longitude)
                .await;
            return Ok(AssessmentOutcome::NoCoverage(NoCoverageView {
                coverage: Coverage::None,
                latitude: request.latitude,
                longitude: request.longitude,
                message: "No soil data is available for this location.".to_string(),
                general_advice,
            }));
        };

        let unit = self
            .units
            .find_by_mapping_unit(&result.mapping_unit)
            .await?
            .ok_or_else(|| {
                warn!(
                    "Mapping unit {} has no unit record",
                    result.mapping_unit
                );
                AssessmentError::DataIntegrity {
                    mapping_unit: result.mapping_unit.clone(),
                }
            })?;

        let (assessment, score) = new_records(&request, &result, &unit, Utc::now());
        self.assessments
            .insert(assessment.clone(), score.clone())
            .await?;

        info!(
            "Created {} assessment {} for unit {}",
            assessment.coverage, assessment.assessment_id, unit.mapping_unit
        );

        let view = AssessmentView::build(&assessment, &score, &unit);
        let explanation_task = self.explanations.spawn(unit, score, result.is_estimated);

        Ok(AssessmentOutcome::Assessed {
            view,
            explanation_task,
        })
    }

    /// Fetch an assessment; expired temporary ones count as missing
    pub async fn get_assessment(&self, assessment_id: Uuid) -> Result<AssessmentView, AssessmentError> {
        let (assessment, score) = self
            .assessments
            .get(assessment_id)
            .await?
            .filter(|(a, _)| !a.is_expired(Utc::now()))
            .ok_or(AssessmentError::NotFound(assessment_id))?;

        self.view(&assessment, &score).await
    }

    pub async fn list_saved(&self) -> Result<Vec<AssessmentView>, AssessmentError> {
        let saved = self.assessments.list_saved().await?;
        let mut views = Vec::with_capacity(saved.len());
        for (assessment, score) in &saved {
            views.push(self.view(assessment, score).await?);
        }
        Ok(views)
    }

    /// Keep an assessment permanently
    pub async fn save_assessment(&self, assessment_id: Uuid) -> Result<AssessmentView, AssessmentError> {
        // Fails with NotFound for expired records before touching them
        self.get_assessment(assessment_id).await?;

        self.assessments
            .save(assessment_id)
            .await?
            .ok_or(AssessmentError::NotFound(assessment_id))?;

        info!("Saved assessment {}", assessment_id);
        self.get_assessment(assessment_id).await
    }

    pub async fn delete_assessment(&self, assessment_id: Uuid) -> Result<(), AssessmentError> {
        if !self.assessments.delete(assessment_id).await? {
            return Err(AssessmentError::NotFound(assessment_id));
        }
        info!("Deleted assessment {}", assessment_id);
        Ok(())
    }

    async fn view(
        &self,
        assessment: &LandAssessment,
        score: &SoilHealthScore,
    ) -> Result<AssessmentView, AssessmentError> {
        let unit = self
            .units
            .find_by_id(assessment.unit_id)
            .await?
            .ok_or(AssessmentError::MissingUnitRecord {
                unit_id: assessment.unit_id,
            })?;
        Ok(AssessmentView::build(assessment, score, &unit))
    }
}

fn new_records(
    request: &CreateAssessmentRequest,
    result: &LookupResult,
    unit: &SoilUnitRecord,
    now: DateTime<Utc>,
) -> (LandAssessment, SoilHealthScore) {
    let assessment = LandAssessment {
        assessment_id: Uuid::new_v4(),
        unit_id: unit.unit_id,
        latitude: request.latitude,
        longitude: request.longitude,
        area_hectares: request.area_hectares,
        coverage: result.coverage(),
        distance_km: result.distance_km,
        outside_bounds: result.outside_bounds,
        is_saved: false,
        is_temporary: true,
        expires_at: Some(now + Duration::hours(TEMPORARY_TTL_HOURS)),
        created_at: now,
    };

    let score = SoilHealthScore {
        score_id: Uuid::new_v4(),
        assessment_id: assessment.assessment_id,
        unit_id: unit.unit_id,
        badge: unit.badge,
        total_score: unit.total_score,
        degradation_risk: unit.degradation_risk,
        ai_plain_explanation: None,
        ai_model_used: None,
        ai_explanation_status: ExplanationStatus::Pending,
        scored_at: now,
    };

    (assessment, score)
}
