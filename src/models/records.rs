//! Persisted record types for soil units, assessments and scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Coverage, SoilFeature};

/// Soil health rating derived from the unit's total score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Badge {
    Gold,
    Silver,
    Bronze,
}

impl Badge {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GOLD" => Some(Badge::Gold),
            "SILVER" => Some(Badge::Silver),
            "BRONZE" => Some(Badge::Bronze),
            _ => None,
        }
    }

    /// Human readable label used in explanations
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Gold => "Excellent (Gold)",
            Badge::Silver => "Moderate (Silver)",
            Badge::Bronze => "Poor (Bronze)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DegradationRisk {
    Low,
    Medium,
    High,
}

impl DegradationRisk {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(DegradationRisk::Low),
            "MEDIUM" => Some(DegradationRisk::Medium),
            "HIGH" => Some(DegradationRisk::High),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DegradationRisk::Low => "Low risk of degradation",
            DegradationRisk::Medium => "Moderate risk of degradation",
            DegradationRisk::High => "High risk of degradation",
        }
    }
}

/// Full soil mapping-unit record as held by the unit repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilUnitRecord {
    pub unit_id: Uuid,
    pub mapping_unit: String,
    pub ecological_zone: Option<String>,
    pub geology: Option<String>,
    pub slope: Option<String>,
    pub drainage: Option<String>,
    pub ph_range: Option<String>,
    pub ph_description: Option<String>,
    pub suitability: Option<String>,
    pub soil_texture: Option<String>,
    pub soil_class: Option<String>,
    pub soil_depth: Option<String>,
    pub vegetation: Option<String>,
    pub distribution: Option<String>,
    pub major_crops: Option<String>,
    pub area_percentage: Option<String>,
    pub badge: Option<Badge>,
    pub total_score: Option<u8>,
    pub degradation_risk: Option<DegradationRisk>,
    pub risk_factors: Option<String>,
}

impl SoilUnitRecord {
    /// Build a record from a dataset feature's properties
    pub fn from_feature(feature: &SoilFeature) -> Self {
        let props = &feature.properties;
        Self {
            unit_id: Uuid::new_v4(),
            mapping_unit: feature.mapping_unit.clone(),
            ecological_zone: text_property(props, "ecological_zone"),
            geology: text_property(props, "geology"),
            slope: text_property(props, "slope"),
            drainage: text_property(props, "drainage"),
            ph_range: text_property(props, "ph_range"),
            ph_description: text_property(props, "ph_description"),
            suitability: text_property(props, "suitability"),
            soil_texture: text_property(props, "soil_texture"),
            soil_class: text_property(props, "soil_class"),
            soil_depth: text_property(props, "soil_depth"),
            vegetation: text_property(props, "vegetation"),
            distribution: text_property(props, "distribution"),
            major_crops: text_property(props, "major_crops"),
            area_percentage: text_property(props, "area_percentage"),
            badge: text_property(props, "badge").and_then(|b| Badge::parse(&b)),
            total_score: props
                .get("total_score")
                .and_then(|v| v.as_f64().or_else(|| v.as_str()?.trim().parse().ok()))
                .filter(|s| (0.0..=100.0).contains(s))
                .map(|s| s.round() as u8),
            degradation_risk: text_property(props, "degradation_risk")
                .and_then(|r| DegradationRisk::parse(&r)),
            risk_factors: text_property(props, "risk_factors"),
        }
    }
}

/// Read a property as text; numbers are stringified, empty values dropped
fn text_property(props: &Map<String, Value>, key: &str) -> Option<String> {
    match props.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

/// A land assessment for one coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandAssessment {
    pub assessment_id: Uuid,
    pub unit_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub area_hectares: f64,
    pub coverage: Coverage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub outside_bounds: bool,
    pub is_saved: bool,
    pub is_temporary: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LandAssessment {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_temporary && self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Lifecycle of the natural-language explanation attached to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationStatus {
    Pending,
    Success,
    Failed,
    Fallback,
}

impl ExplanationStatus {
    /// Whether a final value has been stored
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExplanationStatus::Success | ExplanationStatus::Fallback)
    }
}

/// Soil health score copied from the unit at assessment time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilHealthScore {
    pub score_id: Uuid,
    pub assessment_id: Uuid,
    pub unit_id: Uuid,
    pub badge: Option<Badge>,
    pub total_score: Option<u8>,
    pub degradation_risk: Option<DegradationRisk>,
    pub ai_plain_explanation: Option<String>,
    pub ai_model_used: Option<String>,
    pub ai_explanation_status: ExplanationStatus,
    pub scored_at: DateTime<Utc>,
}

/// One explanation generation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationLog {
    pub log_id: Uuid,
    pub score_id: Uuid,
    pub prompt_sent: String,
    pub raw_response: Option<String>,
    pub model_name: String,
    pub response_time_ms: Option<u64>,
    pub status: ExplanationStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}
