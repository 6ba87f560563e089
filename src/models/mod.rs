//! Core data models for the soil coverage service.

pub mod records;
pub mod soil;

pub use records::{
    Badge, DegradationRisk, ExplanationLog, ExplanationStatus, LandAssessment, SoilHealthScore,
    SoilUnitRecord,
};
pub use soil::{Coordinate, Coverage, LookupResult, SoilFeature};
