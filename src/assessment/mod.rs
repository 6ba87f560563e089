//! Land assessments built on the coverage lookup.

mod repository;
mod service;

pub use repository::{
    AssessmentRepository, ExplanationUpdate, InMemoryRepository, RepositoryError,
    SoilUnitRepository,
};
pub use service::{
    AssessmentError, AssessmentOutcome, AssessmentService, AssessmentView,
    CreateAssessmentRequest, Location, NoCoverageView, SoilHealth, SoilProperties,
    MIN_AREA_HECTARES,
};
