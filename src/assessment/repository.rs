//! Storage interfaces for unit records and assessments, plus an in-memory store.

use futures::future::BoxFuture;
use futures::FutureExt;
use hashbrown::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::geo_lookup::PolygonStore;
use crate::models::{
    ExplanationLog, ExplanationStatus, LandAssessment, SoilHealthScore, SoilUnitRecord,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Final explanation value written to a score
#[derive(Debug, Clone)]
pub struct ExplanationUpdate {
    pub text: String,
    pub model_name: Option<String>,
    pub status: ExplanationStatus,
}

/// Record-by-key access to the soil unit table
pub trait SoilUnitRepository: Send + Sync {
    fn find_by_mapping_unit<'a>(
        &'a self,
        mapping_unit: &'a str,
    ) -> BoxFuture<'a, Result<Option<SoilUnitRecord>, RepositoryError>>;

    fn find_by_id(&self, unit_id: Uuid)
        -> BoxFuture<'_, Result<Option<SoilUnitRecord>, RepositoryError>>;
}

/// Persistence for assessments, their scores and explanation logs
pub trait AssessmentRepository: Send + Sync {
    fn insert(
        &self,
        assessment: LandAssessment,
        score: SoilHealthScore,
    ) -> BoxFuture<'_, Result<(), RepositoryError>>;

    fn get(
        &self,
        assessment_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<(LandAssessment, SoilHealthScore)>, RepositoryError>>;

    /// Saved (non-temporary) assessments, newest first
    fn list_saved(
        &self,
    ) -> BoxFuture<'_, Result<Vec<(LandAssessment, SoilHealthScore)>, RepositoryError>>;

    /// Mark as saved; None if the assessment does not exist
    fn save(&self, assessment_id: Uuid)
        -> BoxFuture<'_, Result<Option<LandAssessment>, RepositoryError>>;

    /// Delete an assessment with its score and logs
    fn delete(&self, assessment_id: Uuid) -> BoxFuture<'_, Result<bool, RepositoryError>>;

    fn get_score(&self, score_id: Uuid)
        -> BoxFuture<'_, Result<Option<SoilHealthScore>, RepositoryError>>;

    /// Store the final explanation; false if the score is gone or no longer pending
    fn complete_explanation(
        &self,
        score_id: Uuid,
        update: ExplanationUpdate,
    ) -> BoxFuture<'_, Result<bool, RepositoryError>>;

    fn append_log(&self, log: ExplanationLog) -> BoxFuture<'_, Result<(), RepositoryError>>;

    fn logs_for_score(&self, score_id: Uuid)
        -> BoxFuture<'_, Result<Vec<ExplanationLog>, RepositoryError>>;
}

#[derive(Default)]
struct Tables {
    assessments: HashMap<Uuid, (LandAssessment, SoilHealthScore)>,
    /// score_id -> assessment_id
    score_index: HashMap<Uuid, Uuid>,
    logs: Vec<ExplanationLog>,
}

/// Process-local storage used by the server and tests
#[derive(Default)]
pub struct InMemoryRepository {
    units: RwLock<HashMap<String, SoilUnitRecord>>,
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed unit records from the dataset's feature properties
    pub fn seeded_from(store: &PolygonStore) -> Self {
        let units: HashMap<String, SoilUnitRecord> = store
            .features()
            .iter()
            .map(|f| (f.mapping_unit.clone(), SoilUnitRecord::from_feature(f)))
            .collect();

        info!("Seeded {} soil mapping unit records", units.len());

        Self {
            units: RwLock::new(units),
            tables: RwLock::new(Tables::default()),
        }
    }

    pub async fn insert_unit(&self, unit: SoilUnitRecord) {
        self.units
            .write()
            .await
            .insert(unit.mapping_unit.clone(), unit);
    }

    pub async fn remove_unit(&self, mapping_unit: &str) -> Option<SoilUnitRecord> {
        self.units.write().await.remove(mapping_unit)
    }

    pub async fn unit_count(&self) -> usize {
        self.units.read().await.len()
    }
}

impl SoilUnitRepository for InMemoryRepository {
    fn find_by_mapping_unit<'a>(
        &'a self,
        mapping_unit: &'a str,
    ) -> BoxFuture<'a, Result<Option<SoilUnitRecord>, RepositoryError>> {
        async move { Ok(self.units.read().await.get(mapping_unit).cloned()) }.boxed()
    }

    fn find_by_id(
        &self,
        unit_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<SoilUnitRecord>, RepositoryError>> {
        async move {
            Ok(self
                .units
                .read()
                .await
                .values()
                .find(|u| u.unit_id == unit_id)
                .cloned())
        }
        .boxed()
    }
}

impl AssessmentRepository for InMemoryRepository {
    fn insert(
        &self,
        assessment: LandAssessment,
        score: SoilHealthScore,
    ) -> BoxFuture<'_, Result<(), RepositoryError>> {
        async move {
            let mut tables = self.tables.write().await;
            tables
                .score_index
                .insert(score.score_id, assessment.assessment_id);
            tables
                .assessments
                .insert(assessment.assessment_id, (assessment, score));
            Ok(())
        }
        .boxed()
    }

    fn get(
        &self,
        assessment_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<(LandAssessment, SoilHealthScore)>, RepositoryError>> {
        async move { Ok(self.tables.read().await.assessments.get(&assessment_id).cloned()) }
            .boxed()
    }

    fn list_saved(
        &self,
    ) -> BoxFuture<'_, Result<Vec<(LandAssessment, SoilHealthScore)>, RepositoryError>> {
        async move {
            let tables = self.tables.read().await;
            let mut saved: Vec<_> = tables
                .assessments
                .values()
                .filter(|(a, _)| a.is_saved)
                .cloned()
                .collect();
            saved.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
            Ok(saved)
        }
        .boxed()
    }

    fn save(
        &self,
        assessment_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<LandAssessment>, RepositoryError>> {
        async move {
            let mut tables = self.tables.write().await;
            Ok(tables.assessments.get_mut(&assessment_id).map(|(a, _)| {
                a.is_saved = true;
                a.is_temporary = false;
                a.expires_at = None;
                a.clone()
            }))
        }
        .boxed()
    }

    fn delete(&self, assessment_id: Uuid) -> BoxFuture<'_, Result<bool, RepositoryError>> {
        async move {
            let mut tables = self.tables.write().await;
            let Some((_, score)) = tables.assessments.remove(&assessment_id) else {
                return Ok(false);
            };
            tables.score_index.remove(&score.score_id);
            tables.logs.retain(|l| l.score_id != score.score_id);
            Ok(true)
        }
        .boxed()
    }

    fn get_score(
        &self,
        score_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<SoilHealthScore>, RepositoryError>> {
        async move {
            let tables = self.tables.read().await;
            Ok(tables
                .score_index
                .get(&score_id)
                .and_then(|id| tables.assessments.get(id))
                .map(|(_, s)| s.clone()))
        }
        .boxed()
    }

    fn complete_explanation(
        &self,
        score_id: Uuid,
        update: ExplanationUpdate,
    ) -> BoxFuture<'_, Result<bool, RepositoryError>> {
        async move {
            let mut tables = self.tables.write().await;
            let Some(assessment_id) = tables.score_index.get(&score_id).copied() else {
                return Ok(false);
            };
            let Some((_, score)) = tables.assessments.get_mut(&assessment_id) else {
                return Ok(false);
            };
            if score.ai_explanation_status != ExplanationStatus::Pending {
                return Ok(false);
            }
            score.ai_plain_explanation = Some(update.text);
            score.ai_model_used = update.model_name;
            score.ai_explanation_status = update.status;
            Ok(true)
        }
        .boxed()
    }

    fn append_log(&self, log: ExplanationLog) -> BoxFuture<'_, Result<(), RepositoryError>> {
        async move {
            self.tables.write().await.logs.push(log);
            Ok(())
        }
        .boxed()
    }

    fn logs_for_score(
        &self,
        score_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<ExplanationLog>, RepositoryError>> {
        async move {
            Ok(self
                .tables
                .read()
                .await
                .logs
                .iter()
                .filter(|l| l.score_id == score_id)
                .cloned()
                .collect())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_lookup::fixtures::sample_store;
    use crate::models::Coverage;
    use chrono::{Duration, Utc};

    fn records(unit: &SoilUnitRecord) -> (LandAssessment, SoilHealthScore) {
        let now = Utc::now();
        let assessment = LandAssessment {
            assessment_id: Uuid::new_v4(),
            unit_id: unit.unit_id,
            latitude: 6.5,
            longitude: 3.4,
            area_hectares: 10.0,
            coverage: Coverage::Exact,
            distance_km: None,
            outside_bounds: false,
            is_saved: false,
            is_temporary: true,
            expires_at: Some(now + Duration::hours(24)),
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

    #[tokio::test]
    async fn test_seeded_units() {
        let repo = InMemoryRepository::seeded_from(&sample_store());
        assert_eq!(repo.unit_count().await, 4);

        let unit = repo.find_by_mapping_unit("LAG1").await.unwrap().unwrap();
        assert_eq!(unit.total_score, Some(82));

        let by_id = repo.find_by_id(unit.unit_id).await.unwrap().unwrap();
        assert_eq!(by_id.mapping_unit, "LAG1");
        assert!(repo.find_by_mapping_unit("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_list() {
        let repo = InMemoryRepository::seeded_from(&sample_store());
        let unit = repo.find_by_mapping_unit("MID").await.unwrap().unwrap();
        let (assessment, score) = records(&unit);
        let id = assessment.assessment_id;
        repo.insert(assessment, score).await.unwrap();

        assert!(repo.list_saved().await.unwrap().is_empty());

        let saved = repo.save(id).await.unwrap().unwrap();
        assert!(saved.is_saved);
        assert!(!saved.is_temporary);
        assert!(saved.expires_at.is_none());
        assert_eq!(repo.list_saved().await.unwrap().len(), 1);

        assert!(repo.save(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_explanation_only_once() {
        let repo = InMemoryRepository::seeded_from(&sample_store());
        let unit = repo.find_by_mapping_unit("LAG1").await.unwrap().unwrap();
        let (assessment, score) = records(&unit);
        let score_id = score.score_id;
        repo.insert(assessment, score).await.unwrap();

        let update = ExplanationUpdate {
            text: "fine land".to_string(),
            model_name: Some("m".to_string()),
            status: ExplanationStatus::Success,
        };
        assert!(repo.complete_explanation(score_id, update.clone()).await.unwrap());
        assert!(!repo.complete_explanation(score_id, update).await.unwrap());

        let score = repo.get_score(score_id).await.unwrap().unwrap();
        assert_eq!(score.ai_explanation_status, ExplanationStatus::Success);
        assert_eq!(score.ai_plain_explanation.as_deref(), Some("fine land"));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let repo = InMemoryRepository::seeded_from(&sample_store());
        let unit = repo.find_by_mapping_unit("LAG1").await.unwrap().unwrap();
        let (assessment, score) = records(&unit);
        let (id, score_id) = (assessment.assessment_id, score.score_id);
        repo.insert(assessment, score).await.unwrap();
        repo.append_log(ExplanationLog {
            log_id: Uuid::new_v4(),
            score_id,
            prompt_sent: "p".to_string(),
            raw_response: None,
            model_name: "m".to_string(),
            response_time_ms: None,
            status: ExplanationStatus::Failed,
            error_message: Some("boom".to_string()),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert!(repo.get(id).await.unwrap().is_none());
        assert!(repo.get_score(score_id).await.unwrap().is_none());
        assert!(repo.logs_for_score(score_id).await.unwrap().is_empty());
    }
}
