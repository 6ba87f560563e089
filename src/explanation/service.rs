//! Background explanation generation with a guaranteed stored value.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::client::TextGenerator;
use super::prompt::{build_general_prompt, build_prompt, fallback_explanation, general_advice};
use crate::assessment::{AssessmentRepository, ExplanationUpdate, RepositoryError};
use crate::models::{ExplanationLog, ExplanationStatus, SoilHealthScore, SoilUnitRecord};

const FALLBACK_MODEL: &str = "fallback";

/// Drives a score's explanation from `pending` to `success` or `fallback`
pub struct ExplanationService {
    generator: Option<Arc<dyn TextGenerator>>,
    repository: Arc<dyn AssessmentRepository>,
    general_timeout: Duration,
}

impl ExplanationService {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        repository: Arc<dyn AssessmentRepository>,
    ) -> Self {
        Self {
            generator,
            repository,
            general_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_general_timeout(mut self, timeout: Duration) -> Self {
        self.general_timeout = timeout;
        self
    }

    /// Run `explain` in the background; failures are logged, not returned
    pub fn spawn(
        self: &Arc<Self>,
        unit: SoilUnitRecord,
        score: SoilHealthScore,
        is_estimated: bool,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.explain(&unit, &score, is_estimated).await {
                error!(
                    "Failed to store explanation for score {}: {}",
                    score.score_id, e
                );
            }
        })
    }

    /// Generate and store an explanation for a pending score.
    ///
    /// Returns the status that was stored, or None when the score was no
    /// longer pending and nothing was written. Log writes never block the
    /// final value.
    pub async fn explain(
        &self,
        unit: &SoilUnitRecord,
        score: &SoilHealthScore,
        is_estimated: bool,
    ) -> Result<Option<ExplanationStatus>, RepositoryError> {
        let prompt = build_prompt(unit, score, is_estimated);

        let Some(generator) = &self.generator else {
            return self
                .store_fallback(unit, score, is_estimated, &prompt, None)
                .await;
        };

        match generator.generate(&prompt).await {
            Ok(generated) => {
                let stored = self
                    .repository
                    .complete_explanation(
                        score.score_id,
                        ExplanationUpdate {
                            text: generated.text.clone(),
                            model_name: Some(generator.model_name().to_string()),
                            status: ExplanationStatus::Success,
                        },
                    )
                    .await?;

                if !stored {
                    warn!(
                        "Score {} no longer pending; explanation discarded",
                        score.score_id
                    );
                    return Ok(None);
                }

                self.log(
                    score.score_id,
                    &prompt,
                    generator.model_name(),
                    ExplanationStatus::Success,
                    Some(generated.text),
                    Some(generated.response_time_ms),
                    None,
                )
                .await;

                info!("Explanation stored for score {}", score.score_id);
                Ok(Some(ExplanationStatus::Success))
            }
            Err(e) => {
                warn!(
                    "Explanation generation failed for score {}: {}",
                    score.score_id, e
                );
                self.log(
                    score.score_id,
                    &prompt,
                    generator.model_name(),
                    ExplanationStatus::Failed,
                    None,
                    None,
                    Some(e.to_string()),
                )
                .await;

                self.store_fallback(unit, score, is_estimated, &prompt, Some(e.to_string()))
                    .await
            }
        }
    }

    /// General guidance for a location without dataset coverage
    pub async fn general_guidance(&self, latitude: f64, longitude: f64) -> String {
        let Some(generator) = &self.generator else {
            return general_advice(latitude, longitude);
        };

        let prompt = build_general_prompt(latitude, longitude, "Nigeria");
        match tokio::time::timeout(self.general_timeout, generator.generate(&prompt)).await {
            Ok(Ok(generated)) => generated.text,
            Ok(Err(e)) => {
                warn!("General guidance generation failed: {}", e);
                general_advice(latitude, longitude)
            }
            Err(_) => {
                warn!("General guidance generation timed out");
                general_advice(latitude, longitude)
            }
        }
    }

    async fn store_fallback(
        &self,
        unit: &SoilUnitRecord,
        score: &SoilHealthScore,
        is_estimated: bool,
        prompt: &str,
        error_message: Option<String>,
    ) -> Result<Option<ExplanationStatus>, RepositoryError> {
        let text = fallback_explanation(unit, score, is_estimated);

        let stored = self
            .repository
            .complete_explanation(
                score.score_id,
                ExplanationUpdate {
                    text: text.clone(),
                    model_name: None,
                    status: ExplanationStatus::Fallback,
                },
            )
            .await?;

        if !stored {
            warn!(
                "Score {} no longer pending; fallback explanation discarded",
                score.score_id
            );
            return Ok(None);
        }

        self.log(
            score.score_id,
            prompt,
            FALLBACK_MODEL,
            ExplanationStatus::Fallback,
            Some(text),
            None,
            error_message,
        )
        .await;

        info!("Fallback explanation stored for score {}", score.score_id);
        Ok(Some(ExplanationStatus::Fallback))
    }

    /// Append an attempt log; failures are reported but not propagated
    #[allow(clippy::too_many_arguments)]
    async fn log(
        &self,
        score_id: Uuid,
        prompt: &str,
        model_name: &str,
        status: ExplanationStatus,
        raw_response: Option<String>,
        response_time_ms: Option<u64>,
        error_message: Option<String>,
    ) {
        let entry = ExplanationLog {
            log_id: Uuid::new_v4(),
            score_id,
            prompt_sent: prompt.to_string(),
            raw_response,
            model_name: model_name.to_string(),
            response_time_ms,
            status,
            error_message,
            created_at: Utc::now(),
        };

        if let Err(e) = self.repository.append_log(entry).await {
            warn!("Failed to write explanation log for score {}: {}", score_id, e);
        }
    }
}
