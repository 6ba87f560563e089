//! Prompt and fallback text builders.
//!
//! Fallback texts are deterministic: the same record always produces the
//! same explanation.

use crate::models::{SoilHealthScore, SoilUnitRecord};

const NOT_SPECIFIED: &str = "Not specified";

const ESTIMATE_NOTE: &str = "NOTE: No exact dataset match was found for this location. \
This assessment is based on the nearest matching soil unit and should be treated as an estimate.";

const ESTIMATE_DISCLAIMER: &str = "IMPORTANT DISCLAIMER\n\
This is an estimated assessment based on nearby soil data. \
Conduct a physical soil test before making major investment decisions.";

fn or_unspecified(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_SPECIFIED)
}

fn badge_label(score: &SoilHealthScore) -> &'static str {
    score.badge.map(|b| b.label()).unwrap_or(NOT_SPECIFIED)
}

fn risk_label(score: &SoilHealthScore) -> &'static str {
    score
        .degradation_risk
        .map(|r| r.label())
        .unwrap_or(NOT_SPECIFIED)
}

fn score_text(score: &SoilHealthScore) -> String {
    score
        .total_score
        .map(|s| format!("{s}/100"))
        .unwrap_or_else(|| "unscored".to_string())
}

/// Instruction prompt for a unit-backed assessment
pub fn build_prompt(unit: &SoilUnitRecord, score: &SoilHealthScore, is_estimated: bool) -> String {
    let mut prompt = String::from(
        "[INST]\n\
You are an agricultural land advisor helping smallholder farmers and land investors in Nigeria \
make informed decisions about farmland. Keep advice practical and free of jargon, \
and address the farmer directly.\n\n",
    );

    if is_estimated {
        prompt.push_str(ESTIMATE_NOTE);
        prompt.push_str("\n\n");
    }

    prompt.push_str("LAND ASSESSMENT DATA:\n");
    prompt.push_str(&format!(
        "- Soil Health Rating: {} (Score: {})\n",
        badge_label(score),
        score_text(score)
    ));
    prompt.push_str(&format!("- Degradation Risk: {}\n", risk_label(score)));
    prompt.push_str(&format!(
        "- Ecological Zone: {}\n",
        or_unspecified(&unit.ecological_zone)
    ));
    prompt.push_str(&format!("- Drainage: {}\n", or_unspecified(&unit.drainage)));
    prompt.push_str(&format!(
        "- Soil pH: {} ({})\n",
        or_unspecified(&unit.ph_range),
        unit.ph_description.as_deref().unwrap_or("")
    ));
    prompt.push_str(&format!("- Slope: {}\n", or_unspecified(&unit.slope)));
    prompt.push_str(&format!(
        "- Soil Texture: {}\n",
        or_unspecified(&unit.soil_texture)
    ));
    prompt.push_str(&format!("- Soil Depth: {}\n", or_unspecified(&unit.soil_depth)));
    prompt.push_str(&format!(
        "- Land Suitability: {}\n",
        or_unspecified(&unit.suitability)
    ));
    prompt.push_str(&format!(
        "- Crops That Grow Well Here: {}\n\n",
        or_unspecified(&unit.major_crops)
    ));

    prompt.push_str(
        "Answer using exactly these sections:\n\n\
VERDICT\nOne sentence on whether this land is worth farming or investing in.\n\n\
WHAT THIS MEANS FOR YOU\n2-3 sentences on what the score means in practice and what can realistically be grown.\n\n\
MAIN RISKS\n2-3 specific risks based on drainage, pH, slope and depth.\n\n\
HOW TO IMPROVE THIS LAND\n3 affordable actions using locally available inputs such as compost, cover crops, drainage channels or lime.\n\n\
BEST USE OF THIS LAND\nThe single best agricultural use right now, including non-crop uses such as grazing or agroforestry.\n",
    );

    if is_estimated {
        prompt.push('\n');
        prompt.push_str(ESTIMATE_DISCLAIMER);
        prompt.push('\n');
    }

    prompt.push_str("[/INST]");
    prompt
}

/// Instruction prompt for a location with no dataset coverage
pub fn build_general_prompt(latitude: f64, longitude: f64, location_hint: &str) -> String {
    format!(
        "[INST]\n\
You are an agricultural land advisor. A user wants to assess land at coordinates \
({latitude}, {longitude}) in {location_hint}.\n\
There is no soil dataset coverage for this exact location.\n\n\
Answer using exactly these sections:\n\n\
COVERAGE NOTE\nExplain that the location is outside the dataset coverage and this is general guidance only.\n\n\
GENERAL LAND CONDITIONS\n2-3 sentences on typical soil and farming conditions in {location_hint}.\n\n\
GENERAL RECOMMENDATIONS\n3 practical recommendations for farming or investing in land in this region.\n\n\
SUGGESTED NEXT STEPS\nHow to get an accurate assessment, e.g. a physical soil test or the local extension officer.\n\
[/INST]"
    )
}

/// Stored when the text generator is unavailable or fails
pub fn fallback_explanation(
    unit: &SoilUnitRecord,
    score: &SoilHealthScore,
    is_estimated: bool,
) -> String {
    let mut text = format!(
        "VERDICT\nThis land is rated {} with a soil health score of {}.\n\n",
        badge_label(score),
        score_text(score)
    );

    text.push_str(&format!(
        "SOIL SUMMARY\nEcological zone: {}. Drainage: {}. Soil pH: {}. Slope: {}. Texture: {}. Depth: {}.\n\n",
        or_unspecified(&unit.ecological_zone),
        or_unspecified(&unit.drainage),
        or_unspecified(&unit.ph_range),
        or_unspecified(&unit.slope),
        or_unspecified(&unit.soil_texture),
        or_unspecified(&unit.soil_depth),
    ));

    text.push_str(&format!("MAIN RISKS\n{}.", risk_label(score)));
    if let Some(factors) = &unit.risk_factors {
        text.push_str(&format!(" Risk factors: {factors}."));
    }
    text.push_str("\n\n");

    if let Some(crops) = &unit.major_crops {
        text.push_str(&format!("BEST USE OF THIS LAND\nCrops known to do well here: {crops}.\n\n"));
    }

    if is_estimated {
        text.push_str(ESTIMATE_DISCLAIMER);
        text.push('\n');
    }

    text.trim_end().to_string()
}

/// Deterministic guidance for coordinates with no coverage
pub fn general_advice(latitude: f64, longitude: f64) -> String {
    format!(
        "COVERAGE NOTE\nThe location ({latitude:.4}, {longitude:.4}) is outside the current soil dataset \
coverage (Nigeria). This is general guidance only.\n\n\
SUGGESTED NEXT STEPS\nCommission a physical soil test covering pH, texture and organic matter, \
and consult the local agricultural extension office before making investment decisions."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Badge, DegradationRisk, ExplanationStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn unit() -> SoilUnitRecord {
        SoilUnitRecord {
            unit_id: Uuid::new_v4(),
            mapping_unit: "2a".to_string(),
            ecological_zone: Some("Guinea Savanna".to_string()),
            geology: None,
            slope: Some("0-2%".to_string()),
            drainage: Some("Well drained".to_string()),
            ph_range: Some("5.5-6.5".to_string()),
            ph_description: Some("Slightly acidic".to_string()),
            suitability: None,
            soil_texture: Some("Sandy loam".to_string()),
            soil_class: None,
            soil_depth: None,
            vegetation: None,
            distribution: None,
            major_crops: Some("Maize, Sorghum".to_string()),
            area_percentage: None,
            badge: Some(Badge::Gold),
            total_score: Some(81),
            degradation_risk: Some(DegradationRisk::Low),
            risk_factors: None,
        }
    }

    fn score(unit: &SoilUnitRecord) -> SoilHealthScore {
        SoilHealthScore {
            score_id: Uuid::new_v4(),
            assessment_id: Uuid::new_v4(),
            unit_id: unit.unit_id,
            badge: unit.badge,
            total_score: unit.total_score,
            degradation_risk: unit.degradation_risk,
            ai_plain_explanation: None,
            ai_model_used: None,
            ai_explanation_status: ExplanationStatus::Pending,
            scored_at: Utc::now(),
        }
    }

    #[test]
    fn test_prompt_includes_soil_data() {
        let unit = unit();
        let prompt = build_prompt(&unit, &score(&unit), false);
        assert!(prompt.starts_with("[INST]"));
        assert!(prompt.ends_with("[/INST]"));
        assert!(prompt.contains("Excellent (Gold) (Score: 81/100)"));
        assert!(prompt.contains("Low risk of degradation"));
        assert!(prompt.contains("- Soil Depth: Not specified"));
        assert!(!prompt.contains("DISCLAIMER"));
    }

    #[test]
    fn test_estimated_prompt_has_note_and_disclaimer() {
        let unit = unit();
        let prompt = build_prompt(&unit, &score(&unit), true);
        assert!(prompt.contains("No exact dataset match"));
        assert!(prompt.contains("IMPORTANT DISCLAIMER"));
    }

    #[test]
    fn test_general_prompt_mentions_location() {
        let prompt = build_general_prompt(0.5, -1.25, "West Africa");
        assert!(prompt.contains("(0.5, -1.25)"));
        assert!(prompt.contains("West Africa"));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let unit = unit();
        let score = score(&unit);
        let a = fallback_explanation(&unit, &score, true);
        let b = fallback_explanation(&unit, &score, true);
        assert_eq!(a, b);
        assert!(a.contains("Guinea Savanna"));
        assert!(a.contains("Maize, Sorghum"));
        assert!(a.ends_with("major investment decisions."));
    }
}
