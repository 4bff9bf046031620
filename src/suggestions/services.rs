use std::time::Instant;

use rand::Rng;
use tracing::{error, info, warn};

use super::dto::ValidatedRequest;
use super::fallback::{minimal_plan, FallbackGenerator};
use super::model::{MealPlan, MealSource, PipelineStage, PlanDebug, SuggestionOutcome};
use super::normalize::{Extracted, NormalizeContext, Normalizer};
use super::prompt::{build_prompt, exclusion_terms, PromptInput, Variety};
use crate::nutrition::NutritionTable;
use crate::profiles::UserPreferences;
use crate::state::AppState;

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Profile → prompt → generation → normalization, degrading to a fallback
/// plan on any generator-side problem. Always returns a non-empty plan.
pub async fn suggest_meal_plan<R: Rng + Send>(
    state: &AppState,
    req: ValidatedRequest,
    rng: &mut R,
) -> SuggestionOutcome {
    let started = Instant::now();
    let target = req.target_calories;
    let mut provenance = PlanDebug::default();

    let t = Instant::now();
    let stored = match req.user_id.as_deref() {
        Some(user_id) => state.profiles.get_profile(user_id).await,
        None => UserPreferences::default(),
    };
    let prefs = stored.overlay(req.overrides);
    provenance.timings.profile_ms = elapsed_ms(t);

    let t = Instant::now();
    let exclusions = exclusion_terms(prefs.allergies.as_deref(), &req.restrictions);
    let variety = Variety::pick(rng);
    let prompt = build_prompt(
        &PromptInput {
            prefs: &prefs,
            target_calories: target,
            exclusions: &exclusions,
            condition: req.condition,
            mood: req.mood,
        },
        &variety,
    );
    provenance.prompt_sent = prompt.clone();
    provenance.stage = PipelineStage::PromptBuilt;
    provenance.timings.prompt_ms = elapsed_ms(t);

    provenance.stage = PipelineStage::GenerationAttempted;
    let t = Instant::now();
    let generated = state
        .generator
        .generate(&prompt, &state.generation_config())
        .await;
    provenance.timings.generation_ms = elapsed_ms(t);

    let extracted = match generated {
        Err(e) => {
            warn!(error = %e, "generation failed; using fallback plan");
            Err((MealSource::FallbackGenerationError, e.to_string()))
        }
        Ok(text) => {
            let chars = text.trim().chars().count();
            let result = if chars < state.config.plan.min_response_chars {
                warn!(chars, "generator response too short; using fallback plan");
                Err((
                    MealSource::FallbackEmptyResponse,
                    format!("response too short ({} chars)", chars),
                ))
            } else {
                provenance.stage = PipelineStage::TextExtracted;
                let t = Instant::now();
                let normalized = Normalizer::default()
                    .normalize(&text, &NormalizeContext { target_calories: target });
                provenance.timings.normalize_ms = elapsed_ms(t);
                normalized.map_err(|e| {
                    warn!(error = %e, "normalization failed; using fallback plan");
                    (MealSource::FallbackParseFailed, e.to_string())
                })
            };
            provenance.ai_response = Some(text);
            result
        }
    };

    let plan = match extracted {
        Ok(Extracted { source, plan }) => {
            provenance.stage = PipelineStage::Normalized;
            provenance.meal_source = source;
            provenance.using_fallback = false;
            plan
        }
        Err((source, reason)) => {
            let (source, plan) = fallback_plan(state.nutrition, target, &exclusions, source, rng);
            provenance.meal_source = source;
            provenance.using_fallback = true;
            provenance.error = Some(reason);
            plan
        }
    };

    provenance.timings.total_ms = elapsed_ms(started);
    info!(
        target_calories = target,
        total_calories = plan.total_calories,
        meals = plan.meals.len(),
        source = ?provenance.meal_source,
        stage = ?provenance.stage,
        generation_ms = provenance.timings.generation_ms,
        total_ms = provenance.timings.total_ms,
        "meal plan ready"
    );
    SuggestionOutcome {
        plan,
        debug: provenance,
    }
}

fn fallback_plan<R: Rng + ?Sized>(
    table: &NutritionTable,
    target: u32,
    exclusions: &[String],
    source: MealSource,
    rng: &mut R,
) -> (MealSource, MealPlan) {
    match FallbackGenerator::new(table).generate(target, exclusions, rng) {
        Ok(meals) => (source, MealPlan::new(meals)),
        Err(e) => {
            error!(error = %e, "fallback generation failed; using minimal plan");
            (MealSource::FallbackMinimal, MealPlan::new(minimal_plan(target)))
        }
    }
}
