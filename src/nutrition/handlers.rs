use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;

use super::analysis::analyze_meal;
use super::dto::{AnalysisRequest, EstimateRequest, EstimateResponse};
use crate::body::json_body;
use crate::cors::{cors_headers, method_not_allowed, preflight};
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/nutrition/estimate",
            post(estimate).options(preflight).fallback(method_not_allowed),
        )
        .route(
            "/meal-analysis",
            post(analyze).options(preflight).fallback(method_not_allowed),
        )
}

#[instrument(skip(state, body))]
pub async fn estimate(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let req: EstimateRequest = json_body(&body)?;
    let facts = state.nutrition.estimate_meals(&req.meal_contents);
    Ok((cors_headers(), Json(EstimateResponse::from(facts))).into_response())
}

#[instrument(skip(state, body))]
pub async fn analyze(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let req: AnalysisRequest = json_body(&body)?;
    let items = req
        .meal_items
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect::<Vec<_>>();
    if items.is_empty() {
        return Err(ApiError::Input("mealItems must contain at least one item".into()));
    }
    let analysis = analyze_meal(state.generator.as_ref(), state.nutrition, &items).await;
    Ok((cors_headers(), Json(analysis)).into_response())
}

#[cfg(test)]
mod nutrition_handler_tests {
    use super::*;
    use axum::http::StatusCode;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn estimate_sums_entries() {
        let body = Bytes::from(r#"{"mealContents": ["ご飯、納豆", "", "—", "味噌汁"]}"#);
        let res = estimate(State(AppState::fake()), body).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["calories"], 168 + 100 + 40);
        assert_eq!(json["protein"], 13.3);
    }

    #[tokio::test]
    async fn analysis_requires_items() {
        let err = analyze(State(AppState::fake()), Bytes::from(r#"{"mealItems": ["  "]}"#))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "InputError");
    }

    #[tokio::test]
    async fn analysis_falls_back_to_estimate_without_generator() {
        let res = analyze(State(AppState::fake()), Bytes::from(r#"{"mealItems": ["ご飯"]}"#))
            .await
            .unwrap();
        let json = body_json(res).await;
        assert_eq!(json["source"], "ESTIMATE");
        assert_eq!(json["totalCalories"], 168);
    }
}
