use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{instrument, Instrument, Span};
use uuid::Uuid;

use super::dto::{MealPlanRequest, MealPlanResponse};
use super::services::suggest_meal_plan;
use crate::cors::{cors_headers, method_not_allowed, preflight};
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/meal-suggestion",
        post(suggest).options(preflight).fallback(method_not_allowed),
    )
}

/// POST /meal-suggestion
///
/// Generator trouble never fails the request; it yields a fallback plan. Bad
/// input and panics inside the pipeline come back as a 500 envelope.
#[instrument(skip(state, body), fields(request_id = tracing::field::Empty))]
pub async fn suggest(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    Span::current().record("request_id", tracing::field::display(request_id));

    let req = MealPlanRequest::from_body(&body)?.validate()?;
    let include_debug = state.config.plan.include_debug;

    let outcome = tokio::spawn(
        async move {
            let mut rng = StdRng::from_entropy();
            suggest_meal_plan(&state, req, &mut rng).await
        }
        .instrument(Span::current()),
    )
    .await?;

    let res = MealPlanResponse::new(outcome, request_id, include_debug);
    Ok((StatusCode::OK, cors_headers(), Json(res)).into_response())
}

#[cfg(test)]
mod suggest_handler_tests {
    use super::*;
    use crate::app::build_app;
    use crate::error::GenerationError;
    use crate::generation::{GenerationConfig, TextGenerator};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Fixed(&'static str);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _: &str, _: &GenerationConfig) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    struct Exploding;

    #[async_trait]
    impl TextGenerator for Exploding {
        async fn generate(&self, _: &str, _: &GenerationConfig) -> Result<String, GenerationError> {
            panic!("generator bug")
        }
    }

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl TextGenerator for Counting {
        async fn generate(&self, _: &str, _: &GenerationConfig) -> Result<String, GenerationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(GenerationError::UnknownResponseShape)
        }
    }

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_plan_invariants(json: &serde_json::Value) {
        let meals = json["meals"].as_array().unwrap();
        assert!(!meals.is_empty());
        let sum: u64 = meals.iter().map(|m| m["calories"].as_u64().unwrap()).sum();
        assert_eq!(json["totalCalories"].as_u64().unwrap(), sum);
        for m in meals {
            let dishes = m["dishes"].as_array().unwrap();
            assert!(!dishes.is_empty());
            assert!(dishes.iter().all(|d| !d.as_str().unwrap().trim().is_empty()));
        }
    }

    #[tokio::test]
    async fn headings_answer_is_served() {
        let state = AppState::fake().with_generator(Fixed(
            "## 朝食\n- 主菜: 焼き鮭\n- 汁物: 味噌汁\n## 昼食\n- 主菜: 親子丼\n## 夕食\n- 主菜: 肉じゃが\n- 副菜: 副菜",
        ));
        let res = suggest(State(state), Bytes::from(r#"{"targetCalories": 2000}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        let json = body_json(res).await;
        assert_plan_invariants(&json);
        assert_eq!(json["meals"][2]["dishes"][1], "ほうれん草のお浸し");
        assert_eq!(json["debug"]["mealSource"], "AI_HEADINGS");
        assert_eq!(json["debug"]["stage"], "NORMALIZED");
        assert!(json["requestId"].as_str().is_some());
    }

    #[tokio::test]
    async fn generator_down_is_still_200() {
        let res = suggest(State(AppState::fake()), Bytes::new()).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_plan_invariants(&json);
        assert_eq!(json["totalCalories"], 2000);
        assert!(json["meals"]
            .as_array()
            .unwrap()
            .iter()
            .all(|m| m["isFallback"] == true));
        assert_eq!(json["debug"]["usingFallback"], true);
    }

    #[tokio::test]
    async fn malformed_body_is_input_error() {
        let err = suggest(State(AppState::fake()), Bytes::from("not json"))
            .await
            .unwrap_err();
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(res).await;
        assert_eq!(json["errorType"], "InputError");
        assert!(json.get("traceback").is_none());
    }

    #[tokio::test]
    async fn pipeline_panic_is_internal_error() {
        let state = AppState::fake().with_generator(Exploding);
        let err = suggest(State(state), Bytes::from("{}")).await.unwrap_err();
        let json = body_json(err.into_response()).await;
        assert_eq!(json["errorType"], "InternalError");
        assert!(json["traceback"].as_str().unwrap().contains("generator bug"));
    }

    #[tokio::test]
    async fn preflight_never_calls_generator() {
        let counter = Counting::default();
        let app = build_app(AppState::fake().with_generator(counter.clone()));
        let res = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/v1/meal-suggestion")
                    .body(Body::from("{\"targetCalories\": \"garbage\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["access-control-allow-methods"], "POST, OPTIONS");
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn routed_post_returns_plan() {
        let app = build_app(AppState::fake().with_generator(Fixed(
            r#"```json
{"meals":[{"mealType":"昼食","calories":"600kcal","dishes":["そば"]},{"mealType":"夕食","dishes":["焼き魚(200kcal)","ご飯"]}]}
```"#,
        )));
        let res = app
            .oneshot(
                Request::post("/api/v1/meal-suggestion")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"targetCalories": 1500}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_plan_invariants(&json);
        assert_eq!(json["meals"][0]["calories"], 600);
        // missing calories take the second share of a two-meal split
        assert_eq!(json["meals"][1]["calories"], 825);
        assert_eq!(json["meals"][1]["dishes"][0], "焼き魚");
        assert_eq!(json["totalCalories"], 1425);
    }

    #[tokio::test]
    async fn huge_generated_calories_still_yield_a_plan() {
        let state = AppState::fake().with_generator(Fixed(
            r#"{"meals":[{"mealType":"朝食","calories":3000000000,"dishes":["ご飯"]},{"mealType":"夕食","calories":4294967295,"dishes":["カレー"]}]}"#,
        ));
        let res = suggest(State(state), Bytes::from(r#"{"targetCalories": 2000}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_plan_invariants(&json);
        assert_eq!(json["meals"][0]["calories"], 900);
        assert_eq!(json["meals"][1]["calories"], 1100);
        assert_eq!(json["totalCalories"], 2000);
        assert_eq!(json["debug"]["mealSource"], "AI_DIRECT_JSON");
    }

    #[tokio::test]
    async fn large_target_with_large_meals_keeps_total_consistent() {
        let state = AppState::fake().with_generator(Fixed(
            r#"{"meals":[{"mealType":"昼食","calories":4900,"dishes":["ステーキ"]},{"mealType":"夕食","dishes":["ピザ"]}]}"#,
        ));
        let body = format!(r#"{{"targetCalories": {}}}"#, u32::MAX);
        let res = suggest(State(state), Bytes::from(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_plan_invariants(&json);
        assert_eq!(json["meals"][0]["calories"], 4900);
        assert_eq!(json["meals"][1]["calories"], 2_362_232_013u64);
        assert_eq!(json["totalCalories"], 2_362_236_913u64);
    }
}
