//! HTTP routes for discount evaluation and administration.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::response::{self, ApiResponse, MessageResponse};
use crate::tenancy::TenancyId;
use crate::AppState;

use super::requests::{ApplicableDiscountsRequest, SaveDiscountRequest};
use super::responses::{ApplicableDiscountsResponse, DiscountResponse, ToggleResponse};
use super::services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customer/discounts/applicable", post(applicable))
        .route("/admin/discounts", get(list).post(create))
        .route(
            "/admin/discounts/:id",
            get(detail).put(update).delete(remove),
        )
        .route("/admin/discounts/:id/toggle", patch(toggle))
}

/// Discounts applicable to a candidate order
async fn applicable(
    State(state): State<AppState>,
    TenancyId(tenancy_id): TenancyId,
    ApiJson(request): ApiJson<ApplicableDiscountsRequest>,
) -> Result<Json<ApiResponse<ApplicableDiscountsResponse>>> {
    let result =
        services::applicable_discounts(&state.db, &state.cache, tenancy_id, request).await?;
    Ok(response::ok(result))
}

async fn list(
    State(state): State<AppState>,
    TenancyId(tenancy_id): TenancyId,
) -> Result<Json<ApiResponse<Vec<DiscountResponse>>>> {
    let discounts = services::list_discounts(&state.db, tenancy_id).await?;
    Ok(response::ok(
        discounts.into_iter().map(DiscountResponse::from).collect(),
    ))
}

async fn detail(
    State(state): State<AppState>,
    TenancyId(tenancy_id): TenancyId,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<DiscountResponse>>> {
    let discount = services::get_discount(&state.db, tenancy_id, id).await?;
    Ok(response::ok(discount.into()))
}

async fn create(
    State(state): State<AppState>,
    TenancyId(tenancy_id): TenancyId,
    ApiJson(request): ApiJson<SaveDiscountRequest>,
) -> Result<impl IntoResponse> {
    let discount =
        services::create_discount(&state.db, &state.cache, tenancy_id, request).await?;
    Ok((
        StatusCode::CREATED,
        response::ok(DiscountResponse::from(discount)),
    ))
}

async fn update(
    State(state): State<AppState>,
    TenancyId(tenancy_id): TenancyId,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<SaveDiscountRequest>,
) -> Result<Json<ApiResponse<DiscountResponse>>> {
    let discount =
        services::update_discount(&state.db, &state.cache, tenancy_id, id, request).await?;
    Ok(response::ok(discount.into()))
}

async fn toggle(
    State(state): State<AppState>,
    TenancyId(tenancy_id): TenancyId,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ToggleResponse>>> {
    let is_active = services::toggle_discount(&state.db, &state.cache, tenancy_id, id).await?;
    Ok(response::ok(ToggleResponse { id, is_active }))
}

async fn remove(
    State(state): State<AppState>,
    TenancyId(tenancy_id): TenancyId,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>> {
    services::delete_discount(&state.db, &state.cache, tenancy_id, id).await?;
    Ok(response::message("Discount deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AppCache;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use chrono::{Duration, Utc};
    use sqlx::postgres::PgPoolOptions;
    use sqlx::types::Json as SqlJson;
    use tower::ServiceExt;

    use crate::discounts::models::{Discount, DiscountRule, RuleConditions, RuleKind};
    use crate::tenancy::TENANCY_HEADER;
    use rust_decimal_macros::dec;

    fn state() -> AppState {
        AppState {
            db: PgPoolOptions::new()
                .connect_lazy("postgres://localhost/unused")
                .unwrap(),
            cache: AppCache::default(),
        }
    }

    fn json_request(
        method: &str,
        uri: &str,
        tenancy: Option<Uuid>,
        body: serde_json::Value,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(id) = tenancy {
            builder = builder.header(TENANCY_HEADER, id.to_string());
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn decimal(value: &serde_json::Value) -> rust_decimal::Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_applicable_requires_tenancy_header() {
        let app = router().with_state(state());

        let response = app
            .oneshot(json_request(
                "POST",
                "/customer/discounts/applicable",
                None,
                serde_json::json!({ "orderValue": 1000 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_applicable_uses_cached_discounts() {
        let state = state();
        let tenancy = Uuid::new_v4();
        let now = Utc::now();

        let discount = Discount {
            id: Uuid::new_v4(),
            tenancy_id: tenancy,
            name: "Ten off".to_string(),
            description: "Ten percent on everything".to_string(),
            rules: SqlJson(vec![DiscountRule {
                kind: RuleKind::Percentage {
                    value: dec!(10),
                    max_discount: None,
                },
                conditions: RuleConditions::default(),
            }]),
            priority: 1,
            can_stack_with_coupons: true,
            can_stack_with_other_discounts: false,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.cache.store(tenancy, 0, vec![discount]).await;

        let app = router().with_state(state);
        let response = app
            .oneshot(json_request(
                "POST",
                "/customer/discounts/applicable",
                Some(tenancy),
                serde_json::json!({ "orderValue": 1000, "serviceType": "wash_fold" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);

        let data = &body["data"];
        assert_eq!(data["applicableDiscounts"].as_array().unwrap().len(), 1);
        assert_eq!(data["applicableDiscounts"][0]["name"], "Ten off");
        assert_eq!(data["applicableDiscounts"][0]["canStackWithCoupons"], true);
        assert_eq!(data["applicableDiscounts"][0]["matchedRule"]["type"], "percentage");
        assert_eq!(decimal(&data["applicableDiscounts"][0]["amount"]), dec!(100));
        assert_eq!(decimal(&data["totalDiscount"]), dec!(100));
        assert_eq!(decimal(&data["finalAmount"]), dec!(900));
    }

    #[tokio::test]
    async fn test_create_validation_error_is_reported() {
        let app = router().with_state(state());

        let response = app
            .oneshot(json_request(
                "POST",
                "/admin/discounts",
                Some(Uuid::new_v4()),
                serde_json::json!({
                    "name": "Bad window",
                    "rules": [{ "type": "flat", "value": "20" }],
                    "startDate": "2024-09-01T00:00:00Z",
                    "endDate": "2024-06-01T00:00:00Z"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "endDate must be after startDate");
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let app = router().with_state(state());

        let response = app
            .oneshot(json_request(
                "POST",
                "/customer/discounts/applicable",
                Some(Uuid::new_v4()),
                serde_json::json!({ "orderValue": "abc" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("orderValue"));
    }

    #[tokio::test]
    async fn test_malformed_id_uses_error_envelope() {
        let app = router().with_state(state());

        let request = Request::get("/admin/discounts/not-a-uuid")
            .header(TENANCY_HEADER, Uuid::new_v4().to_string())
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negative_order_value_is_rejected() {
        let app = router().with_state(state());

        let response = app
            .oneshot(json_request(
                "POST",
                "/customer/discounts/applicable",
                Some(Uuid::new_v4()),
                serde_json::json!({
                    "orderValue": -500,
                    "items": [{ "name": "Shirt", "quantity": 0, "unitPrice": 10 }]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
        assert!(body["message"].as_str().unwrap().starts_with("orderValue"));
    }

    #[tokio::test]
    async fn test_upcoming_discount_is_cached_but_not_applied() {
        let state = state();
        let tenancy = Uuid::new_v4();
        let now = Utc::now();

        let upcoming = Discount {
            id: Uuid::new_v4(),
            tenancy_id: tenancy,
            name: "Next week".to_string(),
            description: String::new(),
            rules: SqlJson(vec![DiscountRule {
                kind: RuleKind::Flat { value: dec!(50) },
                conditions: RuleConditions::default(),
            }]),
            priority: 5,
            can_stack_with_coupons: false,
            can_stack_with_other_discounts: true,
            start_date: now + Duration::days(7),
            end_date: now + Duration::days(14),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.cache.store(tenancy, 0, vec![upcoming]).await;

        let app = router().with_state(state);
        let response = app
            .oneshot(json_request(
                "POST",
                "/customer/discounts/applicable",
                Some(tenancy),
                serde_json::json!({ "orderValue": "300" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["data"]["applicableDiscounts"]
            .as_array()
            .unwrap()
            .is_empty());
        assert_eq!(decimal(&body["data"]["totalDiscount"]), dec!(0));
        assert_eq!(decimal(&body["data"]["finalAmount"]), dec!(300));
    }
}
