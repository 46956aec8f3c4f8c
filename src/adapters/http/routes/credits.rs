use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::header::CACHE_CONTROL,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::{
        jwt::CurrentUser,
        use_cases::credits::{CreditUseCases, CreditsSummary},
    },
    domain::entities::plan::Plan,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Breakdown {
    free_remaining: i64,
    bonus_remaining: i64,
    paid_remaining: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreditsResponse {
    ok: bool,
    plan: Plan,
    total_remaining: i64,
    breakdown: Breakdown,
    #[serde(rename = "paid_period_start")]
    paid_period_start: Option<DateTime<Utc>>,
    #[serde(rename = "paid_period_end")]
    paid_period_end: Option<DateTime<Utc>>,
}

impl From<CreditsSummary> for CreditsResponse {
    fn from(summary: CreditsSummary) -> Self {
        let b = summary.balance;
        Self {
            ok: true,
            plan: b.plan,
            total_remaining: b.total_remaining,
            breakdown: Breakdown {
                free_remaining: b.free_remaining,
                bonus_remaining: b.bonus_remaining,
                paid_remaining: b.paid_remaining,
            },
            paid_period_start: summary.paid_period_start,
            paid_period_end: summary.paid_period_end,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/credits", get(get_credits))
}

/// GET /api/credits
async fn get_credits(
    State(credits): State<Arc<CreditUseCases>>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let summary = credits.balance(user.id).await?;
    Ok((
        [(CACHE_CONTROL, "no-store")],
        Json(CreditsResponse::from(summary)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use serde_json::Value;
    use uuid::Uuid;

    use crate::test_utils::{TestAppStateBuilder, create_test_account, test_token};

    fn build_test_router(app_state: AppState) -> Router<()> {
        router().with_state(app_state)
    }

    #[tokio::test]
    async fn credits_requires_login() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server.get("/credits").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn new_user_sees_default_free_credits() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/credits")
            .add_header("Authorization", format!("Bearer {}", test_token(Uuid::new_v4())))
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("cache-control"), "no-store");
        let body: Value = response.json();
        assert_eq!(body["ok"], true);
        assert_eq!(body["plan"], "free");
        assert_eq!(body["totalRemaining"], 3);
        assert_eq!(body["breakdown"]["freeRemaining"], 3);
        assert_eq!(body["paid_period_end"], Value::Null);
    }

    #[tokio::test]
    async fn paid_user_breakdown_excludes_free_pool() {
        let user_id = Uuid::new_v4();
        let account = create_test_account(user_id, |a| {
            a.plan = Some(Plan::Pro);
            a.free_base = 3;
            a.bonus_total = 2;
            a.bonus_used = 1;
            a.paid_allowance = 100;
            a.paid_used = 40;
        });
        let app_state = TestAppStateBuilder::new().with_account(account).build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/credits")
            .add_cookie(Cookie::new("access_token", test_token(user_id)))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["plan"], "pro");
        assert_eq!(body["breakdown"]["freeRemaining"], 0);
        assert_eq!(body["breakdown"]["bonusRemaining"], 1);
        assert_eq!(body["breakdown"]["paidRemaining"], 60);
        assert_eq!(body["totalRemaining"], 61);
    }
}
