use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::{
    adapters::http::{app_state::AppState, auth::CurrentUser},
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(current_plan))
}

async fn current_plan(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let overview = app_state.feature_gate.plan_overview(user_id).await?;
    Ok(Json(overview))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use uuid::Uuid;

    use crate::{
        domain::entities::plan_tier::PlanTier,
        test_utils::{TestAppStateBuilder, create_test_subscription},
    };

    fn build_test_router(app_state: AppState) -> Router<()> {
        router().with_state(app_state)
    }

    #[tokio::test]
    async fn plan_without_token_returns_401() {
        let server = TestServer::new(build_test_router(TestAppStateBuilder::new().build())).unwrap();

        let response = server.get("/").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "AUTHENTICATION_REQUIRED");
    }

    #[tokio::test]
    async fn plan_with_garbage_token_returns_401() {
        let server = TestServer::new(build_test_router(TestAppStateBuilder::new().build())).unwrap();

        let response = server
            .get("/")
            .authorization_bearer("not-a-jwt")
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn plan_reports_subscription_tier() {
        let user_id = Uuid::new_v4();
        let builder = TestAppStateBuilder::new()
            .with_subscription(create_test_subscription(user_id, PlanTier::Professional, |_| {}));
        let token = builder.token_for(user_id);
        let server = TestServer::new(build_test_router(builder.build())).unwrap();

        let response = server.get("/").authorization_bearer(token).await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["tier"], "professional");
        assert_eq!(body["source"], "subscription");
        assert_eq!(body["display_name"], "Professional");
        assert_eq!(body["limits"]["ai_mock_interview"], 20);
        assert_eq!(body["limits"]["resume_creation"], -1);
        assert_eq!(body["features"]["priority_support"], true);
    }

    #[tokio::test]
    async fn plan_accepts_access_token_cookie() {
        let user_id = Uuid::new_v4();
        let builder = TestAppStateBuilder::new();
        let token = builder.token_for(user_id);
        let server = TestServer::new(build_test_router(builder.build())).unwrap();

        let response = server
            .get("/")
            .add_header(
                axum::http::header::COOKIE,
                axum::http::HeaderValue::from_str(&format!("access_token={token}")).unwrap(),
            )
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["tier"], "free");
        assert_eq!(body["source"], "implicit");
    }
}
