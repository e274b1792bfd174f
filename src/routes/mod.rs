pub mod auth;
pub mod bookings;
pub mod categories;
pub mod events;
pub mod facilities;
pub mod health;
pub mod page;
pub mod pricing;
pub mod reports;
pub mod reservations;
pub mod usage;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::security_headers::security_headers;
use crate::AppState;

/// Build the application router.
///
/// `auth_router` is passed in so the caller can wrap the login routes in a
/// rate limiter that needs the peer address.
pub fn app(state: Arc<AppState>, auth_router: Router<Arc<AppState>>) -> Router {
    let uploads = ServeDir::new(&state.config.server.uploads_dir);

    Router::new()
        .route("/health", get(health::health_check))
        // JSON API
        .nest("/api/auth", auth_router)
        .nest("/api/facilities", facilities::api_router())
        .nest("/api/reservations", bookings::router())
        // Admin pages
        .nest("/admin/dashboard", reports::dashboard_router())
        .nest("/admin/categories", categories::router())
        .nest("/admin/facilities", facilities::router())
        .nest("/admin/pricing", pricing::router())
        .nest("/admin/events", events::router())
        .nest("/admin/reservations", reservations::router())
        .nest("/admin/usage", usage::router())
        .nest("/admin/reports", reports::router())
        // Stored payment slips
        .nest_service("/uploads", uploads)
        .with_state(state)
        .layer(axum::middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::*;
    use crate::db::{
        FacilityRepository, ReservationRepository, ReservationStatus, Role, User, UserRepository,
    };
    use crate::services::auth::AuthService;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    struct TestApp {
        state: Arc<AppState>,
    }

    impl TestApp {
        async fn new() -> Self {
            TestApp {
                state: test_state().await,
            }
        }

        fn token(&self, user: &User) -> String {
            AuthService::create_jwt(&self.state, &user.id).unwrap()
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = app(self.state.clone(), auth::router())
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, body)
        }

        async fn get(&self, uri: &str, user: Option<&User>) -> (StatusCode, Value) {
            let mut builder = Request::builder().uri(uri);
            if let Some(user) = user {
                builder = builder.header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", self.token(user)),
                );
            }
            self.send(builder.body(Body::empty()).unwrap()).await
        }

        async fn post_form(&self, uri: &str, user: &User, form: &str) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap();
            self.send(request).await
        }

        async fn post_json(&self, uri: &str, user: &User, body: Value) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(request).await
        }
    }

    #[tokio::test]
    async fn admin_pages_require_authentication() {
        let t = TestApp::new().await;
        for uri in [
            "/admin/dashboard",
            "/admin/categories",
            "/admin/facilities",
            "/admin/pricing",
            "/admin/events",
            "/admin/reservations",
            "/admin/usage",
            "/admin/reports/no-shows",
        ] {
            let (status, body) = t.get(uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn roles_are_enforced() {
        let t = TestApp::new().await;
        let customer = seed_user(&t.state.db, "user@example.com", Role::User).await;
        let staff = seed_user(&t.state.db, "staff@example.com", Role::Staff).await;

        let (status, _) = t.get("/admin/reservations", Some(&customer)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = t.get("/admin/categories", Some(&customer)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Staff run the desk but do not manage the catalog
        let (status, _) = t.get("/admin/reservations", Some(&staff)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = t.get("/admin/dashboard", Some(&staff)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = t.get("/admin/events", Some(&staff)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_token_is_unauthorized() {
        let t = TestApp::new().await;
        let request = Request::builder()
            .uri("/admin/categories")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _) = t.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn category_actions_render_flash() {
        let t = TestApp::new().await;
        let admin = seed_user(&t.state.db, "admin@example.com", Role::Admin).await;

        let (status, body) = t.get("/admin/categories", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["flash"].is_null());
        assert_eq!(body["categories"], serde_json::json!([]));

        let (status, body) = t
            .post_form(
                "/admin/categories",
                &admin,
                "action=add_category&name=Courts&description=Outdoor",
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flash"]["kind"], "success");
        assert_eq!(body["flash"]["message"], "Category \"Courts\" added successfully");
        assert_eq!(body["categories"][0]["name"], "Courts");

        let (status, body) = t
            .post_form("/admin/categories", &admin, "action=add_category&name=courts")
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["flash"]["kind"], "error");
        assert_eq!(body["categories"].as_array().unwrap().len(), 1);

        let (status, body) = t
            .post_form("/admin/categories", &admin, "action=add_category&name=%20")
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["flash"]["kind"], "error");

        let (status, body) = t
            .post_form("/admin/categories", &admin, "action=drop_tables")
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["flash"]["message"], "Unknown action: drop_tables");
    }

    #[tokio::test]
    async fn event_form_accepts_repeated_facility_ids() {
        let t = TestApp::new().await;
        let admin = seed_user(&t.state.db, "admin@example.com", Role::Admin).await;
        let category = seed_category(&t.state.db, "Halls").await;
        let a = seed_facility(&t.state.db, &category.id, "Hall A").await;
        let b = seed_facility(&t.state.db, &category.id, "Hall B").await;

        let today = crate::services::local_today();
        let end = today + chrono::Duration::days(3);
        let form = format!(
            "action=add_event&title=Tournament&facility_ids={}&facility_ids={}&start_date={}&end_date={}",
            a.id,
            b.id,
            today.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );
        let (status, body) = t.post_form("/admin/events", &admin, &form).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(
            body["flash"]["message"],
            "Event \"Tournament\" created; 2 facilities closed"
        );
        assert_eq!(body["events"][0]["facility_ids"].as_array().unwrap().len(), 2);

        for id in [&a.id, &b.id] {
            let facility = FacilityRepository::find_by_id(&t.state.db, id)
                .await
                .unwrap()
                .unwrap();
            assert!(facility.is_closed_for_event);
            assert_eq!(facility.closure_reason.as_deref(), Some("Tournament"));
        }
    }

    #[tokio::test]
    async fn illegal_transition_is_flashed() {
        let t = TestApp::new().await;
        let admin = seed_user(&t.state.db, "admin@example.com", Role::Admin).await;
        let customer = seed_user(&t.state.db, "user@example.com", Role::User).await;
        let category = seed_category(&t.state.db, "Courts").await;
        let court = seed_facility(&t.state.db, &category.id, "Court").await;
        let done =
            SeedReservation::new(&customer.id, &court.id, "2024-01-01 10:00", "2024-01-01 11:00")
                .status(ReservationStatus::Completed)
                .insert(&t.state.db)
                .await;

        let form = format!("action=update_status&reservation_id={}&status=no_show", done.id);
        let (status, body) = t.post_form("/admin/reservations", &admin, &form).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body["flash"]["message"],
            "Cannot change reservation status from completed to no_show"
        );

        let row = ReservationRepository::find_by_id(&t.state.db, &done.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, ReservationStatus::Completed);
        assert!(row.no_show_marked_by.is_none());
    }

    #[tokio::test]
    async fn active_reservations_endpoint() {
        let t = TestApp::new().await;
        let admin = seed_user(&t.state.db, "admin@example.com", Role::Admin).await;
        let customer = seed_user(&t.state.db, "user@example.com", Role::User).await;
        let category = seed_category(&t.state.db, "Courts").await;
        let court = seed_facility(&t.state.db, &category.id, "Court").await;

        let (status, body) = t
            .post_form("/api/facilities/active-reservations", &admin, "")
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "facility_id is required");

        let (status, body) = t
            .post_form(
                "/api/facilities/active-reservations",
                &admin,
                "facility_id=does-not-exist",
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "facility_id is invalid");

        let form = format!("facility_id={}", court.id);
        let (status, body) = t
            .post_form("/api/facilities/active-reservations", &admin, &form)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hasActiveReservations"], false);
        assert_eq!(body["activeReservationCount"], 0);

        let start = crate::services::local_now() + chrono::Duration::days(1);
        let fmt = |d: chrono::NaiveDateTime| d.format("%Y-%m-%d %H:%M").to_string();
        SeedReservation::new(
            &customer.id,
            &court.id,
            &fmt(start),
            &fmt(start + chrono::Duration::hours(1)),
        )
        .insert(&t.state.db)
        .await;

        let uri = format!("/api/facilities/active-reservations?facility_id={}", court.id);
        let (status, body) = t.post_form(&uri, &admin, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hasActiveReservations"], true);
        assert_eq!(body["activeReservationCount"], 1);

        let (status, body) = t.get(&uri, Some(&admin)).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "Method not allowed");

        // Deactivation is refused while the reservation is active
        let form = format!("action=toggle_facility&id={}", court.id);
        let (status, body) = t.post_form("/admin/facilities", &admin, &form).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body["flash"]["message"],
            "Cannot deactivate facility: it has 1 active reservations"
        );
    }

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let t = TestApp::new().await;
        let hash = AuthService::hash_password("s3cret-pass").unwrap();
        UserRepository::create(&t.state.db, "staff@example.com", "Staff", &hash, Role::Staff)
            .await
            .unwrap();

        let login = |password: &str| {
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": "staff@example.com", "password": password })
                        .to_string(),
                ))
                .unwrap()
        };

        let (status, _) = t.send(login("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let response = app(t.state.clone(), auth::router())
            .oneshot(login("s3cret-pass"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with(auth::SESSION_COOKIE));
        assert!(cookie.contains("HttpOnly"));

        let session = cookie.split(';').next().unwrap().to_string();
        let request = Request::builder()
            .uri("/admin/reservations")
            .header(header::COOKIE, session)
            .body(Body::empty())
            .unwrap();
        let (status, _) = t.send(request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn customers_book_and_submit_slips() {
        let t = TestApp::new().await;
        let customer = seed_user(&t.state.db, "user@example.com", Role::User).await;
        let other = seed_user(&t.state.db, "other@example.com", Role::User).await;
        let category = seed_category(&t.state.db, "Courts").await;
        let court = seed_facility(&t.state.db, &category.id, "Court").await;

        let start = (crate::services::local_today() + chrono::Duration::days(2))
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let end = start + chrono::Duration::minutes(90);
        let (status, body) = t
            .post_json(
                "/api/reservations",
                &customer,
                serde_json::json!({
                    "facility_id": court.id,
                    "start_time": start.format("%Y-%m-%dT%H:%M").to_string(),
                    "end_time": end.format("%Y-%m-%dT%H:%M").to_string(),
                    "attendees": 4,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["total_amount"], 200.0);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = t.get("/api/reservations", Some(&customer)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        let (_, body) = t.get("/api/reservations", Some(&other)).await;
        assert!(body.as_array().unwrap().is_empty());

        let uri = format!("/api/reservations/{}/payment-slip", id);
        let slip = serde_json::json!({ "payment_slip_url": "/uploads/slip.png" });
        let (status, _) = t.post_json(&uri, &other, slip.clone()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = t.post_json(&uri, &customer, slip).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payment_slip_url"], "/uploads/slip.png");
    }

    #[tokio::test]
    async fn health_and_security_headers() {
        let t = TestApp::new().await;
        let response = app(t.state.clone(), auth::router())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert!(!headers.contains_key(header::CACHE_CONTROL));

        let response = app(t.state.clone(), auth::router())
            .oneshot(
                Request::builder()
                    .uri("/admin/categories")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    }
}
