//! HTTP adapter over the storefront core.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};

use crate::checkout::{CheckoutError, CheckoutForm, CheckoutReceipt, CheckoutService, CheckoutSession};
use crate::config::AppConfig;
use crate::domain::aggregates::{Cart, CartItem, Order, OrderError, OrderStatus};
use crate::domain::value_objects::DEFAULT_CURRENCY;
use crate::heat_hold::{AutoReleaseReport, HeatHoldController, HeatHoldOutcome};
use crate::infrastructure::{
    publish_all, EventPublisher, InMemoryOrderRepository, LogPublisher, NatsPublisher, OrderRepository, PgOrderRepository,
};
use crate::services::{CarrierClient, HttpCarrierClient, LogMailer, UnconfiguredCarrier};
use crate::shipping::{shipping_window_info, DeliveryPromise, EddCalculator, ShippingWindowInfo};
use crate::weather::{check_weather_for_shipping, ShippingWeatherCheck, WeatherProvider, WeatherService};

pub const EVENT_SUBJECT_PREFIX: &str = "cocoa";

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub weather: Arc<dyn WeatherProvider>,
    pub events: Arc<dyn EventPublisher>,
    pub heat_hold: Arc<HeatHoldController>,
    pub checkout: Arc<CheckoutService>,
    pub edd: EddCalculator,
}

impl AppState {
    /// Postgres and NATS when configured, in-process stand-ins otherwise.
    pub async fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let orders: Arc<dyn OrderRepository> = match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
                let repo = PgOrderRepository::new(pool);
                repo.migrate().await?;
                Arc::new(repo)
            }
            None => {
                warn!("DATABASE_URL not set, orders are kept in memory");
                Arc::new(InMemoryOrderRepository::new())
            }
        };
        let events: Arc<dyn EventPublisher> = match &config.nats_url {
            Some(url) => Arc::new(NatsPublisher::connect(url, EVENT_SUBJECT_PREFIX).await?),
            None => Arc::new(LogPublisher),
        };
        let weather: Arc<dyn WeatherProvider> = Arc::new(WeatherService::new(config.weather_api_key.clone(), config.weather_api_url.clone())?);
        let carrier: Arc<dyn CarrierClient> = match &config.carrier_api_url {
            Some(url) => Arc::new(HttpCarrierClient::new(url.clone(), config.carrier_api_key.clone())?),
            None => {
                info!("CARRIER_API_URL not set, shipping cost estimates are skipped");
                Arc::new(UnconfiguredCarrier)
            }
        };

        let edd = EddCalculator::new(config.shop_utc_offset);
        let heat_hold = Arc::new(HeatHoldController::new(orders.clone(), weather.clone(), events.clone()));
        let checkout = CheckoutService::new(orders.clone(), weather.clone(), carrier, Arc::new(LogMailer), events.clone(), config.checkout.clone())
            .with_edd(edd);
        Ok(Self { orders, weather, events, heat_hold, checkout: Arc::new(checkout), edd })
    }
}

type ApiError = (StatusCode, String);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "cocoa-atelier"})) }))
        .route("/api/v1/shipping/window", get(shipping_window))
        .route("/api/v1/weather/:city", get(weather_check))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/delivery", get(delivery_promise))
        .route("/api/v1/orders/:id/status", put(update_status))
        .route("/api/v1/orders/:id/heat-hold", post(activate_heat_hold).delete(release_heat_hold))
        .route("/api/v1/heat-hold/auto-release", post(auto_release))
        .route("/api/v1/checkout", post(checkout))
        .with_state(state)
}

fn internal(e: impl std::fmt::Display) -> ApiError { (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()) }

async fn load(s: &AppState, id: &str) -> Result<Order, ApiError> {
    s.orders.find(id).await.map_err(internal)?.ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))
}

fn outcome_response(outcome: HeatHoldOutcome) -> (StatusCode, Json<HeatHoldOutcome>) {
    let status = if outcome.success { StatusCode::OK } else { StatusCode::CONFLICT };
    (status, Json(outcome))
}

async fn shipping_window(State(s): State<AppState>) -> Json<ShippingWindowInfo> {
    Json(shipping_window_info(&Utc::now().with_timezone(&s.edd.tz())))
}

async fn weather_check(State(s): State<AppState>, Path(city): Path<String>) -> Json<ShippingWeatherCheck> {
    Json(check_weather_for_shipping(s.weather.as_ref(), &city).await)
}

async fn get_order(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Order>, ApiError> {
    load(&s, &id).await.map(Json)
}

async fn delivery_promise(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<DeliveryPromise>, ApiError> {
    let order = load(&s, &id).await?;
    Ok(Json(s.edd.promise(&order, Utc::now())))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}

async fn update_status(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<UpdateStatusRequest>) -> Result<Json<Order>, ApiError> {
    let next: OrderStatus = r.status.parse().map_err(|e: OrderError| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if next == OrderStatus::HeatHold {
        return Err((StatusCode::BAD_REQUEST, "use the heat-hold endpoint".to_string()));
    }
    let mut order = load(&s, &id).await?;

    // Leaving a hold must close the hold record too.
    if order.status() == OrderStatus::HeatHold && next != OrderStatus::Cancelled {
        let outcome = s.heat_hold.release_heat_hold(&id, Some(next)).await;
        if !outcome.success {
            return Err((StatusCode::CONFLICT, outcome.message));
        }
        return load(&s, &id).await.map(Json);
    }

    let now = Utc::now();
    let result = match (next, r.tracking_number) {
        (OrderStatus::Shipped, Some(tracking)) => order.ship(tracking, r.carrier.unwrap_or_default(), now),
        _ => order.transition_to(next, now),
    };
    result.map_err(|e| (StatusCode::CONFLICT, e.to_string()))?;
    order.refresh_estimated_delivery_date(s.edd.estimate(&order));
    s.orders.save(&order).await.map_err(internal)?;
    publish_all(s.events.as_ref(), order.take_events()).await;
    Ok(Json(order))
}

#[derive(Debug, Default, Deserialize)]
pub struct HeatHoldRequest {
    pub reason: Option<String>,
    pub target_temp: Option<f64>,
}

async fn activate_heat_hold(
    State(s): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<HeatHoldRequest>>,
) -> Result<(StatusCode, Json<HeatHoldOutcome>), ApiError> {
    let Json(r) = body.unwrap_or_default();
    let (reason, target_temp) = match (r.reason, r.target_temp) {
        (Some(reason), Some(temp)) => (reason, temp),
        (reason, temp) => {
            let order = load(&s, &id).await?;
            let decision = s.heat_hold.check_heat_hold_required(&order.customer().destination.city).await;
            let reason = reason.or(decision.reason).unwrap_or_else(|| decision.recommendation.clone());
            (reason, temp.unwrap_or(decision.temperature))
        }
    };
    Ok(outcome_response(s.heat_hold.activate_heat_hold(&id, &reason, target_temp).await))
}

#[derive(Debug, Deserialize)]
pub struct ReleaseParams {
    pub status: Option<String>,
}

async fn release_heat_hold(
    State(s): State<AppState>,
    Path(id): Path<String>,
    Query(p): Query<ReleaseParams>,
) -> Result<(StatusCode, Json<HeatHoldOutcome>), ApiError> {
    let status = p
        .status
        .map(|raw| raw.parse::<OrderStatus>())
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(outcome_response(s.heat_hold.release_heat_hold(&id, status).await))
}

async fn auto_release(State(s): State<AppState>) -> Json<AutoReleaseReport> { Json(s.heat_hold.process_auto_releases().await) }

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub idempotency_key: String,
    pub form: CheckoutForm,
    pub items: Vec<CartItem>,
}

async fn checkout(State(s): State<AppState>, Json(r): Json<CheckoutRequest>) -> Result<(StatusCode, Json<CheckoutReceipt>), (StatusCode, Json<Value>)> {
    if r.idempotency_key.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(json!({"error": "idempotency_key is required"}))));
    }
    let mut cart = Cart::new(DEFAULT_CURRENCY);
    for item in r.items {
        cart.add_item(item).map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))))?;
    }
    let mut session = CheckoutSession::new(r.form);
    match s.checkout.place_order(&mut session, &mut cart, &r.idempotency_key).await {
        Ok(receipt) => {
            let status = if receipt.duplicate { StatusCode::OK } else { StatusCode::CREATED };
            Ok((status, Json(receipt)))
        }
        Err(CheckoutError::Validation(errors)) => Err((StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"errors": errors})))),
        Err(CheckoutError::EmptyCart | CheckoutError::Cart(_)) => Err((StatusCode::BAD_REQUEST, Json(json!({"error": session.general_error})))),
        Err(e) => {
            warn!(error = %e, "checkout request failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": session.general_error}))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::form::fixtures::complete_guest_form;
    use crate::checkout::CheckoutSettings;
    use crate::domain::aggregates::order::fixtures::order_at;
    use crate::infrastructure::{InMemoryOrderRepository, RecordingPublisher};
    use crate::services::{LogMailer, UnconfiguredCarrier};
    use crate::weather::fixed::FixedWeather;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(temp: f64) -> (Arc<InMemoryOrderRepository>, Router) {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let weather = Arc::new(FixedWeather::new(temp));
        let events = Arc::new(RecordingPublisher::new());
        let heat_hold = Arc::new(HeatHoldController::new(repo.clone(), weather.clone(), events.clone()));
        let checkout = Arc::new(CheckoutService::new(
            repo.clone(),
            weather.clone(),
            Arc::new(UnconfiguredCarrier),
            Arc::new(LogMailer),
            events.clone(),
            CheckoutSettings::default(),
        ));
        let state = AppState { orders: repo.clone(), weather, events, heat_hold, checkout, edd: EddCalculator::default() };
        (repo, router(state))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn default_config_wires_in_process_adapters() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let state = AppState::from_config(&config).await.unwrap();
        assert_eq!(state.edd.tz().local_minus_utc(), 3 * 3600);
        assert!(state.orders.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn health_and_window() {
        let (_, app) = app(18.0);
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        let (status, body) = call(&app, "GET", "/api/v1/shipping/window", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["shipping_window"].as_str().unwrap().starts_with("Pazartesi-Perşembe"));
    }

    #[tokio::test]
    async fn weather_endpoint_flags_heat() {
        let (_, app) = app(31.0);
        let (_, body) = call(&app, "GET", "/api/v1/weather/Adana", None).await;
        assert_eq!(body["requires_heat_hold"], true);
        assert_eq!(body["requires_cold_pack"], true);
    }

    #[tokio::test]
    async fn hold_and_release_through_http() {
        let (repo, app) = app(31.0);
        let order = order_at("Adana", Utc::now());
        repo.create(&order).await.unwrap();
        let uri = format!("/api/v1/orders/{}/heat-hold", order.id());

        let (status, body) = call(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let (_, body) = call(&app, "GET", &format!("/api/v1/orders/{}", order.id()), None).await;
        assert_eq!(body["status"], "heat_hold");

        let (status, _) = call(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&app, "DELETE", &format!("{}?status=ready-for-packing", uri), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(repo.find(order.id()).await.unwrap().unwrap().status(), OrderStatus::Processing);
    }

    #[tokio::test]
    async fn status_update_rejects_illegal_moves() {
        let (repo, app) = app(18.0);
        let order = order_at("Ankara", Utc::now());
        repo.create(&order).await.unwrap();
        let uri = format!("/api/v1/orders/{}/status", order.id());

        let (status, _) = call(&app, "PUT", &uri, Some(json!({"status": "delivered"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = call(&app, "PUT", &uri, Some(json!({"status": "lost"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = call(&app, "PUT", &uri, Some(json!({"status": "processing"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "processing");

        let (_, body) = call(&app, "GET", &format!("/api/v1/orders/{}/delivery", order.id()), None).await;
        assert!(body["estimated_delivery_date"].is_string());
    }

    #[tokio::test]
    async fn checkout_validation_and_success() {
        let (repo, app) = app(18.0);
        let item = json!({
            "product_id": "bitter-70",
            "title": "Bitter %70",
            "quantity": 3,
            "unit_price": {"amount": "250", "currency": "TRY"},
            "image": null,
            "weight_grams": 100,
            "dimensions": null
        });

        let mut form = complete_guest_form();
        form.agreed_to_terms = false;
        let (status, body) =
            call(&app, "POST", "/api/v1/checkout", Some(json!({"idempotency_key": "k1", "form": form, "items": [item.clone()]}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["agreed_to_terms"].is_string());

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/checkout",
            Some(json!({"idempotency_key": "k1", "form": complete_guest_form(), "items": [item]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["breakdown"]["shipping_cost"]["amount"], "100");
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn checkout_rejects_out_of_range_cart() {
        let (repo, app) = app(18.0);
        let item = json!({
            "product_id": "bitter-70",
            "title": "Bitter %70",
            "quantity": u32::MAX,
            "unit_price": {"amount": "250", "currency": "TRY"},
            "image": null,
            "weight_grams": 100,
            "dimensions": null
        });
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/checkout",
            Some(json!({"idempotency_key": "k9", "form": complete_guest_form(), "items": [item.clone(), item]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(body["error"].as_str().unwrap().contains("out of range"));
        assert_eq!(repo.len().await, 0);
    }
}
