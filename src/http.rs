use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    serve, Json, Router,
};
use axum_macros::debug_handler;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, instrument};

use crate::{
    domain::{ElectricityProviderError, FrontendResponse},
    setup::AppState,
    transform::{transform, TransformError},
};

const NO_CACHE: &str = "no-cache, no-store, no-transform, must-revalidate, private, max-age=0";
const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 UTC";

/// The main entry point for the http app.
pub(crate) async fn start_http_server(state: AppState, port: u16) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("now listening on port {}", port);

    serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_spot_prices))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static(NO_CACHE),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::PRAGMA,
                    HeaderValue::from_static("no-cache"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::EXPIRES,
                    HeaderValue::from_static(EPOCH),
                ))
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CatchPanicLayer::new()),
        )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    info!("shutdown signal received");
}

/// Fetch the latest spot prices and return them as consumer prices, newest first.
#[debug_handler(state = AppState)]
#[instrument(skip(state))]
async fn get_spot_prices(State(state): State<AppState>) -> Result<Json<FrontendResponse>, AppError> {
    let spot_prices = tokio::time::timeout(state.request_timeout, async {
        let records = state.electricity_provider.fetch_prices().await?;

        transform(&records, state.tariffs, state.timezone).map_err(AppError::from)
    })
    .await
    .map_err(|_| AppError::Timeout(state.request_timeout))??;

    info!("Serving {} spot prices", spot_prices.len());

    Ok(Json(FrontendResponse { spot_prices }))
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Provider(#[from] ElectricityProviderError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("request did not complete within {0:?}")]
    Timeout(Duration),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Provider(ElectricityProviderError::InvalidUrl(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Transform(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::Provider(ElectricityProviderError::Upstream(_)) => "upstream_error",
            AppError::Provider(ElectricityProviderError::Decode(_)) => "decode_error",
            AppError::Provider(ElectricityProviderError::InvalidUrl(_)) => "config_error",
            AppError::Transform(TransformError::ParseTimestamp { .. }) => "parse_error",
            AppError::Transform(TransformError::UncoveredHour(_)) => "tariff_error",
            AppError::Timeout(_) => "timeout_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("{}", self);

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": self.error_type(),
            }
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawHourlyPrice, SpotPriceProvider};
    use crate::energidataservice::Energidataservice;
    use crate::tariff::DEFAULT_TARIFFS;
    use axum::{async_trait, body::Body, http::Request};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    enum Stub {
        Records(Vec<RawHourlyPrice>),
        Decode,
        Panic,
        Stall,
    }

    #[async_trait]
    impl SpotPriceProvider for Stub {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_prices(&self) -> Result<Vec<RawHourlyPrice>, ElectricityProviderError> {
            match self {
                Stub::Records(records) => Ok(records.clone()),
                Stub::Decode => {
                    let error = serde_json::from_str::<Vec<RawHourlyPrice>>("{").unwrap_err();
                    Err(error.into())
                }
                Stub::Panic => panic!("provider exploded"),
                Stub::Stall => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(vec![])
                }
            }
        }
    }

    fn record(hour_utc: &str, spot_price_dkk: f64) -> RawHourlyPrice {
        RawHourlyPrice {
            hour_utc: hour_utc.to_string(),
            hour_dk: hour_utc.to_string(),
            price_area: "DK2".to_string(),
            spot_price_dkk,
            spot_price_eur: 0.0,
        }
    }

    fn app_with_timeout(provider: Arc<dyn SpotPriceProvider>, request_timeout: Duration) -> Router {
        router(AppState::new(
            provider,
            &DEFAULT_TARIFFS,
            chrono_tz::Europe::Copenhagen,
            request_timeout,
        ))
    }

    fn app(stub: Stub) -> Router {
        app_with_timeout(Arc::new(stub), Duration::from_secs(10))
    }

    async fn get_root(app: Router) -> (StatusCode, axum::http::HeaderMap, Value) {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, headers, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn summer_high(spot_price_dkk: f64) -> String {
        format!("{:.6}", (spot_price_dkk / 1000.0 + 0.7610 + 0.0975 + 0.1689) * 1.25)
    }

    #[tokio::test]
    async fn test_get_spot_prices() {
        let stub = Stub::Records(vec![
            record("2024-06-15T11:00:00", 100.0),
            record("2024-06-15T12:00:00", 200.0),
        ]);

        let (status, headers, body) = get_root(app(stub)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(
            body,
            json!({
                "spot_prices": [
                    {
                        "start_time": "2024-06-15T14:00:00+02:00",
                        "price": summer_high(200.0),
                    },
                    {
                        "start_time": "2024-06-15T13:00:00+02:00",
                        "price": summer_high(100.0),
                    },
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_no_cache_and_request_id_headers() {
        let (_, headers, _) = get_root(app(Stub::Records(vec![]))).await;

        assert_eq!(headers[header::CACHE_CONTROL], NO_CACHE);
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], EPOCH);
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_decode_error_is_bad_gateway() {
        let (status, _, body) = get_root(app(Stub::Decode)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "decode_error");
    }

    #[tokio::test]
    async fn test_malformed_timestamp_is_internal_error() {
        let stub = Stub::Records(vec![
            record("2024-06-15T11:00:00", 100.0),
            record("15/06/2024 12:00", 200.0),
        ]);

        let (status, _, body) = get_root(app(stub)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "parse_error");
        assert!(body.get("spot_prices").is_none());
    }

    #[tokio::test]
    async fn test_panic_is_recovered() {
        let (status, headers, _) = get_root(app(Stub::Panic)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(headers[header::CACHE_CONTROL], NO_CACHE);
    }

    #[tokio::test]
    async fn test_slow_upstream_is_bad_gateway() {
        let upstream = Router::new().route(
            "/dataset/Elspotprices",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });

        let provider = Energidataservice::new(
            &format!("http://{}/dataset/Elspotprices", address),
            "DK2",
            168,
            Duration::from_millis(200),
        )
        .unwrap();

        let (status, headers, body) =
            get_root(app_with_timeout(Arc::new(provider), Duration::from_secs(2))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "upstream_error");
        assert_eq!(headers[header::CACHE_CONTROL], NO_CACHE);
    }

    #[tokio::test]
    async fn test_request_timeout_is_gateway_timeout() {
        let app = app_with_timeout(Arc::new(Stub::Stall), Duration::from_millis(100));

        let (status, _, body) = get_root(app).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["type"], "timeout_error");
    }

    #[tokio::test]
    async fn test_upstream_error_response() {
        let error = reqwest::Client::new().get("not a url").build().unwrap_err();
        let response = AppError::from(ElectricityProviderError::from(error)).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_uncovered_hour_is_tariff_error() {
        let error = AppError::from(TransformError::UncoveredHour(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        ));

        assert_eq!(error.error_type(), "tariff_error");
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.to_string(), "no tariff bracket covers 2024-01-01 00:00:00");
    }
}
