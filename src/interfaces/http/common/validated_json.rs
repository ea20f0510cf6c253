//! JSON body extractor that also runs `validator` rules
//!
//! Rejections are plain [`ApiError`]s: 400 `bad_request` for bodies that do
//! not parse, 422 `validation` for bodies that parse but break a rule.

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::ApiError;

/// `Json<T>` whose value has passed `T::validate()`.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct SpotRef {
        #[validate(length(min = 1, max = 64))]
        spot_id: String,
    }

    async fn echo(ValidatedJson(body): ValidatedJson<SpotRef>) -> String {
        body.spot_id
    }

    async fn post_raw(body: &'static str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri("/spot")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = Router::new()
            .route("/spot", post(echo))
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn passes_a_valid_body_through() {
        let (status, body) = post_raw(r#"{"spot_id": "urn:ngsi-ld:ParkingSpot:A"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"urn:ngsi-ld:ParkingSpot:A");
    }

    #[tokio::test]
    async fn unparsable_body_is_bad_request() {
        for raw in ["spot A please", r#"{"spot_id": 7}"#] {
            let (status, body) = post_raw(raw).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{raw}");
            let json: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["kind"], "bad_request");
            assert_eq!(json["retryable"], false);
        }
    }

    #[tokio::test]
    async fn rule_violation_is_unprocessable() {
        let (status, body) = post_raw(r#"{"spot_id": ""}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            json!({
                "status": "error",
                "kind": "validation",
                "message": "spot_id: length",
                "retryable": false
            })
        );
    }
}
