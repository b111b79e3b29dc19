use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// JsonBody
///
/// `Json<T>` whose data errors (a missing field, an unknown category) are
/// reported as `ApiError::Validation`, i.e. 400 with an `ErrorResponse` body,
/// like every other invalid payload. Other rejections keep axum's response.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection @ (JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_))) => {
                tracing::debug!("rejected request body: {}", rejection.body_text());
                Err(ApiError::Validation(rejection.body_text()).into_response())
            }
            Err(rejection) => Err(rejection.into_response()),
        }
    }
}
