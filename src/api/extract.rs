/// JSON body extractor that also runs `validator` rules
use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// `Json<T>` whose rejections and rule failures come back as `AppError`
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection.body_text(), "rejected request body");
            AppError::BadRequest(rejection.body_text())
        })?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}
