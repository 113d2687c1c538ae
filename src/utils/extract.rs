//! Custom Axum extractors

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        FromRequest, Request,
    },
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use alicia_http::AppError;

/// JSON body whose rejections render in the common error format.
///
/// Shape mismatches (missing fields, unknown enum members) become 422 with a
/// `body` detail; malformed JSON and a wrong content type become 400.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(err) => AppError::validation(
            vec![json!({"field": "body", "error": err.body_text()})],
            "request body does not match the expected shape",
        ),
        other => AppError::bad_request(other.body_text()),
    }
}

/// Body accepted either as an HTML form post or as JSON.
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            match Form::<T>::from_request(req, state).await {
                Ok(Form(value)) => Ok(Self(value)),
                Err(rejection) => Err(form_rejection(rejection)),
            }
        } else {
            ValidJson::<T>::from_request(req, state)
                .await
                .map(|ValidJson(value)| Self(value))
        }
    }
}

fn form_rejection(rejection: FormRejection) -> AppError {
    match rejection {
        FormRejection::FailedToDeserializeFormBody(err) => AppError::validation(
            vec![json!({"field": "body", "error": err.body_text()})],
            "form does not match the expected shape",
        ),
        FormRejection::FailedToDeserializeForm(err) => AppError::validation(
            vec![json!({"field": "body", "error": err.body_text()})],
            "form does not match the expected shape",
        ),
        other => AppError::bad_request(other.body_text()),
    }
}
