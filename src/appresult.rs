use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// A write was missing a required field or referenced something that doesn't exist.
    Validation(String),
    NotFound(String),
    /// The store (or something under it) failed. `action` is what the client gets told.
    Unavailable {
        action: &'static str,
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Unavailable { action, .. } => format!("Failed to {action}"),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { action, source } => write!(f, "failed to {action}: {source:#}"),
            _ => f.write_str(&self.message()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Unavailable { source, .. } => {
                tracing::error!(error = %self, backtrace = %source.backtrace(), "request failed");
            }
            _ => tracing::warn!(error = %self, "request rejected"),
        }

        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Names the operation a store failure happened in, for the 500 body.
pub trait During<T> {
    fn during(self, action: &'static str) -> AppResult<T>;
}

impl<T> During<T> for AppResult<T> {
    fn during(self, action: &'static str) -> AppResult<T> {
        self.map_err(|err| match err {
            AppError::Unavailable { source, .. } => AppError::Unavailable { action, source },
            other => other,
        })
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Unavailable { action: "process request", source: err }
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::from(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(sqlx::Error);
apperr_impl!(uuid::Error);
apperr_impl!(serde_json::Error);
apperr_impl!(axum::Error);
apperr_impl!(time::error::ComponentRange);
