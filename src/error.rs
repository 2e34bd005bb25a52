use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::trip::TripStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("offer {0} is no longer open")]
    OfferNotOpen(Uuid),

    #[error("offer {0} has expired")]
    OfferExpired(Uuid),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: TripStatus, to: TripStatus },

    #[error("trip {trip_id} is already terminal ({status})")]
    TripAlreadyTerminal { trip_id: Uuid, status: TripStatus },

    #[error("courier {0} has an active trip")]
    CourierHasActiveTrip(Uuid),

    #[error("no candidate couriers available")]
    NoCandidatesAvailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code so courier apps can tell
    /// "someone else already accepted" apart from "expired".
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::OfferNotOpen(_) => "offer_not_open",
            AppError::OfferExpired(_) => "offer_expired",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::TripAlreadyTerminal { .. } => "trip_already_terminal",
            AppError::CourierHasActiveTrip(_) => "courier_has_active_trip",
            AppError::NoCandidatesAvailable => "no_candidates_available",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::OfferNotOpen(_)
            | AppError::OfferExpired(_)
            | AppError::InvalidTransition { .. }
            | AppError::TripAlreadyTerminal { .. }
            | AppError::CourierHasActiveTrip(_) => StatusCode::CONFLICT,
            AppError::NoCandidatesAvailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
