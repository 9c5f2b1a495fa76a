use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use tracing::error;

use crate::domain::error::{AppError, ErrorBody};

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Schema(_) | AppError::Parse(_) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Storage(_)
            | AppError::Database(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if !self.is_user_error() {
            error!(error = %self, "Request failed");
        }

        let mut response = HttpResponse::build(self.status_code());
        if matches!(self, AppError::Unauthorized) {
            response.insert_header((header::WWW_AUTHENTICATE, "Basic realm=\"equiview\""));
        }
        response.json(ErrorBody {
            error: self.public_message(),
        })
    }
}
