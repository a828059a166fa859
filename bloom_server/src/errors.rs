use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bloom_engine::{CartApiError, CouponRejection, FieldError, OrderFlowError, ShopDatabaseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("The checkout payload failed validation")]
    ValidationError(Vec<FieldError>),
    #[error("{}", .0.join("; "))]
    OrderRejected(Vec<String>),
    #[error("{0}")]
    CouponRejected(String),
    #[error("The order could not be committed. It is safe to retry. {0}")]
    StoreUnavailable(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("This operation is not allowed. {0}")]
    Forbidden(String),
    #[error("No user id or session token was supplied with the request")]
    MissingIdentity,
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::MissingIdentity => StatusCode::BAD_REQUEST,
            Self::OrderRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CouponRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Forbidden(_) => StatusCode::CONFLICT,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            // Field-level detail so the storefront can mark up the form.
            Self::ValidationError(fields) => {
                serde_json::json!({ "error": self.to_string(), "fields": fields })
            },
            Self::OrderRejected(reasons) => {
                serde_json::json!({ "error": self.to_string(), "reasons": reasons })
            },
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::Validation(fields) => Self::ValidationError(fields),
            OrderFlowError::BusinessRules(reasons) => Self::OrderRejected(reasons),
            OrderFlowError::Persistence(msg) => Self::StoreUnavailable(msg),
            OrderFlowError::OrderNotFound(no) => Self::NoRecordFound(format!("Order {no}")),
            OrderFlowError::CancellationForbidden(msg) => Self::Forbidden(msg),
            OrderFlowError::Internal(msg) => Self::BackendError(msg),
        }
    }
}

impl From<CartApiError> for ServerError {
    fn from(e: CartApiError) -> Self {
        match e {
            CartApiError::Coupon(rejection) => Self::CouponRejected(rejection.to_string()),
            CartApiError::ProductUnavailable(_) |
            CartApiError::LineNotFound(_) |
            CartApiError::DeliveryOptionNotFound(_) |
            CartApiError::AddressNotFound(_) => Self::NoRecordFound(e.to_string()),
            CartApiError::Validation(msg) => Self::InvalidRequestBody(msg),
            CartApiError::Database(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<CouponRejection> for ServerError {
    fn from(e: CouponRejection) -> Self {
        Self::CouponRejected(e.to_string())
    }
}

impl From<ShopDatabaseError> for ServerError {
    fn from(e: ShopDatabaseError) -> Self {
        Self::BackendError(e.to_string())
    }
}
