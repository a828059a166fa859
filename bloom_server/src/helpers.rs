use actix_web::HttpRequest;
use bloom_engine::db_types::CartOwner;

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "x-bloom-user-id";
pub const SESSION_HEADER: &str = "x-bloom-session";

/// Extracts the coarse identity signal forwarded by the storefront. A user id takes precedence over a session
/// token when both are present.
pub fn cart_owner(req: &HttpRequest) -> Result<CartOwner, ServerError> {
    if let Some(value) = req.headers().get(USER_ID_HEADER) {
        let id = value
            .to_str()
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| ServerError::InvalidRequestBody(format!("{USER_ID_HEADER} is not a valid user id")))?;
        return Ok(CartOwner::User(id));
    }
    if let Some(value) = req.headers().get(SESSION_HEADER) {
        let session = value
            .to_str()
            .map_err(|_| ServerError::InvalidRequestBody(format!("{SESSION_HEADER} is not valid UTF-8")))?;
        if session.trim().is_empty() {
            return Err(ServerError::MissingIdentity);
        }
        return Ok(CartOwner::Guest(session.to_string()));
    }
    Err(ServerError::MissingIdentity)
}
