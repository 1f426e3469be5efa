//! Conversions from external infrastructure errors into transport errors.

use reqwest::Error as HttpError;

use crate::http::TransportError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for TransportError {
    fn from(err: HttpError) -> Self {
        if err.is_timeout() {
            return TransportError::Timeout(err.to_string());
        }
        if err.is_connect() {
            return TransportError::Connect(err.to_string());
        }
        if err.is_builder() {
            return TransportError::InvalidRequest(err.to_string());
        }
        if err.is_body() || err.is_decode() {
            return TransportError::Body(err.to_string());
        }
        TransportError::Request(err.to_string())
    }
}
