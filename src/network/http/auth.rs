//! `Authorization` header values.
//!
//! Requests take the header value verbatim; these helpers build the common
//! schemes into a buffer that is guaranteed to fit a request header.
//!
//! ```rust
//! use httpmux::network::http::auth;
//!
//! let value = auth::basic("Aladdin", "open sesame").unwrap();
//! assert_eq!(value, "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
//! ```

use super::MAX_HEADER_VALUE_LEN;
use crate::network::error::Error;
use base64ct::{Base64, Encoding};
use heapless::{String, Vec};

/// An `Authorization` header value.
pub type Credentials = String<MAX_HEADER_VALUE_LEN>;

/// HTTP Basic credentials.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] if `user` contains a colon
/// - [`Error::InvalidHeader`] if the encoded value does not fit a header
pub fn basic(user: &str, password: &str) -> Result<Credentials, Error> {
    if user.contains(':') {
        return Err(Error::InvalidArgument);
    }

    let mut plain: Vec<u8, MAX_HEADER_VALUE_LEN> = Vec::new();
    for part in [user.as_bytes(), b":", password.as_bytes()] {
        plain
            .extend_from_slice(part)
            .map_err(|_| Error::InvalidHeader)?;
    }

    let mut buf = [0u8; MAX_HEADER_VALUE_LEN];
    let encoded = Base64::encode(&plain, &mut buf).map_err(|_| Error::InvalidHeader)?;
    with_scheme("Basic", encoded)
}

/// Bearer token credentials.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] if the value does not fit a header.
pub fn bearer(token: &str) -> Result<Credentials, Error> {
    with_scheme("Bearer", token)
}

fn with_scheme(scheme: &str, credentials: &str) -> Result<Credentials, Error> {
    let mut value = Credentials::new();
    for part in [scheme, " ", credentials] {
        value.push_str(part).map_err(|_| Error::InvalidHeader)?;
    }
    Ok(value)
}
