//! One-shot flash messages carried in a cookie across a redirect.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use url::form_urlencoded;

pub const FLASH_COOKIE: &str = "flash";
const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; SameSite=Lax";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            category: "error".to_string(),
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("category", &self.category)
            .append_pair("message", &self.message)
            .finish()
    }

    fn decode(value: &str) -> Option<Self> {
        let mut category = None;
        let mut message = None;
        for (key, val) in form_urlencoded::parse(value.as_bytes()) {
            match key.as_ref() {
                "category" => category = Some(val.into_owned()),
                "message" => message = Some(val.into_owned()),
                _ => {}
            }
        }
        Some(Self {
            category: category.unwrap_or_else(|| "info".to_string()),
            message: message.filter(|m| !m.is_empty())?,
        })
    }
}

/// 303 to `location`, setting the flash cookie.
pub fn redirect_with_flash(location: &str, flash: &Flash) -> Response {
    let cookie = format!("{}={}; {}", FLASH_COOKIE, flash.encode(), COOKIE_ATTRIBUTES);
    let mut response = StatusCode::SEE_OTHER.into_response();
    let headers = response.headers_mut();
    if let Ok(location) = HeaderValue::from_str(location) {
        headers.insert(header::LOCATION, location);
    }
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.insert(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Flash message not representable as a cookie"),
    }
    response
}

/// Read the pending flash message, if any, from the request cookies.
pub fn read_flash(headers: &HeaderMap) -> Option<Flash> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .and_then(|(_, value)| Flash::decode(value))
}

/// Header value expiring the flash cookie.
pub fn clear_flash_cookie() -> HeaderValue {
    HeaderValue::from_static("flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_round_trips_through_cookie_header() {
        let flash = Flash::error("Invalid file format. Please upload a CSV file.");
        let response = redirect_with_flash("/", &flash);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap();

        let mut request_headers = HeaderMap::new();
        request_headers.insert(header::COOKIE, HeaderValue::from_str(&format!("theme=dark; {pair}")).unwrap());
        assert_eq!(read_flash(&request_headers), Some(flash));
    }

    #[test]
    fn test_missing_or_garbled_cookie() {
        assert_eq!(read_flash(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("flash=category=error"));
        assert_eq!(read_flash(&headers), None);
    }
}
