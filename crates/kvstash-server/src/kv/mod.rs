//! Key-value HTTP handlers.
//!
//! - `POST /set`         : store `key` / `value` (urlencoded or multipart body, or query string)
//! - `GET  /get/:key`    : raw value, empty when absent
//! - `GET  /search`      : keys matching `prefix` and `suffix`, one per line
//!
//! Every input is reduced to a string: the first occurrence of a repeated
//! parameter wins, and missing or unparsable parameters read as empty. These
//! handlers always answer 200.

use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, StatusCode, Uri},
    Form,
};
use percent_encoding::percent_decode_str;

use crate::app_state::AppState;

pub const SET_ENDPOINT: &str = "setHandler";
pub const GET_ENDPOINT: &str = "getHandler";
pub const SEARCH_ENDPOINT: &str = "searchHandler";

const GET_PREFIX: &str = "/get/";

/// Decoded `name=value` pairs in arrival order.
type Pairs = Vec<(String, String)>;

/// First value for `name`, if present.
fn first(pairs: &[(String, String)], name: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Body fields of a `POST /set`. Anything that is not a readable form yields no pairs.
async fn body_pairs(req: Request) -> Pairs {
    if is_multipart(&req) {
        let Ok(multipart) = Multipart::from_request(req, &()).await else {
            return Vec::new();
        };
        return multipart_pairs(multipart).await;
    }
    match Form::<Pairs>::from_request(req, &()).await {
        Ok(Form(pairs)) => pairs,
        Err(_) => Vec::new(),
    }
}

/// Non-file multipart fields. A malformed stream keeps whatever was read before it broke.
async fn multipart_pairs(mut multipart: Multipart) -> Pairs {
    let mut pairs = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else { continue };
        match field.text().await {
            Ok(text) => pairs.push((name, text)),
            Err(e) => {
                tracing::debug!(error = %e, field = %name, "unreadable multipart field");
                break;
            }
        }
    }
    pairs
}

pub async fn set(
    State(state): State<AppState>,
    query: Option<Query<Pairs>>,
    req: Request,
) -> StatusCode {
    let _timer = state.metrics().start_timer(SET_ENDPOINT);

    let query = query.map(|Query(q)| q).unwrap_or_default();
    let body = body_pairs(req).await;

    // Body fields win over query fields of the same name.
    let key = first(&body, "key").or_else(|| first(&query, "key")).unwrap_or_default();
    let value = first(&body, "value").or_else(|| first(&query, "value")).unwrap_or_default();

    tracing::trace!(%key, value_len = value.len(), "set");
    state.store().set(key, value);

    state.metrics().record_status(SET_ENDPOINT, StatusCode::OK.as_u16());
    StatusCode::OK
}

pub async fn get(State(state): State<AppState>, uri: Uri) -> (StatusCode, String) {
    let _timer = state.metrics().start_timer(GET_ENDPOINT);

    // The route only matches a single segment after the prefix.
    let raw = uri.path().strip_prefix(GET_PREFIX).unwrap_or_default();
    let key = percent_decode_str(raw).decode_utf8_lossy();
    let value = state.store().get(&key);

    state.metrics().record_status(GET_ENDPOINT, StatusCode::OK.as_u16());
    (StatusCode::OK, value)
}

pub async fn search(
    State(state): State<AppState>,
    params: Option<Query<Pairs>>,
) -> (StatusCode, String) {
    let _timer = state.metrics().start_timer(SEARCH_ENDPOINT);

    let params = params.map(|Query(p)| p).unwrap_or_default();
    let prefix = first(&params, "prefix").unwrap_or_default();
    let suffix = first(&params, "suffix").unwrap_or_default();

    let mut body = String::new();
    state.store().search_with(&prefix, &suffix, |key| {
        body.push_str(key);
        body.push('\n');
    });

    state.metrics().record_status(SEARCH_ENDPOINT, StatusCode::OK.as_u16());
    (StatusCode::OK, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Pairs {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn first_value_wins() {
        let p = pairs(&[("prefix", "abc"), ("prefix", "zzz"), ("suffix", "-1")]);
        assert_eq!(first(&p, "prefix").as_deref(), Some("abc"));
        assert_eq!(first(&p, "suffix").as_deref(), Some("-1"));
        assert_eq!(first(&p, "missing"), None);
    }
}
