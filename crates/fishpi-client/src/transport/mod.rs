//! Websocket transport: frame codec and the reconnecting session.

pub mod codec;
pub mod ws;

pub use ws::{SessionOptions, SessionState, WebsocketSession};

/// `url` with every `apiKey` query value replaced by `***`, for status text.
pub fn mask_api_key(raw: &str) -> String {
    let Ok(mut u) = url::Url::parse(raw) else {
        return raw.to_string();
    };
    if !u.query_pairs().any(|(k, _)| k == "apiKey") {
        return raw.to_string();
    }
    let pairs: Vec<(String, String)> = u
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "apiKey" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    u.query_pairs_mut().clear().extend_pairs(pairs);
    u.to_string()
}
