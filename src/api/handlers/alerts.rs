// src/api/handlers/alerts.rs
use actix_web::{
    http::header,
    web::{self, Bytes, Data},
    HttpResponse,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::api::ApiState;
use crate::core::gating::effects::ALERT_TOPIC;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/alerts").route(web::get().to(alert_feed)))
        .service(web::resource("/events").route(web::get().to(event_feed)));
}

/// Server-sent events relaying every message of `rx`. Lagging clients skip
/// what they missed; the stream ends when the channel closes.
fn sse_stream<T, F>(rx: broadcast::Receiver<T>, render: F) -> impl Stream<Item = Result<Bytes, Infallible>>
where
    T: Clone + Send + 'static,
    F: Fn(T) -> Option<String> + 'static,
{
    stream::unfold((rx, render), |(mut rx, render)| async move {
        loop {
            match rx.recv().await {
                Ok(item) => {
                    if let Some(data) = render(item) {
                        let frame = Bytes::from(format!("data: {}\n\n", data));
                        return Some((Ok(frame), (rx, render)));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event client fell behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

fn sse_response<S>(body: S) -> HttpResponse
where
    S: Stream<Item = Result<Bytes, Infallible>> + 'static,
{
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(body)
}

/// High-threat alerts as published on the alert topic.
async fn alert_feed(state: Data<ApiState>) -> HttpResponse {
    info!("Alert client connected");
    let rx = state.alerts.subscribe(ALERT_TOPIC);
    sse_response(sse_stream(rx, Some))
}

/// Pipeline lifecycle and identification events.
async fn event_feed(state: Data<ApiState>) -> HttpResponse {
    info!("Event client connected");
    let rx = state.services.subscribe_events();
    sse_response(sse_stream(rx, |event| serde_json::to_string(&event).ok()))
}
