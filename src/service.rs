use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;

use crate::{
    inbound::InboundForm,
    relay::{Relay, RelayOutcome},
    telegram::MessagingApi,
    Error, HeaderMap,
};

/// Runs one HTTP request through the relay and maps the result to a response.
///
/// The method is checked before the body is read, and the body is read up
/// to the configured limit.
pub async fn handle_request<A, B>(relay: &Relay<A>, req: Request<B>) -> Response<Full<Bytes>>
where
    A: MessagingApi,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    if parts.method != Method::POST {
        return error_response(&Error::MethodNotAllowed);
    }

    let limit = relay.config().max_body_bytes;
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let err = if e.downcast_ref::<LengthLimitError>().is_some() {
                Error::BodyTooLarge(limit)
            } else {
                Error::inner(e)
            };
            log::warn!("Could not read request body: {}", err);
            return error_response(&err);
        }
    };

    respond(relay, &parts.method, &parts.headers, body).await
}

/// Relays an already collected request.
pub async fn respond<A, H>(
    relay: &Relay<A>,
    method: &Method,
    headers: &H,
    body: Bytes,
) -> Response<Full<Bytes>>
where
    A: MessagingApi,
    H: HeaderMap + ?Sized,
{
    let len = body.len();
    let res = match InboundForm::from_parts(method, headers, body) {
        Ok(form) => relay.relay_form(&form).await,
        Err(e) => Err(e),
    };

    match res {
        Ok(outcome) => {
            log::info!("Relayed form of {} bytes: {:?}", len, outcome);
            ok_response(outcome)
        }
        Err(e) => {
            if e.status().is_server_error() {
                log::error!("Relaying form failed: {}", e);
            } else {
                log::info!("Rejected request: {}", e);
            }
            error_response(&e)
        }
    }
}

pub fn ok_response(outcome: RelayOutcome) -> Response<Full<Bytes>> {
    let body = match outcome.note() {
        Some(note) => serde_json::json!({ "ok": true, "note": note }),
        None => serde_json::json!({ "ok": true }),
    };

    json_response(StatusCode::OK, &body)
}

pub fn error_response(e: &Error) -> Response<Full<Bytes>> {
    json_response(e.status(), &serde_json::json!({ "error": e.to_string() }))
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from(body.to_string())));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}
