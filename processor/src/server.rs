use crate::config::ConfigError;
use crate::processor::{Outcome, Processor};
use http_body_util::{BodyExt, Empty, Full, combinators::BoxBody};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

pub type ResponseBody = BoxBody<Bytes, hyper::Error>;

#[derive(Debug)]
pub enum ServerError {
    Config(ConfigError),
    Bind(std::io::Error),
    Accept(std::io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ServerError::Bind(e) => write!(f, "Failed to bind listener: {}", e),
            ServerError::Accept(e) => write!(f, "Failed to accept connection: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        ServerError::Config(e)
    }
}

fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

fn full<T: Into<Bytes>>(chunk: T) -> ResponseBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

fn status_only(status: StatusCode) -> Response<ResponseBody> {
    let mut res = Response::new(empty());
    *res.status_mut() = status;
    res
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            return status_only(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut res = Response::new(full(bytes));
    *res.status_mut() = status;
    res.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    res
}

#[derive(Debug)]
enum PayloadError {
    Malformed(serde_json::Error),
    NotObjectOrArray,
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::Malformed(e) => write!(f, "malformed JSON: {}", e),
            PayloadError::NotObjectOrArray => write!(f, "top-level JSON value is not an object or array"),
        }
    }
}

fn is_json_content_type(req: &Request<Incoming>) -> bool {
    req.headers()
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Empty bodies are treated as `{}`. Otherwise the body must be a JSON object
/// or array.
fn parse_payload(body: &[u8]) -> Result<Value, PayloadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    match serde_json::from_slice::<Value>(body).map_err(PayloadError::Malformed)? {
        payload @ (Value::Object(_) | Value::Array(_)) => Ok(payload),
        _ => Err(PayloadError::NotObjectOrArray),
    }
}

async fn process_handler(
    req: Request<Incoming>,
    processor: &Processor,
) -> Result<Response<ResponseBody>, hyper::Error> {
    let is_json = is_json_content_type(&req);
    let body = req.into_body().collect().await?.to_bytes();

    // Bodies of any other content type are not parsed and count as `{}`.
    let payload = if is_json {
        parse_payload(&body)
    } else {
        Ok(Value::Object(Default::default()))
    };

    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected request body");
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "message": "Invalid JSON body." }),
            ));
        }
    };

    let res = match processor.process(&payload) {
        Outcome::Processed(body) => json_response(StatusCode::OK, &body),
        Outcome::Failed(body) => json_response(StatusCode::INTERNAL_SERVER_ERROR, &body),
    };
    Ok(res)
}

pub async fn handle(
    req: Request<Incoming>,
    processor: Arc<Processor>,
) -> Result<Response<ResponseBody>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/process") => process_handler(req, &processor).await,
        (&Method::GET, "/health") => Ok(json_response(
            StatusCode::OK,
            &json!({ "healthy": true, "processor": processor.name() }),
        )),
        _ => Ok(status_only(StatusCode::NOT_FOUND)),
    }
}

pub async fn bind(processor: &Processor) -> Result<TcpListener, ServerError> {
    TcpListener::bind(processor.config().socket_addr())
        .await
        .map_err(ServerError::Bind)
}

/// Accepts connections until the listener fails, one task per connection.
pub async fn serve(listener: TcpListener, processor: Arc<Processor>) -> Result<(), ServerError> {
    loop {
        let (stream, addr) = listener.accept().await.map_err(ServerError::Accept)?;
        tracing::debug!(?addr, "Accepted connection");

        let io = TokioIo::new(stream);
        let processor = Arc::clone(&processor);

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(
                    io,
                    service_fn(move |req| handle(req, Arc::clone(&processor))),
                )
                .await
            {
                tracing::warn!(error = ?err, "Error serving connection");
            }
        });
    }
}
