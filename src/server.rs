use std::io::Read;
use std::net::SocketAddr;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tiny_http::{Header, Method, Request, Response};
use tracing::{debug, info, warn};

use crate::error::{ServerError, WishError};
use crate::report::Report;
use crate::store::WishStore;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const REPORT_PREFIX: &str = "/api/report/";

// fields stay loosely typed: any truthy JSON value counts as present
#[derive(Debug, Deserialize)]
struct CreateBody {
    #[serde(default)]
    name: Value,
    #[serde(default)]
    wish: Value,
}

#[derive(Debug, Deserialize)]
struct BurnBody {
    #[serde(default)]
    id: Value,
}

/// Status plus optional JSON body, before it is turned into a tiny_http response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    fn json(status: u16, body: Value) -> Self {
        Reply {
            status,
            body: Some(body),
        }
    }

    fn empty(status: u16) -> Self {
        Reply { status, body: None }
    }
}

impl From<WishError> for Reply {
    fn from(err: WishError) -> Self {
        Reply::json(err.status_code(), json!({ "error": err.to_string() }))
    }
}

/// Binds the HTTP listener on `addr`. Pass the result to `run_server` to start serving.
pub fn init_server(addr: &str) -> Result<tiny_http::Server, ServerError> {
    let server = tiny_http::Server::http(addr).map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    Ok(server)
}

pub fn local_addr(server: &tiny_http::Server) -> SocketAddr {
    server.server_addr()
}

/// Run the accept loop, one thread per request. Returns when the server is dropped or unblocked.
pub fn run_server(server: tiny_http::Server, store: WishStore) {
    info!("wish server listening on http://{}", server.server_addr());
    for request in server.incoming_requests() {
        let store = store.clone();
        std::thread::spawn(move || serve(request, &store));
    }
}

fn serve(mut req: Request, store: &WishStore) {
    let method = req.method().clone();
    let url = req.url().to_string();

    let mut body = String::new();
    let reply = match req.as_reader().read_to_string(&mut body) {
        Ok(_) => route(&method, &url, &body, store),
        Err(e) => {
            warn!("failed to read body for {} {}: {}", method, url, e);
            WishError::BadRequest("unreadable body".to_string()).into()
        }
    };
    debug!("{} {} -> {}", method, url, reply.status);

    if let Err(e) = req.respond(into_response(reply)) {
        warn!("failed to send response for {} {}: {}", method, url, e);
    }
}

/// Dispatch one request against the store. Kept free of I/O so it can be tested directly.
pub fn route(method: &Method, url: &str, body: &str, store: &WishStore) -> Reply {
    let path = url.split('?').next().unwrap_or_default();

    if *method == Method::Options {
        return Reply::empty(204);
    }

    let result = match path {
        "/api/create" => match method {
            Method::Post => create(body, store),
            _ => Err(WishError::MethodNotAllowed),
        },
        "/api/burn" => match method {
            Method::Post => burn(body, store),
            _ => Err(WishError::MethodNotAllowed),
        },
        "/health" if *method == Method::Get => Ok(Reply::json(
            200,
            json!({ "status": "ok", "wishes": store.len() }),
        )),
        "/favicon.ico" if *method == Method::Get => Ok(Reply::empty(204)),
        _ => match path.strip_prefix(REPORT_PREFIX) {
            Some(id) if !id.is_empty() => match method {
                Method::Get => report(id, store),
                _ => Err(WishError::MethodNotAllowed),
            },
            _ => Err(WishError::NotFound),
        },
    };

    result.unwrap_or_else(|err| {
        debug!("{} {} failed: {}", method, path, err);
        err.into()
    })
}

fn create(body: &str, store: &WishStore) -> Result<Reply, WishError> {
    let parsed: CreateBody = parse_body(body)?;
    let name = field_text(parsed.name);
    let wish = field_text(parsed.wish);
    let id = store.create(&name, &wish)?;
    info!(%id, "wish created");
    Ok(Reply::json(200, json!({ "id": id })))
}

fn burn(body: &str, store: &WishStore) -> Result<Reply, WishError> {
    let parsed: BurnBody = parse_body(body)?;
    // ids are strings; anything else cannot name a stored wish
    let Value::String(id) = parsed.id else {
        return Err(WishError::NotFound);
    };
    store.burn(&id)?;
    info!(%id, "wish burned");
    Ok(Reply::json(200, json!({ "status": "burned" })))
}

fn report(id: &str, store: &WishStore) -> Result<Reply, WishError> {
    let record = store.get(id)?;
    let report = Report::generate(record);
    let body = serde_json::to_value(&report).map_err(|e| WishError::Internal(e.to_string()))?;
    Ok(Reply::json(200, body))
}

/// Text of a body field, or empty when the value is missing or falsy.
fn field_text(value: Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::String(s) => s,
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        other => other.to_string(),
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, WishError> {
    serde_json::from_str(body).map_err(|e| WishError::BadRequest(e.to_string()))
}

fn into_response(reply: Reply) -> Response<std::io::Cursor<Vec<u8>>> {
    let text = reply.body.map(|v| v.to_string()).unwrap_or_default();
    let mut response = Response::from_string(text).with_status_code(reply.status);
    for (name, value) in [
        ("Content-Type", JSON_CONTENT_TYPE),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
    ] {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response = response.with_header(header);
        }
    }
    response
}
