use serde_json::Value;
use std::thread;
use std::time::{Duration, Instant};
use wish_burner::server;
use wish_burner::store::WishStore;

fn start_test_server(ttl: Duration) -> (String, WishStore) {
    let srv = server::init_server("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server::local_addr(&srv));
    let store = WishStore::new(ttl);
    let handle = store.clone();
    thread::spawn(move || server::run_server(srv, handle));
    (base, store)
}

/// Status and parsed JSON body, whether or not the status is an error.
fn call(req: ureq::Request, body: Option<&str>) -> (u16, Value) {
    let result = match body {
        Some(b) => req.set("Content-Type", "application/json").send_string(b),
        None => req.call(),
    };
    let resp = match result {
        Ok(resp) => resp,
        Err(ureq::Error::Status(_, resp)) => resp,
        Err(e) => panic!("transport error: {e}"),
    };
    let status = resp.status();
    let text = resp.into_string().unwrap();
    let json = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap()
    };
    (status, json)
}

fn create(base: &str, body: &str) -> (u16, Value) {
    call(ureq::post(&format!("{base}/api/create")), Some(body))
}

#[test]
fn wish_lifecycle() {
    let (base, _store) = start_test_server(Duration::from_secs(3600));

    let (status, body) = create(&base, r#"{"name":"A","wish":"peace"}"#);
    assert_eq!(status, 200);
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 8);

    let (status, report) = call(ureq::get(&format!("{base}/api/report/{id}")), None);
    assert_eq!(status, 200);
    assert_eq!(report["name"], "A");
    assert_eq!(report["wish"], "peace");
    let intensity = report["intensity"].as_u64().unwrap();
    assert!((80..100).contains(&intensity));
    assert_eq!(report["ttl"], "24h");

    let burn = format!(r#"{{"id":"{id}"}}"#);
    let (status, body) = call(ureq::post(&format!("{base}/api/burn")), Some(&burn));
    assert_eq!(status, 200);
    assert_eq!(body["status"], "burned");

    let (status, body) = call(ureq::post(&format!("{base}/api/burn")), Some(&burn));
    assert_eq!(status, 404);
    assert!(body["error"].is_string());

    let (status, _) = call(ureq::get(&format!("{base}/api/report/{id}")), None);
    assert_eq!(status, 404);
}

#[test]
fn validation_errors_leave_store_empty() {
    let (base, store) = start_test_server(Duration::from_secs(3600));
    assert_eq!(create(&base, r#"{"name":"A"}"#).0, 400);
    assert_eq!(create(&base, r#"{"name":"","wish":"peace"}"#).0, 400);
    assert_eq!(create(&base, "{").0, 400);
    assert!(store.is_empty());
}

#[test]
fn unknown_ids_and_wrong_methods() {
    let (base, _store) = start_test_server(Duration::from_secs(3600));
    let (status, _) = call(ureq::get(&format!("{base}/api/report/NOPE0000")), None);
    assert_eq!(status, 404);

    let (status, body) = call(ureq::get(&format!("{base}/api/create")), None);
    assert_eq!(status, 405);
    assert_eq!(body["error"], "method not allowed");
}

#[test]
fn expired_wish_is_not_found() {
    let (base, store) = start_test_server(Duration::from_secs(3600));
    let (_, body) = create(&base, r#"{"name":"A","wish":"peace"}"#);
    let id = body["id"].as_str().unwrap().to_string();

    assert_eq!(store.sweep(Instant::now() + Duration::from_secs(3600)), 1);

    let (status, _) = call(ureq::get(&format!("{base}/api/report/{id}")), None);
    assert_eq!(status, 404);
}

#[test]
fn cors_preflight_and_health() {
    let (base, _store) = start_test_server(Duration::from_secs(3600));

    let resp = ureq::request("OPTIONS", &format!("{base}/api/create"))
        .call()
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));

    create(&base, r#"{"name":"A","wish":"peace"}"#);
    let (status, body) = call(ureq::get(&format!("{base}/health")), None);
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["wishes"], 1);
}
