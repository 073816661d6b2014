//! Local actix-web node for full-cycle tests.
//!
//! Beacon API paths are plain GET routes. JSON-RPC goes to `POST /` and is
//! dispatched on the request's `method`. Anything unrouted answers 404.

#![allow(dead_code)]

use std::collections::HashMap;

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, web};
use nodecheck::Config;
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const SEPOLIA_CHAIN_ID_HEX: &str = "0xaa36a7";

#[derive(Debug, Clone)]
struct Reply {
    status: u16,
    body: String,
}

impl Reply {
    fn respond(&self) -> HttpResponse {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::build(status).content_type("application/json").body(self.body.clone())
    }
}

#[derive(Default, Clone)]
pub struct Routes {
    gets: HashMap<String, Reply>,
    rpc: HashMap<String, Reply>,
}

impl Routes {
    pub fn get(mut self, path: &str, status: u16, body: Value) -> Self {
        self.gets.insert(path.to_string(), Reply { status, body: body.to_string() });
        self
    }

    pub fn get_empty(mut self, path: &str, status: u16) -> Self {
        self.gets.insert(path.to_string(), Reply { status, body: String::new() });
        self
    }

    pub fn rpc(mut self, method: &str, result: Value) -> Self {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "result": result });
        self.rpc.insert(method.to_string(), Reply { status: 200, body: body.to_string() });
        self
    }
}

async fn rpc(request: web::Json<Value>, methods: web::Data<HashMap<String, Reply>>) -> HttpResponse {
    let method = request["method"].as_str().unwrap_or_default();
    match methods.get(method) {
        Some(reply) => reply.respond(),
        None => HttpResponse::NotFound().finish(),
    }
}

pub struct StubNode {
    pub port: u16,
    server: ServerHandle,
}

impl StubNode {
    pub fn start(routes: Routes) -> Self {
        let Routes { gets, rpc: methods } = routes;
        let methods = web::Data::new(methods);

        let server = HttpServer::new(move || {
            let mut app = App::new().app_data(methods.clone()).route("/", web::post().to(rpc));
            for (path, reply) in &gets {
                let reply = reply.clone();
                app = app.route(path, web::get().to(move || {
                    let reply = reply.clone();
                    async move { reply.respond() }
                }));
            }
            app
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .unwrap();

        let port = server.addrs()[0].port();
        let server = server.run();
        let handle = server.handle();
        tokio::spawn(server);

        Self { port, server: handle }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for StubNode {
    fn drop(&mut self) {
        // the stop command is sent before the returned future is polled
        drop(self.server.stop(false));
    }
}

pub fn peers(count: usize) -> Value {
    let data: Vec<Value> = (0..count)
        .map(|i| json!({ "peer_id": format!("16Uiu2HAm{i}"), "state": "connected", "direction": "outbound" }))
        .collect();
    json!({ "data": data, "meta": { "count": count } })
}

pub fn beacon_routes(is_syncing: bool, sync_distance: u64) -> Routes {
    Routes::default()
        .get_empty("/eth/v1/node/health", if is_syncing { 206 } else { 200 })
        .get(
            "/eth/v1/node/syncing",
            200,
            json!({ "data": {
                "head_slot": "7000000",
                "sync_distance": sync_distance.to_string(),
                "is_syncing": is_syncing,
                "is_optimistic": false,
                "el_offline": false,
            }}),
        )
        .get("/eth/v1/node/peers", 200, peers(40))
        .get(
            "/eth/v1/beacon/headers/head",
            200,
            json!({ "data": { "root": "0xabc", "canonical": true } }),
        )
        .get("/eth/v1/beacon/blob_sidecars/head", 200, json!({ "data": [{ "index": "0" }] }))
}

pub fn execution_routes(chain_id: &str) -> Routes {
    Routes::default()
        .rpc("eth_chainId", json!(chain_id))
        .rpc("eth_syncing", json!(false))
        .rpc("eth_blockNumber", json!("0x6f1a2b"))
        .rpc("net_peerCount", json!("0x32"))
}

/// Config pointed at the given endpoints with short timeouts
pub fn config(consensus: &str, execution: &str) -> Config {
    let mut config = Config::default();
    config.endpoints.consensus = consensus.to_string();
    config.endpoints.execution = execution.to_string();
    config.probe.timeout_seconds = 5;
    config.probe.retries = 2;
    config.probe.retry_delay_ms = 0;
    config.probe.connect_pause_ms = 0;
    config
}

/// A local port nothing listens on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
