#![allow(dead_code)]

use portal_messaging::{
    config::Config,
    directory::StaticDirectory,
    models::{Participant, Role},
    routes,
    services::upload::InMemoryUploader,
    state::AppState,
    store::Store,
    websocket::ConnectionRegistry,
};
use std::sync::Arc;
use uuid::Uuid;

pub const AMINA_TOKEN: &str = "token-amina";
pub const BOGDAN_TOKEN: &str = "token-bogdan";
pub const CHEN_TOKEN: &str = "token-chen";
pub const DANA_TOKEN: &str = "token-dana";

/// One messaging service on an ephemeral port with a fixed roster: three
/// students and one staff coordinator.
pub struct TestApp {
    pub base: String,
    pub ws_base: String,
    pub client: reqwest::Client,
    pub amina: Participant,
    pub bogdan: Participant,
    pub chen: Participant,
    pub dana: Participant,
}

fn participant(name: &str, role: Role) -> Participant {
    Participant {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        role,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let amina = participant("amina", Role::Student);
        let bogdan = participant("bogdan", Role::Student);
        let chen = participant("chen", Role::Student);
        let dana = participant("dana", Role::Staff);

        let mut directory = StaticDirectory::new();
        directory.register(AMINA_TOKEN, amina.clone());
        directory.register(BOGDAN_TOKEN, bogdan.clone());
        directory.register(CHEN_TOKEN, chen.clone());
        directory.register(DANA_TOKEN, dana.clone());

        let state = AppState {
            store: Arc::new(Store::new()),
            registry: ConnectionRegistry::new(),
            directory: Arc::new(directory),
            uploader: Arc::new(InMemoryUploader::new()),
            config: Arc::new(Config::default()),
        };

        let app = routes::build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });

        TestApp {
            base: format!("http://{addr}/api/v1"),
            ws_base: format!("ws://{addr}/api/v1"),
            client: reqwest::Client::new(),
            amina,
            bogdan,
            chen,
            dana,
        }
    }

    pub fn get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base, path))
            .bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base, path))
            .bearer_auth(token)
    }

    pub fn put(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .put(format!("{}{}", self.base, path))
            .bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(format!("{}{}", self.base, path))
            .bearer_auth(token)
    }

    /// Opens (or resolves) the direct conversation with `peer` and returns its id.
    pub async fn open_direct(&self, token: &str, peer: Uuid) -> String {
        let resp = self
            .post("/conversations", token)
            .json(&serde_json::json!({ "peer_id": peer }))
            .send()
            .await
            .expect("open direct");
        assert!(resp.status().is_success(), "open_direct: {}", resp.status());
        let body: serde_json::Value = resp.json().await.expect("conversation json");
        body["id"].as_str().expect("conversation id").to_string()
    }

    pub async fn send_text(&self, token: &str, conversation_id: &str, body: &str) -> serde_json::Value {
        let resp = self
            .post(&format!("/conversations/{conversation_id}/messages"), token)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await
            .expect("send message");
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        resp.json().await.expect("message json")
    }

    pub async fn unread(&self, token: &str, conversation_id: &str) -> u64 {
        let resp = self
            .get(&format!("/conversations/{conversation_id}/unread"), token)
            .send()
            .await
            .expect("unread");
        assert!(resp.status().is_success());
        let body: serde_json::Value = resp.json().await.expect("unread json");
        body["unread"].as_u64().expect("unread count")
    }
}
