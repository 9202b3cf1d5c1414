//! Integration tests for the REST API.
//!
//! Each test boots a full server (in-memory store, scripted persona) on an
//! ephemeral port and talks to it over real HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use ghostline_server::api::{build_router, AppState};
use ghostline_server::auth::SessionStore;
use ghostline_server::persona::{Persona, REPLY_TEMPLATES};
use ghostline_server::rate_limit::RateLimiter;
use ghostline_server::responder::Responder;
use ghostline_store::{MemStore, Presence, Storage};

/// Deterministic persona with a short reply delay so tests finish fast.
struct Scripted;

impl Persona for Scripted {
    fn avatar_url(&self) -> String {
        "https://example.com/avatar.png".into()
    }

    fn presence(&self) -> Presence {
        Presence::Online
    }

    fn reply_text(&self) -> String {
        REPLY_TEMPLATES[0].to_string()
    }

    fn reply_delay(&self) -> Duration {
        Duration::from_millis(25)
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn spawn() -> Self {
        let store: Arc<dyn Storage> = Arc::new(MemStore::new());
        let persona: Arc<dyn Persona> = Arc::new(Scripted);
        let responder = Arc::new(Responder::new(Arc::clone(&store), Arc::clone(&persona)));

        let state = AppState {
            store,
            sessions: SessionStore::new(),
            persona,
            responder,
            limiter: RateLimiter::new(10_000),
        };

        let app = build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("serve");
        });

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
        }
    }

    /// Log in as a fixed user id and return the bearer token.
    async fn login(&self, id: &str) -> String {
        let res = self
            .client
            .post(format!("{}/api/auth/login", self.base))
            .json(&json!({ "id": id, "email": format!("{id}@example.com") }))
            .send()
            .await
            .expect("login request");
        assert_eq!(res.status(), 200);

        let body: Value = res.json().await.expect("login body");
        body["token"].as_str().expect("token").to_string()
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base))
            .bearer_auth(token)
            .send()
            .await
            .expect("get")
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("post")
    }

    async fn patch(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .patch(format!("{}{path}", self.base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("patch")
    }

    async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{path}", self.base))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete")
    }
}

/// Poll `path` until `done` says the JSON body is what we are waiting for.
async fn poll_json<F>(server: &TestServer, path: &str, token: &str, done: F) -> Value
where
    F: Fn(&Value) -> bool,
{
    for _ in 0..80 {
        let body: Value = server.get(path, token).await.json().await.expect("json");
        if done(&body) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {path}");
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let server = TestServer::spawn().await;

    let res = server
        .client
        .get(format!("{}/api/contacts", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Authentication required");

    // A made-up token is just as dead.
    let res = server.get("/api/contacts", "not-a-session").await;
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn login_issues_a_working_session() {
    let server = TestServer::spawn().await;
    let token = server.login("u1").await;

    let res = server.get("/api/auth/user", &token).await;
    assert_eq!(res.status(), 200);

    let user: Value = res.json().await.unwrap();
    assert_eq!(user["id"], "u1");
    assert_eq!(user["email"], "u1@example.com");

    // Logout revokes the session.
    let res = server.post("/api/auth/logout", &token, json!({})).await;
    assert_eq!(res.status(), 200);
    let res = server.get("/api/auth/user", &token).await;
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn contact_crud_is_owner_scoped() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let mallory = server.login("mallory").await;

    // Create.
    let res = server
        .post(
            "/api/contacts",
            &alice,
            json!({ "name": "Bob", "phoneNumber": "+15550101" }),
        )
        .await;
    assert_eq!(res.status(), 201);
    let contact: Value = res.json().await.unwrap();
    let contact_id = contact["id"].as_str().unwrap().to_string();
    assert_eq!(contact["userId"], "alice");
    assert_eq!(contact["avatarUrl"], "https://example.com/avatar.png");
    assert_eq!(contact["status"], "online");

    // Listing is owner-scoped.
    let listed: Value = server.get("/api/contacts", &alice).await.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let listed: Value = server.get("/api/contacts", &mallory).await.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 0);

    // A non-owner PATCH is refused and changes nothing.
    let res = server
        .patch(
            &format!("/api/contacts/{contact_id}"),
            &mallory,
            json!({ "name": "Hacked" }),
        )
        .await;
    assert_eq!(res.status(), 403);
    let listed: Value = server.get("/api/contacts", &alice).await.json().await.unwrap();
    assert_eq!(listed[0]["name"], "Bob");

    // The owner can patch.
    let res = server
        .patch(
            &format!("/api/contacts/{contact_id}"),
            &alice,
            json!({ "name": "Robert", "status": "away" }),
        )
        .await;
    assert_eq!(res.status(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "Robert");
    assert_eq!(updated["status"], "away");
    assert_eq!(updated["phoneNumber"], "+15550101");

    // Delete, then delete again: the second call 404s at the HTTP layer.
    let res = server
        .delete(&format!("/api/contacts/{contact_id}"), &alice)
        .await;
    assert_eq!(res.status(), 200);
    let res = server
        .delete(&format!("/api/contacts/{contact_id}"), &alice)
        .await;
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn contact_creation_validates_required_fields() {
    let server = TestServer::spawn().await;
    let token = server.login("u1").await;

    for body in [json!({}), json!({ "name": "Bob" }), json!({ "name": "", "phoneNumber": "+1" })] {
        let res = server.post("/api/contacts", &token, body).await;
        assert_eq!(res.status(), 400);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Name and phone number are required");
    }
}

#[tokio::test]
async fn virtual_number_default_flow() {
    let server = TestServer::spawn().await;
    let token = server.login("u1").await;

    // First number becomes the default.
    let res = server
        .post(
            "/api/virtual-numbers",
            &token,
            json!({ "phoneNumber": "+15550100", "purpose": "Personal" }),
        )
        .await;
    assert_eq!(res.status(), 201);
    let first: Value = res.json().await.unwrap();
    assert_eq!(first["isDefault"], true);

    // Second does not steal it.
    let second: Value = server
        .post(
            "/api/virtual-numbers",
            &token,
            json!({ "phoneNumber": "+15550101", "purpose": "Business" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(second["isDefault"], false);

    // Until we ask it to.
    let res = server
        .post(
            &format!("/api/virtual-numbers/{}/set-default", second["id"].as_str().unwrap()),
            &token,
            json!({}),
        )
        .await;
    assert_eq!(res.status(), 200);

    let numbers: Value = server.get("/api/virtual-numbers", &token).await.json().await.unwrap();
    for number in numbers.as_array().unwrap() {
        assert_eq!(number["isDefault"], number["id"] == second["id"]);
    }

    // Someone else's number id is a 404, and nothing changes.
    let other = server.login("u2").await;
    let res = server
        .post(
            &format!("/api/virtual-numbers/{}/set-default", second["id"].as_str().unwrap()),
            &other,
            json!({}),
        )
        .await;
    assert_eq!(res.status(), 404);

    // Missing fields are a 400.
    let res = server
        .post("/api/virtual-numbers", &token, json!({ "phoneNumber": "+1" }))
        .await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn sending_a_message_triggers_a_simulated_reply() {
    let server = TestServer::spawn().await;
    let token = server.login("u1").await;

    let res = server
        .post(
            "/api/messages",
            &token,
            json!({ "text": "hi", "contactId": "c1" }),
        )
        .await;
    assert_eq!(res.status(), 201);

    let sent: Value = res.json().await.unwrap();
    assert_eq!(sent["conversationId"], "u1-c1");
    assert_eq!(sent["senderId"], "u1");
    assert_eq!(sent["receiverId"], "c1");
    assert_eq!(sent["sent"], true);
    assert_eq!(sent["read"], false);
    assert_eq!(sent["delivered"], false);
    assert_eq!(sent["messageType"], "text");

    // The reply lands without marking anything read: watch the unread count.
    let summary = poll_json(&server, "/api/messages/last/c1", &token, |body| {
        body["unreadCount"] == 1
    })
    .await;
    let reply = &summary["lastMessage"];
    assert_eq!(reply["senderId"], "c1");
    assert_eq!(reply["receiverId"], "u1");
    assert_eq!(reply["conversationId"], "u1-c1");
    assert!(REPLY_TEMPLATES.contains(&reply["text"].as_str().unwrap()));

    // Fetching the conversation returns both, ascending, and marks it read.
    let messages: Value = server
        .get("/api/messages?contactId=c1", &token)
        .await
        .json()
        .await
        .unwrap();
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["text"], "hi");
    assert_eq!(messages[1]["senderId"], "c1");

    let summary: Value = server
        .get("/api/messages/last/c1", &token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(summary["unreadCount"], 0);
}

#[tokio::test]
async fn message_listing_requires_contact_id() {
    let server = TestServer::spawn().await;
    let token = server.login("u1").await;

    let res = server.get("/api/messages", &token).await;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Contact ID is required");

    let res = server
        .post("/api/messages", &token, json!({ "contactId": "c1" }))
        .await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn image_payloads_derive_their_message_type() {
    let server = TestServer::spawn().await;
    let token = server.login("u1").await;

    let sent: Value = server
        .post(
            "/api/messages",
            &token,
            json!({ "text": "look", "contactId": "c1", "imageUrl": "https://cdn/img.png" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(sent["messageType"], "image");
    assert_eq!(sent["imageUrl"], "https://cdn/img.png");
}

#[tokio::test]
async fn reactions_set_overwrite_and_clear() {
    let server = TestServer::spawn().await;
    let token = server.login("u1").await;

    let sent: Value = server
        .post("/api/messages", &token, json!({ "text": "hi", "contactId": "c1" }))
        .await
        .json()
        .await
        .unwrap();
    let message_id = sent["id"].as_str().unwrap();

    let reacted: Value = server
        .post(
            "/api/messages/reaction",
            &token,
            json!({ "messageId": message_id, "reaction": "👍" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(reacted["reaction"], "👍");

    let reacted: Value = server
        .post(
            "/api/messages/reaction",
            &token,
            json!({ "messageId": message_id, "reaction": "❤️" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(reacted["reaction"], "❤️");

    // null clears (the toggle decision is the client's).
    let cleared: Value = server
        .post(
            "/api/messages/reaction",
            &token,
            json!({ "messageId": message_id, "reaction": null }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["reaction"], Value::Null);

    // Only participants may react.
    let outsider = server.login("mallory").await;
    let res = server
        .post(
            "/api/messages/reaction",
            &outsider,
            json!({ "messageId": message_id, "reaction": "👍" }),
        )
        .await;
    assert_eq!(res.status(), 403);

    let res = server
        .post(
            "/api/messages/reaction",
            &token,
            json!({ "messageId": "ghost", "reaction": "👍" }),
        )
        .await;
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn last_all_summarizes_every_contact() {
    let server = TestServer::spawn().await;
    let token = server.login("u1").await;

    let quiet: Value = server
        .post(
            "/api/contacts",
            &token,
            json!({ "name": "Quiet", "phoneNumber": "+15550102" }),
        )
        .await
        .json()
        .await
        .unwrap();
    let chatty: Value = server
        .post(
            "/api/contacts",
            &token,
            json!({ "name": "Chatty", "phoneNumber": "+15550103" }),
        )
        .await
        .json()
        .await
        .unwrap();
    let chatty_id = chatty["id"].as_str().unwrap();

    server
        .post(
            "/api/messages",
            &token,
            json!({ "text": "hi", "contactId": chatty_id }),
        )
        .await;

    // Wait until the simulated reply shows up in the summary map.
    let summaries = poll_json(&server, "/api/messages/last-all", &token, |body| {
        body[chatty_id]["unreadCount"] == 1
    })
    .await;

    assert_eq!(summaries[chatty_id]["lastMessage"]["senderId"], chatty_id);
    let quiet_id = quiet["id"].as_str().unwrap();
    assert_eq!(summaries[quiet_id]["unreadCount"], 0);
    assert_eq!(summaries[quiet_id]["lastMessage"], Value::Null);
}

#[tokio::test]
async fn profile_image_updates_the_session_user() {
    let server = TestServer::spawn().await;
    let token = server.login("u1").await;

    let res = server
        .patch("/api/user/profile-image", &token, json!({}))
        .await;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Profile image URL is required");

    let res = server
        .patch(
            "/api/user/profile-image",
            &token,
            json!({ "profileImageUrl": "https://cdn/me.png" }),
        )
        .await;
    assert_eq!(res.status(), 200);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["profileImageUrl"], "https://cdn/me.png");
}

#[tokio::test]
async fn health_endpoint_needs_no_session() {
    let server = TestServer::spawn().await;

    let res = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
