use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use ghostline_store::{
    conversation_id, Contact, ContactPatch, Message, MessageKind, NewVirtualNumber, Storage,
    UpsertUser, User, VirtualNumber,
};

use crate::auth::{bearer_token, AuthUser, SessionStore};
use crate::error::ApiError;
use crate::persona::Persona;
use crate::rate_limit::{throttle_middleware, RateLimiter};
use crate::responder::Responder;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub sessions: SessionStore,
    pub persona: Arc<dyn Persona>,
    pub responder: Arc<Responder>,
    pub limiter: RateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/user", get(current_user))
        .route("/api/user/profile-image", patch(update_profile_image))
        .route("/api/virtual-numbers", get(list_numbers).post(create_number))
        .route("/api/virtual-numbers/:id/set-default", post(set_default_number))
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route(
            "/api/contacts/:id",
            patch(update_contact).delete(delete_contact),
        )
        .route("/api/messages", get(list_messages).post(send_message))
        .route("/api/messages/last-all", get(last_messages_all))
        .route("/api/messages/last/:contact_id", get(last_message))
        .route("/api/messages/reaction", post(set_reaction))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            throttle_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    /// Stable subject id; a fresh one is minted when absent.
    id: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_image_url: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileImageRequest {
    profile_image_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateNumberRequest {
    phone_number: Option<String>,
    purpose: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateContactRequest {
    name: Option<String>,
    phone_number: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesQuery {
    contact_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    text: Option<String>,
    contact_id: Option<String>,
    image_url: Option<String>,
    audio_url: Option<String>,
    message_type: Option<MessageKind>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReactionRequest {
    message_id: Option<String>,
    /// `null` (or absent) clears the reaction; the toggle decision is the
    /// client's.
    reaction: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationSummary {
    last_message: Option<Message>,
    unread_count: u64,
}

/// Mirror of the original permissive contract: a required field is missing
/// when it is absent or empty.
fn required<'a>(field: &'a Option<String>, message: &str) -> Result<&'a str, ApiError> {
    match field.as_deref() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ApiError::BadRequest(message.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Health & auth
// ---------------------------------------------------------------------------

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user_id = req
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let user = state.store.upsert_user(UpsertUser {
        id: user_id,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        profile_image_url: req.profile_image_url,
    })?;

    let token = state.sessions.issue(&user.id).await;
    info!(user = %user.id, "session issued");

    Ok(Json(LoginResponse { token, user }))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token).await;
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = state
        .store
        .user(&user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

async fn update_profile_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<ProfileImageRequest>,
) -> Result<Json<User>, ApiError> {
    let url = required(&req.profile_image_url, "Profile image URL is required")?;

    let user = state
        .store
        .update_profile_image(&user_id, url)
        .map_err(|e| ApiError::or_not_found(e, "User not found"))?;
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// Virtual numbers
// ---------------------------------------------------------------------------

async fn list_numbers(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<VirtualNumber>>, ApiError> {
    Ok(Json(state.store.virtual_numbers_for_user(&user_id)?))
}

async fn create_number(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateNumberRequest>,
) -> Result<(StatusCode, Json<VirtualNumber>), ApiError> {
    let phone_number = required(&req.phone_number, "Phone number and purpose are required")?;
    let purpose = required(&req.purpose, "Phone number and purpose are required")?;

    let number = state.store.create_virtual_number(NewVirtualNumber {
        id: Uuid::new_v4().to_string(),
        user_id,
        phone_number: phone_number.to_string(),
        purpose: purpose.to_string(),
        created_at: Utc::now(),
    })?;

    Ok((StatusCode::CREATED, Json(number)))
}

async fn set_default_number(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store
        .set_default_virtual_number(&user_id, &id)
        .map_err(|e| ApiError::or_not_found(e, "Virtual number not found"))?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

async fn list_contacts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Contact>>, ApiError> {
    Ok(Json(state.store.contacts_for_user(&user_id)?))
}

async fn create_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let name = required(&req.name, "Name and phone number are required")?;
    let phone_number = required(&req.phone_number, "Name and phone number are required")?;

    let contact = state.store.create_contact(Contact {
        id: Uuid::new_v4().to_string(),
        user_id,
        name: name.to_string(),
        phone_number: phone_number.to_string(),
        avatar_url: Some(state.persona.avatar_url()),
        status: state.persona.presence(),
        created_at: Utc::now(),
    })?;

    Ok((StatusCode::CREATED, Json(contact)))
}

/// Load a contact and check the caller owns it.
fn owned_contact(
    store: &dyn Storage,
    id: &str,
    user_id: &str,
    action: &str,
) -> Result<Contact, ApiError> {
    let contact = store
        .contact(id)?
        .ok_or_else(|| ApiError::NotFound("Contact not found".to_string()))?;

    if contact.user_id != user_id {
        return Err(ApiError::Forbidden(format!(
            "Not authorized to {action} this contact"
        )));
    }
    Ok(contact)
}

async fn update_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<ContactPatch>,
) -> Result<Json<Contact>, ApiError> {
    owned_contact(state.store.as_ref(), &id, &user_id, "update")?;

    let contact = state.store.update_contact(&id, patch)?;
    Ok(Json(contact))
}

async fn delete_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    owned_contact(state.store.as_ref(), &id, &user_id, "delete")?;

    state.store.delete_contact(&id)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

async fn list_messages(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let contact_id = required(&query.contact_id, "Contact ID is required")?;

    let messages = state.store.messages_for_contact(&user_id, contact_id)?;
    // Viewing a conversation marks it read; the response still shows the
    // pre-marking flags.
    state.store.mark_messages_read(&user_id, contact_id)?;

    Ok(Json(messages))
}

async fn last_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(contact_id): Path<String>,
) -> Result<Json<ConversationSummary>, ApiError> {
    Ok(Json(ConversationSummary {
        last_message: state.store.last_message_for_contact(&user_id, &contact_id)?,
        unread_count: state.store.unread_count(&user_id, &contact_id)?,
    }))
}

async fn last_messages_all(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<HashMap<String, ConversationSummary>>, ApiError> {
    let mut summaries = HashMap::new();

    for contact in state.store.contacts_for_user(&user_id)? {
        let summary = ConversationSummary {
            last_message: state.store.last_message_for_contact(&user_id, &contact.id)?,
            unread_count: state.store.unread_count(&user_id, &contact.id)?,
        };
        summaries.insert(contact.id, summary);
    }

    Ok(Json(summaries))
}

async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let text = required(&req.text, "Text and contact ID are required")?;
    let contact_id = required(&req.contact_id, "Text and contact ID are required")?;

    let message_type = req.message_type.unwrap_or(if req.audio_url.is_some() {
        MessageKind::Audio
    } else if req.image_url.is_some() {
        MessageKind::Image
    } else {
        MessageKind::Text
    });

    let message = state.store.create_message(Message {
        id: Uuid::new_v4().to_string(),
        conversation_id: conversation_id(&user_id, contact_id),
        sender_id: user_id,
        receiver_id: contact_id.to_string(),
        text: text.to_string(),
        image_url: req.image_url,
        audio_url: req.audio_url,
        timestamp: Utc::now(),
        read: false,
        sent: true,
        delivered: false,
        reaction: None,
        message_type,
    })?;

    state.responder.schedule_reply(&message).await;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn set_reaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<ReactionRequest>,
) -> Result<Json<Message>, ApiError> {
    let message_id = required(&req.message_id, "Message ID is required")?;

    let message = state
        .store
        .message(message_id)?
        .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))?;

    if message.sender_id != user_id && message.receiver_id != user_id {
        return Err(ApiError::Forbidden(
            "Not authorized to react to this message".to_string(),
        ));
    }

    let updated = state
        .store
        .set_message_reaction(message_id, req.reaction.as_deref())?;
    Ok(Json(updated))
}

// ---------------------------------------------------------------------------
// Serving
// ---------------------------------------------------------------------------

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
