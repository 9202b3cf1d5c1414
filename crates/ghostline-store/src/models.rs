//! Domain model structs shared by every storage backend.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names so it can be handed directly to the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An account holder.  The id comes from the identity provider and is opaque
/// to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    /// Set on first insert and never changed afterwards.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every upsert and profile mutation.
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when inserting or merging a [`User`].  Timestamps are
/// managed by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUser {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// VirtualNumber
// ---------------------------------------------------------------------------

/// A phone number leased to a user.  At most one number per owner carries
/// `is_default = true`; the store maintains that invariant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNumber {
    pub id: String,
    pub user_id: String,
    pub phone_number: String,
    /// Free-form label: Personal, Business, Dating, ...
    pub purpose: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert form of [`VirtualNumber`].  `is_default` is decided by the store,
/// atomically with the insert: the first number a user creates becomes the
/// default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewVirtualNumber {
    pub id: String,
    pub user_id: String,
    pub phone_number: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// Presence indicator shown next to a contact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
    Away,
}

impl Presence {
    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Online => "online",
            Presence::Offline => "offline",
            Presence::Away => "away",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Presence::Online),
            "offline" => Some(Presence::Offline),
            "away" => Some(Presence::Away),
            _ => None,
        }
    }
}

/// An address-book entry.  Distinct contacts may share a phone number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub phone_number: String,
    pub avatar_url: Option<String>,
    pub status: Presence,
    pub created_at: DateTime<Utc>,
}

/// Partial update applied to an existing [`Contact`].  Absent fields keep
/// their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatch {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
    pub status: Option<Presence>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Payload classification for a message.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Audio,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "image" => Some(MessageKind::Image),
            "audio" => Some(MessageKind::Audio),
            _ => None,
        }
    }
}

/// A single chat message.
///
/// `conversation_id` is derived from the initiating user and the contact
/// (see [`crate::conversation`]); `read` is the only flag ever flipped after
/// creation, and `delivered` is carried for the UI but never set by any
/// store operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub sent: bool,
    pub delivered: bool,
    /// At most one emoji; a new value overwrites the old one.
    pub reaction: Option<String>,
    pub message_type: MessageKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_round_trip() {
        for p in [Presence::Online, Presence::Offline, Presence::Away] {
            assert_eq!(Presence::parse(p.as_str()), Some(p));
        }
        assert_eq!(Presence::parse("busy"), None);
    }

    #[test]
    fn message_kind_round_trip() {
        for k in [MessageKind::Text, MessageKind::Image, MessageKind::Audio] {
            assert_eq!(MessageKind::parse(k.as_str()), Some(k));
        }
        assert_eq!(MessageKind::parse("video"), None);
    }

    #[test]
    fn wire_names_are_camel_case() {
        let msg = Message {
            id: "m1".into(),
            conversation_id: "u1-c1".into(),
            sender_id: "u1".into(),
            receiver_id: "c1".into(),
            text: "hi".into(),
            image_url: None,
            audio_url: None,
            timestamp: Utc::now(),
            read: false,
            sent: true,
            delivered: false,
            reaction: None,
            message_type: MessageKind::Text,
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["conversationId"], "u1-c1");
        assert_eq!(json["messageType"], "text");
        assert_eq!(json["read"], false);
    }
}
