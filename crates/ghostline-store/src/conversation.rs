//! Conversation addressing.
//!
//! A conversation key is the pair (owner, contact) joined with a literal
//! hyphen.  The key is asymmetric: messages filed under `a-b` are invisible
//! to queries for `b-a`.  The owner operand is always the user who initiated
//! the thread, and both directions of that thread are filed under the same
//! key, so every message query takes the owner's perspective.

/// Derive the key that scopes all message queries for one thread.
pub fn conversation_id(owner_id: &str, contact_id: &str) -> String {
    format!("{owner_id}-{contact_id}")
}
