//! The storage abstraction consumed by the HTTP layer.
//!
//! Callers are written against this trait, never a concrete backend, so a
//! persistent database can replace the in-memory store without touching a
//! single handler.  One instance is constructed at startup and injected;
//! there are no ambient singletons.

use crate::database::Database;
use crate::error::Result;
use crate::models::{
    Contact, ContactPatch, Message, NewVirtualNumber, UpsertUser, User, VirtualNumber,
};

pub trait Storage: Send + Sync {
    // -- Users --

    fn user(&self, id: &str) -> Result<Option<User>>;

    /// Insert-if-absent, else merge.  `created_at` is preserved for existing
    /// records; `updated_at` is always refreshed.
    fn upsert_user(&self, user: UpsertUser) -> Result<User>;

    /// Fails with [`crate::StoreError::NotFound`] if the user is absent.
    fn update_profile_image(&self, user_id: &str, url: &str) -> Result<User>;

    // -- Virtual numbers --

    /// Unordered.
    fn virtual_numbers_for_user(&self, user_id: &str) -> Result<Vec<VirtualNumber>>;

    /// The default flag is computed here, atomically with the insert: the
    /// first number a user creates is the default, later ones are not.
    fn create_virtual_number(&self, number: NewVirtualNumber) -> Result<VirtualNumber>;

    /// Make `number_id` the owner's sole default.  Fails with
    /// [`crate::StoreError::NotFound`] when the number does not belong to
    /// `user_id`, leaving every flag untouched.
    fn set_default_virtual_number(&self, user_id: &str, number_id: &str) -> Result<()>;

    // -- Contacts --

    /// Unordered.
    fn contacts_for_user(&self, user_id: &str) -> Result<Vec<Contact>>;

    fn contact(&self, id: &str) -> Result<Option<Contact>>;

    fn create_contact(&self, contact: Contact) -> Result<Contact>;

    /// Fails with [`crate::StoreError::NotFound`] if the contact is absent.
    fn update_contact(&self, id: &str, patch: ContactPatch) -> Result<Contact>;

    /// Idempotent: deleting an absent id is a no-op.
    fn delete_contact(&self, id: &str) -> Result<()>;

    // -- Messages --

    /// All messages in the `{user_id}-{contact_id}` conversation, ascending
    /// by timestamp; ties keep insertion order.
    fn messages_for_contact(&self, user_id: &str, contact_id: &str) -> Result<Vec<Message>>;

    fn last_message_for_contact(&self, user_id: &str, contact_id: &str)
        -> Result<Option<Message>>;

    /// Messages in the conversation addressed to `user_id` and not yet read.
    fn unread_count(&self, user_id: &str, contact_id: &str) -> Result<u64>;

    fn create_message(&self, message: Message) -> Result<Message>;

    /// Flip `read` on every unread message in the conversation addressed to
    /// `user_id`.  Idempotent; never flips a flag back.
    fn mark_messages_read(&self, user_id: &str, contact_id: &str) -> Result<()>;

    fn message(&self, id: &str) -> Result<Option<Message>>;

    /// Overwrite (or with `None`, clear) the reaction on a message.  The
    /// toggle-to-clear decision belongs to the caller, not the store.
    fn set_message_reaction(&self, message_id: &str, reaction: Option<&str>) -> Result<Message>;
}

impl Storage for Database {
    fn user(&self, id: &str) -> Result<Option<User>> {
        Database::user(self, id)
    }

    fn upsert_user(&self, user: UpsertUser) -> Result<User> {
        Database::upsert_user(self, user)
    }

    fn update_profile_image(&self, user_id: &str, url: &str) -> Result<User> {
        Database::update_profile_image(self, user_id, url)
    }

    fn virtual_numbers_for_user(&self, user_id: &str) -> Result<Vec<VirtualNumber>> {
        Database::virtual_numbers_for_user(self, user_id)
    }

    fn create_virtual_number(&self, number: NewVirtualNumber) -> Result<VirtualNumber> {
        Database::create_virtual_number(self, number)
    }

    fn set_default_virtual_number(&self, user_id: &str, number_id: &str) -> Result<()> {
        Database::set_default_virtual_number(self, user_id, number_id)
    }

    fn contacts_for_user(&self, user_id: &str) -> Result<Vec<Contact>> {
        Database::contacts_for_user(self, user_id)
    }

    fn contact(&self, id: &str) -> Result<Option<Contact>> {
        Database::contact(self, id)
    }

    fn create_contact(&self, contact: Contact) -> Result<Contact> {
        Database::create_contact(self, contact)
    }

    fn update_contact(&self, id: &str, patch: ContactPatch) -> Result<Contact> {
        Database::update_contact(self, id, patch)
    }

    fn delete_contact(&self, id: &str) -> Result<()> {
        Database::delete_contact(self, id)
    }

    fn messages_for_contact(&self, user_id: &str, contact_id: &str) -> Result<Vec<Message>> {
        Database::messages_for_contact(self, user_id, contact_id)
    }

    fn last_message_for_contact(
        &self,
        user_id: &str,
        contact_id: &str,
    ) -> Result<Option<Message>> {
        Database::last_message_for_contact(self, user_id, contact_id)
    }

    fn unread_count(&self, user_id: &str, contact_id: &str) -> Result<u64> {
        Database::unread_count(self, user_id, contact_id)
    }

    fn create_message(&self, message: Message) -> Result<Message> {
        Database::create_message(self, message)
    }

    fn mark_messages_read(&self, user_id: &str, contact_id: &str) -> Result<()> {
        Database::mark_messages_read(self, user_id, contact_id)
    }

    fn message(&self, id: &str) -> Result<Option<Message>> {
        Database::message(self, id)
    }

    fn set_message_reaction(&self, message_id: &str, reaction: Option<&str>) -> Result<Message> {
        Database::set_message_reaction(self, message_id, reaction)
    }
}
