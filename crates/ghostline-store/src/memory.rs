//! In-memory storage backend.
//!
//! The default backend for single-process deployments.  All four entity
//! tables live behind one `RwLock`, so every [`Storage`] operation is atomic
//! with respect to concurrent requests.  In particular the first-number
//! default selection in [`Storage::create_virtual_number`] cannot race.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::conversation::conversation_id;
use crate::error::{Result, StoreError};
use crate::models::{
    Contact, ContactPatch, Message, NewVirtualNumber, UpsertUser, User, VirtualNumber,
};
use crate::store::Storage;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    numbers: HashMap<String, VirtualNumber>,
    contacts: HashMap<String, Contact>,
    /// Messages keep insertion order so equal timestamps sort stably.
    messages: Vec<Message>,
}

pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemStore {
    fn user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn upsert_user(&self, user: UpsertUser) -> Result<User> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let created_at = tables
            .users
            .get(&user.id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        let record = User {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image_url: user.profile_image_url,
            created_at,
            updated_at: now,
        };
        tables.users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_profile_image(&self, user_id: &str, url: &str) -> Result<User> {
        let mut tables = self.write()?;
        let user = tables.users.get_mut(user_id).ok_or(StoreError::NotFound)?;
        user.profile_image_url = Some(url.to_string());
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    fn virtual_numbers_for_user(&self, user_id: &str) -> Result<Vec<VirtualNumber>> {
        Ok(self
            .read()?
            .numbers
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    fn create_virtual_number(&self, number: NewVirtualNumber) -> Result<VirtualNumber> {
        let mut tables = self.write()?;
        let is_default = !tables.numbers.values().any(|n| n.user_id == number.user_id);

        let record = VirtualNumber {
            id: number.id,
            user_id: number.user_id,
            phone_number: number.phone_number,
            purpose: number.purpose,
            is_default,
            created_at: number.created_at,
        };
        tables.numbers.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn set_default_virtual_number(&self, user_id: &str, number_id: &str) -> Result<()> {
        let mut tables = self.write()?;
        let owned = tables
            .numbers
            .values()
            .any(|n| n.id == number_id && n.user_id == user_id);
        if !owned {
            return Err(StoreError::NotFound);
        }

        for number in tables.numbers.values_mut().filter(|n| n.user_id == user_id) {
            number.is_default = number.id == number_id;
        }
        Ok(())
    }

    fn contacts_for_user(&self, user_id: &str) -> Result<Vec<Contact>> {
        Ok(self
            .read()?
            .contacts
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    fn contact(&self, id: &str) -> Result<Option<Contact>> {
        Ok(self.read()?.contacts.get(id).cloned())
    }

    fn create_contact(&self, contact: Contact) -> Result<Contact> {
        self.write()?
            .contacts
            .insert(contact.id.clone(), contact.clone());
        Ok(contact)
    }

    fn update_contact(&self, id: &str, patch: ContactPatch) -> Result<Contact> {
        let mut tables = self.write()?;
        let contact = tables.contacts.get_mut(id).ok_or(StoreError::NotFound)?;

        if let Some(name) = patch.name {
            contact.name = name;
        }
        if let Some(phone_number) = patch.phone_number {
            contact.phone_number = phone_number;
        }
        if let Some(avatar_url) = patch.avatar_url {
            contact.avatar_url = Some(avatar_url);
        }
        if let Some(status) = patch.status {
            contact.status = status;
        }
        Ok(contact.clone())
    }

    fn delete_contact(&self, id: &str) -> Result<()> {
        self.write()?.contacts.remove(id);
        Ok(())
    }

    fn messages_for_contact(&self, user_id: &str, contact_id: &str) -> Result<Vec<Message>> {
        let key = conversation_id(user_id, contact_id);
        let tables = self.read()?;

        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == key)
            .cloned()
            .collect();
        // Stable sort: equal timestamps keep insertion order.
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    fn last_message_for_contact(
        &self,
        user_id: &str,
        contact_id: &str,
    ) -> Result<Option<Message>> {
        Ok(self.messages_for_contact(user_id, contact_id)?.pop())
    }

    fn unread_count(&self, user_id: &str, contact_id: &str) -> Result<u64> {
        let key = conversation_id(user_id, contact_id);
        Ok(self
            .read()?
            .messages
            .iter()
            .filter(|m| m.conversation_id == key && m.receiver_id == user_id && !m.read)
            .count() as u64)
    }

    fn create_message(&self, message: Message) -> Result<Message> {
        self.write()?.messages.push(message.clone());
        Ok(message)
    }

    fn mark_messages_read(&self, user_id: &str, contact_id: &str) -> Result<()> {
        let key = conversation_id(user_id, contact_id);
        let mut tables = self.write()?;

        for message in tables
            .messages
            .iter_mut()
            .filter(|m| m.conversation_id == key && m.receiver_id == user_id && !m.read)
        {
            message.read = true;
        }
        Ok(())
    }

    fn message(&self, id: &str) -> Result<Option<Message>> {
        Ok(self.read()?.messages.iter().find(|m| m.id == id).cloned())
    }

    fn set_message_reaction(&self, message_id: &str, reaction: Option<&str>) -> Result<Message> {
        let mut tables = self.write()?;
        let message = tables
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(StoreError::NotFound)?;
        message.reaction = reaction.map(str::to_string);
        Ok(message.clone())
    }
}
