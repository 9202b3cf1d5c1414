//! Simulated-reply scheduling.
//!
//! Every outgoing message queues a single-shot task that, after the
//! persona's delay, writes one canned counterpart reply into the same
//! conversation.  Tasks race a shutdown signal so teardown never leaves a
//! write pending against a dropped store, and [`Responder::shutdown`]
//! drains whatever is still in flight.

use std::sync::Arc;

use chrono::{Duration as TimeDelta, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use uuid::Uuid;

use ghostline_store::{Message, MessageKind, Storage};

use crate::persona::Persona;

pub struct Responder {
    store: Arc<dyn Storage>,
    persona: Arc<dyn Persona>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<JoinSet<()>>,
}

impl Responder {
    pub fn new(store: Arc<dyn Storage>, persona: Arc<dyn Persona>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            persona,
            shutdown,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Queue the simulated counterpart reply for an outgoing message.
    ///
    /// Best-effort: a failed store write is logged and swallowed; the
    /// request that created `outgoing` has already been answered.
    pub async fn schedule_reply(&self, outgoing: &Message) {
        if *self.shutdown.borrow() {
            return;
        }

        let delay = self.persona.reply_delay();
        let store = Arc::clone(&self.store);
        let persona = Arc::clone(&self.persona);
        let mut shutdown = self.shutdown.subscribe();
        let outgoing = outgoing.clone();

        let mut tasks = self.tasks.lock().await;
        // Reap tasks that already finished so the set does not grow without
        // bound on a long-lived process.
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let reply = Message {
                id: Uuid::new_v4().to_string(),
                conversation_id: outgoing.conversation_id.clone(),
                sender_id: outgoing.receiver_id.clone(),
                receiver_id: outgoing.sender_id.clone(),
                text: persona.reply_text(),
                image_url: None,
                audio_url: None,
                timestamp: Utc::now() + TimeDelta::seconds(1),
                read: false,
                sent: true,
                delivered: false,
                reaction: None,
                message_type: MessageKind::Text,
            };

            if let Err(error) = store.create_message(reply) {
                tracing::warn!(%error, "failed to write simulated reply");
            }
        });
    }

    /// Signal every pending reply task and wait for them to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }
}
