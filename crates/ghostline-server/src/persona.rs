//! Policy hooks for the simulated counterpart.
//!
//! Avatar, presence, and reply selection are presentation conveniences, not
//! core semantics.  They sit behind the [`Persona`] trait so the server can
//! take an injected implementation and tests can substitute a scripted one.

use std::time::Duration;

use ghostline_store::Presence;
use rand::Rng;

/// Fixed avatar pool assigned to new contacts.
pub const AVATAR_URLS: [&str; 6] = [
    "https://images.unsplash.com/photo-1500648767791-00dcc994a43e?ixlib=rb-4.0.3&auto=format&fit=crop&w=150&h=150",
    "https://images.unsplash.com/photo-1573496359142-b8d87734a5a2?ixlib=rb-4.0.3&auto=format&fit=crop&w=150&h=150",
    "https://images.unsplash.com/photo-1539571696357-5a69c17a67c6?ixlib=rb-4.0.3&auto=format&fit=crop&w=150&h=150",
    "https://images.unsplash.com/photo-1534751516642-a1af1ef26a56?ixlib=rb-4.0.3&auto=format&fit=crop&w=150&h=150",
    "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?ixlib=rb-4.0.3&auto=format&fit=crop&w=150&h=150",
    "https://images.unsplash.com/photo-1494790108377-be9c29b29330?ixlib=rb-4.0.3&auto=format&fit=crop&w=150&h=150",
];

/// Canned texts used for simulated replies.
pub const REPLY_TEMPLATES: [&str; 10] = [
    "Got it, thanks!",
    "Sounds good to me.",
    "I'll get back to you on that.",
    "Thanks for letting me know.",
    "Perfect, that works for me.",
    "I appreciate the update.",
    "Let me think about it.",
    "I'll check my schedule and confirm.",
    "Great! Looking forward to it.",
    "That's interesting. Tell me more.",
];

const PRESENCE_POOL: [Presence; 3] = [Presence::Online, Presence::Offline, Presence::Away];

pub trait Persona: Send + Sync {
    /// Avatar assigned to a newly created contact.
    fn avatar_url(&self) -> String;

    /// Presence assigned to a newly created contact.
    fn presence(&self) -> Presence;

    /// Text of the next simulated reply.
    fn reply_text(&self) -> String;

    /// How long to wait before the simulated reply is written.
    fn reply_delay(&self) -> Duration;
}

/// Production persona backed by the thread-local RNG.
pub struct RandomPersona;

impl Persona for RandomPersona {
    fn avatar_url(&self) -> String {
        let mut rng = rand::thread_rng();
        AVATAR_URLS[rng.gen_range(0..AVATAR_URLS.len())].to_string()
    }

    fn presence(&self) -> Presence {
        let mut rng = rand::thread_rng();
        PRESENCE_POOL[rng.gen_range(0..PRESENCE_POOL.len())]
    }

    fn reply_text(&self) -> String {
        let mut rng = rand::thread_rng();
        REPLY_TEMPLATES[rng.gen_range(0..REPLY_TEMPLATES.len())].to_string()
    }

    fn reply_delay(&self) -> Duration {
        // Uniform in [1s, 3s).
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(1000..3000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_stay_inside_the_pools() {
        let persona = RandomPersona;

        for _ in 0..100 {
            assert!(AVATAR_URLS.contains(&persona.avatar_url().as_str()));
            assert!(REPLY_TEMPLATES.contains(&persona.reply_text().as_str()));
            assert!(PRESENCE_POOL.contains(&persona.presence()));
        }
    }

    #[test]
    fn reply_delay_is_one_to_three_seconds() {
        let persona = RandomPersona;

        for _ in 0..100 {
            let delay = persona.reply_delay();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay < Duration::from_millis(3000));
        }
    }
}
