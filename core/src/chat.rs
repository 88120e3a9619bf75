// Canned chat replies
//
// The chat panel has no assistant behind it yet; every message gets one of a
// few acknowledgements.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const REPLIES: [&str; 4] = [
    "I've noted that down. Want me to take action?",
    "Understood. I'm tracking that for you.",
    "Got it! I'll include this in the next report.",
    "Interesting. I've logged this for analysis.",
];

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

pub fn reply<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> ChatReply {
    let response = REPLIES.choose(rng).copied().unwrap_or(REPLIES[0]);
    ChatReply {
        response: response.to_string(),
        timestamp: now,
    }
}
