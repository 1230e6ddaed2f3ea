//! tb-core
//!
//! The thread/reply model of threadboard, the ports its plugins implement,
//! and the two services the transport calls into.

pub mod error;
pub mod models;
pub mod reply_engine;
pub mod thread_store;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use reply_engine::ReplyEngine;
pub use thread_store::{ThreadStore, SUCCESS};
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use chrono::{Duration, Utc};

    fn reply_at(text: &str, at: chrono::DateTime<Utc>) -> Reply {
        Reply::new(text, format!("hash-{text}"), at)
    }

    #[test]
    fn accepted_replies_stay_newest_first() {
        let t0 = Utc::now();
        let mut thread = Thread::new("qa", "hello", "h".into(), t0);

        thread.accept_reply(reply_at("first", t0 + Duration::seconds(1)), t0);
        thread.accept_reply(reply_at("old", t0), t0);
        thread.accept_reply(reply_at("last", t0 + Duration::seconds(5)), t0);

        let texts: Vec<_> = thread.replies.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["last", "first", "old"]);
        assert_eq!(thread.reply_count, 3);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let t0 = Utc::now();
        let mut thread = Thread::new("qa", "hello", "h".into(), t0);
        thread.accept_reply(reply_at("a", t0), t0);
        thread.accept_reply(reply_at("b", t0), t0);

        assert_eq!(thread.replies[0].text, "a");
        assert_eq!(thread.replies[1].text, "b");
    }

    #[test]
    fn bump_always_moves_forward() {
        let t0 = Utc::now();
        let mut thread = Thread::new("qa", "hello", "h".into(), t0);
        assert_eq!(thread.bumped_on, thread.created_on);

        // A clock reading equal to (or behind) the last bump still advances it.
        thread.accept_reply(reply_at("a", t0), t0);
        let first = thread.bumped_on;
        assert!(first > thread.created_on);

        thread.accept_reply(reply_at("b", t0), t0 - Duration::seconds(1));
        assert!(thread.bumped_on > first);
    }

    #[test]
    fn redaction_keeps_the_record() {
        let t0 = Utc::now();
        let mut reply = reply_at("hi", t0);
        reply.reported = true;
        let id = reply.id;

        reply.redact();
        assert_eq!(reply.text, REDACTED_TEXT);
        assert_eq!(reply.id, id);
        assert_eq!(reply.created_on, t0);
        assert!(reply.reported);
    }

    #[test]
    fn listing_view_truncates_replies() {
        let t0 = Utc::now();
        let mut thread = Thread::new("qa", "hello", "h".into(), t0);
        for i in 0..5 {
            thread.accept_reply(reply_at(&i.to_string(), t0 + Duration::seconds(i)), t0);
        }
        let view = thread.with_recent_replies(RECENT_REPLY_LIMIT);
        assert_eq!(view.replies.len(), 3);
        assert_eq!(view.replies[0].text, "4");
        assert_eq!(view.reply_count, 5);
    }

    #[test]
    fn password_hashes_are_never_serialized() {
        let t0 = Utc::now();
        let mut thread = Thread::new("qa", "hello", "thread-hash".into(), t0);
        thread.accept_reply(reply_at("hi", t0), t0);

        let json = serde_json::to_string(&thread).unwrap();
        assert!(!json.contains("hash"));
        assert!(json.contains("\"reply_count\":1"));
        assert!(json.contains("\"bumped_on\""));
    }
}
