use anyhow::Result;
use tracing::debug;

use devlog_db::Database;
use devlog_types::clock;
use devlog_types::events::{CommentBroadcast, RealtimeEvent, SendComment};

use crate::dispatcher::Dispatcher;

/// Store a live comment and fan it out to every connection, the sender's
/// included.
///
/// Comments with an empty handle or empty text are dropped without a reply;
/// `Ok(None)` reports that nothing was stored.
pub fn submit_comment(
    db: &Database,
    dispatcher: &Dispatcher,
    cmd: SendComment,
) -> Result<Option<CommentBroadcast>> {
    if cmd.username.trim().is_empty() || cmd.text.trim().is_empty() {
        debug!("Dropping empty comment for post {}", cmd.post_id);
        return Ok(None);
    }

    let date = clock::time_of_day(&clock::now());
    let row = db.insert_comment(cmd.post_id, &cmd.username, &cmd.text, &date)?;

    let comment = CommentBroadcast {
        post_id: row.post_id,
        username: row.username,
        text: row.text,
        date: row.date,
    };
    dispatcher.broadcast(RealtimeEvent::ReceiveComment(comment.clone()));

    Ok(Some(comment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_count(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?))
            .unwrap()
    }

    fn send(post_id: i64, username: &str, text: &str) -> SendComment {
        SendComment {
            post_id,
            username: username.into(),
            text: text.into(),
        }
    }

    #[test]
    fn valid_comment_is_stored_and_reaches_everyone() {
        let db = Database::open_in_memory().unwrap();
        let dispatcher = Dispatcher::new();
        let thread = db.insert_community_post("mira", "Export bug", "3/9/2026, 4:05:09 PM").unwrap();
        let mut sender = dispatcher.subscribe();
        let mut peer = dispatcher.subscribe();

        let stored = submit_comment(&db, &dispatcher, send(thread.id, "ola", "nice release"))
            .unwrap()
            .unwrap();
        assert_eq!(stored.post_id, thread.id);
        assert!(!stored.date.is_empty());

        assert_eq!(comment_count(&db), 1);
        let threads = db.list_community_posts().unwrap();
        assert_eq!(threads[0].comments.len(), 1);
        assert_eq!(threads[0].comments[0].username, "ola");
        assert_eq!(threads[0].comments[0].text, "nice release");

        for rx in [&mut sender, &mut peer] {
            match rx.try_recv().unwrap() {
                RealtimeEvent::ReceiveComment(c) => assert_eq!(c, stored),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn empty_handle_or_text_is_dropped() {
        let db = Database::open_in_memory().unwrap();
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        assert!(submit_comment(&db, &dispatcher, send(1, "", "text")).unwrap().is_none());
        assert!(submit_comment(&db, &dispatcher, send(1, "ola", "")).unwrap().is_none());
        assert!(submit_comment(&db, &dispatcher, send(1, "ola", "   ")).unwrap().is_none());

        assert_eq!(comment_count(&db), 0);
        assert!(rx.try_recv().is_err());
    }
}
