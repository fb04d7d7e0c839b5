use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, types::Type};

use devlog_types::models::{CommunityPost, RELEASE_TAG, Role};

use crate::Database;
use crate::models::{CommentRow, CommunityPostRow, PostRow, UserRow};

impl Database {
    // -- Users --

    /// Fails on a taken username (UNIQUE constraint) as well as on any other
    /// store error; callers cannot tell the two apart.
    pub fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, role) VALUES (?1, ?2, ?3)",
                (username, password_hash, role.as_str()),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, password, role FROM users WHERE username = ?1",
                    [username],
                    map_user,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Release posts --

    pub fn insert_post(
        &self,
        title: &str,
        version: &str,
        text: &str,
        date: &str,
        download_url: &str,
    ) -> Result<PostRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (title, version, text, date, tag, downloadUrl)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![title, version, text, date, RELEASE_TAG, download_url],
            )?;

            Ok(PostRow {
                id: conn.last_insert_rowid(),
                title: title.to_string(),
                version: version.to_string(),
                text: text.to_string(),
                date: date.to_string(),
                tag: RELEASE_TAG.to_string(),
                download_url: download_url.to_string(),
            })
        })
    }

    /// Every post, newest first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, version, text, date, tag, downloadUrl
                 FROM posts
                 ORDER BY id DESC",
            )?;

            let rows = stmt
                .query_map([], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn latest_post(&self) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, title, version, text, date, tag, downloadUrl
                     FROM posts
                     ORDER BY id DESC
                     LIMIT 1",
                    [],
                    map_post,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Community --

    pub fn insert_community_post(
        &self,
        username: &str,
        content: &str,
        date: &str,
    ) -> Result<CommunityPostRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO community_posts (username, content, date) VALUES (?1, ?2, ?3)",
                (username, content, date),
            )?;

            Ok(CommunityPostRow {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                content: content.to_string(),
                date: date.to_string(),
            })
        })
    }

    /// The target post is not checked; comments on unknown ids are stored as-is.
    pub fn insert_comment(
        &self,
        post_id: i64,
        username: &str,
        text: &str,
        date: &str,
    ) -> Result<CommentRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, username, text, date) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![post_id, username, text, date],
            )?;

            Ok(CommentRow {
                id: conn.last_insert_rowid(),
                post_id,
                username: username.to_string(),
                text: text.to_string(),
                date: date.to_string(),
            })
        })
    }

    /// Every community post, newest first, each with its comments oldest first.
    pub fn list_community_posts(&self) -> Result<Vec<CommunityPost>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, content, date
                 FROM community_posts
                 ORDER BY id DESC",
            )?;
            let posts = stmt
                .query_map([], |row| {
                    Ok(CommunityPostRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        content: row.get(2)?,
                        date: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
            let mut by_post: HashMap<i64, Vec<CommentRow>> = HashMap::new();
            for comment in query_comments_for_posts(conn, &post_ids)? {
                by_post.entry(comment.post_id).or_default().push(comment);
            }

            Ok(posts
                .into_iter()
                .map(|post| {
                    let comments = by_post.remove(&post.id).unwrap_or_default();
                    post.with_comments(comments)
                })
                .collect())
        })
    }
}

/// Batch-fetch comments for a set of community post ids, oldest first.
fn query_comments_for_posts(conn: &Connection, post_ids: &[i64]) -> Result<Vec<CommentRow>> {
    if post_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT id, post_id, username, text, date FROM comments
         WHERE post_id IN ({})
         ORDER BY id ASC",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(post_ids.iter()), |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                post_id: row.get(1)?,
                username: row.get(2)?,
                text: row.get(3)?,
                date: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    let role: String = row.get(3)?;
    let role = role
        .parse::<Role>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;

    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        role,
    })
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        version: row.get(2)?,
        text: row.get(3)?,
        date: row.get(4)?,
        tag: row.get(5)?,
        download_url: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn count(db: &Database, sql: &str) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = db();
        db.create_user("ola", "hash-1", Role::User).unwrap();
        assert!(db.create_user("ola", "hash-2", Role::Admin).is_err());

        assert_eq!(count(&db, "SELECT COUNT(*) FROM users WHERE username = 'ola'"), 1);
        let user = db.get_user_by_username("ola").unwrap().unwrap();
        assert_eq!(user.password, "hash-1");
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn role_defaults_to_user() {
        let db = db();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password) VALUES ('plain', 'x')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let user = db.get_user_by_username("plain").unwrap().unwrap();
        assert_eq!(user.role, Role::User);
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn posts_are_listed_newest_first() {
        let db = db();
        assert!(db.latest_post().unwrap().is_none());

        db.insert_post("First", "1.0", "hello", "1/1/2026", "/uploads/a.zip").unwrap();
        let second = db
            .insert_post("Second", "1.1", "more", "1/2/2026", "/uploads/b.zip")
            .unwrap();
        assert_eq!(second.tag, RELEASE_TAG);

        let titles: Vec<String> = db.list_posts().unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["Second", "First"]);

        let latest = db.latest_post().unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.version, "1.1");
        assert_eq!(latest.download_url, "/uploads/b.zip");
    }

    #[test]
    fn comments_keep_insertion_order_per_post() {
        let db = db();
        let older = db.insert_community_post("ola", "first thread", "1/1/2026, 9:00:00 AM").unwrap();
        let newer = db.insert_community_post("mira", "second thread", "1/1/2026, 9:01:00 AM").unwrap();

        db.insert_comment(older.id, "mira", "C1", "9:02:00 AM").unwrap();
        db.insert_comment(newer.id, "ola", "other", "9:03:00 AM").unwrap();
        db.insert_comment(older.id, "ola", "C2", "9:04:00 AM").unwrap();

        let posts = db.list_community_posts().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, newer.id);
        assert_eq!(posts[1].id, older.id);

        let texts: Vec<&str> = posts[1].comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["C1", "C2"]);
        assert_eq!(posts[0].comments.len(), 1);
    }

    #[test]
    fn comment_on_unknown_post_is_stored() {
        let db = db();
        let row = db.insert_comment(404, "ola", "orphan", "1:00:00 PM").unwrap();
        assert_eq!(row.post_id, 404);

        let fetched = db
            .with_conn(|conn| query_comments_for_posts(conn, &[404]))
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].text, "orphan");

        // Not attached to any thread, so the community view never shows it
        assert!(db.list_community_posts().unwrap().is_empty());
        assert!(db.with_conn(|conn| query_comments_for_posts(conn, &[])).unwrap().is_empty());
    }
}
