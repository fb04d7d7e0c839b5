//! Database row types. These map directly to SQLite rows; `From` impls lift
//! them into the shared `devlog-types` models.

use devlog_types::models::{Comment, CommunityPost, Post, Role};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub role: Role,
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub version: String,
    pub text: String,
    pub date: String,
    pub tag: String,
    pub download_url: String,
}

pub struct CommunityPostRow {
    pub id: i64,
    pub username: String,
    pub content: String,
    pub date: String,
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub username: String,
    pub text: String,
    pub date: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            version: row.version,
            text: row.text,
            date: row.date,
            tag: row.tag,
            download_url: row.download_url,
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            username: row.username,
            text: row.text,
            date: row.date,
        }
    }
}

impl CommunityPostRow {
    pub fn with_comments(self, comments: Vec<CommentRow>) -> CommunityPost {
        CommunityPost {
            id: self.id,
            username: self.username,
            content: self.content,
            date: self.date,
            comments: comments.into_iter().map(Comment::from).collect(),
        }
    }
}
