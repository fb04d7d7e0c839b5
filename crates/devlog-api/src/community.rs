use axum::{
    Extension, Form,
    extract::State,
    response::{Html, Redirect},
};
use tracing::info;

use devlog_types::api::CommunityPostForm;
use devlog_types::clock;
use devlog_types::events::RealtimeEvent;

use crate::AppState;
use crate::error::{ApiError, blocking};
use crate::session::{Identity, Session};
use crate::views;

/// GET /community — threads newest first, comments oldest first.
pub async fn community_page(
    State(state): State<AppState>,
    Session(identity): Session,
) -> Result<Html<String>, ApiError> {
    let db = state.db.clone();
    let posts = blocking(move || db.list_community_posts()).await?;

    Ok(views::community_page(&posts, identity.as_ref()))
}

/// POST /community/post
pub async fn create_community_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<CommunityPostForm>,
) -> Result<Redirect, ApiError> {
    if form.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Content is required".into()));
    }

    let date = clock::timestamp(&clock::now());
    let db = state.db.clone();
    let username = identity.username.clone();
    let row = blocking(move || db.insert_community_post(&username, &form.content, &date)).await?;

    info!("{} started community thread {}", identity.username, row.id);
    state
        .dispatcher
        .broadcast(RealtimeEvent::NewCommunityPost(row.with_comments(vec![])));

    Ok(Redirect::to("/community"))
}
