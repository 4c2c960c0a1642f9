//! Blog route handlers.
//!
//! Reading is public; the detail view counts a visit on the backend.
//! Authoring is for agents and admins. Agents manage their own posts,
//! admins manage everyone's, and both surfaces share the same handlers
//! parameterized by an edit scope. Author identity always comes from the
//! session.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use aegis_core::BlogId;

use crate::api::{Blog, BlogInput};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAgent};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Whose posts an authoring surface may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditScope {
    Own,
    All,
}

// =============================================================================
// Form Types
// =============================================================================

/// Blog authoring form. Author fields are filled from the session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogForm {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

// =============================================================================
// Public Reading
// =============================================================================

/// List all published articles.
///
/// GET /api/blogs
pub async fn list_blogs(State(state): State<AppState>) -> Result<Json<Vec<Blog>>> {
    let blogs = state.backend().get_blogs().await?;
    Ok(Json(blogs))
}

/// Read one article, counting the visit.
///
/// GET /api/blogs/{id}
///
/// # Errors
///
/// Returns 404 when no article has this id.
pub async fn read_blog(
    State(state): State<AppState>,
    Path(blog_id): Path<BlogId>,
) -> Result<Json<Blog>> {
    let blog = state.backend().visit_blog(&blog_id).await?;
    Ok(Json(blog))
}

// =============================================================================
// Agent Authoring
// =============================================================================

/// List the signed-in agent's own articles.
///
/// GET /api/agent/blogs
pub async fn agent_blogs(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
) -> Result<Json<Vec<Blog>>> {
    let blogs = state.backend().get_blogs().await?;
    let mine = blogs
        .into_iter()
        .filter(|blog| blog.author_email == agent.email)
        .collect();

    Ok(Json(mine))
}

/// Publish a new article as the signed-in agent.
///
/// POST /api/agent/blogs
pub async fn agent_create_blog(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
    Json(form): Json<BlogForm>,
) -> Result<Json<Blog>> {
    create_blog(&state, &agent, form).await
}

/// Fetch one article for editing, without counting a visit.
///
/// GET /api/agent/blogs/{id}
pub async fn agent_edit_blog(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
    Path(blog_id): Path<BlogId>,
) -> Result<Json<Blog>> {
    let blog = state.backend().get_blog(&blog_id).await?;
    ensure_editable(&blog, &agent, EditScope::Own)?;

    Ok(Json(blog))
}

/// Update the signed-in agent's own article.
///
/// PUT /api/agent/blogs/{id}
///
/// # Errors
///
/// Returns 403 when the article belongs to another author.
pub async fn agent_update_blog(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
    Path(blog_id): Path<BlogId>,
    Json(form): Json<BlogForm>,
) -> Result<Json<Blog>> {
    update_blog(&state, &agent, EditScope::Own, &blog_id, form).await
}

/// Delete the signed-in agent's own article.
///
/// DELETE /api/agent/blogs/{id}
///
/// # Errors
///
/// Returns 403 when the article belongs to another author.
pub async fn agent_delete_blog(
    RequireAgent(agent): RequireAgent,
    State(state): State<AppState>,
    Path(blog_id): Path<BlogId>,
) -> Result<Json<serde_json::Value>> {
    delete_blog(&state, &agent, EditScope::Own, &blog_id).await
}

// =============================================================================
// Admin Authoring
// =============================================================================

/// List every article regardless of author.
///
/// GET /api/admin/blogs
pub async fn admin_blogs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Blog>>> {
    let blogs = state.backend().get_blogs().await?;
    Ok(Json(blogs))
}

/// Publish a new article as the signed-in admin.
///
/// POST /api/admin/blogs
pub async fn admin_create_blog(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(form): Json<BlogForm>,
) -> Result<Json<Blog>> {
    create_blog(&state, &admin, form).await
}

/// Update any article.
///
/// PUT /api/admin/blogs/{id}
pub async fn admin_update_blog(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(blog_id): Path<BlogId>,
    Json(form): Json<BlogForm>,
) -> Result<Json<Blog>> {
    update_blog(&state, &admin, EditScope::All, &blog_id, form).await
}

/// Delete any article.
///
/// DELETE /api/admin/blogs/{id}
pub async fn admin_delete_blog(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(blog_id): Path<BlogId>,
) -> Result<Json<serde_json::Value>> {
    delete_blog(&state, &admin, EditScope::All, &blog_id).await
}

// =============================================================================
// Shared Authoring Logic
// =============================================================================

async fn create_blog(state: &AppState, author: &CurrentUser, form: BlogForm) -> Result<Json<Blog>> {
    let input = blog_input(author, validate_form(form)?);

    let blog = state
        .backend()
        .create_blog(&author.access_token, &input)
        .await?;

    tracing::info!(blog_id = %blog.id, author = %author.email, "Blog published");

    Ok(Json(blog))
}

async fn update_blog(
    state: &AppState,
    editor: &CurrentUser,
    scope: EditScope,
    blog_id: &BlogId,
    form: BlogForm,
) -> Result<Json<Blog>> {
    let existing = state.backend().get_blog(blog_id).await?;
    ensure_editable(&existing, editor, scope)?;

    // Authorship survives an admin edit.
    let form = validate_form(form)?;
    let input = BlogInput {
        title: form.title,
        content: form.content,
        author_name: existing.author_name,
        author_email: existing.author_email,
        author_photo_url: existing.author_photo_url,
        image_url: form.image_url.or(existing.image_url),
    };

    let blog = state
        .backend()
        .update_blog(&editor.access_token, blog_id, &input)
        .await?;

    Ok(Json(blog))
}

async fn delete_blog(
    state: &AppState,
    editor: &CurrentUser,
    scope: EditScope,
    blog_id: &BlogId,
) -> Result<Json<serde_json::Value>> {
    let existing = state.backend().get_blog(blog_id).await?;
    ensure_editable(&existing, editor, scope)?;

    state
        .backend()
        .delete_blog(&editor.access_token, blog_id)
        .await?;

    tracing::info!(blog_id = %blog_id, editor = %editor.email, "Blog deleted");

    Ok(Json(serde_json::json!({ "success": true })))
}

fn blog_input(author: &CurrentUser, form: BlogForm) -> BlogInput {
    BlogInput {
        title: form.title,
        content: form.content,
        author_name: author.name.clone(),
        author_email: author.email.clone(),
        author_photo_url: author.photo_url.clone(),
        image_url: form.image_url,
    }
}

fn validate_form(form: BlogForm) -> Result<BlogForm> {
    if form.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if form.content.trim().is_empty() {
        return Err(AppError::Validation("Content is required".to_string()));
    }
    Ok(form)
}

fn ensure_editable(blog: &Blog, editor: &CurrentUser, scope: EditScope) -> Result<()> {
    if scope == EditScope::Own && blog.author_email != editor.email {
        tracing::warn!(
            blog_id = %blog.id,
            editor = %editor.email,
            author = %blog.author_email,
            "Edit refused for another author's article"
        );
        return Err(AppError::Forbidden(
            "This article belongs to another author".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use aegis_core::Email;

    use super::*;

    fn author(email: &str) -> CurrentUser {
        CurrentUser {
            name: "Nadia Rahman".to_string(),
            email: Email::parse(email).unwrap(),
            photo_url: Some("https://img.example/nadia.png".to_string()),
            access_token: SecretString::from("tok-nadia".to_string()),
        }
    }

    fn article(author_email: &str) -> Blog {
        Blog {
            id: BlogId::new("b1"),
            title: "Reading your policy schedule".to_string(),
            content: "The schedule page lists...".to_string(),
            author_name: "Nadia Rahman".to_string(),
            author_email: Email::parse(author_email).unwrap(),
            author_photo_url: None,
            image_url: None,
            published_at: None,
            total_visits: 12,
        }
    }

    #[test]
    fn test_author_identity_comes_from_session() {
        let input = blog_input(
            &author("nadia@example.com"),
            BlogForm {
                title: "T".to_string(),
                content: "C".to_string(),
                image_url: None,
            },
        );
        assert_eq!(input.author_email.as_str(), "nadia@example.com");
        assert_eq!(input.author_name, "Nadia Rahman");
    }

    #[test]
    fn test_own_scope_refuses_other_authors() {
        let result = ensure_editable(
            &article("other@example.com"),
            &author("nadia@example.com"),
            EditScope::Own,
        );
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_all_scope_allows_other_authors() {
        assert!(
            ensure_editable(
                &article("other@example.com"),
                &author("nadia@example.com"),
                EditScope::All,
            )
            .is_ok()
        );
    }

    #[test]
    fn test_blank_title_rejected() {
        let result = validate_form(BlogForm {
            title: "  ".to_string(),
            content: "body".to_string(),
            image_url: None,
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
