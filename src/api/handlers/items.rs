use super::AppState;
use crate::api::models::{ItemForm, ItemListResponse};
use crate::auth::AuthUser;
use crate::core::error::Result;
use crate::db::models::Item;
use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Form, Json,
};

/// Where item mutations land afterwards
pub const INDEX_PATH: &str = "/api/index";

/// Handler for GET /api/index - List all items
pub async fn list_items(State(state): State<AppState>) -> Result<Json<ItemListResponse>> {
    let items = state.item_service.find_all().await?;
    let total = items.len();
    Ok(Json(ItemListResponse { items, total }))
}

/// Handler for GET /api/items/:id - Get a single item
pub async fn get_item(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Item>> {
    Ok(Json(state.item_service.find_by_id(id).await?))
}

/// Handler for GET /api/create - Blank item form
pub async fn create_page() -> Html<String> {
    Html(item_page("New item", "/api/create", None))
}

/// Handler for GET /api/edit/:id - Item form filled with the current values
pub async fn edit_page(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Html<String>> {
    let item = state.item_service.find_by_id(id).await?;
    let action = format!("/api/edit/{}", item.id);
    Ok(Html(item_page("Edit item", &action, Some(&item))))
}

/// Handler for POST /api/create - Create an item
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Form(form): Form<ItemForm>,
) -> Result<Redirect> {
    let item = state.item_service.create(form).await?;
    tracing::info!(account_id = user.id, item_id = item.id, "Item created by account");
    Ok(Redirect::to(INDEX_PATH))
}

/// Handler for POST /api/edit/:id - Update an item
pub async fn edit_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Form(form): Form<ItemForm>,
) -> Result<Redirect> {
    state.item_service.edit(id, form).await?;
    tracing::info!(account_id = user.id, item_id = id, "Item edited by account");
    Ok(Redirect::to(INDEX_PATH))
}

/// Handler for GET /api/delete/:id - Delete an item
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Redirect> {
    state.item_service.delete(id).await?;
    tracing::info!(account_id = user.id, item_id = id, "Item deleted by account");
    Ok(Redirect::to(INDEX_PATH))
}

fn item_page(title: &str, action: &str, item: Option<&Item>) -> String {
    let name = item.map(|i| escape_html(&i.name)).unwrap_or_default();
    let stock = item.map(|i| i.stock).unwrap_or(0);
    let price = item.map(|i| i.price).unwrap_or(0);

    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n\
         <h1>{title}</h1>\n\
         <form method=\"post\" action=\"{action}\">\n\
         <label>Name <input name=\"name\" value=\"{name}\" required></label>\n\
         <label>Stock <input name=\"stock\" type=\"number\" min=\"0\" value=\"{stock}\"></label>\n\
         <label>Price <input name=\"price\" type=\"number\" min=\"0\" value=\"{price}\"></label>\n\
         <button type=\"submit\">Save</button>\n\
         </form>\n</body>\n</html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
