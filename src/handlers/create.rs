use crate::error::{ApiError, ErrorResponse};
use crate::models::{next_item_id, Item};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// POST /items handler - Create an item with a server-assigned id
///
/// Any `id` in the payload is discarded. The new id is one past the largest
/// numeric id currently stored.
#[utoipa::path(
    post,
    path = routes::ITEMS,
    request_body = Item,
    responses(
        (status = 200, description = "Item created", body = Item),
        (status = 400, description = "Malformed JSON body"),
        (status = 422, description = "Body does not match the item shape"),
        (status = 500, description = "Storage error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_handler(
    State(state): State<AppState>,
    Json(mut item): Json<Item>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let _guard = state.store.lock().await;
    let mut items = state.store.load_for_update().await.items;

    let id = next_item_id(&items).ok_or(ApiError::IdExhausted)?;
    item.id = Some(id.clone());
    items.push(item.clone());

    state.store.write_all(&items).await?;

    tracing::info!("Created item with id: {}", id);
    Ok((StatusCode::OK, Json(item)))
}
