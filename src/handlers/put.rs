use crate::error::{ApiError, ErrorResponse};
use crate::models::Item;
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, extract::Path, http::StatusCode, Json};

/// PUT /items/:id handler - Replace an existing item
///
/// The stored item keeps the path id regardless of any id in the payload.
#[utoipa::path(
    put,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item id")
    ),
    request_body = Item,
    responses(
        (status = 200, description = "Item replaced", body = Item),
        (status = 404, description = "Item not found", body = ErrorResponse),
        (status = 422, description = "Body does not match the item shape"),
        (status = 500, description = "Storage error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn put_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut item): Json<Item>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let _guard = state.store.lock().await;
    let mut items = state.store.load_for_update().await.items;

    let Some(slot) = items.iter_mut().find(|existing| existing.has_id(&id)) else {
        tracing::info!("Item not found with id: {}", id);
        return Err(ApiError::ItemNotFound(id));
    };
    item.id = Some(id.clone());
    *slot = item.clone();

    state.store.write_all(&items).await?;

    tracing::info!("Replaced item with id: {}", id);
    Ok((StatusCode::OK, Json(item)))
}
