use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// A persisted inventory record
///
/// Decoding coerces the way loosely-typed clients expect: numeric ids become
/// strings, `price` and `quantity` accept numeric strings, and `quantity`
/// accepts integral floats such as `3.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Item {
    /// Server-assigned identifier; ignored on create, forced to the path id on replace
    #[serde(default, deserialize_with = "lenient_id")]
    #[schema(value_type = Option<String>)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_price")]
    #[schema(value_type = f64)]
    pub price: f64,
    #[serde(deserialize_with = "lenient_quantity")]
    #[schema(value_type = i64)]
    pub quantity: i64,
}

/// Partial update payload for PATCH requests
///
/// Each field records whether it was present in the request body. `description`
/// distinguishes an explicit `null` (clear it) from an omitted key (keep it); for the
/// required fields a `null` is treated the same as omission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, utoipa::ToSchema)]
pub struct ItemUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient_optional_price")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_quantity")]
    #[schema(value_type = Option<i64>)]
    pub quantity: Option<i64>,
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(id)) => Ok(Some(id)),
        Some(JsonValue::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "invalid id: expected a string or number, got {}",
            other
        ))),
    }
}

fn lenient_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    coerce_price(JsonValue::deserialize(deserializer)?).map_err(D::Error::custom)
}

fn lenient_quantity<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    coerce_quantity(JsonValue::deserialize(deserializer)?).map_err(D::Error::custom)
}

fn lenient_optional_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => coerce_price(value).map(Some).map_err(D::Error::custom),
    }
}

fn lenient_optional_quantity<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => coerce_quantity(value).map(Some).map_err(D::Error::custom),
    }
}

fn coerce_price(value: JsonValue) -> Result<f64, String> {
    let price = match &value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    // Non-finite prices can't be written back as JSON numbers.
    price
        .filter(|p| p.is_finite())
        .ok_or_else(|| format!("invalid price: expected a number, got {}", value))
}

fn coerce_quantity(value: JsonValue) -> Result<i64, String> {
    let quantity = match &value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    quantity.ok_or_else(|| format!("invalid quantity: expected an integer, got {}", value))
}

impl Item {
    /// Apply the fields supplied in `update`, leaving every other field untouched.
    pub fn merge(&mut self, update: ItemUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(quantity) = update.quantity {
            self.quantity = quantity;
        }
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}

/// Compute the id for a new item: one past the largest numeric id in `items`.
///
/// Ids that don't parse as base-10 integers are skipped. Returns `None` only when
/// the next id would overflow `i64`.
pub fn next_item_id(items: &[Item]) -> Option<String> {
    let max = items
        .iter()
        .filter_map(|item| {
            let id = item.id.as_deref()?;
            match id.parse::<i64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Skipping non-numeric id during id generation: {:?}", id);
                    None
                }
            }
        })
        .max()
        .unwrap_or(0);

    max.checked_add(1).map(|next| next.to_string())
}
