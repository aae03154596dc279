//! UI translation route handlers.

#![allow(clippy::used_underscore_binding)]

use std::collections::BTreeMap;

use axum::{
    Router,
    extract::State,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use olfong_core::{Locale, TranslationId};

use crate::db::TranslationRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Translation;
use crate::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validation::required;

use super::not_found;

const NOT_FOUND: &str = "Translation not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/search", get(search))
        .route("/key/{key}", get(show_by_key))
        .route("/{id}", put(update).delete(destroy))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    List,
    Map,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub format: Format,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Deserialize)]
pub struct TranslationInput {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Deserialize)]
pub struct TranslationValue {
    pub value: String,
}

/// Either the rows or a flat `{key: value}` object for the i18n loader.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Translations {
    List(Vec<Translation>),
    Map(BTreeMap<String, String>),
}

impl Translations {
    fn new(rows: Vec<Translation>, format: Format) -> Self {
        match format {
            Format::List => Self::List(rows),
            Format::Map => Self::Map(rows.into_iter().map(|t| (t.key, t.value)).collect()),
        }
    }
}

#[instrument(skip(state))]
async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Translations> {
    let rows = TranslationRepository::new(state.pool())
        .list(query.locale)
        .await?;
    Ok(ApiResponse::ok(Translations::new(rows, query.format)))
}

#[instrument(skip(state))]
async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<Translation>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::BadRequest("Search query is required".to_string()));
    }
    let rows = TranslationRepository::new(state.pool())
        .search(q, query.locale)
        .await?;
    Ok(ApiResponse::ok(rows))
}

#[instrument(skip(state))]
async fn show_by_key(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
    ApiQuery(query): ApiQuery<LocaleQuery>,
) -> ApiResult<Translation> {
    let translation = TranslationRepository::new(state.pool())
        .get_by_key(&key, query.locale)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(ApiResponse::ok(translation))
}

#[instrument(skip(state, _admin, input), fields(key = %input.key, locale = %input.locale.code()))]
async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<TranslationInput>,
) -> ApiResult<Translation> {
    required("Key", &input.key)?;
    required("Value", &input.value)?;
    let translation = TranslationRepository::new(state.pool())
        .create(input.key.trim(), &input.value, input.locale)
        .await?;
    Ok(ApiResponse::created(
        "Translation created successfully",
        translation,
    ))
}

#[instrument(skip(state, _admin, input))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TranslationId>,
    ApiJson(input): ApiJson<TranslationValue>,
) -> ApiResult<Translation> {
    required("Value", &input.value)?;
    let translation = TranslationRepository::new(state.pool())
        .update(id, &input.value)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::with_message(
        "Translation updated successfully",
        translation,
    ))
}

#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TranslationId>,
) -> ApiResult<()> {
    TranslationRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found(e, NOT_FOUND))?;
    Ok(ApiResponse::message("Translation deleted successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn row(id: i32, key: &str, value: &str) -> Translation {
        Translation {
            id: TranslationId::new(id),
            key: key.to_string(),
            locale: Locale::Is,
            value: value.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_map_format() {
        let rows = vec![row(1, "cart.title", "Karfa"), row(2, "nav.home", "Heim")];
        let json = serde_json::to_value(Translations::new(rows, Format::Map)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"cart.title": "Karfa", "nav.home": "Heim"})
        );
    }

    #[test]
    fn test_list_format() {
        let json =
            serde_json::to_value(Translations::new(vec![row(1, "a", "b")], Format::List)).unwrap();
        assert_eq!(json[0]["key"], "a");
        assert_eq!(json[0]["locale"], "is");
    }

    #[test]
    fn test_query_defaults_to_icelandic() {
        let query: ListQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(query.locale, Locale::Is);
        assert_eq!(query.format, Format::List);
    }
}
