//! UI strings per locale.

use chrono::{DateTime, Utc};
use serde::Serialize;

use olfong_core::{Locale, TranslationId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub id: TranslationId,
    pub key: String,
    pub locale: Locale,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
