//! History entries as persisted and as sent to the history service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed translation.
///
/// Serialised in camelCase with the timestamp under `date`, matching the
/// web client's `translationHistory` documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    /// Milliseconds since the epoch at creation, bumped when needed so ids
    /// strictly increase within one store.
    pub id: i64,
    pub source_text: String,
    pub translated_text: String,
    /// Display label, e.g. "English".
    pub source_lang: String,
    pub target_lang: String,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub from_dashboard: bool,
    #[serde(default)]
    pub is_demo: bool,
}

/// Fields the caller supplies; id and timestamp are assigned on record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryItem {
    pub source_text: String,
    pub translated_text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub from_dashboard: bool,
    pub is_demo: bool,
}

impl NewHistoryItem {
    pub fn new(
        source_text: impl Into<String>,
        translated_text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            translated_text: translated_text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            from_dashboard: false,
            is_demo: false,
        }
    }

    pub fn from_dashboard(mut self, yes: bool) -> Self {
        self.from_dashboard = yes;
        self
    }

    pub fn demo(mut self, yes: bool) -> Self {
        self.is_demo = yes;
        self
    }

    pub(crate) fn into_item(self, id: i64, timestamp: DateTime<Utc>) -> HistoryItem {
        HistoryItem {
            id,
            source_text: self.source_text,
            translated_text: self.translated_text,
            source_lang: self.source_lang,
            target_lang: self.target_lang,
            timestamp,
            from_dashboard: self.from_dashboard,
            is_demo: self.is_demo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_like_the_web_client() {
        let ts = DateTime::parse_from_rfc3339("2024-04-07T10:23:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let item = NewHistoryItem::new("irrigation system", "mfumo wa kunyunyizia", "English", "Giriama")
            .from_dashboard(true)
            .into_item(1712485380000, ts);

        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["sourceText"], "irrigation system");
        assert_eq!(v["translatedText"], "mfumo wa kunyunyizia");
        assert_eq!(v["fromDashboard"], true);
        assert_eq!(v["isDemo"], false);
        assert!(v["date"].as_str().unwrap().starts_with("2024-04-07T10:23:00"));
    }

    #[test]
    fn missing_flags_default_to_false() {
        let item: HistoryItem = serde_json::from_str(
            r#"{"id":1,"sourceText":"a","translatedText":"b","sourceLang":"English",
                "targetLang":"Giriama","date":"2024-04-06T15:45:00.000Z"}"#,
        )
        .unwrap();
        assert!(!item.from_dashboard);
        assert!(!item.is_demo);
    }
}
