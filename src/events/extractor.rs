//! LLM-backed extraction of event fields from page content.
//!
//! The model is asked for a bare JSON object with eleven fixed keys. Its
//! answer is untrusted: a direct decode is tried first, then the outermost
//! brace-delimited span, and anything else yields an all-empty record.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::events::record::{EventRecord, EventType};
use crate::llm::{LanguageModel, LlmError};
use crate::scraping::PageContent;

/// Field keys the model must return, in prompt order.
pub const FIELD_NAMES: [&str; 11] = [
    "Event Name",
    "Event Type",
    "Description",
    "Start Date",
    "End Date",
    "Year",
    "Location",
    "Speakers/Organizers",
    "Partners",
    "Participants Count",
    "Category",
];

/// Why an extraction produced no fields.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The language model call failed.
    #[error("language model failed: {0}")]
    Model(#[from] LlmError),
    /// The response held no decodable JSON object.
    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// Build the extraction prompt for one page.
#[must_use]
pub fn build_prompt(page: &PageContent, current_year: i32) -> String {
    let types = EventType::ALL
        .iter()
        .map(|kind| format!("\"{}\"", kind.ru_label()))
        .collect::<Vec<_>>()
        .join(", ");

    let year = current_year.to_string();
    let mut prompt = String::with_capacity(2048 + page.excerpt.len());

    prompt.push_str(
        "Ты — эксперт по анализу IT-мероприятий. Проанализируй текст страницы и верни ТОЛЬКО JSON-объект со следующими полями:\n",
    );
    prompt.push_str("- \"Event Name\": название мероприятия (строка)\n");
    prompt.push_str("- \"Event Type\": тип мероприятия, строго одно из: ");
    prompt.push_str(&types);
    prompt.push('\n');
    prompt.push_str("- \"Description\": краткое описание (не более 250 символов)\n");
    prompt.push_str("- \"Start Date\": дата начала в формате \"DD.MM.YYYY\", например \"25.12.");
    prompt.push_str(&year);
    prompt.push_str("\". Если год не указан, используй ");
    prompt.push_str(&year);
    prompt.push('\n');
    prompt.push_str(
        "- \"End Date\": дата окончания в формате \"DD.MM.YYYY\". Для однодневного мероприятия повтори Start Date\n",
    );
    prompt.push_str("- \"Year\": год проведения, например \"");
    prompt.push_str(&year);
    prompt.push_str("\"\n");
    prompt.push_str("- \"Location\": город или \"Онлайн\"\n");
    prompt.push_str(
        "- \"Speakers/Organizers\": ключевые спикеры или организаторы (не более 100 символов)\n",
    );
    prompt.push_str("- \"Partners\": партнёры и спонсоры (не более 100 символов)\n");
    prompt.push_str(
        "- \"Participants Count\": ожидаемое или фактическое число участников, например \"200+\"\n",
    );
    prompt.push_str(
        "- \"Category\": основные категории свободным текстом, например \"IT, Образование\"\n",
    );

    prompt.push_str("\nКонтекст:\nНазвание: ");
    prompt.push_str(&page.title);
    prompt.push_str("\nОписание: ");
    prompt.push_str(&page.description);
    prompt.push_str("\nСодержимое: ");
    prompt.push_str(&page.excerpt);
    prompt.push('\n');

    prompt.push_str("\nВАЖНО:\n");
    prompt.push_str("1. Верни ТОЛЬКО JSON без пояснений и без markdown\n");
    prompt.push_str("2. Все даты СТРОГО в формате \"DD.MM.YYYY\", никогда \"YYYY-MM-DD\"\n");
    prompt.push_str("3. Если значение поля неизвестно, оставь пустую строку");
    prompt
}

/// Decode the model answer into a JSON object.
///
/// # Errors
/// Returns [`ExtractionError::Malformed`] when neither the whole text nor its
/// outermost `{…}` span decodes to an object.
pub fn parse_llm_response(text: &str) -> Result<Map<String, Value>, ExtractionError> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(map);
    }

    let start = text.find('{');
    let end = text.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Ok(map);
            }
        }
    }

    let preview: String = text.chars().take(100).collect();
    Err(ExtractionError::Malformed(preview))
}

/// Read a field defensively: absent or non-scalar values are empty, text is trimmed.
fn field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Cut text to `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect::<String>().trim_end().to_string()
    }
}

/// Populate a record skeleton from decoded model fields.
#[must_use]
pub fn record_from_fields(
    source_url: &str,
    fields: &Map<String, Value>,
    description_max_chars: usize,
) -> EventRecord {
    EventRecord {
        year: field(fields, "Year"),
        start_date: field(fields, "Start Date"),
        end_date: field(fields, "End Date"),
        event_name: field(fields, "Event Name"),
        event_type: EventType::parse_label(&field(fields, "Event Type")),
        description: truncate_chars(&field(fields, "Description"), description_max_chars),
        participants_count: field(fields, "Participants Count"),
        speakers_organizers: field(fields, "Speakers/Organizers"),
        partners: field(fields, "Partners"),
        category: field(fields, "Category"),
        location: field(fields, "Location"),
        ..EventRecord::skeleton(source_url)
    }
}

/// Extracts event fields from page content through a language model.
pub struct FieldExtractor {
    model: Arc<dyn LanguageModel>,
    description_max_chars: usize,
}

impl FieldExtractor {
    /// Create an extractor over a language model.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, description_max_chars: usize) -> Self {
        Self {
            model,
            description_max_chars,
        }
    }

    /// Run the model over a page and decode its fields.
    ///
    /// # Errors
    /// Returns an error if the model call fails or its answer holds no JSON object.
    pub async fn try_extract(
        &self,
        page: &PageContent,
        current_year: i32,
    ) -> Result<EventRecord, ExtractionError> {
        let prompt = build_prompt(page, current_year);
        tracing::debug!("Sending request to {} for URL: {}", self.model.model_name(), page.url);

        let response = self.model.complete(&prompt).await?;
        let fields = parse_llm_response(&response)?;
        let missing = FIELD_NAMES
            .iter()
            .filter(|name| !fields.contains_key(**name))
            .count();
        if missing > 0 {
            tracing::debug!("Model answer for {} lacks {missing} of {} fields", page.url, FIELD_NAMES.len());
        }
        Ok(record_from_fields(&page.url, &fields, self.description_max_chars))
    }

    /// Run the model over a page; any failure yields an empty record for the page.
    pub async fn extract(&self, page: &PageContent, current_year: i32) -> EventRecord {
        match self.try_extract(page, current_year).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Field extraction failed for {}: {e}", page.url);
                EventRecord::skeleton(page.url.clone())
            }
        }
    }
}
