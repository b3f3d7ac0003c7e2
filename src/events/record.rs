//! Canonical event record.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of event, independent of the language the page or model used.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Conference.
    Conference,
    /// Meetup.
    Meetup,
    /// Hackathon.
    Hackathon,
    /// Webinar.
    Webinar,
    /// Exhibition or expo.
    Exhibition,
    /// Festival.
    Festival,
    /// Any other event.
    Event,
}

impl EventType {
    /// All event types, in prompt order.
    pub const ALL: [Self; 7] = [
        Self::Conference,
        Self::Meetup,
        Self::Hackathon,
        Self::Webinar,
        Self::Exhibition,
        Self::Festival,
        Self::Event,
    ];

    /// English label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Conference => "Conference",
            Self::Meetup => "Meetup",
            Self::Hackathon => "Hackathon",
            Self::Webinar => "Webinar",
            Self::Exhibition => "Exhibition",
            Self::Festival => "Festival",
            Self::Event => "Event",
        }
    }

    /// Russian label, as requested from the model.
    #[must_use]
    pub const fn ru_label(self) -> &'static str {
        match self {
            Self::Conference => "Конференция",
            Self::Meetup => "Митап",
            Self::Hackathon => "Хакатон",
            Self::Webinar => "Вебинар",
            Self::Exhibition => "Выставка",
            Self::Festival => "Фестиваль",
            Self::Event => "Мероприятие",
        }
    }

    /// Stems recognised in Russian or English labels.
    const fn stems(self) -> &'static [&'static str] {
        match self {
            Self::Conference => &["конференц", "conference", "summit", "саммит", "форум", "forum"],
            Self::Meetup => &["митап", "meetup", "meet-up"],
            Self::Hackathon => &["хакатон", "hackathon"],
            Self::Webinar => &["вебинар", "webinar"],
            Self::Exhibition => &["выставк", "exhibition", "expo", "экспо"],
            Self::Festival => &["фестивал", "festival", "fest"],
            Self::Event => &["мероприят", "event"],
        }
    }

    /// Map a free-form label onto the fixed set.
    ///
    /// Empty input gives `None`; anything non-empty that matches no stem is an [`EventType::Event`].
    #[must_use]
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        let found = Self::ALL.into_iter().find(|kind| {
            kind.stems()
                .iter()
                .any(|stem| normalized.contains(stem))
        });
        Some(found.unwrap_or(Self::Event))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One discovered event.
///
/// Every text field is empty when unknown. Field names on the wire match the
/// keys the extraction prompt asks the model for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    /// Year of the event.
    #[serde(rename = "Year")]
    pub year: String,
    /// Start date, `DD.MM.YYYY` once normalized.
    #[serde(rename = "Start Date")]
    pub start_date: String,
    /// End date, `DD.MM.YYYY` once normalized.
    #[serde(rename = "End Date")]
    pub end_date: String,
    /// Event name.
    #[serde(rename = "Event Name")]
    pub event_name: String,
    /// Event type, serialized as its English label (empty when unknown).
    #[serde(rename = "Event Type", with = "event_type_label")]
    pub event_type: Option<EventType>,
    /// Short description.
    #[serde(rename = "Description")]
    pub description: String,
    /// Expected or actual number of participants.
    #[serde(rename = "Participants Count")]
    pub participants_count: String,
    /// Key speakers or organizers.
    #[serde(rename = "Speakers/Organizers")]
    pub speakers_organizers: String,
    /// Partners and sponsors.
    #[serde(rename = "Partners")]
    pub partners: String,
    /// Free-text categories.
    #[serde(rename = "Category")]
    pub category: String,
    /// City or "online".
    #[serde(rename = "Location")]
    pub location: String,
    /// Page the event was extracted from.
    #[serde(rename = "Source URL")]
    pub source_url: String,
    /// Resolved start date, used only for the freshness filter.
    #[serde(skip)]
    pub parsed_date: Option<NaiveDate>,
}

impl EventRecord {
    /// Empty record for a source page.
    #[must_use]
    pub fn skeleton(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    /// Event type label, empty when unknown.
    #[must_use]
    pub fn event_type_label(&self) -> &'static str {
        self.event_type.map_or("", EventType::label)
    }

    /// Whether the model produced no field at all.
    #[must_use]
    pub fn has_no_fields(&self) -> bool {
        self.year.is_empty()
            && self.start_date.is_empty()
            && self.end_date.is_empty()
            && self.event_name.is_empty()
            && self.event_type.is_none()
            && self.description.is_empty()
            && self.participants_count.is_empty()
            && self.speakers_organizers.is_empty()
            && self.partners.is_empty()
            && self.category.is_empty()
            && self.location.is_empty()
    }
}

/// Serde module for the optional event type, written as a plain label.
mod event_type_label {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::EventType;

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<EventType>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.map_or("", EventType::label))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<EventType>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(EventType::parse_label(&label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_russian_and_english() {
        assert_eq!(EventType::parse_label("Конференция"), Some(EventType::Conference));
        assert_eq!(EventType::parse_label(" митап "), Some(EventType::Meetup));
        assert_eq!(EventType::parse_label("Hackathon"), Some(EventType::Hackathon));
        assert_eq!(EventType::parse_label("Вебинар"), Some(EventType::Webinar));
        assert_eq!(EventType::parse_label("Выставка"), Some(EventType::Exhibition));
        assert_eq!(EventType::parse_label("Фестиваль"), Some(EventType::Festival));
        assert_eq!(EventType::parse_label("Мероприятие"), Some(EventType::Event));
    }

    #[test]
    fn test_parse_label_unknown_and_empty() {
        assert_eq!(EventType::parse_label("Лекция"), Some(EventType::Event));
        assert_eq!(EventType::parse_label("   "), None);
    }

    #[test]
    fn test_labels_roundtrip_through_parser() {
        for kind in EventType::ALL {
            assert_eq!(EventType::parse_label(kind.label()), Some(kind));
            assert_eq!(EventType::parse_label(kind.ru_label()), Some(kind));
        }
    }

    #[test]
    fn test_skeleton_is_empty() {
        let record = EventRecord::skeleton("https://example.ru/event");
        assert_eq!(record.source_url, "https://example.ru/event");
        assert!(record.has_no_fields());
        assert_eq!(record.event_type_label(), "");
    }

    #[test]
    fn test_serialization_uses_display_keys_and_hides_parsed_date() {
        let record = EventRecord {
            event_name: "Highload++".to_string(),
            event_type: Some(EventType::Conference),
            start_date: "20.11.2025".to_string(),
            parsed_date: NaiveDate::from_ymd_opt(2025, 11, 20),
            ..EventRecord::skeleton("https://highload.ru")
        };

        let json = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(json["Event Name"], "Highload++");
        assert_eq!(json["Event Type"], "Conference");
        assert_eq!(json["Start Date"], "20.11.2025");
        assert_eq!(json["Location"], "");
        assert!(json.get("Parsed Date").is_none());
        assert!(json.get("parsed_date").is_none());
    }

    #[test]
    fn test_deserialization_defaults_missing_fields() {
        let json = r#"{"Event Name": "DevOops", "Event Type": "митап"}"#;
        let record: EventRecord = serde_json::from_str(json).unwrap_or_default();
        assert_eq!(record.event_name, "DevOops");
        assert_eq!(record.event_type, Some(EventType::Meetup));
        assert_eq!(record.year, "");
        assert_eq!(record.parsed_date, None);
    }
}
