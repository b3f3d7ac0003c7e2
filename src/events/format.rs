//! Chat rendering of discovered and archived events.
//!
//! Output is Telegram-flavoured HTML: only `<b>` tags, everything else escaped.

use crate::events::record::EventRecord;

/// Maximum length of one chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Events shown per message.
const MAX_LISTED: usize = 5;

/// Description length shown per event, in characters.
const DESCRIPTION_PREVIEW_CHARS: usize = 150;

/// Message sent when a run found nothing.
pub const NOTHING_FOUND: &str =
    "Не удалось найти актуальные мероприятия. Попробуйте позже или уточните запрос.";

/// Message sent when the archive has no match.
pub const ARCHIVE_NOTHING_FOUND: &str = "По вашему запросу ничего не найдено в архиве.";

/// Escape text for HTML chat messages.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        escape_html(value)
    }
}

fn description_preview(description: &str) -> String {
    if description.trim().is_empty() {
        return "Нет описания".to_string();
    }
    if description.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
        return escape_html(description);
    }
    let cut: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    format!("{}...", escape_html(cut.trim_end()))
}

/// Render up to five events as one chat message.
///
/// With `include_index`, entries are numbered and a hint about the archive search is appended.
#[must_use]
pub fn format_events(events: &[EventRecord], include_index: bool) -> String {
    if events.is_empty() {
        return NOTHING_FOUND.to_string();
    }

    let mut out = String::from("✨ <b>Актуальные IT-мероприятия:</b>\n\n");
    for (i, event) in events.iter().take(MAX_LISTED).enumerate() {
        let index = if include_index {
            format!("{}. ", i + 1)
        } else {
            String::new()
        };
        let event_type = event
            .event_type
            .map_or_else(|| "Не указан".to_string(), |kind| kind.ru_label().to_string());

        out.push_str("<b>");
        out.push_str(&index);
        out.push_str(&or_placeholder(&event.event_name, "Без названия"));
        out.push_str("</b>\n");

        out.push_str("📅 <b>Даты:</b> ");
        out.push_str(&or_placeholder(&event.start_date, "Не указана"));
        out.push_str(" - ");
        out.push_str(&or_placeholder(&event.end_date, "Не указана"));
        out.push_str(", ");
        out.push_str(&escape_html(&event.year));
        out.push('\n');

        out.push_str("📍 <b>Место:</b> ");
        out.push_str(&or_placeholder(&event.location, "Не указано"));
        out.push('\n');
        out.push_str("🔖 <b>Тип:</b> ");
        out.push_str(&event_type);
        out.push('\n');
        out.push_str("📝 <b>Описание:</b> ");
        out.push_str(&description_preview(&event.description));
        out.push('\n');
        out.push_str("🎤 <b>Спикеры:</b> ");
        out.push_str(&or_placeholder(&event.speakers_organizers, "Не указаны"));
        out.push('\n');
        out.push_str("👥 <b>Участники:</b> ");
        out.push_str(&or_placeholder(&event.participants_count, "Неизвестно"));
        out.push('\n');
        out.push_str("🔖 <b>Категория:</b> ");
        out.push_str(&or_placeholder(&event.category, "Не указана"));
        out.push_str("\n\n");
    }

    if include_index {
        out.push_str(
            "\nℹ️ Чтобы получить подробную информацию о мероприятии, используйте <b>Поиск по архиву</b>",
        );
    }
    out
}

/// Render archive matches as one chat message.
#[must_use]
pub fn format_archive_results(results: &[String]) -> String {
    let listed: Vec<&String> = results
        .iter()
        .filter(|r| !r.trim().is_empty())
        .take(MAX_LISTED)
        .collect();
    if listed.is_empty() {
        return ARCHIVE_NOTHING_FOUND.to_string();
    }

    let mut out = String::from("📚 <b>Результаты поиска по архиву:</b>\n\n");
    for (i, result) in listed.iter().enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push_str(". ");
        out.push_str(&escape_html(result.trim()));
        out.push_str("\n\n");
    }
    out
}

/// Split text into chat messages of at most `max_chars` characters.
///
/// Breaks after the last newline of each window when there is one, otherwise cuts hard.
#[must_use]
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let cut = if end == chars.len() {
            end
        } else {
            chars[start..end]
                .iter()
                .rposition(|c| *c == '\n')
                .map_or(end, |pos| start + pos + 1)
        };
        chunks.push(chars[start..cut].iter().collect());
        start = cut;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::record::EventType;

    fn event(name: &str) -> EventRecord {
        EventRecord {
            event_name: name.to_string(),
            event_type: Some(EventType::Meetup),
            start_date: "20.11.2030".to_string(),
            end_date: "21.11.2030".to_string(),
            year: "2030".to_string(),
            location: "Санкт-Петербург".to_string(),
            ..EventRecord::skeleton("https://example.ru")
        }
    }

    #[test]
    fn test_empty_events_message() {
        assert_eq!(format_events(&[], true), NOTHING_FOUND);
    }

    #[test]
    fn test_event_fields_rendered() {
        let text = format_events(&[event("Rust <Meetup>")], true);
        assert!(text.starts_with("✨ <b>Актуальные IT-мероприятия:</b>"));
        assert!(text.contains("<b>1. Rust &lt;Meetup&gt;</b>"));
        assert!(text.contains("📅 <b>Даты:</b> 20.11.2030 - 21.11.2030, 2030"));
        assert!(text.contains("📍 <b>Место:</b> Санкт-Петербург"));
        assert!(text.contains("🔖 <b>Тип:</b> Митап"));
        assert!(text.contains("📝 <b>Описание:</b> Нет описания"));
        assert!(text.contains("🎤 <b>Спикеры:</b> Не указаны"));
        assert!(text.contains("Поиск по архиву"));
    }

    #[test]
    fn test_at_most_five_events_without_index() {
        let events: Vec<EventRecord> = (0..7).map(|i| event(&format!("Event number {i}"))).collect();
        let text = format_events(&events, false);
        assert!(text.contains("Event number 4"));
        assert!(!text.contains("Event number 5"));
        assert!(!text.contains("1. "));
        assert!(!text.contains("Поиск по архиву"));
    }

    #[test]
    fn test_long_description_preview() {
        let mut long = event("Conference");
        long.description = "д".repeat(300);
        let text = format_events(&[long], true);
        let expected = format!("📝 <b>Описание:</b> {}...", "д".repeat(150));
        assert!(text.contains(&expected));
    }

    #[test]
    fn test_archive_results() {
        assert_eq!(format_archive_results(&[]), ARCHIVE_NOTHING_FOUND);
        assert_eq!(format_archive_results(&["  ".to_string()]), ARCHIVE_NOTHING_FOUND);

        let text = format_archive_results(&["DevOops 2024".to_string(), "Heisenbug".to_string()]);
        assert!(text.contains("1. DevOops 2024"));
        assert!(text.contains("2. Heisenbug"));
    }

    #[test]
    fn test_split_short_message_is_single_chunk() {
        assert_eq!(split_message("hello", MAX_MESSAGE_CHARS), vec!["hello".to_string()]);
        assert!(split_message("", MAX_MESSAGE_CHARS).is_empty());
    }

    #[test]
    fn test_split_prefers_newlines() {
        let chunks = split_message("aaaa\nbbbb\ncc", 7);
        assert_eq!(chunks, vec!["aaaa\n", "bbbb\ncc"]);
    }

    #[test]
    fn test_split_hard_cut_counts_chars() {
        let text = "я".repeat(10);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.concat(), text);
    }
}
