use crate::database::HistoryEntity;
use crate::models::{AnalysisOutcome, AssociationType, WordAssociation};
use crate::utils::escape_html;

pub fn bold(text: &str) -> String {
    format!("<b>{}</b>", escape_html(text))
}

fn unique_words(items: &[WordAssociation], kind: AssociationType) -> Vec<&str> {
    let mut words: Vec<&str> = Vec::new();
    for item in items.iter().filter(|item| item.kind == kind) {
        if !words.contains(&item.word.as_str()) {
            words.push(&item.word);
        }
    }
    words
}

fn joined(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| escape_html(w))
        .collect::<Vec<_>>()
        .join(", ")
}

/// HTML message for an analysis outcome.
pub fn render_outcome(word: &str, outcome: &AnalysisOutcome) -> String {
    if outcome.is_failed() {
        let error = outcome.error.as_deref().unwrap_or("неизвестная ошибка");
        return format!("Произошла ошибка: {}", escape_html(error));
    }

    let items = outcome.result.as_deref().unwrap_or_default();
    if items.is_empty() {
        return "Ничего не найдено.".to_string();
    }

    let synonyms = unique_words(items, AssociationType::Synonym);
    let antonyms = unique_words(items, AssociationType::Antonym);

    let mut parts = vec![format!("Результат для: {}\n", bold(word))];
    if !synonyms.is_empty() {
        parts.push(format!("✅ {}:", bold("Синонимы")));
        parts.push(joined(&synonyms));
        parts.push(String::new());
    }
    if !antonyms.is_empty() {
        parts.push(format!("❌ {}:", bold("Антонимы")));
        parts.push(joined(&antonyms));
    }
    parts.join("\n")
}

pub fn render_history(entries: &[HistoryEntity]) -> String {
    if entries.is_empty() {
        return "История запросов пуста.".to_string();
    }
    let mut lines = vec![bold("Последние запросы:")];
    lines.extend(
        entries
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}. {}", i + 1, escape_html(&e.original_text))),
    );
    lines.join("\n")
}
