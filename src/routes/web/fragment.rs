//! HTML fragments swapped into the index page by htmx.

use crate::models::{AnalysisOutcome, AssociationType, WordAssociation};
use crate::utils::escape_html;

pub fn render_error(original_text: &str, message: &str) -> String {
    format!(
        "<div class=\"result result-error\">\n  <h3>{}</h3>\n  <p class=\"error\">{}</p>\n</div>",
        escape_html(original_text),
        escape_html(message)
    )
}

fn render_list(title: &str, items: &[WordAssociation], kind: AssociationType) -> String {
    let words: Vec<String> = items
        .iter()
        .filter(|item| item.kind == kind)
        .map(|item| format!("    <li>{}</li>", escape_html(&item.word)))
        .collect();
    if words.is_empty() {
        return String::new();
    }
    format!(
        "  <h4>{}</h4>\n  <ul class=\"{}\">\n{}\n  </ul>\n",
        title,
        kind.as_str(),
        words.join("\n")
    )
}

pub fn render_outcome(original_text: &str, outcome: &AnalysisOutcome) -> String {
    if let Some(error) = outcome.error.as_deref() {
        return render_error(original_text, error);
    }

    let items = outcome.result.as_deref().unwrap_or_default();
    if items.is_empty() {
        return render_error(original_text, "Ничего не найдено.");
    }

    format!(
        "<div class=\"result\">\n  <h3>{}</h3>\n{}{}</div>",
        escape_html(original_text),
        render_list("Синонимы", items, AssociationType::Synonym),
        render_list("Антонимы", items, AssociationType::Antonym),
    )
}
