use crate::error::AppError;

/// Longest word the bot accepts.
pub const MAX_WORD_LEN: usize = 50;

fn is_cyrillic_char(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё' | '-') || c.is_whitespace()
}

/// Cyrillic letters, whitespace and hyphens only. Empty text is rejected.
pub fn is_cyrillic(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_cyrillic_char)
}

pub fn validate_word(text: &str) -> Result<(), AppError> {
    if is_cyrillic(text) {
        Ok(())
    } else {
        Err(AppError::validation(
            "Текст должен содержать только кириллические символы, пробелы или дефисы",
        ))
    }
}

/// Trimmed, lowercased form used as the cache key.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
