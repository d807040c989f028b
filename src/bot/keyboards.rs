use crate::models::RequestType;
use crate::telegram::{InlineKeyboardButton, KeyboardButton, ReplyMarkup};

pub const SYNONYMS_BUTTON: &str = "Синонимы";
pub const ANTONYMS_BUTTON: &str = "Антонимы";
pub const HELP_BUTTON: &str = "Помощь";

/// Telegram rejects callback data longer than this many bytes.
const MAX_CALLBACK_DATA: usize = 64;

const RETRY_PREFIX: &str = "retry";

pub fn main_keyboard() -> ReplyMarkup {
    let button = |text: &str| KeyboardButton {
        text: text.to_string(),
    };
    ReplyMarkup::Keyboard {
        keyboard: vec![
            vec![button(SYNONYMS_BUTTON), button(ANTONYMS_BUTTON)],
            vec![button(HELP_BUTTON)],
        ],
        resize_keyboard: true,
    }
}

pub fn retry_callback_data(word: &str, request_type: RequestType) -> String {
    format!("{}:{}:{}", RETRY_PREFIX, request_type.as_str(), word)
}

/// `None` when the word does not fit into callback data.
pub fn retry_keyboard(word: &str, request_type: RequestType) -> Option<ReplyMarkup> {
    let callback_data = retry_callback_data(word, request_type);
    if callback_data.len() > MAX_CALLBACK_DATA {
        return None;
    }
    Some(ReplyMarkup::Inline {
        inline_keyboard: vec![vec![InlineKeyboardButton {
            text: "🔄 Попробовать еще раз".to_string(),
            callback_data,
        }]],
    })
}

/// Parses `retry:<type>:<word>`.
pub fn parse_retry(data: &str) -> Option<(RequestType, &str)> {
    let mut parts = data.splitn(3, ':');
    if parts.next()? != RETRY_PREFIX {
        return None;
    }
    let request_type = RequestType::parse(parts.next()?)?;
    let word = parts.next().filter(|w| !w.is_empty())?;
    Some((request_type, word))
}
