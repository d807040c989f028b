//! Minimal Telegram Bot API client over HTTPS.

pub mod client;
pub mod types;

pub use client::{TELEGRAM_API_URL, TelegramApi, TelegramClient, TelegramError};
pub use types::{
    CallbackQuery, ChatId, EditMessageText, InlineKeyboardButton, KeyboardButton, Message,
    ParseMode, ReplyMarkup, SendMessage, Update, User,
};
