use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::format::{bold, render_history, render_outcome};
use super::keyboards::{
    ANTONYMS_BUTTON, HELP_BUTTON, SYNONYMS_BUTTON, main_keyboard, parse_retry, retry_keyboard,
};
use crate::AppState;
use crate::database::{HistoryStore, TelegramProfile, UserStore};
use crate::error::AppError;
use crate::models::{RequestSource, RequestType};
use crate::services::LinguisticService;
use crate::telegram::{
    CallbackQuery, EditMessageText, Message, SendMessage, TelegramApi, TelegramError, Update,
    User,
};
use crate::utils::{MAX_WORD_LEN, is_cyrillic};

const HISTORY_LIMIT: i64 = 10;

const HELP_TEXT: &str = "Просто напиши слово, например 'счастье', и я проведу его анализ.";

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Telegram(#[from] TelegramError),
}

/// Everything an update handler needs.
#[derive(Clone)]
pub struct BotContext {
    pub api: Arc<dyn TelegramApi>,
    pub linguistic: Arc<LinguisticService>,
    pub users: Arc<dyn UserStore>,
    pub history: Arc<dyn HistoryStore>,
}

impl BotContext {
    pub fn new(api: Arc<dyn TelegramApi>, state: &AppState) -> Self {
        Self {
            api,
            linguistic: state.linguistic.clone(),
            users: state.users.clone(),
            history: state.history.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Start,
    Help,
    History,
    ChooseKind,
    Analyze(&'a str),
}

impl<'a> Command<'a> {
    fn parse(text: &'a str) -> Self {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('/') {
            // "/start@lexicon_bot payload" -> "start"
            let name = rest
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .split('@')
                .next()
                .unwrap_or_default();
            match name {
                "start" => return Command::Start,
                "help" => return Command::Help,
                "history" => return Command::History,
                _ => {}
            }
        }
        match text {
            HELP_BUTTON => Command::Help,
            SYNONYMS_BUTTON | ANTONYMS_BUTTON => Command::ChooseKind,
            word => Command::Analyze(word),
        }
    }
}

/// Handles one update; errors end up in the chat as a short notice.
pub async fn handle_update(ctx: &BotContext, update: Update) {
    let update_id = update.update_id;
    let chat_id = update.chat_id();
    let span = tracing::info_span!("bot_update", update_id, chat_id = ?chat_id);

    async {
        if let Err(e) = dispatch(ctx, update).await {
            report_error(ctx, update_id, chat_id, e).await;
        }
    }
    .instrument(span)
    .await
}

async fn dispatch(ctx: &BotContext, update: Update) -> Result<(), BotError> {
    if let Some(query) = update.callback_query {
        return handle_callback(ctx, query).await;
    }
    match update.message {
        Some(message) => handle_message(ctx, message).await,
        None => Ok(()),
    }
}

async fn report_error(ctx: &BotContext, update_id: i64, chat_id: Option<i64>, error: BotError) {
    let text = match &error {
        BotError::App(e) => {
            tracing::warn!(update_id, chat_id = ?chat_id, code = e.code(), "App error in bot: {}", e);
            format!("⚠ {}", e.message())
        }
        BotError::Telegram(e) => {
            tracing::error!(update_id, chat_id = ?chat_id, "Unhandled error in bot: {}", e);
            "⚠ Произошла непредвиденная ошибка. Пожалуйста, попробуйте позже.".to_string()
        }
    };

    if let Some(chat_id) = chat_id {
        if let Err(e) = ctx.api.send_message(SendMessage::new(chat_id, text)).await {
            tracing::error!(update_id, chat_id = ?chat_id, "Failed to send error message to user: {}", e);
        }
    }
}

async fn register_user(ctx: &BotContext, from: Option<&User>) -> Option<Uuid> {
    let user = from?;
    let profile = TelegramProfile {
        telegram_id: user.id,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
    };
    match ctx.users.upsert_telegram_user(&profile).await {
        Ok(entity) => Some(entity.id),
        Err(e) => {
            tracing::warn!(telegram_id = user.id, "Could not register user: {}", e);
            // a known user keeps their history even when the profile refresh fails
            match ctx.users.get_by_telegram_id(user.id).await {
                Ok(existing) => existing.map(|u| u.id),
                Err(e) => {
                    tracing::warn!(telegram_id = user.id, "Could not look up user: {}", e);
                    None
                }
            }
        }
    }
}

async fn handle_message(ctx: &BotContext, message: Message) -> Result<(), BotError> {
    let Some(text) = message.text.as_deref() else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let user_id = register_user(ctx, message.from.as_ref()).await;

    match Command::parse(text) {
        Command::Start => {
            let name = message
                .from
                .as_ref()
                .map(User::full_name)
                .unwrap_or_default();
            let greeting = format!(
                "Привет, {}!\nЯ LexiconAI бот. Отправь мне любое слово, и я найду для него синонимы и антонимы.",
                name
            );
            ctx.api
                .send_message(SendMessage::new(chat_id, greeting).markup(main_keyboard()))
                .await?;
        }
        Command::Help => {
            ctx.api.send_message(SendMessage::new(chat_id, HELP_TEXT)).await?;
        }
        Command::ChooseKind => {
            ctx.api
                .send_message(SendMessage::new(
                    chat_id,
                    "Отправь слово, и я подберу для него синонимы и антонимы.",
                ))
                .await?;
        }
        Command::History => {
            let text = match user_id {
                Some(user_id) => {
                    let entries = ctx.history.get_by_user_id(user_id, 0, HISTORY_LIMIT).await?;
                    render_history(&entries)
                }
                None => "История запросов недоступна.".to_string(),
            };
            ctx.api
                .send_message(SendMessage::new(chat_id, text).html())
                .await?;
        }
        Command::Analyze(word) => analyze_text(ctx, chat_id, word, user_id).await?,
    }
    Ok(())
}

async fn analyze_text(
    ctx: &BotContext,
    chat_id: i64,
    word: &str,
    user_id: Option<Uuid>,
) -> Result<(), BotError> {
    if let Some(reason) = rejection_reason(word) {
        ctx.api.send_message(SendMessage::new(chat_id, reason)).await?;
        return Ok(());
    }

    let status = ctx
        .api
        .send_message(
            SendMessage::new(chat_id, format!("Анализирую слово {}...", bold(word))).html(),
        )
        .await?;

    run_analysis(ctx, chat_id, status.message_id, word, user_id).await
}

/// Why `word` cannot be analyzed, if it cannot.
fn rejection_reason(word: &str) -> Option<&'static str> {
    if !is_cyrillic(word) {
        Some("Пожалуйста, введите слово на кириллице без посторонних символов.")
    } else if word.chars().count() > MAX_WORD_LEN {
        Some("Слишком длинное слово. Попробуйте что-то короче.")
    } else {
        None
    }
}

/// Runs the analysis and rewrites `message_id` with the result.
async fn run_analysis(
    ctx: &BotContext,
    chat_id: i64,
    message_id: i64,
    word: &str,
    user_id: Option<Uuid>,
) -> Result<(), BotError> {
    let outcome = ctx
        .linguistic
        .analyze_word(word, RequestSource::Telegram, user_id)
        .await;

    let mut edit = EditMessageText::new(chat_id, message_id, render_outcome(word, &outcome)).html();
    if outcome.is_failed() {
        if let Some(keyboard) = retry_keyboard(word, RequestType::Synonym) {
            edit = edit.markup(keyboard);
        }
    }
    ctx.api.edit_message_text(edit).await?;
    Ok(())
}

async fn handle_callback(ctx: &BotContext, query: CallbackQuery) -> Result<(), BotError> {
    ctx.api.answer_callback_query(&query.id).await?;

    let Some((request_type, word)) = query.data.as_deref().and_then(parse_retry) else {
        tracing::debug!(data = ?query.data, "Ignoring unknown callback");
        return Ok(());
    };
    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };

    // callback data comes from the client and is not trusted
    if let Some(reason) = rejection_reason(word) {
        tracing::warn!(word, "Rejected retry callback");
        ctx.api
            .edit_message_text(EditMessageText::new(message.chat.id, message.message_id, reason))
            .await?;
        return Ok(());
    }

    tracing::info!(word, request_type = request_type.as_str(), "Retrying analysis");
    let user_id = register_user(ctx, Some(&query.from)).await;
    run_analysis(ctx, message.chat.id, message.message_id, word, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::models::WordAssociation;
    use crate::telegram::{ChatId, ReplyMarkup};
    use crate::testing::{FakeAnalyzer, MemoryDictionary, MemoryHistory, MemoryUsers};

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Message(SendMessage),
        Edit(EditMessageText),
        Answer(String),
    }

    #[derive(Default)]
    struct FakeTelegram {
        sent: Mutex<Vec<Sent>>,
        fail_sends: bool,
    }

    impl FakeTelegram {
        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TelegramApi for FakeTelegram {
        async fn send_message(&self, request: SendMessage) -> Result<Message, TelegramError> {
            let chat_id = match request.chat_id {
                ChatId::Id(id) => id,
                ChatId::Username(_) => 0,
            };
            self.sent.lock().unwrap().push(Sent::Message(request));
            if self.fail_sends {
                return Err(TelegramError::Api("Forbidden: bot was blocked".into()));
            }
            Ok(serde_json::from_value(json!({
                "message_id": 100,
                "chat": { "id": chat_id },
            }))
            .unwrap())
        }

        async fn edit_message_text(&self, request: EditMessageText) -> Result<(), TelegramError> {
            self.sent.lock().unwrap().push(Sent::Edit(request));
            Ok(())
        }

        async fn answer_callback_query(&self, id: &str) -> Result<(), TelegramError> {
            self.sent.lock().unwrap().push(Sent::Answer(id.to_string()));
            Ok(())
        }
    }

    struct Harness {
        ctx: BotContext,
        telegram: Arc<FakeTelegram>,
        history: Arc<MemoryHistory>,
        analyzer: Arc<FakeAnalyzer>,
    }

    fn harness_with(analyzer: FakeAnalyzer, telegram: FakeTelegram) -> Harness {
        let telegram = Arc::new(telegram);
        let history = Arc::new(MemoryHistory::default());
        let analyzer = Arc::new(analyzer);
        let linguistic = Arc::new(LinguisticService::new(
            Arc::new(MemoryDictionary::default()),
            history.clone(),
            analyzer.clone(),
        ));
        Harness {
            ctx: BotContext {
                api: telegram.clone(),
                linguistic,
                users: Arc::new(MemoryUsers::default()),
                history: history.clone(),
            },
            telegram,
            history,
            analyzer,
        }
    }

    fn harness(analyzer: FakeAnalyzer) -> Harness {
        harness_with(analyzer, FakeTelegram::default())
    }

    fn text_update(text: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": 1,
            "message": {
                "message_id": 5,
                "chat": { "id": 77 },
                "from": { "id": 9, "first_name": "Анна", "last_name": "Каренина" },
                "text": text,
            }
        }))
        .unwrap()
    }

    #[test]
    fn parses_commands_and_buttons() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("/start@lexicon_bot ref"), Command::Start);
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("Помощь"), Command::Help);
        assert_eq!(Command::parse("Синонимы"), Command::ChooseKind);
        assert_eq!(Command::parse("/history"), Command::History);
        assert_eq!(Command::parse(" мир "), Command::Analyze("мир"));
        assert_eq!(Command::parse("/unknown"), Command::Analyze("/unknown"));
    }

    #[tokio::test]
    async fn start_greets_by_full_name_with_keyboard() {
        let h = harness(FakeAnalyzer::returning(vec![]));
        handle_update(&h.ctx, text_update("/start")).await;

        match &h.telegram.sent()[..] {
            [Sent::Message(msg)] => {
                assert!(msg.text.starts_with("Привет, Анна Каренина!"));
                assert!(matches!(msg.reply_markup, Some(ReplyMarkup::Keyboard { .. })));
            }
            other => panic!("unexpected calls: {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejects_non_cyrillic_and_long_words() {
        let h = harness(FakeAnalyzer::returning(vec![]));
        handle_update(&h.ctx, text_update("hello")).await;
        handle_update(&h.ctx, text_update(&"а".repeat(51))).await;

        let sent = h.telegram.sent();
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], Sent::Message(m) if m.text.contains("кириллице")));
        assert!(matches!(&sent[1], Sent::Message(m) if m.text.contains("Слишком длинное")));
        assert!(h.analyzer.calls().is_empty());
    }

    #[tokio::test]
    async fn analysis_edits_status_message_with_result() {
        let h = harness(FakeAnalyzer::returning(vec![
            WordAssociation::synonym("радость"),
            WordAssociation::antonym("горе"),
        ]));
        handle_update(&h.ctx, text_update("Счастье")).await;

        let sent = h.telegram.sent();
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], Sent::Message(m) if m.text == "Анализирую слово <b>Счастье</b>..."));
        match &sent[1] {
            Sent::Edit(edit) => {
                assert_eq!(edit.chat_id, ChatId::Id(77));
                assert_eq!(edit.message_id, 100);
                assert!(edit.text.contains("радость"));
                assert!(edit.reply_markup.is_none());
            }
            other => panic!("unexpected call: {:?}", other),
        }
        assert_eq!(h.analyzer.calls(), vec!["счастье".to_string()]);
        assert_eq!(h.history.sources(), vec![("telegram".to_string(), "счастье".to_string())]);
        assert!(h.history.user_ids()[0].is_some());
    }

    #[tokio::test]
    async fn failure_offers_retry_button() {
        let h = harness(FakeAnalyzer::failing());
        handle_update(&h.ctx, text_update("мир")).await;

        match h.telegram.sent().last() {
            Some(Sent::Edit(edit)) => {
                assert!(edit.text.starts_with("Произошла ошибка"));
                assert!(matches!(edit.reply_markup, Some(ReplyMarkup::Inline { .. })));
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn retry_callback_reruns_analysis_in_place() {
        let h = harness(FakeAnalyzer::returning(vec![WordAssociation::synonym("покой")]));
        let update: Update = serde_json::from_value(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 9, "first_name": "Анна" },
                "message": { "message_id": 55, "chat": { "id": 77 } },
                "data": "retry:synonym:мир"
            }
        }))
        .unwrap();

        handle_update(&h.ctx, update).await;

        let sent = h.telegram.sent();
        assert_eq!(sent[0], Sent::Answer("cb-1".into()));
        assert!(matches!(&sent[1], Sent::Edit(e) if e.message_id == 55 && e.text.contains("покой")));
        assert_eq!(h.analyzer.calls(), vec!["мир".to_string()]);
    }

    fn retry_update(data: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": 3,
            "callback_query": {
                "id": "cb-2",
                "from": { "id": 9, "first_name": "Анна" },
                "message": { "message_id": 56, "chat": { "id": 77 } },
                "data": data
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn retry_callback_with_invalid_word_skips_analysis() {
        let h = harness(FakeAnalyzer::returning(vec![WordAssociation::synonym("покой")]));
        let long = format!("retry:synonym:{}", "а".repeat(MAX_WORD_LEN + 1));

        handle_update(&h.ctx, retry_update("retry:synonym:hello")).await;
        handle_update(&h.ctx, retry_update(&long)).await;

        let sent = h.telegram.sent();
        assert_eq!(sent.len(), 4);
        assert!(matches!(&sent[1], Sent::Edit(e) if e.message_id == 56 && e.text.contains("кириллице")));
        assert!(matches!(&sent[3], Sent::Edit(e) if e.text.contains("Слишком длинное")));
        assert!(h.analyzer.calls().is_empty());
        assert!(h.history.sources().is_empty());
    }

    #[tokio::test]
    async fn known_user_keeps_history_when_profile_refresh_fails() {
        let mut h = harness(FakeAnalyzer::returning(vec![WordAssociation::synonym("покой")]));
        let users = Arc::new(MemoryUsers::read_only());
        let known = users.seed(9);
        h.ctx.users = users;

        handle_update(&h.ctx, text_update("мир")).await;

        assert_eq!(h.history.user_ids(), vec![Some(known)]);
    }

    #[tokio::test]
    async fn history_lists_previous_words() {
        let h = harness(FakeAnalyzer::returning(vec![WordAssociation::synonym("покой")]));
        handle_update(&h.ctx, text_update("мир")).await;
        handle_update(&h.ctx, text_update("/history")).await;

        match h.telegram.sent().last() {
            Some(Sent::Message(msg)) => assert!(msg.text.contains("1. мир")),
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn telegram_failures_are_reported_once() {
        let h = harness_with(
            FakeAnalyzer::returning(vec![]),
            FakeTelegram {
                fail_sends: true,
                ..FakeTelegram::default()
            },
        );
        handle_update(&h.ctx, text_update("/help")).await;

        // the help message fails, then the error notice is attempted and fails too
        let sent = h.telegram.sent();
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[1], Sent::Message(m) if m.text.starts_with("⚠")));
    }
}
