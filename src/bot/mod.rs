//! Telegram bot module - log exercises by text or voice

use std::sync::Arc;

use teloxide::{net::Download, prelude::*, types::Voice, utils::command::BotCommands};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::db::{Database, StoreError};
use crate::intent::Intent;
use crate::parser::parse_entry;
use crate::report;
use crate::voice::{OpenAiClient, VoiceError};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type SharedDb = Arc<Mutex<Database>>;
/// Absent when no API key is configured
type VoiceService = Option<Arc<OpenAiClient>>;

const WELCOME: &str = "Привет! Я бот для дневника тренировок в зале.\n\n\
    Добавить упражнение:\n\
    /add жим лежа 80 8 3 хорошая форма\n\
    или просто напиши: жим лежа 80 8x3\n\n\
    /today - тренировки за сегодня\n\
    /max жим лежа - максимальный вес\n\
    /last присед - последняя тренировка\n\
    /progress жим лежа - прогресс за 3 месяца\n\n\
    Можно прислать голосовое сообщение.\n\
    /help - список команд";

const QUICK_ADD_HELP: &str = "Не удалось распознать упражнение.\n\n\
    Формат: название вес повторенияxподходы [заметка]\n\
    Примеры:\n\
    - жим 80 8x3\n\
    - приседания 100кг 5x4\n\
    - становая 120 5 3 новый рекорд\n\n\
    Напиши /help для списка команд.";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Команды бота:")]
pub enum Command {
    #[command(description = "Приветствие и инструкция")]
    Start,
    #[command(description = "Список команд")]
    Help,
    #[command(description = "Добавить: название вес повторения подходы [заметка]")]
    Add(String),
    #[command(description = "Упражнения за сегодня")]
    Today,
    #[command(description = "Максимальный вес: /max название")]
    Max(String),
    #[command(description = "Последняя тренировка: /last название")]
    Last(String),
    #[command(description = "Прогресс за 3 месяца: /progress название")]
    Progress(String),
    #[command(description = "Удалить запись: /delete id")]
    Delete(String),
    #[command(description = "Все упражнения")]
    Names,
}

/// Start the Telegram bot. The store and voice client are owned by the bot
/// from here on.
pub async fn run_bot(token: String, db: Database, voice: Option<OpenAiClient>) -> anyhow::Result<()> {
    let bot = Bot::new(token);
    let db: SharedDb = Arc::new(Mutex::new(db));
    let voice: VoiceService = voice.map(Arc::new);

    if voice.is_none() {
        warn!("Voice messages disabled: OPENAI_API_KEY is not set");
    }
    info!("Starting gym bot...");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            Update::filter_message()
                .filter_map(|msg: Message| msg.voice().cloned())
                .endpoint(handle_voice),
        )
        .branch(Update::filter_message().endpoint(handle_text));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![db, voice])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Render the reply to an intent. Caller mistakes become the reply text;
/// only storage faults are returned as errors.
fn reply_for(db: &Database, intent: Intent) -> Result<String, StoreError> {
    match intent.execute(db) {
        Ok(outcome) => Ok(report::render(&outcome)),
        Err(e @ StoreError::InvalidWindow(_)) => Ok(format!("Ошибка: {}", e)),
        Err(e) => Err(e),
    }
}

async fn run_intent(db: &SharedDb, intent: Intent) -> Result<String, StoreError> {
    let db = db.lock().await;
    reply_for(&db, intent)
}

fn usage(example: &str) -> String {
    format!("Использование: {}", example)
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, db: SharedDb) -> HandlerResult {
    let reply = match cmd {
        Command::Start => WELCOME.to_string(),

        Command::Help => Command::descriptions().to_string(),

        Command::Add(text) => {
            if text.trim().is_empty() {
                usage("/add название вес повторения подходы [заметка]\nПример: /add жим лежа 80 8 3")
            } else {
                match parse_entry(&text) {
                    Ok(exercise) => run_intent(&db, Intent::Add(exercise)).await?,
                    Err(e) => format!("Ошибка: {}", e),
                }
            }
        }

        Command::Today => run_intent(&db, Intent::Today).await?,

        Command::Max(name) => match name.trim() {
            "" => usage("/max название\nПример: /max жим лежа"),
            name => run_intent(&db, Intent::Max { name: name.to_string() }).await?,
        },

        Command::Last(name) => match name.trim() {
            "" => usage("/last название\nПример: /last приседания"),
            name => run_intent(&db, Intent::Last { name: name.to_string() }).await?,
        },

        Command::Progress(name) => match name.trim() {
            "" => usage("/progress название\nПример: /progress жим лежа"),
            name => run_intent(&db, Intent::progress(name)).await?,
        },

        Command::Delete(arg) => match arg.trim().parse::<i64>() {
            Ok(id) => {
                if db.lock().await.delete(id)? {
                    format!("Запись {} удалена", id)
                } else {
                    format!("Запись {} не найдена", id)
                }
            }
            Err(_) => usage("/delete id\nПример: /delete 42"),
        },

        Command::Names => {
            let names = db.lock().await.all_names()?;
            report::render_names(&names)
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Plain text is a quick add: "жим 80 8x3"
async fn handle_text(bot: Bot, msg: Message, db: SharedDb) -> HandlerResult {
    let Some(text) = msg.text().map(str::trim) else {
        return Ok(());
    };

    if text.starts_with('/') {
        bot.send_message(msg.chat.id, "Неизвестная команда. Напиши /help для списка команд.")
            .await?;
        return Ok(());
    }

    let reply = match parse_entry(text) {
        Ok(exercise) => run_intent(&db, Intent::Add(exercise)).await?,
        Err(_) => QUICK_ADD_HELP.to_string(),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_voice(
    bot: Bot,
    msg: Message,
    voice_note: Voice,
    db: SharedDb,
    voice: VoiceService,
) -> HandlerResult {
    let Some(client) = voice else {
        bot.send_message(msg.chat.id, "Голосовые сообщения не настроены").await?;
        return Ok(());
    };

    let file = bot.get_file(voice_note.file.id.clone()).await?;
    let mut audio = Vec::new();
    bot.download_file(&file.path, &mut audio).await?;

    bot.send_message(msg.chat.id, "Распознаю голос...").await?;
    let text = match client.transcribe(audio, "voice.ogg").await {
        Ok(text) if !text.is_empty() => text,
        Ok(_) => {
            bot.send_message(msg.chat.id, "Не удалось распознать речь. Попробуйте ещё раз.")
                .await?;
            return Ok(());
        }
        Err(e) => {
            error!("Transcription failed: {}", e);
            bot.send_message(msg.chat.id, format!("Ошибка обработки голоса: {}", e))
                .await?;
            return Ok(());
        }
    };
    bot.send_message(msg.chat.id, format!("Распознано: {}", text)).await?;

    let reply = match client.intent_from_text(&text).await {
        Ok(intent) => run_intent(&db, intent).await?,
        Err(VoiceError::Clarify(question)) => question,
        Err(e) => {
            warn!("Could not interpret '{}': {}", text, e);
            format!("Ошибка: {}", e)
        }
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
