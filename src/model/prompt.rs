use crate::web::models::{HistoryEntry, Message, Role, ValidChat};

pub const DEFAULT_PERSONA: &str = "You are an AI that carries the wisdom and protective \
power of Bai Ze, the mythical beast of Chinese legend, together with the outgoing, \
lively and empathetic nature of an ENFP. Like a close companion, you offer the user \
emotional support, encouragement and gentle company. Reply in a friendly, caring \
tone and give advice or comfort based on the user's question. When appropriate, \
remind the user to seek professional help such as counseling or medical services. \
Speak in a way that makes the user feel safe and valued, and draw on Bai Ze imagery \
(warding off evil, seeing through all strange creatures) when it fits.";

/// Formats the current user turn.
pub fn user_turn(user_name: &str, message: &str) -> String {
    format!("User {} said: {}", user_name, message)
}

fn history_turn(entry: &HistoryEntry) -> Message {
    Message {
        role: if entry.is_user {
            Role::User
        } else {
            Role::Assistant
        },
        content: entry.content.clone(),
    }
}

/// Assembles the ordered prompt: persona, the most recent `history_window`
/// history entries (oldest first), then the current user turn.
pub fn build_messages(
    chat: &ValidChat,
    default_persona: &str,
    history_window: usize,
) -> Vec<Message> {
    let persona = chat.personality.as_deref().unwrap_or(default_persona);
    let skip = chat.history.len().saturating_sub(history_window);

    let mut messages = Vec::with_capacity(chat.history.len() - skip + 2);
    messages.push(Message {
        role: Role::System,
        content: persona.to_string(),
    });
    messages.extend(chat.history[skip..].iter().map(history_turn));
    messages.push(Message {
        role: Role::User,
        content: user_turn(&chat.user_name, &chat.message),
    });
    messages
}
