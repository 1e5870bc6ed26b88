//! Outbound JSON encoding.

use crate::keyboard::{InlineKeyboard, Markup};
use crate::sendable::Sendable;
use serde_json::{json, Map, Value};

fn markup_value(markup: &Markup) -> Value {
    match markup {
        Markup::Inline(kb) => inline_value(kb),
        Markup::Reply(menu) => {
            let rows: Vec<Vec<Value>> = menu
                .rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
                .collect();
            json!({ "keyboard": rows, "resize_keyboard": true })
        }
        Markup::Remove => json!({ "remove_keyboard": true }),
    }
}

fn inline_value(kb: &InlineKeyboard) -> Value {
    serde_json::to_value(kb).unwrap_or(Value::Null)
}

impl Sendable {
    /// JSON body for the Bot API method returned by [`Sendable::method`].
    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        match self {
            Sendable::Text {
                chat_id,
                text,
                markup,
            } => {
                body.insert("chat_id".into(), json!(chat_id));
                body.insert("text".into(), json!(text));
                if let Some(markup) = markup {
                    body.insert("reply_markup".into(), markup_value(markup));
                }
            }
            Sendable::EditText {
                chat_id,
                message_id,
                text,
                keyboard,
            } => {
                body.insert("chat_id".into(), json!(chat_id));
                body.insert("message_id".into(), json!(message_id));
                body.insert("text".into(), json!(text));
                if let Some(kb) = keyboard {
                    body.insert("reply_markup".into(), inline_value(kb));
                }
            }
            Sendable::EditKeyboard {
                chat_id,
                message_id,
                keyboard,
            } => {
                body.insert("chat_id".into(), json!(chat_id));
                body.insert("message_id".into(), json!(message_id));
                body.insert("reply_markup".into(), inline_value(keyboard));
            }
            Sendable::Delete {
                chat_id,
                message_id,
            } => {
                body.insert("chat_id".into(), json!(chat_id));
                body.insert("message_id".into(), json!(message_id));
            }
            Sendable::Sticker { chat_id, file_id } => {
                body.insert("chat_id".into(), json!(chat_id));
                body.insert("sticker".into(), json!(file_id));
            }
            Sendable::AnswerCallback { callback_id, text } => {
                body.insert("callback_query_id".into(), json!(callback_id));
                if let Some(text) = text {
                    body.insert("text".into(), json!(text));
                }
            }
        }
        Value::Object(body)
    }
}

/// Parameters for a long-polling `getUpdates` call.
pub fn get_updates_params(offset: Option<i64>, timeout_secs: u64) -> Value {
    let mut body = Map::new();
    if let Some(offset) = offset {
        body.insert("offset".into(), json!(offset));
    }
    body.insert("timeout".into(), json!(timeout_secs));
    body.insert(
        "allowed_updates".into(),
        json!(["message", "callback_query"]),
    );
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::ReplyKeyboard;

    #[test]
    fn text_with_inline_keyboard() {
        let kb = InlineKeyboard::new().row([("Готов", "ready")]);
        let v = Sendable::text(5, "hi").with_inline(kb).payload();
        assert_eq!(v["chat_id"], 5);
        assert_eq!(v["reply_markup"]["inline_keyboard"][0][0]["callback_data"], "ready");
    }

    #[test]
    fn menu_keyboard_is_resized() {
        let menu = ReplyKeyboard::new().row(["Играть", "Правила"]);
        let v = Sendable::text(5, "menu").with_menu(menu).payload();
        assert_eq!(v["reply_markup"]["keyboard"][0][1]["text"], "Правила");
        assert_eq!(v["reply_markup"]["resize_keyboard"], true);
    }

    #[test]
    fn edit_without_keyboard_omits_markup() {
        let v = Sendable::edit_text(1, 2, "x").payload();
        assert!(v.get("reply_markup").is_none());
        assert_eq!(v["message_id"], 2);
    }

    #[test]
    fn answer_uses_query_id() {
        let v = Sendable::answer("abc").payload();
        assert_eq!(v["callback_query_id"], "abc");
    }

    #[test]
    fn polling_params_carry_offset() {
        let v = get_updates_params(Some(11), 60);
        assert_eq!(v["offset"], 11);
        assert_eq!(v["timeout"], 60);
        assert!(get_updates_params(None, 1).get("offset").is_none());
    }
}
