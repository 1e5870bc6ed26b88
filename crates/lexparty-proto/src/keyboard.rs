//! Inline and reply keyboards.

use serde::{Deserialize, Serialize};

/// A single inline button carrying callback data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    /// Label.
    pub text: String,
    /// Callback data delivered when the button is tapped.
    #[serde(rename = "callback_data")]
    pub data: String,
}

impl InlineButton {
    /// Create a button.
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// A keyboard attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    /// Button rows.
    #[serde(rename = "inline_keyboard")]
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// Create an empty keyboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row built from `(label, data)` pairs.
    pub fn row<I, T, D>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = (T, D)>,
        T: Into<String>,
        D: Into<String>,
    {
        let row: Vec<InlineButton> = buttons
            .into_iter()
            .map(|(t, d)| InlineButton::new(t, d))
            .collect();
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    /// Append a row of ready-made buttons.
    pub fn push_row(&mut self, row: Vec<InlineButton>) {
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    /// Lay `buttons` out in rows of at most `width` buttons.
    pub fn grid(buttons: Vec<InlineButton>, width: usize) -> Self {
        let width = width.max(1);
        let mut kb = Self::new();
        let mut row = Vec::with_capacity(width);
        for button in buttons {
            row.push(button);
            if row.len() == width {
                kb.rows.push(std::mem::take(&mut row));
            }
        }
        kb.push_row(row);
        kb
    }

    /// Iterate over every button.
    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }

    /// Find a button by its callback data.
    pub fn find(&self, data: &str) -> Option<&InlineButton> {
        self.buttons().find(|b| b.data == data)
    }
}

/// Persistent menu keyboard shown under the input field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyKeyboard {
    /// Rows of button labels; tapping sends the label as text.
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    /// Create an empty menu.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row of labels.
    pub fn row<I, T>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.rows.push(labels.into_iter().map(Into::into).collect());
        self
    }
}

/// Markup attached to a new message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Markup {
    /// Inline keyboard.
    Inline(InlineKeyboard),
    /// Menu keyboard.
    Reply(ReplyKeyboard),
    /// Hide the menu keyboard.
    Remove,
}
