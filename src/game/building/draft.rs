//! Settings collected by the builder and their keyboards.

use crate::error::HandlerError;
use crate::game::config::{MIN_CATEGORIES, ROUND_CHOICES, SECONDS_CHOICES, yes_no};
use crate::ui::data;
use lexparty_proto::{CallbackData, InlineButton, InlineKeyboard};

/// Builder stages, in wizard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Categories,
    RoundsNum,
    RoundSecs,
    Letters,
    BonusTasks,
    Vote,
    Done,
}

pub static STAGES: [Stage; 7] = [
    Stage::Categories,
    Stage::RoundsNum,
    Stage::RoundSecs,
    Stage::Letters,
    Stage::BonusTasks,
    Stage::Vote,
    Stage::Done,
];

impl Stage {
    /// Toggle stages keep the prompt open; select stages commit and advance.
    pub fn is_toggle(self) -> bool {
        matches!(self, Stage::Categories | Stage::Letters)
    }

    fn columns(self) -> usize {
        match self {
            Stage::Categories => 2,
            Stage::Letters => 6,
            Stage::RoundsNum => ROUND_CHOICES.len(),
            Stage::RoundSecs => SECONDS_CHOICES.len(),
            Stage::BonusTasks | Stage::Vote | Stage::Done => 2,
        }
    }
}

/// Work-in-progress settings.
#[derive(Debug, Clone)]
pub struct Draft {
    pub categories: Vec<(String, bool)>,
    pub letters: Vec<(char, bool)>,
    pub rounds: u32,
    pub round_secs: u32,
    pub bonus: bool,
    pub vote: bool,
}

impl Draft {
    /// Categories start off, letters start on.
    pub fn new(categories: &[String], letters: &[char]) -> Self {
        Self {
            categories: categories.iter().map(|c| (c.clone(), false)).collect(),
            letters: letters.iter().map(|l| (*l, true)).collect(),
            rounds: ROUND_CHOICES[0],
            round_secs: SECONDS_CHOICES[0],
            bonus: false,
            vote: false,
        }
    }

    /// Append an enabled category. An existing name (ignoring case) is
    /// switched on instead. Returns false for blank input.
    pub fn add_category(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let lower = name.to_lowercase();
        match self
            .categories
            .iter_mut()
            .find(|(c, _)| c.to_lowercase() == lower)
        {
            Some((_, on)) => *on = true,
            None => self.categories.push((name.to_string(), true)),
        }
        true
    }

    pub fn enabled_categories(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|(_, on)| *on)
            .map(|(c, _)| c.clone())
            .collect()
    }

    pub fn enabled_letters(&self) -> Vec<char> {
        self.letters
            .iter()
            .filter(|(_, on)| *on)
            .map(|(l, _)| *l)
            .collect()
    }

    /// Apply option `idx` of `stage`. Returns false for an out-of-range
    /// option or a stage without options.
    pub fn choose(&mut self, stage: Stage, idx: usize) -> bool {
        match stage {
            Stage::Categories => flip(self.categories.get_mut(idx).map(|(_, on)| on)),
            Stage::Letters => flip(self.letters.get_mut(idx).map(|(_, on)| on)),
            Stage::RoundsNum => set(&mut self.rounds, ROUND_CHOICES.get(idx)),
            Stage::RoundSecs => set(&mut self.round_secs, SECONDS_CHOICES.get(idx)),
            Stage::BonusTasks => set(&mut self.bonus, yes_no_choice(idx).as_ref()),
            Stage::Vote => set(&mut self.vote, yes_no_choice(idx).as_ref()),
            Stage::Done => false,
        }
    }

    pub fn validate(&self) -> Result<(), HandlerError> {
        if self.enabled_categories().len() < MIN_CATEGORIES {
            return Err(HandlerError::NotEnoughCategories);
        }
        if self.enabled_letters().is_empty() {
            return Err(HandlerError::NoLetters);
        }
        Ok(())
    }

    /// Prompt text for `stage`.
    pub fn prompt(&self, stage: Stage) -> String {
        match stage {
            Stage::Categories => format!(
                "Выберите категории (не меньше {MIN_CATEGORIES}). \
                 Новую категорию можно прислать сообщением."
            ),
            Stage::RoundsNum => "Сколько раундов сыграем?".to_string(),
            Stage::RoundSecs => "Сколько секунд на ход?".to_string(),
            Stage::Letters => "Выберите буквы.".to_string(),
            Stage::BonusTasks => "Включить бонусные задания?".to_string(),
            Stage::Vote => "Голосовать за ответы?".to_string(),
            Stage::Done => {
                let letters: String = self.enabled_letters().into_iter().collect();
                format!(
                    "Проверьте настройки:\n\
                     Раундов: {rounds}, секунд на ход: {secs}\n\
                     Категории: {categories}\n\
                     Буквы: {letters}\n\
                     Бонусные задания: {bonus}\n\
                     Голосование: {vote}",
                    rounds = self.rounds,
                    secs = self.round_secs,
                    categories = self.enabled_categories().join(", "),
                    bonus = yes_no(self.bonus),
                    vote = yes_no(self.vote),
                )
            }
        }
    }

    /// Option buttons of `stage` followed by the navigation row.
    pub fn keyboard(&self, stage: Stage, first: bool, last: bool) -> InlineKeyboard {
        let labels: Vec<String> = match stage {
            Stage::Categories => self
                .categories
                .iter()
                .map(|(c, on)| format!("{} {c}", mark(*on)))
                .collect(),
            Stage::Letters => self
                .letters
                .iter()
                .map(|(l, on)| format!("{} {l}", mark(*on)))
                .collect(),
            Stage::RoundsNum => picked(&ROUND_CHOICES, self.rounds),
            Stage::RoundSecs => picked(&SECONDS_CHOICES, self.round_secs),
            Stage::BonusTasks => yes_no_labels(self.bonus),
            Stage::Vote => yes_no_labels(self.vote),
            Stage::Done => Vec::new(),
        };
        let buttons = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| InlineButton::new(label, option_data(i)))
            .collect();
        let mut kb = InlineKeyboard::grid(buttons, stage.columns());

        let mut nav = Vec::with_capacity(2);
        if !first {
            nav.push(InlineButton::new("« Назад", nav_data(Nav::Prev)));
        }
        if last {
            nav.push(InlineButton::new("Готово", nav_data(Nav::Done)));
        } else {
            nav.push(InlineButton::new("Далее »", nav_data(Nav::Next)));
        }
        kb.push_row(nav);
        kb
    }
}

/// Navigation buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Prev,
    Next,
    Done,
}

impl Nav {
    pub fn as_str(self) -> &'static str {
        match self {
            Nav::Prev => "prev",
            Nav::Next => "next",
            Nav::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prev" => Some(Nav::Prev),
            "next" => Some(Nav::Next),
            "done" => Some(Nav::Done),
            _ => None,
        }
    }
}

pub fn option_data(idx: usize) -> String {
    CallbackData::with_arg(data::OPT, idx).to_string()
}

pub fn nav_data(nav: Nav) -> String {
    CallbackData::with_arg(data::NAV, nav.as_str()).to_string()
}

fn flip(slot: Option<&mut bool>) -> bool {
    match slot {
        Some(on) => {
            *on = !*on;
            true
        }
        None => false,
    }
}

fn set<T: Copy>(slot: &mut T, value: Option<&T>) -> bool {
    match value {
        Some(v) => {
            *slot = *v;
            true
        }
        None => false,
    }
}

fn yes_no_choice(idx: usize) -> Option<bool> {
    match idx {
        0 => Some(true),
        1 => Some(false),
        _ => None,
    }
}

fn mark(on: bool) -> &'static str {
    if on { "✅" } else { "❌" }
}

fn picked(choices: &[u32], current: u32) -> Vec<String> {
    choices
        .iter()
        .map(|c| {
            if *c == current {
                format!("• {c} •")
            } else {
                c.to_string()
            }
        })
        .collect()
}

fn yes_no_labels(current: bool) -> Vec<String> {
    [(true, "Да"), (false, "Нет")]
        .into_iter()
        .map(|(v, label)| {
            if v == current {
                format!("• {label} •")
            } else {
                label.to_string()
            }
        })
        .collect()
}
