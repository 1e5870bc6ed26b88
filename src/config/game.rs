//! Builder defaults and the bonus catalog.

use serde::Deserialize;

use crate::game::{Bonus, BonusPolicy};

/// Game defaults offered by the match builder.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// How a bonus is drawn from the remaining catalog.
    #[serde(default)]
    pub bonus_policy: BonusPolicy,
    /// Categories listed by the builder (all initially off).
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// Letters listed by the builder (all initially on).
    #[serde(default = "default_alphabet")]
    pub alphabet: String,
    /// Bonus catalog copied into every match with bonuses enabled.
    #[serde(default = "default_bonus_catalog")]
    pub bonus: Vec<Bonus>,
}

impl GameConfig {
    /// Distinct letters of the alphabet, in order.
    pub fn letters(&self) -> Vec<char> {
        let mut letters: Vec<char> = Vec::new();
        for c in self.alphabet.chars().filter(|c| !c.is_whitespace()) {
            if !letters.contains(&c) {
                letters.push(c);
            }
        }
        letters
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            bonus_policy: BonusPolicy::default(),
            categories: default_categories(),
            alphabet: default_alphabet(),
            bonus: default_bonus_catalog(),
        }
    }
}

fn default_categories() -> Vec<String> {
    [
        "Город",
        "Страна",
        "Имя",
        "Животное",
        "Растение",
        "Профессия",
        "Бренд",
        "Еда",
        "Фильм",
        "Предмет быта",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_alphabet() -> String {
    "АБВГДЕЖЗИКЛМНОПРСТУФХЦЧШЭЮЯ".to_string()
}

fn default_bonus_catalog() -> Vec<Bonus> {
    vec![
        Bonus::new(
            "Шёпот",
            "Отвечай только шёпотом. Зато получишь лишние 10 секунд.",
            10,
            0,
            1.0,
        ),
        Bonus::new(
            "Спринтер",
            "На ответы на 10 секунд меньше, но за успех +5 очков.",
            -10,
            5,
            1.0,
        ),
        Bonus::new(
            "Акцент",
            "Говори с акцентом, который выберут соперники. +3 очка за успех.",
            0,
            3,
            0.8,
        ),
        Bonus::new(
            "Стоя",
            "Отвечай стоя на одной ноге. +5 секунд и +2 очка.",
            5,
            2,
            0.6,
        ),
        Bonus::new(
            "Рифма",
            "Каждый ответ должен рифмоваться с предыдущим. +7 очков.",
            0,
            7,
            0.3,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alphabet_has_no_duplicates() {
        let config = GameConfig::default();
        let letters = config.letters();
        assert_eq!(letters.len(), config.alphabet.chars().count());
        assert_eq!(letters.first(), Some(&'А'));
    }

    #[test]
    fn letters_skip_spaces_and_repeats() {
        let config = GameConfig {
            alphabet: "А Б А В".to_string(),
            ..GameConfig::default()
        };
        assert_eq!(config.letters(), vec!['А', 'Б', 'В']);
    }

    #[test]
    fn bonus_tables_are_parsed() {
        let toml = r#"
bonus_policy = "weighted"
categories = ["City", "Name", "Brand"]
alphabet = "ABC"

[[bonus]]
name = "Whisper"
description = "Answer in a whisper"
seconds = 10
points = 5
weight = 2.0
"#;
        let config: GameConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bonus_policy, BonusPolicy::Weighted);
        assert_eq!(config.categories.len(), 3);
        assert_eq!(config.bonus.len(), 1);
        assert_eq!(config.bonus[0].seconds, 10);
        assert_eq!(config.bonus[0].points, 5);
    }

    #[test]
    fn default_catalog_is_not_empty() {
        let config = GameConfig::default();
        assert_eq!(config.bonus_policy, BonusPolicy::Uniform);
        assert!(!config.bonus.is_empty());
        assert!(config.bonus.iter().all(|b| b.weight > 0.0));
    }
}
