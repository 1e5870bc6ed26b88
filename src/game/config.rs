//! Completed match configuration.

use super::bonus::{Bonus, BonusPolicy};
use lexparty_proto::UserId;
use serde::{Deserialize, Serialize};

/// Round counts offered by the builder.
pub const ROUND_CHOICES: [u32; 5] = [1, 2, 3, 4, 5];

/// Round durations offered by the builder, in seconds.
pub const SECONDS_CHOICES: [u32; 3] = [30, 45, 60];

/// Minimum number of enabled categories.
pub const MIN_CATEGORIES: usize = 3;

/// Configuration of a match, fixed once the builder completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub author_id: UserId,
    pub author_name: String,
    pub rounds: u32,
    pub round_secs: u32,
    pub letters: Vec<char>,
    pub categories: Vec<String>,
    pub vote: bool,
    pub bonus_enabled: bool,
    /// Full catalog at creation time. The live remainder is tracked by the
    /// match session.
    #[serde(default)]
    pub bonus: Vec<Bonus>,
    #[serde(default)]
    pub bonus_policy: BonusPolicy,
    pub code: u32,
}

impl MatchConfig {
    /// Human readable summary shown by "settings".
    pub fn summary(&self) -> String {
        let letters: String = self.letters.iter().collect();
        format!(
            "Игра #{code} (ведущий {author})\n\
             Раундов: {rounds}, секунд на ход: {secs}\n\
             Категории: {categories}\n\
             Буквы: {letters}\n\
             Бонусные задания: {bonus}\n\
             Голосование: {vote}",
            code = self.code,
            author = self.author_name,
            rounds = self.rounds,
            secs = self.round_secs,
            categories = self.categories.join(", "),
            bonus = yes_no(self.bonus_enabled),
            vote = yes_no(self.vote),
        )
    }
}

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag { "да" } else { "нет" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_settings() {
        let config = MatchConfig {
            author_id: 1,
            author_name: "Anna".into(),
            rounds: 2,
            round_secs: 45,
            letters: vec!['А', 'Б'],
            categories: vec!["Город".into(), "Имя".into(), "Бренд".into()],
            vote: true,
            bonus_enabled: false,
            bonus: Vec::new(),
            bonus_policy: BonusPolicy::Uniform,
            code: 512,
        };
        let text = config.summary();
        assert!(text.contains("#512"));
        assert!(text.contains("Город, Имя, Бренд"));
        assert!(text.contains("Буквы: АБ"));
        assert!(text.contains("Голосование: да"));
    }
}
