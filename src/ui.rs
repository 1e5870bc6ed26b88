//! User-facing texts, menus and button payloads.
//!
//! Everything the bot says lives here so sessions and handlers only decide
//! *when* to say it.

use crate::db::StatAggregate;
use crate::game::Player;
use crate::state::User;
use lexparty_proto::{InlineKeyboard, ReplyKeyboard};

/// Menu button labels. Tapping one sends the label back as text.
pub mod buttons {
    pub const CREATE: &str = "Создать игру";
    pub const JOIN: &str = "Присоединиться";
    pub const LEAVE: &str = "Покинуть игру";
    pub const RULES: &str = "Правила";
    pub const PROFILE: &str = "Профиль";
    pub const RATING: &str = "Рейтинг";
    pub const START: &str = "Начать игру";
    pub const SETTINGS: &str = "Настройки";
}

/// Inline button callback data.
pub mod data {
    pub const READY: &str = "ready";
    pub const STOP: &str = "stop";
    pub const NOOP: &str = "noop";
    pub const VOTE_UP: &str = "vote:up";
    pub const VOTE_DOWN: &str = "vote:down";
    pub const BONUS_ACK: &str = "bonus:ok";
    /// Builder option toggle, `opt:<index>`.
    pub const OPT: &str = "opt";
    /// Builder navigation, `nav:prev|next|done`.
    pub const NAV: &str = "nav";
}

/// Sticker file ids sent after a turn.
pub mod stickers {
    pub const COMPLETED: &str = "CAACAgIAAxkBAAEBzVlkZ0s1AAHxr2ZlX0kAAWvS5gABm3sAAkgCAAJWnb0KzQ0iYm8sgQcvBA";
    pub const FAILED: &str = "CAACAgIAAxkBAAEBzVtkZ0tLwEXrWcAAAb_DjUOlhAABqQACSQIAAladvQq3gLr4Eefp4i8E";
}

pub const GREETING: &str = "Привет! Это бот для игры в «Слова на букву». \
Создайте игру или присоединитесь к друзьям по коду комнаты.";

pub const RULES: &str = "Правила:\n\
1. Ведущий создаёт игру и сообщает друзьям код комнаты.\n\
2. В каждом раунде игроки ходят по очереди в случайном порядке.\n\
3. На свой ход вы получаете букву и называете по слову на неё в каждой категории.\n\
4. Успели до конца таймера и нажали «Стоп»: оставшиеся секунды становятся очками.\n\
5. Бонусные задания меняют время и добавляют очки, если вы справились.\n\
6. Если включено голосование, остальные игроки решают, засчитать ли ответ.";

pub const HINT: &str = "Не понимаю. Воспользуйтесь меню ниже.";
pub const GROUP_CHAT: &str = "Я работаю только в личных сообщениях.";
pub const BANNED: &str = "Ваш аккаунт заблокирован.";
pub const ASK_CODE: &str = "Введите код комнаты:";
pub const ASK_FEEDBACK: &str = "Напишите отзыв одним сообщением:";
pub const FEEDBACK_THANKS: &str = "Спасибо! Отзыв отправлен.";
pub const ASK_USERNAME: &str = "Введите имя пользователя (например, @anna):";
pub const ASK_CATEGORY: &str = "Введите название новой категории:";
pub const NOT_IN_GAME: &str = "Вы не участвуете в игре.";
pub const LEFT_GAME: &str = "Вы покинули игру.";
pub const ROLLING: &str = "🎲 Бросаем кубик на бонусное задание...";
pub const NO_BONUS: &str = "🎲 В этот раз без бонуса.";
pub const READY_PROMPT: &str = "Ваш ход! Нажмите «Готов», когда будете готовы.";
pub const READY_NAG: &str = "Ваш ход ждёт! Нажмите «Готов», иначе ход будет пропущен.";
pub const LETTER_PENDING: &str = "Выбираем букву...";
pub const GO: &str = "Поехали!";
pub const BUILDING_EXPIRED: &str = "Время на создание игры истекло.";
pub const MATCH_EXPIRED: &str = "Время игры истекло, комната закрыта.";
pub const MATCH_ABORTED: &str = "Игра отменена.";

pub fn main_menu() -> ReplyKeyboard {
    ReplyKeyboard::new()
        .row([buttons::CREATE, buttons::JOIN])
        .row([buttons::PROFILE, buttons::RULES])
}

pub fn host_menu() -> ReplyKeyboard {
    ReplyKeyboard::new()
        .row([buttons::START, buttons::SETTINGS])
        .row([buttons::RATING, buttons::LEAVE])
}

pub fn player_menu() -> ReplyKeyboard {
    ReplyKeyboard::new()
        .row([buttons::RATING, buttons::SETTINGS])
        .row([buttons::LEAVE])
}

pub fn ready_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row([("Готов", data::READY)])
}

pub fn bonus_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row([("Принято", data::BONUS_ACK)])
}

pub fn timer_keyboard(secs_left: u32) -> InlineKeyboard {
    InlineKeyboard::new()
        .row([(format!("⏱ {secs_left}"), data::NOOP)])
        .row([("Стоп", data::STOP)])
}

pub fn vote_keyboard(up: usize, down: usize) -> InlineKeyboard {
    InlineKeyboard::new().row([
        (format!("👍 {up}"), data::VOTE_UP),
        (format!("👎 {down}"), data::VOTE_DOWN),
    ])
}

pub fn room_created(code: u32) -> String {
    format!("Игра создана! Код комнаты: {code}\nПоделитесь им с игроками и нажмите «Начать игру», когда все соберутся.")
}

pub fn joined(code: u32) -> String {
    format!("Вы в игре #{code}. Ждём начала.")
}

pub fn player_joined(name: &str) -> String {
    format!("{name} присоединился к игре.")
}

pub fn player_left(name: &str) -> String {
    format!("{name} покинул игру.")
}

pub fn match_started(round: u32, rounds: u32) -> String {
    format!("Игра началась! Раунд {round} из {rounds}.")
}

pub fn bonus_drawn(name: &str, description: &str) -> String {
    format!("🎁 Бонусное задание «{name}»\n{description}")
}

pub fn letter(l: char) -> String {
    format!("Ваша буква: {l}")
}

pub fn countdown(n: u32) -> String {
    format!("{n}...")
}

pub fn timer_started(l: char, categories: &[String]) -> String {
    format!(
        "Буква {l}. Категории: {}\nНажмите «Стоп», как только закончите.",
        categories.join(", ")
    )
}

pub fn timer_stopped(secs_left: u32) -> String {
    if secs_left == 0 {
        "Время вышло!".to_string()
    } else {
        format!("Стоп! Осталось секунд: {secs_left}")
    }
}

pub fn turn_announce(name: &str, l: char, categories: &[String]) -> String {
    format!(
        "Ходит {name}. Буква {l}. Категории: {}",
        categories.join(", ")
    )
}

pub fn ready_nag_others(name: &str) -> String {
    format!("Ждём, пока {name} нажмёт «Готов».")
}

pub fn skipped(name: &str) -> String {
    format!("{name} не ответил и пропускает игру.")
}

pub fn vote_prompt(name: &str, l: char) -> String {
    format!("Засчитать ответ {name} на букву {l}?")
}

pub fn vote_closed(up: usize, down: usize, accepted: bool) -> String {
    let verdict = if accepted { "ответ засчитан" } else { "ответ не засчитан" };
    format!("Голосование завершено: 👍 {up} 👎 {down}, {verdict}.")
}

pub fn score(name: &str, points: i64) -> String {
    format!("{name} получает {points} очк.")
}

pub fn round_closed(round: u32) -> String {
    format!("Раунд {round} закрыт.")
}

/// Leaderboard sorted by total points.
pub fn rating(players: &[Player]) -> String {
    let mut rows: Vec<(&str, i64)> = players
        .iter()
        .map(|p| (p.name.as_str(), p.total_points()))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    if rows.is_empty() {
        return "Пока нет игроков.".to_string();
    }
    let mut out = String::from("Рейтинг:");
    for (i, (name, points)) in rows.iter().enumerate() {
        out.push_str(&format!("\n{}. {name}: {points}", i + 1));
    }
    out
}

pub fn results(players: &[Player], favorites: &[String]) -> String {
    let mut out = String::from("Игра окончена!\n");
    out.push_str(&rating(players));
    if !favorites.is_empty() {
        out.push_str(&format!("\nПобедители: {}", favorites.join(", ")));
    }
    out
}

pub fn feedback_for_admin(from: &str, text: &str) -> String {
    format!("Отзыв от {from}:\n{text}")
}

pub fn banned(name: &str) -> String {
    format!("Пользователь {name} заблокирован.")
}

pub fn category_added(name: &str) -> String {
    format!("Категория «{name}» добавлена.")
}

pub fn profile(user: &User, stats: &StatAggregate) -> String {
    let mut out = format!(
        "Профиль {name}\nИгр: {games}, побед: {wins}, звёзд: {stars}",
        name = user.display_name(),
        games = stats.games,
        wins = stats.wins,
        stars = user.stars,
    );
    if stats.games > 0 {
        out.push_str(&format!(
            "\nОчки за ход: лучший {best}, худший {worst}, в среднем {avg:.1}",
            best = stats.points.best,
            worst = stats.points.worst,
            avg = stats.points.avg,
        ));
    }
    if stats.duration.best_ms > 0 {
        out.push_str(&format!(
            "\nСамый быстрый ответ: {:.1} с",
            stats.duration.best_ms as f64 / 1000.0
        ));
    }
    if !stats.bonus_names.is_empty() {
        let names: Vec<&str> = stats.bonus_names.iter().map(String::as_str).collect();
        out.push_str(&format!("\nБонусы: {}", names.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Rate;

    #[test]
    fn rating_sorts_by_points() {
        let mut a = Player::new(1, 1, "Anna");
        a.rates.push(Rate {
            points: 5,
            ..Rate::missed()
        });
        let mut b = Player::new(2, 2, "Boris");
        b.rates.push(Rate {
            points: 12,
            ..Rate::missed()
        });
        let text = rating(&[a, b]);
        let anna = text.find("Anna").unwrap();
        let boris = text.find("Boris").unwrap();
        assert!(boris < anna);
        assert!(text.contains("1. Boris: 12"));
    }

    #[test]
    fn timer_keyboard_has_stop() {
        let kb = timer_keyboard(17);
        assert!(kb.find(data::STOP).is_some());
        assert_eq!(kb.rows[0][0].text, "⏱ 17");
    }
}
