//! 玩家与观战者

use chrono::{DateTime, Utc};

use protocol::{PlayerId, PlayerInfo, PlayerStats, SpectatorInfo, MAX_NICKNAME_LEN};

use crate::board::Board;

/// 规范化昵称：空昵称用默认值，超长部分截断
fn normalize_nickname(nickname: Option<String>, default_name: &str) -> String {
    let name = match nickname {
        Some(n) if !n.is_empty() => n,
        _ => default_name.to_string(),
    };
    if name.chars().count() > MAX_NICKNAME_LEN {
        name.chars().take(MAX_NICKNAME_LEN).collect()
    } else {
        name
    }
}

/// 对战玩家
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub ready: bool,
    /// 对局开始后持有己方棋盘
    pub board: Option<Board>,
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(id: PlayerId, nickname: Option<String>, default_name: &str) -> Self {
        Self {
            id,
            nickname: normalize_nickname(nickname, default_name),
            ready: false,
            board: None,
            stats: PlayerStats::default(),
        }
    }

    /// 房间信息中的玩家条目
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            nickname: self.nickname.clone(),
            ready: self.ready,
            progress: self.board.as_ref().map(|b| b.progress()),
        }
    }
}

/// 观战者
#[derive(Debug, Clone)]
pub struct Spectator {
    pub id: PlayerId,
    pub nickname: String,
    pub joined_at: DateTime<Utc>,
}

impl Spectator {
    pub fn new(id: PlayerId, nickname: Option<String>) -> Self {
        Self {
            id,
            nickname: normalize_nickname(nickname, "Spectator"),
            joined_at: Utc::now(),
        }
    }

    pub fn info(&self) -> SpectatorInfo {
        SpectatorInfo {
            id: self.id,
            nickname: self.nickname.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_nickname() {
        let p = Player::new(1, None, "Player 1");
        assert_eq!(p.nickname, "Player 1");

        let p = Player::new(2, Some("".to_string()), "Player 2");
        assert_eq!(p.nickname, "Player 2");

        let p = Player::new(3, Some("Alice".to_string()), "Player 1");
        assert_eq!(p.nickname, "Alice");
    }

    #[test]
    fn test_nickname_truncated() {
        let long = "x".repeat(MAX_NICKNAME_LEN + 5);
        let p = Player::new(1, Some(long), "Player 1");
        assert_eq!(p.nickname.chars().count(), MAX_NICKNAME_LEN);
    }

    #[test]
    fn test_player_info_before_game() {
        let p = Player::new(1, Some("Alice".to_string()), "Player 1");
        let info = p.info();

        assert_eq!(info.id, 1);
        assert!(!info.ready);
        assert!(info.progress.is_none());
    }

    #[test]
    fn test_spectator_default_nickname() {
        let s = Spectator::new(9, None);
        assert_eq!(s.nickname, "Spectator");
    }
}
