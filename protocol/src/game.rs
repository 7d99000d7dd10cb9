//! 对局数据定义

use serde::{Deserialize, Serialize};

use crate::cell::{CellView, Position};
use crate::message::PlayerId;

/// 难度预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// 初级：9×9，10 雷
    Beginner,
    /// 中级：16×16，40 雷
    Intermediate,
    /// 高级：30×16，99 雷
    Expert,
}

impl Difficulty {
    /// 预设参数：（宽，高，雷数）
    pub const fn preset(self) -> (u8, u8, u16) {
        match self {
            Difficulty::Beginner => (9, 9, 10),
            Difficulty::Intermediate => (16, 16, 40),
            Difficulty::Expert => (30, 16, 99),
        }
    }

    /// 棋盘尺寸
    pub fn board_size(self) -> BoardSize {
        let (width, height, _) = self.preset();
        BoardSize { width, height }
    }

    /// 地雷总数
    pub fn mine_count(self) -> u16 {
        self.preset().2
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Beginner
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Expert => "expert",
        };
        write!(f, "{}", name)
    }
}

/// 棋盘尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSize {
    pub width: u8,
    pub height: u8,
}

/// 玩家操作统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// 累计点击次数
    pub clicks: u32,
    /// 当前旗数（拔旗会减回去）
    pub flags: i32,
}

/// 进度摘要
///
/// 发给对手和观战者的脱敏视图，只含格子坐标，不含雷数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    /// 完成百分比（0-100，四舍五入）
    pub progress: u8,
    /// 已翻开的安全格子数
    pub revealed: u16,
    /// 安全格子总数
    pub total_safe: u16,
    /// 当前插旗数
    pub flagged: u16,
    /// 已翻开格子的坐标
    pub revealed_positions: Vec<Position>,
    /// 已插旗格子的坐标
    pub flagged_positions: Vec<Position>,
}

/// 对局结束原因（从失败方视角描述）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// 获胜方翻开了全部安全格子
    Completed,
    /// 失败方踩雷
    HitMine,
    /// 对手离开房间
    OpponentLeft,
}

/// 单个玩家的终局数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    pub id: PlayerId,
    pub nickname: String,
    pub won: bool,
    pub stats: PlayerStats,
    pub progress: ProgressSummary,
    /// 终局亮出的完整棋盘（含地雷位置）
    pub full_board: Vec<Vec<CellView>>,
}

/// 对局结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResults {
    /// 获胜方 ID
    pub winner: PlayerId,
    pub reason: GameOverReason,
    /// 对局时长（毫秒）
    pub duration: u64,
    pub players: Vec<PlayerResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_presets() {
        assert_eq!(Difficulty::Beginner.preset(), (9, 9, 10));
        assert_eq!(Difficulty::Intermediate.preset(), (16, 16, 40));
        assert_eq!(Difficulty::Expert.preset(), (30, 16, 99));
    }

    #[test]
    fn test_difficulty_names() {
        let json = serde_json::to_value(&Difficulty::Intermediate).unwrap();
        assert_eq!(json, "intermediate");

        let parsed: Difficulty = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, Difficulty::Intermediate);
    }

    #[test]
    fn test_game_over_reason_names() {
        assert_eq!(
            serde_json::to_value(&GameOverReason::HitMine).unwrap(),
            "hit_mine"
        );
        assert_eq!(
            serde_json::to_value(&GameOverReason::OpponentLeft).unwrap(),
            "opponent_left"
        );
    }

    #[test]
    fn test_progress_summary_field_names() {
        let summary = ProgressSummary {
            progress: 50,
            revealed: 10,
            total_safe: 20,
            flagged: 3,
            revealed_positions: vec![Position::new(0, 0)],
            flagged_positions: vec![],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalSafe"], 20);
        assert!(json["revealedPositions"].is_array());
        assert!(json["flaggedPositions"].is_array());
    }
}
