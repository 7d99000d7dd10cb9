//! 房间信息定义

use serde::{Deserialize, Serialize};

use crate::game::{Difficulty, PlayerStats, ProgressSummary};
use crate::message::PlayerId;

/// 房间状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// 等待玩家加入并就绪
    Waiting,
    /// 对局进行中
    Playing,
    /// 对局已结束
    Finished,
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Playing => "playing",
            RoomStatus::Finished => "finished",
        };
        write!(f, "{}", name)
    }
}

/// 房间内的玩家信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub nickname: String,
    pub ready: bool,
    /// 对局开始前为 None
    pub progress: Option<ProgressSummary>,
}

/// 观战者信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectatorInfo {
    pub id: PlayerId,
    pub nickname: String,
}

/// 观战视图中单个玩家的棋盘概览
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub id: PlayerId,
    pub nickname: String,
    pub progress: Option<ProgressSummary>,
    pub stats: PlayerStats,
}

/// 房间信息
///
/// 不含任何棋盘内部数据，可以原样发给客户端
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub code: String,
    /// 房主 ID
    pub host: PlayerId,
    pub players: Vec<PlayerInfo>,
    pub spectators: Vec<SpectatorInfo>,
    pub spectator_count: u8,
    pub difficulty: Difficulty,
    pub status: RoomStatus,
    /// 开局时间戳（Unix 毫秒），未开局为 None
    pub start_time: Option<i64>,
}
