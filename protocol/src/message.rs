//! 消息类型定义
//!
//! 消息名与字段名沿用网页端的事件命名（kebab-case / camelCase），
//! 便于基于 JSON 的网关直接对接

use serde::{Deserialize, Serialize};

use crate::cell::{CellUpdate, CellView};
use crate::game::{BoardSize, Difficulty, GameResults, PlayerStats, ProgressSummary};
use crate::room::{PlayerInfo, PlayerProgress, RoomInfo, SpectatorInfo};

/// 玩家/观战者连接 ID
pub type PlayerId = u64;

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientMessage {
    // === 房间操作 ===
    /// 创建房间
    CreateRoom { nickname: Option<String> },
    /// 加入房间（对战位）
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_code: String,
        nickname: Option<String>,
    },
    /// 加入房间（观战位）
    #[serde(rename_all = "camelCase")]
    SpectateRoom {
        room_code: String,
        nickname: Option<String>,
    },
    /// 离开房间
    LeaveRoom,

    // === 对局设置 ===
    /// 设置难度（仅房主）
    SetDifficulty { difficulty: Difficulty },
    /// 切换就绪状态
    PlayerReady,
    /// 开始对局（仅房主）
    StartGame,

    // === 棋盘操作 ===
    /// 左键点击格子
    CellClick { x: u8, y: u8 },
    /// 右键插旗/拔旗
    CellFlag { x: u8, y: u8 },
    /// 双键和弦展开
    CellChord { x: u8, y: u8 },

    // === 再来一局 ===
    /// 请求重开对局
    RequestRematch,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerMessage {
    // === 连接 ===
    /// 连接建立，分配连接 ID
    #[serde(rename_all = "camelCase")]
    Connected { player_id: PlayerId },

    // === 房间事件 ===
    /// 房间创建成功（仅发给房主）
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_code: String, room: RoomInfo },
    /// 加入房间成功（仅发给加入者）
    RoomJoined { room: RoomInfo },
    /// 观战加入成功（仅发给观战者）
    #[serde(rename_all = "camelCase")]
    SpectateJoined {
        room: RoomInfo,
        /// 对局进行中时为两名玩家的棋盘概览，否则为 None
        spectator_view: Option<Vec<PlayerProgress>>,
    },
    /// 新玩家加入（发给房间内其他人）
    PlayerJoined { player: PlayerInfo },
    /// 玩家离开
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId, room: RoomInfo },
    /// 观战者加入
    SpectatorJoined { spectator: SpectatorInfo, count: u8 },
    /// 观战者离开
    #[serde(rename_all = "camelCase")]
    SpectatorLeft { spectator_id: PlayerId, count: u8 },

    // === 对局事件 ===
    /// 难度变更
    DifficultyChanged { difficulty: Difficulty },
    /// 就绪状态变更
    #[serde(rename_all = "camelCase")]
    ReadyChanged { player_id: PlayerId, ready: bool },
    /// 满足开局条件（仅在满足时广播）
    #[serde(rename_all = "camelCase")]
    CanStart { can_start: bool },
    /// 对局开始
    #[serde(rename_all = "camelCase")]
    GameStarted {
        /// 开局时间戳（Unix 毫秒）
        start_time: i64,
        difficulty: Difficulty,
        board_size: BoardSize,
        mine_count: u16,
    },
    /// 己方棋盘更新（仅发给操作者）
    #[serde(rename_all = "camelCase")]
    BoardUpdate {
        /// 本次操作改变的格子
        cells: Vec<CellUpdate>,
        /// 操作者棋盘的完整投影
        player_view: Vec<Vec<CellView>>,
        game_over: bool,
        won: bool,
    },
    /// 对手棋盘进度（发给对手和观战者）
    #[serde(rename_all = "camelCase")]
    OpponentUpdate {
        player_id: PlayerId,
        progress: ProgressSummary,
        stats: PlayerStats,
    },
    /// 对局结束
    GameOver(GameResults),
    /// 重开对局
    RematchStarted { room: RoomInfo },

    // === 错误 ===
    /// 错误消息
    Error { code: ErrorCode, message: String },
}

/// 错误码定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    // === 查找失败 (1xx) ===
    /// 房间不存在
    RoomNotFound = 100,
    /// 玩家不存在
    PlayerNotFound = 101,
    /// 不在房间中
    NotInRoom = 102,

    // === 冲突 (2xx) ===
    /// 房间已满
    RoomFull = 200,
    /// 已在房间中
    AlreadyJoined = 201,
    /// 已在观战
    AlreadySpectating = 202,
    /// 观战人数已满
    TooManySpectators = 203,

    // === 权限 (3xx) ===
    /// 不是房主
    NotHost = 300,

    // === 状态非法 (4xx) ===
    /// 对局进行中
    GameInProgress = 400,
    /// 对局已经开始
    GameAlreadyStarted = 401,
    /// 对局不在进行中
    GameNotInProgress = 402,
    /// 开局条件不满足
    CannotStart = 403,

    // === 参数非法 (5xx) ===
    /// 无效的难度
    InvalidDifficulty = 500,

    // === 系统相关 (9xx) ===
    /// 内部错误
    InternalError = 900,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialize() {
        let msg = ClientMessage::JoinRoom {
            room_code: "AB12CD".to_string(),
            nickname: Some("player1".to_string()),
        };
        let bytes = bincode::serialize(&msg).unwrap();
        let decoded: ClientMessage = bincode::deserialize(&bytes).unwrap();

        match decoded {
            ClientMessage::JoinRoom {
                room_code,
                nickname,
            } => {
                assert_eq!(room_code, "AB12CD");
                assert_eq!(nickname.as_deref(), Some("player1"));
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_server_message_serialize() {
        let msg = ServerMessage::Connected { player_id: 12345 };
        let bytes = bincode::serialize(&msg).unwrap();
        let decoded: ServerMessage = bincode::deserialize(&bytes).unwrap();

        match decoded {
            ServerMessage::Connected { player_id } => assert_eq!(player_id, 12345),
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_client_event_names() {
        let msg = ClientMessage::CellClick { x: 3, y: 7 };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["cell-click"]["x"], 3);
        assert_eq!(json["cell-click"]["y"], 7);

        let msg = ClientMessage::JoinRoom {
            room_code: "AB12CD".to_string(),
            nickname: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["join-room"]["roomCode"], "AB12CD");

        let msg = ClientMessage::PlayerReady;
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, "player-ready");
    }

    #[test]
    fn test_server_event_names() {
        let msg = ServerMessage::ReadyChanged {
            player_id: 7,
            ready: true,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["ready-changed"]["playerId"], 7);
        assert_eq!(json["ready-changed"]["ready"], true);

        let msg = ServerMessage::CanStart { can_start: true };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["can-start"]["canStart"], true);
    }

    #[test]
    fn test_error_message_serialize() {
        let msg = ServerMessage::Error {
            code: ErrorCode::RoomNotFound,
            message: "Room not found".to_string(),
        };
        let bytes = bincode::serialize(&msg).unwrap();
        let decoded: ServerMessage = bincode::deserialize(&bytes).unwrap();

        match decoded {
            ServerMessage::Error { code, message } => {
                assert_eq!(code, ErrorCode::RoomNotFound);
                assert_eq!(message, "Room not found");
            }
            _ => panic!("Wrong message type"),
        }
    }
}
