//! 错误类型定义

use thiserror::Error;

use crate::message::ErrorCode;

/// 房间/对局操作错误
///
/// 错误文案原样下发给客户端展示
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// 房间不存在
    #[error("Room not found")]
    RoomNotFound,

    /// 对局已经开始，无法加入
    #[error("Game already in progress")]
    GameInProgress,

    /// 房间已满
    #[error("Room is full")]
    RoomFull,

    /// 已经在房间里
    #[error("Already in room")]
    AlreadyJoined,

    /// 观战人数已满
    #[error("Too many spectators")]
    TooManySpectators,

    /// 已经在观战
    #[error("Already spectating")]
    AlreadySpectating,

    /// 不是房主
    #[error("Not the host")]
    NotHost,

    /// 对局已经开始，无法修改设置
    #[error("Game already started")]
    GameAlreadyStarted,

    /// 无效的难度
    #[error("Invalid difficulty")]
    InvalidDifficulty,

    /// 玩家不在房间里
    #[error("Player not in room")]
    PlayerNotInRoom,

    /// 对局不在进行中
    #[error("Game not in progress")]
    GameNotInProgress,

    /// 棋盘尚未创建
    #[error("Game not initialized")]
    GameNotInitialized,

    /// 开局条件不满足
    #[error("Cannot start game")]
    CannotStart,

    /// 不在任何房间里
    #[error("Not in a room")]
    NotInRoom,
}

impl RoomError {
    /// 对应的错误码
    pub fn code(&self) -> ErrorCode {
        match self {
            RoomError::RoomNotFound => ErrorCode::RoomNotFound,
            RoomError::GameInProgress => ErrorCode::GameInProgress,
            RoomError::RoomFull => ErrorCode::RoomFull,
            RoomError::AlreadyJoined => ErrorCode::AlreadyJoined,
            RoomError::TooManySpectators => ErrorCode::TooManySpectators,
            RoomError::AlreadySpectating => ErrorCode::AlreadySpectating,
            RoomError::NotHost => ErrorCode::NotHost,
            RoomError::GameAlreadyStarted => ErrorCode::GameAlreadyStarted,
            RoomError::InvalidDifficulty => ErrorCode::InvalidDifficulty,
            RoomError::PlayerNotInRoom => ErrorCode::PlayerNotFound,
            RoomError::GameNotInProgress => ErrorCode::GameNotInProgress,
            RoomError::GameNotInitialized => ErrorCode::GameNotInProgress,
            RoomError::CannotStart => ErrorCode::CannotStart,
            RoomError::NotInRoom => ErrorCode::NotInRoom,
        }
    }
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误（bincode）
    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_error_messages() {
        assert_eq!(RoomError::RoomNotFound.to_string(), "Room not found");
        assert_eq!(RoomError::RoomFull.to_string(), "Room is full");
        assert_eq!(RoomError::NotHost.to_string(), "Not the host");
        assert_eq!(RoomError::CannotStart.to_string(), "Cannot start game");
        assert_eq!(RoomError::NotInRoom.to_string(), "Not in a room");
    }

    #[test]
    fn test_room_error_codes() {
        assert_eq!(RoomError::RoomNotFound.code(), ErrorCode::RoomNotFound);
        assert_eq!(RoomError::GameInProgress.code(), ErrorCode::GameInProgress);
        assert_eq!(RoomError::PlayerNotInRoom.code(), ErrorCode::PlayerNotFound);
    }
}
