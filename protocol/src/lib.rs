//! 双人扫雷对战共享协议库
//!
//! 包含:
//! - 格子坐标与对外视图（CellView, CellUpdate）
//! - 难度预设、进度摘要和对局结果
//! - 房间信息（RoomInfo, RoomStatus）
//! - 消息类型定义 (ClientMessage, ServerMessage)
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 帧编解码 (FrameReader, FrameWriter)

mod cell;
mod constants;
mod error;
mod game;
mod message;
mod room;
mod transport;

pub use cell::{CellUpdate, CellView, Position};
pub use constants::*;
pub use error::{ProtocolError, Result, RoomError};
pub use game::{
    BoardSize, Difficulty, GameOverReason, GameResults, PlayerResult, PlayerStats,
    ProgressSummary,
};
pub use message::{ClientMessage, ErrorCode, PlayerId, ServerMessage};
pub use room::{PlayerInfo, PlayerProgress, RoomInfo, RoomStatus, SpectatorInfo};
pub use transport::{
    Connection, Connector, FrameReader, FrameWriter, Listener, TcpConnection, TcpConnector,
    TcpListener,
};
