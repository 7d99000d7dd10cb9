//! 双人扫雷对战服务端
//!
//! 包含:
//! - 房间系统
//! - 同步双盘对局控制
//! - 扫雷棋盘引擎
//! - 观战支持

pub mod board;
pub mod player;
pub mod room;
pub mod server;

pub use board::{Board, FlagOutcome, RevealOutcome};
pub use player::{Player, Spectator};
pub use room::{Room, RoomManager};
pub use server::{MessageHandler, ServerState};
