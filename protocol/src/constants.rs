//! 协议常量定义

use std::time::Duration;

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 房间码长度
pub const ROOM_CODE_LEN: usize = 6;

/// 房间码字符表（大写字母 + 数字）
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 每个房间的对战玩家数上限
pub const MAX_PLAYERS: usize = 2;

/// 每个房间的观战者数上限
pub const MAX_SPECTATORS: usize = 10;

/// 昵称最大长度
pub const MAX_NICKNAME_LEN: usize = 20;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 服务端最大连接数
pub const MAX_CONNECTIONS: usize = 100;

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 3001;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
