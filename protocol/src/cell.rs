//! 格子坐标与对外视图

use serde::{Deserialize, Serialize};

/// 格子坐标
///
/// 棋盘尺寸随难度变化，边界检查由棋盘自身负责
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 列
    pub x: u8,
    /// 行
    pub y: u8,
}

impl Position {
    /// 创建新坐标
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 单个格子的对外投影
///
/// 未翻开的格子不暴露雷数和是否有雷（两个字段为 None），
/// 保证客户端拿不到可以作弊的信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub x: u8,
    pub y: u8,
    pub revealed: bool,
    pub flagged: bool,
    pub adjacent_mines: Option<u8>,
    pub is_mine: Option<bool>,
}

/// 棋盘更新中的单格增量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdate {
    pub x: u8,
    pub y: u8,
    pub adjacent_mines: Option<u8>,
    pub is_mine: Option<bool>,
    pub flagged: Option<bool>,
}

impl CellUpdate {
    /// 翻开的安全格子
    pub fn revealed_safe(x: u8, y: u8, adjacent_mines: u8) -> Self {
        Self {
            x,
            y,
            adjacent_mines: Some(adjacent_mines),
            is_mine: Some(false),
            flagged: None,
        }
    }

    /// 翻开的地雷格子
    pub fn revealed_mine(x: u8, y: u8) -> Self {
        Self {
            x,
            y,
            adjacent_mines: None,
            is_mine: Some(true),
            flagged: None,
        }
    }

    /// 插旗状态变更
    pub fn flag(x: u8, y: u8, flagged: bool) -> Self {
        Self {
            x,
            y,
            adjacent_mines: None,
            is_mine: None,
            flagged: Some(flagged),
        }
    }
}
