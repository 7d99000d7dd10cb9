//! 房间系统
//!
//! Room 承载单个房间的对局规则（就绪、开局、点击、终局、重开），
//! RoomManager 维护房间注册表和参与者反查索引

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;

use protocol::{
    CellView, Difficulty, GameOverReason, GameResults, PlayerId, PlayerProgress, PlayerResult,
    PlayerStats, ProgressSummary, RoomError, RoomInfo, RoomStatus, MAX_PLAYERS, MAX_SPECTATORS,
    ROOM_CODE_ALPHABET, ROOM_CODE_LEN,
};

use crate::board::{Board, FlagOutcome, RevealOutcome};
use crate::player::{Player, Spectator};

/// 翻开类操作（点击 / 和弦）经房间处理后的完整结果
#[derive(Debug, Clone)]
pub struct ClickResult {
    pub reveal: RevealOutcome,
    pub stats: PlayerStats,
    pub player_view: Vec<Vec<CellView>>,
    pub progress: ProgressSummary,
}

/// 插旗操作经房间处理后的完整结果
#[derive(Debug, Clone)]
pub struct FlagResult {
    pub flag: FlagOutcome,
    pub stats: PlayerStats,
    pub player_view: Vec<Vec<CellView>>,
    pub progress: ProgressSummary,
}

/// 离开房间的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// 观战者离开
    Spectator { room_code: String },
    /// 最后一名玩家离开，房间已删除
    RoomDeleted { room_code: String },
    /// 玩家离开，房间仍在
    Player {
        room_code: String,
        /// 对局因离开而结束时为剩下玩家的 ID
        winner: Option<PlayerId>,
    },
}

/// 房间
pub struct Room {
    pub code: String,
    /// 房主（创建者，离开时移交给剩下的玩家）
    pub host: PlayerId,
    pub players: Vec<Player>,
    pub spectators: Vec<Spectator>,
    pub difficulty: Difficulty,
    pub status: RoomStatus,
    /// 开局时间
    pub start_time: Option<DateTime<Utc>>,
}

impl Room {
    /// 创建新房间，创建者即房主和第一名玩家
    pub fn new(code: String, host_id: PlayerId, nickname: Option<String>) -> Self {
        Self {
            code,
            host: host_id,
            players: vec![Player::new(host_id, nickname, "Player 1")],
            spectators: Vec::new(),
            difficulty: Difficulty::default(),
            status: RoomStatus::Waiting,
            start_time: None,
        }
    }

    /// 房间信息（可安全下发给客户端）
    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code.clone(),
            host: self.host,
            players: self.players.iter().map(|p| p.info()).collect(),
            spectators: self.spectators.iter().map(|s| s.info()).collect(),
            spectator_count: self.spectators.len() as u8,
            difficulty: self.difficulty,
            status: self.status,
            start_time: self.start_time.map(|t| t.timestamp_millis()),
        }
    }

    /// 观战视图：对局进行中时两名玩家的棋盘概览
    pub fn spectator_view(&self) -> Option<Vec<PlayerProgress>> {
        if self.status != RoomStatus::Playing {
            return None;
        }
        Some(
            self.players
                .iter()
                .map(|p| PlayerProgress {
                    id: p.id,
                    nickname: p.nickname.clone(),
                    progress: p.board.as_ref().map(|b| b.progress()),
                    stats: p.stats,
                })
                .collect(),
        )
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn has_spectator(&self, participant_id: PlayerId) -> bool {
        self.spectators.iter().any(|s| s.id == participant_id)
    }

    /// 获取对手 ID
    pub fn opponent_id(&self, player_id: PlayerId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.id != player_id)
            .map(|p| p.id)
    }

    /// 玩家加入
    pub fn add_player(&mut self, player_id: PlayerId, nickname: Option<String>) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameInProgress);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        if self.has_player(player_id) {
            return Err(RoomError::AlreadyJoined);
        }

        self.players
            .push(Player::new(player_id, nickname, "Player 2"));
        Ok(())
    }

    /// 观战者加入
    pub fn add_spectator(
        &mut self,
        spectator_id: PlayerId,
        nickname: Option<String>,
    ) -> Result<(), RoomError> {
        if self.spectators.len() >= MAX_SPECTATORS {
            return Err(RoomError::TooManySpectators);
        }
        if self.has_spectator(spectator_id) {
            return Err(RoomError::AlreadySpectating);
        }

        self.spectators.push(Spectator::new(spectator_id, nickname));
        Ok(())
    }

    /// 切换就绪状态，返回新状态
    pub fn toggle_ready(&mut self, player_id: PlayerId) -> Result<bool, RoomError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(RoomError::PlayerNotInRoom)?;

        player.ready = !player.ready;
        Ok(player.ready)
    }

    /// 设置难度（仅房主，开局前）
    pub fn set_difficulty(
        &mut self,
        player_id: PlayerId,
        difficulty: Difficulty,
    ) -> Result<(), RoomError> {
        if self.host != player_id {
            return Err(RoomError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }

        self.difficulty = difficulty;
        Ok(())
    }

    /// 是否满足开局条件：两名玩家且全部就绪
    pub fn can_start(&self) -> bool {
        self.players.len() == MAX_PLAYERS && self.players.iter().all(|p| p.ready)
    }

    /// 开始对局：为每名玩家创建空棋盘并清零统计
    pub fn start_game(&mut self) -> Result<(), RoomError> {
        if !self.can_start() {
            return Err(RoomError::CannotStart);
        }

        for player in &mut self.players {
            player.board = Some(Board::new(self.difficulty));
            player.stats = PlayerStats::default();
        }
        self.status = RoomStatus::Playing;
        self.start_time = Some(Utc::now());
        Ok(())
    }

    /// 首次点击时在己方棋盘布雷，并把雷区布局同步给对手
    ///
    /// 双方扫同一张图：对手棋盘按值拷贝格子数据、清掉操作状态，
    /// 之后两块棋盘各自独立演化
    fn sync_first_click(&mut self, player_idx: usize, x: u8, y: u8) {
        if let Some(board) = self.players[player_idx].board.as_mut() {
            board.initialize(x, y);
        }

        let source = match self.players[player_idx].board.clone() {
            Some(b) => b,
            None => return,
        };
        let player_id = self.players[player_idx].id;

        for other in self.players.iter_mut().filter(|p| p.id != player_id) {
            if let Some(board) = other.board.as_mut() {
                if !board.is_initialized() {
                    board.sync_layout_from(&source);
                }
            }
        }
    }

    fn player_index(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        self.players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(RoomError::PlayerNotInRoom)
    }

    /// 处理左键点击
    ///
    /// 点击计入统计后才翻格子，点到旗子等无效操作也会消耗一次点击数
    pub fn handle_click(
        &mut self,
        player_id: PlayerId,
        x: u8,
        y: u8,
    ) -> Result<ClickResult, RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::GameNotInProgress);
        }

        let idx = self.player_index(player_id)?;
        match &self.players[idx].board {
            Some(board) if !board.is_initialized() => self.sync_first_click(idx, x, y),
            Some(_) => {}
            None => return Err(RoomError::GameNotInitialized),
        }

        let player = &mut self.players[idx];
        player.stats.clicks += 1;

        let board = match player.board.as_mut() {
            Some(b) => b,
            None => return Err(RoomError::GameNotInitialized),
        };
        let reveal = board.reveal(x, y);

        Ok(ClickResult {
            reveal,
            stats: player.stats,
            player_view: board.player_view(),
            progress: board.progress(),
        })
    }

    /// 处理插旗 / 拔旗
    pub fn handle_flag(
        &mut self,
        player_id: PlayerId,
        x: u8,
        y: u8,
    ) -> Result<FlagResult, RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::GameNotInProgress);
        }

        let idx = self.player_index(player_id)?;
        let player = &mut self.players[idx];
        let board = match player.board.as_mut() {
            Some(b) => b,
            None => return Err(RoomError::GameNotInitialized),
        };

        let flag = board.toggle_flag(x, y);
        if flag.success {
            player.stats.flags += if flag.flagged { 1 } else { -1 };
        }

        Ok(FlagResult {
            flag,
            stats: player.stats,
            player_view: board.player_view(),
            progress: board.progress(),
        })
    }

    /// 处理和弦展开
    pub fn handle_chord(
        &mut self,
        player_id: PlayerId,
        x: u8,
        y: u8,
    ) -> Result<ClickResult, RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::GameNotInProgress);
        }

        let idx = self.player_index(player_id)?;
        let player = &mut self.players[idx];
        player.stats.clicks += 1;

        let board = match player.board.as_mut() {
            Some(b) => b,
            None => return Err(RoomError::GameNotInitialized),
        };
        let reveal = board.chord(x, y);

        Ok(ClickResult {
            reveal,
            stats: player.stats,
            player_view: board.player_view(),
            progress: board.progress(),
        })
    }

    /// 结束对局并生成结果
    pub fn end_game(&mut self, winner: PlayerId, reason: GameOverReason) -> GameResults {
        self.status = RoomStatus::Finished;

        let duration = self
            .start_time
            .map(|t| (Utc::now() - t).num_milliseconds().max(0) as u64)
            .unwrap_or(0);

        GameResults {
            winner,
            reason,
            duration,
            players: self
                .players
                .iter()
                .map(|p| PlayerResult {
                    id: p.id,
                    nickname: p.nickname.clone(),
                    won: p.id == winner,
                    stats: p.stats,
                    progress: p
                        .board
                        .as_ref()
                        .map(|b| b.progress())
                        .unwrap_or_else(empty_progress),
                    full_board: p
                        .board
                        .as_ref()
                        .map(|b| b.full_board())
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// 重置房间准备再来一局
    ///
    /// 难度与观战者保留，玩家回到未就绪状态
    pub fn reset_for_rematch(&mut self) {
        self.status = RoomStatus::Waiting;
        self.start_time = None;
        for player in &mut self.players {
            player.ready = false;
            player.board = None;
            player.stats = PlayerStats::default();
        }
    }

    /// 房间内全部参与者（玩家 + 观战者）的 ID
    pub fn participant_ids(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .map(|p| p.id)
            .chain(self.spectators.iter().map(|s| s.id))
            .collect()
    }
}

fn empty_progress() -> ProgressSummary {
    ProgressSummary {
        progress: 0,
        revealed: 0,
        total_safe: 0,
        flagged: 0,
        revealed_positions: Vec::new(),
        flagged_positions: Vec::new(),
    }
}

/// 房间管理器
pub struct RoomManager {
    rooms: HashMap<String, Room>,
    /// 参与者（玩家或观战者）ID -> 房间码
    participant_rooms: HashMap<PlayerId, String>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            participant_rooms: HashMap::new(),
        }
    }

    /// 生成唯一的 6 位房间码（大写字母 + 数字，撞码重抽）
    fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..ROOM_CODE_LEN)
                .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    /// 创建房间，返回房间码
    pub fn create_room(&mut self, host_id: PlayerId, nickname: Option<String>) -> String {
        let code = self.generate_code();
        let room = Room::new(code.clone(), host_id, nickname);

        self.rooms.insert(code.clone(), room);
        self.participant_rooms.insert(host_id, code.clone());
        code
    }

    /// 以玩家身份加入房间
    pub fn join_room(
        &mut self,
        code: &str,
        player_id: PlayerId,
        nickname: Option<String>,
    ) -> Result<(), RoomError> {
        let room = self.rooms.get_mut(code).ok_or(RoomError::RoomNotFound)?;
        room.add_player(player_id, nickname)?;
        self.participant_rooms.insert(player_id, code.to_string());
        Ok(())
    }

    /// 以观战者身份加入房间
    pub fn join_as_spectator(
        &mut self,
        code: &str,
        spectator_id: PlayerId,
        nickname: Option<String>,
    ) -> Result<(), RoomError> {
        let room = self.rooms.get_mut(code).ok_or(RoomError::RoomNotFound)?;
        room.add_spectator(spectator_id, nickname)?;
        self.participant_rooms.insert(spectator_id, code.to_string());
        Ok(())
    }

    /// 离开房间（玩家或观战者通用）
    ///
    /// 最后一名玩家离开时删除房间并清理所有观战者的索引；
    /// 房主离开时移交房主；对局进行中离开则剩下的玩家获胜
    pub fn leave(&mut self, participant_id: PlayerId) -> Option<LeaveOutcome> {
        let room_code = self.participant_rooms.remove(&participant_id)?;
        let room = self.rooms.get_mut(&room_code)?;

        // 观战者离开
        if let Some(idx) = room
            .spectators
            .iter()
            .position(|s| s.id == participant_id)
        {
            room.spectators.remove(idx);
            return Some(LeaveOutcome::Spectator { room_code });
        }

        let idx = room
            .players
            .iter()
            .position(|p| p.id == participant_id)?;
        let was_host = room.host == participant_id;
        room.players.remove(idx);

        // 没有玩家了，删除房间
        if room.players.is_empty() {
            let spectator_ids: Vec<PlayerId> = room.spectators.iter().map(|s| s.id).collect();
            for id in spectator_ids {
                self.participant_rooms.remove(&id);
            }
            self.rooms.remove(&room_code);
            return Some(LeaveOutcome::RoomDeleted { room_code });
        }

        // 移交房主
        if was_host {
            room.host = room.players[0].id;
        }

        // 对局进行中离开，剩下的玩家获胜
        if room.status == RoomStatus::Playing {
            room.status = RoomStatus::Finished;
            let winner = room.players[0].id;
            return Some(LeaveOutcome::Player {
                room_code,
                winner: Some(winner),
            });
        }

        Some(LeaveOutcome::Player {
            room_code,
            winner: None,
        })
    }

    pub fn get(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// 查找参与者所在的房间码
    pub fn participant_room(&self, participant_id: PlayerId) -> Option<&str> {
        self.participant_rooms.get(&participant_id).map(|s| s.as_str())
    }

    /// 房间数量
    pub fn count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}
