//! 服务器主逻辑
//!
//! 所有房间状态由单个中心任务持有，连接任务只做帧收发：
//! 读任务把客户端消息转成 [`GatewayEvent`] 投递给中心任务，
//! 写任务把中心任务产出的 [`ServerMessage`] 写回客户端

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use protocol::{
    CellUpdate, ClientMessage, Connection, Difficulty, GameOverReason, Listener, PlayerId,
    ProtocolError, RoomError, ServerMessage, TcpListener, MAX_CONNECTIONS,
};

use crate::board::RevealOutcome;
use crate::room::{ClickResult, LeaveOutcome, RoomManager};

/// 服务器状态
pub struct ServerState {
    pub rooms: RoomManager,
    /// 玩家 ID -> 消息发送通道
    pub connections: HashMap<PlayerId, mpsc::Sender<ServerMessage>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            rooms: RoomManager::new(),
            connections: HashMap::new(),
        }
    }

    /// 发送消息给单个参与者
    pub async fn send_to_player(&self, player_id: PlayerId, msg: ServerMessage) {
        if let Some(tx) = self.connections.get(&player_id) {
            let _ = tx.send(msg).await;
        }
    }

    /// 广播消息给房间内所有参与者（玩家 + 观战者）
    pub async fn broadcast_to_room(&self, code: &str, msg: ServerMessage) {
        self.broadcast_to_room_except(code, None, msg).await;
    }

    /// 广播消息给房间内除指定参与者外的所有人
    pub async fn broadcast_to_room_except(
        &self,
        code: &str,
        except: Option<PlayerId>,
        msg: ServerMessage,
    ) {
        if let Some(room) = self.rooms.get(code) {
            for id in room.participant_ids() {
                if Some(id) == except {
                    continue;
                }
                self.send_to_player(id, msg.clone()).await;
            }
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// 待发送的消息
///
/// 处理器同步地攒下要发的消息，处理结束后统一发送；
/// 定向消息先于广播发出，保证操作者先看到自己棋盘的更新
struct PendingMessages {
    messages: Vec<(PlayerId, ServerMessage)>,
    broadcasts: Vec<(String, Option<PlayerId>, ServerMessage)>,
}

impl PendingMessages {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            broadcasts: Vec::new(),
        }
    }

    fn send(&mut self, player_id: PlayerId, msg: ServerMessage) {
        self.messages.push((player_id, msg));
    }

    fn broadcast(&mut self, code: &str, msg: ServerMessage) {
        self.broadcasts.push((code.to_string(), None, msg));
    }

    fn broadcast_except(&mut self, code: &str, except: PlayerId, msg: ServerMessage) {
        self.broadcasts.push((code.to_string(), Some(except), msg));
    }

    async fn flush(self, state: &ServerState) {
        for (player_id, msg) in self.messages {
            state.send_to_player(player_id, msg).await;
        }
        for (code, except, msg) in self.broadcasts {
            state.broadcast_to_room_except(&code, except, msg).await;
        }
    }
}

/// 网关事件：连接任务投递给中心任务的事件
enum GatewayEvent {
    Connected {
        player_id: PlayerId,
        tx: mpsc::Sender<ServerMessage>,
    },
    Message {
        player_id: PlayerId,
        msg: ClientMessage,
    },
    Disconnected {
        player_id: PlayerId,
    },
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理客户端消息
    pub async fn handle(
        state: &mut ServerState,
        player_id: PlayerId,
        msg: ClientMessage,
    ) -> Option<ServerMessage> {
        let mut pending = PendingMessages::new();

        let result = match msg {
            ClientMessage::CreateRoom { nickname } => {
                Self::handle_create_room(state, player_id, nickname)
            }
            ClientMessage::JoinRoom {
                room_code,
                nickname,
            } => Self::handle_join_room(state, &mut pending, player_id, &room_code, nickname),
            ClientMessage::SpectateRoom {
                room_code,
                nickname,
            } => Self::handle_spectate_room(state, &mut pending, player_id, &room_code, nickname),
            ClientMessage::LeaveRoom => Self::handle_leave_room(state, &mut pending, player_id),
            ClientMessage::SetDifficulty { difficulty } => {
                Self::handle_set_difficulty(state, &mut pending, player_id, difficulty)
            }
            ClientMessage::PlayerReady => {
                Self::handle_player_ready(state, &mut pending, player_id)
            }
            ClientMessage::StartGame => Self::handle_start_game(state, &mut pending, player_id),
            ClientMessage::CellClick { x, y } => {
                Self::handle_cell_click(state, &mut pending, player_id, x, y)
            }
            ClientMessage::CellFlag { x, y } => {
                Self::handle_cell_flag(state, &mut pending, player_id, x, y)
            }
            ClientMessage::CellChord { x, y } => {
                Self::handle_cell_chord(state, &mut pending, player_id, x, y)
            }
            ClientMessage::RequestRematch => {
                Self::handle_request_rematch(state, &mut pending, player_id)
            }
        };

        // 发送待发送的消息
        pending.flush(state).await;

        result
    }

    fn error_reply(err: RoomError) -> ServerMessage {
        ServerMessage::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }

    /// 处理创建房间
    fn handle_create_room(
        state: &mut ServerState,
        player_id: PlayerId,
        nickname: Option<String>,
    ) -> Option<ServerMessage> {
        let code = state.rooms.create_room(player_id, nickname);
        let room = state.rooms.get(&code)?;

        info!("玩家 {} 创建房间 {}", player_id, code);
        Some(ServerMessage::RoomCreated {
            room_code: code.clone(),
            room: room.info(),
        })
    }

    /// 处理加入房间
    fn handle_join_room(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        room_code: &str,
        nickname: Option<String>,
    ) -> Option<ServerMessage> {
        let code = room_code.to_uppercase();
        if let Err(e) = state.rooms.join_room(&code, player_id, nickname) {
            return Some(Self::error_reply(e));
        }

        let room = state.rooms.get(&code)?;
        let player = room.player(player_id)?;

        info!("玩家 {} 加入房间 {}", player_id, code);

        // 通知房间内其他人
        pending.broadcast_except(
            &code,
            player_id,
            ServerMessage::PlayerJoined {
                player: player.info(),
            },
        );

        Some(ServerMessage::RoomJoined { room: room.info() })
    }

    /// 处理观战加入
    fn handle_spectate_room(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        room_code: &str,
        nickname: Option<String>,
    ) -> Option<ServerMessage> {
        let code = room_code.to_uppercase();
        if let Err(e) = state.rooms.join_as_spectator(&code, player_id, nickname) {
            return Some(Self::error_reply(e));
        }

        let room = state.rooms.get(&code)?;
        let spectator = room.spectators.iter().find(|s| s.id == player_id)?;

        info!("观战者 {} 加入房间 {}", player_id, code);

        // 广播给全房间，新加入的观战者也要收到
        pending.broadcast(
            &code,
            ServerMessage::SpectatorJoined {
                spectator: spectator.info(),
                count: room.spectators.len() as u8,
            },
        );

        Some(ServerMessage::SpectateJoined {
            room: room.info(),
            spectator_view: room.spectator_view(),
        })
    }

    /// 处理离开房间
    fn handle_leave_room(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
    ) -> Option<ServerMessage> {
        Self::process_leave(state, pending, player_id);
        None
    }

    /// 离开房间的公共流程（主动离开和断线共用）
    fn process_leave(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
    ) {
        let outcome = match state.rooms.leave(player_id) {
            Some(o) => o,
            None => return,
        };

        match outcome {
            LeaveOutcome::Spectator { room_code } => {
                let count = state
                    .rooms
                    .get(&room_code)
                    .map(|r| r.spectators.len() as u8)
                    .unwrap_or(0);
                info!("观战者 {} 离开房间 {}", player_id, room_code);
                pending.broadcast(
                    &room_code,
                    ServerMessage::SpectatorLeft {
                        spectator_id: player_id,
                        count,
                    },
                );
            }
            LeaveOutcome::RoomDeleted { room_code } => {
                // 房间已无人，无须通知
                info!("玩家 {} 离开，房间 {} 已删除", player_id, room_code);
            }
            LeaveOutcome::Player { room_code, winner } => {
                info!("玩家 {} 离开房间 {}", player_id, room_code);

                let room_info = match state.rooms.get(&room_code) {
                    Some(r) => r.info(),
                    None => return,
                };
                pending.broadcast(
                    &room_code,
                    ServerMessage::PlayerLeft {
                        player_id,
                        room: room_info,
                    },
                );

                // 对局进行中离开，剩下的玩家获胜
                if let Some(winner) = winner {
                    if let Some(room) = state.rooms.get_mut(&room_code) {
                        let results = room.end_game(winner, GameOverReason::OpponentLeft);
                        info!("房间 {} 对局结束，胜者 {}", room_code, winner);
                        pending.broadcast(&room_code, ServerMessage::GameOver(results));
                    }
                }
            }
        }
    }

    /// 处理设置难度
    fn handle_set_difficulty(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        difficulty: Difficulty,
    ) -> Option<ServerMessage> {
        let code = match state.rooms.participant_room(player_id) {
            Some(c) => c.to_string(),
            None => return Some(Self::error_reply(RoomError::NotInRoom)),
        };

        let room = state.rooms.get_mut(&code)?;
        if let Err(e) = room.set_difficulty(player_id, difficulty) {
            return Some(Self::error_reply(e));
        }

        pending.broadcast(&code, ServerMessage::DifficultyChanged { difficulty });
        None
    }

    /// 处理就绪切换
    fn handle_player_ready(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
    ) -> Option<ServerMessage> {
        let code = match state.rooms.participant_room(player_id) {
            Some(c) => c.to_string(),
            None => return Some(Self::error_reply(RoomError::NotInRoom)),
        };

        let room = state.rooms.get_mut(&code)?;
        let ready = match room.toggle_ready(player_id) {
            Ok(r) => r,
            Err(e) => return Some(Self::error_reply(e)),
        };

        pending.broadcast(&code, ServerMessage::ReadyChanged { player_id, ready });
        // 仅在满足开局条件时广播
        if room.can_start() {
            pending.broadcast(&code, ServerMessage::CanStart { can_start: true });
        }
        None
    }

    /// 处理开始对局
    fn handle_start_game(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
    ) -> Option<ServerMessage> {
        let code = match state.rooms.participant_room(player_id) {
            Some(c) => c.to_string(),
            None => return Some(Self::error_reply(RoomError::NotInRoom)),
        };

        let room = state.rooms.get_mut(&code)?;
        if let Err(e) = room.start_game() {
            return Some(Self::error_reply(e));
        }

        let start_time = room.start_time.map(|t| t.timestamp_millis())?;
        let difficulty = room.difficulty;

        info!("房间 {} 开始对局，难度 {}", code, difficulty);

        pending.broadcast(
            &code,
            ServerMessage::GameStarted {
                start_time,
                difficulty,
                board_size: difficulty.board_size(),
                mine_count: difficulty.mine_count(),
            },
        );
        None
    }

    /// 处理左键点击
    ///
    /// 点击路径上的失败（房间不在对局中、点到已翻开格子等）不回发错误，
    /// 直接丢弃，避免高频操作下的错误风暴
    fn handle_cell_click(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        x: u8,
        y: u8,
    ) -> Option<ServerMessage> {
        let code = state.rooms.participant_room(player_id)?.to_string();

        let room = state.rooms.get_mut(&code)?;
        let result = match room.handle_click(player_id, x, y) {
            Ok(r) => r,
            Err(e) => {
                debug!("玩家 {} 点击被拒: {}", player_id, e);
                return None;
            }
        };

        Self::broadcast_reveal_result(state, pending, &code, player_id, result);
        None
    }

    /// 处理插旗 / 拔旗
    fn handle_cell_flag(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        x: u8,
        y: u8,
    ) -> Option<ServerMessage> {
        let code = state.rooms.participant_room(player_id)?.to_string();

        let room = state.rooms.get_mut(&code)?;
        let result = match room.handle_flag(player_id, x, y) {
            Ok(r) => r,
            Err(e) => {
                debug!("玩家 {} 插旗被拒: {}", player_id, e);
                return None;
            }
        };
        if !result.flag.success {
            return None;
        }

        pending.send(
            player_id,
            ServerMessage::BoardUpdate {
                cells: vec![CellUpdate::flag(x, y, result.flag.flagged)],
                player_view: result.player_view,
                game_over: false,
                won: false,
            },
        );
        pending.broadcast_except(
            &code,
            player_id,
            ServerMessage::OpponentUpdate {
                player_id,
                progress: result.progress,
                stats: result.stats,
            },
        );
        None
    }

    /// 处理和弦展开
    fn handle_cell_chord(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        x: u8,
        y: u8,
    ) -> Option<ServerMessage> {
        let code = state.rooms.participant_room(player_id)?.to_string();

        let room = state.rooms.get_mut(&code)?;
        let result = match room.handle_chord(player_id, x, y) {
            Ok(r) => r,
            Err(e) => {
                debug!("玩家 {} 和弦被拒: {}", player_id, e);
                return None;
            }
        };

        Self::broadcast_reveal_result(state, pending, &code, player_id, result);
        None
    }

    /// 下发翻开结果：操作者收完整棋盘更新，对手和观战者收进度概览
    fn broadcast_reveal_result(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        code: &str,
        player_id: PlayerId,
        result: ClickResult,
    ) {
        let RevealOutcome {
            success,
            game_over,
            won,
            revealed,
        } = result.reveal;
        if !success {
            return;
        }

        pending.send(
            player_id,
            ServerMessage::BoardUpdate {
                cells: revealed,
                player_view: result.player_view,
                game_over,
                won,
            },
        );
        pending.broadcast_except(
            code,
            player_id,
            ServerMessage::OpponentUpdate {
                player_id,
                progress: result.progress,
                stats: result.stats,
            },
        );

        if game_over {
            Self::resolve_game_over(state, pending, code, player_id, won);
        }
    }

    /// 结算对局：完成扫雷则操作者胜，踩雷则对手胜
    fn resolve_game_over(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        code: &str,
        player_id: PlayerId,
        won: bool,
    ) {
        let room = match state.rooms.get_mut(code) {
            Some(r) => r,
            None => return,
        };

        let winner = if won {
            player_id
        } else {
            room.opponent_id(player_id).unwrap_or(player_id)
        };
        let reason = if won {
            GameOverReason::Completed
        } else {
            GameOverReason::HitMine
        };

        let results = room.end_game(winner, reason);
        info!("房间 {} 对局结束，胜者 {}", code, winner);
        pending.broadcast(code, ServerMessage::GameOver(results));
    }

    /// 处理重开请求
    fn handle_request_rematch(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
    ) -> Option<ServerMessage> {
        let code = state.rooms.participant_room(player_id)?.to_string();

        let room = state.rooms.get_mut(&code)?;
        room.reset_for_rematch();

        info!("房间 {} 重开对局", code);
        pending.broadcast(&code, ServerMessage::RematchStarted { room: room.info() });
        None
    }

    /// 处理断线
    pub async fn handle_disconnect(state: &mut ServerState, player_id: PlayerId) {
        let mut pending = PendingMessages::new();

        Self::process_leave(state, &mut pending, player_id);
        state.connections.remove(&player_id);

        pending.flush(state).await;
        info!("玩家 {} 断开连接", player_id);
    }
}

/// 启动服务器并阻塞运行
pub async fn run(port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let mut listener = TcpListener::bind(&addr).await?;
    info!("服务器启动，监听 {}", addr);

    // 中心任务：持有全部状态，串行消费网关事件
    let (event_tx, mut event_rx) = mpsc::channel::<GatewayEvent>(256);
    tokio::spawn(async move {
        let mut state = ServerState::new();
        while let Some(event) = event_rx.recv().await {
            match event {
                GatewayEvent::Connected { player_id, tx } => {
                    state.connections.insert(player_id, tx);
                    state
                        .send_to_player(player_id, ServerMessage::Connected { player_id })
                        .await;
                    info!("玩家 {} 已连接", player_id);
                }
                GatewayEvent::Message { player_id, msg } => {
                    if let Some(reply) = MessageHandler::handle(&mut state, player_id, msg).await {
                        state.send_to_player(player_id, reply).await;
                    }
                }
                GatewayEvent::Disconnected { player_id } => {
                    MessageHandler::handle_disconnect(&mut state, player_id).await;
                }
            }
        }
    });

    let active = Arc::new(AtomicUsize::new(0));
    let mut next_player_id: PlayerId = 0;

    loop {
        let conn = match listener.accept().await {
            Ok(c) => c,
            Err(e) => {
                warn!("接受连接失败: {}", e);
                continue;
            }
        };

        if active.load(Ordering::Relaxed) >= MAX_CONNECTIONS {
            warn!("连接数已达上限 {}，拒绝新连接", MAX_CONNECTIONS);
            continue;
        }

        next_player_id += 1;
        let player_id = next_player_id;
        active.fetch_add(1, Ordering::Relaxed);

        debug!("新连接 {:?}，分配玩家 ID {}", conn.peer_addr(), player_id);

        let (mut reader, mut writer) = conn.split();
        let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

        // 注册连接，中心任务会回发分配的玩家 ID
        if event_tx
            .send(GatewayEvent::Connected {
                player_id,
                tx: msg_tx,
            })
            .await
            .is_err()
        {
            break;
        }

        // 写任务
        tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if let Err(e) = writer.write_frame(&msg).await {
                    debug!("玩家 {} 发送消息失败: {}", player_id, e);
                    break;
                }
            }
        });

        // 读任务
        let event_tx = event_tx.clone();
        let active = active.clone();
        tokio::spawn(async move {
            loop {
                match reader.read_frame::<ClientMessage>().await {
                    Ok(msg) => {
                        if event_tx
                            .send(GatewayEvent::Message { player_id, msg })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(ProtocolError::ConnectionClosed) => break,
                    Err(e) => {
                        warn!("玩家 {} 读取消息失败: {}", player_id, e);
                        break;
                    }
                }
            }
            let _ = event_tx
                .send(GatewayEvent::Disconnected { player_id })
                .await;
            active.fetch_sub(1, Ordering::Relaxed);
        });
    }

    Ok(())
}
