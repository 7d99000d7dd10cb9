//! 扫雷棋盘引擎
//!
//! 每名玩家持有一个独立的 Board，雷区布局在首次翻开时生成，
//! 并由房间逻辑同步给对手（两人扫同一张雷区图）

use std::collections::VecDeque;

use rand::Rng;

use protocol::{CellUpdate, CellView, Difficulty, Position, ProgressSummary};

/// 单个格子
#[derive(Debug, Clone, Copy, Default)]
pub struct Cell {
    pub is_mine: bool,
    pub adjacent_mines: u8,
    pub revealed: bool,
    pub flagged: bool,
}

/// 翻开类操作（点击 / 和弦）的结果
#[derive(Debug, Clone, Default)]
pub struct RevealOutcome {
    /// 操作是否生效（点到旗子、已翻开的格子等情况下为 false）
    pub success: bool,
    pub game_over: bool,
    pub won: bool,
    /// 本次操作翻开的格子
    pub revealed: Vec<CellUpdate>,
}

/// 插旗操作的结果
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagOutcome {
    pub success: bool,
    /// 操作后的插旗状态
    pub flagged: bool,
}

/// 单人扫雷棋盘
///
/// 延迟布雷：首次翻开前棋盘上没有地雷，首次翻开时避开点击位置
/// 周围 3×3 区域随机布雷，保证第一下不会踩雷
#[derive(Debug, Clone)]
pub struct Board {
    width: u8,
    height: u8,
    mine_count: u16,
    /// 索引为 y * width + x，使用 Vec 以支持不同难度的尺寸
    cells: Vec<Cell>,
    initialized: bool,
}

impl Board {
    /// 按难度预设创建空棋盘
    pub fn new(difficulty: Difficulty) -> Self {
        let (width, height, mine_count) = difficulty.preset();
        Self {
            width,
            height,
            mine_count,
            cells: vec![Cell::default(); width as usize * height as usize],
            initialized: false,
        }
    }

    /// 测试用：按给定雷位构造已初始化的棋盘
    #[cfg(test)]
    pub(crate) fn with_mines(width: u8, height: u8, mines: &[(u8, u8)]) -> Self {
        let mut board = Self {
            width,
            height,
            mine_count: mines.len() as u16,
            cells: vec![Cell::default(); width as usize * height as usize],
            initialized: true,
        };
        for &(x, y) in mines {
            let idx = board.index(x, y);
            board.cells[idx].is_mine = true;
        }
        board.compute_adjacent_counts();
        board
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn mine_count(&self) -> u16 {
        self.mine_count
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn index(&self, x: u8, y: u8) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn in_bounds(&self, x: u8, y: u8) -> bool {
        x < self.width && y < self.height
    }

    /// 获取格子
    pub fn cell(&self, x: u8, y: u8) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// 首次翻开时布雷
    ///
    /// 点击位置周围 3×3（越界部分忽略）为安全区，地雷用拒绝采样
    /// 随机落位，之后为所有非雷格子计算相邻雷数
    pub fn initialize(&mut self, first_x: u8, first_y: u8) {
        self.cells = vec![Cell::default(); self.width as usize * self.height as usize];

        let safe_zone = self.safe_zone(first_x, first_y);
        debug_assert!(
            (self.mine_count as usize) <= self.cells.len() - safe_zone.len(),
            "雷数超过可布雷的格子数"
        );

        let mut rng = rand::thread_rng();
        let mut placed = 0u16;

        while placed < self.mine_count {
            let x = rng.gen_range(0..self.width);
            let y = rng.gen_range(0..self.height);
            let idx = self.index(x, y);

            if !self.cells[idx].is_mine && !safe_zone.contains(&(x, y)) {
                self.cells[idx].is_mine = true;
                placed += 1;
            }
        }

        self.compute_adjacent_counts();
        self.initialized = true;
    }

    /// 点击位置周围的安全区（含自身，越界部分忽略）
    fn safe_zone(&self, x: u8, y: u8) -> Vec<(u8, u8)> {
        let mut zone = Vec::with_capacity(9);
        for dy in -1i16..=1 {
            for dx in -1i16..=1 {
                let nx = x as i16 + dx;
                let ny = y as i16 + dy;
                if nx >= 0 && (nx as u8) < self.width && ny >= 0 && (ny as u8) < self.height {
                    zone.push((nx as u8, ny as u8));
                }
            }
        }
        zone
    }

    /// 为所有非雷格子计算相邻雷数
    fn compute_adjacent_counts(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = self.index(x, y);
                if !self.cells[idx].is_mine {
                    let count = self.count_adjacent_mines(x, y);
                    self.cells[idx].adjacent_mines = count;
                }
            }
        }
    }

    /// 统计某格周围的地雷数
    fn count_adjacent_mines(&self, x: u8, y: u8) -> u8 {
        let mut count = 0;
        self.for_each_neighbor(x, y, |board, nx, ny| {
            if board.cells[board.index(nx, ny)].is_mine {
                count += 1;
            }
        });
        count
    }

    /// 遍历某格的有效邻居（最多 8 个）
    fn for_each_neighbor<F: FnMut(&Board, u8, u8)>(&self, x: u8, y: u8, mut f: F) {
        for dy in -1i16..=1 {
            for dx in -1i16..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i16 + dx;
                let ny = y as i16 + dy;
                if nx >= 0 && (nx as u8) < self.width && ny >= 0 && (ny as u8) < self.height {
                    f(self, nx as u8, ny as u8);
                }
            }
        }
    }

    /// 某格的有效邻居坐标列表
    fn neighbors(&self, x: u8, y: u8) -> Vec<(u8, u8)> {
        let mut result = Vec::with_capacity(8);
        self.for_each_neighbor(x, y, |_, nx, ny| result.push((nx, ny)));
        result
    }

    /// 翻开一个格子
    ///
    /// 首次翻开先布雷；点到旗子、已翻开或越界的格子不生效。
    /// 踩雷立即判负，翻开零雷格子时向外展开连片区域
    pub fn reveal(&mut self, x: u8, y: u8) -> RevealOutcome {
        if !self.initialized {
            self.initialize(x, y);
        }

        let cell = match self.cell(x, y) {
            Some(c) => *c,
            None => return RevealOutcome::default(),
        };
        if cell.revealed || cell.flagged {
            return RevealOutcome::default();
        }

        // 踩雷
        if cell.is_mine {
            let idx = self.index(x, y);
            self.cells[idx].revealed = true;
            return RevealOutcome {
                success: true,
                game_over: true,
                won: false,
                revealed: vec![CellUpdate::revealed_mine(x, y)],
            };
        }

        let mut revealed = Vec::new();
        self.flood_reveal(x, y, &mut revealed);

        let won = self.check_win();
        RevealOutcome {
            success: true,
            game_over: won,
            won,
            revealed,
        }
    }

    /// 连片展开
    ///
    /// 用显式工作队列代替递归，高级难度的大片空白区域不会压爆栈。
    /// 旗子和地雷不会被展开波及
    fn flood_reveal(&mut self, x: u8, y: u8, out: &mut Vec<CellUpdate>) {
        let mut queue = VecDeque::new();
        queue.push_back((x, y));

        while let Some((cx, cy)) = queue.pop_front() {
            let idx = self.index(cx, cy);
            let cell = self.cells[idx];
            if cell.revealed || cell.flagged || cell.is_mine {
                continue;
            }

            self.cells[idx].revealed = true;
            out.push(CellUpdate::revealed_safe(cx, cy, cell.adjacent_mines));

            // 零雷格子继续向邻居扩散
            if cell.adjacent_mines == 0 {
                for (nx, ny) in self.neighbors(cx, cy) {
                    queue.push_back((nx, ny));
                }
            }
        }
    }

    /// 插旗 / 拔旗
    ///
    /// 已翻开的格子和未布雷的棋盘上不能插旗
    pub fn toggle_flag(&mut self, x: u8, y: u8) -> FlagOutcome {
        if !self.initialized {
            return FlagOutcome::default();
        }

        let cell = match self.cell(x, y) {
            Some(c) => *c,
            None => return FlagOutcome::default(),
        };
        if cell.revealed {
            return FlagOutcome::default();
        }

        let idx = self.index(x, y);
        self.cells[idx].flagged = !cell.flagged;
        FlagOutcome {
            success: true,
            flagged: self.cells[idx].flagged,
        }
    }

    /// 和弦展开：对已翻开的数字格，周围旗数与雷数一致时翻开其余邻居
    ///
    /// 旗插错位置时会连带踩雷，一次和弦可能同时翻开多颗雷
    pub fn chord(&mut self, x: u8, y: u8) -> RevealOutcome {
        if !self.initialized {
            return RevealOutcome::default();
        }

        let cell = match self.cell(x, y) {
            Some(c) => *c,
            None => return RevealOutcome::default(),
        };
        if !cell.revealed || cell.adjacent_mines == 0 {
            return RevealOutcome::default();
        }

        // 周围旗数必须与数字一致
        let mut flag_count = 0;
        self.for_each_neighbor(x, y, |board, nx, ny| {
            if board.cells[board.index(nx, ny)].flagged {
                flag_count += 1;
            }
        });
        if flag_count != cell.adjacent_mines {
            return RevealOutcome::default();
        }

        let mut revealed = Vec::new();
        let mut hit_mine = false;

        for (nx, ny) in self.neighbors(x, y) {
            let idx = self.index(nx, ny);
            let neighbor = self.cells[idx];
            if neighbor.revealed || neighbor.flagged {
                continue;
            }

            if neighbor.is_mine {
                self.cells[idx].revealed = true;
                revealed.push(CellUpdate::revealed_mine(nx, ny));
                hit_mine = true;
            } else {
                self.flood_reveal(nx, ny, &mut revealed);
            }
        }

        let won = !hit_mine && self.check_win();
        RevealOutcome {
            success: true,
            game_over: hit_mine || won,
            won,
            revealed,
        }
    }

    /// 是否已扫完所有安全格子
    pub fn check_win(&self) -> bool {
        self.cells.iter().all(|c| c.is_mine || c.revealed)
    }

    /// 己方视角的棋盘投影（未翻开的格子不带雷数和地雷信息）
    pub fn player_view(&self) -> Vec<Vec<CellView>> {
        self.view_rows(|cell, x, y| CellView {
            x,
            y,
            revealed: cell.revealed,
            flagged: cell.flagged,
            adjacent_mines: if cell.revealed {
                Some(cell.adjacent_mines)
            } else {
                None
            },
            is_mine: if cell.revealed && cell.is_mine {
                Some(true)
            } else {
                None
            },
        })
    }

    /// 终局亮板：所有格子带完整信息
    pub fn full_board(&self) -> Vec<Vec<CellView>> {
        self.view_rows(|cell, x, y| CellView {
            x,
            y,
            revealed: cell.revealed,
            flagged: cell.flagged,
            adjacent_mines: Some(cell.adjacent_mines),
            is_mine: Some(cell.is_mine),
        })
    }

    fn view_rows<F: Fn(&Cell, u8, u8) -> CellView>(&self, f: F) -> Vec<Vec<CellView>> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| f(&self.cells[self.index(x, y)], x, y))
                    .collect()
            })
            .collect()
    }

    /// 进度摘要（发给对手和观战者的脱敏数据）
    pub fn progress(&self) -> ProgressSummary {
        let total_safe = self.width as u16 * self.height as u16 - self.mine_count;
        let mut revealed = 0u16;
        let mut flagged = 0u16;
        let mut revealed_positions = Vec::new();
        let mut flagged_positions = Vec::new();

        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.cells[self.index(x, y)];
                if cell.revealed && !cell.is_mine {
                    revealed += 1;
                    revealed_positions.push(Position::new(x, y));
                }
                if cell.flagged {
                    flagged += 1;
                    flagged_positions.push(Position::new(x, y));
                }
            }
        }

        let progress = if total_safe > 0 {
            ((revealed as f64 / total_safe as f64) * 100.0).round() as u8
        } else {
            0
        };

        ProgressSummary {
            progress,
            revealed,
            total_safe,
            flagged,
            revealed_positions,
            flagged_positions,
        }
    }

    /// 从对方棋盘同步雷区布局
    ///
    /// 按值复制格子数据并清掉翻开/插旗状态，两块棋盘之后各自独立演化
    pub fn sync_layout_from(&mut self, source: &Board) {
        self.cells = source
            .cells
            .iter()
            .map(|c| Cell {
                revealed: false,
                flagged: false,
                ..*c
            })
            .collect();
        self.initialized = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 雷位：
    /// ```text
    /// . . . .
    /// . * . .
    /// . . . *
    /// . . . .
    /// ```
    fn small_board() -> Board {
        Board::with_mines(4, 4, &[(1, 1), (3, 2)])
    }

    #[test]
    fn test_first_click_initializes_board() {
        let mut board = Board::new(Difficulty::Beginner);
        assert!(!board.is_initialized());

        let outcome = board.reveal(4, 4);
        assert!(board.is_initialized());
        assert!(outcome.success);
        assert!(!outcome.game_over);
        assert!(!outcome.revealed.is_empty());
    }

    #[test]
    fn test_first_click_safe_zone() {
        // 多跑几次，降低随机布雷碰巧合法的概率
        for _ in 0..20 {
            let mut board = Board::new(Difficulty::Beginner);
            board.initialize(4, 4);

            for dy in -1i16..=1 {
                for dx in -1i16..=1 {
                    let x = (4 + dx) as u8;
                    let y = (4 + dy) as u8;
                    assert!(!board.cell(x, y).unwrap().is_mine);
                }
            }
        }
    }

    #[test]
    fn test_safe_zone_clamped_at_corner() {
        let mut board = Board::new(Difficulty::Beginner);
        board.initialize(0, 0);

        // 角落的安全区只有 4 格
        for &(x, y) in &[(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert!(!board.cell(x, y).unwrap().is_mine);
        }
        let mines = (0..9)
            .flat_map(|y| (0..9).map(move |x| (x, y)))
            .filter(|&(x, y)| board.cell(x, y).unwrap().is_mine)
            .count();
        assert_eq!(mines, 10);
    }

    #[test]
    fn test_exact_mine_count() {
        let mut board = Board::new(Difficulty::Expert);
        board.initialize(15, 8);

        let mines = (0..16)
            .flat_map(|y| (0..30).map(move |x| (x, y)))
            .filter(|&(x, y)| board.cell(x, y).unwrap().is_mine)
            .count();
        assert_eq!(mines, 99);
    }

    #[test]
    fn test_adjacent_counts_consistent() {
        let mut board = Board::new(Difficulty::Intermediate);
        board.initialize(8, 8);

        for y in 0..16 {
            for x in 0..16 {
                let cell = board.cell(x, y).unwrap();
                if cell.is_mine {
                    continue;
                }
                let expected = board.count_adjacent_mines(x, y);
                assert_eq!(cell.adjacent_mines, expected, "格子 ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_reveal_mine_ends_game() {
        let mut board = small_board();
        let outcome = board.reveal(1, 1);

        assert!(outcome.success);
        assert!(outcome.game_over);
        assert!(!outcome.won);
        assert_eq!(outcome.revealed.len(), 1);
        assert_eq!(outcome.revealed[0].is_mine, Some(true));
    }

    #[test]
    fn test_reveal_flagged_cell_fails() {
        let mut board = small_board();
        board.toggle_flag(1, 1);

        let outcome = board.reveal(1, 1);
        assert!(!outcome.success);
        assert!(outcome.revealed.is_empty());
    }

    #[test]
    fn test_reveal_out_of_bounds_fails() {
        let mut board = small_board();
        let outcome = board.reveal(10, 10);
        assert!(!outcome.success);
    }

    #[test]
    fn test_flood_reveal_zero_region() {
        let mut board = small_board();
        // (3, 0) 远离两颗雷，周围无雷，应该触发连片展开
        let outcome = board.reveal(3, 0);

        assert!(outcome.success);
        assert!(outcome.revealed.len() > 1);
        // 展开不会越过数字边界碰到雷
        assert!(outcome.revealed.iter().all(|c| c.is_mine == Some(false)));
        // 同一格子不会重复出现
        let mut seen = std::collections::HashSet::new();
        for c in &outcome.revealed {
            assert!(seen.insert((c.x, c.y)));
        }
    }

    #[test]
    fn test_flood_skips_flagged() {
        let mut board = small_board();
        // (0, 2) 在 (0, 3) 的展开范围内，插旗后展开应绕开它
        board.toggle_flag(0, 2);
        let outcome = board.reveal(0, 3);

        assert!(outcome.success);
        assert!(!board.cell(0, 2).unwrap().revealed);
        assert!(board.cell(0, 2).unwrap().flagged);
        assert!(outcome.revealed.iter().all(|c| (c.x, c.y) != (0, 2)));
    }

    #[test]
    fn test_toggle_flag() {
        let mut board = small_board();

        let outcome = board.toggle_flag(2, 2);
        assert!(outcome.success);
        assert!(outcome.flagged);

        let outcome = board.toggle_flag(2, 2);
        assert!(outcome.success);
        assert!(!outcome.flagged);
    }

    #[test]
    fn test_flag_before_init_fails() {
        let mut board = Board::new(Difficulty::Beginner);
        let outcome = board.toggle_flag(0, 0);
        assert!(!outcome.success);
    }

    #[test]
    fn test_flag_revealed_cell_fails() {
        let mut board = small_board();
        board.reveal(0, 0);
        let outcome = board.toggle_flag(0, 0);
        assert!(!outcome.success);
    }

    #[test]
    fn test_chord_reveals_neighbors() {
        let mut board = small_board();
        // (0, 0) 相邻一颗雷 (1, 1)
        board.reveal(0, 0);
        board.toggle_flag(1, 1);

        let outcome = board.chord(0, 0);
        assert!(outcome.success);
        assert!(!outcome.game_over);
        // (1, 0) 和 (0, 1) 被翻开，旗子所在格不动
        assert!(board.cell(1, 0).unwrap().revealed);
        assert!(board.cell(0, 1).unwrap().revealed);
        assert!(!board.cell(1, 1).unwrap().revealed);
    }

    #[test]
    fn test_chord_flag_count_mismatch() {
        let mut board = small_board();
        board.reveal(0, 0);

        // 没插旗，旗数 0 != 雷数 1
        let outcome = board.chord(0, 0);
        assert!(!outcome.success);
        assert!(outcome.revealed.is_empty());
    }

    #[test]
    fn test_chord_wrong_flag_hits_mine() {
        let mut board = small_board();
        board.reveal(0, 0);
        // 旗插错位置
        board.toggle_flag(1, 0);

        let outcome = board.chord(0, 0);
        assert!(outcome.success);
        assert!(outcome.game_over);
        assert!(!outcome.won);
        // 真雷 (1, 1) 被翻开
        assert!(outcome
            .revealed
            .iter()
            .any(|c| (c.x, c.y) == (1, 1) && c.is_mine == Some(true)));
    }

    #[test]
    fn test_chord_unrevealed_cell_fails() {
        let mut board = small_board();
        assert!(!board.chord(0, 0).success);
    }

    #[test]
    fn test_win_detection() {
        let mut board = small_board();
        // 插旗与否不影响胜利判定
        board.toggle_flag(3, 2);

        let mut last = RevealOutcome::default();
        for y in 0..4 {
            for x in 0..4 {
                if !board.cell(x, y).unwrap().is_mine {
                    let outcome = board.reveal(x, y);
                    if outcome.success {
                        last = outcome;
                    }
                }
            }
        }

        assert!(board.check_win());
        assert!(last.game_over);
        assert!(last.won);
    }

    #[test]
    fn test_player_view_hides_mines() {
        let mut board = small_board();
        board.reveal(0, 0);
        board.toggle_flag(3, 3);

        let view = board.player_view();
        assert_eq!(view.len(), 4);
        assert_eq!(view[0].len(), 4);

        // 已翻开的格子带雷数
        assert!(view[0][0].revealed);
        assert_eq!(view[0][0].adjacent_mines, Some(1));
        assert_eq!(view[0][0].is_mine, None);

        // 未翻开的雷格不暴露任何信息
        assert!(!view[1][1].revealed);
        assert_eq!(view[1][1].adjacent_mines, None);
        assert_eq!(view[1][1].is_mine, None);

        // 旗子状态可见
        assert!(view[3][3].flagged);
    }

    #[test]
    fn test_full_board_shows_everything() {
        let board = small_board();
        let full = board.full_board();

        assert_eq!(full[1][1].is_mine, Some(true));
        assert_eq!(full[2][3].is_mine, Some(true));
        assert_eq!(full[0][0].is_mine, Some(false));
        assert_eq!(full[0][0].adjacent_mines, Some(1));
    }

    #[test]
    fn test_progress() {
        let mut board = small_board();
        assert_eq!(board.progress().progress, 0);

        board.reveal(0, 0);
        board.toggle_flag(1, 1);

        let progress = board.progress();
        // 14 个安全格子，翻开 1 个：round(1/14*100) = 7
        assert_eq!(progress.total_safe, 14);
        assert_eq!(progress.revealed, 1);
        assert_eq!(progress.flagged, 1);
        assert_eq!(progress.progress, 7);
        assert_eq!(progress.revealed_positions, vec![Position::new(0, 0)]);
        assert_eq!(progress.flagged_positions, vec![Position::new(1, 1)]);
    }

    #[test]
    fn test_progress_on_uninitialized_board() {
        let board = Board::new(Difficulty::Beginner);
        let progress = board.progress();

        assert_eq!(progress.progress, 0);
        assert_eq!(progress.revealed, 0);
        assert_eq!(progress.total_safe, 71);
        assert!(progress.revealed_positions.is_empty());
    }

    #[test]
    fn test_sync_layout() {
        let mut source = Board::new(Difficulty::Beginner);
        source.reveal(4, 4);
        source.toggle_flag(0, 0);

        let mut other = Board::new(Difficulty::Beginner);
        other.sync_layout_from(&source);

        assert!(other.is_initialized());
        for y in 0..9 {
            for x in 0..9 {
                let src = source.cell(x, y).unwrap();
                let dst = other.cell(x, y).unwrap();
                // 雷位和雷数一致
                assert_eq!(src.is_mine, dst.is_mine);
                assert_eq!(src.adjacent_mines, dst.adjacent_mines);
                // 翻开/插旗状态不跟随
                assert!(!dst.revealed);
                assert!(!dst.flagged);
            }
        }

        // 同步后两块棋盘各自独立：同一位置点击产生同样形状的展开
        other.reveal(4, 4);
        let src_revealed = (0..9)
            .flat_map(|y| (0..9).map(move |x| (x, y)))
            .filter(|&(x, y)| source.cell(x, y).unwrap().revealed)
            .count();
        let dst_revealed = (0..9)
            .flat_map(|y| (0..9).map(move |x| (x, y)))
            .filter(|&(x, y)| other.cell(x, y).unwrap().revealed)
            .count();
        assert_eq!(src_revealed, dst_revealed);
    }
}
