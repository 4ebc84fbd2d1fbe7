use std::collections::HashMap;
use std::sync::RwLock;

use aluguetudo_core::UserId;
use aluguetudo_tasks::TaskBoard;

/// Personal task boards, one per user, created on first use.
#[derive(Debug, Default)]
pub struct TaskBoards {
    boards: RwLock<HashMap<UserId, TaskBoard>>,
}

impl TaskBoards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to `owner`'s board (an empty board if none exists yet).
    pub fn read<R>(&self, owner: UserId, f: impl FnOnce(&TaskBoard) -> R) -> R {
        let guard = match self.boards.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.get(&owner) {
            Some(board) => f(board),
            None => f(&TaskBoard::new(owner)),
        }
    }

    /// Mutable access to `owner`'s board.
    pub fn write<R>(&self, owner: UserId, f: impl FnOnce(&mut TaskBoard) -> R) -> R {
        let mut guard = match self.boards.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let board = guard.entry(owner).or_insert_with(|| TaskBoard::new(owner));
        f(board)
    }
}
