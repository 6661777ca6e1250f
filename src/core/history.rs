//! Undo/redo history of whole-document snapshots

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::document::RichDocument;

/// Consecutive typing within this window undoes as one step
const COALESCE_WINDOW: Duration = Duration::from_millis(500);

/// What produced an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Typing,
    Structure,
}

#[derive(Debug)]
pub struct History {
    undo: VecDeque<RichDocument>,
    redo: Vec<RichDocument>,
    depth: usize,
    last_typing: Option<Instant>,
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            depth: depth.max(1),
            last_typing: None,
        }
    }

    /// Remember `before` as the state prior to an edit
    pub fn record(&mut self, before: &RichDocument, kind: EditKind) {
        self.record_at(before, kind, Instant::now());
    }

    fn record_at(&mut self, before: &RichDocument, kind: EditKind, now: Instant) {
        let coalesce = kind == EditKind::Typing
            && !self.undo.is_empty()
            && self
                .last_typing
                .is_some_and(|t| now.saturating_duration_since(t) <= COALESCE_WINDOW);

        self.last_typing = (kind == EditKind::Typing).then_some(now);
        self.redo.clear();
        if coalesce {
            return;
        }

        self.undo.push_back(before.clone());
        while self.undo.len() > self.depth {
            self.undo.pop_front();
        }
    }

    /// Swap `current` with the previous snapshot
    pub fn undo(&mut self, current: &mut RichDocument) -> bool {
        let Some(previous) = self.undo.pop_back() else {
            return false;
        };
        self.redo.push(std::mem::replace(current, previous));
        self.last_typing = None;
        true
    }

    /// Re-apply the last undone edit
    pub fn redo(&mut self, current: &mut RichDocument) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push_back(std::mem::replace(current, next));
        self.last_typing = None;
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.last_typing = None;
    }
}
