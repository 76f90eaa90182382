use std::cell::Cell;

use log::{error, trace};

/// 每一层递归执行都会压入一个作用域，返回时按相反顺序释放。
pub trait ScopeArena {
    fn push(&self);
    fn release(&self);
    fn depth(&self) -> usize;
}

/// 默认的作用域栈，只记录深度。
#[derive(Debug, Default)]
pub struct FrameArena {
    depth: Cell<usize>,
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScopeArena for FrameArena {
    fn push(&self) {
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        trace!("作用域入栈, 深度 {}", depth);
    }

    fn release(&self) {
        match self.depth.get().checked_sub(1) {
            Some(depth) => {
                self.depth.set(depth);
                trace!("作用域出栈, 深度 {}", depth);
            }
            None => error!("作用域出栈次数多于入栈次数"),
        }
    }

    fn depth(&self) -> usize {
        self.depth.get()
    }
}

/// 持有一个作用域，离开时（包括 `?` 提前返回）自动释放。
///
/// 子进程通过 `process::terminate` 直接结束时不会执行释放。
pub struct ScopeGuard<'a> {
    arena: &'a dyn ScopeArena,
}

impl<'a> ScopeGuard<'a> {
    pub fn enter(arena: &'a dyn ScopeArena) -> Self {
        arena.push();
        Self { arena }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.arena.release();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// 记录每次入栈/出栈及当时的深度
    #[derive(Default)]
    pub(crate) struct RecordingArena {
        pub(crate) events: RefCell<Vec<(char, usize)>>,
        depth: Cell<usize>,
    }

    impl ScopeArena for RecordingArena {
        fn push(&self) {
            self.depth.set(self.depth.get() + 1);
            self.events.borrow_mut().push(('+', self.depth.get()));
        }

        fn release(&self) {
            self.events.borrow_mut().push(('-', self.depth.get()));
            self.depth.set(self.depth.get() - 1);
        }

        fn depth(&self) -> usize {
            self.depth.get()
        }
    }

    #[test]
    fn guards_release_in_reverse_order() {
        let arena = RecordingArena::default();
        {
            let _outer = ScopeGuard::enter(&arena);
            {
                let _inner = ScopeGuard::enter(&arena);
            }
        }
        assert_eq!(
            *arena.events.borrow(),
            vec![('+', 1), ('+', 2), ('-', 2), ('-', 1)]
        );
    }

    #[test]
    fn frame_arena_tracks_depth() {
        let arena = FrameArena::new();
        {
            let _a = ScopeGuard::enter(&arena);
            let _b = ScopeGuard::enter(&arena);
            assert_eq!(arena.depth(), 2);
        }
        let _c = ScopeGuard::enter(&arena);
        assert_eq!(arena.depth(), 1);
    }

    #[test]
    fn unbalanced_release_keeps_depth_at_zero() {
        let arena = FrameArena::new();
        arena.release();
        assert_eq!(arena.depth(), 0);
    }
}
