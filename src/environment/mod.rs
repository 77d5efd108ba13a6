use crate::ast::Type;

use std::collections::HashMap;

#[cfg(test)]
pub mod test;

/// Index of a scope frame inside an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

#[derive(Debug)]
struct Frame<L> {
    bindings: HashMap<String, (L, Type)>,
    parent: Option<FrameId>,
}

/// Lexical scopes as an arena of owned frames linked to their parents by
/// index. Frames are entered and exited in strict stack order; the frame
/// being exited is always the most recently entered one.
#[derive(Debug)]
pub struct Environment<L> {
    frames: Vec<Frame<L>>,
    current: FrameId,
    // frame that was current before each `enter`
    saved: Vec<FrameId>,
}

impl<L: Clone> Environment<L> {
    pub fn new() -> Self {
        Environment {
            frames: vec![Frame {
                bindings: HashMap::new(),
                parent: None,
            }],
            current: FrameId(0),
            saved: vec![],
        }
    }

    pub fn root(&self) -> FrameId {
        FrameId(0)
    }

    pub fn current(&self) -> FrameId {
        self.current
    }

    pub fn is_root(&self) -> bool {
        self.current == self.root()
    }

    /// Number of frames currently alive, the root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Opens a new frame whose lookups fall back to `parent` and makes it
    /// current. For blocks `parent` is the current frame; for function
    /// bodies it is the frame of the declaration site.
    pub fn enter(&mut self, parent: FrameId) -> FrameId {
        let id = FrameId(self.frames.len());
        self.frames.push(Frame {
            bindings: HashMap::new(),
            parent: Some(parent),
        });
        self.saved.push(self.current);
        self.current = id;
        id
    }

    /// Discards the current frame and restores the one active before it.
    /// Exiting the root is a no-op.
    pub fn exit(&mut self) {
        let Some(previous) = self.saved.pop() else {
            return;
        };
        debug_assert_eq!(self.current.0, self.frames.len() - 1);
        self.frames.pop();
        self.current = previous;
    }

    /// Binds `name` in the current frame only, replacing any binding of the
    /// same name in that frame.
    pub fn define(&mut self, name: impl Into<String>, location: L, ty: Type) -> L {
        self.frames[self.current.0]
            .bindings
            .insert(name.into(), (location.clone(), ty));
        location
    }

    /// Searches the current frame, then each ancestor.
    pub fn lookup(&self, name: &str) -> Option<(L, Type)> {
        let mut frame = Some(self.current);
        while let Some(FrameId(index)) = frame {
            let scope = &self.frames[index];
            if let Some(binding) = scope.bindings.get(name) {
                return Some(binding.clone());
            }
            frame = scope.parent;
        }
        None
    }

    /// Searches the current frame only.
    pub fn lookup_local(&self, name: &str) -> Option<(L, Type)> {
        self.frames[self.current.0].bindings.get(name).cloned()
    }
}

impl<L: Clone> Default for Environment<L> {
    fn default() -> Self {
        Self::new()
    }
}
