use std::collections::HashMap;

use tree_sitter::Node;

/// What kind of syntactic boundary opened a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Function,
    Block,
}

#[derive(Debug)]
struct Frame<'t> {
    kind: FrameKind,
    /// `None` marks a name bound at runtime, such as a parameter.
    bindings: HashMap<String, Option<Node<'t>>>,
}

/// Declared names mapped to their unevaluated initializers.
///
/// The stack always holds the program frame at index 0.
#[derive(Debug)]
pub struct ScopeStack<'t> {
    frames: Vec<Frame<'t>>,
}

/// A binding found by [`ScopeStack::lookup`].
#[derive(Debug, Clone, Copy)]
pub struct Binding<'t> {
    /// Initializer, or `None` when the value is only known at runtime.
    pub init: Option<Node<'t>>,
    /// Index of the frame holding the binding.
    pub frame: usize,
}

impl<'t> ScopeStack<'t> {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                kind: FrameKind::Function,
                bindings: HashMap::new(),
            }],
        }
    }

    pub fn push(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            bindings: HashMap::new(),
        });
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Index of the innermost frame.
    pub fn top(&self) -> usize {
        self.frames.len() - 1
    }

    /// Bind a `let`/`const` name in the innermost frame.
    pub fn declare_lexical(&mut self, name: &str, init: Node<'t>) {
        let top = self.top();
        self.frames[top].bindings.insert(name.to_string(), Some(init));
    }

    /// Bind a parameter, loop or `catch` name in the innermost frame.
    ///
    /// The name shadows outer bindings but has no known value.
    pub fn declare_opaque(&mut self, name: &str) {
        let top = self.top();
        self.frames[top].bindings.insert(name.to_string(), None);
    }

    /// Bind a `var` name in the innermost function frame.
    pub fn declare_var(&mut self, name: &str, init: Node<'t>) {
        let idx = self
            .frames
            .iter()
            .rposition(|f| f.kind == FrameKind::Function)
            .unwrap_or(0);
        self.frames[idx].bindings.insert(name.to_string(), Some(init));
    }

    /// Find `name` walking outward from frame `from`.
    pub fn lookup(&self, name: &str, from: usize) -> Option<Binding<'t>> {
        let from = from.min(self.top());
        self.frames[..=from]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(frame, f)| f.bindings.get(name).map(|&init| Binding { init, frame }))
    }
}

impl Default for ScopeStack<'_> {
    fn default() -> Self {
        Self::new()
    }
}
