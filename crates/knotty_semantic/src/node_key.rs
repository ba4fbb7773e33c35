use ruff_python_ast::AnyNodeRef;

/// Compact, copyable identity for an AST node, for use as a hash map key.
///
/// Stores the node's memory address rather than its range, because two
/// distinct nodes produced from invalid syntax can share the same (empty)
/// range. The analyzer never owns the AST (it's produced by the external
/// parser collaborator and kept alive via [`crate::ast::ParsedModule`]), so
/// this is the cheapest stable identity we can hang a reference-tracking map
/// off without copying nodes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeKey(usize);

impl NodeKey {
    pub fn from_node<'a, N>(node: N) -> Self
    where
        N: Into<AnyNodeRef<'a>>,
    {
        let node = node.into();
        NodeKey(node.as_ptr().as_ptr() as usize)
    }

    /// A stable identity for a binding that has no real source node (a
    /// builtin, or an import alias name). Each call hands out a fresh,
    /// never-reused key backed by a one-word leaked allocation; builtins
    /// and aliases live for the whole process, so the leak is bounded by
    /// the number of such names seen, not by how often they're looked up.
    #[must_use]
    pub fn synthetic() -> Self {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let boxed: &'static usize = Box::leak(Box::new(NEXT.fetch_add(1, Ordering::Relaxed)));
        NodeKey(std::ptr::from_ref(boxed) as usize)
    }
}
