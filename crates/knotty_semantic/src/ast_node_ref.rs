//! Owned-but-borrowed references into an externally-owned AST, so that a
//! [`crate::types::FunType`]/[`crate::types::ClassType`] can carry "the node
//! that defines this function/class" without the type arena owning a copy of
//! the AST and without infecting every type with a lifetime parameter.
//!
//! Directly modeled on `red_knot_python_semantic::ast_node_ref::AstNodeRef`.

use std::hash::{Hash, Hasher};
use std::ptr::NonNull;

use crate::ast::ParsedModule;

/// Ref-counted, pointer-identified reference to a node inside a
/// [`ParsedModule`].
///
/// Holding an `AstNodeRef` keeps the node's enclosing `ParsedModule` alive
/// (and therefore the node's memory valid), without the holder needing to
/// name the module's lifetime. Two `AstNodeRef`s are equal, and hash equally,
/// iff they point at the same node in memory — this is an identity
/// comparison ("is this the same definition site"), not a structural one, so
/// it stays cheap even for large function bodies.
#[derive(Clone)]
pub struct AstNodeRef<T> {
    /// Keeps the owning tree alive; never read, only held.
    owner: ParsedModule,
    node: NonNull<T>,
}

#[allow(unsafe_code)]
impl<T> AstNodeRef<T> {
    /// # Safety
    /// `node` must be a node that lives inside `owner`'s tree. The caller is
    /// responsible for upholding this invariant; violating it lets `node()`
    /// dereference dangling memory once `owner` would otherwise have been
    /// dropped.
    pub unsafe fn new(owner: ParsedModule, node: &T) -> Self {
        Self {
            owner,
            node: NonNull::from(node),
        }
    }

    #[must_use]
    pub fn node(&self) -> &T {
        // SAFETY: `owner` is held alive alongside `node`, and `new`'s caller
        // guaranteed `node` lives inside `owner`'s tree.
        unsafe { self.node.as_ref() }
    }

    /// The module this reference keeps alive, needed by callers that must
    /// set the "currently being inferred" module back to whichever module
    /// actually defines this node before creating further `AstNodeRef`s
    /// relative to it (e.g. applying a function imported from elsewhere).
    #[must_use]
    pub fn owner(&self) -> ParsedModule {
        self.owner.clone()
    }
}

impl<T> PartialEq for AstNodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<T> Eq for AstNodeRef<T> {}

impl<T> Hash for AstNodeRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.as_ptr().hash(state);
    }
}

impl<T> std::fmt::Debug for AstNodeRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AstNodeRef")
            .field("node", &self.node.as_ptr())
            .finish()
    }
}
