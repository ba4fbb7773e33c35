//! Bindings (§3): the name-to-value facts the driver produces as it visits
//! the AST, and the registry that owns them.
//!
//! Modeled on `red_knot_python_semantic::semantic_index::symbol::Symbol` (a
//! name plus a `ScopeId` plus the node that introduced it) and
//! `semantic_index::definition::Definition`'s kind tagging, simplified into
//! a single flat record since this crate has no incremental-query layer to
//! key definitions against.

use std::path::PathBuf;

use ruff_index::{newtype_index, IndexVec};
use ruff_text_size::TextRange;
use rustc_hash::FxHashSet;

use crate::node_key::NodeKey;
use crate::types::TypeId;

#[newtype_index]
pub struct BindingId;

/// What kind of name introduced a [`Binding`] (§3). Distinguishing these
/// matters for `finish()`'s unused-variable pass (§7): only a few kinds are
/// ever reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Module,
    Class,
    Method,
    Constructor,
    Function,
    Attribute,
    Variable,
    Parameter,
    /// A name bound to a nested block's own scope object, rather than to a
    /// value (e.g. the implicit name a `class`/`def` statement binds in its
    /// *enclosing* scope to the scope it introduces).
    Scope,
    /// An `import x as y` / `from m import x as y` alias, or the plain
    /// `import x` form, which binds `x` in the importing scope.
    Alias,
}

/// A single name-to-type fact (§3): `name` resolved to `ty` at `node`,
/// referenced from the node set in `refs`.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: compact_str::CompactString,
    pub node: NodeKey,
    pub ty: TypeId,
    pub kind: BindingKind,
    pub refs: FxHashSet<NodeKey>,
    pub is_builtin: bool,
    pub is_synthetic: bool,
    /// The file this name was bound in, so a post-hoc pass over every
    /// binding (`finish()`'s unused-variable diagnostics) can still attach
    /// each finding to the right file even though it no longer has a `Ctx`
    /// in hand.
    pub file: PathBuf,
    /// Where in `file` the binding's name occurs, for rendering (§6).
    /// `TextRange::default()` for bindings with no real source position
    /// (builtins, synthetic import aliases).
    pub range: TextRange,
}

impl Binding {
    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Owns every [`Binding`] ever created during an analysis run (§7:
/// `allBindings`) and the node -> binding(s) reference map (§7:
/// `references`).
///
/// `create_binding` is the single construction site named in the Design
/// Notes ("every Binding is created through one function"), which is what
/// lets `add_reference` assume every `BindingId` it's handed is valid.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: IndexVec<BindingId, Binding>,
    /// node -> bindings it refers to; a node can resolve to more than one
    /// binding when a name was bound more than once along different control
    /// flow paths reaching the same lookup (§3's "refs" invariant, mirrored
    /// from the binding side).
    references: rustc_hash::FxHashMap<NodeKey, Vec<BindingId>>,
}

impl BindingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_binding(
        &mut self,
        name: impl Into<compact_str::CompactString>,
        node: NodeKey,
        ty: TypeId,
        kind: BindingKind,
        is_builtin: bool,
        is_synthetic: bool,
        file: PathBuf,
        range: TextRange,
    ) -> BindingId {
        self.bindings.push(Binding {
            name: name.into(),
            node,
            ty,
            kind,
            refs: FxHashSet::default(),
            is_builtin,
            is_synthetic,
            file,
            range,
        })
    }

    #[must_use]
    pub fn get(&self, id: BindingId) -> &Binding {
        &self.bindings[id]
    }

    pub fn get_mut(&mut self, id: BindingId) -> &mut Binding {
        &mut self.bindings[id]
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings.iter_enumerated()
    }

    /// Records that `node` resolved to `bindings`, and that each of those
    /// bindings was referenced from `node`. Both sides of this relation
    /// (§7's `references` map and each `Binding.refs` set) are always
    /// updated together, which is the "bidirectional reference integrity"
    /// invariant checked in the analyzer's tests.
    ///
    /// `references[node]` stays deduplicated (§3: "deduplicated,
    /// insertion-ordered") even when the same node is re-visited against the
    /// same binding more than once, e.g. a free variable read from inside a
    /// function body that gets re-run once per distinct call-argument shape.
    pub fn add_reference(&mut self, node: NodeKey, bindings: &[BindingId]) {
        for &id in bindings {
            self.bindings[id].refs.insert(node);
        }
        let entry = self.references.entry(node).or_default();
        for &id in bindings {
            if !entry.contains(&id) {
                entry.push(id);
            }
        }
    }

    #[must_use]
    pub fn references_for(&self, node: NodeKey) -> &[BindingId] {
        self.references.get(&node).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn references(&self) -> &rustc_hash::FxHashMap<NodeKey, Vec<BindingId>> {
        &self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeArena;

    /// `NodeKey` has no public constructor besides `from_node`; tests that
    /// only need distinct, stable identities leak a throwaway `ExprName` per
    /// call rather than fabricating a full module to borrow nodes from.
    fn key(name: &'static str) -> NodeKey {
        let node: &'static ruff_python_ast::ExprName = Box::leak(Box::new(ruff_python_ast::ExprName {
            range: ruff_text_size::TextRange::default(),
            id: ruff_python_ast::name::Name::new_static(name),
            ctx: ruff_python_ast::ExprContext::Load,
        }));
        NodeKey::from_node(node)
    }

    #[test]
    fn unreferenced_binding_is_unused() {
        let mut arena = TypeArena::new();
        let mut registry = BindingRegistry::new();
        let unknown = arena.unknown();
        let binding_site = key("x_def");
        let id = registry.create_binding(
            "x",
            binding_site,
            unknown,
            BindingKind::Variable,
            false,
            false,
            PathBuf::new(),
            TextRange::default(),
        );
        assert!(registry.get(id).is_unused());

        let use_site = key("x_use");
        registry.add_reference(use_site, &[id]);
        assert!(!registry.get(id).is_unused());
        assert_eq!(registry.references_for(use_site), &[id]);
    }
}
