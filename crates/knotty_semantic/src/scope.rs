//! Hierarchical scopes (§4): the lexical and attribute lookup structure the
//! driver resolves every name against.
//!
//! Modeled on `red_knot_python_semantic::semantic_index::symbol::{Scope,
//! SymbolTable}` for the table-plus-parent-chain shape, and on
//! `semantic_index::builder`'s node-type-to-`ScopeKind` mapping.

use rustc_hash::FxHashMap;
use ruff_index::{newtype_index, IndexVec};

use crate::binding::BindingId;
use crate::name::ModuleName;
use crate::types::{DataType, TypeArena, TypeId};

#[newtype_index]
pub struct ScopeId;

/// What introduced a [`Scope`] (§4). Only `Class` scopes get the
/// nested-function free-variable skip in [`ScopeArena::lookup_lexical`];
/// every other kind participates normally in lexical lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Module,
    Class,
    Function,
    /// The namespace of one instantiation of a class, distinct from the
    /// class's own body scope so that instance attributes (`self.x = ...`)
    /// don't leak into the class's shared namespace.
    Instance,
    /// A generic nested namespace with no special lookup behavior of its
    /// own (comprehension bodies, etc. — §4.5.1 visits these for side
    /// effects without a dedicated inference rule).
    Scope,
}

/// A single lexical namespace: a name table plus a link to its enclosing
/// scope.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    table: FxHashMap<compact_str::CompactString, Vec<BindingId>>,
    /// The dotted path this scope is addressable at from the project root,
    /// set once for `Module`/`Class` scopes when they're created and read
    /// back by the module loader and by diagnostic rendering.
    path: Option<ModuleName>,
}

impl Scope {
    #[must_use]
    pub fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            table: FxHashMap::default(),
            path: None,
        }
    }
}

/// Owns every [`Scope`] created during an analysis run.
///
/// Scopes reference each other only by [`ScopeId`], and types reference
/// scopes the same way (a `Class`/`Module`/`Fun` [`DataType`] carries the
/// `ScopeId` of the namespace it introduces), which is what lets the type
/// arena, the binding registry, and the scope arena all live side by side
/// without Rust-level ownership cycles between them.
#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: IndexVec<ScopeId, Scope>,
}

impl ScopeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope::new(kind, parent))
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    pub fn set_path(&mut self, id: ScopeId, path: ModuleName) {
        self.scopes[id].path = Some(path);
    }

    #[must_use]
    pub fn get_path(&self, id: ScopeId) -> Option<&ModuleName> {
        self.scopes[id].path.as_ref()
    }

    /// Binds `name` to `binding` in `scope`'s own table. Rebinding the same
    /// name (e.g. reassignment, or a second branch of an `if`) appends
    /// rather than replaces, so a later lookup sees every binding that could
    /// be live at that point; the driver is responsible for widening their
    /// types into one when it needs a single answer.
    pub fn bind(&mut self, scope: ScopeId, name: impl Into<compact_str::CompactString>, binding: BindingId) {
        self.scopes[scope].table.entry(name.into()).or_default().push(binding);
    }

    #[must_use]
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> &[BindingId] {
        self.scopes[scope]
            .table
            .get(name)
            .map_or(&[], Vec::as_slice)
    }

    /// Walks `scope` and its ancestors outward, returning the first scope
    /// that binds `name` locally.
    ///
    /// A `Class` scope is skipped when it is merely an *ancestor* being
    /// walked through on the way up from a nested function body — Python's
    /// free-variable resolution never reaches into an enclosing class body
    /// — but not when `scope` itself is that class scope (an expression
    /// appearing directly in the class body, e.g. a base-class's keyword
    /// argument, still resolves names against its own class scope first).
    #[must_use]
    pub fn lookup_lexical(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &[BindingId])> {
        let start_bindings = self.lookup_local(scope, name);
        if !start_bindings.is_empty() {
            return Some((scope, start_bindings));
        }

        let mut current = self.scopes[scope].parent;
        while let Some(id) = current {
            let candidate = &self.scopes[id];
            if candidate.kind != ScopeKind::Class {
                let bindings = self.lookup_local(id, name);
                if !bindings.is_empty() {
                    return Some((id, bindings));
                }
            }
            current = candidate.parent;
        }
        None
    }

    /// Resolves `name` as an attribute of `receiver` (§4.6): looks in the
    /// class/module/instance's own body scope, and for an `Instance`, falls
    /// back through its class's bases left-to-right when the class scope
    /// itself doesn't bind the name.
    ///
    /// Deliberately does *not* recurse into a base's own bases by walking
    /// `bases` transitively in one pass; rather it follows `DataType::Class`
    /// values, each of which already carries its own `bases` list, so
    /// multi-level inheritance falls out of the loop below without a
    /// separate MRO computation (§9: no C3 linearization).
    #[must_use]
    pub fn lookup_attribute(&self, types: &TypeArena, receiver: TypeId, name: &str) -> Option<&[BindingId]> {
        match types.get(receiver) {
            DataType::Module(module) => {
                let bindings = self.lookup_local(module.file_scope, name);
                (!bindings.is_empty()).then_some(bindings)
            }
            DataType::Class(class) => {
                let bindings = self.lookup_local(class.body_scope, name);
                if !bindings.is_empty() {
                    return Some(bindings);
                }
                class
                    .bases
                    .iter()
                    .find_map(|&base| self.lookup_attribute(types, base, name))
            }
            DataType::Instance(class_id) => self.lookup_attribute(types, *class_id, name),
            _ => None,
        }
    }

    /// Resolves a dotted path (`a.b.c`) starting from `scope`'s lexical
    /// environment: the head resolves lexically, every following segment
    /// resolves as an attribute of the previous segment's widened type.
    /// Each step widens every binding found for that segment into one type
    /// before the next segment is resolved against it.
    pub fn lookup_qualified(
        &self,
        bindings: &crate::binding::BindingRegistry,
        types: &mut TypeArena,
        scope: ScopeId,
        path: &[&str],
    ) -> Option<TypeId> {
        let (first, rest) = path.split_first()?;
        let (_, head_bindings) = self.lookup_lexical(scope, first)?;
        let mut current = types.union_all(head_bindings.iter().map(|&id| bindings.get(id).ty));

        for segment in rest {
            let attr_bindings = self.lookup_attribute(types, current, segment)?;
            current = types.union_all(attr_bindings.iter().map(|&id| bindings.get(id).ty));
        }
        Some(current)
    }

    /// Folds `source`'s bindings into `target`'s table (union of binding
    /// lists per name), used when two control-flow paths that each extended
    /// a copy of the same base scope need to be reconciled back into one.
    pub fn merge(&mut self, target: ScopeId, source: ScopeId) {
        let source_table = self.scopes[source].table.clone();
        let target_scope = &mut self.scopes[target];
        for (name, mut bindings) in source_table {
            let entry = target_scope.table.entry(name).or_default();
            entry.append(&mut bindings);
            entry.sort_unstable();
            entry.dedup();
        }
    }

    /// Creates a new scope with the same kind, parent, and table as `scope`
    /// (but a distinct `ScopeId`), for re-running a function body against a
    /// fresh copy of its parameter bindings on each distinct call shape
    /// (§6: the call-stack/memo pattern never reuses one parameter scope
    /// across different argument types).
    #[must_use]
    pub fn copy(&mut self, scope: ScopeId) -> ScopeId {
        let cloned = self.scopes[scope].clone();
        self.scopes.push(cloned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingKind, BindingRegistry};

    fn leaf_key(name: &'static str) -> crate::node_key::NodeKey {
        let node: &'static ruff_python_ast::ExprName = Box::leak(Box::new(ruff_python_ast::ExprName {
            range: ruff_text_size::TextRange::default(),
            id: ruff_python_ast::name::Name::new_static(name),
            ctx: ruff_python_ast::ExprContext::Load,
        }));
        crate::node_key::NodeKey::from_node(node)
    }

    #[test]
    fn lexical_lookup_skips_ancestor_class_scopes() {
        let mut scopes = ScopeArena::new();
        let mut bindings = BindingRegistry::new();
        let mut types = TypeArena::new();
        let unknown = types.unknown();

        let module = scopes.create(ScopeKind::Module, None);
        let class_scope = scopes.create(ScopeKind::Class, Some(module));
        let method_scope = scopes.create(ScopeKind::Function, Some(class_scope));

        let class_attr = bindings.create_binding(
            "shared",
            leaf_key("shared_def"),
            unknown,
            BindingKind::Attribute,
            false,
            false,
            std::path::PathBuf::new(),
            ruff_text_size::TextRange::default(),
        );
        scopes.bind(class_scope, "shared", class_attr);

        // A nested function cannot see the class body's own bindings as
        // free variables.
        assert!(scopes.lookup_lexical(method_scope, "shared").is_none());

        // But an expression evaluated directly in the class body can.
        assert!(scopes.lookup_lexical(class_scope, "shared").is_some());
    }

    #[test]
    fn attribute_lookup_falls_back_through_bases() {
        let mut scopes = ScopeArena::new();
        let mut bindings = BindingRegistry::new();
        let mut types = TypeArena::new();
        let unknown = types.unknown();

        let module = scopes.create(ScopeKind::Module, None);
        let base_scope = scopes.create(ScopeKind::Class, Some(module));
        let derived_scope = scopes.create(ScopeKind::Class, Some(module));

        let base_method = bindings.create_binding(
            "greet",
            leaf_key("greet_def"),
            unknown,
            BindingKind::Method,
            false,
            false,
            std::path::PathBuf::new(),
            ruff_text_size::TextRange::default(),
        );
        scopes.bind(base_scope, "greet", base_method);

        let base_class = types.intern(DataType::Class(crate::types::ClassType {
            name: "Base".into(),
            def: None,
            bases: Box::new([]),
            body_scope: base_scope,
        }));
        let derived_class = types.intern(DataType::Class(crate::types::ClassType {
            name: "Derived".into(),
            def: None,
            bases: Box::new([base_class]),
            body_scope: derived_scope,
        }));
        let instance = types.intern(DataType::Instance(derived_class));

        let found = scopes.lookup_attribute(&types, instance, "greet");
        assert_eq!(found, Some(&[base_method][..]));
        assert!(scopes.lookup_attribute(&types, instance, "missing").is_none());
    }
}
