//! The type lattice (§2): [`DataType`], its arena, and the union ("widen
//! into") operation.
//!
//! Modeled on `red_knot_python_semantic::types::Type` (the tagged-union
//! shape: a handful of atoms plus compound variants that reference other
//! types by id) and `types/builder.rs`'s `UnionBuilder` (flatten-then-dedup
//! construction of unions).

use compact_str::CompactString;
use ruff_index::{newtype_index, IndexVec};
use rustc_hash::FxHashMap;

use crate::ast_node_ref::AstNodeRef;
use crate::scope::ScopeId;
use ruff_python_ast as ast;

#[newtype_index]
pub struct TypeId;

/// One parameter of a [`FunType`], enough to type-check a call site against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamInfo {
    pub name: CompactString,
    /// `Some` when the parameter has a default value; its type contributes
    /// to the parameter's type when the caller omits an argument.
    pub default: Option<TypeId>,
    pub is_vararg: bool,
    pub is_kwarg: bool,
}

/// A callable: a `def`, optionally bound to a receiver.
///
/// `def` is `None` for synthetic callables installed by the builtins seeder
/// that have no source-level definition to point at. `self_type` starts
/// unset and is populated by producing a *new*, separately interned
/// `FunType` when the driver resolves a bound-method attribute access (§4.6)
/// — the unbound and bound versions of the same `def` are different types,
/// not the same type mutated in place, which keeps every `TypeId` referring
/// to one immutable value for its whole life.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunType {
    pub name: CompactString,
    pub def: Option<AstNodeRef<ast::StmtFunctionDef>>,
    pub params: Box<[ParamInfo]>,
    pub return_type: TypeId,
    pub env_scope: ScopeId,
    pub self_type: Option<TypeId>,
}

impl FunType {
    #[must_use]
    pub fn bind_self(&self, self_type: TypeId) -> Self {
        Self {
            self_type: Some(self_type),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub name: CompactString,
    pub def: Option<AstNodeRef<ast::StmtClassDef>>,
    /// Base classes, in MRO-relevant order (no C3 linearization: §5 keeps
    /// base-class attribute lookup to a simple first-match left-to-right
    /// walk, per the Non-goals list).
    pub bases: Box<[TypeId]>,
    pub body_scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleType {
    pub name: CompactString,
    pub file_scope: ScopeId,
}

/// The value lattice (§2). Every [`TypeId`] in the arena resolves to exactly
/// one of these; compound variants reference other types by id rather than
/// embedding them, which is what lets two equal-by-value compound types
/// collapse to the same arena slot during interning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Float,
    Bool,
    Str,
    Bytes,
    NoneType,
    Complex,
    /// No information could be derived; the identity element of [`union`].
    Unknown,
    List(TypeId),
    Dict(TypeId, TypeId),
    Tuple(Box<[TypeId]>),
    Set(TypeId),
    Fun(FunType),
    Class(ClassType),
    Instance(TypeId),
    Module(ModuleType),
    /// Sorted by `TypeId`, deduplicated, length >= 2. Never contains another
    /// `Union` (flattened at construction) or `Unknown` (absorbed).
    Union(Box<[TypeId]>),
}

/// Structural-hash interning arena for [`DataType`]s (§2, Design Notes:
/// "arena-based allocation with stable integer ids").
///
/// A `DataType` is only ever compared through the `TypeId` that names it:
/// interning guarantees that two structurally-equal `DataType` values always
/// resolve to the same `TypeId`, so `TypeId` equality *is* type equality.
#[derive(Debug, Default)]
pub struct TypeArena {
    types: IndexVec<TypeId, DataType>,
    index: FxHashMap<DataType, TypeId>,
}

impl TypeArena {
    #[must_use]
    pub fn new() -> Self {
        let mut arena = Self::default();
        // Interned once up front so every caller gets the same `Unknown`
        // and `NoneType` id; not load-bearing (interning would dedup these
        // anyway) but keeps well-known constants cheap to hand out.
        arena.intern(DataType::Unknown);
        arena.intern(DataType::NoneType);
        arena
    }

    #[must_use]
    pub fn unknown(&self) -> TypeId {
        TypeId::from_usize(0)
    }

    #[must_use]
    pub fn none_type(&self) -> TypeId {
        TypeId::from_usize(1)
    }

    pub fn intern(&mut self, ty: DataType) -> TypeId {
        if let Some(&id) = self.index.get(&ty) {
            return id;
        }
        let id = self.types.push(ty.clone());
        self.index.insert(ty, id);
        id
    }

    #[must_use]
    pub fn get(&self, id: TypeId) -> &DataType {
        &self.types[id]
    }

    /// Every interned type, for callers that need to scan the whole
    /// universe rather than look one up by id (e.g. finding every bound
    /// method produced during a run).
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &DataType)> {
        self.types.iter_enumerated()
    }

    /// Widens `a` and `b` into a single type describing values that could be
    /// either (§2: "the union operation ... models control-flow merge").
    ///
    /// Commutative and associative, `union(a, a) == a`, `union(Unknown, x)
    /// == x`, and nested unions are flattened rather than nested, so
    /// `union(union(a, b), c)` and `union(a, union(b, c))` intern to the same
    /// `TypeId`.
    pub fn union(&mut self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if a == self.unknown() {
            return b;
        }
        if b == self.unknown() {
            return a;
        }

        let mut members = Vec::new();
        self.collect_union_members(a, &mut members);
        self.collect_union_members(b, &mut members);
        members.sort_unstable();
        members.dedup();

        match members.len() {
            0 => self.unknown(),
            1 => members[0],
            _ => self.intern(DataType::Union(members.into_boxed_slice())),
        }
    }

    /// Widens an arbitrary number of types in one pass; `union_all(&[])` is
    /// `Unknown`, the identity element.
    pub fn union_all(&mut self, types: impl IntoIterator<Item = TypeId>) -> TypeId {
        types
            .into_iter()
            .fold(self.unknown(), |acc, ty| self.union(acc, ty))
    }

    fn collect_union_members(&self, id: TypeId, out: &mut Vec<TypeId>) {
        match self.get(id) {
            DataType::Union(members) => out.extend_from_slice(members),
            _ => out.push(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataType, TypeArena};

    #[test]
    fn union_is_commutative_and_idempotent() {
        let mut arena = TypeArena::new();
        let int = arena.intern(DataType::Int);
        let str_ = arena.intern(DataType::Str);

        let ab = arena.union(int, str_);
        let ba = arena.union(str_, int);
        assert_eq!(ab, ba);
        assert_eq!(arena.union(int, int), int);
    }

    #[test]
    fn unknown_is_the_union_identity() {
        let mut arena = TypeArena::new();
        let int = arena.intern(DataType::Int);
        let unknown = arena.unknown();
        assert_eq!(arena.union(unknown, int), int);
        assert_eq!(arena.union(int, unknown), int);
    }

    #[test]
    fn nested_unions_flatten_and_dedup() {
        let mut arena = TypeArena::new();
        let int = arena.intern(DataType::Int);
        let str_ = arena.intern(DataType::Str);
        let bool_ = arena.intern(DataType::Bool);

        let left = arena.union(int, str_);
        let nested = arena.union(left, bool_);
        let flat = arena.union_all([int, str_, bool_]);
        assert_eq!(nested, flat);

        match arena.get(flat) {
            DataType::Union(members) => assert_eq!(members.len(), 3),
            other => panic!("expected a flattened union, got {other:?}"),
        }
    }

    #[test]
    fn structurally_equal_compounds_intern_to_the_same_id() {
        let mut arena = TypeArena::new();
        let int = arena.intern(DataType::Int);
        let list_a = arena.intern(DataType::List(int));
        let list_b = arena.intern(DataType::List(int));
        assert_eq!(list_a, list_b);
    }
}
