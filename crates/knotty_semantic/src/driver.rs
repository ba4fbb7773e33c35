//! The inference driver (§5): `visit(node, scope) -> DataType`, applied node
//! by node.
//!
//! Modeled on `red_knot_python_semantic::types::infer::TypeInferenceBuilder`,
//! whose `infer_expression`/`infer_statement` methods this crate's
//! `infer_expr`/`infer_stmt` mirror one for one — minus Salsa's per-node
//! caching, since this crate memoizes only at function-call granularity
//! (`Ctx::memo`), not per-expression.
//!
//! Module loading (`import` statements) is handled in this same module via
//! [`resolve_import`]/[`infer_file`] rather than through a separate
//! collaborator: loading a module means parsing it and then running
//! exactly this file's `infer_stmt` over its body, so the two are mutually
//! recursive by nature. [`Ctx`] bundles the module loader in alongside the
//! type/scope/binding arenas for that reason — every field is reached
//! through one ordinary `&mut Ctx`, reborrowed down the call stack the way
//! any recursive-descent interpreter would, with no stored callbacks.

use std::path::{Path, PathBuf};

use ruff_python_ast as ast;
use ruff_text_size::Ranged;
use rustc_hash::{FxHashMap, FxHashSet};

use knotty_db::fs::FileSystem;

use crate::ast::AstProvider;
use crate::ast_node_ref::AstNodeRef;
use crate::binding::{BindingId, BindingKind, BindingRegistry};
use crate::diagnostic::{Diagnostic, RuleId, Severity};
use crate::module_resolver::ModuleLoader;
use crate::name::ModuleName;
use crate::node_key::NodeKey;
use crate::scope::{ScopeArena, ScopeId, ScopeKind};
use crate::types::{ClassType, DataType, FunType, ModuleType, ParamInfo, TypeArena, TypeId};

/// Everything inference needs, for the lifetime of one `analyze()` run.
/// Constructed once by [`crate::analyzer::Analyzer`] from its own fields
/// and threaded through every recursive call; nothing here is a trait
/// object or a closure, so the whole call graph (statement -> expression ->
/// call application -> import -> nested module's statements -> ...) is
/// ordinary mutually-recursive functions reborrowing the same `&mut Ctx`.
pub struct Ctx<'a, F, A> {
    pub types: &'a mut TypeArena,
    pub scopes: &'a mut ScopeArena,
    pub bindings: &'a mut BindingRegistry,
    pub diagnostics: &'a mut Vec<Diagnostic>,
    pub loader: &'a mut ModuleLoader<F, A>,
    pub synthetic_modules: &'a FxHashMap<ModuleName, TypeId>,
    pub global_scope: ScopeId,
    pub loaded_files: &'a mut FxHashSet<PathBuf>,
    pub failed_to_parse: &'a mut FxHashSet<PathBuf>,
    pub parse_errors: &'a mut FxHashMap<PathBuf, Vec<crate::ast::SyntaxError>>,
    /// Identifier-like nodes that resolved: plain name lookups (§4.5's
    /// "Identifier" rule) plus whole `import`/`import from` statements that
    /// located every name they asked for. Disjoint from `unresolved_names`
    /// by construction (§8 invariant 3): each node is inserted into exactly
    /// one of the two, never both.
    pub resolved_names: &'a mut FxHashSet<NodeKey>,
    pub unresolved_names: &'a mut FxHashSet<NodeKey>,
    /// `(function type, argument types) -> still being evaluated`, the
    /// reentrancy guard named in §5's call-application rule: a call
    /// observed while its own (function, args) pair is already on this
    /// stack resolves to `Unknown` rather than recursing forever.
    pub call_stack: &'a mut FxHashSet<(TypeId, Vec<TypeId>)>,
    /// Completed `(function, args) -> return type` results, consulted
    /// before re-running a call already seen with the same argument shapes.
    pub memo: &'a mut FxHashMap<(TypeId, Vec<TypeId>), TypeId>,
    /// Every `Fun` produced by a `FunctionDef` that has not yet been seen
    /// applied through a direct `Call`; drained to a fixed point by the
    /// analyzer so a function's body is still analyzed for diagnostics
    /// even if the program never calls it.
    pub uncalled: &'a mut Vec<TypeId>,
    /// The file currently being inferred; swapped (and restored) whenever
    /// inference descends into a different file, so diagnostics raised
    /// mid-call still point at the right source.
    pub file: PathBuf,
    /// The module currently being inferred, kept alive here so
    /// [`AstNodeRef`]s created while visiting it (for `def`/`class`
    /// bindings) can borrow into its tree; swapped the same way as `file`.
    pub current_module: crate::ast::ParsedModule,
    /// Appended to by a `return` statement evaluated while applying a call;
    /// a top-level "call" (module execution) ignores it.
    pub return_types: Vec<TypeId>,
}

/// Infers the type of `expr` evaluated in `scope`, recording bindings,
/// references, and diagnostics along the way. This is the `visit` contract
/// named in §5 specialized to expressions.
pub fn infer_expr<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, expr: &ast::Expr, scope: ScopeId) -> TypeId {
    match expr {
        ast::Expr::NumberLiteral(lit) => match &lit.value {
            ast::Number::Int(_) => ctx.types.intern(DataType::Int),
            ast::Number::Float(_) => ctx.types.intern(DataType::Float),
            ast::Number::Complex { .. } => ctx.types.intern(DataType::Complex),
        },
        ast::Expr::BooleanLiteral(_) => ctx.types.intern(DataType::Bool),
        ast::Expr::StringLiteral(_) => ctx.types.intern(DataType::Str),
        ast::Expr::BytesLiteral(_) => ctx.types.intern(DataType::Bytes),
        ast::Expr::NoneLiteral(_) => ctx.types.none_type(),
        ast::Expr::EllipsisLiteral(_) => ctx.types.unknown(),

        ast::Expr::List(list) => {
            let elem = infer_elements(ctx, &list.elts, scope);
            ctx.types.intern(DataType::List(elem))
        }
        ast::Expr::Set(set) => {
            let elem = infer_elements(ctx, &set.elts, scope);
            ctx.types.intern(DataType::Set(elem))
        }
        ast::Expr::Tuple(tuple) => {
            let members: Box<[TypeId]> = tuple
                .elts
                .iter()
                .map(|elt| infer_expr(ctx, elt, scope))
                .collect();
            ctx.types.intern(DataType::Tuple(members))
        }
        ast::Expr::Dict(dict) => {
            let unknown = ctx.types.unknown();
            let mut key_ty = unknown;
            let mut value_ty = unknown;
            for item in &dict.items {
                if let Some(key) = &item.key {
                    let k = infer_expr(ctx, key, scope);
                    key_ty = ctx.types.union(key_ty, k);
                }
                let v = infer_expr(ctx, &item.value, scope);
                value_ty = ctx.types.union(value_ty, v);
            }
            ctx.types.intern(DataType::Dict(key_ty, value_ty))
        }

        ast::Expr::Name(name) => infer_name(ctx, name, scope),
        ast::Expr::Attribute(attr) => infer_attribute(ctx, attr, scope),
        ast::Expr::Call(call) => infer_call(ctx, call, scope),

        ast::Expr::BoolOp(op) => {
            let members: Vec<TypeId> = op.values.iter().map(|v| infer_expr(ctx, v, scope)).collect();
            ctx.types.union_all(members)
        }
        ast::Expr::BinOp(op) => {
            let left = infer_expr(ctx, &op.left, scope);
            let right = infer_expr(ctx, &op.right, scope);
            ctx.types.union(left, right)
        }
        ast::Expr::UnaryOp(op) => infer_expr(ctx, &op.operand, scope),
        ast::Expr::Compare(cmp) => {
            infer_expr(ctx, &cmp.left, scope);
            for comparator in &cmp.comparators {
                infer_expr(ctx, comparator, scope);
            }
            ctx.types.intern(DataType::Bool)
        }

        ast::Expr::ListComp(comp) => infer_comprehension(ctx, &comp.generators, scope, |ctx, comp_scope| {
            infer_expr(ctx, &comp.elt, comp_scope);
        }),
        ast::Expr::SetComp(comp) => infer_comprehension(ctx, &comp.generators, scope, |ctx, comp_scope| {
            infer_expr(ctx, &comp.elt, comp_scope);
        }),
        ast::Expr::DictComp(comp) => infer_comprehension(ctx, &comp.generators, scope, |ctx, comp_scope| {
            infer_expr(ctx, &comp.key, comp_scope);
            infer_expr(ctx, &comp.value, comp_scope);
        }),
        ast::Expr::Generator(comp) => infer_comprehension(ctx, &comp.generators, scope, |ctx, comp_scope| {
            infer_expr(ctx, &comp.elt, comp_scope);
        }),

        // Walrus targets, conditional expressions, and slices are walked for
        // their side effects (so names used inside still get
        // reference-tracked) but contribute `Unknown`, per the driver's
        // scope note.
        _ => {
            walk_unhandled_expr(ctx, expr, scope);
            ctx.types.unknown()
        }
    }
}

/// Visits a comprehension's generator clauses (§4.5: comprehension scoping
/// is a Non-goal for the *type* of the result, but names bound/used inside
/// still get the same reference tracking any other scope gets). Creates one
/// fresh [`ScopeKind::Scope`] parented to `scope`, binds every generator
/// target against its iterable's best-effort element type, visits every
/// `if` clause, then runs `visit_body` (the comprehension's `elt`, or
/// `key`/`value` for a dict comprehension) in that scope. Always contributes
/// `Unknown` to the enclosing expression, per the driver's documented policy
/// of not modeling comprehension result types.
fn infer_comprehension<F: FileSystem, A: AstProvider>(
    ctx: &mut Ctx<F, A>,
    generators: &[ast::Comprehension],
    scope: ScopeId,
    visit_body: impl FnOnce(&mut Ctx<F, A>, ScopeId),
) -> TypeId {
    let comp_scope = ctx.scopes.create(ScopeKind::Scope, Some(scope));
    for generator in generators {
        let iter_ty = infer_expr(ctx, &generator.iter, comp_scope);
        let elem_ty = element_type_for_destructuring(ctx, iter_ty);
        bind_target(ctx, &generator.target, elem_ty, comp_scope);
        for condition in &generator.ifs {
            infer_expr(ctx, condition, comp_scope);
        }
    }
    visit_body(ctx, comp_scope);
    ctx.types.unknown()
}

fn infer_elements<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, elts: &[ast::Expr], scope: ScopeId) -> TypeId {
    let members: Vec<TypeId> = elts.iter().map(|e| infer_expr(ctx, e, scope)).collect();
    ctx.types.union_all(members)
}

/// Best-effort traversal for expression kinds the driver has no dedicated
/// inference rule for (`:=`, a ternary `if`/`else`, and slice subscripts):
/// recurses into their sub-expressions so a name nested inside still gets
/// looked up and reference-tracked, without producing a bespoke type.
fn walk_unhandled_expr<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, expr: &ast::Expr, scope: ScopeId) {
    match expr {
        ast::Expr::Starred(s) => {
            infer_expr(ctx, &s.value, scope);
        }
        ast::Expr::Named(n) => {
            infer_expr(ctx, &n.value, scope);
        }
        ast::Expr::If(if_expr) => {
            infer_expr(ctx, &if_expr.test, scope);
            infer_expr(ctx, &if_expr.body, scope);
            infer_expr(ctx, &if_expr.orelse, scope);
        }
        ast::Expr::Slice(slice) => {
            for part in [&slice.lower, &slice.upper, &slice.step].into_iter().flatten() {
                infer_expr(ctx, part, scope);
            }
        }
        _ => {}
    }
}

fn infer_name<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, name: &ast::ExprName, scope: ScopeId) -> TypeId {
    let node = NodeKey::from_node(name);
    match name.ctx {
        ast::ExprContext::Store | ast::ExprContext::Del => ctx.types.unknown(),
        _ => {
            let Some((_, found)) = ctx.scopes.lookup_lexical(scope, name.id.as_str()) else {
                // §7: an unresolved name at a use site is non-fatal and
                // raises no diagnostic by default; it only shows up in
                // `unresolved_names`.
                ctx.unresolved_names.insert(node);
                return ctx.types.unknown();
            };
            let ids: Vec<BindingId> = found.to_vec();
            ctx.bindings.add_reference(node, &ids);
            ctx.resolved_names.insert(node);
            ctx.types.union_all(ids.iter().map(|&id| ctx.bindings.get(id).ty))
        }
    }
}

fn infer_attribute<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, attr: &ast::ExprAttribute, scope: ScopeId) -> TypeId {
    let receiver = infer_expr(ctx, &attr.value, scope);
    let node = NodeKey::from_node(attr);
    let is_instance_receiver = matches!(ctx.types.get(receiver), DataType::Instance(_));

    // §7: attribute resolution failure is non-fatal and raises no
    // diagnostic by default, the same policy as an unresolved bare name.
    let Some(found) = ctx.scopes.lookup_attribute(&*ctx.types, receiver, attr.attr.as_str()) else {
        return ctx.types.unknown();
    };
    let ids: Vec<BindingId> = found.to_vec();
    ctx.bindings.add_reference(node, &ids);

    // A method found through an instance gets bound to that instance: a
    // fresh, separately interned `Fun` carrying `self_type`, per §4.6.
    let member_types: Vec<TypeId> = ids
        .iter()
        .map(|&id| {
            let ty = ctx.bindings.get(id).ty;
            if is_instance_receiver {
                if let DataType::Fun(fun) = ctx.types.get(ty) {
                    let bound = fun.bind_self(receiver);
                    return ctx.types.intern(DataType::Fun(bound));
                }
            }
            ty
        })
        .collect();
    ctx.types.union_all(member_types)
}

fn infer_call<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, call: &ast::ExprCall, scope: ScopeId) -> TypeId {
    let callee = infer_expr(ctx, &call.func, scope);
    let mut arg_types: Vec<TypeId> = call
        .arguments
        .args
        .iter()
        .map(|arg| infer_expr(ctx, arg, scope))
        .collect();
    for keyword in &call.arguments.keywords {
        arg_types.push(infer_expr(ctx, &keyword.value, scope));
    }

    call_callee(ctx, callee, &arg_types, call.func.range())
}

/// Applies a called value to `arg_types` (§4.5's Call rule). A `Union`
/// callee widens over its members — each constituent is applied (or
/// constructed, or rejected) independently and the results joined — rather
/// than being treated as a single opaque type.
fn call_callee<F: FileSystem, A: AstProvider>(
    ctx: &mut Ctx<F, A>,
    callee: TypeId,
    arg_types: &[TypeId],
    call_range: ruff_text_size::TextRange,
) -> TypeId {
    match ctx.types.get(callee).clone() {
        DataType::Fun(fun) => apply_function(ctx, callee, &fun, arg_types),
        DataType::Class(class) => {
            // Constructing an instance: arguments are evaluated (above) for
            // their side effects and reference tracking, but this crate
            // does not model `__init__` parameter checking against them.
            let _ = &class;
            ctx.types.intern(DataType::Instance(callee))
        }
        DataType::Union(members) => {
            let results: Vec<TypeId> = members
                .iter()
                .map(|&member| call_callee(ctx, member, arg_types, call_range))
                .collect();
            ctx.types.union_all(results)
        }
        DataType::Unknown => ctx.types.unknown(),
        _ => {
            // §7: "non-callable in call position" is the one named example
            // of a type-mismatch-during-application that does get recorded.
            ctx.diagnostics.push(Diagnostic::new(
                RuleId::NonCallable,
                Severity::Error,
                ctx.file.to_path_buf(),
                call_range,
                "call to a non-callable value".to_string(),
            ));
            ctx.types.unknown()
        }
    }
}

/// Applies `fun` to `arg_types`, guarding against unbounded recursion with
/// the call-stack/memo pattern named in §5 and the Design Notes: a call
/// already in flight with the same (function, arguments) shape resolves to
/// `Unknown` instead of recursing; a call already completed with that shape
/// is served from `memo` instead of re-running the body.
pub fn apply_function<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, fun_id: TypeId, fun: &FunType, arg_types: &[TypeId]) -> TypeId {
    ctx.uncalled.retain(|&id| id != fun_id);

    let key = (fun_id, arg_types.to_vec());
    if let Some(&cached) = ctx.memo.get(&key) {
        return cached;
    }
    if ctx.call_stack.contains(&key) {
        return ctx.types.unknown();
    }

    let Some(def) = &fun.def else {
        // A synthetic builtin with no body to run; its declared return
        // type (`Unknown` unless the seeder narrowed it) is the answer.
        return fun.return_type;
    };

    ctx.call_stack.insert(key.clone());
    let call_scope = ctx.scopes.copy(fun.env_scope);
    bind_parameters(ctx, def, call_scope, arg_types, fun.self_type);

    // A call can cross a module boundary (an imported function is being
    // invoked); `def`'s own `AstNodeRef` already keeps its defining
    // module's tree alive, but `current_module` also needs to point there
    // for the duration of the call, since the body may itself contain
    // nested `def`/`class` statements that create fresh `AstNodeRef`s.
    let saved_module = std::mem::replace(&mut ctx.current_module, def.owner());
    let saved_returns = std::mem::take(&mut ctx.return_types);
    for stmt in &def.node().body {
        infer_stmt(ctx, stmt, call_scope);
    }
    let returns = std::mem::replace(&mut ctx.return_types, saved_returns);
    ctx.current_module = saved_module;

    ctx.call_stack.remove(&key);

    let result = if returns.is_empty() {
        ctx.types.none_type()
    } else {
        ctx.types.union_all(returns)
    };
    ctx.memo.insert(key, result);
    result
}

/// Binds each positional parameter to its actual argument type. When `fun`
/// was bound to a receiver (§4.6: a method looked up through an `Instance`),
/// `self_type` is `Some` and the call's own `arg_types` never include an
/// explicit `self` — the first parameter takes the receiver directly, and
/// every following parameter takes `arg_types[i - 1]` instead of
/// `arg_types[i]`.
fn bind_parameters<F: FileSystem, A: AstProvider>(
    ctx: &mut Ctx<F, A>,
    def: &AstNodeRef<ast::StmtFunctionDef>,
    call_scope: ScopeId,
    arg_types: &[TypeId],
    self_type: Option<TypeId>,
) {
    let params = &def.node().parameters;
    let positional: Vec<&ast::ParameterWithDefault> = params
        .posonlyargs
        .iter()
        .chain(&params.args)
        .collect();

    for (i, param) in positional.iter().enumerate() {
        let node = NodeKey::from_node(&param.parameter);
        let ty = match (i, self_type) {
            (0, Some(recv)) => recv,
            (i, Some(_)) => arg_types.get(i - 1).copied().unwrap_or_else(|| ctx.types.unknown()),
            (i, None) => arg_types.get(i).copied().unwrap_or_else(|| ctx.types.unknown()),
        };
        let binding = ctx.bindings.create_binding(
            param.parameter.name.id.as_str(),
            node,
            ty,
            BindingKind::Parameter,
            false,
            false,
            ctx.file.clone(),
            param.parameter.range(),
        );
        ctx.scopes.bind(call_scope, param.parameter.name.id.as_str(), binding);
    }
}

/// Applies `visit` to a statement (§5), threading assignment, control-flow,
/// and definition handling through `scope`.
pub fn infer_stmt<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, stmt: &ast::Stmt, scope: ScopeId) {
    match stmt {
        ast::Stmt::Expr(expr_stmt) => {
            infer_expr(ctx, &expr_stmt.value, scope);
        }
        ast::Stmt::Assign(assign) => infer_assign(ctx, assign, scope),
        ast::Stmt::AnnAssign(ann) => infer_ann_assign(ctx, ann, scope),
        ast::Stmt::AugAssign(aug) => infer_aug_assign(ctx, aug, scope),
        ast::Stmt::Return(ret) => {
            let ty = match &ret.value {
                Some(value) => infer_expr(ctx, value, scope),
                None => ctx.types.none_type(),
            };
            ctx.return_types.push(ty);
        }
        ast::Stmt::FunctionDef(def) => infer_function_def(ctx, def, scope),
        ast::Stmt::ClassDef(def) => infer_class_def(ctx, def, scope),
        ast::Stmt::Import(import) => infer_import(ctx, import, scope),
        ast::Stmt::ImportFrom(import_from) => infer_import_from(ctx, import_from, scope),

        ast::Stmt::If(if_stmt) => {
            infer_expr(ctx, &if_stmt.test, scope);
            for clause in &if_stmt.elif_else_clauses {
                if let Some(test) = &clause.test {
                    infer_expr(ctx, test, scope);
                }
                for inner in &clause.body {
                    infer_stmt(ctx, inner, scope);
                }
            }
            for inner in &if_stmt.body {
                infer_stmt(ctx, inner, scope);
            }
        }
        ast::Stmt::While(while_stmt) => {
            infer_expr(ctx, &while_stmt.test, scope);
            for inner in &while_stmt.body {
                infer_stmt(ctx, inner, scope);
            }
        }
        ast::Stmt::For(for_stmt) => {
            let iter_ty = infer_expr(ctx, &for_stmt.iter, scope);
            bind_target(ctx, &for_stmt.target, iter_ty, scope);
            for inner in &for_stmt.body {
                infer_stmt(ctx, inner, scope);
            }
        }
        ast::Stmt::With(with_stmt) => {
            for item in &with_stmt.items {
                let ty = infer_expr(ctx, &item.context_expr, scope);
                if let Some(target) = &item.optional_vars {
                    bind_target(ctx, target, ty, scope);
                }
            }
            for inner in &with_stmt.body {
                infer_stmt(ctx, inner, scope);
            }
        }

        ast::Stmt::Assert(assert_stmt) => {
            infer_expr(ctx, &assert_stmt.test, scope);
            if let Some(msg) = &assert_stmt.msg {
                infer_expr(ctx, msg, scope);
            }
        }
        ast::Stmt::Raise(raise_stmt) => {
            if let Some(exc) = &raise_stmt.exc {
                infer_expr(ctx, exc, scope);
            }
            if let Some(cause) = &raise_stmt.cause {
                infer_expr(ctx, cause, scope);
            }
        }
        ast::Stmt::Delete(delete_stmt) => {
            for target in &delete_stmt.targets {
                infer_expr(ctx, target, scope);
            }
        }

        ast::Stmt::Try(try_stmt) => {
            for inner in &try_stmt.body {
                infer_stmt(ctx, inner, scope);
            }
            for handler in &try_stmt.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                if let Some(exception_ty) = &handler.type_ {
                    infer_expr(ctx, exception_ty, scope);
                }
                for inner in &handler.body {
                    infer_stmt(ctx, inner, scope);
                }
            }
            for inner in &try_stmt.orelse {
                infer_stmt(ctx, inner, scope);
            }
            for inner in &try_stmt.finalbody {
                infer_stmt(ctx, inner, scope);
            }
        }

        ast::Stmt::Match(match_stmt) => {
            infer_expr(ctx, &match_stmt.subject, scope);
            for case in &match_stmt.cases {
                // Pattern matching itself (capture names bound by `case
                // Foo(x)` / `case [a, *rest]` / `case {"k": v}`) is the
                // Non-goal named in §4.5.1 ("match statement patterns");
                // only the guard and body are visited.
                if let Some(guard) = &case.guard {
                    infer_expr(ctx, guard, scope);
                }
                for inner in &case.body {
                    infer_stmt(ctx, inner, scope);
                }
            }
        }

        // `pass`, `global`, `nonlocal`, `async for`/`async with` have no
        // dedicated rule: they introduce no expression worth inferring
        // (`global`/`nonlocal`) or are structurally identical to their
        // synchronous counterpart's side effects, which the parser already
        // folds into the same node kinds handled above.
        _ => {}
    }
}

fn infer_assign<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, assign: &ast::StmtAssign, scope: ScopeId) {
    let value_ty = infer_expr(ctx, &assign.value, scope);
    for target in &assign.targets {
        bind_target(ctx, target, value_ty, scope);
    }
}

fn infer_ann_assign<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, ann: &ast::StmtAnnAssign, scope: ScopeId) {
    let ty = match &ann.value {
        Some(value) => infer_expr(ctx, value, scope),
        None => ctx.types.unknown(),
    };
    bind_target(ctx, &ann.target, ty, scope);
}

fn infer_aug_assign<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, aug: &ast::StmtAugAssign, scope: ScopeId) {
    let rhs = infer_expr(ctx, &aug.value, scope);
    let current = infer_expr(ctx, &aug.target, scope);
    let widened = ctx.types.union(current, rhs);
    bind_target(ctx, &aug.target, widened, scope);
}

/// Binds `target` to `ty` in `scope`: a plain name binds directly; an
/// attribute target binds on the receiver's class scope; a tuple/list
/// target destructures, widening `ty`'s element type (if any) into every
/// name it introduces.
fn bind_target<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, target: &ast::Expr, ty: TypeId, scope: ScopeId) {
    match target {
        ast::Expr::Name(name) => {
            let kind = if ctx.scopes.get(scope).kind == ScopeKind::Class {
                BindingKind::Attribute
            } else {
                BindingKind::Variable
            };
            if widen_existing_binding(ctx, scope, name.id.as_str(), kind, ty) {
                return;
            }
            let node = NodeKey::from_node(name);
            let binding = ctx.bindings.create_binding(
                name.id.as_str(),
                node,
                ty,
                kind,
                false,
                false,
                ctx.file.clone(),
                name.range(),
            );
            ctx.scopes.bind(scope, name.id.as_str(), binding);
        }
        ast::Expr::Attribute(attr) => {
            let receiver = infer_expr(ctx, &attr.value, scope);
            if let DataType::Instance(class_id) = ctx.types.get(receiver) {
                let class_id = *class_id;
                if let DataType::Class(class) = ctx.types.get(class_id).clone() {
                    if widen_existing_binding(ctx, class.body_scope, attr.attr.as_str(), BindingKind::Attribute, ty) {
                        return;
                    }
                    let node = NodeKey::from_node(attr);
                    let binding = ctx.bindings.create_binding(
                        attr.attr.as_str(),
                        node,
                        ty,
                        BindingKind::Attribute,
                        false,
                        false,
                        ctx.file.clone(),
                        attr.range(),
                    );
                    ctx.scopes.bind(class.body_scope, attr.attr.as_str(), binding);
                }
            }
        }
        ast::Expr::Tuple(tuple) => {
            let element_ty = element_type_for_destructuring(ctx, ty);
            for elt in &tuple.elts {
                bind_target(ctx, elt, element_ty, scope);
            }
        }
        ast::Expr::List(list) => {
            let element_ty = element_type_for_destructuring(ctx, ty);
            for elt in &list.elts {
                bind_target(ctx, elt, element_ty, scope);
            }
        }
        ast::Expr::Starred(starred) => bind_target(ctx, &starred.value, ty, scope),
        _ => {}
    }
}

/// Implements §4.2's `bind` rule for plain re-assignment: rebinding a name
/// that already has exactly one local binding of the same kind widens that
/// binding's type in place (§8 scenario 2: `x = 1; x = "s"` produces one
/// binding for `x`, not two) rather than appending a second entry to
/// `table[name]`. A name with zero or more-than-one existing local bindings
/// falls through to a fresh entry instead — the multiple-bindings case is
/// left to the "Overloading" design note (distinct definition sites, e.g. a
/// `def`/`class` re-declared along different control-flow branches, keep
/// separate bindings so cross-references resolve to the right origin).
/// Returns whether an existing binding was widened.
fn widen_existing_binding<F: FileSystem, A: AstProvider>(
    ctx: &mut Ctx<F, A>,
    scope: ScopeId,
    name: &str,
    kind: BindingKind,
    ty: TypeId,
) -> bool {
    let existing: Vec<BindingId> = ctx.scopes.lookup_local(scope, name).to_vec();
    let [existing_id] = existing[..] else {
        return false;
    };
    if ctx.bindings.get(existing_id).kind != kind {
        return false;
    }
    let widened = ctx.types.union(ctx.bindings.get(existing_id).ty, ty);
    ctx.bindings.get_mut(existing_id).ty = widened;
    true
}

fn element_type_for_destructuring<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, ty: TypeId) -> TypeId {
    match ctx.types.get(ty).clone() {
        DataType::Tuple(members) => ctx.types.union_all(members.iter().copied()),
        DataType::List(elem) | DataType::Set(elem) => elem,
        _ => ctx.types.unknown(),
    }
}

fn infer_function_def<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, def: &ast::StmtFunctionDef, scope: ScopeId) {
    for decorator in &def.decorator_list {
        infer_expr(ctx, &decorator.expression, scope);
    }

    let env_scope = ctx.scopes.create(ScopeKind::Function, Some(scope));
    let unknown = ctx.types.unknown();

    let params: Box<[ParamInfo]> = def
        .parameters
        .posonlyargs
        .iter()
        .chain(&def.parameters.args)
        .map(|p| ParamInfo {
            name: p.parameter.name.id.as_str().into(),
            default: p.default.as_deref().map(|d| infer_expr(ctx, d, scope)),
            is_vararg: false,
            is_kwarg: false,
        })
        .collect();

    // SAFETY: `def` is borrowed from a `ParsedModule` this analyzer is
    // already holding alive for the duration of the run (see
    // `crate::ast::ParsedModule`); the `AstNodeRef` keeps that same handle
    // alive for as long as the resulting `FunType` does.
    #[allow(unsafe_code)]
    let def_ref = unsafe { AstNodeRef::new(ctx.current_module.clone(), def) };

    let fun_ty = ctx.types.intern(DataType::Fun(FunType {
        name: def.name.id.as_str().into(),
        def: Some(def_ref),
        params,
        return_type: unknown,
        env_scope,
        self_type: None,
    }));

    let kind = if ctx.scopes.get(scope).kind == ScopeKind::Class {
        BindingKind::Method
    } else {
        BindingKind::Function
    };
    let node = NodeKey::from_node(def);
    let binding = ctx.bindings.create_binding(
        def.name.id.as_str(),
        node,
        fun_ty,
        kind,
        false,
        false,
        ctx.file.clone(),
        def.name.range(),
    );
    ctx.scopes.bind(scope, def.name.id.as_str(), binding);
    ctx.uncalled.push(fun_ty);
}

fn infer_class_def<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, def: &ast::StmtClassDef, scope: ScopeId) {
    for decorator in &def.decorator_list {
        infer_expr(ctx, &decorator.expression, scope);
    }

    let bases: Box<[TypeId]> = def
        .arguments
        .as_ref()
        .map(|arguments| {
            arguments
                .args
                .iter()
                .map(|base| infer_expr(ctx, base, scope))
                .collect()
        })
        .unwrap_or_default();

    let body_scope = ctx.scopes.create(ScopeKind::Class, Some(scope));
    for stmt in &def.body {
        infer_stmt(ctx, stmt, body_scope);
    }

    let class_ty = ctx.types.intern(DataType::Class(ClassType {
        name: def.name.id.as_str().into(),
        def: None,
        bases,
        body_scope,
    }));

    let node = NodeKey::from_node(def);
    let binding = ctx.bindings.create_binding(
        def.name.id.as_str(),
        node,
        class_ty,
        BindingKind::Class,
        false,
        false,
        ctx.file.clone(),
        def.name.range(),
    );
    ctx.scopes.bind(scope, def.name.id.as_str(), binding);
}

fn infer_import<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, import: &ast::StmtImport, scope: ScopeId) {
    let _ = import;
    for alias in &import.names {
        // A fresh synthetic key per alias (rather than one shared key for
        // the whole `import` statement) so that `import a, b` with `a`
        // resolved and `b` not can record each independently without ever
        // putting the same node in both `resolved_names` and
        // `unresolved_names` (§8 invariant 3).
        let alias_node = NodeKey::synthetic();
        let Some(full_name) = ModuleName::new(alias.name.id.as_str()) else {
            continue;
        };
        match &alias.asname {
            Some(asname) => {
                let Some(ty) = resolve_import(ctx, &full_name) else {
                    ctx.unresolved_names.insert(alias_node);
                    continue;
                };
                ctx.resolved_names.insert(alias_node);
                bind_import_name(ctx, asname.id.as_str(), ty, scope);
            }
            None => {
                // `import a.b.c` binds only `a` in the caller's scope, but
                // every intermediate package along the way still has to be
                // located, loaded, and exposed as an attribute of its parent
                // (§4.4 step 4), so that a later `a.b.c.whatever` resolves.
                let Some(head_ty) = resolve_import_chain(ctx, &full_name) else {
                    ctx.unresolved_names.insert(alias_node);
                    continue;
                };
                ctx.resolved_names.insert(alias_node);
                bind_import_name(ctx, full_name.head(), head_ty, scope);
            }
        }
    }
}

/// Resolves every prefix of `full_name` from the root down (§4.4 step 4:
/// "for each prefix that is a package, load that init file and bind the
/// segment in the previously-loaded package's scope"), returning the first
/// (head) segment's type for the caller to bind.
fn resolve_import_chain<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, full_name: &ModuleName) -> Option<TypeId> {
    let mut prefixes: Vec<ModuleName> = full_name.ancestors().collect();
    prefixes.reverse();

    let mut previous_scope: Option<ScopeId> = None;
    let mut head_ty = None;
    for prefix in &prefixes {
        let ty = resolve_import(ctx, prefix)?;
        if head_ty.is_none() {
            head_ty = Some(ty);
        }
        if let Some(parent_scope) = previous_scope {
            let segment = prefix.components().next_back().unwrap_or(prefix.as_str());
            bind_import_name(ctx, segment, ty, parent_scope);
        }
        previous_scope = match ctx.types.get(ty) {
            DataType::Module(module) => Some(module.file_scope),
            _ => None,
        };
    }
    head_ty
}

fn infer_import_from<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, import_from: &ast::StmtImportFrom, scope: ScopeId) {
    let Some(module) = &import_from.module else {
        // `from . import x` (relative import with no module name): outside
        // this crate's module-resolution model (Non-goal: package-relative
        // star imports), so the names are left unresolved.
        for alias in &import_from.names {
            let bound_name = alias.asname.as_ref().unwrap_or(&alias.name);
            let unknown = ctx.types.unknown();
            bind_import_name(ctx, bound_name.id.as_str(), unknown, scope);
        }
        return;
    };
    let Some(module_name) = ModuleName::new(module.id.as_str()) else {
        return;
    };
    let Some(module_ty) = resolve_import(ctx, &module_name) else {
        for _ in &import_from.names {
            ctx.unresolved_names.insert(NodeKey::synthetic());
        }
        return;
    };

    for alias in &import_from.names {
        let alias_node = NodeKey::synthetic();
        let bound_name = alias.asname.as_ref().unwrap_or(&alias.name);
        if alias.name.id.as_str() == "*" {
            continue;
        }
        let resolved = ctx
            .scopes
            .lookup_attribute(ctx.types, module_ty, alias.name.id.as_str())
            .map(|ids| ctx.types.union_all(ids.iter().map(|&id| ctx.bindings.get(id).ty)));
        match &resolved {
            Some(_) => ctx.resolved_names.insert(alias_node),
            None => ctx.unresolved_names.insert(alias_node),
        };
        let ty = resolved.unwrap_or_else(|| ctx.types.unknown());
        bind_import_name(ctx, bound_name.id.as_str(), ty, scope);
    }
}

fn bind_import_name<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, name: &str, ty: TypeId, scope: ScopeId) {
    let node = NodeKey::synthetic();
    let binding = ctx.bindings.create_binding(
        name,
        node,
        ty,
        BindingKind::Alias,
        false,
        false,
        ctx.file.clone(),
        ruff_text_size::TextRange::default(),
    );
    ctx.scopes.bind(scope, name, binding);
}

/// Resolves `name` to a module type, loading and inferring the backing
/// file the first time it's needed (§4.4). A synthetic stdlib module
/// (`builtins`/`math`/`os`/`sys`) short-circuits straight to its seeded
/// type; a module already loaded is served from the loader's cache;
/// re-entering a module that is still loading (a circular import) returns
/// `None` without touching disk again.
pub fn resolve_import<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, name: &ModuleName) -> Option<TypeId> {
    if let Some(&ty) = ctx.synthetic_modules.get(name) {
        return Some(ty);
    }
    if let Some(ty) = ctx.loader.loaded_type(name) {
        return Some(ty);
    }
    if ctx.loader.is_loading(name) {
        return None;
    }

    let path = match ctx.loader.locate_module(name) {
        Ok(path) => path,
        Err(_) => {
            return None;
        }
    };
    let source = match ctx.loader.read_source(&path) {
        Ok(source) => source,
        Err(_) => {
            return None;
        }
    };

    Some(load_and_cache_file(ctx, name, &path, &source))
}

/// Infers `source` (already read from `path`) and registers the resulting
/// module type under `name` in the module loader's cache, bracketed by the
/// `importStack` push/pop and the per-file working-directory save/restore
/// named in §4.4 step 5 and §5's resource-lifecycle bracket. The single
/// place both an explicit `import` (`resolve_import`, above) and a file the
/// top-level directory walk discovers directly (`load_top_level_file`,
/// below) register a freshly-inferred module, so a file backed by one path
/// is only ever inferred once no matter which route reaches it first (§8
/// invariant 5: `loadFile(p)` called twice returns the same module type).
fn load_and_cache_file<F: FileSystem, A: AstProvider>(
    ctx: &mut Ctx<F, A>,
    name: &ModuleName,
    path: &Path,
    source: &str,
) -> TypeId {
    ctx.loader.push_importing(name.clone());
    let previous_cwd = ctx.loader.current_dir();
    if let Some(parent) = path.parent() {
        ctx.loader.set_current_dir(parent);
    }

    let ty = infer_file(ctx, path, source);

    if let Some(previous) = previous_cwd {
        ctx.loader.set_current_dir(&previous);
    }
    ctx.loader.pop_importing();

    ctx.loader.cache_insert(name.clone(), ty);
    ty
}

/// Loads one file discovered directly by `Analyzer::analyze`'s directory
/// walk, through the same name-keyed cache and `importStack` bracket an
/// `import` statement resolves through (`resolve_import`). Without this, a
/// module analyzed here first was never registered under its qualified
/// name, so the first file that later `import`ed it would miss the loader's
/// cache and re-locate, re-read, and re-infer it from scratch — a second,
/// distinct `Module` type for the same file, violating §8 scenario 4 ("no
/// duplicate module types") whenever a program's entry point is one half of
/// a circular import. A path with no derivable qualified name (outside
/// every configured search path) falls back to a plain, uncached
/// `infer_file`, same as before.
pub fn load_top_level_file<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, path: &Path, source: &str) -> TypeId {
    let Some(name) = ctx.loader.qualified_name_for_path(path) else {
        return infer_file(ctx, path, source);
    };
    if let Some(ty) = ctx.loader.loaded_type(&name) {
        return ty;
    }
    load_and_cache_file(ctx, &name, path, source)
}

/// Parses `source` (read from `path`) and runs `infer_stmt` over its
/// top-level body in a fresh module scope, returning the resulting
/// `Module` type. Records `path` in `loaded_files`, and in `failed_to_parse`
/// plus `parse_errors` if parsing failed outright (§7).
pub fn infer_file<F: FileSystem, A: AstProvider>(ctx: &mut Ctx<F, A>, path: &Path, source: &str) -> TypeId {
    ctx.loaded_files.insert(path.to_path_buf());

    let (parsed, syntax_errors) = match ctx.loader.parse(path, source) {
        Ok(result) => result,
        Err(error) => {
            ctx.failed_to_parse.insert(path.to_path_buf());
            ctx.parse_errors.insert(path.to_path_buf(), vec![error]);
            return ctx.types.unknown();
        }
    };
    if !syntax_errors.is_empty() {
        ctx.parse_errors.insert(path.to_path_buf(), syntax_errors);
    }

    let module_scope = ctx.scopes.create(ScopeKind::Module, Some(ctx.global_scope));
    let qualified = ctx.loader.qualified_name_for_path(path);
    if let Some(name) = &qualified {
        ctx.scopes.set_path(module_scope, name.clone());
    }

    let saved_file = std::mem::replace(&mut ctx.file, path.to_path_buf());
    let saved_module = std::mem::replace(&mut ctx.current_module, parsed.clone());

    for stmt in &parsed.body {
        infer_stmt(ctx, stmt, module_scope);
    }

    ctx.file = saved_file;
    ctx.current_module = saved_module;

    let display_name = qualified.map_or_else(|| path.display().to_string(), |name| name.to_string());
    ctx.types.intern(DataType::Module(ModuleType {
        name: display_name.into(),
        file_scope: module_scope,
    }))
}
