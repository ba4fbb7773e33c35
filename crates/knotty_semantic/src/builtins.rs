//! Seeds the global scope and the synthetic standard-library modules every
//! analysis starts with (§4.7).
//!
//! Modeled on `red_knot_python_semantic::types::builtins`'s approach of
//! special-casing a short, hand-maintained list of stdlib surface rather
//! than parsing real `.pyi` stubs — this crate has no typeshed collaborator,
//! so the handful of names programs most commonly depend on (`print`,
//! `len`, the exception hierarchy, `math`/`os`/`sys`) are wired in directly.

use rustc_hash::FxHashMap;

use crate::binding::{BindingKind, BindingRegistry};
use crate::name::ModuleName;
use crate::scope::{ScopeArena, ScopeKind, ScopeId};
use crate::types::{ClassType, DataType, FunType, ModuleType, TypeArena, TypeId};

/// Synthetic module types installed so `import math` (and friends) resolves
/// without the module loader ever touching the filesystem.
pub struct SyntheticModules(pub FxHashMap<ModuleName, TypeId>);

fn seed_function(
    types: &mut TypeArena,
    scopes: &mut ScopeArena,
    bindings: &mut BindingRegistry,
    scope: ScopeId,
    name: &str,
    env_scope: ScopeId,
) {
    let unknown = types.unknown();
    let fun = types.intern(DataType::Fun(FunType {
        name: name.into(),
        def: None,
        params: Box::new([]),
        return_type: unknown,
        env_scope,
        self_type: None,
    }));
    let node = crate::node_key::NodeKey::synthetic();
    let binding = bindings.create_binding(
        name,
        node,
        fun,
        BindingKind::Function,
        true,
        true,
        std::path::PathBuf::new(),
        ruff_text_size::TextRange::default(),
    );
    scopes.bind(scope, name, binding);
}

fn seed_class(
    types: &mut TypeArena,
    scopes: &mut ScopeArena,
    bindings: &mut BindingRegistry,
    scope: ScopeId,
    name: &str,
    bases: &[TypeId],
) -> TypeId {
    let body_scope = scopes.create(ScopeKind::Class, Some(scope));
    let class = types.intern(DataType::Class(ClassType {
        name: name.into(),
        def: None,
        bases: bases.into(),
        body_scope,
    }));
    let node = crate::node_key::NodeKey::synthetic();
    let binding = bindings.create_binding(
        name,
        node,
        class,
        BindingKind::Class,
        true,
        true,
        std::path::PathBuf::new(),
        ruff_text_size::TextRange::default(),
    );
    scopes.bind(scope, name, binding);
    class
}


/// Creates the global scope, binds the core builtin functions and exception
/// classes into it, and returns it alongside the synthetic module table for
/// `math`/`os`/`sys`.
pub fn seed(
    types: &mut TypeArena,
    scopes: &mut ScopeArena,
    bindings: &mut BindingRegistry,
) -> (ScopeId, SyntheticModules) {
    let global = scopes.create(ScopeKind::Global, None);

    for name in ["print", "len", "input", "range", "type", "isinstance", "getattr", "setattr", "open"] {
        seed_function(types, scopes, bindings, global, name, global);
    }

    let object = seed_class(types, scopes, bindings, global, "object", &[]);
    let base_exception = seed_class(types, scopes, bindings, global, "BaseException", &[object]);
    let exception = seed_class(types, scopes, bindings, global, "Exception", &[base_exception]);
    for name in ["ValueError", "TypeError", "KeyError", "IndexError", "AttributeError", "StopIteration"] {
        seed_class(types, scopes, bindings, global, name, &[exception]);
    }
    for name in ["int", "float", "bool", "str", "bytes", "list", "dict", "tuple", "set"] {
        seed_class(types, scopes, bindings, global, name, &[object]);
    }

    let mut modules = FxHashMap::default();
    for name in ["builtins", "math", "os", "sys"] {
        let module_scope = scopes.create(ScopeKind::Module, None);
        let qualified = ModuleName::new_static(name).expect("builtin module name is a valid identifier");
        scopes.set_path(module_scope, qualified.clone());
        seed_stdlib_members(types, scopes, bindings, module_scope, name);
        let module_ty = types.intern(DataType::Module(ModuleType {
            name: name.into(),
            file_scope: module_scope,
        }));
        modules.insert(qualified, module_ty);
    }

    (global, SyntheticModules(modules))
}

fn seed_stdlib_members(
    types: &mut TypeArena,
    scopes: &mut ScopeArena,
    bindings: &mut BindingRegistry,
    scope: ScopeId,
    module: &str,
) {
    let members: &[&str] = match module {
        "math" => &["sqrt", "floor", "ceil", "pi", "inf"],
        "os" => &["getcwd", "listdir", "path", "environ"],
        "sys" => &["argv", "exit", "stdout", "stderr", "path"],
        _ => &[],
    };
    for name in members {
        seed_function(types, scopes, bindings, scope, name, scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_marked_builtin_and_excluded_from_plain_lookup_gaps() {
        let mut types = TypeArena::new();
        let mut scopes = ScopeArena::new();
        let mut bindings = BindingRegistry::new();
        let (global, modules) = seed(&mut types, &mut scopes, &mut bindings);

        let (_, print_bindings) = scopes.lookup_lexical(global, "print").expect("print is seeded");
        assert!(bindings.get(print_bindings[0]).is_builtin);

        let math_name = ModuleName::new_static("math").unwrap();
        assert!(modules.0.contains_key(&math_name));
    }
}
