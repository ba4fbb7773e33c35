//! End-to-end scenarios (SPEC_FULL.md §8's seed tests), run against the
//! real filesystem and the real parser rather than fakes, since the whole
//! point of these is pinning observable behavior of `Analyzer::analyze`.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;

use knotty_db::fs::OsFileSystem;
use knotty_semantic::analyzer::Analyzer;
use knotty_semantic::ast::RuffAstProvider;
use knotty_semantic::binding::BindingKind;
use knotty_semantic::diagnostic::{RuleId, Severity};
use knotty_semantic::options::Options;
use knotty_semantic::types::DataType;

fn analyze(root: &Path) -> Analyzer<OsFileSystem, RuffAstProvider> {
    let mut analyzer = Analyzer::new(OsFileSystem, RuffAstProvider, Options::default(), root, root)
        .expect("opening the AST cache directory should not fail in a test environment");
    analyzer.analyze(root).expect("analysis of a well-formed fixture should not fail outright");
    analyzer
}

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn single_file_literal_assignment_produces_one_int_binding() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "mod.py", "x = 1\n");
    let analyzer = analyze(dir.path());

    let x_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "x").collect();
    assert_eq!(x_bindings.len(), 1, "reassignment-free `x = 1` should produce exactly one binding");

    let (_, binding) = x_bindings[0];
    assert_eq!(binding.kind, BindingKind::Variable);
    assert_eq!(analyzer.types().get(binding.ty), &DataType::Int);
}

#[test]
fn reassignment_widens_into_a_union_without_creating_a_second_binding() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "mod.py", "x = 1\nx = \"s\"\n");
    let analyzer = analyze(dir.path());

    let x_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "x").collect();
    assert_eq!(x_bindings.len(), 1, "both assignments bind the same name at module scope");

    let (_, binding) = x_bindings[0];
    match analyzer.types().get(binding.ty) {
        DataType::Union(members) => {
            let member_types: Vec<&DataType> = members.iter().map(|&id| analyzer.types().get(id)).collect();
            assert!(member_types.contains(&&DataType::Int));
            assert!(member_types.contains(&&DataType::Str));
            assert_eq!(member_types.len(), 2);
        }
        other => panic!("expected a Union{{Int, Str}}, got {other:?}"),
    }
}

#[test]
fn function_called_with_two_shapes_has_a_union_return_and_ends_up_not_uncalled() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "mod.py", "def f(a):\n    return a\nf(1)\nf(\"s\")\n");
    let analyzer = analyze(dir.path());

    let f_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "f").collect();
    assert_eq!(f_bindings.len(), 1);

    let (_, binding) = f_bindings[0];
    assert_eq!(binding.kind, BindingKind::Function);
    let DataType::Fun(fun) = analyzer.types().get(binding.ty) else {
        panic!("f should be a Fun type");
    };
    match analyzer.types().get(fun.return_type) {
        DataType::Union(members) => assert_eq!(members.len(), 2),
        other => panic!("expected f's return type to be Union{{Int, Str}}, got {other:?}"),
    }

    // `f` was called directly, so it should never have lingered on the
    // uncalled worklist through to the end of `finish()`.
    assert!(!binding.is_unused(), "f is referenced by its two call sites");
}

#[test]
fn a_free_variable_reference_stays_deduplicated_across_call_shapes() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mod.py",
        "g = 1\ndef f(a):\n    return g\nf(1)\nf(\"s\")\n",
    );
    let analyzer = analyze(dir.path());

    let g_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "g").collect();
    assert_eq!(g_bindings.len(), 1);
    let (g_id, _) = g_bindings[0];

    // `f`'s body (and the `return g` identifier node inside it) is visited
    // once per distinct call-argument shape, so the same node resolves to
    // `g` twice; §3 requires `references[node]` to stay deduplicated
    // regardless of how many times a node was re-visited.
    let occurrences: Vec<usize> = analyzer
        .bindings()
        .references()
        .values()
        .filter(|ids| ids.contains(&g_id))
        .map(Vec::len)
        .collect();
    assert_eq!(
        occurrences,
        vec![1],
        "the `g` reference node should list its binding exactly once, got {occurrences:?}"
    );
}

#[test]
fn circular_imports_load_both_modules_without_looping_forever() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "import b\nx = 1\n");
    write(dir.path(), "b.py", "import a\ny = 2\n");
    let analyzer = analyze(dir.path());

    assert_eq!(analyzer.loaded_files().len(), 2);
    assert!(analyzer.loaded_files().iter().any(|p| p.file_name().unwrap() == "a.py"));
    assert!(analyzer.loaded_files().iter().any(|p| p.file_name().unwrap() == "b.py"));

    let b_alias: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "b").collect();
    assert!(!b_alias.is_empty(), "a.py's `import b` should bind `b` in a's module scope");
    let a_alias: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "a").collect();
    assert!(!a_alias.is_empty(), "b.py's `import a` should bind `a` in b's module scope");

    // Whichever of a.py/b.py the top-level directory walk reaches first is
    // also the one the other file's `import` statement resolves back to;
    // §8 scenario 4 ("no duplicate module types") and invariant 5
    // (`loadFile` idempotence) both fail if that file was inferred twice —
    // once by the walk, once by the import — which would double its own
    // top-level bindings.
    let x_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "x").collect();
    assert_eq!(x_bindings.len(), 1, "a.py's `x = 1` should produce exactly one binding, not one per load");
    let y_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "y").collect();
    assert_eq!(y_bindings.len(), 1, "b.py's `y = 2` should produce exactly one binding, not one per load");
}

#[test]
fn unused_top_level_variable_is_diagnosed_after_finish() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "mod.py", "x = 1\n");
    let analyzer = analyze(dir.path());

    let file = dir.path().join("mod.py");
    let diagnostics = analyzer.diagnostics_for_file(&file);
    assert!(
        diagnostics
            .iter()
            .any(|d| d.rule == RuleId::UnusedVariable && d.severity == Severity::Error && d.message.contains('x')),
        "expected an error-severity unused-variable diagnostic for `x`, got {diagnostics:?}"
    );
}

#[test]
fn unresolved_name_is_recorded_but_raises_no_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "mod.py", "print(does_not_exist)\n");
    let analyzer = analyze(dir.path());

    let file = dir.path().join("mod.py");
    assert!(!analyzer.unresolved_names().is_empty(), "`does_not_exist` should be recorded as unresolved");
    assert!(
        analyzer.diagnostics_for_file(&file).is_empty(),
        "an unresolved bare name should not raise a diagnostic by default"
    );
}

#[test]
fn calling_a_non_callable_value_is_diagnosed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "mod.py", "x = 1\nx()\n");
    let analyzer = analyze(dir.path());

    let file = dir.path().join("mod.py");
    let diagnostics = analyzer.diagnostics_for_file(&file);
    assert!(
        diagnostics.iter().any(|d| d.rule == RuleId::NonCallable && d.severity == Severity::Error),
        "calling an int should raise a non-callable error, got {diagnostics:?}"
    );
}

#[test]
fn calling_a_union_typed_callee_widens_over_its_members() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mod.py",
        "def f():\n    return 1\n\ndef g():\n    return 2\n\nif True:\n    h = f\nelse:\n    h = g\n\nresult = h()\n",
    );
    let analyzer = analyze(dir.path());

    let file = dir.path().join("mod.py");
    let diagnostics = analyzer.diagnostics_for_file(&file);
    assert!(
        !diagnostics.iter().any(|d| d.rule == RuleId::NonCallable),
        "a Union of two functions should be callable without a diagnostic, got {diagnostics:?}"
    );
}

#[test]
fn list_comprehension_binds_its_target_and_resolves_names_inside() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mod.py",
        "items = [1, 2, 3]\nsquares = [n for n in items]\nprint(squares)\n",
    );
    let analyzer = analyze(dir.path());

    let file = dir.path().join("mod.py");
    assert!(
        analyzer.diagnostics_for_file(&file).is_empty(),
        "a plain list comprehension should raise no diagnostics"
    );
    assert!(
        analyzer.unresolved_names().is_empty(),
        "`items` and `n` inside the comprehension should both resolve"
    );
}

#[test]
fn names_referenced_inside_a_try_body_and_handler_still_resolve() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mod.py",
        "def f():\n    return 1\ntry:\n    f()\nexcept Exception as e:\n    f()\nfinally:\n    f()\n",
    );
    let analyzer = analyze(dir.path());

    let f_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "f").collect();
    assert_eq!(f_bindings.len(), 1);
    let (_, binding) = f_bindings[0];
    assert!(
        !binding.is_unused(),
        "f should be referenced by its three call sites inside try/except/finally"
    );
}

#[test]
fn match_case_bodies_are_visited_for_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mod.py",
        "def f():\n    return 1\nx = 1\nmatch x:\n    case 1:\n        f()\n    case _:\n        f()\n",
    );
    let analyzer = analyze(dir.path());

    let f_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "f").collect();
    assert_eq!(f_bindings.len(), 1);
    let (_, binding) = f_bindings[0];
    assert!(!binding.is_unused(), "f should be referenced from inside both match case bodies");
}

#[test]
fn method_invoked_through_an_instance_binds_self_type() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mod.py",
        "class C:\n    def m(self):\n        return self\nC().m()\n",
    );
    let analyzer = analyze(dir.path());

    let bound_method_exists = analyzer.types().iter().any(|(_, ty)| match ty {
        DataType::Fun(fun) => {
            fun.name.as_str() == "m"
                && matches!(
                    fun.self_type.map(|id| analyzer.types().get(id)),
                    Some(&DataType::Instance(_))
                )
        }
        _ => false,
    });
    assert!(bound_method_exists, "calling C().m() should produce a Fun 'm' bound to an Instance(C) self_type");
}

#[test]
fn bound_method_call_returns_the_receiver_instance() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mod.py",
        "class C:\n    def m(self):\n        return self\nx = C().m()\n",
    );
    let analyzer = analyze(dir.path());

    let x_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "x").collect();
    assert_eq!(x_bindings.len(), 1);
    let (_, binding) = x_bindings[0];
    assert!(
        matches!(analyzer.types().get(binding.ty), DataType::Instance(_)),
        "`x = C().m()` should infer `m`'s bound `self` and return Instance(C), got {:?}",
        analyzer.types().get(binding.ty)
    );
}

#[test]
fn self_recursive_function_does_not_infinitely_recurse() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "mod.py", "def f(x):\n    return f(x)\n");
    // The real assertion here is that `analyze` returns at all; a
    // regression in the call-stack reentrancy guard would hang forever.
    let analyzer = analyze(dir.path());

    let f_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "f").collect();
    assert_eq!(f_bindings.len(), 1);
}

#[test]
fn empty_directory_analyzes_cleanly_with_no_modules() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = analyze(dir.path());

    assert!(analyzer.loaded_files().is_empty());
    let summary = analyzer.analysis_summary();
    assert_eq!(summary.modules_loaded, 0);
    assert_eq!(summary.diagnostics, 0);
}

#[test]
fn file_with_syntax_error_is_recorded_as_failed_to_parse() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.py", "def f(:\n    pass\n");
    let analyzer = analyze(dir.path());

    let file = dir.path().join("broken.py");
    assert!(analyzer.failed_to_parse().contains(&file));
    assert!(analyzer.bindings().iter().all(|(_, b)| b.name.as_str() != "f"), "a file that failed to parse contributes no bindings");
}

#[test]
fn dotted_package_import_resolves_and_loads_every_segment() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "pkg/__init__.py", "");
    write(dir.path(), "pkg/mod.py", "value = 1\n");
    write(dir.path(), "main.py", "import pkg.mod\n");
    let analyzer = analyze(dir.path());

    assert!(analyzer.loaded_files().iter().any(|p| p.ends_with("pkg/mod.py") || p.ends_with("pkg\\mod.py")));
    assert!(!analyzer.resolved_names().is_empty(), "the `import pkg.mod` alias should be recorded as resolved");
    assert!(analyzer.unresolved_names().is_empty(), "every segment of `import pkg.mod` should resolve");

    let head_bindings: Vec<_> = analyzer.bindings().iter().filter(|(_, b)| b.name.as_str() == "pkg").collect();
    assert!(!head_bindings.is_empty(), "`import pkg.mod` should bind `pkg` in the importing module's scope");
}
