//! The reports owed when scopes retire their bindings: unused declarations,
//! unreleased storage, and the promises functions make for their returns.

use pretty_assertions::assert_eq;
use vigil_core::{
    AliasKind, BindingKind, BranchExit, Definedness, ExitKind, FunctionInfo, GlobalSpec, GuardSet,
    Nullness, ScopeTree, StorageOrigin, StorageRef, StorageState, SymbolKind, SymbolRecord,
    VariableInfo,
};
use vigil_error::error::CheckError;
use vigil_error::handler::Handler;
use vigil_error::warning::Warning;
use vigil_types::{Ident, Span, TypeRef};

fn ident(name: &str) -> Ident {
    Ident::new(Span::from_string(name.to_owned()))
}

fn variable(name: &str, binding: BindingKind, state: StorageState) -> SymbolRecord {
    let origin = match binding {
        BindingKind::Local => StorageOrigin::Local,
        BindingKind::Param { .. } => StorageOrigin::Param,
        BindingKind::Global { .. } | BindingKind::FileStatic => StorageOrigin::Global,
    };
    SymbolRecord::new(
        ident(name),
        SymbolKind::Variable(VariableInfo { binding }),
        TypeRef::UNKNOWN,
        StorageRef::detached(origin, state),
        Span::from_string(name.to_owned()),
    )
}

fn local_with(name: &str, state: StorageState) -> SymbolRecord {
    variable(name, BindingKind::Local, state)
}

fn local(name: &str) -> SymbolRecord {
    local_with(name, StorageState::undefined())
}

fn out_param(name: &str, index: usize) -> SymbolRecord {
    variable(
        name,
        BindingKind::Param {
            index,
            out: true,
            not_null: false,
        },
        StorageState::undefined(),
    )
}

fn not_null_param(name: &str, index: usize, state: StorageState) -> SymbolRecord {
    variable(
        name,
        BindingKind::Param {
            index,
            out: false,
            not_null: true,
        },
        state,
    )
}

fn function_with(name: &str, globals: Vec<GlobalSpec>) -> SymbolRecord {
    SymbolRecord::new(
        ident(name),
        SymbolKind::Function(FunctionInfo {
            defined: true,
            file_static: false,
            globals,
        }),
        TypeRef::UNKNOWN,
        StorageRef::detached(StorageOrigin::Global, StorageState::defined()),
        Span::from_string(name.to_owned()),
    )
}

fn must_define(name: &str) -> GlobalSpec {
    GlobalSpec {
        name: ident(name),
        must_define: true,
    }
}

fn open_function(tree: &mut ScopeTree, handler: &Handler, name: &str) {
    tree.add_entry(handler, function_with(name, Vec::new()));
    tree.enter_function_scope(handler, &ident(name)).unwrap();
}

fn use_of(tree: &mut ScopeTree, name: &str) {
    tree.lookup_mut(name)
        .unwrap()
        .mark_used(Span::from_string(name.to_owned()));
}

fn close_scope(tree: &mut ScopeTree, handler: &Handler) {
    tree.exit_scope(handler, &BranchExit::falls_through())
        .unwrap();
}

#[test]
fn unused_bindings_are_reported_when_their_scope_closes() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();
    open_function(&mut tree, &handler, "f");
    tree.add_entry(&handler, local("seen"));
    tree.add_entry(&handler, local("ghost"));
    use_of(&mut tree, "seen");
    close_scope(&mut tree, &handler);

    let (errors, warnings) = handler.consume();
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0].warning_content,
        Warning::UnusedDeclaration { decl_kind: "variable", name } if name.as_str() == "ghost"
    ));
}

#[test]
fn builtin_declarations_are_exempt_from_use_checks() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();
    open_function(&mut tree, &handler, "f");

    // A binding synthesized by the host, with no place in the source to
    // point a report at.
    let builtin = SymbolRecord::new(
        Ident::new_no_span("__builtin_arg".into()),
        SymbolKind::Variable(VariableInfo {
            binding: BindingKind::Local,
        }),
        TypeRef::UNKNOWN,
        StorageRef::detached(StorageOrigin::Local, StorageState::defined()),
        Span::dummy(),
    );
    tree.add_entry(&handler, builtin);
    close_scope(&mut tree, &handler);

    assert!(!handler.has_warnings());
}

#[test]
fn owned_storage_must_be_released_or_handed_off() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();
    open_function(&mut tree, &handler, "f");

    let allocated = StorageState::new(Definedness::Allocated, Nullness::NotNull, AliasKind::Owned);
    tree.add_entry(&handler, local_with("leaky", allocated));
    tree.add_entry(&handler, local_with("closed", allocated));
    let fresh = allocated.with_alias(AliasKind::Fresh);
    tree.add_entry(&handler, local_with("given", fresh));
    for name in ["leaky", "closed", "given"] {
        use_of(&mut tree, name);
    }

    // free(closed); return given; -- leaky is forgotten.
    tree.lookup_mut("closed")
        .unwrap()
        .storage_mut()
        .state_mut()
        .release();
    tree.lookup_mut("given")
        .unwrap()
        .storage_mut()
        .state_mut()
        .transfer();
    close_scope(&mut tree, &handler);

    let (errors, warnings) = handler.consume();
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0].warning_content,
        Warning::StorageNeverReleased { name } if name.as_str() == "leaky"
    ));
}

#[test]
fn an_alias_reaching_outside_the_scope_excuses_the_leak() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();
    open_function(&mut tree, &handler, "f");
    tree.add_entry(&handler, local("keeper"));
    let keeper = tree.lookup("keeper").unwrap().storage().clone();

    let owned = StorageState::new(Definedness::Allocated, Nullness::NotNull, AliasKind::Owned);

    // keeper = tmp; -- the storage stays reachable after the block.
    tree.enter_scope();
    tree.add_entry(&handler, local_with("tmp", owned));
    use_of(&mut tree, "tmp");
    let tmp = tree.lookup("tmp").unwrap().storage().clone();
    tree.add_must_alias(&tmp, &keeper);
    close_scope(&mut tree, &handler);
    assert!(!handler.has_warnings());

    // An alias that dies with the same block excuses nothing.
    tree.enter_scope();
    tree.add_entry(&handler, local_with("stranded", owned));
    tree.add_entry(&handler, local("partner"));
    use_of(&mut tree, "stranded");
    use_of(&mut tree, "partner");
    let stranded = tree.lookup("stranded").unwrap().storage().clone();
    let partner = tree.lookup("partner").unwrap().storage().clone();
    tree.add_must_alias(&stranded, &partner);
    close_scope(&mut tree, &handler);

    let (errors, warnings) = handler.consume();
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0].warning_content,
        Warning::StorageNeverReleased { name } if name.as_str() == "stranded"
    ));
}

#[test]
fn storage_never_allocated_cannot_leak() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();
    open_function(&mut tree, &handler, "f");

    // Declared to own, but nothing was ever obtained.
    tree.add_entry(
        &handler,
        local_with("pending", StorageState::undefined().with_alias(AliasKind::Owned)),
    );
    // Holds a definite null; there is nothing to release.
    tree.add_entry(
        &handler,
        local_with(
            "nulled",
            StorageState::defined()
                .with_null(Nullness::Null)
                .with_alias(AliasKind::Owned),
        ),
    );
    use_of(&mut tree, "pending");
    use_of(&mut tree, "nulled");
    close_scope(&mut tree, &handler);

    assert!(!handler.has_warnings());
}

#[test]
fn out_parameters_must_be_defined_on_every_returning_path() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();

    // Falls off its end without assigning the out parameter.
    open_function(&mut tree, &handler, "writes_nothing");
    tree.add_entry(&handler, out_param("dest", 0));
    use_of(&mut tree, "dest");
    close_scope(&mut tree, &handler);

    // Assigns it; nothing to report.
    open_function(&mut tree, &handler, "writes_out");
    tree.add_entry(&handler, out_param("dest", 0));
    use_of(&mut tree, "dest");
    tree.lookup_mut("dest")
        .unwrap()
        .mark_defined(Span::from_string("*dest = 0".to_owned()));
    close_scope(&mut tree, &handler);

    // Never falls off its end, so the fall-off check does not apply.
    open_function(&mut tree, &handler, "bails_out");
    tree.add_entry(&handler, out_param("dest", 0));
    use_of(&mut tree, "dest");
    tree.record_exit(ExitKind::MustEscape);
    close_scope(&mut tree, &handler);

    let (errors, warnings) = handler.consume();
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0].warning_content,
        Warning::OutParamUndefined { name, function }
            if name.as_str() == "dest" && function.as_str() == "writes_nothing"
    ));
}

#[test]
fn not_null_promises_are_checked_at_return_points() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();
    open_function(&mut tree, &handler, "promise");
    tree.add_entry(
        &handler,
        not_null_param("p", 0, StorageState::defined().with_null(Nullness::NotNull)),
    );
    tree.add_entry(
        &handler,
        not_null_param(
            "q",
            1,
            StorageState::defined().with_null(Nullness::PossiblyNull),
        ),
    );
    use_of(&mut tree, "p");
    use_of(&mut tree, "q");

    // p = NULL; if (q == NULL) ... handled ...; return;
    tree.lookup_mut("p")
        .unwrap()
        .storage_mut()
        .state_mut()
        .set_null();
    let q = tree.lookup("q").unwrap().storage().clone();
    let mut rescued = GuardSet::new();
    rescued.guard_not_null(q.id());
    tree.add_guards(&rescued);

    tree.check_final_scope(&handler, true);
    tree.record_exit(ExitKind::MustEscape);
    close_scope(&mut tree, &handler);

    let (errors, warnings) = handler.consume();
    assert!(errors.is_empty());
    // q's guard excuses it; p has no excuse. The body never falls off its
    // end, so the return-point report is the only one.
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0].warning_content,
        Warning::NotNullParamMayBeNull { name, .. } if name.as_str() == "p"
    ));
}

#[test]
fn globals_clauses_bind_the_function_exit() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();
    tree.add_entry(
        &handler,
        variable(
            "total",
            BindingKind::Global { checked: true },
            StorageState::undefined(),
        ),
    );

    // Promises to define the global and does not.
    tree.add_entry(
        &handler,
        function_with("skips_total", vec![must_define("total")]),
    );
    tree.enter_function_scope(&handler, &ident("skips_total"))
        .unwrap();
    close_scope(&mut tree, &handler);

    // Promises and delivers.
    tree.add_entry(
        &handler,
        function_with("sets_total", vec![must_define("total")]),
    );
    tree.enter_function_scope(&handler, &ident("sets_total"))
        .unwrap();
    tree.lookup_mut("total")
        .unwrap()
        .mark_defined(Span::from_string("total = 0".to_owned()));
    close_scope(&mut tree, &handler);

    // Names a global nobody declared.
    tree.add_entry(
        &handler,
        function_with("audit", vec![must_define("missing")]),
    );
    tree.enter_function_scope(&handler, &ident("audit")).unwrap();
    close_scope(&mut tree, &handler);

    let (errors, warnings) = handler.consume();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        CheckError::UnknownGlobalInClause { function, name, .. }
            if function.as_str() == "audit" && name.as_str() == "missing"
    ));
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0].warning_content,
        Warning::GlobalUndefinedOnReturn { name, function }
            if name.as_str() == "total" && function.as_str() == "skips_total"
    ));
}

#[test]
fn file_statics_are_checked_at_unit_end() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();

    let helper = SymbolRecord::new(
        ident("helper"),
        SymbolKind::Function(FunctionInfo {
            defined: true,
            file_static: true,
            globals: Vec::new(),
        }),
        TypeRef::UNKNOWN,
        StorageRef::detached(StorageOrigin::Global, StorageState::defined()),
        Span::from_string("helper".to_owned()),
    );
    tree.add_entry(&handler, helper);
    tree.add_entry(
        &handler,
        variable("count", BindingKind::FileStatic, StorageState::defined()),
    );
    use_of(&mut tree, "count");
    tree.exit_file(&handler).unwrap();

    let (errors, warnings) = handler.consume();
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0].warning_content,
        Warning::UnusedDeclaration { decl_kind: "function", name } if name.as_str() == "helper"
    ));
}

#[test]
fn declarations_in_the_switch_block_are_checked_when_it_closes() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();
    open_function(&mut tree, &handler, "sort");

    tree.switch_branch();
    // switch (c) { int tmp; case 'a': ... }
    tree.add_entry(&handler, local("tmp"));
    tree.new_case(&BranchExit::falls_through()).unwrap();
    tree.set_must_break();
    tree.exit_switch(&handler, &BranchExit::falls_through(), false)
        .unwrap();

    let (errors, warnings) = handler.consume();
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0].warning_content,
        Warning::UnusedDeclaration { name, .. } if name.as_str() == "tmp"
    ));
}

#[test]
fn the_permanent_frames_are_checked_on_demand() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.add_global_entry(variable(
        "used_g",
        BindingKind::Global { checked: true },
        StorageState::defined(),
    ));
    tree.add_global_entry(variable(
        "dead_g",
        BindingKind::Global { checked: true },
        StorageState::defined(),
    ));
    use_of(&mut tree, "used_g");

    tree.check_all_used(&handler);

    let (errors, warnings) = handler.consume();
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0].warning_content,
        Warning::UnusedDeclaration { decl_kind: "global", name } if name.as_str() == "dead_g"
    ));
}
