//! Scope lifecycle, declaration placement, and lookup, driven through the
//! public protocol the way a checker front end drives it.

use pretty_assertions::{assert_eq, assert_ne};
use vigil_core::{
    BindingKind, BranchExit, ClauseKind, FrameKind, FunctionInfo, GuardSet, PredicateInfo,
    ScopeError, ScopeTree, StorageOrigin, StorageRef, StorageState, SymbolKind, SymbolRecord,
    TagKind, VariableInfo,
};
use vigil_error::error::CheckError;
use vigil_error::handler::Handler;
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

fn local(name: &str) -> SymbolRecord {
    variable(name, BindingKind::Local, StorageState::undefined())
}

fn function(name: &str, info: FunctionInfo) -> SymbolRecord {
    SymbolRecord::new(
        ident(name),
        SymbolKind::Function(info),
        TypeRef::UNKNOWN,
        StorageRef::detached(StorageOrigin::Global, StorageState::defined()),
        Span::from_string(name.to_owned()),
    )
}

fn struct_tag(name: &str) -> SymbolRecord {
    SymbolRecord::new(
        ident(name),
        SymbolKind::Tag(TagKind::Struct),
        TypeRef::UNKNOWN,
        StorageRef::detached(StorageOrigin::Temporary, StorageState::unknown()),
        Span::from_string(name.to_owned()),
    )
}

/// Opens a file and a function body, the minimum the protocol requires
/// before local declarations can happen.
fn open_function(tree: &mut ScopeTree, handler: &Handler, name: &str) {
    tree.enter_file().unwrap();
    tree.add_entry(
        handler,
        function(
            name,
            FunctionInfo {
                defined: true,
                ..Default::default()
            },
        ),
    );
    tree.enter_function_scope(handler, &ident(name)).unwrap();
}

fn mark_used(tree: &mut ScopeTree, name: &str) {
    tree.lookup_mut(name)
        .unwrap()
        .mark_used(Span::from_string(name.to_owned()));
}

#[test]
fn names_hide_and_reveal_across_scopes() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    open_function(&mut tree, &handler, "walk");
    assert_eq!(tree.current_level(), 2);

    tree.add_entry(&handler, local("cursor"));
    let outer = tree.lookup("cursor").unwrap().storage().id();

    tree.enter_scope();
    assert_eq!(tree.current_level(), 3);
    tree.add_entry(&handler, local("cursor"));
    tree.add_entry(&handler, local("depth"));
    let inner = tree.lookup("cursor").unwrap().storage().id();
    assert_ne!(outer, inner);
    assert!(tree.lookup("depth").is_some());

    mark_used(&mut tree, "cursor");
    mark_used(&mut tree, "depth");
    tree.exit_scope(&handler, &BranchExit::falls_through())
        .unwrap();

    // The inner binding died with its scope and the outer one is back.
    assert!(tree.lookup("depth").is_none());
    assert_eq!(tree.lookup("cursor").unwrap().storage().id(), outer);
    assert_eq!(tree.current_level(), 2);
    assert!(!handler.has_errors());
}

#[test]
fn globals_declared_deep_land_in_the_permanent_frames() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    open_function(&mut tree, &handler, "init");
    tree.enter_scope();

    // An extern declaration inside a block still declares the global.
    let coord = tree.add_entry(
        &handler,
        variable(
            "shared",
            BindingKind::Global { checked: true },
            StorageState::undefined(),
        ),
    );
    assert_eq!(coord.level, 0);

    let file_coord = tree.add_entry(
        &handler,
        variable(
            "unit_local",
            BindingKind::FileStatic,
            StorageState::undefined(),
        ),
    );
    assert_eq!(file_coord.level, 1);

    tree.exit_scope(&handler, &BranchExit::falls_through())
        .unwrap();
    tree.exit_scope(&handler, &BranchExit::falls_through())
        .unwrap();

    // Both outlive the scopes they were declared inside.
    assert!(tree.lookup_global("shared").is_some());
    assert!(tree.lookup_global("unit_local").is_some());
    assert!(!handler.has_errors());
}

#[test]
fn function_prototypes_merge_quietly() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    tree.enter_file().unwrap();

    tree.add_entry(&handler, function("parse", FunctionInfo::default()));
    tree.add_entry(
        &handler,
        function(
            "parse",
            FunctionInfo {
                defined: true,
                ..Default::default()
            },
        ),
    );

    assert!(!handler.has_errors());
    let SymbolKind::Function(info) = tree.lookup("parse").unwrap().kind() else {
        panic!("prototype changed kind");
    };
    assert!(info.defined);
}

#[test]
fn supersede_keeps_the_storage_identity() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    open_function(&mut tree, &handler, "fill");

    tree.add_entry(&handler, local("buf"));
    let storage = tree.lookup("buf").unwrap().storage().id();

    tree.supersede_entry(
        &handler,
        variable("buf", BindingKind::Local, StorageState::defined()),
    );

    assert!(!handler.has_errors());
    let record = tree.lookup("buf").unwrap();
    assert_eq!(record.storage().id(), storage);
    assert!(record.storage().state().is_defined());
}

#[test]
fn a_kind_clash_replaces_the_binding_outright() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    open_function(&mut tree, &handler, "f");

    tree.add_entry(&handler, local("x"));
    let before = tree.lookup("x").unwrap().storage().id();

    let clash = SymbolRecord::new(
        ident("x"),
        SymbolKind::Constant,
        TypeRef::UNKNOWN,
        StorageRef::detached(StorageOrigin::Local, StorageState::defined()),
        Span::from_string("x".to_owned()),
    );
    tree.add_entry(&handler, clash);

    assert!(handler
        .find_error(|e| matches!(e, CheckError::DeclarationKindMismatch { .. }))
        .is_some());
    let record = tree.lookup("x").unwrap();
    assert!(matches!(record.kind(), SymbolKind::Constant));
    // The replacement is new storage, not the variable's under a new kind.
    assert_ne!(record.storage().id(), before);
}

#[test]
fn tags_occupy_their_own_namespace() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    open_function(&mut tree, &handler, "f");

    tree.add_entry(&handler, struct_tag("node"));
    tree.add_entry(&handler, local("node"));

    assert!(!handler.has_errors());
    assert!(!handler.has_warnings());
    assert!(matches!(
        tree.lookup("node").unwrap().kind(),
        SymbolKind::Variable(_)
    ));
    assert!(matches!(
        tree.lookup_tag("node").unwrap().kind(),
        SymbolKind::Tag(TagKind::Struct)
    ));
}

#[test]
fn coordinates_read_through_the_active_branch_copy() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    open_function(&mut tree, &handler, "f");
    let coord = tree.add_entry(&handler, local("x"));

    tree.true_branch(GuardSet::new());
    tree.lookup_mut("x")
        .unwrap()
        .mark_defined(Span::from_string("x = 1".to_owned()));
    // Inside the branch the coordinate resolves to this path's copy.
    assert!(tree
        .lookup_by_coordinate(coord)
        .unwrap()
        .storage()
        .state()
        .is_defined());

    // The sibling path reads the untouched original through the same
    // coordinate.
    tree.alt_branch(GuardSet::new()).unwrap();
    assert!(!tree
        .lookup_by_coordinate(coord)
        .unwrap()
        .storage()
        .state()
        .is_defined());
}

#[test]
fn file_scopes_reset_between_units_and_globals_persist() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();

    tree.enter_file().unwrap();
    assert!(tree.is_file_open());
    tree.add_entry(
        &handler,
        variable(
            "counter",
            BindingKind::FileStatic,
            StorageState::undefined(),
        ),
    );
    tree.add_entry(
        &handler,
        variable(
            "shared",
            BindingKind::Global { checked: false },
            StorageState::defined(),
        ),
    );
    mark_used(&mut tree, "counter");
    mark_used(&mut tree, "shared");
    tree.exit_file(&handler).unwrap();
    assert!(!tree.is_file_open());

    tree.enter_file().unwrap();
    // The file frame was emptied; the global frame was not.
    assert!(tree.lookup("counter").is_none());
    assert!(tree.lookup("shared").is_some());
    assert!(!handler.has_errors());
    assert!(!handler.has_warnings());
}

#[test]
fn replayed_library_entries_raise_no_diagnostics() {
    let mut tree = ScopeTree::new();

    // Replaying a dump inserts unconditionally, later entries overwriting
    // earlier ones, with no handler anywhere in sight.
    let first = tree.add_global_entry(function("malloc", FunctionInfo::default()));
    let second = tree.add_global_entry(function(
        "malloc",
        FunctionInfo {
            defined: true,
            ..Default::default()
        },
    ));
    assert_eq!(first, second);
    assert_eq!(first.level, 0);

    let SymbolKind::Function(info) = tree.lookup_global("malloc").unwrap().kind() else {
        panic!("replayed entry changed kind");
    };
    assert!(info.defined);
    assert!(tree.lookup_global("malloc").unwrap().storage().is_attached());
}

#[test]
fn scope_protocol_violations_are_fatal() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();

    assert_eq!(
        tree.exit_scope(&handler, &BranchExit::falls_through()),
        Err(ScopeError::ExitPermanentScope(FrameKind::FileStatic))
    );
    assert_eq!(tree.exit_file(&handler), Err(ScopeError::ExitFileUnentered));
    assert_eq!(
        tree.enter_function_scope(&handler, &ident("f")),
        Err(ScopeError::FunctionScopeOutsideFile(1))
    );

    tree.enter_file().unwrap();
    assert_eq!(tree.enter_file(), Err(ScopeError::EnterFileTwice));

    tree.enter_function_scope(&handler, &ident("f")).unwrap();
    assert_eq!(
        tree.exit_file(&handler),
        Err(ScopeError::ExitFileWithOpenScopes(2))
    );
}

#[test]
fn branch_protocol_violations_are_fatal() {
    let handler = Handler::default();
    let mut tree = ScopeTree::new();
    open_function(&mut tree, &handler, "f");

    assert_eq!(
        tree.alt_branch(GuardSet::new()),
        Err(ScopeError::AltWithoutTrueBranch(FrameKind::Normal))
    );
    assert_eq!(
        tree.pop_branches(
            &PredicateInfo::opaque(Span::dummy()),
            &BranchExit::falls_through(),
            &BranchExit::falls_through(),
            false,
            ClauseKind::If,
        ),
        Err(ScopeError::PopWithoutBranch(
            ClauseKind::If,
            FrameKind::Normal
        ))
    );
    assert_eq!(
        tree.new_case(&BranchExit::falls_through()),
        Err(ScopeError::CaseOutsideSwitch(FrameKind::Normal))
    );
    assert_eq!(
        tree.exit_switch(&handler, &BranchExit::falls_through(), false),
        Err(ScopeError::ExitSwitchOutsideSwitch(FrameKind::Normal))
    );

    // A branch frame cannot be retired as if it were a block scope.
    tree.true_branch(GuardSet::new());
    assert_eq!(
        tree.exit_scope(&handler, &BranchExit::falls_through()),
        Err(ScopeError::ExitBranchAsScope(FrameKind::TrueBranch))
    );
}
