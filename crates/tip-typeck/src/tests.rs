use super::*;
use tip_ast::*;

// ── Tree builders ────────────────────────────────────────────────

fn ex(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::default())
}

fn num(n: i64) -> Expr {
    ex(ExprKind::Num(n))
}

fn var(name: &str) -> Expr {
    ex(ExprKind::Var(name.into()))
}

fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    ex(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn call(callee: &str, args: Vec<Expr>) -> Expr {
    ex(ExprKind::Call {
        callee: Box::new(var(callee)),
        args,
    })
}

fn alloc(e: Expr) -> Expr {
    ex(ExprKind::Alloc(Box::new(e)))
}

fn deref(e: Expr) -> Expr {
    ex(ExprKind::Deref(Box::new(e)))
}

fn addr(name: &str) -> Expr {
    ex(ExprKind::AddrOf(name.into()))
}

fn null() -> Expr {
    ex(ExprKind::Null)
}

fn record(fields: Vec<(&str, Expr)>) -> Expr {
    ex(ExprKind::Record(
        fields
            .into_iter()
            .map(|(n, e)| FieldInit::new(n, e, Span::default()))
            .collect(),
    ))
}

fn access(e: Expr, field: &str) -> Expr {
    ex(ExprKind::Access {
        record: Box::new(e),
        field: field.into(),
    })
}

fn st(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Span::default())
}

fn on(line: u32, mut stmt: Stmt) -> Stmt {
    stmt.span = Span::at_line(line);
    stmt
}

fn decl(names: &[&str]) -> Stmt {
    st(StmtKind::Declare(
        names
            .iter()
            .map(|n| Binding::new(*n, Span::default()))
            .collect(),
    ))
}

fn assign(lhs: Expr, rhs: Expr) -> Stmt {
    st(StmtKind::Assign { lhs, rhs })
}

fn output(e: Expr) -> Stmt {
    st(StmtKind::Output(e))
}

fn ret(e: Expr) -> Stmt {
    st(StmtKind::Return(e))
}

fn while_(cond: Expr, body: Vec<Stmt>) -> Stmt {
    st(StmtKind::While {
        cond,
        body: Box::new(st(StmtKind::Block(body))),
    })
}

fn if_(cond: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>>) -> Stmt {
    st(StmtKind::If {
        cond,
        then_branch: Box::new(st(StmtKind::Block(then))),
        else_branch: otherwise.map(|s| Box::new(st(StmtKind::Block(s)))),
    })
}

fn func(name: &str, formals: &[&str], body: Vec<Stmt>) -> Function {
    let formals = formals
        .iter()
        .map(|n| Binding::new(*n, Span::default()))
        .collect();
    Function::new(name, formals, body, Span::default())
}

fn main_fn(body: Vec<Stmt>) -> Function {
    func("main", &[], body)
}

// ── Drivers ──────────────────────────────────────────────────────

fn run(functions: Vec<Function>, options: &CheckOptions) -> Result<TypeCheckResult, TypeError> {
    let mut program = Program::new(functions);
    let nodes = assign_ids(&mut program).expect("fresh tree");
    check_with_options(&program, nodes, options)
}

fn check_ok(functions: Vec<Function>) -> TypeCheckResult {
    match run(functions, &CheckOptions::default()) {
        Ok(result) => result,
        Err(e) => panic!("unexpected type error: {e}"),
    }
}

fn check_err(functions: Vec<Function>) -> TypeError {
    match run(functions, &CheckOptions::default()) {
        Ok(_) => panic!("expected a type error, got none"),
        Err(e) => e,
    }
}

/// Handle of the first formal or local called `name`.
fn decl_id(result: &TypeCheckResult, name: &str) -> NodeId {
    let (id, _) = result
        .nodes
        .iter()
        .find(|(_, info)| {
            matches!(info.kind, NodeKind::Formal | NodeKind::Local)
                && info.name.as_deref() == Some(name)
        })
        .unwrap_or_else(|| panic!("no declaration of {name}"));
    id
}

fn decl_type(result: &TypeCheckResult, name: &str) -> Ty {
    let id = decl_id(result, name);
    result.type_of(id).expect("declarations are typed")
}

fn first_of_kind(result: &TypeCheckResult, kind: NodeKind) -> Ty {
    let (id, _) = result
        .nodes
        .iter()
        .find(|(_, info)| info.kind == kind)
        .unwrap_or_else(|| panic!("no {kind} node"));
    result.type_of(id).expect("typed node")
}

// ── Passing programs ─────────────────────────────────────────────

#[test]
fn arithmetic_assignment() {
    // x = 1 + 2; output x;
    let result = check_ok(vec![main_fn(vec![
        decl(&["x"]),
        assign(var("x"), bin(BinOp::Add, num(1), num(2))),
        output(var("x")),
        ret(num(0)),
    ])]);
    assert_eq!(decl_type(&result, "x"), Ty::Int);
    assert_eq!(
        result.function_type("main"),
        Some(Ty::function(vec![], Ty::Int))
    );
}

#[test]
fn alloc_and_deref() {
    // var p; p = alloc 5; output *p;
    let result = check_ok(vec![main_fn(vec![
        decl(&["p"]),
        assign(var("p"), alloc(num(5))),
        output(deref(var("p"))),
        ret(num(0)),
    ])]);
    assert_eq!(decl_type(&result, "p"), Ty::pointer(Ty::Int));
    assert_eq!(first_of_kind(&result, NodeKind::Deref), Ty::Int);
}

#[test]
fn address_of_and_store_through_pointer() {
    let result = check_ok(vec![main_fn(vec![
        decl(&["x", "p"]),
        assign(var("p"), addr("x")),
        assign(deref(var("p")), num(3)),
        ret(var("x")),
    ])]);
    assert_eq!(decl_type(&result, "x"), Ty::Int);
    assert_eq!(decl_type(&result, "p"), Ty::pointer(Ty::Int));
}

#[test]
fn null_takes_pointee_from_later_use() {
    let result = check_ok(vec![main_fn(vec![
        decl(&["p"]),
        assign(var("p"), null()),
        assign(var("p"), alloc(alloc(num(1)))),
        ret(num(0)),
    ])]);
    assert_eq!(
        decl_type(&result, "p"),
        Ty::pointer(Ty::pointer(Ty::Int))
    );
    assert_eq!(
        first_of_kind(&result, NodeKind::Null),
        Ty::pointer(Ty::pointer(Ty::Int))
    );
}

#[test]
fn equality_compares_pointers() {
    let result = check_ok(vec![main_fn(vec![
        decl(&["p"]),
        assign(var("p"), alloc(num(1))),
        if_(
            bin(BinOp::Eq, var("p"), null()),
            vec![output(num(0))],
            Some(vec![output(deref(var("p")))]),
        ),
        ret(num(0)),
    ])]);
    assert_eq!(first_of_kind(&result, NodeKind::Binary), Ty::Int);
}

#[test]
fn loops_and_input() {
    let result = check_ok(vec![main_fn(vec![
        decl(&["n", "acc"]),
        assign(var("n"), ex(ExprKind::Input)),
        assign(var("acc"), num(1)),
        while_(
            bin(BinOp::Gt, var("n"), num(0)),
            vec![
                assign(var("acc"), bin(BinOp::Mul, var("acc"), var("n"))),
                assign(var("n"), bin(BinOp::Sub, var("n"), num(1))),
            ],
        ),
        ret(var("acc")),
    ])]);
    assert_eq!(decl_type(&result, "acc"), Ty::Int);
}

#[test]
fn recursion_and_call_before_definition() {
    let result = check_ok(vec![
        main_fn(vec![ret(call("fact", vec![num(5)]))]),
        func(
            "fact",
            &["n"],
            vec![
                decl(&["r"]),
                if_(
                    bin(BinOp::Gt, var("n"), num(0)),
                    vec![assign(
                        var("r"),
                        bin(
                            BinOp::Mul,
                            var("n"),
                            call("fact", vec![bin(BinOp::Sub, var("n"), num(1))]),
                        ),
                    )],
                    Some(vec![assign(var("r"), num(1))]),
                ),
                ret(var("r")),
            ],
        ),
    ]);
    assert_eq!(
        result.function_type("fact"),
        Some(Ty::function(vec![Ty::Int], Ty::Int))
    );
}

#[test]
fn parameter_types_flow_from_call_sites() {
    // id(x) { return x; } main() { return *id(alloc 1); }
    let result = check_ok(vec![
        func("id", &["x"], vec![ret(var("x"))]),
        main_fn(vec![ret(deref(call("id", vec![alloc(num(1))])))]),
    ]);
    assert_eq!(
        result.function_type("id"),
        Some(Ty::function(
            vec![Ty::pointer(Ty::Int)],
            Ty::pointer(Ty::Int)
        ))
    );
}

#[test]
fn functions_as_values() {
    let result = check_ok(vec![
        func("inc", &["x"], vec![ret(bin(BinOp::Add, var("x"), num(1)))]),
        main_fn(vec![
            decl(&["g"]),
            assign(var("g"), var("inc")),
            ret(call("g", vec![num(41)])),
        ]),
    ]);
    assert_eq!(
        decl_type(&result, "g"),
        Ty::function(vec![Ty::Int], Ty::Int)
    );
}

#[test]
fn record_construction_and_access() {
    let result = check_ok(vec![main_fn(vec![
        decl(&["r"]),
        assign(
            var("r"),
            record(vec![("a", num(1)), ("b", alloc(num(2)))]),
        ),
        ret(deref(access(var("r"), "b"))),
    ])]);
    assert_eq!(
        decl_type(&result, "r"),
        Ty::record([("a", Ty::Int), ("b", Ty::pointer(Ty::Int))])
    );
}

#[test]
fn field_access_waits_for_record_type() {
    // get(r) { return r.a; } main() { return get({a: 1}); }
    let result = check_ok(vec![
        func("get", &["r"], vec![ret(access(var("r"), "a"))]),
        main_fn(vec![ret(call("get", vec![record(vec![("a", num(1))])]))]),
    ]);
    assert_eq!(
        result.function_type("get"),
        Some(Ty::function(
            vec![Ty::record([("a", Ty::Int)])],
            Ty::Int
        ))
    );
}

#[test]
fn store_is_queryable_after_success() {
    let result = check_ok(vec![main_fn(vec![
        decl(&["p"]),
        assign(var("p"), alloc(num(5))),
        ret(deref(var("p"))),
    ])]);
    let (id, _) = result
        .nodes
        .iter()
        .find(|(_, info)| info.kind == NodeKind::Alloc)
        .unwrap();
    assert!(matches!(result.resolved_type(id), Some(Term::Pointer(_))));
    assert_eq!(result.resolved_type(id).map(Term::shape), Some("pointer"));
}

/// `r0 = {a:1,b:1}; r1 = {a:r0,b:r0}; ...`: each level doubles the
/// expanded type while the store stays linear.
fn shared_record_chain(depth: usize, tail: Vec<Stmt>) -> Vec<Function> {
    let names: Vec<String> = (0..=depth).map(|k| format!("r{k}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut body = vec![
        decl(&refs),
        assign(var("r0"), record(vec![("a", num(1)), ("b", num(1))])),
    ];
    for k in 1..=depth {
        let prev = &names[k - 1];
        body.push(assign(
            var(&names[k]),
            record(vec![("a", var(prev)), ("b", var(prev))]),
        ));
    }
    body.extend(tail);
    body.push(ret(num(0)));
    vec![main_fn(body)]
}

#[test]
fn deeply_shared_records_are_cheap() {
    let result = check_ok(shared_record_chain(48, vec![]));

    let leaf = Ty::record([("a", Ty::Int), ("b", Ty::Int)]);
    let r1 = decl_type(&result, "r1");
    assert_eq!(r1, Ty::record([("a", leaf.clone()), ("b", leaf)]));
    assert!(r1.is_resolved());

    let top = decl_id(&result, "r48");
    assert!(matches!(result.resolved_type(top), Some(Term::Record(_))));
    let printed = result.render(top);
    assert!(printed.starts_with("{a:{a:"));
    assert!(printed.contains(".."));
    assert!(printed.len() < 400, "{} chars", printed.len());
}

// ── Type errors ──────────────────────────────────────────────────

#[test]
fn assigning_int_to_pointer_variable() {
    // var p; p = alloc 5; p = 3;
    let err = check_err(vec![main_fn(vec![
        decl(&["p"]),
        on(2, assign(var("p"), alloc(num(5)))),
        on(3, assign(var("p"), num(3))),
        ret(num(0)),
    ])]);
    match &err {
        TypeError::Mismatch {
            reason,
            expected,
            found,
            span,
            ..
        } => {
            assert_eq!(*reason, MismatchReason::Shape);
            assert_eq!(expected, "&int");
            assert_eq!(found, "int");
            assert_eq!(span.line, 3);
        }
        other => panic!("expected a mismatch, got {other:?}"),
    }
    assert!(err.is_mismatch());
    assert!(err.to_string().contains("&int does not match int"));
}

#[test]
fn call_with_too_many_arguments() {
    // f(x, y) { return x; } main() { return f(1, 2, 3); }
    let err = check_err(vec![
        func("f", &["x", "y"], vec![ret(var("x"))]),
        main_fn(vec![ret(call("f", vec![num(1), num(2), num(3)]))]),
    ]);
    assert_eq!(
        err.reason(),
        Some(&MismatchReason::Arity {
            expected: 2,
            found: 3
        })
    );
}

#[test]
fn missing_record_field() {
    // {a: 1, b: 2}.c
    let err = check_err(vec![main_fn(vec![ret(access(
        record(vec![("a", num(1)), ("b", num(2))]),
        "c",
    ))])]);
    assert_eq!(err.reason(), Some(&MismatchReason::MissingField("c".into())));
}

#[test]
fn mismatch_on_deeply_shared_record_stays_short() {
    let err = check_err(shared_record_chain(48, vec![assign(var("r48"), num(1))]));
    match err {
        TypeError::Mismatch {
            reason,
            expected,
            found,
            ..
        } => {
            assert_eq!(reason, MismatchReason::Shape);
            assert!(expected.starts_with('{'));
            assert!(expected.contains(".."));
            assert!(expected.len() < 400, "{} chars", expected.len());
            assert_eq!(found, "int");
        }
        other => panic!("expected a mismatch, got {other:?}"),
    }
}

#[test]
fn field_access_on_int() {
    let err = check_err(vec![main_fn(vec![ret(access(num(1), "a"))])]);
    assert_eq!(err.reason(), Some(&MismatchReason::NotRecord));
}

#[test]
fn duplicate_record_field() {
    let err = check_err(vec![main_fn(vec![ret(access(
        record(vec![("a", num(1)), ("a", num(2))]),
        "a",
    ))])]);
    assert_eq!(
        err.reason(),
        Some(&MismatchReason::DuplicateField("a".into()))
    );
}

#[test]
fn records_with_different_fields_do_not_mix() {
    let err = check_err(vec![main_fn(vec![
        decl(&["r"]),
        assign(var("r"), record(vec![("a", num(1))])),
        assign(var("r"), record(vec![("b", num(1))])),
        ret(num(0)),
    ])]);
    assert_eq!(err.reason(), Some(&MismatchReason::Fields));
}

#[test]
fn dereference_of_int() {
    let err = check_err(vec![main_fn(vec![ret(deref(num(5)))])]);
    assert_eq!(err.reason(), Some(&MismatchReason::NotPointer));
}

#[test]
fn calling_an_int() {
    let err = check_err(vec![main_fn(vec![
        decl(&["x"]),
        assign(var("x"), num(1)),
        ret(call("x", vec![num(2)])),
    ])]);
    assert_eq!(err.reason(), Some(&MismatchReason::NotFunction));
}

#[test]
fn output_of_pointer() {
    let err = check_err(vec![main_fn(vec![output(alloc(num(1))), ret(num(0))])]);
    assert!(err.is_mismatch());
}

#[test]
fn equality_needs_matching_operands() {
    let err = check_err(vec![main_fn(vec![ret(bin(
        BinOp::Eq,
        alloc(num(1)),
        num(1),
    ))])]);
    assert_eq!(err.reason(), Some(&MismatchReason::Shape));
}

#[test]
fn conflicting_return_types() {
    let err = check_err(vec![main_fn(vec![
        if_(num(1), vec![ret(num(1))], None),
        ret(null()),
    ])]);
    assert!(err.is_mismatch());
}

#[test]
fn record_holding_itself_is_infinite() {
    // var r; r = {next: r};
    let err = check_err(vec![main_fn(vec![
        decl(&["r"]),
        assign(var("r"), record(vec![("next", var("r"))])),
        ret(num(0)),
    ])]);
    assert!(matches!(err, TypeError::Infinite { .. }));
    assert!(err.is_mismatch());
}

#[test]
fn unknown_identifier() {
    let err = check_err(vec![main_fn(vec![ret(var("nope"))])]);
    assert!(matches!(err, TypeError::UnboundName { ref name, .. } if name == "nope"));
    assert!(!err.is_mismatch());
}

#[test]
fn duplicate_local() {
    let err = check_err(vec![func("f", &["x"], vec![decl(&["x"]), ret(var("x"))])]);
    assert!(matches!(err, TypeError::DuplicateName { ref name, .. } if name == "x"));
}

#[test]
fn duplicate_function() {
    let err = check_err(vec![
        main_fn(vec![ret(num(0))]),
        main_fn(vec![ret(num(1))]),
    ]);
    assert!(matches!(err, TypeError::DuplicateName { ref name, .. } if name == "main"));
}

#[test]
fn unnumbered_tree_is_rejected() {
    let program = Program::new(vec![main_fn(vec![ret(num(0))])]);
    let err = check(&program, NodeTable::new()).unwrap_err();
    assert!(matches!(
        err,
        TypeError::Unassigned {
            kind: NodeKind::Program,
            ..
        }
    ));
}

// ── Unresolved types ─────────────────────────────────────────────

fn unused_parameter() -> Vec<Function> {
    // f(x) { return 0; } main() { return 0; }
    vec![
        func("f", &["x"], vec![ret(num(0))]),
        main_fn(vec![ret(num(0))]),
    ]
}

#[test]
fn unused_parameter_is_rejected_by_default() {
    let err = check_err(unused_parameter());
    match &err {
        TypeError::Unresolved { kind, ty, .. } => {
            // The function node is numbered before its formal.
            assert_eq!(*kind, NodeKind::Function);
            assert!(ty.starts_with("(?"), "got {ty}");
        }
        other => panic!("expected an unresolved type, got {other:?}"),
    }
    assert!(!err.is_mismatch());
}

#[test]
fn unused_parameter_defaults_to_int() {
    let options = CheckOptions {
        unresolved: UnresolvedPolicy::DefaultToInt,
    };
    let result = run(unused_parameter(), &options).unwrap();
    assert_eq!(decl_type(&result, "x"), Ty::Int);
    assert_eq!(
        result.function_type("f"),
        Some(Ty::function(vec![Ty::Int], Ty::Int))
    );
}

#[test]
fn null_without_pointee_is_unresolved() {
    let err = check_err(vec![main_fn(vec![
        decl(&["p"]),
        assign(var("p"), null()),
        ret(num(0)),
    ])]);
    assert!(matches!(err, TypeError::Unresolved { .. }));

    let options = CheckOptions {
        unresolved: UnresolvedPolicy::DefaultToInt,
    };
    let result = run(
        vec![main_fn(vec![
            decl(&["p"]),
            assign(var("p"), null()),
            ret(num(0)),
        ])],
        &options,
    )
    .unwrap();
    assert_eq!(decl_type(&result, "p"), Ty::pointer(Ty::Int));
}

#[test]
fn field_access_on_unknown_record_is_unresolved() {
    let err = check_err(vec![func("get", &["r"], vec![ret(access(var("r"), "a"))])]);
    match err {
        TypeError::Unresolved { kind, .. } => assert_eq!(kind, NodeKind::Var),
        other => panic!("expected an unresolved type, got {other:?}"),
    }
}

// ── Per-node entry points ────────────────────────────────────────

#[test]
fn driver_can_check_functions_one_at_a_time() {
    let mut program = Program::new(vec![
        func("one", &[], vec![ret(num(1))]),
        main_fn(vec![ret(call("one", vec![]))]),
    ]);
    let nodes = assign_ids(&mut program).unwrap();
    let mut checker = TypeChecker::new(nodes);
    checker.declare_functions(&program).unwrap();
    for function in &program.functions {
        checker.check_function(function).unwrap();
    }
    let one = program.function("one").and_then(|f| f.id).unwrap();
    assert_eq!(
        checker.store().resolve(one),
        Ty::function(vec![], Ty::Int)
    );
    let result = checker.finish(&CheckOptions::default()).unwrap();
    assert_eq!(result.functions.len(), 2);
}

#[test]
fn driver_can_check_statements_and_expressions() {
    // main() { var p; p = alloc 5; return *p; }
    let mut program = Program::new(vec![main_fn(vec![
        decl(&["p"]),
        assign(var("p"), alloc(num(5))),
        ret(deref(var("p"))),
    ])]);
    let nodes = assign_ids(&mut program).unwrap();
    let mut checker = TypeChecker::new(nodes);
    checker.declare_functions(&program).unwrap();
    let main = &program.functions[0];
    let ret_slot = checker.enter_function(main).unwrap();

    let StmtKind::Assign { lhs, rhs } = &main.body[1].kind else {
        panic!("expected an assignment");
    };
    let value = checker.check_expr(rhs).unwrap();
    assert_eq!(checker.store().resolve(value), Ty::pointer(Ty::Int));
    let target = checker.check_expr(lhs).unwrap();
    assert_eq!(checker.store().resolved_type(target), None);

    for stmt in &main.body {
        checker.check_stmt(stmt, ret_slot).unwrap();
    }
    assert_eq!(checker.store().resolve(target), Ty::pointer(Ty::Int));
    assert_eq!(checker.store().resolve(ret_slot), Ty::Int);

    let result = checker.finish(&CheckOptions::default()).unwrap();
    assert_eq!(
        result.function_type("main"),
        Some(Ty::function(vec![], Ty::Int))
    );
    assert_eq!(result.type_of(main.body[0].id.unwrap()), None);
}

// ── Type algebra ─────────────────────────────────────────────────

#[test]
fn display_forms() {
    let ty = Ty::function(
        vec![Ty::pointer(Ty::Int), Ty::record([("a", Ty::Int), ("b", Ty::Var(7))])],
        Ty::Int,
    );
    assert_eq!(ty.to_string(), "(&int,{a:int,b:?7}) -> int");
    assert!(!ty.is_resolved());
}

#[test]
fn record_compatibility_ignores_field_order() {
    let a = Ty::record([("a", Ty::Int), ("b", Ty::pointer(Ty::Int))]);
    let b = Ty::record([("b", Ty::pointer(Ty::Int)), ("a", Ty::Int)]);
    assert!(a.compatible(&b));
    assert_ne!(a, b);
    assert!(!a.compatible(&Ty::record([("a", Ty::Int)])));
    assert!(!Ty::Int.compatible(&Ty::pointer(Ty::Int)));
}

// ── Property-based tests ────────────────────────────────────────

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_ty() -> impl Strategy<Value = Ty> {
        let leaf = prop_oneof![Just(Ty::Int), (0u32..3).prop_map(Ty::Var)];
        leaf.prop_recursive(3, 16, 3, |inner| {
            prop_oneof![
                inner.clone().prop_map(Ty::pointer),
                (prop::collection::vec(inner.clone(), 0..3), inner.clone())
                    .prop_map(|(ps, r)| Ty::function(ps, r)),
                prop::collection::btree_map("[a-c]", inner, 0..3)
                    .prop_map(|fields| Ty::record(fields)),
            ]
        })
    }

    proptest! {
        #[test]
        fn compatible_is_reflexive(a in arb_ty()) {
            prop_assert!(a.compatible(&a));
        }

        #[test]
        fn compatible_is_symmetric(a in arb_ty(), b in arb_ty()) {
            prop_assert_eq!(a.compatible(&b), b.compatible(&a));
        }

        #[test]
        fn compatible_is_transitive(a in arb_ty(), b in arb_ty(), c in arb_ty()) {
            if a.compatible(&b) && b.compatible(&c) {
                prop_assert!(a.compatible(&c));
            }
        }

        #[test]
        fn reversed_records_stay_compatible(
            fields in prop::collection::btree_map("[a-e]", arb_ty(), 0..5)
        ) {
            let forward = Ty::record(fields.clone());
            let backward = Ty::record(fields.into_iter().rev());
            prop_assert!(forward.compatible(&backward));
        }

        #[test]
        fn checking_is_deterministic(n in 0i64..1000, depth in 0usize..4) {
            let mut e = num(n);
            for _ in 0..depth {
                e = alloc(e);
            }
            for _ in 0..depth {
                e = deref(e);
            }
            let build = || vec![main_fn(vec![ret(e.clone())])];
            let a = run(build(), &CheckOptions::default()).unwrap();
            let b = run(build(), &CheckOptions::default()).unwrap();
            let ta: Vec<_> = a.typed_nodes().map(|id| (node_index(id), a.type_of(id))).collect();
            let tb: Vec<_> = b.typed_nodes().map(|id| (node_index(id), b.type_of(id))).collect();
            prop_assert_eq!(ta, tb);
        }
    }
}
