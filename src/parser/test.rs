use super::*;
use crate::ast::{AssignOp, BinOp, Expr, Stmt, Type, UnOp};
use crate::diagnostics::Diagnostic;

fn parse_str(input: &str) -> (Program, Vec<Diagnostic>) {
    parse(input, "test")
}

fn parse_ok(input: &str) -> Program {
    let (program, errors) = parse_str(input);
    assert!(errors.is_empty(), "unexpected diagnostics: {:#?}", errors);
    program
}

fn expression(input: &str) -> String {
    let program = parse_ok(input);
    match &program.statements[0].0 {
        Stmt::Expression { expr } => expr.0.to_string(),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn test_parse_literals() {
    let program = parse_ok("5; true; 3.5; \"hello\"; name;");
    assert_eq!(program.statements.len(), 5);
    let tags: Vec<_> = program
        .statements
        .iter()
        .map(|(stmt, _)| match stmt {
            Stmt::Expression { expr } => expr.0.tag(),
            other => other.tag(),
        })
        .collect();
    assert_eq!(
        tags,
        vec![
            "IntLiteral",
            "BoolLiteral",
            "FloatLiteral",
            "StringLiteral",
            "Identifier"
        ]
    );
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    assert_eq!(expression("1 + 2 * 3"), "(1 + (2 * 3))");

    let program = parse_ok("1 + 2 * 3");
    let Stmt::Expression { expr } = &program.statements[0].0 else {
        panic!("expected expression");
    };
    let Expr::Infix {
        operator,
        left,
        right,
    } = &expr.0
    else {
        panic!("expected infix");
    };
    assert_eq!(*operator, BinOp::Add);
    assert!(matches!(left.0, Expr::Int { value: 1 }));
    assert!(matches!(
        right.0,
        Expr::Infix {
            operator: BinOp::Mul,
            ..
        }
    ));
}

#[test]
fn test_exponent_is_left_associative() {
    assert_eq!(expression("2 ^ 3 ^ 2"), "((2 ^ 3) ^ 2)");
}

#[test]
fn test_same_precedence_folds_left() {
    assert_eq!(expression("10 - 4 - 3"), "((10 - 4) - 3)");
    assert_eq!(expression("8 / 4 * 2 % 3"), "(((8 / 4) * 2) % 3)");
}

#[test]
fn test_grouping_resets_precedence() {
    assert_eq!(expression("(1 + 2) * 3"), "((1 + 2) * 3)");
    assert_eq!(expression("2 * (3 + (4 - 1))"), "(2 * (3 + (4 - 1)))");
}

#[test]
fn test_comparison_levels() {
    assert_eq!(expression("1 < 2 == 3 > 4"), "((1 < 2) == (3 > 4))");
    assert_eq!(expression("a + 1 >= b * 2"), "((a + 1) >= (b * 2))");
}

#[test]
fn test_prefix_operators() {
    assert_eq!(expression("-2 ^ 2"), "((-2) ^ 2)");
    assert_eq!(expression("!a == b"), "((!a) == b)");
    assert_eq!(expression("--x"), "(-(-x))");

    let program = parse_ok("!done");
    let Stmt::Expression { expr } = &program.statements[0].0 else {
        panic!("expected expression");
    };
    assert!(matches!(
        expr.0,
        Expr::Prefix {
            operator: UnOp::Not,
            ..
        }
    ));
}

#[test]
fn test_parse_function_call() {
    assert_eq!(expression("add(1, 2 * 3)"), "add(1, (2 * 3))");
    assert_eq!(expression("1 + f(2)"), "(1 + f(2))");
    assert_eq!(expression("f()"), "f()");

    let program = parse_ok("foo(1, 2, 3)");
    let Stmt::Expression { expr } = &program.statements[0].0 else {
        panic!("expected expression");
    };
    if let Expr::Call { callee, args } = &expr.0 {
        assert_eq!(callee, "foo");
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].1, 4..5);
        assert_eq!(args[1].1, 7..8);
        assert_eq!(args[2].1, 10..11);
    } else {
        panic!("Expected function call");
    }
    assert_eq!(expr.1, 0..12);
}

#[test]
fn test_parse_var_decl() {
    let program = parse_ok("var x: float69 = 1.5 + y;");
    assert_eq!(program.statements[0].1, 0..25);
    let Stmt::VarDecl(decl) = &program.statements[0].0 else {
        panic!("expected var");
    };
    assert_eq!(decl.name, "x");
    assert_eq!(decl.ty.0, Type::Float);
    assert_eq!(decl.value.0.to_string(), "(1.5 + y)");
}

#[test]
fn test_parse_assignments() {
    let program = parse_ok("x = 1; x += 2; x -= 3\nx *= 4; x /= 5;");
    let ops: Vec<_> = program
        .statements
        .iter()
        .map(|(stmt, _)| match stmt {
            Stmt::Assignment(assignment) => assignment.op,
            other => panic!("expected assignment, got {}", other.tag()),
        })
        .collect();
    assert_eq!(
        ops,
        vec![
            AssignOp::Assign,
            AssignOp::AddAssign,
            AssignOp::SubAssign,
            AssignOp::MulAssign,
            AssignOp::DivAssign
        ]
    );
}

#[test]
fn test_parse_function_decl() {
    let program = parse_ok("def add(a: int, b: float) -> float { return a + b; }");
    let Stmt::FunctionDecl(func) = &program.statements[0].0 else {
        panic!("expected function");
    };
    assert_eq!(func.name, "add");
    assert_eq!(func.params.len(), 2);
    assert_eq!(func.params[0].0, "a");
    assert_eq!(func.params[0].1, Type::Int);
    assert_eq!(func.params[1].1, Type::Float);
    assert_eq!(func.return_type.0, Type::Float);
    assert_eq!(func.body.statements.len(), 1);
    assert!(matches!(
        func.body.statements[0].0,
        Stmt::Return { value: Some(_) }
    ));
}

#[test]
fn test_parse_function_without_params() {
    let program = parse_ok("def hello() -> void { print(\"hi\"); return; }");
    let Stmt::FunctionDecl(func) = &program.statements[0].0 else {
        panic!("expected function");
    };
    assert!(func.params.is_empty());
    assert_eq!(func.return_type.0, Type::Void);
    assert!(matches!(
        func.body.statements[1].0,
        Stmt::Return { value: None }
    ));
}

#[test]
fn test_parse_if_else() {
    let program = parse_ok("if x < 3 { x = 1; } else { x = 2; y = 3; }");
    let Stmt::If {
        condition,
        then_block,
        else_block,
    } = &program.statements[0].0
    else {
        panic!("expected if");
    };
    assert_eq!(condition.0.to_string(), "(x < 3)");
    assert_eq!(then_block.statements.len(), 1);
    assert_eq!(else_block.as_ref().map(|b| b.statements.len()), Some(2));
}

#[test]
fn test_parse_if_without_else() {
    let program = parse_ok("if ok { print(\"yes\"); }");
    assert!(matches!(
        program.statements[0].0,
        Stmt::If {
            else_block: None,
            ..
        }
    ));
}

#[test]
fn test_parse_while_with_loop_control() {
    let program = parse_ok("while i < 10 { if i == 5 { break; } continue; }");
    let Stmt::While { condition, body } = &program.statements[0].0 else {
        panic!("expected while");
    };
    assert_eq!(condition.0.to_string(), "(i < 10)");
    assert!(matches!(body.statements[1].0, Stmt::Continue));
}

#[test]
fn test_parse_for() {
    let program = parse_ok("for (var i: int = 0; i < 3; i += 1) { print(\"%d\", i); }");
    let Stmt::For {
        init,
        condition,
        step,
        body,
    } = &program.statements[0].0
    else {
        panic!("expected for");
    };
    assert_eq!(init.0.name, "i");
    assert_eq!(condition.0.to_string(), "(i < 3)");
    assert_eq!(step.0.op, AssignOp::AddAssign);
    assert_eq!(body.statements.len(), 1);
}

#[test]
fn test_parse_import_and_block() {
    let program = parse_ok("import \"lib/math.shaka\"; { var x: int = 1; }");
    assert!(matches!(&program.statements[0].0, Stmt::Import { path } if path == "lib/math.shaka"));
    assert!(matches!(&program.statements[1].0, Stmt::Block(block) if block.statements.len() == 1));
}

#[test]
fn test_var_missing_colon_reports_and_recovers() {
    let (program, errors) = parse_str("var x int = 5; var y: int = 2;");
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "expected token `:`, found token type `int`"
    );
    assert_eq!(errors[0].span, 6..9);
    assert_eq!(program.statements.len(), 1);
    assert!(matches!(&program.statements[0].0, Stmt::VarDecl(decl) if decl.name == "y"));
}

#[test]
fn test_missing_initializer_does_not_swallow_next_statement() {
    let (program, errors) = parse_str("var x: int = ; print(\"hi\");");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "expected an expression, found token `;`");
    assert_eq!(program.statements.len(), 1);
    assert_eq!(program.statements[0].0.tag(), "ExpressionStatement");
}

#[test]
fn test_multiple_errors_are_collected() {
    let (program, errors) = parse_str("var a = 1; var b: = 2; var c: int = 3;");
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.message.starts_with("expected token")));
    assert_eq!(program.statements.len(), 1);
}

#[test]
fn test_recovery_stays_inside_block() {
    let (program, errors) = parse_str("while x { var y: = 1; x = 2; } z = 3;");
    assert_eq!(errors.len(), 1);
    assert_eq!(program.statements.len(), 2);
    let Stmt::While { body, .. } = &program.statements[0].0 else {
        panic!("expected while");
    };
    assert_eq!(body.statements.len(), 1);
}

#[test]
fn test_unknown_token_is_rejected() {
    let (_, errors) = parse_str("var x: int = @;");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "unrecognised input `@`");
    assert_eq!(errors[0].code, "Lexical Error");
}

#[test]
fn test_unclosed_block_reports_eof() {
    let (program, errors) = parse_str("while x { x = 1;");
    assert!(program.statements.is_empty());
    assert_eq!(
        errors.last().map(|e| e.message.as_str()),
        Some("expected token `}`, found token end of file")
    );
}

#[test]
fn test_only_identifiers_can_be_called() {
    let (_, errors) = parse_str("(1)(2);");
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "only named functions can be called, found `1` before `(`"
    );
}

#[test]
fn test_stray_closing_brace() {
    let (program, errors) = parse_str("} x = 1;");
    assert_eq!(errors.len(), 1);
    assert_eq!(program.statements.len(), 1);
}

#[test]
fn test_function_errors_carry_syntax_note() {
    let (_, errors) = parse_str("def f(a int) -> int { return a; }");
    assert!(!errors.is_empty());
    assert!(
        errors[0]
            .note
            .as_deref()
            .is_some_and(|note| note.contains("def function_name"))
    );
}

#[test]
fn test_json_dump_names_variants() {
    let program = parse_ok("var x: int = 1 + 2;");
    let json = program.to_json().unwrap();
    assert!(json.contains("\"VarDecl\""));
    assert!(json.contains("\"Infix\""));
    assert!(json.contains("\"Add\""));
}
