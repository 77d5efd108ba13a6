use super::interp::{DEFAULT_FUEL, ExecError, Interpreter, MAX_CALL_DEPTH, MAX_FIELD, Pointer, RtValue, run};
use super::*;

fn span() -> Range<usize> {
    0..0
}

fn int(i: i32) -> Value {
    Value::Constant(Constant::Int(i))
}

fn reg(name: &str) -> Value {
    Value::Register(name.to_string())
}

fn printf_decl() -> Function {
    let mut printf = Function::external("printf", vec![("format", IRType::Ptr)], IRType::I32);
    printf.is_variadic = true;
    printf
}

fn module_with(functions: Vec<Function>) -> Module {
    let mut module = Module::new("test");
    module.functions.push(printf_decl());
    module.functions.extend(functions);
    module
}

fn ret(value: Option<Value>) -> Terminator {
    Terminator::Ret { value, span: span() }
}

fn call(dest: Option<&str>, func: &str, args: Vec<Value>, ty: IRType) -> Instruction {
    Instruction::Call {
        dest: dest.map(str::to_string),
        func: Value::Global(func.to_string()),
        args,
        ty,
        span: span(),
    }
}

#[test]
fn test_builder_numbers_registers_and_labels() {
    let mut builder = FunctionBuilder::new("f", vec![], IRType::I32);
    assert_eq!(builder.new_register(), "%1");
    assert_eq!(builder.new_named_register("x"), "%x.2");
    assert_eq!(builder.new_label("loop"), "loop1");
    assert_eq!(builder.new_label("loop"), "loop2");
    assert_eq!(builder.current_label(), "entry");
}

#[test]
fn test_allocas_are_hoisted_to_entry() {
    let mut builder = FunctionBuilder::new("f", vec![], IRType::I32);
    builder.add_instruction(Instruction::Add {
        dest: "%1".to_string(),
        lhs: int(1),
        rhs: int(2),
        ty: IRType::I32,
        span: span(),
    });
    let body = builder.create_block("body".to_string());
    builder.set_current_block(body);
    let first = builder.add_alloca("x", IRType::I32, span());
    let second = builder.add_alloca("y", IRType::F32, span());
    assert_eq!(first, "%x.1");
    assert_eq!(second, "%y.2");

    let function = builder.finish();
    let entry = &function.blocks[0].instructions;
    assert_eq!(entry.len(), 3);
    assert!(matches!(&entry[0], Instruction::Alloca { dest, .. } if dest == "%x.1"));
    assert!(matches!(&entry[1], Instruction::Alloca { dest, ty: IRType::F32, .. } if dest == "%y.2"));
    assert!(matches!(&entry[2], Instruction::Add { .. }));
    assert!(function.blocks[1].instructions.is_empty());
}

#[test]
fn test_first_terminator_wins() {
    let mut builder = FunctionBuilder::new("f", vec![], IRType::I32);
    assert!(!builder.is_terminated());
    builder.set_terminator(ret(Some(int(1))));
    builder.set_terminator(ret(Some(int(2))));
    assert!(builder.is_terminated());

    let function = builder.finish();
    assert!(matches!(
        &function.blocks[0].terminator,
        Some(Terminator::Ret { value: Some(Value::Constant(Constant::Int(1))), .. })
    ));
}

#[test]
fn test_reachability_follows_terminators() {
    let mut builder = FunctionBuilder::new("f", vec![], IRType::Void);
    assert!(builder.current_is_reachable());

    let target = builder.create_block("target".to_string());
    builder.set_current_block(target);
    assert!(!builder.current_is_reachable());

    builder.set_current_block(0);
    builder.set_terminator(Terminator::Br {
        label: "target".to_string(),
        span: span(),
    });
    builder.set_current_block(target);
    assert!(builder.current_is_reachable());
}

#[test]
fn test_validator_reports_structural_errors() {
    let mut builder = FunctionBuilder::new("main", vec![], IRType::I32);
    builder.set_terminator(Terminator::Br {
        label: "nowhere".to_string(),
        span: span(),
    });
    builder.create_block("open".to_string());
    let module = module_with(vec![builder.finish()]);

    assert_eq!(
        IRValidator::validate_module(&module),
        Err(vec![
            ValidationError::UnknownLabel {
                function: "main".to_string(),
                block: "entry".to_string(),
                label: "nowhere".to_string(),
            },
            ValidationError::MissingTerminator {
                function: "main".to_string(),
                block: "open".to_string(),
            },
        ])
    );
}

#[test]
fn test_validator_checks_registers_and_returns() {
    let mut builder = FunctionBuilder::new("main", vec![], IRType::I32);
    for _ in 0..2 {
        builder.add_instruction(Instruction::Add {
            dest: "%1".to_string(),
            lhs: int(1),
            rhs: int(1),
            ty: IRType::I32,
            span: span(),
        });
    }
    builder.set_terminator(ret(None));
    let module = module_with(vec![builder.finish()]);

    let errors = IRValidator::validate_module(&module).unwrap_err();
    assert_eq!(
        errors,
        vec![
            ValidationError::DuplicateRegister {
                function: "main".to_string(),
                register: "%1".to_string(),
            },
            ValidationError::ReturnMismatch {
                function: "main".to_string(),
                block: "entry".to_string(),
                expected: IRType::I32,
                found: "void".to_string(),
            },
        ]
    );
}

#[test]
fn test_validator_checks_calls() {
    let mut builder = FunctionBuilder::new("main", vec![], IRType::I32);
    builder.add_instruction(call(Some("%1"), "printf", vec![reg("%s"), int(1), int(2)], IRType::I32));
    builder.add_instruction(call(Some("%2"), "printf", vec![], IRType::I32));
    builder.add_instruction(call(None, "missing", vec![], IRType::Void));
    builder.set_terminator(ret(Some(int(0))));
    let module = module_with(vec![builder.finish()]);

    let errors = IRValidator::validate_module(&module).unwrap_err();
    assert_eq!(
        errors,
        vec![
            ValidationError::ArityMismatch {
                function: "main".to_string(),
                callee: "printf".to_string(),
                expected: 1,
                found: 0,
            },
            ValidationError::UnknownCallee {
                function: "main".to_string(),
                callee: "missing".to_string(),
            },
        ]
    );
}

#[test]
fn test_external_functions_are_not_validated() {
    let module = module_with(vec![]);
    assert_eq!(IRValidator::validate_module(&module), Ok(()));
}

#[test]
fn test_interpreter_stack_slots() {
    let mut builder = FunctionBuilder::new("main", vec![], IRType::I32);
    let slot = builder.add_alloca("x", IRType::I32, span());
    builder.add_instruction(Instruction::Store {
        value: int(5),
        ptr: reg(&slot),
        ty: IRType::I32,
        span: span(),
    });
    builder.add_instruction(Instruction::Load {
        dest: "%2".to_string(),
        ptr: reg(&slot),
        ty: IRType::I32,
        span: span(),
    });
    builder.add_instruction(Instruction::Mul {
        dest: "%3".to_string(),
        lhs: reg("%2"),
        rhs: reg("%2"),
        ty: IRType::I32,
        span: span(),
    });
    builder.set_terminator(ret(Some(reg("%3"))));
    let module = module_with(vec![builder.finish()]);

    let execution = run(&module, DEFAULT_FUEL).unwrap();
    assert_eq!(execution.exit_code, 25);
    assert_eq!(execution.output, "");
}

#[test]
fn test_interpreter_division_by_zero() {
    let mut builder = FunctionBuilder::new("main", vec![], IRType::I32);
    builder.add_instruction(Instruction::Div {
        dest: "%1".to_string(),
        lhs: int(1),
        rhs: int(0),
        ty: IRType::I32,
        span: span(),
    });
    builder.set_terminator(ret(Some(reg("%1"))));
    let module = module_with(vec![builder.finish()]);

    assert_eq!(
        run(&module, DEFAULT_FUEL),
        Err(ExecError::DivisionByZero {
            function: "main".to_string()
        })
    );
}

#[test]
fn test_interpreter_runs_out_of_fuel() {
    let mut builder = FunctionBuilder::new("main", vec![], IRType::I32);
    let spin = builder.create_block("spin".to_string());
    builder.set_terminator(Terminator::Br {
        label: "spin".to_string(),
        span: span(),
    });
    builder.set_current_block(spin);
    builder.set_terminator(Terminator::Br {
        label: "spin".to_string(),
        span: span(),
    });
    let module = module_with(vec![builder.finish()]);

    assert_eq!(run(&module, 100), Err(ExecError::OutOfFuel));
}

#[test]
fn test_interpreter_limits_call_depth() {
    let mut forever = FunctionBuilder::new("forever", vec![], IRType::I32);
    forever.add_instruction(call(Some("%1"), "forever", vec![], IRType::I32));
    forever.set_terminator(ret(Some(reg("%1"))));

    let mut main = FunctionBuilder::new("main", vec![], IRType::I32);
    main.add_instruction(call(Some("%1"), "forever", vec![], IRType::I32));
    main.set_terminator(ret(Some(reg("%1"))));
    let module = module_with(vec![forever.finish(), main.finish()]);

    // debug frames are large, so give the interpreter room to hit its own limit
    let result = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(move || run(&module, DEFAULT_FUEL))
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(result, Err(ExecError::StackOverflow(MAX_CALL_DEPTH)));
}

#[test]
fn test_interpreter_rejects_writes_to_constants() {
    let mut builder = FunctionBuilder::new("main", vec![], IRType::I32);
    builder.add_instruction(Instruction::Store {
        value: Value::Constant(Constant::Bool(false)),
        ptr: Value::Global("true".to_string()),
        ty: IRType::I1,
        span: span(),
    });
    builder.set_terminator(ret(Some(int(0))));
    let mut module = module_with(vec![builder.finish()]);
    module.globals.push(Global {
        name: "true".to_string(),
        ty: IRType::I1,
        initializer: Constant::Bool(true),
        is_constant: true,
    });

    assert_eq!(
        run(&module, DEFAULT_FUEL),
        Err(ExecError::WriteToConstant("true".to_string()))
    );
}

fn printf(format: &str, args: Vec<RtValue>) -> Result<String, ExecError> {
    let mut module = module_with(vec![]);
    module
        .global_strings
        .push((".str.0".to_string(), format.to_string()));
    module
        .global_strings
        .push((".str.1".to_string(), "abc".to_string()));

    let mut interpreter = Interpreter::new(&module, DEFAULT_FUEL);
    let mut all = vec![RtValue::Ptr(Pointer::Str(".str.0".to_string()))];
    all.extend(args);
    interpreter.call("printf", all)?;
    Ok(interpreter.output().to_string())
}

fn abc() -> RtValue {
    RtValue::Ptr(Pointer::Str(".str.1".to_string()))
}

#[test]
fn test_printf_integers() {
    assert_eq!(printf("%5d|", vec![RtValue::Int(42)]).unwrap(), "   42|");
    assert_eq!(printf("%-5d|", vec![RtValue::Int(42)]).unwrap(), "42   |");
    assert_eq!(printf("%05d", vec![RtValue::Int(-42)]).unwrap(), "-0042");
    assert_eq!(printf("%+d %i", vec![RtValue::Int(7), RtValue::Int(-3)]).unwrap(), "+7 -3");
    assert_eq!(
        printf(
            "%x %X %#x %o",
            vec![RtValue::Int(255), RtValue::Int(255), RtValue::Int(255), RtValue::Int(8)]
        )
        .unwrap(),
        "ff FF 0xff 10"
    );
    assert_eq!(printf("%c%c", vec![RtValue::Int(72), RtValue::Int(105)]).unwrap(), "Hi");
}

#[test]
fn test_printf_floats() {
    assert_eq!(printf("%.3f", vec![RtValue::Double(3.14159)]).unwrap(), "3.142");
    assert_eq!(printf("%8.2f|", vec![RtValue::Double(-1.5)]).unwrap(), "   -1.50|");
    assert_eq!(printf("%f", vec![RtValue::Double(2.0)]).unwrap(), "2.000000");
}

#[test]
fn test_printf_strings_and_percent() {
    assert_eq!(printf("%s|%.2s|%5s", vec![abc(), abc(), abc()]).unwrap(), "abc|ab|  abc");
    assert_eq!(printf("100%%", vec![]).unwrap(), "100%");
}

#[test]
fn test_printf_errors() {
    assert_eq!(
        printf("%d", vec![]),
        Err(ExecError::Format("missing argument for `%d`".to_string()))
    );
    assert!(matches!(printf("%q", vec![]), Err(ExecError::Format(_))));
    assert!(matches!(printf("%s", vec![RtValue::Int(1)]), Err(ExecError::Format(_))));
}

#[test]
fn test_printf_field_limits() {
    let wide = format!("%{}d", MAX_FIELD);
    assert_eq!(printf(&wide, vec![RtValue::Int(1)]).unwrap().len(), MAX_FIELD);

    for format in ["%99999999999999999999d", "%1000000000000d", "%.99999999999999999999f"] {
        assert!(
            matches!(printf(format, vec![RtValue::Int(1)]), Err(ExecError::Format(_))),
            "{format}"
        );
    }
}

#[test]
fn test_printf_returns_byte_count() {
    let mut module = module_with(vec![]);
    module
        .global_strings
        .push((".str.0".to_string(), "hello".to_string()));
    let mut interpreter = Interpreter::new(&module, DEFAULT_FUEL);
    let written = interpreter
        .call("printf", vec![RtValue::Ptr(Pointer::Str(".str.0".to_string()))])
        .unwrap();
    assert_eq!(written, RtValue::Int(5));
}

#[test]
fn test_instruction_display() {
    let add = Instruction::Add {
        dest: "%1".to_string(),
        lhs: Value::Constant(Constant::Float(1.5)),
        rhs: reg("%0"),
        ty: IRType::F32,
        span: span(),
    };
    assert_eq!(add.to_string(), "  %1 = fadd float 1.500000, %0");

    let rem = Instruction::Rem {
        dest: "%2".to_string(),
        lhs: reg("%1"),
        rhs: int(3),
        ty: IRType::I32,
        span: span(),
    };
    assert_eq!(rem.to_string(), "  %2 = srem i32 %1, 3");

    let neg = Instruction::Neg {
        dest: "%3".to_string(),
        value: reg("%2"),
        ty: IRType::I32,
        span: span(),
    };
    assert_eq!(neg.to_string(), "  %3 = sub i32 0, %2");

    let not = Instruction::Not {
        dest: "%4".to_string(),
        value: reg("%3"),
        span: span(),
    };
    assert_eq!(not.to_string(), "  %4 = xor i1 %3, true");

    let store = Instruction::Store {
        value: Value::Argument("n".to_string()),
        ptr: reg("%n.1"),
        ty: IRType::I32,
        span: span(),
    };
    assert_eq!(store.to_string(), "  store i32 %n, ptr %n.1");

    assert_eq!(
        call(None, "greet", vec![Value::Global(".str.0".to_string())], IRType::Void).to_string(),
        "  call void @greet(@.str.0)"
    );
}

#[test]
fn test_module_display() {
    let mut builder = FunctionBuilder::new("main", vec![], IRType::I32);
    builder.set_terminator(ret(Some(int(0))));
    let mut module = module_with(vec![builder.finish()]);
    module
        .global_strings
        .push((".str.0".to_string(), "hi\n".to_string()));
    module.globals.push(Global {
        name: "count".to_string(),
        ty: IRType::I32,
        initializer: Constant::Int(0),
        is_constant: false,
    });

    let text = module.to_string();
    assert!(text.starts_with("; Module: test\n"));
    assert!(text.contains(r#"@.str.0 = private unnamed_addr constant [4 x i8] c"hi\n\00""#));
    assert!(text.contains("@count = global i32 0\n"));
    assert!(text.contains("declare i32 @printf(ptr %format, ...)\n"));
    assert!(text.contains("define i32 @main() {\nentry:\n  ret 0\n}\n"));
}
