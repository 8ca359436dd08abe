//! End-to-end: AST -> SINASM -> object file -> linked image -> VM run.

use sincc::ast::{
    Allocation, BinaryOp, Definition, Expression, Statement, StatementBlock, StatementKind,
};
use sincc::types::{DataType, SymbolQuality, Type};
use sincc::CodeGen;
use sinvm::SinVm;

fn int() -> DataType {
    DataType::new(Type::Int)
}

fn stmt(kind: StatementKind, line: usize) -> Statement {
    Statement::new(kind, line)
}

fn compile_and_run(program: StatementBlock) -> SinVm {
    let compiled = CodeGen::new().generate(&program).expect("compiles");
    let object = sinasm::assemble(&compiled.assembly).expect("assembles");
    let image = sinasm::link(&[object]).expect("links");
    let mut vm = SinVm::new(&image.bytes, image.entry).expect("loads");
    vm.run().expect("runs to halt");
    vm
}

#[test]
fn alloc_add_return_halts_with_eight() {
    // alloc int x: 5; x = x + 3; return x;
    let program = StatementBlock::new(vec![
        stmt(
            StatementKind::Allocation(
                Allocation::new(int(), "x").with_initializer(Expression::IntLiteral(5)),
            ),
            1,
        ),
        stmt(
            StatementKind::Assignment {
                lvalue: Expression::LValue("x".into()),
                rvalue: Expression::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(Expression::LValue("x".into())),
                    rhs: Box::new(Expression::IntLiteral(3)),
                },
            },
            2,
        ),
        stmt(
            StatementKind::Return {
                value: Some(Expression::LValue("x".into())),
            },
            3,
        ),
    ]);

    let vm = compile_and_run(program);
    assert_eq!(vm.a, 8);
}

#[test]
fn recursive_factorial_of_five() {
    // def int fact(alloc int n) {
    //     if (n <= 1) { return 1; } else { return n * fact(n - 1); }
    // }
    // alloc int r: 0; r = fact(5); return r;
    let fact = Definition {
        name: "fact".into(),
        return_type: int(),
        parameters: vec![Allocation::new(int(), "n")],
        body: StatementBlock::new(vec![stmt(
            StatementKind::IfThenElse {
                condition: Expression::Binary {
                    op: BinaryOp::LessEqual,
                    lhs: Box::new(Expression::LValue("n".into())),
                    rhs: Box::new(Expression::IntLiteral(1)),
                },
                then_branch: StatementBlock::new(vec![stmt(
                    StatementKind::Return {
                        value: Some(Expression::IntLiteral(1)),
                    },
                    2,
                )]),
                else_branch: Some(StatementBlock::new(vec![stmt(
                    StatementKind::Return {
                        value: Some(Expression::Binary {
                            op: BinaryOp::Mul,
                            lhs: Box::new(Expression::LValue("n".into())),
                            rhs: Box::new(Expression::Call {
                                name: "fact".into(),
                                args: vec![Expression::Binary {
                                    op: BinaryOp::Sub,
                                    lhs: Box::new(Expression::LValue("n".into())),
                                    rhs: Box::new(Expression::IntLiteral(1)),
                                }],
                            }),
                        }),
                    },
                    3,
                )])),
            },
            2,
        )]),
    };

    let program = StatementBlock::new(vec![
        stmt(StatementKind::Definition(fact), 1),
        stmt(
            StatementKind::Allocation(
                Allocation::new(int(), "r").with_initializer(Expression::IntLiteral(0)),
            ),
            5,
        ),
        stmt(
            StatementKind::Assignment {
                lvalue: Expression::LValue("r".into()),
                rvalue: Expression::Call {
                    name: "fact".into(),
                    args: vec![Expression::IntLiteral(5)],
                },
            },
            6,
        ),
        stmt(
            StatementKind::Return {
                value: Some(Expression::LValue("r".into())),
            },
            7,
        ),
    ]);

    let vm = compile_and_run(program);
    assert_eq!(vm.a, 120);
    assert_eq!(vm.call_sp, arch::mem::CALL_STACK_TOP);
}

#[test]
fn while_loop_sums_one_through_five() {
    // alloc int total: 0; alloc int i: 1;
    // while (i <= 5) { total = total + i; i = i + 1; }
    // return total;
    let binary = |op, lhs, rhs| Expression::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    };
    let program = StatementBlock::new(vec![
        stmt(
            StatementKind::Allocation(
                Allocation::new(int(), "total").with_initializer(Expression::IntLiteral(0)),
            ),
            1,
        ),
        stmt(
            StatementKind::Allocation(
                Allocation::new(int(), "i").with_initializer(Expression::IntLiteral(1)),
            ),
            2,
        ),
        stmt(
            StatementKind::WhileLoop {
                condition: binary(
                    BinaryOp::LessEqual,
                    Expression::LValue("i".into()),
                    Expression::IntLiteral(5),
                ),
                body: StatementBlock::new(vec![
                    stmt(
                        StatementKind::Assignment {
                            lvalue: Expression::LValue("total".into()),
                            rvalue: binary(
                                BinaryOp::Add,
                                Expression::LValue("total".into()),
                                Expression::LValue("i".into()),
                            ),
                        },
                        4,
                    ),
                    stmt(
                        StatementKind::Assignment {
                            lvalue: Expression::LValue("i".into()),
                            rvalue: binary(
                                BinaryOp::Add,
                                Expression::LValue("i".into()),
                                Expression::IntLiteral(1),
                            ),
                        },
                        5,
                    ),
                ]),
            },
            3,
        ),
        stmt(
            StatementKind::Return {
                value: Some(Expression::LValue("total".into())),
            },
            7,
        ),
    ]);

    let vm = compile_and_run(program);
    assert_eq!(vm.a, 15);
}

#[test]
fn pointer_roundtrip_through_address_of() {
    // alloc int v: 7; alloc ptr p: &v; *p = 41; return v + 1;
    let program = StatementBlock::new(vec![
        stmt(
            StatementKind::Allocation(
                Allocation::new(int(), "v").with_initializer(Expression::IntLiteral(7)),
            ),
            1,
        ),
        stmt(
            StatementKind::Allocation(
                Allocation::new(DataType::with_subtype(Type::Ptr, Type::Int), "p")
                    .with_initializer(Expression::AddressOf { name: "v".into() }),
            ),
            2,
        ),
        stmt(
            StatementKind::Assignment {
                lvalue: Expression::Dereferenced(Box::new(Expression::LValue("p".into()))),
                rvalue: Expression::IntLiteral(41),
            },
            3,
        ),
        stmt(
            StatementKind::Return {
                value: Some(Expression::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(Expression::LValue("v".into())),
                    rhs: Box::new(Expression::IntLiteral(1)),
                }),
            },
            4,
        ),
    ]);

    let vm = compile_and_run(program);
    assert_eq!(vm.a, 42);
}

#[test]
fn array_elements_store_and_load() {
    // alloc array[3] of int a; a[0] = 10; a[1] = 20; a[2] = 30;
    // return a[0] + a[2];
    let index = |i| Expression::Indexed {
        base: Box::new(Expression::LValue("a".into())),
        index: Box::new(Expression::IntLiteral(i)),
    };
    let mut statements = vec![stmt(
        StatementKind::Allocation(Allocation::new(DataType::array_of(Type::Int, 3), "a")),
        1,
    )];
    for (i, value) in [(0, 10), (1, 20), (2, 30)] {
        statements.push(stmt(
            StatementKind::Assignment {
                lvalue: index(i),
                rvalue: Expression::IntLiteral(value),
            },
            2 + i as usize,
        ));
    }
    statements.push(stmt(
        StatementKind::Return {
            value: Some(Expression::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(index(0)),
                rhs: Box::new(index(2)),
            }),
        },
        5,
    ));

    let vm = compile_and_run(StatementBlock::new(statements));
    assert_eq!(vm.a, 40);
}

#[test]
fn dynamic_allocation_and_free_run_clean() {
    // alloc dynamic int d: 9; free d; return 0;
    let dynamic_int = int().with_quality(SymbolQuality::Dynamic);
    let program = StatementBlock::new(vec![
        stmt(
            StatementKind::Allocation(
                Allocation::new(dynamic_int, "d").with_initializer(Expression::IntLiteral(9)),
            ),
            1,
        ),
        stmt(
            StatementKind::FreeMemory {
                lvalue: Expression::LValue("d".into()),
            },
            2,
        ),
        stmt(
            StatementKind::Return {
                value: Some(Expression::IntLiteral(0)),
            },
            3,
        ),
    ]);

    let vm = compile_and_run(program);
    assert!(vm.heap.objects().is_empty());
    assert_eq!(vm.a, 0);
}

#[test]
fn branch_taken_and_skipped() {
    // alloc int x: 0; if (true) { x = 1; } else { x = 2; } return x;
    let program = StatementBlock::new(vec![
        stmt(
            StatementKind::Allocation(
                Allocation::new(int(), "x").with_initializer(Expression::IntLiteral(0)),
            ),
            1,
        ),
        stmt(
            StatementKind::IfThenElse {
                condition: Expression::BoolLiteral(true),
                then_branch: StatementBlock::new(vec![stmt(
                    StatementKind::Assignment {
                        lvalue: Expression::LValue("x".into()),
                        rvalue: Expression::IntLiteral(1),
                    },
                    2,
                )]),
                else_branch: Some(StatementBlock::new(vec![stmt(
                    StatementKind::Assignment {
                        lvalue: Expression::LValue("x".into()),
                        rvalue: Expression::IntLiteral(2),
                    },
                    3,
                )])),
            },
            2,
        ),
        stmt(
            StatementKind::Return {
                value: Some(Expression::LValue("x".into())),
            },
            4,
        ),
    ]);

    let vm = compile_and_run(program);
    assert_eq!(vm.a, 1);
}

#[test]
fn default_parameter_fills_missing_actual() {
    // def int plus(alloc int a, alloc int b: 10) { return a + b; }
    // alloc int r: 0; r = plus(4); return r;
    let plus = Definition {
        name: "plus".into(),
        return_type: int(),
        parameters: vec![
            Allocation::new(int(), "a"),
            Allocation::new(int(), "b").with_initializer(Expression::IntLiteral(10)),
        ],
        body: StatementBlock::new(vec![stmt(
            StatementKind::Return {
                value: Some(Expression::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(Expression::LValue("a".into())),
                    rhs: Box::new(Expression::LValue("b".into())),
                }),
            },
            2,
        )]),
    };
    let program = StatementBlock::new(vec![
        stmt(StatementKind::Definition(plus), 1),
        stmt(
            StatementKind::Allocation(
                Allocation::new(int(), "r").with_initializer(Expression::IntLiteral(0)),
            ),
            4,
        ),
        stmt(
            StatementKind::Assignment {
                lvalue: Expression::LValue("r".into()),
                rvalue: Expression::Call {
                    name: "plus".into(),
                    args: vec![Expression::IntLiteral(4)],
                },
            },
            5,
        ),
        stmt(
            StatementKind::Return {
                value: Some(Expression::LValue("r".into())),
            },
            6,
        ),
    ]);

    let vm = compile_and_run(program);
    assert_eq!(vm.a, 14);
}

#[test]
fn float_arithmetic_through_the_fpu() {
    // alloc float f: 1.5; f = f + 2.0; return f;  (A holds half bits)
    let float = DataType::new(Type::Float);
    let program = StatementBlock::new(vec![
        stmt(
            StatementKind::Allocation(
                Allocation::new(float, "f").with_initializer(Expression::FloatLiteral(1.5)),
            ),
            1,
        ),
        stmt(
            StatementKind::Assignment {
                lvalue: Expression::LValue("f".into()),
                rvalue: Expression::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(Expression::LValue("f".into())),
                    rhs: Box::new(Expression::FloatLiteral(2.0)),
                },
            },
            2,
        ),
        stmt(
            StatementKind::Return {
                value: Some(Expression::LValue("f".into())),
            },
            3,
        ),
    ]);

    let vm = compile_and_run(program);
    assert_eq!(vm.a, arch::half::pack(3.5f32.to_bits()));
}
