use bexp_cfg::{BasicBlock, EdgeKind, FlowGraphEdge, Function, FunctionType, NameKind};
use bexp_ir::{ExpressionBuilder, ExpressionCache, Instruction, Operand};

const ENTRY: u64 = 0x1000;
const A: u64 = 0x1010;
const B: u64 = 0x1020;
const C: u64 = 0x1030;
const D: u64 = 0x1040;

fn edge(source: u64, target: u64, kind: EdgeKind) -> FlowGraphEdge {
    FlowGraphEdge::new(source, target, kind)
}

/// entry -> A, A -> B, A -> C, B -> D, C -> D, D -> A
fn diamond_with_loop() -> Function {
    let mut function = Function::new(ENTRY);
    for start in [D, B, ENTRY, C, A] {
        function.add_basic_block(BasicBlock::new(start, start + 0x10));
    }
    // Sources are branch instructions at the end of each block.
    function.add_edge(edge(D + 0xe, A, EdgeKind::ConditionTrue));
    function.add_edge(edge(A + 0xe, C, EdgeKind::ConditionFalse));
    function.add_edge(edge(ENTRY + 0xc, A, EdgeKind::Unconditional));
    function.add_edge(edge(A + 0xe, B, EdgeKind::ConditionTrue));
    function.add_edge(edge(B + 0xc, D, EdgeKind::Unconditional));
    function.add_edge(edge(C + 0xc, D, EdgeKind::Unconditional));
    function
}

#[test]
fn test_diamond_with_loop_has_single_back_edge() {
    let mut function = diamond_with_loop();
    let dropped = function.finalize(true);
    assert_eq!(dropped, 0);

    let back = function.back_edges();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].source, D);
    assert_eq!(back[0].target, A);
}

#[test]
fn test_finalize_orders_blocks_and_edges() {
    let mut function = diamond_with_loop();
    function.finalize(true);

    let starts: Vec<u64> = function.basic_blocks().iter().map(BasicBlock::start).collect();
    assert!(starts.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(starts, vec![ENTRY, A, B, C, D]);

    let sources: Vec<u64> = function.edges().iter().map(|e| e.source).collect();
    assert!(sources.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        function
            .edges()
            .iter()
            .map(|e| (e.source, e.target))
            .collect::<Vec<_>>(),
        vec![(ENTRY, A), (A, B), (A, C), (B, D), (C, D), (D, A)]
    );
}

#[test]
fn test_unreachable_loop_yields_no_back_edge() {
    let mut function = diamond_with_loop();
    let island = 0x2000;
    function.add_basic_block(BasicBlock::new(island, island + 4));
    function.add_edge(edge(island, island, EdgeKind::Unconditional));
    function.finalize(true);

    let back: Vec<_> = function.back_edges().into_iter().map(|e| (e.source, e.target)).collect();
    assert_eq!(back, vec![(D, A)]);
}

#[test]
fn test_clear_then_reanalyze() {
    let mut function = diamond_with_loop();
    function.set_name("loop_fn", "");
    function.finalize(true);
    function.clear();

    assert_eq!(function.entry_point(), ENTRY);
    assert_eq!(function.name(NameKind::Mangled), "loop_fn");
    assert!(function.basic_blocks().is_empty());
    assert!(function.edges().is_empty());
    assert_eq!(function.classified_type(), FunctionType::Imported);

    function.add_basic_block(BasicBlock::new(ENTRY, ENTRY + 4));
    function.finalize(true);
    assert_eq!(function.classified_type(), FunctionType::Standard);
}

#[test]
fn test_instruction_lookup_through_blocks() {
    let mut cache = ExpressionCache::new();
    let eax = ExpressionBuilder::register("eax").build(&mut cache).unwrap();

    let block = BasicBlock::from_instructions(vec![
        Instruction::new(ENTRY, 1, "push").with_operand(Operand::new(vec![eax])),
        Instruction::new(ENTRY + 1, 1, "ret"),
    ])
    .unwrap();
    let mut function = Function::new(ENTRY);
    function.add_basic_block(block);
    function.finalize(true);

    let instr = function.instruction_at(ENTRY).unwrap();
    assert_eq!(instr.mnemonic, "push");
    assert_eq!(instr.operands[0].expressions(), &[eax]);
    assert!(function.instruction_at(ENTRY + 2).is_none());
}
