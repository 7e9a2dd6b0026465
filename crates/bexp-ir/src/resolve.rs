//! Attribution of a referenced address to an operand expression.
//!
//! Cross-reference records name only the target address, not which operand or
//! expression produced it. [`source_expression`] recovers a best-effort
//! position using these rules, in order, each scanning operands and
//! expressions in instruction order and stopping at the first hit:
//!
//! 1. an immediate whose value equals the target,
//! 2. an expression whose parent is a dereference (the immediate itself, or
//!    the expression before it otherwise, which is `-1` when the expression
//!    opens its operand),
//! 3. operand 0 of a single-operand instruction,
//! 4. the first immediate anywhere.

use tracing::trace;

use crate::cache::ExpressionCache;
use crate::expr::Expression;
use crate::instr::Instruction;

/// Position of an expression within an instruction.
///
/// `expression` is signed: the dereference rule can point one slot before the
/// start of an operand when the dereference itself sits in an earlier operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceExpression {
    pub operand: usize,
    pub expression: isize,
}

impl SourceExpression {
    pub const fn new(operand: usize, expression: isize) -> Self {
        Self {
            operand,
            expression,
        }
    }
}

/// Export form of an attribution: `(-1, -1)` when nothing matched.
pub fn export_coordinates(source: Option<SourceExpression>) -> (i32, i32) {
    source.map_or((-1, -1), |s| {
        (
            i32::try_from(s.operand).unwrap_or(i32::MAX),
            i32::try_from(s.expression).unwrap_or(i32::MAX),
        )
    })
}

/// Find the operand expression of `instruction` that most plausibly refers to `target`.
pub fn source_expression(
    cache: &ExpressionCache,
    instruction: &Instruction,
    target: u64,
) -> Option<SourceExpression> {
    if let Some((found, _)) = find_first(cache, instruction, |expr| {
        expr.is_immediate() && as_address(expr.immediate()) == target
    }) {
        trace!(address = instruction.address, target, "exact immediate match");
        return Some(found);
    }

    if let Some((found, expr)) = find_first(cache, instruction, |expr| {
        cache
            .parent_of(expr)
            .is_some_and(Expression::is_dereference_operator)
    }) {
        // Non-immediates point at the slot before them, where the
        // dereference usually sits.
        let expression = if expr.is_immediate() {
            found.expression
        } else {
            found.expression - 1
        };
        trace!(address = instruction.address, target, "dereference match");
        return Some(SourceExpression::new(found.operand, expression));
    }

    if instruction.operand_count() == 1 {
        return Some(SourceExpression::new(0, 0));
    }

    find_first(cache, instruction, Expression::is_immediate).map(|(found, _)| found)
}

/// Immediates compare against addresses by their raw bits.
#[allow(clippy::cast_sign_loss)]
const fn as_address(immediate: i64) -> u64 {
    immediate as u64
}

fn find_first<'c>(
    cache: &'c ExpressionCache,
    instruction: &Instruction,
    mut predicate: impl FnMut(&Expression) -> bool,
) -> Option<(SourceExpression, &'c Expression)> {
    for (operand_index, operand) in instruction.operands.iter().enumerate() {
        for (expression_index, &id) in operand.iter().enumerate() {
            let Some(expr) = cache.get(id) else {
                continue;
            };
            if predicate(expr) {
                let expression = isize::try_from(expression_index).unwrap_or(isize::MAX);
                return Some((SourceExpression::new(operand_index, expression), expr));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExpressionBuilder, Operand};

    fn reg(cache: &mut ExpressionCache, name: &str) -> Operand {
        Operand::new(vec![ExpressionBuilder::register(name).build(cache).unwrap()])
    }

    fn imm(cache: &mut ExpressionCache, value: u64) -> Operand {
        Operand::new(vec![ExpressionBuilder::immediate_int(value).build(cache).unwrap()])
    }

    /// `[base + disp]` as dereference, operator, register, immediate.
    fn mem(cache: &mut ExpressionCache, base: &str, disp: u64) -> Operand {
        let deref = ExpressionBuilder::dereference().build(cache).unwrap();
        let plus = ExpressionBuilder::operator("+")
            .with_parent(deref)
            .build(cache)
            .unwrap();
        let base = ExpressionBuilder::register(base)
            .with_parent(plus)
            .build(cache)
            .unwrap();
        let disp = ExpressionBuilder::immediate_int(disp)
            .with_parent(plus)
            .at_position(1)
            .build(cache)
            .unwrap();
        Operand::new(vec![deref, plus, base, disp])
    }

    /// `[addr]` as dereference, immediate.
    fn mem_abs(cache: &mut ExpressionCache, addr: u64) -> Operand {
        let deref = ExpressionBuilder::dereference().build(cache).unwrap();
        let addr = ExpressionBuilder::immediate_int(addr)
            .with_parent(deref)
            .build(cache)
            .unwrap();
        Operand::new(vec![deref, addr])
    }

    #[test]
    fn test_exact_immediate_wins() {
        let mut cache = ExpressionCache::new();
        let instr = Instruction::new(0x400, 5, "push")
            .with_operand(imm(&mut cache, 0x1000))
            .with_operand(reg(&mut cache, "eax"));
        assert_eq!(
            source_expression(&cache, &instr, 0x1000),
            Some(SourceExpression::new(0, 0))
        );
    }

    #[test]
    fn test_exact_match_beats_dereference() {
        let mut cache = ExpressionCache::new();
        let instr = Instruction::new(0x400, 7, "mov")
            .with_operand(mem(&mut cache, "ebx", 0x20))
            .with_operand(imm(&mut cache, 0x2000));
        assert_eq!(
            source_expression(&cache, &instr, 0x2000),
            Some(SourceExpression::new(1, 0))
        );
    }

    #[test]
    fn test_first_exact_match_in_instruction_order() {
        let mut cache = ExpressionCache::new();
        let instr = Instruction::new(0x400, 7, "cmp")
            .with_operand(imm(&mut cache, 0x3000))
            .with_operand(imm(&mut cache, 0x3000));
        assert_eq!(
            source_expression(&cache, &instr, 0x3000),
            Some(SourceExpression::new(0, 0))
        );
    }

    #[test]
    fn test_dereference_of_register_plus_displacement() {
        let mut cache = ExpressionCache::new();
        let instr = Instruction::new(0x400, 3, "call").with_operand(mem(&mut cache, "ebx", 8));
        // The operator under the dereference is not immediate: use the dereference slot.
        assert_eq!(
            source_expression(&cache, &instr, 0x9999),
            Some(SourceExpression::new(0, 0))
        );
    }

    #[test]
    fn test_dereference_of_immediate() {
        let mut cache = ExpressionCache::new();
        let instr = Instruction::new(0x400, 6, "mov")
            .with_operand(reg(&mut cache, "eax"))
            .with_operand(mem_abs(&mut cache, 0x3000));
        assert_eq!(
            source_expression(&cache, &instr, 0x5000),
            Some(SourceExpression::new(1, 1))
        );
    }

    #[test]
    fn test_dereference_in_earlier_operand() {
        let mut cache = ExpressionCache::new();
        let deref = ExpressionBuilder::dereference().build(&mut cache).unwrap();
        let base = ExpressionBuilder::register("esi")
            .with_parent(deref)
            .build(&mut cache)
            .unwrap();
        let instr = Instruction::new(0x400, 2, "lods")
            .with_operand(Operand::new(vec![deref]))
            .with_operand(Operand::new(vec![base]));
        let found = source_expression(&cache, &instr, 0x1234);
        assert_eq!(found, Some(SourceExpression::new(1, -1)));
        assert_eq!(export_coordinates(found), (1, -1));
    }

    #[test]
    fn test_single_operand_fallback() {
        let mut cache = ExpressionCache::new();
        let instr = Instruction::new(0x400, 2, "call").with_operand(reg(&mut cache, "eax"));
        assert_eq!(
            source_expression(&cache, &instr, 0x1234),
            Some(SourceExpression::new(0, 0))
        );
    }

    #[test]
    fn test_any_immediate_fallback() {
        let mut cache = ExpressionCache::new();
        let instr = Instruction::new(0x400, 5, "mov")
            .with_operand(reg(&mut cache, "eax"))
            .with_operand(imm(&mut cache, 5));
        assert_eq!(
            source_expression(&cache, &instr, 0x1000),
            Some(SourceExpression::new(1, 0))
        );
    }

    #[test]
    fn test_give_up() {
        let mut cache = ExpressionCache::new();
        let instr = Instruction::new(0x400, 2, "mov")
            .with_operand(reg(&mut cache, "eax"))
            .with_operand(reg(&mut cache, "ebx"));
        let found = source_expression(&cache, &instr, 0x1000);
        assert_eq!(found, None);
        assert_eq!(export_coordinates(found), (-1, -1));
    }

    #[test]
    fn test_negative_immediate_compares_as_address() {
        let mut cache = ExpressionCache::new();
        let instr = Instruction::new(0x400, 5, "push")
            .with_operand(imm(&mut cache, 0xffff_ffff_ffff_fff0))
            .with_operand(reg(&mut cache, "eax"));
        assert_eq!(
            source_expression(&cache, &instr, 0xffff_ffff_ffff_fff0),
            Some(SourceExpression::new(0, 0))
        );
    }

    #[test]
    fn test_export_coordinates() {
        assert_eq!(export_coordinates(Some(SourceExpression::new(1, 3))), (1, 3));
    }
}
