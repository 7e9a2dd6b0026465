//! Instructions and operands as sequences of expression ids.

use crate::expr::ExprId;

/// One operand: its expression nodes in decoder order (parents first).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Operand {
    expressions: Vec<ExprId>,
}

impl Operand {
    pub const fn new(expressions: Vec<ExprId>) -> Self {
        Self { expressions }
    }

    pub fn expressions(&self) -> &[ExprId] {
        &self.expressions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExprId> {
        self.expressions.iter()
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl<'a> IntoIterator for &'a Operand {
    type Item = &'a ExprId;
    type IntoIter = std::slice::Iter<'a, ExprId>;

    fn into_iter(self) -> Self::IntoIter {
        self.expressions.iter()
    }
}

/// A decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Address of the first byte.
    pub address: u64,
    /// Size in bytes.
    pub size: u8,
    pub mnemonic: String,
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(address: u64, size: u8, mnemonic: impl Into<String>) -> Self {
        Self {
            address,
            size,
            mnemonic: mnemonic.into(),
            operands: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn push_operand(&mut self, operand: Operand) {
        self.operands.push(operand);
    }

    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    /// Address of the following instruction, saturating at the top of the
    /// address space.
    pub fn next_address(&self) -> u64 {
        self.address.saturating_add(u64::from(self.size))
    }
}
