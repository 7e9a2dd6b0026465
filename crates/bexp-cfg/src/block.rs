//! Basic blocks.

use bexp_ir::Instruction;

/// Straight-line run of instructions covering `[start, end)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    start: u64,
    end: u64,
    instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Create an empty block spanning `[start, end)`.
    pub const fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            instructions: Vec::new(),
        }
    }

    /// Create a block covering the given instructions. Returns `None` if empty.
    pub fn from_instructions(mut instructions: Vec<Instruction>) -> Option<Self> {
        instructions.sort_by_key(|instr| instr.address);
        let start = instructions.first()?.address;
        let end = instructions.iter().map(Instruction::next_address).max()?;
        Some(Self {
            start,
            end,
            instructions,
        })
    }

    /// Append an instruction, growing the block to cover it.
    pub fn push(&mut self, instr: Instruction) {
        if self.instructions.is_empty() && self.start == self.end {
            self.start = instr.address;
        }
        self.end = self.end.max(instr.next_address());
        self.instructions.push(instr);
    }

    /// Start address (the block's identity in edges).
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// End address (exclusive).
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Size of block in bytes.
    pub const fn size(&self) -> u64 {
        self.end - self.start
    }

    pub const fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end
    }

    /// Address of the last instruction, or the start for an empty block.
    pub fn last_address(&self) -> u64 {
        self.instructions
            .last()
            .map_or(self.start, |instr| instr.address)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Instruction starting exactly at `address`.
    pub fn instruction_at(&self, address: u64) -> Option<&Instruction> {
        self.instructions
            .binary_search_by_key(&address, |instr| instr.address)
            .ok()
            .map(|idx| &self.instructions[idx])
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
