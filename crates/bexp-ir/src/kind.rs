//! Expression node kinds.

use std::fmt;

/// Kind of an operand expression node.
///
/// Discriminants are the tags written into expression signatures and must not change.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[repr(u8)]
pub enum ExpressionKind {
    Mnemonic = 0,
    Symbol = 1,
    ImmediateInt = 2,
    ImmediateFloat = 3,
    Operator = 4,
    Register = 5,
    SizePrefix = 6,
    Dereference = 7,

    // Label kinds below only differentiate immediates for highlighting.
    NewOperand = 8,
    StackVariable = 9,
    GlobalVariable = 10,
    JumpLabel = 11,
    Function = 12,

    Invalid = 255,
}

impl ExpressionKind {
    /// Tag byte used in signatures.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a kind by its tag byte.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Mnemonic,
            1 => Self::Symbol,
            2 => Self::ImmediateInt,
            3 => Self::ImmediateFloat,
            4 => Self::Operator,
            5 => Self::Register,
            6 => Self::SizePrefix,
            7 => Self::Dereference,
            8 => Self::NewOperand,
            9 => Self::StackVariable,
            10 => Self::GlobalVariable,
            11 => Self::JumpLabel,
            12 => Self::Function,
            255 => Self::Invalid,
            _ => return None,
        })
    }

    /// Whether nodes of this kind carry an immediate value (and may omit a symbol).
    pub const fn is_immediate(self) -> bool {
        matches!(
            self,
            Self::ImmediateInt
                | Self::ImmediateFloat
                | Self::NewOperand
                | Self::StackVariable
                | Self::GlobalVariable
                | Self::JumpLabel
                | Self::Function
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Mnemonic => "mnemonic",
            Self::Symbol => "symbol",
            Self::ImmediateInt => "immediate_int",
            Self::ImmediateFloat => "immediate_float",
            Self::Operator => "operator",
            Self::Register => "register",
            Self::SizePrefix => "size_prefix",
            Self::Dereference => "dereference",
            Self::NewOperand => "new_operand",
            Self::StackVariable => "stack_variable",
            Self::GlobalVariable => "global_variable",
            Self::JumpLabel => "jump_label",
            Self::Function => "function",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
