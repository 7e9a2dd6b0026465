use std::sync::Once;

use bexp::{ExpressionKind, RawExpression};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .with_test_writer()
            .init();
    });
}

pub fn register(name: &str) -> Vec<RawExpression> {
    vec![RawExpression::new(ExpressionKind::Register, name, 0)]
}

#[allow(clippy::cast_possible_wrap)]
pub fn immediate(value: u64) -> Vec<RawExpression> {
    vec![RawExpression::new(ExpressionKind::ImmediateInt, "", value as i64)]
}

/// `dword ptr [base + disp]`
#[allow(clippy::cast_possible_wrap)]
pub fn memory(base: &str, disp: u64) -> Vec<RawExpression> {
    vec![
        RawExpression::new(ExpressionKind::SizePrefix, "b4", 0),
        RawExpression::new(ExpressionKind::Dereference, "[", 0).with_parent(0),
        RawExpression::new(ExpressionKind::Operator, "+", 0).with_parent(1),
        RawExpression::new(ExpressionKind::Register, base, 0).with_parent(2),
        RawExpression::new(ExpressionKind::ImmediateInt, "", disp as i64)
            .with_parent(2)
            .at_position(1),
    ]
}
