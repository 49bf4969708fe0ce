//! Operand coercion for binary nodes.

use super::Expr;

/// Unifies two operands whose types differ only in nullability.
///
/// The non-nullable side is lifted to the nullable type, never the reverse,
/// and only when both share the same base type. Any other mismatch is left
/// as-is for the caller to deal with.
pub fn unify(left: Expr, right: Expr) -> (Expr, Expr) {
    let left_ty = left.value_type();
    let right_ty = right.value_type();
    if left_ty == right_ty || left_ty.non_nullable() != right_ty.non_nullable() {
        return (left, right);
    }
    match (left_ty.is_nullable(), right_ty.is_nullable()) {
        (false, true) => (Expr::lift(left), right),
        (true, false) => (left, Expr::lift(right)),
        _ => (left, right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Parameter, UnaryOp};
    use crate::types::{NumberKind, ValueType};

    fn is_lifted(expr: &Expr) -> bool {
        matches!(
            expr,
            Expr::Unary {
                op: UnaryOp::Lift,
                ..
            }
        )
    }

    #[test]
    fn lifts_non_nullable_side() {
        let nullable = Parameter::new("a", ValueType::Number(NumberKind::I32).nullable());
        let (l, r) = unify(Expr::constant(1i32), Expr::param(&nullable));
        assert!(is_lifted(&l));
        assert!(!is_lifted(&r));
        assert_eq!(l.value_type(), r.value_type());

        let (l, r) = unify(Expr::param(&nullable), Expr::constant(1i32));
        assert!(!is_lifted(&l));
        assert!(is_lifted(&r));
    }

    #[test]
    fn leaves_equal_types_alone() {
        let (l, r) = unify(Expr::constant(1i32), Expr::constant(2i32));
        assert!(!is_lifted(&l) && !is_lifted(&r));
    }

    #[test]
    fn leaves_different_bases_alone() {
        let nullable = Parameter::new("a", ValueType::Number(NumberKind::I64).nullable());
        let (l, r) = unify(Expr::param(&nullable), Expr::constant(1i32));
        assert!(!is_lifted(&l) && !is_lifted(&r));
    }
}
