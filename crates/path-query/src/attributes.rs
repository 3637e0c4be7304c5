//! Attributes a compiled expression can observe.

use hierarchy_snapshot::{name_for, Attribute, AttributeSet, RECT_FIELDS};

use crate::ast::{Axis, Expr, Function, NodeTest, Step};

enum Visit<'a> {
    Expr(&'a Expr),
    Step(&'a Step),
}

/// Smallest attribute set that evaluates `expr` the same as a full capture.
///
/// Named attribute steps contribute their attribute; a rectangle field pulls
/// in the frame. Attribute wildcards and `name()`/`local-name()` can observe
/// any attribute, so they widen the result to everything. Kind and frame are
/// always included.
pub(crate) fn referenced_attributes(expr: &Expr) -> AttributeSet {
    let mut wanted = AttributeSet::required();
    let mut pending = vec![Visit::Expr(expr)];

    while let Some(visit) = pending.pop() {
        match visit {
            Visit::Step(step) => {
                if step.axis == Axis::Attribute {
                    match &step.test {
                        NodeTest::Name(name) => {
                            if let Some(attribute) = attribute_named(name) {
                                wanted = wanted.with(attribute);
                            }
                        }
                        NodeTest::Wildcard | NodeTest::Node => return AttributeSet::all(),
                        NodeTest::Text => {}
                    }
                }
                pending.extend(step.predicates.iter().map(Visit::Expr));
            }
            Visit::Expr(expr) => match expr {
                Expr::Path(path) => pending.extend(path.steps.iter().map(Visit::Step)),
                Expr::Filter {
                    base,
                    predicates,
                    steps,
                } => {
                    pending.push(Visit::Expr(base));
                    pending.extend(predicates.iter().map(Visit::Expr));
                    pending.extend(steps.iter().map(Visit::Step));
                }
                Expr::Union(left, right) | Expr::Binary(_, left, right) => {
                    pending.push(Visit::Expr(left));
                    pending.push(Visit::Expr(right));
                }
                Expr::Negate(operand) => pending.push(Visit::Expr(operand)),
                Expr::Call(Function::Name | Function::LocalName, _) => {
                    return AttributeSet::all()
                }
                Expr::Call(_, args) => pending.extend(args.iter().map(Visit::Expr)),
                Expr::Literal(_) | Expr::Number(_) => {}
            },
        }
    }
    wanted
}

/// Unknown names match no document attribute and need nothing captured.
fn attribute_named(name: &str) -> Option<Attribute> {
    if RECT_FIELDS.contains(&name) {
        return Some(Attribute::Frame);
    }
    name_for(name).ok()
}
