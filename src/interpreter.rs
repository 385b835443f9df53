use std::cmp::Ordering;

use crate::ast::*;
use crate::value::{Record, Value};

/// Render a template against a data record. Missing names render as
/// nothing; evaluation itself cannot fail.
pub fn render(template: &Template, data: &Record) -> String {
    let mut out = String::new();
    render_body(&template.body, data, &mut out);
    out
}

fn render_body(nodes: &[Node], data: &Record, out: &mut String) {
    for node in nodes {
        match node {
            // Strings skip the intermediate Value
            Node::StringLiteral(text) => out.push_str(text),
            Node::TemplateBlock(children) => render_body(children, data, out),
            Node::ConditionalStatement(cond) => render_conditional(cond, data, out),
            _ => out.push_str(&evaluate(node, data).to_string()),
        }
    }
}

fn render_conditional(cond: &ConditionalStatement, data: &Record, out: &mut String) {
    if test(&cond.test, data) {
        render_body(&cond.consequent.body, data, out);
    } else {
        render_body(&cond.alternate.body, data, out);
    }
}

/// A predicate holds when any of its conditions does.
fn test(predicate: &Predicate, data: &Record) -> bool {
    predicate
        .body
        .iter()
        .any(|node| evaluate(node, data).is_truthy())
}

/// Evaluate one node to a value.
pub fn evaluate(node: &Node, data: &Record) -> Value {
    match node {
        Node::StringLiteral(text) => Value::Text(text.clone()),
        Node::IntegerLiteral(n) => Value::Number(*n),
        Node::NamedReference(name) => match data.get(name) {
            Some(n) => Value::Number(*n),
            None => Value::Missing,
        },
        Node::BooleanExpression(expr) => Value::Bool(compare(expr, data)),
        Node::TemplateBlock(_) | Node::ConditionalStatement(_) => {
            let mut out = String::new();
            render_body(std::slice::from_ref(node), data, &mut out);
            Value::Text(out)
        }
    }
}

fn compare(expr: &BooleanExpression, data: &Record) -> bool {
    let left = evaluate(&expr.left, data);
    let right = evaluate(&expr.right, data);
    let ordering = match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l.partial_cmp(&r),
        _ => None,
    };

    match expr.operator {
        Comparator::Eq => left == right,
        Comparator::Ne => left != right,
        Comparator::Lt => ordering == Some(Ordering::Less),
        Comparator::Gt => ordering == Some(Ordering::Greater),
        Comparator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Comparator::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    }
}
