//! Syntax tree produced by the parser and owned by a compiled `Format`.

pub use crate::token::Comparator;

/// The root of a parsed template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub body: Vec<Node>,
}

/// A template node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    StringLiteral(String),
    /// Any numeric literal, including fractional and exponential ones.
    IntegerLiteral(f64),
    /// A name looked up in the data record at render time.
    NamedReference(String),
    BooleanExpression(BooleanExpression),
    /// A `{...}` code block nested in a template or another block.
    TemplateBlock(Vec<Node>),
    ConditionalStatement(ConditionalStatement),
}

/// `left OPERATOR right`. The left side is whatever node preceded the
/// operator; the right side is a single literal or reference.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanExpression {
    pub left: Box<Node>,
    pub right: Box<Node>,
    pub operator: Comparator,
}

/// The test of a conditional: true when any of its children is truthy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThenClause {
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElseClause {
    pub body: Vec<Node>,
}

/// `IF test THEN consequent ELSE alternate`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionalStatement {
    pub test: Predicate,
    pub consequent: ThenClause,
    pub alternate: ElseClause,
}

impl Node {
    /// Whether this node may stand on the left of a comparator.
    pub fn is_operand(&self) -> bool {
        matches!(
            self,
            Node::StringLiteral(_)
                | Node::IntegerLiteral(_)
                | Node::NamedReference(_)
                | Node::BooleanExpression(_)
        )
    }

    /// Short name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::StringLiteral(_) => "string literal",
            Node::IntegerLiteral(_) => "number literal",
            Node::NamedReference(_) => "named reference",
            Node::BooleanExpression(_) => "boolean expression",
            Node::TemplateBlock(_) => "code block",
            Node::ConditionalStatement(_) => "conditional",
        }
    }
}
