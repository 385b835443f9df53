use std::borrow::Cow;

use tracing::trace;

use crate::ast::*;
use crate::error::TimeError;
use crate::lexer::tokenize;
use crate::token::{Keyword, Token, TokenKind};

/// What `parse` accepts: template source, or tokens that were already scanned.
pub enum ParseInput<'a> {
    Source(&'a str),
    Tokens(Cow<'a, [Token]>),
}

impl<'a> From<&'a str> for ParseInput<'a> {
    fn from(source: &'a str) -> Self {
        ParseInput::Source(source)
    }
}

impl<'a> From<&'a String> for ParseInput<'a> {
    fn from(source: &'a String) -> Self {
        ParseInput::Source(source.as_str())
    }
}

impl<'a> From<&'a [Token]> for ParseInput<'a> {
    fn from(tokens: &'a [Token]) -> Self {
        ParseInput::Tokens(Cow::Borrowed(tokens))
    }
}

impl From<Vec<Token>> for ParseInput<'static> {
    fn from(tokens: Vec<Token>) -> Self {
        ParseInput::Tokens(Cow::Owned(tokens))
    }
}

/// Parse a template string (or a token sequence) into a syntax tree.
pub fn parse<'a>(input: impl Into<ParseInput<'a>>) -> Result<Template, TimeError> {
    match input.into() {
        ParseInput::Source(source) => parse_tokens(&tokenize(source)),
        ParseInput::Tokens(tokens) => parse_tokens(&tokens),
    }
}

/// Parse an already-tokenized template.
pub fn parse_tokens(tokens: &[Token]) -> Result<Template, TimeError> {
    let mut parser = Parser { tokens, pos: 0 };
    let body = parser.parse_body(|_| false)?;
    Ok(Template { body })
}

/// Decides where a nested body ends. The stopping token is left in the
/// stream for the caller.
type Stop = fn(&Token) -> bool;

/// Parser state: a cursor over a shared token stream. Every token is
/// consumed exactly once, left to right, across all nested calls.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

/// Children of the body being built. The most recent node stays in
/// `pending` so a following comparator can claim it as its left operand.
#[derive(Default)]
struct Body {
    nodes: Vec<Node>,
    pending: Option<Node>,
}

impl Body {
    fn push(&mut self, node: Node) {
        if let Some(previous) = self.pending.replace(node) {
            self.nodes.push(previous);
        }
    }

    fn take_pending(&mut self) -> Option<Node> {
        self.pending.take()
    }

    fn finish(mut self) -> Vec<Node> {
        self.nodes.extend(self.pending);
        self.nodes
    }
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn parse_body(&mut self, stop: Stop) -> Result<Vec<Node>, TimeError> {
        let mut body = Body::default();

        while let Some(token) = self.peek() {
            if stop(token) {
                break;
            }
            self.pos += 1;

            match &token.kind {
                TokenKind::CodeOpen => {
                    let block = self.parse_block(token)?;
                    body.push(Node::TemplateBlock(block));
                }
                // A close with nothing open
                TokenKind::CodeClose => {}
                TokenKind::Keyword(Keyword::If) => {
                    let conditional = self.parse_conditional()?;
                    body.push(Node::ConditionalStatement(conditional));
                }
                // THEN / ELSE that ended the previous clause
                TokenKind::Keyword(_) => {}
                TokenKind::Comparator(operator) => {
                    let left = body.take_pending();
                    let expr = self.parse_comparison(*operator, token, left)?;
                    body.push(Node::BooleanExpression(expr));
                }
                TokenKind::LiteralText(text) | TokenKind::String(text) => {
                    body.push(Node::StringLiteral(text.clone()));
                }
                TokenKind::Number { value, .. } => body.push(Node::IntegerLiteral(*value)),
                TokenKind::Identifier(name) => body.push(Node::NamedReference(name.clone())),
                TokenKind::Unknown(ch) => {
                    return Err(TimeError::malformed(
                        format!("Unexpected character '{}' in code", ch),
                        token.end - ch.len_utf8(),
                        token.end,
                    ));
                }
            }
        }

        Ok(body.finish())
    }

    /// Body of a `{...}` block. The closing brace is consumed here; a block
    /// still open at the end of input is closed implicitly.
    fn parse_block(&mut self, open: &Token) -> Result<Vec<Node>, TimeError> {
        trace!(offset = open.start, "code block");
        let body = self.parse_body(Token::is_code_close)?;
        if self.peek().is_some_and(Token::is_code_close) {
            self.pos += 1;
        }
        Ok(body)
    }

    fn parse_conditional(&mut self) -> Result<ConditionalStatement, TimeError> {
        let test = self.parse_body(|t| t.is_code_close() || t.is_keyword(Keyword::Then))?;
        let consequent = self.parse_body(|t| t.is_code_close() || t.is_keyword(Keyword::Else))?;
        let alternate = self.parse_body(Token::is_code_close)?;

        Ok(ConditionalStatement {
            test: Predicate { body: test },
            consequent: ThenClause { body: consequent },
            alternate: ElseClause { body: alternate },
        })
    }

    fn parse_comparison(
        &mut self,
        operator: Comparator,
        token: &Token,
        left: Option<Node>,
    ) -> Result<BooleanExpression, TimeError> {
        let left = match left {
            Some(node) if node.is_operand() => node,
            Some(node) => {
                return Err(TimeError::malformed(
                    format!(
                        "Invalid left side for '{}': a {} cannot be compared",
                        operator,
                        node.kind_name()
                    ),
                    token.start,
                    token.end,
                ));
            }
            None => {
                return Err(TimeError::malformed(
                    format!("Missing left side for '{}'", operator),
                    token.start,
                    token.end,
                ));
            }
        };

        let right = match self.peek() {
            Some(next) => {
                let node = match &next.kind {
                    TokenKind::Number { value, .. } => Node::IntegerLiteral(*value),
                    TokenKind::String(text) => Node::StringLiteral(text.clone()),
                    TokenKind::Identifier(name) => Node::NamedReference(name.clone()),
                    _ => {
                        return Err(TimeError::malformed(
                            format!(
                                "Expected a number, string or name after '{}'",
                                operator
                            ),
                            next.start,
                            next.end,
                        ));
                    }
                };
                self.pos += 1;
                node
            }
            None => {
                return Err(TimeError::malformed(
                    format!("Unexpected end of template after '{}'", operator),
                    token.start,
                    token.end,
                ));
            }
        };

        Ok(BooleanExpression {
            left: Box::new(left),
            right: Box::new(right),
            operator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn string(s: &str) -> Node {
        Node::StringLiteral(s.to_string())
    }

    fn reference(name: &str) -> Node {
        Node::NamedReference(name.to_string())
    }

    fn compare(left: Node, operator: Comparator, right: Node) -> Node {
        Node::BooleanExpression(BooleanExpression {
            left: Box::new(left),
            right: Box::new(right),
            operator,
        })
    }

    #[test]
    fn empty_template() {
        assert_eq!(parse("").unwrap(), Template::default());
        assert_eq!(parse(Vec::<Token>::new()).unwrap(), Template::default());
    }

    #[test]
    fn literal_only() {
        assert_eq!(parse("2 hours").unwrap().body, vec![string("2 hours")]);
    }

    #[test]
    fn conditional_in_block() {
        let template = parse("ab{IF something > .2 THEN 'a' ELSE b} HA!").unwrap();
        assert_eq!(
            template.body,
            vec![
                string("ab"),
                Node::TemplateBlock(vec![Node::ConditionalStatement(ConditionalStatement {
                    test: Predicate {
                        body: vec![compare(
                            reference("something"),
                            Comparator::Gt,
                            Node::IntegerLiteral(0.2),
                        )],
                    },
                    consequent: ThenClause {
                        body: vec![string("a")],
                    },
                    alternate: ElseClause {
                        body: vec![reference("b")],
                    },
                })]),
                string(" HA!"),
            ]
        );
    }

    #[test]
    fn accepts_tokens() {
        let tokens = tokenize("{hrs}h");
        let from_tokens = parse(tokens.as_slice()).unwrap();
        assert_eq!(from_tokens, parse("{hrs}h").unwrap());
        assert_eq!(
            from_tokens.body,
            vec![Node::TemplateBlock(vec![reference("hrs")]), string("h")]
        );
    }

    #[test]
    fn conditional_without_else() {
        let template = parse("{IF n = 1 THEN 'x'}").unwrap();
        let Node::TemplateBlock(block) = &template.body[0] else {
            panic!("expected a block, got {:?}", template.body[0]);
        };
        let Node::ConditionalStatement(cond) = &block[0] else {
            panic!("expected a conditional, got {:?}", block[0]);
        };
        assert_eq!(cond.consequent.body, vec![string("x")]);
        assert!(cond.alternate.body.is_empty());
    }

    #[test]
    fn predicate_keeps_every_condition() {
        let template = parse("{IF a = 1 b > 2 THEN 'x' ELSE 'y'}").unwrap();
        let Node::TemplateBlock(block) = &template.body[0] else {
            panic!("expected a block");
        };
        let Node::ConditionalStatement(cond) = &block[0] else {
            panic!("expected a conditional");
        };
        assert_eq!(
            cond.test.body,
            vec![
                compare(reference("a"), Comparator::Eq, Node::IntegerLiteral(1.0)),
                compare(reference("b"), Comparator::Gt, Node::IntegerLiteral(2.0)),
            ]
        );
    }

    #[test]
    fn chained_comparison_absorbs_previous_expression() {
        let template = parse("{a < 2 = 'x'}").unwrap();
        assert_eq!(
            template.body,
            vec![Node::TemplateBlock(vec![compare(
                compare(reference("a"), Comparator::Lt, Node::IntegerLiteral(2.0)),
                Comparator::Eq,
                string("x"),
            )])]
        );
    }

    #[test]
    fn nested_blocks_close_in_order() {
        let template = parse("{a {b} c} d").unwrap();
        assert_eq!(
            template.body,
            vec![
                Node::TemplateBlock(vec![
                    reference("a"),
                    Node::TemplateBlock(vec![reference("b")]),
                    reference("c"),
                ]),
                string(" d"),
            ]
        );
    }

    #[test]
    fn unterminated_block_is_lenient() {
        assert_eq!(
            parse("x{a").unwrap().body,
            vec![string("x"), Node::TemplateBlock(vec![reference("a")])]
        );
    }

    #[test]
    fn comparator_without_left_side() {
        let err = parse("{> 2}").unwrap_err();
        assert_eq!(err.code(), "template-syntax-error");
        assert_eq!(err.span(), Some((1, 2)));
    }

    #[test]
    fn comparator_with_block_on_left() {
        let err = parse("{{a} = 2}").unwrap_err();
        assert!(err.to_string().contains("code block"), "{}", err);
    }

    #[test]
    fn comparator_without_right_side() {
        let err = parse("{a =").unwrap_err();
        assert!(err.to_string().contains("Unexpected end"), "{}", err);

        let err = parse("{a = }").unwrap_err();
        assert!(err.to_string().contains("Expected a number"), "{}", err);
    }

    #[test]
    fn unknown_character_is_rejected() {
        let err = parse("ok {a + b}").unwrap_err();
        assert_eq!(err.span(), Some((6, 7)));
    }
}
