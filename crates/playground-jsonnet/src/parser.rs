//! Recursive-descent parser with precedence climbing for binary operators

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::{
    Args, BinaryOp, Bind, CompSpec, Expr, Field, FieldName, ObjectAssert, Param, UnaryOp,
    Visibility, P,
};
use crate::error::{JsonnetError, Result};
use crate::lexer::{Spanned, Token};

const KEYWORDS: &[&str] = &[
    "assert",
    "else",
    "error",
    "false",
    "for",
    "function",
    "if",
    "import",
    "importstr",
    "importbin",
    "in",
    "local",
    "null",
    "tailstrict",
    "then",
    "self",
    "super",
    "true",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Parse a complete program
pub fn parse(tokens: Vec<Spanned>, max_depth: usize) -> Result<P<Expr>> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => {
            let found = other.describe();
            Err(parser.error(format!("unexpected {} after expression", found)))
        }
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

fn binary_precedence(token: &Token) -> Option<(u8, BinaryOp)> {
    let entry = match token {
        Token::Star => (10, BinaryOp::Mul),
        Token::Slash => (10, BinaryOp::Div),
        Token::Percent => (10, BinaryOp::Mod),
        Token::Plus => (9, BinaryOp::Add),
        Token::Minus => (9, BinaryOp::Sub),
        Token::Shl => (8, BinaryOp::Shl),
        Token::Shr => (8, BinaryOp::Shr),
        Token::Lt => (7, BinaryOp::Lt),
        Token::Le => (7, BinaryOp::Le),
        Token::Gt => (7, BinaryOp::Gt),
        Token::Ge => (7, BinaryOp::Ge),
        Token::Ident(name) if name == "in" => (7, BinaryOp::In),
        Token::EqEq => (6, BinaryOp::Eq),
        Token::Ne => (6, BinaryOp::Ne),
        Token::Amp => (5, BinaryOp::BitAnd),
        Token::Caret => (4, BinaryOp::BitXor),
        Token::Pipe => (3, BinaryOp::BitOr),
        Token::AndAnd => (2, BinaryOp::And),
        Token::OrOr => (1, BinaryOp::Or),
        _ => return None,
    };
    Some(entry)
}

impl Parser {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> JsonnetError {
        let spanned = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        JsonnetError::Syntax {
            line: spanned.line,
            column: spanned.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, token: Token, context: &str) -> Result<()> {
        if *self.peek() == token {
            self.bump();
            Ok(())
        } else {
            let found = self.peek().describe();
            Err(self.error(format!(
                "expected {} {}, got {}",
                token.describe(),
                context,
                found
            )))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name == keyword)
    }

    fn expect_keyword(&mut self, keyword: &str, context: &str) -> Result<()> {
        if self.at_keyword(keyword) {
            self.bump();
            Ok(())
        } else {
            let found = self.peek().describe();
            Err(self.error(format!("expected '{}' {}, got {}", keyword, context, found)))
        }
    }

    fn identifier(&mut self, context: &str) -> Result<Rc<str>> {
        match self.peek().clone() {
            Token::Ident(name) if !is_keyword(&name) => {
                self.bump();
                Ok(Rc::from(name))
            }
            other => Err(self.error(format!(
                "expected identifier {}, got {}",
                context,
                other.describe()
            ))),
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error(format!(
                "expression nested deeper than {} levels",
                self.max_depth
            )));
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> Result<P<Expr>> {
        self.nested(|p| p.binary(0))
    }

    fn binary(&mut self, min_precedence: u8) -> Result<P<Expr>> {
        let mut lhs = self.unary()?;
        while let Some((precedence, op)) = binary_precedence(self.peek()) {
            if precedence < min_precedence {
                break;
            }
            self.bump();
            if op == BinaryOp::In && self.at_keyword("super") {
                self.bump();
                lhs = Rc::new(Expr::InSuper(lhs));
                continue;
            }
            let rhs = self.nested(|p| p.binary(precedence + 1))?;
            lhs = Rc::new(Expr::Binary { op, lhs, rhs });
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<P<Expr>> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            Token::Bang => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            _ => return self.postfix(),
        };
        self.bump();
        let expr = self.nested(|p| p.unary())?;
        Ok(Rc::new(Expr::Unary { op, expr }))
    }

    fn postfix(&mut self) -> Result<P<Expr>> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.bump();
                    let name = self.field_identifier()?;
                    expr = Rc::new(Expr::Index {
                        target: expr,
                        index: Rc::new(Expr::Str(name)),
                    });
                }
                Token::LBracket => {
                    self.bump();
                    expr = self.index_or_slice(expr)?;
                }
                Token::LParen => {
                    self.bump();
                    let args = self.args()?;
                    if self.at_keyword("tailstrict") {
                        self.bump();
                    }
                    expr = Rc::new(Expr::Apply { target: expr, args });
                }
                Token::LBrace => {
                    self.bump();
                    let object = self.object()?;
                    expr = Rc::new(Expr::Binary {
                        op: BinaryOp::Add,
                        lhs: expr,
                        rhs: object,
                    });
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Identifiers after `.` may be keywords-free names only
    fn field_identifier(&mut self) -> Result<Rc<str>> {
        self.identifier("after '.'")
    }

    fn index_or_slice(&mut self, target: P<Expr>) -> Result<P<Expr>> {
        let start = if *self.peek() == Token::Colon {
            None
        } else {
            Some(self.expr()?)
        };
        if *self.peek() != Token::Colon {
            self.expect(Token::RBracket, "to close index")?;
            return match start {
                Some(index) => Ok(Rc::new(Expr::Index { target, index })),
                None => Err(self.error("empty index expression")),
            };
        }
        self.bump();
        let end = if matches!(self.peek(), Token::Colon | Token::RBracket) {
            None
        } else {
            Some(self.expr()?)
        };
        let step = if *self.peek() == Token::Colon {
            self.bump();
            if *self.peek() == Token::RBracket {
                None
            } else {
                Some(self.expr()?)
            }
        } else {
            None
        };
        self.expect(Token::RBracket, "to close slice")?;
        Ok(Rc::new(Expr::Slice {
            target,
            start,
            end,
            step,
        }))
    }

    fn args(&mut self) -> Result<Args> {
        let mut args = Args::default();
        while *self.peek() != Token::RParen {
            let named = matches!(self.peek(), Token::Ident(name) if !is_keyword(name))
                && *self.peek_at(1) == Token::Assign;
            if named {
                let name = self.identifier("as argument name")?;
                self.bump();
                let value = self.expr()?;
                if args.named.iter().any(|(n, _)| *n == name) {
                    return Err(self.error(format!("argument '{}' given twice", name)));
                }
                args.named.push((name, value));
            } else {
                if !args.named.is_empty() {
                    return Err(self.error("positional argument after a named argument"));
                }
                args.positional.push(self.expr()?);
            }
            if *self.peek() == Token::Comma {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(Token::RParen, "to close argument list")?;
        Ok(args)
    }

    fn params(&mut self) -> Result<Rc<Vec<Param>>> {
        let mut params: Vec<Param> = Vec::new();
        while *self.peek() != Token::RParen {
            let name = self.identifier("as parameter name")?;
            if params.iter().any(|p| p.name == name) {
                return Err(self.error(format!("duplicate parameter '{}'", name)));
            }
            let default = if *self.peek() == Token::Assign {
                self.bump();
                Some(self.expr()?)
            } else {
                None
            };
            params.push(Param { name, default });
            if *self.peek() == Token::Comma {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(Token::RParen, "to close parameter list")?;
        Ok(Rc::new(params))
    }

    fn bind(&mut self) -> Result<Bind> {
        let name = self.identifier("in local binding")?;
        let function_params = if *self.peek() == Token::LParen {
            self.bump();
            Some(self.params()?)
        } else {
            None
        };
        self.expect(Token::Assign, "in local binding")?;
        let body = self.expr()?;
        let body = match function_params {
            Some(params) => Rc::new(Expr::Function { params, body }),
            None => body,
        };
        Ok(Bind { name, body })
    }

    fn primary(&mut self) -> Result<P<Expr>> {
        let token = self.peek().clone();
        let expr = match token {
            Token::Number(n) => {
                self.bump();
                Expr::Number(n)
            }
            Token::Str(s) => {
                self.bump();
                Expr::Str(Rc::from(s))
            }
            Token::Dollar => {
                self.bump();
                Expr::Dollar
            }
            Token::LParen => {
                self.bump();
                let inner = self.expr()?;
                self.expect(Token::RParen, "to close parenthesis")?;
                return Ok(inner);
            }
            Token::LBracket => {
                self.bump();
                return self.array();
            }
            Token::LBrace => {
                self.bump();
                return self.object();
            }
            Token::Ident(name) => return self.keyword_or_var(name),
            other => return Err(self.error(format!("unexpected {}", other.describe()))),
        };
        Ok(Rc::new(expr))
    }

    fn keyword_or_var(&mut self, name: String) -> Result<P<Expr>> {
        self.bump();
        let expr = match name.as_str() {
            "null" => Expr::Null,
            "true" => Expr::Bool(true),
            "false" => Expr::Bool(false),
            "self" => Expr::SelfRef,
            "super" => match self.bump() {
                Token::Dot => Expr::SuperIndex(Rc::new(Expr::Str(self.field_identifier()?))),
                Token::LBracket => {
                    let index = self.expr()?;
                    self.expect(Token::RBracket, "to close super index")?;
                    Expr::SuperIndex(index)
                }
                _ => return Err(self.error("expected '.' or '[' after super")),
            },
            "local" => {
                let mut binds: Vec<Bind> = Vec::new();
                loop {
                    let bind = self.bind()?;
                    if binds.iter().any(|b| b.name == bind.name) {
                        return Err(self.error(format!("duplicate local var '{}'", bind.name)));
                    }
                    binds.push(bind);
                    if *self.peek() == Token::Comma {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(Token::Semicolon, "after local bindings")?;
                let body = self.expr()?;
                Expr::Local {
                    binds: Rc::new(binds),
                    body,
                }
            }
            "if" => {
                let cond = self.expr()?;
                self.expect_keyword("then", "after if condition")?;
                let then_branch = self.expr()?;
                let else_branch = if self.at_keyword("else") {
                    self.bump();
                    Some(self.expr()?)
                } else {
                    None
                };
                Expr::If {
                    cond,
                    then_branch,
                    else_branch,
                }
            }
            "function" => {
                self.expect(Token::LParen, "after function")?;
                let params = self.params()?;
                let body = self.expr()?;
                Expr::Function { params, body }
            }
            "assert" => {
                let cond = self.expr()?;
                let message = if *self.peek() == Token::Colon {
                    self.bump();
                    Some(self.expr()?)
                } else {
                    None
                };
                self.expect(Token::Semicolon, "after assert")?;
                let rest = self.expr()?;
                Expr::Assert {
                    cond,
                    message,
                    rest,
                }
            }
            "error" => Expr::Error(self.expr()?),
            "import" | "importstr" | "importbin" => {
                return Err(self.error(format!("{} is not supported in the playground", name)))
            }
            _ if is_keyword(&name) => {
                return Err(self.error(format!("unexpected keyword '{}'", name)))
            }
            _ => Expr::Var(Rc::from(name)),
        };
        Ok(Rc::new(expr))
    }

    /// Called after the opening `[`
    fn array(&mut self) -> Result<P<Expr>> {
        if *self.peek() == Token::RBracket {
            self.bump();
            return Ok(Rc::new(Expr::Array(Vec::new())));
        }
        let first = self.expr()?;
        if *self.peek() == Token::Comma && self.peek_at(1) == &Token::Ident("for".into()) {
            self.bump();
        }
        if self.at_keyword("for") {
            let specs = self.comp_specs()?;
            self.expect(Token::RBracket, "to close array comprehension")?;
            return Ok(Rc::new(Expr::ArrayComp { body: first, specs }));
        }
        let mut items = vec![first];
        while *self.peek() == Token::Comma {
            self.bump();
            if *self.peek() == Token::RBracket {
                break;
            }
            items.push(self.expr()?);
        }
        self.expect(Token::RBracket, "to close array")?;
        Ok(Rc::new(Expr::Array(items)))
    }

    fn comp_specs(&mut self) -> Result<Vec<CompSpec>> {
        let mut specs = Vec::new();
        loop {
            if self.at_keyword("for") {
                self.bump();
                let var = self.identifier("after for")?;
                self.expect_keyword("in", "in for specification")?;
                let iter = self.expr()?;
                specs.push(CompSpec::For { var, iter });
            } else if self.at_keyword("if") {
                self.bump();
                specs.push(CompSpec::If(self.expr()?));
            } else {
                return Ok(specs);
            }
        }
    }

    /// Called after the opening `{`
    fn object(&mut self) -> Result<P<Expr>> {
        let mut locals = Vec::new();
        let mut fields: Vec<Field> = Vec::new();
        let mut asserts = Vec::new();
        let mut seen = HashSet::new();

        loop {
            if *self.peek() == Token::RBrace {
                self.bump();
                break;
            }
            if self.at_keyword("for") {
                return self.object_comprehension(locals, fields, asserts);
            }
            if self.at_keyword("local") {
                self.bump();
                let bind = self.bind()?;
                if locals.iter().any(|b: &Bind| b.name == bind.name) {
                    return Err(self.error(format!("duplicate local var '{}'", bind.name)));
                }
                locals.push(bind);
            } else if self.at_keyword("assert") {
                self.bump();
                let cond = self.expr()?;
                let message = if *self.peek() == Token::Colon {
                    self.bump();
                    Some(self.expr()?)
                } else {
                    None
                };
                asserts.push(ObjectAssert { cond, message });
            } else {
                let field = self.field()?;
                if let FieldName::Fixed(name) = &field.name {
                    if !seen.insert(name.clone()) {
                        return Err(self.error(format!("duplicate field '{}'", name)));
                    }
                }
                fields.push(field);
            }

            match self.peek() {
                Token::Comma => {
                    self.bump();
                }
                Token::RBrace => {}
                Token::Ident(name) if name == "for" => {}
                other => {
                    let found = other.describe();
                    return Err(self.error(format!("expected ',' or '}}' in object, got {}", found)));
                }
            }
        }

        Ok(Rc::new(Expr::Object {
            locals: Rc::new(locals),
            fields,
            asserts: Rc::new(asserts),
        }))
    }

    fn field(&mut self) -> Result<Field> {
        let name = match self.peek().clone() {
            Token::Ident(name) if !is_keyword(&name) => {
                self.bump();
                FieldName::Fixed(Rc::from(name))
            }
            Token::Str(s) => {
                self.bump();
                FieldName::Fixed(Rc::from(s))
            }
            Token::LBracket => {
                self.bump();
                let expr = self.expr()?;
                self.expect(Token::RBracket, "to close computed field name")?;
                FieldName::Computed(expr)
            }
            other => {
                return Err(self.error(format!("expected field name, got {}", other.describe())))
            }
        };

        let method_params = if *self.peek() == Token::LParen {
            self.bump();
            Some(self.params()?)
        } else {
            None
        };

        let plus = if *self.peek() == Token::Plus {
            self.bump();
            true
        } else {
            false
        };

        let mut colons = 0;
        while *self.peek() == Token::Colon && colons < 3 {
            self.bump();
            colons += 1;
        }
        let visibility = match colons {
            1 => Visibility::Inherit,
            2 => Visibility::Hidden,
            3 => Visibility::Visible,
            _ => {
                let found = self.peek().describe();
                return Err(self.error(format!("expected ':' after field name, got {}", found)));
            }
        };
        if plus && method_params.is_some() {
            return Err(self.error("method fields cannot use '+:'"));
        }

        let body = self.expr()?;
        let body = match method_params {
            Some(params) => Rc::new(Expr::Function { params, body }),
            None => body,
        };
        Ok(Field {
            name,
            plus,
            visibility,
            body,
        })
    }

    fn object_comprehension(
        &mut self,
        mut locals: Vec<Bind>,
        mut fields: Vec<Field>,
        asserts: Vec<ObjectAssert>,
    ) -> Result<P<Expr>> {
        if !asserts.is_empty() {
            return Err(self.error("object comprehension cannot contain asserts"));
        }
        if fields.len() != 1 {
            return Err(self.error("object comprehension must have exactly one field"));
        }
        let field = fields.remove(0);
        let key = match field.name {
            FieldName::Computed(expr) => expr,
            FieldName::Fixed(_) => {
                return Err(self.error("object comprehension field name must be computed ([e])"))
            }
        };
        if field.visibility != Visibility::Inherit {
            return Err(self.error("object comprehension field must use ':'"));
        }
        let specs = self.comp_specs()?;
        while self.at_keyword("local") {
            self.bump();
            locals.push(self.bind()?);
            if *self.peek() == Token::Comma {
                self.bump();
            }
        }
        self.expect(Token::RBrace, "to close object comprehension")?;
        Ok(Rc::new(Expr::ObjectComp {
            locals: Rc::new(locals),
            key,
            plus: field.plus,
            value: field.body,
            specs,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(source: &str) -> Result<P<Expr>> {
        parse(tokenize(source)?, 1_000)
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let expr = parse_str("1 + 2 * 3").unwrap();
        match &*expr {
            Expr::Binary {
                op: BinaryOp::Add,
                rhs,
                ..
            } => assert!(matches!(&**rhs, Expr::Binary { op: BinaryOp::Mul, .. })),
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = parse_str("5 - 2 - 1").unwrap();
        match &*expr {
            Expr::Binary {
                op: BinaryOp::Sub,
                lhs,
                ..
            } => assert!(matches!(&**lhs, Expr::Binary { op: BinaryOp::Sub, .. })),
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_local_function_sugar() {
        let expr = parse_str("local f(x) = x; f(1)").unwrap();
        match &*expr {
            Expr::Local { binds, .. } => {
                assert!(matches!(&*binds[0].body, Expr::Function { .. }))
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_object_extend_sugar() {
        let expr = parse_str("{a: 1} {b: 2}").unwrap();
        assert!(matches!(&*expr, Expr::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn test_field_visibility() {
        let expr = parse_str("{a: 1, b:: 2, c::: 3, d+: 4}").unwrap();
        match &*expr {
            Expr::Object { fields, .. } => {
                let vis: Vec<_> = fields.iter().map(|f| f.visibility).collect();
                assert_eq!(
                    vis,
                    vec![
                        Visibility::Inherit,
                        Visibility::Hidden,
                        Visibility::Visible,
                        Visibility::Inherit
                    ]
                );
                assert!(fields[3].plus);
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_comprehensions() {
        assert!(matches!(
            &*parse_str("[x for x in [1, 2] if x > 1]").unwrap(),
            Expr::ArrayComp { .. }
        ));
        assert!(matches!(
            &*parse_str("{[k]: 1 for k in ['a']}").unwrap(),
            Expr::ObjectComp { .. }
        ));
    }

    #[test]
    fn test_slice() {
        assert!(matches!(
            &*parse_str("[1, 2, 3][1:]").unwrap(),
            Expr::Slice {
                start: Some(_),
                end: None,
                ..
            }
        ));
        assert!(matches!(
            &*parse_str("'abc'[::2]").unwrap(),
            Expr::Slice { step: Some(_), .. }
        ));
    }

    #[test]
    fn test_unclosed_brace_is_error() {
        let err = parse_str("{").unwrap_err();
        assert!(matches!(err, JsonnetError::Syntax { .. }));
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        assert!(parse_str("{a: 1, a: 2}").is_err());
    }

    #[test]
    fn test_import_rejected() {
        let err = parse_str("import 'foo.libsonnet'").unwrap_err();
        assert!(err.message().contains("not supported"));
    }

    #[test]
    fn test_depth_limit() {
        let source = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        let err = parse(tokenize(&source).unwrap(), 10).unwrap_err();
        assert!(err.message().contains("nested deeper"));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse_str("1 2").is_err());
    }
}
