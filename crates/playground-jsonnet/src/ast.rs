//! Syntax tree
//!
//! Sugar is removed by the parser: method fields and `local f(x) = ...`
//! become plain function expressions, `a { ... }` becomes `a + { ... }`.

use std::rc::Rc;

pub type P<T> = Rc<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

/// Field visibility: `:`, `::` and `:::`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Inherit,
    Hidden,
    Visible,
}

#[derive(Debug)]
pub struct Param {
    pub name: Rc<str>,
    pub default: Option<P<Expr>>,
}

#[derive(Debug)]
pub struct Bind {
    pub name: Rc<str>,
    pub body: P<Expr>,
}

#[derive(Debug, Default)]
pub struct Args {
    pub positional: Vec<P<Expr>>,
    pub named: Vec<(Rc<str>, P<Expr>)>,
}

#[derive(Debug)]
pub enum FieldName {
    Fixed(Rc<str>),
    Computed(P<Expr>),
}

#[derive(Debug)]
pub struct Field {
    pub name: FieldName,
    pub plus: bool,
    pub visibility: Visibility,
    pub body: P<Expr>,
}

#[derive(Debug)]
pub struct ObjectAssert {
    pub cond: P<Expr>,
    pub message: Option<P<Expr>>,
}

#[derive(Debug)]
pub enum CompSpec {
    For { var: Rc<str>, iter: P<Expr> },
    If(P<Expr>),
}

#[derive(Debug)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    SelfRef,
    Dollar,
    Var(Rc<str>),
    Array(Vec<P<Expr>>),
    ArrayComp {
        body: P<Expr>,
        specs: Vec<CompSpec>,
    },
    Object {
        locals: Rc<Vec<Bind>>,
        fields: Vec<Field>,
        asserts: Rc<Vec<ObjectAssert>>,
    },
    ObjectComp {
        locals: Rc<Vec<Bind>>,
        key: P<Expr>,
        plus: bool,
        value: P<Expr>,
        specs: Vec<CompSpec>,
    },
    Index {
        target: P<Expr>,
        index: P<Expr>,
    },
    /// `super.f` / `super[e]`
    SuperIndex(P<Expr>),
    /// `e in super`
    InSuper(P<Expr>),
    Slice {
        target: P<Expr>,
        start: Option<P<Expr>>,
        end: Option<P<Expr>>,
        step: Option<P<Expr>>,
    },
    Apply {
        target: P<Expr>,
        args: Args,
    },
    Unary {
        op: UnaryOp,
        expr: P<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: P<Expr>,
        rhs: P<Expr>,
    },
    Local {
        binds: Rc<Vec<Bind>>,
        body: P<Expr>,
    },
    If {
        cond: P<Expr>,
        then_branch: P<Expr>,
        else_branch: Option<P<Expr>>,
    },
    Function {
        params: Rc<Vec<Param>>,
        body: P<Expr>,
    },
    Error(P<Expr>),
    Assert {
        cond: P<Expr>,
        message: Option<P<Expr>>,
        rest: P<Expr>,
    },
}
