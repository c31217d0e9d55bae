//! Runtime values, thunks, environments and objects

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};

use crate::ast::{Bind, Expr, ObjectAssert, Param, Visibility, P};
use crate::stdlib::Builtin;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<Vec<Thunk>>),
    Object(ObjectValue),
    Function(Rc<Function>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items.into_iter().map(Thunk::ready).collect()))
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array(items) => write!(f, "<array of {}>", items.len()),
            Value::Object(_) => write!(f, "<object>"),
            Value::Function(_) => write!(f, "<function>"),
        }
    }
}

pub enum Function {
    Closure {
        params: Rc<Vec<Param>>,
        body: P<Expr>,
        env: Env,
    },
    Builtin(Builtin),
}

impl Function {
    pub fn arity(&self) -> usize {
        match self {
            Function::Closure { params, .. } => params.len(),
            Function::Builtin(b) => b.params.len(),
        }
    }
}

pub enum ThunkState {
    Pending(P<Expr>, Env),
    Forcing,
    Ready(Value),
    /// Released when the interpreter is dropped
    Cleared,
}

/// A lazily evaluated, memoized expression
#[derive(Clone)]
pub struct Thunk(pub(crate) Rc<RefCell<ThunkState>>);

impl Thunk {
    pub fn ready(value: Value) -> Self {
        Thunk(Rc::new(RefCell::new(ThunkState::Ready(value))))
    }

    pub(crate) fn pending(expr: P<Expr>, env: Env) -> Self {
        Thunk(Rc::new(RefCell::new(ThunkState::Pending(expr, env))))
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<ThunkState>> {
        Rc::downgrade(&self.0)
    }
}

#[derive(Clone)]
pub struct SelfCtx {
    pub obj: ObjectValue,
    /// Index of the layer the field being evaluated came from
    pub layer: usize,
}

#[derive(Default)]
pub struct Frame {
    pub vars: HashMap<Rc<str>, Thunk>,
    pub self_ctx: Option<SelfCtx>,
    pub dollar: Option<ObjectValue>,
}

pub struct EnvInner {
    parent: Option<Env>,
    pub(crate) frame: RefCell<Frame>,
}

/// Lexical environment: a chain of frames
#[derive(Clone)]
pub struct Env(pub(crate) Rc<EnvInner>);

impl Env {
    pub(crate) fn new(parent: Option<Env>, frame: Frame) -> Self {
        Env(Rc::new(EnvInner {
            parent,
            frame: RefCell::new(frame),
        }))
    }

    pub fn bind(&self, name: Rc<str>, thunk: Thunk) {
        self.0.frame.borrow_mut().vars.insert(name, thunk);
    }

    pub fn lookup(&self, name: &str) -> Option<Thunk> {
        let mut env = Some(self);
        while let Some(current) = env {
            if let Some(thunk) = current.0.frame.borrow().vars.get(name) {
                return Some(thunk.clone());
            }
            env = current.0.parent.as_ref();
        }
        None
    }

    pub fn self_ctx(&self) -> Option<SelfCtx> {
        let mut env = Some(self);
        while let Some(current) = env {
            if let Some(ctx) = &current.0.frame.borrow().self_ctx {
                return Some(ctx.clone());
            }
            env = current.0.parent.as_ref();
        }
        None
    }

    pub fn dollar(&self) -> Option<ObjectValue> {
        let mut env = Some(self);
        while let Some(current) = env {
            if let Some(obj) = &current.0.frame.borrow().dollar {
                return Some(obj.clone());
            }
            env = current.0.parent.as_ref();
        }
        None
    }

    pub(crate) fn downgrade(&self) -> Weak<EnvInner> {
        Rc::downgrade(&self.0)
    }
}

pub enum FieldBody {
    Expr(P<Expr>),
    Value(Value),
}

pub struct LayerField {
    pub visibility: Visibility,
    pub plus: bool,
    pub body: FieldBody,
    /// Overrides the layer environment (object comprehension fields)
    pub env: Option<Env>,
}

/// One object literal's worth of fields
pub struct Layer {
    pub fields: HashMap<Rc<str>, LayerField>,
    pub locals: Rc<Vec<Bind>>,
    pub asserts: Rc<Vec<ObjectAssert>>,
    pub env: Env,
    /// Whether `$` refers to the object this layer ends up in
    pub binds_dollar: bool,
}

pub struct ObjectInner {
    pub layers: Vec<Rc<Layer>>,
    pub(crate) cache: RefCell<HashMap<Rc<str>, Value>>,
    pub(crate) asserts_checked: Cell<bool>,
}

/// An object is a stack of layers; the last one is the top
#[derive(Clone)]
pub struct ObjectValue(pub(crate) Rc<ObjectInner>);

impl ObjectValue {
    pub(crate) fn new(layers: Vec<Rc<Layer>>) -> Self {
        ObjectValue(Rc::new(ObjectInner {
            layers,
            cache: RefCell::new(HashMap::new()),
            asserts_checked: Cell::new(false),
        }))
    }

    pub fn layers(&self) -> &[Rc<Layer>] {
        &self.0.layers
    }

    pub fn ptr_eq(&self, other: &ObjectValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// `a + b`: layers of `b` stacked on top of `a`
    pub(crate) fn extend(&self, other: &ObjectValue) -> Vec<Rc<Layer>> {
        self.0
            .layers
            .iter()
            .chain(other.0.layers.iter())
            .cloned()
            .collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.0.layers.iter().any(|l| l.fields.contains_key(name))
    }

    /// Whether a field is hidden once all layers are combined
    pub fn is_hidden(&self, name: &str) -> bool {
        for layer in self.0.layers.iter().rev() {
            if let Some(field) = layer.fields.get(name) {
                match field.visibility {
                    Visibility::Hidden => return true,
                    Visibility::Visible => return false,
                    Visibility::Inherit => {}
                }
            }
        }
        false
    }

    /// Field names in sorted order
    pub fn field_names(&self, include_hidden: bool) -> Vec<Rc<str>> {
        let names: BTreeSet<Rc<str>> = self
            .0
            .layers
            .iter()
            .flat_map(|l| l.fields.keys().cloned())
            .collect();
        names
            .into_iter()
            .filter(|name| include_hidden || !self.is_hidden(name))
            .collect()
    }

    pub(crate) fn downgrade(&self) -> Weak<ObjectInner> {
        Rc::downgrade(&self.0)
    }
}

/// Weak handles to everything that can take part in a reference cycle
///
/// Environments hold thunks that hold environments, and objects hold
/// environments that point back at the object through `self`. Clearing
/// every registered node when the interpreter goes away breaks those
/// cycles so each evaluation releases its memory.
#[derive(Default)]
pub(crate) struct Heap {
    envs: Vec<Weak<EnvInner>>,
    thunks: Vec<Weak<RefCell<ThunkState>>>,
    objects: Vec<Weak<ObjectInner>>,
    prune_at: usize,
}

const PRUNE_FLOOR: usize = 4_096;

impl Heap {
    pub fn track_env(&mut self, env: &Env) {
        self.envs.push(env.downgrade());
        self.maybe_prune();
    }

    pub fn track_thunk(&mut self, thunk: &Thunk) {
        self.thunks.push(thunk.downgrade());
        self.maybe_prune();
    }

    pub fn track_object(&mut self, obj: &ObjectValue) {
        self.objects.push(obj.downgrade());
        self.maybe_prune();
    }

    fn len(&self) -> usize {
        self.envs.len() + self.thunks.len() + self.objects.len()
    }

    fn maybe_prune(&mut self) {
        if self.len() < self.prune_at.max(PRUNE_FLOOR) {
            return;
        }
        self.envs.retain(|w| w.strong_count() > 0);
        self.thunks.retain(|w| w.strong_count() > 0);
        self.objects.retain(|w| w.strong_count() > 0);
        self.prune_at = self.len() * 2;
    }

    pub fn clear(&mut self) {
        for env in self.envs.drain(..) {
            if let Some(env) = env.upgrade() {
                let frame = std::mem::take(&mut *env.frame.borrow_mut());
                drop(frame);
            }
        }
        for thunk in self.thunks.drain(..) {
            if let Some(thunk) = thunk.upgrade() {
                let state = std::mem::replace(&mut *thunk.borrow_mut(), ThunkState::Cleared);
                drop(state);
            }
        }
        for obj in self.objects.drain(..) {
            if let Some(obj) = obj.upgrade() {
                let cache = std::mem::take(&mut *obj.cache.borrow_mut());
                drop(cache);
            }
        }
    }
}
