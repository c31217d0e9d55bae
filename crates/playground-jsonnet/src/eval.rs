//! Lazy tree-walking interpreter

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use crate::ast::{
    Args, BinaryOp, Bind, CompSpec, Expr, Field, FieldName, ObjectAssert, UnaryOp, Visibility, P,
};
use crate::error::{limit, runtime, JsonnetError, Result};
use crate::format;
use crate::limits::EvalLimits;
use crate::manifest;
use crate::stdlib;
use crate::value::{
    Env, FieldBody, Frame, Function, Heap, Layer, LayerField, ObjectValue, SelfCtx, Thunk,
    ThunkState, Value,
};

const CLOCK_CHECK_INTERVAL: u64 = 4096;

/// One evaluation's worth of interpreter state
///
/// Not shareable between threads; build a fresh one per evaluation.
pub struct Interpreter {
    limits: EvalLimits,
    steps: Cell<u64>,
    next_clock_check: Cell<u64>,
    deadline: Option<Instant>,
    depth: Cell<usize>,
    call_depth: Cell<usize>,
    heap: RefCell<Heap>,
}

pub(crate) struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.heap.get_mut().clear();
    }
}

impl Interpreter {
    pub fn new(limits: EvalLimits) -> Self {
        Self {
            limits,
            steps: Cell::new(0),
            next_clock_check: Cell::new(CLOCK_CHECK_INTERVAL),
            deadline: limits.timeout.map(|t| Instant::now() + t),
            depth: Cell::new(0),
            call_depth: Cell::new(0),
            heap: RefCell::new(Heap::default()),
        }
    }

    pub fn limits(&self) -> &EvalLimits {
        &self.limits
    }

    /// Environment holding only `std`
    pub fn root_env(&self) -> Env {
        let env = self.new_env(None, Frame::default());
        let std = stdlib::std_object(self);
        env.bind(Rc::from("std"), Thunk::ready(Value::Object(std)));
        env
    }

    pub(crate) fn tick(&self) -> Result<()> {
        self.charge(1)
    }

    /// Spend `n` steps at once, for builtins whose work grows with their input
    pub(crate) fn charge(&self, n: u64) -> Result<()> {
        let steps = self
            .steps
            .get()
            .checked_add(n)
            .filter(|steps| *steps <= self.limits.max_steps)
            .ok_or_else(|| limit(format!("evaluation exceeded {} steps", self.limits.max_steps)))?;
        self.steps.set(steps);
        // Reading the clock on every step is measurable
        if steps >= self.next_clock_check.get() {
            self.next_clock_check.set(steps + CLOCK_CHECK_INTERVAL);
            if let (Some(deadline), Some(timeout)) = (self.deadline, self.limits.timeout) {
                if Instant::now() >= deadline {
                    return Err(JsonnetError::Timeout {
                        millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            }
        }
        Ok(())
    }

    /// Refuse to build an array of `len` elements
    pub(crate) fn check_array_len(&self, len: usize) -> Result<()> {
        if len > self.limits.max_array_len {
            return Err(limit(format!(
                "array longer than {} elements",
                self.limits.max_array_len
            )));
        }
        Ok(())
    }

    /// Refuse to build a string of `len` bytes
    pub(crate) fn check_string_len(&self, len: usize) -> Result<()> {
        if len > self.limits.max_string_bytes {
            return Err(limit(format!(
                "string longer than {} bytes",
                self.limits.max_string_bytes
            )));
        }
        Ok(())
    }

    pub(crate) fn enter(&self) -> Result<DepthGuard<'_>> {
        let depth = self.depth.get() + 1;
        if depth > self.limits.max_depth {
            return Err(limit(format!(
                "evaluation nested deeper than {} levels",
                self.limits.max_depth
            )));
        }
        self.depth.set(depth);
        Ok(DepthGuard(&self.depth))
    }

    fn enter_call(&self) -> Result<DepthGuard<'_>> {
        let depth = self.call_depth.get() + 1;
        if depth > self.limits.max_stack {
            return Err(limit(format!(
                "max stack frames exceeded ({})",
                self.limits.max_stack
            )));
        }
        self.call_depth.set(depth);
        Ok(DepthGuard(&self.call_depth))
    }

    pub(crate) fn new_env(&self, parent: Option<&Env>, frame: Frame) -> Env {
        let env = Env::new(parent.cloned(), frame);
        self.heap.borrow_mut().track_env(&env);
        env
    }

    fn thunk(&self, expr: &P<Expr>, env: &Env) -> Result<Thunk> {
        let literal = match &**expr {
            Expr::Null => Some(Value::Null),
            Expr::Bool(b) => Some(Value::Bool(*b)),
            Expr::Number(n) => Some(Value::Number(*n)),
            Expr::Str(s) => Some(Value::Str(s.clone())),
            _ => None,
        };
        if let Some(value) = literal {
            return Ok(Thunk::ready(value));
        }
        self.tick()?;
        let thunk = Thunk::pending(expr.clone(), env.clone());
        self.heap.borrow_mut().track_thunk(&thunk);
        Ok(thunk)
    }

    pub(crate) fn new_object(&self, layers: Vec<Rc<Layer>>) -> ObjectValue {
        let obj = ObjectValue::new(layers);
        self.heap.borrow_mut().track_object(&obj);
        obj
    }

    /// Object made of already evaluated fields, all visible
    pub(crate) fn object_from_values(&self, fields: Vec<(Rc<str>, Value)>) -> Value {
        let fields = fields
            .into_iter()
            .map(|(name, value)| {
                (
                    name,
                    LayerField {
                        visibility: Visibility::Inherit,
                        plus: false,
                        body: FieldBody::Value(value),
                        env: None,
                    },
                )
            })
            .collect();
        let layer = Layer {
            fields,
            locals: Rc::new(Vec::new()),
            asserts: Rc::new(Vec::new()),
            env: self.new_env(None, Frame::default()),
            binds_dollar: false,
        };
        Value::Object(self.new_object(vec![Rc::new(layer)]))
    }

    pub fn force(&self, thunk: &Thunk) -> Result<Value> {
        if let ThunkState::Ready(value) = &*thunk.0.borrow() {
            return Ok(value.clone());
        }
        let state = std::mem::replace(&mut *thunk.0.borrow_mut(), ThunkState::Forcing);
        match state {
            ThunkState::Pending(expr, env) => match self.eval(&expr, &env) {
                Ok(value) => {
                    *thunk.0.borrow_mut() = ThunkState::Ready(value.clone());
                    Ok(value)
                }
                Err(err) => {
                    *thunk.0.borrow_mut() = ThunkState::Pending(expr, env);
                    Err(err)
                }
            },
            ThunkState::Forcing => Err(runtime("infinite recursion detected")),
            ThunkState::Ready(value) => {
                *thunk.0.borrow_mut() = ThunkState::Ready(value.clone());
                Ok(value)
            }
            ThunkState::Cleared => {
                *thunk.0.borrow_mut() = ThunkState::Cleared;
                Err(runtime("value used after evaluation finished"))
            }
        }
    }

    pub fn eval(&self, expr: &Expr, env: &Env) -> Result<Value> {
        self.tick()?;
        let _guard = self.enter()?;
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::SelfRef => env
                .self_ctx()
                .map(|ctx| Value::Object(ctx.obj))
                .ok_or_else(|| runtime("can't use self outside of an object")),
            Expr::Dollar => env
                .dollar()
                .map(Value::Object)
                .ok_or_else(|| runtime("can't use $ outside of an object")),
            Expr::Var(name) => {
                let thunk = env
                    .lookup(name)
                    .ok_or_else(|| runtime(format!("unknown variable: {}", name)))?;
                self.force(&thunk)
            }
            Expr::Array(items) => {
                let thunks = items
                    .iter()
                    .map(|item| self.thunk(item, env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(Rc::new(thunks)))
            }
            Expr::ArrayComp { body, specs } => {
                let mut out = Vec::new();
                self.for_each_comp(specs, env, &mut |env| {
                    out.push(self.thunk(body, env)?);
                    Ok(())
                })?;
                Ok(Value::Array(Rc::new(out)))
            }
            Expr::Object {
                locals,
                fields,
                asserts,
            } => self.eval_object(locals, fields, asserts, env),
            Expr::ObjectComp {
                locals,
                key,
                plus,
                value,
                specs,
            } => self.eval_object_comp(locals, key, *plus, value, specs, env),
            Expr::Index { target, index } => {
                let target = self.eval(target, env)?;
                let index = self.eval(index, env)?;
                self.index(&target, &index)
            }
            Expr::SuperIndex(index) => {
                let ctx = self.super_ctx(env)?;
                let name = self.eval_field_name(index, env)?;
                self.lookup_field_below(&ctx.obj, &name, ctx.layer)?
                    .ok_or_else(|| runtime(format!("field does not exist in super: {}", name)))
            }
            Expr::InSuper(key) => {
                let ctx = self.super_ctx(env)?;
                let name = self.eval_field_name(key, env)?;
                let found = ctx.obj.layers()[..ctx.layer]
                    .iter()
                    .any(|layer| layer.fields.contains_key(&*name));
                Ok(Value::Bool(found))
            }
            Expr::Slice {
                target,
                start,
                end,
                step,
            } => {
                let target = self.eval(target, env)?;
                let start = self.eval_slice_part(start.as_ref(), env)?;
                let end = self.eval_slice_part(end.as_ref(), env)?;
                let step = self.eval_slice_part(step.as_ref(), env)?;
                self.slice(&target, start, end, step)
            }
            Expr::Apply { target, args } => {
                let func = match self.eval(target, env)? {
                    Value::Function(func) => func,
                    other => {
                        return Err(runtime(format!(
                            "only functions can be called, got {}",
                            other.type_name()
                        )))
                    }
                };
                let (positional, named) = self.arg_thunks(args, env)?;
                self.call(&func, positional, named)
            }
            Expr::Unary { op, expr } => {
                let value = self.eval(expr, env)?;
                self.unary(*op, &value)
            }
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::And => {
                    if self.eval_bool(lhs, env, "&&")? {
                        Ok(Value::Bool(self.eval_bool(rhs, env, "&&")?))
                    } else {
                        Ok(Value::Bool(false))
                    }
                }
                BinaryOp::Or => {
                    if self.eval_bool(lhs, env, "||")? {
                        Ok(Value::Bool(true))
                    } else {
                        Ok(Value::Bool(self.eval_bool(rhs, env, "||")?))
                    }
                }
                _ => {
                    let lhs = self.eval(lhs, env)?;
                    let rhs = self.eval(rhs, env)?;
                    self.binary(*op, &lhs, &rhs)
                }
            },
            Expr::Local { binds, body } => {
                let inner = self.bind_locals(binds, env)?;
                self.eval(body, &inner)
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_bool(cond, env, "if condition")? {
                    self.eval(then_branch, env)
                } else {
                    match else_branch {
                        Some(e) => self.eval(e, env),
                        None => Ok(Value::Null),
                    }
                }
            }
            Expr::Function { params, body } => Ok(Value::Function(Rc::new(Function::Closure {
                params: params.clone(),
                body: body.clone(),
                env: env.clone(),
            }))),
            Expr::Error(inner) => {
                let value = self.eval(inner, env)?;
                Err(runtime(self.error_message(&value)?))
            }
            Expr::Assert {
                cond,
                message,
                rest,
            } => {
                if !self.eval_bool(cond, env, "assert")? {
                    let text = match message {
                        Some(m) => {
                            let value = self.eval(m, env)?;
                            self.error_message(&value)?
                        }
                        None => "assertion failed".to_string(),
                    };
                    return Err(runtime(text));
                }
                self.eval(rest, env)
            }
        }
    }

    fn error_message(&self, value: &Value) -> Result<String> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => manifest::inline(self, other),
        }
    }

    fn eval_bool(&self, expr: &Expr, env: &Env, context: &str) -> Result<bool> {
        match self.eval(expr, env)? {
            Value::Bool(b) => Ok(b),
            other => Err(runtime(format!(
                "{} expects a boolean, got {}",
                context,
                other.type_name()
            ))),
        }
    }

    fn eval_field_name(&self, expr: &Expr, env: &Env) -> Result<Rc<str>> {
        match self.eval(expr, env)? {
            Value::Str(s) => Ok(s),
            other => Err(runtime(format!(
                "field name must be a string, got {}",
                other.type_name()
            ))),
        }
    }

    fn eval_slice_part(&self, expr: Option<&P<Expr>>, env: &Env) -> Result<Option<i64>> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        match self.eval(expr, env)? {
            Value::Null => Ok(None),
            Value::Number(n) if n.fract() == 0.0 => Ok(Some(n as i64)),
            other => Err(runtime(format!(
                "slice index must be an integer or null, got {}",
                other.type_name()
            ))),
        }
    }

    fn super_ctx(&self, env: &Env) -> Result<SelfCtx> {
        env.self_ctx()
            .ok_or_else(|| runtime("can't use super outside of an object"))
    }

    /// New child environment with mutually recursive bindings
    fn bind_locals(&self, binds: &[Bind], env: &Env) -> Result<Env> {
        let inner = self.new_env(Some(env), Frame::default());
        for bind in binds {
            let thunk = self.thunk(&bind.body, &inner)?;
            inner.bind(bind.name.clone(), thunk);
        }
        Ok(inner)
    }

    fn for_each_comp(
        &self,
        specs: &[CompSpec],
        env: &Env,
        f: &mut dyn FnMut(&Env) -> Result<()>,
    ) -> Result<()> {
        match specs.split_first() {
            None => f(env),
            Some((CompSpec::If(cond), rest)) => {
                if self.eval_bool(cond, env, "if condition")? {
                    self.for_each_comp(rest, env, f)
                } else {
                    Ok(())
                }
            }
            Some((CompSpec::For { var, iter }, rest)) => {
                let items = match self.eval(iter, env)? {
                    Value::Array(items) => items,
                    other => {
                        return Err(runtime(format!(
                            "for loop can only iterate over arrays, got {}",
                            other.type_name()
                        )))
                    }
                };
                for item in items.iter() {
                    let inner = self.new_env(Some(env), Frame::default());
                    inner.bind(var.clone(), item.clone());
                    self.for_each_comp(rest, &inner, f)?;
                }
                Ok(())
            }
        }
    }

    fn eval_object(
        &self,
        locals: &Rc<Vec<Bind>>,
        fields: &[Field],
        asserts: &Rc<Vec<ObjectAssert>>,
        env: &Env,
    ) -> Result<Value> {
        let mut map = HashMap::new();
        for field in fields {
            let name = match &field.name {
                FieldName::Fixed(name) => name.clone(),
                FieldName::Computed(expr) => match self.eval(expr, env)? {
                    Value::Str(s) => s,
                    Value::Null => continue,
                    other => {
                        return Err(runtime(format!(
                            "field name must be a string, got {}",
                            other.type_name()
                        )))
                    }
                },
            };
            if map.contains_key(&name) {
                return Err(runtime(format!("duplicate field name: \"{}\"", name)));
            }
            map.insert(
                name,
                LayerField {
                    visibility: field.visibility,
                    plus: field.plus,
                    body: FieldBody::Expr(field.body.clone()),
                    env: None,
                },
            );
        }
        let layer = Layer {
            fields: map,
            locals: locals.clone(),
            asserts: asserts.clone(),
            env: env.clone(),
            binds_dollar: env.dollar().is_none(),
        };
        Ok(Value::Object(self.new_object(vec![Rc::new(layer)])))
    }

    fn eval_object_comp(
        &self,
        locals: &Rc<Vec<Bind>>,
        key: &P<Expr>,
        plus: bool,
        value: &P<Expr>,
        specs: &[CompSpec],
        env: &Env,
    ) -> Result<Value> {
        let mut map = HashMap::new();
        self.for_each_comp(specs, env, &mut |inner| {
            let name = match self.eval(key, inner)? {
                Value::Str(s) => s,
                Value::Null => return Ok(()),
                other => {
                    return Err(runtime(format!(
                        "field name must be a string, got {}",
                        other.type_name()
                    )))
                }
            };
            if map.contains_key(&name) {
                return Err(runtime(format!("duplicate field name: \"{}\"", name)));
            }
            map.insert(
                name,
                LayerField {
                    visibility: Visibility::Inherit,
                    plus,
                    body: FieldBody::Expr(value.clone()),
                    env: Some(inner.clone()),
                },
            );
            Ok(())
        })?;
        let layer = Layer {
            fields: map,
            locals: locals.clone(),
            asserts: Rc::new(Vec::new()),
            env: env.clone(),
            binds_dollar: env.dollar().is_none(),
        };
        Ok(Value::Object(self.new_object(vec![Rc::new(layer)])))
    }

    fn layer_env(&self, obj: &ObjectValue, idx: usize, layer: &Layer, base: &Env) -> Result<Env> {
        let frame = Frame {
            vars: HashMap::new(),
            self_ctx: Some(SelfCtx {
                obj: obj.clone(),
                layer: idx,
            }),
            dollar: layer.binds_dollar.then(|| obj.clone()),
        };
        let env = self.new_env(Some(base), frame);
        for bind in layer.locals.iter() {
            let thunk = self.thunk(&bind.body, &env)?;
            env.bind(bind.name.clone(), thunk);
        }
        Ok(env)
    }

    fn check_asserts(&self, obj: &ObjectValue) -> Result<()> {
        if obj.0.asserts_checked.get() {
            return Ok(());
        }
        obj.0.asserts_checked.set(true);
        for (idx, layer) in obj.layers().iter().enumerate() {
            if layer.asserts.is_empty() {
                continue;
            }
            let env = self.layer_env(obj, idx, layer, &layer.env)?;
            for assert in layer.asserts.iter() {
                if self.eval_bool(&assert.cond, &env, "object assert")? {
                    continue;
                }
                let text = match &assert.message {
                    Some(m) => {
                        let value = self.eval(m, &env)?;
                        self.error_message(&value)?
                    }
                    None => "object assertion failed".to_string(),
                };
                return Err(runtime(text));
            }
        }
        Ok(())
    }

    /// Field value as seen from outside the object; `None` when absent
    pub fn object_field(&self, obj: &ObjectValue, name: &str) -> Result<Option<Value>> {
        self.check_asserts(obj)?;
        if let Some(value) = obj.0.cache.borrow().get(name) {
            return Ok(Some(value.clone()));
        }
        let value = self.lookup_field_below(obj, name, obj.layers().len())?;
        if let Some(value) = &value {
            obj.0
                .cache
                .borrow_mut()
                .insert(Rc::from(name), value.clone());
        }
        Ok(value)
    }

    /// Resolve `name` using only the layers strictly below `below`
    fn lookup_field_below(
        &self,
        obj: &ObjectValue,
        name: &str,
        below: usize,
    ) -> Result<Option<Value>> {
        for idx in (0..below).rev() {
            let layer = &obj.layers()[idx];
            let Some(field) = layer.fields.get(name) else {
                continue;
            };
            let value = match &field.body {
                FieldBody::Value(value) => value.clone(),
                FieldBody::Expr(expr) => {
                    let base = field.env.as_ref().unwrap_or(&layer.env);
                    let env = self.layer_env(obj, idx, layer, base)?;
                    self.eval(expr, &env)?
                }
            };
            if field.plus {
                if let Some(base) = self.lookup_field_below(obj, name, idx)? {
                    return self.binary(BinaryOp::Add, &base, &value).map(Some);
                }
            }
            return Ok(Some(value));
        }
        Ok(None)
    }

    pub fn index(&self, target: &Value, index: &Value) -> Result<Value> {
        match (target, index) {
            (Value::Object(obj), Value::Str(name)) => self
                .object_field(obj, name)?
                .ok_or_else(|| runtime(format!("field does not exist: {}", name))),
            (Value::Object(_), other) => Err(runtime(format!(
                "object index must be a string, got {}",
                other.type_name()
            ))),
            (Value::Array(items), Value::Number(n)) => {
                let idx = self.array_index(*n, items.len())?;
                self.force(&items[idx])
            }
            (Value::Str(s), Value::Number(n)) => {
                let len = s.chars().count();
                let idx = self.array_index(*n, len)?;
                let c = s.chars().nth(idx).map(String::from).unwrap_or_default();
                Ok(Value::string(c))
            }
            (Value::Array(_) | Value::Str(_), other) => Err(runtime(format!(
                "{} index must be a number, got {}",
                target.type_name(),
                other.type_name()
            ))),
            (other, _) => Err(runtime(format!(
                "can't index a value of type {}",
                other.type_name()
            ))),
        }
    }

    fn array_index(&self, n: f64, len: usize) -> Result<usize> {
        if n.fract() != 0.0 {
            return Err(runtime(format!("index must be an integer, got {}", n)));
        }
        if n < 0.0 || n >= len as f64 {
            return Err(runtime(format!(
                "index {} out of bounds, length is {}",
                n, len
            )));
        }
        Ok(n as usize)
    }

    pub(crate) fn slice(
        &self,
        target: &Value,
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    ) -> Result<Value> {
        let step = step.unwrap_or(1);
        if step < 1 {
            return Err(runtime(format!("slice step must be positive, got {}", step)));
        }
        if start.is_some_and(|s| s < 0) || end.is_some_and(|e| e < 0) {
            return Err(runtime("slice bounds must be non-negative"));
        }
        let bounds = |len: usize| {
            let start = start.map_or(0, |s| (s as usize).min(len));
            let end = end.map_or(len, |e| (e as usize).min(len));
            (start, end.max(start))
        };
        match target {
            Value::Array(items) => {
                let (start, end) = bounds(items.len());
                let picked = items[start..end]
                    .iter()
                    .step_by(step as usize)
                    .cloned()
                    .collect();
                Ok(Value::Array(Rc::new(picked)))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (start, end) = bounds(chars.len());
                let picked: String = chars[start..end].iter().step_by(step as usize).collect();
                Ok(Value::string(picked))
            }
            other => Err(runtime(format!(
                "can't slice a value of type {}",
                other.type_name()
            ))),
        }
    }

    fn arg_thunks(&self, args: &Args, env: &Env) -> Result<(Vec<Thunk>, Vec<(Rc<str>, Thunk)>)> {
        let positional = args
            .positional
            .iter()
            .map(|a| self.thunk(a, env))
            .collect::<Result<Vec<_>>>()?;
        let named = args
            .named
            .iter()
            .map(|(name, a)| Ok((name.clone(), self.thunk(a, env)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok((positional, named))
    }

    /// Bind arguments to parameter slots by position, then by name
    fn bind_args(
        param_names: &[&str],
        positional: Vec<Thunk>,
        named: Vec<(Rc<str>, Thunk)>,
    ) -> Result<Vec<Option<Thunk>>> {
        if positional.len() > param_names.len() {
            return Err(runtime(format!(
                "too many arguments: function takes {} but {} were given",
                param_names.len(),
                positional.len()
            )));
        }
        let mut slots: Vec<Option<Thunk>> = vec![None; param_names.len()];
        for (slot, thunk) in slots.iter_mut().zip(positional) {
            *slot = Some(thunk);
        }
        for (name, thunk) in named {
            let idx = param_names
                .iter()
                .position(|p| **p == *name)
                .ok_or_else(|| runtime(format!("function has no parameter {}", name)))?;
            if slots[idx].is_some() {
                return Err(runtime(format!("argument {} given more than once", name)));
            }
            slots[idx] = Some(thunk);
        }
        Ok(slots)
    }

    pub fn call(
        &self,
        func: &Function,
        positional: Vec<Thunk>,
        named: Vec<(Rc<str>, Thunk)>,
    ) -> Result<Value> {
        let _frame = self.enter_call()?;
        match func {
            Function::Closure { params, body, env } => {
                let names: Vec<&str> = params.iter().map(|p| &*p.name).collect();
                let slots = Self::bind_args(&names, positional, named)?;
                let call_env = self.new_env(Some(env), Frame::default());
                for (param, slot) in params.iter().zip(slots) {
                    let thunk = match (slot, &param.default) {
                        (Some(thunk), _) => thunk,
                        (None, Some(default)) => self.thunk(default, &call_env)?,
                        (None, None) => {
                            return Err(runtime(format!(
                                "missing argument: {}",
                                param.name
                            )))
                        }
                    };
                    call_env.bind(param.name.clone(), thunk);
                }
                self.eval(body, &call_env)
            }
            Function::Builtin(builtin) => {
                let slots = Self::bind_args(builtin.params, positional, named)?;
                let mut args = Vec::with_capacity(slots.len());
                for (idx, slot) in slots.into_iter().enumerate() {
                    match slot {
                        Some(thunk) => args.push(self.force(&thunk)?),
                        None if idx < builtin.required => {
                            return Err(runtime(format!(
                                "std.{}: missing argument: {}",
                                builtin.name, builtin.params[idx]
                            )))
                        }
                        None => args.push(Value::Null),
                    }
                }
                (builtin.imp)(self, &args)
            }
        }
    }

    /// Call a function value with already evaluated positional arguments
    pub fn call_value(&self, func: &Value, args: Vec<Value>) -> Result<Value> {
        match func {
            Value::Function(func) => {
                let args = args.into_iter().map(Thunk::ready).collect();
                self.call(func, args, Vec::new())
            }
            other => Err(runtime(format!(
                "expected a function, got {}",
                other.type_name()
            ))),
        }
    }

    fn unary(&self, op: UnaryOp, value: &Value) -> Result<Value> {
        match (op, value) {
            (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
            (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(*n)),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::BitNot, Value::Number(n)) => Ok(Value::Number(!(*n as i64) as f64)),
            (op, other) => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::Not => "!",
                    UnaryOp::BitNot => "~",
                };
                Err(runtime(format!(
                    "unary operator {} does not operate on {}",
                    symbol,
                    other.type_name()
                )))
            }
        }
    }

    fn number(&self, n: f64) -> Result<Value> {
        if n.is_finite() {
            Ok(Value::Number(n))
        } else {
            Err(runtime("numeric overflow"))
        }
    }

    pub(crate) fn string(&self, s: String) -> Result<Value> {
        self.check_string_len(s.len())?;
        Ok(Value::string(s))
    }

    /// String form used by `+` and `std.toString`
    pub fn to_display_string(&self, value: &Value) -> Result<String> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => manifest::inline(self, other),
        }
    }

    pub fn binary(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
        use Value::{Array, Number, Object, Str};
        match (op, lhs, rhs) {
            (BinaryOp::Add, Number(a), Number(b)) => self.number(a + b),
            (BinaryOp::Add, Str(_), _) | (BinaryOp::Add, _, Str(_)) => {
                let mut s = self.to_display_string(lhs)?;
                let tail = self.to_display_string(rhs)?;
                self.check_string_len(s.len().saturating_add(tail.len()))?;
                s.push_str(&tail);
                self.string(s)
            }
            (BinaryOp::Add, Array(a), Array(b)) => {
                self.check_array_len(a.len().saturating_add(b.len()))?;
                let joined = a.iter().chain(b.iter()).cloned().collect();
                Ok(Array(Rc::new(joined)))
            }
            (BinaryOp::Add, Object(a), Object(b)) => {
                let layers = a.extend(b);
                self.charge(layers.len() as u64)?;
                Ok(Object(self.new_object(layers)))
            }
            (BinaryOp::Sub, Number(a), Number(b)) => self.number(a - b),
            (BinaryOp::Mul, Number(a), Number(b)) => self.number(a * b),
            (BinaryOp::Div, Number(a), Number(b)) => {
                if *b == 0.0 {
                    return Err(runtime("division by zero"));
                }
                self.number(a / b)
            }
            (BinaryOp::Mod, Number(a), Number(b)) => {
                if *b == 0.0 {
                    return Err(runtime("division by zero"));
                }
                self.number(a % b)
            }
            (BinaryOp::Mod, Str(fmt), _) => {
                let formatted = format::format(self, fmt, rhs)?;
                self.string(formatted)
            }
            (BinaryOp::Shl | BinaryOp::Shr, Number(a), Number(b)) => {
                let shift = *b as i64;
                if shift < 0 {
                    return Err(runtime("shift by negative amount"));
                }
                let a = *a as i64;
                // Bits shifted past the width are gone; right shifts keep the sign
                let result = match (op, u32::try_from(shift).ok().filter(|s| *s < 64)) {
                    (BinaryOp::Shl, Some(shift)) => a << shift,
                    (BinaryOp::Shl, None) => 0,
                    (_, Some(shift)) => a >> shift,
                    (_, None) => if a < 0 { -1 } else { 0 },
                };
                Ok(Number(result as f64))
            }
            (BinaryOp::BitAnd, Number(a), Number(b)) => Ok(Number(((*a as i64) & (*b as i64)) as f64)),
            (BinaryOp::BitXor, Number(a), Number(b)) => Ok(Number(((*a as i64) ^ (*b as i64)) as f64)),
            (BinaryOp::BitOr, Number(a), Number(b)) => Ok(Number(((*a as i64) | (*b as i64)) as f64)),
            (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge, _, _) => {
                let ordering = self.compare(lhs, rhs)?;
                let result = match op {
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::Le => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(Value::Bool(result))
            }
            (BinaryOp::In, Str(name), Object(obj)) => Ok(Value::Bool(obj.has_field(name))),
            (BinaryOp::Eq, _, _) => Ok(Value::Bool(self.equals(lhs, rhs)?)),
            (BinaryOp::Ne, _, _) => Ok(Value::Bool(!self.equals(lhs, rhs)?)),
            (BinaryOp::And | BinaryOp::Or, Value::Bool(a), Value::Bool(b)) => {
                Ok(Value::Bool(if op == BinaryOp::And { *a && *b } else { *a || *b }))
            }
            _ => Err(runtime(format!(
                "binary operator {} does not operate on {} and {}",
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            ))),
        }
    }

    pub fn compare(&self, lhs: &Value, rhs: &Value) -> Result<Ordering> {
        match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(a.partial_cmp(b).unwrap_or(Ordering::Equal)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let x = self.force(x)?;
                    let y = self.force(y)?;
                    match self.compare(&x, &y)? {
                        Ordering::Equal => {}
                        other => return Ok(other),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => Err(runtime(format!(
                "can't compare {} with {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        }
    }

    pub fn equals(&self, lhs: &Value, rhs: &Value) -> Result<bool> {
        let _guard = self.enter()?;
        match (lhs, rhs) {
            (Value::Null, Value::Null) => Ok(true),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !self.equals(&self.force(x)?, &self.force(y)?)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Object(a), Value::Object(b)) => {
                let names = a.field_names(false);
                if names != b.field_names(false) {
                    return Ok(false);
                }
                for name in &names {
                    let x = self.object_field(a, name)?.unwrap_or(Value::Null);
                    let y = self.object_field(b, name)?.unwrap_or(Value::Null);
                    if !self.equals(&x, &y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Function(_), _) | (_, Value::Function(_)) => {
                Err(runtime("cannot test equality of functions"))
            }
            _ => Ok(false),
        }
    }
}
