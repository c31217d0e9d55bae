//! Static checks run between parsing and evaluation
//!
//! Rejects references to unbound variables and uses of `self`, `super` or
//! `$` outside of an object, so these never surface halfway through a run.

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::{CompSpec, Expr, FieldName};
use crate::error::{static_error, Result};

struct Scope {
    frames: Vec<HashSet<Rc<str>>>,
    object_depth: usize,
}

impl Scope {
    fn contains(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|frame| frame.contains(name))
    }

    fn with_frame<T>(
        &mut self,
        names: impl IntoIterator<Item = Rc<str>>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.frames.push(names.into_iter().collect());
        let result = f(self);
        self.frames.pop();
        result
    }

    fn in_object<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.object_depth += 1;
        let result = f(self);
        self.object_depth -= 1;
        result
    }
}

/// Check a parsed program; `globals` are the names bound in the root scope
pub fn check(expr: &Expr, globals: &[&str]) -> Result<()> {
    let mut scope = Scope {
        frames: vec![globals.iter().map(|g| Rc::from(*g)).collect()],
        object_depth: 0,
    };
    visit(expr, &mut scope)
}

fn visit(expr: &Expr, scope: &mut Scope) -> Result<()> {
    match expr {
        Expr::Null | Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) => Ok(()),
        Expr::SelfRef => require_object(scope, "self"),
        Expr::Dollar => require_object(scope, "$"),
        Expr::Var(name) => {
            if scope.contains(name) {
                Ok(())
            } else {
                Err(static_error(format!("unknown variable: {}", name)))
            }
        }
        Expr::Array(items) => items.iter().try_for_each(|item| visit(item, scope)),
        Expr::ArrayComp { body, specs } => visit_specs(specs, 0, scope, &mut |s| visit(body, s)),
        Expr::Object {
            locals,
            fields,
            asserts,
        } => {
            // Computed field names are evaluated in the enclosing scope
            for field in fields {
                if let FieldName::Computed(name) = &field.name {
                    visit(name, scope)?;
                }
            }
            let names = locals.iter().map(|b| b.name.clone());
            scope.in_object(|scope| {
                scope.with_frame(names, |scope| {
                    for bind in locals.iter() {
                        visit(&bind.body, scope)?;
                    }
                    for field in fields {
                        visit(&field.body, scope)?;
                    }
                    for assert in asserts.iter() {
                        visit(&assert.cond, scope)?;
                        if let Some(message) = &assert.message {
                            visit(message, scope)?;
                        }
                    }
                    Ok(())
                })
            })
        }
        Expr::ObjectComp {
            locals,
            key,
            value,
            specs,
            ..
        } => visit_specs(specs, 0, scope, &mut |scope| {
            visit(key, scope)?;
            let names = locals.iter().map(|b| b.name.clone());
            scope.in_object(|scope| {
                scope.with_frame(names, |scope| {
                    for bind in locals.iter() {
                        visit(&bind.body, scope)?;
                    }
                    visit(value, scope)
                })
            })
        }),
        Expr::Index { target, index } => {
            visit(target, scope)?;
            visit(index, scope)
        }
        Expr::SuperIndex(index) => {
            require_object(scope, "super")?;
            visit(index, scope)
        }
        Expr::InSuper(key) => {
            require_object(scope, "super")?;
            visit(key, scope)
        }
        Expr::Slice {
            target,
            start,
            end,
            step,
        } => {
            visit(target, scope)?;
            for part in [start, end, step].into_iter().flatten() {
                visit(part, scope)?;
            }
            Ok(())
        }
        Expr::Apply { target, args } => {
            visit(target, scope)?;
            for arg in &args.positional {
                visit(arg, scope)?;
            }
            for (_, arg) in &args.named {
                visit(arg, scope)?;
            }
            Ok(())
        }
        Expr::Unary { expr, .. } => visit(expr, scope),
        Expr::Binary { lhs, rhs, .. } => {
            visit(lhs, scope)?;
            visit(rhs, scope)
        }
        Expr::Local { binds, body } => {
            let names = binds.iter().map(|b| b.name.clone());
            scope.with_frame(names, |scope| {
                for bind in binds.iter() {
                    visit(&bind.body, scope)?;
                }
                visit(body, scope)
            })
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visit(cond, scope)?;
            visit(then_branch, scope)?;
            match else_branch {
                Some(e) => visit(e, scope),
                None => Ok(()),
            }
        }
        Expr::Function { params, body } => {
            let names = params.iter().map(|p| p.name.clone());
            scope.with_frame(names, |scope| {
                for param in params.iter() {
                    if let Some(default) = &param.default {
                        visit(default, scope)?;
                    }
                }
                visit(body, scope)
            })
        }
        Expr::Error(inner) => visit(inner, scope),
        Expr::Assert {
            cond,
            message,
            rest,
        } => {
            visit(cond, scope)?;
            if let Some(message) = message {
                visit(message, scope)?;
            }
            visit(rest, scope)
        }
    }
}

fn visit_specs(
    specs: &[CompSpec],
    idx: usize,
    scope: &mut Scope,
    body: &mut dyn FnMut(&mut Scope) -> Result<()>,
) -> Result<()> {
    match specs.get(idx) {
        None => body(scope),
        Some(CompSpec::If(cond)) => {
            visit(cond, scope)?;
            visit_specs(specs, idx + 1, scope, body)
        }
        Some(CompSpec::For { var, iter }) => {
            visit(iter, scope)?;
            scope.with_frame([var.clone()], |scope| {
                visit_specs(specs, idx + 1, scope, body)
            })
        }
    }
}

fn require_object(scope: &Scope, what: &str) -> Result<()> {
    if scope.object_depth > 0 {
        Ok(())
    } else {
        Err(static_error(format!("can't use {} outside of an object", what)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn check_str(source: &str) -> Result<()> {
        let expr = parse(tokenize(source)?, 1_000)?;
        check(&expr, &["std"])
    }

    #[test]
    fn test_bound_names_pass() {
        assert!(check_str("local x = 1; x + std.length([])").is_ok());
        assert!(check_str("function(a, b=a) a + b").is_ok());
        assert!(check_str("{ local y = 2, a: y, b: self.a }").is_ok());
        assert!(check_str("[x + y for x in [1] for y in [x]]").is_ok());
    }

    #[test]
    fn test_unknown_variable() {
        let err = check_str("x + 1").unwrap_err();
        assert_eq!(err.message(), "unknown variable: x");
    }

    #[test]
    fn test_self_outside_object() {
        assert!(check_str("self.a").is_err());
        assert!(check_str("$").is_err());
        assert!(check_str("super.a").is_err());
    }

    #[test]
    fn test_local_is_recursive() {
        assert!(check_str("local f(n) = if n == 0 then 0 else f(n - 1); f(3)").is_ok());
    }

    #[test]
    fn test_comprehension_var_not_visible_in_first_iter() {
        assert!(check_str("[x for x in x]").is_err());
    }

    #[test]
    fn test_computed_field_name_outside_object_locals() {
        assert!(check_str("{ local k = 'a', [k]: 1 }").is_err());
    }
}
