//! Tree-walking evaluator.
//!
//! Run-time failures are `Object::Error` values, not `Err`: every site
//! that consumes a sub-result checks for an error object and forwards it
//! unchanged, so the first failure becomes the result of the whole
//! program. `return` is modeled the same way — a `ReturnValue` wrapper
//! travels up through blocks untouched and is unwrapped at the program
//! layer and at call boundaries only.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::ast::{Block, Expr, Program, Stmt};
use crate::object::{
    Builtin, BuiltinFn, Environment, Function, HashPair, Object, ObjectKind,
};

/// Evaluates programs against an environment, writing `puts` output to the
/// supplied sink.
#[derive(Debug)]
pub struct Evaluator<'a, W: Write> {
    output: &'a mut W,
}

impl<'a, W: Write> Evaluator<'a, W> {
    pub fn new(output: &'a mut W) -> Evaluator<'a, W> {
        Evaluator { output }
    }

    /// Folds the program's statements left to right. A `ReturnValue` is
    /// unwrapped here and an error stops evaluation; otherwise the value
    /// of the last statement wins.
    pub fn eval_program(&mut self, program: &Program, env: &Rc<Environment>) -> Object {
        let mut result = Object::Null;
        for stmt in &program.statements {
            result = self.eval_stmt(stmt, env);
            match result {
                Object::ReturnValue(value) => return *value,
                Object::Error(_) => return result,
                _ => (),
            }
        }
        result
    }

    /// Unlike `eval_program` this forwards `ReturnValue` without
    /// unwrapping, so `return` escapes arbitrarily nested blocks.
    fn eval_block(&mut self, block: &Block, env: &Rc<Environment>) -> Object {
        let mut result = Object::Null;
        for stmt in &block.0 {
            result = self.eval_stmt(stmt, env);
            if matches!(result.kind(), ObjectKind::ReturnValue | ObjectKind::Error) {
                return result;
            }
        }
        result
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: &Rc<Environment>) -> Object {
        match stmt {
            Stmt::Expr(expr) => self.eval_expr(expr, env),
            Stmt::Return(expr) => {
                let value = self.eval_expr(expr, env);
                if value.is_error() {
                    return value;
                }
                Object::ReturnValue(Box::new(value))
            }
            Stmt::Let(name, expr) => {
                let value = self.eval_expr(expr, env);
                if value.is_error() {
                    return value;
                }
                env.set(name.clone(), value);
                Object::Null
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Environment>) -> Object {
        match expr {
            Expr::Int(value) => Object::Integer(*value),
            Expr::Bool(value) => Object::Boolean(*value),
            Expr::Str(value) => Object::Str(value.clone()),
            Expr::Ident(name) => eval_identifier(name, env),
            Expr::Prefix(op, right) => {
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                eval_prefix_expression(op, right)
            }
            Expr::Infix(op, left, right) => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                eval_infix_expression(op, left, right)
            }
            Expr::If(cond, consequence, alternative) => {
                let cond = self.eval_expr(cond, env);
                if cond.is_error() {
                    return cond;
                }
                if cond.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alt) = alternative {
                    self.eval_block(alt, env)
                } else {
                    Object::Null
                }
            }
            // The captured environment is the defining one; this is what
            // makes closures close.
            Expr::Function(params, body) => Object::Function(Rc::new(Function {
                parameters: params.clone(),
                body: body.clone(),
                env: env.clone(),
            })),
            Expr::Call(callee, args) => {
                let callee = self.eval_expr(callee, env);
                if callee.is_error() {
                    return callee;
                }
                let args = match self.eval_expressions(args, env) {
                    Ok(args) => args,
                    Err(err) => return err,
                };
                self.apply_function(callee, args)
            }
            Expr::Array(elements) => match self.eval_expressions(elements, env) {
                Ok(elements) => Object::Array(Rc::new(elements)),
                Err(err) => err,
            },
            Expr::Index(left, index) => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let index = self.eval_expr(index, env);
                if index.is_error() {
                    return index;
                }
                eval_index_expression(left, index)
            }
            Expr::Hash(pairs) => self.eval_hash_literal(pairs, env),
        }
    }

    /// Left-to-right evaluation, stopping at the first error.
    fn eval_expressions(
        &mut self,
        exprs: &[Expr],
        env: &Rc<Environment>,
    ) -> Result<Vec<Object>, Object> {
        let mut result = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let value = self.eval_expr(expr, env);
            if value.is_error() {
                return Err(value);
            }
            result.push(value);
        }
        Ok(result)
    }

    fn apply_function(&mut self, callee: Object, args: Vec<Object>) -> Object {
        match callee {
            Object::Function(func) => {
                if args.len() != func.parameters.len() {
                    return Object::Error(format!(
                        "wrong number of arguments. got={}, want={}",
                        args.len(),
                        func.parameters.len()
                    ));
                }
                // The call frame extends the environment captured at the
                // definition site, not the caller's.
                let call_env = Environment::new_enclosed(func.env.clone());
                for (param, arg) in func.parameters.iter().zip(args) {
                    call_env.set(param.clone(), arg);
                }
                // Unwrap here so a `return` cannot ripple past the call.
                match self.eval_block(&func.body, &call_env) {
                    Object::ReturnValue(value) => *value,
                    other => other,
                }
            }
            Object::Builtin(builtin) => (builtin.0)(args, &mut *self.output),
            other => Object::Error(format!("not a function: {}", other.kind())),
        }
    }

    fn eval_hash_literal(&mut self, pairs: &[(Expr, Expr)], env: &Rc<Environment>) -> Object {
        let mut map = HashMap::new();
        for (key_expr, value_expr) in pairs {
            let key = self.eval_expr(key_expr, env);
            if key.is_error() {
                return key;
            }
            let hash_key = match key.hash_key() {
                Some(hash_key) => hash_key,
                None => return Object::Error(format!("unusable as hash key: {}", key.kind())),
            };
            let value = self.eval_expr(value_expr, env);
            if value.is_error() {
                return value;
            }
            // Later duplicates overwrite earlier ones.
            map.insert(hash_key, HashPair { key, value });
        }
        Object::Hash(Rc::new(map))
    }
}

fn eval_identifier(name: &str, env: &Rc<Environment>) -> Object {
    if let Some(value) = env.get(name) {
        return value;
    }
    if let Some(builtin) = builtin(name) {
        return builtin;
    }
    Object::Error(format!("identifier not found: {}", name))
}

fn eval_prefix_expression(op: &str, right: Object) -> Object {
    match op {
        "!" => eval_bang(right),
        "-" => match right {
            Object::Integer(value) => Object::Integer(value.wrapping_neg()),
            other => Object::Error(format!("unknown operator: -{}", other.kind())),
        },
        _ => Object::Error(format!("unknown operator: {}{}", op, right.kind())),
    }
}

fn eval_bang(right: Object) -> Object {
    match right {
        Object::Boolean(true) => Object::Boolean(false),
        Object::Boolean(false) => Object::Boolean(true),
        Object::Null => Object::Boolean(true),
        _ => Object::Boolean(false),
    }
}

fn eval_infix_expression(op: &str, left: Object, right: Object) -> Object {
    match (&left, &right) {
        (Object::Integer(l), Object::Integer(r)) => eval_integer_infix(op, *l, *r),
        (Object::Str(l), Object::Str(r)) => eval_string_infix(op, l, r),
        _ => match op {
            "==" => Object::Boolean(identical(&left, &right)),
            "!=" => Object::Boolean(!identical(&left, &right)),
            _ if left.kind() != right.kind() => Object::Error(format!(
                "type mismatch: {} {} {}",
                left.kind(),
                op,
                right.kind()
            )),
            _ => Object::Error(format!(
                "unknown operator: {} {} {}",
                left.kind(),
                op,
                right.kind()
            )),
        },
    }
}

/// Identity comparison. It can only hold for the boolean and null
/// singleton shapes; any other pair is never identical.
fn identical(left: &Object, right: &Object) -> bool {
    match (left, right) {
        (Object::Boolean(l), Object::Boolean(r)) => l == r,
        (Object::Null, Object::Null) => true,
        _ => false,
    }
}

fn eval_integer_infix(op: &str, left: i64, right: i64) -> Object {
    match op {
        // Arithmetic wraps per two's-complement i64; division truncates
        // toward zero.
        "+" => Object::Integer(left.wrapping_add(right)),
        "-" => Object::Integer(left.wrapping_sub(right)),
        "*" => Object::Integer(left.wrapping_mul(right)),
        "/" => {
            if right == 0 {
                Object::Error("division by zero".to_string())
            } else {
                Object::Integer(left.wrapping_div(right))
            }
        }
        "<" => Object::Boolean(left < right),
        ">" => Object::Boolean(left > right),
        "==" => Object::Boolean(left == right),
        "!=" => Object::Boolean(left != right),
        _ => Object::Error(format!(
            "unknown operator: {} {} {}",
            ObjectKind::Integer,
            op,
            ObjectKind::Integer
        )),
    }
}

fn eval_string_infix(op: &str, left: &str, right: &str) -> Object {
    match op {
        "+" => Object::Str(format!("{}{}", left, right)),
        _ => Object::Error(format!(
            "unknown operator: {} {} {}",
            ObjectKind::Str,
            op,
            ObjectKind::Str
        )),
    }
}

fn eval_index_expression(left: Object, index: Object) -> Object {
    match (&left, &index) {
        (Object::Array(elements), Object::Integer(i)) => {
            if *i < 0 || *i as usize >= elements.len() {
                Object::Null
            } else {
                elements[*i as usize].clone()
            }
        }
        (Object::Hash(pairs), _) => match index.hash_key() {
            Some(key) => pairs
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Object::Null),
            None => Object::Error(format!("unusable as hash key: {}", index.kind())),
        },
        _ => Object::Error(format!("index operator not supported: {}", left.kind())),
    }
}

/// Looks up a built-in function by name. Consulted after the environment,
/// so a `let` binding shadows a built-in.
fn builtin(name: &str) -> Option<Object> {
    let f: BuiltinFn = match name {
        "len" => builtin_len,
        "first" => builtin_first,
        "last" => builtin_last,
        "rest" => builtin_rest,
        "push" => builtin_push,
        "puts" => builtin_puts,
        _ => return None,
    };
    Some(Object::Builtin(Builtin(f)))
}

fn builtin_len(args: Vec<Object>, _output: &mut dyn Write) -> Object {
    if args.len() != 1 {
        return Object::Error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }
    match &args[0] {
        Object::Str(value) => Object::Integer(value.len() as i64),
        Object::Array(elements) => Object::Integer(elements.len() as i64),
        other => Object::Error(format!(
            "argument to `len` not supported, got {}",
            other.kind()
        )),
    }
}

fn builtin_first(args: Vec<Object>, _output: &mut dyn Write) -> Object {
    if args.len() != 1 {
        return Object::Error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }
    match &args[0] {
        Object::Array(elements) => elements.first().cloned().unwrap_or(Object::Null),
        other => Object::Error(format!(
            "argument to `first` must be ARRAY, got {}",
            other.kind()
        )),
    }
}

fn builtin_last(args: Vec<Object>, _output: &mut dyn Write) -> Object {
    if args.len() != 1 {
        return Object::Error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }
    match &args[0] {
        Object::Array(elements) => elements.last().cloned().unwrap_or(Object::Null),
        other => Object::Error(format!(
            "argument to `last` must be ARRAY, got {}",
            other.kind()
        )),
    }
}

fn builtin_rest(args: Vec<Object>, _output: &mut dyn Write) -> Object {
    if args.len() != 1 {
        return Object::Error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }
    match &args[0] {
        Object::Array(elements) => {
            if elements.is_empty() {
                Object::Null
            } else {
                // Fresh outer container, shared elements.
                Object::Array(Rc::new(elements[1..].to_vec()))
            }
        }
        other => Object::Error(format!(
            "argument to `rest` must be ARRAY, got {}",
            other.kind()
        )),
    }
}

fn builtin_push(args: Vec<Object>, _output: &mut dyn Write) -> Object {
    if args.len() != 2 {
        return Object::Error(format!(
            "wrong number of arguments. got={}, want=2",
            args.len()
        ));
    }
    match &args[0] {
        Object::Array(elements) => {
            let mut pushed = elements.as_ref().clone();
            pushed.push(args[1].clone());
            Object::Array(Rc::new(pushed))
        }
        other => Object::Error(format!(
            "argument to `push` must be ARRAY, got {}",
            other.kind()
        )),
    }
}

fn builtin_puts(args: Vec<Object>, output: &mut dyn Write) -> Object {
    for arg in &args {
        // The sink has no value-level error channel; drop write failures.
        let _ = writeln!(output, "{}", arg.inspect());
    }
    Object::Null
}
