//! API to control the interpreter.

use std::io::Write;
use std::rc::Rc;

use crate::eval::Evaluator;
use crate::object::{Environment, Object};
use crate::parser::{self, ParseErrors};

/// Tree-walk interpreter with a persistent global environment.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then an
/// additional time to call it:
///
/// ```
/// # use rmonkey::interpreter::Interpreter;
/// # use rmonkey::parser::ParseErrors;
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// interp.eval("let max = fn(x, y) { if (x > y) { x } else { y } };")?;
/// let result = interp.eval("max(10, 20)")?;
/// assert_eq!(result.inspect(), "20");
/// # Ok::<(), ParseErrors>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'a, W: Write> {
    env: Rc<Environment>,
    evaluator: Evaluator<'a, W>,
}

impl<'a, W: Write> Interpreter<'a, W> {
    pub fn new(output: &'a mut W) -> Interpreter<'a, W> {
        Interpreter {
            env: Environment::new(),
            evaluator: Evaluator::new(output),
        }
    }

    /// Parses and evaluates `source` in the interpreter's global
    /// environment.
    ///
    /// Parse diagnostics refuse evaluation and come back as `Err`;
    /// run-time failures are ordinary [`Object::Error`] values inside
    /// `Ok`.
    pub fn eval(&mut self, source: &str) -> Result<Object, ParseErrors> {
        let program = parser::parse(source)?;
        Ok(self.evaluator.eval_program(&program, &self.env))
    }
}
