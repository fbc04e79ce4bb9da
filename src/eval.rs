// ABOUTME: Tree-walking evaluator executing statements against the environment chain

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::env::Environment;
use crate::error::{RuntimeError, Unwind};
use crate::token::{Token, TokenType};
use crate::value::{Class, Function, Instance, NativeFn, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, as a Lox number.
fn clock_native(_arguments: &[Value]) -> Result<Value, RuntimeError> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    Ok(Value::Number(seconds))
}

/// The evaluator.
///
/// Holds the globals environment (root of every chain), the current
/// environment (swapped as blocks and calls are entered), the resolver's
/// side table, and the sink `print` writes to. One instance can interpret
/// many programs in sequence, which is what keeps REPL globals alive
/// between inputs.
pub struct Interpreter {
    globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: HashMap<ExprId, usize>,
    out: Rc<RefCell<dyn Write>>,
}

impl Interpreter {
    /// An interpreter printing to stdout.
    pub fn new() -> Self {
        Interpreter::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    /// An interpreter printing into the given sink. Tests pass a shared
    /// buffer here to capture `print` output.
    pub fn with_output(out: Rc<RefCell<dyn Write>>) -> Self {
        let globals = Environment::new();
        globals.define(
            "clock".to_string(),
            Value::Native(Rc::new(NativeFn {
                name: "clock",
                arity: 0,
                function: clock_native,
            })),
        );

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Merges a resolver side table in. Entries accumulate because ids are
    /// process-unique; a REPL resolves each input separately.
    pub fn resolve(&mut self, locals: HashMap<ExprId, usize>) {
        self.locals.extend(locals);
    }

    /// Executes a program. The first runtime error aborts it.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                Err(Unwind::Error(error)) => return Err(error),
                Err(Unwind::Return(_)) => return Ok(()),
            }
        }
        Ok(())
    }

    fn execute(&mut self, statement: &Stmt) -> Result<(), Unwind> {
        match statement {
            Stmt::Expression(expression) => {
                self.evaluate(expression)?;
                Ok(())
            }
            Stmt::Print(expression) => {
                let value = self.evaluate(expression)?;
                let _ = writeln!(self.out.borrow_mut(), "{}", value);
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, scope)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }
            Stmt::Function(declaration) => {
                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .define(declaration.name.lexeme.clone(), Value::Function(Rc::new(function)));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
            Stmt::Class { name, methods } => {
                self.environment.define(name.lexeme.clone(), Value::Nil);

                let mut method_table = HashMap::new();
                for method in methods {
                    let function = Function::new(
                        Rc::clone(method),
                        Rc::clone(&self.environment),
                        method.name.lexeme == "init",
                    );
                    method_table.insert(method.name.lexeme.clone(), Rc::new(function));
                }

                let class = Class::new(name.lexeme.clone(), method_table);
                self.environment
                    .assign(name, Value::Class(Rc::new(class)))?;
                Ok(())
            }
        }
    }

    /// Runs statements in the given environment, restoring the previous one
    /// on every exit path: normal completion, return unwind, runtime error.
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<Environment>,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expression: &Expr) -> Result<Value, RuntimeError> {
        match expression {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::String(s) => Value::String(s.clone()),
            }),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::Minus => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(operator, "Operand must be a number")),
                    },
                    TokenType::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(RuntimeError::new(operator, "Invalid unary operator")),
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary(&left, operator, &right)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                // The deciding operand comes back as-is, never coerced
                if operator.token_type == TokenType::Or {
                    if left.is_truthy() {
                        return Ok(left);
                    }
                } else if !left.is_truthy() {
                    return Ok(left);
                }
                self.evaluate(right)
            }
            Expr::Variable { id, name } => self.look_up_variable(name, *id),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(&depth) => {
                        if !self.environment.assign_at(depth, name, value.clone()) {
                            return Err(RuntimeError::undefined_variable(name));
                        }
                    }
                    None => self.globals.assign(name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut evaluated = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    evaluated.push(self.evaluate(argument)?);
                }

                self.call_value(&callee, &evaluated, paren)
            }
            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(RuntimeError::new(name, "Only instances have properties")),
            },
            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(name, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::new(name, "Only instances have fields")),
            },
            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),
        }
    }

    fn binary(
        &mut self,
        left: &Value,
        operator: &Token,
        right: &Value,
    ) -> Result<Value, RuntimeError> {
        match operator.token_type {
            TokenType::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => {
                    Ok(Value::String(format!("{}{}", a, b)))
                }
                _ => Err(RuntimeError::new(
                    operator,
                    "Operands must be two numbers or two strings",
                )),
            },
            TokenType::Minus => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a - b))
            }
            TokenType::Star => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a * b))
            }
            TokenType::Slash => {
                // Division by zero follows IEEE-754: inf or NaN, not an error
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a / b))
            }
            TokenType::Greater => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a > b))
            }
            TokenType::GreaterEqual => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a >= b))
            }
            TokenType::Less => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a < b))
            }
            TokenType::LessEqual => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a <= b))
            }
            TokenType::EqualEqual => Ok(Value::Bool(left == right)),
            TokenType::BangEqual => Ok(Value::Bool(left != right)),
            _ => Err(RuntimeError::new(operator, "Invalid binary operator")),
        }
    }

    fn number_operands(
        &self,
        operator: &Token,
        left: &Value,
        right: &Value,
    ) -> Result<(f64, f64), RuntimeError> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
            _ => Err(RuntimeError::new(operator, "Operands must be numbers")),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&depth) => self
                .environment
                .get_at(depth, &name.lexeme)
                .ok_or_else(|| RuntimeError::undefined_variable(name)),
            None => self.globals.get(name),
        }
    }

    fn call_value(
        &mut self,
        callee: &Value,
        arguments: &[Value],
        paren: &Token,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => {
                if arguments.len() != function.arity() {
                    return Err(RuntimeError::arity(paren, function.arity(), arguments.len()));
                }
                self.call_function(function.as_ref(), arguments)
            }
            Value::Class(class) => {
                if arguments.len() != class.arity() {
                    return Err(RuntimeError::arity(paren, class.arity(), arguments.len()));
                }
                let instance = Instance::new(Rc::clone(class));
                if let Some(init) = class.find_method("init") {
                    self.call_function(&init.bind(Rc::clone(&instance)), arguments)?;
                }
                Ok(Value::Instance(instance))
            }
            Value::Native(native) => {
                if arguments.len() != native.arity {
                    return Err(RuntimeError::arity(paren, native.arity, arguments.len()));
                }
                (native.function)(arguments)
            }
            _ => Err(RuntimeError::new(
                paren,
                "Can only call functions and classes",
            )),
        }
    }

    /// Invokes a user function: parameters bind in a fresh environment whose
    /// parent is the captured closure, and a `Return` unwinding out of the
    /// body is absorbed here. Initializers always yield `this`.
    fn call_function(
        &mut self,
        function: &Function,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        let environment = Environment::with_enclosing(Rc::clone(&function.closure));
        for (param, argument) in function.declaration.params.iter().zip(arguments) {
            environment.define(param.lexeme.clone(), argument.clone());
        }

        let completion = self.execute_block(&function.declaration.body, environment);

        let returned = match completion {
            Ok(()) => Value::Nil,
            Err(Unwind::Return(value)) => value,
            Err(Unwind::Error(error)) => return Err(error),
        };

        if function.is_initializer {
            return Ok(function.closure.get_at(0, "this").unwrap_or(Value::Nil));
        }
        Ok(returned)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
