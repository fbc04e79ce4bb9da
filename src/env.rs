// ABOUTME: Environment chain managing variable bindings across lexical scopes

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One lexical scope: a binding table plus an optional enclosing scope.
///
/// Environments are shared (`Rc`): several closures may capture the same
/// scope, and every child holds its parent alive. The chain always points
/// from child to parent, so cycles cannot form.
#[derive(Debug)]
pub struct Environment {
    values: RefCell<HashMap<String, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates the globals environment, the root of every chain.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            enclosing: None,
        })
    }

    pub fn with_enclosing(enclosing: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            enclosing: Some(enclosing),
        })
    }

    /// Binds a name in THIS scope. Writes unconditionally, which is what lets
    /// `var` redeclare at the same level.
    pub fn define(&self, name: String, value: Value) {
        self.values.borrow_mut().insert(name, value);
    }

    /// Looks a name up, walking outward through enclosing scopes.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.get(name),
            None => Err(RuntimeError::undefined_variable(name)),
        }
    }

    /// Overwrites an existing binding, walking outward to find it.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if self.values.borrow().contains_key(&name.lexeme) {
            self.values.borrow_mut().insert(name.lexeme.clone(), value);
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.assign(name, value),
            None => Err(RuntimeError::undefined_variable(name)),
        }
    }

    /// Reads a binding exactly `depth` scopes out, without searching.
    pub fn get_at(&self, depth: usize, name: &str) -> Option<Value> {
        if depth == 0 {
            return self.values.borrow().get(name).cloned();
        }
        self.enclosing.as_ref()?.get_at(depth - 1, name)
    }

    /// Writes a binding exactly `depth` scopes out. Returns false if the
    /// chain is shorter than the resolver believed.
    pub fn assign_at(&self, depth: usize, name: &Token, value: Value) -> bool {
        if depth == 0 {
            self.values.borrow_mut().insert(name.lexeme.clone(), value);
            return true;
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.assign_at(depth - 1, name, value),
            None => false,
        }
    }
}
