// ABOUTME: Runtime values: primitives, functions, classes, instances, natives

use crate::ast::FunctionDecl;
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::token::Token;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// The runtime domain of Lox.
///
/// Primitives compare structurally; functions, classes, and instances
/// compare by identity (`Rc::ptr_eq`).
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Native(Rc<NativeFn>),
}

impl Value {
    /// nil and false are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// The stringify rule used by `print`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                // Whole numbers print without a trailing .0
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Function(function) => write!(f, "<fn {}>", function.name()),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
            Value::Native(native) => write!(f, "<native fn {}>", native.name),
        }
    }
}

/// A user-declared function together with its captured environment.
#[derive(Debug)]
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<Environment>,
    pub is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<Environment>, is_initializer: bool) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produces a bound method: same declaration, but closing over a fresh
    /// scope in which `this` names the receiver.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        let environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this".to_string(), Value::Instance(instance));
        Function::new(
            Rc::clone(&self.declaration),
            environment,
            self.is_initializer,
        )
    }
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(name: String, methods: HashMap<String, Rc<Function>>) -> Self {
        Class { name, methods }
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        self.methods.get(name).cloned()
    }

    /// Calling a class runs its `init`, so the class's arity is init's.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<Self> {
        Rc::new(Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }

    /// Property lookup: fields shadow methods; methods come back bound to
    /// the receiver.
    pub fn get(instance: &Rc<Instance>, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = instance.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance)))));
        }

        Err(RuntimeError::new(
            name,
            format!("Undefined property: {}", name.lexeme),
        ))
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

/// A built-in function implemented in the host.
pub struct NativeFn {
    pub name: &'static str,
    pub arity: usize,
    pub function: fn(&[Value]) -> Result<Value, RuntimeError>,
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_number_display() {
        assert_eq!(format!("{}", Value::Number(42.0)), "42");
        assert_eq!(format!("{}", Value::Number(0.0)), "0");
        assert_eq!(format!("{}", Value::Number(-3.0)), "-3");
    }

    #[test]
    fn test_fractional_number_display() {
        assert_eq!(format!("{}", Value::Number(-2.5)), "-2.5");
        assert_eq!(format!("{}", Value::Number(0.125)), "0.125");
    }

    #[test]
    fn test_nil_bool_string_display() {
        assert_eq!(format!("{}", Value::Nil), "nil");
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Bool(false)), "false");
        assert_eq!(format!("{}", Value::String("ab".to_string())), "ab");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_eq!(
            Value::String("a".to_string()),
            Value::String("a".to_string())
        );
        assert_ne!(Value::Number(1.0), Value::String("1".to_string()));
    }

    #[test]
    fn test_class_identity_equality() {
        let a = Rc::new(Class::new("Point".to_string(), HashMap::new()));
        let b = Rc::new(Class::new("Point".to_string(), HashMap::new()));
        assert_eq!(Value::Class(Rc::clone(&a)), Value::Class(Rc::clone(&a)));
        assert_ne!(Value::Class(a), Value::Class(b));
    }

    #[test]
    fn test_instance_fields_shadow_methods() {
        let class = Rc::new(Class::new("Bag".to_string(), HashMap::new()));
        let instance = Instance::new(class);
        let name = Token::new(crate::token::TokenType::Identifier, "x", None, 1);

        instance.set(&name, Value::Number(9.0));
        match Instance::get(&instance, &name) {
            Ok(Value::Number(n)) => assert_eq!(n, 9.0),
            other => panic!("Expected Number(9.0), got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_property_is_runtime_error() {
        let class = Rc::new(Class::new("Bag".to_string(), HashMap::new()));
        let instance = Instance::new(class);
        let name = Token::new(crate::token::TokenType::Identifier, "missing", None, 4);

        let error = Instance::get(&instance, &name).unwrap_err();
        assert_eq!(error.message, "Undefined property: missing");
        assert_eq!(error.line, 4);
    }

    #[test]
    fn test_empty_class_arity_is_zero() {
        let class = Class::new("Empty".to_string(), HashMap::new());
        assert_eq!(class.arity(), 0);
    }
}
