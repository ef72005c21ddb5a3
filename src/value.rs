// ABOUTME: Runtime value representation and the print-formatting rules

use crate::ast::FunctionExpr;
use crate::env::Environment;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A user-defined function or method: a closure pairing a parsed
/// declaration with the environment active when it was defined.
#[derive(Debug)]
pub struct UserFunction {
    pub name: Option<String>,
    pub declaration: Rc<FunctionExpr>,
    pub closure: Rc<Environment>,
    pub is_initializer: bool,
}

impl UserFunction {
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produces a fresh function value whose closure has `this` bound to
    /// `instance` — the "bound method" described in spec.md's glossary.
    pub fn bind(&self, instance: Rc<Instance>) -> Rc<UserFunction> {
        let env = Environment::with_parent(self.closure.clone());
        env.define("this".to_string(), Value::Instance(instance));
        Rc::new(UserFunction {
            name: self.name.clone(),
            declaration: self.declaration.clone(),
            closure: env,
            is_initializer: self.is_initializer,
        })
    }
}

pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, String>;

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: Rc<NativeFn>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<UserFunction>>,
}

impl Class {
    pub fn find_method(&self, name: &str) -> Option<Rc<UserFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.superclass
            .as_ref()
            .and_then(|super_class| super_class.find_method(name))
    }

    /// Construction arity: the `init` method's arity, or 0 if there is none.
    pub fn arity(&self) -> usize {
        self.find_method("init").map(|m| m.arity()).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<Self> {
        Rc::new(Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }

    /// Looks up a field first, then a bound method. `None` means neither
    /// exists; the caller is responsible for turning that into a
    /// "Undefined property" runtime error.
    pub fn get(self: &Rc<Self>, name: &str) -> Option<Value> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Some(value.clone());
        }
        self.class
            .find_method(name)
            .map(|method| Value::Function(method.bind(self.clone())))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Function(Rc<UserFunction>),
    Native(Rc<NativeFunction>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
}

impl Value {
    /// `nil` and `false` are falsy; everything else (including `0` and
    /// `""`) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// `nil == nil` is true, `nil == x` is false for non-nil `x`,
    /// otherwise structural equality on primitives and reference
    /// equality (`Rc::ptr_eq`) on everything else.
    pub fn is_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Nil, _) | (_, Value::Nil) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Function(func) => match &func.name {
                Some(name) => write!(f, "<fn {}>", name),
                None => write!(f, "<fn>"),
            },
            Value::Native(native) => write!(f, "<native fn {}>", native.name),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_trailing_dot() {
        assert_eq!(format!("{}", Value::Number(42.0)), "42");
        assert_eq!(format!("{}", Value::Number(0.0)), "0");
        assert_eq!(format!("{}", Value::Number(-3.0)), "-3");
    }

    #[test]
    fn fractional_numbers_print_with_decimal() {
        assert_eq!(format!("{}", Value::Number(2.5)), "2.5");
    }

    #[test]
    fn nil_and_bools_print_lox_style() {
        assert_eq!(format!("{}", Value::Nil), "nil");
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Bool(false)), "false");
    }

    #[test]
    fn strings_print_unquoted() {
        assert_eq!(format!("{}", Value::String("hi there".to_string())), "hi there");
    }

    #[test]
    fn truthiness_matches_spec() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn nil_equality_rules() {
        assert!(Value::Nil.is_equal(&Value::Nil));
        assert!(!Value::Nil.is_equal(&Value::Number(0.0)));
        assert!(!Value::Number(0.0).is_equal(&Value::Nil));
    }

    #[test]
    fn class_display_is_bare_name() {
        let class = Rc::new(Class {
            name: "Pair".to_string(),
            superclass: None,
            methods: HashMap::new(),
        });
        assert_eq!(format!("{}", Value::Class(class)), "Pair");
    }

    #[test]
    fn instance_display_matches_spec() {
        let class = Rc::new(Class {
            name: "Pair".to_string(),
            superclass: None,
            methods: HashMap::new(),
        });
        let instance = Instance::new(class);
        assert_eq!(format!("{}", Value::Instance(instance)), "Pair instance");
    }

    #[test]
    fn find_method_walks_superclass_chain() {
        let base = Rc::new(Class {
            name: "A".to_string(),
            superclass: None,
            methods: {
                let mut m = HashMap::new();
                m.insert(
                    "greet".to_string(),
                    Rc::new(UserFunction {
                        name: Some("greet".to_string()),
                        declaration: Rc::new(FunctionExpr {
                            name: None,
                            params: vec![],
                            body: vec![],
                        }),
                        closure: Environment::new(),
                        is_initializer: false,
                    }),
                );
                m
            },
        });
        let derived = Class {
            name: "B".to_string(),
            superclass: Some(base),
            methods: HashMap::new(),
        };
        assert!(derived.find_method("greet").is_some());
        assert!(derived.find_method("missing").is_none());
    }
}
