// ABOUTME: Environment chain for variable bindings, with depth-indexed access

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a new child environment with a parent.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Produces a fresh child environment of `self`.
    pub fn extend(self: &Rc<Self>) -> Rc<Self> {
        Environment::with_parent(self.clone())
    }

    /// Unconditional insert into this scope's map. Redefinition at the
    /// same scope is permitted (this is how the REPL can re-declare a
    /// top-level `var`).
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Looks up `name` in this scope, then walks enclosing scopes.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Assigns to an existing binding, walking enclosing scopes. Returns
    /// `false` if `name` is not bound anywhere in the chain.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    fn ancestor(&self, distance: usize) -> &Environment {
        let mut env = self;
        for _ in 0..distance {
            env = env
                .parent
                .as_deref()
                .expect("resolver-computed depth exceeds environment chain: engine bug");
        }
        env
    }

    /// Walks exactly `depth` parent links, then reads from that scope's
    /// map directly (no further fallback). The depth is trusted output
    /// from the resolver; a missing binding at that depth is an engine bug.
    pub fn get_at(&self, depth: usize, name: &str) -> Value {
        self.ancestor(depth)
            .bindings
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| {
                panic!(
                    "resolved depth {} has no binding for '{}': engine bug",
                    depth, name
                )
            })
    }

    /// Walks exactly `depth` parent links, then writes into that scope's
    /// map directly.
    pub fn assign_at(&self, depth: usize, name: &str, value: Value) {
        self.ancestor(depth)
            .bindings
            .borrow_mut()
            .insert(name.to_string(), value);
    }
}
