//! Name resolution for variables and procedures.
//!
//! Scopes are kept in an arena with explicit parent links. Index 0 is the
//! global scope; every procedure call pushes a scope whose parent is the
//! global one, so procedures see globals and their own parameters but never
//! the locals of whoever called them.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::ProcedureDeclaration;
use crate::interpreter::{RuntimeError, Value};

const GLOBAL_SCOPE: usize = 0;

#[derive(Debug, Clone, PartialEq, Default)]
struct Scope {
    variables: FxHashMap<String, Value>,
    parent: Option<usize>,
    procedure: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    scopes: Vec<Scope>,
    procedures: Vec<Rc<ProcedureDeclaration>>,
    procedure_index: FxHashMap<String, usize>,
    declared_variables: Vec<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            scopes: vec![Scope::default()],
            procedures: Vec::new(),
            procedure_index: FxHashMap::default(),
            declared_variables: Vec::new(),
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_procedure(
        &mut self,
        declaration: Rc<ProcedureDeclaration>,
    ) -> Result<(), RuntimeError> {
        if self.procedure_index.contains_key(&declaration.name) {
            return Err(RuntimeError::DuplicateProcedure {
                name: declaration.name.clone(),
            });
        }
        self.procedure_index
            .insert(declaration.name.clone(), self.procedures.len());
        self.procedures.push(declaration);
        Ok(())
    }

    pub fn get_procedure(&self, name: &str) -> Result<Rc<ProcedureDeclaration>, RuntimeError> {
        self.procedure_index
            .get(name)
            .map(|&index| Rc::clone(&self.procedures[index]))
            .ok_or_else(|| RuntimeError::UndefinedProcedure {
                name: name.to_string(),
            })
    }

    /// Procedure declarations in source order.
    pub fn procedures(&self) -> &[Rc<ProcedureDeclaration>] {
        &self.procedures
    }

    /// Records a variable name without binding a value to it.
    pub fn declare_variable(&mut self, name: String) {
        if !self.declared_variables.contains(&name) {
            self.declared_variables.push(name);
        }
    }

    pub fn declared_variables(&self) -> &[String] {
        &self.declared_variables
    }

    /// Updates the nearest visible binding, or creates one in the current scope.
    pub fn set_variable(&mut self, name: &str, value: Value) {
        let target = self.resolve(name).unwrap_or(self.current_scope());
        self.scopes[target].variables.insert(name.to_string(), value);
    }

    pub fn get_variable(&self, name: &str) -> Result<Value, RuntimeError> {
        self.resolve(name)
            .and_then(|index| self.scopes[index].variables.get(name).cloned())
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Opens the scope for one call of `declaration`.
    ///
    /// Parameters are bound positionally and the procedure's own name is
    /// pre-bound to `0` as its result slot; a parameter with the same name
    /// replaces that slot. The scope is dropped together with the returned guard.
    pub fn call_scope(
        &mut self,
        declaration: &ProcedureDeclaration,
        args: Vec<Value>,
    ) -> Result<CallScope<'_>, RuntimeError> {
        if declaration.params.len() != args.len() {
            return Err(RuntimeError::ArityMismatch {
                name: declaration.name.clone(),
                expected: declaration.params.len(),
                found: args.len(),
            });
        }

        let mut scope = Scope {
            variables: FxHashMap::default(),
            parent: Some(GLOBAL_SCOPE),
            procedure: Some(declaration.name.clone()),
        };
        scope
            .variables
            .insert(declaration.name.clone(), Value::Integer(0));
        for (param, value) in declaration.params.iter().zip(args) {
            scope.variables.insert(param.clone(), value);
        }
        self.scopes.push(scope);

        Ok(CallScope { environment: self })
    }

    /// Name of the procedure whose call owns the current scope, if any.
    pub fn current_procedure(&self) -> Option<&str> {
        self.scopes[self.current_scope()].procedure.as_deref()
    }

    /// Number of live scopes, global included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn current_scope(&self) -> usize {
        self.scopes.len() - 1
    }

    fn resolve(&self, name: &str) -> Option<usize> {
        let mut index = Some(self.current_scope());
        while let Some(current) = index {
            let scope = &self.scopes[current];
            if scope.variables.contains_key(name) {
                return Some(current);
            }
            index = scope.parent;
        }
        None
    }
}

/// Guard for a procedure-call scope; the scope is popped when it drops.
pub struct CallScope<'a> {
    environment: &'a mut Environment,
}

impl CallScope<'_> {
    /// Current value of the procedure's result slot.
    pub fn result(&self) -> Value {
        self.current_procedure()
            .and_then(|name| self.get_variable(name).ok())
            .unwrap_or(Value::Integer(0))
    }
}

impl Deref for CallScope<'_> {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        self.environment
    }
}

impl DerefMut for CallScope<'_> {
    fn deref_mut(&mut self) -> &mut Environment {
        self.environment
    }
}

impl Drop for CallScope<'_> {
    fn drop(&mut self) {
        if self.environment.scopes.len() > 1 {
            self.environment.scopes.pop();
        }
    }
}
