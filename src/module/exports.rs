//! Module exports
//!
//! What a module's factory returns: a named set of members, each a callable
//! function, a JSON value, or a nested namespace. Members are addressed by
//! dot-paths (`bar.baz`), which descend through namespaces and JSON objects.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::module::traits::ModuleError;

/// Callable module member
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, ModuleError> + Send + Sync>;

/// A single exported member
#[derive(Clone)]
pub enum Export {
    /// Callable member
    Function(Function),
    /// Plain data
    Value(Value),
    /// Nested members
    Namespace(Exports),
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Function(_) => f.write_str("Function(..)"),
            Export::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Export::Namespace(ns) => f.debug_tuple("Namespace").field(ns).finish(),
        }
    }
}

/// Borrowed view of a member found by path lookup
#[derive(Clone, Copy)]
pub enum Member<'a> {
    Function(&'a Function),
    Value(&'a Value),
    Namespace(&'a Exports),
}

impl Member<'_> {
    /// True if the member can be called
    pub fn is_callable(&self) -> bool {
        matches!(self, Member::Function(_))
    }
}

impl fmt::Debug for Member<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Function(_) => f.write_str("Function(..)"),
            Member::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Member::Namespace(ns) => f.debug_tuple("Namespace").field(ns).finish(),
        }
    }
}

/// Exported members of one module
///
/// Cloning is cheap; the member table is shared.
#[derive(Clone, Default)]
pub struct Exports {
    members: Arc<BTreeMap<String, Export>>,
}

impl Exports {
    /// Empty exports
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callable member
    pub fn with_function<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ModuleError> + Send + Sync + 'static,
    {
        self.with_export(name, Export::Function(Arc::new(f)))
    }

    /// Add a data member
    pub fn with_value(self, name: &str, value: Value) -> Self {
        self.with_export(name, Export::Value(value))
    }

    /// Add a nested namespace
    pub fn with_namespace(self, name: &str, namespace: Exports) -> Self {
        self.with_export(name, Export::Namespace(namespace))
    }

    /// Add (or replace) a member
    pub fn with_export(mut self, name: &str, export: Export) -> Self {
        Arc::make_mut(&mut self.members).insert(name.to_string(), export);
        self
    }

    /// Direct member by name
    pub fn get(&self, name: &str) -> Option<&Export> {
        self.members.get(name)
    }

    /// Member names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Find a member by dot-path
    pub fn lookup(&self, path: &str) -> Option<Member<'_>> {
        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty())?;

        let mut current = match self.members.get(first)? {
            Export::Function(f) => Member::Function(f),
            Export::Value(v) => Member::Value(v),
            Export::Namespace(ns) => Member::Namespace(ns),
        };

        for segment in segments {
            current = match current {
                Member::Namespace(ns) => match ns.members.get(segment)? {
                    Export::Function(f) => Member::Function(f),
                    Export::Value(v) => Member::Value(v),
                    Export::Namespace(inner) => Member::Namespace(inner),
                },
                Member::Value(Value::Object(map)) => Member::Value(map.get(segment)?),
                _ => return None,
            };
        }

        Some(current)
    }

    /// True if `path` resolves to a callable member
    pub fn has_function(&self, path: &str) -> bool {
        self.lookup(path).map_or(false, |m| m.is_callable())
    }

    /// Call the function at `path`
    pub fn call(&self, path: &str, args: &[Value]) -> Result<Value, ModuleError> {
        match self.lookup(path) {
            Some(Member::Function(f)) => f(args),
            Some(_) => Err(ModuleError::OperationError(format!(
                "Member '{}' is not callable",
                path
            ))),
            None => Err(ModuleError::OperationError(format!(
                "Member '{}' not found",
                path
            ))),
        }
    }

    /// True if both handles share the same member table
    pub fn ptr_eq(&self, other: &Exports) -> bool {
        Arc::ptr_eq(&self.members, &other.members)
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.members.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Exports {
        Exports::new()
            .with_function("foo", |_| Ok(json!("foo called")))
            .with_value("bar", json!({ "baz": 1, "qux": { "deep": true } }))
            .with_namespace(
                "inner",
                Exports::new().with_function("run", |args| Ok(json!(args.len()))),
            )
    }

    #[test]
    fn test_lookup_through_namespaces_and_json() {
        let exports = sample();
        assert!(exports.lookup("foo").unwrap().is_callable());
        assert!(matches!(exports.lookup("bar.baz"), Some(Member::Value(v)) if *v == json!(1)));
        assert!(matches!(exports.lookup("bar.qux.deep"), Some(Member::Value(v)) if *v == json!(true)));
        assert!(exports.lookup("inner.run").unwrap().is_callable());
        assert!(exports.lookup("bar.missing").is_none());
        assert!(exports.lookup("foo.bar").is_none());
        assert!(exports.lookup("").is_none());
    }

    #[test]
    fn test_call() {
        let exports = sample();
        assert_eq!(exports.call("foo", &[]).unwrap(), json!("foo called"));
        assert_eq!(exports.call("inner.run", &[json!(1), json!(2)]).unwrap(), json!(2));
        assert!(exports.call("bar", &[]).is_err());
        assert!(exports.call("nope", &[]).is_err());
    }

    #[test]
    fn test_clone_shares_members() {
        let exports = sample();
        let clone = exports.clone();
        assert!(exports.ptr_eq(&clone));
        let extended = clone.with_value("extra", json!(null));
        assert!(!exports.ptr_eq(&extended));
        assert!(exports.get("extra").is_none());
        assert_eq!(extended.len(), 4);
    }
}
