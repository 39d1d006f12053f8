//! Reactive state - a value tree where every write is observed.
//!
//! [`ReactiveState`] owns the data. [`StateRef`] is a path-addressed view
//! into it: reading a container through a view yields another view, so a
//! write at any depth (`state.at("todos").at(2).set("done", true)`) goes
//! through the same owner and fires the same notifier.
//!
//! Views are cheap and not identity-stable: two reads of the same nested key
//! give two equal views, not the same one.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::StateError;
use crate::types::{PathKey, Value, display_path};

/// Change callback installed by the owning component.
pub type Notify = Rc<dyn Fn()>;

struct StateCell {
    data: RefCell<Value>,
    notify: RefCell<Option<Notify>>,
}

/// Owner of one component's reactive data.
#[derive(Clone)]
pub struct ReactiveState {
    cell: Rc<StateCell>,
}

impl ReactiveState {
    /// Wrap `initial`. The value is moved in; callers holding a default keep
    /// their own deep copy.
    pub fn new(initial: Value) -> Self {
        Self {
            cell: Rc::new(StateCell {
                data: RefCell::new(initial),
                notify: RefCell::new(None),
            }),
        }
    }

    /// Install the callback fired after every write.
    pub fn set_notifier(&self, notify: Notify) {
        *self.cell.notify.borrow_mut() = Some(notify);
    }

    /// Deep copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.cell.data.borrow().clone()
    }

    /// View of the root object.
    pub fn root(&self) -> StateRef {
        StateRef {
            state: self.clone(),
            path: Vec::new(),
        }
    }

    /// True if both handles own the same data.
    pub fn ptr_eq(&self, other: &ReactiveState) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.cell.data.borrow())
    }

    fn write<R>(&self, f: impl FnOnce(&mut Value) -> Result<R, StateError>) -> Result<R, StateError> {
        let result = f(&mut self.cell.data.borrow_mut())?;
        // Clone out before calling so the notifier may read or write state.
        let notify = self.cell.notify.borrow().clone();
        if let Some(notify) = notify {
            notify();
        }
        Ok(result)
    }
}

impl fmt::Debug for ReactiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReactiveState")
            .field(&*self.cell.data.borrow())
            .finish()
    }
}

// =============================================================================
// Views
// =============================================================================

/// Result of reading one key through a view.
#[derive(Debug, Clone)]
pub enum Entry {
    /// Scalars come back by value.
    Primitive(Value),
    /// Arrays and objects come back as a writable view.
    Container(StateRef),
}

impl Entry {
    /// Snapshot the entry as a plain value.
    pub fn value(&self) -> Value {
        match self {
            Entry::Primitive(value) => value.clone(),
            Entry::Container(view) => view.value(),
        }
    }

    /// The view, if the entry is a container.
    pub fn as_container(&self) -> Option<&StateRef> {
        match self {
            Entry::Container(view) => Some(view),
            Entry::Primitive(_) => None,
        }
    }
}

/// Path-addressed view into a [`ReactiveState`].
#[derive(Clone)]
pub struct StateRef {
    state: ReactiveState,
    path: Vec<PathKey>,
}

impl StateRef {
    /// Path of this view from the root.
    pub fn path(&self) -> &[PathKey] {
        &self.path
    }

    /// Owning state.
    pub fn state(&self) -> &ReactiveState {
        &self.state
    }

    fn child_path(&self, key: PathKey) -> Vec<PathKey> {
        let mut path = self.path.clone();
        path.push(key);
        path
    }

    /// Snapshot of the value at this view. `undefined` if the path no longer resolves.
    pub fn value(&self) -> Value {
        self.state.read(|data| data.get_path(&self.path))
    }

    /// Read `key`. Containers come back wrapped; missing keys read as `undefined`.
    pub fn get(&self, key: impl Into<PathKey>) -> Entry {
        let key = key.into();
        let value = self.state.read(|data| data.get_path(&self.path).get(&key));
        if value.is_container() {
            Entry::Container(StateRef {
                state: self.state.clone(),
                path: self.child_path(key),
            })
        } else {
            Entry::Primitive(value)
        }
    }

    /// Read `key` as a plain value.
    pub fn get_value(&self, key: impl Into<PathKey>) -> Value {
        let key = key.into();
        self.state.read(|data| data.get_path(&self.path).get(&key))
    }

    /// View of `key` without checking that it exists.
    pub fn at(&self, key: impl Into<PathKey>) -> StateRef {
        StateRef {
            state: self.state.clone(),
            path: self.child_path(key.into()),
        }
    }

    /// Write `key`. Every write notifies, even when the value is unchanged.
    pub fn set(&self, key: impl Into<PathKey>, value: impl Into<Value>) -> Result<(), StateError> {
        let path = self.child_path(key.into());
        let value = value.into();
        self.state.write(|data| data.set_path(&path, value))
    }

    /// Write a path relative to this view.
    pub fn assign_path(&self, relative: &[PathKey], value: Value) -> Result<(), StateError> {
        let mut path = self.path.clone();
        path.extend(relative.iter().cloned());
        self.state.write(|data| data.set_path(&path, value))
    }

    /// Replace the value at this view.
    pub fn replace(&self, value: impl Into<Value>) -> Result<(), StateError> {
        let value = value.into();
        if self.path.is_empty() {
            return self.state.write(|data| {
                *data = value;
                Ok(())
            });
        }
        self.state.write(|data| data.set_path(&self.path, value))
    }

    /// Mutate the value at this view in place, then notify.
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> Result<R, StateError> {
        self.state.write(|data| {
            let target = resolve_mut(data, &self.path)?;
            Ok(f(target))
        })
    }

    /// Append to the array at this view. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize, StateError> {
        let value = value.into();
        self.with_array(|items| {
            items.push(value);
            items.len()
        })
    }

    /// Remove the last element of the array at this view.
    pub fn pop(&self) -> Result<Value, StateError> {
        self.with_array(|items| items.pop().unwrap_or_default())
    }

    /// Remove the element at `index`, shifting later ones down.
    pub fn remove(&self, index: usize) -> Result<Value, StateError> {
        self.with_array(|items| {
            if index < items.len() {
                items.remove(index)
            } else {
                Value::Undefined
            }
        })
    }

    fn with_array<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, StateError> {
        self.state.write(|data| match resolve_mut(data, &self.path)? {
            Value::Array(items) => Ok(f(items)),
            other => Err(StateError::NotAnArray {
                path: display_path(&self.path),
                found: other.type_of(),
            }),
        })
    }

    /// Element count for arrays, key count for objects, char count for strings.
    pub fn len(&self) -> usize {
        self.state.read(|data| match data.get_path(&self.path) {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            Value::String(s) => s.chars().count(),
            _ => 0,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Object keys in insertion order (empty for non-objects).
    pub fn keys(&self) -> Vec<String> {
        self.state.read(|data| match data.get_path(&self.path) {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    /// True if `key` is present on the object at this view.
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.read(|data| {
            data.get_path(&self.path)
                .as_object()
                .is_some_and(|map| map.contains_key(key))
        })
    }
}

impl PartialEq for StateRef {
    fn eq(&self, other: &Self) -> bool {
        self.state.ptr_eq(&other.state) && self.path == other.path
    }
}

impl fmt::Debug for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRef")
            .field("path", &display_path(&self.path))
            .field("value", &self.value())
            .finish()
    }
}

fn resolve_mut<'a>(data: &'a mut Value, path: &[PathKey]) -> Result<&'a mut Value, StateError> {
    let mut current = data;
    for (depth, key) in path.iter().enumerate() {
        current = match (current, key) {
            (Value::Object(map), key) => map.get_mut(key.to_string().as_str()),
            (Value::Array(items), PathKey::Index(i)) => items.get_mut(*i),
            _ => None,
        }
        .ok_or_else(|| StateError::NotAContainer {
            path: display_path(&path[..=depth]),
            found: "undefined",
        })?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counted(initial: Value) -> (ReactiveState, Rc<Cell<usize>>) {
        let state = ReactiveState::new(initial);
        let writes = Rc::new(Cell::new(0));
        let counter = writes.clone();
        state.set_notifier(Rc::new(move || counter.set(counter.get() + 1)));
        (state, writes)
    }

    fn sample() -> Value {
        let todos = Value::from(vec![Value::from_pairs([("title", "a"), ("done", "no")])]);
        Value::from_pairs([("count", Value::from(0)), ("todos", todos)])
    }

    #[test]
    fn test_nested_reads_return_views() {
        let (state, _) = counted(sample());
        let root = state.root();
        assert!(matches!(root.get("count"), Entry::Primitive(Value::Number(n)) if n == 0.0));
        let todos = root.get("todos");
        let todos = todos.as_container().unwrap();
        assert_eq!(todos.len(), 1);
        let first = todos.get(0usize);
        assert_eq!(first.as_container().unwrap().get_value("title"), Value::from("a"));
        assert_eq!(root.get_value("missing"), Value::Undefined);
    }

    #[test]
    fn test_writes_at_any_depth_notify() {
        let (state, writes) = counted(sample());
        let root = state.root();
        root.set("count", 1).unwrap();
        root.at("todos").at(0usize).set("done", true).unwrap();
        root.at("todos").push(Value::object()).unwrap();
        root.at("todos").set("length", 1).unwrap();
        assert_eq!(writes.get(), 4);
        assert_eq!(root.at("todos").len(), 1);
        assert_eq!(
            state.snapshot().get_path(&["todos".into(), 0usize.into(), "done".into()]),
            Value::from(true)
        );
    }

    #[test]
    fn test_same_value_write_still_notifies() {
        let (state, writes) = counted(sample());
        state.root().set("count", 0).unwrap();
        state.root().set("count", 0).unwrap();
        assert_eq!(writes.get(), 2);
    }

    #[test]
    fn test_failed_write_does_not_notify() {
        let (state, writes) = counted(sample());
        assert!(state.root().at("nope").set("x", 1).is_err());
        assert!(state.root().at("count").push(1).is_err());
        assert_eq!(writes.get(), 0);
    }

    #[test]
    fn test_stale_view_reads_undefined() {
        let (state, _) = counted(sample());
        let item = state.root().at("todos").at(0usize);
        state.root().at("todos").pop().unwrap();
        assert_eq!(item.value(), Value::Undefined);
        assert!(item.set("title", "b").is_err());
    }

    #[test]
    fn test_notifier_may_read_state() {
        let state = ReactiveState::new(sample());
        let seen = Rc::new(Cell::new(-1.0));
        let (reader, sink) = (state.clone(), seen.clone());
        state.set_notifier(Rc::new(move || {
            sink.set(reader.root().get_value("count").to_number());
        }));
        state.root().set("count", 7).unwrap();
        assert_eq!(seen.get(), 7.0);
    }

    #[test]
    fn test_update_in_place() {
        let (state, writes) = counted(sample());
        let doubled = state
            .root()
            .at("count")
            .update(|v| {
                *v = Value::from(21);
                42
            })
            .unwrap();
        assert_eq!(doubled, 42);
        assert_eq!(state.root().get_value("count"), Value::from(21));
        assert_eq!(writes.get(), 1);
    }
}
