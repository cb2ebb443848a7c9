use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{DashError, Result};

/// A (component id, property) pair a callback reads or writes
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    pub property: String,
}

impl Dependency {
    pub fn new(id: &str, property: &str) -> Self {
        Self {
            id: id.to_string(),
            property: property.to_string(),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.property)
    }
}

/// Shorthand for building dependency lists
///
/// # Examples
/// ```
/// let deps = dashkit::callbacks::deps(&[("chart", "figure"), ("status", "children")]);
/// assert_eq!(deps[1].to_string(), "status.children");
/// ```
pub fn deps(pairs: &[(&str, &str)]) -> Vec<Dependency> {
    pairs.iter().map(|(id, prop)| Dependency::new(id, prop)).collect()
}

/// One produced value, addressed by component id and property
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    pub id: String,
    pub property: String,
    pub value: Value,
}

impl OutputValue {
    pub fn new(id: &str, property: &str, value: impl Into<Value>) -> Self {
        Self {
            id: id.to_string(),
            property: property.to_string(),
            value: value.into(),
        }
    }

    fn dependency(&self) -> Dependency {
        Dependency::new(&self.id, &self.property)
    }
}

type PropertyMap = BTreeMap<String, BTreeMap<String, Value>>;

/// Callback arguments regrouped as `component_id -> {property: value}`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallbackArgs {
    pub inputs: PropertyMap,
    pub state: PropertyMap,
}

impl CallbackArgs {
    pub fn input(&self, id: &str, property: &str) -> Result<&Value> {
        lookup(&self.inputs, id, property)
    }

    pub fn state(&self, id: &str, property: &str) -> Result<&Value> {
        lookup(&self.state, id, property)
    }
}

fn lookup<'a>(map: &'a PropertyMap, id: &str, property: &str) -> Result<&'a Value> {
    map.get(id)
        .and_then(|props| props.get(property))
        .ok_or_else(|| DashError::UnknownName {
            owner: id.to_string(),
            name: property.to_string(),
        })
}

fn group(declared: &[Dependency], values: &[Value]) -> PropertyMap {
    let mut map = PropertyMap::new();
    for (dep, value) in declared.iter().zip(values) {
        map.entry(dep.id.clone())
            .or_default()
            .insert(dep.property.clone(), value.clone());
    }
    map
}

/// Rebuilds nested input and state maps from flat positional arguments
///
/// `args` holds the input values followed by the state values, in
/// declaration order.
///
/// # Arguments
/// * `inputs` - Declared inputs of the callback
/// * `state` - Declared state of the callback
/// * `args` - Positional values as the browser sent them
///
/// # Returns
/// * `Ok(CallbackArgs)` - `{id: {property: value}}` maps for inputs and state
/// * `Err(DashError::ArgumentCountMismatch)` - `args` is not as long as
///   `inputs` and `state` together
pub fn map_args(inputs: &[Dependency], state: &[Dependency], args: &[Value]) -> Result<CallbackArgs> {
    let expected = inputs.len() + state.len();
    if args.len() != expected {
        return Err(DashError::ArgumentCountMismatch {
            expected,
            actual: args.len(),
        });
    }
    let (input_values, state_values) = args.split_at(inputs.len());
    Ok(CallbackArgs {
        inputs: group(inputs, input_values),
        state: group(state, state_values),
    })
}

/// Pairs flat output values with their declared outputs
pub fn map_outputs(outputs: &[Dependency], values: Vec<Value>) -> Result<Vec<OutputValue>> {
    if values.len() != outputs.len() {
        return Err(DashError::OutputCountMismatch {
            expected: outputs.len(),
            actual: values.len(),
        });
    }
    Ok(outputs
        .iter()
        .zip(values)
        .map(|(dep, value)| OutputValue {
            id: dep.id.clone(),
            property: dep.property.clone(),
            value,
        })
        .collect())
}

/// Reorders output triples into the declared output order
///
/// The triples must cover the declared outputs exactly: same count and
/// every declared pair present once. Anything else is rejected whole.
///
/// # Arguments
/// * `outputs` - Declared outputs of the callback, in declaration order
/// * `triples` - `(id, property, value)` triples in any order
///
/// # Returns
/// * `Ok(Vec<Value>)` - One value per declared output, in declaration order
/// * `Err(DashError::OutputCountMismatch)` - Wrong number of triples
/// * `Err(DashError::OutputMismatch)` - A pair is undeclared, duplicated or missing
pub fn unmap_outputs(outputs: &[Dependency], triples: Vec<OutputValue>) -> Result<Vec<Value>> {
    if triples.len() != outputs.len() {
        return Err(DashError::OutputCountMismatch {
            expected: outputs.len(),
            actual: triples.len(),
        });
    }
    let mismatch = |dep: &Dependency, problem| DashError::OutputMismatch {
        pair: dep.to_string(),
        problem,
    };
    let mut by_dep: HashMap<Dependency, Value> = HashMap::with_capacity(triples.len());
    for triple in triples {
        let dep = triple.dependency();
        if !outputs.contains(&dep) {
            return Err(mismatch(&dep, "not declared"));
        }
        if by_dep.contains_key(&dep) {
            return Err(mismatch(&dep, "duplicated"));
        }
        by_dep.insert(dep, triple.value);
    }
    outputs
        .iter()
        .map(|dep| by_dep.remove(dep).ok_or_else(|| mismatch(dep, "missing")))
        .collect()
}

/// Declared outputs, inputs and state of one callback
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackSpec {
    pub outputs: Vec<Dependency>,
    pub inputs: Vec<Dependency>,
    #[serde(default)]
    pub state: Vec<Dependency>,
}

impl CallbackSpec {
    pub fn new(outputs: Vec<Dependency>, inputs: Vec<Dependency>) -> Self {
        Self {
            outputs,
            inputs,
            state: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: Vec<Dependency>) -> Self {
        self.state = state;
        self
    }

    /// Key identifying the callback by its outputs
    pub fn key(&self) -> String {
        output_key(&self.outputs)
    }

    /// Every component id the callback refers to
    pub fn component_ids(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .chain(&self.inputs)
            .chain(&self.state)
            .map(|dep| dep.id.as_str())
    }
}

/// `id.prop` entries joined with `...`, the key used by the browser
pub fn output_key(outputs: &[Dependency]) -> String {
    outputs
        .iter()
        .map(Dependency::to_string)
        .collect::<Vec<_>>()
        .join("...")
}

/// Handle returned by [`CallbackRegistry::register`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackHandle(usize);

impl CallbackHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Callback body: receives the mapped arguments, returns output triples
pub type Handler = Arc<dyn Fn(&CallbackArgs) -> Result<Vec<OutputValue>> + Send + Sync>;

struct Registered {
    spec: CallbackSpec,
    handler: Handler,
}

/// Explicitly registered callbacks, in registration order
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: Vec<Registered>,
    by_key: HashMap<String, CallbackHandle>,
    owned_outputs: HashMap<Dependency, CallbackHandle>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback and returns its handle
    ///
    /// Each output property may be written by one callback only.
    pub fn register<F>(&mut self, spec: CallbackSpec, handler: F) -> Result<CallbackHandle>
    where
        F: Fn(&CallbackArgs) -> Result<Vec<OutputValue>> + Send + Sync + 'static,
    {
        if spec.outputs.is_empty() {
            return Err(DashError::Config("callback declares no outputs".to_string()));
        }
        for (i, dep) in spec.outputs.iter().enumerate() {
            if self.owned_outputs.contains_key(dep) || spec.outputs[..i].contains(dep) {
                return Err(DashError::DuplicateId(dep.to_string()));
            }
        }
        let handle = CallbackHandle(self.callbacks.len());
        for dep in &spec.outputs {
            self.owned_outputs.insert(dep.clone(), handle);
        }
        self.by_key.insert(spec.key(), handle);
        debug!("registered callback {} as #{}", spec.key(), handle.0);
        self.callbacks.push(Registered {
            spec,
            handler: Arc::new(handler),
        });
        Ok(handle)
    }

    pub fn spec(&self, handle: CallbackHandle) -> Option<&CallbackSpec> {
        self.callbacks.get(handle.0).map(|r| &r.spec)
    }

    /// Specs of every registered callback, in registration order
    pub fn specs(&self) -> impl Iterator<Item = &CallbackSpec> {
        self.callbacks.iter().map(|r| &r.spec)
    }

    pub fn find(&self, outputs: &[Dependency]) -> Option<CallbackHandle> {
        self.by_key.get(&output_key(outputs)).copied()
    }

    /// Runs a callback on flat positional arguments
    ///
    /// Returns the produced values ordered as the declared outputs.
    pub fn dispatch(&self, handle: CallbackHandle, args: &[Value]) -> Result<Vec<Value>> {
        let registered = self
            .callbacks
            .get(handle.0)
            .ok_or_else(|| DashError::UnknownCallback(format!("#{}", handle.0)))?;
        let spec = &registered.spec;
        let mapped = map_args(&spec.inputs, &spec.state, args)?;
        let triples = (registered.handler)(&mapped)?;
        unmap_outputs(&spec.outputs, triples)
    }

    pub fn dispatch_by_outputs(&self, outputs: &[Dependency], args: &[Value]) -> Result<Vec<Value>> {
        let handle = self
            .find(outputs)
            .ok_or_else(|| DashError::UnknownCallback(output_key(outputs)))?;
        self.dispatch(handle, args)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.callbacks.iter().map(|r| r.spec.key()))
            .finish()
    }
}
