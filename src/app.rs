use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::cache::FileCache;
use crate::callbacks::{CallbackRegistry, CallbackSpec, Dependency};
use crate::component::Component;
use crate::config::DashConfig;
use crate::error::{DashError, Result};
use crate::ids::IdNamespace;
use crate::module::{DashModule, Module};

/// A property value sent by the browser with an update request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub id: String,
    pub property: String,
    #[serde(default)]
    pub value: Value,
}

impl PropertyValue {
    pub fn new(id: &str, property: &str, value: impl Into<Value>) -> Self {
        Self {
            id: id.to_string(),
            property: property.to_string(),
            value: value.into(),
        }
    }
}

/// Body of a callback update request
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub outputs: Vec<Dependency>,
    pub inputs: Vec<PropertyValue>,
    #[serde(default)]
    pub state: Vec<PropertyValue>,
}

/// Body of a callback update response
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub multi: bool,
    pub response: BTreeMap<String, BTreeMap<String, Value>>,
    /// Static HTML of every `children` output holding a component
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rendered: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateResponse {
    fn insert(&mut self, dep: &Dependency, value: Value) {
        if dep.property == "children" {
            if let Ok(component) = serde_json::from_value::<Component>(value.clone()) {
                self.rendered.insert(dep.id.clone(), component.to_html());
            }
        }
        self.response
            .entry(dep.id.clone())
            .or_default()
            .insert(dep.property.clone(), value);
    }

    pub fn value(&self, id: &str, property: &str) -> Option<&Value> {
        self.response.get(id).and_then(|props| props.get(property))
    }
}

/// Orders provided values as `declared`, accepting any permutation
fn order_args(declared: &[Dependency], provided: &[PropertyValue]) -> Result<Vec<Value>> {
    if declared.len() != provided.len() {
        return Err(DashError::ArgumentCountMismatch {
            expected: declared.len(),
            actual: provided.len(),
        });
    }
    declared
        .iter()
        .map(|dep| {
            provided
                .iter()
                .find(|p| p.id == dep.id && p.property == dep.property)
                .map(|p| p.value.clone())
                .ok_or_else(|| DashError::UnknownName {
                    owner: dep.id.clone(),
                    name: dep.property.clone(),
                })
        })
        .collect()
}

/// A fully assembled dashboard application
///
/// Built once at startup; read-only while serving.
pub struct App {
    config: DashConfig,
    root: Module,
    registry: CallbackRegistry,
    layout: Component,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("title", &self.config.title)
            .field("root", &self.root)
            .field("callbacks", &self.registry.len())
            .finish()
    }
}

impl App {
    /// Initializes the root module, wires its callbacks and checks that
    /// every callback refers to a component that can be rendered
    ///
    /// # Arguments
    /// * `config` - Application settings; its url base is handed to every
    ///   navigation shell that did not set its own
    /// * `root` - Top-level module, usually a [`NavigationShell`](crate::nav::NavigationShell)
    ///
    /// # Returns
    /// * `Ok(App)` - Ready to serve; the layout is computed once here
    /// * `Err(DashError)` - A configuration error: invalid settings, a
    ///   duplicate owner or id, or a callback naming an unknown component
    pub fn build(config: DashConfig, root: impl Into<Module>) -> Result<Self> {
        config.validate()?;
        let mut root = root.into();
        root.configure(&config)?;
        let mut namespace = IdNamespace::new();
        root.initialize(&mut namespace)?;

        let mut registry = CallbackRegistry::new();
        let handles = root.register_callbacks(&mut registry)?;

        let mut known = HashSet::new();
        for id in root.known_ids() {
            if !known.insert(id.clone()) {
                return Err(DashError::DuplicateId(id));
            }
        }
        for spec in registry.specs() {
            if let Some(id) = spec.component_ids().find(|id| !known.contains(*id)) {
                return Err(DashError::Config(format!(
                    "callback {} refers to unknown component '{}'",
                    spec.key(),
                    id
                )));
            }
        }

        let layout = root.layout();
        info!(
            "built '{}': {} ids, {} callbacks",
            root.name(),
            known.len(),
            handles.len()
        );
        Ok(Self {
            config,
            root,
            registry,
            layout,
        })
    }

    pub fn config(&self) -> &DashConfig {
        &self.config
    }

    pub fn root(&self) -> &Module {
        &self.root
    }

    pub fn layout(&self) -> &Component {
        &self.layout
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.registry
    }

    /// Declared dependencies of every callback, for the browser
    pub fn dependencies(&self) -> Vec<CallbackSpec> {
        self.registry.specs().cloned().collect()
    }

    /// Cache configured for this application
    pub fn cache(&self) -> Result<FileCache> {
        Ok(FileCache::open(&self.config.cache_dir)?.with_max_age(self.config.cache_max_age_secs))
    }

    /// Runs the callback owning `request.outputs`
    pub fn try_update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let handle = self
            .registry
            .find(&request.outputs)
            .ok_or_else(|| DashError::UnknownCallback(crate::callbacks::output_key(&request.outputs)))?;
        let spec = self
            .registry
            .spec(handle)
            .ok_or_else(|| DashError::UnknownCallback(format!("#{}", handle.index())))?;

        let mut args = order_args(&spec.inputs, &request.inputs)?;
        args.extend(order_args(&spec.state, &request.state)?);
        let values = self.registry.dispatch(handle, &args)?;

        let mut response = UpdateResponse {
            multi: true,
            ..UpdateResponse::default()
        };
        for (dep, value) in spec.outputs.iter().zip(values) {
            response.insert(dep, value);
        }
        Ok(response)
    }

    /// Like [`App::try_update`], but failures become an error payload in
    /// every `children` output instead of an `Err`
    pub fn update(&self, request: &UpdateRequest) -> UpdateResponse {
        match self.try_update(request) {
            Ok(response) => response,
            Err(e) => {
                let key = crate::callbacks::output_key(&request.outputs);
                if e.is_recoverable() {
                    warn!("callback {} failed: {}", key, e);
                } else {
                    error!("callback {} failed: {}", key, e);
                }
                let message = e.to_string();
                let mut response = UpdateResponse {
                    multi: true,
                    error: Some(message.clone()),
                    ..UpdateResponse::default()
                };
                for dep in request.outputs.iter().filter(|d| d.property == "children") {
                    response.insert(dep, Component::error(&message).to_value());
                }
                response
            }
        }
    }
}
