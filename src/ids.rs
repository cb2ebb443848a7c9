use crate::error::{DashError, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Separator placed between the owner name and the logical name
pub const SEPARATOR: &str = "__";

lazy_static! {
    static ref NAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap();
}

/// Builds the globally unique id for a logical name owned by `owner`
///
/// # Examples
/// ```
/// assert_eq!(dashkit::ids::global_id("chartA", "main"), "chartA__main");
/// ```
pub fn global_id(owner: &str, logical: &str) -> String {
    format!("{}{}{}", owner, SEPARATOR, logical)
}

/// Checks that a name can be embedded in a component id
///
/// Names must start with an ASCII letter or digit, contain only
/// letters, digits, `_` and `-`, and never contain the separator.
pub fn validate_name(name: &str) -> Result<()> {
    if !NAME_REGEX.is_match(name) {
        return Err(DashError::InvalidName {
            name: name.to_string(),
            reason: "expected [A-Za-z0-9][A-Za-z0-9_-]*",
        });
    }
    if name.contains(SEPARATOR) {
        return Err(DashError::InvalidName {
            name: name.to_string(),
            reason: "must not contain '__'",
        });
    }
    Ok(())
}

/// Maps the logical names of one module instance to global ids
///
/// Entries are never removed or rewritten once registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdRegistry {
    owner: String,
    ids: BTreeMap<String, String>,
}

impl IdRegistry {
    /// Creates a standalone registry, outside of any namespace
    pub fn new(owner: &str) -> Result<Self> {
        if owner.is_empty() {
            return Err(DashError::MissingName("id registry"));
        }
        validate_name(owner)?;
        Ok(IdRegistry {
            owner: owner.to_string(),
            ids: BTreeMap::new(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Registers logical names and returns the mapping for exactly those names
    ///
    /// Registering a name twice returns the id issued the first time.
    pub fn register<S: AsRef<str>>(&mut self, names: &[S]) -> Result<BTreeMap<String, String>> {
        let mut mapping = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            validate_name(name)?;
            let id = self
                .ids
                .entry(name.to_string())
                .or_insert_with(|| global_id(&self.owner, name))
                .clone();
            mapping.insert(name.to_string(), id);
        }
        Ok(mapping)
    }

    /// Looks up the global id of a registered logical name
    pub fn resolve(&self, name: &str) -> Result<&str> {
        self.ids
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DashError::UnknownName {
                owner: self.owner.clone(),
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    /// All registered (logical, global) pairs, ordered by logical name
    pub fn ids(&self) -> &BTreeMap<String, String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Application-wide record of claimed owners and issued ids
///
/// One namespace is created per application and handed to every module
/// during initialization. It is only mutated while the application is being
/// assembled.
#[derive(Debug, Default)]
pub struct IdNamespace {
    owners: HashSet<String>,
    issued: HashSet<String>,
}

impl IdNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims an owner name and returns an empty registry for it
    pub fn claim(&mut self, owner: &str) -> Result<IdRegistry> {
        let registry = IdRegistry::new(owner)?;
        if !self.owners.insert(owner.to_string()) {
            return Err(DashError::DuplicateId(owner.to_string()));
        }
        debug!("claimed id owner '{}'", owner);
        Ok(registry)
    }

    /// Registers names into `registry`, recording every new id in the namespace
    pub fn register<S: AsRef<str>>(
        &mut self,
        registry: &mut IdRegistry,
        names: &[S],
    ) -> Result<BTreeMap<String, String>> {
        if !self.owners.contains(registry.owner()) {
            return Err(DashError::UnknownName {
                owner: "namespace".to_string(),
                name: registry.owner().to_string(),
            });
        }
        for name in names {
            let name = name.as_ref();
            validate_name(name)?;
            let id = global_id(registry.owner(), name);
            if !registry.contains(name) && self.issued.contains(&id) {
                return Err(DashError::DuplicateId(id));
            }
        }
        let mapping = registry.register(names)?;
        self.issued.extend(mapping.values().cloned());
        Ok(mapping)
    }

    /// Claims `owner` and registers `names` in one step
    pub fn claim_with<S: AsRef<str>>(&mut self, owner: &str, names: &[S]) -> Result<IdRegistry> {
        let mut registry = self.claim(owner)?;
        self.register(&mut registry, names)?;
        Ok(registry)
    }

    pub fn is_claimed(&self, owner: &str) -> bool {
        self.owners.contains(owner)
    }

    pub fn is_issued(&self, id: &str) -> bool {
        self.issued.contains(id)
    }

    /// Number of ids issued so far
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
