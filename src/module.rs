use std::fmt;
use std::sync::Arc;

use crate::callbacks::{CallbackHandle, CallbackRegistry};
use crate::component::Component;
use crate::config::DashConfig;
use crate::error::Result;
use crate::ids::{IdNamespace, IdRegistry};
use crate::nav::NavigationShell;

/// A reusable fragment of dashboard UI plus its callbacks
///
/// Modules go through these steps while an application is assembled:
/// `configure` adopts the application settings, `initialize` claims ids
/// from the namespace, `layout` produces the render tree and
/// `register_callbacks` wires the callbacks against the registry.
pub trait DashModule: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Adopts application-wide settings; runs before `initialize`
    fn configure(&mut self, _config: &DashConfig) -> Result<()> {
        Ok(())
    }

    fn initialize(&mut self, namespace: &mut IdNamespace) -> Result<()>;

    fn layout(&self) -> Component;

    fn register_callbacks(&self, registry: &mut CallbackRegistry) -> Result<Vec<CallbackHandle>>;

    /// Ids this module may ever render, including ids of content that is
    /// only swapped in later
    fn known_ids(&self) -> Vec<String> {
        self.layout().ids().into_iter().map(str::to_string).collect()
    }
}

type PlainProducer = Arc<dyn Fn() -> Component + Send + Sync>;
type NamespacedProducer = Arc<dyn Fn(&IdRegistry) -> Component + Send + Sync>;

enum Producer {
    Plain(PlainProducer),
    Namespaced {
        owner: String,
        names: Vec<String>,
        ids: Option<IdRegistry>,
        produce: NamespacedProducer,
    },
}

/// Static page: a layout and no callbacks of its own
pub struct Page {
    title: String,
    producer: Producer,
}

impl Page {
    pub fn new<F>(title: &str, produce: F) -> Self
    where
        F: Fn() -> Component + Send + Sync + 'static,
    {
        Self {
            title: title.to_string(),
            producer: Producer::Plain(Arc::new(produce)),
        }
    }

    /// Page whose layout refers to ids namespaced under `owner`
    pub fn namespaced<F>(title: &str, owner: &str, names: &[&str], produce: F) -> Self
    where
        F: Fn(&IdRegistry) -> Component + Send + Sync + 'static,
    {
        Self {
            title: title.to_string(),
            producer: Producer::Namespaced {
                owner: owner.to_string(),
                names: names.iter().map(|n| n.to_string()).collect(),
                ids: None,
                produce: Arc::new(produce),
            },
        }
    }

    /// Page rendering a markdown document
    pub fn markdown(title: &str, source: &str) -> Self {
        let source = source.to_string();
        Self::new(title, move || Component::markdown(&source))
    }
}

impl DashModule for Page {
    fn name(&self) -> &str {
        &self.title
    }

    fn initialize(&mut self, namespace: &mut IdNamespace) -> Result<()> {
        if let Producer::Namespaced {
            owner, names, ids, ..
        } = &mut self.producer
        {
            *ids = Some(namespace.claim_with(owner, names.as_slice())?);
        }
        Ok(())
    }

    fn layout(&self) -> Component {
        match &self.producer {
            Producer::Plain(produce) => produce(),
            Producer::Namespaced {
                ids: Some(ids),
                produce,
                ..
            } => produce(ids),
            Producer::Namespaced { ids: None, .. } => Component::error(&format!(
                "page '{}' was rendered before initialization",
                self.title
            )),
        }
    }

    fn register_callbacks(&self, _registry: &mut CallbackRegistry) -> Result<Vec<CallbackHandle>> {
        Ok(Vec::new())
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page").field("title", &self.title).finish()
    }
}

/// The kinds of module an application is composed of
pub enum Module {
    Page(Page),
    Shell(NavigationShell),
    Custom(Box<dyn DashModule>),
}

impl Module {
    pub fn custom(module: impl DashModule + 'static) -> Self {
        Module::Custom(Box::new(module))
    }

    fn inner(&self) -> &dyn DashModule {
        match self {
            Module::Page(page) => page,
            Module::Shell(shell) => shell,
            Module::Custom(module) => module.as_ref(),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DashModule {
        match self {
            Module::Page(page) => page,
            Module::Shell(shell) => shell,
            Module::Custom(module) => module.as_mut(),
        }
    }
}

impl DashModule for Module {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn configure(&mut self, config: &DashConfig) -> Result<()> {
        self.inner_mut().configure(config)
    }

    fn initialize(&mut self, namespace: &mut IdNamespace) -> Result<()> {
        self.inner_mut().initialize(namespace)
    }

    fn layout(&self) -> Component {
        self.inner().layout()
    }

    fn register_callbacks(&self, registry: &mut CallbackRegistry) -> Result<Vec<CallbackHandle>> {
        self.inner().register_callbacks(registry)
    }

    fn known_ids(&self) -> Vec<String> {
        self.inner().known_ids()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Module::Page(page) => fmt::Debug::fmt(page, f),
            Module::Shell(shell) => fmt::Debug::fmt(shell, f),
            Module::Custom(module) => f.debug_tuple("Custom").field(&module.name()).finish(),
        }
    }
}

impl From<Page> for Module {
    fn from(page: Page) -> Self {
        Module::Page(page)
    }
}

impl From<NavigationShell> for Module {
    fn from(shell: NavigationShell) -> Self {
        Module::Shell(shell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_page_needs_no_namespace() {
        let mut page = Page::new("Home", || Component::heading(1, "Home"));
        page.initialize(&mut IdNamespace::new()).unwrap();
        assert_eq!(page.layout().text_content(), "Home");
        assert_eq!(page.name(), "Home");
    }

    #[test]
    fn namespaced_page_claims_its_owner() {
        let mut ns = IdNamespace::new();
        let mut page = Page::namespaced("Chart", "chartA", &["main"], |ids| {
            Component::new("Div").with_id(ids.resolve("main").unwrap_or("main"))
        });
        assert!(page.layout().is_error());
        page.initialize(&mut ns).unwrap();
        assert_eq!(page.layout().id.as_deref(), Some("chartA__main"));
        assert_eq!(page.known_ids(), vec!["chartA__main".to_string()]);
        assert!(ns.is_claimed("chartA"));
    }

    #[test]
    fn module_delegates_to_variant() {
        let mut module: Module = Page::markdown("Docs", "# Docs").into();
        module.initialize(&mut IdNamespace::new()).unwrap();
        assert_eq!(module.name(), "Docs");
        assert_eq!(module.layout().kind, "Markdown");
        let mut registry = CallbackRegistry::new();
        assert!(module.register_callbacks(&mut registry).unwrap().is_empty());
    }
}
