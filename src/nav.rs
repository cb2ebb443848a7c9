//! Navigation shell
//!
//! Holds an ordered collection of named pages and swaps the visible content
//! when the selector changes. The selector is a tab strip, a dropdown or the
//! browser location. Selecting a page that does not exist renders an error
//! payload naming it instead of failing.

use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::callbacks::{CallbackHandle, CallbackRegistry, CallbackSpec, Dependency, OutputValue};
use crate::component::Component;
use crate::config::DashConfig;
use crate::error::{DashError, Result};
use crate::ids::{IdNamespace, IdRegistry};
use crate::module::{DashModule, Module};

/// Control used to pick the visible page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorKind {
    Tabs,
    Dropdown,
    /// Pages are addressed by URL path
    Location,
}

impl SelectorKind {
    /// Selector property the swap callback listens to
    pub fn property(self) -> &'static str {
        match self {
            SelectorKind::Tabs | SelectorKind::Dropdown => "value",
            SelectorKind::Location => "pathname",
        }
    }
}

/// Navigation state of one client
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavState {
    /// Showing the last successfully selected page
    Idle { current: Option<String> },
    /// Producing the layout of `target`
    Rendering { target: String },
}

impl Default for NavState {
    fn default() -> Self {
        NavState::Idle { current: None }
    }
}

impl NavState {
    pub fn current(&self) -> Option<&str> {
        match self {
            NavState::Idle { current } => current.as_deref(),
            NavState::Rendering { .. } => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, NavState::Idle { .. })
    }
}

/// Result of selecting a page by name or path
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    Page { name: String, layout: Component },
    Missing { name: String, layout: Component },
}

impl Selection {
    fn missing(name: &str) -> Self {
        Selection::Missing {
            name: name.to_string(),
            layout: Component::error(&DashError::UnknownPage(name.to_string()).to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Selection::Page { name, .. } | Selection::Missing { name, .. } => name,
        }
    }

    pub fn layout(&self) -> &Component {
        match self {
            Selection::Page { layout, .. } | Selection::Missing { layout, .. } => layout,
        }
    }

    pub fn into_layout(self) -> Component {
        match self {
            Selection::Page { layout, .. } | Selection::Missing { layout, .. } => layout,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Selection::Missing { .. })
    }
}

/// URL slug of a page name: lower case, whitespace replaced by `-`
pub fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

struct PageEntry {
    module: Module,
    rendered: OnceLock<Component>,
}

impl PageEntry {
    fn layout(&self) -> &Component {
        self.rendered.get_or_init(|| self.module.layout())
    }
}

struct PageTable {
    url_base: String,
    entries: IndexMap<String, PageEntry>,
}

impl PageTable {
    fn select(&self, name: &str) -> Selection {
        match self.entries.get(name) {
            Some(entry) => Selection::Page {
                name: name.to_string(),
                layout: entry.layout().clone(),
            },
            None => Selection::missing(name),
        }
    }

    fn first(&self) -> Option<&str> {
        self.entries.keys().next().map(String::as_str)
    }

    fn select_path(&self, path: &str) -> Selection {
        let relative = path.strip_prefix(self.url_base.as_str()).unwrap_or(path);
        let relative = relative.trim_matches('/');
        if relative.is_empty() {
            return match self.first() {
                Some(first) => self.select(first),
                None => Selection::missing(path),
            };
        }
        let decoded = match urlencoding::decode(relative) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => return Selection::missing(relative),
        };
        if self.entries.contains_key(&decoded) {
            return self.select(&decoded);
        }
        let wanted = slug(&decoded);
        match self.entries.keys().find(|name| slug(name) == wanted) {
            Some(name) => self.select(name),
            None => Selection::missing(&decoded),
        }
    }

    fn path_for(&self, name: &str) -> String {
        format!("{}{}", self.url_base, urlencoding::encode(&slug(name)))
    }
}

/// Ordered set of named pages with a selector that swaps between them
pub struct NavigationShell {
    kind: SelectorKind,
    ids: IdRegistry,
    table: Arc<PageTable>,
    /// Set by `with_url_base`; otherwise the application's base is adopted
    explicit_base: bool,
}

impl NavigationShell {
    /// Creates an empty shell whose ids are namespaced under `owner`
    pub fn new(owner: &str, kind: SelectorKind) -> Result<Self> {
        let mut ids = IdRegistry::new(owner)?;
        ids.register(&["selector", "content"])?;
        Ok(Self {
            kind,
            ids,
            table: Arc::new(PageTable {
                url_base: "/".to_string(),
                entries: IndexMap::new(),
            }),
            explicit_base: false,
        })
    }

    /// Prefix stripped from paths before matching page names
    pub fn with_url_base(mut self, url_base: &str) -> Result<Self> {
        if !url_base.starts_with('/') || !url_base.ends_with('/') {
            return Err(DashError::Config(format!(
                "url base '{}' must start and end with '/'",
                url_base
            )));
        }
        self.table_mut()?.url_base = url_base.to_string();
        self.explicit_base = true;
        Ok(self)
    }

    /// Builder form of [`NavigationShell::add_page`]
    pub fn page(mut self, name: &str, module: impl Into<Module>) -> Result<Self> {
        self.add_page(name, module)?;
        Ok(self)
    }

    /// Appends a page; names are unique within one shell
    pub fn add_page(&mut self, name: &str, module: impl Into<Module>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DashError::MissingName("page"));
        }
        let table = self.table_mut()?;
        if table.entries.contains_key(name) {
            return Err(DashError::DuplicatePage(name.to_string()));
        }
        table.entries.insert(
            name.to_string(),
            PageEntry {
                module: module.into(),
                rendered: OnceLock::new(),
            },
        );
        Ok(())
    }

    fn table_mut(&mut self) -> Result<&mut PageTable> {
        Arc::get_mut(&mut self.table).ok_or_else(|| {
            DashError::Config(format!(
                "navigation shell '{}' is already wired to callbacks",
                self.ids.owner()
            ))
        })
    }

    pub fn kind(&self) -> SelectorKind {
        self.kind
    }

    pub fn selector_id(&self) -> &str {
        self.ids.resolve("selector").unwrap_or_default()
    }

    pub fn content_id(&self) -> &str {
        self.ids.resolve("content").unwrap_or_default()
    }

    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.table.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.entries.is_empty()
    }

    /// Layout of the named page, or an error payload naming it
    ///
    /// # Arguments
    /// * `name` - Page name exactly as registered
    ///
    /// # Returns
    /// * `Selection::Page` - The page's layout, produced on first use and cached
    /// * `Selection::Missing` - An error component containing `name`
    pub fn select(&self, name: &str) -> Selection {
        self.table.select(name)
    }

    /// Page addressed by a URL path; `/` is the first page
    pub fn select_path(&self, path: &str) -> Selection {
        self.table.select_path(path)
    }

    pub fn path_for(&self, name: &str) -> String {
        self.table.path_for(name)
    }

    /// Moves `state` through `Rendering` back to `Idle` and returns the
    /// content to display
    ///
    /// A missing page leaves the previous selection current.
    pub fn navigate(&self, state: &mut NavState, name: &str) -> Component {
        let previous = state.current().map(str::to_string);
        *state = NavState::Rendering {
            target: name.to_string(),
        };
        let selection = self.select(name);
        let current = if selection.is_missing() {
            warn!("{}: no page named '{}'", self.ids.owner(), name);
            previous
        } else {
            Some(name.to_string())
        };
        *state = NavState::Idle { current };
        selection.into_layout()
    }

    fn selector(&self, first: &str) -> Component {
        let names: Vec<&str> = self.page_names().collect();
        match self.kind {
            SelectorKind::Tabs => Component::tabs(
                self.selector_id(),
                first,
                names.iter().map(|name| Component::tab(name, name)),
            ),
            SelectorKind::Dropdown => Component::dropdown(self.selector_id(), &names, first),
            SelectorKind::Location => Component::div(
                std::iter::once(Component::location(self.selector_id())).chain(
                    names
                        .iter()
                        .map(|name| Component::link(&self.path_for(name), name)),
                ),
            )
            .with_class("nav-links"),
        }
    }
}

impl DashModule for NavigationShell {
    fn name(&self) -> &str {
        self.ids.owner()
    }

    fn configure(&mut self, config: &DashConfig) -> Result<()> {
        if self.explicit_base && !self.table.url_base.starts_with(config.url_base.as_str()) {
            return Err(DashError::Config(format!(
                "navigation shell '{}' uses url base '{}' outside the application base '{}'",
                self.ids.owner(),
                self.table.url_base,
                config.url_base
            )));
        }
        let explicit = self.explicit_base;
        let table = self.table_mut()?;
        if !explicit {
            table.url_base = config.url_base.clone();
        }
        for entry in table.entries.values_mut() {
            entry.module.configure(config)?;
        }
        Ok(())
    }

    fn initialize(&mut self, namespace: &mut IdNamespace) -> Result<()> {
        let owner = self.ids.owner().to_string();
        let mut ids = namespace.claim(&owner)?;
        namespace.register(&mut ids, &["selector", "content"])?;
        self.ids = ids;
        for entry in self.table_mut()?.entries.values_mut() {
            entry.module.initialize(namespace)?;
            // layouts produced before initialization refer to unissued ids
            entry.rendered = OnceLock::new();
        }
        debug!("{}: initialized {} pages", owner, self.len());
        Ok(())
    }

    fn layout(&self) -> Component {
        let first = self.table.first().unwrap_or_default();
        let content = match self.table.first() {
            Some(name) => vec![self.select(name).into_layout()],
            None => Vec::new(),
        };
        Component::div([
            self.selector(first),
            Component::div(content).with_id(self.content_id()),
        ])
        .with_class("nav-shell")
    }

    fn register_callbacks(&self, registry: &mut CallbackRegistry) -> Result<Vec<CallbackHandle>> {
        let selector = Dependency::new(self.selector_id(), self.kind.property());
        let content_id = self.content_id().to_string();
        let spec = CallbackSpec::new(
            vec![Dependency::new(&content_id, "children")],
            vec![selector.clone()],
        );
        let table = Arc::clone(&self.table);
        let kind = self.kind;
        let swap = registry.register(spec, move |args| {
            let value = args.input(&selector.id, &selector.property)?;
            let selection = match (kind, value) {
                (SelectorKind::Location, Value::String(path)) => table.select_path(path),
                (SelectorKind::Location, _) => table.select_path("/"),
                (_, Value::String(name)) => table.select(name),
                (_, other) => table.select(&other.to_string()),
            };
            Ok(vec![OutputValue::new(
                &content_id,
                "children",
                selection.into_layout().to_value(),
            )])
        })?;

        let mut handles = vec![swap];
        for entry in self.table.entries.values() {
            handles.extend(entry.module.register_callbacks(registry)?);
        }
        Ok(handles)
    }

    fn known_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .selector("")
            .ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        ids.push(self.content_id().to_string());
        for entry in self.table.entries.values() {
            ids.extend(entry.module.known_ids());
        }
        ids
    }
}

impl fmt::Debug for NavigationShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationShell")
            .field("owner", &self.ids.owner())
            .field("kind", &self.kind)
            .field("pages", &self.page_names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Page;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn home_about(kind: SelectorKind) -> NavigationShell {
        NavigationShell::new("nav", kind)
            .unwrap()
            .page("Home", Page::new("Home", || Component::heading(1, "Welcome")))
            .unwrap()
            .page("About", Page::new("About", || Component::text("about us")))
            .unwrap()
    }

    #[test]
    fn selects_registered_page() {
        let shell = home_about(SelectorKind::Tabs);
        let selection = shell.select("Home");
        assert!(!selection.is_missing());
        assert_eq!(selection.layout(), &Component::heading(1, "Welcome"));
    }

    #[test]
    fn missing_page_yields_error_payload() {
        let shell = home_about(SelectorKind::Tabs);
        let selection = shell.select("Missing");
        assert!(selection.is_missing());
        assert!(selection.layout().is_error());
        assert!(selection.layout().text_content().contains("Missing"));
    }

    #[test]
    fn rejects_duplicate_and_blank_pages() {
        let shell = home_about(SelectorKind::Tabs);
        let err = shell
            .page("Home", Page::new("again", || Component::text("")))
            .unwrap_err();
        assert!(matches!(err, DashError::DuplicatePage(ref p) if p == "Home"));
        let mut shell = NavigationShell::new("n2", SelectorKind::Tabs).unwrap();
        assert!(shell.add_page(" ", Page::new("x", || Component::text(""))).is_err());
    }

    #[test]
    fn layouts_are_produced_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let shell = NavigationShell::new("nav", SelectorKind::Dropdown)
            .unwrap()
            .page(
                "Only",
                Page::new("Only", move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Component::text("only")
                }),
            )
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        shell.select("Only");
        shell.select("Only");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn navigate_returns_to_idle() {
        let shell = home_about(SelectorKind::Tabs);
        let mut state = NavState::default();
        shell.navigate(&mut state, "About");
        assert_eq!(state, NavState::Idle { current: Some("About".into()) });
        let shown = shell.navigate(&mut state, "Missing");
        assert!(shown.is_error());
        assert!(state.is_idle());
        assert_eq!(state.current(), Some("About"));
    }

    #[test]
    fn paths_resolve_by_name_and_slug() {
        let shell = NavigationShell::new("site", SelectorKind::Location)
            .unwrap()
            .with_url_base("/app/")
            .unwrap()
            .page("Home", Page::new("Home", || Component::text("home")))
            .unwrap()
            .page("Sales Report", Page::new("Sales", || Component::text("sales")))
            .unwrap();
        assert_eq!(shell.select_path("/app/").name(), "Home");
        assert_eq!(shell.select_path("/app/Sales%20Report").name(), "Sales Report");
        assert_eq!(shell.select_path("/app/sales-report/").name(), "Sales Report");
        assert_eq!(shell.path_for("Sales Report"), "/app/sales-report");
        assert!(shell.select_path("/app/nope").is_missing());
        assert!(shell.with_url_base("app").is_err());
    }

    #[test]
    fn layout_lists_pages_and_shows_first() {
        let mut shell = home_about(SelectorKind::Tabs);
        shell.initialize(&mut IdNamespace::new()).unwrap();
        let layout = shell.layout();
        let tabs = layout.find("nav__selector").unwrap();
        assert_eq!(tabs.children.len(), 2);
        assert_eq!(tabs.props["value"], json!("Home"));
        let content = layout.find("nav__content").unwrap();
        assert_eq!(content.children, vec![Component::heading(1, "Welcome")]);
    }

    #[test]
    fn swap_callback_renders_selection() {
        let mut shell = home_about(SelectorKind::Tabs);
        shell.initialize(&mut IdNamespace::new()).unwrap();
        let mut registry = CallbackRegistry::new();
        let handles = shell.register_callbacks(&mut registry).unwrap();
        assert_eq!(handles.len(), 1);

        let out = registry.dispatch(handles[0], &[json!("About")]).unwrap();
        assert_eq!(out, vec![Component::text("about us").to_value()]);

        let out = registry.dispatch(handles[0], &[json!("Missing")]).unwrap();
        let shown: Component = serde_json::from_value(out[0].clone()).unwrap();
        assert!(shown.is_error());
        assert!(shown.text_content().contains("Missing"));
    }

    #[test]
    fn wired_shell_rejects_new_pages() {
        let mut shell = home_about(SelectorKind::Tabs);
        shell.initialize(&mut IdNamespace::new()).unwrap();
        let mut registry = CallbackRegistry::new();
        shell.register_callbacks(&mut registry).unwrap();
        assert!(shell.add_page("Late", Page::new("Late", || Component::text(""))).is_err());
    }

    #[test]
    fn initialize_discards_layouts_rendered_early() {
        let mut shell = NavigationShell::new("nav", SelectorKind::Tabs)
            .unwrap()
            .page(
                "Chart",
                Page::namespaced("Chart", "chart", &["main"], |ids| {
                    Component::new("Graph").with_id(ids.resolve("main").unwrap_or_default())
                }),
            )
            .unwrap();
        assert!(shell.select("Chart").layout().is_error());

        shell.initialize(&mut IdNamespace::new()).unwrap();
        let selection = shell.select("Chart");
        assert!(!selection.layout().is_error());
        assert!(selection.layout().find("chart__main").is_some());
    }

    #[test]
    fn configure_adopts_application_base_unless_set() {
        let config = DashConfig {
            url_base: "/dash/".to_string(),
            ..DashConfig::default()
        };
        let mut shell = home_about(SelectorKind::Location);
        shell.configure(&config).unwrap();
        assert_eq!(shell.path_for("About"), "/dash/about");
        assert_eq!(shell.select_path("/dash/").name(), "Home");

        let mut nested = home_about(SelectorKind::Location)
            .with_url_base("/dash/reports/")
            .unwrap();
        nested.configure(&config).unwrap();
        assert_eq!(nested.path_for("About"), "/dash/reports/about");

        let mut outside = home_about(SelectorKind::Location)
            .with_url_base("/elsewhere/")
            .unwrap();
        assert!(matches!(outside.configure(&config), Err(DashError::Config(_))));
    }

    #[test]
    fn nested_shell_ids_are_known() {
        let inner = home_about(SelectorKind::Dropdown);
        let mut outer = NavigationShell::new("outer", SelectorKind::Tabs)
            .unwrap()
            .page("Inner", inner)
            .unwrap();
        let mut ns = IdNamespace::new();
        outer.initialize(&mut ns).unwrap();
        let ids = outer.known_ids();
        for id in ["outer__selector", "outer__content", "nav__selector", "nav__content"] {
            assert!(ids.iter().any(|known| known == id), "missing {}", id);
        }
        assert!(ns.is_claimed("nav"));
    }
}
