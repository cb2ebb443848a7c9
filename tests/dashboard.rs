//! End-to-end assembly of multi-page dashboards through the public API.

use dashkit::callbacks::{map_outputs, unmap_outputs};
use dashkit::{
    App, CallbackHandle, CallbackRegistry, CallbackSpec, Component, DashConfig, DashError,
    DashModule, Dependency, IdNamespace, IdRegistry, Module, NavigationShell, OutputValue, Page,
    PropertyValue, SelectorKind, UpdateRequest, deps,
};
use serde_json::{Value, json};
use std::collections::HashSet;

/// Chart with a slider and a status line; mounted more than once per app
struct Chart {
    ids: IdRegistry,
}

impl Chart {
    fn module(owner: &str) -> Module {
        Module::custom(Chart {
            ids: IdRegistry::new(owner).unwrap(),
        })
    }

    fn id(&self, name: &str) -> String {
        self.ids.resolve(name).unwrap().to_string()
    }
}

impl DashModule for Chart {
    fn name(&self) -> &str {
        self.ids.owner()
    }

    fn initialize(&mut self, namespace: &mut IdNamespace) -> dashkit::Result<()> {
        let owner = self.ids.owner().to_string();
        self.ids = namespace.claim_with(&owner, &["main", "slider", "status"])?;
        Ok(())
    }

    fn layout(&self) -> Component {
        Component::div([
            Component::slider(&self.id("slider"), 0.0, 10.0, 1.0),
            Component::new("Graph").with_id(&self.id("main")),
            Component::new("Div").with_id(&self.id("status")),
        ])
    }

    fn register_callbacks(
        &self,
        registry: &mut CallbackRegistry,
    ) -> dashkit::Result<Vec<CallbackHandle>> {
        let (main, slider, status) = (self.id("main"), self.id("slider"), self.id("status"));
        let spec = CallbackSpec::new(
            vec![
                Dependency::new(&main, "figure"),
                Dependency::new(&status, "children"),
            ],
            vec![Dependency::new(&slider, "value")],
        );
        let handle = registry.register(spec, move |args| {
            let n = args.input(&slider, "value")?.as_f64().unwrap_or(0.0);
            // triples deliberately out of declaration order
            Ok(vec![
                OutputValue::new(
                    &status,
                    "children",
                    Component::text(&format!("{} points", n)).to_value(),
                ),
                OutputValue::new(&main, "figure", json!({ "data": [{ "y": [n] }] })),
            ])
        })?;
        Ok(vec![handle])
    }
}

fn dashboard(kind: SelectorKind) -> App {
    let shell = NavigationShell::new("nav", kind)
        .unwrap()
        .page("Home", Page::new("Home", || Component::heading(1, "Home")))
        .unwrap()
        .page("Chart A", Chart::module("chartA"))
        .unwrap()
        .page("Chart B", Chart::module("chartB"))
        .unwrap();
    App::build(DashConfig::default(), shell).unwrap()
}

fn select(app: &App, value: &str) -> dashkit::UpdateResponse {
    app.update(&UpdateRequest {
        outputs: deps(&[("nav__content", "children")]),
        inputs: vec![PropertyValue::new("nav__selector", "value", value)],
        state: Vec::new(),
    })
}

#[test]
fn reused_modules_never_collide() {
    let app = dashboard(SelectorKind::Tabs);
    let ids = app.root().known_ids();
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    for id in ["chartA__main", "chartA__slider", "chartB__main", "chartB__slider"] {
        assert!(ids.iter().any(|known| known == id), "missing {}", id);
    }
    assert_eq!(app.callbacks().len(), 3);
}

#[test]
fn mounting_one_owner_twice_fails_to_build() {
    let shell = NavigationShell::new("nav", SelectorKind::Tabs)
        .unwrap()
        .page("A", Chart::module("chart"))
        .unwrap()
        .page("B", Chart::module("chart"))
        .unwrap();
    let err = App::build(DashConfig::default(), shell).unwrap_err();
    assert!(matches!(err, DashError::DuplicateId(ref id) if id == "chart"));
}

#[test]
fn selecting_pages_swaps_content() {
    let app = dashboard(SelectorKind::Dropdown);

    let home = select(&app, "Home");
    assert_eq!(home.rendered["nav__content"], "<h1>Home</h1>");
    assert!(home.error.is_none());

    let chart = select(&app, "Chart B");
    let content: Component =
        serde_json::from_value(chart.value("nav__content", "children").unwrap().clone()).unwrap();
    assert!(content.find("chartB__slider").is_some());
    assert!(content.find("chartA__slider").is_none());
}

#[test]
fn missing_page_names_the_request() {
    let app = dashboard(SelectorKind::Tabs);
    let response = select(&app, "Missing");
    let content: Component =
        serde_json::from_value(response.value("nav__content", "children").unwrap().clone())
            .unwrap();
    assert!(content.is_error());
    assert!(content.text_content().contains("Missing"));
    assert!(response.error.is_none());
}

#[test]
fn chart_outputs_come_back_in_declared_order() {
    let app = dashboard(SelectorKind::Tabs);
    let response = app
        .try_update(&UpdateRequest {
            outputs: deps(&[("chartA__main", "figure"), ("chartA__status", "children")]),
            inputs: vec![PropertyValue::new("chartA__slider", "value", 4)],
            state: Vec::new(),
        })
        .unwrap();
    assert_eq!(response.value("chartA__main", "figure"), Some(&json!({ "data": [{ "y": [4.0] }] })));
    assert_eq!(response.rendered["chartA__status"], "4 points");
}

#[test]
fn location_shell_routes_under_url_base() {
    let shell = NavigationShell::new("site", SelectorKind::Location)
        .unwrap()
        .with_url_base("/dash/")
        .unwrap()
        .page("Home", Page::new("Home", || Component::text("home")))
        .unwrap()
        .page("Chart A", Chart::module("chartA"))
        .unwrap();
    let app = App::build(DashConfig::default(), shell).unwrap();

    let route = |path: &str| {
        app.update(&UpdateRequest {
            outputs: deps(&[("site__content", "children")]),
            inputs: vec![PropertyValue::new("site__selector", "pathname", path)],
            state: Vec::new(),
        })
    };
    assert_eq!(route("/dash/").rendered["site__content"], "home");
    assert!(route("/dash/chart-a").rendered["site__content"].contains("id=\"chartA__slider\""));
    assert!(route("/dash/chart-z").rendered["site__content"].contains("dash-error"));
}

#[test]
fn location_shell_adopts_application_url_base() {
    let shell = NavigationShell::new("site", SelectorKind::Location)
        .unwrap()
        .page("Home", Page::new("Home", || Component::text("home")))
        .unwrap()
        .page("About", Page::new("About", || Component::text("about")))
        .unwrap();
    let config = DashConfig {
        url_base: "/dash/".to_string(),
        ..DashConfig::default()
    };
    let app = App::build(config, shell).unwrap();

    let route = |path: &str| {
        app.update(&UpdateRequest {
            outputs: deps(&[("site__content", "children")]),
            inputs: vec![PropertyValue::new("site__selector", "pathname", path)],
            state: Vec::new(),
        })
    };
    assert_eq!(route("/dash/").rendered["site__content"], "home");
    assert_eq!(route("/dash/about").rendered["site__content"], "about");
    assert!(app.layout().to_html().contains("href=\"/dash/about\""));
}

#[test]
fn shell_base_outside_application_base_fails_to_build() {
    let shell = NavigationShell::new("site", SelectorKind::Location)
        .unwrap()
        .with_url_base("/other/")
        .unwrap()
        .page("Home", Page::new("Home", || Component::text("home")))
        .unwrap();
    let config = DashConfig {
        url_base: "/dash/".to_string(),
        ..DashConfig::default()
    };
    let err = App::build(config, shell).unwrap_err();
    assert!(matches!(err, DashError::Config(ref msg) if msg.contains("/other/")));
}

#[test]
fn output_triples_reorder_or_fail_whole() {
    let outputs = deps(&[("chart", "figure"), ("status", "children")]);
    let values = vec![json!({ "data": [] }), json!("ok")];

    let mut triples = map_outputs(&outputs, values.clone()).unwrap();
    triples.reverse();
    assert_eq!(unmap_outputs(&outputs, triples).unwrap(), values);

    let short = vec![OutputValue::new("chart", "figure", Value::Null)];
    assert!(matches!(
        unmap_outputs(&outputs, short),
        Err(DashError::OutputCountMismatch {
            expected: 2,
            actual: 1
        })
    ));
}
