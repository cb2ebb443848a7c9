#![cfg(not(tarpaulin_include))]

use dashkit::server;
use dashkit::{
    App, CallbackHandle, CallbackRegistry, CallbackSpec, Component, DashConfig, DashError,
    DashModule, DataTable, Dependency, FileCache, Figure, IdNamespace, IdRegistry, Module,
    NavigationShell, OutputValue, Page, SelectorKind, Trace,
};
use log::info;
use serde_json::json;

const ABOUT: &str = "\
# About

Pick a page from the tabs above. The two chart pages are the same module
mounted twice under different owners, so their sliders never collide.
";

/// Slider driving a line chart of a synthetic series
struct ChartModule {
    title: String,
    ids: IdRegistry,
    growth: f64,
    cache: FileCache,
}

impl ChartModule {
    fn new(owner: &str, title: &str, growth: f64, cache: FileCache) -> dashkit::Result<Self> {
        Ok(Self {
            title: title.to_string(),
            ids: IdRegistry::new(owner)?,
            growth,
            cache,
        })
    }

    fn id(&self, name: &str) -> dashkit::Result<String> {
        self.ids.resolve(name).map(str::to_string)
    }
}

fn series(growth: f64, points: u64) -> Vec<f64> {
    (0..points)
        .map(|i| 100.0 * (1.0 + growth).powi(i as i32))
        .collect()
}

fn figure(title: &str, values: &[f64]) -> Figure {
    let x: Vec<f64> = (1..=values.len()).map(|i| i as f64).collect();
    Figure::new(title)
        .with_labels("Month", "Value")
        .with_trace(Trace::line(title, x, values.to_vec()))
}

/// Table without an id of its own, swapped into a container
fn grid(rows: &DataTable) -> Component {
    Component::new("DataTable")
        .with_prop("columns", rows.headers())
        .with_prop("data", rows.rows.clone())
}

impl DashModule for ChartModule {
    fn name(&self) -> &str {
        self.ids.owner()
    }

    fn initialize(&mut self, namespace: &mut IdNamespace) -> dashkit::Result<()> {
        let owner = self.ids.owner().to_string();
        self.ids = namespace.claim_with(&owner, &["points", "chart", "table"])?;
        Ok(())
    }

    fn layout(&self) -> Component {
        let (Ok(points), Ok(chart), Ok(table)) =
            (self.id("points"), self.id("chart"), self.id("table"))
        else {
            return Component::error(&format!("{} is not initialized", self.title));
        };
        let values = series(self.growth, 12);
        Component::div([
            Component::heading(2, &self.title),
            Component::slider(&points, 2.0, 36.0, 12.0),
            Component::graph(&chart, &figure(&self.title, &values)),
            Component::new("Div").with_id(&table),
        ])
    }

    fn register_callbacks(
        &self,
        registry: &mut CallbackRegistry,
    ) -> dashkit::Result<Vec<CallbackHandle>> {
        let points = self.id("points")?;
        let chart = self.id("chart")?;
        let table = self.id("table")?;
        let spec = CallbackSpec::new(
            vec![
                Dependency::new(&chart, "figure"),
                Dependency::new(&table, "children"),
            ],
            vec![Dependency::new(&points, "value")],
        );

        let title = self.title.clone();
        let growth = self.growth;
        let cache = self.cache.clone();
        let owner = self.ids.owner().to_string();
        let handle = registry.register(spec, move |args| {
            let n = args
                .input(&points, "value")?
                .as_f64()
                .filter(|n| (1.0..=120.0).contains(n))
                .ok_or_else(|| DashError::Callback("points must be between 1 and 120".to_string()))?
                as u64;
            let key = format!("{}-{}", owner, n);
            let values: Vec<f64> = cache.get_or_insert_with(&key, || Ok(series(growth, n)))?;

            let mut rows = DataTable::new(["Month", "Value"]);
            for (i, v) in values.iter().enumerate() {
                rows.push_row(vec![json!(i + 1), json!((v * 100.0).round() / 100.0)])?;
            }
            Ok(vec![
                OutputValue::new(&chart, "figure", figure(&title, &values).to_value()),
                OutputValue::new(&table, "children", grid(&rows).to_value()),
            ])
        })?;
        Ok(vec![handle])
    }
}

fn build_app(config: DashConfig) -> dashkit::Result<App> {
    let cache = FileCache::open(&config.cache_dir)?.with_max_age(config.cache_max_age_secs);

    let shell = NavigationShell::new("nav", SelectorKind::Tabs)?
        .page(
            "Home",
            Page::new("Home", || {
                Component::div([
                    Component::heading(1, "dashkit demo"),
                    Component::text("Two charts, one module."),
                ])
            }),
        )?
        .page(
            "Sales",
            Module::custom(ChartModule::new("sales", "Sales", 0.04, cache.clone())?),
        )?
        .page(
            "Traffic",
            Module::custom(ChartModule::new("traffic", "Traffic", 0.09, cache)?),
        )?
        .page("About", Page::markdown("About", ABOUT))?;

    App::build(config, shell)
}

/// Demo dashboard server
///
/// Reads `DASHKIT_*` variables for its configuration, or a JSON file given
/// as the only argument.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => DashConfig::from_file(path)?,
        None => DashConfig::from_env()?,
    };
    let app = build_app(config)?;
    info!("{} callbacks registered", app.callbacks().len());

    server::serve(app).await?;
    Ok(())
}
