/*!
# dashkit

Building blocks for multi-page analytical dashboards served to a browser.

## Overview

A dashboard is a tree of modules. Each module owns a namespace of
component ids, produces a layout of [`Component`]s and registers the
callbacks that keep that layout interactive. A [`NavigationShell`] is a
module whose pages are themselves modules: it renders a selector (tabs,
a dropdown or the browser location) next to a content area, and swaps
the selected page's layout into that area.

## Architecture

### Identity
- **ids**: `{owner}__{logical}` component ids and the namespace that
  rejects two modules claiming the same owner

### Composition
- **component**: serializable component tree with static HTML rendering
- **module**: the `DashModule` contract, single pages and the `Module` sum type
- **nav**: navigation shell with page selection and path routing
- **callbacks**: dependency declarations, positional argument mapping and
  the callback registry
- **app**: assembles a root module and answers update requests

### Content
- **figure**, **table**, **markdown**: chart, tabular and prose content
- **export** (web): PNG rendering of figures
- **cache**: gzip-compressed JSON cache on disk

### Serving
- **config**: defaults, environment and file overrides
- **server** (web): axum routes for the layout, dependencies, updates,
  exports and assets

## REST API Endpoints

Every route is prefixed with the configured url base.

- `/` - Index page with the pre-rendered layout
- `/_dash-layout` - Layout as JSON
- `/_dash-dependencies` - Declared callbacks
- `/_dash-update-component` - Runs the callback owning the posted outputs
- `/_dash-export/table.csv`, `/_dash-export/table.xlsx` - Table downloads
- `/_dash-export/figure.png` - Figure rendered to an image
- `/assets/...` - Static files
*/

pub mod app;
pub mod cache;
pub mod callbacks;
pub mod component;
pub mod config;
pub mod error;
#[cfg(feature = "web")]
pub mod export;
pub mod figure;
pub mod ids;
pub mod markdown;
pub mod module;
pub mod nav;
#[cfg(feature = "web")]
pub mod server;
pub mod table;

pub use app::{App, PropertyValue, UpdateRequest, UpdateResponse};
pub use cache::FileCache;
pub use callbacks::{
    CallbackArgs, CallbackHandle, CallbackRegistry, CallbackSpec, Dependency, OutputValue, deps,
};
pub use component::Component;
pub use config::DashConfig;
pub use error::{DashError, Result};
pub use figure::{Figure, Trace, TraceKind};
pub use ids::{IdNamespace, IdRegistry};
pub use module::{DashModule, Module, Page};
pub use nav::{NavState, NavigationShell, Selection, SelectorKind};
pub use table::DataTable;
