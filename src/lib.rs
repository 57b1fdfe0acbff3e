//! Rails Map - static HTML reference of a Rails application's routes and models.
//!
//! The library reads the routing table and ORM registry of a host
//! application, keeps only what the application itself owns, and renders the
//! result as a deterministic tree of HTML pages.
//!
//! # Architecture
//!
//! 1. [`snapshot`] - Loads a dump of the routing table and ORM registry and
//!    exposes it through the extractor traits
//! 2. [`scanner`] - Locates controller and model source files of the host application
//! 3. [`extractor`] - Builds route and model records, tolerating reflection failures
//! 4. [`document`] - The aggregate handed from the extractors to the renderer
//! 5. [`site`] - Renders the HTML pages
//! 6. [`serializer`] - Exports the aggregate as YAML or JSON
//! 7. [`generate`] - Runs one extract + render pass
//!
//! # Example Usage
//!
//! ```no_run
//! use rails_map::{
//!     config::Configuration,
//!     generate::Generator,
//!     scanner::SourceTree,
//!     snapshot::AppSnapshot,
//! };
//! use std::path::Path;
//!
//! let app_root = Path::new("./my-app");
//! let snapshot = AppSnapshot::load(&app_root.join("tmp/rails_map.json")).unwrap();
//! let config = Configuration::for_app_root(app_root);
//!
//! let tree = Generator::new(&config)
//!     .generate(&snapshot, &snapshot, &SourceTree::new(app_root))
//!     .unwrap();
//! println!("Documented {} routes", tree.route_count());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod generate;
pub mod inflect;
pub mod scanner;
pub mod serializer;
pub mod site;
pub mod snapshot;
