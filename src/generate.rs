use crate::config::Configuration;
use crate::document::DocumentTree;
use crate::error::Result;
use crate::extractor::models::{ModelExtractor, OrmRegistry};
use crate::extractor::routes::{RouteExtractor, RoutingTable};
use crate::scanner::SourceTree;
use crate::site::SiteGenerator;
use log::info;

/// One extract + render pass over a host application.
pub struct Generator {
    config: Configuration,
}

impl Generator {
    pub fn new(config: &Configuration) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Runs both extractors. Never fails; unavailable inputs yield empty maps.
    pub fn extract(
        &self,
        table: &dyn RoutingTable,
        registry: &dyn OrmRegistry,
        source: &SourceTree,
    ) -> DocumentTree {
        info!("Extracting routes...");
        let handler_groups = RouteExtractor::new().extract(table, source);
        info!("Extracting models...");
        let models = ModelExtractor::new(&self.config).extract(registry, source);
        DocumentTree::new(handler_groups, models)
    }

    /// Extracts the document tree and writes the site to the configured
    /// output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory or a page cannot be written.
    pub fn generate(
        &self,
        table: &dyn RoutingTable,
        registry: &dyn OrmRegistry,
        source: &SourceTree,
    ) -> Result<DocumentTree> {
        let output_dir = &self.config.output_dir;
        SiteGenerator::create_output_dirs(output_dir)?;

        let tree = self.extract(table, registry, source);

        info!("Rendering site to {}", output_dir.display());
        SiteGenerator::new(&self.config).generate(&tree, output_dir)?;
        Ok(tree)
    }
}
