//! Static HTML rendering of a [`DocumentTree`].
//!
//! Output layout below the output directory:
//!
//! ```text
//! index.html
//! routes.html
//! controllers/<handler slug>.html
//! models/<model slug>.html
//! ```
//!
//! Pages carry no timestamps, so rendering an unchanged tree twice produces
//! byte-identical files. Files left over from earlier runs are not removed.

use crate::config::{Configuration, DEFAULT_THEME_COLOR};
use crate::document::DocumentTree;
use crate::error::{Error, Result};
use crate::extractor::models::{AssociationOptions, ColumnInfo, ModelRecord};
use crate::extractor::HandlerGroup;
use crate::inflect::{camelize, underscore};
use log::{debug, info, warn};
use minijinja::Environment;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../templates/layout.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("routes.html", include_str!("../templates/routes.html")),
    ("controller.html", include_str!("../templates/controller.html")),
    ("model.html", include_str!("../templates/model.html")),
];

pub const CONTROLLERS_DIR: &str = "controllers";
pub const MODELS_DIR: &str = "models";

const TIMESTAMP_COLUMNS: &[&str] = &["created_at", "updated_at"];

/// Filesystem-safe lowercase token for a qualified name.
///
/// `::`, `/` and `\` become `_`, as does anything other than ASCII
/// alphanumerics, `-` and `_`.
pub fn slugify(name: &str) -> String {
    name.replace("::", "_")
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `Admin::UserProfile` -> `admin_user_profile`
pub fn model_slug(model_name: &str) -> String {
    slugify(&underscore(model_name))
}

/// `admin/users` -> `Admin::UsersController`
pub fn controller_title(handler_name: &str) -> String {
    format!("{}Controller", camelize(handler_name))
}

#[derive(Serialize)]
struct Page<'a, T: Serialize> {
    title: &'a str,
    app_name: &'a str,
    theme_color: &'a str,
    /// Relative prefix from the page back to the site root
    root: &'static str,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
struct HandlerLink<'a> {
    name: &'a str,
    title: String,
    slug: String,
    base_path: &'a str,
    route_count: usize,
    actions: &'a [String],
}

#[derive(Serialize)]
struct ModelLink<'a> {
    name: &'a str,
    slug: String,
    table_name: Option<&'a str>,
    column_count: usize,
    association_count: usize,
}

#[derive(Serialize)]
struct IndexBody<'a> {
    handler_count: usize,
    route_count: usize,
    model_count: usize,
    handlers: Vec<HandlerLink<'a>>,
    models: Vec<ModelLink<'a>>,
}

#[derive(Serialize)]
struct RouteRow<'a> {
    verb: &'a str,
    path: &'a str,
    handler_name: &'a str,
    handler_slug: String,
    action_name: &'a str,
    route_name: Option<&'a str>,
}

#[derive(Serialize)]
struct RoutesBody<'a> {
    route_count: usize,
    routes: Vec<RouteRow<'a>>,
}

#[derive(Serialize)]
struct ControllerBody<'a> {
    handler_name: &'a str,
    group: &'a HandlerGroup,
}

#[derive(Serialize)]
struct AssociationRow<'a> {
    name: &'a str,
    kind: &'static str,
    target_class_name: &'a str,
    /// Set when the target is documented on this site
    target_slug: Option<String>,
    foreign_key: Option<&'a str>,
    options: String,
}

#[derive(Serialize)]
struct ValidationRow<'a> {
    attribute: &'a str,
    kind: &'a str,
    options: String,
}

#[derive(Serialize)]
struct ModelBody<'a> {
    model: &'a ModelRecord,
    columns: Vec<&'a ColumnInfo>,
    associations: Vec<AssociationRow<'a>>,
    validations: Vec<ValidationRow<'a>>,
    include_validations: bool,
    include_scopes: bool,
}

/// Renders a [`DocumentTree`] into a static site.
pub struct SiteGenerator {
    app_name: String,
    theme_color: String,
    include_timestamps: bool,
    include_validations: bool,
    include_scopes: bool,
}

impl SiteGenerator {
    pub fn new(config: &Configuration) -> Self {
        Self {
            app_name: config.app_name.clone(),
            theme_color: checked_theme_color(&config.theme_color),
            include_timestamps: config.include_timestamps,
            include_validations: config.include_validations,
            include_scopes: config.include_scopes,
        }
    }

    /// Creates `output_dir` and its page subdirectories if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoError`] if a directory cannot be created.
    pub fn create_output_dirs(output_dir: &Path) -> Result<()> {
        for dir in [
            output_dir.to_path_buf(),
            output_dir.join(CONTROLLERS_DIR),
            output_dir.join(MODELS_DIR),
        ] {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(())
    }

    /// Writes every page of the site below `output_dir`.
    ///
    /// # Arguments
    ///
    /// * `tree` - Extracted routes and models
    /// * `output_dir` - Site root; created if missing
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written, if a page
    /// fails to render.
    pub fn generate(&self, tree: &DocumentTree, output_dir: &Path) -> Result<()> {
        Self::create_output_dirs(output_dir)?;
        let env = environment()?;

        self.write_index(&env, tree, output_dir)?;
        self.write_routes(&env, tree, output_dir)?;

        let mut written = HashMap::new();
        for (handler_name, group) in tree.handler_groups.iter() {
            let slug = slugify(handler_name);
            warn_on_collision(&mut written, CONTROLLERS_DIR, &slug, handler_name);
            let title = controller_title(handler_name);
            let body = ControllerBody {
                handler_name,
                group,
            };
            let html = self.render(&env, "controller.html", &title, "../", body)?;
            write_page(&output_dir.join(CONTROLLERS_DIR).join(format!("{}.html", slug)), &html)?;
        }

        for (name, model) in &tree.models {
            let slug = model_slug(name);
            warn_on_collision(&mut written, MODELS_DIR, &slug, name);
            let body = self.model_body(model, &tree.models);
            let html = self.render(&env, "model.html", name, "../", body)?;
            write_page(&output_dir.join(MODELS_DIR).join(format!("{}.html", slug)), &html)?;
        }

        info!(
            "Wrote {} pages to {}",
            2 + tree.handler_count() + tree.model_count(),
            output_dir.display()
        );
        Ok(())
    }

    fn write_index(&self, env: &Environment<'static>, tree: &DocumentTree, output_dir: &Path) -> Result<()> {
        let handlers = tree
            .handler_groups
            .iter()
            .map(|(name, group)| HandlerLink {
                name,
                title: controller_title(name),
                slug: slugify(name),
                base_path: &group.base_path,
                route_count: group.routes.len(),
                actions: &group.actions,
            })
            .collect();
        let models = tree
            .models
            .values()
            .map(|model| ModelLink {
                name: &model.name,
                slug: model_slug(&model.name),
                table_name: model.table_name.as_deref(),
                column_count: model.columns.len(),
                association_count: model.associations.len(),
            })
            .collect();

        let body = IndexBody {
            handler_count: tree.handler_count(),
            route_count: tree.route_count(),
            model_count: tree.model_count(),
            handlers,
            models,
        };
        let html = self.render(env, "index.html", "Home", "", body)?;
        write_page(&output_dir.join("index.html"), &html)
    }

    fn write_routes(&self, env: &Environment<'static>, tree: &DocumentTree, output_dir: &Path) -> Result<()> {
        let routes: Vec<RouteRow> = tree
            .handler_groups
            .iter()
            .flat_map(|(name, group)| {
                group.routes.iter().map(move |route| RouteRow {
                    verb: &route.verb,
                    path: &route.path,
                    handler_name: name,
                    handler_slug: slugify(name),
                    action_name: &route.action_name,
                    route_name: route.route_name.as_deref(),
                })
            })
            .collect();

        let body = RoutesBody {
            route_count: routes.len(),
            routes,
        };
        let html = self.render(env, "routes.html", "All Routes", "", body)?;
        write_page(&output_dir.join("routes.html"), &html)
    }

    fn model_body<'a>(
        &self,
        model: &'a ModelRecord,
        documented: &BTreeMap<String, ModelRecord>,
    ) -> ModelBody<'a> {
        let columns = model
            .columns
            .iter()
            .filter(|c| self.include_timestamps || !TIMESTAMP_COLUMNS.contains(&c.name.as_str()))
            .collect();

        let associations = model
            .associations
            .iter()
            .map(|assoc| AssociationRow {
                name: &assoc.name,
                kind: assoc.kind.as_str(),
                target_class_name: &assoc.target_class_name,
                target_slug: documented
                    .contains_key(&assoc.target_class_name)
                    .then(|| model_slug(&assoc.target_class_name)),
                foreign_key: assoc.foreign_key.as_deref(),
                options: association_options_summary(&assoc.options),
            })
            .collect();

        let validations = model
            .validations
            .iter()
            .map(|v| ValidationRow {
                attribute: &v.attribute,
                kind: &v.kind,
                options: options_summary(v.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            })
            .collect();

        ModelBody {
            model,
            columns,
            associations,
            validations,
            include_validations: self.include_validations,
            include_scopes: self.include_scopes,
        }
    }

    fn render<T: Serialize>(
        &self,
        env: &Environment<'static>,
        template: &str,
        title: &str,
        root: &'static str,
        body: T,
    ) -> Result<String> {
        debug!("Rendering {} ({})", template, title);
        let page = Page {
            title,
            app_name: &self.app_name,
            theme_color: &self.theme_color,
            root,
            body,
        };
        Ok(env.get_template(template)?.render(&page)?)
    }
}

/// The color lands unescaped in a `<style>` block; anything that could leave
/// the declaration falls back to the default color.
fn checked_theme_color(color: &str) -> String {
    if is_safe_css_value(color) {
        color.to_string()
    } else {
        warn!(
            "Ignoring theme color {:?}, using {}",
            color, DEFAULT_THEME_COLOR
        );
        DEFAULT_THEME_COLOR.to_string()
    }
}

fn is_safe_css_value(value: &str) -> bool {
    !value.trim().is_empty()
        && value.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' ' | '/' | '-')
        })
}

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        env.add_template(name, source)?;
    }
    Ok(env)
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    debug!("Writing {}", path.display());
    fs::write(path, html).map_err(|e| Error::io(path, e))
}

fn warn_on_collision<'a>(
    written: &mut HashMap<(&'static str, String), &'a str>,
    dir: &'static str,
    slug: &str,
    name: &'a str,
) {
    if let Some(previous) = written.insert((dir, slug.to_string()), name) {
        warn!(
            "{} and {} share the page {}/{}.html; the latter overwrites the former",
            previous, name, dir, slug
        );
    }
}

fn association_options_summary(options: &AssociationOptions) -> String {
    let mut pairs = Vec::new();
    if let Some(dependent) = &options.dependent {
        pairs.push(("dependent", dependent.as_str()));
    }
    if let Some(through) = &options.through {
        pairs.push(("through", through.as_str()));
    }
    if options.polymorphic {
        pairs.push(("polymorphic", "true"));
    }
    if let Some(inverse_as) = &options.inverse_as {
        pairs.push(("as", inverse_as.as_str()));
    }
    options_summary(pairs)
}

fn options_summary<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}
