use pretty_assertions::assert_eq;
use rails_map::{
    cli,
    config::Configuration,
    extractor::param_types::SemanticType,
    generate::Generator,
    scanner::SourceTree,
    serializer::{serialize_json, serialize_yaml},
    snapshot::AppSnapshot,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper function to create a temporary host application
fn create_test_app() -> TempDir {
    let files: Vec<(&str, &str)> = vec![
        ("tmp/rails_map.json", include_str!("fixtures/snapshot.json")),
        ("app/controllers/posts_controller.rb", include_str!("fixtures/posts_controller.rb")),
        ("app/controllers/admin/users_controller.rb", include_str!("fixtures/users_controller.rb")),
        ("app/controllers/health_controller.rb", include_str!("fixtures/health_controller.rb")),
        ("app/models/application_record.rb", "class ApplicationRecord < ActiveRecord::Base\n  primary_abstract_class\nend\n"),
        ("app/models/post.rb", "class Post < ApplicationRecord\nend\n"),
        ("app/models/comment.rb", "class Comment < ApplicationRecord\nend\n"),
        ("app/models/admin/user_profile.rb", "class Admin::UserProfile < ApplicationRecord\nend\n"),
        ("app/models/invoice.rb", "class Invoice < ApplicationRecord\n  composed_of :amount, class_name: \"Money\"\nend\n"),
    ];

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
    }
    temp_dir
}

fn load_snapshot(app_root: &Path) -> AppSnapshot {
    AppSnapshot::load(&app_root.join("tmp/rails_map.json")).expect("Failed to load snapshot")
}

fn sorted_file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_end_to_end_generation() {
    let app = create_test_app();
    let config = Configuration::for_app_root(app.path());
    let snapshot = load_snapshot(app.path());

    let tree = Generator::new(&config)
        .generate(&snapshot, &snapshot, &SourceTree::new(app.path()))
        .expect("Generation should succeed");

    assert_eq!(tree.handler_count(), 3);
    assert_eq!(tree.route_count(), 9);
    assert_eq!(tree.model_count(), 3);

    let output = app.path().join("doc/api");
    assert!(output.join("index.html").is_file());
    assert!(output.join("routes.html").is_file());
    assert_eq!(
        sorted_file_names(&output.join("controllers")),
        vec!["admin_users.html", "health.html", "posts.html"]
    );
    assert_eq!(
        sorted_file_names(&output.join("models")),
        vec!["admin_user_profile.html", "comment.html", "post.html"]
    );

    let post_page = fs::read_to_string(output.join("models/post.html")).unwrap();
    assert!(post_page.contains("<title>Post | Rails Application</title>"));
    assert!(post_page.contains(r#"<a href="admin_user_profile.html">Admin::UserProfile</a>"#));
}

#[test]
fn test_route_extraction_from_snapshot() {
    let app = create_test_app();
    let config = Configuration::for_app_root(app.path());
    let tree = Generator::new(&config).extract(
        &load_snapshot(app.path()),
        &load_snapshot(app.path()),
        &SourceTree::new(app.path()),
    );

    let keys: Vec<&str> = tree.handler_groups.keys().collect();
    assert_eq!(keys, vec!["admin/users", "health", "posts"]);

    let posts = tree.handler_groups.get("posts").unwrap();
    assert_eq!(posts.base_path, "/posts");
    assert_eq!(posts.actions, vec!["create", "destroy", "index", "show", "update"]);
    let order: Vec<(&str, &str)> = posts
        .routes
        .iter()
        .map(|r| (r.verb.as_str(), r.path.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("GET", "/posts"),
            ("POST", "/posts"),
            ("GET", "/posts/:id"),
            ("PUT", "/posts/:id"),
            ("PATCH", "/posts/:id"),
            ("DELETE", "/posts/:id"),
        ]
    );

    let show = &posts.routes[2];
    assert_eq!(show.route_name.as_deref(), Some("post"));
    assert_eq!(show.constraints.get("id").map(String::as_str), Some("\\d+"));
    assert_eq!(show.path_params.len(), 1);
    assert_eq!(show.path_params[0].name, "id");
    assert_eq!(show.path_params[0].inferred_type, SemanticType::Integer);
    assert!(show.query_params.is_empty());

    let index = &posts.routes[0];
    let query: Vec<(&str, SemanticType, bool)> = index
        .query_params
        .iter()
        .map(|p| (p.name.as_str(), p.inferred_type, p.required))
        .collect();
    assert_eq!(
        query,
        vec![
            ("author_id", SemanticType::Integer, false),
            ("page", SemanticType::String, false),
            ("per_page", SemanticType::String, false),
            ("q", SemanticType::String, false),
        ]
    );
    assert_eq!(index.query_params.len(), index.body_params.len());

    let create = &posts.routes[1];
    let body: Vec<(&str, SemanticType, bool)> = create
        .body_params
        .iter()
        .map(|p| (p.name.as_str(), p.inferred_type, p.required))
        .collect();
    assert_eq!(
        body,
        vec![
            ("post[title]", SemanticType::String, true),
            ("post[body]", SemanticType::String, true),
            ("post[published_at]", SemanticType::Datetime, true),
            ("post[is_featured]", SemanticType::Boolean, true),
        ]
    );

    let health = tree.handler_groups.get("health").unwrap();
    assert_eq!(health.routes[0].verb, "GET");
    assert_eq!(health.routes[0].path, "/up");
    assert_eq!(health.routes[0].query_params[0].name, "is_verbose");
    assert_eq!(health.routes[0].query_params[0].inferred_type, SemanticType::Boolean);

    let admin = tree.handler_groups.get("admin/users").unwrap();
    assert_eq!(admin.base_path, "/admin/users");
    assert_eq!(admin.routes[0].query_params[0].name, "limit_count");
    assert_eq!(admin.routes[0].query_params[0].inferred_type, SemanticType::Integer);
    assert_eq!(admin.routes[1].defaults.get("format").map(String::as_str), Some("json"));
}

#[test]
fn test_foreign_routes_and_models_are_excluded() {
    let app = create_test_app();
    let config = Configuration::for_app_root(app.path());
    let snapshot = load_snapshot(app.path());
    let tree = Generator::new(&config).extract(&snapshot, &snapshot, &SourceTree::new(app.path()));

    for handler in tree.handler_groups.keys() {
        assert!(!handler.starts_with("active_storage"), "{}", handler);
        assert!(!handler.starts_with("devise"), "{}", handler);
        assert_ne!(handler, "assets");
        assert_ne!(handler, "reports", "handler without a controller file");
    }
    for group in tree.handler_groups.iter().map(|(_, g)| g) {
        assert!(group.routes.iter().all(|r| !r.path.starts_with("/rails/")));
        assert!(group.routes.iter().all(|r| r.path != "/legacy"));
    }

    let names: Vec<&String> = tree.models.keys().collect();
    assert_eq!(names, vec!["Admin::UserProfile", "Comment", "Post"]);
}

#[test]
fn test_model_reflection_degrades_per_capability() {
    let app = create_test_app();
    let config = Configuration::for_app_root(app.path());
    let snapshot = load_snapshot(app.path());
    let tree = Generator::new(&config).extract(&snapshot, &snapshot, &SourceTree::new(app.path()));

    let post = &tree.models["Post"];
    let columns: Vec<&str> = post.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        columns,
        vec!["author_id", "body", "created_at", "id", "published", "title", "updated_at"]
    );
    assert_eq!(post.associations[0].name, "author");
    assert_eq!(post.associations[0].target_class_name, "Admin::UserProfile");
    assert_eq!(post.associations[1].target_class_name, "Comment");
    assert_eq!(post.associations[1].options.dependent.as_deref(), Some("destroy"));
    let validations: Vec<(&str, &str)> = post
        .validations
        .iter()
        .map(|v| (v.attribute.as_str(), v.kind.as_str()))
        .collect();
    assert_eq!(
        validations,
        vec![("body", "presence"), ("title", "length"), ("title", "presence")]
    );
    assert_eq!(post.validations[1].options.get("maximum").map(String::as_str), Some("120"));
    assert!(!post.validations[1].options.contains_key("if"));
    let scopes: Vec<(&str, i32)> = post.scopes.iter().map(|s| (s.name.as_str(), s.arity)).collect();
    assert_eq!(scopes, vec![("by_author", 1), ("published", 0)]);

    // Column reflection failed: the model stays, without columns
    let comment = &tree.models["Comment"];
    assert!(comment.columns.is_empty());
    assert_eq!(comment.table_name.as_deref(), Some("comments"));
    assert_eq!(comment.associations[0].target_class_name, "Post");
    let scopes: Vec<&str> = comment.scopes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(scopes, vec!["recent", "visible"]);

    let profile = &tree.models["Admin::UserProfile"];
    assert_eq!(profile.table_name, None);
    assert_eq!(profile.primary_key.as_deref(), Some("id"));
    assert!(profile.columns.is_empty());
    let scopes: Vec<&str> = profile.scopes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(scopes, vec!["active"]);
}

#[test]
fn test_regeneration_is_byte_identical() {
    let app = create_test_app();
    let snapshot = load_snapshot(app.path());
    let source = SourceTree::new(app.path());

    let first = Configuration {
        output_dir: app.path().join("first"),
        ..Configuration::default()
    };
    let second = Configuration {
        output_dir: app.path().join("second"),
        ..Configuration::default()
    };
    Generator::new(&first).generate(&snapshot, &snapshot, &source).unwrap();
    Generator::new(&second).generate(&snapshot, &snapshot, &source).unwrap();

    for page in [
        "index.html",
        "routes.html",
        "controllers/posts.html",
        "controllers/admin_users.html",
        "controllers/health.html",
        "models/post.html",
        "models/comment.html",
        "models/admin_user_profile.html",
    ] {
        let a = fs::read(first.output_dir.join(page)).unwrap();
        let b = fs::read(second.output_dir.join(page)).unwrap();
        assert!(a == b, "{} differs between runs", page);
    }
}

#[test]
fn test_disabled_sections() {
    let app = create_test_app();
    let config = Configuration {
        include_timestamps: false,
        include_validations: false,
        include_scopes: false,
        ..Configuration::for_app_root(app.path())
    };
    let snapshot = load_snapshot(app.path());

    let tree = Generator::new(&config)
        .generate(&snapshot, &snapshot, &SourceTree::new(app.path()))
        .unwrap();

    let post = &tree.models["Post"];
    assert!(post.validations.is_empty());
    assert!(post.scopes.is_empty());
    // Timestamps only affect rendering
    assert_eq!(post.columns.len(), 7);

    let page = fs::read_to_string(config.output_dir.join("models/post.html")).unwrap();
    assert!(!page.contains("<code>created_at</code>"));
    assert!(!page.contains("<code>updated_at</code>"));
    assert!(page.contains("<code>title</code>"));
}

#[test]
fn test_stale_pages_survive_until_clean() {
    let app = create_test_app();
    let config = Configuration::for_app_root(app.path());
    let stale = config.output_dir.join("controllers/removed.html");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "old").unwrap();

    let snapshot = load_snapshot(app.path());
    Generator::new(&config)
        .generate(&snapshot, &snapshot, &SourceTree::new(app.path()))
        .unwrap();
    assert!(stale.is_file());

    cli::clean(&config.output_dir).unwrap();
    assert!(!config.output_dir.exists());
}

#[test]
fn test_export_formats() {
    let app = create_test_app();
    let config = Configuration::for_app_root(app.path());
    let snapshot = load_snapshot(app.path());
    let tree = Generator::new(&config).extract(&snapshot, &snapshot, &SourceTree::new(app.path()));

    let json = serialize_json(&tree).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let show = &parsed["handler_groups"]["posts"]["routes"][2];
    assert_eq!(show["path"], "/posts/:id");
    assert_eq!(
        show["path_params"],
        serde_json::json!([{ "name": "id", "type": "integer", "required": true, "location": "path" }])
    );
    assert_eq!(parsed["models"]["Post"]["associations"][1]["kind"], "has_many");

    let again = Generator::new(&config).extract(&snapshot, &snapshot, &SourceTree::new(app.path()));
    assert_eq!(json, serialize_json(&again).unwrap());

    let yaml = serialize_yaml(&tree).unwrap();
    assert!(yaml.contains("admin/users"));
    assert!(yaml.contains("Admin::UserProfile"));
}

#[test]
fn test_empty_snapshot_still_produces_site() {
    let app = create_test_app();
    let config = Configuration::for_app_root(app.path());
    let snapshot = AppSnapshot::from_json(r#"{ "routes": [], "models": [] }"#).unwrap();

    let tree = Generator::new(&config)
        .generate(&snapshot, &snapshot, &SourceTree::new(app.path()))
        .unwrap();

    assert_eq!(tree.handler_count(), 0);
    assert_eq!(tree.model_count(), 0);
    let index = fs::read_to_string(config.output_dir.join("index.html")).unwrap();
    assert!(index.contains("No routes found."));
}

#[test]
fn test_malformed_model_does_not_hide_the_rest() {
    let app = create_test_app();
    let config = Configuration::for_app_root(app.path());
    let snapshot = AppSnapshot::from_json(
        r#"{
            "routes": [
                { "verb": "GET", "path": "/posts(.:format)",
                  "requirements": { "controller": "posts", "action": "index" } }
            ],
            "models": [
                { "name": "Post", "table_name": "posts",
                  "columns": [{ "name": "views", "type": "integer", "default": 0 }],
                  "associations": [
                      { "name": "comments", "macro": "has_many", "foreign_key": ["shop_id", "post_id"] }
                  ] },
                { "name": "Comment", "table_name": "comments", "method_arities": { "recent": "zero" } }
            ]
        }"#,
    )
    .expect("One malformed model must not reject the snapshot");

    let tree = Generator::new(&config)
        .generate(&snapshot, &snapshot, &SourceTree::new(app.path()))
        .unwrap();

    assert_eq!(tree.route_count(), 1);
    assert_eq!(tree.model_count(), 1);
    let post = &tree.models["Post"];
    assert_eq!(post.columns[0].default.as_deref(), Some("0"));
    assert!(post.associations[0].foreign_key.is_some());

    let output = config.output_dir;
    assert!(output.join("models/post.html").is_file());
    assert!(!output.join("models/comment.html").exists());
}
