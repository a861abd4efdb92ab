// tests/config_behaviour.rs

mod common;
use crate::common::{init_tracing, TestProject};

use frontpipe::config::{load_and_validate, load_from_path, validate_source_root, EnvOverrides};
use frontpipe::errors::FrontpipeError;
use frontpipe::fs::{MockFileSystem, RealFileSystem};
use frontpipe::types::BuildMode;

#[test]
fn missing_config_file_means_conventional_layout() {
    init_tracing();
    let project = TestProject::new();

    let cfg = load_and_validate(project.path("Frontpipe.toml"), &EnvOverrides::default())
        .expect("defaults are valid");

    assert_eq!(cfg.root(), project.root());
    assert_eq!(cfg.mode, BuildMode::Development);
    assert_eq!(cfg.src.blocks, "src/blocks");
    assert_eq!(cfg.dest_root(), project.path("build"));
    assert_eq!(cfg.dest_dir(&cfg.dest.css), project.path("build/css"));
    assert_eq!(cfg.manifest.style_before, vec!["app.scss"]);
    assert_eq!(cfg.debounce().as_millis(), 100);
}

#[test]
fn file_values_are_normalised_and_overridden_by_env() {
    init_tracing();
    let project = TestProject::new();
    project.file(
        "Frontpipe.toml",
        r#"
[src]
blocks = "./src/components/"

[dest]
root = "public"
css = "styles/"

[assets]
"src/static/**/*" = "static"

[manifest]
style_before = ["vars.scss", "app.scss"]

[server]
port = 3000
"#,
    );

    let cfg = load_and_validate(project.path("Frontpipe.toml"), &EnvOverrides::default()).unwrap();
    assert_eq!(cfg.src.blocks, "src/components");
    assert_eq!(cfg.dest.root, "public");
    assert_eq!(cfg.dest.css, "styles");
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.manifest.style_before, vec!["vars.scss", "app.scss"]);
    // An explicit [assets] table replaces the default fonts rule.
    assert_eq!(cfg.assets.len(), 1);
    assert_eq!(cfg.assets[0].pattern, "src/static/**/*");

    let env = EnvOverrides::from_vars([("NODE_ENV", "production"), ("DEST", "dist")]);
    let cfg = load_and_validate(project.path("Frontpipe.toml"), &env).unwrap();
    assert!(cfg.mode.is_production());
    assert_eq!(cfg.dest_root(), project.path("dist"));
}

#[test]
fn mistyped_values_are_toml_errors() {
    init_tracing();
    let project = TestProject::new();
    project.file("Frontpipe.toml", "[server]\nport = \"eighty\"\n");

    assert!(matches!(
        load_from_path(project.path("Frontpipe.toml")),
        Err(FrontpipeError::Toml(_))
    ));
}

#[test]
fn env_dest_must_not_swallow_the_sources() {
    init_tracing();
    let project = TestProject::new();
    let env = EnvOverrides::from_vars([("DEST", ".")]);

    let err = load_and_validate(project.path("Frontpipe.toml"), &env).unwrap_err();
    assert!(matches!(err, FrontpipeError::Config(_)), "{err}");
}

#[test]
fn env_dest_may_not_climb_out_of_the_project() {
    init_tracing();
    let project = TestProject::new();
    project.file("site/src/scss/app.scss", "body {}");
    let config = project.path("site/Frontpipe.toml");

    for dest in ["..", "src/..", "src/../..", "../elsewhere"] {
        let env = EnvOverrides::from_vars([("DEST", dest)]);
        let err = load_and_validate(&config, &env).unwrap_err();
        assert!(matches!(err, FrontpipeError::Config(_)), "{dest}: {err}");
    }
    assert_eq!(project.read("site/src/scss/app.scss"), "body {}");
}

#[test]
fn absolute_env_dest_is_checked_against_the_project_root() {
    init_tracing();
    let project = TestProject::new();
    project.dir("site/src");
    let config = project.path("site/Frontpipe.toml");

    let ancestor = project.root().to_string_lossy().into_owned();
    let env = EnvOverrides::from_vars([("DEST", ancestor.as_str())]);
    let err = load_and_validate(&config, &env).unwrap_err();
    assert!(err.to_string().contains("ancestors"), "{err}");

    let site = project.path("site").to_string_lossy().into_owned();
    let env = EnvOverrides::from_vars([("DEST", site.as_str())]);
    assert!(matches!(
        load_and_validate(&config, &env),
        Err(FrontpipeError::Config(_))
    ));

    let public = project.path("site/public").to_string_lossy().into_owned();
    let env = EnvOverrides::from_vars([("DEST", public.as_str())]);
    let cfg = load_and_validate(&config, &env).unwrap();
    assert_eq!(cfg.dest_root(), project.path("site/public"));
}

#[test]
fn missing_source_root_is_fatal() {
    init_tracing();
    let project = TestProject::new();
    let cfg = load_and_validate(project.path("Frontpipe.toml"), &EnvOverrides::default()).unwrap();
    assert!(validate_source_root(&cfg, &RealFileSystem).is_ok());

    let empty = MockFileSystem::new();
    let err = validate_source_root(&cfg, &empty).unwrap_err();
    assert!(err.to_string().contains("does not exist"), "{err}");
}
