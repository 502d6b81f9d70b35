//! Credential source discovery and priority.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use tempfile::TempDir;
use warehouse_extract::config::SslPolicy;
use warehouse_extract::credentials::{resolve, CredentialScope, CredentialSource, CredentialSources};

fn env_vars() -> HashMap<String, String> {
    [
        ("vertica_host", "env-host"),
        ("vertica_database", "env-db"),
        ("vertica_user_username", "env-user"),
        ("vertica_user_password", "env-pass"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[test]
fn test_yaml_found_in_parent_directory() {
    let project = TempDir::new().unwrap();
    let notebooks = project.path().join("notebooks").join("exploration");
    std::fs::create_dir_all(&notebooks).unwrap();
    std::fs::write(
        project.path().join(".config.yml"),
        "vertica:\n  host: yaml-host\n  database: advana\n  \
         user:\n    username: u\n    password: p\n",
    )
    .unwrap();

    let sources = CredentialSources::discover(&notebooks, env_vars()).unwrap();
    let resolved = resolve(&sources, &CredentialScope::default()).unwrap();

    assert_eq!(
        resolved.source,
        CredentialSource::Yaml(project.path().join(".config.yml"))
    );
    assert_eq!(resolved.config.host.as_deref(), Some("yaml-host"));
    assert_eq!(resolved.config.port, 5433);
}

#[test]
fn test_shell_file_with_ssl_opt_out() {
    let project = TempDir::new().unwrap();
    std::fs::write(
        project.path().join(".config.sh"),
        "export vertica_host=sh-host\n\
         export vertica_database=sh-db\n\
         export vertica_user_username=sh-user\n\
         export vertica_user_password=sh-pass\n\
         export VERTICA_NO_SSL=1\n",
    )
    .unwrap();

    let sources = CredentialSources::discover(project.path(), HashMap::new()).unwrap();
    let resolved = resolve(&sources, &CredentialScope::default()).unwrap();

    assert!(matches!(resolved.source, CredentialSource::ShellEnv(_)));
    assert_eq!(resolved.config.user.as_deref(), Some("sh-user"));
    assert_eq!(resolved.config.ssl, SslPolicy::Disabled);
}

#[test]
fn test_malformed_yaml_is_a_config_error() {
    let project = TempDir::new().unwrap();
    std::fs::write(project.path().join(".config.yml"), "vertica: [unclosed").unwrap();

    let sources = CredentialSources::discover(project.path(), env_vars()).unwrap();
    let err = resolve(&sources, &CredentialScope::default()).unwrap_err();

    assert_eq!(err.category(), "Configuration Error");
}

#[test]
fn test_incomplete_environment_names_missing_field() {
    let mut vars = env_vars();
    vars.remove("vertica_user_password");
    let sources = CredentialSources {
        env: vars,
        ..Default::default()
    };

    let err = resolve(&sources, &CredentialScope::default()).unwrap_err();
    assert_eq!(err.category(), "Credentials Error");
    assert!(err.to_string().contains("'password'"));
}
