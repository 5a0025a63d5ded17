//! Configuration precedence: packaged defaults, explicit file, environment.

use serial_test::serial;

use vitrine::config;

#[test]
#[serial]
fn packaged_defaults_load_without_any_overrides() {
    let settings = config::load(None).unwrap();
    assert_eq!(settings.rate_limit.contact_limit, 5);
    assert_eq!(settings.cache.list_ttl_secs, 1800);
    assert!(settings.database.url.is_none());
}

#[test]
#[serial]
fn explicit_file_overrides_only_what_it_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(
        &path,
        "[rate_limit]\ncontact_limit = 9\n\n[cache]\nentry_limit = 32\n",
    )
    .unwrap();

    let settings = config::load(Some(path.as_path())).unwrap();
    assert_eq!(settings.rate_limit.contact_limit, 9);
    assert_eq!(settings.cache.entry_limit, 32);
    // untouched keys keep their defaults
    assert_eq!(settings.rate_limit.subscribe_limit, 3);
    assert_eq!(settings.cache.list_ttl_secs, 1800);
}

#[test]
#[serial]
fn environment_variables_override_files() {
    unsafe {
        std::env::set_var("VITRINE__CACHE__LIST_TTL_SECS", "77");
    }
    let settings = config::load(None).unwrap();
    unsafe {
        std::env::remove_var("VITRINE__CACHE__LIST_TTL_SECS");
    }

    assert_eq!(settings.cache.list_ttl_secs, 77);
}
