use configuration::{Settings, StorageBackend};

#[test]
fn default_settings_are_valid_and_use_postgres() {
    let settings = Settings::default();
    settings.validate().expect("defaults should validate");

    assert_eq!(settings.storage.backend, StorageBackend::Postgres);
    assert_eq!(settings.server.socket_addr().unwrap().port(), 3000);
    assert_eq!(settings.enrollment.max_retries, 3);
}
