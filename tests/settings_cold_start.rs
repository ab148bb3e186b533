use d200ctl::settings::SettingsStore;

#[test]
fn cold_start_unpacks_defaults_and_resolves_default_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let settings_path = tmp.path().join("settings.json");
    let icons_dir = tmp.path().join("icons");

    let mut store = SettingsStore::new(settings_path.clone(), icons_dir.clone());
    assert!(store.reload_if_changed().unwrap(), "first load should unpack defaults");
    assert!(settings_path.exists());
    assert!(icons_dir.join("default.png").exists());

    let layout = store
        .layout_for_process("some_process_with_no_dedicated_entry")
        .expect("falls back to the default layout");
    assert_eq!(layout.name, "default");
    assert!(!layout.buttons.is_empty());

    assert!(!store.reload_if_changed().unwrap(), "second load without mtime change is a no-op");
}

#[test]
fn edited_settings_file_is_picked_up_on_reload() {
    let tmp = tempfile::tempdir().unwrap();
    let settings_path = tmp.path().join("settings.json");
    let icons_dir = tmp.path().join("icons");

    let mut store = SettingsStore::new(settings_path.clone(), icons_dir);
    store.reload_if_changed().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(1100));
    std::fs::write(&settings_path, r#"{"firefox":{"name":"firefox","buttons":[{"icon":"web.png"}]}}"#).unwrap();

    assert!(store.reload_if_changed().unwrap());
    let layout = store.layout_for_process("firefox").unwrap();
    assert_eq!(layout.buttons[0].icon.as_deref(), Some("web.png"));
}
