// Unit tests for usrdir-console
// These tests work with the public API only

fn temp_path(tag: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nonce = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("usrdir_{tag}_{}_{nonce}.conf", std::process::id()));
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod config_tests {
    use super::temp_path;
    use std::path::PathBuf;
    use usrdir_console::config::{ConsoleConfig, ThemeName};

    #[test]
    fn test_config_roundtrip_through_file() {
        let path = temp_path("config");
        let cfg = ConsoleConfig {
            page_size: 25,
            users_file: Some(PathBuf::from("/srv/users.json")),
            groups_file: None,
            log_file: PathBuf::from("/tmp/console.log"),
            log_filter: "usrdir_console=debug".into(),
            theme: ThemeName::Dark,
        };
        cfg.write_file(&path).expect("write config");
        let back = ConsoleConfig::from_file(&path).expect("read config");
        assert_eq!(back, cfg);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_load_or_init_creates_file() {
        let path = temp_path("config_init");
        let _ = std::fs::remove_file(&path);
        let cfg = ConsoleConfig::load_or_init(&path);
        assert!(std::path::Path::new(&path).exists());
        assert_eq!(cfg.page_size, 10);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_bad_values_fall_back() {
        let cfg = ConsoleConfig::parse("page_size = 0\ntheme = neon\nunknown = 1\n");
        assert_eq!(cfg, ConsoleConfig::default());
    }
}

#[cfg(test)]
mod keymap_tests {
    use super::temp_path;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use usrdir_console::app::keymap::{KeyAction, Keymap};

    #[test]
    fn test_keymap_file_overrides_defaults() {
        let path = temp_path("keys");
        std::fs::write(&path, "NewUser = a\nQuit = Ctrl+x\n").unwrap();
        let km = Keymap::from_file(&path).expect("read keymap");
        let a = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        let ctrl_x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(km.resolve(&a), Some(KeyAction::NewUser));
        assert_eq!(km.resolve(&ctrl_x), Some(KeyAction::Quit));
        // Defaults still present.
        let n = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE);
        assert_eq!(km.resolve(&n), Some(KeyAction::NewUser));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_keymap_write_then_read_keeps_bindings() {
        let path = temp_path("keys_rt");
        let km = Keymap::new_defaults();
        km.write_file(&path).unwrap();
        let back = Keymap::from_file(&path).unwrap();
        for action in [KeyAction::Quit, KeyAction::DeleteSelection, KeyAction::NextPage] {
            assert_eq!(back.keys_for(action), km.keys_for(action));
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_header_hints_follow_rebinding() {
        use usrdir_console::ui::key_hints;
        let hints = key_hints(&Keymap::new_defaults());
        assert!(hints.contains("n: new"));
        assert!(hints.contains("Delete/d: delete"));

        let km = Keymap::parse("NewUser = a\n");
        assert!(key_hints(&km).contains("a/n: new"));
    }
}

#[cfg(test)]
mod search_tests {
    use usrdir_console::directory::DirectorySeed;
    use usrdir_console::search::user_matches;

    #[test]
    fn test_keyword_matches_role_and_email() {
        let seed = DirectorySeed::sample().unwrap();
        let admins: Vec<_> = seed.users.iter().filter(|u| user_matches(u, "admin")).collect();
        assert!(!admins.is_empty());
        assert!(admins.iter().all(|u| u.role_names.contains("Admin") || u.user_type.to_lowercase().contains("admin")));

        let by_mail: Vec<_> = seed.users.iter().filter(|u| user_matches(u, "GRACE.HOPPER@")).collect();
        assert_eq!(by_mail.len(), 1);
        assert_eq!(by_mail[0].id, 7);
    }

    #[test]
    fn test_special_characters_do_not_panic() {
        let seed = DirectorySeed::sample().unwrap();
        assert!(!seed.users.iter().any(|u| user_matches(u, "[(*")));
    }
}

#[cfg(test)]
mod tree_tests {
    use usrdir_console::tree::{EntityTreeIndex, GroupSource};
    use usrdir_console::ui::components::format_count;

    fn sample() -> EntityTreeIndex {
        EntityTreeIndex::build(&GroupSource::sample_forest().unwrap())
    }

    #[test]
    fn test_sample_aggregates() {
        let tree = sample();
        let cardinal = tree.find_by_path("Cardinal Health").unwrap();
        let ball = tree.find_by_path("Cardinal Health/Ball And Foodstores").unwrap();
        let ph5 = tree.find_by_path("Cardinal Health/Ball And Foodstores/Pharmacy 5").unwrap();
        assert_eq!(format_count(tree.node(cardinal).unwrap().aggregate_count), "4,923");
        assert_eq!(tree.node(ball).unwrap().aggregate_count, 2573);
        assert_eq!(tree.node(ph5).unwrap().aggregate_count, 534);
    }

    #[test]
    fn test_leaf_query_keeps_ancestor_chain() {
        let tree = sample();
        let view = tree.search("NCPDP 14");
        let names: Vec<&str> = view.rows().iter().map(|r| r.node.name.as_str()).collect();
        assert_eq!(names, ["Cardinal Health", "Ball And Foodstores", "Pharmacy 5", "NCPDP 14"]);
        let rows = view.rows();
        assert!(rows[3].node.matched);
        assert!(!rows[2].node.matched);
        // Ancestors keep their full totals.
        assert_eq!(rows[0].node.aggregate_count, 4923);
    }

    #[test]
    fn test_path_query_requires_ancestor_order() {
        let tree = sample();
        let view = tree.search_auto("harbor/ncpdp 3");
        let matched: Vec<String> = view
            .matched_ids()
            .into_iter()
            .filter_map(|id| tree.path_of(id))
            .collect();
        assert_eq!(
            matched,
            [
                "Cardinal Health/Harbor Region/Pharmacy 11/NCPDP 30",
                "Cardinal Health/Harbor Region/Pharmacy 12/NCPDP 31",
                "Cardinal Health/Harbor Region/Pharmacy 12/NCPDP 32",
            ]
        );
        assert!(tree.search_auto("ncpdp 3/harbor").is_empty());
    }

    #[test]
    fn test_no_match_yields_empty_view() {
        let tree = sample();
        let view = tree.search("zzz");
        assert!(view.is_empty());
        assert_eq!(view.len(), 0);
    }
}

#[cfg(test)]
mod model_tests {
    use usrdir_console::directory::{ListQuery, PagedResult, UserRecord};
    use usrdir_console::error::FormField;
    use usrdir_console::modal::UserForm;

    #[test]
    fn test_query_uses_wire_names() {
        let q = ListQuery::first_page(10).for_page(3);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["maxResultCount"], 10);
        assert_eq!(json["skipCount"], 20);
        assert_eq!(q.page_number(), 3);
    }

    #[test]
    fn test_paged_result_from_json() {
        let page: PagedResult<UserRecord> = serde_json::from_str(
            r#"{"items":[{"id":3,"firstName":"Ada","lastName":"King","emailAddress":"ada@example.com","isActive":true,"roleNames":["User"]}],"totalCount":21}"#,
        )
        .unwrap();
        assert_eq!(page.items[0].full_name(), "Ada King");
        assert_eq!(page.page_count(10), 3);
    }

    #[test]
    fn test_form_validation_reports_each_field() {
        let form = UserForm {
            email_address: "a@b@c".into(),
            ..UserForm::default()
        };
        let errors = form.validate(&["User".to_string()]).unwrap_err();
        let fields: Vec<FormField> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            [FormField::FirstName, FormField::LastName, FormField::EmailAddress]
        );
    }
}
