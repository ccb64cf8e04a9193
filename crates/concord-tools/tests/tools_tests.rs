#[cfg(test)]
mod tests {
    use concord_core::{Cog, ConcordError, Result};
    use concord_tools::*;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    struct Deps {
        prefix: &'static str,
    }

    struct Greeter(String);

    #[async_trait::async_trait]
    impl Cog for Greeter {
        fn name(&self) -> &str {
            &self.0
        }
    }

    struct GreeterFactory;

    impl ToolFactory<Deps> for GreeterFactory {
        fn name(&self) -> &str {
            "greeter"
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::from([Capability::Cog, Capability::Listener])
        }

        fn construct(&self, definition: &ToolDefinition, deps: Arc<Deps>) -> Result<Arc<dyn Cog>> {
            Ok(Arc::new(Greeter(format!("{}{}", deps.prefix, definition.name))))
        }
    }

    struct BaseFactory;

    impl ToolFactory<Deps> for BaseFactory {
        fn name(&self) -> &str {
            "cog"
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::from([Capability::Cog])
        }

        fn construct(&self, _definition: &ToolDefinition, _deps: Arc<Deps>) -> Result<Arc<dyn Cog>> {
            Err(ConcordError::Extension {
                name: "cog".into(),
                reason: "abstract".into(),
            })
        }
    }

    fn catalog() -> ExtensionCatalog<Deps> {
        ExtensionCatalog::new(
            FactoryRegistry::new()
                .with(Arc::new(GreeterFactory))
                .with(Arc::new(BaseFactory)),
        )
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn default_include() -> Vec<String> {
        vec![DEFAULT_ARTIFACT_NAME.to_string()]
    }

    // ── Discovery tests ────────────────────────────────────────

    #[test]
    fn test_one_extension_per_artifact() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["one", "two", "three"] {
            write(
                dir.path(),
                &format!("{name}/__tool__.toml"),
                &format!("[{name}]\nfactory = \"greeter\"\n"),
            );
        }

        let include = default_include();
        let filter = CapabilityFilter::cog();
        let found = catalog()
            .discover(&[dir.path().to_path_buf()], Some(&include), Some(&filter))
            .unwrap();
        assert_eq!(found.len(), 3);
        let mut origins: Vec<_> = found.iter().map(|e| e.origin.clone()).collect();
        origins.dedup();
        assert_eq!(
            origins,
            vec!["one/__tool__.toml", "three/__tool__.toml", "two/__tool__.toml"]
        );
    }

    #[test]
    fn test_marker_is_never_returned() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a/__tool__.toml",
            "[Base]\nfactory = \"cog\"\n[Foo]\nfactory = \"greeter\"\n",
        );
        let filter = CapabilityFilter::cog();
        let found = catalog()
            .discover(&[dir.path().to_path_buf()], None, Some(&filter))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "Foo");
    }

    #[test]
    fn test_helper_next_to_tool_is_never_loaded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/__tool__.toml", "[Foo]\nfactory = \"greeter\"\n");
        // Would fail to load if it were read.
        write(dir.path(), "a/helper.toml", "[Helper]\nfactory = \"missing\"\n");

        let include = default_include();
        let filter = CapabilityFilter::cog();
        let found = catalog()
            .discover(&[dir.path().to_path_buf()], Some(&include), Some(&filter))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "Foo");
        assert_eq!(found[0].origin, "a/__tool__.toml");
    }

    #[test]
    fn test_missing_root_fails_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        // The valid root comes first; the missing one must still fail the call.
        write(dir.path(), "a/__tool__.toml", "[Foo]\nfactory = \"missing\"\n");
        let roots = vec![dir.path().to_path_buf(), dir.path().join("nope")];
        let err = catalog().discover(&roots, None, None).unwrap_err();
        assert!(matches!(err, ConcordError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_first_failure_aborts_discovery() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/__tool__.toml", "[Foo]\nfactory = \"greeter\"\n");
        write(dir.path(), "b/__tool__.toml", "[Bar]\nfactory = \"unknown\"\n");
        write(dir.path(), "c/__tool__.toml", "[Baz]\nfactory = \"greeter\"\n");

        let err = catalog()
            .discover(&[dir.path().to_path_buf()], None, None)
            .unwrap_err();
        match err {
            ConcordError::ImportFailure { artifact, .. } => {
                assert_eq!(artifact, "b/__tool__.toml")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_result_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.md", "nothing here");
        let found = catalog()
            .discover(&[dir.path().to_path_buf()], None, None)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_roots_keep_identical_names_apart() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(first.path(), "t/__tool__.toml", "[First]\nfactory = \"greeter\"\n");
        write(second.path(), "t/__tool__.toml", "[Second]\nfactory = \"greeter\"\n");

        let roots: Vec<PathBuf> = vec![first.path().into(), second.path().into()];
        let found = catalog().discover(&roots, None, None).unwrap();
        let names: Vec<_> = found.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert!(found.iter().all(|e| e.origin == "t/__tool__.toml"));
    }

    // ── Construction tests ─────────────────────────────────────

    #[test]
    fn test_extension_constructs_with_dependency() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "__tool__.toml",
            "[Foo]\nfactory = \"greeter\"\ngreeting = \"hello\"\n",
        );
        let found = catalog()
            .discover(&[dir.path().to_path_buf()], None, None)
            .unwrap();
        assert_eq!(
            found[0].definition.setting::<String>("greeting").unwrap().as_deref(),
            Some("hello")
        );
        assert!(!found[0].definition.settings.contains_key("factory"));
        let cog = found[0].construct(Arc::new(Deps { prefix: "my-" })).unwrap();
        assert_eq!(cog.name(), "my-Foo");
    }
}
