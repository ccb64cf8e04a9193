#[cfg(test)]
mod tests {
    use concord_cli::{Cli, parse_tool_directory_paths};
    use concord_core::ConcordError;
    use std::path::PathBuf;

    #[test]
    fn test_paths_resolve_against_base() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join("tools")).unwrap();
        let paths = parse_tool_directory_paths(&[PathBuf::from("tools")], base.path()).unwrap();
        assert_eq!(paths, vec![base.path().join("tools").canonicalize().unwrap()]);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join("a")).unwrap();
        std::fs::create_dir(base.path().join("b")).unwrap();
        let raw = [
            PathBuf::from("b"),
            PathBuf::from("a"),
            PathBuf::from("./b"),
            base.path().join("a"),
        ];
        let paths = parse_tool_directory_paths(&raw, base.path()).unwrap();
        let b = base.path().join("b").canonicalize().unwrap();
        let a = base.path().join("a").canonicalize().unwrap();
        assert_eq!(paths, vec![b, a]);
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let base = tempfile::tempdir().unwrap();
        let err = parse_tool_directory_paths(&[PathBuf::from("nope")], base.path()).unwrap_err();
        assert!(matches!(err, ConcordError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_file_is_not_a_tool_directory() {
        let base = tempfile::tempdir().unwrap();
        std::fs::write(base.path().join("tools.toml"), "").unwrap();
        let err =
            parse_tool_directory_paths(&[PathBuf::from("tools.toml")], base.path()).unwrap_err();
        assert!(matches!(err, ConcordError::DirectoryNotFound { .. }));
    }

    fn parse_cli(tool_paths: &str) -> Cli {
        <Cli as clap::Parser>::try_parse_from([
            "concord",
            "--bot-name",
            "testbot",
            "--tool-directory-paths",
            tool_paths,
        ])
        .unwrap()
    }

    #[test]
    fn test_flag_with_extra_whitespace_resolves() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join("tools")).unwrap();
        std::fs::create_dir(base.path().join("more")).unwrap();
        let cli = parse_cli("  tools   more  tools ");
        let paths = parse_tool_directory_paths(&cli.tool_directories(), base.path()).unwrap();
        assert_eq!(
            paths,
            vec![
                base.path().join("tools").canonicalize().unwrap(),
                base.path().join("more").canonicalize().unwrap(),
            ]
        );
    }

    #[test]
    fn test_empty_flag_means_no_tool_directories() {
        let base = tempfile::tempdir().unwrap();
        let cli = parse_cli("");
        assert!(parse_tool_directory_paths(&cli.tool_directories(), base.path())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_no_paths_is_valid() {
        let base = tempfile::tempdir().unwrap();
        assert!(parse_tool_directory_paths(&[], base.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_fails_on_missing_tool_directory() {
        let base = tempfile::tempdir().unwrap();
        let missing = base.path().join("missing");
        let cli = parse_cli(missing.to_str().unwrap());
        let err = cli.run().await.unwrap_err();
        assert!(matches!(err, ConcordError::DirectoryNotFound { .. }));
    }
}
