//! Integration tests for the `example run` command.
use gridplan::cli::RunOpts;
use gridplan::cli::example::handle_example_run_command;
use gridplan::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("GRIDPLAN_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        overwrite: false,
        debug_model: true,
    };
    handle_example_run_command("simple", &opts, Some(Settings::default())).unwrap();

    assert!(
        tempdir
            .path()
            .join("debug_representative_profiles.csv")
            .is_file()
    );
}
