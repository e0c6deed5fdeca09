//! The `example` command: bundled demonstration models which can be listed, extracted and run.
use super::{RunOpts, handle_run_command};
use crate::settings::Settings;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Every bundled example, one per subdirectory
static EXAMPLES_DIR: Dir<'static> = include_dir!("demos");

/// Each example describes itself in this file
const README_FILE_NAME: &str = "README.txt";

/// Subcommands for working with the bundled examples
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List the bundled examples with a short description of each.
    List,
    /// Print the full description of an example.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Copy an example's input files to a new directory.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// The directory to create (defaults to the example's name).
        new_path: Option<PathBuf>,
    },
    /// Run an example from a temporary copy.
    Run {
        /// The name of the example to run.
        name: String,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => {
                for (name, summary) in list_examples() {
                    println!("{name}: {summary}");
                }
            }
            Self::Info { name } => println!("{}", example_readme(&name)?),
            Self::Extract { name, new_path } => {
                let dest = new_path.unwrap_or_else(|| PathBuf::from(&name));
                extract_example(&name, &dest)?;
                println!("Extracted {name} to {}", dest.display());
            }
            Self::Run { name, opts } => handle_example_run_command(&name, &opts, None)?,
        }

        Ok(())
    }
}

/// Look up a bundled example by name
fn find_example(name: &str) -> Result<&'static Dir<'static>> {
    EXAMPLES_DIR
        .get_dir(name)
        .with_context(|| format!("No example called {name}"))
}

/// The README for the named example
fn example_readme(name: &str) -> Result<&'static str> {
    let path: PathBuf = [name, README_FILE_NAME].iter().collect();
    find_example(name)?
        .get_file(path)
        .with_context(|| format!("Example {name} has no {README_FILE_NAME}"))?
        .contents_utf8()
        .with_context(|| format!("{README_FILE_NAME} for {name} is not UTF-8 encoded"))
}

/// The name of every example, with the first line of its README
fn list_examples() -> Vec<(String, &'static str)> {
    EXAMPLES_DIR
        .dirs()
        .map(|dir| {
            let name = dir.path().display().to_string();
            let summary = example_readme(&name)
                .ok()
                .and_then(|readme| readme.lines().next())
                .unwrap_or_default();
            (name, summary)
        })
        .collect()
}

/// Copy the named example's files into `new_path`, which must not already exist
fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    let example = find_example(name)?;
    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    fs::create_dir(new_path)
        .with_context(|| format!("Could not create {}", new_path.display()))?;
    for entry in example.entries() {
        let DirEntry::File(file) = entry else {
            bail!(
                "Example {name} contains a subdirectory: {}",
                entry.path().display()
            );
        };
        let file_name = file
            .path()
            .file_name()
            .context("Invalid file name in example")?;
        fs::write(new_path.join(file_name), file.contents())?;
    }

    Ok(())
}

/// Handle the `example run` command.
///
/// The example is extracted to a temporary directory, which is removed afterwards. Outputs go to
/// `opts.output_dir` if given, otherwise to `gridplan_results/<name>` in the current directory.
pub fn handle_example_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = temp_dir.path().join(name);
    extract_example(name, &model_path)?;

    handle_run_command(&model_path, opts, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extract_example() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("simple");
        extract_example("simple", &dest).unwrap();
        assert!(dest.join("model.toml").is_file());
        assert!(dest.join(README_FILE_NAME).is_file());

        // Can't extract over an existing folder
        assert!(extract_example("simple", &dest).is_err());
    }

    #[test]
    fn test_extract_missing_example() {
        let dir = tempdir().unwrap();
        assert_eq!(
            extract_example("no_such_model", &dir.path().join("x"))
                .unwrap_err()
                .to_string(),
            "No example called no_such_model"
        );
    }

    #[test]
    fn test_list_examples() {
        let examples = list_examples();
        assert!(examples.contains(&(
            "simple".to_string(),
            "A small planning model for a single month."
        )));
    }
}
