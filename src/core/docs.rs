//! API documentation
//!
//! Runs the configured documentation generators and copies the generated
//! documents next to the release artifacts.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::defaults;
use crate::config::release::DocJob;
use crate::error::ReleaseError;
use crate::infra::command::{CommandLine, CommandRunner, StderrPolicy};
use crate::infra::filesystem;

/// Component name of the documentation log
pub const DOC_LOG: &str = "doc";

fn revision_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]+-(.+)$").expect("valid revision regex"))
}

/// Documented revision: the friendly release name without its product prefix
/// (`MEPA-2024.03` becomes `2024.03`)
pub fn doc_revision(friendly_name: &str) -> String {
    revision_regex()
        .captures(friendly_name)
        .and_then(|c| c.get(1))
        .map_or_else(|| friendly_name.to_string(), |m| m.as_str().to_string())
}

/// Interpreter for the generator scripts: the first existing candidate,
/// otherwise the plain interpreter from PATH
pub fn find_interpreter(configured: &[String]) -> String {
    let home = dirs::home_dir();
    let builtin = defaults::INTERPRETER_CANDIDATES.iter().rev().map(ToString::to_string);
    for candidate in configured.iter().cloned().chain(builtin) {
        let path = PathBuf::from(&candidate);
        let path = match (&home, path.is_absolute()) {
            (_, true) => path,
            (Some(home), false) => home.join(path),
            (None, false) => continue,
        };
        if path.is_file() {
            return path.display().to_string();
        }
    }
    which::which(defaults::INTERPRETER).map_or_else(
        |_| defaults::INTERPRETER.to_string(),
        |p| p.display().to_string(),
    )
}

/// Runs documentation generators against one source tree
#[derive(Debug, Clone)]
pub struct DocBuilder {
    jobs: Vec<DocJob>,
    interpreter: String,
    revision: String,
    sha: String,
    policy: StderrPolicy,
}

impl DocBuilder {
    /// Builder for `jobs`, documenting `revision` at commit `sha`
    pub fn new(jobs: Vec<DocJob>, interpreter: impl Into<String>, revision: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            jobs,
            interpreter: interpreter.into(),
            revision: revision.into(),
            sha: sha.into(),
            policy: StderrPolicy::Lenient,
        }
    }

    /// Stderr policy for generator runs
    #[must_use]
    pub fn with_policy(mut self, policy: StderrPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether any generator is configured
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Generator command of one job
    pub fn command(&self, source: &Path, job: &DocJob) -> CommandLine {
        CommandLine::new(&self.interpreter)
            .arg(&job.generator)
            .arg("-r")
            .arg(&self.revision)
            .arg("-s")
            .arg(&self.sha)
            .current_dir(source.join(&job.scripts_dir))
    }

    /// Run every generator in `source` and copy each document into all
    /// `destinations` that exist. Returns the generated documents.
    pub async fn generate(
        &self,
        runner: &CommandRunner,
        source: &Path,
        destinations: &[&Path],
    ) -> Result<Vec<PathBuf>, ReleaseError> {
        let mut documents = Vec::new();
        for job in &self.jobs {
            runner
                .execute(&self.command(source, job), self.policy, Some(DOC_LOG))
                .await?;
            let document = source.join(&job.output);
            for dest in destinations.iter().filter(|d| d.is_dir()) {
                filesystem::copy_into(&document, dest)?;
            }
            tracing::info!("Generated {}", document.display());
            documents.push(document);
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_doc_revision() {
        assert_eq!(doc_revision("MEPA-2024.03"), "2024.03");
        assert_eq!(doc_revision("MESA-2024.03-rc1"), "2024.03-rc1");
        assert_eq!(doc_revision("2024.03"), "2024.03");
        assert_eq!(doc_revision(""), "");
    }

    #[test]
    fn test_find_interpreter_prefers_existing_candidate() {
        let temp = TempDir::new().unwrap();
        let wrapper = temp.path().join("ruby");
        std::fs::write(&wrapper, "").unwrap();

        let found = find_interpreter(&[
            temp.path().join("missing").display().to_string(),
            wrapper.display().to_string(),
        ]);
        assert_eq!(found, wrapper.display().to_string());
    }

    #[test]
    fn test_generator_command() {
        let job = DocJob {
            scripts_dir: "mepa/docs/scripts".to_string(),
            generator: "./dg.rb".to_string(),
            output: "mepa/mepa-doc.html".to_string(),
        };
        let builder = DocBuilder::new(vec![job.clone()], "ruby", "2024.03", "abc1234");
        let cmd = builder.command(Path::new("/ws"), &job);
        assert_eq!(cmd.to_string(), "ruby ./dg.rb -r 2024.03 -s abc1234");
        assert_eq!(cmd.working_dir(), Some(Path::new("/ws/mepa/docs/scripts")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_copies_documents() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        let scripts = source.join("mepa/docs/scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(
            scripts.join("dg.sh"),
            "echo \"<html>$2 $4</html>\" > ../../mepa-doc.html\n",
        )
        .unwrap();
        let images = temp.path().join("images");
        std::fs::create_dir_all(&images).unwrap();

        let job = DocJob {
            scripts_dir: "mepa/docs/scripts".to_string(),
            generator: "./dg.sh".to_string(),
            output: "mepa/mepa-doc.html".to_string(),
        };
        let builder = DocBuilder::new(vec![job], "sh", "2024.03", "abc1234")
            .with_policy(StderrPolicy::Strict);
        let runner = CommandRunner::new(&images);
        let missing = temp.path().join("missing");

        let docs = builder
            .generate(&runner, &source, &[images.as_path(), missing.as_path()])
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        let copied = std::fs::read_to_string(images.join("mepa-doc.html")).unwrap();
        assert_eq!(copied.trim(), "<html>2024.03 abc1234</html>");
        assert!(images.join("build-doc.log").exists());
    }
}
