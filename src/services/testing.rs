//! Test executor: applies filesystem steps for real, fakes processes.

use crate::domain::{Outcome, Step, StepAction};
use crate::error::{AppError, Result};
use crate::services::executor::{ensure_cwd, CommandExecutor, RecordedStep, SystemExecutor};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// `git clone <url> <dest>` and `npm create` lay down a minimal tree; every
/// other process succeeds unless its command line matches a failure rule.
/// A missing working directory fails the same way the system executor does.
#[derive(Default)]
pub struct ScriptedExecutor {
    fs: SystemExecutor,
    failures: Vec<(String, i32)>,
    interrupt_on: Option<String>,
    recorded: Mutex<Vec<RecordedStep>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `code` whenever the command line contains `needle`
    pub fn fail_when(mut self, needle: &str, code: i32) -> Self {
        self.failures.push((needle.to_string(), code));
        self
    }

    /// Report an operator interrupt for the first matching command line
    pub fn interrupt_when(mut self, needle: &str) -> Self {
        self.interrupt_on = Some(needle.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<RecordedStep> {
        self.recorded.lock().unwrap().clone()
    }

    fn fake_clone(dest: &Path) {
        fs::create_dir_all(dest.join(".git")).unwrap();
        fs::create_dir_all(dest.join("models")).unwrap();
        fs::write(dest.join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();
        fs::write(dest.join("main.py"), "print('comfy')\n").unwrap();
        fs::write(dest.join("requirements.txt"), "torch\n").unwrap();
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, step: &Step) -> Result<Outcome> {
        self.recorded.lock().unwrap().push(RecordedStep::of(step));

        let StepAction::Process { program, args } = &step.action else {
            return self.fs.run(step).await;
        };

        if let Some(cwd) = &step.cwd {
            ensure_cwd(cwd)?;
        }
        let command = step.command_line();
        if self.interrupt_on.as_deref().is_some_and(|n| command.contains(n)) {
            return Ok(Outcome::cancelled(step));
        }
        if let Some((_, code)) = self.failures.iter().find(|(n, _)| command.contains(n.as_str())) {
            let outcome = Outcome::completed(step, Some(*code));
            if step.mandatory {
                return Err(AppError::Execution {
                    argv: step.argv(),
                    exit_code: Some(*code),
                });
            }
            return Ok(outcome);
        }

        let first = args.first().map(String::as_str);
        if program == "git" && first == Some("clone") {
            if let Some(dest) = args.get(2) {
                Self::fake_clone(Path::new(dest));
            }
        }
        if program == "npm" && first == Some("create") {
            if let (Some(cwd), Some(name)) = (&step.cwd, args.get(2)) {
                fs::create_dir_all(cwd.join(name).join("src")).unwrap();
            }
        }
        Ok(Outcome::completed(step, Some(0)))
    }

    fn is_simulation(&self) -> bool {
        false
    }
}
