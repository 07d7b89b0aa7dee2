//! Converter invocation: the fixed flag template instantiated per job.
//!
//! ```text
//! <tool> -density <dpi> <extra…> -trim -background <bg> -alpha remove
//!        [-rotate <deg>] -fuzz <n>% -fill none -floodfill +0+0 <bg>
//!        -trim <source> <destination>
//! ```
//!
//! The result is an argument vector, not a shell string: each element is
//! passed to the child process verbatim.

use crate::config::ConverterConfig;
use crate::job::ConversionJob;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// A fully-resolved converter command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    /// Directory the child process starts in; `None` inherits ours.
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    /// Arguments as lossy UTF-8, for display and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Renders the invocation as a copy-pasteable shell command line.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

/// Quote a word only when a POSIX shell would otherwise split or expand it.
fn shell_quote(word: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "-_+./=:,@%".contains(c);
    if !word.is_empty() && word.chars().all(safe) {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// The per-run flag template, derived from a [`ConverterConfig`].
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    tool: String,
    density: u32,
    rotate: Option<i32>,
    fuzz_percent: u8,
    background: String,
    working_dir: Option<PathBuf>,
}

impl CommandTemplate {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            tool: config.tool.clone(),
            density: config.density,
            rotate: config.rotate.degrees(),
            fuzz_percent: config.fuzz_percent,
            background: config.background.clone(),
            working_dir: config.working_dir.clone(),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Build the invocation that writes `job` to its own destination.
    pub fn render(&self, job: &ConversionJob) -> Invocation {
        self.render_to(job, job.destination())
    }

    /// Build the invocation for `job`, writing to `output` instead of the
    /// job's destination. Used to target a staging file.
    pub fn render_to(&self, job: &ConversionJob, output: &Path) -> Invocation {
        let bg = self.background.as_str();
        let mut flags: Vec<String> = vec!["-density".to_string(), self.density.to_string()];
        flags.extend(job.extra_args.as_slice().iter().cloned());
        flags.extend(["-trim", "-background", bg, "-alpha", "remove"].map(String::from));
        if let Some(deg) = self.rotate {
            flags.extend(["-rotate".to_string(), deg.to_string()]);
        }
        flags.push("-fuzz".to_string());
        flags.push(format!("{}%", self.fuzz_percent));
        flags.extend(["-fill", "none", "-floodfill", "+0+0", bg, "-trim"].map(String::from));

        let mut args: Vec<OsString> = flags.into_iter().map(OsString::from).collect();
        args.push(job.source().as_os_str().to_owned());
        args.push(output.as_os_str().to_owned());

        Invocation {
            program: self.tool.clone(),
            args,
            current_dir: self.working_dir.clone(),
        }
    }
}
