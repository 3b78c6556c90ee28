use std::fmt;
use std::fs;
use std::path::Path;

use crate::process::ProcessId;
use crate::session::Simulation;

/// One line of a simulation script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `spawn <name> <bytes>`
    Spawn { name: String, bytes: u64 },
    /// `access <pid> <va>`
    Access { pid: ProcessId, va: u64 },
    /// `release <pid>`
    Release { pid: ProcessId },
    /// `check`
    Check,
    /// `reset`
    Reset,
}

#[derive(Debug)]
pub enum ScriptError {
    Io(std::io::Error),
    Parse { line: usize, message: String },
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Io(e) => write!(f, "failed to read script: {}", e),
            ScriptError::Parse { line, message } => write!(f, "line {}: {}", line, message),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScriptError::Io(e) => Some(e),
            ScriptError::Parse { .. } => None,
        }
    }
}

impl From<std::io::Error> for ScriptError {
    fn from(e: std::io::Error) -> Self {
        ScriptError::Io(e)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Script {
    pub commands: Vec<Command>,
}

impl Script {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScriptError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a script. Blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Result<Self, ScriptError> {
        let mut commands = Vec::new();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let command = Self::parse_line(line).map_err(|message| ScriptError::Parse {
                line: index + 1,
                message,
            })?;
            commands.push(command);
        }
        Ok(Script { commands })
    }

    fn parse_line(line: &str) -> Result<Command, String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let args = &tokens[1..];
        let expect = |n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(format!("'{}' takes {} arguments, got {}", tokens[0], n, args.len()))
            }
        };

        match tokens[0] {
            "spawn" => {
                expect(2)?;
                Ok(Command::Spawn {
                    name: args[0].to_string(),
                    bytes: parse_number(args[1], "memory requirement")?,
                })
            }
            "access" => {
                expect(2)?;
                Ok(Command::Access {
                    pid: parse_pid(args[0])?,
                    va: parse_number(args[1], "virtual address")?,
                })
            }
            "release" => {
                expect(1)?;
                Ok(Command::Release { pid: parse_pid(args[0])? })
            }
            "check" => {
                expect(0)?;
                Ok(Command::Check)
            }
            "reset" => {
                expect(0)?;
                Ok(Command::Reset)
            }
            other => Err(format!("unknown command: {}", other)),
        }
    }

    /// Run every command against `sim`, one result line per command.
    pub fn run(&self, sim: &mut Simulation) -> Vec<String> {
        self.commands.iter().map(|command| execute(sim, command)).collect()
    }
}

fn parse_number(token: &str, what: &str) -> Result<u64, String> {
    token.parse().map_err(|_| format!("invalid {}: {}", what, token))
}

fn parse_pid(token: &str) -> Result<ProcessId, String> {
    token
        .parse::<u32>()
        .map(ProcessId::new)
        .map_err(|_| format!("invalid pid: {}", token))
}

/// Apply one command and render its outcome.
pub fn execute(sim: &mut Simulation, command: &Command) -> String {
    match command {
        Command::Spawn { name, bytes } => match sim.spawn(name, *bytes) {
            Ok(pid) => pid.to_string(),
            Err(e) => format!("error: {}", e),
        },
        Command::Access { pid, va } => match sim.access(*pid, *va) {
            Ok(translation) => {
                log::info!("PID {}: {}", pid, translation);
                translation.physical.to_string()
            }
            Err(e) => format!("error: {}", e),
        },
        Command::Release { pid } => match sim.release(*pid) {
            Ok(_) => "ok".to_string(),
            Err(e) => format!("error: {}", e),
        },
        Command::Check => match sim.memory().check_consistency() {
            Ok(()) => "ok".to_string(),
            Err(e) => format!("error: {}", e),
        },
        Command::Reset => {
            sim.reset();
            "ok".to_string()
        }
    }
}

pub fn write_results<P: AsRef<Path>>(path: P, results: &[String]) -> std::io::Result<()> {
    let mut content = results.join("\n");
    content.push('\n');
    fs::write(path.as_ref(), content)
}
