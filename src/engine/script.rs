//! XFOIL command transcript.
//!
//! Every variant renders to exactly one input line of XFOIL's modal prompt.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Enter the plot options menu (`plop`)
    PlotOptions,
    /// Toggle graphics off inside `plop` (`g f`)
    GraphicsOff,
    /// Empty line: leaves the current menu, or skips an optional prompt
    Blank,
    Naca(String),
    Load(PathBuf),
    /// Re-panel the current geometry
    Pane,
    Save(PathBuf),
    Oper,
    Visc(f64),
    Iter(u32),
    Alfa(f64),
    Cpwr(PathBuf),
    /// Polar accumulation toggle. XFOIL uses the same token to start and stop.
    Pacc,
    /// Answer to the polar file prompt that follows the first `pacc`
    PolarFile(PathBuf),
    Quit,
    Raw(String),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PlotOptions => f.write_str("plop"),
            Command::GraphicsOff => f.write_str("g f"),
            Command::Blank => Ok(()),
            Command::Naca(digits) => write!(f, "naca {}", digits),
            Command::Load(path) => write!(f, "load {}", path.display()),
            Command::Pane => f.write_str("pane"),
            Command::Save(path) => write!(f, "save {}", path.display()),
            Command::Oper => f.write_str("oper"),
            Command::Visc(re) => write!(f, "visc {}", re),
            Command::Iter(n) => write!(f, "iter {}", n),
            Command::Alfa(alfa) => write!(f, "alfa {}", alfa),
            Command::Cpwr(path) => write!(f, "cpwr {}", path.display()),
            Command::Pacc => f.write_str("pacc"),
            Command::PolarFile(path) => write!(f, "{}", path.display()),
            Command::Quit => f.write_str("quit"),
            Command::Raw(line) => f.write_str(line),
        }
    }
}

/// Append-only, ordered list of commands for one XFOIL invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    commands: Vec<Command>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn extend<I: IntoIterator<Item = Command>>(&mut self, cmds: I) {
        self.commands.extend(cmds);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Rendered input lines, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.to_string()).collect()
    }

    /// Full stdin payload: every line newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for cmd in &self.commands {
            out.push_str(&cmd.to_string());
            out.push('\n');
        }
        out
    }
}
