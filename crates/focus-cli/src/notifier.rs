//! System notification backends for the terminal host.

use std::io::Write;
use std::process::{Command, Stdio};

use focus_core::{Notifier, Permission, SilentNotifier};

use crate::config::NotifierKind;

/// Writes notifications as `[focus] title: body` lines.
#[derive(Debug)]
pub struct TerminalNotifier<W> {
    out: W,
}

impl<W: Write> TerminalNotifier<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Notifier for TerminalNotifier<W> {
    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn show(&mut self, title: &str, body: &str) {
        if let Err(err) = writeln!(self.out, "[focus] {title}: {body}") {
            tracing::warn!(error = %err, "failed to write notification");
        }
    }
}

/// Shells out to `notify-send`.
#[derive(Debug)]
pub struct DesktopNotifier {
    program: &'static str,
}

impl DesktopNotifier {
    const fn with_program(program: &'static str) -> Self {
        Self { program }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::with_program("notify-send")
    }
}

impl Notifier for DesktopNotifier {
    fn request_permission(&mut self) -> Permission {
        if which::which(self.program).is_ok() {
            Permission::Granted
        } else {
            tracing::warn!(program = self.program, "not found, desktop notifications disabled");
            Permission::Denied
        }
    }

    fn show(&mut self, title: &str, body: &str) {
        let status = Command::new(self.program)
            .args(["--app-name", "focus", title, body])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::warn!(program = self.program, %status, "notifier failed"),
            Err(err) => tracing::warn!(program = self.program, error = %err, "failed to run notifier"),
        }
    }
}

pub fn build(kind: NotifierKind) -> Box<dyn Notifier> {
    match kind {
        NotifierKind::Terminal => Box::new(TerminalNotifier::new(std::io::stderr())),
        NotifierKind::Desktop => Box::new(DesktopNotifier::default()),
        NotifierKind::Off => Box::new(SilentNotifier),
    }
}
