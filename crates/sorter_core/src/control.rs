/// Commands that change the run's control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
    Stop,
}

/// Observable phase derived from a [`ControlSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Running,
    Paused,
    Stopping,
}

/// Cooperative run control flags.
///
/// `stop_requested` is terminal: once set, no command clears it and `paused`
/// no longer matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlSignal {
    stop_requested: bool,
    paused: bool,
}

impl ControlSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure transition: applies a command and returns the next signal.
    pub fn apply(self, command: ControlCommand) -> Self {
        if self.stop_requested {
            return self;
        }
        match command {
            ControlCommand::Pause => Self {
                paused: true,
                ..self
            },
            ControlCommand::Resume => Self {
                paused: false,
                ..self
            },
            ControlCommand::Stop => Self {
                stop_requested: true,
                paused: false,
            },
        }
    }

    pub fn phase(&self) -> RunPhase {
        if self.stop_requested {
            RunPhase::Stopping
        } else if self.paused {
            RunPhase::Paused
        } else {
            RunPhase::Running
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn paused(&self) -> bool {
        self.paused
    }
}

/// A line typed on the interactive console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Control(ControlCommand),
    /// `s <provider-id>`: hot-switch the active provider.
    SwitchProvider(String),
}

/// Parses one console line. Unrecognized input yields `None`.
pub fn parse_console_line(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    match line {
        "p" | "P" => return Some(ConsoleCommand::Control(ControlCommand::Pause)),
        "r" | "R" => return Some(ConsoleCommand::Control(ControlCommand::Resume)),
        "q" | "Q" => return Some(ConsoleCommand::Control(ControlCommand::Stop)),
        _ => {}
    }
    let (head, rest) = line.split_once(char::is_whitespace)?;
    if head.eq_ignore_ascii_case("s") {
        let id = rest.trim();
        if !id.is_empty() {
            return Some(ConsoleCommand::SwitchProvider(id.to_string()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_and_resume_toggle() {
        let signal = ControlSignal::new().apply(ControlCommand::Pause);
        assert_eq!(signal.phase(), RunPhase::Paused);
        let signal = signal.apply(ControlCommand::Resume);
        assert_eq!(signal.phase(), RunPhase::Running);
    }

    #[test]
    fn stop_is_terminal() {
        let signal = ControlSignal::new()
            .apply(ControlCommand::Pause)
            .apply(ControlCommand::Stop);
        assert_eq!(signal.phase(), RunPhase::Stopping);
        for command in [ControlCommand::Resume, ControlCommand::Pause] {
            let next = signal.apply(command);
            assert!(next.stop_requested());
            assert_eq!(next.phase(), RunPhase::Stopping);
        }
    }

    #[test]
    fn console_lines_parse() {
        assert_eq!(
            parse_console_line(" p\n"),
            Some(ConsoleCommand::Control(ControlCommand::Pause))
        );
        assert_eq!(
            parse_console_line("r"),
            Some(ConsoleCommand::Control(ControlCommand::Resume))
        );
        assert_eq!(
            parse_console_line("q"),
            Some(ConsoleCommand::Control(ControlCommand::Stop))
        );
        assert_eq!(
            parse_console_line("s backup"),
            Some(ConsoleCommand::SwitchProvider("backup".to_string()))
        );
        assert_eq!(parse_console_line("s"), None);
        assert_eq!(parse_console_line("quit"), None);
        assert_eq!(parse_console_line(""), None);
    }
}
