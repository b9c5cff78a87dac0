//! Region command parsing
//!
//! Target regions can carry `command` tags that run when the region is hit,
//! written as `name(arg0,arg1,...)`.

use regex::Regex;
use std::sync::OnceLock;

static COMMAND_PATTERN: OnceLock<Regex> = OnceLock::new();

fn command_pattern() -> &'static Regex {
    COMMAND_PATTERN
        .get_or_init(|| Regex::new(r"^(\w[\w\d_]*)\((.*)\)$").expect("command pattern is valid"))
}

/// A parsed command string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    /// Parse `name(arg0,arg1)`. Text that does not fit the grammar becomes a
    /// bare command named after the whole string, with no arguments.
    pub fn parse(text: &str) -> Self {
        let Some(captures) = command_pattern().captures(text) else {
            return Self {
                name: text.to_string(),
                args: Vec::new(),
            };
        };

        let name = captures[1].to_string();
        let inner = captures.get(2).map(|m| m.as_str()).unwrap_or("");
        let args = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(|arg| arg.trim().to_string()).collect()
        };

        Self { name, args }
    }

    /// Resolve to an action the session knows how to run
    pub fn action(&self) -> Option<RegionCommand> {
        match self.name.as_str() {
            "clear_shots" => Some(RegionCommand::ClearShots),
            "play_sound" => match self.args.first() {
                Some(sound) => Some(RegionCommand::PlaySound(sound.clone())),
                None => {
                    log::warn!("play_sound command without a sound file");
                    None
                }
            },
            other => {
                log::debug!("Ignoring unknown region command '{}'", other);
                None
            }
        }
    }
}

/// Commands with an effect on the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionCommand {
    /// Reset the shot registry
    ClearShots,
    /// Play a sound asset
    PlaySound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_args() {
        let cmd = Command::parse("play_sound(beep.wav)");
        assert_eq!(cmd.name, "play_sound");
        assert_eq!(cmd.args, vec!["beep.wav"]);
        assert_eq!(cmd.action(), Some(RegionCommand::PlaySound("beep.wav".into())));

        let cmd = Command::parse("custom(a, b,c)");
        assert_eq!(cmd.args, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_empty_args() {
        let cmd = Command::parse("clear_shots()");
        assert_eq!(cmd.name, "clear_shots");
        assert!(cmd.args.is_empty());
        assert_eq!(cmd.action(), Some(RegionCommand::ClearShots));
    }

    #[test]
    fn test_malformed_is_bare_name() {
        let cmd = Command::parse("clear_shots");
        assert_eq!(cmd.name, "clear_shots");
        assert!(cmd.args.is_empty());
        assert_eq!(cmd.action(), Some(RegionCommand::ClearShots));

        let cmd = Command::parse("play_sound(beep.wav");
        assert_eq!(cmd.name, "play_sound(beep.wav");
        assert_eq!(cmd.action(), None);
    }

    #[test]
    fn test_no_stale_arguments() {
        // A bare play_sound after a parsed one must not reuse its argument
        let first = Command::parse("play_sound(beep.wav)");
        let second = Command::parse("play_sound");
        assert_eq!(first.args.len(), 1);
        assert!(second.args.is_empty());
        assert_eq!(second.action(), None);
    }

    #[test]
    fn test_unknown_is_ignored() {
        assert_eq!(Command::parse("explode(now)").action(), None);
        assert_eq!(Command::parse("").action(), None);
    }
}
