use std::fmt;
use thiserror::Error;

/// One relay command, as carried over the wire in a single text message.
///
/// The wire format is the verb, case-sensitive, followed by
/// whitespace-delimited arguments. `SetName` takes the rest of the line so
/// recording names may contain spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetName(String),
    Start,
    Stop,
    SendFilePrevious { host: String, port: u16 },
    Kill,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command verb {0:?}")]
    UnknownVerb(String),
    #[error("{verb} is missing its {arg} argument")]
    MissingArg { verb: &'static str, arg: &'static str },
    #[error("{verb} takes no arguments")]
    UnexpectedArgs { verb: &'static str },
    #[error("SendFilePrevious port is not a valid port number: {0:?}")]
    InvalidPort(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        let verb = tokens.next().ok_or(CommandParseError::Empty)?;

        match verb {
            "SetName" => {
                let name = line[verb.len()..].trim();
                if name.is_empty() {
                    return Err(CommandParseError::MissingArg { verb: "SetName", arg: "name" });
                }
                Ok(Command::SetName(name.to_string()))
            }
            "Start" => Self::bare(tokens, "Start", Command::Start),
            "Stop" => Self::bare(tokens, "Stop", Command::Stop),
            "Kill" => Self::bare(tokens, "Kill", Command::Kill),
            "SendFilePrevious" => {
                let host = tokens
                    .next()
                    .ok_or(CommandParseError::MissingArg { verb: "SendFilePrevious", arg: "host" })?;
                let port = tokens
                    .next()
                    .ok_or(CommandParseError::MissingArg { verb: "SendFilePrevious", arg: "port" })?;
                if tokens.next().is_some() {
                    return Err(CommandParseError::UnexpectedArgs { verb: "SendFilePrevious" });
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| CommandParseError::InvalidPort(port.to_string()))?;
                Ok(Command::SendFilePrevious { host: host.to_string(), port })
            }
            other => Err(CommandParseError::UnknownVerb(other.to_string())),
        }
    }

    fn bare<'a>(
        mut rest: impl Iterator<Item = &'a str>,
        verb: &'static str,
        command: Command,
    ) -> Result<Command, CommandParseError> {
        if rest.next().is_some() {
            return Err(CommandParseError::UnexpectedArgs { verb });
        }
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetName(name) => write!(f, "SetName {}", name),
            Command::Start => write!(f, "Start"),
            Command::Stop => write!(f, "Stop"),
            Command::SendFilePrevious { host, port } => {
                write!(f, "SendFilePrevious {} {}", host, port)
            }
            Command::Kill => write!(f, "Kill"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_verb() {
        assert_eq!(Command::parse("Start").unwrap(), Command::Start);
        assert_eq!(Command::parse("Stop").unwrap(), Command::Stop);
        assert_eq!(Command::parse("Kill").unwrap(), Command::Kill);
        assert_eq!(
            Command::parse("SetName TEST6").unwrap(),
            Command::SetName("TEST6".to_string())
        );
        assert_eq!(
            Command::parse("SendFilePrevious 192.168.1.4 5123").unwrap(),
            Command::SendFilePrevious { host: "192.168.1.4".to_string(), port: 5123 }
        );
    }

    #[test]
    fn set_name_keeps_the_rest_of_the_line() {
        assert_eq!(
            Command::parse("SetName morning take 2").unwrap(),
            Command::SetName("morning take 2".to_string())
        );
    }

    #[test]
    fn verbs_are_case_sensitive() {
        assert!(matches!(
            Command::parse("start"),
            Err(CommandParseError::UnknownVerb(_))
        ));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(Command::parse("   "), Err(CommandParseError::Empty));
        assert_eq!(
            Command::parse("Start now"),
            Err(CommandParseError::UnexpectedArgs { verb: "Start" })
        );
        assert_eq!(
            Command::parse("SetName"),
            Err(CommandParseError::MissingArg { verb: "SetName", arg: "name" })
        );
        assert_eq!(
            Command::parse("SendFilePrevious 10.0.0.2"),
            Err(CommandParseError::MissingArg { verb: "SendFilePrevious", arg: "port" })
        );
        assert!(matches!(
            Command::parse("SendFilePrevious 10.0.0.2 notaport"),
            Err(CommandParseError::InvalidPort(_))
        ));
        assert!(matches!(
            Command::parse("SendFilePrevious 10.0.0.2 99999"),
            Err(CommandParseError::InvalidPort(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        for line in [
            "SetName TEST6",
            "Start",
            "Stop",
            "SendFilePrevious 192.168.1.4 5123",
            "Kill",
        ] {
            assert_eq!(Command::parse(line).unwrap().to_string(), line);
        }
    }
}
