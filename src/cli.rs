use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::config::{ClientConfig, DEFAULT_RELAY_URL};

#[derive(Parser, Debug)]
#[command(name = "tidi-chat")]
#[command(version)]
#[command(about = "Chat in hashed rooms over a WebSocket pub/sub relay")]
pub struct Args {
    /// WebSocket URL of the relay
    #[arg(long, default_value = DEFAULT_RELAY_URL)]
    pub url: String,

    /// Room key to join on start (plain text or a Twitter space link)
    #[arg(long)]
    pub room: Option<String>,

    /// Fixed username for this run; disables /name
    #[arg(long)]
    pub user: Option<String>,

    /// Settings file holding the last room key and username
    #[arg(long, default_value = "tidi-settings.toml")]
    pub settings: PathBuf,

    /// Seconds to wait for the relay handshake
    #[arg(long, default_value = "30")]
    pub connect_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Args {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_relay_url(self.url.clone())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: send it.
    Say(String),
    Room(String),
    Name(String),
    Connect,
    /// `/emoji` alone lists the palette.
    Emoji(Option<usize>),
    Settings,
    Hide,
    Show,
    Export(PathBuf),
    Help,
    Quit,
    Unknown(String),
}

/// Parse a prompt line. Lines not starting with `/` are messages, sent as typed.
///
/// Only the one separator character after the command name is consumed: room keys
/// and usernames reach the session exactly as typed, surrounding spaces included.
pub fn parse_command(line: &str) -> Command {
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };
    let (name, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    match name {
        "room" => Command::Room(arg.to_string()),
        "name" => Command::Name(arg.to_string()),
        "connect" => Command::Connect,
        "emoji" if arg.trim().is_empty() => Command::Emoji(None),
        "emoji" => match arg.trim().parse() {
            Ok(i) => Command::Emoji(Some(i)),
            Err(_) => Command::Unknown(line.to_string()),
        },
        "settings" => Command::Settings,
        "hide" => Command::Hide,
        "show" => Command::Show,
        "export" if !arg.trim().is_empty() => Command::Export(PathBuf::from(arg.trim())),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

pub const HELP: &str = "\
commands:
  <text>          send a message (:fire: style shortcodes are expanded)
  /room <key>     switch room (plain text or Twitter space link)
  /name <user>    set your username
  /connect        subscribe to the current room again
  /emoji [n]      list the emoji picker, or add emoji n to your draft
  /settings       toggle the settings panel
  /hide, /show    hide or show the chat
  /export <file>  save the visible messages as HTML
  /quit           leave";

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_args_parse_minimal() {
        let args = Args::parse_from(["tidi-chat"]);
        assert_eq!(args.url, "ws://127.0.0.1:1324/socket");
        assert_eq!(args.room, None);
        assert_eq!(args.user, None);
        assert_eq!(args.settings, PathBuf::from("tidi-settings.toml"));
        assert_eq!(args.connect_timeout_secs, 30);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_args_parse_full() {
        let args = Args::parse_from([
            "tidi-chat",
            "--url",
            "ws://relay:9000/socket",
            "--room",
            "https://twitter.com/x/spaces/1abc?s=20",
            "--user",
            "darker",
            "--settings",
            "/tmp/t.toml",
            "--connect-timeout-secs",
            "3",
        ]);
        assert_eq!(args.url, "ws://relay:9000/socket");
        assert_eq!(args.room.as_deref(), Some("https://twitter.com/x/spaces/1abc?s=20"));
        assert_eq!(args.user.as_deref(), Some("darker"));
        let cfg = args.client_config();
        assert_eq!(cfg.relay_url, "ws://relay:9000/socket");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_args_completions_subcommand() {
        let args = Args::parse_from(["tidi-chat", "completions", "bash"]);
        assert!(matches!(
            args.command,
            Some(Commands::Completions { shell: Shell::Bash })
        ));
    }

    #[rstest]
    #[case("hello there", Command::Say("hello there".to_string()))]
    #[case("", Command::Say(String::new()))]
    #[case("/room lobby", Command::Room("lobby".to_string()))]
    #[case("/room   spaced out  ", Command::Room("  spaced out  ".to_string()))]
    #[case("/room key ", Command::Room("key ".to_string()))]
    #[case("/name  darker", Command::Name(" darker".to_string()))]
    #[case("/emoji 3 ", Command::Emoji(Some(3)))]
    #[case("/export  feed.html ", Command::Export(PathBuf::from("feed.html")))]
    #[case("/room", Command::Room(String::new()))]
    #[case("/name darker", Command::Name("darker".to_string()))]
    #[case("/connect", Command::Connect)]
    #[case("/emoji", Command::Emoji(None))]
    #[case("/emoji 3", Command::Emoji(Some(3)))]
    #[case("/emoji x", Command::Unknown("/emoji x".to_string()))]
    #[case("/settings", Command::Settings)]
    #[case("/hide", Command::Hide)]
    #[case("/show", Command::Show)]
    #[case("/export feed.html", Command::Export(PathBuf::from("feed.html")))]
    #[case("/export", Command::Unknown("/export".to_string()))]
    #[case("/quit", Command::Quit)]
    #[case("/exit", Command::Quit)]
    #[case("/help", Command::Help)]
    #[case("/dance", Command::Unknown("/dance".to_string()))]
    fn test_parse_command(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(parse_command(line), expected);
    }
}
