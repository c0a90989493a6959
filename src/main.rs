use clap::{CommandFactory, Parser};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use tidi_chat::cli::{parse_command, Args, Command, Commands, HELP};
use tidi_chat::client::{self, WsTransport};
use tidi_chat::render;
use tidi_chat::settings::TomlSettingsStore;
use tidi_chat::{ChatSession, Commit, Submit, UiEvent};

type Session = ChatSession<WsTransport, TomlSettingsStore>;

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Some(Commands::Completions { shell }) = &args.command {
        clap_complete::generate(*shell, &mut Args::command(), "tidi-chat", &mut std::io::stdout());
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> tidi_chat::Result<()> {
    let config = args.client_config();
    let settings = TomlSettingsStore::open(&args.settings)?;

    eprintln!("{} {}", "connecting to".dimmed(), config.relay_url);
    let (transport, mut inbound) = client::connect(&config.relay_url, config.connect_timeout).await?;

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let mut session: Session =
        ChatSession::new(config, transport.clone(), settings, args.user.clone(), ui_tx);

    match args.room.as_deref() {
        Some(room) => report_commit(session.commit_room_key(room)?),
        None if session.room_key().is_some() => connect(&mut session),
        None => println!("{}", "set a room with /room <key>".dimmed()),
    }
    println!("{}", render::feed_lines(&session.visible_messages()));
    println!("{}", "type /help for commands".dimmed());

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut last_shown: Option<u64> = None;

    loop {
        tokio::select! {
            frame = inbound.recv() => match frame {
                Some(frame) => session.handle_inbound(&frame),
                None => {
                    eprintln!("{}", "relay closed the connection".yellow());
                    break;
                }
            },
            Some(event) = ui_rx.recv() => {
                if event == UiEvent::ScrollToLatest && session.is_visible() && !session.settings_open() {
                    for msg in session.messages_after(last_shown) {
                        println!("{}", render::message_line(&msg));
                        last_shown = Some(msg.seq);
                    }
                }
            },
            line = lines.next() => match line {
                Some(Ok(line)) => match handle_line(&mut session, &line, &mut last_shown) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
                },
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }

    session.shutdown();
    transport.close();
    Ok(())
}

fn handle_line(
    session: &mut Session,
    line: &str,
    last_shown: &mut Option<u64>,
) -> tidi_chat::Result<Flow> {
    match parse_command(line) {
        Command::Say(text) => match session.submit(&text)? {
            Submit::Empty => {}
            Submit::Duplicate => println!("{}", "same message again, wait a few seconds".dimmed()),
            Submit::Scheduled { .. } if !session.is_connected() => {
                println!("{}", "not connected, message will be dropped".yellow())
            }
            Submit::Scheduled { .. } => {}
            Submit::Dropped => println!("{}", "message could not be sent".yellow()),
        },
        Command::Room(key) => report_commit(session.commit_room_key(&key)?),
        Command::Name(name) => report_commit(session.commit_username(&name)?),
        Command::Connect => connect(session),
        Command::Emoji(None) => println!("{}", render::emoji_palette()),
        Command::Emoji(Some(i)) => {
            if session.push_emoji(i) {
                println!("{} {}", "draft:".dimmed(), session.draft().as_str());
            } else {
                println!("{}", "no such emoji, see /emoji".yellow());
            }
        }
        Command::Settings => {
            if session.toggle_settings() {
                println!(
                    "{}",
                    render::settings_panel(&session.settings_summary(), session.username_locked())
                );
            } else {
                show_feed(session, last_shown);
            }
        }
        Command::Hide => {
            session.set_visible(false);
            println!("{}", "chat hidden, /show to bring it back".dimmed());
        }
        Command::Show => {
            session.set_visible(true);
            show_feed(session, last_shown);
        }
        Command::Export(path) => {
            let html = render::feed_html(&session.visible_messages());
            std::fs::write(&path, html)?;
            println!("{} {}", "exported to".dimmed(), path.display());
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(Flow::Quit),
        Command::Unknown(raw) => println!("{} {}", "unknown command:".yellow(), raw),
    }
    Ok(Flow::Continue)
}

fn show_feed(session: &Session, last_shown: &mut Option<u64>) {
    let messages = session.visible_messages();
    println!("{}", render::feed_lines(&messages));
    if let Some(last) = messages.last() {
        *last_shown = Some(last.seq);
    }
}

fn connect(session: &mut Session) {
    match session.connect() {
        Ok(room) => println!("{} {}", "connected to room".green(), room),
        Err(e) => println!("{} {}", "could not connect:".yellow(), e),
    }
}

fn report_commit(commit: Commit) {
    match commit {
        Commit::Ignored => println!("{}", "nothing entered".dimmed()),
        Commit::Locked => println!("{}", "username was set on the command line".dimmed()),
        Commit::RoomChanged(room) => println!("{} {}", "joined room".green(), room),
        Commit::UsernameChanged(name) => println!("{} {}", "you are now".green(), name),
    }
}
