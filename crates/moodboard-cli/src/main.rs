use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::ImageFormat;
use moodboard_contracts::commands::{parse_command, SessionCommand, SESSION_HELP_COMMANDS};
use moodboard_contracts::{Backend, BaseImage, GeneratedItem};
use moodboard_engine::{build_adapter, AdapterRegistry, Config, Moodboard, SessionError};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "moodboard-rs", version, about = "Architectural moodboard image generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Generate(GenerateArgs),
    Session(SessionArgs),
    Backends,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    base_image: Option<PathBuf>,
    #[arg(long, default_value = "minimax")]
    creator: Backend,
    #[arg(long, default_value = "openrouter")]
    editor: Backend,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long, default_value = "minimax")]
    creator: Backend,
    #[arg(long, default_value = "openrouter")]
    editor: Backend,
    #[arg(long)]
    out: PathBuf,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("moodboard-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MOODBOARD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = Config::from_env();
    match cli.command {
        Command::Generate(args) => run_generate(args, &config),
        Command::Session(args) => {
            run_session(args, &config)?;
            Ok(0)
        }
        Command::Backends => {
            run_backends(&config)?;
            Ok(0)
        }
    }
}

fn open_board(creator: Backend, editor: Backend, config: &Config) -> Result<Moodboard> {
    let creator_adapter = build_adapter(creator, config)
        .with_context(|| format!("cannot use {creator} for image creation"))?;
    let editor_adapter = build_adapter(editor, config)
        .with_context(|| format!("cannot use {editor} for image edits"))?;
    Ok(Moodboard::new(creator_adapter, editor_adapter))
}

fn run_generate(args: GenerateArgs, config: &Config) -> Result<i32> {
    let mut board = open_board(args.creator, args.editor, config)?;
    let base_image = args
        .base_image
        .as_deref()
        .map(load_base_image)
        .transpose()?;
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let item = board.add(&args.prompt, base_image.as_ref())?;
    let path = write_item(&args.out, item)?;
    println!("{}", item_summary(item, &path));
    Ok(0)
}

fn run_session(args: SessionArgs, config: &Config) -> Result<()> {
    let mut board = open_board(args.creator, args.editor, config)?;
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let stdin = io::stdin();
    let mut line = String::new();
    let mut base_image: Option<BaseImage> = None;

    println!(
        "Moodboard session started ({} creates, {} edits). Type /help for commands.",
        args.creator.label(),
        args.editor.label()
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        match parse_command(line.trim_end_matches(['\n', '\r'])) {
            SessionCommand::Noop => continue,
            SessionCommand::Help => {
                println!("Commands:");
                for entry in SESSION_HELP_COMMANDS {
                    println!("  {entry}");
                }
            }
            SessionCommand::Quit => break,
            SessionCommand::SetBase { path } => {
                if path.is_empty() {
                    println!("/base requires a path");
                    continue;
                }
                match load_base_image(Path::new(&path)) {
                    Ok(image) => {
                        println!("Base image set to {path} ({})", image.mime_type());
                        base_image = Some(image);
                    }
                    Err(err) => println!("Base image not loaded: {err:#}"),
                }
            }
            SessionCommand::ClearBase => {
                base_image = None;
                println!("Base image cleared");
            }
            SessionCommand::Add { prompt } => {
                report_outcome(board.add(&prompt, base_image.as_ref()), &args.out)?;
            }
            SessionCommand::Vary { id, prompt } => {
                if id.is_empty() {
                    println!("/vary requires an item id");
                    continue;
                }
                report_outcome(board.vary(&id, &prompt), &args.out)?;
            }
            SessionCommand::Delete { id } => match board.remove(&id) {
                Some(item) => println!("Deleted {}", item.id()),
                None => println!("No item with id {id}"),
            },
            SessionCommand::List => {
                if board.is_empty() {
                    println!("Moodboard is empty");
                }
                for item in board.items() {
                    println!("{}  {}  {}", item.id(), item.mime_type(), item.prompt());
                }
            }
            SessionCommand::Reset => {
                board.reset();
                base_image = None;
                println!("Moodboard cleared");
            }
            SessionCommand::Unknown { command, .. } => {
                println!("Unknown command: /{command}. Type /help for commands.");
            }
        }
    }
    Ok(())
}

/// Generation failures are shown and the session goes on; only local I/O
/// errors end it.
fn report_outcome(outcome: Result<&GeneratedItem, SessionError>, out_dir: &Path) -> Result<()> {
    match outcome {
        Ok(item) => {
            let path = write_item(out_dir, item)?;
            println!("{}", item_summary(item, &path));
        }
        Err(err) => println!("Error: {err}"),
    }
    Ok(())
}

fn run_backends(config: &Config) -> Result<()> {
    let registry = AdapterRegistry::from_config(config)?;
    let ready = registry.backends();
    for backend in Backend::ALL {
        let status = if ready.contains(&backend) {
            "configured"
        } else {
            "missing"
        };
        println!("{:<11} {:<11} {}", backend.name(), status, backend.credential_env());
    }
    Ok(())
}

fn load_base_image(path: &Path) -> Result<BaseImage> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mime_type = sniff_image_mime(&bytes)
        .with_context(|| format!("{} is not a PNG, JPEG or WebP image", path.display()))?;
    BaseImage::from_bytes(&bytes, mime_type)
        .with_context(|| format!("failed to load {}", path.display()))
}

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    let lowered = mime_type.to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        return "jpg";
    }
    if lowered.contains("webp") {
        return "webp";
    }
    if lowered.contains("gif") {
        return "gif";
    }
    "png"
}

fn write_item(out_dir: &Path, item: &GeneratedItem) -> Result<PathBuf> {
    let bytes = item
        .decode_bytes()
        .with_context(|| format!("item {} has an undecodable payload", item.id()))?;
    let path = out_dir.join(format!("{}.{}", item.id(), extension_for_mime(item.mime_type())));
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "wrote moodboard item");
    Ok(path)
}

fn item_summary(item: &GeneratedItem, path: &Path) -> Value {
    json!({
        "id": item.id(),
        "prompt": item.prompt(),
        "mime_type": item.mime_type(),
        "path": path.to_string_lossy(),
        "created_at": chrono::Utc::now().to_rfc3339(),
    })
}
