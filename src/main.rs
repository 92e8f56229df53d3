// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use composer::config::{AuthMode, ComposerConfig};
use composer::export::smf::{self, EventKind};
use composer::music::instrument::{display_name, INSTRUMENTS};
use composer::service::HttpCompositionService;
use composer::session::{
    EntryBody, EntryId, IdentityProvider, ProfileIdentity, Role, SessionDriver, TokenIdentity,
    UserProfile, View,
};
use composer::{
    Classify, Composition, CompositionEncoder, ConversationController, Effect, Exporter,
    FileNaming, PromptMode, SessionEvent,
};

fn print_usage() {
    println!("Composer - conversational MIDI composition");
    println!();
    println!("Usage: composer [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --encode <json> [out.mid]  Encode a composition file as MIDI");
    println!("  --data-uri <json>          Print a composition as a data: URI");
    println!("  --inspect <file.mid>       List the events in a MIDI file");
    println!("  --instruments              List the General MIDI instrument table");
    println!("  --chat [config]            Start an interactive session");
    println!("  --help                     Show this help message");
}

fn setup_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
            anyhow!("failed to initialise tracing: {err}")
        })?;
    Ok(())
}

fn read_composition(path: &str) -> Result<Composition> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read composition file: {:?}", path))?;
    Composition::from_json(&json).map_err(|e| anyhow!(e.user_message()))
}

fn encode_file(input: &str, output: Option<&str>) -> Result<()> {
    let composition = read_composition(input)?;
    let exporter = Exporter::new(Some(CompositionEncoder::default()), FileNaming::Timestamped);
    let mut artifact = exporter
        .export(&composition)
        .map_err(|e| anyhow!(e.user_message()))?;

    let mut dir = Path::new(".");
    if let Some(output) = output {
        let path = Path::new(output);
        artifact.file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("invalid output path: {:?}", output))?
            .to_string();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            dir = parent;
        }
    }

    let path = artifact.save_in(dir)?;
    println!(
        "Wrote {} ({} bytes, {} notes, {})",
        path.display(),
        artifact.bytes.len(),
        composition.notes.len(),
        composition.instrument_display()
    );
    Ok(())
}

fn print_data_uri(input: &str) -> Result<()> {
    let composition = read_composition(input)?;
    let exporter = Exporter::new(Some(CompositionEncoder::default()), FileNaming::Fixed);
    let artifact = exporter
        .export(&composition)
        .map_err(|e| anyhow!(e.user_message()))?;
    println!("{}", artifact.data_uri());
    Ok(())
}

fn inspect_file(path: &str) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read MIDI file: {:?}", path))?;
    let contents = smf::read(&bytes).context("Failed to parse MIDI file")?;
    println!(
        "Format {}, {} track(s), {} ticks per quarter note",
        contents.format, contents.tracks, contents.ppqn
    );
    for event in &contents.events {
        let description = match event.kind() {
            EventKind::NoteOn { channel, note, velocity } => {
                format!("note on   ch {:>2} note {:>3} vel {}", channel, note, velocity)
            }
            EventKind::NoteOff { channel, note } => {
                format!("note off  ch {:>2} note {:>3}", channel, note)
            }
            EventKind::ProgramChange { channel, program } => {
                format!("program   ch {:>2} {}", channel, program)
            }
            EventKind::Meta(kind) => format!("meta      0x{:02X}", kind),
            EventKind::Other(status) => format!("status    0x{:02X}", status),
        };
        println!("{:>8}  {}", event.tick, description);
    }
    Ok(())
}

fn list_instruments() {
    for (index, name) in INSTRUMENTS.iter().enumerate() {
        println!("{:>3}  {:<28} {}", index + 1, name, display_name(name));
    }
}

/// Terminal front-end for one chat session
struct ChatRepl {
    driver: SessionDriver<HttpCompositionService>,
    identity: Box<dyn IdentityProvider>,
    exporter: Exporter,
    last_printed: Option<EntryId>,
    last_banner: Option<String>,
}

impl ChatRepl {
    /// Handle one input line; false ends the session
    fn handle_line(&mut self, line: &str) -> Result<bool> {
        let line = line.trim();
        let (command, argument) = match line.split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" | "/exit" => return Ok(false),
            "/help" => {
                println!("/download <n>  save the composition from entry n");
                println!("/mode <mode>   compose, search or summarize");
                println!("/login <token> sign in with an id-token");
                println!("/logout        sign out");
                println!("/quit          leave");
            }
            "/download" => self.download(argument)?,
            "/mode" => match argument.parse::<PromptMode>() {
                Ok(mode) => {
                    self.send(SessionEvent::SetMode(mode));
                    println!("Mode: {}", self.driver.controller().mode());
                }
                Err(err) => println!("{}", err),
            },
            "/login" => match self.identity.sign_in(argument) {
                Ok(profile) => self.send(SessionEvent::SignedIn(profile)),
                Err(err) => println!("{}", err.user_message()),
            },
            "/logout" => self.send(SessionEvent::SignedOut),
            _ => {
                self.send(SessionEvent::InputChanged(line.to_string()));
                self.send(SessionEvent::Submit);
            }
        }
        Ok(true)
    }

    fn download(&mut self, argument: &str) -> Result<()> {
        let wanted: u64 = argument
            .parse()
            .map_err(|_| anyhow!("usage: /download <entry number>"))?;
        let entry = self
            .driver
            .controller()
            .transcript()
            .entries()
            .find(|e| e.id.value() == wanted)
            .map(|e| e.id);
        let Some(entry) = entry else {
            println!("No entry {}", wanted);
            return Ok(());
        };
        if let Some(artifact) = self.driver.controller_mut().download(entry, &self.exporter) {
            let path = artifact.save_in(".")?;
            println!("Saved {}", path.display());
        }
        Ok(())
    }

    fn send(&mut self, event: SessionEvent) {
        let effects = self.driver.dispatch(event);
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SignOut => self.identity.sign_out(),
                Effect::ShowLoggedOut => println!("You have been logged out. Use /login to continue."),
                Effect::StartRecognizer | Effect::StopRecognizer => {
                    println!("Voice input is not available in the terminal.")
                }
                _ => {}
            }
        }
    }

    fn render(&mut self) {
        let controller = self.driver.controller();
        for entry in controller.transcript().entries() {
            if self.last_printed.is_some_and(|last| entry.id <= last) {
                continue;
            }
            let who = match entry.role {
                Role::User => "you",
                Role::Assistant => "composer",
            };
            println!("[{}] {}: {}", entry.id, who, entry.body.text());
            if let EntryBody::TextWithComposition { composition, .. } = &entry.body {
                println!(
                    "      {} notes. Use /download {} to save it.",
                    composition.notes.len(),
                    entry.id
                );
            }
            self.last_printed = Some(entry.id);
        }
        if controller.transcript().is_loading() && controller.input_locked() {
            println!("      composing...");
        }

        let banner = controller.banner().map(str::to_string);
        if banner != self.last_banner {
            if let Some(text) = &banner {
                println!("!! {}", text);
            }
            self.last_banner = banner;
        }
        if controller.view() == View::SignIn {
            println!("Not signed in. Use /login <token>.");
        }
    }
}

async fn run_chat(config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => ComposerConfig::load(path)?,
        None => ComposerConfig::default(),
    }
    .with_env_overrides();
    config.validate().context("Invalid configuration")?;

    let service = HttpCompositionService::new(Some(&config.service.base_url))?;
    let controller = ConversationController::new(config.session_options());
    let identity: Box<dyn IdentityProvider> = match config.session.auth {
        AuthMode::ClientToken => Box::new(TokenIdentity::new()),
        AuthMode::ServerSession | AuthMode::HostedRuntime => Box::new(ProfileIdentity::new(
            config
                .session
                .user
                .clone()
                .unwrap_or_else(|| UserProfile::new("local", "Local user", "")),
        )),
    };

    let mut repl = ChatRepl {
        driver: SessionDriver::new(controller, Arc::new(service)),
        identity,
        exporter: config.exporter(),
        last_printed: None,
        last_banner: None,
    };

    println!("Composer chat ({}). Type /help for commands.", config.service.base_url);
    if config.session.auth != AuthMode::ClientToken {
        let profile = repl.identity.sign_in("")?;
        println!("Signed in as {}", profile.display_name());
        repl.send(SessionEvent::SignedIn(profile));
    } else {
        repl.render();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !repl.handle_line(&line)? {
                    break;
                }
            }
            effects = repl.driver.step() => repl.apply(effects),
        }
        repl.render();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing()?;
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Composer - conversational MIDI composition");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[1].as_str() {
        "--encode" => {
            let input = args.get(2).ok_or_else(|| anyhow!("--encode requires a composition file"))?;
            encode_file(input, args.get(3).map(String::as_str))?;
        }
        "--data-uri" => {
            let input = args.get(2).ok_or_else(|| anyhow!("--data-uri requires a composition file"))?;
            print_data_uri(input)?;
        }
        "--inspect" => {
            let input = args.get(2).ok_or_else(|| anyhow!("--inspect requires a MIDI file"))?;
            inspect_file(input)?;
        }
        "--instruments" => list_instruments(),
        "--chat" => run_chat(args.get(2).map(String::as_str)).await?,
        "--help" | "-h" => print_usage(),
        other => {
            println!("Unknown option: {}", other);
            print_usage();
        }
    }
    Ok(())
}
