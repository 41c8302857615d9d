//! Terminal front-end for the wellbeing companion.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use eight::CompanionError;
use eight::audio::{AudioPlaybackQueue, NullSink};
use eight::backend::Collaborators;
use eight::config::CompanionConfig;
use eight::gemini::{GeminiClient, ScriptKind};
use eight::model::{Mood, Sender};
use eight::prompts;
use eight::scheduler::{AlertKind, NotificationRunner, ScheduleHandle, SessionTimer};
use eight::session::ChatSession;
use eight::speech::SpeechSynthesizer;

const HELP: &str = "commands: /mood <great|good|okay|bad|awful>  /end [mood]  /calendar  \
/meditate <theme>  /sleep <theme>  /quote  /journal  /stats  /hotspots  /help  /quit\n\
anything else is sent to the companion.";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eight=info")),
        )
        .init();

    let config = CompanionConfig::load_or_default();
    let client = Arc::new(GeminiClient::new(config.gemini.clone()));
    let collaborators = Collaborators::mock();
    let audio = match AudioPlaybackQueue::new() {
        Ok(queue) => queue,
        Err(e) => {
            warn!("no audio output, running silent: {e}");
            AudioPlaybackQueue::with_sink(Box::new(NullSink))
        }
    };

    let schedule = ScheduleHandle::new();
    let (alerts_tx, mut alerts_rx) = mpsc::unbounded_channel();
    NotificationRunner::spawn(
        config.notifications.clone(),
        schedule.clone(),
        collaborators.email.clone(),
        alerts_tx,
    );

    let mut session = ChatSession::new(
        client.clone(),
        collaborators,
        Arc::new(SpeechSynthesizer::new(client.clone())),
        audio,
        schedule.clone(),
    );

    session.start().await;
    print_latest(&session);
    println!("{HELP}");

    let (timer, mut time_up) = SessionTimer::start(config.session.length_secs);
    let mut timer_fired = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(input) = line? else { break };
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "/quit" {
                    break;
                }
                handle_input(&mut session, &client, &schedule, input, &timer).await?;
            }
            _ = &mut time_up, if !timer_fired => {
                timer_fired = true;
                session.append_time_up_message();
                print_latest(&session);
            }
            Some(alert) = alerts_rx.recv() => {
                let tag = match alert.kind {
                    AlertKind::Info => "notice",
                    AlertKind::Warning => "alert",
                };
                println!("[{tag}] {}", alert.message);
            }
        }
    }
    Ok(())
}

async fn handle_input(
    session: &mut ChatSession,
    client: &GeminiClient,
    schedule: &ScheduleHandle,
    input: &str,
    timer: &SessionTimer,
) -> Result<()> {
    let (command, rest) = match input.split_once(' ') {
        Some((c, r)) => (c, r.trim()),
        None => (input, ""),
    };
    match command {
        "/help" => println!("{HELP}"),
        "/mood" => match parse_mood(rest) {
            Some(mood) => {
                session.quick_check_in(mood);
                print_latest(session);
            }
            None => println!("unknown mood: {rest}"),
        },
        "/end" => {
            let entry = session.end_session(parse_mood(rest)).await?;
            println!("diary: {}", entry.summary);
            println!("\"{}\"", prompts::random_quote());
            print_latest(session);
        }
        "/calendar" => match session.connect_calendar().await {
            Ok(()) => println!("calendar connected."),
            Err(e) => println!("calendar connection failed: {e}"),
        },
        "/meditate" | "/sleep" => {
            let kind = if command == "/meditate" {
                ScriptKind::Meditation
            } else {
                ScriptKind::SleepStory
            };
            let theme = if rest.is_empty() { "calm" } else { rest };
            match client.generate_script(kind, theme).await {
                Ok(script) => println!("{script}"),
                Err(CompanionError::Configuration(_)) => {
                    println!("{}", prompts::AI_DISABLED_MESSAGE);
                }
                Err(e) => println!("script generation failed: {e}"),
            }
        }
        "/quote" => println!("\"{}\"", prompts::random_quote()),
        "/journal" => println!("{}", prompts::random_journal_prompt()),
        "/stats" => {
            let ledger = session.gamification();
            println!(
                "points: {}  streak: {} day(s)  time left: {}",
                ledger.points,
                ledger.streak,
                timer.format_remaining()
            );
            for badge in ledger.earned_badges() {
                println!("  [{}] {}", badge.name, badge.description);
            }
        }
        "/hotspots" => {
            let hotspots = schedule.hotspots();
            if hotspots.is_empty() {
                println!("no stress hotspots.");
            }
            for hotspot in hotspots {
                println!("  {} ({} - {})", hotspot.reason, hotspot.start_time, hotspot.end_time);
            }
        }
        _ if command.starts_with('/') => println!("unknown command. {HELP}"),
        _ => {
            session.send_message(input, None).await?;
            print_latest(session);
        }
    }
    Ok(())
}

fn parse_mood(s: &str) -> Option<Mood> {
    match s.to_ascii_lowercase().as_str() {
        "great" => Some(Mood::Great),
        "good" => Some(Mood::Good),
        "okay" | "ok" => Some(Mood::Okay),
        "bad" => Some(Mood::Bad),
        "awful" => Some(Mood::Awful),
        _ => None,
    }
}

fn print_latest(session: &ChatSession) {
    for message in session
        .transcript()
        .iter()
        .rev()
        .take_while(|m| m.sender == Sender::Ai)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
    {
        println!("companion: {}", message.text);
    }
}
