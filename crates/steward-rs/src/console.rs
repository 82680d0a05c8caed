//! Line-oriented console front-end over the orchestrator.

use crossterm::execute;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use futures_util::StreamExt;
use log::{debug, warn};
use serde_json::Value;
use std::io::{self, Write};
use steward_rs_core::{Message, Orchestrator, Role, SessionId, StewardCoreError};
use steward_rs_protocol::EventPayload;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// Longest tool result shown before it is cut with `...`.
pub const MAX_RESULT_CHARS: usize = 500;

/// Cut `text` to `limit` characters, marking the cut with `...`.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Commands understood at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Quit,
    NewSession,
    History,
    Sessions,
    Empty,
    Say(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "" => ConsoleCommand::Empty,
            "quit" | "exit" => ConsoleCommand::Quit,
            "/new" => ConsoleCommand::NewSession,
            "/history" => ConsoleCommand::History,
            "/sessions" => ConsoleCommand::Sessions,
            _ => ConsoleCommand::Say(line.to_string()),
        }
    }
}

/// A styled line to print for an event, if the event is shown at all.
pub fn event_line(payload: &EventPayload) -> Option<(Color, String)> {
    match payload {
        EventPayload::ToolCallStarted {
            tool_name,
            arguments,
            ..
        } => Some((
            Color::Yellow,
            format!("[tool] {tool_name}({})", render_arguments(arguments)),
        )),
        EventPayload::ToolCallFinished {
            tool_name,
            result,
            success,
            ..
        } => {
            let color = if *success { Color::Green } else { Color::Red };
            Some((
                color,
                format!("[result] {tool_name}: {}", truncate(result, MAX_RESULT_CHARS)),
            ))
        }
        EventPayload::AgentMessage { content, .. } if !content.is_empty() => {
            Some((Color::Cyan, format!("Steward: {content}")))
        }
        EventPayload::IterationLimitReached { limit, .. } => Some((
            Color::Magenta,
            format!("(stopped after {limit} model calls)"),
        )),
        EventPayload::TurnCancelled { .. } => Some((Color::Magenta, "(turn cancelled)".to_string())),
        EventPayload::Error { message, .. } => Some((Color::Red, format!("Error: {message}"))),
        _ => None,
    }
}

fn render_arguments(arguments: &Value) -> String {
    match arguments {
        Value::Object(map) if map.is_empty() => String::new(),
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

fn role_label(message: &Message) -> &'static str {
    match message.role {
        Role::User => "You",
        Role::Assistant => "Steward",
        Role::Tool => "Tool",
        Role::System => "System",
    }
}

fn styled(color: Color, text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(
        stdout,
        SetForegroundColor(color),
        Print(text),
        Print("\n"),
        ResetColor
    )
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(
        stdout,
        SetAttribute(Attribute::Bold),
        Print("You: "),
        SetAttribute(Attribute::Reset)
    )?;
    stdout.flush()
}

fn print_banner(session_id: SessionId) -> io::Result<()> {
    styled(Color::Blue, &format!("Session: {session_id}"))?;
    styled(
        Color::DarkGrey,
        "Type quit or exit to leave; /new, /history and /sessions manage sessions.",
    )
}

fn print_history(history: &[Message]) -> io::Result<()> {
    if history.is_empty() {
        return styled(Color::DarkGrey, "(no messages yet)");
    }
    for message in history {
        if message.is_tool_request() {
            for call in &message.tool_calls {
                styled(
                    Color::Yellow,
                    &format!("[tool] {}({})", call.name, render_arguments(&call.arguments)),
                )?;
            }
            if message.content.is_empty() {
                continue;
            }
        }
        let text = match message.role {
            Role::Tool => truncate(&message.content, MAX_RESULT_CHARS),
            _ => message.content.clone(),
        };
        styled(Color::White, &format!("{}: {}", role_label(message), text))?;
    }
    Ok(())
}

/// Interactive read-eval loop. Returns when the user quits or stdin closes.
pub async fn run(orchestrator: &Orchestrator, mut session_id: SessionId) -> anyhow::Result<()> {
    print_banner(session_id)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        match ConsoleCommand::parse(&line) {
            ConsoleCommand::Empty => continue,
            ConsoleCommand::Quit => break,
            ConsoleCommand::NewSession => {
                session_id = orchestrator.create_session()?;
                print_banner(session_id)?;
            }
            ConsoleCommand::History => print_history(&orchestrator.history(session_id)?)?,
            ConsoleCommand::Sessions => {
                for summary in orchestrator.list_sessions()? {
                    let marker = if summary.id == session_id { "*" } else { " " };
                    styled(
                        Color::White,
                        &format!(
                            "{marker} {} ({} messages, updated {})",
                            summary.id,
                            summary.message_count,
                            summary.updated_at.format("%Y-%m-%d %H:%M")
                        ),
                    )?;
                }
            }
            ConsoleCommand::Say(input) => run_turn(orchestrator, session_id, input).await?,
        }
    }
    styled(Color::Blue, "Goodbye!")?;
    Ok(())
}

async fn run_turn(
    orchestrator: &Orchestrator,
    session_id: SessionId,
    input: String,
) -> anyhow::Result<()> {
    let mut stream = orchestrator.run_stream(session_id, input)?;
    let canceller = stream.canceller();
    loop {
        tokio::select! {
            event = stream.events.next() => match event {
                Some(Ok(event)) => {
                    if let Some((color, text)) = event_line(&event.payload) {
                        styled(color, &text)?;
                    }
                    if event.payload.is_terminal() {
                        break;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!("console fell behind the event stream (skipped={})", skipped);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !canceller.is_cancelled() => {
                canceller.cancel();
                styled(Color::Magenta, "Cancelling after the current step...")?;
            }
        }
    }
    match stream.finish().await {
        Ok(result) => debug!(
            "turn finished (turn_id={}, agent_invocations={})",
            result.turn_id, result.agent_invocations
        ),
        Err(StewardCoreError::Cancelled(_)) => {}
        Err(StewardCoreError::Executor(message)) => {
            styled(Color::Red, &format!("Error: {message}"))?;
        }
        Err(err) => debug!("turn failed: {}", err),
    }
    Ok(())
}
