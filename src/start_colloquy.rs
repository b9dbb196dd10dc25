//! Startup helpers and the interactive terminal driver.
//!
//! The driver reads one command per line from stdin and writes plain text to
//! stdout. Logs go to stderr so they never interleave with the transcript.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::conversation::{
    ConversationController, ConversationSettings, HttpConversationBackend, Message,
};
use crate::error::{SessionError, SessionResult};
use crate::presentation::{ControlPanel, DisplayEntry, DisplayPanel};
use crate::roles::RoleRegistry;

/// Error type of the driver loop.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

const HELP: &str = "\
Commands:
  /roles                       list roles and the current selection
  /refresh                     fetch the roster again
  /toggle <role>               select or deselect a role
  /turns <n>                   max turns (1-5)
  /tokens <n>                  max tokens per response (100-1000)
  /start <topic>               start a conversation with the selected roles
  /to <role>: <message>        send a message and ask <role> to answer next
  /restart                     start again with the same settings
  /probe <role>: <question>    ask one role a single question
  /transcript                  show the whole conversation
  /help                        show this help
  /quit                        exit
Any other line is sent to the running conversation.";

/// Install the global `tracing` subscriber.
///
/// Honours `RUST_LOG`, defaulting to `info`. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        tracing::debug!("tracing subscriber already installed: {err}");
    }
}

/// Run the terminal driver (used by the `colloquy` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` when the operator quits, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("Starting colloquy v{}", env!("CARGO_PKG_VERSION"));

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(run_terminal(&config)) {
        tracing::error!("Driver error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Drive one session from stdin until `/quit` or end of input.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built or the terminal
/// cannot be read or written.
pub async fn run_terminal(config: &ClientConfig) -> Result<(), DriverError> {
    let api = Arc::new(ApiClient::new(config)?);
    tracing::info!("Backend: {}", api.base_url());
    let mut driver = Driver::new(api);
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let greeting = driver.load_roles().await;
    write_lines(&mut stdout, &greeting).await?;
    write_lines(&mut stdout, &[HELP.to_string()]).await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = parse_command(&line);
        if command.reaches_backend() {
            write_lines(&mut stdout, &["... waiting for the backend".to_string()]).await?;
        }

        match driver.handle(command).await {
            Outcome::Continue(output) => write_lines(&mut stdout, &output).await?,
            Outcome::Quit => break,
        }
    }

    tracing::info!(session = %driver.controller.session().id(), "terminal driver finished");
    Ok(())
}

async fn write_lines<W>(out: &mut W, lines: &[String]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for line in lines {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }
    out.flush().await
}

/// One parsed line of operator input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    /// List the roster and selection.
    Roles,
    /// Fetch the roster again.
    Refresh,
    /// Flip a role's selection.
    Toggle(String),
    /// Set the turn budget.
    Turns(u32),
    /// Set the token budget.
    Tokens(u32),
    /// Start a conversation on a topic.
    Start(String),
    /// Send a message without a speaker hint.
    Say(String),
    /// Send a message and name the next speaker.
    To {
        /// Role that should answer.
        role: String,
        /// Message body.
        text: String,
    },
    /// Start again with the stored settings.
    Restart,
    /// Ask one role a single question.
    Probe {
        /// Role to probe.
        role: String,
        /// Question for the role.
        question: String,
    },
    /// Print the whole transcript.
    Transcript,
    /// Print the command list.
    Help,
    /// Leave the driver.
    Quit,
    /// A command with missing or malformed arguments; holds the usage line.
    Invalid(String),
    /// An unrecognised `/command`.
    Unknown(String),
}

impl Command {
    /// Whether handling this command performs a backend request.
    #[must_use]
    pub const fn reaches_backend(&self) -> bool {
        matches!(
            self,
            Self::Refresh
                | Self::Start(_)
                | Self::Say(_)
                | Self::To { .. }
                | Self::Restart
                | Self::Probe { .. }
        )
    }
}

/// Parse one line of operator input.
#[must_use]
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };

    let (name, args) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, args)| (name, args.trim()));

    match name {
        "roles" => Command::Roles,
        "refresh" => Command::Refresh,
        "restart" => Command::Restart,
        "transcript" => Command::Transcript,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "toggle" if !args.is_empty() => Command::Toggle(args.to_string()),
        "toggle" => Command::Invalid("usage: /toggle <role>".to_string()),
        "start" if !args.is_empty() => Command::Start(args.to_string()),
        "start" => Command::Invalid("usage: /start <topic>".to_string()),
        "turns" => args
            .parse()
            .map_or_else(|_| Command::Invalid("usage: /turns <1-5>".to_string()), Command::Turns),
        "tokens" => args.parse().map_or_else(
            |_| Command::Invalid("usage: /tokens <100-1000>".to_string()),
            Command::Tokens,
        ),
        "to" => split_addressed(args).map_or_else(
            || Command::Invalid("usage: /to <role>: <message>".to_string()),
            |(role, text)| Command::To { role, text },
        ),
        "probe" => split_addressed(args).map_or_else(
            || Command::Invalid("usage: /probe <role>: <question>".to_string()),
            |(role, question)| Command::Probe { role, question },
        ),
        other => Command::Unknown(other.to_string()),
    }
}

/// Split `Role Name: text` at the first colon. Both halves must be non-blank.
fn split_addressed(args: &str) -> Option<(String, String)> {
    let (role, text) = args.split_once(':')?;
    let (role, text) = (role.trim(), text.trim());
    if role.is_empty() || text.is_empty() {
        return None;
    }
    Some((role.to_string(), text.to_string()))
}

/// Result of handling one command.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Lines to print; keep reading.
    Continue(Vec<String>),
    /// Stop the driver.
    Quit,
}

/// Terminal front end over one registry, one controller and one control panel.
pub struct Driver {
    registry: RoleRegistry,
    controller: ConversationController,
    panel: ControlPanel,
}

impl Driver {
    /// Driver talking to the backend behind `api`.
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        let backend = HttpConversationBackend::new(Arc::clone(&api));
        Self {
            registry: RoleRegistry::new(api),
            controller: ConversationController::new(Arc::new(backend)),
            panel: ControlPanel::new(&[]),
        }
    }

    /// Fetch the roster and adopt it in the control panel.
    pub async fn load_roles(&mut self) -> Vec<String> {
        let outcome = self.registry.refresh_roles().await;
        self.panel.sync_roster(&self.registry.roster());
        match outcome {
            Ok(_) => self.roster_lines(),
            Err(err) => vec![error_line(&err), "Use /refresh to retry.".to_string()],
        }
    }

    /// Handle one command.
    pub async fn handle(&mut self, command: Command) -> Outcome {
        let output = match command {
            Command::Empty => Vec::new(),
            Command::Quit => return Outcome::Quit,
            Command::Help => vec![HELP.to_string()],
            Command::Roles => self.roster_lines(),
            Command::Refresh => self.load_roles().await,
            Command::Toggle(role) => match self.panel.toggle_role(&role) {
                Some(true) => vec![format!("{role} selected")],
                Some(false) => vec![format!("{role} deselected")],
                None => vec![format!("Unknown role: {role}")],
            },
            Command::Turns(turns) => vec![format!("max_turns = {}", self.panel.set_max_turns(turns))],
            Command::Tokens(tokens) => {
                vec![format!("max_tokens = {}", self.panel.set_max_tokens(tokens))]
            }
            Command::Start(topic) => {
                self.panel.set_topic(topic);
                match self.start_settings() {
                    Ok(settings) => render(self.controller.start(settings).await),
                    Err(err) => vec![error_line(&err)],
                }
            }
            Command::Say(text) => render(self.controller.inject(&text, None).await),
            Command::To { role, text } => {
                render(self.controller.inject(&text, Some(&role)).await)
            }
            Command::Restart => render(self.controller.restart().await),
            Command::Probe { role, question } => match self.registry.get(&role) {
                Some(known) => render(
                    self.controller
                        .test_role(&known.name, &question, Some(self.panel.max_tokens()))
                        .await,
                ),
                None => vec![format!("Unknown role: {role}")],
            },
            Command::Transcript => self.transcript_lines(),
            Command::Invalid(usage) => vec![usage],
            Command::Unknown(name) => vec![format!("Unknown command /{name}; try /help")],
        };
        Outcome::Continue(output)
    }

    /// Settings from the form, checked against the cached roster.
    fn start_settings(&self) -> SessionResult<ConversationSettings> {
        let settings = self.panel.settings()?;
        settings
            .validate_against(&self.registry.roster())
            .map_err(SessionError::start)?;
        Ok(settings)
    }

    fn roster_lines(&self) -> Vec<String> {
        let roster = self.registry.roster();
        if roster.is_empty() {
            return vec!["No roles available.".to_string()];
        }

        let mut lines = vec![format!(
            "Roles (max_turns = {}, max_tokens = {}):",
            self.panel.max_turns(),
            self.panel.max_tokens()
        )];
        lines.extend(roster.iter().map(|role| {
            let mark = if self.panel.is_selected(&role.name) { 'x' } else { ' ' };
            if role.description.is_empty() {
                format!("  [{mark}] {}", role.name)
            } else {
                format!("  [{mark}] {} - {}", role.name, role.description)
            }
        }));
        lines
    }

    fn transcript_lines(&self) -> Vec<String> {
        let panel = DisplayPanel::from_session(&self.controller.session().snapshot());
        if panel.is_empty() {
            return vec!["No conversation yet.".to_string()];
        }

        let mut lines = Vec::with_capacity(panel.entries.len() + 1);
        if let Some(topic) = &panel.topic {
            lines.push(format!("Topic: {topic}"));
        }
        lines.extend(panel.entries.iter().map(ToString::to_string));
        lines
    }
}

fn render(result: SessionResult<Vec<Message>>) -> Vec<String> {
    match result {
        Ok(messages) => messages
            .iter()
            .map(|message| DisplayEntry::from_message(message).to_string())
            .collect(),
        Err(err) => vec![error_line(&err)],
    }
}

fn error_line(err: &SessionError) -> String {
    format!("error: {err}")
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::test_support::{self, Recorded};

    /// Successive replies of `GET /api/roles`.
    type RosterScript = Arc<Mutex<VecDeque<(StatusCode, Value)>>>;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
        tracing::info!("subscriber still usable");
    }

    #[test]
    fn test_parse_plain_text_is_say() {
        assert_eq!(parse_command("  hello there "), Command::Say("hello there".to_string()));
        assert_eq!(parse_command("   "), Command::Empty);
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("/roles"), Command::Roles);
        assert_eq!(parse_command("/refresh"), Command::Refresh);
        assert_eq!(parse_command("/restart"), Command::Restart);
        assert_eq!(parse_command("/transcript"), Command::Transcript);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(parse_command("/dance"), Command::Unknown("dance".to_string()));
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            parse_command("/start  quarterly pricing "),
            Command::Start("quarterly pricing".to_string())
        );
        assert_eq!(parse_command("/toggle Lead Analyst"), Command::Toggle("Lead Analyst".to_string()));
        assert_eq!(parse_command("/turns 4"), Command::Turns(4));
        assert_eq!(parse_command("/tokens 250"), Command::Tokens(250));
        assert_eq!(
            parse_command("/to Lead Analyst: What about Q3?"),
            Command::To {
                role: "Lead Analyst".to_string(),
                text: "What about Q3?".to_string()
            }
        );
        assert_eq!(
            parse_command("/probe Critic: Is it a bargain: really?"),
            Command::Probe {
                role: "Critic".to_string(),
                question: "Is it a bargain: really?".to_string()
            }
        );
    }

    #[test]
    fn test_parse_malformed_arguments() {
        assert!(matches!(parse_command("/start"), Command::Invalid(_)));
        assert!(matches!(parse_command("/turns many"), Command::Invalid(_)));
        assert!(matches!(parse_command("/to Analyst"), Command::Invalid(_)));
        assert!(matches!(parse_command("/probe : why?"), Command::Invalid(_)));
    }

    #[test]
    fn test_only_network_commands_show_waiting() {
        assert!(parse_command("/start pricing").reaches_backend());
        assert!(parse_command("hello").reaches_backend());
        assert!(!parse_command("/roles").reaches_backend());
        assert!(!parse_command("/turns 3").reaches_backend());
    }

    async fn list_roles() -> Json<Value> {
        Json(json!({ "roles": [
            {"name": "Analyst", "description": "Numbers first"},
            "Critic"
        ]}))
    }

    async fn conversation(
        State(log): State<Recorded>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        log.lock().unwrap().push(body.clone());
        match body.get("user_input").and_then(Value::as_str) {
            Some(input) => (
                StatusCode::OK,
                Json(json!({ "conversation": [
                    {"role": "user", "content": input},
                    {"role": "Critic", "content": "Too optimistic."}
                ]})),
            ),
            None => (
                StatusCode::OK,
                Json(json!({ "conversation": [{"role": "Analyst", "content": "Hi"}] })),
            ),
        }
    }

    async fn driver() -> (Driver, Recorded) {
        let log = test_support::recorder();
        let router = Router::new()
            .route("/api/roles", get(list_roles))
            .route("/api/ai/conversation", post(conversation))
            .with_state(Arc::clone(&log));
        (Driver::new(test_support::api_for(router).await), log)
    }

    async fn scripted_roles(State(script): State<RosterScript>) -> (StatusCode, Json<Value>) {
        let next = script.lock().unwrap().pop_front();
        next.map_or_else(
            || (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "detail": "script exhausted" }))),
            |(status, body)| (status, Json(body)),
        )
    }

    async fn scripted_driver(replies: Vec<(StatusCode, Value)>) -> (Driver, Recorded) {
        let log = test_support::recorder();
        let script: RosterScript = Arc::new(Mutex::new(replies.into()));
        let roles = Router::new()
            .route("/api/roles", get(scripted_roles))
            .with_state(script);
        let router = Router::new()
            .route("/api/ai/conversation", post(conversation))
            .with_state(Arc::clone(&log))
            .merge(roles);
        (Driver::new(test_support::api_for(router).await), log)
    }

    fn roster_reply(names: &[&str]) -> (StatusCode, Value) {
        (StatusCode::OK, json!({ "roles": names }))
    }

    fn lines(outcome: Outcome) -> Vec<String> {
        match outcome {
            Outcome::Continue(lines) => lines,
            Outcome::Quit => panic!("driver quit unexpectedly"),
        }
    }

    #[tokio::test]
    async fn test_driver_session_flow() {
        let (mut driver, log) = driver().await;

        let roster = driver.load_roles().await;
        assert_eq!(roster[1], "  [x] Analyst - Numbers first");
        assert_eq!(roster[2], "  [x] Critic");

        let toggled = lines(driver.handle(Command::Toggle("Critic".to_string())).await);
        assert_eq!(toggled, ["Critic deselected"]);

        let started = lines(driver.handle(parse_command("/start pricing")).await);
        assert_eq!(started, ["Analyst: Hi"]);
        assert_eq!(test_support::recorded(&log)[0]["active_roles"], json!(["Analyst"]));

        let refused = lines(driver.handle(parse_command("/to Critic: Thoughts?")).await);
        assert_eq!(refused, ["error: Critic is not an active role in this conversation"]);

        let replied = lines(driver.handle(parse_command("And Q3?")).await);
        assert_eq!(replied, ["You: And Q3?", "Critic: Too optimistic."]);

        let transcript = lines(driver.handle(Command::Transcript).await);
        assert_eq!(
            transcript,
            ["Topic: pricing", "Analyst: Hi", "You: And Q3?", "Critic: Too optimistic."]
        );
        assert_eq!(test_support::recorded(&log).len(), 2);

        assert_eq!(driver.handle(Command::Quit).await, Outcome::Quit);
    }

    #[tokio::test]
    async fn test_driver_reports_errors_inline() {
        let (mut driver, _) = driver().await;

        let said = lines(driver.handle(parse_command("hello?")).await);
        assert_eq!(said, ["error: No active conversation. Start a conversation first."]);

        let started = lines(driver.handle(parse_command("/start pricing")).await);
        assert_eq!(started, ["error: Select at least one role for the conversation"]);
    }

    #[tokio::test]
    async fn test_unreachable_backend_degrades_roster() {
        let mut driver = Driver::new(test_support::unreachable_api());
        let greeting = driver.load_roles().await;
        assert_eq!(greeting, ["error: Failed to fetch roles", "Use /refresh to retry."]);
        assert_eq!(lines(driver.handle(Command::Roles).await), ["No roles available."]);
    }

    #[tokio::test]
    async fn test_start_rejects_roles_missing_from_roster() {
        let (mut driver, log) = scripted_driver(vec![
            roster_reply(&["Analyst", "Critic"]),
            roster_reply(&["Analyst"]),
        ])
        .await;
        driver.load_roles().await;
        // The registry moves on while the form still holds the old selection.
        driver.registry.refresh_roles().await.unwrap();
        assert_eq!(driver.panel.selected_roles(), ["Analyst", "Critic"]);

        let started = lines(driver.handle(parse_command("/start pricing")).await);
        assert_eq!(started, ["error: Unknown role: Critic"]);
        assert!(test_support::recorded(&log).is_empty());
        assert!(driver.controller.session().settings().is_none());

        let asked = lines(driver.handle(parse_command("/probe Critic: Too cheap?")).await);
        assert_eq!(asked, ["Unknown role: Critic"]);
    }

    #[tokio::test]
    async fn test_deselection_survives_failed_refresh() {
        let (mut driver, log) = scripted_driver(vec![
            roster_reply(&["Analyst", "Critic"]),
            (StatusCode::SERVICE_UNAVAILABLE, json!({ "detail": "Roles unavailable" })),
            roster_reply(&["Analyst", "Critic"]),
        ])
        .await;
        driver.load_roles().await;
        lines(driver.handle(Command::Toggle("Critic".to_string())).await);

        let failed = lines(driver.handle(Command::Refresh).await);
        assert_eq!(failed, ["error: Roles unavailable", "Use /refresh to retry."]);

        let refreshed = lines(driver.handle(Command::Refresh).await);
        assert_eq!(refreshed[1], "  [x] Analyst");
        assert_eq!(refreshed[2], "  [ ] Critic");

        lines(driver.handle(parse_command("/start pricing")).await);
        assert_eq!(test_support::recorded(&log)[0]["active_roles"], json!(["Analyst"]));
    }
}
