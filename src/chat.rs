//! Interactive and one-shot chat on top of the workflow

use anyhow::{Context, Result};
use console::Style;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use agentflow_core::{ChatMessage, Config, Registry, RetryPolicy, RunExtras, RunReport, Workflow, WorkflowError};

/// Initialized registry plus everything a run needs besides the message
pub struct Session {
    registry: Registry,
    workflow: Workflow,
    policy: RetryPolicy,
    extras: RunExtras,
    language: String,
}

impl Session {
    /// Validate the config, then build and initialize every capability
    pub async fn start(config: &Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let mut registry = config.build_registry()?;
        registry
            .initialize()
            .await
            .context("Failed to initialize capabilities")?;
        let workflow = Workflow::new(config.catalog()?);

        info!(
            model = %config.endpoint.model,
            language = %config.workflow.language,
            target_language = %config.workflow.target_language,
            "session ready"
        );
        Ok(Self {
            registry,
            workflow,
            policy: config.retry_policy(),
            extras: config.run_extras(),
            language: config.workflow.language.clone(),
        })
    }

    /// Run one message with `history` as prior conversation
    pub async fn ask(&self, message: &str, history: &[ChatMessage]) -> Result<RunReport, WorkflowError> {
        let bundle = self
            .registry
            .to_dependency_bundle(self.extras.clone().chat_history(history.to_vec()));
        let workflow = &self.workflow;
        let bundle = &bundle;
        self.policy
            .run(move || workflow.run_traced(message, bundle))
            .await
    }

    /// Localized text shown instead of a failed run's error
    pub fn failure_text(&self, err: &WorkflowError) -> String {
        match self.workflow.catalog().generic_error(&self.language) {
            Ok(text) => text.to_string(),
            Err(_) => format!("Error: {}", err),
        }
    }
}

/// `agentflow ask`
pub async fn run_once(config: &Config, message: &str) -> Result<()> {
    let session = Session::start(config).await?;
    match session.ask(message, &[]).await {
        Ok(report) => {
            println!("{}", report.output);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("{}", session.failure_text(&e));
            Err(e.into())
        }
    }
}

/// `agentflow chat`: read-eval loop until quit, EOF or Ctrl-C
pub async fn run_interactive(config: &Config) -> Result<()> {
    let session = Session::start(config).await?;

    let you = Style::new().green().bold();
    let assistant = Style::new().cyan().bold();
    let dim = Style::new().dim();
    println!(
        "{}",
        dim.apply_to("agentflow chat. Type 'quit', 'exit' or 'q' to leave.")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<ChatMessage> = Vec::new();

    loop {
        print!("{} ", you.apply_to("you>"));
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_quit(input) {
            break;
        }

        match session.ask(input, &history).await {
            Ok(report) => {
                println!("{} {}\n", assistant.apply_to("assistant>"), report.output);
                if let Some(updated) = report.state.updated_history {
                    history = updated;
                }
            }
            Err(e) => {
                error!(error = %e, "run failed");
                println!("{} {}\n", assistant.apply_to("assistant>"), session.failure_text(&e));
            }
        }
    }

    println!("{}", dim.apply_to("Goodbye."));
    Ok(())
}

fn is_quit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_words() {
        for word in ["quit", "EXIT", "q", "Quit"] {
            assert!(is_quit(word), "{}", word);
        }
        assert!(!is_quit("quite"));
        assert!(!is_quit("question"));
    }
}
