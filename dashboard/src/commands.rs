use crate::api::ApiClient;
use crate::errors::Result;
use crate::metrics::{COMMANDS_TOTAL, COMMAND_FAILURES_TOTAL};
use crate::model::Ack;
use serde::Serialize;
use tracing::{error, info};

/// One-shot action for the edge device. Serializes to the request body,
/// e.g. `{"command":"water","duration":5}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    Capture,
    Water {
        /// Seconds
        duration: u32,
    },
    Chirp {
        /// Seconds
        duration: u32,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Capture => "capture",
            Command::Water { .. } => "water",
            Command::Chirp { .. } => "chirp",
        }
    }

    pub fn path(&self) -> String {
        format!("/api/commands/{}", self.name())
    }
}

/// Sends commands without touching any polled state; the next poll shows the effect.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    client: ApiClient,
}

impl CommandDispatcher {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Posts `command` once. Failures are logged and returned, never retried.
    pub async fn dispatch(&self, command: Command) -> Result<Ack> {
        COMMANDS_TOTAL.inc();

        match self
            .client
            .send_json(reqwest::Method::POST, &command.path(), &command)
            .await
        {
            Ok(ack) => {
                info!("Command {} accepted: {}", command.name(), ack.message);
                Ok(ack)
            }
            Err(e) => {
                COMMAND_FAILURES_TOTAL.inc();
                error!("Command {} failed: {}", command.name(), e);
                Err(e)
            }
        }
    }

    pub async fn capture(&self) -> Result<Ack> {
        self.dispatch(Command::Capture).await
    }

    pub async fn water(&self, duration_secs: u32) -> Result<Ack> {
        self.dispatch(Command::Water {
            duration: duration_secs,
        })
        .await
    }

    pub async fn chirp(&self, duration_secs: u32) -> Result<Ack> {
        self.dispatch(Command::Chirp {
            duration: duration_secs,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bodies() {
        assert_eq!(
            serde_json::to_value(Command::Capture).unwrap(),
            serde_json::json!({"command": "capture"})
        );
        assert_eq!(
            serde_json::to_value(Command::Water { duration: 5 }).unwrap(),
            serde_json::json!({"command": "water", "duration": 5})
        );
    }

    #[test]
    fn test_command_paths() {
        assert_eq!(Command::Capture.path(), "/api/commands/capture");
        assert_eq!(Command::Chirp { duration: 3 }.path(), "/api/commands/chirp");
    }
}
