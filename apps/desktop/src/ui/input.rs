use shared::domain::{Decision, RequestId, UserId};

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::events::{UiError, UiErrorContext},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Command(BackendCommand),
    Help,
    Quit,
    Nothing,
}

pub fn parse_line(line: &str) -> Result<InputAction, UiError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let action = match verb.to_ascii_lowercase().as_str() {
        "" => InputAction::Nothing,
        "help" | "?" => InputAction::Help,
        "quit" | "exit" | "q" => InputAction::Quit,
        "refresh" => InputAction::Command(BackendCommand::Refresh),
        "show" | "list" => InputAction::Command(BackendCommand::Show),
        // An empty query is forwarded so that it clears the previous results.
        "search" => InputAction::Command(BackendCommand::Search {
            query: rest.to_string(),
        }),
        "request" => InputAction::Command(BackendCommand::SendRequest {
            user_id: UserId(parse_id(rest, "request <user-id>")?),
        }),
        "accept" => respond(rest, Decision::Accepted, "accept <request-id>")?,
        "reject" => respond(rest, Decision::Rejected, "reject <request-id>")?,
        "respond" => {
            let usage = "respond <request-id> <accepted|rejected>";
            let (id, decision) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| usage_error(usage))?;
            let decision = decision
                .trim()
                .parse::<Decision>()
                .map_err(|err| UiError::from_message(UiErrorContext::Input, err))?;
            respond(id, decision, usage)?
        }
        other => {
            return Err(UiError::from_message(
                UiErrorContext::Input,
                format!("unknown command '{other}'; type 'help' for a list"),
            ))
        }
    };
    Ok(action)
}

fn respond(raw_id: &str, decision: Decision, usage: &str) -> Result<InputAction, UiError> {
    Ok(InputAction::Command(BackendCommand::Respond {
        request_id: RequestId(parse_id(raw_id, usage)?),
        decision,
    }))
}

fn parse_id(raw: &str, usage: &str) -> Result<i64, UiError> {
    let raw = raw.trim().trim_start_matches('#');
    raw.parse::<i64>().map_err(|_| usage_error(usage))
}

fn usage_error(usage: &str) -> UiError {
    UiError::from_message(UiErrorContext::Input, format!("usage: {usage}"))
}
