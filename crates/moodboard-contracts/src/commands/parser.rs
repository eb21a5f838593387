use super::registry::{
    CommandAction, CommandSpec, ID_COMMANDS, NO_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
};

/// One line of session input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Noop,
    Add { prompt: String },
    SetBase { path: String },
    ClearBase,
    Vary { id: String, prompt: String },
    Delete { id: String },
    List,
    Reset,
    Help,
    Quit,
    Unknown { command: String, arg: String },
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<CommandAction> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_single_path_arg(arg: &str) -> String {
    if arg.trim().is_empty() {
        return String::new();
    }
    let parts = match shell_words::split(arg) {
        Ok(parts) => parts,
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    };
    parts
        .into_iter()
        .filter(|value| !value.is_empty())
        .collect::<Vec<String>>()
        .join(" ")
}

fn split_id_and_rest(arg: &str) -> (String, String) {
    let trimmed = arg.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((id, rest)) => (id.to_string(), rest.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

pub fn parse_command(text: &str) -> SessionCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return SessionCommand::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(CommandAction::SetBase) = find_action(&command, SINGLE_PATH_COMMANDS) {
                return SessionCommand::SetBase {
                    path: parse_single_path_arg(arg),
                };
            }

            if let Some(action) = find_action(&command, ID_COMMANDS) {
                let (id, rest) = split_id_and_rest(arg);
                return match action {
                    CommandAction::Vary => SessionCommand::Vary { id, prompt: rest },
                    _ => SessionCommand::Delete { id },
                };
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return match action {
                    CommandAction::ClearBase => SessionCommand::ClearBase,
                    CommandAction::List => SessionCommand::List,
                    CommandAction::Reset => SessionCommand::Reset,
                    CommandAction::Help => SessionCommand::Help,
                    _ => SessionCommand::Quit,
                };
            }

            return SessionCommand::Unknown {
                command,
                arg: arg.to_string(),
            };
        }
    }

    SessionCommand::Add {
        prompt: raw_trimmed.to_string(),
    }
}
