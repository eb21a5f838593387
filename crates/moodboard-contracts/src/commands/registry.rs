#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: CommandAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandAction {
    SetBase,
    ClearBase,
    Vary,
    Delete,
    List,
    Reset,
    Help,
    Quit,
}

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "base",
    action: CommandAction::SetBase,
}];

pub(crate) const ID_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "vary",
        action: CommandAction::Vary,
    },
    CommandSpec {
        command: "delete",
        action: CommandAction::Delete,
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "clear_base",
        action: CommandAction::ClearBase,
    },
    CommandSpec {
        command: "list",
        action: CommandAction::List,
    },
    CommandSpec {
        command: "reset",
        action: CommandAction::Reset,
    },
    CommandSpec {
        command: "help",
        action: CommandAction::Help,
    },
    CommandSpec {
        command: "quit",
        action: CommandAction::Quit,
    },
    CommandSpec {
        command: "exit",
        action: CommandAction::Quit,
    },
];

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "<prompt>            add an image to the moodboard",
    "/base <path>        use an image file as reference for the next prompts",
    "/clear_base         drop the reference image",
    "/vary <id> <prompt> edit an existing item into a new one",
    "/delete <id>        remove an item",
    "/list               show the items, newest first",
    "/reset              drop every item and the reference image",
    "/help",
    "/quit",
];
