//! Line commands understood by the interactive client.

use std::str::FromStr;
use uuid::Uuid;

pub const HELP: &str = "\
threads                 reload the current view
filter <name|All>       filter the thread list by category
open <thread-id>        open a thread
back                    back to the thread list
new                     open the new-thread composer
title <text>            set the new thread's title
body <text>             set the new thread's content
category <name|none>    set the new thread's category
post                    submit the new thread
cancel                  close the composer
reply [<reply-id>]      answer the thread, or a specific reply
say <text>              set the reply text
send                    submit the reply
login <user-id>         sign in as a user
logout                  sign out
show                    print the current view
help                    this text
quit                    exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Threads,
    Filter(String),
    Open(Uuid),
    Back,
    New,
    Title(String),
    Body(String),
    Category(Option<String>),
    Post,
    Cancel,
    Reply(Option<Uuid>),
    Say(String),
    Send,
    Login(Uuid),
    Logout,
    Show,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("`{0}` is not a valid id")]
    BadId(String),
}

fn id(arg: &str) -> Result<Uuid, CommandError> {
    Uuid::parse_str(arg).map_err(|_| CommandError::BadId(arg.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let required = |name: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };

        Ok(match word {
            "threads" => Command::Threads,
            "filter" => Command::Filter(required("filter")?),
            "open" => Command::Open(id(&required("open")?)?),
            "back" => Command::Back,
            "new" => Command::New,
            "title" => Command::Title(required("title")?),
            "body" => Command::Body(required("body")?),
            "category" => match required("category")?.as_str() {
                "none" => Command::Category(None),
                name => Command::Category(Some(name.to_string())),
            },
            "post" => Command::Post,
            "cancel" => Command::Cancel,
            "reply" if rest.is_empty() => Command::Reply(None),
            "reply" => Command::Reply(Some(id(rest)?)),
            "say" => Command::Say(required("say")?),
            "send" => Command::Send,
            "login" => Command::Login(id(&required("login")?)?),
            "logout" => Command::Logout,
            "show" | "" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        })
    }
}
