use super::build_model;
use crate::config::Config;
use civica_core::chat::ChatSession;
use clap::Args;
use std::io::{self, BufRead, Write};

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Ask one question and exit; omit for an interactive session
    pub message: Option<String>,
}

pub fn run(args: &ChatArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let model = build_model(&config.model.chat);
    let mut session = ChatSession::new();

    if let Some(message) = &args.message {
        let reply = session.send(model.as_ref(), message);
        println!("{reply}");
        return Ok(());
    }

    println!("{}", civica_core::chat::GREETING);
    println!("(empty line or \"exit\" to quit)");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() || message == "exit" || message == "quit" {
            break;
        }
        let reply = session.send(model.as_ref(), message);
        println!("{reply}");
    }
    Ok(())
}
