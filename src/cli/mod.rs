use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "docent", version, about = "Docs-grounded API answering agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Bind host; defaults to the configured host
        #[arg(long)]
        host: Option<String>,
        /// Bind port; defaults to the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ask one question, streaming the event frames to stdout
    Ask {
        /// The question to answer
        message: String,
        /// Continue an existing thread instead of starting a new one
        #[arg(long)]
        thread: Option<String>,
    },
    /// List stored conversation threads
    Threads,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_parses_host_and_port() {
        let cli = Cli::try_parse_from(["docent", "serve", "--host", "0.0.0.0", "--port", "9000"])
            .unwrap();
        match cli.command {
            Command::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn ask_takes_a_message_and_optional_thread() {
        let cli =
            Cli::try_parse_from(["docent", "ask", "best sci-fi?", "--thread", "t-1"]).unwrap();
        match cli.command {
            Command::Ask { message, thread } => {
                assert_eq!(message, "best sci-fi?");
                assert_eq!(thread.as_deref(), Some("t-1"));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["docent"]).is_err());
    }
}
