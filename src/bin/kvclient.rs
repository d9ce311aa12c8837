//! Interactive Client
//!
//! Reads commands from stdin, sends each one to the server and prints the
//! HTTP status, `X-Cache-Status`, response body and request latency.

use std::fmt;
use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use reqwest::{Client, Method};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Available commands:
  add <key> <value>     - Add a new key-value pair.
  get <key>             - Retrieve the value for a given key.
  update <key> <value>  - Update the value for an existing key.
  delete <key>          - Remove a key-value pair.
  stats                 - Get server cache statistics.
  help                  - Show this message.
  exit                  - Close the client.";

/// Interactive client for the key-value server
#[derive(Parser, Debug)]
#[command(name = "kvclient", version, about)]
struct Args {
    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,
}

// == Commands ==
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Add { key: String, value: String },
    Get { key: String },
    Update { key: String, value: String },
    Delete { key: String },
    Stats,
    Help,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseError {
    Empty,
    Unknown(String),
    Usage(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "Enter a command. Type 'help' for available commands."),
            ParseError::Unknown(word) => write!(
                f,
                "Invalid command '{}'. Type 'help' for available commands.",
                word
            ),
            ParseError::Usage(usage) => write!(f, "Usage: {}", usage),
        }
    }
}

impl Command {
    /// Parses one input line. Values run to the end of the line and may hold spaces.
    fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim_start()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "add" => {
                let (key, value) =
                    key_and_value(rest).ok_or(ParseError::Usage("add <key> <value>"))?;
                Ok(Command::Add { key, value })
            }
            "update" => {
                let (key, value) =
                    key_and_value(rest).ok_or(ParseError::Usage("update <key> <value>"))?;
                Ok(Command::Update { key, value })
            }
            "get" => Ok(Command::Get {
                key: single_key(rest).ok_or(ParseError::Usage("get <key>"))?,
            }),
            "delete" => Ok(Command::Delete {
                key: single_key(rest).ok_or(ParseError::Usage("delete <key>"))?,
            }),
            "stats" => Ok(Command::Stats),
            "help" => Ok(Command::Help),
            "exit" | "quit" => Ok(Command::Exit),
            _ => Err(ParseError::Unknown(word.to_string())),
        }
    }
}

fn single_key(rest: &str) -> Option<String> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(key), None) => Some(key.to_string()),
        _ => None,
    }
}

fn key_and_value(rest: &str) -> Option<(String, String)> {
    let (key, value) = rest.split_once(char::is_whitespace)?;
    Some((key.to_string(), value.trim_start().to_string()))
}

// == HTTP ==
struct KvClient {
    http: Client,
    base_url: String,
}

impl KvClient {
    fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends the request for `command`, or None for commands handled locally.
    async fn send(&self, command: &Command) -> Option<reqwest::Result<reqwest::Response>> {
        let data = format!("{}/api/data", self.base_url);
        let request = match command {
            Command::Add { key, value } => self
                .http
                .request(Method::POST, &data)
                .query(&[("key", key), ("val", value)]),
            Command::Update { key, value } => self
                .http
                .request(Method::PUT, &data)
                .query(&[("key", key), ("val", value)]),
            Command::Get { key } => self.http.get(&data).query(&[("key", key)]),
            Command::Delete { key } => self.http.delete(&data).query(&[("key", key)]),
            Command::Stats => self.http.get(format!("{}/stats", self.base_url)),
            Command::Help | Command::Exit => return None,
        };
        Some(request.send().await)
    }
}

async fn print_exchange(client: &KvClient, command: &Command) {
    let started = Instant::now();
    let Some(outcome) = client.send(command).await else {
        return;
    };
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    println!("Request Latency: {:.3} ms", latency_ms);
    match outcome {
        Ok(response) => {
            println!("HTTP Status: {}", response.status().as_u16());
            if let Some(source) = response
                .headers()
                .get("x-cache-status")
                .and_then(|v| v.to_str().ok())
            {
                println!("X-Cache-Status: {}", source);
            }
            match response.text().await {
                Ok(body) => println!("Server Response Body:\n{}", body),
                Err(err) => eprintln!("Failed to read response body: {}", err),
            }
        }
        Err(err) => eprintln!("Network/Client Error: {}", err),
    }
}

fn prompt() {
    print!("\nEnter command (add, get, update, delete, stats, exit, help): ");
    // A failed flush only loses the prompt text
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = KvClient::new(&args.url, Duration::from_secs(args.timeout))?;

    println!("Interactive KV Client");
    println!("Server target: {}", client.base_url);
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };

        match Command::parse(&line) {
            Ok(Command::Exit) => break,
            Ok(Command::Help) => println!("\n{}", HELP),
            Ok(command) => print_exchange(&client, &command).await,
            Err(err) => println!("{}", err),
        }
    }

    println!("Exiting client.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_keeps_spaces_in_value() {
        assert_eq!(
            Command::parse("add greeting hello big world").unwrap(),
            Command::Add {
                key: "greeting".into(),
                value: "hello big world".into(),
            }
        );
    }

    #[test]
    fn test_parse_update_get_delete() {
        assert_eq!(
            Command::parse("  UPDATE k v2 ").unwrap(),
            Command::Update {
                key: "k".into(),
                value: "v2".into(),
            }
        );
        assert_eq!(
            Command::parse("get k").unwrap(),
            Command::Get { key: "k".into() }
        );
        assert_eq!(
            Command::parse("delete k").unwrap(),
            Command::Delete { key: "k".into() }
        );
    }

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!(Command::parse("stats").unwrap(), Command::Stats);
        assert_eq!(Command::parse("help").unwrap(), Command::Help);
        assert_eq!(Command::parse("exit").unwrap(), Command::Exit);
        assert_eq!(Command::parse("quit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_missing_arguments() {
        assert_eq!(
            Command::parse("add onlykey"),
            Err(ParseError::Usage("add <key> <value>"))
        );
        assert_eq!(Command::parse("get"), Err(ParseError::Usage("get <key>")));
        assert_eq!(
            Command::parse("delete a b"),
            Err(ParseError::Usage("delete <key>"))
        );
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert_eq!(
            Command::parse("scan k"),
            Err(ParseError::Unknown("scan".into()))
        );
        assert_eq!(Command::parse("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_args_defaults() {
        let args = Args::try_parse_from(["kvclient"]).unwrap();
        assert_eq!(args.url, "http://127.0.0.1:8080");
        assert_eq!(args.timeout, 5);
    }
}
