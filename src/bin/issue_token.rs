//! CLI tool to issue a bearer token for a user.
//!
//! Usage:
//!   cargo run --bin issue-token -- --user <uuid> [--ttl 8h]

use std::env;

use tcm_lib::auth::JwtKeys;
use tcm_lib::config::Config;
use uuid::Uuid;

const DEFAULT_TTL_SECS: i64 = 8 * 3600;

fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    let mut user: Option<String> = None;
    let mut ttl: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--user" | "-u" => {
                i += 1;
                if i < args.len() {
                    user = Some(args[i].clone());
                }
            }
            "--ttl" | "-t" => {
                i += 1;
                if i < args.len() {
                    ttl = Some(args[i].clone());
                }
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    // A fresh user id is minted when none is given
    let user_id = match user.as_deref().map(Uuid::parse_str) {
        Some(Ok(id)) => id,
        Some(Err(_)) => {
            eprintln!("Error: --user must be a UUID");
            std::process::exit(1);
        }
        None => Uuid::new_v4(),
    };

    let ttl_secs = match ttl.as_deref().map(parse_duration) {
        Some(Some(secs)) => secs,
        Some(None) => {
            eprintln!("Error: Invalid --ttl. Use e.g. 30m, 8h or 7d");
            std::process::exit(1);
        }
        None => DEFAULT_TTL_SECS,
    };

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let keys = JwtKeys::from_secret(&config.jwt_secret);
    let token = match keys.issue(user_id, ttl_secs) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error issuing token: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    println!("  User:    {}", user_id);
    println!("  Expires: in {} seconds", ttl_secs);
    println!();
    println!("  Token:   {}", token);
    println!();
}

/// Parse `<n>m`, `<n>h` or `<n>d` into seconds.
fn parse_duration(s: &str) -> Option<i64> {
    let (num, unit) = s.split_at(s.len().checked_sub(1)?);
    let n: i64 = num.parse().ok().filter(|n| *n > 0)?;
    match unit {
        "m" => Some(n * 60),
        "h" => Some(n * 3600),
        "d" => Some(n * 86400),
        _ => None,
    }
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: issue-token [--user <uuid>] [--ttl <duration>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --user, -u   User id to embed as the token subject (default: new UUID)");
    eprintln!("  --ttl, -t    Token lifetime, e.g. 30m, 8h, 7d (default: 8h)");
    eprintln!("  --help, -h   Show this message");
    eprintln!();
}
