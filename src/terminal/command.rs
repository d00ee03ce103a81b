//! Parser for the device terminal grammar.
//!
//! Verbs are case-insensitive and surrounding whitespace is ignored.
//! Spanish aliases (`ayuda`, `limpiar`) are accepted alongside the English
//! verbs.

use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    Ping(Ipv4Addr),
    IpConfig,
    Help,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `ping` without a valid dotted-quad argument. Carries the raw argument.
    InvalidAddress(String),
    Unrecognized(String),
}

/// Parse one command line.
pub fn parse_command(line: &str) -> Result<TerminalCommand, ParseError> {
    let trimmed = line.trim();
    let mut parts = trimmed.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_lowercase();

    match verb.as_str() {
        "ping" => {
            let argument = parts.next().unwrap_or_default();
            parse_dotted_quad(argument)
                .map(TerminalCommand::Ping)
                .ok_or_else(|| ParseError::InvalidAddress(argument.to_string()))
        }
        "ipconfig" | "ifconfig" if parts.next().is_none() => Ok(TerminalCommand::IpConfig),
        "help" | "ayuda" if parts.next().is_none() => Ok(TerminalCommand::Help),
        "clear" | "limpiar" if parts.next().is_none() => Ok(TerminalCommand::Clear),
        _ => Err(ParseError::Unrecognized(trimmed.to_string())),
    }
}

/// Four dot-separated decimal octets of one to three digits, each 0..=255.
/// Leading zeros are accepted (`192.168.01.12`).
fn parse_dotted_quad(input: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = input.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    let [a, b, c, d] = octets;
    Some(Ipv4Addr::new(a, b, c, d))
}

/// Static summary printed by `help`.
pub const HELP_LINES: [&str; 5] = [
    "Available commands:",
    "  ping <ip>     - Test connectivity",
    "  ipconfig      - Show IP configuration",
    "  clear         - Clear terminal",
    "  help          - Show this help",
];
