//! Line based front end: each line is an edit followed by Enter.

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use super::ui;
use crate::converter::{ConverterHandle, View};
use crate::core::CurrencyCode;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Amount(String),
    From(CurrencyCode),
    To(CurrencyCode),
    /// A bare Enter: convert the current amount again.
    Confirm,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Confirm);
        }
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Command::Amount(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next();
        match (name.as_str(), arg) {
            ("from", Some(code)) => Ok(Command::From(code.parse()?)),
            ("to", Some(code)) => Ok(Command::To(code.parse()?)),
            ("from" | "to", None) => bail!("Usage: :{} CODE", name),
            ("help" | "h", _) => Ok(Command::Help),
            ("quit" | "q", _) => Ok(Command::Quit),
            _ => bail!("Unknown command: {}", line),
        }
    }
}

async fn wait_for_conversion(view: &mut tokio::sync::watch::Receiver<View>, after: u64) -> Result<View> {
    let updated = view
        .wait_for(|v| v.conversions > after)
        .await
        .context("Converter session has stopped")?
        .clone();
    Ok(updated)
}

fn status_moved(shown: &View, current: &View) -> bool {
    shown.last_refreshed != current.last_refreshed || shown.rates_stale != current.rates_stale
}

/// Feeds `input` lines to the converter and renders each resulting view.
///
/// While waiting for input, heartbeat updates to the refresh timestamp are
/// printed as a status line.
pub async fn run<R, W>(input: R, mut output: W, converter: &ConverterHandle) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut view = converter.subscribe();
    let mut shown = wait_for_conversion(&mut view, 0).await?;
    writeln!(output, "{}", ui::render_view(&shown))?;
    output.flush()?;

    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            biased;
            line = lines.next_line() => line?,
            changed = view.changed() => {
                changed.context("Converter session has stopped")?;
                let current = view.borrow_and_update().clone();
                if status_moved(&shown, &current) {
                    writeln!(output, "{}", ui::render_status(&current))?;
                    output.flush()?;
                    shown = current;
                }
                continue;
            }
        };
        let Some(line) = line else { break };

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "{}", ui::style_text(&e.to_string(), ui::StyleType::Error))?;
                continue;
            }
        };
        debug!(?command, "Parsed command");

        let before = converter.view().conversions;
        match command {
            Command::Quit => break,
            Command::Help => {
                writeln!(output, "{}", ui::render_help())?;
                continue;
            }
            Command::Amount(raw) => {
                converter.amount_changed(raw)?;
                converter.confirm()?;
            }
            Command::Confirm => converter.confirm()?,
            Command::From(code) => converter.from_changed(code)?,
            Command::To(code) => converter.to_changed(code)?,
        }

        shown = wait_for_conversion(&mut view, before).await?;
        writeln!(output, "{}", ui::render_view(&shown))?;
        output.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterSettings;
    use crate::core::config::AppConfig;
    use crate::core::rates::{RateStore, RateTable};
    use crate::core::timestamp::{ManualClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, BufReader};

    #[test]
    fn test_parse_commands() {
        assert_eq!("".parse::<Command>().unwrap(), Command::Confirm);
        assert_eq!(
            " 12.5 ".parse::<Command>().unwrap(),
            Command::Amount("12.5".to_string())
        );
        assert_eq!(
            ":from eur".parse::<Command>().unwrap(),
            Command::From(CurrencyCode::Eur)
        );
        assert_eq!(
            ":TO JPY".parse::<Command>().unwrap(),
            Command::To(CurrencyCode::Jpy)
        );
        assert_eq!(":q".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!(":help".parse::<Command>().unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ":from".parse::<Command>().unwrap_err().to_string(),
            "Usage: :from CODE"
        );
        assert!(
            ":to GBP"
                .parse::<Command>()
                .unwrap_err()
                .to_string()
                .contains("Unsupported currency")
        );
        assert_eq!(
            ":swap".parse::<Command>().unwrap_err().to_string(),
            "Unknown command: :swap"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_transcript() {
        let store = Arc::new(RateStore::new());
        store.replace(RateTable::from_rates([("USD", 1.0), ("INR", 83.0), ("EUR", 0.5)]));
        let settings = ConverterSettings::from_config(&AppConfig::default()).unwrap();
        let converter = ConverterHandle::spawn(settings, store, Arc::new(SystemClock));

        let input = "100\n:to EUR\n:from XYZ\n:to\nabc\n:quit\n42\n";
        let mut output = Vec::new();
        run(input.as_bytes(), &mut output, &converter).await.unwrap();

        let output = console::strip_ansi_codes(&String::from_utf8(output).unwrap()).to_string();
        let results: Vec<_> = output.lines().filter(|l| l.contains(" = ")).collect();
        assert_eq!(
            results,
            vec![
                "$ 0 USD  =  ₹ 0.00 INR",
                "$ 100.00 USD  =  ₹ 8300.00 INR",
                "$ 100.00 USD  =  € 50.00 EUR",
                "$ abc USD  =  € Invalid EUR",
            ]
        );
        assert!(output.contains("Unsupported currency: XYZ"));
        assert!(output.contains("Usage: :to CODE"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_prompt_shows_heartbeat_updates() {
        let store = Arc::new(RateStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 9, 6, 30, 0).unwrap(),
        ));
        let settings = ConverterSettings::from_config(&AppConfig::default()).unwrap();
        let converter = ConverterHandle::spawn(settings, store, clock.clone());

        let (mut client, server) = tokio::io::duplex(64);
        let mut output = Vec::new();
        let typist = async {
            clock.advance(chrono::Duration::seconds(61));
            tokio::time::sleep(Duration::from_secs(65)).await;
            client.write_all(b":quit\n").await.unwrap();
        };
        let (result, ()) = tokio::join!(run(BufReader::new(server), &mut output, &converter), typist);
        result.unwrap();

        let output = console::strip_ansi_codes(&String::from_utf8(output).unwrap()).to_string();
        assert_eq!(output.lines().filter(|l| l.contains(" = ")).count(), 1);
        assert!(output.contains("Last refreshed: 09 Mar 2024, 12:00:00 IST"));
        assert!(output.contains("Last refreshed: 09 Mar 2024, 12:01:01 IST"));
    }
}
