use console::style;

use crate::converter::View;
use crate::core::CurrencyCode;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Amount,
    Result,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Amount => style(text).bold(),
        StyleType::Result => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

fn is_placeholder_result(result: &str) -> bool {
    ["Invalid", "Error"].iter().any(|marker| result.ends_with(marker))
}

/// Renders the converter view as a few lines of terminal text.
pub fn render_view(view: &View) -> String {
    let result_style = if is_placeholder_result(&view.result_text) {
        StyleType::Error
    } else {
        StyleType::Result
    };

    format!(
        "{} {}  =  {} {}\n{}",
        style_text(&view.amount_text, StyleType::Amount),
        style_text(view.from.code(), StyleType::Subtle),
        style_text(&view.result_text, result_style),
        style_text(view.to.code(), StyleType::Subtle),
        render_status(view),
    )
}

/// The refresh timestamp, followed by a warning when rates may be stale.
pub fn render_status(view: &View) -> String {
    let mut output = style_text(&view.last_refreshed, StyleType::Subtle);
    if view.rates_stale {
        output.push('\n');
        output.push_str(&style_text(
            "Rates may be stale: recent refreshes failed",
            StyleType::Error,
        ));
    }
    output
}

pub fn render_help() -> String {
    let codes = CurrencyCode::ALL
        .iter()
        .map(|c| format!("{} ({})", c.code(), c.symbol()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{}\n  <amount>     convert an amount\n  :from CODE   set source currency\n  :to CODE     set target currency\n  :help        show this help\n  :quit        exit\n{}",
        style_text("Commands", StyleType::Title),
        style_text(&format!("Currencies: {codes}"), StyleType::Subtle),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> View {
        View {
            amount_text: "$ 100.00".to_string(),
            result_text: "₹ 8300.00".to_string(),
            last_refreshed: "Last refreshed: 09 Mar 2024, 12:00:00 IST".to_string(),
            from: CurrencyCode::Usd,
            to: CurrencyCode::Inr,
            rates_stale: false,
            conversions: 1,
        }
    }

    #[test]
    fn test_render_view_contains_all_outputs() {
        let output = console::strip_ansi_codes(&render_view(&view())).to_string();
        assert_eq!(
            output,
            "$ 100.00 USD  =  ₹ 8300.00 INR\nLast refreshed: 09 Mar 2024, 12:00:00 IST"
        );
    }

    #[test]
    fn test_render_view_warns_on_stale_rates() {
        let mut view = view();
        view.rates_stale = true;
        let output = console::strip_ansi_codes(&render_view(&view)).to_string();
        assert!(output.ends_with("Rates may be stale: recent refreshes failed"));
    }

    #[test]
    fn test_render_status_omits_conversion() {
        let output = console::strip_ansi_codes(&render_status(&view())).to_string();
        assert_eq!(output, "Last refreshed: 09 Mar 2024, 12:00:00 IST");
    }

    #[test]
    fn test_help_lists_currencies() {
        let help = console::strip_ansi_codes(&render_help()).to_string();
        assert!(help.contains(":from CODE"));
        assert!(help.contains("JPY (¥)"));
    }
}
