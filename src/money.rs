//! Money fields
//!
//! Upstream prices arrive as minor units (cents) plus a pre-formatted display
//! string. A zero amount is treated the same as a missing one: every money
//! accessor resolves to `null`.

use async_graphql::Object;
use serde::Deserialize;

/// Largest precision [`format_money`] honors
pub const MAX_PRECISION: usize = 20;

/// Formatting options for [`format_money`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyFormat {
    pub decimal: String,
    pub thousand: String,
    pub symbol: String,
    pub precision: usize,
    /// `%s` is replaced by the symbol, `%v` by the value
    pub format: String,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self {
            decimal: ".".to_string(),
            thousand: ",".to_string(),
            symbol: "$".to_string(),
            precision: 0,
            format: "%s%v".to_string(),
        }
    }
}

/// Format a major-unit amount, e.g. `1234.5` → `"$1,235"`
pub fn format_money(value: f64, options: &MoneyFormat) -> String {
    let precision = options.precision.min(MAX_PRECISION);
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;

    let fixed = format!("{:.*}", precision, rounded.abs());
    let (integer, fraction) = match fixed.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut number = group_thousands(integer, &options.thousand);
    if let Some(fraction) = fraction {
        number.push_str(&options.decimal);
        number.push_str(fraction);
    }

    let template = if rounded < 0.0 {
        options.format.replace('-', "").replace("%v", "-%v")
    } else {
        options.format.clone()
    };

    template
        .replace("%s", &options.symbol)
        .replace("%v", &number)
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(digit);
    }
    grouped
}

/// Display symbol for an ISO 4217 currency code
pub fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency.to_ascii_uppercase().as_str() {
        "USD" | "CAD" | "AUD" | "HKD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" | "CNY" => Some("¥"),
        _ => None,
    }
}

/// A price as exposed to clients
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Money {
    pub cents: Option<f64>,
    pub display: Option<String>,
    pub symbol: Option<String>,
}

impl Money {
    /// Build a money value from minor units and a currency code, deriving
    /// the display string.
    pub fn from_minor(cents: Option<f64>, currency: Option<&str>) -> Self {
        let symbol = currency.map(|code| {
            currency_symbol(code)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} ", code.to_ascii_uppercase()))
        });
        let display = cents.filter(|c| *c != 0.0).map(|c| {
            let mut options = MoneyFormat::default();
            if let Some(symbol) = &symbol {
                options.symbol = symbol.clone();
            }
            format_money(c / 100.0, &options)
        });

        Self {
            cents,
            display,
            symbol,
        }
    }

    fn minor_units(&self) -> Option<f64> {
        self.cents.filter(|cents| *cents != 0.0)
    }
}

#[Object]
impl Money {
    /// A formatted price with various currency formatting options.
    async fn amount(
        &self,
        #[graphql(default_with = "\".\".to_string()")] decimal: String,
        #[graphql(
            default_with = "\"%s%v\".to_string()",
            desc = "Allows control of symbol position (%v = value, %s = symbol)"
        )]
        format: String,
        #[graphql(default = 0)] precision: i32,
        symbol: Option<String>,
        #[graphql(default_with = "\",\".to_string()")] thousand: String,
    ) -> Option<String> {
        let cents = self.minor_units()?;
        let options = MoneyFormat {
            decimal,
            thousand,
            symbol: symbol
                .or_else(|| self.symbol.clone())
                .unwrap_or_else(|| MoneyFormat::default().symbol),
            precision: precision.max(0) as usize,
            format,
        };
        Some(format_money(cents / 100.0, &options))
    }

    /// An amount of money expressed in cents.
    async fn cents(&self) -> Option<f64> {
        self.minor_units()
    }

    /// A pre-formatted price.
    async fn display(&self) -> Option<&str> {
        self.minor_units()?;
        self.display.as_deref().filter(|display| !display.is_empty())
    }
}
