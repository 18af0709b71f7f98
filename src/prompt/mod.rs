//! Operator input.
//!
//! Every value typed at a prompt belongs to one [`InputKind`], and each kind
//! has its own parser. A [`Prompter`] keeps asking until the answer parses,
//! so callers only ever see valid input.

pub mod menu;

use anyhow::{Context, Result};
use dialoguer::{Input, Password, theme::ColorfulTheme};
use secrecy::SecretString;

use crate::errors::ValidationError;
use crate::plan::{Arrangement, WallSpec};

/// The kinds of value the operator can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `<columns>x<rows>`
    Arrangement,
    /// A pixel count greater than zero
    Pixels,
    /// A length in millimeters greater than zero
    Millimeters,
    /// A length in millimeters, zero allowed
    MillimetersOrZero,
    /// A host name or address, no whitespace
    Hostname,
    /// Anything, including an empty answer
    FreeText,
}

impl InputKind {
    /// Check `raw` with this kind's parser, discarding the parsed value.
    pub fn check(&self, field: &'static str, raw: &str) -> Result<(), ValidationError> {
        match self {
            InputKind::Arrangement => parse_arrangement(raw).map(|_| ()),
            InputKind::Pixels => parse_pixels(field, raw).map(|_| ()),
            InputKind::Millimeters => parse_millimeters(field, raw, false).map(|_| ()),
            InputKind::MillimetersOrZero => parse_millimeters(field, raw, true).map(|_| ()),
            InputKind::Hostname => parse_hostname(raw).map(|_| ()),
            InputKind::FreeText => Ok(()),
        }
    }
}

pub fn parse_arrangement(raw: &str) -> Result<Arrangement, ValidationError> {
    raw.parse()
}

pub fn parse_pixels(field: &'static str, raw: &str) -> Result<u32, ValidationError> {
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::new(field, format!("'{}' is not a whole number", raw.trim())))?;
    if value == 0 {
        return Err(ValidationError::new(field, "must be greater than 0"));
    }
    Ok(value)
}

pub fn parse_millimeters(
    field: &'static str,
    raw: &str,
    allow_zero: bool,
) -> Result<f64, ValidationError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::new(field, format!("'{}' is not a number", raw.trim())))?;
    if !value.is_finite() {
        return Err(ValidationError::new(field, "must be a finite number"));
    }
    if value < 0.0 || (!allow_zero && value == 0.0) {
        let bound = if allow_zero { "zero or more" } else { "greater than 0" };
        return Err(ValidationError::new(field, format!("must be {}", bound)));
    }
    Ok(value)
}

pub fn parse_hostname(raw: &str) -> Result<String, ValidationError> {
    let host = raw.trim();
    if host.is_empty() {
        return Err(ValidationError::new("hostname", "is required"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("hostname", "must not contain spaces"));
    }
    Ok(host.to_string())
}

/// Something that can ask the operator for values.
pub trait Prompter {
    /// Ask for a value of `kind`, repeating until it is accepted. A blank
    /// answer yields `default` when one is given.
    fn ask(
        &mut self,
        label: &str,
        field: &'static str,
        kind: InputKind,
        default: Option<&str>,
    ) -> Result<String>;

    /// Ask for a secret without echoing it. May be empty.
    fn ask_secret(&mut self, label: &str) -> Result<SecretString>;

    /// Print a line for the operator.
    fn say(&mut self, message: &str);
}

/// Terminal prompter built on dialoguer.
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for DialoguerPrompter {
    fn ask(
        &mut self,
        label: &str,
        field: &'static str,
        kind: InputKind,
        default: Option<&str>,
    ) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty(true)
            .validate_with(move |value: &String| -> Result<(), String> {
                if value.trim().is_empty() && default.is_some() {
                    return Ok(());
                }
                kind.check(field, value).map_err(|e| e.to_string())
            });
        if let Some(default) = default {
            input = input.default(default.to_string()).show_default(true);
        }
        let answer = input
            .interact_text()
            .with_context(|| format!("Failed to read {}", field))?;
        Ok(answer.trim().to_string())
    }

    fn ask_secret(&mut self, label: &str) -> Result<SecretString> {
        let secret = Password::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()
            .context("Failed to read password")?;
        Ok(SecretString::from(secret))
    }

    fn say(&mut self, message: &str) {
        println!("{}", message);
    }
}

/// Wall values supplied up front, e.g. from command-line flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WallSpecInput {
    pub arrangement: Option<Arrangement>,
    pub monitor_width_px: Option<u32>,
    pub monitor_height_px: Option<u32>,
    pub monitor_inside_width_mm: Option<f64>,
    pub bezel_mm: Option<f64>,
}

impl WallSpecInput {
    /// Whether every value is present, so no prompt is needed.
    pub fn is_complete(&self) -> bool {
        self.arrangement.is_some()
            && self.monitor_width_px.is_some()
            && self.monitor_height_px.is_some()
            && self.monitor_inside_width_mm.is_some()
            && self.bezel_mm.is_some()
    }
}

/// Fill in every value missing from `input` by asking the operator.
pub fn capture_wall_spec(prompter: &mut dyn Prompter, input: &WallSpecInput) -> Result<WallSpec> {
    let arrangement = match input.arrangement {
        Some(a) => a,
        None => parse_arrangement(&prompter.ask(
            "Arrangement of monitors (e.g. 2x2)",
            "arrangement",
            InputKind::Arrangement,
            None,
        )?)?,
    };
    let monitor_width_px = match input.monitor_width_px {
        Some(v) => v,
        None => parse_pixels(
            "monitor width",
            &prompter.ask(
                "Monitor width in pixels",
                "monitor width",
                InputKind::Pixels,
                None,
            )?,
        )?,
    };
    let monitor_height_px = match input.monitor_height_px {
        Some(v) => v,
        None => parse_pixels(
            "monitor height",
            &prompter.ask(
                "Monitor height in pixels",
                "monitor height",
                InputKind::Pixels,
                None,
            )?,
        )?,
    };
    let monitor_inside_width_mm = match input.monitor_inside_width_mm {
        Some(v) => v,
        None => parse_millimeters(
            "monitor inside width",
            &prompter.ask(
                "Visible width of one monitor in mm",
                "monitor inside width",
                InputKind::Millimeters,
                None,
            )?,
            false,
        )?,
    };
    let bezel_mm = match input.bezel_mm {
        Some(v) => v,
        None => parse_millimeters(
            "bezel width",
            &prompter.ask(
                "Bezel width in mm",
                "bezel width",
                InputKind::MillimetersOrZero,
                None,
            )?,
            true,
        )?,
    };

    let spec = WallSpec {
        columns: arrangement.columns,
        rows: arrangement.rows,
        monitor_width_px,
        monitor_height_px,
        monitor_inside_width_mm,
        bezel_mm,
    };
    spec.validate()?;
    Ok(spec)
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedPrompter;
    use super::*;

    #[test]
    fn test_parse_pixels() {
        assert_eq!(parse_pixels("monitor width", " 1920 ").unwrap(), 1920);
        assert!(parse_pixels("monitor width", "0").is_err());
        assert!(parse_pixels("monitor width", "-5").is_err());
        assert!(parse_pixels("monitor width", "19.5").is_err());
        assert_eq!(parse_pixels("monitor width", "abc").unwrap_err().field, "monitor width");
    }

    #[test]
    fn test_parse_millimeters() {
        assert_eq!(parse_millimeters("bezel width", "10.5", true).unwrap(), 10.5);
        assert_eq!(parse_millimeters("bezel width", "0", true).unwrap(), 0.0);
        assert!(parse_millimeters("monitor inside width", "0", false).is_err());
        assert!(parse_millimeters("bezel width", "-1", true).is_err());
        assert!(parse_millimeters("bezel width", "inf", true).is_err());
        assert!(parse_millimeters("bezel width", "NaN", true).is_err());
        assert!(parse_millimeters("bezel width", "ten", true).is_err());
    }

    #[test]
    fn test_parse_hostname() {
        assert_eq!(parse_hostname(" 10.0.0.5 ").unwrap(), "10.0.0.5");
        assert!(parse_hostname("").is_err());
        assert!(parse_hostname("pi one").is_err());
    }

    #[test]
    fn test_free_text_accepts_anything() {
        assert!(InputKind::FreeText.check("username", "").is_ok());
        assert!(InputKind::FreeText.check("username", "__import__('os')").is_ok());
    }

    #[test]
    fn test_capture_wall_spec_reprompts_invalid_values() {
        let mut prompter =
            ScriptedPrompter::new(&["two by two", "2x2", "0", "1920", "1080", "-3", "520", "10"]);
        let spec = capture_wall_spec(&mut prompter, &WallSpecInput::default()).unwrap();
        assert_eq!(prompter.rejected, 3);
        assert_eq!(
            spec,
            WallSpec {
                columns: 2,
                rows: 2,
                monitor_width_px: 1920,
                monitor_height_px: 1080,
                monitor_inside_width_mm: 520.0,
                bezel_mm: 10.0,
            }
        );
    }

    #[test]
    fn test_capture_wall_spec_only_asks_for_missing_values() {
        let input = WallSpecInput {
            arrangement: Some("3x1".parse().unwrap()),
            monitor_width_px: Some(1280),
            monitor_height_px: Some(1024),
            monitor_inside_width_mm: None,
            bezel_mm: Some(0.0),
        };
        assert!(!input.is_complete());
        let mut prompter = ScriptedPrompter::new(&["376"]);
        let spec = capture_wall_spec(&mut prompter, &input).unwrap();
        assert_eq!(prompter.asked.len(), 1);
        assert_eq!(spec.columns, 3);
        assert_eq!(spec.monitor_inside_width_mm, 376.0);
    }

    #[test]
    fn test_capture_wall_spec_rejects_invalid_flags() {
        let input = WallSpecInput {
            arrangement: Some("1x1".parse().unwrap()),
            monitor_width_px: Some(100),
            monitor_height_px: Some(100),
            monitor_inside_width_mm: Some(-1.0),
            bezel_mm: Some(0.0),
        };
        let mut prompter = ScriptedPrompter::new(&[]);
        assert!(capture_wall_spec(&mut prompter, &input).is_err());
    }
}
