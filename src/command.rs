//! Inbound remote commands and operator console commands.
//!
//! Both arrive as free text. They are decoded once, at the boundary, into
//! closed enums so the rest of the crate never branches on raw strings.
//!
//! # Remote commands
//!
//! | Payload | Command |
//! |---------|---------|
//! | `mode_auto` | [`InboundCommand::ModeAuto`] |
//! | `mode_manual` | [`InboundCommand::ModeManual`] |
//! | `fan_on` | [`InboundCommand::FanOn`] |
//! | `fan_off` | [`InboundCommand::FanOff`] |
//! | anything else | [`InboundCommand::Unrecognized`] |
//!
//! # Operator commands
//!
//! ```text
//! reading <ppm>        override the reading
//! sensor manual|auto   who owns the reading
//! fan manual|auto      who owns the fan
//! toggle               flip the fan (manual fan only)
//! target <ppm>         hysteresis target
//! band <ppm>           hysteresis half-width
//! interval <secs>      telemetry period
//! mqtt on|off          messaging link
//! status               print a snapshot
//! ```

/// Remote command received on the update topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundCommand {
    /// Hand the fan back to automatic control.
    ModeAuto,
    /// Take the fan under manual control.
    ModeManual,
    /// Switch the fan on (manual mode only).
    FanOn,
    /// Switch the fan off (manual mode only).
    FanOff,
    /// Any other payload. Carried for logging, otherwise ignored.
    Unrecognized(String),
}

impl InboundCommand {
    /// Decode a raw payload. Matching is exact.
    ///
    /// # Examples
    ///
    /// ```
    /// use smart_vent::InboundCommand;
    ///
    /// assert_eq!(InboundCommand::decode(b"fan_on"), InboundCommand::FanOn);
    /// assert_eq!(
    ///     InboundCommand::decode(b"FAN_ON"),
    ///     InboundCommand::Unrecognized("FAN_ON".into())
    /// );
    /// ```
    pub fn decode(payload: &[u8]) -> Self {
        match payload {
            b"mode_auto" => InboundCommand::ModeAuto,
            b"mode_manual" => InboundCommand::ModeManual,
            b"fan_on" => InboundCommand::FanOn,
            b"fan_off" => InboundCommand::FanOff,
            other => InboundCommand::Unrecognized(String::from_utf8_lossy(other).into_owned()),
        }
    }

    /// Wire token for this command, `None` for unrecognized payloads.
    pub const fn as_token(&self) -> Option<&'static str> {
        match self {
            InboundCommand::ModeAuto => Some("mode_auto"),
            InboundCommand::ModeManual => Some("mode_manual"),
            InboundCommand::FanOn => Some("fan_on"),
            InboundCommand::FanOff => Some("fan_off"),
            InboundCommand::Unrecognized(_) => None,
        }
    }
}

impl From<&str> for InboundCommand {
    fn from(payload: &str) -> Self {
        Self::decode(payload.as_bytes())
    }
}

/// Command typed by the local operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Store this reading.
    SetReading(i64),
    /// `true` = operator owns the reading.
    ManualSensor(bool),
    /// `true` = operator owns the fan.
    ManualFan(bool),
    /// Flip the fan.
    ToggleFan,
    /// Hysteresis target.
    SetTarget(i64),
    /// Hysteresis band.
    SetBand(i64),
    /// Telemetry interval in seconds.
    SetInterval(u64),
    /// Bring the messaging link up or down.
    Messaging(bool),
    /// Report the current state.
    Status,
}

impl OperatorCommand {
    /// Parse one console line. Trimmed and case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use smart_vent::OperatorCommand;
    ///
    /// assert_eq!(OperatorCommand::from_text("target 900"), Some(OperatorCommand::SetTarget(900)));
    /// assert_eq!(OperatorCommand::from_text("  FAN manual "), Some(OperatorCommand::ManualFan(true)));
    /// assert_eq!(OperatorCommand::from_text("interval soon"), None);
    /// ```
    pub fn from_text(line: &str) -> Option<Self> {
        let line = line.trim().to_ascii_lowercase();
        let mut words = line.split_whitespace();
        let verb = words.next()?;
        let arg = words.next();
        if words.next().is_some() {
            return None;
        }

        match (verb, arg) {
            ("reading", Some(v)) => v.parse().ok().map(OperatorCommand::SetReading),
            ("sensor", Some(mode)) => parse_mode(mode).map(OperatorCommand::ManualSensor),
            ("fan", Some(mode)) => parse_mode(mode).map(OperatorCommand::ManualFan),
            ("toggle", None) => Some(OperatorCommand::ToggleFan),
            ("target", Some(v)) => v.parse().ok().map(OperatorCommand::SetTarget),
            ("band", Some(v)) => v.parse().ok().map(OperatorCommand::SetBand),
            ("interval", Some(v)) => v.parse().ok().map(OperatorCommand::SetInterval),
            ("mqtt", Some("on")) => Some(OperatorCommand::Messaging(true)),
            ("mqtt", Some("off")) => Some(OperatorCommand::Messaging(false)),
            ("status", None) => Some(OperatorCommand::Status),
            _ => None,
        }
    }
}

fn parse_mode(mode: &str) -> Option<bool> {
    match mode {
        "manual" => Some(true),
        "auto" => Some(false),
        _ => None,
    }
}
