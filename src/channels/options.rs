//! Channel options as received from the host, and their validated form.
//!
//! Options arrive as a loosely-typed JSON object. They are decoded once
//! into [`ChannelOptions`], where every attribute is optional, and then
//! validated in a single pass into a [`Channel`] with defaults applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

/// Sound name that selects the platform's default notification sound.
pub const DEFAULT_SOUND: &str = "default";

/// URI of the platform default notification sound.
pub const DEFAULT_SOUND_URI: &str = "content://settings/system/notification_sound";

/// How prominently notifications on a channel are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// Never shown.
    None = 0,
    /// Shown in the shade only, below the fold.
    Min = 1,
    /// Shown everywhere, no sound.
    Low = 2,
    /// Shown everywhere, makes noise.
    Default = 3,
    /// Makes noise and peeks on screen.
    High = 4,
}

impl Importance {
    /// Lowest tier that is visible to the user at all.
    pub const MIN_VISIBLE: Importance = Importance::Min;

    /// Whether notifications at this importance are visible.
    pub fn is_visible(self) -> bool {
        self >= Self::MIN_VISIBLE
    }
}

impl TryFrom<i64> for Importance {
    type Error = BridgeError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::None),
            1 => Ok(Self::Min),
            2 => Ok(Self::Low),
            3 => Ok(Self::Default),
            4 => Ok(Self::High),
            other => Err(BridgeError::invalid_argument(format!(
                "importance must be between 0 and 4, got {other}"
            ))),
        }
    }
}

/// What a channel's notifications reveal on the lock screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Nothing shown on the lock screen.
    Secret = -1,
    /// Shown with sensitive content hidden.
    Private = 0,
    /// Shown in full.
    Public = 1,
}

impl TryFrom<i64> for Visibility {
    type Error = BridgeError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        match level {
            -1 => Ok(Self::Secret),
            0 => Ok(Self::Private),
            1 => Ok(Self::Public),
            other => Err(BridgeError::invalid_argument(format!(
                "visibility must be -1, 0 or 1, got {other}"
            ))),
        }
    }
}

/// A channel's sound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum ChannelSound {
    /// The platform's default notification sound.
    PlatformDefault,
    /// A sound resource bundled with the application.
    Bundled(String),
}

impl ChannelSound {
    fn resolve(sound: Option<&str>) -> Self {
        match sound {
            None | Some(DEFAULT_SOUND) => Self::PlatformDefault,
            Some(name) => Self::Bundled(name.to_string()),
        }
    }

    /// The sound resource URI for an application package.
    pub fn uri(&self, package_name: &str) -> String {
        match self {
            Self::PlatformDefault => DEFAULT_SOUND_URI.to_string(),
            Self::Bundled(name) => format!("android.resource://{package_name}/raw/{name}"),
        }
    }
}

/// Vibration setting: a plain switch or a pattern of millisecond durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Vibration {
    /// Enable or disable the default vibration.
    Enabled(bool),
    /// Vibrate with this on/off pattern (implies enabled).
    Pattern(Vec<u64>),
}

/// Channel attributes as supplied by the host. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOptions {
    /// Stable channel id. Required.
    pub id: Option<String>,
    /// User-visible name. Required.
    pub name: Option<String>,
    /// User-visible description.
    pub description: Option<String>,
    /// `"default"` or the name of a bundled sound resource.
    pub sound: Option<String>,
    /// Importance level 0-4.
    pub importance: Option<i64>,
    /// Lock-screen visibility -1, 0 or 1.
    pub visibility: Option<i64>,
    /// Vibration switch or pattern.
    pub vibration: Option<Vibration>,
    /// Notification light switch.
    pub light: Option<bool>,
    /// Light colour: `#RRGGBB`, `#AARRGGBB` or a colour name.
    pub light_color: Option<String>,
    /// Launcher badge switch.
    pub badge: Option<bool>,
}

impl ChannelOptions {
    /// Options with just the two required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Decode options from a host JSON object.
    pub fn from_json(value: Value) -> Result<Self, BridgeError> {
        serde_json::from_value(value)
            .map_err(|e| BridgeError::invalid_argument(format!("invalid channel options: {e}")))
    }

    /// Validate and apply defaults.
    pub fn validate(&self) -> Result<Channel, BridgeError> {
        let id = required(self.id.as_deref(), "id")?;
        let name = required(self.name.as_deref(), "name")?;

        let importance = self
            .importance
            .map(Importance::try_from)
            .transpose()?
            .unwrap_or(Importance::Default);
        let visibility = self.visibility.map(Visibility::try_from).transpose()?;
        let light_color = self.light_color.as_deref().map(parse_color).transpose()?;

        let (vibration, vibration_pattern) = match &self.vibration {
            None => (true, None),
            Some(Vibration::Enabled(enabled)) => (*enabled, None),
            Some(Vibration::Pattern(pattern)) => (true, Some(pattern.clone())),
        };

        Ok(Channel {
            id: id.to_string(),
            name: name.to_string(),
            description: self.description.clone(),
            sound: ChannelSound::resolve(self.sound.as_deref()),
            importance,
            visibility,
            vibration,
            vibration_pattern,
            lights: self.light.unwrap_or(true),
            light_color,
            badge: self.badge.unwrap_or(true),
        })
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, BridgeError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BridgeError::invalid_argument(format!(
            "channel {field} is required"
        ))),
    }
}

/// A validated delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Stable id.
    pub id: String,
    /// User-visible name.
    pub name: String,
    /// User-visible description.
    pub description: Option<String>,
    /// Notification sound.
    pub sound: ChannelSound,
    /// Presentation importance.
    pub importance: Importance,
    /// Lock-screen visibility, platform default when `None`.
    pub visibility: Option<Visibility>,
    /// Vibration enabled.
    pub vibration: bool,
    /// Custom vibration pattern in milliseconds.
    pub vibration_pattern: Option<Vec<u64>>,
    /// Notification light enabled.
    pub lights: bool,
    /// Light colour as ARGB.
    pub light_color: Option<u32>,
    /// Launcher badge enabled.
    pub badge: bool,
}

/// The `{id, name}` pair returned by channel listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel id.
    pub id: String,
    /// Channel name.
    pub name: String,
}

impl From<&Channel> for ChannelInfo {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id.clone(),
            name: channel.name.clone(),
        }
    }
}

const NAMED_COLORS: &[(&str, u32)] = &[
    ("black", 0xFF00_0000),
    ("darkgray", 0xFF44_4444),
    ("darkgrey", 0xFF44_4444),
    ("gray", 0xFF88_8888),
    ("grey", 0xFF88_8888),
    ("lightgray", 0xFFCC_CCCC),
    ("lightgrey", 0xFFCC_CCCC),
    ("white", 0xFFFF_FFFF),
    ("red", 0xFFFF_0000),
    ("green", 0xFF00_FF00),
    ("blue", 0xFF00_00FF),
    ("yellow", 0xFFFF_FF00),
    ("cyan", 0xFF00_FFFF),
    ("magenta", 0xFFFF_00FF),
    ("aqua", 0xFF00_FFFF),
    ("fuchsia", 0xFFFF_00FF),
    ("lime", 0xFF00_FF00),
    ("maroon", 0xFF80_0000),
    ("navy", 0xFF00_0080),
    ("olive", 0xFF80_8000),
    ("purple", 0xFF80_0080),
    ("silver", 0xFFC0_C0C0),
    ("teal", 0xFF00_8080),
];

/// Parse `#RRGGBB`, `#AARRGGBB` or a colour name into ARGB.
fn parse_color(color: &str) -> Result<u32, BridgeError> {
    let invalid = || BridgeError::invalid_argument(format!("unknown light color '{color}'"));

    if let Some(hex) = color.strip_prefix('#') {
        // from_str_radix would also take a leading sign.
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let value = u32::from_str_radix(hex, 16).map_err(|e| {
            BridgeError::invalid_argument(format!("invalid light color '{color}': {e}"))
        })?;
        return match hex.len() {
            6 => Ok(0xFF00_0000 | value),
            8 => Ok(value),
            _ => Err(invalid()),
        };
    }

    let lower = color.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, argb)| *argb)
        .ok_or_else(invalid)
}
