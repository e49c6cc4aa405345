use serde::{Deserialize, Serialize};

/// Color variant of a stock item with its live quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shade {
    /// Shade identifier.
    pub id: String,
    /// Stored color value, usually a hex code such as `#ff0000`.
    pub color: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Live quantity on hand.
    pub quantity: i64,
}

impl Shade {
    /// Creates a shade without a display name.
    #[must_use]
    pub fn new(id: impl Into<String>, color: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: id.into(),
            color: color.into(),
            name: None,
            quantity,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns whether a parsed color key refers to this shade.
    ///
    /// Keys match the stored color or the display name, trimmed and compared
    /// ASCII case-insensitively.
    #[must_use]
    pub fn matches_color_key(&self, color_key: &str) -> bool {
        let color_key = color_key.trim();
        if color_key.is_empty() {
            return false;
        }

        self.color.trim().eq_ignore_ascii_case(color_key)
            || self
                .name
                .as_deref()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case(color_key))
    }
}

/// Returns the first shade matching `color_key`.
#[must_use]
pub fn find_shade<'a>(shades: &'a [Shade], color_key: &str) -> Option<(usize, &'a Shade)> {
    shades
        .iter()
        .enumerate()
        .find(|(_, shade)| shade.matches_color_key(color_key))
}
