use serde::{Deserialize, Serialize};

pub const THEME_PRESET_LIST: &[&str] = &["minimal", "literary", "vintage", "night"];

/// Named theme presets. The id is what lives in the config file; everything
/// the render layer needs comes from the resolved [`Palette`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    Minimal,
    Literary,
    Vintage,
    Night,
}

impl Default for ThemeId {
    fn default() -> Self {
        ThemeId::Minimal
    }
}

/// Fixed set of named colors (256-color terminal indices) handed to the
/// windows by dependency injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: u8,
    pub secondary: u8,
    pub accent: u8,
    pub text_secondary: u8,
    pub border: u8,
    pub success: u8,
    pub warning: u8,
    pub info: u8,
}

impl ThemeId {
    pub fn name(self) -> &'static str {
        match self {
            ThemeId::Minimal => "Minimal Zen",
            ThemeId::Literary => "Deep Literary",
            ThemeId::Vintage => "Vintage Library",
            ThemeId::Night => "Night Reader",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ThemeId::Minimal => Palette {
                primary: 109,
                secondary: 73,
                accent: 180,
                text_secondary: 245,
                border: 250,
                success: 71,
                warning: 178,
                info: 74,
            },
            ThemeId::Literary => Palette {
                primary: 61,
                secondary: 97,
                accent: 173,
                text_secondary: 246,
                border: 240,
                success: 65,
                warning: 172,
                info: 67,
            },
            ThemeId::Vintage => Palette {
                primary: 130,
                secondary: 94,
                accent: 136,
                text_secondary: 244,
                border: 137,
                success: 64,
                warning: 166,
                info: 66,
            },
            ThemeId::Night => Palette {
                primary: 111,
                secondary: 146,
                accent: 216,
                text_secondary: 243,
                border: 238,
                success: 108,
                warning: 179,
                info: 110,
            },
        }
    }
}

/// All user-tunable options, in one flat struct with serde defaults so a
/// partial config file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the ReadTracker REST backend.
    pub api_endpoint: String,
    /// Base URL of the BookBot assistant service.
    pub chatbot_endpoint: String,
    /// Volumes endpoint of the book metadata lookup service.
    pub metadata_endpoint: String,
    pub request_timeout_secs: u64,
    /// Use the incremental chat stream instead of one-shot replies.
    pub use_streaming_chat: bool,
    pub theme: ThemeId,
    /// Pages added by the quick "update progress" action.
    pub page_step: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: "http://localhost:3000".to_string(),
            chatbot_endpoint: "http://localhost:8000".to_string(),
            metadata_endpoint: "https://www.googleapis.com/books/v1/volumes".to_string(),
            request_timeout_secs: 10,
            use_streaming_chat: false,
            theme: ThemeId::default(),
            page_step: 10,
        }
    }
}

impl Settings {
    pub fn merge(&mut self, other: Self) {
        self.api_endpoint = other.api_endpoint;
        self.chatbot_endpoint = other.chatbot_endpoint;
        self.metadata_endpoint = other.metadata_endpoint;
        self.request_timeout_secs = other.request_timeout_secs;
        self.use_streaming_chat = other.use_streaming_chat;
        self.theme = other.theme;
        self.page_step = other.page_step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let settings = Settings::default();
        assert_eq!(settings.api_endpoint, "http://localhost:3000");
        assert!(!settings.use_streaming_chat);
        assert_eq!(settings.page_step, 10);
        assert_eq!(settings.theme, ThemeId::Minimal);
    }

    #[test]
    fn theme_id_round_trips_through_config_form() {
        for (id, text) in [
            (ThemeId::Minimal, "\"minimal\""),
            (ThemeId::Literary, "\"literary\""),
            (ThemeId::Vintage, "\"vintage\""),
            (ThemeId::Night, "\"night\""),
        ] {
            assert_eq!(serde_json::to_string(&id).unwrap(), text);
            assert_eq!(serde_json::from_str::<ThemeId>(text).unwrap(), id);
        }
    }

    #[test]
    fn every_preset_resolves_to_a_palette() {
        for id in [
            ThemeId::Minimal,
            ThemeId::Literary,
            ThemeId::Vintage,
            ThemeId::Night,
        ] {
            let palette = id.palette();
            assert_ne!(palette.primary, palette.border);
            assert!(!id.name().is_empty());
        }
        assert_eq!(THEME_PRESET_LIST.len(), 4);
    }

    #[test]
    fn partial_config_only_overrides_named_fields() {
        let parsed: Settings =
            serde_json::from_str(r#"{ "use_streaming_chat": true }"#).unwrap();
        assert!(parsed.use_streaming_chat);
        assert_eq!(parsed.api_endpoint, Settings::default().api_endpoint);
    }

    #[test]
    fn merge_takes_the_other_side() {
        let mut settings = Settings::default();
        let other = Settings {
            api_endpoint: "http://reader.example:9000".to_string(),
            use_streaming_chat: true,
            ..Settings::default()
        };
        settings.merge(other.clone());
        assert_eq!(settings, other);
    }
}
