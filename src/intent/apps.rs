//! Known apps: spoken aliases and the domain each one opens

/// An app or site with a fixed alias set and domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum App {
    YouTube,
    Netflix,
    Spotify,
    Google,
    Gmail,
    Facebook,
    Instagram,
    Twitter,
    TikTok,
    Amazon,
}

impl App {
    /// Every known app, in lookup order
    pub const ALL: [Self; 10] = [
        Self::YouTube,
        Self::Netflix,
        Self::Spotify,
        Self::Google,
        Self::Gmail,
        Self::Facebook,
        Self::Instagram,
        Self::Twitter,
        Self::TikTok,
        Self::Amazon,
    ];

    /// Normalised lowercase name used as an intent `target`
    #[must_use]
    pub const fn canonical(self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Netflix => "netflix",
            Self::Spotify => "spotify",
            Self::Google => "google",
            Self::Gmail => "gmail",
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Twitter => "twitter",
            Self::TikTok => "tiktok",
            Self::Amazon => "amazon",
        }
    }

    /// Spoken or transcribed variants that refer to this app
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::YouTube => &["you tube", "you.tube"],
            Self::Gmail => &["google mail"],
            Self::Facebook => &["fb"],
            Self::Instagram => &["insta"],
            Self::Twitter => &["x.com", "tweet"],
            Self::TikTok => &["tik tok", "tik-tok"],
            Self::Netflix | Self::Spotify | Self::Google | Self::Amazon => &[],
        }
    }

    /// Domain opened for this app
    #[must_use]
    pub const fn domain(self) -> &'static str {
        match self {
            Self::YouTube => "youtube.com",
            Self::Netflix => "netflix.com",
            Self::Spotify => "open.spotify.com",
            Self::Google => "google.com",
            Self::Gmail => "mail.google.com",
            Self::Facebook => "facebook.com",
            Self::Instagram => "instagram.com",
            Self::Twitter => "twitter.com",
            Self::TikTok => "tiktok.com",
            Self::Amazon => "amazon.com",
        }
    }

    /// Look up an app by canonical name or alias, ignoring case and padding
    #[must_use]
    pub fn lookup(phrase: &str) -> Option<Self> {
        let phrase = phrase.trim().to_lowercase();
        Self::ALL.into_iter().find(|app| {
            app.canonical() == phrase || app.aliases().iter().any(|alias| *alias == phrase)
        })
    }
}
