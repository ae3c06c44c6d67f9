//! Glyphs shown next to a requested weather attribute.

const CONDITION_EMOJIS: &[(&str, &str)] = &[
    ("clear", "☀️"),
    ("rain", "🌧️"),
    ("thunderstorm", "⛈️"),
    ("drizzle", "🌦️"),
    ("snow", "❄️"),
    ("mist", "🌫️"),
    ("smoke", "💨"),
    ("haze", "🌁"),
    ("dust", "🌪️"),
    ("fog", "🌫️"),
    ("sand", "🏜️"),
    ("ash", "🌋"),
    ("squall", "🌬️"),
    ("tornado", "🌪️"),
    ("clouds", "☁️"),
    ("sun", "☀️"),
    ("cloud", "☁️"),
    ("chilly", "🥶"),
    ("freezy", "❄️"),
    ("ice", "❄️"),
    ("cold", "❄️"),
    ("hot", "🔥"),
    ("warm", "🌤️"),
    ("temperature", "🌡️"),
    ("calm", "🌬️"),
    ("breeze", "🌫️"),
    ("windy", "💨"),
    ("strong_wind", "🌪️"),
    ("stormy", "🌬️🌪️"),
];

/// Looks up the glyph for a keyword, ignoring case and surrounding whitespace.
pub fn condition_emoji(keyword: &str) -> Option<&'static str> {
    let key = keyword.trim().to_lowercase();
    CONDITION_EMOJIS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, glyph)| *glyph)
}
