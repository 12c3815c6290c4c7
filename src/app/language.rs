use crate::app::models::{Direction, LanguageSource, ResolvedLanguage, RuntimeConfig};

/// Fewer alphanumeric characters than this and the detector is not consulted.
pub const MIN_DETECTION_CHARS: usize = 10;

/// Sentinel some detectors use for "undetermined".
const UNDETERMINED: &str = "und";

/// ISO 639-3 codes written right-to-left.
const RTL_CODES: &[&str] = &[
    "ara", "arb", // Arabic
    "pes", "fas", "prs", // Persian
    "heb", // Hebrew
    "urd", // Urdu
    "yid", // Yiddish
    "pus", "pbu", // Pashto
    "snd", // Sindhi
    "uig", // Uyghur
    "ckb", // Kurdish (Sorani)
];

/// Statistical language detector returning an ISO 639-3 code.
pub trait LanguageDetector {
    /// `None` means undetermined.
    fn detect(&self, text: &str) -> Option<String>;
}

/// Detector backed by the `whatlang` trigram model. Low-confidence guesses count as undetermined.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        whatlang::detect(text)
            .filter(|info| info.is_reliable())
            .map(|info| info.lang().code().to_string())
    }
}

pub fn resolve<D: LanguageDetector + ?Sized>(
    content: &str,
    config: &RuntimeConfig,
    detector: &D,
) -> ResolvedLanguage {
    let defaulted = || ResolvedLanguage {
        tag: config.default_language_tag.clone(),
        direction: config.default_direction,
        source: LanguageSource::Defaulted,
    };

    if meaningful_chars(content) < MIN_DETECTION_CHARS {
        return defaulted();
    }

    let code = match detector.detect(content) {
        Some(code) if !code.trim().is_empty() && code != UNDETERMINED => code,
        _ => return defaulted(),
    };

    let tag = display_tag(&code).map_or_else(|| code.clone(), str::to_string);
    ResolvedLanguage {
        tag,
        direction: direction_for(&code),
        source: LanguageSource::Detected,
    }
}

fn meaningful_chars(content: &str) -> usize {
    content.chars().filter(|c| c.is_alphanumeric()).count()
}

pub fn direction_for(code: &str) -> Direction {
    if RTL_CODES.contains(&code) {
        Direction::Rtl
    } else {
        Direction::Ltr
    }
}

/// Two-letter tag for a three-letter code, when one is known.
pub fn display_tag(code: &str) -> Option<&'static str> {
    let tag = match code {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" | "arb" => "ar",
        "aze" | "azj" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" | "zho" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" | "ekk" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" | "lvs" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" | "npi" => "ne",
        "nld" => "nl",
        "nob" | "nor" => "no",
        "ori" | "ory" => "or",
        "pan" => "pa",
        "pes" | "fas" | "prs" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "pus" | "pbu" => "ps",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "snd" => "sd",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "uig" => "ug",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" | "uzn" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        _ => return None,
    };
    Some(tag)
}
