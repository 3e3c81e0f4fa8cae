use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::diff::Granularity;
use crate::docs::types::Rgb;
use crate::extract::color::{ColorClassifier, ColorSpec};
use crate::extract::sections::DEFAULT_HEADING_STYLE;
use crate::score::{ScoringConfig, ScoringStrategy};

const DEFAULT_POLL_SECS: u64 = 10;
const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
const DEFAULT_TOKEN_FILE: &str = "token.json";

/// What a poll compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Per-topic answers, compared character by character.
    Topics,
    /// The whole document as flat text, compared line by line.
    Document,
}

impl WatchMode {
    pub fn default_granularity(self) -> Granularity {
        match self {
            WatchMode::Topics => Granularity::Char,
            WatchMode::Document => Granularity::Line,
        }
    }
}

impl FromStr for WatchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "topics" | "topic" => Ok(WatchMode::Topics),
            "document" | "doc" => Ok(WatchMode::Document),
            other => bail!("unknown watch mode '{}' (expected topics or document)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub document_id: String,
    pub token_file: PathBuf,
    pub classifier: ColorClassifier,
    pub heading_style: String,
    pub task_description: String,
    pub scoring: ScoringConfig,
    pub mode: WatchMode,
    pub granularity: Granularity,
    pub poll_interval: Duration,
    pub print_json: bool,
}

impl WatchConfig {
    /// Read and validate everything from the environment (and `.env`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |name: &str| get(name).ok_or_else(|| anyhow!("{} is not set", name));

        let document_id = require("GOOGLE_DOCUMENT_ID")?;
        let task_description = require("TASK_DESCRIPTION")?;

        let shared_tolerance = parse_opt::<f32>(&get, "COLOR_TOLERANCE")?;
        let topic = color_spec(&get, "TOPIC_COLOR", shared_tolerance)?;
        let description = color_spec(&get, "DESCRIPTION_COLOR", shared_tolerance)?;
        let answer = color_spec(&get, "ANSWER_COLOR", shared_tolerance)?;

        let strategy = parse_opt::<ScoringStrategy>(&get, "SCORING_STRATEGY")?
            .unwrap_or(ScoringStrategy::Lexical);
        let scoring = ScoringConfig {
            strategy,
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_cache_dir: get("EMBEDDING_CACHE_DIR").map(PathBuf::from),
            lexical_preprocess: parse_opt::<bool>(&get, "LEXICAL_PREPROCESS")?.unwrap_or(true),
        };

        let mode = parse_opt::<WatchMode>(&get, "WATCH_MODE")?.unwrap_or(WatchMode::Topics);
        let granularity = parse_opt::<Granularity>(&get, "DIFF_GRANULARITY")?
            .unwrap_or_else(|| mode.default_granularity());

        let poll_secs = parse_opt::<u64>(&get, "POLL_INTERVAL_SECS")?.unwrap_or(DEFAULT_POLL_SECS);
        if poll_secs == 0 {
            bail!("POLL_INTERVAL_SECS must be at least 1");
        }

        Ok(Self {
            document_id,
            token_file: get("GOOGLE_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE)),
            classifier: ColorClassifier::new(topic, description, answer),
            heading_style: get("TOPIC_HEADING_STYLE")
                .unwrap_or_else(|| DEFAULT_HEADING_STYLE.to_string()),
            task_description,
            scoring,
            mode,
            granularity,
            poll_interval: Duration::from_secs(poll_secs),
            print_json: parse_opt::<bool>(&get, "REPORT_JSON")?.unwrap_or(false),
        })
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| anyhow!("{} has invalid value '{}': {}", name, raw, e))
        })
        .transpose()
}

/// `<PREFIX>_RED`, `<PREFIX>_GREEN`, `<PREFIX>_BLUE` and an optional
/// `<PREFIX>_TOLERANCE` overriding the shared one.
fn color_spec(
    get: &impl Fn(&str) -> Option<String>,
    prefix: &str,
    shared_tolerance: Option<f32>,
) -> Result<ColorSpec> {
    let channel = |suffix: &str| -> Result<f32> {
        let name = format!("{}_{}", prefix, suffix);
        parse_opt::<f32>(get, &name)?.ok_or_else(|| anyhow!("{} is not set", name))
    };
    let rgb = Rgb::new(channel("RED")?, channel("GREEN")?, channel("BLUE")?);
    let tolerance = parse_opt::<f32>(get, &format!("{}_TOLERANCE", prefix))?.or(shared_tolerance);
    ColorSpec::new(rgb, tolerance).with_context(|| format!("{} is invalid", prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::extract::color::Role;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GOOGLE_DOCUMENT_ID", "doc-1"),
            ("TASK_DESCRIPTION", "Create a fire prevention plan"),
            ("TOPIC_COLOR_RED", "1"),
            ("TOPIC_COLOR_GREEN", "0.9490196"),
            ("TOPIC_COLOR_BLUE", "0.8"),
            ("DESCRIPTION_COLOR_RED", "0.7882353"),
            ("DESCRIPTION_COLOR_GREEN", "0.85490197"),
            ("DESCRIPTION_COLOR_BLUE", "0.972549"),
            ("ANSWER_COLOR_RED", "0.8509804"),
            ("ANSWER_COLOR_GREEN", "0.91764706"),
            ("ANSWER_COLOR_BLUE", "0.827451"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<WatchConfig> {
        WatchConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.document_id, "doc-1");
        assert_eq!(config.mode, WatchMode::Topics);
        assert_eq!(config.granularity, Granularity::Char);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.heading_style, "HEADING_3");
        assert_eq!(config.scoring.strategy, ScoringStrategy::Lexical);
        assert!(config.scoring.lexical_preprocess);
        assert_eq!(config.token_file, PathBuf::from("token.json"));
        assert!(!config.print_json);
        assert_eq!(
            config.classifier.classify(Some(Rgb::new(1.0, 0.9490196, 0.8))),
            Some(Role::Topic)
        );
    }

    #[test]
    fn test_missing_task_description_is_named() {
        let mut env = base_env();
        env.remove("TASK_DESCRIPTION");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("TASK_DESCRIPTION"), "{}", err);
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("GOOGLE_DOCUMENT_ID", "   ");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_DOCUMENT_ID"));
    }

    #[test]
    fn test_missing_color_channel_is_named() {
        let mut env = base_env();
        env.remove("ANSWER_COLOR_GREEN");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("ANSWER_COLOR_GREEN"), "{}", err);
    }

    #[test]
    fn test_unparseable_color_is_named() {
        let mut env = base_env();
        env.insert("TOPIC_COLOR_RED", "yellow");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("TOPIC_COLOR_RED"), "{}", err);
    }

    #[test]
    fn test_out_of_range_color_rejected() {
        let mut env = base_env();
        env.insert("TOPIC_COLOR_RED", "255");
        let err = load(&env).unwrap_err();
        assert!(format!("{:#}", err).contains("TOPIC_COLOR"), "{:#}", err);
    }

    #[test]
    fn test_tolerance_override() {
        let mut env = base_env();
        env.insert("COLOR_TOLERANCE", "0.01");
        env.insert("ANSWER_COLOR_TOLERANCE", "0.05");
        let config = load(&env).unwrap();
        let near_answer = Rgb::new(0.8509804 + 0.03, 0.91764706, 0.827451);
        assert_eq!(config.classifier.classify(Some(near_answer)), Some(Role::Answer));
        let near_topic = Rgb::new(1.0, 0.9490196 + 0.03, 0.8);
        assert_eq!(config.classifier.classify(Some(near_topic)), None);
    }

    #[test]
    fn test_document_mode_and_overrides() {
        let mut env = base_env();
        env.insert("WATCH_MODE", "document");
        env.insert("POLL_INTERVAL_SECS", "30");
        env.insert("SCORING_STRATEGY", "embedding");
        env.insert("REPORT_JSON", "true");
        let config = load(&env).unwrap();
        assert_eq!(config.mode, WatchMode::Document);
        assert_eq!(config.granularity, Granularity::Line);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.scoring.strategy, ScoringStrategy::Embedding);
        assert!(config.print_json);

        env.insert("DIFF_GRANULARITY", "char");
        assert_eq!(load(&env).unwrap().granularity, Granularity::Char);
    }

    #[test]
    fn test_invalid_enums_rejected() {
        for (key, value) in [
            ("WATCH_MODE", "both"),
            ("SCORING_STRATEGY", "bm25"),
            ("DIFF_GRANULARITY", "word"),
            ("POLL_INTERVAL_SECS", "0"),
            ("LEXICAL_PREPROCESS", "maybe"),
        ] {
            let mut env = base_env();
            env.insert(key, value);
            assert!(load(&env).is_err(), "{}={} accepted", key, value);
        }
    }
}
