use crate::error::{DocDupeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 置換中にファイル単位のエラーが起きたときの方針
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// 最初のエラーで残りをすべて中止する
    #[default]
    Abort,
    /// エラーのファイルを飛ばして続行し、最後にまとめて報告する
    Continue,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" | "stop" => Ok(FailurePolicy::Abort),
            "continue" | "skip" => Ok(FailurePolicy::Continue),
            _ => Err(format!("Unknown policy: {}. Use abort or continue", s)),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

/// WordprocessingML の w:highlight で使える色名
pub const WORD_HIGHLIGHT_COLORS: &[&str] = &[
    "black", "blue", "cyan", "green", "magenta", "red", "yellow", "white",
    "darkBlue", "darkCyan", "darkGreen", "darkMagenta", "darkRed", "darkYellow",
    "darkGray", "lightGray",
];

/// 変更セルに付けるハイライト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    /// Excel塗りつぶし色（ARGB）
    pub sheet_argb: String,
    /// Word蛍光ペン色名
    pub word_color: String,
}

impl Default for Highlight {
    fn default() -> Self {
        Self {
            sheet_argb: "FFFFFF00".into(),
            word_color: "yellow".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub replace_policy: FailurePolicy,
    pub sheet_highlight_argb: String,
    pub word_highlight: String,
    /// フォルダ指定時にサブフォルダも含める
    pub recursive: bool,
}

impl Default for Config {
    fn default() -> Self {
        let highlight = Highlight::default();
        Self {
            replace_policy: FailurePolicy::Abort,
            sheet_highlight_argb: highlight.sheet_argb,
            word_highlight: highlight.word_color,
            recursive: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| DocDupeError::Config("設定ディレクトリが見つかりません".into()))?;
        Ok(base.join("docdupe").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        let argb = &self.sheet_highlight_argb;
        if argb.len() != 8 || !argb.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DocDupeError::Config(format!(
                "塗りつぶし色はARGB 8桁の16進数で指定してください: {}",
                argb
            )));
        }
        if !WORD_HIGHLIGHT_COLORS.contains(&self.word_highlight.as_str()) {
            return Err(DocDupeError::Config(format!(
                "Wordのハイライト色が不正です: {}（{}）",
                self.word_highlight,
                WORD_HIGHLIGHT_COLORS.join("/")
            )));
        }
        Ok(())
    }

    pub fn highlight(&self) -> Highlight {
        Highlight {
            sheet_argb: self.sheet_highlight_argb.to_ascii_uppercase(),
            word_color: self.word_highlight.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.replace_policy, FailurePolicy::Abort);
        assert_eq!(config.highlight(), Highlight::default());
    }

    #[test]
    fn test_invalid_argb_rejected() {
        let config = Config {
            sheet_highlight_argb: "FFFF00".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DocDupeError::Config(_))));

        let config = Config {
            sheet_highlight_argb: "FFFFZZ00".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_word_color_rejected() {
        let config = Config {
            word_highlight: "orange".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"replace_policy":"continue"}"#).unwrap();
        assert_eq!(config.replace_policy, FailurePolicy::Continue);
        assert_eq!(config.word_highlight, "yellow");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Abort".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert_eq!("continue".parse::<FailurePolicy>().unwrap(), FailurePolicy::Continue);
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
