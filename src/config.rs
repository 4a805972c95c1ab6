//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::replace::SortMode;
use crate::text::ChineseConverter;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration / 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Chapter cache configuration / 章节缓存配置
    #[serde(default)]
    pub cache: CacheConfig,
    /// Content search configuration / 正文搜索配置
    #[serde(default)]
    pub search: SearchConfig,
    /// Replace rule configuration / 替换规则配置
    #[serde(default)]
    pub replace: ReplaceConfig,
    /// Rule import sources / 规则导入来源
    #[serde(default)]
    pub import: ImportConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Main database file path (relative to data_dir) / 主数据库文件路径
    pub db_file: String,
}

/// Chapter cache configuration / 章节缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Book cache directory (relative to data_dir) / 书籍缓存目录
    pub book_cache_dir: String,
}

/// Content search configuration / 正文搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum interval between intermediate result batches / 中间结果推送间隔
    pub emit_interval_ms: u64,
    /// 0 = none, 1 = traditional to simplified, 2 = simplified to traditional / 简繁转换
    pub chinese_converter: u8,
}

/// Replace rule configuration / 替换规则配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceConfig {
    /// Default list sort mode: asc, desc, name_asc, name_desc / 默认排序方式
    pub sort_mode: String,
}

/// Rule import configuration / 规则导入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Directory import files are read from (relative to data_dir) / 导入文件目录
    pub dir: String,
    /// Allow importing from http(s) URLs / 允许从网络地址导入
    pub allow_remote_url: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            dir: "imports".to_string(),
            allow_remote_url: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1122,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "yuedu.db".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            book_cache_dir: "book_cache".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            emit_interval_ms: 350,
            chinese_converter: 0,
        }
    }
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            sort_mode: "desc".to_string(),
        }
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the chapter cache root / 获取章节缓存根目录
    pub fn get_book_cache_dir(&self) -> PathBuf {
        let data_dir = self.get_data_dir();
        if self.cache.book_cache_dir.is_empty() {
            data_dir
        } else {
            data_dir.join(&self.cache.book_cache_dir)
        }
    }

    /// Get the rule import directory / 获取规则导入目录
    pub fn get_import_dir(&self) -> PathBuf {
        self.get_data_dir().join(&self.import.dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.search.emit_interval_ms)
    }

    pub fn chinese_converter(&self) -> ChineseConverter {
        ChineseConverter::from(self.search.chinese_converter)
    }

    pub fn default_sort_mode(&self) -> SortMode {
        SortMode::from(self.replace.sort_mode.as_str())
    }
}

/// Get the config file path / 获取配置文件路径
pub fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(config_path: &Path) -> Result<AppConfig, String> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config(config_path, &config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config_path: &Path, config: &AppConfig) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}
