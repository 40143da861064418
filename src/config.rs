// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::exception::Exception;

/// 默认的配置文件位置
pub const DEFAULT_CONFIG_FILE: &str = "config/development.toml";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_wiki_root")]
    wiki_root: PathBuf,
    #[serde(default = "default_resources_root")]
    resources_root: PathBuf,
    #[serde(default = "default_cache_file")]
    cache_file: PathBuf,
    #[serde(default = "default_interface")]
    interface: String,
    #[serde(default = "default_port")]
    port: u32,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_preload")]
    preload: bool,
    #[serde(default = "default_converter_timeout_secs")]
    converter_timeout_secs: u64,
    #[serde(default)]
    discard_incompatible_cache: bool,
    #[serde(default = "default_title")]
    title: String,
}

fn default_wiki_root() -> PathBuf {
    PathBuf::from("wiki")
}

fn default_resources_root() -> PathBuf {
    PathBuf::from("resources")
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("cache.json")
}

fn default_interface() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u32 {
    80
}

fn default_preload() -> bool {
    true
}

fn default_converter_timeout_secs() -> u64 {
    60
}

fn default_title() -> String {
    "Simple Wiki".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wiki_root: default_wiki_root(),
            resources_root: default_resources_root(),
            cache_file: default_cache_file(),
            interface: default_interface(),
            port: default_port(),
            worker_threads: num_cpus::get(),
            preload: default_preload(),
            converter_timeout_secs: default_converter_timeout_secs(),
            discard_incompatible_cache: false,
            title: default_title(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(filename: &Path) -> Result<Self, Exception> {
        Self::load(filename, None, None)
    }

    /// 读取配置文件，用命令行给出的监听地址与端口覆盖其中的值，再统一校验。
    pub fn load(
        filename: &Path,
        interface: Option<&str>,
        port: Option<u32>,
    ) -> Result<Self, Exception> {
        let raw = fs::read_to_string(filename).map_err(|e| {
            Exception::Config(format!("无法读取配置文件{}：{}", filename.display(), e))
        })?;
        let mut config = Self::parse(&raw)?;
        config.override_listen(interface, port);
        let config = config.validate()?;
        info!("配置文件{}已载入", filename.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, Exception> {
        Self::parse(raw)?.validate()
    }

    fn parse(raw: &str) -> Result<Self, Exception> {
        toml::from_str(raw).map_err(|e| Exception::Config(e.to_string()))
    }

    fn override_listen(&mut self, interface: Option<&str>, port: Option<u32>) {
        if let Some(interface) = interface {
            self.interface = interface.to_string();
        }
        if let Some(port) = port {
            self.port = port;
        }
    }

    fn validate(mut self) -> Result<Self, Exception> {
        if self.port == 0 || self.port > u32::from(u16::MAX) {
            return Err(Exception::Config(format!(
                "端口{}不在1到65535之间",
                self.port
            )));
        }
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.converter_timeout_secs == 0 {
            warn!("converter_timeout_secs被设置为0，外部转换器将立即超时");
        }
        Ok(self)
    }
}

impl Config {
    pub fn wiki_root(&self) -> &Path {
        &self.wiki_root
    }

    pub fn resources_root(&self) -> &Path {
        &self.resources_root
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 已校验在 1..=65535 之间
    pub fn port(&self) -> u16 {
        u16::try_from(self.port).unwrap_or(u16::MAX)
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn preload(&self) -> bool {
        self.preload
    }

    pub fn converter_timeout_secs(&self) -> u64 {
        self.converter_timeout_secs
    }

    pub fn discard_incompatible_cache(&self) -> bool {
        self.discard_incompatible_cache
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn with_roots(mut self, wiki_root: &Path, resources_root: &Path, cache_file: &Path) -> Self {
        self.wiki_root = wiki_root.to_path_buf();
        self.resources_root = resources_root.to_path_buf();
        self.cache_file = cache_file.to_path_buf();
        self
    }
}
