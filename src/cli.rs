// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 命令行参数。监听地址与端口覆盖配置文件中的值，未给出时回退到环境变量。

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::Parser;

use crate::config::DEFAULT_CONFIG_FILE;

/// 出现严重错误后，自动重启前的等待时间
pub const RESTART_DELAY: Duration = Duration::from_secs(5);

/// 把目录树中的各种源文件渲染为 HTML 的 wiki 服务器
#[derive(Parser, Debug)]
#[command(name = "wikiserver", version, about)]
pub struct Cli {
    /// 配置文件路径
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// 监听的网卡地址（如 "127.0.0.1" 或 "localhost"），覆盖配置文件
    #[arg(short, long, env = "WIKI_INTERFACE")]
    pub interface: Option<String>,

    /// 监听端口，1 到 65535，覆盖配置文件
    #[arg(short, long, env = "WIKI_PORT")]
    pub port: Option<u32>,

    /// 输出更详细的错误信息，出错时不再自动重启
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// 出现严重错误后自动重启
    #[arg(long, env = "WIKI_RESTART", value_parser = FalseyValueParser::new())]
    pub restart: bool,
}

impl Cli {
    pub fn restart_on_failure(&self) -> bool {
        self.restart && !self.debug
    }
}
