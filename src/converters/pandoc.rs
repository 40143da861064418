// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 通过外部的 `pandoc` 进程转换文档。进程运行时间受超时限制，超时后被杀死并视为转换失败。

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use md5::{Digest, Md5};

use crate::{
    param::RESOURCES_PREFIX,
    path::relative_to,
    registry::{ConvertError, Converter},
};

pub const PANDOC_EXTENSIONS: &[&str] = &[
    ".rtf", ".docx", ".odt", ".csv", ".tsv", ".ipynb", ".dw", ".mw",
];

/// 轮询子进程状态的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct PandocConverter {
    program: String,
    base_args: Vec<String>,
    wiki_root: PathBuf,
    resources_root: PathBuf,
    timeout: Duration,
}

impl PandocConverter {
    pub fn new(wiki_root: &Path, resources_root: &Path, timeout: Duration) -> Self {
        Self {
            program: "pandoc".to_string(),
            base_args: Vec::new(),
            wiki_root: wiki_root.to_path_buf(),
            resources_root: resources_root.to_path_buf(),
            timeout,
        }
    }

    /// 替换要执行的程序，`base_args` 排在转换参数之前。
    pub fn with_command(mut self, program: &str, base_args: &[&str]) -> Self {
        self.program = program.to_string();
        self.base_args = base_args.iter().map(|arg| arg.to_string()).collect();
        self
    }

    fn wait_with_timeout(&self, child: &mut std::process::Child) -> Result<ExitStatus, ConvertError> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if start.elapsed() >= self.timeout {
                if let Err(e) = child.kill() {
                    warn!("无法终止pandoc进程：{}", e);
                }
                let _ = child.wait();
                return Err(format!("pandoc在{}秒内没有完成", self.timeout.as_secs_f32()).into());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// 无法由扩展名推断的输入格式
fn input_format(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "dw" => Some("dokuwiki"),
        "mw" => Some("mediawiki"),
        "csv" => Some("csv"),
        "tsv" => Some("tsv"),
        "ipynb" => Some("ipynb"),
        _ => None,
    }
}

impl Converter for PandocConverter {
    fn convert(&self, path: &Path) -> Result<Option<String>, ConvertError> {
        let relative = relative_to(path, &self.wiki_root)?;
        let media_key = hex::encode(Md5::digest(relative.to_string_lossy().as_bytes()));
        let media_dir = self.resources_root.join("media").join(&media_key);
        let output = tempfile::Builder::new()
            .prefix("wikiserver-")
            .suffix(".html")
            .tempfile()?;
        // stderr 写入临时文件，输出再多也不会堵住子进程
        let mut errors = tempfile::tempfile()?;

        let mut command = Command::new(&self.program);
        command.args(&self.base_args);
        if let Some(format) = input_format(path) {
            command.arg("-f").arg(format);
        }
        command
            .arg("-t")
            .arg("html")
            .arg(format!("--extract-media={}", media_dir.display()))
            .arg("-o")
            .arg(output.path())
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(errors.try_clone()?));
        debug!("执行{:?}", command);

        let mut child = command.spawn()?;
        let status = self.wait_with_timeout(&mut child)?;
        if !status.success() {
            let mut stderr = Vec::new();
            errors.seek(SeekFrom::Start(0))?;
            errors.read_to_end(&mut stderr)?;
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(format!("pandoc退出状态{}：{}", status, stderr.trim()).into());
        }

        let markup = fs::read_to_string(output.path())?;
        let media_url = format!("/{}/media/{}", RESOURCES_PREFIX, media_key);
        Ok(Some(
            markup.replace(&*media_dir.to_string_lossy(), &media_url),
        ))
    }
}
