// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wikiserver::{
    cache::{ContentCache, IncompatiblePolicy},
    config::Config,
    converters::builtin_registry,
    dispatcher::RequestDispatcher,
    router::Router,
    server::handle_connection,
};

/// 测试用的 wiki 目录树
pub struct WikiTree {
    pub dir: TempDir,
    pub wiki: PathBuf,
    pub resources: PathBuf,
    pub cache_file: PathBuf,
}

impl WikiTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let wiki = dir.path().join("wiki");
        let resources = dir.path().join("resources");
        fs::create_dir_all(wiki.join("guide")).unwrap();
        fs::create_dir_all(&resources).unwrap();
        fs::write(wiki.join("article.md"), "# Article\n\nSee [[guide/install]].\n").unwrap();
        fs::write(wiki.join("guide/install.md"), "Run the installer.\n").unwrap();
        fs::write(wiki.join("notes.txt"), "plain <notes>\n").unwrap();
        fs::write(wiki.join("main.rs"), "fn main() {}\n").unwrap();
        fs::write(wiki.join("image.bin"), [0u8, 1, 2, 3, 4]).unwrap();
        fs::write(resources.join("style.css"), "body { color: black; }").unwrap();
        // 根目录之外的“机密”文件
        fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
        let cache_file = dir.path().join("cache.json");
        Self {
            dir,
            wiki,
            resources,
            cache_file,
        }
    }

    pub fn config(&self) -> Config {
        Config::new().with_roots(&self.wiki, &self.resources, &self.cache_file)
    }

    pub fn open_cache(&self) -> ContentCache {
        ContentCache::open(
            &self.cache_file,
            &self.wiki,
            Arc::new(builtin_registry(&self.config())),
            IncompatiblePolicy::Fail,
        )
        .unwrap()
    }

    pub fn pipeline(&self) -> (Router, RequestDispatcher) {
        let router = Router::new(&self.wiki, &self.resources);
        let dispatcher = RequestDispatcher::new(Arc::new(self.open_cache()), "Test Wiki");
        (router, dispatcher)
    }

    pub fn canonical_wiki(&self) -> PathBuf {
        fs::canonicalize(&self.wiki).unwrap()
    }
}

/// 在随机端口上启动服务器，返回监听地址。
pub async fn spawn_server(tree: &WikiTree) -> SocketAddr {
    let (router, dispatcher) = tree.pipeline();
    let router = Arc::new(router);
    let dispatcher = Arc::new(dispatcher);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut id: u128 = 0;
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle_connection(
                stream,
                id,
                Arc::clone(&router),
                Arc::clone(&dispatcher),
            ));
            id += 1;
        }
    });
    addr
}

/// 发送原始请求并读取完整响应（服务器在响应后关闭连接）。
pub async fn send_request(addr: SocketAddr, request: &[u8]) -> Result<String, String> {
    let mut stream = TcpStream::connect(addr).await.map_err(|e| e.to_string())?;
    stream.write_all(request).await.map_err(|e| e.to_string())?;

    let mut buffer = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut buffer))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

/// 从原始响应字符串中提取 HTTP 状态码
pub fn extract_status_code(response: &str) -> u16 {
    response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0)
}

pub fn header<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response
        .split("\r\n\r\n")
        .next()?
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(": "))
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

pub fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map_or("", |(_, body)| body)
}
