// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了 wikiserver 使用的常量和数据结构，包括：
//! - 路由前缀与缓存快照版本。
//! - 常见的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - HTTP 方法、版本及编码格式的强类型枚举。

use lazy_static::lazy_static;
use std::collections::HashMap;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "wikiserver";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 单次读取请求报文的缓冲区大小。请求行中的 URL 一般不超过 2000 个字符。
pub const REQUEST_BUFFER_SIZE: usize = 2048;

/// Wiki 页面的路由前缀
pub const WIKI_PREFIX: &str = "wiki";

/// 静态资源的路由前缀
pub const RESOURCES_PREFIX: &str = "resources";

/// 搜索的路由前缀
pub const SEARCH_PREFIX: &str = "search";

/// 持久化缓存快照的格式版本
pub const CACHE_VERSION: u32 = 1;

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(204, "No Content");

        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(307, "Temporary Redirect");

        map.insert(400, "Bad Request");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(408, "Request Timeout");
        map.insert(414, "URI Too Long");

        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(503, "Service Unavailable");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpVersion {
    V1_0,
    V1_1,
}

/// 支持的 HTTP 请求方法。内容只读，因此只有 GET 与 HEAD。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpRequestMethod {
    Get,
    Head,
}

/// 支持的内容编码（压缩）格式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpEncoding {
    /// GNU zip 压缩
    Gzip,
    /// zlib 压缩
    Deflate,
    /// Brotli 压缩
    Br,
}

use std::fmt;

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "HTTP/1.0"),
            HttpVersion::V1_1 => write!(f, "HTTP/1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
        }
    }
}

impl fmt::Display for HttpEncoding {
    /// 将枚举格式化为 `Content-Encoding` 头所使用的标识符
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpEncoding::Gzip => write!(f, "gzip"),
            HttpEncoding::Deflate => write!(f, "deflate"),
            HttpEncoding::Br => write!(f, "br"),
        }
    }
}
