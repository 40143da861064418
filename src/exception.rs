// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了 Wiki 服务器在请求处理与内容转换生命周期中可能出现的各类异常。
//!
//! ## 分类
//! - **协议解析**：请求字节流无法解析、方法或版本不受支持。
//! - **路径边界**：不可信路径越出其声明的根目录（`PathEscapesRoot` / `OutsideRoot`）。
//! - **内容转换**：转换器或后处理器执行失败。
//! - **启动阶段**：缓存快照版本不兼容、配置文件错误等。
//!
//! 请求边界依据 [`Exception::status_code`] 将异常映射为 HTTP 状态码。

use std::fmt;
use std::path::{Path, PathBuf};

/// 服务器处理请求与转换内容时发生的异常类型。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了服务器暂不支持的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 请求目标无法解析为路径（例如使用了非 http 的 scheme）。
    InvalidPath,
    /// 请求的文件不存在。对应 `404 Not Found`。
    FileNotFound,
    /// 不可信路径解析后位于其根目录之外。对应 `400 Bad Request`。
    PathEscapesRoot { path: PathBuf, root: PathBuf },
    /// 绕过路由直接访问缓存时，路径不在缓存根目录内。
    OutsideRoot { path: PathBuf, root: PathBuf },
    /// 转换器执行失败（包括外部进程超时）。
    ConversionFailed { path: PathBuf, cause: String },
    /// 后处理器执行失败，已转换的部分结果被丢弃。
    PostProcessingFailed { path: PathBuf, cause: String },
    /// 持久化缓存的版本与当前程序不一致。
    CacheVersionMismatch { found: u32, expected: u32 },
    /// 持久化缓存无法被反序列化。
    CacheCorrupted(String),
    /// 文件系统读写失败。
    Io(String),
    /// 配置文件缺失或格式错误。
    Config(String),
}

use Exception::*;

impl Exception {
    pub fn path_escapes_root(path: &Path, root: &Path) -> Self {
        PathEscapesRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        }
    }

    /// 是否为路径越界类错误。这类错误属于客户端输入问题，不应当作服务端故障记录。
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PathEscapesRoot { .. }
                | OutsideRoot { .. }
                | RequestIsNotUtf8
                | UnSupportedRequestMethod
                | UnsupportedHttpVersion
                | InvalidPath
        )
    }

    /// 请求边界使用的 HTTP 状态码映射。
    pub fn status_code(&self) -> u16 {
        match self {
            FileNotFound => 404,
            e if e.is_client_error() => 400,
            _ => 500,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            InvalidPath => write!(f, "Invalid path (400)"),
            FileNotFound => write!(f, "File not found (404)"),
            PathEscapesRoot { path, root } => write!(
                f,
                "Requested path {} is outside of root directory {}",
                path.display(),
                root.display()
            ),
            OutsideRoot { path, root } => write!(
                f,
                "Requested file {} is outside of cache folder {}",
                path.display(),
                root.display()
            ),
            ConversionFailed { path, cause } => {
                write!(f, "Can not convert {}: {}", path.display(), cause)
            }
            PostProcessingFailed { path, cause } => {
                write!(f, "Can not post process file {}: {}", path.display(), cause)
            }
            CacheVersionMismatch { found, expected } => write!(
                f,
                "Cache snapshot version {} is not supported (expected {})",
                found, expected
            ),
            CacheCorrupted(msg) => write!(f, "Cache snapshot is corrupted: {}", msg),
            Io(msg) => write!(f, "I/O error: {}", msg),
            Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Exception {}

impl From<std::io::Error> for Exception {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => FileNotFound,
            _ => Io(e.to_string()),
        }
    }
}
