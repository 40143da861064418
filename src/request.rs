// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解析模块
//!
//! 监听器只关心请求行：从 TCP 流读取的原始字节被解析为 [`HttpRequest`]，
//! 其中的请求目标被还原为已经百分号解码的路径字符串，交给路由器处理。
//! 除 `User-Agent` 与 `Accept-Encoding` 之外的标头一律忽略。

use crate::{exception::Exception, param::*};
use log::error;
use percent_encoding::percent_decode_str;

/// 解析后的 HTTP 请求元数据。
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP 请求方法
    method: HttpRequestMethod,
    /// 请求行中的原始目标
    target: String,
    /// 解码后的路径，不含查询字符串与片段
    path: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 客户端标识字符串
    user_agent: String,
    /// 客户端支持的压缩编码列表（按解析顺序排列）
    accept_encoding: Vec<HttpEncoding>,
}

impl HttpRequest {
    /// 从原始字节缓冲区尝试构建 `HttpRequest` 实例。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 请求 ID，用于在多线程环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let request_lines: Vec<&str> = request_string.split(CRLF).collect();

        // 请求行，例如 "GET /wiki/article HTTP/1.1"
        let first_line_parts: Vec<&str> = request_lines[0].split_whitespace().collect();

        if first_line_parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_lines[0]);
            return Err(Exception::UnSupportedRequestMethod);
        }

        let method_str = first_line_parts[0].to_uppercase();
        let method = match method_str.as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            _ => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, &method_str);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let version_str = first_line_parts[first_line_parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能含有未编码的空格，虽然不规范但通过 join 尝试恢复
        let target = first_line_parts[1..first_line_parts.len() - 1].join(" ");
        let path = parse_target(&target)?;

        let mut user_agent = "".to_string();
        let mut accept_encoding = vec![];
        for line in request_lines.iter().skip(1) {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match name.trim().to_lowercase().as_str() {
                "user-agent" => user_agent = value.to_string(),
                "accept-encoding" => {
                    if value.contains("gzip") {
                        accept_encoding.push(HttpEncoding::Gzip);
                    }
                    if value.contains("deflate") {
                        accept_encoding.push(HttpEncoding::Deflate);
                    }
                    if value.contains("br") {
                        accept_encoding.push(HttpEncoding::Br);
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            method,
            target,
            path,
            version,
            user_agent,
            accept_encoding,
        })
    }
}

/// 将请求目标还原为路径：只接受 http scheme，去掉查询字符串与片段，再做百分号解码。
fn parse_target(target: &str) -> Result<String, Exception> {
    let mut rest = target;
    if let Some(pos) = rest.find("://") {
        if !rest[..pos].eq_ignore_ascii_case("http") {
            return Err(Exception::InvalidPath);
        }
        let authority_and_path = &rest[pos + 3..];
        rest = match authority_and_path.find('/') {
            Some(i) => &authority_and_path[i..],
            None => "/",
        };
    }
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let decoded = percent_decode_str(&rest[..end])
        .decode_utf8()
        .map_err(|_| Exception::RequestIsNotUtf8)?;
    if decoded.contains('\0') {
        return Err(Exception::InvalidPath);
    }
    if decoded.is_empty() {
        return Ok("/".to_string());
    }
    Ok(decoded.into_owned())
}

impl HttpRequest {
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// 解码后的请求路径
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn accept_encoding(&self) -> &[HttpEncoding] {
        &self.accept_encoding
    }

    pub fn is_head(&self) -> bool {
        self.method == HttpRequestMethod::Head
    }
}
