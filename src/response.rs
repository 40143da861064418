// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::{exception::Exception, param::*, util::HtmlBuilder};

use brotli::enc::{self, backward_references::BrotliEncoderParams};
use bytes::Bytes;
use chrono::prelude::*;
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use log::{debug, error};

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    content_length: u64,
    date: DateTime<Utc>,
    content_encoding: Option<HttpEncoding>,
    server_name: String,
    location: Option<String>,
    content: Option<Bytes>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            content_length: 0,
            date: Utc::now(),
            content_encoding: None,
            server_name: SERVER_NAME.to_string(),
            location: None,
            content: None,
        }
    }

    /// 设置响应体。`headonly` 时只保留长度，不保留内容。
    fn with_body(
        mut self,
        body: Vec<u8>,
        mime: &str,
        accept_encoding: &[HttpEncoding],
        id: u128,
        headonly: bool,
    ) -> Self {
        self.content_encoding = if should_skip_compression(mime) {
            None
        } else {
            decide_encoding(accept_encoding)
        };
        debug!("[ID{}]决定使用编码: {:?}", id, self.content_encoding);
        let body = match self.content_encoding {
            None => body,
            Some(encoding) => match compress(&body, encoding) {
                Ok(c) => c,
                Err(e) => {
                    error!("[ID{}]压缩内容失败: {}，返回未压缩内容", id, e);
                    self.content_encoding = None;
                    body
                }
            },
        };
        self.content_type = Some(mime.to_string());
        self.content_length = body.len() as u64;
        self.content = match headonly {
            true => None,
            false => Some(Bytes::from(body)),
        };
        self
    }

    pub fn from_html(html: &str, accept_encoding: &[HttpEncoding], id: u128, headonly: bool) -> Self {
        Self::new().with_body(
            Vec::from(html),
            "text/html;charset=utf-8",
            accept_encoding,
            id,
            headonly,
        )
    }

    /// 原样返回文件内容，MIME 类型由扩展名推断。
    pub fn from_file(
        path: &Path,
        accept_encoding: &[HttpEncoding],
        id: u128,
        headonly: bool,
    ) -> Result<Self, Exception> {
        let data = fs::read(path)?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        debug!("[ID{}]文件{}的MIME类型: {}", id, path.display(), mime);
        Ok(Self::new().with_body(data, mime.essence_str(), accept_encoding, id, headonly))
    }

    pub fn redirect(url: &str) -> Self {
        let mut response = Self::new();
        response.set_code(302);
        response.location = Some(url.to_string());
        response
    }

    pub fn from_status_code(
        code: u16,
        accept_encoding: &[HttpEncoding],
        id: u128,
        headonly: bool,
    ) -> Self {
        let html = HtmlBuilder::from_status_code(code, None).build();
        let mut response = Self::from_html(&html, accept_encoding, id, headonly);
        response.set_code(code);
        response
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&information) => information.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                panic!();
            }
        };
        self
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let version = self.version.to_string();
        let status_code = self.status_code.to_string();
        let content_length = self.content_length.to_string();
        let date = format_date(&self.date);

        let header = [
            version.as_str(),
            " ",
            status_code.as_str(),
            " ",
            self.information.as_str(),
            CRLF,
            match &self.content_type {
                Some(t) => ["Content-Type: ", t.as_str(), CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            match self.content_encoding {
                Some(e) => ["Content-Encoding: ", e.to_string().as_str(), CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            match &self.location {
                Some(l) => ["Location: ", l.as_str(), CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            "Content-Length: ",
            content_length.as_str(),
            CRLF,
            "Date: ",
            date.as_str(),
            CRLF,
            "Server: ",
            self.server_name.as_str(),
            CRLF,
            "Connection: close",
            CRLF,
            CRLF,
        ]
        .concat();
        let body: &[u8] = match &self.content {
            Some(c) => c.as_ref(),
            None => &[],
        };
        [header.as_bytes(), body].concat()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_encoding(&self) -> Option<HttpEncoding> {
        self.content_encoding
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

fn compress(data: &[u8], mode: HttpEncoding) -> io::Result<Vec<u8>> {
    match mode {
        HttpEncoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        HttpEncoding::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        HttpEncoding::Br => {
            let params = BrotliEncoderParams::default();
            let mut output = Vec::new();
            enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
            Ok(output)
        }
    }
}

fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = [
        "image/",
        "video/",
        "audio/",
        "font/",
        "application/zip",
        "application/gzip",
        "application/x-7z-compressed",
        "application/vnd.ms-fontobject",
    ];

    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type))
        && mime_type != "image/svg+xml"
}

fn decide_encoding(accept_encoding: &[HttpEncoding]) -> Option<HttpEncoding> {
    if accept_encoding.contains(&HttpEncoding::Br) {
        Some(HttpEncoding::Br)
    } else if accept_encoding.contains(&HttpEncoding::Gzip) {
        Some(HttpEncoding::Gzip)
    } else if accept_encoding.contains(&HttpEncoding::Deflate) {
        Some(HttpEncoding::Deflate)
    } else {
        None
    }
}
