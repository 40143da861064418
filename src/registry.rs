// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 转换器注册表
//!
//! 以扩展名（含点号，如 `.md`）为键的转换器分派表，以及按注册顺序执行的后处理链。
//!
//! 分派是全函数：未注册的扩展名等价于一个总是返回 `None` 的转换器。转换器没有产出但文件
//! 可以作为文本解码时，退化为 `<pre>` 包裹的原始文本，保证每个可读文件都能显示。

use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use crate::{exception::Exception, path::detect_text, util::escape_html};

/// 转换器与后处理器返回的错误
pub type ConvertError = Box<dyn Error + Send + Sync>;

/// 将单个源文件转换为 HTML 标记。返回 `Ok(None)` 表示该文件没有可显示的内容。
pub trait Converter: Send + Sync {
    fn convert(&self, path: &Path) -> Result<Option<String>, ConvertError>;
}

impl<F> Converter for F
where
    F: Fn(&Path) -> Result<Option<String>, ConvertError> + Send + Sync,
{
    fn convert(&self, path: &Path) -> Result<Option<String>, ConvertError> {
        self(path)
    }
}

/// 对转换后的标记做进一步变换。
pub trait PostProcessor: Send + Sync {
    fn process(&self, markup: String) -> Result<String, ConvertError>;
}

impl<F> PostProcessor for F
where
    F: Fn(String) -> Result<String, ConvertError> + Send + Sync,
{
    fn process(&self, markup: String) -> Result<String, ConvertError> {
        self(markup)
    }
}

#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn Converter>>,
    post_processors: Vec<Arc<dyn PostProcessor>>,
}

/// 文件扩展名（含点号）；没有扩展名时为空串。
pub fn extension_key(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => String::new(),
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为一组扩展名注册转换器。同一扩展名再次注册时覆盖之前的转换器。
    pub fn register<C>(&mut self, extensions: &[&str], converter: C) -> &mut Self
    where
        C: Converter + 'static,
    {
        let converter: Arc<dyn Converter> = Arc::new(converter);
        for extension in extensions {
            if self
                .converters
                .insert(extension.to_string(), Arc::clone(&converter))
                .is_some()
            {
                debug!("扩展名{}的转换器被覆盖", extension);
            }
        }
        self
    }

    /// 追加后处理器。后注册的后处理器看到的是先注册者的输出。
    pub fn register_post_processor<P>(&mut self, processor: P) -> &mut Self
    where
        P: PostProcessor + 'static,
    {
        self.post_processors.push(Arc::new(processor));
        self
    }

    pub fn is_registered(&self, extension: &str) -> bool {
        self.converters.contains_key(extension)
    }

    pub fn post_processor_count(&self) -> usize {
        self.post_processors.len()
    }

    /// 将文件转换为 HTML 标记。
    ///
    /// 转换器出错时返回 `ConversionFailed`；后处理器出错时返回 `PostProcessingFailed`，
    /// 并丢弃链上已经产生的中间结果。
    pub fn convert(&self, path: &Path) -> Result<Option<String>, Exception> {
        let extension = extension_key(path);
        let converted = match self.converters.get(&extension) {
            Some(converter) => converter.convert(path).map_err(|e| {
                warn!("转换文件{}失败：{}", path.display(), e);
                Exception::ConversionFailed {
                    path: path.to_path_buf(),
                    cause: e.to_string(),
                }
            })?,
            None => None,
        };

        let markup = match converted {
            Some(markup) => markup,
            None => match detect_text(path, false) {
                Some(content) => {
                    debug!("文件{}没有专用转换器输出，使用原始文本", path.display());
                    format!("<pre>{}</pre>", escape_html(&content.text))
                }
                None => return Ok(None),
            },
        };

        let mut markup = markup;
        for processor in &self.post_processors {
            markup = processor.process(markup).map_err(|e| {
                warn!("后处理文件{}失败：{}", path.display(), e);
                Exception::PostProcessingFailed {
                    path: path.to_path_buf(),
                    cause: e.to_string(),
                }
            })?;
        }
        Ok(Some(markup))
    }
}
