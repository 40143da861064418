// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::path::Path;

use crate::{
    path::read_text,
    registry::{ConvertError, Converter},
};

/// HTML 文件原样输出解码后的文本。
pub struct HtmlConverter;

impl Converter for HtmlConverter {
    fn convert(&self, path: &Path) -> Result<Option<String>, ConvertError> {
        Ok(read_text(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "<h1>Title</h1>").unwrap();
        assert_eq!(
            HtmlConverter.convert(&path).unwrap(),
            Some("<h1>Title</h1>".to_string())
        );
    }

    #[test]
    fn test_legacy_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.htm");
        let text = "<p>Le café est très bon, déjà vu à Paris.</p>";
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(text);
        fs::write(&path, &bytes).unwrap();
        assert_eq!(HtmlConverter.convert(&path).unwrap(), Some(text.to_string()));
    }
}
