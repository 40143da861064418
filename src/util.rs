// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::param::STATUS_CODES;

pub struct HtmlBuilder {
    title: String,
    css: String,
    script: String,
    body: String,
}

const PAGE_CSS: &str = r"
            body {
                max-width: 50em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            nav {
                border-bottom: 1px solid #ccc;
                padding: 8px 0;
            }
            pre {
                white-space: pre-wrap;
            }
            ";

impl HtmlBuilder {
    pub fn new(title: &str, body: String) -> Self {
        let body = format!(
            r#"
            <nav>
                <a href="/wiki/">首页</a>
                <form action="/search/" onsubmit="location.href='/search/'+encodeURIComponent(this.q.value);return false;" style="display:inline">
                    <input name="q" placeholder="搜索">
                </form>
            </nav>
            <main>{}</main>
            "#,
            body
        );
        Self {
            title: escape_html(title),
            css: PAGE_CSS.to_string(),
            script: "".to_string(),
            body,
        }
    }

    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let title = format!("{}", code);
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        let description = match note {
            Some(n) => n,
            None => match STATUS_CODES.get(&code) {
                Some(d) => *d,
                None => {
                    panic!("非法的状态码：{}", code);
                }
            },
        };
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            code,
            escape_html(description)
        );
        Self {
            title,
            css,
            script: "".to_string(),
            body,
        }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <!-- 本文件由 wikiserver 自动生成 -->
            <html>
                <head>
                    <meta charset="utf-8">
                    <script>{}</script>
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            self.script, self.title, self.css, self.body
        )
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, units[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_size() {
        assert_eq!(format_file_size(9926), "9.7 KB".to_string());
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1048576), "1.0 MB");
        assert_eq!(format_file_size(1024 * 1024 - 1), "1024.0 KB");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("Привет"), "Привет");
    }

    #[test]
    fn test_html_builder_from_status_code() {
        let html = HtmlBuilder::from_status_code(404, Some("测试404")).build();
        assert!(html.contains("404"));
        assert!(html.contains("测试404"));
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("</html>"));
    }

    #[test]
    fn test_html_builder_from_status_code_no_note() {
        let html = HtmlBuilder::from_status_code(400, None).build();
        assert!(html.contains("Bad Request"));
    }

    #[test]
    #[should_panic(expected = "非法的状态码")]
    fn test_html_builder_invalid_status_code() {
        HtmlBuilder::from_status_code(999, None);
    }

    #[test]
    fn test_html_builder_page() {
        let html = HtmlBuilder::new("a <b>", "<p>content</p>".to_string()).build();
        assert!(html.contains("<title>a &lt;b&gt;</title>"));
        assert!(html.contains("<main><p>content</p></main>"));
        assert!(html.contains("href=\"/wiki/\""));
        assert!(html.contains("charset=\"utf-8\""));
    }
}
