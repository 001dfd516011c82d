use std::{fs::OpenOptions, io::Write, path::Path};

use anyhow::Context;

const TITLE_STYLE: &str = r#"
    <style>
        .title {
            position: fixed;
            bottom: 40px;
            left: 280px;
            background-color: white;
            padding: 5px;
            border-radius: 5px;
            z-index: 1000;
            font-size: 25px;
            font-weight: bold;
            color: #5a7247;
        }
    </style>"#;

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

#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub text: String,
    /// CSS `left` overriding the default 280px.
    pub left: Option<String>,
}

/// Fixed title labels drawn on top of a saved map.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleOverlay {
    pub titles: Vec<Title>,
}

impl TitleOverlay {
    pub fn to_html(&self) -> String {
        let mut html = String::from(TITLE_STYLE);
        for title in &self.titles {
            match &title.left {
                Some(left) => html.push_str(&format!(
                    "\n    <div class=\"title\" style=\"left: {};\">{}</div>",
                    escape_html(left),
                    escape_html(&title.text)
                )),
                None => html.push_str(&format!(
                    "\n    <div class=\"title\">{}</div>",
                    escape_html(&title.text)
                )),
            }
        }
        html.push_str("\n    ");
        html
    }

    /// Append the overlay to an already saved document.
    pub fn append_to_file(&self, filepath: &Path) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(filepath)
            .with_context(|| format!("Could not open {:?} to append titles", filepath))?;
        file.write_all(self.to_html().as_bytes())
            .with_context(|| format!("Could not append titles to {:?}", filepath))?;
        log::info!("Appended {} titles to {:?}", self.titles.len(), filepath);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use testdir::testdir;

    use super::{escape_html, Title, TitleOverlay};

    fn grain_yield_titles() -> TitleOverlay {
        TitleOverlay {
            titles: vec![
                Title {
                    text: "Grain Yield 2019".to_string(),
                    left: None,
                },
                Title {
                    text: "Grain Yield 2022".to_string(),
                    left: Some("60%".to_string()),
                },
            ],
        }
    }

    #[rstest]
    #[case("Grain Yield 2019", "Grain Yield 2019")]
    #[case("<b>&</b>", "&lt;b&gt;&amp;&lt;/b&gt;")]
    #[case("\"x\"", "&quot;x&quot;")]
    fn test_escape_html(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(expected, escape_html(text));
    }

    #[test]
    fn test_to_html() {
        let html = grain_yield_titles().to_html();
        assert!(html.contains("left: 280px;"));
        assert!(html.contains("color: #5a7247;"));
        assert!(html.contains("<div class=\"title\">Grain Yield 2019</div>"));
        assert!(html.contains("<div class=\"title\" style=\"left: 60%;\">Grain Yield 2022</div>"));
    }

    #[test]
    fn test_append_to_file() {
        let test_dir = testdir!();
        let filepath = test_dir.join("index.html");
        fs::write(&filepath, "<html></html>").unwrap();

        let overlay = grain_yield_titles();
        overlay.append_to_file(&filepath).unwrap();

        let contents = fs::read_to_string(&filepath).unwrap();
        assert_eq!(format!("<html></html>{}", overlay.to_html()), contents);
    }

    #[test]
    fn test_append_to_missing_file_fails() {
        let test_dir = testdir!();
        assert!(grain_yield_titles()
            .append_to_file(&test_dir.join("missing.html"))
            .is_err());
    }
}
