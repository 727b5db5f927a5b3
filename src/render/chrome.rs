//! Chromium-backed render engine.
//!
//! Drives headless Chrome's print-to-PDF through the DevTools protocol.
//! Documents are handed over as base64 data URLs, so rendering needs no
//! temp files and no web server.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptionsBuilder};
use lopdf::Document;

use crate::error::{Error, Result};
use crate::render::{PageStream, RenderEngine};

/// Render engine backed by a headless Chromium instance.
///
/// One browser process serves all fragments of a request; each render runs
/// in a fresh tab.
pub struct ChromiumEngine {
    browser: Browser,
}

impl ChromiumEngine {
    /// Launch a headless browser.
    pub fn launch() -> Result<Self> {
        let launch_opts = LaunchOptionsBuilder::default()
            .headless(true)
            .build()
            .map_err(|e| Error::Engine(e.to_string()))?;
        let browser = Browser::new(launch_opts).map_err(|e| Error::Engine(e.to_string()))?;
        Ok(Self { browser })
    }

    fn data_url(html: &str) -> String {
        format!("data:text/html;base64,{}", STANDARD.encode(html))
    }

    /// Inline the stylesheet into the document before navigation.
    fn merge_css(html: &str, css: &str) -> String {
        if css.is_empty() {
            return html.to_string();
        }
        let style = format!("<style>{css}</style>");
        match html.find("</head>") {
            Some(pos) => format!("{}{}{}", &html[..pos], style, &html[pos..]),
            None => format!("{style}{html}"),
        }
    }
}

impl RenderEngine for ChromiumEngine {
    fn render(&self, html: &str, css: &str, timeout: Duration) -> Result<PageStream> {
        let document = Self::merge_css(html, css);
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| Error::Engine(e.to_string()))?;
        tab.set_default_timeout(timeout);

        let bytes = tab
            .navigate_to(&Self::data_url(&document))
            .and_then(|tab| tab.wait_until_navigated())
            .and_then(|tab| tab.print_to_pdf(Some(print_options())))
            .map_err(|e| Error::Engine(e.to_string()))?;

        let page_count = Document::load_mem(&bytes)?.get_pages().len();
        Ok(PageStream { bytes, page_count })
    }
}

fn print_options() -> PrintToPdfOptions {
    PrintToPdfOptions {
        print_background: Some(true),
        prefer_css_page_size: Some(true),
        display_header_footer: Some(false),
        ..PrintToPdfOptions::default()
    }
}
