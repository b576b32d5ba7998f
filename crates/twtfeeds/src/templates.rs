//! HTML pages rendered with upon
//!
//! All interpolated values are HTML-escaped.

use std::fmt::Write;

use serde::Serialize;
use twtfeeds_core::{FeedEntry, FeedsError};
use upon::{Engine, Template, Value, fmt as upon_fmt};

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{{ title }}</title>
  </head>
  <body>
    <h1>{{ title }}</h1>
    <p>Add an RSS or Atom feed and follow it as a twtxt feed.</p>
    <form method="POST" action="/">
      <input type="url" name="url" placeholder="https://example.com/feed.xml" required>
      <button type="submit">Add feed</button>
    </form>
    <p><a href="/feeds">Available feeds</a></p>
  </body>
</html>
"#;

const FEEDS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{{ title }}</title>
  </head>
  <body>
    <h1>{{ title }}</h1>
    <ul>
    {% for feed in feeds %}
      <li>
        <img src="/avatar/{{ feed.name }}" width="30" height="30" alt="">
        <a href="/{{ feed.name }}/twtxt.txt">{{ feed.name }}</a>
        (<a href="{{ feed.url }}">{{ feed.url }}</a>)
      </li>
    {% endfor %}
    </ul>
  </body>
</html>
"#;

const MESSAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{{ title }}</title>
  </head>
  <body>
    <h1>{{ title }}</h1>
    <p>{{ message }}</p>
    <p><a href="/">Back</a></p>
  </body>
</html>
"#;

const INDEX_TITLE: &str = "RSS/Atom to twtxt feed aggregator service";
const FEEDS_TITLE: &str = "Available twtxt feeds";

#[derive(Serialize)]
struct IndexContext<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct FeedsContext<'a> {
    title: &'a str,
    feeds: &'a [FeedEntry],
}

#[derive(Serialize)]
struct MessageContext<'a> {
    title: &'a str,
    message: &'a str,
}

/// Default formatter: strings are written with HTML metacharacters escaped.
fn escape_html(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
    match value {
        Value::String(s) => {
            for c in s.chars() {
                match c {
                    '&' => f.write_str("&amp;")?,
                    '<' => f.write_str("&lt;")?,
                    '>' => f.write_str("&gt;")?,
                    '"' => f.write_str("&quot;")?,
                    '\'' => f.write_str("&#39;")?,
                    c => f.write_char(c)?,
                }
            }
        }
        v => upon_fmt::default(f, v)?,
    };
    Ok(())
}

/// Compiled page templates
pub struct Templates {
    engine: Engine<'static>,
    index: Template<'static>,
    feeds: Template<'static>,
    message: Template<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, FeedsError> {
        let mut engine = Engine::new();
        engine.set_default_formatter(&escape_html);
        let compile = |source: &'static str| {
            engine
                .compile(source)
                .map_err(|e| FeedsError::Config(format!("template: {e}")))
        };
        Ok(Self {
            index: compile(INDEX_TEMPLATE)?,
            feeds: compile(FEEDS_TEMPLATE)?,
            message: compile(MESSAGE_TEMPLATE)?,
            engine,
        })
    }

    fn render<S: Serialize>(
        &self,
        template: &Template<'static>,
        ctx: S,
    ) -> Result<String, FeedsError> {
        template
            .render(&self.engine, ctx)
            .to_string()
            .map_err(|e| FeedsError::Config(format!("template: {e}")))
    }

    pub fn index(&self) -> Result<String, FeedsError> {
        self.render(&self.index, IndexContext { title: INDEX_TITLE })
    }

    pub fn feeds(&self, feeds: &[FeedEntry]) -> Result<String, FeedsError> {
        self.render(
            &self.feeds,
            FeedsContext {
                title: FEEDS_TITLE,
                feeds,
            },
        )
    }

    pub fn message(&self, title: &str, message: &str) -> Result<String, FeedsError> {
        self.render(&self.message, MessageContext { title, message })
    }
}
