//! Weather cards.
//!
//! Two HTML encodings exist next to the JSON document:
//! - forecast iframe (`index2.html?date=..&weatherCode=..&max=..&min=..&t=..&st=..`)
//! - single-day card (`index.html?m=..&d=..&w=..&a=..`) preceded by a shields badge
//!
//! The forecast iframe and the JSON document normalise to the same `Weather`.

use url::Url;

pub const FORECAST_CARD_URL: &str = "https://www.lingmx.com/card/index2.html";
pub const NOW_CARD_URL: &str = "https://www.lingmx.com/card/index.html";

const BADGE_PREFIX: &str = r#"<img src="https://img.shields.io/badge/"#;

/// Multi-day forecast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Weather {
    pub city: String,
    pub dates: Vec<String>,
    /// Raw codes such as `LIGHT_RAIN`.
    pub codes: Vec<String>,
    pub max: Vec<String>,
    pub min: Vec<String>,
    pub note: String,
}

/// Single-day card, kept with its surrounding markup for in-place substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherNow {
    pub source: String,
    pub badge_html: String,
    pub badge_code: String,
    pub iframe_html: String,
    pub month: String,
    pub day: String,
    pub weather: String,
    pub temperature: String,
}

/// Localised label for a weather code; unknown codes pass through.
pub fn weather_label(code: &str) -> &str {
    match code {
        "CLEAR_DAY" | "CLEAR_NIGHT" => "晴",
        "PARTLY_CLOUDY_DAY" | "PARTLY_CLOUDY_NIGHT" => "多云",
        "CLOUDY" => "阴",
        "LIGHT_HAZE" => "轻度雾霾",
        "MODERATE_HAZE" => "中度雾霾",
        "HEAVY_HAZE" => "重度雾霾",
        "LIGHT_RAIN" => "小雨",
        "MODERATE_RAIN" => "中雨",
        "HEAVY_RAIN" => "大雨",
        "STORM_RAIN" => "暴雨",
        "FOG" => "雾",
        "LIGHT_SNOW" => "小雪",
        "MODERATE_SNOW" => "中雪",
        "HEAVY_SNOW" => "大雪",
        "STORM_SNOW" => "暴雪",
        "DUST" => "浮尘",
        "SAND" => "沙尘",
        "WIND" => "大风",
        other => other,
    }
}

/// `<iframe ...>...iframe>` span, greedy to the last closing tag.
fn iframe_span(html: &str) -> Option<&str> {
    let start = html.find("<iframe")?;
    let rest = &html[start..];
    let end = rest.rfind("iframe>")? + "iframe>".len();
    Some(&rest[..end])
}

fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    for quote in ['"', '\''] {
        let needle = format!("{name}={quote}");
        if let Some(pos) = tag.find(&needle) {
            let value = &tag[pos + needle.len()..];
            let end = value.find(quote)?;
            return Some(&value[..end]);
        }
    }
    None
}

fn iframe_src(html: &str) -> Option<Url> {
    let span = iframe_span(html)?;
    let src = attr(span, "src")?.replace("&amp;", "&");
    match Url::parse(&src) {
        Ok(u) => Some(u),
        Err(e) => {
            tracing::debug!(error = %e, src = %src, "weather card src is not a url");
            None
        }
    }
}

fn query(u: &Url, key: &str) -> String {
    u.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

fn query_list(u: &Url, key: &str) -> Vec<String> {
    let v = query(u, key);
    if v.is_empty() {
        return Vec::new();
    }
    v.split(',').map(str::to_string).collect()
}

/// Parse the forecast iframe out of chat HTML.
pub fn parse_forecast_card(html: &str) -> Option<Weather> {
    let u = iframe_src(html)?;
    Some(Weather {
        city: query(&u, "t"),
        dates: query_list(&u, "date"),
        codes: query_list(&u, "weatherCode"),
        max: query_list(&u, "max"),
        min: query_list(&u, "min"),
        note: query(&u, "st"),
    })
}

/// Parse the single-day card out of chat HTML.
pub fn parse_now_card(html: &str) -> Option<WeatherNow> {
    let iframe_html = iframe_span(html)?.to_string();
    let u = iframe_src(html)?;

    let (badge_html, badge_code) = match html.find(BADGE_PREFIX) {
        Some(start) => {
            let rest = &html[start..];
            match rest.find("\">") {
                Some(end) => {
                    let tag = &rest[..end + 2];
                    let code = tag[BADGE_PREFIX.len()..tag.len() - 2].to_string();
                    (tag.to_string(), code)
                }
                None => (String::new(), String::new()),
            }
        }
        None => (String::new(), String::new()),
    };

    Some(WeatherNow {
        source: html.to_string(),
        badge_html,
        badge_code,
        iframe_html,
        month: query(&u, "m"),
        day: query(&u, "d"),
        weather: query(&u, "w"),
        temperature: query(&u, "a"),
    })
}

impl Weather {
    /// `{city}天气` header, centred table (dates / labels / max / min), then the note.
    pub fn render(&self) -> String {
        let labels: Vec<String> = self
            .codes
            .iter()
            .map(|c| weather_label(c).to_string())
            .collect();
        let rows = vec![labels, self.max.clone(), self.min.clone()];
        format!("{}天气\n{}{}", self.city, render_table(&self.dates, &rows), self.note)
    }
}

impl WeatherNow {
    pub fn summary(&self) -> String {
        format!(
            "{}月{}日, 天气: {}, 当前温度: {} ℃",
            self.month, self.day, self.weather, self.temperature
        )
    }

    /// The original markup with the badge reduced to its code and the iframe replaced by `summary`.
    pub fn render(&self) -> String {
        let mut out = self.source.clone();
        if !self.badge_html.is_empty() {
            out = out.replace(&self.badge_html, &self.badge_code);
        }
        out.replace(&self.iframe_html, &self.summary())
    }
}

/// Terminal cell width: CJK and other wide glyphs take two columns.
fn cell_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

fn centered(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(cell_width(s));
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(pad - left))
}

/// Plain ASCII-ruled table with centred cells. Short rows are padded with blanks.
pub fn render_table(header: &[String], rows: &[Vec<String>]) -> String {
    let cols = rows.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);
    if cols == 0 {
        return String::new();
    }

    let cell = |row: &[String], i: usize| row.get(i).cloned().unwrap_or_default();
    let widths: Vec<usize> = (0..cols)
        .map(|i| {
            rows.iter()
                .map(|r| cell_width(&cell(r.as_slice(), i)))
                .chain([cell_width(&cell(header, i))])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = {
        let mut s = String::from("+");
        for w in &widths {
            s.push_str(&"-".repeat(w + 2));
            s.push('+');
        }
        s.push('\n');
        s
    };
    let line = |row: &[String]| {
        let mut s = String::from("|");
        for (i, w) in widths.iter().enumerate() {
            s.push(' ');
            s.push_str(&centered(&cell(row, i), *w));
            s.push_str(" |");
        }
        s.push('\n');
        s
    };

    let mut out = String::new();
    out.push_str(&rule);
    out.push_str(&line(header));
    out.push_str(&rule);
    for r in rows {
        out.push_str(&line(r.as_slice()));
    }
    out.push_str(&rule);
    out
}
