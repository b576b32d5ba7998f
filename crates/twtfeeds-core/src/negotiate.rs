//! Content negotiation for the feed list

/// Representation of the feed list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// `name url` lines
    PlainText,
    /// HTML page
    Structured,
}

/// A media range from an `Accept` header
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub main: String,
    pub sub: String,
    pub quality: f32,
}

impl MediaRange {
    /// Parse one comma-separated element, e.g. `text/html; q=0.9`
    pub fn parse(element: &str) -> Option<Self> {
        let mut parts = element.split(';');
        let (main, sub) = parts.next()?.trim().split_once('/')?;
        let (main, sub) = (main.trim(), sub.trim());
        if main.is_empty() || sub.is_empty() {
            return None;
        }

        let mut quality = 1.0;
        for param in parts {
            if let Some((key, value)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("q") {
                    quality = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
                }
            }
        }

        Some(Self {
            main: main.to_ascii_lowercase(),
            sub: sub.to_ascii_lowercase(),
            quality,
        })
    }

    /// 0 for `*/*`, 1 for `type/*`, 2 for a concrete type
    fn specificity(&self) -> u8 {
        match (self.main.as_str(), self.sub.as_str()) {
            ("*", _) => 0,
            (_, "*") => 1,
            _ => 2,
        }
    }

    fn is(&self, main: &str, sub: &str) -> bool {
        self.main == main && self.sub == sub
    }
}

/// Parse an `Accept` header, ordered by preference.
///
/// Higher quality first, then more specific ranges; ties keep header order.
/// Ranges with `q=0` are dropped.
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    let mut ranges: Vec<MediaRange> = header
        .split(',')
        .filter_map(MediaRange::parse)
        .filter(|r| r.quality > 0.0)
        .collect();
    ranges.sort_by(|a, b| {
        b.quality
            .total_cmp(&a.quality)
            .then_with(|| b.specificity().cmp(&a.specificity()))
    });
    ranges
}

/// Pick the feed list representation for an `Accept` header.
///
/// Plain text only when it is the client's single most preferred type: a
/// different type with the same quality and specificity makes it a tie,
/// and ties go to the structured page.
pub fn select_representation(accept: Option<&str>) -> Representation {
    let preferred = accept.map(parse_accept).unwrap_or_default();
    let Some((best, rest)) = preferred.split_first() else {
        return Representation::Structured;
    };
    if !best.is("text", "plain") {
        return Representation::Structured;
    }
    let tied = rest.iter().any(|other| {
        !other.is("text", "plain")
            && other.quality.total_cmp(&best.quality).is_eq()
            && other.specificity() == best.specificity()
    });
    if tied {
        Representation::Structured
    } else {
        Representation::PlainText
    }
}
