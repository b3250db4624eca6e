use regex::Regex;
use std::sync::OnceLock;

/// Ticket and revision pair taken from a page's edit form.
///
/// Both values belong to the page revision current when the form was served,
/// so a ticket is fetched right before the edit it is used for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditTicket {
    pub ticket: String,
    pub rev: String,
}
impl EditTicket {
    /// Looks up the `ticket` and `rev` elements by their `name` attribute.
    /// On failure the name of the missing field is returned.
    pub fn from_html(html: &str) -> Result<EditTicket, &'static str> {
        let ticket = field_value(html, "ticket").ok_or("ticket")?;
        let rev = field_value(html, "rev").ok_or("rev")?;
        Ok(EditTicket { ticket, rev })
    }
}

fn hidden_regex() -> &'static Regex {
    static HIDDEN: OnceLock<Regex> = OnceLock::new();
    HIDDEN.get_or_init(|| {
        Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap()
    })
}

fn entity_regex() -> &'static Regex {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    ENTITY.get_or_init(|| {
        Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9A-Fa-f]{1,6})|(lt|gt|quot|apos|amp));").unwrap()
    })
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r#"<[A-Za-z][A-Za-z0-9-]*((?:"[^"]*"|'[^']*'|[^'">])*)>"#).unwrap()
    })
}

fn attr_regex() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"([^\s"'<>/=]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#).unwrap()
    })
}

fn attributes(tag: &str) -> impl Iterator<Item = (&str, &str)> {
    attr_regex().captures_iter(tag).filter_map(|cap| {
        let name = cap.get(1)?.as_str();
        let value = cap.get(2).or(cap.get(3)).or(cap.get(4))?.as_str();
        Some((name, value))
    })
}

/// The `value` of the first element named `field`. An element that carries
/// the name but no value counts as missing. Comments, scripts and styles are
/// not markup and are skipped.
fn field_value(html: &str, field: &str) -> Option<String> {
    let html = hidden_regex().replace_all(html, "");
    tag_regex().captures_iter(&html).find_map(|cap| {
        let attrs: Vec<(&str, &str)> = attributes(cap.get(1)?.as_str()).collect();
        let named = attrs
            .iter()
            .any(|&(name, value)| name.eq_ignore_ascii_case("name") && unescape(value) == field);
        if !named {
            return None;
        }
        let value = attrs
            .iter()
            .find(|&&(name, _)| name.eq_ignore_ascii_case("value"))
            .map(|&(_, value)| unescape(value));
        Some(value)
    })?
}

/// Decodes numeric character references and the XML named entities.
/// References to invalid code points are left as written.
fn unescape(s: &str) -> String {
    entity_regex()
        .replace_all(s, |cap: &regex::Captures| {
            let code = match (cap.get(1), cap.get(2)) {
                (Some(dec), _) => dec.as_str().parse().ok(),
                (_, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
                _ => {
                    return match &cap[3] {
                        "lt" => "<",
                        "gt" => ">",
                        "quot" => "\"",
                        "apos" => "'",
                        _ => "&",
                    }
                    .to_owned()
                }
            };
            match code.and_then(char::from_u32) {
                Some(c) => c.to_string(),
                None => cap[0].to_owned(),
            }
        })
        .into_owned()
}
