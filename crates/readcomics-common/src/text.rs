//! Text helpers: slugs, title-casing, and HTML tag stripping.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Slug used when the source text has no slug-able characters.
const FALLBACK_SLUG: &str = "item";

/// Build a URL slug from free text.
///
/// Case is preserved. Apostrophes are dropped, common Latin diacritics are
/// folded to ASCII, and every other run of non-alphanumeric characters
/// becomes a single `-`.
///
/// # Examples
///
/// ```
/// use readcomics_common::text::slugify;
///
/// assert_eq!(slugify("Marvel's Café"), "Marvels-Cafe");
/// assert_eq!(slugify("  Image / Top Cow  "), "Image-Top-Cow");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c == '\'' || c == '\u{2019}' {
            continue;
        }
        let folded = fold_char(c);
        let mut any = false;
        for f in folded.chars().filter(|f| f.is_ascii_alphanumeric()) {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(f);
            any = true;
        }
        if !any {
            pending_dash = true;
        }
    }

    slug
}

/// Pick the first free slug among `base`, `base-2`, `base-3`, ...
///
/// `taken` holds slugs already used by other records of the same kind.
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    let base = if base.is_empty() { FALLBACK_SLUG } else { base };
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Title-case a word the way profile display names are rendered.
///
/// A letter is upper-cased when it follows a non-letter (or starts the
/// string) and lower-cased otherwise, so `"jdoe_42x"` becomes `"Jdoe_42X"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}

/// Remove markup tags from an HTML fragment and decode the basic entities.
///
/// ```
/// use readcomics_common::text::strip_tags;
///
/// assert_eq!(strip_tags("<p>Spider-Man &amp; friends</p>"), "Spider-Man & friends");
/// ```
pub fn strip_tags(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("valid tag regex"));

    let text = tag.replace_all(html, "");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn fold_char(c: char) -> String {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' | 'ć' | 'č' => "c",
        'Ç' | 'Ć' | 'Č' => "C",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => "E",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' => "I",
        'ł' => "l",
        'Ł' => "L",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' => "O",
        'œ' => "oe",
        'Œ' => "OE",
        'ř' => "r",
        'Ř' => "R",
        'ś' | 'š' => "s",
        'Ś' | 'Š' => "S",
        'ß' => "ss",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ź' | 'ż' | 'ž' => "z",
        'Ź' | 'Ż' | 'Ž' => "Z",
        _ => return c.to_string(),
    };
    folded.to_string()
}
