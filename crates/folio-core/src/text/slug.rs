//! URL slugs derived from post titles.

const MAX_SLUG_LENGTH: usize = 100;

#[rustfmt::skip]
fn transliterate(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a", 'б' => "b", 'в' => "v", 'г' => "g", 'д' => "d", 'е' => "e",
        'ё' => "yo", 'ж' => "zh", 'з' => "z", 'и' => "i", 'й' => "y", 'к' => "k",
        'л' => "l", 'м' => "m", 'н' => "n", 'о' => "o", 'п' => "p", 'р' => "r",
        'с' => "s", 'т' => "t", 'у' => "u", 'ф' => "f", 'х' => "h", 'ц' => "ts",
        'ч' => "ch", 'ш' => "sh", 'щ' => "sch", 'ъ' => "", 'ы' => "y", 'ь' => "",
        'э' => "e", 'ю' => "yu", 'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

/// Build a URL-friendly slug.
///
/// Cyrillic is transliterated, everything outside `[a-z0-9-]` is dropped,
/// spaces become `-`, and runs of `-` collapse. The result is capped at
/// 100 characters and may be empty when the title has no usable characters.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());

    for c in title.chars().flat_map(char::to_lowercase) {
        if let Some(latin) = transliterate(c) {
            slug.push_str(latin);
        } else if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if (c == ' ' || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    if slug.len() > MAX_SLUG_LENGTH {
        slug.truncate(MAX_SLUG_LENGTH);
    }
    slug.trim_end_matches('-').to_string()
}
