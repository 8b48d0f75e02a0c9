pub const SLUG_MAX_LEN: usize = 255;
const FALLBACK: &str = "post";
// room for a "-NNN" disambiguation suffix
const BASE_MAX_LEN: usize = SLUG_MAX_LEN - 8;

/// Transliterates `title` to ASCII and turns it into a URL slug.
pub fn slugify(title: &str) -> String {
    let slug = ::slug::slugify(title);
    let slug = truncate(&slug, BASE_MAX_LEN);
    if slug.is_empty() {
        FALLBACK.to_string()
    } else {
        slug
    }
}

/// First free slug for `base`, given the slugs in use that are `base` or
/// `base-...`: `base` itself, else one past the highest `base-N`.
pub fn next_free(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|slug| slug == base) {
        return base.to_string();
    }
    let highest = taken
        .iter()
        .filter_map(|slug| slug.strip_prefix(base)?.strip_prefix('-')?.parse::<u64>().ok())
        .max()
        .unwrap_or(1)
        .max(1);
    format!("{base}-{}", highest + 1)
}

fn truncate(slug: &str, max: usize) -> String {
    if slug.len() <= max {
        return slug.to_string();
    }
    slug[..max].trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_titles() {
        assert_eq!(slugify("Test post"), "test-post");
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
    }

    #[test]
    fn cyrillic_is_transliterated() {
        assert_eq!(slugify("Привет мир"), "privet-mir");
    }

    #[test]
    fn empty_result_falls_back() {
        assert_eq!(slugify("!!!"), FALLBACK);
        assert_eq!(slugify(""), FALLBACK);
    }

    #[test]
    fn long_titles_are_cut() {
        let slug = slugify(&"word ".repeat(100));
        assert!(slug.len() <= BASE_MAX_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn next_free_continues_after_the_highest_suffix() {
        let taken = |slugs: &[&str]| slugs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(next_free("test-post", &[]), "test-post");
        assert_eq!(next_free("test-post", &taken(&["test-post"])), "test-post-2");
        assert_eq!(
            next_free("test-post", &taken(&["test-post", "test-post-2", "test-post-10"])),
            "test-post-11"
        );
        assert_eq!(
            next_free("test-post", &taken(&["test-post", "test-post-draft"])),
            "test-post-2"
        );
        assert_eq!(next_free("test-post", &taken(&["test-post-3"])), "test-post");
    }
}
